//! Weighted k-nearest-neighbour regression and classification.
//!
//! Predictors are scaled by their training standard deviation, distances are
//! Euclidean, and neighbour distances are normalized by the distance of the
//! (k+1)-th neighbour before the kernel is applied.
//!
//! Kernels: `rectangular` (plain average), `triangular` and `inv`.

use nalgebra::DMatrix;

use crate::data::Table;
use crate::domain::{GlanceRecord, Mode, PredictionType, TidyRecord};
use crate::engines::common::{
    align_columns, class_response, complete_rows, design_matrix, numeric_response, require_numeric, NativeArgs,
};
use crate::engines::{EngineRequest, FittedModel, ModelEngine, PredictRequest, Prediction};
use crate::error::EngineError;

const NAME: &str = "kknn";
pub const KERNELS: [&str; 3] = ["rectangular", "triangular", "inv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kernel {
    Rectangular,
    Triangular,
    Inverse,
}

impl Kernel {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "rectangular" => Some(Kernel::Rectangular),
            "triangular" => Some(Kernel::Triangular),
            "inv" => Some(Kernel::Inverse),
            _ => None,
        }
    }

    fn weight(self, d: f64) -> f64 {
        match self {
            Kernel::Rectangular => 1.0,
            Kernel::Triangular => (1.0 - d).max(0.0),
            Kernel::Inverse => 1.0 / d.max(1e-12),
        }
    }
}

#[derive(Debug, Clone)]
enum Target {
    Numeric(Vec<f64>),
    Classes { levels: Vec<String>, codes: Vec<usize> },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NearestNeighbors;

#[derive(Debug, Clone)]
pub struct NearestNeighborsFit {
    predictors: Vec<String>,
    scales: Vec<f64>,
    train: DMatrix<f64>,
    target: Target,
    k: usize,
    kernel: Kernel,
}

impl ModelEngine for NearestNeighbors {
    fn fit(&self, request: &EngineRequest<'_>) -> Result<Box<dyn FittedModel>, EngineError> {
        let args = NativeArgs::parse(NAME, request.args, &["k", "kernel"])?;
        let k = args.usize_or("k", 5)?;
        let kernel_name = args.text_or("kernel", "rectangular")?;
        let kernel = Kernel::parse(&kernel_name).ok_or_else(|| {
            EngineError::new(format!(
                "{NAME}: unknown kernel `{kernel_name}` (one of {})",
                KERNELS.join(", ")
            ))
        })?;
        require_numeric(NAME, request.predictors)?;
        if request.predictors.ncols() == 0 {
            return Err(EngineError::new(format!("{NAME}: need at least one predictor")));
        }

        let rows = complete_rows(request.predictors, Some(request.response));
        if rows.is_empty() {
            return Err(EngineError::new(format!("{NAME}: no complete training rows")));
        }
        let target = match request.mode {
            Mode::Regression => Target::Numeric(numeric_response(NAME, request.response, &rows)?.iter().copied().collect()),
            Mode::Classification => {
                let (levels, codes) = class_response(NAME, request.response, &rows)?;
                Target::Classes { levels, codes }
            }
            Mode::Unspecified if request.response.data.is_numeric() => {
                Target::Numeric(numeric_response(NAME, request.response, &rows)?.iter().copied().collect())
            }
            Mode::Unspecified => {
                let (levels, codes) = class_response(NAME, request.response, &rows)?;
                Target::Classes { levels, codes }
            }
        };

        let k = if k > rows.len() {
            log::warn!("{NAME}: k = {k} exceeds {} training rows, using all of them", rows.len());
            rows.len()
        } else {
            k
        };

        let mut train = design_matrix(request.predictors, &rows, false);
        let n = train.nrows();
        let scales: Vec<f64> = (0..train.ncols())
            .map(|j| {
                let col = train.column(j);
                let mean = col.mean();
                let var = if n > 1 {
                    col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
                } else {
                    0.0
                };
                if var > 0.0 { var.sqrt() } else { 1.0 }
            })
            .collect();
        for (j, s) in scales.iter().enumerate() {
            train.column_mut(j).unscale_mut(*s);
        }

        Ok(Box::new(NearestNeighborsFit {
            predictors: request.predictors.names().into_iter().map(str::to_string).collect(),
            scales,
            train,
            target,
            k,
            kernel,
        }))
    }
}

impl NearestNeighborsFit {
    /// Nearest training rows of `point` with their kernel weights.
    fn neighbours(&self, point: &[f64]) -> Vec<(usize, f64)> {
        let mut dist: Vec<(usize, f64)> = (0..self.train.nrows())
            .map(|i| {
                let d = point
                    .iter()
                    .enumerate()
                    .map(|(j, v)| (v - self.train[(i, j)]).powi(2))
                    .sum::<f64>()
                    .sqrt();
                (i, d)
            })
            .collect();
        dist.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        let bound = dist
            .get(self.k)
            .map(|(_, d)| *d)
            .unwrap_or_else(|| dist[self.k - 1].1)
            .max(1e-12);
        let mut out: Vec<(usize, f64)> = dist[..self.k]
            .iter()
            .map(|&(i, d)| (i, self.kernel.weight(d / bound)))
            .collect();
        if out.iter().all(|(_, w)| *w <= 0.0) {
            out.iter_mut().for_each(|(_, w)| *w = 1.0);
        }
        out
    }

    fn class_probabilities(&self, levels: &[String], codes: &[usize], nb: &[(usize, f64)]) -> Vec<f64> {
        let mut probs = vec![0.0; levels.len()];
        for &(i, w) in nb {
            probs[codes[i]] += w;
        }
        let total: f64 = probs.iter().sum();
        probs.iter_mut().for_each(|p| *p /= total);
        probs
    }
}

impl FittedModel for NearestNeighborsFit {
    fn predict(&self, data: &Table, request: &PredictRequest) -> Result<Vec<(usize, Prediction)>, EngineError> {
        let data = align_columns(NAME, data, &self.predictors)?;
        let rows = complete_rows(&data, None);
        let x = design_matrix(&data, &rows, false);

        let mut out = Vec::with_capacity(rows.len());
        for (r, &i) in rows.iter().enumerate() {
            let point: Vec<f64> = (0..x.ncols()).map(|j| x[(r, j)] / self.scales[j]).collect();
            let nb = self.neighbours(&point);
            let prediction = match (&self.target, request.kind) {
                (Target::Numeric(y), PredictionType::Point) => {
                    let total: f64 = nb.iter().map(|(_, w)| w).sum();
                    Prediction::Value(nb.iter().map(|&(j, w)| w * y[j]).sum::<f64>() / total)
                }
                (Target::Classes { levels, codes }, PredictionType::Point) => {
                    let probs = self.class_probabilities(levels, codes, &nb);
                    // Ties go to the first level.
                    let best = probs
                        .iter()
                        .enumerate()
                        .fold(0, |best, (j, p)| if *p > probs[best] { j } else { best });
                    Prediction::Class(levels[best].clone())
                }
                (Target::Classes { levels, codes }, PredictionType::Probability) => {
                    Prediction::Probabilities(self.class_probabilities(levels, codes, &nb))
                }
                (_, kind) => {
                    return Err(EngineError::new(format!(
                        "{NAME}: {kind} predictions are not available for this fit"
                    )));
                }
            };
            out.push((i, prediction));
        }
        Ok(out)
    }

    fn tidy(&self) -> Option<Vec<TidyRecord>> {
        None
    }

    fn glance(&self) -> GlanceRecord {
        let mut g = GlanceRecord::default();
        g.push("k", self.k as f64);
        g.push("nobs", self.train.nrows() as f64);
        g
    }

    fn levels(&self) -> &[String] {
        match &self.target {
            Target::Classes { levels, .. } => levels,
            Target::Numeric(_) => &[],
        }
    }
}
