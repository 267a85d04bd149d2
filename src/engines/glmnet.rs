//! Elastic-net penalized least squares (Gaussian), by cyclic coordinate descent.
//!
//! Objective, for a single `lambda`:
//!
//! ```text
//! 1/(2n) Σ (y_i - b0 - x_i^T β)^2 + lambda * ((1 - alpha)/2 ||β||² + alpha ||β||₁)
//! ```
//!
//! Predictors are standardized (population sd) before solving unless
//! `standardize = false`; coefficients are reported on the original scale.

use nalgebra::{DMatrix, DVector};

use crate::data::Table;
use crate::domain::{GlanceRecord, PredictionType, TidyRecord};
use crate::engines::common::{
    align_columns, complete_rows, design_matrix, numeric_response, require_numeric, NativeArgs,
};
use crate::engines::{EngineRequest, FittedModel, ModelEngine, PredictRequest, Prediction};
use crate::error::EngineError;

const NAME: &str = "glmnet";

#[derive(Debug, Clone, Copy, Default)]
pub struct ElasticNet;

#[derive(Debug, Clone)]
pub struct ElasticNetFit {
    predictors: Vec<String>,
    intercept: bool,
    b0: f64,
    beta: DVector<f64>,
    lambda: f64,
    alpha: f64,
    dev_ratio: f64,
    nobs: usize,
    iterations: usize,
}

fn soft_threshold(z: f64, gamma: f64) -> f64 {
    if z > gamma {
        z - gamma
    } else if z < -gamma {
        z + gamma
    } else {
        0.0
    }
}

impl ModelEngine for ElasticNet {
    fn fit(&self, request: &EngineRequest<'_>) -> Result<Box<dyn FittedModel>, EngineError> {
        let args = NativeArgs::parse(
            NAME,
            request.args,
            &["lambda", "alpha", "standardize", "maxit", "thresh"],
        )?;
        let lambda = args.f64_or("lambda", 0.0)?;
        let alpha = args.f64_or("alpha", 1.0)?;
        let standardize = args.bool_or("standardize", true)?;
        let maxit = args.usize_or("maxit", 10_000)?;
        let thresh = args.f64_or("thresh", 1e-7)?;
        if lambda < 0.0 {
            return Err(EngineError::new(format!("{NAME}: lambda must be >= 0")));
        }
        if !(0.0..=1.0).contains(&alpha) {
            return Err(EngineError::new(format!("{NAME}: alpha must be in [0, 1]")));
        }

        require_numeric(NAME, request.predictors)?;
        if request.predictors.ncols() == 0 {
            return Err(EngineError::new(format!("{NAME}: x must have at least one column")));
        }
        let rows = complete_rows(request.predictors, Some(request.response));
        let n = rows.len();
        if n < 2 {
            return Err(EngineError::new(format!("{NAME}: need at least 2 complete observations")));
        }
        let mut x = design_matrix(request.predictors, &rows, false);
        let y = numeric_response(NAME, request.response, &rows)?;
        let p = x.ncols();
        let n_f = n as f64;

        // Center (with intercept) and scale columns.
        let mut means = vec![0.0; p];
        let mut scales = vec![1.0; p];
        for j in 0..p {
            let col = x.column(j);
            let mean = if request.intercept { col.mean() } else { 0.0 };
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n_f;
            means[j] = mean;
            if standardize {
                scales[j] = if var > 0.0 { var.sqrt() } else { 0.0 };
            }
        }
        for j in 0..p {
            for i in 0..n {
                x[(i, j)] = if scales[j] > 0.0 {
                    (x[(i, j)] - means[j]) / scales[j]
                } else {
                    0.0
                };
            }
        }
        let y_mean = if request.intercept { y.mean() } else { 0.0 };
        let yc = y.map(|v| v - y_mean);

        let col_sq: Vec<f64> = (0..p).map(|j| x.column(j).norm_squared() / n_f).collect();
        let mut beta = DVector::<f64>::zeros(p);
        let mut resid = yc.clone();
        let mut iterations = 0;

        for iter in 0..maxit {
            iterations = iter + 1;
            let mut max_change = 0.0f64;
            for j in 0..p {
                if col_sq[j] == 0.0 {
                    continue;
                }
                let xj = x.column(j);
                let old = beta[j];
                let rho = xj.dot(&resid) / n_f + col_sq[j] * old;
                let new = soft_threshold(rho, lambda * alpha) / (col_sq[j] + lambda * (1.0 - alpha));
                if new != old {
                    resid.axpy(old - new, &xj, 1.0);
                    beta[j] = new;
                    max_change = max_change.max(col_sq[j] * (new - old).powi(2));
                }
            }
            if max_change < thresh {
                break;
            }
        }

        let rss = resid.norm_squared();
        let tss = yc.norm_squared();
        let dev_ratio = if tss > 0.0 { 1.0 - rss / tss } else { f64::NAN };

        // Back to the original scale.
        let beta = DVector::from_iterator(
            p,
            (0..p).map(|j| if scales[j] > 0.0 { beta[j] / scales[j] } else { 0.0 }),
        );
        let b0 = if request.intercept {
            y_mean - (0..p).map(|j| means[j] * beta[j]).sum::<f64>()
        } else {
            0.0
        };

        Ok(Box::new(ElasticNetFit {
            predictors: request.predictors.names().into_iter().map(str::to_string).collect(),
            intercept: request.intercept,
            b0,
            beta,
            lambda,
            alpha,
            dev_ratio,
            nobs: n,
            iterations,
        }))
    }
}

impl FittedModel for ElasticNetFit {
    fn predict(&self, data: &Table, request: &PredictRequest) -> Result<Vec<(usize, Prediction)>, EngineError> {
        if request.kind != PredictionType::Point {
            return Err(EngineError::new(format!(
                "{NAME}: only point predictions are available"
            )));
        }
        let data = align_columns(NAME, data, &self.predictors)?;
        let rows = complete_rows(&data, None);
        let x: DMatrix<f64> = design_matrix(&data, &rows, false);
        let fitted = &x * &self.beta;
        Ok(rows
            .iter()
            .zip(fitted.iter())
            .map(|(&i, &v)| (i, Prediction::Value(v + self.b0)))
            .collect())
    }

    fn tidy(&self) -> Option<Vec<TidyRecord>> {
        let mut out = Vec::with_capacity(self.beta.len() + 1);
        let mut names = self.predictors.iter();
        if self.intercept {
            out.push(TidyRecord::estimate_only("(Intercept)", self.b0));
        }
        for v in self.beta.iter() {
            if let Some(name) = names.next() {
                out.push(TidyRecord::estimate_only(name.clone(), *v));
            }
        }
        Some(out)
    }

    fn glance(&self) -> GlanceRecord {
        let mut g = GlanceRecord::default();
        g.push("lambda", self.lambda);
        g.push("alpha", self.alpha);
        g.push("dev_ratio", self.dev_ratio);
        g.push("nobs", self.nobs as f64);
        g.push("iterations", self.iterations as f64);
        g
    }

    fn levels(&self) -> &[String] {
        &[]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;
    use crate::domain::{ArgValue, Mode};

    fn data() -> (Table, Column) {
        let x = Table::from_columns(vec![
            Column::numeric("x1", [0.0, 1.0, 2.0, 3.0, 4.0, 5.0]),
            Column::numeric("x2", [1.0, 0.0, 1.0, 0.0, 1.0, 0.0]),
        ])
        .unwrap();
        let y = Column::numeric("y", [1.0, 3.1, 5.0, 7.1, 9.0, 11.1]);
        (x, y)
    }

    fn fit_with(args: Vec<(String, ArgValue)>) -> Box<dyn FittedModel> {
        let (x, y) = data();
        ElasticNet
            .fit(&EngineRequest {
                mode: Mode::Regression,
                args: &args,
                predictors: &x,
                response: &y,
                intercept: true,
            })
            .unwrap()
    }

    #[test]
    fn zero_penalty_matches_least_squares() {
        let model = fit_with(vec![("lambda".to_string(), ArgValue::Float(0.0))]);
        let tidy = model.tidy().unwrap();
        assert_eq!(tidy[1].term, "x1");
        // OLS slope on x1 for this data is ~2.0.
        assert!((tidy[1].estimate - 2.0).abs() < 0.05, "slope {}", tidy[1].estimate);
    }

    #[test]
    fn large_lasso_penalty_zeroes_coefficients() {
        let model = fit_with(vec![
            ("lambda".to_string(), ArgValue::Float(100.0)),
            ("alpha".to_string(), ArgValue::Float(1.0)),
        ]);
        let tidy = model.tidy().unwrap();
        assert!(tidy[1..].iter().all(|r| r.estimate == 0.0));
        // Intercept-only model predicts the mean.
        assert!((tidy[0].estimate - 6.05).abs() < 1e-9);
    }

    #[test]
    fn ridge_shrinks_toward_zero() {
        let ols = fit_with(vec![]).tidy().unwrap()[1].estimate;
        let ridge = fit_with(vec![
            ("lambda".to_string(), ArgValue::Float(1.0)),
            ("alpha".to_string(), ArgValue::Float(0.0)),
        ])
        .tidy()
        .unwrap()[1]
            .estimate;
        assert!(ridge.abs() < ols.abs());
        assert!(ridge > 0.0);
    }

    #[test]
    fn interval_predictions_are_refused() {
        let model = fit_with(vec![]);
        let (x, _) = data();
        assert!(model
            .predict(&x, &PredictRequest { kind: PredictionType::Interval, level: 0.95 })
            .is_err());
    }
}
