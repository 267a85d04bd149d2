//! Binary logistic regression fitted by iteratively reweighted least squares.
//!
//! The response must have exactly two levels; the second (in sorted order)
//! is the event whose probability is modelled.

use nalgebra::{DMatrix, DVector};

use crate::data::Table;
use crate::domain::{GlanceRecord, PredictionType, TidyRecord};
use crate::engines::common::{
    align_columns, class_response, coefficient_names, complete_rows, design_matrix, require_numeric, NativeArgs,
};
use crate::engines::{EngineRequest, FittedModel, ModelEngine, PredictRequest, Prediction};
use crate::error::EngineError;
use crate::math::{gram_inverse, pvalue_z, solve_weighted_least_squares};

const NAME: &str = "glm";
const EPSILON: f64 = 1e-8;
const MIN_WEIGHT: f64 = 1e-10;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogisticModel;

#[derive(Debug, Clone)]
pub struct LogisticFit {
    predictors: Vec<String>,
    intercept: bool,
    names: Vec<String>,
    levels: Vec<String>,
    beta: DVector<f64>,
    cov: Option<DMatrix<f64>>,
    null_deviance: f64,
    deviance: f64,
    nobs: usize,
    iterations: usize,
    converged: bool,
}

fn inv_logit(eta: f64) -> f64 {
    1.0 / (1.0 + (-eta).exp())
}

fn binomial_deviance(y: &DVector<f64>, mu: &DVector<f64>) -> f64 {
    let eps = 1e-15;
    -2.0 * y
        .iter()
        .zip(mu.iter())
        .map(|(&yi, &mi)| {
            let m = mi.clamp(eps, 1.0 - eps);
            yi * m.ln() + (1.0 - yi) * (1.0 - m).ln()
        })
        .sum::<f64>()
}

impl ModelEngine for LogisticModel {
    fn fit(&self, request: &EngineRequest<'_>) -> Result<Box<dyn FittedModel>, EngineError> {
        let args = NativeArgs::parse(NAME, request.args, &["maxit"])?;
        let maxit = args.usize_or("maxit", 25)?;
        require_numeric(NAME, request.predictors)?;

        let rows = complete_rows(request.predictors, Some(request.response));
        let (levels, codes) = class_response(NAME, request.response, &rows)?;
        if levels.len() != 2 {
            return Err(EngineError::new(format!(
                "{NAME}: response `{}` must have exactly 2 levels, found {}",
                request.response.name,
                levels.len()
            )));
        }
        let x = design_matrix(request.predictors, &rows, request.intercept);
        let y = DVector::from_iterator(codes.len(), codes.iter().map(|&c| c as f64));
        let n = rows.len();
        let p = x.ncols();
        if p == 0 {
            return Err(EngineError::new(format!("{NAME}: model has no coefficients")));
        }

        let mut beta = DVector::<f64>::zeros(p);
        let mut mu = DVector::from_element(n, 0.5);
        let mut weights = mu.map(|m| m * (1.0 - m));
        let mut deviance = binomial_deviance(&y, &mu);
        let mut converged = false;
        let mut iterations = 0;

        for iter in 0..maxit {
            iterations = iter + 1;
            let eta = &x * &beta;
            let z = DVector::from_iterator(
                n,
                (0..n).map(|i| eta[i] + (y[i] - mu[i]) / weights[i]),
            );
            beta = solve_weighted_least_squares(&x, &z, &weights)
                .ok_or_else(|| EngineError::new(format!("{NAME}: weighted least squares failed")))?;

            let eta = &x * &beta;
            mu = eta.map(inv_logit);
            weights = mu.map(|m| (m * (1.0 - m)).max(MIN_WEIGHT));
            let next = binomial_deviance(&y, &mu);
            let change = (next - deviance).abs() / (next.abs() + 0.1);
            deviance = next;
            if change < EPSILON {
                converged = true;
                break;
            }
        }
        if !converged {
            log::warn!("{NAME}: IRLS did not converge in {maxit} iterations");
        }
        if !beta.iter().all(|b| b.is_finite()) {
            return Err(EngineError::new(format!("{NAME}: coefficients diverged")));
        }

        let null_mu = if request.intercept { y.mean() } else { 0.5 };
        let null_deviance = binomial_deviance(&y, &DVector::from_element(n, null_mu));

        Ok(Box::new(LogisticFit {
            predictors: request.predictors.names().into_iter().map(str::to_string).collect(),
            intercept: request.intercept,
            names: coefficient_names(request.predictors, request.intercept),
            levels,
            cov: gram_inverse(&x, Some(&weights)),
            beta,
            null_deviance,
            deviance,
            nobs: n,
            iterations,
            converged,
        }))
    }
}

impl FittedModel for LogisticFit {
    fn predict(&self, data: &Table, request: &PredictRequest) -> Result<Vec<(usize, Prediction)>, EngineError> {
        let data = align_columns(NAME, data, &self.predictors)?;
        let rows = complete_rows(&data, None);
        let x = design_matrix(&data, &rows, self.intercept);
        let prob = (&x * &self.beta).map(inv_logit);

        let out = rows.iter().zip(prob.iter()).map(|(&i, &p)| (i, p));
        match request.kind {
            PredictionType::Point => Ok(out
                .map(|(i, p)| {
                    let level = if p >= 0.5 { &self.levels[1] } else { &self.levels[0] };
                    (i, Prediction::Class(level.clone()))
                })
                .collect()),
            PredictionType::Probability => Ok(out
                .map(|(i, p)| (i, Prediction::Probabilities(vec![1.0 - p, p])))
                .collect()),
            PredictionType::Interval => Err(EngineError::new(format!(
                "{NAME}: intervals are not available for a classification fit"
            ))),
        }
    }

    fn tidy(&self) -> Option<Vec<TidyRecord>> {
        Some(
            self.names
                .iter()
                .enumerate()
                .map(|(j, term)| {
                    let estimate = self.beta[j];
                    let std_error = self
                        .cov
                        .as_ref()
                        .map(|c| c[(j, j)].max(0.0).sqrt())
                        .filter(|se| se.is_finite());
                    let statistic = std_error.map(|se| estimate / se);
                    TidyRecord {
                        term: term.clone(),
                        estimate,
                        std_error,
                        statistic,
                        p_value: statistic.map(pvalue_z).filter(|p| p.is_finite()),
                    }
                })
                .collect(),
        )
    }

    fn glance(&self) -> GlanceRecord {
        let p = self.beta.len();
        let mut g = GlanceRecord::default();
        g.push("null_deviance", self.null_deviance);
        g.push("deviance", self.deviance);
        g.push("aic", self.deviance + 2.0 * p as f64);
        g.push("nobs", self.nobs as f64);
        g.push("df_residual", self.nobs.saturating_sub(p) as f64);
        g.push("iterations", self.iterations as f64);
        g.push("converged", if self.converged { 1.0 } else { 0.0 });
        g
    }

    fn levels(&self) -> &[String] {
        &self.levels
    }
}
