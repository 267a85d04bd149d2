//! Ordinary least squares with classical inference.

use nalgebra::{DMatrix, DVector};

use crate::data::Table;
use crate::domain::{GlanceRecord, PredictionType, TidyRecord};
use crate::engines::common::{
    align_columns, coefficient_names, complete_rows, design_matrix, numeric_response, require_numeric, NativeArgs,
};
use crate::engines::{EngineRequest, FittedModel, ModelEngine, PredictRequest, Prediction};
use crate::error::EngineError;
use crate::math::{gram_inverse, pvalue_f, pvalue_t, solve_least_squares, t_critical};

const NAME: &str = "lm";

#[derive(Debug, Clone, Copy, Default)]
pub struct LinearModel;

#[derive(Debug, Clone)]
pub struct LinearFit {
    predictors: Vec<String>,
    intercept: bool,
    names: Vec<String>,
    beta: DVector<f64>,
    /// Unscaled covariance `(X^T X)^-1`; `None` for rank-deficient designs.
    xtx_inv: Option<DMatrix<f64>>,
    sigma: f64,
    df_residual: usize,
    nobs: usize,
    r_squared: f64,
    adj_r_squared: f64,
    f_statistic: f64,
}

impl ModelEngine for LinearModel {
    fn fit(&self, request: &EngineRequest<'_>) -> Result<Box<dyn FittedModel>, EngineError> {
        NativeArgs::parse(NAME, request.args, &[])?;
        require_numeric(NAME, request.predictors)?;

        let rows = complete_rows(request.predictors, Some(request.response));
        let x = design_matrix(request.predictors, &rows, request.intercept);
        let y = numeric_response(NAME, request.response, &rows)?;
        let n = rows.len();
        let p = x.ncols();
        if n == 0 {
            return Err(EngineError::new(format!("{NAME}: 0 (non-NA) cases")));
        }
        if p == 0 {
            return Err(EngineError::new(format!("{NAME}: model has no coefficients")));
        }

        let beta = solve_least_squares(&x, &y)
            .ok_or_else(|| EngineError::new(format!("{NAME}: least squares solve failed")))?;

        let resid = &y - &x * &beta;
        let sse = resid.dot(&resid);
        let df_residual = n.saturating_sub(p);
        let sigma = if df_residual > 0 {
            (sse / df_residual as f64).sqrt()
        } else {
            f64::NAN
        };

        // Centered total sum of squares with an intercept, raw otherwise.
        let sst = if request.intercept {
            let mean = y.mean();
            y.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        } else {
            y.dot(&y)
        };
        let df_model = p - usize::from(request.intercept);
        let r_squared = if sst > 0.0 { 1.0 - sse / sst } else { f64::NAN };
        let adj_r_squared = if df_residual > 0 {
            let denom_n = (n - usize::from(request.intercept)) as f64;
            1.0 - (1.0 - r_squared) * denom_n / df_residual as f64
        } else {
            f64::NAN
        };
        let f_statistic = if df_model > 0 && df_residual > 0 && sse > 0.0 {
            ((sst - sse) / df_model as f64) / (sse / df_residual as f64)
        } else {
            f64::NAN
        };

        Ok(Box::new(LinearFit {
            predictors: request.predictors.names().into_iter().map(str::to_string).collect(),
            intercept: request.intercept,
            names: coefficient_names(request.predictors, request.intercept),
            beta,
            xtx_inv: gram_inverse(&x, None),
            sigma,
            df_residual,
            nobs: n,
            r_squared,
            adj_r_squared,
            f_statistic,
        }))
    }
}

impl LinearFit {
    fn df_model(&self) -> usize {
        self.names.len() - usize::from(self.intercept)
    }
}

impl FittedModel for LinearFit {
    fn predict(&self, data: &Table, request: &PredictRequest) -> Result<Vec<(usize, Prediction)>, EngineError> {
        let data = align_columns(NAME, data, &self.predictors)?;
        let rows = complete_rows(&data, None);
        let x = design_matrix(&data, &rows, self.intercept);
        let fitted = &x * &self.beta;

        match request.kind {
            PredictionType::Point => Ok(rows
                .iter()
                .zip(fitted.iter())
                .map(|(&i, &v)| (i, Prediction::Value(v)))
                .collect()),
            PredictionType::Interval => {
                let Some(xtx_inv) = &self.xtx_inv else {
                    return Err(EngineError::new(format!(
                        "{NAME}: intervals need a full-rank design"
                    )));
                };
                let q = t_critical(request.level, self.df_residual as f64);
                if !q.is_finite() || !self.sigma.is_finite() {
                    return Err(EngineError::new(format!(
                        "{NAME}: no residual degrees of freedom for intervals"
                    )));
                }
                let mut out = Vec::with_capacity(rows.len());
                for (r, &i) in rows.iter().enumerate() {
                    let x0 = x.row(r).transpose();
                    let se = self.sigma * (x0.transpose() * xtx_inv * &x0)[(0, 0)].max(0.0).sqrt();
                    out.push((
                        i,
                        Prediction::Interval {
                            lower: fitted[r] - q * se,
                            upper: fitted[r] + q * se,
                        },
                    ));
                }
                Ok(out)
            }
            PredictionType::Probability => Err(EngineError::new(format!(
                "{NAME}: probabilities are not available for a regression fit"
            ))),
        }
    }

    fn tidy(&self) -> Option<Vec<TidyRecord>> {
        let df = self.df_residual as f64;
        Some(
            self.names
                .iter()
                .enumerate()
                .map(|(j, term)| {
                    let estimate = self.beta[j];
                    let std_error = self
                        .xtx_inv
                        .as_ref()
                        .map(|inv| self.sigma * inv[(j, j)].max(0.0).sqrt())
                        .filter(|se| se.is_finite());
                    let statistic = std_error.map(|se| estimate / se);
                    let p_value = statistic.map(|t| pvalue_t(t, df)).filter(|p| p.is_finite());
                    TidyRecord {
                        term: term.clone(),
                        estimate,
                        std_error,
                        statistic,
                        p_value,
                    }
                })
                .collect(),
        )
    }

    fn glance(&self) -> GlanceRecord {
        let mut g = GlanceRecord::default();
        g.push("r_squared", self.r_squared);
        g.push("adj_r_squared", self.adj_r_squared);
        g.push("sigma", self.sigma);
        g.push("statistic", self.f_statistic);
        g.push(
            "p_value",
            pvalue_f(self.f_statistic, self.df_model() as f64, self.df_residual as f64),
        );
        g.push("df", self.df_model() as f64);
        g.push("nobs", self.nobs as f64);
        g.push("df_residual", self.df_residual as f64);
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

    fn line_data() -> (Table, Column) {
        let x = Table::from_columns(vec![Column::numeric("x", [0.0, 1.0, 2.0, 3.0, 4.0])]).unwrap();
        let y = Column::numeric("y", [1.1, 2.9, 5.2, 6.8, 9.1]);
        (x, y)
    }

    fn fit(x: &Table, y: &Column, args: &[(String, ArgValue)]) -> Result<Box<dyn FittedModel>, EngineError> {
        LinearModel.fit(&EngineRequest {
            mode: Mode::Regression,
            args,
            predictors: x,
            response: y,
            intercept: true,
        })
    }

    #[test]
    fn recovers_line_and_reports_inference() {
        let (x, y) = line_data();
        let model = fit(&x, &y, &[]).unwrap();

        let tidy = model.tidy().unwrap();
        assert_eq!(tidy[0].term, "(Intercept)");
        assert!((tidy[1].estimate - 1.99).abs() < 1e-9);
        assert!(tidy[1].std_error.unwrap() > 0.0);
        assert!(tidy[1].p_value.unwrap() < 0.001);

        let glance = model.glance();
        assert!(glance.get("r_squared").unwrap() > 0.99);
        assert_eq!(glance.get("nobs"), Some(5.0));
        assert_eq!(glance.get("df_residual"), Some(3.0));
    }

    #[test]
    fn interval_brackets_point_prediction() {
        let (x, y) = line_data();
        let model = fit(&x, &y, &[]).unwrap();
        let new = Table::from_columns(vec![Column::numeric("x", [2.5])]).unwrap();

        let point = model
            .predict(&new, &PredictRequest { kind: PredictionType::Point, level: 0.95 })
            .unwrap();
        let interval = model
            .predict(&new, &PredictRequest { kind: PredictionType::Interval, level: 0.95 })
            .unwrap();

        let Prediction::Value(v) = point[0].1 else { panic!("expected value") };
        let Prediction::Interval { lower, upper } = interval[0].1 else { panic!("expected interval") };
        assert!(lower < v && v < upper);
    }

    #[test]
    fn rows_with_missing_predictors_are_left_out() {
        let (x, y) = line_data();
        let model = fit(&x, &y, &[]).unwrap();
        let new = Table::from_columns(vec![Column::numeric_opt("x", vec![Some(1.0), None, Some(3.0)])]).unwrap();
        let preds = model
            .predict(&new, &PredictRequest { kind: PredictionType::Point, level: 0.95 })
            .unwrap();
        let rows: Vec<usize> = preds.iter().map(|(i, _)| *i).collect();
        assert_eq!(rows, vec![0, 2]);
    }

    #[test]
    fn rejects_native_arguments_and_categorical_predictors() {
        let (x, y) = line_data();
        let args = vec![("lambda".to_string(), ArgValue::Float(0.1))];
        assert!(fit(&x, &y, &args).is_err());

        let cat = Table::from_columns(vec![Column::categorical("g", ["a", "b", "a", "b", "a"])]).unwrap();
        let err = fit(&cat, &y, &[]).unwrap_err();
        assert!(err.message().contains("categorical"));
    }
}
