//! Shared "fit pipeline" logic used by the `fit` and `demo` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! specification -> data -> fit (formula or x/y) -> predict
//!
//! The commands can then focus on presentation.

use std::path::Path;

use crate::cli::{FitArgs, SpecArgs};
use crate::data::Table;
use crate::domain::{ArgValue, Mode, ModelSpecification, PredictionFrame, PredictionType};
use crate::error::AppError;
use crate::fit::{fit, fit_xy, FitResult, PredictOptions};
use crate::registry::Registry;

/// How the model is told what to predict from what.
#[derive(Debug, Clone, PartialEq)]
pub enum FitTarget {
    Formula(String),
    /// Pre-separated: this column is `y`, every other column is `x`.
    Response(String),
}

/// All computed outputs of a single `unispec fit` run.
#[derive(Debug)]
pub struct RunOutput {
    pub spec: ModelSpecification,
    pub fit: FitResult,
    pub predictions: PredictionFrame,
}

/// Build a specification from family, engine, mode and `name=value` pairs.
pub fn build_spec(
    registry: &Registry,
    family: &str,
    engine: &str,
    mode: Mode,
    args: &[(String, ArgValue)],
) -> Result<ModelSpecification, AppError> {
    let mut spec = registry.create_specification(family, mode)?;
    spec = registry.with_engine(&spec, engine)?;
    for (name, value) in args {
        spec = registry.with_argument(&spec, name, value.clone())?;
    }
    Ok(spec)
}

pub fn build_spec_from_args(registry: &Registry, args: &SpecArgs) -> Result<ModelSpecification, AppError> {
    build_spec(registry, &args.family, &args.engine, args.mode, &args.args)
}

/// Fit on `data` through the chosen path.
pub fn fit_target(
    registry: &Registry,
    spec: &ModelSpecification,
    data: &Table,
    target: &FitTarget,
) -> Result<FitResult, AppError> {
    let fitted = match target {
        FitTarget::Formula(formula) => fit(registry, spec, data, formula)?,
        FitTarget::Response(response) => {
            let y = data.require(response)?;
            fit_xy(registry, spec, &data.without(response), y)?
        }
    };
    Ok(fitted)
}

/// Execute the full `fit` command pipeline and return the computed outputs.
pub fn run_fit(registry: &Registry, args: &FitArgs, level: f64) -> Result<RunOutput, AppError> {
    // 1) Specification.
    let spec = build_spec_from_args(registry, &args.spec)?;

    // 2) Data.
    let data = crate::io::read_table_csv(&args.data)?;
    let target = match (&args.formula, &args.response) {
        (Some(formula), _) => FitTarget::Formula(formula.clone()),
        (None, Some(response)) => FitTarget::Response(response.clone()),
        (None, None) => return Err(AppError::new(2, "Either --formula or --response is required.")),
    };

    // 3) Fit.
    let fitted = fit_target(registry, &spec, &data, &target)?;

    // 4) Predict on new data, or on the training data.
    let new_data = match &args.predict {
        Some(path) => crate::io::read_table_csv(path)?,
        None => data,
    };
    let predictions = predict(&fitted, &new_data, args.kind, level)?;

    Ok(RunOutput {
        spec,
        fit: fitted,
        predictions,
    })
}

pub fn predict(fit: &FitResult, data: &Table, kind: PredictionType, level: f64) -> Result<PredictionFrame, AppError> {
    Ok(fit.predict_with(data, kind, &PredictOptions { level })?)
}

/// Write whichever exports were requested.
pub fn write_exports(
    output: &RunOutput,
    predictions_path: Option<&Path>,
    report_path: Option<&Path>,
) -> Result<(), AppError> {
    if let Some(path) = predictions_path {
        crate::io::write_predictions_csv(path, &output.predictions)?;
        log::info!("wrote predictions to {}", path.display());
    }
    if let Some(path) = report_path {
        crate::io::write_report_json(path, &crate::report::FitReport::from_fit(&output.fit))?;
        log::info!("wrote report to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;

    fn data() -> Table {
        Table::from_columns(vec![
            Column::numeric("y", [1.0, 2.2, 2.8, 4.1, 5.0]),
            Column::numeric("x", [1.0, 2.0, 3.0, 4.0, 5.0]),
        ])
        .unwrap()
    }

    #[test]
    fn build_spec_validates_each_step() {
        let reg = Registry::standard().unwrap();
        let args = vec![("penalty".to_string(), ArgValue::Float(-1.0))];
        let err = build_spec(&reg, "linear_reg", "glmnet", Mode::Unspecified, &args).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = build_spec(&reg, "linear_reg", "nope", Mode::Unspecified, &[]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn both_targets_fit_the_same_numeric_data() {
        let reg = Registry::standard().unwrap();
        let spec = build_spec(&reg, "linear_reg", "lm", Mode::Unspecified, &[]).unwrap();
        let a = fit_target(&reg, &spec, &data(), &FitTarget::Formula("y ~ x".into())).unwrap();
        let b = fit_target(&reg, &spec, &data(), &FitTarget::Response("y".into())).unwrap();
        let ta = a.tidy().unwrap();
        let tb = b.tidy().unwrap();
        assert!((ta[1].estimate - tb[1].estimate).abs() < 1e-12);
    }

    #[test]
    fn engine_failures_map_to_exit_code_four() {
        let reg = Registry::standard().unwrap();
        let spec = build_spec(&reg, "linear_reg", "lm", Mode::Unspecified, &[]).unwrap();
        let data = data()
            .with(Column::categorical("g", ["a", "b", "a", "b", "a"]))
            .unwrap();
        let err = fit_target(&reg, &spec, &data, &FitTarget::Response("y".into())).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
