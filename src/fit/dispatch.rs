//! Fit dispatch: resolve a specification against the registry, prepare the
//! data for the chosen path, and call the engine.
//!
//! Every check that can fail without running the engine (engine bound, mode
//! resolved, arguments translatable, formula valid, response type) happens
//! before the engine is called.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::data::{parse_formula, Column, FormulaBlueprint, Table};
use crate::domain::{ArgValue, GlanceRecord, Mode, ModelSpecification, TidyRecord};
use crate::engines::{EngineRequest, FittedModel};
use crate::error::{EngineError, SpecError};
use crate::registry::{DataSlot, EngineDef, Interface, Registry};

/// What a fit remembers to prepare new data the same way as the training data.
#[derive(Debug, Clone, PartialEq)]
pub enum Blueprint {
    /// Formula path: terms and learned factor levels.
    Formula(FormulaBlueprint),
    /// Pre-separated path: predictor columns, in training order.
    Xy { predictors: Vec<String> },
}

/// A fitted model together with the specification and context it came from.
#[derive(Debug)]
pub struct FitResult {
    pub(crate) spec: ModelSpecification,
    pub(crate) engine: EngineDef,
    pub(crate) mode: Mode,
    pub(crate) args: Vec<(String, ArgValue)>,
    pub(crate) blueprint: Blueprint,
    pub(crate) model: Box<dyn FittedModel>,
    call: String,
    fitted_at: DateTime<Utc>,
    elapsed: Duration,
}

impl FitResult {
    pub fn spec(&self) -> &ModelSpecification {
        &self.spec
    }

    pub fn engine_id(&self) -> &str {
        self.engine.id()
    }

    /// Resolved mode (never `Unspecified`).
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Native arguments passed to the engine.
    pub fn args(&self) -> &[(String, ArgValue)] {
        &self.args
    }

    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    pub fn model(&self) -> &dyn FittedModel {
        self.model.as_ref()
    }

    /// Class levels of a classification fit.
    pub fn levels(&self) -> &[String] {
        self.model.levels()
    }

    /// Rendered engine call, e.g. `glmnet(x = x, y = y, lambda = 0.1)`.
    pub fn call(&self) -> &str {
        &self.call
    }

    pub fn fitted_at(&self) -> DateTime<Utc> {
        self.fitted_at
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn tidy(&self) -> Result<Vec<TidyRecord>, SpecError> {
        self.model.tidy().ok_or_else(|| SpecError::TidyUnavailable {
            family: self.spec.family().to_string(),
            engine: self.engine.id().to_string(),
        })
    }

    pub fn glance(&self) -> GlanceRecord {
        self.model.glance()
    }

    pub(crate) fn engine_error(&self, source: EngineError) -> SpecError {
        wrap_engine_error(&self.spec, self.engine.id(), self.mode, &self.call, source)
    }
}

fn wrap_engine_error(
    spec: &ModelSpecification,
    engine: &str,
    mode: Mode,
    call: &str,
    source: EngineError,
) -> SpecError {
    SpecError::Engine {
        family: spec.family().to_string(),
        engine: engine.to_string(),
        mode,
        call: call.to_string(),
        source,
    }
}

/// Engine, resolved mode and translated arguments for a specification.
struct Resolved {
    engine: EngineDef,
    mode: Mode,
    args: Vec<(String, ArgValue)>,
}

fn resolve(registry: &Registry, spec: &ModelSpecification) -> Result<Resolved, SpecError> {
    let Some(engine_id) = spec.engine() else {
        return Err(SpecError::IncompleteSpecification {
            family: spec.family().to_string(),
            missing: "no engine has been set".to_string(),
        });
    };
    let engine = registry.engine(spec.family(), engine_id)?.clone();

    let mode = match (spec.mode(), engine.supported_modes()) {
        (Mode::Unspecified, [only]) => *only,
        (Mode::Unspecified, _) => {
            return Err(SpecError::IncompleteSpecification {
                family: spec.family().to_string(),
                missing: format!("mode is unspecified and engine `{engine_id}` supports several modes"),
            });
        }
        (mode, _) if !engine.supports_mode(mode) => {
            return Err(SpecError::ModeMismatch {
                family: spec.family().to_string(),
                engine: engine_id.to_string(),
                mode,
            });
        }
        (mode, _) => mode,
    };

    let args = registry.translate(spec)?;
    Ok(Resolved { engine, mode, args })
}

fn check_response(mode: Mode, response: &Column) -> Result<(), SpecError> {
    match (mode, response.data.is_numeric()) {
        (Mode::Regression, false) => Err(SpecError::Data(format!(
            "regression needs a numeric response, `{}` is {}",
            response.name,
            response.data.kind_name()
        ))),
        (Mode::Classification, true) => Err(SpecError::Data(format!(
            "classification needs a categorical response, `{}` is {}",
            response.name,
            response.data.kind_name()
        ))),
        _ => Ok(()),
    }
}

fn render_args(args: &[(String, ArgValue)]) -> String {
    args.iter()
        .map(|(name, value)| format!(", {name} = {value}"))
        .collect()
}

/// Render the native call the way the engine would be invoked directly.
fn render_call(engine: &EngineDef, formula: &str, args: &[(String, ArgValue)]) -> String {
    let head = match engine.get_interface() {
        Interface::Formula => format!(
            "{} = {formula}, {} = data",
            engine.data_arg_name(DataSlot::Formula),
            engine.data_arg_name(DataSlot::Data)
        ),
        Interface::Matrix => format!(
            "{} = x, {} = y",
            engine.data_arg_name(DataSlot::X),
            engine.data_arg_name(DataSlot::Y)
        ),
    };
    format!("{}({head}{})", engine.id(), render_args(args))
}

fn run_engine(
    spec: &ModelSpecification,
    resolved: Resolved,
    predictors: &Table,
    response: &Column,
    intercept: bool,
    blueprint: Blueprint,
    call: String,
) -> Result<FitResult, SpecError> {
    let fitted_at = Utc::now();
    let started = Instant::now();
    let request = EngineRequest {
        mode: resolved.mode,
        args: &resolved.args,
        predictors,
        response,
        intercept,
    };
    debug!("calling {call}");
    let model = resolved
        .engine
        .entry()
        .fit(&request)
        .map_err(|e| wrap_engine_error(spec, resolved.engine.id(), resolved.mode, &call, e))?;
    let elapsed = started.elapsed();
    info!(
        "fitted {} with engine `{}` ({}) on {} rows in {:.1} ms",
        spec.family(),
        resolved.engine.id(),
        resolved.mode,
        predictors.nrows(),
        elapsed.as_secs_f64() * 1e3
    );

    Ok(FitResult {
        spec: spec.clone(),
        engine: resolved.engine,
        mode: resolved.mode,
        args: resolved.args,
        blueprint,
        model,
        call,
        fitted_at,
        elapsed,
    })
}

/// Formula path: categorical predictors are expanded into indicator columns
/// before the engine sees them.
pub fn fit(
    registry: &Registry,
    spec: &ModelSpecification,
    data: &Table,
    formula: &str,
) -> Result<FitResult, SpecError> {
    let resolved = resolve(registry, spec)?;
    let parsed = parse_formula(formula)?;
    let blueprint = FormulaBlueprint::learn(&parsed, data)?;
    let response = data.require(&blueprint.response)?;
    check_response(resolved.mode, response)?;
    let predictors = blueprint.design(data)?;

    let call = render_call(&resolved.engine, &parsed.text, &resolved.args);
    let intercept = blueprint.intercept;
    run_engine(
        spec,
        resolved,
        &predictors,
        response,
        intercept,
        Blueprint::Formula(blueprint),
        call,
    )
}

/// Pre-separated path: `x` reaches the engine unchanged.
pub fn fit_xy(registry: &Registry, spec: &ModelSpecification, x: &Table, y: &Column) -> Result<FitResult, SpecError> {
    let resolved = resolve(registry, spec)?;
    if x.nrows() != y.data.len() {
        return Err(SpecError::Data(format!(
            "x has {} rows but y has {}",
            x.nrows(),
            y.data.len()
        )));
    }
    check_response(resolved.mode, y)?;

    let call = render_call(&resolved.engine, &format!("{} ~ .", y.name), &resolved.args);
    let blueprint = Blueprint::Xy {
        predictors: x.names().into_iter().map(str::to_string).collect(),
    };
    run_engine(spec, resolved, x, y, true, blueprint, call)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cars() -> Table {
        Table::from_columns(vec![
            Column::numeric("mpg", [21.0, 22.8, 21.4, 18.7, 18.1, 14.3, 24.4, 22.8]),
            Column::numeric("wt", [2.62, 2.32, 3.21, 3.44, 3.46, 3.57, 3.19, 3.15]),
            Column::categorical("cyl", ["six", "four", "six", "eight", "six", "eight", "four", "four"]),
        ])
        .unwrap()
    }

    fn lm_spec(reg: &Registry) -> ModelSpecification {
        let spec = reg.create_specification("linear_reg", Mode::Unspecified).unwrap();
        reg.with_engine(&spec, "lm").unwrap()
    }

    #[test]
    fn formula_fit_expands_categorical_predictors() {
        let reg = Registry::standard().unwrap();
        let fit = fit(&reg, &lm_spec(&reg), &cars(), "mpg ~ wt + cyl").unwrap();
        let terms: Vec<String> = fit.tidy().unwrap().into_iter().map(|r| r.term).collect();
        assert_eq!(terms, ["(Intercept)", "wt", "cylfour", "cylsix"]);
        assert_eq!(fit.call(), "lm(formula = mpg ~ wt + cyl, data = data)");
        assert_eq!(fit.mode(), Mode::Regression);
    }

    #[test]
    fn xy_fit_surfaces_engine_error_for_categorical_predictor() {
        let reg = Registry::standard().unwrap();
        let data = cars();
        let x = data.select(&["wt", "cyl"]).unwrap();
        let y = data.require("mpg").unwrap();
        let err = fit_xy(&reg, &lm_spec(&reg), &x, y).unwrap_err();
        match err {
            SpecError::Engine {
                family,
                engine,
                mode,
                call,
                ..
            } => {
                assert_eq!(family, "linear_reg");
                assert_eq!(engine, "lm");
                assert_eq!(mode, Mode::Regression);
                assert_eq!(call, "lm(formula = mpg ~ ., data = data)");
            }
            other => panic!("expected engine error, got {other:?}"),
        }
    }

    #[test]
    fn missing_engine_is_incomplete() {
        let reg = Registry::standard().unwrap();
        let spec = reg.create_specification("linear_reg", Mode::Regression).unwrap();
        assert!(matches!(
            fit(&reg, &spec, &cars(), "mpg ~ wt"),
            Err(SpecError::IncompleteSpecification { .. })
        ));
    }

    #[test]
    fn multi_mode_engine_needs_a_mode() {
        let reg = Registry::standard().unwrap();
        let spec = reg.create_specification("nearest_neighbor", Mode::Unspecified).unwrap();
        let spec = reg.with_engine(&spec, "kknn").unwrap();
        assert!(matches!(
            fit(&reg, &spec, &cars(), "mpg ~ wt"),
            Err(SpecError::IncompleteSpecification { .. })
        ));
    }

    #[test]
    fn response_type_must_match_mode() {
        let reg = Registry::standard().unwrap();
        let spec = reg.create_specification("nearest_neighbor", Mode::Classification).unwrap();
        let spec = reg.with_engine(&spec, "kknn").unwrap();
        assert!(matches!(
            fit(&reg, &spec, &cars(), "mpg ~ wt"),
            Err(SpecError::Data(_))
        ));
    }

    #[test]
    fn matrix_engine_call_shows_native_arguments() {
        let reg = Registry::standard().unwrap();
        let spec = reg.create_specification("linear_reg", Mode::Regression).unwrap();
        let spec = reg.with_engine(&spec, "glmnet").unwrap();
        let spec = reg.with_argument(&spec, "penalty", 0.1).unwrap();
        let fit = fit(&reg, &spec, &cars(), "mpg ~ wt").unwrap();
        assert_eq!(fit.call(), "glmnet(x = x, y = y, lambda = 0.1)");
        assert_eq!(fit.args(), [("lambda".to_string(), ArgValue::Float(0.1))]);
    }

    #[test]
    fn unknown_pass_through_argument_fails_in_engine() {
        let reg = Registry::standard().unwrap();
        let spec = lm_spec(&reg);
        let spec = reg.with_argument(&spec, "weights_typo", 1i64).unwrap();
        assert!(matches!(
            fit(&reg, &spec, &cars(), "mpg ~ wt"),
            Err(SpecError::Engine { .. })
        ));
    }
}
