//! Integration tests for the specification unifier, through the public API only.

use unispec::data::{Column, Table};
use unispec::io::read_table_from_reader;
use unispec::domain::{GlanceRecord, PredValue, TidyRecord};
use unispec::engines::{EngineRequest, FittedModel, LinearModel, ModelEngine, PredictRequest, Prediction};
use unispec::registry::{DataSlot, EngineDef, FamilyDef, Interface, MainArg};
use unispec::{fit, fit_xy, ArgValue, EngineError, Mode, PredictionType, Registry, SpecError};

fn cars() -> Table {
    Table::from_columns(vec![
        Column::numeric("mpg", [21.0, 22.8, 21.4, 18.7, 18.1, 14.3, 24.4, 22.8, 19.2, 17.8]),
        Column::numeric("wt", [2.62, 2.32, 3.21, 3.44, 3.46, 3.57, 3.19, 3.15, 3.44, 3.44]),
        Column::categorical(
            "cyl",
            ["six", "four", "six", "eight", "six", "eight", "four", "four", "six", "six"],
        ),
    ])
    .unwrap()
}

/// Engine that only predicts rows with an even index, to exercise realignment.
#[derive(Debug)]
struct EvenRowsEngine;

#[derive(Debug)]
struct EvenRowsFit;

impl ModelEngine for EvenRowsEngine {
    fn fit(&self, _request: &EngineRequest<'_>) -> Result<Box<dyn FittedModel>, EngineError> {
        Ok(Box::new(EvenRowsFit))
    }
}

impl FittedModel for EvenRowsFit {
    fn predict(&self, data: &Table, _request: &PredictRequest) -> Result<Vec<(usize, Prediction)>, EngineError> {
        // Deliberately out of order.
        Ok((0..data.nrows())
            .rev()
            .filter(|i| i % 2 == 0)
            .map(|i| (i, Prediction::Value(i as f64)))
            .collect())
    }

    fn tidy(&self) -> Option<Vec<TidyRecord>> {
        None
    }

    fn glance(&self) -> GlanceRecord {
        GlanceRecord::default()
    }

    fn levels(&self) -> &[String] {
        &[]
    }
}

fn linear_model_registry() -> Registry {
    let mut reg = Registry::new();
    reg.register_family(
        FamilyDef::new("linear_model", "Linear Model")
            .arg(MainArg::new("penalty", unispec::domain::Constraint::NonNegative))
            .arg(MainArg::new("mixture", unispec::domain::Constraint::UnitInterval))
            .modes(&[Mode::Regression]),
    )
    .unwrap();
    reg.register_engine(
        "linear_model",
        EngineDef::new("ordinary_least_squares", LinearModel)
            .modes(&[Mode::Regression])
            .data_arg(DataSlot::Formula, "formula")
            .data_arg(DataSlot::Data, "data"),
    )
    .unwrap();
    reg.register_engine(
        "linear_model",
        EngineDef::new("regularized", unispec::engines::ElasticNet)
            .modes(&[Mode::Regression])
            .interface(Interface::Matrix)
            .data_arg(DataSlot::X, "x")
            .data_arg(DataSlot::Y, "y")
            .map_arg("penalty", "lambda")
            .map_arg("mixture", "alpha"),
    )
    .unwrap();
    reg.register_engine(
        "linear_model",
        EngineDef::new("even_rows", EvenRowsEngine).modes(&[Mode::Regression]),
    )
    .unwrap();
    reg
}

#[test]
fn test_linear_model_scenario() {
    let reg = linear_model_registry();
    let base = reg.create_specification("linear_model", Mode::Unspecified).unwrap();
    assert_eq!(base.mode(), Mode::Regression);

    let ols = reg.with_engine(&base, "ordinary_least_squares").unwrap();
    assert!(reg.translate(&ols).unwrap().is_empty());

    let penalized = reg.with_engine(&base, "regularized").unwrap();
    let penalized = reg.with_argument(&penalized, "penalty", 0.1).unwrap();
    assert_eq!(
        reg.translate(&penalized).unwrap(),
        vec![("lambda".to_string(), ArgValue::Float(0.1))]
    );

    // Same argument on the engine that does not expose it is surfaced.
    let ols_penalized = reg.with_argument(&ols, "penalty", 0.1).unwrap();
    assert!(matches!(
        reg.translate(&ols_penalized),
        Err(SpecError::UnsupportedArgument { ref argument, .. }) if argument == "penalty"
    ));

    // The base specification never saw any of this.
    assert!(base.args().is_empty());
    assert_eq!(base.engine(), None);
}

#[test]
fn test_translate_is_idempotent_and_ordered() {
    let reg = Registry::standard().unwrap();
    let spec = reg.create_specification("linear_reg", Mode::Regression).unwrap();
    let spec = reg.with_engine(&spec, "glmnet").unwrap();
    let spec = reg.with_argument(&spec, "standardize", false).unwrap();
    let spec = reg.with_argument(&spec, "mixture", 0.25).unwrap();
    let spec = reg.with_argument(&spec, "penalty", 2.0).unwrap();

    let first = reg.translate(&spec).unwrap();
    let names: Vec<&str> = first.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["lambda", "alpha", "standardize"]);
    assert_eq!(reg.translate(&spec).unwrap(), first);
}

#[test]
fn test_fit_without_engine_is_incomplete() {
    let reg = Registry::standard().unwrap();
    let spec = reg.create_specification("linear_reg", Mode::Regression).unwrap();
    let err = fit(&reg, &spec, &cars(), "mpg ~ wt").unwrap_err();
    assert!(matches!(err, SpecError::IncompleteSpecification { .. }));
}

#[test]
fn test_formula_expands_factor_but_xy_does_not() {
    let reg = Registry::standard().unwrap();
    let spec = reg.create_specification("linear_reg", Mode::Regression).unwrap();
    let spec = reg.with_engine(&spec, "lm").unwrap();
    let data = cars();

    // Three levels with an intercept: two indicators.
    let with_intercept = fit(&reg, &spec, &data, "mpg ~ wt + cyl").unwrap();
    let terms: Vec<String> = with_intercept.tidy().unwrap().into_iter().map(|r| r.term).collect();
    assert_eq!(terms, ["(Intercept)", "wt", "cylfour", "cylsix"]);

    // Without an intercept: one indicator per level.
    let without = fit(&reg, &spec, &data, "mpg ~ cyl - 1").unwrap();
    let terms: Vec<String> = without.tidy().unwrap().into_iter().map(|r| r.term).collect();
    assert_eq!(terms, ["cyleight", "cylfour", "cylsix"]);

    let x = data.select(&["wt", "cyl"]).unwrap();
    let y = data.require("mpg").unwrap();
    let err = fit_xy(&reg, &spec, &x, y).unwrap_err();
    assert!(matches!(err, SpecError::Engine { ref engine, .. } if engine == "lm"));
}

#[test]
fn test_predict_keeps_one_row_per_input_row() {
    let reg = Registry::standard().unwrap();
    let spec = reg.create_specification("linear_reg", Mode::Regression).unwrap();
    let spec = reg.with_engine(&spec, "lm").unwrap();
    let fitted = fit(&reg, &spec, &cars(), "mpg ~ wt + cyl").unwrap();

    let new = Table::from_columns(vec![
        Column::numeric_opt("wt", vec![Some(2.5), None, Some(3.5), Some(3.0)]),
        Column::categorical_opt(
            "cyl",
            vec![
                Some("four".into()),
                Some("six".into()),
                Some("eight".into()),
                Some("twelve".into()),
            ],
        ),
    ])
    .unwrap();

    let frame = fitted.predict(&new, PredictionType::Point).unwrap();
    assert_eq!(frame.len(), 4);
    assert_eq!(frame.columns, [".pred"]);
    // Missing `wt` and an unseen level both leave the row absent.
    assert!(frame.rows[0][0].is_some());
    assert!(frame.rows[1][0].is_none());
    assert!(frame.rows[2][0].is_some());
    assert!(frame.rows[3][0].is_none());

    let intervals = fitted.predict(&new, PredictionType::Interval).unwrap();
    assert_eq!(intervals.columns, [".pred_lower", ".pred_upper"]);
    assert_eq!(intervals.len(), 4);
}

#[test]
fn test_engine_subset_predictions_are_realigned() {
    let reg = linear_model_registry();
    let spec = reg.create_specification("linear_model", Mode::Regression).unwrap();
    let spec = reg.with_engine(&spec, "even_rows").unwrap();
    let data = cars().select(&["mpg", "wt"]).unwrap();
    let fitted = fit(&reg, &spec, &data, "mpg ~ wt").unwrap();

    let frame = fitted.predict(&data, PredictionType::Point).unwrap();
    assert_eq!(frame.len(), data.nrows());
    for (i, row) in frame.rows.iter().enumerate() {
        if i % 2 == 0 {
            assert_eq!(row[0], Some(PredValue::Number(i as f64)));
        } else {
            assert_eq!(row[0], None);
        }
    }
    assert!(matches!(fitted.tidy(), Err(SpecError::TidyUnavailable { .. })));
}

#[test]
fn test_unsupported_prediction_type_is_rejected_before_engine() {
    let reg = Registry::standard().unwrap();
    let spec = reg.create_specification("linear_reg", Mode::Regression).unwrap();
    let spec = reg.with_engine(&spec, "glmnet").unwrap();
    let fitted = fit(&reg, &spec, &cars(), "mpg ~ wt").unwrap();
    assert!(matches!(
        fitted.predict(&cars(), PredictionType::Interval),
        Err(SpecError::UnsupportedPredictionType { .. })
    ));
}

#[test]
fn test_classification_probabilities_use_level_columns() {
    let reg = Registry::standard().unwrap();
    let spec = reg.create_specification("nearest_neighbor", Mode::Classification).unwrap();
    let spec = reg.with_engine(&spec, "kknn").unwrap();
    let spec = reg.with_argument(&spec, "neighbors", 3i64).unwrap();
    let data = cars();

    let fitted = fit(&reg, &spec, &data, "cyl ~ wt + mpg").unwrap();
    assert_eq!(fitted.call(), "kknn(train = x, y = y, k = 3)");
    let frame = fitted.predict(&data, PredictionType::Probability).unwrap();
    assert_eq!(frame.columns, [".pred_eight", ".pred_four", ".pred_six"]);
    for row in &frame.rows {
        let total: f64 = row
            .iter()
            .map(|c| match c {
                Some(PredValue::Number(v)) => *v,
                _ => panic!("expected a probability"),
            })
            .sum();
        assert!((total - 1.0).abs() < 1e-12);
    }
}

fn response_for(mode: Mode) -> Column {
    match mode {
        Mode::Classification => Column::categorical(
            "y",
            ["no", "no", "yes", "no", "no", "yes", "no", "yes", "yes", "no", "yes", "yes"],
        ),
        _ => Column::numeric("y", [2.3, 3.9, 6.4, 7.8, 10.1, 12.2, 13.8, 16.3, 17.9, 20.2, 22.1, 23.7]),
    }
}

#[test]
fn test_every_standard_engine_translates_nothing_by_default() {
    let reg = Registry::standard().unwrap();
    for family in reg.families() {
        for engine in reg.engines(&family.id).unwrap() {
            for &mode in engine.supported_modes() {
                let spec = reg.create_specification(&family.id, mode).unwrap();
                let spec = reg.with_engine(&spec, engine.id()).unwrap();
                assert!(
                    reg.translate(&spec).unwrap().is_empty(),
                    "{}/{} in {mode}",
                    family.id,
                    engine.id()
                );
            }
        }
    }
}

#[test]
fn test_every_standard_engine_keeps_rows_with_missing_predictors() {
    let reg = Registry::standard().unwrap();
    let x = Column::numeric("x", (1..=12).map(f64::from));
    let new = Table::from_columns(vec![Column::numeric_opt(
        "x",
        vec![Some(2.5), Some(6.0), None, Some(11.0)],
    )])
    .unwrap();
    let kinds = [PredictionType::Point, PredictionType::Probability, PredictionType::Interval];

    for family in reg.families() {
        for engine in reg.engines(&family.id).unwrap() {
            for &mode in engine.supported_modes() {
                let spec = reg.create_specification(&family.id, mode).unwrap();
                let spec = reg.with_engine(&spec, engine.id()).unwrap();
                let train = Table::from_columns(vec![response_for(mode), x.clone()]).unwrap();
                let fitted = fit(&reg, &spec, &train, "y ~ x").unwrap();

                for kind in kinds.into_iter().filter(|&k| engine.supports_prediction(mode, k)) {
                    let label = format!("{}/{} {mode} {kind}", family.id, engine.id());
                    let frame = fitted.predict(&new, kind).unwrap();
                    assert_eq!(frame.len(), 4, "{label}");
                    for (i, row) in frame.rows.iter().enumerate() {
                        if i == 2 {
                            assert!(row.iter().all(Option::is_none), "{label}: row {i}");
                        } else {
                            assert!(row.iter().all(Option::is_some), "{label}: row {i}");
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn test_prediction_csv_with_only_missing_cells_keeps_its_rows() {
    let reg = Registry::standard().unwrap();
    let spec = reg.create_specification("linear_reg", Mode::Regression).unwrap();
    let spec = reg.with_engine(&spec, "lm").unwrap();
    let data = cars();
    // Every cell is `NA`, so the column is read without a numeric type.
    let new = read_table_from_reader("wt\nNA\nNA\n".as_bytes()).unwrap();

    let formula_fit = fit(&reg, &spec, &data, "mpg ~ wt").unwrap();
    let frame = formula_fit.predict(&new, PredictionType::Point).unwrap();
    assert_eq!(frame.len(), 2);
    assert!(frame.rows.iter().all(|row| row[0].is_none()));

    let x = data.select(&["wt"]).unwrap();
    let xy_fit = fit_xy(&reg, &spec, &x, data.require("mpg").unwrap()).unwrap();
    let frame = xy_fit.predict(&new, PredictionType::Point).unwrap();
    assert_eq!(frame.len(), 2);
    assert!(frame.rows.iter().all(|row| row[0].is_none()));
}
