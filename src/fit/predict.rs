//! Row-preserving prediction.
//!
//! Engines may skip rows they cannot predict and return the rest tagged with
//! their input index. The frame handed back to callers always has one row per
//! input row, in input order, with `None` in the cells of skipped rows.

use log::warn;

use crate::data::Table;
use crate::domain::{Mode, PredValue, PredictionFrame, PredictionType};
use crate::engines::{PredictRequest, Prediction};
use crate::error::{EngineError, SpecError};
use crate::fit::dispatch::{Blueprint, FitResult};

/// Options for `FitResult::predict_with`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictOptions {
    /// Coverage of interval predictions.
    pub level: f64,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self { level: 0.95 }
    }
}

/// Output column names for a prediction type.
pub fn prediction_columns(mode: Mode, kind: PredictionType, levels: &[String]) -> Vec<String> {
    match (mode, kind) {
        (Mode::Classification, PredictionType::Point) => vec![".pred_class".to_string()],
        (_, PredictionType::Probability) => levels.iter().map(|l| format!(".pred_{l}")).collect(),
        (_, PredictionType::Interval) => vec![".pred_lower".to_string(), ".pred_upper".to_string()],
        (_, PredictionType::Point) => vec![".pred".to_string()],
    }
}

/// Cells of one row, or `None` if the engine returned the wrong shape.
fn cells(kind: PredictionType, width: usize, prediction: Prediction) -> Option<Vec<Option<PredValue>>> {
    let values = match (kind, prediction) {
        (PredictionType::Point, Prediction::Value(v)) => vec![PredValue::Number(v)],
        (PredictionType::Point, Prediction::Class(c)) => vec![PredValue::Class(c)],
        (PredictionType::Probability, Prediction::Probabilities(p)) => {
            p.into_iter().map(PredValue::Number).collect()
        }
        (PredictionType::Interval, Prediction::Interval { lower, upper }) => {
            vec![PredValue::Number(lower), PredValue::Number(upper)]
        }
        _ => return None,
    };
    (values.len() == width).then(|| values.into_iter().map(Some).collect())
}

/// Place engine output into an `n`-row frame.
pub(crate) fn realign(
    n: usize,
    kind: PredictionType,
    columns: Vec<String>,
    raw: Vec<(usize, Prediction)>,
) -> Result<PredictionFrame, EngineError> {
    let width = columns.len();
    let mut rows: Vec<Option<Vec<Option<PredValue>>>> = vec![None; n];

    for (index, prediction) in raw {
        let slot = rows.get_mut(index).ok_or_else(|| {
            EngineError::new(format!("returned row index {index} for {n} input rows"))
        })?;
        if slot.is_some() {
            return Err(EngineError::new(format!("returned row index {index} twice")));
        }
        let row = cells(kind, width, prediction).ok_or_else(|| {
            EngineError::new(format!(
                "returned a prediction for row {index} that does not fit columns {columns:?}"
            ))
        })?;
        *slot = Some(row);
    }

    Ok(PredictionFrame {
        kind,
        rows: rows
            .into_iter()
            .map(|r| r.unwrap_or_else(|| vec![None; width]))
            .collect(),
        columns,
    })
}

impl FitResult {
    /// Predict with default options.
    pub fn predict(&self, new_data: &Table, kind: PredictionType) -> Result<PredictionFrame, SpecError> {
        self.predict_with(new_data, kind, &PredictOptions::default())
    }

    pub fn predict_with(
        &self,
        new_data: &Table,
        kind: PredictionType,
        options: &PredictOptions,
    ) -> Result<PredictionFrame, SpecError> {
        if !self.engine.supports_prediction(self.mode, kind) {
            return Err(SpecError::UnsupportedPredictionType {
                family: self.spec.family().to_string(),
                engine: self.engine.id().to_string(),
                mode: self.mode,
                kind,
            });
        }
        if !(options.level > 0.0 && options.level < 1.0) {
            return Err(SpecError::Data(format!(
                "interval level must be in (0, 1), got {}",
                options.level
            )));
        }

        let prepared = match &self.blueprint {
            Blueprint::Formula(bp) => bp.design(new_data)?,
            Blueprint::Xy { predictors } => new_data.select(predictors)?,
        };
        let n = new_data.nrows();
        let request = PredictRequest {
            kind,
            level: options.level,
        };
        let raw = self
            .model
            .predict(&prepared, &request)
            .map_err(|e| self.engine_error(e))?;

        let columns = prediction_columns(self.mode, kind, self.model.levels());
        let frame = realign(n, kind, columns, raw).map_err(|e| self.engine_error(e))?;
        let absent = frame.absent_rows();
        if absent > 0 {
            warn!(
                "{} of {n} rows have no {kind} prediction from engine `{}`",
                absent,
                self.engine.id()
            );
        }
        Ok(frame)
    }
}
