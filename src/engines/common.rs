//! Helpers shared by the reference engines: native argument parsing,
//! complete-case selection, and numeric design matrices.

use nalgebra::{DMatrix, DVector};

use crate::data::{Column, ColumnData, Table};
use crate::domain::ArgValue;
use crate::error::EngineError;

/// Native arguments as seen by one engine.
///
/// Construction rejects names the engine does not understand, so a mistyped
/// engine-specific argument fails loudly instead of being ignored.
#[derive(Debug, Clone, Copy)]
pub struct NativeArgs<'a> {
    engine: &'static str,
    args: &'a [(String, ArgValue)],
}

impl<'a> NativeArgs<'a> {
    pub fn parse(
        engine: &'static str,
        args: &'a [(String, ArgValue)],
        known: &[&str],
    ) -> Result<Self, EngineError> {
        if let Some((name, _)) = args.iter().find(|(n, _)| !known.contains(&n.as_str())) {
            return Err(EngineError::new(format!(
                "{engine}: unused argument `{name}` (accepted: {})",
                if known.is_empty() { "none".to_string() } else { known.join(", ") }
            )));
        }
        Ok(Self { engine, args })
    }

    fn get(&self, name: &str) -> Option<&ArgValue> {
        self.args.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn invalid(&self, name: &str, value: &ArgValue, expected: &str) -> EngineError {
        EngineError::new(format!(
            "{}: argument `{name}` = {value} is invalid, expected {expected}",
            self.engine
        ))
    }

    pub fn f64_or(&self, name: &str, default: f64) -> Result<f64, EngineError> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_f64()
                .filter(|x| x.is_finite())
                .ok_or_else(|| self.invalid(name, v, "a finite number")),
        }
    }

    pub fn usize_or(&self, name: &str, default: usize) -> Result<usize, EngineError> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_i64()
                .filter(|x| *x >= 1)
                .map(|x| x as usize)
                .ok_or_else(|| self.invalid(name, v, "a positive integer")),
        }
    }

    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool, EngineError> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => v.as_bool().ok_or_else(|| self.invalid(name, v, "true or false")),
        }
    }

    pub fn text_or(&self, name: &str, default: &str) -> Result<String, EngineError> {
        match self.get(name) {
            None => Ok(default.to_string()),
            Some(v) => v
                .as_text()
                .map(str::to_string)
                .ok_or_else(|| self.invalid(name, v, "text")),
        }
    }
}

/// Fail on the first categorical predictor: the reference engines only
/// accept numeric predictors, encoding is the caller's job.
pub fn require_numeric(engine: &str, predictors: &Table) -> Result<(), EngineError> {
    match predictors.columns().iter().find(|c| !c.data.is_numeric()) {
        Some(c) => Err(EngineError::new(format!(
            "{engine}: predictor `{}` is categorical; this engine needs numeric predictors",
            c.name
        ))),
        None => Ok(()),
    }
}

/// Indices of rows with no missing predictor (and, when given, response).
pub fn complete_rows(predictors: &Table, response: Option<&Column>) -> Vec<usize> {
    (0..predictors.nrows())
        .filter(|&i| !predictors.row_has_missing(i))
        .filter(|&i| response.is_none_or(|r| !r.data.is_missing(i)))
        .collect()
}

/// Dense design matrix over the given rows, with a leading column of ones
/// when `intercept` is set. Callers must pass complete rows of a numeric table.
pub fn design_matrix(predictors: &Table, rows: &[usize], intercept: bool) -> DMatrix<f64> {
    let offset = usize::from(intercept);
    let mut x = DMatrix::<f64>::zeros(rows.len(), predictors.ncols() + offset);
    for (r, &i) in rows.iter().enumerate() {
        if intercept {
            x[(r, 0)] = 1.0;
        }
        for (j, c) in predictors.columns().iter().enumerate() {
            if let ColumnData::Numeric(values) = &c.data {
                x[(r, j + offset)] = values[i].unwrap_or(f64::NAN);
            }
        }
    }
    x
}

/// Coefficient names matching `design_matrix` columns.
pub fn coefficient_names(predictors: &Table, intercept: bool) -> Vec<String> {
    let mut names = Vec::with_capacity(predictors.ncols() + 1);
    if intercept {
        names.push("(Intercept)".to_string());
    }
    names.extend(predictors.names().into_iter().map(str::to_string));
    names
}

pub fn numeric_response(engine: &str, response: &Column, rows: &[usize]) -> Result<DVector<f64>, EngineError> {
    let ColumnData::Numeric(values) = &response.data else {
        return Err(EngineError::new(format!(
            "{engine}: response `{}` must be numeric",
            response.name
        )));
    };
    Ok(DVector::from_iterator(
        rows.len(),
        rows.iter().map(|&i| values[i].unwrap_or(f64::NAN)),
    ))
}

/// Sorted class levels and per-row level codes over the given rows.
pub fn class_response(
    engine: &str,
    response: &Column,
    rows: &[usize],
) -> Result<(Vec<String>, Vec<usize>), EngineError> {
    let ColumnData::Categorical(values) = &response.data else {
        return Err(EngineError::new(format!(
            "{engine}: response `{}` must be categorical for classification",
            response.name
        )));
    };
    let mut levels: Vec<String> = rows.iter().filter_map(|&i| values[i].clone()).collect();
    levels.sort();
    levels.dedup();

    let codes = rows
        .iter()
        .map(|&i| {
            values[i]
                .as_ref()
                .and_then(|v| levels.iter().position(|l| l == v))
                .unwrap_or(0)
        })
        .collect();
    Ok((levels, codes))
}

/// Reorder `data` to the training predictor columns.
pub fn align_columns(engine: &str, data: &Table, names: &[String]) -> Result<Table, EngineError> {
    let selected = data
        .select(names)
        .map_err(|e| EngineError::new(format!("{engine}: {e}")))?;
    if selected.ncols() == 0 {
        return Ok(selected);
    }
    let mut aligned = Table::new();
    for column in selected.columns() {
        let column = match column.data.to_numeric() {
            Some(values) => Column::numeric_opt(column.name.clone(), values),
            None => column.clone(),
        };
        aligned
            .push(column)
            .map_err(|e| EngineError::new(format!("{engine}: {e}")))?;
    }
    require_numeric(engine, &aligned)?;
    Ok(aligned)
}
