//! Formula parsing and model-frame preparation.
//!
//! Formulas look like `mpg ~ wt + C(cyl)` or `mpg ~ . - 1`:
//!
//! - `.` expands to every column except the response
//! - `C(x)` treats `x` as categorical even when it is numeric
//! - `- 1` or `0` in any position drop the intercept (`-1 + x`, `x + 0`)
//!
//! Preparing data through a formula expands every categorical predictor into
//! indicator columns (treatment coding). With an intercept the first level is
//! the baseline and gets no column (`k - 1` indicators); without one every
//! level gets a column (`k` indicators). The learned levels are kept in a
//! `FormulaBlueprint` so new data is encoded exactly like the training data.

use std::collections::HashSet;

use crate::data::frame::{Column, Table};
use crate::error::SpecError;

/// Parsed formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub text: String,
    pub response: String,
    /// Explicit terms, in order of appearance.
    pub terms: Vec<String>,
    /// Whether `.` appeared on the right-hand side.
    pub dot: bool,
    pub intercept: bool,
    /// Terms wrapped in `C(...)`.
    pub forced_categorical: HashSet<String>,
}

/// Split formula RHS by `+` and `-`, respecting parentheses. Each term is
/// tagged with whether it was subtracted.
fn split_terms(rhs: &str) -> Vec<(bool, String)> {
    let mut terms = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut negated = false;

    for c in rhs.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            '+' | '-' if depth == 0 => {
                // A leading `-` has no term before it.
                let leading = terms.is_empty() && current.trim().is_empty();
                if !(leading && c == '-') {
                    terms.push((negated, current.trim().to_string()));
                }
                current.clear();
                negated = c == '-';
            }
            _ => current.push(c),
        }
    }
    terms.push((negated, current.trim().to_string()));
    terms
}

/// Parse a formula string.
pub fn parse_formula(text: &str) -> Result<Formula, SpecError> {
    let parts: Vec<&str> = text.split('~').collect();
    if parts.len() != 2 {
        return Err(SpecError::Formula(format!(
            "formula must contain exactly one `~`: `{text}`"
        )));
    }

    let response = parts[0].trim().to_string();
    if response.is_empty() {
        return Err(SpecError::Formula(format!("formula has no response: `{text}`")));
    }

    let rhs = parts[1].trim();
    let mut intercept = true;

    let mut dot = false;
    let mut terms = Vec::new();
    let mut forced_categorical = HashSet::new();

    for (negated, raw) in split_terms(rhs) {
        match raw.as_str() {
            "" => {
                return Err(SpecError::Formula(format!("empty term in formula `{text}`")));
            }
            "1" if negated => intercept = false,
            _ if negated => {
                return Err(SpecError::Formula(format!(
                    "term removal `- {raw}` is not supported; only `- 1` may be subtracted"
                )));
            }
            "0" => intercept = false,
            "1" => intercept = true,
            "." => dot = true,
            _ if raw.contains(':') || raw.contains('*') => {
                return Err(SpecError::Formula(format!(
                    "interaction term `{raw}` is not supported"
                )));
            }
            _ => {
                let name = match raw.strip_prefix("C(").and_then(|r| r.strip_suffix(')')) {
                    Some(inner) => {
                        let inner = inner.trim().to_string();
                        forced_categorical.insert(inner.clone());
                        inner
                    }
                    None => raw.clone(),
                };
                if name.is_empty() || name.contains('(') || name.contains(')') {
                    return Err(SpecError::Formula(format!("unsupported term `{raw}`")));
                }
                if !terms.contains(&name) {
                    terms.push(name);
                }
            }
        }
    }

    if !dot && terms.is_empty() && !intercept {
        return Err(SpecError::Formula(format!(
            "formula `{text}` has neither predictors nor an intercept"
        )));
    }

    Ok(Formula {
        text: text.trim().to_string(),
        response,
        terms,
        dot,
        intercept,
        forced_categorical,
    })
}

/// How a single predictor is turned into design columns.
#[derive(Debug, Clone, PartialEq)]
pub enum TermEncoding {
    /// Passed through as one numeric column.
    Numeric { column: String },
    /// Expanded into one indicator per encoded level.
    Indicators {
        column: String,
        /// All training levels, sorted; the first is the baseline when
        /// `drop_first` is set.
        levels: Vec<String>,
        drop_first: bool,
    },
}

impl TermEncoding {
    pub fn column(&self) -> &str {
        match self {
            TermEncoding::Numeric { column } | TermEncoding::Indicators { column, .. } => column,
        }
    }

    /// Names of the design columns this term produces.
    pub fn design_names(&self) -> Vec<String> {
        match self {
            TermEncoding::Numeric { column } => vec![column.clone()],
            TermEncoding::Indicators {
                column,
                levels,
                drop_first,
            } => levels
                .iter()
                .skip(usize::from(*drop_first))
                .map(|l| format!("{column}{l}"))
                .collect(),
        }
    }
}

/// Everything needed to turn a raw table into the numeric frame an engine sees.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaBlueprint {
    pub formula: String,
    pub response: String,
    pub intercept: bool,
    pub terms: Vec<TermEncoding>,
}

impl FormulaBlueprint {
    /// Learn term encodings from training data.
    pub fn learn(formula: &Formula, data: &Table) -> Result<Self, SpecError> {
        if data.column(&formula.response).is_none() {
            return Err(SpecError::Formula(format!(
                "response `{}` is not a column of the data",
                formula.response
            )));
        }

        let mut names: Vec<String> = Vec::new();
        if formula.dot {
            names.extend(
                data.names()
                    .into_iter()
                    .filter(|n| *n != formula.response)
                    .map(str::to_string),
            );
        }
        for t in &formula.terms {
            if *t == formula.response {
                return Err(SpecError::Formula(format!(
                    "response `{t}` also appears as a predictor"
                )));
            }
            if !names.contains(t) {
                names.push(t.clone());
            }
        }

        let mut terms = Vec::with_capacity(names.len());
        for name in names {
            let column = data.column(&name).ok_or_else(|| {
                SpecError::Formula(format!("term `{name}` is not a column of the data"))
            })?;
            let categorical =
                !column.data.is_numeric() || formula.forced_categorical.contains(&name);
            if categorical {
                let levels = column.data.levels();
                if levels.is_empty() {
                    return Err(SpecError::Data(format!(
                        "categorical column `{name}` has no observed levels"
                    )));
                }
                terms.push(TermEncoding::Indicators {
                    column: name,
                    levels,
                    drop_first: formula.intercept,
                });
            } else {
                terms.push(TermEncoding::Numeric { column: name });
            }
        }

        Ok(Self {
            formula: formula.text.clone(),
            response: formula.response.clone(),
            intercept: formula.intercept,
            terms,
        })
    }

    pub fn design_names(&self) -> Vec<String> {
        self.terms.iter().flat_map(TermEncoding::design_names).collect()
    }

    /// Build the numeric predictor frame. Missing cells and levels that were
    /// not seen in training become missing values; no row is removed.
    pub fn design(&self, data: &Table) -> Result<Table, SpecError> {
        let mut out = Table::new();
        for term in &self.terms {
            let column = data.require(term.column())?;
            match term {
                TermEncoding::Numeric { column: name } => {
                    let Some(values) = column.data.to_numeric() else {
                        return Err(SpecError::Data(format!(
                            "column `{name}` was numeric in training but is {} here",
                            column.data.kind_name()
                        )));
                    };
                    out.push(Column::numeric_opt(name.clone(), values))?;
                }
                TermEncoding::Indicators {
                    column: name,
                    levels,
                    drop_first,
                } => {
                    let labels = column.data.labels();
                    for level in levels.iter().skip(usize::from(*drop_first)) {
                        let values: Vec<Option<f64>> = labels
                            .iter()
                            .map(|cell| match cell {
                                Some(v) if levels.contains(v) => {
                                    Some(if v == level { 1.0 } else { 0.0 })
                                }
                                _ => None,
                            })
                            .collect();
                        out.push(Column::numeric_opt(format!("{name}{level}"), values))?;
                    }
                }
            }
        }
        // Intercept-only models still need the row count.
        if out.ncols() == 0 {
            return data.select::<&str>(&[]);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cars() -> Table {
        Table::from_columns(vec![
            Column::numeric("mpg", [21.0, 22.8, 18.7, 18.1]),
            Column::numeric("wt", [2.62, 2.32, 3.44, 3.46]),
            Column::categorical("cyl", ["six", "four", "eight", "six"]),
        ])
        .unwrap()
    }

    #[test]
    fn parse_simple_formula() {
        let f = parse_formula("mpg ~ wt + cyl").unwrap();
        assert_eq!(f.response, "mpg");
        assert_eq!(f.terms, vec!["wt", "cyl"]);
        assert!(f.intercept);
        assert!(!f.dot);
    }

    #[test]
    fn parse_no_intercept_variants() {
        assert!(!parse_formula("y ~ x - 1").unwrap().intercept);
        assert!(!parse_formula("y ~ 0 + x").unwrap().intercept);
        assert!(!parse_formula("y ~ x + 0").unwrap().intercept);

        let leading = parse_formula("y ~ -1 + x + z").unwrap();
        assert!(!leading.intercept);
        assert_eq!(leading.terms, vec!["x", "z"]);
        let middle = parse_formula("y ~ x - 1 + z").unwrap();
        assert!(!middle.intercept);
        assert_eq!(middle.terms, vec!["x", "z"]);
    }

    #[test]
    fn only_the_intercept_can_be_subtracted() {
        assert!(matches!(parse_formula("y ~ . - wt"), Err(SpecError::Formula(_))));
        assert!(matches!(parse_formula("y ~ x -"), Err(SpecError::Formula(_))));
    }

    #[test]
    fn parse_forced_categorical() {
        let f = parse_formula("y ~ C(gear) + wt").unwrap();
        assert_eq!(f.terms, vec!["gear", "wt"]);
        assert!(f.forced_categorical.contains("gear"));
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(matches!(parse_formula("y x"), Err(SpecError::Formula(_))));
        assert!(matches!(parse_formula(" ~ x"), Err(SpecError::Formula(_))));
        assert!(matches!(parse_formula("y ~ a:b"), Err(SpecError::Formula(_))));
        assert!(matches!(parse_formula("y ~ a + + b"), Err(SpecError::Formula(_))));
    }

    #[test]
    fn dot_expands_to_all_but_response() {
        let f = parse_formula("mpg ~ .").unwrap();
        let bp = FormulaBlueprint::learn(&f, &cars()).unwrap();
        assert_eq!(bp.design_names(), vec!["wt", "cylfour", "cylsix"]);
    }

    #[test]
    fn indicators_are_k_minus_one_with_intercept_and_k_without() {
        let with = FormulaBlueprint::learn(&parse_formula("mpg ~ cyl").unwrap(), &cars()).unwrap();
        assert_eq!(with.design(&cars()).unwrap().ncols(), 2);

        let without =
            FormulaBlueprint::learn(&parse_formula("mpg ~ cyl - 1").unwrap(), &cars()).unwrap();
        assert_eq!(without.design(&cars()).unwrap().ncols(), 3);
    }

    #[test]
    fn unseen_levels_become_missing() {
        let bp = FormulaBlueprint::learn(&parse_formula("mpg ~ cyl").unwrap(), &cars()).unwrap();
        let new = Table::from_columns(vec![Column::categorical("cyl", ["six", "twelve"])]).unwrap();
        let design = bp.design(&new).unwrap();
        assert_eq!(design.nrows(), 2);
        assert!(!design.row_has_missing(0));
        assert!(design.row_has_missing(1));
    }

    #[test]
    fn numeric_term_accepts_a_column_with_no_observed_cells() {
        let bp = FormulaBlueprint::learn(&parse_formula("mpg ~ wt").unwrap(), &cars()).unwrap();
        let new = Table::from_columns(vec![Column::categorical_opt("wt", vec![None, None])]).unwrap();
        let design = bp.design(&new).unwrap();
        assert_eq!(design.nrows(), 2);
        assert!(design.row_has_missing(0) && design.row_has_missing(1));

        let labelled = Table::from_columns(vec![Column::categorical("wt", ["heavy", "light"])]).unwrap();
        assert!(matches!(bp.design(&labelled), Err(SpecError::Data(_))));
    }

    #[test]
    fn unknown_term_is_a_formula_error() {
        let f = parse_formula("mpg ~ hp").unwrap();
        assert!(matches!(
            FormulaBlueprint::learn(&f, &cars()),
            Err(SpecError::Formula(_))
        ));
    }
}
