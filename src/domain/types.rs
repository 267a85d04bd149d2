//! Shared domain types.
//!
//! Values here are small, cloneable and (where they leave the process)
//! serializable, so they can be:
//!
//! - threaded through specification setters without shared state
//! - exported to JSON/CSV
//! - compared in tests

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// What kind of outcome a model predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Regression,
    Classification,
    /// Not chosen yet. Resolved at specification time when the family has a
    /// single mode, or at fit time when the engine has a single mode.
    Unspecified,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Regression => "regression",
            Mode::Classification => "classification",
            Mode::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested prediction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PredictionType {
    /// Numeric estimate (regression) or hard class label (classification).
    Point,
    /// One probability column per class level.
    Probability,
    /// Lower/upper bounds of a confidence interval for the mean.
    Interval,
}

impl PredictionType {
    pub fn as_str(self) -> &'static str {
        match self {
            PredictionType::Point => "point",
            PredictionType::Probability => "probability",
            PredictionType::Interval => "interval",
        }
    }
}

impl fmt::Display for PredictionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-supplied argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ArgValue {
    /// Parse a command-line token: integers, then floats, then booleans,
    /// anything else is text.
    pub fn parse(raw: &str) -> ArgValue {
        let raw = raw.trim();
        if let Ok(v) = raw.parse::<i64>() {
            return ArgValue::Int(v);
        }
        if let Ok(v) = raw.parse::<f64>() {
            return ArgValue::Float(v);
        }
        match raw {
            "true" | "TRUE" => ArgValue::Bool(true),
            "false" | "FALSE" => ArgValue::Bool(false),
            _ => ArgValue::Text(raw.to_string()),
        }
    }

    /// Numeric view; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Int(v) => Some(*v as f64),
            ArgValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view; floats with no fractional part are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Int(v) => Some(*v),
            ArgValue::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ArgValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Bool(v) => write!(f, "{v}"),
            ArgValue::Int(v) => write!(f, "{v}"),
            ArgValue::Float(v) => write!(f, "{v}"),
            ArgValue::Text(v) => write!(f, "\"{v}\""),
        }
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Float(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Text(value.to_string())
    }
}

/// Validity predicate attached to a generalized argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Any value.
    Any,
    /// Finite number `>= 0`.
    NonNegative,
    /// Finite number in `[0, 1]`.
    UnitInterval,
    /// Integer `>= 1`.
    PositiveInt,
    /// Boolean flag.
    Flag,
    /// One of a fixed set of text values.
    OneOf(Vec<String>),
}

impl Constraint {
    pub fn check(&self, value: &ArgValue) -> bool {
        match self {
            Constraint::Any => true,
            Constraint::NonNegative => value.as_f64().is_some_and(|v| v.is_finite() && v >= 0.0),
            Constraint::UnitInterval => value
                .as_f64()
                .is_some_and(|v| v.is_finite() && (0.0..=1.0).contains(&v)),
            Constraint::PositiveInt => value.as_i64().is_some_and(|v| v >= 1),
            Constraint::Flag => value.as_bool().is_some(),
            Constraint::OneOf(options) => value
                .as_text()
                .is_some_and(|v| options.iter().any(|o| o == v)),
        }
    }

    /// Human-readable description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Constraint::Any => "any value".to_string(),
            Constraint::NonNegative => "a non-negative number".to_string(),
            Constraint::UnitInterval => "a number in [0, 1]".to_string(),
            Constraint::PositiveInt => "a positive integer".to_string(),
            Constraint::Flag => "true or false".to_string(),
            Constraint::OneOf(options) => format!("one of {}", options.join(", ")),
        }
    }
}

/// An argument stored on a specification.
///
/// `Main` arguments belong to the family's closed, validated set and are
/// renamed per engine; `Engine` arguments are opaque and passed through as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelArg {
    Main { name: String, value: ArgValue },
    Engine { name: String, value: ArgValue },
}

impl ModelArg {
    pub fn name(&self) -> &str {
        match self {
            ModelArg::Main { name, .. } | ModelArg::Engine { name, .. } => name,
        }
    }

    pub fn value(&self) -> &ArgValue {
        match self {
            ModelArg::Main { value, .. } | ModelArg::Engine { value, .. } => value,
        }
    }

    pub fn is_main(&self) -> bool {
        matches!(self, ModelArg::Main { .. })
    }
}

/// An immutable model specification.
///
/// Built and updated only through `Registry` methods, each of which returns a
/// new value; two specifications derived from the same base never observe each
/// other's changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpecification {
    pub(crate) family: String,
    pub(crate) title: String,
    pub(crate) engine: Option<String>,
    pub(crate) mode: Mode,
    pub(crate) args: Vec<ModelArg>,
}

impl ModelSpecification {
    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn engine(&self) -> Option<&str> {
        self.engine.as_deref()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// All arguments in the order they were first set.
    pub fn args(&self) -> &[ModelArg] {
        &self.args
    }

    pub fn main_args(&self) -> impl Iterator<Item = &ModelArg> {
        self.args.iter().filter(|a| a.is_main())
    }

    pub fn engine_args(&self) -> impl Iterator<Item = &ModelArg> {
        self.args.iter().filter(|a| !a.is_main())
    }

    pub fn arg(&self, name: &str) -> Option<&ArgValue> {
        self.args.iter().find(|a| a.name() == name).map(ModelArg::value)
    }

    /// Functional update of a single argument: replace in place or append.
    pub(crate) fn with_arg(&self, arg: ModelArg) -> ModelSpecification {
        let mut next = self.clone();
        match next.args.iter_mut().find(|a| a.name() == arg.name()) {
            Some(slot) => *slot = arg,
            None => next.args.push(arg),
        }
        next
    }
}

impl fmt::Display for ModelSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} Model Specification ({})", self.title, self.mode)?;

        let main: Vec<&ModelArg> = self.main_args().collect();
        if !main.is_empty() {
            writeln!(f)?;
            writeln!(f, "Main Arguments:")?;
            for a in main {
                writeln!(f, "  {} = {}", a.name(), a.value())?;
            }
        }

        let extra: Vec<&ModelArg> = self.engine_args().collect();
        if !extra.is_empty() {
            writeln!(f)?;
            writeln!(f, "Engine-Specific Arguments:")?;
            for a in extra {
                writeln!(f, "  {} = {}", a.name(), a.value())?;
            }
        }

        if let Some(engine) = &self.engine {
            writeln!(f)?;
            write!(f, "Computational engine: {engine}")?;
        }
        Ok(())
    }
}

/// One coefficient-like row of a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidyRecord {
    pub term: String,
    pub estimate: f64,
    pub std_error: Option<f64>,
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
}

impl TidyRecord {
    pub fn estimate_only(term: impl Into<String>, estimate: f64) -> Self {
        Self {
            term: term.into(),
            estimate,
            std_error: None,
            statistic: None,
            p_value: None,
        }
    }
}

/// Single summary row of fit-quality metrics, in a fixed per-engine order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GlanceRecord {
    pub metrics: Vec<(String, f64)>,
}

impl GlanceRecord {
    pub fn push(&mut self, name: &str, value: f64) {
        self.metrics.push((name.to_string(), value));
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }
}

/// A single predicted cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredValue {
    Number(f64),
    Class(String),
}

impl fmt::Display for PredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredValue::Number(v) => write!(f, "{v}"),
            PredValue::Class(v) => f.write_str(v),
        }
    }
}

/// Predictions for a batch of observations: exactly one row per input row,
/// in input order. `None` marks a row the engine could not predict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionFrame {
    pub kind: PredictionType,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<PredValue>>>,
}

impl PredictionFrame {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<Option<&PredValue>>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r[idx].as_ref()).collect())
    }

    /// Number of rows with at least one absent value.
    pub fn absent_rows(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.iter().any(Option::is_none))
            .count()
    }
}
