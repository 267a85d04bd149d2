//! Command-line parsing for the `unispec` binary.
//!
//! The goal of this module is to keep **argument parsing** separate from
//! command dispatch (`app`) and from the library itself.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{ArgValue, Mode, PredictionType};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "unispec", version, about = "One model specification, many fitting engines")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List registered families and engines with their argument translations.
    Engines(EnginesArgs),
    /// Show the native arguments a specification translates to.
    Translate(SpecArgs),
    /// Fit a model to a CSV file and print tidy/glance output.
    Fit(FitArgs),
    /// Walk through both fit paths and an engine swap on synthetic data.
    Demo(DemoArgs),
}

#[derive(Debug, Args, Clone)]
pub struct EnginesArgs {
    /// Only show this family.
    #[arg(long)]
    pub family: Option<String>,
}

/// What to build: family, engine, mode and arguments.
#[derive(Debug, Args, Clone)]
pub struct SpecArgs {
    /// Model family, e.g. `linear_reg`.
    #[arg(short = 'f', long)]
    pub family: String,

    /// Engine implementing the family, e.g. `glmnet`.
    #[arg(short = 'e', long)]
    pub engine: String,

    #[arg(short = 'm', long, value_enum, default_value_t = Mode::Unspecified)]
    pub mode: Mode,

    /// Argument as `name=value`; repeatable. Family arguments are validated,
    /// anything else is passed to the engine as-is.
    #[arg(short = 'a', long = "arg", value_parser = parse_arg_pair)]
    pub args: Vec<(String, ArgValue)>,
}

#[derive(Debug, Args, Clone)]
#[command(group(clap::ArgGroup::new("target").required(true).args(["formula", "response"])))]
pub struct FitArgs {
    #[command(flatten)]
    pub spec: SpecArgs,

    /// Training data CSV.
    #[arg(short = 'd', long)]
    pub data: PathBuf,

    /// Formula, e.g. `"mpg ~ wt + cyl"`. Categorical predictors are expanded.
    #[arg(long)]
    pub formula: Option<String>,

    /// Response column for the x/y path; every other column is a predictor.
    #[arg(long)]
    pub response: Option<String>,

    /// Data to predict on (defaults to the training data).
    #[arg(long)]
    pub predict: Option<PathBuf>,

    #[arg(long = "type", value_enum, default_value_t = PredictionType::Point)]
    pub kind: PredictionType,

    /// Interval coverage (overrides UNISPEC_LEVEL).
    #[arg(long)]
    pub level: Option<f64>,

    /// Decimals in printed output (overrides UNISPEC_DIGITS).
    #[arg(long)]
    pub digits: Option<usize>,

    /// Maximum prediction rows to print.
    #[arg(long, default_value_t = 20)]
    pub show: usize,

    /// Write predictions to CSV.
    #[arg(long = "export-predictions")]
    pub export_predictions: Option<PathBuf>,

    /// Write call, arguments, tidy and glance to JSON.
    #[arg(long = "export-report")]
    pub export_report: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Random seed for the synthetic dataset.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of rows to generate.
    #[arg(short = 'n', long, default_value_t = 60)]
    pub rows: usize,
}

/// Parse `name=value` into a typed argument.
pub fn parse_arg_pair(raw: &str) -> Result<(String, ArgValue), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("argument name is empty in '{raw}'"));
    }
    Ok((name.to_string(), ArgValue::parse(value.trim())))
}
