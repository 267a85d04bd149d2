//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads settings and initialises logging
//! - parses CLI arguments
//! - builds the standard registry
//! - dispatches to the selected command and prints its output

use clap::Parser;

use crate::cli::{Cli, Command, DemoArgs, EnginesArgs, FitArgs, SpecArgs};
use crate::config::Settings;
use crate::data::{generate_demo, DemoConfig};
use crate::domain::{ArgValue, Mode, PredictionType};
use crate::error::AppError;
use crate::registry::Registry;
use crate::report;

pub mod pipeline;

use pipeline::FitTarget;

/// Entry point for the `unispec` binary.
pub fn run() -> Result<(), AppError> {
    let settings = Settings::from_env()?;
    init_logging(&settings);

    let cli = Cli::parse();
    let registry = Registry::standard()?;

    match cli.command {
        Command::Engines(args) => handle_engines(&registry, &args),
        Command::Translate(args) => handle_translate(&registry, &args),
        Command::Fit(args) => handle_fit(&registry, &args, &settings),
        Command::Demo(args) => handle_demo(&registry, &args, &settings),
    }
}

fn init_logging(settings: &Settings) {
    // A second initialisation (e.g. from tests) is harmless.
    let _ = env_logger::Builder::new()
        .parse_filters(&settings.log_filter)
        .format_timestamp(None)
        .try_init();
}

fn handle_engines(registry: &Registry, args: &EnginesArgs) -> Result<(), AppError> {
    if let Some(family) = &args.family {
        if registry.family(family).is_none() {
            return Err(crate::error::SpecError::UnknownFamily(family.clone()).into());
        }
    }
    print!("{}", report::format_engines(registry, args.family.as_deref()));
    Ok(())
}

fn handle_translate(registry: &Registry, args: &SpecArgs) -> Result<(), AppError> {
    let spec = pipeline::build_spec_from_args(registry, args)?;
    print!("{}", report::format_specification(&spec));
    println!();
    println!("Native arguments for `{}`:", args.engine);
    let translated = registry.translate(&spec)?;
    if translated.is_empty() {
        println!("(no arguments)");
    }
    for (name, value) in translated {
        println!("  {name} = {value}");
    }
    Ok(())
}

fn handle_fit(registry: &Registry, args: &FitArgs, settings: &Settings) -> Result<(), AppError> {
    let level = args.level.unwrap_or(settings.level);
    let digits = args.digits.unwrap_or(settings.digits);
    let output = pipeline::run_fit(registry, args, level)?;

    print!("{}", report::format_specification(&output.spec));
    println!();
    print!("{}", report::format_fit_summary(&output.fit));
    println!();
    print_tidy_and_glance(&output.fit, digits);
    println!("Predictions ({}):", args.kind);
    print!("{}", report::format_predictions(&output.predictions, digits, Some(args.show)));

    pipeline::write_exports(
        &output,
        args.export_predictions.as_deref(),
        args.export_report.as_deref(),
    )
}

fn print_tidy_and_glance(fit: &crate::fit::FitResult, digits: usize) {
    match fit.tidy() {
        Ok(rows) => print!("{}", report::format_tidy(&rows, digits)),
        Err(e) => println!("({e})"),
    }
    println!();
    print!("{}", report::format_glance(&fit.glance(), digits));
    println!();
}

/// Synthetic walkthrough: categorical predictor, missing values, both fit
/// paths and an engine swap on one specification.
fn handle_demo(registry: &Registry, args: &DemoArgs, settings: &Settings) -> Result<(), AppError> {
    let digits = settings.digits;
    let data = generate_demo(&DemoConfig {
        seed: args.seed,
        rows: args.rows,
        ..DemoConfig::default()
    })?;
    println!(
        "Demo data: {} rows, columns {}\n",
        data.nrows(),
        data.names().join(", ")
    );

    // 1) Formula path with a categorical predictor.
    let spec = pipeline::build_spec(registry, "linear_reg", "lm", Mode::Unspecified, &[])?;
    let formula = FitTarget::Formula("mpg ~ wt + hp + cyl".to_string());
    let lm = pipeline::fit_target(registry, &spec, &data, &formula)?;
    print!("{}", report::format_specification(&spec));
    println!();
    print!("{}", report::format_fit_summary(&lm));
    println!();
    print_tidy_and_glance(&lm, digits);

    let preds = pipeline::predict(&lm, &data, PredictionType::Interval, settings.level)?;
    println!("Interval predictions (rows with missing `hp` stay as NA):");
    print!("{}", report::format_predictions(&preds, digits, Some(8)));
    println!();

    // 2) Same specification, pre-separated path: `cyl` is not encoded.
    match pipeline::fit_target(registry, &spec, &data, &FitTarget::Response("mpg".to_string())) {
        Ok(_) => println!("x/y fit unexpectedly succeeded\n"),
        Err(e) => println!("x/y path without encoding fails as expected:\n  {e}\n"),
    }

    // 3) Engine swap: same family, regularized engine with a penalty.
    let spec = registry.with_engine(&spec, "glmnet")?;
    let spec = registry.with_argument(&spec, "penalty", 0.1)?;
    let spec = registry.with_argument(&spec, "mixture", 0.5)?;
    print!("{}", report::format_translation_table(registry, "linear_reg"));
    println!();
    print!("{}", report::format_translation(registry, &spec));
    let glmnet = pipeline::fit_target(registry, &spec, &data, &formula)?;
    print!("{}", report::format_fit_summary(&glmnet));
    println!();
    print_tidy_and_glance(&glmnet, digits);

    // 4) Classification: logistic regression and nearest neighbours.
    let am = FitTarget::Formula("am ~ wt + hp".to_string());
    let spec = pipeline::build_spec(registry, "logistic_reg", "glm", Mode::Unspecified, &[])?;
    let glm = pipeline::fit_target(registry, &spec, &data, &am)?;
    print!("{}", report::format_fit_summary(&glm));
    println!();
    print_tidy_and_glance(&glm, digits);
    let probs = pipeline::predict(&glm, &data, PredictionType::Probability, settings.level)?;
    print!("{}", report::format_predictions(&probs, digits, Some(5)));
    println!();

    let args = vec![("neighbors".to_string(), ArgValue::Int(7))];
    let spec = pipeline::build_spec(registry, "nearest_neighbor", "kknn", Mode::Classification, &args)?;
    let knn = pipeline::fit_target(registry, &spec, &data, &am)?;
    print!("{}", report::format_fit_summary(&knn));
    println!();
    print_tidy_and_glance(&knn, digits);
    let classes = pipeline::predict(&knn, &data, PredictionType::Point, settings.level)?;
    print!("{}", report::format_predictions(&classes, digits, Some(5)));

    Ok(())
}
