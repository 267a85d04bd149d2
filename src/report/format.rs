//! Terminal formatting for specifications, fits and the registry.
//!
//! All formatters return a `String` so the CLI decides where output goes and
//! tests can assert on it directly.

use crate::domain::{GlanceRecord, ModelSpecification, PredValue, PredictionFrame, PredictionType, TidyRecord};
use crate::fit::FitResult;
use crate::registry::Registry;

const PREDICTION_TYPES: [PredictionType; 3] = [
    PredictionType::Point,
    PredictionType::Probability,
    PredictionType::Interval,
];

/// The specification print-out followed by a blank line.
pub fn format_specification(spec: &ModelSpecification) -> String {
    format!("{spec}\n")
}

/// Call, mode and timing of a fit.
pub fn format_fit_summary(fit: &FitResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {} / {} ({}) ===\n", fit.spec().family(), fit.engine_id(), fit.mode()));
    out.push_str(&format!("Call: {}\n", fit.call()));
    out.push_str(&format!(
        "Fitted: {} in {:.1} ms\n",
        fit.fitted_at().format("%Y-%m-%d %H:%M:%S UTC"),
        fit.elapsed().as_secs_f64() * 1e3
    ));
    if !fit.levels().is_empty() {
        out.push_str(&format!("Levels: {}\n", fit.levels().join(", ")));
    }
    out
}

/// Coefficient table. Columns that are absent for every term are omitted.
pub fn format_tidy(rows: &[TidyRecord], digits: usize) -> String {
    let has_se = rows.iter().any(|r| r.std_error.is_some());
    let has_stat = rows.iter().any(|r| r.statistic.is_some());
    let has_p = rows.iter().any(|r| r.p_value.is_some());
    let width = rows.iter().map(|r| r.term.chars().count()).max().unwrap_or(4).clamp(4, 24);

    let mut header = format!("{:<width$} {:>12}", "term", "estimate");
    let mut rule = format!("{:-<width$} {:-<12}", "", "");
    for (present, name) in [(has_se, "std_error"), (has_stat, "statistic"), (has_p, "p_value")] {
        if present {
            header.push_str(&format!(" {name:>12}"));
            rule.push_str(&format!(" {:-<12}", ""));
        }
    }

    let mut out = String::new();
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');
    for r in rows {
        let mut line = format!("{:<width$} {:>12}", truncate(&r.term, width), fmt_num(r.estimate, digits));
        for (present, value) in [(has_se, r.std_error), (has_stat, r.statistic), (has_p, r.p_value)] {
            if present {
                line.push_str(&format!(" {:>12}", fmt_opt(value, digits)));
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// One metric per line, in the engine's order.
pub fn format_glance(glance: &GlanceRecord, digits: usize) -> String {
    let width = glance
        .metrics
        .iter()
        .map(|(n, _)| n.len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for (name, value) in &glance.metrics {
        out.push_str(&format!("{name:<width$} = {}\n", fmt_num(*value, digits)));
    }
    out
}

/// Prediction table with a leading `row` column. `NA` marks absent values.
/// At most `max_rows` rows are shown when given.
pub fn format_predictions(frame: &PredictionFrame, digits: usize, max_rows: Option<usize>) -> String {
    let mut out = String::new();
    let mut header = format!("{:>5}", "row");
    for c in &frame.columns {
        header.push_str(&format!(" {:>14}", truncate(c, 14)));
    }
    out.push_str(&header);
    out.push('\n');

    let shown = max_rows.unwrap_or(frame.len()).min(frame.len());
    for (i, row) in frame.rows.iter().take(shown).enumerate() {
        let mut line = format!("{i:>5}");
        for cell in row {
            let text = match cell {
                None => "NA".to_string(),
                Some(PredValue::Number(v)) => fmt_num(*v, digits),
                Some(PredValue::Class(c)) => truncate(c, 14),
            };
            line.push_str(&format!(" {text:>14}"));
        }
        out.push_str(&line);
        out.push('\n');
    }
    if shown < frame.len() {
        out.push_str(&format!("... {} more rows\n", frame.len() - shown));
    }
    let absent = frame.absent_rows();
    if absent > 0 {
        out.push_str(&format!("({absent} of {} rows without prediction)\n", frame.len()));
    }
    out
}

/// Families with their arguments, followed by engines and their capabilities.
pub fn format_engines(registry: &Registry, family: Option<&str>) -> String {
    let mut out = String::new();
    for def in registry.families().filter(|f| family.is_none_or(|id| f.id == id)) {
        let modes: Vec<&str> = def.modes.iter().map(|m| m.as_str()).collect();
        out.push_str(&format!("{} ({}) [{}]\n", def.id, def.title, modes.join(", ")));
        for arg in &def.args {
            let default = arg
                .default
                .as_ref()
                .map(|d| format!(", default {d}"))
                .unwrap_or_default();
            out.push_str(&format!("  arg {}: {}{default}\n", arg.name, arg.constraint.describe()));
        }
        for engine in registry.engines(&def.id).unwrap_or_default() {
            let caps: Vec<String> = engine
                .supported_modes()
                .iter()
                .map(|&mode| {
                    let kinds: Vec<&str> = PREDICTION_TYPES
                        .iter()
                        .filter(|&&k| engine.supports_prediction(mode, k))
                        .map(|k| k.as_str())
                        .collect();
                    format!("{mode}: {}", kinds.join("/"))
                })
                .collect();
            out.push_str(&format!("  engine {:<8} {}\n", engine.id(), caps.join("; ")));
            if !engine.extra_args().is_empty() {
                out.push_str(&format!("    engine args: {}\n", engine.extra_args().join(", ")));
            }
        }
        out.push('\n');
        out.push_str(&format_translation_table(registry, &def.id));
        out.push('\n');
    }
    out
}

/// Generalized argument names against each engine's native name (`-` when
/// the engine does not expose the argument).
pub fn format_translation_table(registry: &Registry, family: &str) -> String {
    let Some(def) = registry.family(family) else {
        return String::new();
    };
    let engines = registry.engines(family).unwrap_or_default();

    let mut out = String::new();
    let mut header = format!("{:<14}", "argument");
    for e in engines {
        header.push_str(&format!(" {:<10}", truncate(e.id(), 10)));
    }
    out.push_str(header.trim_end());
    out.push('\n');
    for arg in &def.args {
        let mut line = format!("{:<14}", truncate(&arg.name, 14));
        for e in engines {
            line.push_str(&format!(" {:<10}", e.native_name(&arg.name).unwrap_or("-")));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Native arguments a specification translates to, or why it does not.
pub fn format_translation(registry: &Registry, spec: &ModelSpecification) -> String {
    match registry.translate(spec) {
        Ok(args) if args.is_empty() => "(no arguments)\n".to_string(),
        Ok(args) => args.iter().map(|(n, v)| format!("{n} = {v}\n")).collect(),
        Err(e) => format!("error: {e}\n"),
    }
}

pub(crate) fn fmt_num(v: f64, digits: usize) -> String {
    if !v.is_finite() {
        return "NA".to_string();
    }
    if v.fract() == 0.0 && v.abs() < 1e15 {
        return format!("{v:.0}");
    }
    if v != 0.0 && (v.abs() < 10f64.powi(-(digits as i32)) || v.abs() >= 1e9) {
        return format!("{v:.digits$e}");
    }
    format!("{v:.digits$}")
}

fn fmt_opt(v: Option<f64>, digits: usize) -> String {
    v.map(|x| fmt_num(x, digits)).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Mode;

    #[test]
    fn translation_table_marks_unexposed_arguments() {
        let reg = Registry::standard().unwrap();
        let table = format_translation_table(&reg, "linear_reg");
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0].split_whitespace().collect::<Vec<_>>(), ["argument", "lm", "glmnet"]);
        assert_eq!(lines[1].split_whitespace().collect::<Vec<_>>(), ["penalty", "-", "lambda"]);
        assert_eq!(lines[2].split_whitespace().collect::<Vec<_>>(), ["mixture", "-", "alpha"]);
    }

    #[test]
    fn tidy_table_drops_empty_columns() {
        let rows = vec![TidyRecord::estimate_only("(Intercept)", 1.5), TidyRecord::estimate_only("x", -0.25)];
        let table = format_tidy(&rows, 3);
        assert!(table.starts_with("term"));
        assert!(!table.contains("p_value"));
        assert!(table.contains("-0.250"));
    }

    #[test]
    fn predictions_show_absent_rows_as_na() {
        let frame = PredictionFrame {
            kind: PredictionType::Point,
            columns: vec![".pred".to_string()],
            rows: vec![vec![Some(PredValue::Number(2.5))], vec![None]],
        };
        let text = format_predictions(&frame, 2, None);
        assert!(text.contains("2.50"));
        assert!(text.contains("NA"));
        assert!(text.contains("1 of 2 rows without prediction"));
    }

    #[test]
    fn numbers_use_integer_and_scientific_forms() {
        assert_eq!(fmt_num(12.0, 4), "12");
        assert_eq!(fmt_num(0.123456, 4), "0.1235");
        assert_eq!(fmt_num(f64::NAN, 4), "NA");
        assert!(fmt_num(1e-9, 4).contains('e'));
    }

    #[test]
    fn translation_reports_empty_and_renamed_arguments() {
        let reg = Registry::standard().unwrap();
        let spec = reg.create_specification("linear_reg", Mode::Regression).unwrap();
        let spec = reg.with_engine(&spec, "glmnet").unwrap();
        assert_eq!(format_translation(&reg, &spec), "(no arguments)\n");
        let spec = reg.with_argument(&spec, "penalty", 0.5).unwrap();
        assert_eq!(format_translation(&reg, &spec), "lambda = 0.5\n");
    }
}
