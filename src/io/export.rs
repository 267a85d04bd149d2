//! Export predictions to CSV and fit reports to JSON.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{PredValue, PredictionFrame};
use crate::error::AppError;
use crate::report::FitReport;

/// Write a prediction frame with a leading `row` index. Absent predictions
/// are empty cells.
pub fn write_predictions_csv(path: &Path, frame: &PredictionFrame) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_predictions(file, frame)
}

pub fn write_predictions<W: Write>(writer: W, frame: &PredictionFrame) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);
    let write_err = |e: csv::Error| AppError::new(2, format!("Failed to write predictions CSV: {e}"));

    let mut header = vec!["row".to_string()];
    header.extend(frame.columns.iter().cloned());
    out.write_record(&header).map_err(write_err)?;

    for (i, row) in frame.rows.iter().enumerate() {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(i.to_string());
        record.extend(row.iter().map(|cell| match cell {
            None => String::new(),
            Some(PredValue::Number(v)) => format!("{v:.10}"),
            Some(PredValue::Class(c)) => c.clone(),
        }));
        out.write_record(&record).map_err(write_err)?;
    }
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush predictions CSV: {e}")))?;
    Ok(())
}

/// Write a fit report (call, arguments, tidy, glance) as pretty JSON.
pub fn write_report_json(path: &Path, report: &FitReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report JSON '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)
        .map_err(|e| AppError::new(2, format!("Failed to serialize report JSON: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write report JSON: {e}")))?;
    Ok(())
}
