//! CSV ingest into a `Table`.
//!
//! - the header row is required; a BOM on the first header is stripped
//! - empty cells and `NA` are missing values
//! - a column whose non-missing cells all parse as `f64` is numeric,
//!   anything else is categorical

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::data::{Column, Table};
use crate::error::AppError;

const MISSING_TOKENS: [&str; 2] = ["", "NA"];

/// Load a CSV file.
pub fn read_table_csv(path: &Path) -> Result<Table, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let table = read_table_from_reader(file)?;
    log::debug!(
        "read {} rows x {} columns from {}",
        table.nrows(),
        table.ncols(),
        path.display()
    );
    Ok(table)
}

/// Parse CSV from any reader.
pub fn read_table_from_reader<R: Read>(reader: R) -> Result<Table, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::new(3, format!("Failed to read CSV headers: {e}")))?
        .iter()
        .map(normalize_header_name)
        .collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(AppError::new(3, "CSV has no header row."));
    }

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header, lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::new(3, format!("CSV parse error on line {line}: {e}")))?;
        for (j, column) in cells.iter_mut().enumerate() {
            let raw = record.get(j).unwrap_or("");
            column.push((!MISSING_TOKENS.contains(&raw)).then(|| raw.to_string()));
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, values)| infer_column(name, values))
        .collect();
    Table::from_columns(columns).map_err(|e| AppError::new(3, e.to_string()))
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn infer_column(name: String, values: Vec<Option<String>>) -> Column {
    let parsed: Option<Vec<Option<f64>>> = values
        .iter()
        .map(|v| match v {
            None => Some(None),
            Some(s) => s.parse::<f64>().ok().filter(|x| x.is_finite()).map(Some),
        })
        .collect();
    match parsed {
        Some(numbers) if values.iter().any(Option::is_some) => Column::numeric_opt(name, numbers),
        _ => Column::categorical_opt(name, values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ColumnData;
    use std::io::Write;

    #[test]
    fn infers_types_and_missing_values() {
        let csv = "\u{feff}mpg,cyl,wt\n21.0,six,2.62\n,four,NA\n22.8,NA,2.32\n";
        let table = read_table_from_reader(csv.as_bytes()).unwrap();

        assert_eq!(table.names(), ["mpg", "cyl", "wt"]);
        assert_eq!(table.nrows(), 3);
        assert_eq!(
            table.column("mpg").unwrap().data,
            ColumnData::Numeric(vec![Some(21.0), None, Some(22.8)])
        );
        assert_eq!(
            table.column("cyl").unwrap().data,
            ColumnData::Categorical(vec![Some("six".into()), Some("four".into()), None])
        );
        assert!(table.column("wt").unwrap().data.is_missing(1));
    }

    #[test]
    fn all_missing_column_is_categorical() {
        let table = read_table_from_reader("a,b\n1,\n2,NA\n".as_bytes()).unwrap();
        assert!(!table.column("b").unwrap().data.is_numeric());
    }

    #[test]
    fn reads_from_disk_and_reports_missing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "x,y\n1,2\n3,4").unwrap();
        let table = read_table_csv(file.path()).unwrap();
        assert_eq!(table.nrows(), 2);

        let err = read_table_csv(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = read_table_from_reader("a,b\n1,2\n3\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
