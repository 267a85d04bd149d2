//! In-memory tabular data.
//!
//! A `Table` is an ordered list of equally long, named columns. Each column is
//! either numeric or categorical; both carry explicit missing values (`None`)
//! so row counts never change when a cell is unknown.

use std::collections::BTreeSet;

use crate::error::SpecError;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnData::Numeric(_))
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Numeric(v) => v.get(row).is_none_or(|x| x.is_none_or(|x| !x.is_finite())),
            ColumnData::Categorical(v) => v.get(row).is_none_or(Option::is_none),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ColumnData::Numeric(_) => "numeric",
            ColumnData::Categorical(_) => "categorical",
        }
    }

    /// Cell values rendered as labels (numbers use their shortest `Display` form).
    pub fn labels(&self) -> Vec<Option<String>> {
        match self {
            ColumnData::Numeric(v) => v
                .iter()
                .map(|x| x.filter(|x| x.is_finite()).map(|x| x.to_string()))
                .collect(),
            ColumnData::Categorical(v) => v.clone(),
        }
    }

    /// Values as numbers. A categorical column is accepted only when every
    /// cell is missing, since it then carries no type of its own.
    pub fn to_numeric(&self) -> Option<Vec<Option<f64>>> {
        match self {
            ColumnData::Numeric(v) => Some(v.clone()),
            ColumnData::Categorical(v) if v.iter().all(Option::is_none) => Some(vec![None; v.len()]),
            ColumnData::Categorical(_) => None,
        }
    }

    /// Sorted distinct non-missing labels.
    pub fn levels(&self) -> Vec<String> {
        let set: BTreeSet<String> = self.labels().into_iter().flatten().collect();
        set.into_iter().collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values.into_iter().map(Some).collect()),
        }
    }

    pub fn numeric_opt(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn categorical<S: AsRef<str>>(name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Categorical(
                values.into_iter().map(|s| Some(s.as_ref().to_string())).collect(),
            ),
        }
    }

    pub fn categorical_opt(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Categorical(values),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    nrows: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table, checking that names are unique and lengths agree.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, SpecError> {
        let mut table = Table::new();
        for c in columns {
            table.push(c)?;
        }
        Ok(table)
    }

    pub fn push(&mut self, column: Column) -> Result<(), SpecError> {
        if self.columns.iter().any(|c| c.name == column.name) {
            return Err(SpecError::Data(format!("duplicate column `{}`", column.name)));
        }
        if !self.columns.is_empty() && column.len() != self.nrows {
            return Err(SpecError::Data(format!(
                "column `{}` has {} rows, expected {}",
                column.name,
                column.len(),
                self.nrows
            )));
        }
        self.nrows = column.len();
        self.columns.push(column);
        Ok(())
    }

    /// Builder-style `push`.
    pub fn with(mut self, column: Column) -> Result<Self, SpecError> {
        self.push(column)?;
        Ok(self)
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn require(&self, name: &str) -> Result<&Column, SpecError> {
        self.column(name)
            .ok_or_else(|| SpecError::Data(format!("column `{name}` not found")))
    }

    /// New table with the named columns, in the given order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table, SpecError> {
        let mut out = Table::new();
        for name in names {
            out.push(self.require(name.as_ref())?.clone())?;
        }
        // A zero-column selection still has the source row count.
        out.nrows = self.nrows;
        Ok(out)
    }

    /// New table without the named column.
    pub fn without(&self, name: &str) -> Table {
        Table {
            columns: self.columns.iter().filter(|c| c.name != name).cloned().collect(),
            nrows: self.nrows,
        }
    }

    pub fn row_has_missing(&self, row: usize) -> bool {
        self.columns.iter().any(|c| c.data.is_missing(row))
    }
}
