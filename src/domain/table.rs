//! Time-indexed measurement tables.
//!
//! A `MeasurementTable` is the in-memory form every processing stage works on:
//!
//! - one row per reading cycle, indexed by elapsed hours
//! - ordered, named value columns (wells or samples) holding `Option<f64>`
//! - optional text metadata columns (e.g. temperature) that ride along untouched
//!
//! Transforms never mutate a table; they build a new one.

use crate::error::AppError;

/// A single measurement; `None` is a missing or undefined reading.
pub type Cell = Option<f64>;

/// A named numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<Cell>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// A named text column carried alongside the numeric data.
#[derive(Debug, Clone, PartialEq)]
pub struct TextColumn {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementTable {
    index: Vec<f64>,
    metadata: Vec<TextColumn>,
    columns: Vec<Series>,
}

impl MeasurementTable {
    /// Build a table, checking every column against the index length.
    pub fn new(index: Vec<f64>, metadata: Vec<TextColumn>, columns: Vec<Series>) -> Result<Self, AppError> {
        let n = index.len();
        if let Some(bad) = metadata.iter().find(|c| c.values.len() != n) {
            return Err(AppError::Data(format!(
                "Metadata column '{}' has {} rows, index has {n}.",
                bad.name,
                bad.values.len()
            )));
        }
        if let Some(bad) = columns.iter().find(|c| c.values.len() != n) {
            return Err(AppError::Data(format!(
                "Column '{}' has {} rows, index has {n}.",
                bad.name,
                bad.values.len()
            )));
        }
        Ok(Self {
            index,
            metadata,
            columns,
        })
    }

    /// A table with value columns only.
    pub fn from_columns(index: Vec<f64>, columns: Vec<Series>) -> Result<Self, AppError> {
        Self::new(index, Vec::new(), columns)
    }

    /// Same index (and metadata, if `keep_metadata`) with new value columns.
    ///
    /// Callers guarantee each column has `self.n_rows()` values.
    pub(crate) fn derive(&self, columns: Vec<Series>, keep_metadata: bool) -> Self {
        debug_assert!(columns.iter().all(|c| c.values.len() == self.index.len()));
        Self {
            index: self.index.clone(),
            metadata: if keep_metadata { self.metadata.clone() } else { Vec::new() },
            columns,
        }
    }

    pub fn index(&self) -> &[f64] {
        &self.index
    }

    pub fn metadata(&self) -> &[TextColumn] {
        &self.metadata
    }

    pub fn columns(&self) -> &[Series] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Series> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Exact index equality. Sibling tables share their index verbatim, so no tolerance.
    pub fn has_same_index(&self, other: &MeasurementTable) -> bool {
        self.index == other.index
    }
}
