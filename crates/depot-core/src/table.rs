// ABOUTME: Tabular value types exchanged with SQL data nodes: records, frames, and arrays.
// ABOUTME: Cells are JSON values so rows can carry nulls, numbers, text, and nested data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row keyed by column name.
pub type Record = BTreeMap<String, Value>;

/// A column-labelled table of rows. Every row has exactly one cell per column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFrame")]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Deserialized form of a frame, before rows are fitted to the columns.
#[derive(Deserialize)]
struct RawFrame {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

impl From<RawFrame> for Frame {
    fn from(raw: RawFrame) -> Self {
        Frame::new(raw.columns, raw.rows)
    }
}

impl Frame {
    /// Build a frame from column names and rows. Short rows are padded with nulls
    /// and long rows are truncated to the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Build a frame from records. Columns appear in first-seen order and
    /// missing cells are null.
    pub fn from_records(records: &[Record]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of the named column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Rows as column-keyed records.
    pub fn records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    /// Drop the column labels, keeping a 2-D array of the cells.
    pub fn to_array(&self) -> Array {
        Array::TwoD(self.rows.clone())
    }
}

/// A one- or two-dimensional array of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Array {
    OneD(Vec<Value>),
    TwoD(Vec<Vec<Value>>),
}

impl Array {
    /// Number of elements along the first axis.
    pub fn len(&self) -> usize {
        match self {
            Array::OneD(items) => items.len(),
            Array::TwoD(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ndim(&self) -> usize {
        match self {
            Array::OneD(_) => 1,
            Array::TwoD(_) => 2,
        }
    }
}
