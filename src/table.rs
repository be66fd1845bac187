//! In-memory tabular dataset loaded from CSV or JSON array-of-records.

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::DatasetError;

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Date(NaiveDate),
    Null,
}

impl Datum {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Int(v) => Some(*v as f64),
            Datum::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Human-readable form used for class labels in reports.
    pub fn label(&self) -> String {
        match self {
            Datum::Int(v) => v.to_string(),
            Datum::Float(v) => v.to_string(),
            Datum::Bool(v) => v.to_string(),
            Datum::Text(v) => v.clone(),
            Datum::Date(v) => v.format("%Y-%m-%d").to_string(),
            Datum::Null => "null".to_string(),
        }
    }
}

/// A named column of cells.
#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub values: Vec<Datum>,
}

impl Series {
    /// A column counts as numeric when every non-null cell is a number and
    /// at least one cell is non-null.
    pub fn is_numeric(&self) -> bool {
        let mut seen = false;
        for v in &self.values {
            match v {
                Datum::Int(_) | Datum::Float(_) => seen = true,
                Datum::Null => {}
                _ => return false,
            }
        }
        seen
    }
}

/// Where a dataset comes from: a file on disk, or text already in memory
/// (stdin and tests).
#[derive(Debug, Clone)]
pub enum DatasetSource {
    File(PathBuf),
    Inline(String),
}

/// Rows × named columns. Column order is the order of first appearance.
#[derive(Debug, Clone)]
pub struct DataFrame {
    columns: Vec<Series>,
    n_rows: usize,
}

impl DataFrame {
    /// Read the source and parse it, sniffing JSON (leading `[`) vs CSV.
    pub fn load(source: &DatasetSource) -> Result<Self, DatasetError> {
        let text = match source {
            DatasetSource::File(path) => fs::read_to_string(path)?,
            DatasetSource::Inline(text) => text.clone(),
        };
        if text.trim_start().starts_with('[') {
            Self::from_json(&text)
        } else {
            Self::from_csv(&text)
        }
    }

    /// Parse CSV with a header row. Field types are inferred per cell:
    /// integer, then float, then boolean, otherwise text; empty = null.
    pub fn from_csv(text: &str) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        if headers.is_empty() {
            return Err(DatasetError::Empty);
        }

        let mut columns: Vec<Series> = headers
            .iter()
            .map(|name| Series { name: name.clone(), values: Vec::new() })
            .collect();

        let mut n_rows = 0;
        for record in reader.records() {
            let record = record?;
            for (i, col) in columns.iter_mut().enumerate() {
                let field = record.get(i).unwrap_or("");
                col.values.push(infer_field(field));
            }
            n_rows += 1;
        }

        Ok(DataFrame { columns, n_rows })
    }

    /// Parse a JSON array of records. Keys are collected in order of first
    /// appearance; records missing a key contribute nulls.
    pub fn from_json(text: &str) -> Result<Self, DatasetError> {
        let value: Value = serde_json::from_str(text)?;
        let records = value.as_array().ok_or(DatasetError::NotRecords)?;

        let mut columns: Vec<Series> = Vec::new();
        for record in records {
            let obj = record.as_object().ok_or(DatasetError::NotRecords)?;
            for key in obj.keys() {
                if !columns.iter().any(|c| &c.name == key) {
                    columns.push(Series { name: key.clone(), values: Vec::new() });
                }
            }
        }
        if columns.is_empty() {
            return Err(DatasetError::Empty);
        }

        for (row, record) in records.iter().enumerate() {
            let obj = record.as_object().ok_or(DatasetError::NotRecords)?;
            for col in columns.iter_mut() {
                let datum = match obj.get(&col.name) {
                    Some(v) => json_datum(v),
                    None => Datum::Null,
                };
                debug_assert_eq!(col.values.len(), row);
                col.values.push(datum);
            }
        }

        let n_rows = records.len();
        Ok(DataFrame { columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
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

    /// Names of numeric columns, in table order.
    pub fn numeric_column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.is_numeric())
            .map(|c| c.name.clone())
            .collect()
    }

    /// The numeric sub-table as feature rows, dropping every row with a
    /// missing value in any numeric column.
    pub fn numeric_matrix(&self) -> (Vec<String>, Vec<Vec<f64>>) {
        let numeric: Vec<&Series> = self.columns.iter().filter(|c| c.is_numeric()).collect();
        let names = numeric.iter().map(|c| c.name.clone()).collect();
        let mut rows = Vec::new();
        'rows: for i in 0..self.n_rows {
            let mut row = Vec::with_capacity(numeric.len());
            for col in &numeric {
                match col.values[i].as_f64() {
                    Some(v) => row.push(v),
                    None => continue 'rows,
                }
            }
            rows.push(row);
        }
        (names, rows)
    }
}

fn infer_field(field: &str) -> Datum {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Datum::Null;
    }
    if let Ok(v) = trimmed.parse::<i64>() {
        return Datum::Int(v);
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        return Datum::Float(v);
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return Datum::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Datum::Bool(false);
    }
    Datum::Text(trimmed.to_string())
}

fn json_datum(value: &Value) -> Datum {
    match value {
        Value::Null => Datum::Null,
        Value::Bool(b) => Datum::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Datum::Int(i)
            } else {
                Datum::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => Datum::Text(s.clone()),
        // Nested structures are kept as their JSON text.
        other => Datum::Text(other.to_string()),
    }
}
