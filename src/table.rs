//! Tabular value type
//!
//! Every stage of the wrangling pipeline consumes and produces a [`Table`]:
//! an ordered list of named, typed columns and rows of typed cells.
//! Transformations never mutate their input; they hand back a new table.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::WrangleError;

/// Storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int,
    Float,
    Str,
    Bool,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Str => "str",
            ColumnType::Bool => "bool",
        }
    }
}

/// A single typed cell
///
/// Equality and hashing compare floats bit-for-bit so that values can be
/// used as join keys (`NaN` matches `NaN`).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Int(_) => ColumnType::Int,
            Value::Float(_) => ColumnType::Float,
            Value::Str(_) => ColumnType::Str,
            Value::Bool(_) => ColumnType::Bool,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// True for `0`, `0.0` and `false`; the "no error" value of a flag column
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Int(v) => *v == 0,
            Value::Float(v) => *v == 0.0,
            Value::Bool(b) => !*b,
            Value::Str(_) => false,
        }
    }

    /// Flag interpretation of a cell: anything numeric and non-zero is set
    pub fn is_set(&self) -> bool {
        match self {
            Value::Int(_) | Value::Float(_) | Value::Bool(_) => !self.is_zero(),
            Value::Str(_) => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Int(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
            Value::Bool(b) => b.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) if v.is_nan() => Ok(()),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => f.write_str(s),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// Ordered, typed, row-major table
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    types: Vec<ColumnType>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given schema
    pub fn new<S: Into<String>>(schema: impl IntoIterator<Item = (S, ColumnType)>) -> Self {
        let (columns, types) = schema
            .into_iter()
            .map(|(name, ty)| (name.into(), ty))
            .unzip();
        Self {
            columns,
            types,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_types(&self) -> &[ColumnType] {
        &self.types
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column_index(name).map(|idx| self.types[idx])
    }

    /// Index of a column that must be present
    pub fn require_column(&self, name: &str) -> Result<usize, WrangleError> {
        self.column_index(name)
            .ok_or_else(|| WrangleError::MissingColumn(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        (index < self.rows.len()).then_some(Row { table: self, index })
    }

    pub fn iter(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        (0..self.rows.len()).map(move |index| Row { table: self, index })
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// Append a row, checking its width and cell types against the schema
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), WrangleError> {
        if row.len() != self.columns.len() {
            return Err(WrangleError::ColumnMismatch(format!(
                "row has {} cells, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }

        if let Some((idx, cell)) = row
            .iter()
            .enumerate()
            .find(|(idx, cell)| cell.column_type() != self.types[*idx])
        {
            return Err(WrangleError::ColumnMismatch(format!(
                "column '{}' is {} but got a {} cell",
                self.columns[idx],
                self.types[idx].as_str(),
                cell.column_type().as_str()
            )));
        }

        self.rows.push(row);
        Ok(())
    }

    /// New table holding the rows for which `keep` returns true
    pub fn filter<F>(&self, keep: F) -> Table
    where
        F: Fn(Row<'_>) -> bool,
    {
        let rows = self
            .iter()
            .filter(|row| keep(*row))
            .map(|row| row.values().to_vec())
            .collect();

        Table {
            columns: self.columns.clone(),
            types: self.types.clone(),
            rows,
        }
    }

    /// New table with `name` appended, or replaced in place if it already exists
    pub fn with_column(
        &self,
        name: &str,
        ty: ColumnType,
        values: Vec<Value>,
    ) -> Result<Table, WrangleError> {
        if values.len() != self.rows.len() {
            return Err(WrangleError::ColumnMismatch(format!(
                "column '{}' has {} values, table has {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }
        if let Some(bad) = values.iter().find(|v| v.column_type() != ty) {
            return Err(WrangleError::ColumnMismatch(format!(
                "column '{}' is {} but got a {} cell",
                name,
                ty.as_str(),
                bad.column_type().as_str()
            )));
        }

        let mut out = self.clone();
        match out.column_index(name) {
            Some(idx) => {
                out.types[idx] = ty;
                for (row, value) in out.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                out.columns.push(name.to_string());
                out.types.push(ty);
                for (row, value) in out.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(out)
    }

    /// Render as tab-delimited text with a header row
    pub fn to_tsv(&self) -> String {
        let mut out = self.columns.join("\t");
        out.push('\n');
        for row in &self.rows {
            let line: Vec<String> = row.iter().map(Value::to_string).collect();
            out.push_str(&line.join("\t"));
            out.push('\n');
        }
        out
    }
}

/// Borrowed view of one table row
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> Row<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn values(&self) -> &'a [Value] {
        &self.table.rows[self.index]
    }

    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.table
            .column_index(column)
            .map(|idx| &self.table.rows[self.index][idx])
    }
}

/// Serializes as a JSON object in column order
impl Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let values = self.values();
        let mut map = serializer.serialize_map(Some(values.len()))?;
        for (name, value) in self.table.columns.iter().zip(values) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
