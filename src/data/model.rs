use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// Value – a single cell of a table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a CSV column can carry.
/// Groupings key `BTreeMap` / `BTreeSet` by value, so `Value` must be `Ord`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --
// Integers and floats compare numerically; on a numeric tie the integer sorts
// first so that `Ord` stays consistent with `Eq`.

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) | Float(_) => 2,
                Text(_) => 3,
                Date(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Integer(a), Float(b)) => (*a as f64).total_cmp(b).then(Ordering::Less),
            (Float(a), Integer(b)) => a.total_cmp(&(*b as f64)).then(Ordering::Greater),
            (Text(a), Text(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Date(d) => d.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Null => Ok(()),
        }
    }
}

impl Value {
    /// Numeric view of the value; `None` for non-numbers and nulls.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Table – a dataset or a derived table
// ---------------------------------------------------------------------------

/// Named columns over rows of [`Value`]s. Operations never mutate a table in
/// place once it has been handed out; they return a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// An empty table with the given header.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Table {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table, checking every row against the header width.
    pub fn from_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        let mut table = Table::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(PipelineError::SchemaMismatch {
                column: self.columns.join(", "),
                detail: format!(
                    "row has {} values but the table has {} columns",
                    row.len(),
                    self.columns.len()
                ),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Assemble a table from rows already known to match the header width.
    pub(crate) fn from_parts(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Table { columns, rows }
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<Vec<Value>>) {
        (self.columns, self.rows)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Position of a column, or `SchemaMismatch` if it is absent.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PipelineError::missing_column(name))
    }

    /// Fail with the first missing column, if any.
    pub fn require(&self, names: &[&str]) -> Result<()> {
        for name in names {
            self.column_index(name)?;
        }
        Ok(())
    }

    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    pub fn value(&self, row: usize, name: &str) -> Result<&Value> {
        let idx = self.column_index(name)?;
        Ok(&self.rows[row][idx])
    }

    /// Numeric column; nulls become `NaN`.
    pub fn floats(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self.column_index(name)?;
        self.rows
            .iter()
            .map(|r| match &r[idx] {
                Value::Null => Ok(f64::NAN),
                v => v
                    .as_f64()
                    .ok_or_else(|| PipelineError::wrong_type(name, "a number", v)),
            })
            .collect()
    }

    /// Column rendered as display strings; nulls become empty strings.
    pub fn texts(&self, name: &str) -> Result<Vec<String>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx].to_string()).collect())
    }

    pub fn dates(&self, name: &str) -> Result<Vec<NaiveDate>> {
        let idx = self.column_index(name)?;
        self.rows
            .iter()
            .map(|r| {
                r[idx]
                    .as_date()
                    .ok_or_else(|| PipelineError::wrong_type(name, "a date", &r[idx]))
            })
            .collect()
    }

    /// Sorted set of distinct values in a column.
    pub fn unique_values(&self, name: &str) -> Result<BTreeSet<Value>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx].clone()).collect())
    }

    /// Distinct values in order of first appearance.
    pub fn unique_in_order(&self, name: &str) -> Result<Vec<Value>> {
        let idx = self.column_index(name)?;
        let mut seen = BTreeSet::new();
        Ok(self
            .rows
            .iter()
            .filter(|r| seen.insert(r[idx].clone()))
            .map(|r| r[idx].clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_values_compare_across_variants() {
        assert!(Value::Integer(1) < Value::Float(1.5));
        assert!(Value::Float(0.5) < Value::Integer(1));
        assert_ne!(Value::Integer(1), Value::Float(1.0));
        assert!(Value::Null < Value::Integer(-5));
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn push_row_rejects_wrong_width() {
        let mut t = Table::new(["a", "b"]);
        assert!(t.push_row(vec![Value::from(1)]).is_err());
        assert!(t.push_row(vec![Value::from(1), Value::Null]).is_ok());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn missing_column_is_schema_mismatch() {
        let t = Table::new(["Sales"]);
        let err = t.floats("Profit").unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { ref column, .. } if column == "Profit"));
    }

    #[test]
    fn floats_reject_text() {
        let t = Table::from_rows(["Sales"], vec![vec![Value::from("abc")]]).unwrap();
        assert!(matches!(
            t.floats("Sales"),
            Err(PipelineError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn unique_in_order_keeps_first_appearance() {
        let t = Table::from_rows(
            ["k"],
            vec![
                vec![Value::from("b")],
                vec![Value::from("a")],
                vec![Value::from("b")],
            ],
        )
        .unwrap();
        assert_eq!(
            t.unique_in_order("k").unwrap(),
            vec![Value::from("b"), Value::from("a")]
        );
    }
}
