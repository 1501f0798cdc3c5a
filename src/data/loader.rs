use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Date32Array, Float32Array, Float64Array, Int32Array,
    Int64Array, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Table, Value};
use crate::cache::MemoStore;
use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// Dataset sources
// ---------------------------------------------------------------------------

/// A named source file and the column types the pipelines rely on.
/// Columns not declared here are type-inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatasetSource {
    pub file_name: &'static str,
    pub date_columns: &'static [&'static str],
    pub numeric_columns: &'static [&'static str],
    pub index_column: Option<&'static str>,
}

/// Sample Superstore orders, used by most challenges.
pub const SUPERSTORE: DatasetSource = DatasetSource {
    file_name: "superstore.csv",
    date_columns: &["Order Date", "Ship Date"],
    numeric_columns: &["Sales"],
    index_column: Some("Row ID"),
};

/// YouGov "looks vs personality" survey results.
pub const LOOKS_VS_PERSONALITY: DatasetSource = DatasetSource {
    file_name: "looks_vs_personality.csv",
    date_columns: &[],
    numeric_columns: &["Value"],
    index_column: None,
};

/// U.S. births per year, sex and first name.
pub const BABY_NAMES: DatasetSource = DatasetSource {
    file_name: "baby_names.csv",
    date_columns: &["year"],
    numeric_columns: &["n"],
    index_column: None,
};

/// MLB roster share per ethnicity and year; `% of Players` holds percent strings.
pub const MLB_DIVERSITY: DatasetSource = DatasetSource {
    file_name: "mlb_diversity.csv",
    date_columns: &["Year"],
    numeric_columns: &["% of Players"],
    index_column: None,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Date,
    Number,
    Index,
    Inferred,
}

impl DatasetSource {
    fn kind_of(&self, column: &str) -> ColumnKind {
        if self.date_columns.contains(&column) {
            ColumnKind::Date
        } else if self.numeric_columns.contains(&column) {
            ColumnKind::Number
        } else if self.index_column == Some(column) {
            ColumnKind::Index
        } else {
            ColumnKind::Inferred
        }
    }

    fn declared(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.date_columns
            .iter()
            .chain(self.numeric_columns)
            .chain(self.index_column.iter())
            .copied()
    }

    fn check_header(&self, headers: &[String]) -> anyhow::Result<()> {
        for col in self.declared() {
            if !headers.iter().any(|h| h == col) {
                bail!("missing declared column '{col}'");
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load `source` from `data_dir`, mapping any failure to [`PipelineError::Load`].
pub fn load(data_dir: &Path, source: &DatasetSource) -> Result<Table> {
    let path = data_dir.join(source.file_name);
    load_file(&path, source).map_err(|e| PipelineError::Load { path, source: e })
}

/// Load a dataset file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one record per line (recommended)
/// * `.json`    – `[{ "Order Date": "2016-11-08", "Sales": 261.96, ... }, ...]`
/// * `.parquet` – flat columns (Utf8, Int32/64, Float32/64, Boolean, Date32)
pub fn load_file(path: &Path, source: &DatasetSource) -> anyhow::Result<Table> {
    if !path.exists() {
        bail!("file not found");
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path, source),
        "json" => load_json(path, source),
        "parquet" | "pq" => load_parquet(path, source),
        other => bail!("Unsupported file extension: .{other}"),
    }?;
    log::info!(
        "Loaded {} rows with columns {:?} from {}",
        table.len(),
        table.columns(),
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Cell parsing
// ---------------------------------------------------------------------------

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse the calendar formats found in the challenge files. A bare four digit
/// year means January 1st of that year; a trailing time of day is dropped.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.len() == 4 {
        if let Ok(year) = s.parse::<i32>() {
            return NaiveDate::from_ymd_opt(year, 1, 1);
        }
    }
    let day_part = s.split([' ', 'T']).next().unwrap_or(s);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day_part, fmt).ok())
}

/// Parse a number, reading `"63.0%"` as `0.63`.
fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    match s.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f64>().ok().map(|v| v / 100.0),
        None => s.parse::<f64>().ok(),
    }
}

fn guess_value_type(s: &str) -> Value {
    if s.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Value::Float(f);
    }
    if s == "true" || s == "false" {
        return Value::Bool(s == "true");
    }
    Value::Text(s.to_string())
}

/// Bring a raw cell to its declared kind.
fn coerce(value: Value, kind: ColumnKind) -> anyhow::Result<Value> {
    Ok(match (kind, value) {
        (_, Value::Null) => Value::Null,
        (ColumnKind::Inferred, v) => v,
        (_, Value::Text(s)) if s.trim().is_empty() => Value::Null,
        (ColumnKind::Date, v @ Value::Date(_)) => v,
        (ColumnKind::Date, Value::Text(s)) => {
            Value::Date(parse_date(&s).with_context(|| format!("'{s}' is not a date"))?)
        }
        (ColumnKind::Date, Value::Integer(y)) if (1000..=9999).contains(&y) => {
            Value::Date(NaiveDate::from_ymd_opt(y as i32, 1, 1).context("year out of range")?)
        }
        (ColumnKind::Number, v @ (Value::Integer(_) | Value::Float(_))) => v,
        (ColumnKind::Number, Value::Text(s)) => {
            Value::Float(parse_number(&s).with_context(|| format!("'{s}' is not a number"))?)
        }
        (ColumnKind::Index, v @ Value::Integer(_)) => v,
        (ColumnKind::Index, Value::Text(s)) => Value::Integer(
            s.trim()
                .parse::<i64>()
                .with_context(|| format!("'{s}' is not an integer index"))?,
        ),
        (kind, v) => bail!("value '{v}' does not fit a {kind:?} column"),
    })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one record per line. Declared
/// date and numeric columns are parsed strictly; everything else is inferred.
fn load_csv(path: &Path, source: &DatasetSource) -> anyhow::Result<Table> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    source.check_header(&headers)?;
    let kinds: Vec<ColumnKind> = headers.iter().map(|h| source.kind_of(h)).collect();

    let mut table = Table::new(headers.iter().cloned());
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let row = record
            .iter()
            .zip(&kinds)
            .zip(&headers)
            .map(|((cell, kind), name)| {
                let raw = match kind {
                    ColumnKind::Inferred => guess_value_type(cell),
                    _ => Value::Text(cell.to_string()),
                };
                coerce(raw, *kind).with_context(|| format!("CSV row {row_no}, column '{name}'"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        table.push_row(row)?;
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Order Date": "2016-11-08", "Category": "Furniture", "Sales": 261.96 },
///   ...
/// ]
/// ```
fn load_json(path: &Path, source: &DatasetSource) -> anyhow::Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    source.check_header(&headers)?;

    let mut table = Table::new(headers.iter().cloned());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        let row = headers
            .iter()
            .map(|h| {
                let raw = obj.get(h).map(json_to_value).unwrap_or(Value::Null);
                coerce(raw, source.kind_of(h)).with_context(|| format!("Row {i}, column '{h}'"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        table.push_row(row)?;
    }
    Ok(table)
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet file. Works with files written by both **Pandas**
/// (`df.to_parquet()`) and **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path, source: &DatasetSource) -> anyhow::Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    source.check_header(&headers)?;
    let kinds: Vec<ColumnKind> = headers.iter().map(|h| source.kind_of(h)).collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut table = Table::new(headers.iter().cloned());
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let values = (0..batch.num_columns())
                .map(|c| {
                    let raw = extract_value(batch.column(c), row)?;
                    coerce(raw, kinds[c])
                        .with_context(|| format!("Row {row}, column '{}'", headers[c]))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            table.push_row(values)?;
        }
    }
    Ok(table)
}

/// Extract a single value from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> anyhow::Result<Value> {
    if col.is_null(row) {
        return Ok(Value::Null);
    }
    let any = col.as_any();
    Ok(match col.data_type() {
        DataType::Utf8 => Value::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => Value::Integer(downcast::<Int32Array>(any)?.value(row) as i64),
        DataType::Int64 => Value::Integer(downcast::<Int64Array>(any)?.value(row)),
        DataType::Float32 => Value::Float(downcast::<Float32Array>(any)?.value(row) as f64),
        DataType::Float64 => Value::Float(downcast::<Float64Array>(any)?.value(row)),
        DataType::Boolean => Value::Bool(downcast::<BooleanArray>(any)?.value(row)),
        DataType::Date32 => Value::Date(
            downcast::<Date32Array>(any)?
                .value_as_date(row)
                .context("date out of range")?,
        ),
        other => bail!("unsupported parquet column type {other:?}"),
    })
}

fn downcast<T: 'static>(any: &dyn std::any::Any) -> anyhow::Result<&T> {
    any.downcast_ref::<T>()
        .ok_or_else(|| anyhow!("unexpected arrow array layout"))
}

// ---------------------------------------------------------------------------
// Arrow export (pretty printing in the CLI)
// ---------------------------------------------------------------------------

/// Render a table as an all-string Arrow batch.
pub fn to_record_batch(table: &Table) -> anyhow::Result<RecordBatch> {
    let schema = Arc::new(Schema::new(
        table
            .columns()
            .iter()
            .map(|c| Field::new(c, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));
    let arrays: Vec<ArrayRef> = (0..table.columns().len())
        .map(|c| {
            let cells: Vec<Option<String>> = table
                .rows()
                .iter()
                .map(|r| (!r[c].is_null()).then(|| r[c].to_string()))
                .collect();
            Arc::new(StringArray::from(cells)) as ArrayRef
        })
        .collect();
    RecordBatch::try_new(schema, arrays).context("building record batch")
}

// ---------------------------------------------------------------------------
// Dataset cache
// ---------------------------------------------------------------------------

/// Process-lifetime store of loaded datasets, keyed by file path.
///
/// Injected into the gallery rather than hidden behind a global, so tests can
/// seed it with in-memory tables.
#[derive(Debug)]
pub struct DatasetCache {
    data_dir: PathBuf,
    tables: MemoStore<PathBuf, Arc<Table>>,
}

impl DatasetCache {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        DatasetCache {
            data_dir: data_dir.into(),
            tables: MemoStore::unbounded(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn key(&self, source: &DatasetSource) -> PathBuf {
        self.data_dir.join(source.file_name)
    }

    /// The dataset for `source`, loading it on first use.
    pub fn get(&mut self, source: &DatasetSource) -> Result<Arc<Table>> {
        let key = self.key(source);
        if let Some(table) = self.tables.get(&key) {
            log::debug!("dataset cache hit: {}", key.display());
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(load(&self.data_dir, source)?);
        self.tables.insert(key, Arc::clone(&table));
        Ok(table)
    }

    /// Seed the cache with an already built table.
    #[cfg(test)]
    pub fn insert(&mut self, source: &DatasetSource, table: Table) {
        let key = self.key(source);
        self.tables.insert(key, Arc::new(table));
    }

    pub fn invalidate(&mut self, source: &DatasetSource) -> bool {
        let key = self.key(source);
        self.tables.invalidate(&key).is_some()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(dir: &Path, name: &str, contents: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    const ORDERS: &str = "\
Row ID,Order Date,Ship Date,Category,Sales
1,11/8/2016,11/11/2016,Furniture,261.96
2,2016-06-12,2016-06-16,Office Supplies,14.62
";

    #[test]
    fn csv_parses_declared_columns() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "superstore.csv", ORDERS);
        let table = load(dir.path(), &SUPERSTORE).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.dates("Order Date").unwrap(),
            vec![
                NaiveDate::from_ymd_opt(2016, 11, 8).unwrap(),
                NaiveDate::from_ymd_opt(2016, 6, 12).unwrap()
            ]
        );
        assert_eq!(table.floats("Sales").unwrap(), vec![261.96, 14.62]);
        assert_eq!(table.value(0, "Row ID").unwrap(), &Value::Integer(1));
    }

    #[test]
    fn missing_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path(), &SUPERSTORE).unwrap_err();
        assert!(matches!(err, PipelineError::Load { .. }));
    }

    #[test]
    fn bad_date_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "superstore.csv",
            "Row ID,Order Date,Ship Date,Sales\n1,someday,2016-01-01,3\n",
        );
        let err = load(dir.path(), &SUPERSTORE).unwrap_err();
        assert!(err.to_string().contains("Order Date"), "{err}");
    }

    #[test]
    fn missing_declared_column_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "superstore.csv", "Row ID,Order Date\n1,2016-01-01\n");
        assert!(matches!(
            load(dir.path(), &SUPERSTORE),
            Err(PipelineError::Load { .. })
        ));
    }

    #[test]
    fn percent_strings_and_bare_years() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "mlb_diversity.csv",
            "Year,Ethnicity,% of Players\n2016,White,63.0%\n2016,Latino,27.4%\n",
        );
        let table = load(dir.path(), &MLB_DIVERSITY).unwrap();
        assert_eq!(
            table.value(0, "Year").unwrap(),
            &Value::Date(NaiveDate::from_ymd_opt(2016, 1, 1).unwrap())
        );
        let pct = table.floats("% of Players").unwrap();
        assert!((pct[0] - 0.63).abs() < 1e-9);
    }

    #[test]
    fn json_records_load() {
        let dir = tempfile::tempdir().unwrap();
        let source = DatasetSource {
            file_name: "orders.json",
            ..SUPERSTORE
        };
        write(
            dir.path(),
            "orders.json",
            r#"[{"Row ID": 1, "Order Date": "2017-01-02", "Ship Date": null, "Sales": 5}]"#,
        );
        let table = load(dir.path(), &source).unwrap();
        assert!(table.value(0, "Ship Date").unwrap().is_null());
        assert_eq!(table.floats("Sales").unwrap(), vec![5.0]);
    }

    #[test]
    fn cache_loads_once_and_invalidates() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "superstore.csv", ORDERS);
        let mut cache = DatasetCache::new(dir.path());
        let first = cache.get(&SUPERSTORE).unwrap();
        std::fs::remove_file(dir.path().join("superstore.csv")).unwrap();
        let second = cache.get(&SUPERSTORE).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.invalidate(&SUPERSTORE));
        assert!(cache.get(&SUPERSTORE).is_err());
    }

    #[test]
    fn record_batch_export_keeps_shape() {
        let table = Table::from_rows(
            ["a", "b"],
            vec![vec![1.into(), Value::Null], vec![2.into(), "x".into()]],
        )
        .unwrap();
        let batch = to_record_batch(&table).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 2);
        assert!(batch.column(1).is_null(0));
    }
}
