use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::model::{Table, Value};
use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// Aggregation and sort descriptors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Sum,
    Mean,
    Count,
    Min,
    Max,
    /// First non-null value in row order.
    First,
}

/// One output column of a [`Table::group_by`].
#[derive(Debug, Clone)]
pub struct Agg {
    pub column: String,
    pub func: AggFunc,
    pub alias: String,
}

impl Agg {
    pub fn new(column: &str, func: AggFunc) -> Self {
        Agg {
            column: column.to_string(),
            func,
            alias: column.to_string(),
        }
    }

    pub fn sum(column: &str) -> Self {
        Agg::new(column, AggFunc::Sum)
    }

    pub fn mean(column: &str) -> Self {
        Agg::new(column, AggFunc::Mean)
    }

    pub fn count(column: &str) -> Self {
        Agg::new(column, AggFunc::Count)
    }

    pub fn min(column: &str) -> Self {
        Agg::new(column, AggFunc::Min)
    }

    pub fn max(column: &str) -> Self {
        Agg::new(column, AggFunc::Max)
    }

    pub fn first(column: &str) -> Self {
        Agg::new(column, AggFunc::First)
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = alias.to_string();
        self
    }
}

#[derive(Debug, Clone)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(column: &str) -> Self {
        SortKey {
            column: column.to_string(),
            descending: false,
        }
    }

    pub fn desc(column: &str) -> Self {
        SortKey {
            column: column.to_string(),
            descending: true,
        }
    }
}

/// Relative change from `prior` to `current`.
///
/// A zero or missing prior value reports no change instead of an infinite one.
pub fn percent_change(current: f64, prior: f64) -> f64 {
    if prior == 0.0 || prior.is_nan() || current.is_nan() {
        0.0
    } else {
        (current - prior) / prior
    }
}

fn is_missing(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Float(f) => f.is_nan(),
        _ => false,
    }
}

/// Ordering used by `sort_by`: missing values go last in either direction.
fn compare_missing_last(a: &Value, b: &Value, descending: bool) -> Ordering {
    match (is_missing(a), is_missing(b)) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) if descending => b.cmp(a),
        (false, false) => a.cmp(b),
    }
}

fn numeric(column: &str, v: &Value) -> Result<Option<f64>> {
    if is_missing(v) {
        return Ok(None);
    }
    v.as_f64()
        .map(Some)
        .ok_or_else(|| PipelineError::wrong_type(column, "a number", v))
}

fn aggregate(column: &str, func: AggFunc, values: &[&Value]) -> Result<Value> {
    let present = || values.iter().copied().filter(|v| !is_missing(v));
    Ok(match func {
        AggFunc::Sum => {
            let mut total = 0.0;
            for v in values {
                total += numeric(column, v)?.unwrap_or(0.0);
            }
            Value::Float(total)
        }
        AggFunc::Mean => {
            let mut total = 0.0;
            let mut n = 0usize;
            for v in values {
                if let Some(x) = numeric(column, v)? {
                    total += x;
                    n += 1;
                }
            }
            if n == 0 {
                Value::Null
            } else {
                Value::Float(total / n as f64)
            }
        }
        AggFunc::Count => Value::Integer(present().count() as i64),
        AggFunc::Min => present().min().cloned().unwrap_or(Value::Null),
        AggFunc::Max => present().max().cloned().unwrap_or(Value::Null),
        AggFunc::First => present().next().cloned().unwrap_or(Value::Null),
    })
}

// ---------------------------------------------------------------------------
// Table operations: filter → derive → group/aggregate → sort/reshape
// ---------------------------------------------------------------------------

impl Table {
    fn indices(&self, names: &[&str]) -> Result<Vec<usize>> {
        names.iter().map(|n| self.column_index(n)).collect()
    }

    fn with_rows(&self, rows: Vec<Vec<Value>>) -> Table {
        Table::from_parts(self.columns().to_vec(), rows)
    }

    /// Keep only the listed columns, in the listed order.
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let idx = self.indices(names)?;
        let mut out = Table::new(names.iter().copied());
        for row in self.rows() {
            out.push_row(idx.iter().map(|&i| row[i].clone()).collect())?;
        }
        Ok(out)
    }

    pub fn drop_columns(&self, names: &[&str]) -> Result<Table> {
        self.require(names)?;
        let keep: Vec<&str> = self
            .columns()
            .iter()
            .map(String::as_str)
            .filter(|c| !names.contains(c))
            .collect();
        self.select(&keep)
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<Table> {
        let idx = self.column_index(from)?;
        let (mut columns, rows) = self.clone().into_parts();
        columns[idx] = to.to_string();
        Table::from_rows(columns, rows)
    }

    /// Rows whose value in `column` satisfies `pred`.
    pub fn filter(&self, column: &str, pred: impl Fn(&Value) -> bool) -> Result<Table> {
        let idx = self.column_index(column)?;
        Ok(self.with_rows(
            self.rows()
                .iter()
                .filter(|r| pred(&r[idx]))
                .cloned()
                .collect(),
        ))
    }

    /// Rows satisfying `pred`, which sees the full row in column order.
    pub fn filter_rows(&self, pred: impl Fn(&[Value]) -> bool) -> Table {
        self.with_rows(self.rows().iter().filter(|r| pred(r)).cloned().collect())
    }

    pub fn head(&self, n: usize) -> Table {
        self.with_rows(self.rows().iter().take(n).cloned().collect())
    }

    /// Add (or replace) a column computed from `sources`.
    pub fn derive(
        &self,
        name: &str,
        sources: &[&str],
        f: impl Fn(&[&Value]) -> Value,
    ) -> Result<Table> {
        let idx = self.indices(sources)?;
        let target = self.columns().iter().position(|c| c == name);
        let mut columns = self.columns().to_vec();
        if target.is_none() {
            columns.push(name.to_string());
        }
        let mut out = Table::new(columns);
        for row in self.rows() {
            let args: Vec<&Value> = idx.iter().map(|&i| &row[i]).collect();
            let value = f(&args);
            let mut new_row = row.clone();
            match target {
                Some(t) => new_row[t] = value,
                None => new_row.push(value),
            }
            out.push_row(new_row)?;
        }
        Ok(out)
    }

    pub fn fill_null(&self, column: &str, value: Value) -> Result<Table> {
        self.derive(column, &[column], |v| {
            if is_missing(v[0]) {
                value.clone()
            } else {
                v[0].clone()
            }
        })
    }

    /// Group by `keys` (ascending key order) and compute `aggs` per group.
    pub fn group_by(&self, keys: &[&str], aggs: &[Agg]) -> Result<Table> {
        let key_idx = self.indices(keys)?;
        let agg_idx: Vec<usize> = aggs
            .iter()
            .map(|a| self.column_index(&a.column))
            .collect::<Result<_>>()?;

        let mut groups: BTreeMap<Vec<Value>, Vec<usize>> = BTreeMap::new();
        for (i, row) in self.rows().iter().enumerate() {
            let key = key_idx.iter().map(|&k| row[k].clone()).collect();
            groups.entry(key).or_default().push(i);
        }

        let mut out = Table::new(
            keys.iter()
                .map(|k| k.to_string())
                .chain(aggs.iter().map(|a| a.alias.clone())),
        );
        for (key, members) in groups {
            let mut row = key;
            for (agg, &ci) in aggs.iter().zip(&agg_idx) {
                let values: Vec<&Value> = members.iter().map(|&r| &self.rows()[r][ci]).collect();
                row.push(aggregate(&agg.column, agg.func, &values)?);
            }
            out.push_row(row)?;
        }
        Ok(out)
    }

    /// Long to wide: one row per `index` value, one column per distinct
    /// `columns` value (named by its display form), cells from `values`.
    /// Missing cells are null; duplicate cells are summed.
    pub fn pivot(&self, index: &str, columns: &str, values: &str) -> Result<Table> {
        let (ii, ci, vi) = (
            self.column_index(index)?,
            self.column_index(columns)?,
            self.column_index(values)?,
        );
        let row_keys: Vec<Value> = self.unique_values(index)?.into_iter().collect();
        let col_keys: Vec<Value> = self.unique_values(columns)?.into_iter().collect();
        let row_pos: HashMap<&Value, usize> = row_keys.iter().enumerate().map(|(i, v)| (v, i)).collect();
        let col_pos: HashMap<&Value, usize> = col_keys.iter().enumerate().map(|(i, v)| (v, i)).collect();

        let mut cells = vec![vec![Value::Null; col_keys.len()]; row_keys.len()];
        for row in self.rows() {
            let cell = &mut cells[row_pos[&row[ii]]][col_pos[&row[ci]]];
            *cell = if cell.is_null() {
                row[vi].clone()
            } else {
                let a = numeric(values, cell)?.unwrap_or(0.0);
                let b = numeric(values, &row[vi])?.unwrap_or(0.0);
                Value::Float(a + b)
            };
        }

        let mut out = Table::new(
            std::iter::once(index.to_string()).chain(col_keys.iter().map(|k| k.to_string())),
        );
        for (key, row_cells) in row_keys.into_iter().zip(cells) {
            let mut row = vec![key];
            row.extend(row_cells);
            out.push_row(row)?;
        }
        Ok(out)
    }

    /// Stable multi-key sort; missing values go last.
    pub fn sort_by(&self, keys: &[SortKey]) -> Result<Table> {
        let idx: Vec<(usize, bool)> = keys
            .iter()
            .map(|k| Ok((self.column_index(&k.column)?, k.descending)))
            .collect::<Result<_>>()?;
        let mut rows = self.rows().to_vec();
        rows.sort_by(|a, b| {
            idx.iter()
                .map(|&(i, desc)| compare_missing_last(&a[i], &b[i], desc))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        Ok(self.with_rows(rows))
    }

    fn partition_keys(&self, partition: &[&str]) -> Result<Vec<Vec<Value>>> {
        let idx = self.indices(partition)?;
        Ok(self
            .rows()
            .iter()
            .map(|r| idx.iter().map(|&i| r[i].clone()).collect())
            .collect())
    }

    fn with_column(&self, name: &str, values: Vec<Value>) -> Result<Table> {
        let target = self.columns().iter().position(|c| c == name);
        let mut columns = self.columns().to_vec();
        if target.is_none() {
            columns.push(name.to_string());
        }
        let mut out = Table::new(columns);
        for (row, value) in self.rows().iter().zip(values) {
            let mut new_row = row.clone();
            match target {
                Some(t) => new_row[t] = value,
                None => new_row.push(value),
            }
            out.push_row(new_row)?;
        }
        Ok(out)
    }

    /// Running total of `column` in row order, restarting per partition.
    pub fn cumulative_sum(&self, column: &str, alias: &str, partition: &[&str]) -> Result<Table> {
        let values = self.floats(column)?;
        let keys = self.partition_keys(partition)?;
        let mut running: HashMap<&Vec<Value>, f64> = HashMap::new();
        let out: Vec<Value> = keys
            .iter()
            .zip(values)
            .map(|(k, v)| {
                let total = running.entry(k).or_insert(0.0);
                if !v.is_nan() {
                    *total += v;
                }
                Value::Float(*total)
            })
            .collect();
        self.with_column(alias, out)
    }

    /// Trailing sum over the last `window` rows of each partition.
    ///
    /// Rows with less history sum what is available (minimum one period).
    pub fn rolling_sum(
        &self,
        column: &str,
        alias: &str,
        window: usize,
        partition: &[&str],
    ) -> Result<Table> {
        let window = window.max(1);
        let values = self.floats(column)?;
        let keys = self.partition_keys(partition)?;
        let mut history: HashMap<&Vec<Value>, Vec<f64>> = HashMap::new();
        let out: Vec<Value> = keys
            .iter()
            .zip(values)
            .map(|(k, v)| {
                let seen = history.entry(k).or_default();
                seen.push(v);
                let tail = &seen[seen.len().saturating_sub(window)..];
                let present: Vec<f64> = tail.iter().copied().filter(|x| !x.is_nan()).collect();
                if present.is_empty() {
                    Value::Null
                } else {
                    Value::Float(present.iter().sum())
                }
            })
            .collect();
        self.with_column(alias, out)
    }

    /// Total of `column` over each row's partition, repeated on every row.
    pub fn partition_total(&self, column: &str, alias: &str, partition: &[&str]) -> Result<Table> {
        let values = self.floats(column)?;
        let keys = self.partition_keys(partition)?;
        let mut totals: HashMap<&Vec<Value>, f64> = HashMap::new();
        for (k, v) in keys.iter().zip(&values) {
            if !v.is_nan() {
                *totals.entry(k).or_insert(0.0) += v;
            }
        }
        let out = keys
            .iter()
            .map(|k| Value::Float(totals.get(k).copied().unwrap_or(0.0)))
            .collect();
        self.with_column(alias, out)
    }

    /// Fraction of the partition total contributed by each row.
    pub fn share_of_total(&self, column: &str, alias: &str, partition: &[&str]) -> Result<Table> {
        const TOTAL: &str = "__partition_total";
        let with_total = self.partition_total(column, TOTAL, partition)?;
        with_total
            .derive(alias, &[column, TOTAL], |v| {
                let part = v[0].as_f64().unwrap_or(0.0);
                let total = v[1].as_f64().unwrap_or(0.0);
                Value::Float(if total == 0.0 { 0.0 } else { part / total })
            })?
            .drop_columns(&[TOTAL])
    }

    /// `(current - prior) / prior` per row, guarded by [`percent_change`].
    pub fn with_percent_change(&self, current: &str, prior: &str, alias: &str) -> Result<Table> {
        self.floats(current)?;
        self.floats(prior)?;
        self.derive(alias, &[current, prior], |v| {
            let c = v[0].as_f64().unwrap_or(f64::NAN);
            let p = v[1].as_f64().unwrap_or(f64::NAN);
            Value::Float(percent_change(c, p))
        })
    }

    /// Align two tables on `on`: the sorted union of keys, other columns side by
    /// side, nulls where one side has no row for a key.
    pub fn outer_join(&self, other: &Table, on: &str) -> Result<Table> {
        let li = self.column_index(on)?;
        let ri = other.column_index(on)?;
        let left: BTreeMap<&Value, &Vec<Value>> = self.rows().iter().map(|r| (&r[li], r)).collect();
        let right: BTreeMap<&Value, &Vec<Value>> =
            other.rows().iter().map(|r| (&r[ri], r)).collect();
        let keys: BTreeSet<&Value> = left.keys().chain(right.keys()).copied().collect();

        let left_cols: Vec<usize> = (0..self.columns().len()).filter(|&i| i != li).collect();
        let right_cols: Vec<usize> = (0..other.columns().len()).filter(|&i| i != ri).collect();

        let mut out = Table::new(
            std::iter::once(on.to_string())
                .chain(left_cols.iter().map(|&i| self.columns()[i].clone()))
                .chain(right_cols.iter().map(|&i| other.columns()[i].clone())),
        );
        for key in keys {
            let mut row = vec![key.clone()];
            for (side, cols) in [(left.get(key), &left_cols), (right.get(key), &right_cols)] {
                row.extend(
                    cols.iter()
                        .map(|&i| side.map(|r| r[i].clone()).unwrap_or(Value::Null)),
                );
            }
            out.push_row(row)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, day).unwrap())
    }

    fn orders() -> Table {
        Table::from_rows(
            ["Order Date", "Category", "Sales"],
            vec![
                vec![d(2014, 1, 1), "Furniture".into(), 100.0.into()],
                vec![d(2014, 2, 1), "Furniture".into(), 200.0.into()],
                vec![d(2015, 1, 1), "Tech".into(), 50.0.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn group_counts_sum_to_row_count() {
        let t = orders();
        let grouped = t.group_by(&["Category"], &[Agg::count("Sales").alias("n")]).unwrap();
        let total: i64 = grouped
            .column("n")
            .unwrap()
            .iter()
            .filter_map(|v| v.as_i64())
            .sum();
        assert_eq!(total as usize, t.len());
    }

    #[test]
    fn group_by_sorts_keys_and_sums() {
        let grouped = orders().group_by(&["Category"], &[Agg::sum("Sales")]).unwrap();
        assert_eq!(grouped.texts("Category").unwrap(), vec!["Furniture", "Tech"]);
        assert_eq!(grouped.floats("Sales").unwrap(), vec![300.0, 50.0]);
    }

    #[test]
    fn group_by_first_min_max() {
        let grouped = orders()
            .group_by(
                &["Category"],
                &[
                    Agg::min("Order Date").alias("first_order"),
                    Agg::max("Sales"),
                    Agg::first("Order Date"),
                ],
            )
            .unwrap();
        assert_eq!(grouped.value(0, "first_order").unwrap(), &d(2014, 1, 1));
        assert_eq!(grouped.value(0, "Sales").unwrap(), &Value::Float(200.0));
        assert_eq!(grouped.value(1, "Order Date").unwrap(), &d(2015, 1, 1));
    }

    #[test]
    fn rolling_three_period_sum_uses_available_history() {
        let t = Table::from_rows(
            ["Sales"],
            [10.0, 20.0, 30.0, 40.0].iter().map(|v| vec![Value::from(*v)]).collect(),
        )
        .unwrap();
        let rolled = t.rolling_sum("Sales", "Rolling", 3, &[]).unwrap();
        assert_eq!(rolled.floats("Rolling").unwrap(), vec![10.0, 30.0, 60.0, 90.0]);
    }

    #[test]
    fn rolling_and_running_totals_restart_per_partition() {
        let t = Table::from_rows(
            ["k", "v"],
            vec![
                vec!["a".into(), 1.0.into()],
                vec!["b".into(), 5.0.into()],
                vec!["a".into(), 2.0.into()],
                vec!["a".into(), 3.0.into()],
            ],
        )
        .unwrap();
        let cum = t.cumulative_sum("v", "cum", &["k"]).unwrap();
        assert_eq!(cum.floats("cum").unwrap(), vec![1.0, 5.0, 3.0, 6.0]);
        let roll = t.rolling_sum("v", "r", 2, &["k"]).unwrap();
        assert_eq!(roll.floats("r").unwrap(), vec![1.0, 5.0, 3.0, 5.0]);
    }

    #[test]
    fn row_subsets_keep_the_header() {
        let t = Table::from_rows(
            ["k", "v"],
            vec![
                vec!["a".into(), 1.0.into()],
                vec!["b".into(), 5.0.into()],
                vec!["c".into(), 2.0.into()],
            ],
        )
        .unwrap();
        let first = t.head(2);
        assert_eq!(first.columns(), t.columns());
        assert_eq!(first.texts("k").unwrap(), vec!["a", "b"]);
        let big = t.filter_rows(|r| r[1].as_f64().is_some_and(|v| v > 1.5));
        assert_eq!(big.texts("k").unwrap(), vec!["b", "c"]);
        assert!(t.head(0).is_empty());
        assert_eq!(t.head(0).columns(), t.columns());
    }

    #[test]
    fn percent_change_guards_zero_prior() {
        assert_eq!(percent_change(50.0, 0.0), 0.0);
        assert_eq!(percent_change(50.0, f64::NAN), 0.0);
        assert!((percent_change(150.0, 100.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn pivot_long_to_wide_with_missing_cells() {
        let t = Table::from_rows(
            ["Nationality", "Gender", "Value"],
            vec![
                vec!["Egyptian".into(), "Men".into(), 55.into()],
                vec!["Egyptian".into(), "Women".into(), 83.into()],
                vec!["British".into(), "Women".into(), 70.into()],
            ],
        )
        .unwrap();
        let wide = t.pivot("Nationality", "Gender", "Value").unwrap();
        assert_eq!(wide.columns(), &["Nationality", "Men", "Women"]);
        assert_eq!(wide.texts("Nationality").unwrap(), vec!["British", "Egyptian"]);
        assert!(wide.value(0, "Men").unwrap().is_null());
        assert_eq!(wide.value(1, "Women").unwrap(), &Value::Integer(83));
    }

    #[test]
    fn sort_puts_missing_last_both_ways() {
        let t = Table::from_rows(
            ["v"],
            vec![vec![Value::Null], vec![2.0.into()], vec![1.0.into()]],
        )
        .unwrap();
        let asc = t.sort_by(&[SortKey::asc("v")]).unwrap();
        assert_eq!(asc.floats("v").unwrap()[..2], [1.0, 2.0]);
        let desc = t.sort_by(&[SortKey::desc("v")]).unwrap();
        assert_eq!(desc.floats("v").unwrap()[..2], [2.0, 1.0]);
        assert!(desc.value(2, "v").unwrap().is_null());
    }

    #[test]
    fn outer_join_aligns_keys() {
        let a = Table::from_rows(["k", "x"], vec![vec!["a".into(), 1.0.into()]]).unwrap();
        let b = Table::from_rows(["k", "y"], vec![vec!["b".into(), 2.0.into()]]).unwrap();
        let joined = a.outer_join(&b, "k").unwrap();
        assert_eq!(joined.columns(), &["k", "x", "y"]);
        assert_eq!(joined.len(), 2);
        assert!(joined.value(0, "y").unwrap().is_null());
        let filled = joined.fill_null("y", Value::Float(0.0)).unwrap();
        assert_eq!(filled.floats("y").unwrap(), vec![0.0, 2.0]);
    }

    #[test]
    fn share_of_total_per_partition() {
        let t = Table::from_rows(
            ["w", "v"],
            vec![
                vec![1.into(), 1.0.into()],
                vec![1.into(), 3.0.into()],
                vec![2.into(), 0.0.into()],
            ],
        )
        .unwrap();
        let s = t.share_of_total("v", "share", &["w"]).unwrap();
        assert_eq!(s.columns(), &["w", "v", "share"]);
        assert_eq!(s.floats("share").unwrap(), vec![0.25, 0.75, 0.0]);
    }
}
