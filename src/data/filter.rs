use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::model::{Table, Value};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Filter predicate: which values are selected per column
// ---------------------------------------------------------------------------

/// Per-column selection state: maps column_name → set of selected values.
/// A column absent from the map is unconstrained; an empty set selects nothing.
pub type FilterState = BTreeMap<String, BTreeSet<Value>>;

/// Build a [`FilterState`] entry from anything convertible into values.
pub fn selection<T: Into<Value>>(values: impl IntoIterator<Item = T>) -> BTreeSet<Value> {
    values.into_iter().map(Into::into).collect()
}

/// Return indices of rows that pass all active filters.
///
/// A row passes a column filter when:
/// * The filter set for that column is empty → nothing selected → fails
/// * The row's value for that column is in the selected set → passes
///
/// A filtered column missing from the table is a schema mismatch.
pub fn filtered_indices(table: &Table, filters: &FilterState) -> Result<Vec<usize>> {
    let resolved: Vec<(usize, &BTreeSet<Value>)> = filters
        .iter()
        .map(|(col, selected)| Ok((table.column_index(col)?, selected)))
        .collect::<Result<_>>()?;

    Ok(table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            resolved
                .iter()
                .all(|(idx, selected)| !selected.is_empty() && selected.contains(&row[*idx]))
        })
        .map(|(i, _)| i)
        .collect())
}

/// The rows of `table` passing `filters`, as a new table.
pub fn apply(table: &Table, filters: &FilterState) -> Result<Table> {
    let keep: BTreeSet<usize> = filtered_indices(table, filters)?.into_iter().collect();
    let mut out = Table::new(table.columns().iter().cloned());
    for (i, row) in table.rows().iter().enumerate() {
        if keep.contains(&i) {
            out.push_row(row.clone())?;
        }
    }
    Ok(out)
}

/// Rows whose date in `column` falls in `start..=end`.
pub fn between(table: &Table, column: &str, start: NaiveDate, end: NaiveDate) -> Result<Table> {
    table.filter(column, |v| v.as_date().is_some_and(|d| d >= start && d <= end))
}
