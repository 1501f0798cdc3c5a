//! Monthly sales per sub-category with the best and worst month of each
//! column highlighted.

use std::collections::BTreeMap;

use chrono::Datelike;

use crate::chart::{format, ChartSpec, Mark, TableCells, Trace};
use crate::color::Rgb;
use crate::data::calendar::month_name;
use crate::data::loader::{DatasetSource, SUPERSTORE};
use crate::data::model::{Table, Value};
use crate::data::ops::{Agg, SortKey};
use crate::error::Result;

use super::{
    chart_or_placeholder, choice_options, select_years_and_categories, ParamKind, ParamSpec,
    ParamValue, Params, Pipeline, CATEGORIES, SERIES_URL, SUPERSTORE_YEARS,
};

const MAX_FILL: Rgb = Rgb::hex(0x2E5A87);
const MIN_FILL: Rgb = Rgb::hex(0xA90C38);
const CELL_FILL: Rgb = Rgb::hex(0xEBF0F8);
const GRAND_TOTAL: &str = "Grand Total";

fn value_columns() -> Vec<String> {
    (1..=12)
        .map(|m| month_name(m, true).to_string())
        .chain(std::iter::once(GRAND_TOTAL.to_string()))
        .collect()
}

pub struct MonthlySubCategories;

impl Pipeline for MonthlySubCategories {
    fn id(&self) -> &'static str {
        "2018w07"
    }

    fn title(&self) -> &'static str {
        "Monthly sales by sub-category"
    }

    fn source_url(&self) -> &'static str {
        SERIES_URL
    }

    fn dataset(&self) -> DatasetSource {
        SUPERSTORE
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::new(
                "years",
                "Years",
                ParamKind::Years(SUPERSTORE_YEARS.to_vec()),
                ParamValue::int_set([2017]),
            ),
            ParamSpec::new(
                "categories",
                "Category",
                ParamKind::Labels(choice_options(&CATEGORIES)),
                ParamValue::text_set(CATEGORIES),
            ),
        ]
    }

    fn transform(&self, data: &Table, params: &Params) -> Result<Table> {
        let selected = select_years_and_categories(
            data,
            params.int_set("years")?,
            Some(params.text_set("categories")?),
        )?;
        selected.dates("Order Date")?;
        let monthly = selected
            .derive("Month", &["Order Date"], |v| {
                Value::from(v[0].as_date().map(|d| d.month()))
            })?
            .group_by(&["Sub-Category", "Month"], &[Agg::sum("Sales")])?;

        let mut wide: BTreeMap<Value, [Option<f64>; 12]> = BTreeMap::new();
        for row in monthly.rows() {
            let (Some(month), Some(sales)) = (row[1].as_i64(), row[2].as_f64()) else {
                continue;
            };
            let cells = wide.entry(row[0].clone()).or_insert([None; 12]);
            cells[(month - 1).clamp(0, 11) as usize] = Some(sales);
        }

        let mut out = Table::new(std::iter::once("Sub-Category".to_string()).chain(value_columns()));
        for (sub_category, cells) in wide {
            let total: f64 = cells.iter().flatten().sum();
            let mut row = vec![sub_category];
            row.extend(cells.iter().map(|c| Value::from(*c)));
            row.push(Value::Float(total));
            out.push_row(row)?;
        }
        out.sort_by(&[SortKey::desc(GRAND_TOTAL)])
    }

    fn build_chart(&self, derived: &Table, _params: &Params) -> Result<ChartSpec> {
        let value_columns = value_columns();
        let mut required = vec!["Sub-Category"];
        required.extend(value_columns.iter().map(String::as_str));
        chart_or_placeholder(derived, &required, self.title(), || {
            let rows = derived.len();
            let mut header = vec![String::new()];
            header.extend(value_columns.iter().cloned());
            let mut columns = vec![derived.texts("Sub-Category")?];
            let mut fills = vec![vec![CELL_FILL; rows]];
            let mut text_colors = vec![vec![Rgb::BLACK; rows]];

            for name in &value_columns {
                let values = derived.floats(name)?;
                let present = values.iter().copied().filter(|v| !v.is_nan());
                let max = present.clone().fold(f64::NAN, f64::max);
                let min = present.fold(f64::NAN, f64::min);
                let fill = |v: f64| {
                    if v == max {
                        MAX_FILL
                    } else if v == min {
                        MIN_FILL
                    } else {
                        CELL_FILL
                    }
                };
                fills.push(values.iter().map(|&v| fill(v)).collect());
                text_colors.push(values.iter().map(|&v| fill(v).contrasting_text()).collect());
                columns.push(
                    values
                        .iter()
                        .map(|&v| format::currency(if v.is_nan() { 0.0 } else { v }, 0))
                        .collect(),
                );
            }

            let mut spec = ChartSpec::new(self.title()).size(1200, 425);
            spec.push(
                Trace::new(
                    "sub-categories",
                    Mark::Table(TableCells {
                        header,
                        columns,
                        fills,
                        text_colors,
                    }),
                )
                .hide_legend(),
            );
            Ok(spec)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::*;

    fn params(years: &[i64], categories: &[&str]) -> Params {
        Params::new()
            .with("years", ParamValue::int_set(years.iter().copied()))
            .with("categories", ParamValue::text_set(categories.iter().copied()))
    }

    #[test]
    fn one_year_one_category_gives_one_group() {
        let t = MonthlySubCategories
            .transform(&three_orders(), &params(&[2014], &["Furniture"]))
            .unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.texts("Sub-Category").unwrap(), vec!["Chairs"]);
        assert_eq!(t.floats("Grand Total").unwrap(), vec![300.0]);
        assert_eq!(t.floats("January").unwrap(), vec![100.0]);
        assert_eq!(t.floats("February").unwrap(), vec![200.0]);
        assert!(t.value(0, "March").unwrap().is_null());
    }

    #[test]
    fn empty_year_or_category_is_empty() {
        for p in [params(&[], &["Furniture"]), params(&[2014], &[])] {
            let t = MonthlySubCategories.transform(&three_orders(), &p).unwrap();
            assert!(t.is_empty());
            assert_eq!(t.columns().len(), 14);
        }
    }

    #[test]
    fn extremes_are_highlighted_per_column() {
        let table = superstore(vec![
            Order::new(d(2017, 1, 3), "Furniture", "Chairs", 30.0),
            Order::new(d(2017, 1, 3), "Furniture", "Tables", 20.0),
            Order::new(d(2017, 1, 3), "Furniture", "Bookcases", 10.0),
        ]);
        let p = params(&[2017], &["Furniture"]);
        let t = MonthlySubCategories.transform(&table, &p).unwrap();
        let spec = MonthlySubCategories.build_chart(&t, &p).unwrap();
        let Mark::Table(cells) = &spec.traces[0].mark else {
            panic!("expected a table");
        };
        assert_eq!(cells.columns[0], vec!["Chairs", "Tables", "Bookcases"]);
        assert_eq!(cells.fills[1], vec![MAX_FILL, CELL_FILL, MIN_FILL]);
        assert_eq!(cells.text_colors[1][0], Rgb::WHITE);
        assert_eq!(cells.columns[2], vec!["$0", "$0", "$0"]);
    }
}
