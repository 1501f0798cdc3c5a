//! Sub-category sales per year with share of the yearly total and growth
//! over the previous year.

use std::collections::BTreeMap;

use crate::chart::{format, ChartSpec, Mark, TableCells, Trace};
use crate::color::{ColorScale, Rgb};
use crate::data::loader::{DatasetSource, SUPERSTORE};
use crate::data::model::{Table, Value};
use crate::data::ops::{percent_change, Agg, SortKey};
use crate::error::Result;

use super::{
    chart_or_placeholder, choice_options, with_year, ParamKind, ParamSpec, ParamValue, Params,
    Pipeline, SERIES_URL, SUPERSTORE_YEARS,
};

const MEASURES: [&str; 3] = ["Sales", "% of Total", "% Diff"];
const CELL_FILL: Rgb = Rgb::hex(0xEBF0F8);

fn column_name(year: i64, measure: &str) -> String {
    format!("{year} {measure}")
}

fn value_columns() -> Vec<String> {
    SUPERSTORE_YEARS
        .iter()
        .flat_map(|&y| MEASURES.iter().map(move |m| column_name(y, m)))
        .collect()
}

pub struct SubCategoryByYear;

impl Pipeline for SubCategoryByYear {
    fn id(&self) -> &'static str {
        "2018w13"
    }

    fn title(&self) -> &'static str {
        "Sub-category sales by year"
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
                "year",
                "Sort by year",
                ParamKind::Year(SUPERSTORE_YEARS.to_vec()),
                ParamValue::Int(2017),
            ),
            ParamSpec::new(
                "measure",
                "Sort by measure",
                ParamKind::Choice(choice_options(&MEASURES)),
                ParamValue::text("Sales"),
            ),
        ]
    }

    fn transform(&self, data: &Table, params: &Params) -> Result<Table> {
        let yearly = with_year(data, "Order Date", "Year")?
            .group_by(&["Sub-Category", "Year"], &[Agg::sum("Sales")])?
            .share_of_total("Sales", "% of Total", &["Year"])?;

        let mut wide: BTreeMap<Value, BTreeMap<i64, (f64, f64)>> = BTreeMap::new();
        for row in yearly.rows() {
            let (Some(year), Some(sales), Some(share)) = (row[1].as_i64(), row[2].as_f64(), row[3].as_f64())
            else {
                continue;
            };
            wide.entry(row[0].clone()).or_default().insert(year, (sales, share));
        }

        let mut out = Table::new(std::iter::once("Sub-Category".to_string()).chain(value_columns()));
        for (sub_category, years) in wide {
            let mut row = vec![sub_category];
            for year in SUPERSTORE_YEARS {
                let current = years.get(&year);
                let diff = match (current, years.get(&(year - 1))) {
                    _ if year == SUPERSTORE_YEARS[0] => Value::Null,
                    (Some(&(sales, _)), Some(&(prior, _))) => percent_change(sales, prior).into(),
                    _ => Value::Null,
                };
                row.push(Value::from(current.map(|c| c.0)));
                row.push(Value::from(current.map(|c| c.1)));
                row.push(diff);
            }
            out.push_row(row)?;
        }

        let key = column_name(params.int("year")?, params.text("measure")?);
        if !out.has_column(&key) {
            return Ok(out);
        }
        out.sort_by(&[SortKey::desc(&key), SortKey::asc("Sub-Category")])
    }

    fn build_chart(&self, derived: &Table, _params: &Params) -> Result<ChartSpec> {
        let value_columns = value_columns();
        let mut required = vec!["Sub-Category"];
        required.extend(value_columns.iter().map(String::as_str));
        chart_or_placeholder(derived, &required, self.title(), || {
            let rows = derived.len();
            let sales_columns: Vec<Vec<f64>> = SUPERSTORE_YEARS
                .iter()
                .map(|&y| derived.floats(&column_name(y, "Sales")))
                .collect::<Result<_>>()?;
            let present = || sales_columns.iter().flatten().copied().filter(|v| !v.is_nan());
            let min = present().fold(f64::INFINITY, f64::min);
            let max = present().fold(f64::NEG_INFINITY, f64::max);
            let scale = ColorScale::red_blue();

            let mut header = vec!["Sub-Category".to_string()];
            header.extend(value_columns.iter().cloned());
            let mut columns = vec![derived.texts("Sub-Category")?];
            let mut fills = vec![vec![CELL_FILL; rows]];
            let mut text_colors = vec![vec![Rgb::BLACK; rows]];

            for name in &value_columns {
                let values = derived.floats(name)?;
                if name.ends_with(" Sales") {
                    let colors: Vec<Rgb> = values
                        .iter()
                        .map(|&v| if v.is_nan() { CELL_FILL } else { scale.sample_range(v, min, max) })
                        .collect();
                    text_colors.push(colors.iter().map(Rgb::contrasting_text).collect());
                    fills.push(colors);
                    columns.push(values.iter().map(|&v| format::currency(v, 0)).collect());
                } else {
                    fills.push(vec![CELL_FILL; rows]);
                    text_colors.push(vec![Rgb::BLACK; rows]);
                    columns.push(values.iter().map(|&v| format::percent(v, 2, false)).collect());
                }
            }

            let mut spec = ChartSpec::new(self.title()).size(1000, 600);
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

    fn table() -> Table {
        superstore(vec![
            Order::new(d(2014, 3, 1), "Furniture", "Chairs", 100.0),
            Order::new(d(2015, 3, 1), "Furniture", "Chairs", 150.0),
            Order::new(d(2014, 3, 1), "Furniture", "Tables", 300.0),
            Order::new(d(2015, 3, 1), "Furniture", "Tables", 50.0),
            Order::new(d(2017, 3, 1), "Technology", "Phones", 10.0),
        ])
    }

    fn params(year: i64, measure: &str) -> Params {
        Params::new()
            .with("year", ParamValue::Int(year))
            .with("measure", ParamValue::text(measure))
    }

    #[test]
    fn yearly_measures_side_by_side() {
        let t = SubCategoryByYear.transform(&table(), &params(2015, "Sales")).unwrap();
        assert_eq!(t.columns().len(), 13);
        assert_eq!(t.texts("Sub-Category").unwrap(), vec!["Chairs", "Tables", "Phones"]);
        let shares = t.floats("2014 % of Total").unwrap();
        assert_eq!(shares[..2], [0.25, 0.75]);
        assert!(shares[2].is_nan());
        assert!(t.value(0, "2014 % Diff").unwrap().is_null());
        let diffs = t.floats("2015 % Diff").unwrap();
        assert_eq!(diffs[0], 0.5);
        assert!((diffs[1] + 250.0 / 300.0).abs() < 1e-12);
        assert!(diffs[2].is_nan());
        // no sales the year before leaves the cell blank
        assert!(t.floats("2017 % Diff").unwrap()[2].is_nan());
    }

    #[test]
    fn sorts_by_chosen_measure_with_gaps_last() {
        let t = SubCategoryByYear.transform(&table(), &params(2015, "% Diff")).unwrap();
        assert_eq!(t.texts("Sub-Category").unwrap(), vec!["Chairs", "Tables", "Phones"]);
        let t = SubCategoryByYear.transform(&table(), &params(2017, "Sales")).unwrap();
        assert_eq!(t.texts("Sub-Category").unwrap()[0], "Phones");
    }

    #[test]
    fn sales_cells_are_shaded() {
        let p = params(2017, "Sales");
        let t = SubCategoryByYear.transform(&table(), &p).unwrap();
        let spec = SubCategoryByYear.build_chart(&t, &p).unwrap();
        let Mark::Table(cells) = &spec.traces[0].mark else {
            panic!("expected a table");
        };
        assert_eq!(cells.columns.len(), 13);
        assert_ne!(cells.fills[1][1], CELL_FILL);
        assert_eq!(cells.fills[2][1], CELL_FILL);
        assert_eq!(cells.columns[0][0], "Phones");
        assert_eq!(cells.columns[10][0], "$10");
    }
}
