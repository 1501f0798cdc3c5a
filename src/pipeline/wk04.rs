//! Customers whose yearly sales never dropped from 2014 through 2017.

use std::collections::BTreeMap;

use crate::chart::{format, ChartSpec, Mark, TableCells, Trace};
use crate::color::Rgb;
use crate::data::loader::{DatasetSource, SUPERSTORE};
use crate::data::model::{Table, Value};
use crate::data::ops::{Agg, SortKey};
use crate::error::Result;

use super::{chart_or_placeholder, with_year, Params, Pipeline, SUPERSTORE_YEARS};

const EVEN_ROW: Rgb = Rgb::hex(0xF5F5F5);
const TITLE_GREEN: Rgb = Rgb::hex(0x508E48);

fn year_columns() -> Vec<String> {
    SUPERSTORE_YEARS.iter().map(i64::to_string).collect()
}

pub struct GrowingCustomers;

impl Pipeline for GrowingCustomers {
    fn id(&self) -> &'static str {
        "2018w04"
    }

    fn title(&self) -> &'static str {
        "These Customers just go up and up!"
    }

    fn source_url(&self) -> &'static str {
        "https://workout-wednesday.com/workoutwednesday-week4/"
    }

    fn dataset(&self) -> DatasetSource {
        SUPERSTORE
    }

    fn transform(&self, data: &Table, _params: &Params) -> Result<Table> {
        let yearly = with_year(data, "Order Date", "Year")?
            .group_by(&["Customer Name", "Year"], &[Agg::sum("Sales")])?;

        let mut per_customer: BTreeMap<Value, Vec<(i64, f64)>> = BTreeMap::new();
        for row in yearly.rows() {
            let year = row[1].as_i64().unwrap_or_default();
            let sales = row[2].as_f64().unwrap_or_default();
            per_customer.entry(row[0].clone()).or_default().push((year, sales));
        }

        let mut out = Table::new(std::iter::once("Customer Name".to_string()).chain(year_columns()));
        for (customer, years) in per_customer {
            let active: Vec<i64> = years.iter().map(|(y, _)| *y).collect();
            let growing = years.windows(2).all(|w| w[0].1 < w[1].1);
            if active == SUPERSTORE_YEARS && growing {
                let mut row = vec![customer];
                row.extend(years.iter().map(|(_, s)| Value::Float(*s)));
                out.push_row(row)?;
            }
        }
        out.sort_by(&[SortKey::desc("2017")])
    }

    fn build_chart(&self, derived: &Table, _params: &Params) -> Result<ChartSpec> {
        let mut required = vec!["Customer Name".to_string()];
        required.extend(year_columns());
        let required: Vec<&str> = required.iter().map(String::as_str).collect();
        chart_or_placeholder(derived, &required, self.title(), || {
            let mut header = vec![String::new()];
            header.extend(year_columns());

            let mut columns = vec![derived.texts("Customer Name")?];
            for year in year_columns() {
                columns.push(
                    derived
                        .floats(&year)?
                        .into_iter()
                        .map(|v| format::currency(v, 0))
                        .collect(),
                );
            }
            let stripes: Vec<Rgb> = (0..derived.len())
                .map(|i| if i % 2 == 0 { Rgb::WHITE } else { EVEN_ROW })
                .collect();
            let fills = vec![stripes; columns.len()];

            let mut spec = ChartSpec::new(self.title()).size(680, 640);
            spec.push(
                Trace::new(
                    "customers",
                    Mark::Table(TableCells {
                        header,
                        columns,
                        fills,
                        text_colors: Vec::new(),
                    }),
                )
                .color(TITLE_GREEN)
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
        let mut orders = Vec::new();
        for (i, year) in (2014..=2017).enumerate() {
            let step = i as f64;
            orders.push(Order::new(d(year, 3, 1), "Furniture", "Chairs", 100.0 + step).customer("Up"));
            orders.push(Order::new(d(year, 3, 1), "Furniture", "Chairs", 500.0 - step).customer("Down"));
            orders.push(Order::new(d(year, 3, 1), "Furniture", "Chairs", 300.0 + step).customer("Higher"));
        }
        for year in 2014..=2017 {
            orders.push(Order::new(d(year, 3, 1), "Furniture", "Chairs", 200.0).customer("Flat"));
        }
        orders.push(Order::new(d(2016, 3, 1), "Furniture", "Chairs", 10.0).customer("Sparse"));
        superstore(orders)
    }

    #[test]
    fn keeps_customers_growing_every_year() {
        let t = GrowingCustomers.transform(&table(), &Params::new()).unwrap();
        assert_eq!(t.columns(), &["Customer Name", "2014", "2015", "2016", "2017"]);
        assert_eq!(t.texts("Customer Name").unwrap(), vec!["Higher", "Up"]);
        assert_eq!(t.floats("2017").unwrap(), vec![303.0, 103.0]);
    }

    #[test]
    fn table_cells_are_striped_and_formatted() {
        let t = GrowingCustomers.transform(&table(), &Params::new()).unwrap();
        let spec = GrowingCustomers.build_chart(&t, &Params::new()).unwrap();
        let Mark::Table(cells) = &spec.traces[0].mark else {
            panic!("expected a table");
        };
        assert_eq!(cells.columns[1], vec!["$300", "$100"]);
        assert_eq!(cells.fills[0], vec![Rgb::WHITE, EVEN_ROW]);
    }
}
