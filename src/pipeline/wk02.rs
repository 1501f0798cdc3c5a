//! Year to fiscal date running totals, one line per fiscal year overlaid on
//! a shared month-day axis.

use chrono::Days;

use crate::chart::{data, ChartSpec, Datum, Mark, Trace};
use crate::color::ColorMap;
use crate::data::calendar::{fiscal_aligned_date, fiscal_year};
use crate::data::loader::{DatasetSource, SUPERSTORE};
use crate::data::model::{Table, Value};
use crate::data::ops::{Agg, SortKey};
use crate::error::Result;

use super::{chart_or_placeholder, ParamKind, ParamSpec, ParamValue, Params, Pipeline};

const COLUMNS: [&str; 5] = ["Order Date", "Sales", "Fiscal Year", "Running Sales", "Aligned Date"];

pub struct FiscalRunningTotals;

impl Pipeline for FiscalRunningTotals {
    fn id(&self) -> &'static str {
        "2018w02"
    }

    fn title(&self) -> &'static str {
        "Fiscal Date Running Sum"
    }

    fn source_url(&self) -> &'static str {
        "https://workout-wednesday.com/workout-wednesday-2018-week-2-year-to-fiscal-date-running-totals/"
    }

    fn dataset(&self) -> DatasetSource {
        SUPERSTORE
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::new(
            "start_month",
            "Fiscal Month Start",
            ParamKind::Month,
            ParamValue::Int(1),
        )]
    }

    fn transform(&self, data: &Table, params: &Params) -> Result<Table> {
        let start = params.uint("start_month")?;
        let daily = data
            .group_by(&["Order Date"], &[Agg::sum("Sales")])?
            .sort_by(&[SortKey::asc("Order Date")])?;
        daily.dates("Order Date")?;
        daily
            .derive("Fiscal Year", &["Order Date"], |v| {
                Value::from(v[0].as_date().map(|d| fiscal_year(d, start)))
            })?
            .cumulative_sum("Sales", "Running Sales", &["Fiscal Year"])?
            .derive("Aligned Date", &["Order Date"], |v| {
                Value::from(v[0].as_date().map(|d| fiscal_aligned_date(d, start)))
            })
    }

    fn build_chart(&self, derived: &Table, _params: &Params) -> Result<ChartSpec> {
        chart_or_placeholder(derived, &COLUMNS, self.title(), || {
            let years = derived.unique_values("Fiscal Year")?;
            let colors = ColorMap::new(&years);
            let mut spec = ChartSpec::new(self.title()).size(800, 600);

            let mut longest: Option<(usize, Datum, Datum)> = None;
            for year in &years {
                let series = derived.filter("Fiscal Year", |v| v == year)?;
                let x = series.dates("Aligned Date")?;
                let y = series.floats("Running Sales")?;
                let (Some(&first), Some(&last), Some(&total)) = (x.first(), x.last(), y.last()) else {
                    continue;
                };
                if longest.as_ref().map_or(true, |(n, _, _)| x.len() > *n) {
                    longest = Some((
                        x.len(),
                        Datum::Date(first - Days::new(15)),
                        Datum::Date(last + Days::new(15)),
                    ));
                }
                spec.annotate(year.to_string(), last, total);
                spec.push(
                    Trace::new(year.to_string(), Mark::line())
                        .xy(data(x), data(y))
                        .color(colors.color_for(year))
                        .hide_legend(),
                );
            }

            let panel = spec.panel_mut(0);
            panel.x.tick_format = Some("%b %d".into());
            panel.y.tick_format = Some("$,.0f".into());
            panel.x.range = longest.map(|(_, lo, hi)| (lo, hi));
            Ok(spec)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::*;

    fn run(start_month: i64) -> Table {
        let table = superstore(vec![
            Order::new(d(2016, 2, 15), "Furniture", "Chairs", 10.0),
            Order::new(d(2016, 2, 15), "Furniture", "Tables", 5.0),
            Order::new(d(2016, 3, 1), "Furniture", "Chairs", 20.0),
            Order::new(d(2016, 4, 1), "Furniture", "Chairs", 40.0),
            Order::new(d(2016, 5, 1), "Furniture", "Chairs", 80.0),
        ]);
        let params = Params::new().with("start_month", ParamValue::Int(start_month));
        FiscalRunningTotals.transform(&table, &params).unwrap()
    }

    #[test]
    fn running_total_restarts_each_fiscal_year() {
        let t = run(4);
        assert_eq!(t.columns(), &COLUMNS);
        assert_eq!(t.len(), 4);
        assert_eq!(
            t.column("Fiscal Year").unwrap(),
            vec![&Value::Integer(2015), &Value::Integer(2015), &Value::Integer(2016), &Value::Integer(2016)]
        );
        assert_eq!(t.floats("Running Sales").unwrap(), vec![15.0, 35.0, 40.0, 120.0]);
        assert_eq!(t.dates("Aligned Date").unwrap()[0], d(1940, 2, 15));
        assert_eq!(t.dates("Aligned Date").unwrap()[2], d(1939, 4, 1));
    }

    #[test]
    fn january_start_is_calendar_year() {
        let t = run(1);
        assert_eq!(t.floats("Running Sales").unwrap(), vec![15.0, 35.0, 75.0, 155.0]);
    }

    #[test]
    fn one_line_per_fiscal_year_with_padded_range() {
        let t = run(4);
        let spec = FiscalRunningTotals.build_chart(&t, &Params::new()).unwrap();
        assert_eq!(spec.traces.len(), 2);
        assert_eq!(spec.annotations.len(), 2);
        let (lo, _) = spec.panels[0].x.range.clone().unwrap();
        assert_eq!(lo, Datum::Date(d(1940, 1, 31)));
    }
}
