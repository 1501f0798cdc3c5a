//! Monthly sales per category drawn as a line, a step line or a jump plot.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::chart::{data, ChartSpec, Datum, Fill, LineShape, Mark, Symbol, Trace};
use crate::color::Rgb;
use crate::data::calendar::{month_start, shift_months};
use crate::data::loader::{DatasetSource, SUPERSTORE};
use crate::data::model::{Table, Value};
use crate::error::Result;

use super::{chart_or_placeholder, choice_options, ParamKind, ParamSpec, ParamValue, Params, Pipeline, SERIES_URL};

const COLUMNS: [&str; 3] = ["Category", "Month", "Sales"];
const CHART_TYPES: [&str; 3] = ["Line", "Step", "Jump"];
const FACETS: usize = 3;

fn chart_mark(chart_type: &str) -> (Mark, Rgb) {
    match chart_type {
        "Step" => (
            Mark::Line {
                shape: LineShape::Step,
                fill: Fill::None,
                dashed: false,
                width: 3.0,
            },
            Rgb::hex(0x72B966),
        ),
        "Jump" => (
            Mark::Markers {
                size: 12.0,
                symbol: Symbol::Dash,
            },
            Rgb::hex(0x4E79A7),
        ),
        _ => (Mark::line(), Rgb::hex(0xB4B4B4)),
    }
}

pub struct LineStepJump;

impl Pipeline for LineStepJump {
    fn id(&self) -> &'static str {
        "2018w17"
    }

    fn title(&self) -> &'static str {
        "Line, step or jump"
    }

    fn source_url(&self) -> &'static str {
        SERIES_URL
    }

    fn dataset(&self) -> DatasetSource {
        SUPERSTORE
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::new(
            "chart",
            "Chart type",
            ParamKind::Choice(choice_options(&CHART_TYPES)),
            ParamValue::text("Step"),
        )]
    }

    /// Sales per category and calendar month; months without orders between a
    /// category's first and last month count as zero.
    fn transform(&self, data: &Table, _params: &Params) -> Result<Table> {
        let categories = data.column("Category")?;
        let dates = data.dates("Order Date")?;
        let sales = data.floats("Sales")?;

        let mut monthly: BTreeMap<&Value, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        for ((category, date), amount) in categories.into_iter().zip(dates).zip(sales) {
            *monthly.entry(category).or_default().entry(month_start(date)).or_insert(0.0) +=
                if amount.is_nan() { 0.0 } else { amount };
        }

        let mut out = Table::new(COLUMNS);
        for (category, months) in monthly {
            let (Some(&first), Some(&last)) = (months.keys().next(), months.keys().next_back()) else {
                continue;
            };
            let mut month = first;
            while month <= last {
                let amount = months.get(&month).copied().unwrap_or(0.0);
                out.push_row(vec![category.clone(), month.into(), amount.into()])?;
                month = shift_months(month, 1);
            }
        }
        Ok(out)
    }

    fn build_chart(&self, derived: &Table, params: &Params) -> Result<ChartSpec> {
        chart_or_placeholder(derived, &COLUMNS, self.title(), || {
            let (mark, color) = chart_mark(params.text("chart")?);
            let categories = derived.unique_in_order("Category")?;
            let mut spec = ChartSpec::new(self.title())
                .size(1000, 800)
                .grid(FACETS, 1);
            spec.show_legend = false;

            for (panel, category) in categories.iter().take(FACETS).enumerate() {
                let rows = derived.filter("Category", |v| v == category)?;
                let axes = spec.panel_mut(panel);
                axes.title = Some(category.to_string());
                axes.x.range = Some((
                    Datum::from(NaiveDate::from_ymd_opt(2013, 12, 1).unwrap_or_default()),
                    Datum::from(NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or_default()),
                ));
                axes.y.range = Some((Datum::Number(0.0), Datum::Number(50_000.0)));
                axes.y.tick_format = Some("$,.0f".into());
                spec.push(
                    Trace::new(category.to_string(), mark.clone())
                        .xy(data(rows.dates("Month")?), data(rows.floats("Sales")?))
                        .color(color)
                        .panel(panel),
                );
            }
            Ok(spec)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::*;

    fn params(chart: &str) -> Params {
        Params::new().with("chart", ParamValue::text(chart))
    }

    #[test]
    fn gaps_between_months_are_zero_filled() {
        let t = LineStepJump.transform(&three_orders(), &params("Line")).unwrap();
        assert_eq!(t.columns(), &COLUMNS);
        let furniture = t.filter("Category", |v| v.as_str() == Some("Furniture")).unwrap();
        assert_eq!(furniture.floats("Sales").unwrap(), vec![100.0, 200.0]);
        let technology = t.filter("Category", |v| v.as_str() == Some("Technology")).unwrap();
        assert_eq!(technology.len(), 1);

        let table = superstore(vec![
            Order::new(d(2014, 1, 5), "Furniture", "Chairs", 10.0),
            Order::new(d(2014, 1, 20), "Furniture", "Chairs", 5.0),
            Order::new(d(2014, 4, 2), "Furniture", "Chairs", 1.0),
        ]);
        let t = LineStepJump.transform(&table, &params("Line")).unwrap();
        assert_eq!(t.floats("Sales").unwrap(), vec![15.0, 0.0, 0.0, 1.0]);
        assert_eq!(t.dates("Month").unwrap()[1], d(2014, 2, 1));
    }

    #[test]
    fn chart_type_picks_the_mark() {
        let t = LineStepJump.transform(&three_orders(), &params("Jump")).unwrap();
        for (chart, color) in [("Line", 0xB4B4B4), ("Step", 0x72B966), ("Jump", 0x4E79A7)] {
            let spec = LineStepJump.build_chart(&t, &params(chart)).unwrap();
            assert_eq!(spec.grid, (3, 1));
            assert_eq!(spec.traces.len(), 2);
            assert_eq!(spec.traces[1].panel, 1);
            assert_eq!(spec.traces[0].color, Rgb::hex(color));
        }
        let spec = LineStepJump.build_chart(&t, &params("Jump")).unwrap();
        assert!(matches!(spec.traces[0].mark, Mark::Markers { symbol: Symbol::Dash, .. }));
    }
}
