//! How the first two quarters compare to the remaining months, with quarters
//! counted from a configurable start month.

use chrono::Datelike;

use crate::chart::{data, ChartSpec, Mark, Trace};
use crate::color::Rgb;
use crate::data::calendar::QuarterBucket;
use crate::data::loader::{DatasetSource, SUPERSTORE};
use crate::data::model::{Table, Value};
use crate::data::ops::{Agg, SortKey};
use crate::error::Result;

use super::{
    chart_or_placeholder, select_years_and_categories, ParamKind, ParamSpec, ParamValue, Params,
    Pipeline, SUPERSTORE_YEARS,
};

const COLUMNS: [&str; 4] = ["Group", "Sales", "Month", "Month Name"];
const BAR: Rgb = Rgb::hex(0xBAB0AC);
const HIGHLIGHT: Rgb = Rgb::hex(0x4E79A7);

pub struct QuartersVsMonths;

impl Pipeline for QuartersVsMonths {
    fn id(&self) -> &'static str {
        "2018w05"
    }

    fn title(&self) -> &'static str {
        "How do Q1 and Q2 compare to other months?"
    }

    fn source_url(&self) -> &'static str {
        super::SERIES_URL
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
                ParamValue::int_set(SUPERSTORE_YEARS),
            ),
            ParamSpec::new(
                "start_month",
                "Quarter start month",
                ParamKind::Month,
                ParamValue::Int(1),
            ),
        ]
    }

    fn transform(&self, data: &Table, params: &Params) -> Result<Table> {
        let start = params.uint("start_month")?;
        let selected = select_years_and_categories(data, params.int_set("years")?, None)?
            .sort_by(&[SortKey::asc("Order Date")])?;
        selected.dates("Order Date")?;
        let bucket = move |v: &Value| v.as_date().map(|d| QuarterBucket::of(d.month(), start));

        selected
            .derive("Group", &["Order Date"], |v| Value::from(bucket(v[0]).map(|b| b.label(false))))?
            .derive("Month Name", &["Order Date"], |v| {
                Value::from(bucket(v[0]).map(|b| b.label(true)))
            })?
            .derive("Month", &["Order Date"], |v| Value::from(bucket(v[0]).map(|b| b.sort_key(start))))?
            .group_by(
                &["Group"],
                &[Agg::sum("Sales"), Agg::first("Month"), Agg::first("Month Name")],
            )?
            .sort_by(&[SortKey::asc("Month")])
    }

    fn build_chart(&self, derived: &Table, _params: &Params) -> Result<ChartSpec> {
        chart_or_placeholder(derived, &COLUMNS, self.title(), || {
            let groups = derived.texts("Group")?;
            let colors = groups
                .iter()
                .map(|g| if g == "Q1" || g == "Q2" { HIGHLIGHT } else { BAR })
                .collect();

            let mut spec = ChartSpec::new(self.title())
                .size(500, 600)
                .footer("Week 5, 2018");
            let panel = spec.panel_mut(0);
            panel.x.categories = groups.clone();
            panel.y.title = Some("Sales".into());
            panel.y.tick_format = Some("$,.0f".into());
            spec.push(
                Trace::new("Sales", Mark::Bar { horizontal: false })
                    .xy(data(groups), data(derived.floats("Sales")?))
                    .text(derived.texts("Month Name")?)
                    .color(BAR)
                    .point_colors(colors)
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
            Order::new(d(2016, 11, 5), "Furniture", "Chairs", 1.0),
            Order::new(d(2017, 1, 5), "Furniture", "Chairs", 2.0),
            Order::new(d(2017, 3, 5), "Furniture", "Chairs", 4.0),
            Order::new(d(2017, 6, 5), "Furniture", "Chairs", 8.0),
            Order::new(d(2017, 12, 5), "Furniture", "Chairs", 16.0),
        ])
    }

    fn params(years: &[i64], start: i64) -> Params {
        Params::new()
            .with("years", ParamValue::int_set(years.iter().copied()))
            .with("start_month", ParamValue::Int(start))
    }

    #[test]
    fn quarters_follow_start_month() {
        let t = QuartersVsMonths.transform(&table(), &params(&[2016, 2017], 11)).unwrap();
        assert_eq!(t.columns(), &COLUMNS);
        assert_eq!(t.texts("Group").unwrap(), vec!["Jun", "Q1", "Q2"]);
        assert_eq!(t.floats("Sales").unwrap(), vec![8.0, 19.0, 4.0]);
        assert_eq!(t.texts("Month Name").unwrap(), vec!["June", "Q1", "Q2"]);
    }

    #[test]
    fn calendar_quarters_from_january() {
        let t = QuartersVsMonths.transform(&table(), &params(&[2017], 1)).unwrap();
        assert_eq!(t.texts("Group").unwrap(), vec!["Q1", "Q2", "Dec"]);
        assert_eq!(t.floats("Sales").unwrap(), vec![6.0, 8.0, 16.0]);
    }

    #[test]
    fn no_years_is_empty_with_placeholder_chart() {
        let p = params(&[], 1);
        let t = QuartersVsMonths.transform(&table(), &p).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.columns(), &COLUMNS);
        assert!(QuartersVsMonths.build_chart(&t, &p).unwrap().is_placeholder());
    }

    #[test]
    fn quarters_are_highlighted() {
        let p = params(&[2017], 1);
        let t = QuartersVsMonths.transform(&table(), &p).unwrap();
        let spec = QuartersVsMonths.build_chart(&t, &p).unwrap();
        assert_eq!(spec.traces[0].point_colors, vec![HIGHLIGHT, HIGHLIGHT, BAR]);
    }
}
