//! Sub-category sales in the month up to a cut-off date against the same
//! stretch of the month before.

use chrono::NaiveDate;

use crate::chart::{data, format, ChartSpec, Datum, Fill, LineShape, Mark, Rule, Trace};
use crate::color::Rgb;
use crate::data::calendar::{month_start, shift_months};
use crate::data::filter;
use crate::data::loader::{DatasetSource, SUPERSTORE};
use crate::data::model::{Table, Value};
use crate::data::ops::{Agg, SortKey};
use crate::error::Result;

use super::{chart_or_placeholder, ParamKind, ParamSpec, ParamValue, Params, Pipeline, SERIES_URL};

const RECENT: &str = "Most Recent Month";
const PRIOR: &str = "Prior Month";
const COLUMNS: [&str; 4] = ["Sub-Category", RECENT, PRIOR, "Change"];
const RECENT_COLOR: Rgb = Rgb::hex(0x26897E);
const PRIOR_COLOR: Rgb = Rgb::hex(0x8DBFA8);
const GRID_COLOR: Rgb = Rgb::hex(0xDBDBDB);
/// Right edge of the label panel.
const LABEL_EDGE: f64 = 1.0;

/// `(start, end)` of the recent and the prior period for a cut-off date.
fn periods(current: NaiveDate) -> [(NaiveDate, NaiveDate); 2] {
    let prior = shift_months(current, -1);
    [(month_start(current), current), (month_start(prior), prior)]
}

fn period_label((start, end): (NaiveDate, NaiveDate)) -> String {
    format!("{} - {}", start.format("%Y/%m/%d"), end.format("%Y/%m/%d"))
}

pub struct MonthOverMonth;

impl Pipeline for MonthOverMonth {
    fn id(&self) -> &'static str {
        "2018w12"
    }

    fn title(&self) -> &'static str {
        "Month over month sales"
    }

    fn source_url(&self) -> &'static str {
        SERIES_URL
    }

    fn dataset(&self) -> DatasetSource {
        SUPERSTORE
    }

    fn params(&self) -> Vec<ParamSpec> {
        let min = NaiveDate::from_ymd_opt(2014, 2, 1).unwrap_or_default();
        let max = NaiveDate::from_ymd_opt(2017, 12, 30).unwrap_or(min);
        vec![ParamSpec::new(
            "date",
            "Current max date",
            ParamKind::Date { min, max },
            ParamValue::Date(max),
        )]
    }

    fn transform(&self, data: &Table, params: &Params) -> Result<Table> {
        let [recent, prior] = periods(params.date("date")?);
        let per_sub_category = |(start, end): (NaiveDate, NaiveDate), alias: &str| {
            filter::between(data, "Order Date", start, end)?
                .group_by(&["Sub-Category"], &[Agg::sum("Sales").alias(alias)])
        };
        per_sub_category(recent, RECENT)?
            .outer_join(&per_sub_category(prior, PRIOR)?, "Sub-Category")?
            .with_percent_change(RECENT, PRIOR, "Change")?
            .fill_null(RECENT, Value::Float(0.0))?
            .fill_null(PRIOR, Value::Float(0.0))?
            .sort_by(&[SortKey::desc("Change"), SortKey::asc("Sub-Category")])
    }

    fn build_chart(&self, derived: &Table, params: &Params) -> Result<ChartSpec> {
        chart_or_placeholder(derived, &COLUMNS, self.title(), || {
            let names = derived.texts("Sub-Category")?;
            let recent = derived.floats(RECENT)?;
            let prior = derived.floats(PRIOR)?;
            let change = derived.floats("Change")?;
            let labels = periods(params.date("date")?).map(period_label);

            let mut spec = ChartSpec::new(self.title()).size(600, 700).grid(1, 2);
            {
                let panel = spec.panel_mut(0);
                panel.x.range = Some((Datum::Number(0.0), Datum::Number(LABEL_EDGE)));
                panel.x.hidden = true;
                panel.y.categories = names.clone();
                panel.y.hidden = true;
            }
            {
                let panel = spec.panel_mut(1);
                panel.x.title = Some("Sales (Last Two Periods)".into());
                panel.x.tick_format = Some("$,.0f".into());
                panel.y.categories = names.clone();
                panel.y.hidden = true;
            }

            spec.push(
                Trace::new("Change", Mark::Text)
                    .xy(
                        vec![Datum::Number(LABEL_EDGE - 0.05); names.len()],
                        data(names.iter().map(String::as_str)),
                    )
                    .text(change.iter().map(|&c| format::percent(c, 1, true)).collect())
                    .hide_legend(),
            );
            spec.push(
                Trace::new("Sub-Category", Mark::Text)
                    .xy(vec![Datum::Number(0.0); names.len()], data(names.iter().map(String::as_str)))
                    .text(names.clone())
                    .hide_legend(),
            );
            spec.annotate_in(0, "Sub-Category", 0.0, names[0].as_str());
            spec.annotate_in(0, "Change", LABEL_EDGE - 0.05, names[0].as_str());
            spec.rule(Rule::vertical(LABEL_EDGE));

            let mut xs = Vec::new();
            let mut ys = Vec::new();
            for (i, name) in names.iter().enumerate() {
                xs.extend([Datum::from(recent[i]), Datum::from(prior[i]), Datum::Gap]);
                ys.extend([Datum::from(name.as_str()), Datum::from(name.as_str()), Datum::Gap]);
            }
            spec.push(
                Trace::new(
                    "connector",
                    Mark::Line {
                        shape: LineShape::Linear,
                        fill: Fill::None,
                        dashed: false,
                        width: 1.5,
                    },
                )
                .xy(xs, ys)
                .color(GRID_COLOR)
                .panel(1)
                .hide_legend(),
            );
            for ((column, values), (color, label)) in [(RECENT, &recent), (PRIOR, &prior)]
                .into_iter()
                .zip([RECENT_COLOR, PRIOR_COLOR].into_iter().zip(&labels))
            {
                spec.push(
                    Trace::new(format!("{column} ({label})"), Mark::markers(10.0))
                        .xy(data(values.iter().copied()), data(names.iter().map(String::as_str)))
                        .color(color)
                        .panel(1),
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

    fn table() -> Table {
        superstore(vec![
            Order::new(d(2015, 3, 2), "Furniture", "Chairs", 300.0),
            Order::new(d(2015, 3, 20), "Furniture", "Chairs", 999.0),
            Order::new(d(2015, 2, 10), "Furniture", "Chairs", 100.0),
            Order::new(d(2015, 2, 11), "Office Supplies", "Paper", 40.0),
            Order::new(d(2015, 3, 5), "Technology", "Phones", 70.0),
        ])
    }

    fn params(date: NaiveDate) -> Params {
        Params::new().with("date", ParamValue::Date(date))
    }

    #[test]
    fn periods_stop_at_the_same_day_of_month() {
        assert_eq!(
            periods(d(2015, 3, 31)),
            [(d(2015, 3, 1), d(2015, 3, 31)), (d(2015, 2, 1), d(2015, 2, 28))]
        );
        assert_eq!(period_label(periods(d(2015, 3, 15))[1]), "2015/02/01 - 2015/02/15");
    }

    #[test]
    fn change_is_guarded_and_sorted() {
        let t = MonthOverMonth.transform(&table(), &params(d(2015, 3, 15))).unwrap();
        assert_eq!(t.columns(), &COLUMNS);
        assert_eq!(t.texts("Sub-Category").unwrap(), vec!["Chairs", "Paper", "Phones"]);
        assert_eq!(t.floats(RECENT).unwrap(), vec![300.0, 0.0, 70.0]);
        assert_eq!(t.floats(PRIOR).unwrap(), vec![100.0, 40.0, 0.0]);
        assert_eq!(t.floats("Change").unwrap(), vec![2.0, 0.0, 0.0]);
    }

    #[test]
    fn no_sales_this_month_is_no_change() {
        let orders = vec![
            Order::new(d(2015, 3, 2), "Furniture", "Chairs", 300.0),
            Order::new(d(2015, 2, 11), "Office Supplies", "Paper", 40.0),
        ];
        let t = MonthOverMonth.transform(&superstore(orders), &params(d(2015, 3, 15))).unwrap();
        assert_eq!(t.texts("Sub-Category").unwrap(), vec!["Chairs", "Paper"]);
        assert_eq!(t.floats(RECENT).unwrap(), vec![300.0, 0.0]);
        assert_eq!(t.floats("Change").unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn quiet_months_are_empty() {
        let t = MonthOverMonth.transform(&table(), &params(d(2016, 6, 1))).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.columns(), &COLUMNS);
    }

    #[test]
    fn legend_names_carry_the_periods() {
        let p = params(d(2015, 3, 15));
        let t = MonthOverMonth.transform(&table(), &p).unwrap();
        let spec = MonthOverMonth.build_chart(&t, &p).unwrap();
        assert_eq!(spec.grid, (1, 2));
        let names: Vec<&str> = spec.traces.iter().filter(|t| t.show_legend).map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Most Recent Month (2015/03/01 - 2015/03/15)",
                "Prior Month (2015/02/01 - 2015/02/15)"
            ]
        );
        assert_eq!(spec.traces[0].text, vec!["+200.0%", "+0.0%", "+0.0%"]);
    }
}
