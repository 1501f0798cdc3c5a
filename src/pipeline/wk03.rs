//! Rolling three month sales per category, split at a movable date into a
//! coloured past and a grey future.

use chrono::NaiveDate;

use crate::chart::{data, format, ChartSpec, Datum, Fill, Mark, Rule, Trace};
use crate::color::Rgb;
use crate::data::calendar::month_start;
use crate::data::filter::between;
use crate::data::loader::{DatasetSource, SUPERSTORE};
use crate::data::model::{Table, Value};
use crate::data::ops::Agg;
use crate::error::Result;

use super::{chart_or_placeholder, ParamKind, ParamSpec, ParamValue, Params, Pipeline};

const COLUMNS: [&str; 4] = ["Category", "Month", "Sales", "Rolling Sales"];
const FUTURE: Rgb = Rgb::hex(0x838383);

fn category_color(category: &str) -> Rgb {
    match category {
        "Technology" => Rgb::hex(0xADA758),
        "Furniture" => Rgb::hex(0xAA7E93),
        "Office Supplies" => Rgb::hex(0x71A790),
        _ => Rgb::GRAY,
    }
}

fn window() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(2014, 1, 1).unwrap_or_default(),
        NaiveDate::from_ymd_opt(2018, 3, 30).unwrap_or_default(),
    )
}

pub struct RollingThreeMonths;

struct Series {
    category: String,
    months: Vec<NaiveDate>,
    rolling: Vec<f64>,
}

impl Series {
    fn split(&self, keep: impl Fn(NaiveDate) -> bool) -> (Vec<NaiveDate>, Vec<f64>) {
        self.months
            .iter()
            .zip(&self.rolling)
            .filter(|(m, _)| keep(**m))
            .map(|(m, r)| (*m, *r))
            .unzip()
    }

    fn at(&self, month: NaiveDate) -> Option<f64> {
        self.months
            .iter()
            .position(|m| *m == month)
            .map(|i| self.rolling[i])
    }
}

impl Pipeline for RollingThreeMonths {
    fn id(&self) -> &'static str {
        "2018w03"
    }

    fn title(&self) -> &'static str {
        "Rolling three month sales: a retrospective"
    }

    fn source_url(&self) -> &'static str {
        "https://workout-wednesday.com/week3/"
    }

    fn dataset(&self) -> DatasetSource {
        SUPERSTORE
    }

    fn params(&self) -> Vec<ParamSpec> {
        let (min, _) = window();
        vec![ParamSpec::new(
            "date",
            "Split date",
            ParamKind::Date {
                min,
                max: NaiveDate::from_ymd_opt(2017, 12, 31).unwrap_or(min),
            },
            ParamValue::Date(NaiveDate::from_ymd_opt(2016, 6, 1).unwrap_or(min)),
        )]
    }

    fn transform(&self, data: &Table, _params: &Params) -> Result<Table> {
        let (start, end) = window();
        let selected = between(data, "Order Date", start, end)?;
        selected
            .derive("Month", &["Order Date"], |v| Value::from(v[0].as_date().map(month_start)))?
            .group_by(&["Category", "Month"], &[Agg::sum("Sales")])?
            .rolling_sum("Sales", "Rolling Sales", 3, &["Category"])
    }

    fn build_chart(&self, derived: &Table, params: &Params) -> Result<ChartSpec> {
        chart_or_placeholder(derived, &COLUMNS, self.title(), || {
            let split = month_start(params.date("date")?);
            let mut series = Vec::new();
            for category in derived.unique_in_order("Category")? {
                let rows = derived.filter("Category", |v| *v == category)?;
                series.push(Series {
                    category: category.to_string(),
                    months: rows.dates("Month")?,
                    rolling: rows.floats("Rolling Sales")?,
                });
            }

            let mut spec = ChartSpec::new("#WorkoutWednesday")
                .subtitle(self.title())
                .footer("Dataset: Superstore Sample | Categories ordered by sales");
            let (start, end) = window();
            let panel = spec.panel_mut(0);
            panel.x.range = Some((Datum::Date(start), Datum::Date(end)));
            panel.x.tick_format = Some("%b-%y".into());
            panel.y.tick_format = Some("$,.0f".into());

            // Largest series sits on top of each stack.
            let mut past: Vec<(String, Vec<NaiveDate>, Vec<f64>)> = series
                .iter()
                .map(|s| {
                    let (x, y) = s.split(|m| m <= split);
                    (s.category.clone(), x, y)
                })
                .collect();
            past.sort_by(|a, b| last_or_zero(&a.2).total_cmp(&last_or_zero(&b.2)));
            for (category, x, y) in past {
                spec.push(
                    Trace::new(category.as_str(), Mark::area(Fill::ToNext))
                        .xy(data(x), data(y))
                        .color(category_color(&category))
                        .stack("past"),
                );
            }

            let mut future: Vec<(String, Vec<NaiveDate>, Vec<f64>)> = series
                .iter()
                .map(|s| {
                    let (x, y) = s.split(|m| m >= split);
                    (s.category.clone(), x, y)
                })
                .collect();
            future.sort_by(|a, b| first_or_zero(&a.2).total_cmp(&first_or_zero(&b.2)));
            for (category, x, y) in future {
                spec.push(
                    Trace::new(category.as_str(), Mark::area(Fill::ToNext))
                        .xy(data(x), data(y))
                        .color(FUTURE)
                        .stack("future")
                        .hide_legend(),
                );
            }

            let mut labels: Vec<(&Series, f64)> = series
                .iter()
                .filter_map(|s| s.at(split).map(|v| (s, v)))
                .collect();
            labels.sort_by(|a, b| a.1.total_cmp(&b.1));
            for (s, value) in labels {
                spec.push(
                    Trace::new(format!("{} label", s.category), Mark::Text)
                        .xy(vec![Datum::Date(split)], vec![Datum::Number(value)])
                        .text(vec![format!("{}\n{}", s.category, format::currency_k(value))])
                        .color(category_color(&s.category))
                        .stack("labels")
                        .hide_legend(),
                );
            }

            spec.rule(Rule::vertical(split).dashed());
            Ok(spec)
        })
    }
}

fn last_or_zero(values: &[f64]) -> f64 {
    values.last().copied().unwrap_or(0.0)
}

fn first_or_zero(values: &[f64]) -> f64 {
    values.first().copied().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::*;

    fn table() -> Table {
        superstore(vec![
            Order::new(d(2013, 12, 31), "Furniture", "Chairs", 999.0),
            Order::new(d(2016, 4, 3), "Furniture", "Chairs", 10.0),
            Order::new(d(2016, 4, 20), "Furniture", "Tables", 10.0),
            Order::new(d(2016, 5, 3), "Furniture", "Chairs", 30.0),
            Order::new(d(2016, 6, 9), "Furniture", "Chairs", 40.0),
            Order::new(d(2016, 7, 9), "Furniture", "Chairs", 50.0),
            Order::new(d(2016, 6, 1), "Technology", "Phones", 7.0),
        ])
    }

    fn params() -> Params {
        Params::new().with("date", ParamValue::Date(d(2016, 6, 17)))
    }

    #[test]
    fn monthly_rolling_sum_per_category() {
        let t = RollingThreeMonths.transform(&table(), &params()).unwrap();
        assert_eq!(t.columns(), &COLUMNS);
        assert_eq!(
            t.texts("Category").unwrap(),
            vec!["Furniture", "Furniture", "Furniture", "Furniture", "Technology"]
        );
        assert_eq!(t.floats("Sales").unwrap(), vec![20.0, 30.0, 40.0, 50.0, 7.0]);
        assert_eq!(t.floats("Rolling Sales").unwrap(), vec![20.0, 50.0, 90.0, 120.0, 7.0]);
    }

    #[test]
    fn chart_splits_at_month_of_date() {
        let t = RollingThreeMonths.transform(&table(), &params()).unwrap();
        let spec = RollingThreeMonths.build_chart(&t, &params()).unwrap();
        let furniture_past = spec
            .traces
            .iter()
            .find(|t| t.name == "Furniture" && t.stack_group.as_deref() == Some("past"))
            .unwrap();
        assert_eq!(furniture_past.len(), 3);
        let label = spec.traces.iter().find(|t| t.name == "Furniture label").unwrap();
        assert_eq!(label.text[0], "Furniture\n$0.1K");
        assert_eq!(spec.rules[0].at, Datum::Date(d(2016, 6, 1)));
    }
}
