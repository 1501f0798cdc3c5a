//! Sub-category sales over the last N days, weeks or months compared with the
//! same window one year earlier.

use chrono::NaiveDate;

use crate::chart::{data, format, ChartSpec, Datum, Mark, Trace};
use crate::color::Rgb;
use crate::data::calendar::{previous_year, trailing_window, PeriodType};
use crate::data::filter;
use crate::data::loader::{DatasetSource, SUPERSTORE};
use crate::data::model::{Table, Value};
use crate::data::ops::{Agg, SortKey};
use crate::error::{PipelineError, Result};

use super::{chart_or_placeholder, ParamKind, ParamSpec, ParamValue, Params, Pipeline, SERIES_URL};

const COLUMNS: [&str; 5] = ["Sub-Category", "Sales", "Prior Sales", "Diff", "Direction"];
const UP: Rgb = Rgb::hex(0x4E79A7);
const DOWN: Rgb = Rgb::hex(0xD3480D);

fn direction(current: f64, prior: f64) -> &'static str {
    if current > prior {
        "▲"
    } else if current < prior {
        "▼"
    } else {
        ""
    }
}

/// Current and year-earlier windows for the selected parameters.
fn windows(params: &Params) -> Result<[(NaiveDate, NaiveDate); 2]> {
    let label = params.text("period")?;
    let period = PeriodType::parse(label)
        .ok_or_else(|| PipelineError::invalid_param("period", format!("unknown period '{label}'")))?;
    let (start, end) = trailing_window(params.date("end")?, period, params.uint("count")?);
    Ok([(start, end), (previous_year(start), previous_year(end))])
}

pub struct PeriodComparison;

impl Pipeline for PeriodComparison {
    fn id(&self) -> &'static str {
        "2018w16"
    }

    fn title(&self) -> &'static str {
        "Sales vs the same period last year"
    }

    fn source_url(&self) -> &'static str {
        SERIES_URL
    }

    fn dataset(&self) -> DatasetSource {
        SUPERSTORE
    }

    fn params(&self) -> Vec<ParamSpec> {
        let min = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default();
        let max = NaiveDate::from_ymd_opt(2017, 12, 30).unwrap_or(min);
        vec![
            ParamSpec::new("end", "End date", ParamKind::Date { min, max }, ParamValue::Date(max)),
            ParamSpec::new(
                "period",
                "Period type",
                ParamKind::Choice(PeriodType::ALL.iter().map(|p| p.label().to_string()).collect()),
                ParamValue::text(PeriodType::Month.label()),
            ),
            ParamSpec::new("count", "Number of periods", ParamKind::Count, ParamValue::Int(3)),
        ]
    }

    fn transform(&self, data: &Table, params: &Params) -> Result<Table> {
        let [current, prior] = windows(params)?;
        let per_sub_category = |(start, end): (NaiveDate, NaiveDate), alias: &str| {
            filter::between(data, "Order Date", start, end)?
                .group_by(&["Sub-Category"], &[Agg::sum("Sales").alias(alias)])
        };
        per_sub_category(current, "Sales")?
            .outer_join(&per_sub_category(prior, "Prior Sales")?, "Sub-Category")?
            .fill_null("Sales", Value::Float(0.0))?
            .fill_null("Prior Sales", Value::Float(0.0))?
            .derive("Diff", &["Sales", "Prior Sales"], |v| {
                let (c, p) = (v[0].as_f64().unwrap_or(0.0), v[1].as_f64().unwrap_or(0.0));
                Value::Float((c - p).abs())
            })?
            .derive("Direction", &["Sales", "Prior Sales"], |v| {
                direction(v[0].as_f64().unwrap_or(0.0), v[1].as_f64().unwrap_or(0.0)).into()
            })?
            .sort_by(&[SortKey::asc("Sales"), SortKey::asc("Sub-Category")])
    }

    fn build_chart(&self, derived: &Table, _params: &Params) -> Result<ChartSpec> {
        chart_or_placeholder(derived, &COLUMNS, self.title(), || {
            let names = derived.texts("Sub-Category")?;
            let sales = derived.floats("Sales")?;
            let diff = derived.floats("Diff")?;
            let arrows = derived.texts("Direction")?;
            let max = sales.iter().copied().fold(0.0, f64::max);

            let mut spec = ChartSpec::new(self.title()).size(700, 600);
            spec.show_legend = false;
            {
                let panel = spec.panel_mut(0);
                panel.x.range = Some((Datum::Number(0.0), Datum::Number(max * 1.2)));
                panel.x.hidden = true;
                panel.y.categories = names.iter().rev().cloned().collect();
            }
            let y = data(names.iter().map(String::as_str));
            spec.push(
                Trace::new("Sales", Mark::Bar { horizontal: true })
                    .xy(data(sales.iter().copied()), y.clone())
                    .text(sales.iter().map(|&s| format::currency(s, 0)).collect())
                    .color(UP),
            );
            spec.push(
                Trace::new("Change", Mark::Text)
                    .xy(data(sales.iter().map(|s| s + max * 0.1)), y)
                    .text(
                        arrows
                            .iter()
                            .zip(&diff)
                            .map(|(a, d)| format!("{a}{}", format::currency(*d, 0)))
                            .collect(),
                    )
                    .point_colors(arrows.iter().map(|a| if a == "▼" { DOWN } else { UP }).collect()),
            );
            Ok(spec)
        })
    }
}
