//! U.S. births per year for one first name, split by sex.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};

use crate::chart::{data, ChartSpec, Datum, Fill, Mark, Trace};
use crate::color::Rgb;
use crate::data::loader::{DatasetSource, BABY_NAMES};
use crate::data::model::{Table, Value};
use crate::error::{PipelineError, Result};

use super::{chart_or_placeholder, ParamKind, ParamSpec, ParamValue, Params, Pipeline, SERIES_URL};

const COLUMNS: [&str; 4] = ["year", "sex", "name", "n"];
/// Shown when the requested name does not occur in the data.
const FALLBACK_NAME: &str = "Rody";

fn sex_style(sex: &str) -> (&'static str, Rgb) {
    match sex {
        "M" => ("Male", Rgb::hex(0xF3D744)),
        "F" => ("Female", Rgb::hex(0x87D6BD)),
        _ => ("Unknown", Rgb::GRAY),
    }
}

/// Upper-case the first letter of every word, lower-case the rest.
pub(crate) fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.trim().chars() {
        if at_word_start {
            out.extend(ch.to_uppercase());
        } else {
            out.extend(ch.to_lowercase());
        }
        at_word_start = !ch.is_alphabetic();
    }
    out
}

pub struct BirthsByName;

impl Pipeline for BirthsByName {
    fn id(&self) -> &'static str {
        "2018w08"
    }

    fn title(&self) -> &'static str {
        "Births by year in U.S."
    }

    fn source_url(&self) -> &'static str {
        SERIES_URL
    }

    fn dataset(&self) -> DatasetSource {
        BABY_NAMES
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::new(
            "name",
            "Name",
            ParamKind::Text,
            ParamValue::text(FALLBACK_NAME),
        )]
    }

    fn transform(&self, data: &Table, params: &Params) -> Result<Table> {
        data.require(&COLUMNS)?;
        let requested = title_case(params.text("name")?);
        let mut rows = data.filter("name", |v| v.as_str() == Some(requested.as_str()))?;
        if rows.is_empty() {
            log::warn!("name '{requested}' not found, showing {FALLBACK_NAME} instead");
            rows = data.filter("name", |v| v.as_str() == Some(FALLBACK_NAME))?;
        }

        // Births per sex and year; years missing inside a sex's range count zero.
        let mut per_sex: BTreeMap<Value, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        let mut shown = Value::Null;
        for row in rows.select(&COLUMNS)?.rows() {
            let year = row[0]
                .as_date()
                .ok_or_else(|| PipelineError::wrong_type("year", "a date", &row[0]))?;
            shown = row[2].clone();
            *per_sex.entry(row[1].clone()).or_default().entry(year).or_insert(0.0) +=
                row[3].as_f64().unwrap_or(0.0);
        }

        let mut by_total: Vec<(Value, BTreeMap<NaiveDate, f64>)> = per_sex.into_iter().collect();
        by_total.sort_by(|a, b| {
            let total = |m: &BTreeMap<NaiveDate, f64>| m.values().sum::<f64>();
            total(&b.1).total_cmp(&total(&a.1))
        });

        let mut out = Table::new(COLUMNS);
        for (sex, years) in by_total {
            let (Some(first), Some(last)) = (years.keys().next(), years.keys().next_back()) else {
                continue;
            };
            for year in first.year()..=last.year() {
                let Some(date) = NaiveDate::from_ymd_opt(year, 1, 1) else {
                    continue;
                };
                let n = years.get(&date).copied().unwrap_or(0.0);
                out.push_row(vec![date.into(), sex.clone(), shown.clone(), n.into()])?;
            }
        }
        Ok(out)
    }

    fn build_chart(&self, derived: &Table, params: &Params) -> Result<ChartSpec> {
        chart_or_placeholder(derived, &COLUMNS, self.title(), || {
            let shown = derived.texts("name")?.into_iter().next().unwrap_or_default();
            let requested = title_case(params.text("name")?);
            let subtitle = if shown == requested {
                shown.clone()
            } else {
                format!("{shown} ('{requested}' was not found)")
            };
            let mut spec = ChartSpec::new(self.title()).size(600, 500).subtitle(subtitle);

            let years = derived.dates("year")?;
            let (Some(&min), Some(&max)) = (years.iter().min(), years.iter().max()) else {
                return Ok(spec);
            };
            spec.panel_mut(0).x.range = Some((
                Datum::Date(min - Days::new(2000)),
                Datum::Date(max + Days::new(1500)),
            ));

            for sex in derived.unique_in_order("sex")? {
                let rows = derived.filter("sex", |v| *v == sex)?;
                let x = rows.dates("year")?;
                let y = rows.floats("n")?;
                let (label, color) = sex_style(&sex.to_string());
                if let Some(peak) = (0..y.len()).max_by(|&a, &b| y[a].total_cmp(&y[b]).then(b.cmp(&a))) {
                    spec.push(
                        Trace::new(format!("{label} peak"), Mark::Text)
                            .xy(vec![Datum::Date(x[peak])], vec![Datum::Number(y[peak])])
                            .text(vec![format!("{label}\nPeaked in {}", x[peak].year())])
                            .color(color)
                            .hide_legend(),
                    );
                }
                spec.push(
                    Trace::new(label, Mark::area(Fill::ToZero))
                        .xy(data(x), data(y))
                        .color(color),
                );
            }
            Ok(spec)
        })
    }
}
