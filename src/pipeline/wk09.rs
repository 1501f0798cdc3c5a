//! The MLB diversity gap: share of white players against all players of
//! color per season.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::chart::{data, ChartSpec, Fill, Mark, Rule, Trace};
use crate::color::Rgb;
use crate::data::loader::{DatasetSource, MLB_DIVERSITY};
use crate::data::model::{Table, Value};
use crate::error::{PipelineError, Result};

use super::{chart_or_placeholder, Params, Pipeline, SERIES_URL};

const COLUMNS: [&str; 3] = ["Year", "White", "Players of Color"];
const COLOR: Rgb = Rgb::hex(0x8CD17D);
const BACKGROUND: Rgb = Rgb::BLACK;

fn decline_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2004, 1, 1).unwrap_or_default()
}

pub struct MlbDiversity;

impl Pipeline for MlbDiversity {
    fn id(&self) -> &'static str {
        "2018w09"
    }

    fn title(&self) -> &'static str {
        "The MLB Diversity Gap"
    }

    fn source_url(&self) -> &'static str {
        SERIES_URL
    }

    fn dataset(&self) -> DatasetSource {
        MLB_DIVERSITY
    }

    fn transform(&self, data: &Table, _params: &Params) -> Result<Table> {
        let shares = data.floats("% of Players")?;
        let years = data.dates("Year")?;
        let ethnicity = data.column("Ethnicity")?;

        let mut per_year: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
        for ((year, share), who) in years.into_iter().zip(shares).zip(ethnicity) {
            let entry = per_year.entry(year).or_insert((0.0, 0.0));
            let share = if share.is_nan() { 0.0 } else { share };
            match who.as_str() {
                Some("White") => entry.0 += share,
                Some(_) => entry.1 += share,
                None => return Err(PipelineError::wrong_type("Ethnicity", "text", who)),
            }
        }

        let mut out = Table::new(COLUMNS);
        for (year, (white, of_color)) in per_year {
            out.push_row(vec![Value::Date(year), white.into(), of_color.into()])?;
        }
        Ok(out)
    }

    fn build_chart(&self, derived: &Table, _params: &Params) -> Result<ChartSpec> {
        chart_or_placeholder(derived, &COLUMNS, self.title(), || {
            let years = derived.dates("Year")?;
            let mut spec = ChartSpec::new(self.title())
                .size(800, 500)
                .background(BACKGROUND)
                .subtitle(
                    "Since Jackie Robinson broke the Color Barrier in 1947, the MLB has grown \
                     more diverse. Since 2004 the percentage of players of color is declining.",
                );
            spec.panel_mut(0).y.tick_format = Some(".0%".into());
            spec.push(
                Trace::new("White", Mark::line())
                    .xy(data(years.clone()), data(derived.floats("White")?))
                    .color(Rgb::WHITE)
                    .hide_legend(),
            );
            spec.push(
                Trace::new("Players of Color", Mark::area(Fill::ToNext))
                    .xy(data(years), data(derived.floats("Players of Color")?))
                    .color(COLOR)
                    .hide_legend(),
            );
            spec.rule(
                Rule::vertical(decline_start())
                    .dashed()
                    .label("2004 The percent of Minority Players begins to decline"),
            );
            Ok(spec)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::d;

    fn roster() -> Table {
        let rows = [
            (2003, "White", 0.6),
            (2003, "Latino", 0.28),
            (2003, "African American", 0.1),
            (2004, "White", 0.61),
            (2004, "Latino", 0.29),
        ];
        Table::from_rows(
            ["Year", "Ethnicity", "% of Players"],
            rows.iter()
                .map(|&(y, e, p)| vec![d(y, 1, 1).into(), e.into(), p.into()])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn players_of_color_are_summed_per_year() {
        let t = MlbDiversity.transform(&roster(), &Params::new()).unwrap();
        assert_eq!(t.columns(), &COLUMNS);
        assert_eq!(t.len(), 2);
        let of_color = t.floats("Players of Color").unwrap();
        assert!((of_color[0] - 0.38).abs() < 1e-9);
        assert!((of_color[1] - 0.29).abs() < 1e-9);
        assert_eq!(t.floats("White").unwrap(), vec![0.6, 0.61]);
    }

    #[test]
    fn chart_marks_2004() {
        let t = MlbDiversity.transform(&roster(), &Params::new()).unwrap();
        let spec = MlbDiversity.build_chart(&t, &Params::new()).unwrap();
        assert_eq!(spec.background, Rgb::BLACK);
        assert_eq!(spec.traces.len(), 2);
        assert_eq!(spec.rules[0].at, crate::chart::Datum::Date(d(2004, 1, 1)));
    }
}
