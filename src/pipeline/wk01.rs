//! Looks vs. personality: share of people per nationality and gender who rank
//! a partner's personality above their looks.

use crate::chart::{data, ChartSpec, Datum, Mark, Rule, Symbol, Trace};
use crate::color::Rgb;
use crate::data::loader::{DatasetSource, LOOKS_VS_PERSONALITY};
use crate::data::model::{Table, Value};
use crate::data::ops::SortKey;
use crate::error::Result;

use super::{chart_or_placeholder, Params, Pipeline};

const MEASURE: &str = "Ranked personality higher than looks";
const GENDERS: [&str; 2] = ["Men", "Women"];
const TEAL: Rgb = Rgb::hex(0x449EA0);
const TRACK: Rgb = Rgb::hex(0xD5D6D8);
/// Number of widest gaps joined by a connector line.
const HIGHLIGHTED_GAPS: usize = 3;

pub struct LooksVsPersonality;

impl Pipeline for LooksVsPersonality {
    fn id(&self) -> &'static str {
        "2018w01"
    }

    fn title(&self) -> &'static str {
        "Across the world women are more likely than men to value personality over looks"
    }

    fn source_url(&self) -> &'static str {
        "https://www.vizwiz.com/2018/01/ww-looks-vs-personality.html"
    }

    fn dataset(&self) -> DatasetSource {
        LOOKS_VS_PERSONALITY
    }

    fn transform(&self, data: &Table, _params: &Params) -> Result<Table> {
        data.require(&["Nationality", "Gender", "Measure", "Value"])?;
        let selected = data.filter("Measure", |v| v.as_str().is_some_and(|m| m.contains(MEASURE)))?;
        let mut wide = selected.pivot("Nationality", "Gender", "Value")?;
        for gender in GENDERS {
            if !wide.has_column(gender) {
                wide = wide.derive(gender, &[], |_| Value::Null)?;
            }
        }
        wide.select(&["Nationality", "Men", "Women"])?
            .sort_by(&[SortKey::asc("Women"), SortKey::asc("Men")])
    }

    fn build_chart(&self, derived: &Table, _params: &Params) -> Result<ChartSpec> {
        chart_or_placeholder(derived, &["Nationality", "Men", "Women"], self.title(), || {
            let nations = derived.texts("Nationality")?;
            let men = derived.floats("Men")?;
            let women = derived.floats("Women")?;

            let mut spec = ChartSpec::new(self.title())
                .size(600, 700)
                .subtitle(
                    "% of people who ranked a romantic partner having a personality they liked \
                     as more important than them being good looking",
                )
                .footer("YouGov | yougov.com, July 23 - August 30, 2017");
            {
                let panel = spec.panel_mut(0);
                panel.x.range = Some((Datum::Number(0.0), Datum::Number(100.0)));
                panel.x.tick_format = Some("%".into());
                panel.y.categories = nations.clone();
            }

            spec.push(
                Trace::new("track", Mark::Bar { horizontal: true })
                    .xy(data(vec![100.0; nations.len()]), data(nations.clone()))
                    .color(TRACK)
                    .hide_legend(),
            );

            let mut gaps: Vec<(usize, f64)> = men
                .iter()
                .zip(&women)
                .map(|(m, w)| (w - m).abs())
                .enumerate()
                .filter(|(_, gap)| !gap.is_nan())
                .collect();
            gaps.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
            let mut xs = Vec::new();
            let mut ys = Vec::new();
            for &(i, _) in gaps.iter().take(HIGHLIGHTED_GAPS) {
                xs.extend([Datum::from(men[i]), Datum::from(women[i]), Datum::Gap]);
                ys.extend([
                    Datum::from(nations[i].as_str()),
                    Datum::from(nations[i].as_str()),
                    Datum::Gap,
                ]);
            }
            spec.push(
                Trace::new("gap", Mark::line())
                    .xy(xs, ys)
                    .color(Rgb::BLACK)
                    .hide_legend(),
            );

            for (gender, values, symbol) in [("Men", &men, Symbol::Circle), ("Women", &women, Symbol::Ring)] {
                spec.push(
                    Trace::new(gender, Mark::Markers { size: 8.0, symbol })
                        .xy(data(values.iter().copied()), data(nations.clone()))
                        .color(TEAL),
                );
            }

            if let Some(&(i, gap)) = gaps.first() {
                spec.annotate(
                    format!("Biggest difference: {} ({gap:.0}%)", nations[i]),
                    Datum::Number(women[i].max(men[i]) + 2.0),
                    Datum::from(nations[i].as_str()),
                );
            }
            spec.rule(Rule::vertical(50.0).dashed());
            Ok(spec)
        })
    }
}
