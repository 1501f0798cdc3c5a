//! Office Supplies sub-categories as a grid of 100-dot waffles.

use crate::chart::{ChartSpec, Datum, Mark, Trace};
use crate::color::Rgb;
use crate::data::loader::{DatasetSource, SUPERSTORE};
use crate::data::model::{Table, Value};
use crate::data::ops::{Agg, SortKey};
use crate::error::Result;

use super::{chart_or_placeholder, Params, Pipeline, SERIES_URL};

const COLUMNS: [&str; 4] = ["Sub-Category", "Sales", "Share", "Dots"];
const CATEGORY: &str = "Office Supplies";
const GRID: (usize, usize) = (3, 3);
const DOTS_WIDE: usize = 20;
const DOTS_HIGH: usize = 5;
const FILLED: Rgb = Rgb::hex(0x5A7993);
const EMPTY: Rgb = Rgb::hex(0xE6E6E6);

/// Share rounded to whole percent; a share that rounds to nothing still
/// shows one dot.
fn rounded_share(share: f64) -> f64 {
    let rounded = (share * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.01
    } else {
        rounded
    }
}

pub struct SmallMultipleGrids;

impl Pipeline for SmallMultipleGrids {
    fn id(&self) -> &'static str {
        "2018w11"
    }

    fn title(&self) -> &'static str {
        "Small Multiple Grids"
    }

    fn source_url(&self) -> &'static str {
        SERIES_URL
    }

    fn dataset(&self) -> DatasetSource {
        SUPERSTORE
    }

    fn transform(&self, data: &Table, _params: &Params) -> Result<Table> {
        data.filter("Category", |v| v.as_str() == Some(CATEGORY))?
            .group_by(&["Sub-Category"], &[Agg::sum("Sales")])?
            .share_of_total("Sales", "Share", &[])?
            .derive("Share", &["Share"], |v| {
                Value::Float(rounded_share(v[0].as_f64().unwrap_or(0.0)))
            })?
            .derive("Dots", &["Share"], |v| {
                Value::Integer((v[0].as_f64().unwrap_or(0.0) * 100.0).round() as i64)
            })?
            .sort_by(&[SortKey::desc("Share"), SortKey::asc("Sub-Category")])
    }

    fn build_chart(&self, derived: &Table, _params: &Params) -> Result<ChartSpec> {
        chart_or_placeholder(derived, &COLUMNS, self.title(), || {
            let names = derived.texts("Sub-Category")?;
            let shares = derived.floats("Share")?;
            let dots = derived.floats("Dots")?;

            let mut spec = ChartSpec::new(self.title())
                .size(800, 800)
                .grid(GRID.0, GRID.1);
            let (xs, ys): (Vec<Datum>, Vec<Datum>) = (0..DOTS_HIGH)
                .flat_map(|row| (0..DOTS_WIDE).map(move |col| (col, row)))
                .map(|(col, row)| (Datum::from(col as i64), Datum::from(row as i64)))
                .unzip();

            for (i, name) in names.iter().enumerate().take(GRID.0 * GRID.1) {
                let filled = dots[i].max(0.0) as usize;
                let colors = (0..DOTS_WIDE * DOTS_HIGH)
                    .map(|n| if n < filled { FILLED } else { EMPTY })
                    .collect();
                let panel = spec.panel_mut(i);
                panel.title = Some(format!("{name} ({:.0}%)", shares[i] * 100.0));
                panel.x.reversed = true;
                panel.x.hidden = true;
                panel.y.hidden = true;
                spec.push(
                    Trace::new(name.as_str(), Mark::markers(12.0))
                        .xy(xs.clone(), ys.clone())
                        .point_colors(colors)
                        .color(FILLED)
                        .panel(i)
                        .hide_legend(),
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
            Order::new(d(2017, 1, 1), "Office Supplies", "Binders", 700.0),
            Order::new(d(2017, 1, 1), "Office Supplies", "Paper", 298.0),
            Order::new(d(2017, 1, 1), "Office Supplies", "Labels", 2.0),
            Order::new(d(2017, 1, 1), "Furniture", "Chairs", 5000.0),
        ])
    }

    #[test]
    fn tiny_shares_still_get_a_dot() {
        assert_eq!(rounded_share(0.002), 0.01);
        assert_eq!(rounded_share(0.298), 0.3);
    }

    #[test]
    fn shares_are_sorted_descending() {
        let t = SmallMultipleGrids.transform(&table(), &Params::new()).unwrap();
        assert_eq!(t.columns(), &COLUMNS);
        assert_eq!(t.texts("Sub-Category").unwrap(), vec!["Binders", "Paper", "Labels"]);
        assert_eq!(t.floats("Share").unwrap(), vec![0.7, 0.3, 0.01]);
        assert_eq!(t.floats("Dots").unwrap(), vec![70.0, 30.0, 1.0]);
    }

    #[test]
    fn one_waffle_per_sub_category() {
        let t = SmallMultipleGrids.transform(&table(), &Params::new()).unwrap();
        let spec = SmallMultipleGrids.build_chart(&t, &Params::new()).unwrap();
        assert_eq!(spec.grid, (3, 3));
        assert_eq!(spec.traces.len(), 3);
        assert_eq!(spec.panels[0].title.as_deref(), Some("Binders (70%)"));
        let labels = &spec.traces[2];
        assert_eq!(labels.len(), 100);
        assert_eq!(labels.panel, 2);
        assert_eq!(labels.point_colors.iter().filter(|&&c| c == FILLED).count(), 1);
    }

    #[test]
    fn no_office_supplies_gives_placeholder() {
        let t = SmallMultipleGrids.transform(&three_orders(), &Params::new()).unwrap();
        assert!(t.is_empty());
        assert!(SmallMultipleGrids.build_chart(&t, &Params::new()).unwrap().is_placeholder());
    }
}
