//! Sales by region for every sub-category, filtered by customer segment.

use crate::chart::{data, ChartSpec, Datum, Fill, LineShape, Mark, Trace};
use crate::color::Rgb;
use crate::data::filter::{self, FilterState};
use crate::data::loader::{DatasetSource, SUPERSTORE};
use crate::data::model::Table;
use crate::data::ops::{Agg, SortKey};
use crate::error::Result;

use super::{chart_or_placeholder, ParamKind, ParamSpec, ParamValue, Params, Pipeline, SEGMENTS, SERIES_URL};

const COLUMNS: [&str; 6] = [
    "Category",
    "Sub-Category",
    "Region",
    "Sales",
    "Category Total",
    "Sub-Category Total",
];

const REGIONS: [(&str, Rgb); 4] = [
    ("South", Rgb::hex(0xF43C63)),
    ("Central", Rgb::hex(0x1BA3A6)),
    ("East", Rgb::hex(0xBCBD22)),
    ("West", Rgb::hex(0x4E79A7)),
];

pub struct SalesByRegion;

fn row_label(category: &str, sub_category: &str) -> String {
    format!("{category} / {sub_category}")
}

impl Pipeline for SalesByRegion {
    fn id(&self) -> &'static str {
        "2018w06"
    }

    fn title(&self) -> &'static str {
        "Sales by Region"
    }

    fn source_url(&self) -> &'static str {
        SERIES_URL
    }

    fn dataset(&self) -> DatasetSource {
        SUPERSTORE
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::new(
            "segments",
            "Segment",
            ParamKind::Labels(super::choice_options(&SEGMENTS)),
            ParamValue::text_set(SEGMENTS),
        )]
    }

    fn transform(&self, data: &Table, params: &Params) -> Result<Table> {
        let mut filters = FilterState::new();
        filters.insert(
            "Segment".to_string(),
            filter::selection(params.text_set("segments")?.iter().map(String::as_str)),
        );
        filter::apply(data, &filters)?
            .group_by(&["Category", "Sub-Category", "Region"], &[Agg::sum("Sales")])?
            .partition_total("Sales", "Category Total", &["Category"])?
            .partition_total("Sales", "Sub-Category Total", &["Category", "Sub-Category"])?
            .sort_by(&[
                SortKey::asc("Category Total"),
                SortKey::asc("Sub-Category Total"),
                SortKey::asc("Sales"),
            ])
    }

    fn build_chart(&self, derived: &Table, _params: &Params) -> Result<ChartSpec> {
        chart_or_placeholder(derived, &COLUMNS, self.title(), || {
            let categories = derived.texts("Category")?;
            let sub_categories = derived.texts("Sub-Category")?;
            let regions = derived.texts("Region")?;
            let sales = derived.floats("Sales")?;
            let labels: Vec<String> = categories
                .iter()
                .zip(&sub_categories)
                .map(|(c, s)| row_label(c, s))
                .collect();

            let mut order: Vec<String> = Vec::new();
            for label in &labels {
                if !order.contains(label) {
                    order.push(label.clone());
                }
            }

            // One connector per row label, broken between labels.
            let mut xs = Vec::new();
            let mut ys = Vec::new();
            for label in &order {
                for (i, l) in labels.iter().enumerate() {
                    if l == label {
                        xs.push(Datum::from(sales[i]));
                        ys.push(Datum::from(l.as_str()));
                    }
                }
                xs.push(Datum::Gap);
                ys.push(Datum::Gap);
            }

            let mut spec = ChartSpec::new(self.title()).size(600, 800);
            let panel = spec.panel_mut(0);
            panel.x.title = Some("Sales".into());
            panel.x.tick_format = Some("$,.0f".into());
            panel.y.title = Some("Category / Sub-Category".into());
            panel.y.categories = order;

            spec.push(
                Trace::new(
                    "range",
                    Mark::Line {
                        shape: LineShape::Linear,
                        fill: Fill::None,
                        dashed: false,
                        width: 1.0,
                    },
                )
                .xy(xs, ys)
                .color(Rgb::BLACK)
                .hide_legend(),
            );
            for (region, color) in REGIONS {
                let idx: Vec<usize> = (0..regions.len()).filter(|&i| regions[i] == region).collect();
                spec.push(
                    Trace::new(region, Mark::markers(7.0))
                        .xy(
                            data(idx.iter().map(|&i| sales[i])),
                            data(idx.iter().map(|&i| labels[i].clone())),
                        )
                        .color(color),
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
            Order::new(d(2017, 1, 1), "Technology", "Phones", 50.0).region("West"),
            Order::new(d(2017, 1, 1), "Technology", "Phones", 10.0).region("East"),
            Order::new(d(2017, 1, 1), "Furniture", "Chairs", 5.0).region("West"),
            Order::new(d(2017, 1, 1), "Furniture", "Tables", 2.0).region("South"),
            Order::new(d(2017, 1, 1), "Furniture", "Chairs", 7.0)
                .region("West")
                .segment("Corporate"),
        ])
    }

    fn params(segments: &[&str]) -> Params {
        Params::new().with("segments", ParamValue::text_set(segments.iter().copied()))
    }

    #[test]
    fn sorted_by_category_then_sub_category_totals() {
        let t = SalesByRegion.transform(&table(), &params(&["Consumer"])).unwrap();
        assert_eq!(t.columns(), &COLUMNS);
        assert_eq!(t.texts("Sub-Category").unwrap(), vec!["Tables", "Chairs", "Phones", "Phones"]);
        assert_eq!(t.floats("Sales").unwrap(), vec![2.0, 5.0, 10.0, 50.0]);
        assert_eq!(t.floats("Category Total").unwrap(), vec![7.0, 7.0, 60.0, 60.0]);
    }

    #[test]
    fn segments_are_additive() {
        let t = SalesByRegion
            .transform(&table(), &params(&["Consumer", "Corporate"]))
            .unwrap();
        let chairs = t.filter("Sub-Category", |v| v.as_str() == Some("Chairs")).unwrap();
        assert_eq!(chairs.floats("Sales").unwrap(), vec![12.0]);
    }

    #[test]
    fn no_segment_is_empty() {
        let p = params(&[]);
        let t = SalesByRegion.transform(&table(), &p).unwrap();
        assert!(t.is_empty());
        assert!(SalesByRegion.build_chart(&t, &p).unwrap().is_placeholder());
    }

    #[test]
    fn markers_per_region() {
        let p = params(&["Consumer"]);
        let t = SalesByRegion.transform(&table(), &p).unwrap();
        let spec = SalesByRegion.build_chart(&t, &p).unwrap();
        let west = spec.traces.iter().find(|t| t.name == "West").unwrap();
        assert_eq!(west.len(), 2);
        assert_eq!(spec.panels[0].y.categories[0], "Furniture / Tables");
    }
}
