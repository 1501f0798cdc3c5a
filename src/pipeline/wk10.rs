//! Weekly sales share per segment drawn as stacked radial spokes.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use crate::chart::{ChartSpec, Datum, Fill, LineShape, Mark, Trace};
use crate::color::Rgb;
use crate::data::calendar::week_of_year;
use crate::data::filter::{self, FilterState};
use crate::data::loader::{DatasetSource, SUPERSTORE};
use crate::data::model::{Table, Value};
use crate::data::ops::{Agg, SortKey};
use crate::error::Result;

use super::{chart_or_placeholder, with_year, ParamKind, ParamSpec, ParamValue, Params, Pipeline, SERIES_URL, SUPERSTORE_YEARS};

const COLUMNS: [&str; 7] = ["Week", "Segment", "Sales", "Share", "Angle", "R1", "R2"];
/// Spoke order from the centre outwards.
const STACK: [(&str, Rgb); 3] = [
    ("Corporate", Rgb::hex(0xE84D5B)),
    ("Consumer", Rgb::hex(0x6FB899)),
    ("Home Office", Rgb::hex(0x26979F)),
];
const INNER_RADIUS: f64 = 1.0;
const SEGMENT_GAP: f64 = 0.15;
const WEEKS_PER_TURN: f64 = 52.0;
const BACKGROUND: Rgb = Rgb::hex(0xEAE2CF);

pub struct WeeklySegments;

impl Pipeline for WeeklySegments {
    fn id(&self) -> &'static str {
        "2018w10"
    }

    fn title(&self) -> &'static str {
        "KEEP AN EYE ON SALES"
    }

    fn source_url(&self) -> &'static str {
        SERIES_URL
    }

    fn dataset(&self) -> DatasetSource {
        SUPERSTORE
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::new(
            "year",
            "Year",
            ParamKind::Year(SUPERSTORE_YEARS.to_vec()),
            ParamValue::Int(2017),
        )]
    }

    fn transform(&self, data: &Table, params: &Params) -> Result<Table> {
        let year = params.int("year")?;
        let mut filters = FilterState::new();
        filters.insert("Year".to_string(), filter::selection([year]));
        let selected = filter::apply(&with_year(data, "Order Date", "Year")?, &filters)?
            .sort_by(&[SortKey::asc("Order Date")])?;

        let iso_year = i32::try_from(year).unwrap_or_default();
        let weekly = selected
            .derive("Week", &["Order Date"], |v| {
                Value::from(v[0].as_date().and_then(|d| week_of_year(d, iso_year)))
            })?
            .filter("Week", |v| !v.is_null())?
            .group_by(&["Week", "Segment"], &[Agg::sum("Sales")])?
            .share_of_total("Sales", "Share", &["Week"])?;

        let weeks = weekly.floats("Week")?;
        let shares = weekly.floats("Share")?;
        let segments = weekly.texts("Segment")?;
        let mut radii: BTreeMap<(u64, usize), (f64, f64)> = BTreeMap::new();
        let mut by_week: BTreeMap<u64, Vec<(usize, usize)>> = BTreeMap::new();
        for (row, segment) in segments.iter().enumerate() {
            let rank = STACK
                .iter()
                .position(|(s, _)| s == segment)
                .unwrap_or(STACK.len());
            by_week.entry(weeks[row] as u64).or_default().push((rank, row));
        }
        for (week, mut rows) in by_week {
            rows.sort();
            let mut cursor = INNER_RADIUS;
            for (_, row) in rows {
                let r2 = cursor + shares[row];
                radii.insert((week, row), (cursor, r2));
                cursor = r2 + SEGMENT_GAP;
            }
        }

        let mut out = Table::new(COLUMNS);
        for (row, values) in weekly.rows().iter().enumerate() {
            let week = weeks[row] as u64;
            let (r1, r2) = radii.get(&(week, row)).copied().unwrap_or((INNER_RADIUS, INNER_RADIUS));
            let angle = 2.0 * PI * (weeks[row] - 1.0) / WEEKS_PER_TURN;
            let mut new_row = values.clone();
            new_row.extend([angle.into(), r1.into(), r2.into()]);
            out.push_row(new_row)?;
        }
        Ok(out)
    }

    fn build_chart(&self, derived: &Table, params: &Params) -> Result<ChartSpec> {
        chart_or_placeholder(derived, &COLUMNS, self.title(), || {
            let segments = derived.texts("Segment")?;
            let angles = derived.floats("Angle")?;
            let r1 = derived.floats("R1")?;
            let r2 = derived.floats("R2")?;

            let mut spec = ChartSpec::new(self.title())
                .size(600, 600)
                .background(BACKGROUND)
                .subtitle(format!("Weekly Sales by Segment for {}", params.int("year")?))
                .footer("#WOW 2018, Week 10");
            {
                let panel = spec.panel_mut(0);
                for axis in [&mut panel.x, &mut panel.y] {
                    axis.range = Some((Datum::Number(-2.4), Datum::Number(2.4)));
                    axis.hidden = true;
                }
            }

            for (segment, color) in STACK {
                let mut xs = Vec::new();
                let mut ys = Vec::new();
                for i in (0..segments.len()).filter(|&i| segments[i] == segment) {
                    let (sin, cos) = angles[i].sin_cos();
                    xs.extend([Datum::from(r1[i] * sin), Datum::from(r2[i] * sin), Datum::Gap]);
                    ys.extend([Datum::from(r1[i] * cos), Datum::from(r2[i] * cos), Datum::Gap]);
                }
                spec.push(
                    Trace::new(
                        segment,
                        Mark::Line {
                            shape: LineShape::Linear,
                            fill: Fill::None,
                            dashed: false,
                            width: 6.0,
                        },
                    )
                    .xy(xs, ys)
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
            Order::new(d(2017, 1, 1), "Furniture", "Chairs", 1000.0).segment("Corporate"),
            Order::new(d(2017, 1, 2), "Furniture", "Chairs", 30.0).segment("Corporate"),
            Order::new(d(2017, 1, 3), "Furniture", "Chairs", 50.0).segment("Consumer"),
            Order::new(d(2017, 1, 4), "Furniture", "Chairs", 20.0).segment("Home Office"),
            Order::new(d(2017, 1, 9), "Furniture", "Chairs", 10.0).segment("Consumer"),
            Order::new(d(2016, 1, 9), "Furniture", "Chairs", 10.0).segment("Consumer"),
        ])
    }

    fn params(year: i64) -> Params {
        Params::new().with("year", ParamValue::Int(year))
    }

    #[test]
    fn origin_day_is_excluded_and_shares_stack_outwards() {
        let t = WeeklySegments.transform(&table(), &params(2017)).unwrap();
        assert_eq!(t.columns(), &COLUMNS);
        assert_eq!(t.len(), 4);
        assert_eq!(t.floats("Week").unwrap(), vec![1.0, 1.0, 1.0, 2.0]);
        assert_eq!(t.texts("Segment").unwrap(), vec!["Consumer", "Corporate", "Home Office", "Consumer"]);
        let r1 = t.floats("R1").unwrap();
        let r2 = t.floats("R2").unwrap();
        // Corporate 0.3 → Consumer 0.5 → Home Office 0.2
        assert!((r1[1] - 1.0).abs() < 1e-9 && (r2[1] - 1.3).abs() < 1e-9);
        assert!((r1[0] - 1.45).abs() < 1e-9 && (r2[0] - 1.95).abs() < 1e-9);
        assert!((r1[2] - 2.1).abs() < 1e-9 && (r2[2] - 2.3).abs() < 1e-9);
        assert_eq!(t.floats("Angle").unwrap()[0], 0.0);
        assert!((t.floats("Angle").unwrap()[3] - 2.0 * PI / 52.0).abs() < 1e-12);
    }

    #[test]
    fn year_without_orders_is_empty() {
        let t = WeeklySegments.transform(&table(), &params(2015)).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.columns(), &COLUMNS);
    }

    #[test]
    fn one_spoke_per_week_and_segment() {
        let t = WeeklySegments.transform(&table(), &params(2017)).unwrap();
        let spec = WeeklySegments.build_chart(&t, &params(2017)).unwrap();
        let consumer = spec.traces.iter().find(|t| t.name == "Consumer").unwrap();
        assert_eq!(consumer.len(), 6);
        assert!((consumer.y[0].as_f64().unwrap() - 1.45).abs() < 1e-9);
    }
}
