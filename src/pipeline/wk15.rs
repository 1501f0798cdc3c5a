//! Products per sub-category drawn as dot grids, one dot per product.

use std::collections::BTreeMap;

use chrono::Datelike;

use crate::chart::{ChartSpec, Datum, Mark, Trace};
use crate::color::Rgb;
use crate::data::loader::{DatasetSource, SUPERSTORE};
use crate::data::model::{Table, Value};
use crate::data::ops::{Agg, SortKey};
use crate::error::Result;

use super::{chart_or_placeholder, choice_options, ParamKind, ParamSpec, ParamValue, Params, Pipeline, SERIES_URL};

const COLUMNS: [&str; 5] = ["Sub-Category", "Product Name", "Introduced", "Sales", "Products"];
const LEVELS: [&str; 2] = ["Intermediate", "Jedi"];
/// Colour per block of one hundred products, best sellers first.
const HUNDREDS: [Rgb; 3] = [Rgb::hex(0x9E3A26), Rgb::hex(0xCF4F22), Rgb::hex(0xF49538)];
const TOP: usize = 5;
const JEDI_GRID: (usize, usize) = (4, 5);
const DOTS_PER_ROW: usize = 10;

fn year_color(year: i32) -> Rgb {
    match year {
        2014 => Rgb::hex(0x4E9F50),
        2015 => Rgb::hex(0x87D180),
        2016 => Rgb::hex(0xF7D42A),
        2017 => Rgb::hex(0xEF8A0C),
        _ => Rgb::GRAY,
    }
}

/// Grid position of the `n`-th dot; every hundred dots skip a row.
fn dot_position(n: usize) -> (i64, i64) {
    let x = n % DOTS_PER_ROW;
    let y = n / DOTS_PER_ROW + n / (DOTS_PER_ROW * DOTS_PER_ROW);
    (x as i64, y as i64)
}

fn dot_grid(count: usize) -> (Vec<Datum>, Vec<Datum>) {
    (0..count)
        .map(dot_position)
        .map(|(x, y)| (Datum::from(x), Datum::from(y)))
        .unzip()
}

pub struct ProductIntroductions;

impl ProductIntroductions {
    fn panel_axes(spec: &mut ChartSpec, panel: usize, y_max: f64) {
        let panel = spec.panel_mut(panel);
        panel.x.range = Some((Datum::Number(-3.0), Datum::Number(12.0)));
        panel.y.range = Some((Datum::Number(-1.0), Datum::Number(y_max)));
        panel.x.hidden = true;
        panel.y.hidden = true;
    }

    fn intermediate(&self, derived: &Table, order: &[Value]) -> Result<ChartSpec> {
        let mut spec = ChartSpec::new("TOP 5 SUB-CATEGORIES WITH THE MOST PRODUCTS")
            .size(850, 480)
            .grid(1, TOP)
            .subtitle("1 dot = 1 product: 1st 100 | 2nd 100 | 3rd 100");
        spec.show_legend = false;
        let top = &order[order.len().saturating_sub(TOP)..];
        for (panel, sub_category) in top.iter().enumerate() {
            let rows = derived
                .filter("Sub-Category", |v| v == sub_category)?
                .sort_by(&[SortKey::desc("Sales"), SortKey::asc("Product Name")])?;
            let (xs, ys) = dot_grid(rows.len());
            let colors = (0..rows.len())
                .map(|n| HUNDREDS[(n / 100).min(HUNDREDS.len() - 1)])
                .collect();
            Self::panel_axes(&mut spec, panel, 32.0);
            spec.panel_mut(panel).title = Some(format!("{sub_category}\n({} products)", rows.len()));
            spec.push(
                Trace::new(sub_category.to_string(), Mark::markers(8.0))
                    .xy(xs, ys)
                    .point_colors(colors)
                    .color(HUNDREDS[0])
                    .text(rows.texts("Product Name")?)
                    .panel(panel)
                    .hide_legend(),
            );
        }
        Ok(spec)
    }

    fn jedi(&self, derived: &Table, order: &[Value]) -> Result<ChartSpec> {
        let mut spec = ChartSpec::new("TOTAL PRODUCTS BY SUB-CATEGORY")
            .size(550, 1200)
            .grid(JEDI_GRID.0, JEDI_GRID.1)
            .subtitle("1 dot = 1 product, coloured by year of introduction");
        for year in 2014..=2017 {
            spec.push(
                Trace::new(year.to_string(), Mark::markers(5.0)).color(year_color(year)),
            );
        }
        for (panel, sub_category) in order.iter().rev().take(JEDI_GRID.0 * JEDI_GRID.1).enumerate() {
            let rows = derived.filter("Sub-Category", |v| v == sub_category)?;
            let introduced = rows.dates("Introduced")?;
            let (xs, ys) = dot_grid(rows.len());
            Self::panel_axes(&mut spec, panel, 40.0);
            spec.panel_mut(panel).title = Some(format!("{sub_category}\n{} products", rows.len()));
            spec.push(
                Trace::new(sub_category.to_string(), Mark::markers(5.0))
                    .xy(xs, ys)
                    .point_colors(introduced.iter().map(|d| year_color(d.year())).collect())
                    .text(
                        rows.texts("Product Name")?
                            .into_iter()
                            .zip(&introduced)
                            .map(|(p, d)| format!("{p}\nIntroduced on {}", d.format("%Y/%m/%d")))
                            .collect(),
                    )
                    .panel(panel)
                    .hide_legend(),
            );
        }
        Ok(spec)
    }
}

impl Pipeline for ProductIntroductions {
    fn id(&self) -> &'static str {
        "2018w15"
    }

    fn title(&self) -> &'static str {
        "Product introductions"
    }

    fn source_url(&self) -> &'static str {
        SERIES_URL
    }

    fn dataset(&self) -> DatasetSource {
        SUPERSTORE
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::new(
            "level",
            "Level",
            ParamKind::Choice(choice_options(&LEVELS)),
            ParamValue::text("Intermediate"),
        )]
    }

    /// One row per product with its first order date and total sales, grouped
    /// by sub-category from the fewest to the most products.
    fn transform(&self, data: &Table, _params: &Params) -> Result<Table> {
        let products = data
            .group_by(
                &["Sub-Category", "Product Name"],
                &[Agg::min("Order Date").alias("Introduced"), Agg::sum("Sales")],
            )?;
        let mut counts: BTreeMap<Value, i64> = BTreeMap::new();
        for row in products.rows() {
            *counts.entry(row[0].clone()).or_insert(0) += 1;
        }
        products
            .derive("Products", &["Sub-Category"], |v| {
                Value::Integer(counts.get(v[0]).copied().unwrap_or(0))
            })?
            .sort_by(&[
                SortKey::asc("Products"),
                SortKey::asc("Sub-Category"),
                SortKey::asc("Introduced"),
                SortKey::asc("Product Name"),
            ])
    }

    fn build_chart(&self, derived: &Table, params: &Params) -> Result<ChartSpec> {
        chart_or_placeholder(derived, &COLUMNS, self.title(), || {
            let order = derived.unique_in_order("Sub-Category")?;
            match params.text("level")? {
                "Jedi" => self.jedi(derived, &order),
                _ => self.intermediate(derived, &order),
            }
        })
    }
}
