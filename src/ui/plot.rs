use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use eframe::egui::{self, Align2, Color32, RichText, Stroke, Ui, Vec2};
use egui_plot::{
    Bar, BarChart, HLine, Legend, Line, LineStyle, MarkerShape, Plot, PlotPoint, PlotUi, Points,
    Polygon, Text, VLine,
};

use crate::chart::{format, Axis, ChartSpec, Datum, Fill, LineShape, Mark, Orientation, Symbol, Trace};
use crate::color::{ColorScale, Rgb};
use crate::pipeline::STATE_CODES;
use crate::ui::table;

pub fn color32(c: Rgb) -> Color32 {
    Color32::from_rgb(c.0, c.1, c.2)
}

fn translucent(c: Color32) -> Color32 {
    Color32::from_rgba_unmultiplied(c.r(), c.g(), c.b(), 110)
}

// ---------------------------------------------------------------------------
// Axis mapping: Datum → plot coordinate and back to a tick label
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct AxisMap {
    /// Category order; the first category sits left on x and on top on y.
    categories: Vec<String>,
    vertical: bool,
    dates: bool,
    sign: f64,
    format: Option<String>,
}

impl AxisMap {
    fn new<'a>(axis: &Axis, vertical: bool, values: impl IntoIterator<Item = &'a Datum>) -> Self {
        let mut categories = axis.categories.clone();
        let mut dates = false;
        for value in values {
            match value {
                Datum::Category(c) if !categories.contains(c) => categories.push(c.clone()),
                Datum::Date(_) => dates = true,
                _ => {}
            }
        }
        AxisMap {
            categories,
            vertical,
            dates,
            sign: if axis.reversed { -1.0 } else { 1.0 },
            format: axis.tick_format.clone(),
        }
    }

    fn is_categorical(&self) -> bool {
        !self.categories.is_empty() && !self.dates
    }

    fn position(&self, datum: &Datum) -> Option<f64> {
        let raw = match datum {
            Datum::Number(v) if v.is_finite() => *v,
            Datum::Number(_) | Datum::Gap => return None,
            Datum::Date(d) => d.num_days_from_ce() as f64,
            Datum::Category(c) => {
                let i = self.categories.iter().position(|x| x == c)?;
                if self.vertical {
                    (self.categories.len() - 1 - i) as f64
                } else {
                    i as f64
                }
            }
        };
        Some(raw * self.sign)
    }

    /// Tick label at `value`; categories only label whole positions.
    fn label(&self, value: f64) -> String {
        let raw = value * self.sign;
        if self.is_categorical() {
            let i = raw.round();
            if (raw - i).abs() > 1e-6 {
                return String::new();
            }
            return self.category_at(i);
        }
        if self.dates {
            let pattern = self
                .format
                .as_deref()
                .filter(|f| f.len() > 1 && f.starts_with('%'))
                .unwrap_or("%b %Y");
            return NaiveDate::from_num_days_from_ce_opt(raw.round() as i32)
                .map(|d| d.format(pattern).to_string())
                .unwrap_or_default();
        }
        number_label(raw, self.format.as_deref())
    }

    /// Label for an arbitrary hover position.
    fn hover(&self, value: f64) -> String {
        if self.is_categorical() {
            self.category_at((value * self.sign).round())
        } else {
            self.label(value)
        }
    }

    fn category_at(&self, i: f64) -> String {
        let n = self.categories.len();
        if i < 0.0 || i as usize >= n {
            return String::new();
        }
        let i = i as usize;
        let index = if self.vertical { n - 1 - i } else { i };
        self.categories[index].clone()
    }

    fn include(&self) -> Vec<f64> {
        if self.is_categorical() {
            vec![-0.6 * self.sign, (self.categories.len() as f64 - 0.4) * self.sign]
        } else {
            Vec::new()
        }
    }
}

fn number_label(value: f64, hint: Option<&str>) -> String {
    match hint {
        Some(f) if f.starts_with('$') => format::currency(value, 0),
        Some("%") => format!("{}%", format::thousands(value, 0)),
        Some(f) if f.ends_with('%') => format::percent(value, 0, false),
        _ if (value - value.round()).abs() < 1e-9 => format::thousands(value, 0),
        _ => {
            let s = format!("{value:.2}");
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
    }
}

// ---------------------------------------------------------------------------
// Stacking and point placement
// ---------------------------------------------------------------------------

/// Running totals per stack group and position.
#[derive(Default)]
struct Stacks(HashMap<(String, u64), f64>);

impl Stacks {
    /// Add `value` on top of the running total at `at`; returns the base.
    fn lift(&mut self, group: Option<&str>, at: f64, value: f64) -> f64 {
        let Some(group) = group else {
            return 0.0;
        };
        let total = self.0.entry((group.to_string(), at.to_bits())).or_insert(0.0);
        let base = *total;
        *total += value;
        base
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Placed {
    x: f64,
    y: f64,
    base: f64,
}

fn place(trace: &Trace, x_map: &AxisMap, y_map: &AxisMap, stacks: &mut Stacks) -> Vec<Option<Placed>> {
    let horizontal = matches!(trace.mark, Mark::Bar { horizontal: true });
    let group = trace.stack_group.as_deref();
    trace
        .x
        .iter()
        .zip(&trace.y)
        .map(|(x, y)| {
            let (x, y) = (x_map.position(x)?, y_map.position(y)?);
            Some(if horizontal {
                let base = stacks.lift(group, y, x);
                Placed { x: base + x, y, base }
            } else {
                let base = stacks.lift(group, x, y);
                Placed { x, y: base + y, base }
            })
        })
        .collect()
}

/// Split at gaps; step lines get an extra corner point between neighbours.
fn segments(placed: &[Option<Placed>], shape: LineShape) -> Vec<Vec<[f64; 2]>> {
    let mut out = Vec::new();
    let mut current: Vec<[f64; 2]> = Vec::new();
    for p in placed {
        match p {
            Some(p) => {
                if shape == LineShape::Step {
                    if let Some(&[_, prev_y]) = current.last() {
                        current.push([p.x, prev_y]);
                    }
                }
                current.push([p.x, p.y]);
            }
            None if !current.is_empty() => out.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Smallest distance between distinct positions, 1.0 when there is none.
fn spacing(positions: impl Iterator<Item = f64>) -> f64 {
    let mut sorted: Vec<f64> = positions.collect();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    let min = sorted
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(f64::INFINITY, f64::min);
    if min.is_finite() && min > 0.0 {
        min
    } else {
        1.0
    }
}

fn square(x: f64, y: f64, half: f64) -> Vec<[f64; 2]> {
    vec![
        [x - half, y - half],
        [x + half, y - half],
        [x + half, y + half],
        [x - half, y + half],
    ]
}

#[derive(Debug, Clone, Copy)]
struct Extent {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl Default for Extent {
    fn default() -> Self {
        Extent {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }
}

impl Extent {
    fn add(&mut self, p: &Placed) {
        self.min_x = self.min_x.min(p.x);
        self.max_x = self.max_x.max(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_y = self.max_y.max(p.y);
    }

    fn top(&self) -> f64 {
        if self.max_y.is_finite() { self.max_y } else { 1.0 }
    }

    fn left(&self) -> f64 {
        if self.min_x.is_finite() { self.min_x } else { 0.0 }
    }
}

// ---------------------------------------------------------------------------
// Chart (central panel)
// ---------------------------------------------------------------------------

/// Largest size with the chart's aspect ratio that fits `available`.
fn fit(available: Vec2, width: u32, height: u32) -> Vec2 {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    let scale = (available.x / w).min(available.y / h);
    if scale.is_finite() && scale > 0.0 {
        Vec2::new(w * scale, h * scale)
    } else {
        available
    }
}

/// Render a chart specification into the central panel.
pub fn chart(ui: &mut Ui, spec: &ChartSpec) {
    let ink = color32(spec.background.contrasting_text());
    egui::Frame::default()
        .fill(color32(spec.background))
        .inner_margin(8.0)
        .show(ui, |ui: &mut Ui| {
            ui.label(RichText::new(&spec.title).heading().strong().color(ink));
            if let Some(subtitle) = &spec.subtitle {
                ui.label(RichText::new(subtitle).color(ink));
            }

            if spec.is_placeholder() {
                let text = spec
                    .annotations
                    .first()
                    .map(|a| a.text.as_str())
                    .unwrap_or("Nothing selected");
                ui.centered_and_justified(|ui: &mut Ui| {
                    ui.heading(RichText::new(text).color(ink));
                });
                return;
            }

            let footer = if spec.footer.is_some() { 24.0 } else { 0.0 };
            let size = fit(ui.available_size() - Vec2::new(0.0, footer), spec.width, spec.height);
            let (rows, cols) = spec.grid;
            let cell = Vec2::new(size.x / cols.max(1) as f32, size.y / rows.max(1) as f32);

            ui.spacing_mut().item_spacing = Vec2::ZERO;
            for row in 0..rows {
                ui.horizontal(|ui: &mut Ui| {
                    for col in 0..cols {
                        let index = row * cols + col;
                        ui.allocate_ui(cell, |ui: &mut Ui| {
                            ui.set_min_size(cell);
                            draw_panel(ui, spec, index, ink);
                        });
                    }
                });
            }

            if let Some(footer) = &spec.footer {
                ui.label(RichText::new(footer).small().color(ink));
            }
        });
}

fn draw_panel(ui: &mut Ui, spec: &ChartSpec, index: usize, ink: Color32) {
    let Some(panel) = spec.panels.get(index) else {
        return;
    };
    let last = spec.panels.len().saturating_sub(1);
    let traces: Vec<&Trace> = spec
        .traces
        .iter()
        .filter(|t| t.panel.min(last) == index)
        .collect();

    if let Some(title) = &panel.title {
        ui.vertical_centered(|ui: &mut Ui| {
            ui.label(RichText::new(title).strong().color(ink));
        });
    }
    let size = ui.available_size().max(Vec2::splat(40.0));
    let id = format!("{}-{index}", spec.title);

    for trace in &traces {
        match &trace.mark {
            Mark::Table(cells) => {
                table::cells_table(ui, &id, cells);
                return;
            }
            Mark::Choropleth { scale } => {
                tile_map(ui, &id, trace, scale, size);
                return;
            }
            _ => {}
        }
    }

    let in_panel = |p: usize| p.min(last) == index;
    let x_data = traces
        .iter()
        .flat_map(|t| &t.x)
        .chain(spec.annotations.iter().filter(|a| in_panel(a.panel)).map(|a| &a.x))
        .chain(
            spec.rules
                .iter()
                .filter(|r| in_panel(r.panel) && r.orientation == Orientation::Vertical)
                .map(|r| &r.at),
        );
    let x_map = AxisMap::new(&panel.x, false, x_data);
    let y_data = traces
        .iter()
        .flat_map(|t| &t.y)
        .chain(spec.annotations.iter().filter(|a| in_panel(a.panel)).map(|a| &a.y))
        .chain(
            spec.rules
                .iter()
                .filter(|r| in_panel(r.panel) && r.orientation == Orientation::Horizontal)
                .map(|r| &r.at),
        );
    let y_map = AxisMap::new(&panel.y, true, y_data);

    let mut plot = Plot::new(&id)
        .width(size.x)
        .height(size.y)
        .show_axes([!panel.x.hidden, !panel.y.hidden])
        .show_grid([!panel.x.hidden, !panel.y.hidden])
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .x_axis_formatter({
            let map = x_map.clone();
            move |mark, _range| map.label(mark.value)
        })
        .y_axis_formatter({
            let map = y_map.clone();
            move |mark, _range| map.label(mark.value)
        })
        .label_formatter({
            let (mx, my) = (x_map.clone(), y_map.clone());
            move |name, point| {
                let position = format!("{}  {}", mx.hover(point.x), my.hover(point.y));
                if name.is_empty() {
                    position
                } else {
                    format!("{name}\n{position}")
                }
            }
        });
    if spec.show_legend {
        plot = plot.legend(Legend::default());
    }
    if let Some(title) = &panel.x.title {
        plot = plot.x_axis_label(title.clone());
    }
    if let Some(title) = &panel.y.title {
        plot = plot.y_axis_label(title.clone());
    }
    if x_map.is_categorical() {
        plot = plot.x_grid_spacer(egui_plot::uniform_grid_spacer(|_| [1.0, 5.0, 25.0]));
    }
    if y_map.is_categorical() {
        plot = plot.y_grid_spacer(egui_plot::uniform_grid_spacer(|_| [1.0, 5.0, 25.0]));
    }
    let range = |axis: &Axis, map: &AxisMap| -> Vec<f64> {
        let mut bounds = map.include();
        if let Some((lo, hi)) = &axis.range {
            bounds.extend([lo, hi].into_iter().filter_map(|d| map.position(d)));
        }
        bounds
    };
    for x in range(&panel.x, &x_map) {
        plot = plot.include_x(x);
    }
    for y in range(&panel.y, &y_map) {
        plot = plot.include_y(y);
    }

    plot.show(ui, |plot_ui| {
        let mut stacks = Stacks::default();
        let mut previous: HashMap<u64, f64> = HashMap::new();
        let mut extent = Extent::default();
        for trace in &traces {
            let placed = place(trace, &x_map, &y_map, &mut stacks);
            placed.iter().flatten().for_each(|p| extent.add(p));
            draw_trace(plot_ui, trace, &placed, &mut previous);
        }

        for rule in spec.rules.iter().filter(|r| in_panel(r.panel)) {
            let style = if rule.dashed {
                LineStyle::dashed_loose()
            } else {
                LineStyle::Solid
            };
            let (anchor, at) = match rule.orientation {
                Orientation::Vertical => {
                    let Some(x) = x_map.position(&rule.at) else { continue };
                    plot_ui.vline(VLine::new(x).color(Color32::GRAY).width(1.0).style(style));
                    (Align2::LEFT_BOTTOM, PlotPoint::new(x, extent.top()))
                }
                Orientation::Horizontal => {
                    let Some(y) = y_map.position(&rule.at) else { continue };
                    plot_ui.hline(HLine::new(y).color(Color32::GRAY).width(1.0).style(style));
                    (Align2::LEFT_BOTTOM, PlotPoint::new(extent.left(), y))
                }
            };
            if let Some(label) = &rule.label {
                plot_ui.text(Text::new(at, RichText::new(label).small()).anchor(anchor).color(ink));
            }
        }

        for annotation in spec.annotations.iter().filter(|a| in_panel(a.panel)) {
            let (Some(x), Some(y)) = (x_map.position(&annotation.x), y_map.position(&annotation.y)) else {
                continue;
            };
            plot_ui.text(
                Text::new(PlotPoint::new(x, y), RichText::new(&annotation.text).strong()).color(ink),
            );
        }
    });
}

// ---------------------------------------------------------------------------
// Marks
// ---------------------------------------------------------------------------

fn point_color(trace: &Trace, i: usize) -> Rgb {
    trace.point_colors.get(i).copied().unwrap_or(trace.color)
}

fn draw_trace(
    plot_ui: &mut PlotUi,
    trace: &Trace,
    placed: &[Option<Placed>],
    previous: &mut HashMap<u64, f64>,
) {
    let color = color32(trace.color);
    match &trace.mark {
        Mark::Line {
            shape,
            fill,
            dashed,
            width,
        } => {
            let parts = segments(placed, *shape);
            if *fill != Fill::None {
                let below = |x: f64| match fill {
                    Fill::ToNext => previous.get(&x.to_bits()).copied().unwrap_or(0.0),
                    _ => 0.0,
                };
                for part in &parts {
                    for w in part.windows(2) {
                        let ([x0, y0], [x1, y1]) = (w[0], w[1]);
                        plot_ui.polygon(
                            Polygon::new(vec![[x0, below(x0)], [x0, y0], [x1, y1], [x1, below(x1)]])
                                .fill_color(translucent(color))
                                .stroke(Stroke::NONE),
                        );
                    }
                }
            }
            for (i, part) in parts.into_iter().enumerate() {
                let mut line = Line::new(part).color(color).width(*width);
                if *dashed {
                    line = line.style(LineStyle::dashed_loose());
                }
                if i == 0 && trace.show_legend {
                    line = line.name(&trace.name);
                }
                plot_ui.line(line);
            }
            *previous = placed.iter().flatten().map(|p| (p.x.to_bits(), p.y)).collect();
        }

        Mark::Markers { size, symbol } => {
            let mut groups: Vec<(Rgb, Vec<[f64; 2]>)> = Vec::new();
            for (i, p) in placed.iter().enumerate() {
                let Some(p) = p else { continue };
                let c = point_color(trace, i);
                match groups.iter_mut().find(|(g, _)| *g == c) {
                    Some((_, points)) => points.push([p.x, p.y]),
                    None => groups.push((c, vec![[p.x, p.y]])),
                }
            }
            if groups.is_empty() && trace.show_legend {
                plot_ui.points(Points::new(Vec::<[f64; 2]>::new()).color(color).name(&trace.name));
                return;
            }
            if *symbol == Symbol::Dash {
                let half = 0.35 * spacing(placed.iter().flatten().map(|p| p.x));
                for (g, (c, points)) in groups.iter().enumerate() {
                    for (i, &[x, y]) in points.iter().enumerate() {
                        let mut dash = Line::new(vec![[x - half, y], [x + half, y]])
                            .color(color32(*c))
                            .width(*size / 4.0);
                        if g == 0 && i == 0 && trace.show_legend {
                            dash = dash.name(&trace.name);
                        }
                        plot_ui.line(dash);
                    }
                }
                return;
            }
            for (g, (c, points)) in groups.into_iter().enumerate() {
                let mut markers = Points::new(points)
                    .color(color32(c))
                    .radius(*size / 2.0)
                    .shape(MarkerShape::Circle)
                    .filled(*symbol != Symbol::Ring);
                if g == 0 && trace.show_legend {
                    markers = markers.name(&trace.name);
                }
                plot_ui.points(markers);
            }
        }

        Mark::Text => {
            for (i, p) in placed.iter().enumerate() {
                let (Some(p), Some(label)) = (p, trace.text.get(i)) else { continue };
                if label.is_empty() {
                    continue;
                }
                plot_ui.text(
                    Text::new(PlotPoint::new(p.x, p.y), RichText::new(label))
                        .color(color32(point_color(trace, i))),
                );
            }
        }

        Mark::Bar { horizontal } => {
            let arguments = placed.iter().flatten().map(|p| if *horizontal { p.y } else { p.x });
            let width = 0.7 * spacing(arguments);
            let bars: Vec<Bar> = placed
                .iter()
                .enumerate()
                .filter_map(|(i, p)| {
                    let p = p.as_ref()?;
                    let (argument, top) = if *horizontal { (p.y, p.x) } else { (p.x, p.y) };
                    let mut bar = Bar::new(argument, top - p.base)
                        .base_offset(p.base)
                        .width(width)
                        .fill(color32(point_color(trace, i)));
                    if let Some(text) = trace.text.get(i) {
                        bar = bar.name(text);
                    }
                    Some(bar)
                })
                .collect();
            let mut chart = BarChart::new(bars).color(color);
            if *horizontal {
                chart = chart.horizontal();
            }
            if trace.show_legend {
                chart = chart.name(&trace.name);
            }
            plot_ui.bar_chart(chart);
        }

        Mark::Heatmap { z, scale } => {
            let (min, max) = z
                .iter()
                .copied()
                .filter(|v| v.is_finite())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
            for (i, p) in placed.iter().enumerate() {
                let (Some(p), Some(&v)) = (p, z.get(i)) else { continue };
                if !v.is_finite() {
                    continue;
                }
                let fill = scale.sample_range(v, min, max);
                plot_ui.polygon(
                    Polygon::new(square(p.x, p.y, 0.5))
                        .fill_color(color32(fill))
                        .stroke(Stroke::new(1.0, Color32::WHITE)),
                );
                if let Some(text) = trace.text.get(i).filter(|t| !t.is_empty()) {
                    plot_ui.text(
                        Text::new(PlotPoint::new(p.x, p.y), RichText::new(text).small())
                            .color(color32(fill.contrasting_text())),
                    );
                }
            }
        }

        // Drawn per panel, not as plot items.
        Mark::Choropleth { .. } | Mark::Table(_) => {}
    }
}

// ---------------------------------------------------------------------------
// State tile map
// ---------------------------------------------------------------------------

/// `(postal code, column, row)` of each state on a square tile grid.
const STATE_TILES: [(&str, u8, u8); 51] = [
    ("AK", 0, 0), ("ME", 11, 0),
    ("VT", 10, 1), ("NH", 11, 1),
    ("WA", 1, 2), ("ID", 2, 2), ("MT", 3, 2), ("ND", 4, 2), ("MN", 5, 2), ("IL", 6, 2),
    ("WI", 7, 2), ("MI", 8, 2), ("NY", 9, 2), ("RI", 10, 2), ("MA", 11, 2),
    ("OR", 1, 3), ("NV", 2, 3), ("WY", 3, 3), ("SD", 4, 3), ("IA", 5, 3), ("IN", 6, 3),
    ("OH", 7, 3), ("PA", 8, 3), ("NJ", 9, 3), ("CT", 10, 3),
    ("CA", 1, 4), ("UT", 2, 4), ("CO", 3, 4), ("NE", 4, 4), ("MO", 5, 4), ("KY", 6, 4),
    ("WV", 7, 4), ("VA", 8, 4), ("MD", 9, 4), ("DE", 10, 4),
    ("AZ", 2, 5), ("NM", 3, 5), ("KS", 4, 5), ("AR", 5, 5), ("TN", 6, 5), ("NC", 7, 5),
    ("SC", 8, 5), ("DC", 9, 5),
    ("OK", 4, 6), ("LA", 5, 6), ("MS", 6, 6), ("AL", 7, 6), ("GA", 8, 6),
    ("HI", 0, 7), ("TX", 3, 7), ("FL", 8, 7),
];

const NO_DATA: Rgb = Rgb::hex(0xE6E6E6);

fn tile_map(ui: &mut Ui, id: &str, trace: &Trace, scale: &ColorScale, size: Vec2) {
    let mut values: HashMap<&str, (f64, &str)> = HashMap::new();
    for (i, (code, value)) in trace.x.iter().zip(&trace.y).enumerate() {
        if let (Datum::Category(code), Some(v)) = (code, value.as_f64()) {
            let name = trace.text.get(i).map(String::as_str).unwrap_or(code);
            values.insert(code.as_str(), (v, name));
        }
    }
    let (min, max) = values
        .values()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (v, _)| (lo.min(*v), hi.max(*v)));

    Plot::new(id)
        .width(size.x)
        .height(size.y)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .label_formatter(|name, _| name.to_owned())
        .show(ui, |plot_ui| {
            for &(code, col, row) in &STATE_TILES {
                let (x, y) = (col as f64, -(row as f64));
                let (fill, hover) = match values.get(code) {
                    Some(&(v, name)) => (scale.sample_range(v, min, max), format!("{name}: {}", format::currency(v, 0))),
                    None => {
                        let name = STATE_CODES
                            .iter()
                            .find(|(_, c)| *c == code)
                            .map(|(n, _)| *n)
                            .unwrap_or(code);
                        (NO_DATA, format!("{name}: no sales"))
                    }
                };
                plot_ui.polygon(
                    Polygon::new(square(x, y, 0.46))
                        .fill_color(color32(fill))
                        .stroke(Stroke::new(1.0, Color32::WHITE))
                        .name(hover),
                );
                plot_ui.text(
                    Text::new(PlotPoint::new(x, y), RichText::new(code).small())
                        .color(color32(fill.contrasting_text())),
                );
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(categories: &[&str]) -> Axis {
        Axis {
            categories: categories.iter().map(|s| s.to_string()).collect(),
            ..Axis::default()
        }
    }

    #[test]
    fn categories_put_the_first_on_top() {
        let extra = Datum::from("c");
        let y = AxisMap::new(&axis(&["a", "b"]), true, [&extra]);
        assert_eq!(y.position(&Datum::from("a")), Some(2.0));
        assert_eq!(y.position(&Datum::from("c")), Some(0.0));
        assert_eq!(y.label(2.0), "a");
        assert_eq!(y.label(1.5), "");
        assert_eq!(y.hover(1.8), "a");

        let x = AxisMap::new(&axis(&["a", "b"]), false, std::iter::empty::<&Datum>());
        assert_eq!(x.position(&Datum::from("b")), Some(1.0));
        assert_eq!(x.position(&Datum::from("zz")), None);
    }

    #[test]
    fn reversed_axes_negate_and_label_back() {
        let mut a = axis(&[]);
        a.reversed = true;
        a.tick_format = Some("$,.0f".into());
        let x = AxisMap::new(&a, false, std::iter::empty::<&Datum>());
        assert_eq!(x.position(&Datum::Number(1500.0)), Some(-1500.0));
        assert_eq!(x.label(-1500.0), "$1,500");
    }

    #[test]
    fn dates_map_to_day_numbers() {
        let d = NaiveDate::from_ymd_opt(2017, 3, 1).unwrap();
        let mut a = axis(&[]);
        a.tick_format = Some("%b-%y".into());
        let datum = Datum::Date(d);
        let x = AxisMap::new(&a, false, [&datum]);
        let p = x.position(&datum).unwrap();
        assert_eq!(x.label(p), "Mar-17");
        assert_eq!(x.position(&Datum::Gap), None);
    }

    #[test]
    fn number_hints() {
        assert_eq!(number_label(0.25, Some(".0%")), "25%");
        assert_eq!(number_label(50.0, Some("%")), "50%");
        assert_eq!(number_label(2.5, None), "2.5");
        assert_eq!(number_label(12000.0, None), "12,000");
    }

    #[test]
    fn stacks_accumulate_per_group_and_position() {
        let mut stacks = Stacks::default();
        assert_eq!(stacks.lift(Some("g"), 1.0, 10.0), 0.0);
        assert_eq!(stacks.lift(Some("g"), 1.0, 5.0), 10.0);
        assert_eq!(stacks.lift(Some("g"), 2.0, 5.0), 0.0);
        assert_eq!(stacks.lift(Some("h"), 1.0, 5.0), 0.0);
        assert_eq!(stacks.lift(None, 1.0, 5.0), 0.0);
    }

    #[test]
    fn gaps_split_lines_and_steps_add_corners() {
        let p = |x: f64, y: f64| Some(Placed { x, y, base: 0.0 });
        let placed = vec![p(0.0, 1.0), p(1.0, 2.0), None, p(3.0, 3.0)];
        assert_eq!(
            segments(&placed, LineShape::Linear),
            vec![vec![[0.0, 1.0], [1.0, 2.0]], vec![[3.0, 3.0]]]
        );
        assert_eq!(
            segments(&placed, LineShape::Step)[0],
            vec![[0.0, 1.0], [1.0, 1.0], [1.0, 2.0]]
        );
    }

    #[test]
    fn spacing_and_fit() {
        assert_eq!(spacing([3.0, 1.0, 2.0, 2.0].into_iter()), 1.0);
        assert_eq!(spacing([0.0, 31.0, 59.0].into_iter()), 28.0);
        assert_eq!(spacing(std::iter::once(4.0)), 1.0);
        assert_eq!(fit(Vec2::new(1000.0, 300.0), 800, 600), Vec2::new(400.0, 300.0));
    }

    #[test]
    fn every_state_has_a_tile() {
        for (name, code) in STATE_CODES {
            assert!(STATE_TILES.iter().any(|(c, _, _)| *c == code), "{name}");
        }
        let mut cells: Vec<(u8, u8)> = STATE_TILES.iter().map(|&(_, c, r)| (c, r)).collect();
        cells.sort();
        cells.dedup();
        assert_eq!(cells.len(), STATE_TILES.len());
    }
}
