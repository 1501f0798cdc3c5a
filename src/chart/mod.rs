//! Declarative chart specification built by the challenge pipelines.
//!
//! A [`ChartSpec`] is plain data: it serializes to JSON for export and is
//! drawn by the egui front end in `ui::plot`.

pub mod format;

use chrono::NaiveDate;
use serde::Serialize;

use crate::color::{ColorScale, Rgb};
use crate::data::model::Value;

// ---------------------------------------------------------------------------
// Datum – one coordinate of a mark
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Datum {
    Number(f64),
    Date(NaiveDate),
    Category(String),
    /// Breaks a line into separate segments.
    Gap,
}

impl Datum {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Number(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<f64> for Datum {
    fn from(v: f64) -> Self {
        if v.is_nan() {
            Datum::Gap
        } else {
            Datum::Number(v)
        }
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Datum::Number(v as f64)
    }
}

impl From<NaiveDate> for Datum {
    fn from(d: NaiveDate) -> Self {
        Datum::Date(d)
    }
}

impl From<&str> for Datum {
    fn from(s: &str) -> Self {
        Datum::Category(s.to_string())
    }
}

impl From<String> for Datum {
    fn from(s: String) -> Self {
        Datum::Category(s)
    }
}

impl From<&Value> for Datum {
    fn from(v: &Value) -> Self {
        match v {
            Value::Integer(i) => Datum::Number(*i as f64),
            Value::Float(f) => Datum::from(*f),
            Value::Date(d) => Datum::Date(*d),
            Value::Text(s) => Datum::Category(s.clone()),
            Value::Bool(b) => Datum::Category(b.to_string()),
            Value::Null => Datum::Gap,
        }
    }
}

/// Collect anything datum-like into a coordinate vector.
pub fn data<T: Into<Datum>>(values: impl IntoIterator<Item = T>) -> Vec<Datum> {
    values.into_iter().map(Into::into).collect()
}

// ---------------------------------------------------------------------------
// Marks and traces
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineShape {
    Linear,
    /// Horizontal then vertical steps.
    Step,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fill {
    None,
    ToZero,
    /// Fill down to the previous trace in the same panel.
    ToNext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    Circle,
    /// Hollow circle outlined in the trace colour.
    Ring,
    /// Short horizontal dash, used for "jump" plots.
    Dash,
}

/// A rendered grid of text cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableCells {
    pub header: Vec<String>,
    /// Column-major cell text.
    pub columns: Vec<Vec<String>>,
    /// Column-major background colours; may be empty for plain white.
    pub fills: Vec<Vec<Rgb>>,
    /// Column-major text colours; may be empty for black.
    pub text_colors: Vec<Vec<Rgb>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mark {
    Bar {
        horizontal: bool,
    },
    Line {
        shape: LineShape,
        fill: Fill,
        dashed: bool,
        width: f32,
    },
    Markers {
        size: f32,
        symbol: Symbol,
    },
    /// Text drawn at each point; labels come from the trace's `text`.
    Text,
    /// `x`/`y` are cell categories, `z` the cell values.
    Heatmap {
        z: Vec<f64>,
        scale: ColorScale,
    },
    /// `x` holds region codes, `y` the value per region.
    Choropleth {
        scale: ColorScale,
    },
    Table(TableCells),
}

impl Mark {
    pub fn line() -> Self {
        Mark::Line {
            shape: LineShape::Linear,
            fill: Fill::None,
            dashed: false,
            width: 2.0,
        }
    }

    pub fn area(fill: Fill) -> Self {
        Mark::Line {
            shape: LineShape::Linear,
            fill,
            dashed: false,
            width: 1.5,
        }
    }

    pub fn markers(size: f32) -> Self {
        Mark::Markers {
            size,
            symbol: Symbol::Circle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub name: String,
    pub mark: Mark,
    pub x: Vec<Datum>,
    pub y: Vec<Datum>,
    pub text: Vec<String>,
    pub color: Rgb,
    /// Per-point colours; empty means every point uses `color`.
    pub point_colors: Vec<Rgb>,
    pub show_legend: bool,
    /// Traces sharing a stack group are drawn cumulatively.
    pub stack_group: Option<String>,
    pub panel: usize,
}

impl Trace {
    pub fn new(name: impl Into<String>, mark: Mark) -> Self {
        Trace {
            name: name.into(),
            mark,
            x: Vec::new(),
            y: Vec::new(),
            text: Vec::new(),
            color: Rgb::GRAY,
            point_colors: Vec::new(),
            show_legend: true,
            stack_group: None,
            panel: 0,
        }
    }

    pub fn xy(mut self, x: Vec<Datum>, y: Vec<Datum>) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn point_colors(mut self, colors: Vec<Rgb>) -> Self {
        self.point_colors = colors;
        self
    }

    pub fn text(mut self, text: Vec<String>) -> Self {
        self.text = text;
        self
    }

    pub fn hide_legend(mut self) -> Self {
        self.show_legend = false;
        self
    }

    pub fn stack(mut self, group: &str) -> Self {
        self.stack_group = Some(group.to_string());
        self
    }

    pub fn panel(mut self, panel: usize) -> Self {
        self.panel = panel;
        self
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Axis {
    pub title: Option<String>,
    pub range: Option<(Datum, Datum)>,
    /// Formatting hint such as `"$,.0f"`, `"%b %d"` or `".0%"`.
    pub tick_format: Option<String>,
    /// Explicit category order, top-to-bottom / left-to-right.
    pub categories: Vec<String>,
    /// Values grow right-to-left on x, top-to-bottom on y.
    pub reversed: bool,
    pub hidden: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Panel {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
}

/// Text placed in data coordinates of a panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub text: String,
    pub x: Datum,
    pub y: Datum,
    pub panel: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Vertical,
    Horizontal,
}

/// A reference line across a whole panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub orientation: Orientation,
    pub at: Datum,
    pub label: Option<String>,
    pub dashed: bool,
    pub panel: usize,
}

impl Rule {
    pub fn vertical(at: impl Into<Datum>) -> Self {
        Rule {
            orientation: Orientation::Vertical,
            at: at.into(),
            label: None,
            dashed: false,
            panel: 0,
        }
    }

    pub fn horizontal(at: impl Into<Datum>) -> Self {
        Rule {
            orientation: Orientation::Horizontal,
            ..Rule::vertical(at)
        }
    }

    pub fn dashed(mut self) -> Self {
        self.dashed = true;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

// ---------------------------------------------------------------------------
// ChartSpec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub subtitle: Option<String>,
    pub footer: Option<String>,
    pub width: u32,
    pub height: u32,
    pub background: Rgb,
    /// Panel grid as `(rows, columns)`; panels are numbered row-major.
    pub grid: (usize, usize),
    pub panels: Vec<Panel>,
    pub traces: Vec<Trace>,
    pub annotations: Vec<Annotation>,
    pub rules: Vec<Rule>,
    pub show_legend: bool,
}

impl ChartSpec {
    /// A single-panel 800×600 chart on white.
    pub fn new(title: impl Into<String>) -> Self {
        ChartSpec {
            title: title.into(),
            subtitle: None,
            footer: None,
            width: 800,
            height: 600,
            background: Rgb::WHITE,
            grid: (1, 1),
            panels: vec![Panel::default()],
            traces: Vec::new(),
            annotations: Vec::new(),
            rules: Vec::new(),
            show_legend: true,
        }
    }

    /// The chart shown for an empty selection.
    pub fn placeholder(title: impl Into<String>) -> Self {
        let mut spec = ChartSpec::new(title);
        spec.show_legend = false;
        spec.annotations.push(Annotation {
            text: "Nothing selected".to_string(),
            x: Datum::Number(0.5),
            y: Datum::Number(0.5),
            panel: 0,
        });
        spec
    }

    pub fn is_placeholder(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn background(mut self, color: Rgb) -> Self {
        self.background = color;
        self
    }

    /// Switch to a `rows × cols` grid of default panels.
    pub fn grid(mut self, rows: usize, cols: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        self.grid = (rows, cols);
        self.panels = vec![Panel::default(); rows * cols];
        self
    }

    /// Mutable access to a panel; out-of-range indices address the last panel.
    pub fn panel_mut(&mut self, index: usize) -> &mut Panel {
        let last = self.panels.len().saturating_sub(1);
        if self.panels.is_empty() {
            self.panels.push(Panel::default());
        }
        &mut self.panels[index.min(last)]
    }

    pub fn push(&mut self, trace: Trace) {
        self.traces.push(trace);
    }

    pub fn annotate(&mut self, text: impl Into<String>, x: impl Into<Datum>, y: impl Into<Datum>) {
        self.annotate_in(0, text, x, y);
    }

    pub fn annotate_in(
        &mut self,
        panel: usize,
        text: impl Into<String>,
        x: impl Into<Datum>,
        y: impl Into<Datum>,
    ) {
        self.annotations.push(Annotation {
            text: text.into(),
            x: x.into(),
            y: y.into(),
            panel,
        });
    }

    pub fn rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_has_no_traces() {
        let spec = ChartSpec::placeholder("Empty");
        assert!(spec.is_placeholder());
        assert_eq!(spec.annotations[0].text, "Nothing selected");
    }

    #[test]
    fn serializes_marks_with_type_tags() {
        let mut spec = ChartSpec::new("t");
        spec.push(
            Trace::new("s", Mark::Bar { horizontal: true })
                .xy(data([1.0, f64::NAN]), data(["a", "b"]))
                .color(Rgb::hex(0x4E79A7)),
        );
        let json = spec.to_json().unwrap();
        assert!(json.contains("\"type\": \"bar\""), "{json}");
        assert!(json.contains("\"#4E79A7\""));
        assert!(json.contains("null"));
    }

    #[test]
    fn grid_creates_row_major_panels() {
        let mut spec = ChartSpec::new("g").grid(2, 3);
        assert_eq!(spec.panels.len(), 6);
        spec.panel_mut(4).title = Some("p4".into());
        assert_eq!(spec.panels[4].title.as_deref(), Some("p4"));
        spec.panel_mut(99).title = Some("last".into());
        assert_eq!(spec.panels[5].title.as_deref(), Some("last"));
    }

    #[test]
    fn values_convert_to_data() {
        assert_eq!(Datum::from(&Value::Integer(3)), Datum::Number(3.0));
        assert_eq!(Datum::from(&Value::Null), Datum::Gap);
        assert_eq!(Datum::from(&Value::from("x")), Datum::Category("x".into()));
    }
}
