use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};
use serde::{Serialize, Serializer};

use crate::data::model::Value;

// ---------------------------------------------------------------------------
// Rgb – serializable colour used in chart specs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const GRAY: Rgb = Rgb(160, 160, 160);

    /// `Rgb::hex(0x4E79A7)`
    pub const fn hex(rgb: u32) -> Rgb {
        Rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    /// Black or white, whichever reads better on top of this colour.
    pub fn contrasting_text(&self) -> Rgb {
        let luma = 0.299 * self.0 as f32 + 0.587 * self.1 as f32 + 0.114 * self.2 as f32;
        if luma > 140.0 {
            Rgb::BLACK
        } else {
            Rgb::WHITE
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn to_linear(c: Rgb) -> LinSrgb {
    Srgb::new(c.0, c.1, c.2).into_format::<f32>().into_linear()
}

fn from_linear(c: LinSrgb) -> Rgb {
    let s: Srgb<u8> = Srgb::<f32>::from_linear(c).into_format();
    Rgb(s.red, s.green, s.blue)
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: category value → Rgb
// ---------------------------------------------------------------------------

/// Maps the distinct values of a series column to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<Value, Rgb>,
    default_color: Rgb,
}

impl ColorMap {
    /// Build a colour map from a column's unique values.
    pub fn new(unique_values: &BTreeSet<Value>) -> Self {
        let palette = generate_palette(unique_values.len());
        let mapping = unique_values.iter().cloned().zip(palette).collect();
        ColorMap {
            mapping,
            default_color: Rgb::GRAY,
        }
    }

    /// Look up the colour for a given value.
    pub fn color_for(&self, value: &Value) -> Rgb {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }
}

// ---------------------------------------------------------------------------
// Continuous colour scales
// ---------------------------------------------------------------------------

/// Piecewise-linear colour scale over `0.0..=1.0`, mixed in linear RGB.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorScale {
    stops: Vec<(f64, Rgb)>,
}

impl ColorScale {
    pub fn new(stops: Vec<(f64, Rgb)>) -> Self {
        ColorScale { stops }
    }

    pub fn two(low: Rgb, high: Rgb) -> Self {
        ColorScale::new(vec![(0.0, low), (1.0, high)])
    }

    /// Red → white → blue diverging scale.
    pub fn red_blue() -> Self {
        ColorScale::new(vec![
            (0.0, Rgb::hex(0x67001F)),
            (0.25, Rgb::hex(0xD6604D)),
            (0.5, Rgb::hex(0xF7F7F7)),
            (0.75, Rgb::hex(0x4393C3)),
            (1.0, Rgb::hex(0x053061)),
        ])
    }

    pub fn blue_green() -> Self {
        ColorScale::new(vec![
            (0.0, Rgb::hex(0xF7FCFD)),
            (0.5, Rgb::hex(0x66C2A4)),
            (1.0, Rgb::hex(0x00441B)),
        ])
    }

    pub fn yellow_green() -> Self {
        ColorScale::new(vec![
            (0.0, Rgb::hex(0xFFFFE5)),
            (0.5, Rgb::hex(0x78C679)),
            (1.0, Rgb::hex(0x004529)),
        ])
    }

    /// Colour at position `t`, clamped into `0.0..=1.0`.
    pub fn sample(&self, t: f64) -> Rgb {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let Some(&(_, first)) = self.stops.first() else {
            return Rgb::GRAY;
        };
        let mut prev = (0.0, first);
        for &(pos, color) in &self.stops {
            if t <= pos {
                let span = pos - prev.0;
                if span <= 0.0 {
                    return color;
                }
                let f = ((t - prev.0) / span) as f32;
                return from_linear(to_linear(prev.1).mix(to_linear(color), f));
            }
            prev = (pos, color);
        }
        prev.1
    }

    /// Colour of `value` within `min..=max`.
    pub fn sample_range(&self, value: f64, min: f64, max: f64) -> Rgb {
        if max > min {
            self.sample((value - min) / (max - min))
        } else {
            self.sample(0.5)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trips_through_display() {
        assert_eq!(Rgb::hex(0x4E79A7).to_string(), "#4E79A7");
        assert_eq!(serde_json::to_string(&Rgb::hex(0x00FF10)).unwrap(), "\"#00FF10\"");
    }

    #[test]
    fn palette_has_distinct_colors() {
        let p = generate_palette(4);
        assert_eq!(p.len(), 4);
        let distinct: BTreeSet<_> = p.iter().map(|c| (c.0, c.1, c.2)).collect();
        assert_eq!(distinct.len(), 4);
    }

    #[test]
    fn scale_hits_its_stops() {
        let scale = ColorScale::two(Rgb::BLACK, Rgb::WHITE);
        assert_eq!(scale.sample(0.0), Rgb::BLACK);
        assert_eq!(scale.sample(1.0), Rgb::WHITE);
        assert_eq!(scale.sample(7.0), Rgb::WHITE);
        let mid = scale.sample(0.5);
        assert!(mid.0 > 100 && mid.0 < 255);
    }

    #[test]
    fn color_map_falls_back_to_gray() {
        let values: BTreeSet<Value> = ["a", "b"].into_iter().map(Value::from).collect();
        let map = ColorMap::new(&values);
        assert_ne!(map.color_for(&Value::from("a")), map.color_for(&Value::from("b")));
        assert_eq!(map.color_for(&Value::from("zzz")), Rgb::GRAY);
    }

    #[test]
    fn contrast_text() {
        assert_eq!(Rgb::hex(0x2E5A87).contrasting_text(), Rgb::WHITE);
        assert_eq!(Rgb::hex(0xEBF0F8).contrasting_text(), Rgb::BLACK);
    }
}
