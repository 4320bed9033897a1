//! Colour palettes and multi-stop interpolation.
//!
//! Palettes are lists of CSS colour names or hex codes, spread evenly over
//! `[0, 1]` the way web map viewers interpret a `palette` visualisation
//! parameter. An empty palette is a black to white ramp.
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

const NAMED: &[(&str, Rgb)] = &[
    ("black", Rgb::new(0, 0, 0)),
    ("white", Rgb::new(255, 255, 255)),
    ("red", Rgb::new(255, 0, 0)),
    ("darkred", Rgb::new(139, 0, 0)),
    ("orange", Rgb::new(255, 165, 0)),
    ("yellow", Rgb::new(255, 255, 0)),
    ("lightgreen", Rgb::new(144, 238, 144)),
    ("green", Rgb::new(0, 128, 0)),
    ("darkgreen", Rgb::new(0, 100, 0)),
    ("lime", Rgb::new(0, 255, 0)),
    ("cyan", Rgb::new(0, 255, 255)),
    ("lightblue", Rgb::new(173, 216, 230)),
    ("blue", Rgb::new(0, 0, 255)),
    ("navy", Rgb::new(0, 0, 128)),
    ("purple", Rgb::new(128, 0, 128)),
    ("magenta", Rgb::new(255, 0, 255)),
    ("brown", Rgb::new(165, 42, 42)),
    ("gray", Rgb::new(128, 128, 128)),
    ("grey", Rgb::new(128, 128, 128)),
    ("lightgray", Rgb::new(211, 211, 211)),
];

/// Parse a CSS colour name (case-insensitive) or a `#rrggbb` / `rrggbb` hex code.
pub fn parse_color(spec: &str) -> Result<Rgb> {
    let s = spec.trim();
    let lower = s.to_ascii_lowercase();
    if let Some((_, rgb)) = NAMED.iter().find(|(name, _)| *name == lower) {
        return Ok(*rgb);
    }
    let hex = lower.strip_prefix('#').unwrap_or(&lower);
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
        if let (Ok(r), Ok(g), Ok(b)) = (channel(0), channel(2), channel(4)) {
            return Ok(Rgb::new(r, g, b));
        }
    }
    Err(Error::InvalidArgument {
        arg: "palette",
        value: spec.to_string(),
    })
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_color(c1: Rgb, c2: Rgb, t: f64) -> Rgb {
    Rgb::new(
        lerp(c1.r as f64, c2.r as f64, t).round() as u8,
        lerp(c1.g as f64, c2.g as f64, t).round() as u8,
        lerp(c1.b as f64, c2.b as f64, t).round() as u8,
    )
}

/// Parsed palette, evenly spaced stops.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    pub fn grayscale() -> Self {
        Self {
            colors: vec![Rgb::BLACK, Rgb::WHITE],
        }
    }

    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        if names.is_empty() {
            return Ok(Self::grayscale());
        }
        let colors = names
            .iter()
            .map(|n| parse_color(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { colors })
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Colour at normalised position `t`, clamped to `[0, 1]`.
    pub fn evaluate(&self, t: f64) -> Rgb {
        let n = self.colors.len();
        if n == 1 {
            return self.colors[0];
        }
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let pos = t * (n - 1) as f64;
        let i = (pos.floor() as usize).min(n - 2);
        lerp_color(self.colors[i], self.colors[i + 1], pos - i as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(parse_color("Red").unwrap(), Rgb::new(255, 0, 0));
        assert_eq!(parse_color("lightgreen").unwrap(), Rgb::new(144, 238, 144));
    }

    #[test]
    fn hex_codes_parse() {
        assert_eq!(parse_color("#00ff7f").unwrap(), Rgb::new(0, 255, 127));
        assert_eq!(parse_color("0000FF").unwrap(), Rgb::new(0, 0, 255));
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("ultraviolet").is_err());
    }

    #[test]
    fn stops_are_evenly_spaced() {
        let p = Palette::parse(&["red", "orange", "yellow", "lightgreen", "green"]).unwrap();
        assert_eq!(p.evaluate(0.0), Rgb::new(255, 0, 0));
        assert_eq!(p.evaluate(0.5), Rgb::new(255, 255, 0));
        assert_eq!(p.evaluate(1.0), Rgb::new(0, 128, 0));
        assert_eq!(p.evaluate(2.0), Rgb::new(0, 128, 0));
    }

    #[test]
    fn single_colour_palette_is_constant() {
        let p = Palette::parse(&["yellow"]).unwrap();
        assert_eq!(p.evaluate(0.0), p.evaluate(1.0));
    }

    #[test]
    fn empty_palette_is_grayscale() {
        let p = Palette::parse::<&str>(&[]).unwrap();
        assert_eq!(p.evaluate(0.5), Rgb::new(128, 128, 128));
        assert_eq!(Rgb::new(128, 128, 128).to_hex(), "#808080");
    }
}
