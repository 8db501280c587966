//! Colours and linear gradients sampled by the loops.

use serde::{Deserialize, Serialize};

use crate::maf::{clamp, mix};

/// Linear RGB triple with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Result<Self, GradientError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(GradientError::InvalidHex(hex.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|_| GradientError::InvalidHex(hex.to_string()))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Build from a packed `0xRRGGBB` integer.
    pub fn from_rgb_u32(rgb: u32) -> Self {
        Self::new(
            ((rgb >> 16) & 0xff) as f32 / 255.0,
            ((rgb >> 8) & 0xff) as f32 / 255.0,
            (rgb & 0xff) as f32 / 255.0,
        )
    }

    pub fn scaled(self, k: f32) -> Self {
        Self::new(self.r * k, self.g * k, self.b * k)
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// RGBA array with the given alpha, as uploaded to uniforms.
    pub fn to_rgba(self, a: f32) -> [f32; 4] {
        [self.r, self.g, self.b, a]
    }

    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: 1.0,
        }
    }
}

/// Errors produced while building colours and gradients.
#[derive(Debug, Clone, PartialEq)]
pub enum GradientError {
    InvalidHex(String),
    Empty,
}

impl std::fmt::Display for GradientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradientError::InvalidHex(s) => write!(f, "Invalid hex colour: {:?}", s),
            GradientError::Empty => write!(f, "Gradient needs at least one colour stop"),
        }
    }
}

impl std::error::Error for GradientError {}

/// Evenly spaced colour stops, sampled with linear interpolation.
///
/// Stop `i` of `n` sits at `i / n`; the last stop holds until 1.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientLinear {
    stops: Vec<Color>,
}

impl GradientLinear {
    pub fn new(stops: Vec<Color>) -> Result<Self, GradientError> {
        if stops.is_empty() {
            return Err(GradientError::Empty);
        }
        Ok(Self { stops })
    }

    pub fn from_hex<S: AsRef<str>>(stops: &[S]) -> Result<Self, GradientError> {
        let colors = stops
            .iter()
            .map(|s| Color::from_hex(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(colors)
    }

    pub fn stops(&self) -> &[Color] {
        &self.stops
    }

    /// Sample the gradient at `t` (clamped to `[0, 1]`).
    pub fn get_at(&self, t: f32) -> Color {
        let t = clamp(t, 0.0, 1.0);
        let n = self.stops.len();
        let from = ((t * n as f32 * 0.9999).floor() as usize).min(n - 1);
        let to = (from + 1).min(n - 1);
        let a = self.stops[from];
        let b = self.stops[to];
        // The 0.9999 bias can leave `p` a hair above 1 at stop boundaries.
        let p = clamp((t - from as f32 / n as f32) * n as f32, 0.0, 1.0);
        Color::new(mix(a.r, b.r, p), mix(a.g, b.g, p), mix(a.b, b.b, p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        let c = Color::from_hex("#FF8000").unwrap();
        assert_eq!(c.r, 1.0);
        assert!((c.g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.b, 0.0);
        assert_eq!(Color::from_hex("ff8000").unwrap(), c);
        assert!(Color::from_hex("#FF80").is_err());
        assert!(Color::from_hex("#GG8000").is_err());
    }

    #[test]
    fn test_from_hex_rejects_signs() {
        assert!(Color::from_hex("#+F+F+F").is_err());
        assert!(Color::from_hex("-1-1-1").is_err());
        assert!(Color::from_hex("#FF 000").is_err());
    }

    #[test]
    fn test_from_rgb_u32() {
        let c = Color::from_rgb_u32(0x808080);
        assert!((c.r - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.r, c.g);
        assert_eq!(c.g, c.b);
    }

    #[test]
    fn test_get_at_stops() {
        let g = GradientLinear::from_hex(&["#000000", "#FFFFFF"]).unwrap();
        assert_eq!(g.get_at(0.0), Color::new(0.0, 0.0, 0.0));
        // Halfway point is the second stop exactly.
        assert!((g.get_at(0.5).r - 1.0).abs() < 1e-6);
        // Interpolates between stop 0 and stop 1.
        assert!((g.get_at(0.25).r - 0.5).abs() < 1e-6);
        // Past the last stop the colour holds.
        assert!((g.get_at(0.9).r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_get_at_clamps() {
        let g = GradientLinear::from_hex(&["#FF0000", "#0000FF"]).unwrap();
        assert_eq!(g.get_at(-1.0), g.get_at(0.0));
        assert_eq!(g.get_at(2.0), g.get_at(1.0));
    }

    #[test]
    fn test_single_stop() {
        let g = GradientLinear::from_hex(&["#336699"]).unwrap();
        let c = Color::from_hex("#336699").unwrap();
        assert_eq!(g.get_at(0.0), c);
        assert_eq!(g.get_at(0.7), c);
    }

    #[test]
    fn test_empty_gradient() {
        assert_eq!(GradientLinear::new(Vec::new()), Err(GradientError::Empty));
    }

    fn assert_within_stops(gradient: &GradientLinear, samples: u32) {
        let mut lo = [f32::MAX; 3];
        let mut hi = [f32::MIN; 3];
        for stop in gradient.stops() {
            for (c, v) in stop.to_array().into_iter().enumerate() {
                lo[c] = lo[c].min(v);
                hi[c] = hi[c].max(v);
            }
        }

        let n = gradient.stops().len() as f32;
        let dense = (0..samples).map(|i| i as f32 / samples as f32);
        let on_stops = (0..gradient.stops().len()).map(|k| k as f32 / n);
        for t in dense.chain(on_stops) {
            let rgb = gradient.get_at(t).to_array();
            for c in 0..3 {
                assert!(
                    rgb[c] >= lo[c] - 1e-6 && rgb[c] <= hi[c] + 1e-6,
                    "channel {} out of range at t = {}: {:?}",
                    c,
                    t,
                    rgb
                );
            }
        }
    }

    #[test]
    fn test_dense_sweep_stays_within_stops() {
        let palette = crate::palette::Palette::from_hex(&crate::palette::FLORIANDELOOIJ_2).unwrap();
        assert_within_stops(palette.gradient(), 10_000);

        let two = GradientLinear::new(vec![
            Color::from_hex("#102030").unwrap(),
            Color::from_hex("#F0E0D0").unwrap(),
        ])
        .unwrap();
        assert_within_stops(&two, 10_000);
    }
}
