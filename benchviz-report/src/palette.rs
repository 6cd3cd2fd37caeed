//! Display colors for chart series

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Serialize, Serializer};

/// Alpha used for filled bars
pub const BAR_ALPHA: f64 = 0.2;

/// An sRGB color with opacity, serialized in CSS `rgb()`/`rgba()` form
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Self { a: a.clamp(0.0, 1.0), ..self }
    }

    pub fn to_css(&self) -> String {
        if self.a >= 1.0 {
            format!("rgb({}, {}, {})", self.r, self.g, self.b)
        } else {
            format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, round_alpha(self.a))
        }
    }
}

fn round_alpha(a: f64) -> f64 {
    (a * 1000.0).round() / 1000.0
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_css())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_css())
    }
}

/// Fixed colors for line charts, cycled when there are more series
pub const LINE_COLORS: [Color; 4] = [
    Color::rgb(255, 99, 132),
    Color::rgb(255, 205, 86),
    Color::rgb(54, 162, 235),
    Color::rgb(75, 192, 192),
];

pub fn line_color(index: usize) -> Color {
    LINE_COLORS[index % LINE_COLORS.len()]
}

/// Seeded random color source.
///
/// The same seed yields the same sequence, so a test keeps its color across
/// report regenerations and server restarts.
pub struct Palette {
    rng: StdRng,
}

impl Palette {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_color(&mut self, alpha: f64) -> Color {
        Color {
            r: self.rng.gen_range(0..=255),
            g: self.rng.gen_range(0..=255),
            b: self.rng.gen_range(0..=255),
            a: alpha,
        }
    }

    pub fn take(&mut self, count: usize, alpha: f64) -> Vec<Color> {
        (0..count).map(|_| self.next_color(alpha)).collect()
    }
}

/// Alpha for run `run` of `runs`: older runs are fainter, the newest is
/// opaque enough to read against a light background.
pub fn run_alpha(run: usize, runs: usize) -> f64 {
    if runs <= 1 {
        return 0.6;
    }
    BAR_ALPHA + 0.6 * run as f64 / (runs - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_format() {
        assert_eq!(Color::rgb(1, 2, 3).to_css(), "rgb(1, 2, 3)");
        assert_eq!(Color::rgb(1, 2, 3).with_alpha(0.2).to_css(), "rgba(1, 2, 3, 0.2)");
        assert_eq!(serde_json::to_string(&LINE_COLORS[0]).unwrap(), "\"rgb(255, 99, 132)\"");
    }

    #[test]
    fn test_palette_is_deterministic() {
        let a = Palette::new(42).take(5, BAR_ALPHA);
        let b = Palette::new(42).take(5, BAR_ALPHA);
        let c = Palette::new(43).take(5, BAR_ALPHA);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_line_colors_cycle() {
        assert_eq!(line_color(0), line_color(4));
        assert_ne!(line_color(0), line_color(1));
    }

    #[test]
    fn test_run_alpha_range() {
        assert_eq!(run_alpha(0, 1), 0.6);
        assert!((run_alpha(0, 3) - 0.2).abs() < 1e-12);
        assert!((run_alpha(2, 3) - 0.8).abs() < 1e-12);
    }
}
