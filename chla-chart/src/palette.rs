//! Colours used across the figures.

use plotters::style::RGBColor;

/// Station basins I, II, III, IV-1, IV-2.
pub const BASIN_COLORS: [RGBColor; 5] = [
    RGBColor(0x00, 0x00, 0xFF),
    RGBColor(0x22, 0xB1, 0x4C),
    RGBColor(0x9E, 0x00, 0x3A),
    RGBColor(0xFF, 0x8C, 0x32),
    RGBColor(0xA2, 0xDB, 0xF6),
];

/// Colourblind-safe qualitative palette, used for months and centerline basins.
pub const COLORBLIND: [RGBColor; 4] = [
    RGBColor(0x01, 0x73, 0xB2),
    RGBColor(0xDE, 0x8F, 0x05),
    RGBColor(0x02, 0x9E, 0x73),
    RGBColor(0xD5, 0x5E, 0x00),
];

/// North coast, south coast, pelagic.
pub const ZONE_COLORS: [RGBColor; 3] = [
    RGBColor(0x00, 0x72, 0xB2),
    RGBColor(0xD5, 0x5E, 0x00),
    RGBColor(0x00, 0x9E, 0x73),
];

/// Linear, logarithmic, polynomial, exponential.
pub const MODEL_COLORS: [RGBColor; 4] = [
    RGBColor(0x4C, 0x72, 0xB0),
    RGBColor(0x55, 0xA8, 0x68),
    RGBColor(0xB8, 0x86, 0x0B),
    RGBColor(0xB4, 0x4E, 0x9E),
];

pub const CHLA_RED: RGBColor = RGBColor(0xE3, 0x1A, 0x1C);
pub const DEPTH_BLUE: RGBColor = RGBColor(0x1F, 0x78, 0xB4);
pub const LITTORAL_GREY: RGBColor = RGBColor(0x66, 0x66, 0x66);
pub const GRID_GREY: RGBColor = RGBColor(0xDD, 0xDD, 0xDD);
pub const HIGHLIGHT_BLUE: RGBColor = RGBColor(0x00, 0xBF, 0xFF);

/// Anchor colours of the plasma colormap at 0, 0.25, 0.5, 0.75 and 1.
const PLASMA: [RGBColor; 5] = [
    RGBColor(0x0D, 0x08, 0x87),
    RGBColor(0x7E, 0x03, 0xA8),
    RGBColor(0xCC, 0x47, 0x78),
    RGBColor(0xF8, 0x95, 0x40),
    RGBColor(0xF0, 0xF9, 0x21),
];

/// Plasma colour for `t` in `[0, 1]` (clamped), interpolated between anchors.
pub fn plasma(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (PLASMA.len() - 1) as f64;
    let lower = (scaled.floor() as usize).min(PLASMA.len() - 2);
    let frac = scaled - lower as f64;
    let (a, b) = (PLASMA[lower], PLASMA[lower + 1]);
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Maps values to `[0, 1]` on a log scale between `vmin` and `vmax`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogNorm {
    pub vmin: f64,
    pub vmax: f64,
}

impl LogNorm {
    /// `vmin` is floored at 0.01 so zero and negative cells map to the bottom colour.
    pub fn new(vmin: f64, vmax: f64) -> Self {
        let vmin = vmin.max(1e-2);
        LogNorm {
            vmin,
            vmax: vmax.max(vmin),
        }
    }

    pub fn normalize(&self, value: f64) -> f64 {
        if self.vmax <= self.vmin {
            return 0.0;
        }
        let v = value.max(self.vmin);
        ((v.ln() - self.vmin.ln()) / (self.vmax.ln() - self.vmin.ln())).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plasma_ends() {
        assert_eq!(plasma(0.0), PLASMA[0]);
        assert_eq!(plasma(1.0), PLASMA[4]);
        assert_eq!(plasma(0.5), PLASMA[2]);
        assert_eq!(plasma(-3.0), PLASMA[0]);
        assert_eq!(plasma(f64::NAN), PLASMA[0]);
    }

    #[test]
    fn test_log_norm() {
        let norm = LogNorm::new(1.0, 100.0);
        assert_eq!(norm.normalize(1.0), 0.0);
        assert!((norm.normalize(10.0) - 0.5).abs() < 1e-12);
        assert_eq!(norm.normalize(1000.0), 1.0);
        assert_eq!(LogNorm::new(0.0, 5.0).vmin, 0.01);
        assert_eq!(LogNorm::new(3.0, 3.0).normalize(3.0), 0.0);
    }
}
