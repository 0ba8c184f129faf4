//! Colormaps - fixed 256-entry RGB lookup tables and quantization
//!
//! Tables are generated at compile time by linear interpolation between
//! evenly spaced color stops, so they live in read-only static data.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{EngineError, Result};

pub const LUT_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn opaque(self) -> Rgba {
        Rgba::new(self.r, self.g, self.b, 255)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// What to do when a quantization range collapses (`hi <= lo`, or a span
/// too wide or too narrow to scale in f32).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DegenerateRangePolicy {
    /// Map every value to index 0.
    #[default]
    Floor,
    /// Fail with [`EngineError::DegenerateRange`].
    Reject,
}

/// Named palettes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Palette {
    #[default]
    Magma,
    /// Red to green, for score overlays.
    Stoplight,
    /// Desaturated stoplight for secondary overlays.
    StoplightMuted,
}

impl Palette {
    pub fn colormap(self) -> &'static Colormap {
        match self {
            Palette::Magma => &MAGMA,
            Palette::Stoplight => &STOPLIGHT,
            Palette::StoplightMuted => &STOPLIGHT_MUTED,
        }
    }
}

pub struct Colormap {
    pub name: &'static str,
    table: [Rgb; LUT_SIZE],
}

impl Colormap {
    /// Table lookup; total over every u8.
    #[inline]
    pub fn resolve(&self, index: u8) -> Rgb {
        self.table[index as usize]
    }

    pub fn table(&self) -> &[Rgb; LUT_SIZE] {
        &self.table
    }
}

const MAGMA_STOPS: [Rgb; 9] = [
    Rgb::new(0, 0, 4),
    Rgb::new(28, 16, 68),
    Rgb::new(79, 18, 123),
    Rgb::new(129, 37, 129),
    Rgb::new(181, 54, 122),
    Rgb::new(229, 80, 100),
    Rgb::new(251, 135, 97),
    Rgb::new(254, 194, 135),
    Rgb::new(252, 253, 191),
];

const STOPLIGHT_STOPS: [Rgb; 3] = [
    Rgb::new(215, 48, 39),
    Rgb::new(254, 224, 139),
    Rgb::new(26, 152, 80),
];

const STOPLIGHT_MUTED_STOPS: [Rgb; 3] = [
    Rgb::new(178, 102, 102),
    Rgb::new(204, 192, 143),
    Rgb::new(102, 153, 112),
];

pub static MAGMA: Colormap = Colormap {
    name: "magma",
    table: interpolate(&MAGMA_STOPS),
};

pub static STOPLIGHT: Colormap = Colormap {
    name: "stoplight",
    table: interpolate(&STOPLIGHT_STOPS),
};

pub static STOPLIGHT_MUTED: Colormap = Colormap {
    name: "stoplight_muted",
    table: interpolate(&STOPLIGHT_MUTED_STOPS),
};

const fn lerp_channel(a: u8, b: u8, frac: i32) -> u8 {
    let (a, b) = (a as i32, b as i32);
    // rounded integer interpolation, frac in 0..=255
    ((a * 255 + (b - a) * frac + 127) / 255) as u8
}

const fn interpolate(stops: &[Rgb]) -> [Rgb; LUT_SIZE] {
    let mut table = [Rgb::new(0, 0, 0); LUT_SIZE];
    let segments = (stops.len() - 1) as i32;
    let mut i = 0;
    while i < LUT_SIZE {
        let pos = i as i32 * segments;
        let seg = pos / 255;
        let frac = pos % 255;
        table[i] = if seg >= segments {
            stops[stops.len() - 1]
        } else {
            let a = stops[seg as usize];
            let b = stops[seg as usize + 1];
            Rgb::new(
                lerp_channel(a.r, b.r, frac),
                lerp_channel(a.g, b.g, frac),
                lerp_channel(a.b, b.b, frac),
            )
        };
        i += 1;
    }
    table
}

/// Maps a real range onto LUT indices 0..=255.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantizer {
    lo: f32,
    scale: f32,
}

impl Quantizer {
    /// A range is usable only if `hi - lo` is finite and positive and the
    /// resulting scale is finite and non-zero; anything else is degenerate.
    pub fn new(lo: f32, hi: f32, policy: DegenerateRangePolicy) -> Result<Self> {
        let span = hi - lo;
        let scale = (LUT_SIZE - 1) as f32 / span;
        if lo.is_finite() && span.is_finite() && span > 0.0 && scale.is_finite() && scale > 0.0 {
            return Ok(Self { lo, scale });
        }
        match policy {
            DegenerateRangePolicy::Floor => {
                warn!(lo, hi, "degenerate quantization range, mapping to index 0");
                Ok(Self { lo, scale: 0.0 })
            }
            DegenerateRangePolicy::Reject => Err(EngineError::DegenerateRange { lo, hi }),
        }
    }

    /// `clamp(round((value - lo) / (hi - lo) * 255), 0, 255)`; NaN maps to 0.
    #[inline]
    pub fn index(&self, value: f32) -> u8 {
        let scaled = ((value - self.lo) * self.scale).round();
        if scaled.is_nan() {
            0
        } else {
            scaled.clamp(0.0, 255.0) as u8
        }
    }
}

pub fn quantize(value: f32, lo: f32, hi: f32, policy: DegenerateRangePolicy) -> Result<u8> {
    Ok(Quantizer::new(lo, hi, policy)?.index(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(MAGMA.resolve(0), MAGMA_STOPS[0]);
        assert_eq!(MAGMA.resolve(255), MAGMA_STOPS[8]);
        assert_eq!(STOPLIGHT.resolve(0), Rgb::new(215, 48, 39));
        assert_eq!(STOPLIGHT.resolve(255), Rgb::new(26, 152, 80));
    }

    #[test]
    fn test_midpoint_is_yellow() {
        // the yellow stop falls between indices 127 and 128
        let mid = STOPLIGHT.resolve(127);
        let next = STOPLIGHT.resolve(128);
        assert!(mid.r >= 250 && next.r >= 250);
    }

    #[test]
    fn test_quantize_bounds() {
        let p = DegenerateRangePolicy::Reject;
        assert_eq!(quantize(-1.0, -1.0, 1.0, p).unwrap(), 0);
        assert_eq!(quantize(1.0, -1.0, 1.0, p).unwrap(), 255);
        assert_eq!(quantize(0.0, -1.0, 1.0, p).unwrap(), 128);
        assert_eq!(quantize(-7.0, -1.0, 1.0, p).unwrap(), 0);
        assert_eq!(quantize(9.0, -1.0, 1.0, p).unwrap(), 255);
        assert_eq!(quantize(f32::NAN, 0.0, 1.0, p).unwrap(), 0);
    }

    #[test]
    fn test_degenerate_floor() {
        let q = Quantizer::new(2.0, 2.0, DegenerateRangePolicy::Floor).unwrap();
        assert_eq!(q.index(2.0), 0);
        assert_eq!(q.index(100.0), 0);
        assert_eq!(q.index(f32::INFINITY), 0);
    }

    #[test]
    fn test_degenerate_reject() {
        assert_eq!(
            quantize(2.0, 2.0, 2.0, DegenerateRangePolicy::Reject),
            Err(EngineError::DegenerateRange { lo: 2.0, hi: 2.0 })
        );
        assert!(quantize(0.0, 3.0, 1.0, DegenerateRangePolicy::Reject).is_err());
    }

    #[test]
    fn test_unbounded_range_is_degenerate() {
        let p = DegenerateRangePolicy::Reject;
        assert_eq!(
            quantize(1.0, 0.0, f32::INFINITY, p),
            Err(EngineError::DegenerateRange { lo: 0.0, hi: f32::INFINITY })
        );
        // span overflows f32 even though both ends are finite
        assert!(matches!(
            quantize(0.0, -3e38, 3e38, p),
            Err(EngineError::DegenerateRange { .. })
        ));
        assert!(quantize(0.0, f32::NEG_INFINITY, 0.0, p).is_err());
        let q = Quantizer::new(0.0, f32::INFINITY, DegenerateRangePolicy::Floor).unwrap();
        assert_eq!(q.index(5.0), 0);
    }

    #[test]
    fn test_within_one_step() {
        let (lo, hi) = (-3.0f32, 5.0f32);
        let q = Quantizer::new(lo, hi, DegenerateRangePolicy::Reject).unwrap();
        for k in 0..=1000 {
            let v = lo + (hi - lo) * k as f32 / 1000.0;
            let exact = (v - lo) / (hi - lo) * 255.0;
            let below = exact.floor().clamp(0.0, 255.0) as u8;
            let above = exact.ceil().clamp(0.0, 255.0) as u8;
            let got = MAGMA.resolve(q.index(v));
            assert!(got == MAGMA.resolve(below) || got == MAGMA.resolve(above));
        }
    }

    #[test]
    fn test_palettes_distinct() {
        assert_eq!(Palette::default(), Palette::Magma);
        assert_eq!(Palette::Magma.colormap().name, "magma");
        assert_ne!(STOPLIGHT.table(), STOPLIGHT_MUTED.table());
    }
}
