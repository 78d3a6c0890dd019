//! Text measurement behind the `TextMeasure` seam.
//!
//! Two backends:
//! - `StaticMetrics` reads per-character advance tables (em units) keyed by a
//!   coarse font class. It needs no font file, so layout stays deterministic
//!   in tests and on hosts without fonts. CJK and full-width forms measure
//!   1.0em; other non-ASCII falls back to the table's average width.
//! - `GlyphMetrics` sums the horizontal advances of a loaded font, matching
//!   what the raster renderer draws glyph by glyph.
//!
//! Tables cover ASCII 0x20..=0x7E (95 printable characters).
//! Index = (char as usize) - 32.

use std::sync::Arc;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use thiserror::Error;

use crate::layout::style::{FontSlant, FontWeight};
use crate::layout::wrap::is_cjk;

// ────────────────────────────────────────────────────────────────────────────
// Measurement seam
// ────────────────────────────────────────────────────────────────────────────

/// The font half of a `Style`: everything that changes a measured width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontDescriptor<'a> {
    pub size: f32,
    pub weight: FontWeight,
    pub slant: FontSlant,
    pub family: &'a str,
    /// Extra advance per character, in em.
    pub letter_spacing: f32,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeasureError {
    #[error("font size must be a positive finite number, got {0}")]
    InvalidFontSize(f32),
}

/// `measure(text, font) → pixel width`. Failures propagate to the caller of
/// the composition untouched.
pub trait TextMeasure: Send + Sync {
    fn measure(&self, text: &str, font: &FontDescriptor<'_>) -> Result<f32, MeasureError>;
}

fn check_size(font: &FontDescriptor<'_>) -> Result<(), MeasureError> {
    if font.size.is_finite() && font.size > 0.0 {
        Ok(())
    } else {
        Err(MeasureError::InvalidFontSize(font.size))
    }
}

fn letter_spacing_px(text: &str, font: &FontDescriptor<'_>) -> f32 {
    font.letter_spacing * font.size * text.chars().count() as f32
}

// ────────────────────────────────────────────────────────────────────────────
// Font classes
// ────────────────────────────────────────────────────────────────────────────

/// Coarse grouping of CSS-style family lists onto one metric table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontClass {
    /// Humanist sans (Arial, Helvetica, Roboto, Ubuntu, YaHei).
    Sans,
    /// Geometric sans with wider bowls (Montserrat, Segoe UI).
    Wide,
    /// Book serifs (Georgia, Times, Playfair, SimSun).
    Serif,
    /// Condensed display faces (Impact, Arial Black, Oswald).
    Condensed,
}

impl FontClass {
    /// Classifies by the first recognised family in the list.
    pub fn from_family(family: &str) -> Self {
        let lower = family.to_lowercase();
        for name in lower.split(',') {
            let name = name.trim().trim_matches(|c| c == '"' || c == '\'');
            if name.contains("impact") || name.contains("black") || name.contains("oswald") {
                return FontClass::Condensed;
            }
            if name.contains("montserrat") || name.contains("segoe") {
                return FontClass::Wide;
            }
            if name.contains("georgia")
                || name.contains("times")
                || name.contains("playfair")
                || name.contains("simsun")
                || name == "serif"
            {
                return FontClass::Serif;
            }
            if name.contains("arial")
                || name.contains("helvetica")
                || name.contains("roboto")
                || name.contains("ubuntu")
                || name.contains("yahei")
                || name.contains("noto")
                || name.contains("hiragino")
                || name == "sans-serif"
            {
                return FontClass::Sans;
            }
        }
        FontClass::Sans
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Static width tables
// ────────────────────────────────────────────────────────────────────────────

/// Per-character advances for one font class, in em at 1em.
pub struct MetricTable {
    widths: &'static [f32; 95],
    /// Fallback for non-ASCII, non-CJK characters.
    pub average_char_width: f32,
    /// Applied on top of `widths`; lets one table serve two classes.
    pub width_scale: f32,
}

/// Advance of ideographs and full-width forms.
const CJK_ADVANCE_EM: f32 = 1.0;
/// Synthetic widening for bold text.
const BOLD_WIDTH_FACTOR: f32 = 1.06;

impl MetricTable {
    fn char_em(&self, c: char) -> f32 {
        let code = c as usize;
        if (32..=126).contains(&code) {
            self.widths[code - 32] * self.width_scale
        } else if is_cjk(c) {
            CJK_ADVANCE_EM
        } else {
            self.average_char_width * self.width_scale
        }
    }

    /// Width of `s` in em, before weight and letter spacing.
    pub fn measure_em(&self, s: &str) -> f32 {
        s.chars().map(|c| self.char_em(c)).sum()
    }
}

#[rustfmt::skip]
static SANS_WIDTHS: [f32; 95] = [
    // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
    0.25, 0.30, 0.38, 0.56, 0.56, 0.89, 0.67, 0.22, 0.33, 0.33, 0.39, 0.59, 0.28, 0.33, 0.28, 0.31,
    // 0     1     2     3     4     5     6     7     8     9
    0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56,
    // :     ;     <     =     >     ?     @
    0.28, 0.28, 0.59, 0.59, 0.59, 0.50, 1.02,
    // A     B     C     D     E     F     G     H     I     J     K     L     M
    0.67, 0.61, 0.61, 0.67, 0.56, 0.50, 0.67, 0.67, 0.25, 0.39, 0.61, 0.53, 0.78,
    // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
    0.67, 0.72, 0.56, 0.72, 0.61, 0.50, 0.56, 0.67, 0.67, 0.89, 0.61, 0.61, 0.56,
    // [     \     ]     ^     _     `
    0.28, 0.31, 0.28, 0.47, 0.56, 0.34,
    // a     b     c     d     e     f     g     h     i     j     k     l     m
    0.56, 0.56, 0.50, 0.56, 0.56, 0.31, 0.56, 0.56, 0.22, 0.22, 0.53, 0.22, 0.83,
    // n     o     p     q     r     s     t     u     v     w     x     y     z
    0.56, 0.56, 0.56, 0.56, 0.33, 0.44, 0.39, 0.56, 0.50, 0.72, 0.50, 0.50, 0.44,
    // {     |     }     ~
    0.33, 0.26, 0.33, 0.59,
];

#[rustfmt::skip]
static SERIF_WIDTHS: [f32; 95] = [
    // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
    0.25, 0.33, 0.41, 0.50, 0.50, 0.83, 0.78, 0.18, 0.33, 0.33, 0.50, 0.56, 0.25, 0.33, 0.25, 0.28,
    // 0     1     2     3     4     5     6     7     8     9
    0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50,
    // :     ;     <     =     >     ?     @
    0.28, 0.28, 0.56, 0.56, 0.56, 0.44, 0.92,
    // A     B     C     D     E     F     G     H     I     J     K     L     M
    0.72, 0.67, 0.67, 0.72, 0.61, 0.56, 0.72, 0.72, 0.33, 0.39, 0.72, 0.61, 0.89,
    // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
    0.72, 0.72, 0.56, 0.72, 0.67, 0.56, 0.61, 0.72, 0.72, 0.94, 0.72, 0.72, 0.61,
    // [     \     ]     ^     _     `
    0.33, 0.28, 0.33, 0.47, 0.50, 0.33,
    // a     b     c     d     e     f     g     h     i     j     k     l     m
    0.44, 0.50, 0.44, 0.50, 0.44, 0.33, 0.50, 0.50, 0.28, 0.28, 0.50, 0.28, 0.78,
    // n     o     p     q     r     s     t     u     v     w     x     y     z
    0.50, 0.50, 0.50, 0.50, 0.33, 0.39, 0.28, 0.50, 0.50, 0.72, 0.50, 0.50, 0.44,
    // {     |     }     ~
    0.48, 0.20, 0.48, 0.54,
];

#[rustfmt::skip]
static CONDENSED_WIDTHS: [f32; 95] = [
    // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
    0.17, 0.20, 0.26, 0.38, 0.38, 0.61, 0.46, 0.15, 0.23, 0.23, 0.27, 0.40, 0.19, 0.23, 0.19, 0.21,
    // 0     1     2     3     4     5     6     7     8     9
    0.38, 0.38, 0.38, 0.38, 0.38, 0.38, 0.38, 0.38, 0.38, 0.38,
    // :     ;     <     =     >     ?     @
    0.19, 0.19, 0.40, 0.40, 0.40, 0.34, 0.69,
    // A     B     C     D     E     F     G     H     I     J     K     L     M
    0.46, 0.41, 0.41, 0.46, 0.38, 0.34, 0.46, 0.46, 0.17, 0.27, 0.41, 0.36, 0.53,
    // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
    0.46, 0.49, 0.38, 0.49, 0.41, 0.34, 0.38, 0.46, 0.46, 0.61, 0.41, 0.41, 0.38,
    // [     \     ]     ^     _     `
    0.19, 0.21, 0.19, 0.32, 0.38, 0.23,
    // a     b     c     d     e     f     g     h     i     j     k     l     m
    0.38, 0.38, 0.34, 0.38, 0.38, 0.21, 0.38, 0.38, 0.15, 0.15, 0.36, 0.15, 0.56,
    // n     o     p     q     r     s     t     u     v     w     x     y     z
    0.38, 0.38, 0.38, 0.38, 0.23, 0.30, 0.27, 0.38, 0.34, 0.49, 0.34, 0.34, 0.30,
    // {     |     }     ~
    0.23, 0.18, 0.23, 0.40,
];

static SANS_TABLE: MetricTable = MetricTable {
    widths: &SANS_WIDTHS,
    average_char_width: 0.52,
    width_scale: 1.0,
};

/// Geometric faces run about 5% wider than the humanist table.
static WIDE_TABLE: MetricTable = MetricTable {
    widths: &SANS_WIDTHS,
    average_char_width: 0.52,
    width_scale: 1.05,
};

static SERIF_TABLE: MetricTable = MetricTable {
    widths: &SERIF_WIDTHS,
    average_char_width: 0.48,
    width_scale: 1.0,
};

static CONDENSED_TABLE: MetricTable = MetricTable {
    widths: &CONDENSED_WIDTHS,
    average_char_width: 0.35,
    width_scale: 1.0,
};

/// Returns the static metric table for a font class.
pub fn get_metrics(class: FontClass) -> &'static MetricTable {
    match class {
        FontClass::Sans => &SANS_TABLE,
        FontClass::Wide => &WIDE_TABLE,
        FontClass::Serif => &SERIF_TABLE,
        FontClass::Condensed => &CONDENSED_TABLE,
    }
}

/// Table-driven measurement. Deterministic and font-file free.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticMetrics;

impl TextMeasure for StaticMetrics {
    fn measure(&self, text: &str, font: &FontDescriptor<'_>) -> Result<f32, MeasureError> {
        check_size(font)?;
        let table = get_metrics(FontClass::from_family(font.family));
        let weight = match font.weight {
            FontWeight::Bold => BOLD_WIDTH_FACTOR,
            FontWeight::Normal => 1.0,
        };
        Ok(table.measure_em(text) * font.size * weight + letter_spacing_px(text, font))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Glyph metrics
// ────────────────────────────────────────────────────────────────────────────

/// Measures with the advances of a real font. Family, weight and slant are
/// ignored: one face serves every style.
#[derive(Clone)]
pub struct GlyphMetrics {
    font: Arc<FontVec>,
}

impl GlyphMetrics {
    pub fn new(font: Arc<FontVec>) -> Self {
        Self { font }
    }
}

impl TextMeasure for GlyphMetrics {
    fn measure(&self, text: &str, font: &FontDescriptor<'_>) -> Result<f32, MeasureError> {
        check_size(font)?;
        let scaled = self.font.as_scaled(PxScale::from(font.size));
        let advance: f32 = text
            .chars()
            .map(|c| scaled.h_advance(scaled.glyph_id(c)))
            .sum();
        Ok(advance + letter_spacing_px(text, font))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
