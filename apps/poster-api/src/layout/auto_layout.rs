//! Analysis-driven seeds: each fragment claims a grid cell of the brightness
//! analysis and all fragments share one contrast palette.

use crate::layout::brightness::ImageAnalysis;
use crate::layout::style::{
    Alignment, Anchor, Color, FontSlant, FontWeight, FragmentKind, FragmentSeed, Fragments,
    SeedTable, Style, TextTransform, SHADOW_BLUR,
};

const BASE_FONT_FACTOR: f32 = 0.04;
/// Text longer than this many characters shrinks by `LONG_TEXT_CHARS / len`.
const LONG_TEXT_CHARS: usize = 30;
const AUTO_FAMILY: &str = r#"Arial, "Microsoft YaHei", sans-serif"#;

struct Preference {
    cells: &'static [usize],
    /// Fraction of the canvas height added to the cell center.
    y_offset: f32,
    size_multiplier: f32,
    width_ratio: f32,
    /// Relative position used when the fragment is absent.
    fallback: (f32, f32),
}

fn preference(kind: FragmentKind) -> Preference {
    match kind {
        FragmentKind::MainTitle => Preference {
            cells: &[1, 4, 7],
            y_offset: -0.10,
            size_multiplier: 2.0,
            width_ratio: 0.8,
            fallback: (0.5, 0.2),
        },
        FragmentKind::Slogan => Preference {
            cells: &[1, 4],
            y_offset: 0.05,
            size_multiplier: 1.5,
            width_ratio: 0.7,
            fallback: (0.5, 0.35),
        },
        FragmentKind::MainText => Preference {
            cells: &[4, 7],
            y_offset: 0.0,
            size_multiplier: 1.2,
            width_ratio: 0.6,
            fallback: (0.5, 0.5),
        },
        FragmentKind::SubText => Preference {
            cells: &[7],
            y_offset: 0.0,
            size_multiplier: 1.0,
            width_ratio: 0.6,
            fallback: (0.5, 0.65),
        },
        FragmentKind::DataText => Preference {
            cells: &[7, 8],
            y_offset: 0.10,
            size_multiplier: 0.8,
            width_ratio: 0.7,
            fallback: (0.5, 0.8),
        },
    }
}

/// Fill, stroke and stroke width shared by every fragment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: f32,
}

pub fn contrast_palette(analysis: &ImageAnalysis) -> Palette {
    if analysis.is_dark {
        Palette {
            fill: Color::WHITE,
            stroke: Color::BLACK.with_alpha(0.8),
            stroke_width: 3.0,
        }
    } else {
        Palette {
            fill: Color::BLACK,
            stroke: Color::WHITE.with_alpha(0.8),
            stroke_width: 2.0,
        }
    }
}

/// First unclaimed preferred cell, else the best-ranked unclaimed cell.
/// Marks the returned cell as claimed.
pub fn claim_cell(
    preferred: &[usize],
    analysis: &ImageAnalysis,
    claimed: &mut [bool; 9],
) -> Option<usize> {
    let cell = preferred
        .iter()
        .chain(analysis.ranked.iter())
        .copied()
        .find(|&i| i < claimed.len() && !claimed[i])?;
    claimed[cell] = true;
    Some(cell)
}

/// Seeds for every kind. Present fragments claim cells in priority order;
/// absent ones keep a fixed default position and are never placed.
pub fn auto_layout(
    analysis: &ImageAnalysis,
    fragments: &Fragments,
    width: f32,
    height: f32,
) -> SeedTable {
    let palette = contrast_palette(analysis);
    let base_size = width.min(height) * BASE_FONT_FACTOR;
    let mut claimed = [false; 9];

    FragmentKind::PRIORITY_ORDER.map(|kind| {
        let pref = preference(kind);
        let text = fragments.get(kind);

        let anchor = match text {
            Some(_) => {
                let (cx, cy) = claim_cell(pref.cells, analysis, &mut claimed)
                    .map(|i| analysis.regions[i].cell.center())
                    .unwrap_or((width / 2.0, height / 2.0));
                Anchor::new(cx, cy + height * pref.y_offset)
            }
            None => Anchor::new(width * pref.fallback.0, height * pref.fallback.1),
        };

        let mut font_size = base_size * pref.size_multiplier;
        let len = text.map_or(0, |t| t.chars().count());
        if len > LONG_TEXT_CHARS {
            font_size *= LONG_TEXT_CHARS as f32 / len as f32;
        }

        let single_line = kind.role().is_single_line();
        let style = Style {
            font_size,
            font_weight: if single_line {
                FontWeight::Bold
            } else {
                FontWeight::Normal
            },
            font_style: if kind == FragmentKind::DataText {
                FontSlant::Italic
            } else {
                FontSlant::Normal
            },
            font_family: AUTO_FAMILY.to_string(),
            align: Alignment::Center,
            stroke_width: palette.stroke_width,
            fill: palette.fill,
            stroke: palette.stroke,
            opacity: 1.0,
            letter_spacing: 0.0,
            text_transform: TextTransform::None,
            max_width: width * pref.width_ratio,
            shadow_blur: SHADOW_BLUR,
        };
        FragmentSeed { anchor, style }
    })
}
