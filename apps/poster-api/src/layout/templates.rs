//! Built-in layout templates and their resolution against a canvas size.
//!
//! A template stores relative positions and size ratios per fragment; only the
//! fields that differ from the per-kind defaults are set.

use serde::Serialize;

use crate::layout::style::Alignment::{Left, Right};
use crate::layout::style::{
    Alignment, Anchor, Color, FontSlant, FontWeight, FragmentKind, FragmentSeed, SeedTable, Style,
    TextTransform, SHADOW_BLUR,
};

pub const DEFAULT_TEMPLATE_ID: &str = "classic";

/// One fragment's placement inside a template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateSlot {
    pub rel_x: f32,
    pub rel_y: f32,
    /// Font size as a fraction of the canvas width.
    pub font_size_ratio: f32,
    pub max_font_size: f32,
    pub weight: Option<FontWeight>,
    pub slant: Option<FontSlant>,
    pub align: Alignment,
    /// Overrides the template-wide family.
    pub family: Option<&'static str>,
    /// Width budget as a fraction of the canvas width.
    pub width_ratio: Option<f32>,
    pub opacity: f32,
    pub letter_spacing: f32,
    pub transform: TextTransform,
    pub stroke_width: Option<f32>,
}

impl TemplateSlot {
    const fn at(rel_x: f32, rel_y: f32, font_size_ratio: f32, max_font_size: f32) -> Self {
        Self {
            rel_x,
            rel_y,
            font_size_ratio,
            max_font_size,
            weight: None,
            slant: None,
            align: Alignment::Center,
            family: None,
            width_ratio: None,
            opacity: 1.0,
            letter_spacing: 0.0,
            transform: TextTransform::None,
            stroke_width: None,
        }
    }

    const fn bold(self) -> Self {
        Self {
            weight: Some(FontWeight::Bold),
            ..self
        }
    }

    const fn regular(self) -> Self {
        Self {
            weight: Some(FontWeight::Normal),
            ..self
        }
    }

    const fn italic(self) -> Self {
        Self {
            slant: Some(FontSlant::Italic),
            ..self
        }
    }

    const fn upright(self) -> Self {
        Self {
            slant: Some(FontSlant::Normal),
            ..self
        }
    }

    const fn align(self, align: Alignment) -> Self {
        Self { align, ..self }
    }

    const fn family(self, family: &'static str) -> Self {
        Self {
            family: Some(family),
            ..self
        }
    }

    const fn width(self, ratio: f32) -> Self {
        Self {
            width_ratio: Some(ratio),
            ..self
        }
    }

    const fn opacity(self, opacity: f32) -> Self {
        Self { opacity, ..self }
    }

    const fn spacing(self, em: f32) -> Self {
        Self {
            letter_spacing: em,
            ..self
        }
    }

    const fn uppercase(self) -> Self {
        Self {
            transform: TextTransform::Uppercase,
            ..self
        }
    }

    const fn stroke(self, width: f32) -> Self {
        Self {
            stroke_width: Some(width),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub family: &'static str,
    /// Indexed by `FragmentKind::index`.
    pub slots: [TemplateSlot; 5],
}

/// Public listing entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub static TEMPLATES: [LayoutTemplate; 8] = [
    LayoutTemplate {
        id: "classic",
        name: "Classic",
        description: "Centered text in a traditional stack; suits most public-interest posters",
        family: r#"Arial, "Microsoft YaHei", sans-serif"#,
        slots: [
            TemplateSlot::at(0.5, 0.2, 0.08, 60.0).bold(),
            TemplateSlot::at(0.5, 0.35, 0.06, 45.0).bold(),
            TemplateSlot::at(0.5, 0.5, 0.04, 30.0).width(0.8),
            TemplateSlot::at(0.5, 0.65, 0.03, 24.0).width(0.7),
            TemplateSlot::at(0.5, 0.8, 0.025, 18.0).italic().width(0.7),
        ],
    },
    LayoutTemplate {
        id: "modern",
        name: "Modern left-aligned",
        description: "Left-aligned, clean contemporary layout",
        family: r#""Helvetica Neue", Arial, sans-serif"#,
        slots: [
            TemplateSlot::at(0.25, 0.2, 0.08, 60.0).bold().align(Left),
            TemplateSlot::at(0.25, 0.35, 0.06, 45.0).bold().align(Left),
            TemplateSlot::at(0.25, 0.5, 0.04, 30.0).align(Left).width(0.5),
            TemplateSlot::at(0.25, 0.65, 0.03, 24.0).align(Left).width(0.5),
            TemplateSlot::at(0.25, 0.8, 0.025, 18.0)
                .align(Left)
                .italic()
                .width(0.5),
        ],
    },
    LayoutTemplate {
        id: "minimalist",
        name: "Minimalist",
        description: "Spacious and bold; the title and slogan carry the poster",
        family: r#""Montserrat", "Segoe UI", sans-serif"#,
        slots: [
            TemplateSlot::at(0.5, 0.4, 0.1, 72.0).bold().spacing(0.05),
            TemplateSlot::at(0.5, 0.6, 0.07, 50.0).bold().spacing(0.03),
            TemplateSlot::at(0.5, 0.75, 0.035, 26.0).width(0.7).opacity(0.9),
            TemplateSlot::at(0.5, 0.85, 0.025, 18.0).width(0.6).opacity(0.8),
            TemplateSlot::at(0.5, 0.92, 0.02, 16.0)
                .italic()
                .width(0.5)
                .opacity(0.7),
        ],
    },
    LayoutTemplate {
        id: "dramatic",
        name: "Dramatic",
        description: "High contrast, heavy type and a theatrical feel",
        family: r#""Georgia", serif"#,
        slots: [
            TemplateSlot::at(0.5, 0.3, 0.09, 65.0)
                .bold()
                .family(r#""Impact", "Arial Black", sans-serif"#)
                .stroke(4.0)
                .uppercase(),
            TemplateSlot::at(0.5, 0.7, 0.07, 50.0)
                .bold()
                .family(r#""Impact", "Arial Black", sans-serif"#)
                .stroke(4.0)
                .spacing(0.02),
            TemplateSlot::at(0.5, 0.5, 0.045, 32.0).width(0.7).opacity(0.9),
            TemplateSlot::at(0.5, 0.6, 0.035, 26.0).width(0.7).opacity(0.8),
            TemplateSlot::at(0.5, 0.85, 0.025, 18.0)
                .italic()
                .width(0.6)
                .opacity(0.7),
        ],
    },
    LayoutTemplate {
        id: "split",
        name: "Split screen",
        description: "Title and slogan on the left, body copy on the right",
        family: r#""Roboto", "Noto Sans SC", sans-serif"#,
        slots: [
            TemplateSlot::at(0.25, 0.3, 0.08, 60.0).bold().align(Left),
            TemplateSlot::at(0.25, 0.45, 0.06, 45.0).bold().align(Left),
            TemplateSlot::at(0.75, 0.4, 0.04, 30.0).align(Right).width(0.4),
            TemplateSlot::at(0.75, 0.6, 0.03, 24.0).align(Right).width(0.4),
            TemplateSlot::at(0.75, 0.8, 0.025, 18.0)
                .align(Right)
                .italic()
                .width(0.4),
        ],
    },
    LayoutTemplate {
        id: "vertical",
        name: "Top and bottom",
        description: "Title at the top, the rest gathered in the lower half",
        family: r#""Playfair Display", "SimSun", serif"#,
        slots: [
            TemplateSlot::at(0.5, 0.15, 0.09, 65.0).bold(),
            TemplateSlot::at(0.5, 0.3, 0.07, 50.0).bold(),
            TemplateSlot::at(0.5, 0.55, 0.04, 30.0).width(0.7),
            TemplateSlot::at(0.5, 0.7, 0.03, 24.0).width(0.7),
            TemplateSlot::at(0.5, 0.85, 0.025, 18.0).italic().width(0.6),
        ],
    },
    LayoutTemplate {
        id: "diagonal",
        name: "Diagonal",
        description: "Text runs along the diagonal from top left to bottom right",
        family: r#""Ubuntu", "Hiragino Sans GB", sans-serif"#,
        slots: [
            TemplateSlot::at(0.2, 0.2, 0.08, 60.0).bold().align(Left),
            TemplateSlot::at(0.35, 0.35, 0.06, 45.0).bold().align(Left),
            TemplateSlot::at(0.5, 0.5, 0.04, 30.0).width(0.6),
            TemplateSlot::at(0.65, 0.65, 0.03, 24.0).align(Right).width(0.5),
            TemplateSlot::at(0.8, 0.8, 0.025, 18.0)
                .align(Right)
                .italic()
                .width(0.4),
        ],
    },
    LayoutTemplate {
        id: "formal",
        name: "Formal",
        description: "Orderly layout for official occasions",
        family: r#""Times New Roman", "SimSun", serif"#,
        slots: [
            TemplateSlot::at(0.5, 0.25, 0.07, 55.0).bold().spacing(0.03),
            TemplateSlot::at(0.5, 0.4, 0.05, 40.0).regular().italic(),
            TemplateSlot::at(0.5, 0.55, 0.035, 28.0).width(0.7),
            TemplateSlot::at(0.5, 0.7, 0.03, 22.0).width(0.6),
            TemplateSlot::at(0.5, 0.85, 0.025, 18.0).upright().width(0.6),
        ],
    },
];

/// Falls back to the classic template for unknown ids.
pub fn template_by_id(id: &str) -> &'static LayoutTemplate {
    TEMPLATES
        .iter()
        .find(|t| t.id == id)
        .unwrap_or(&TEMPLATES[0])
}

pub fn available_templates() -> Vec<TemplateInfo> {
    TEMPLATES
        .iter()
        .map(|t| TemplateInfo {
            id: t.id,
            name: t.name,
            description: t.description,
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Resolution
// ────────────────────────────────────────────────────────────────────────────

fn default_weight(kind: FragmentKind) -> FontWeight {
    match kind {
        FragmentKind::MainTitle | FragmentKind::Slogan => FontWeight::Bold,
        _ => FontWeight::Normal,
    }
}

fn default_width_ratio(kind: FragmentKind) -> f32 {
    match kind {
        FragmentKind::MainTitle => 0.8,
        FragmentKind::Slogan => 0.7,
        _ => 0.6,
    }
}

fn default_stroke(kind: FragmentKind) -> f32 {
    match kind {
        FragmentKind::MainTitle | FragmentKind::Slogan => 3.0,
        FragmentKind::MainText | FragmentKind::SubText => 2.0,
        FragmentKind::DataText => 1.0,
    }
}

fn default_slant(kind: FragmentKind) -> FontSlant {
    if kind == FragmentKind::DataText {
        FontSlant::Italic
    } else {
        FontSlant::Normal
    }
}

fn resolve_slot(
    template: &LayoutTemplate,
    kind: FragmentKind,
    width: f32,
    height: f32,
) -> FragmentSeed {
    let slot = &template.slots[kind.index()];
    let style = Style {
        font_size: (width * slot.font_size_ratio).min(slot.max_font_size),
        font_weight: slot.weight.unwrap_or_else(|| default_weight(kind)),
        font_style: slot.slant.unwrap_or_else(|| default_slant(kind)),
        font_family: slot.family.unwrap_or(template.family).to_string(),
        align: slot.align,
        stroke_width: slot.stroke_width.unwrap_or_else(|| default_stroke(kind)),
        fill: Color::WHITE,
        stroke: Color::BLACK.with_alpha(0.8),
        opacity: slot.opacity,
        letter_spacing: slot.letter_spacing,
        text_transform: slot.transform,
        max_width: width * slot.width_ratio.unwrap_or_else(|| default_width_ratio(kind)),
        shadow_blur: SHADOW_BLUR,
    };
    FragmentSeed {
        anchor: Anchor::new(width * slot.rel_x, height * slot.rel_y),
        style,
    }
}

/// Absolute anchors and styles for every fragment kind on a `width × height`
/// canvas.
pub fn resolve_template(template: &LayoutTemplate, width: f32, height: f32) -> SeedTable {
    FragmentKind::PRIORITY_ORDER.map(|kind| resolve_slot(template, kind, width, height))
}
