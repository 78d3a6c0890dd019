//! Fragment kinds, the fixed `Style` record, and the per-fragment seed the
//! template resolver or the auto-layout selector hands to the solver.

use serde::{Deserialize, Serialize};

use crate::layout::font_metrics::FontDescriptor;

// ────────────────────────────────────────────────────────────────────────────
// Fragments
// ────────────────────────────────────────────────────────────────────────────

/// One named piece of poster text. Declaration order is placement priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    MainTitle,
    Slogan,
    MainText,
    SubText,
    DataText,
}

/// How a fragment behaves under the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Single line, never wrapped, truncated when it cannot fit.
    Title,
    /// Single line, same treatment as `Title` with a smaller floor.
    Slogan,
    /// Multi-line body copy.
    Body,
    /// Small statistics callout: lenient bounds, tolerates slight overlap.
    Data,
}

impl FragmentKind {
    /// Highest priority first.
    pub const PRIORITY_ORDER: [FragmentKind; 5] = [
        FragmentKind::MainTitle,
        FragmentKind::Slogan,
        FragmentKind::MainText,
        FragmentKind::SubText,
        FragmentKind::DataText,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn role(self) -> Role {
        match self {
            FragmentKind::MainTitle => Role::Title,
            FragmentKind::Slogan => Role::Slogan,
            FragmentKind::MainText | FragmentKind::SubText => Role::Body,
            FragmentKind::DataText => Role::Data,
        }
    }
}

impl Role {
    pub fn is_single_line(self) -> bool {
        matches!(self, Role::Title | Role::Slogan)
    }
}

/// The Fragment → text mapping produced by the extractor or sent by a client.
///
/// Empty or whitespace-only values count as absent and are never placed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fragments {
    pub main_title: String,
    pub slogan: String,
    /// Art-direction hint from the copywriter. Carried along, never drawn.
    pub visual_metaphor: String,
    pub main_text: String,
    pub sub_text: String,
    pub data_text: String,
}

impl Fragments {
    pub fn get(&self, kind: FragmentKind) -> Option<&str> {
        let raw = match kind {
            FragmentKind::MainTitle => &self.main_title,
            FragmentKind::Slogan => &self.slogan,
            FragmentKind::MainText => &self.main_text,
            FragmentKind::SubText => &self.sub_text,
            FragmentKind::DataText => &self.data_text,
        };
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn is_empty(&self) -> bool {
        FragmentKind::PRIORITY_ORDER
            .iter()
            .all(|kind| self.get(*kind).is_none())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Style record
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSlant {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTransform {
    None,
    Uppercase,
    Lowercase,
}

impl TextTransform {
    pub fn apply(self, text: &str) -> String {
        match self {
            TextTransform::None => text.to_string(),
            TextTransform::Uppercase => text.to_uppercase(),
            TextTransform::Lowercase => text.to_lowercase(),
        }
    }
}

/// Straight (non-premultiplied) RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with alpha set from a 0..=1 fraction.
    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }

    pub fn is_light(self) -> bool {
        (u16::from(self.r) + u16::from(self.g) + u16::from(self.b)) / 3 > 127
    }
}

/// Everything needed to measure and draw one fragment.
///
/// The solver clones and mutates this while searching; the original copy is
/// kept aside so later fallback tiers can restart from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_style: FontSlant,
    pub font_family: String,
    pub align: Alignment,
    pub stroke_width: f32,
    pub fill: Color,
    pub stroke: Color,
    pub opacity: f32,
    /// Extra advance per character, in em.
    pub letter_spacing: f32,
    pub text_transform: TextTransform,
    /// Width budget in pixels.
    pub max_width: f32,
    pub shadow_blur: f32,
}

/// Blur radius of the legibility shadow every fragment is drawn with.
pub const SHADOW_BLUR: f32 = 3.0;
pub const SHADOW_OFFSET: f32 = 1.0;

impl Default for Style {
    fn default() -> Self {
        Self {
            font_size: 24.0,
            font_weight: FontWeight::Normal,
            font_style: FontSlant::Normal,
            font_family: "Arial, sans-serif".to_string(),
            align: Alignment::Center,
            stroke_width: 2.0,
            fill: Color::WHITE,
            stroke: Color::BLACK.with_alpha(0.8),
            opacity: 1.0,
            letter_spacing: 0.0,
            text_transform: TextTransform::None,
            max_width: f32::MAX,
            shadow_blur: SHADOW_BLUR,
        }
    }
}

impl Style {
    pub fn font(&self) -> FontDescriptor<'_> {
        FontDescriptor {
            size: self.font_size,
            weight: self.font_weight,
            slant: self.font_style,
            family: &self.font_family,
            letter_spacing: self.letter_spacing,
        }
    }

    /// Light text gets a dark halo and dark text a light one.
    pub fn shadow_color(&self) -> Color {
        if self.fill.is_light() {
            Color::BLACK.with_alpha(0.7)
        } else {
            Color::WHITE.with_alpha(0.7)
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Seeds
// ────────────────────────────────────────────────────────────────────────────

/// Pixel position. `x` is read according to the style's alignment; `y` is
/// always the vertical center of the text block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
}

impl Anchor {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Starting anchor and style for one fragment, before solving.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentSeed {
    pub anchor: Anchor,
    pub style: Style,
}

/// One seed per `FragmentKind`, indexed by `FragmentKind::index`.
pub type SeedTable = [FragmentSeed; 5];
