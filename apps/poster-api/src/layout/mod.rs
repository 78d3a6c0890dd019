// Poster text layout: seeds from a template or from image analysis, then the
// placement solver turns them into a render plan.
// Everything here is synchronous and CPU-bound; callers on the async side wrap
// `plan_poster` in tokio::task::spawn_blocking.

pub mod auto_layout;
pub mod brightness;
pub mod font_metrics;
pub mod geometry;
pub mod solver;
pub mod style;
pub mod templates;
pub mod wrap;

use image::RgbaImage;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::layout::auto_layout::auto_layout;
use crate::layout::brightness::analyze_image;
use crate::layout::font_metrics::{MeasureError, TextMeasure};
use crate::layout::solver::{place_all, PlacedFragment, SolverConfig};
use crate::layout::style::Fragments;
use crate::layout::templates::{resolve_template, template_by_id};

pub use templates::{available_templates, TemplateInfo, DEFAULT_TEMPLATE_ID};

/// Sentinel template id that selects analysis-driven layout.
pub const AUTO_TEMPLATE_ID: &str = "auto";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleSelection {
    Auto,
    /// Unknown ids resolve to the classic template.
    Template(String),
}

impl StyleSelection {
    /// Blank input selects `default`.
    pub fn parse(id: Option<&str>, default: &str) -> Self {
        let id = id.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(default);
        if id.eq_ignore_ascii_case(AUTO_TEMPLATE_ID) {
            StyleSelection::Auto
        } else {
            StyleSelection::Template(id.to_string())
        }
    }

    pub fn id(&self) -> &str {
        match self {
            StyleSelection::Auto => AUTO_TEMPLATE_ID,
            StyleSelection::Template(id) => template_by_id(id).id,
        }
    }
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("image has invalid dimensions {width}x{height}")]
    InvalidImage { width: u32, height: u32 },

    #[error(transparent)]
    Measure(#[from] MeasureError),
}

/// Final placements for one poster, ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPlan {
    pub width: u32,
    pub height: u32,
    /// Resolved template id, or `auto`.
    pub template: String,
    pub fragments: Vec<PlacedFragment>,
}

/// Lays out `fragments` over `image`. Fails only on a zero-sized image or a
/// measurement error; unplaceable text degrades instead of failing.
pub fn plan_poster(
    image: &RgbaImage,
    fragments: &Fragments,
    selection: &StyleSelection,
    measure: &dyn TextMeasure,
    config: &SolverConfig,
) -> Result<RenderPlan, ComposeError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ComposeError::InvalidImage { width, height });
    }
    let (w, h) = (width as f32, height as f32);

    let seeds = match selection {
        StyleSelection::Auto => auto_layout(&analyze_image(image), fragments, w, h),
        StyleSelection::Template(id) => resolve_template(template_by_id(id), w, h),
    };
    let placed = place_all(&seeds, fragments, w, h, measure, config)?;

    info!(
        width,
        height,
        template = selection.id(),
        placed = placed.len(),
        "poster planned"
    );

    Ok(RenderPlan {
        width,
        height,
        template: selection.id().to_string(),
        fragments: placed,
    })
}
