//! Synchronous decode → plan → draw → encode pipeline. Called from
//! `spawn_blocking` by the handlers.

use std::sync::Arc;

use ab_glyph::FontVec;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbaImage;

use crate::errors::AppError;
use crate::layout::font_metrics::{GlyphMetrics, TextMeasure};
use crate::layout::solver::SolverConfig;
use crate::layout::style::Fragments;
use crate::layout::{plan_poster, RenderPlan, StyleSelection};
use crate::render::{draw_debug_boxes, encode_png, render_plan, RasterSurface};

pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, AppError> {
    if bytes.is_empty() {
        return Err(AppError::Validation("image is empty".to_string()));
    }
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Accepts bare base64 or a `data:image/...;base64,` URL.
pub fn decode_base64_image(encoded: &str) -> Result<RgbaImage, AppError> {
    let payload = match encoded.trim().split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => encoded.trim(),
    };
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| AppError::Validation(format!("image is not valid base64: {e}")))?;
    decode_image(&bytes)
}

pub fn plan_only(
    image: &RgbaImage,
    fragments: &Fragments,
    selection: &StyleSelection,
    measure: &dyn TextMeasure,
    config: &SolverConfig,
) -> Result<RenderPlan, AppError> {
    Ok(plan_poster(image, fragments, selection, measure, config)?)
}

/// Lays out and draws the poster, returning PNG bytes. With `debug` set,
/// every accepted box is outlined.
pub fn render_poster(
    image: &RgbaImage,
    fragments: &Fragments,
    selection: &StyleSelection,
    font: Arc<FontVec>,
    config: &SolverConfig,
    debug: bool,
) -> Result<Vec<u8>, AppError> {
    let measure = GlyphMetrics::new(Arc::clone(&font));
    let plan = plan_poster(image, fragments, selection, &measure, config)?;

    let mut surface = RasterSurface::new(plan.width, plan.height, font);
    render_plan(&plan, image, &mut surface)?;
    let mut canvas = surface.into_image();
    if debug {
        draw_debug_boxes(&mut canvas, &plan);
    }
    Ok(encode_png(&canvas)?)
}
