use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};
use uuid::Uuid;

use crate::errors::AppError;
use crate::layout::style::Fragments;
use crate::layout::{available_templates, RenderPlan, StyleSelection, TemplateInfo};
use crate::poster::compose::{decode_base64_image, decode_image, plan_only, render_poster};
use crate::poster::extractor::{
    extract_fragments, format_copywriting, summarize, DEFAULT_SUMMARY_CHARS,
};
use crate::state::AppState;

#[derive(Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<TemplateInfo>,
    pub default_template: String,
}

#[derive(Deserialize)]
pub struct PlanRequest {
    /// Base64 image, optionally as a data URL.
    pub image: String,
    #[serde(default)]
    pub copywriting: Option<String>,
    /// Explicit fragments; non-empty fields override the parsed copywriting.
    #[serde(default)]
    pub fragments: Option<Fragments>,
    #[serde(default)]
    pub template: Option<String>,
}

#[derive(Serialize)]
pub struct PlanResponse {
    #[serde(flatten)]
    pub plan: RenderPlan,
    /// The fragments the plan was built from.
    pub source: Fragments,
    pub summary: String,
    pub formatted: String,
}

/// GET /api/v1/templates
pub async fn handle_list_templates(State(state): State<AppState>) -> Json<TemplateListResponse> {
    Json(TemplateListResponse {
        templates: available_templates(),
        default_template: state.config.default_template.clone(),
    })
}

/// POST /api/v1/posters
///
/// Multipart fields: `image` (file), `copywriting`, the individual fragment
/// fields (`main_title`, `slogan`, `visual_metaphor`, `main_text`,
/// `sub_text`, `data_text`), `template`, and `debug`.
pub async fn handle_compose_poster(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let font = state.font.clone().ok_or(AppError::FontUnavailable)?;
    let form = ComposeForm::read(multipart).await?;

    let image_bytes = form
        .image
        .ok_or_else(|| AppError::Validation("missing 'image' field".to_string()))?;
    let fragments = resolve_fragments(form.copywriting.as_deref(), &form.fragments)?;
    let selection =
        StyleSelection::parse(form.template.as_deref(), &state.config.default_template);
    let solver = state.solver;
    let debug = form.debug;

    let span = info_span!("compose_poster", request_id = %Uuid::new_v4());
    let png = tokio::task::spawn_blocking(move || {
        let _enter = span.enter();
        let image = decode_image(&image_bytes)?;
        let png = render_poster(&image, &fragments, &selection, font, &solver, debug)?;
        info!(bytes = png.len(), template = selection.id(), "poster rendered");
        Ok::<_, AppError>(png)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow!("compose task failed: {e}")))??;

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

/// POST /api/v1/posters/plan
pub async fn handle_plan_poster(
    State(state): State<AppState>,
    Json(req): Json<PlanRequest>,
) -> Result<Json<PlanResponse>, AppError> {
    let overrides = req.fragments.unwrap_or_default();
    let fragments = resolve_fragments(req.copywriting.as_deref(), &overrides)?;
    let selection = StyleSelection::parse(req.template.as_deref(), &state.config.default_template);
    let measure = Arc::clone(&state.measure);
    let solver = state.solver;
    let encoded = req.image;

    let span = info_span!("plan_poster", request_id = %Uuid::new_v4());
    let response = tokio::task::spawn_blocking(move || {
        let _enter = span.enter();
        let image = decode_base64_image(&encoded)?;
        let plan = plan_only(&image, &fragments, &selection, measure.as_ref(), &solver)?;
        Ok::<_, AppError>(PlanResponse {
            plan,
            summary: summarize(&fragments, DEFAULT_SUMMARY_CHARS),
            formatted: format_copywriting(&fragments),
            source: fragments,
        })
    })
    .await
    .map_err(|e| AppError::Internal(anyhow!("plan task failed: {e}")))??;

    Ok(Json(response))
}

// ────────────────────────────────────────────────────────────────────────────
// Request helpers
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct ComposeForm {
    image: Option<Bytes>,
    copywriting: Option<String>,
    fragments: Fragments,
    template: Option<String>,
    debug: bool,
}

impl ComposeForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = ComposeForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("malformed multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("could not read image: {e}")))?;
                form.image = Some(data);
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("could not read field '{name}': {e}")))?;
            match name.as_str() {
                "copywriting" => form.copywriting = Some(value),
                "template" => form.template = Some(value),
                "debug" => form.debug = matches!(value.trim(), "1" | "true" | "yes"),
                "main_title" => form.fragments.main_title = value,
                "slogan" => form.fragments.slogan = value,
                "visual_metaphor" => form.fragments.visual_metaphor = value,
                "main_text" => form.fragments.main_text = value,
                "sub_text" => form.fragments.sub_text = value,
                "data_text" => form.fragments.data_text = value,
                _ => {}
            }
        }
        Ok(form)
    }
}

/// Parses `copywriting`, then lets every non-blank explicit field win.
/// Rejects requests that end up with nothing to draw.
fn resolve_fragments(copywriting: Option<&str>, explicit: &Fragments) -> Result<Fragments, AppError> {
    let mut fragments = copywriting.map(extract_fragments).unwrap_or_default();

    let pairs = [
        (&mut fragments.main_title, &explicit.main_title),
        (&mut fragments.slogan, &explicit.slogan),
        (&mut fragments.visual_metaphor, &explicit.visual_metaphor),
        (&mut fragments.main_text, &explicit.main_text),
        (&mut fragments.sub_text, &explicit.sub_text),
        (&mut fragments.data_text, &explicit.data_text),
    ];
    for (slot, value) in pairs {
        if !value.trim().is_empty() {
            *slot = value.trim().to_string();
        }
    }

    if fragments.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "no poster text found in 'copywriting' or fragment fields".to_string(),
        ));
    }
    Ok(fragments)
}
