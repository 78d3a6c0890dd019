use std::sync::Arc;

use ab_glyph::FontVec;

use crate::config::Config;
use crate::layout::font_metrics::{GlyphMetrics, StaticMetrics, TextMeasure};
use crate::layout::solver::SolverConfig;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Rendering font. `None` disables PNG output; planning still works.
    pub font: Option<Arc<FontVec>>,
    /// Glyph advances of `font` when loaded, static tables otherwise, so
    /// planned widths match what gets drawn.
    pub measure: Arc<dyn TextMeasure>,
    pub solver: SolverConfig,
}

impl AppState {
    pub fn new(config: Config, font: Option<FontVec>) -> Self {
        let font = font.map(Arc::new);
        let measure: Arc<dyn TextMeasure> = match &font {
            Some(font) => Arc::new(GlyphMetrics::new(Arc::clone(font))),
            None => Arc::new(StaticMetrics),
        };
        Self {
            solver: config.solver_config(),
            config,
            font,
            measure,
        }
    }
}
