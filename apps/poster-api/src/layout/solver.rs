//! Placement solver: turns per-fragment seeds into accepted, in-bounds,
//! non-overlapping text blocks.
//!
//! # Architecture
//! - `PlacementRun` owns the accepted-box list for one composition. Fragments
//!   are placed strictly in priority order; an accepted box is never revisited.
//! - Each fragment is first *adjusted* by its role rules, then validated. When
//!   that fails, the fallback tiers run in order, each a pure function of the
//!   run context and the adjusted state:
//!   `DirectionalSearch → ForceCenter → FontShrink → Rewrap → Truncate`.
//! - `terminal_clamp` always produces a state. Its box is accepted even though
//!   it may break the bounds or overlap rules.
//!
//! Every state carries its measured extent, so moving a block never
//! re-measures text.

use serde::Serialize;
use tracing::{debug, warn};

use crate::layout::font_metrics::{MeasureError, TextMeasure};
use crate::layout::geometry::{
    bounding_box_of, box_at, overlaps, safety_margin, text_extent, within_bounds, BoundingBox,
    BoundsPolicy, TextExtent,
};
use crate::layout::style::{
    Alignment, Anchor, FragmentKind, FragmentSeed, Fragments, Role, SeedTable, Style,
};
use crate::layout::wrap::{ellipsize_prefix, truncate_to_width, wrap_text};

// ────────────────────────────────────────────────────────────────────────────
// Tuning
// ────────────────────────────────────────────────────────────────────────────

/// Search radii in pixels, tried outermost loop.
const STEP_LADDER: [f32; 10] = [
    20.0, 40.0, 60.0, 80.0, 100.0, 140.0, 180.0, 240.0, 300.0, 400.0,
];
const SHRINK_FACTORS: [f32; 5] = [0.8, 0.7, 0.6, 0.5, 0.4];
const SMALLEST_SHRINK: f32 = 0.4;
const REWRAP_FRACTIONS: [f32; 2] = [0.75, 0.5];
const TRUNCATE_FRACTIONS: [f32; 3] = [0.75, 0.5, 0.25];

/// Blocks wider than this fraction of the canvas skip the search and get
/// centered instead.
const WIDE_BLOCK_FRACTION: f32 = 0.8;
/// Hard cap on every width budget, as a fraction of the canvas width.
const MAX_WIDTH_FRACTION: f32 = 0.9;
/// Above this many characters, shrinking the font also shrinks the budget.
const LONG_TEXT_CHARS: usize = 30;
const DATA_MIN_SIZE: f32 = 10.0;
const DATA_MAX_SIZE: f32 = 18.0;
const TITLE_TERMINAL_SCALE: f32 = 0.5;
const BODY_TERMINAL_SCALE: f32 = 0.4;
const WIDTH_EPSILON: f32 = 0.01;

struct RoleRules {
    floor: f32,
    ceiling: Option<f32>,
    /// Characters past which the size shrinks by `threshold / len`.
    shrink_past: Option<usize>,
}

fn role_rules(role: Role) -> RoleRules {
    match role {
        Role::Title => RoleRules {
            floor: 20.0,
            ceiling: None,
            shrink_past: Some(12),
        },
        Role::Slogan => RoleRules {
            floor: 16.0,
            ceiling: None,
            shrink_past: Some(16),
        },
        Role::Body => RoleRules {
            floor: 12.0,
            ceiling: None,
            shrink_past: None,
        },
        Role::Data => RoleRules {
            floor: DATA_MIN_SIZE,
            ceiling: Some(DATA_MAX_SIZE),
            shrink_past: None,
        },
    }
}

const N: (f32, f32) = (0.0, -1.0);
const S: (f32, f32) = (0.0, 1.0);
const E: (f32, f32) = (1.0, 0.0);
const W: (f32, f32) = (-1.0, 0.0);
const NE: (f32, f32) = (1.0, -1.0);
const NW: (f32, f32) = (-1.0, -1.0);
const SE: (f32, f32) = (1.0, 1.0);
const SW: (f32, f32) = (-1.0, 1.0);

fn directions(role: Role) -> &'static [(f32, f32); 8] {
    match role {
        Role::Title | Role::Slogan => &[N, NE, NW, E, W, S, SE, SW],
        Role::Data => &[S, SE, SW, E, W, N, NE, NW],
        Role::Body => &[N, S, NE, SE, NW, SW, E, W],
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Summed overflow per axis allowed for data text, as a fraction of its box.
    pub lenient_overflow: f32,
    /// Pixels of overlap data text may have with earlier boxes.
    pub data_overlap_tolerance: f32,
    /// Validate data text with strict bounds too.
    pub strict_data_bounds: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            lenient_overflow: 0.2,
            data_overlap_tolerance: 4.0,
            strict_data_bounds: false,
        }
    }
}

/// Which step of the chain produced a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementTier {
    Initial,
    DirectionalSearch,
    ForceCenter,
    FontShrink,
    Rewrap,
    Truncate,
    TerminalClamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedFragment {
    pub kind: FragmentKind,
    /// Wrapped or truncated text, top to bottom.
    pub lines: Vec<String>,
    pub anchor: Anchor,
    pub style: Style,
    /// Accepted box including the safety margin.
    pub bounds: BoundingBox,
    pub tier: PlacementTier,
}

/// A candidate layout of one fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentState {
    pub lines: Vec<String>,
    pub anchor: Anchor,
    pub style: Style,
    pub extent: TextExtent,
}

impl FragmentState {
    fn measured(
        lines: Vec<String>,
        anchor: Anchor,
        style: Style,
        measure: &dyn TextMeasure,
    ) -> Result<Self, MeasureError> {
        let extent = text_extent(&lines, &style, measure)?;
        Ok(Self {
            lines,
            anchor,
            style,
            extent,
        })
    }

    pub fn bounds(&self) -> BoundingBox {
        box_at(self.extent, self.anchor, &self.style)
    }

    fn moved(&self, anchor: Anchor) -> Self {
        Self {
            anchor,
            ..self.clone()
        }
    }
}

/// Everything a tier may read while placing one fragment.
pub struct RunContext<'a> {
    pub kind: FragmentKind,
    /// Text after the style's transform.
    pub text: &'a str,
    /// The adjusted state every tier restarts from.
    pub original: &'a FragmentState,
    pub width: f32,
    pub height: f32,
    pub accepted: &'a [BoundingBox],
    pub measure: &'a dyn TextMeasure,
    pub config: &'a SolverConfig,
}

type TierFn = fn(&RunContext<'_>, &FragmentState) -> Result<Option<FragmentState>, MeasureError>;

const FALLBACK_TIERS: [(PlacementTier, TierFn); 5] = [
    (PlacementTier::DirectionalSearch, directional_search),
    (PlacementTier::ForceCenter, force_center),
    (PlacementTier::FontShrink, font_shrink),
    (PlacementTier::Rewrap, rewrap),
    (PlacementTier::Truncate, truncate),
];

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

impl RunContext<'_> {
    fn role(&self) -> Role {
        self.kind.role()
    }

    fn policy(&self) -> BoundsPolicy {
        if self.role() == Role::Data && !self.config.strict_data_bounds {
            BoundsPolicy::Lenient {
                max_overflow: self.config.lenient_overflow,
            }
        } else {
            BoundsPolicy::Strict
        }
    }

    fn tolerance(&self) -> f32 {
        if self.role() == Role::Data {
            self.config.data_overlap_tolerance
        } else {
            0.0
        }
    }

    fn lines_fit(&self, state: &FragmentState) -> bool {
        state.extent.width <= state.style.max_width + WIDTH_EPSILON
    }

    fn fits_at(&self, state: &FragmentState, anchor: Anchor) -> bool {
        let b = box_at(state.extent, anchor, &state.style);
        within_bounds(&b, self.width, self.height, self.policy())
            && !self
                .accepted
                .iter()
                .any(|other| overlaps(&b, other, self.tolerance()))
    }

    pub fn is_valid(&self, state: &FragmentState) -> bool {
        self.lines_fit(state) && self.fits_at(state, state.anchor)
    }

    fn search(&self, state: &FragmentState) -> Option<FragmentState> {
        if state.extent.width > WIDE_BLOCK_FRACTION * self.width || !self.lines_fit(state) {
            return None;
        }
        for step in STEP_LADDER {
            for (dx, dy) in directions(self.role()) {
                let anchor = state.anchor.offset(dx * step, dy * step);
                if self.fits_at(state, anchor) {
                    return Some(state.moved(anchor));
                }
            }
        }
        None
    }

    /// Valid where it stands, else the first valid searched position.
    fn settle(&self, candidate: FragmentState) -> Option<FragmentState> {
        if self.is_valid(&candidate) {
            Some(candidate)
        } else {
            self.search(&candidate)
        }
    }

    /// Rebuilds the text at a new size and budget, at the original anchor.
    /// Single-line roles are truncated only when they overflow.
    fn lay_out(&self, size: f32, max_width: f32) -> Result<FragmentState, MeasureError> {
        let style = Style {
            font_size: size,
            max_width,
            ..self.original.style.clone()
        };
        let lines = if self.role().is_single_line() {
            vec![truncate_to_width(
                self.text,
                max_width,
                &style.font(),
                self.measure,
            )?]
        } else {
            wrap_text(self.text, max_width, self.kind, &style.font(), self.measure)?
        };
        FragmentState::measured(lines, self.original.anchor, style, self.measure)
    }

    /// Multi-line text cut to a fraction of its lines, ellipsis on the last.
    fn truncated_block(&self, size: f32, fraction: f32) -> Result<FragmentState, MeasureError> {
        let full = self.lay_out(size, self.original.style.max_width)?;
        let font = full.style.font();
        let lines = if full.lines.len() > 1 {
            let keep = ((full.lines.len() as f32 * fraction).floor() as usize).max(1);
            ellipsize_prefix(&full.lines, keep, full.style.max_width, &font, self.measure)?
        } else {
            let budget = full.style.max_width * fraction;
            vec![truncate_to_width(self.text, budget, &font, self.measure)?]
        };
        FragmentState::measured(lines, full.anchor, full.style.clone(), self.measure)
    }

    fn solve(&self) -> Result<(FragmentState, PlacementTier), MeasureError> {
        if self.is_valid(self.original) {
            return Ok((self.original.clone(), PlacementTier::Initial));
        }
        for (tier, apply) in FALLBACK_TIERS {
            if let Some(state) = apply(self, self.original)? {
                return Ok((state, tier));
            }
        }
        Ok((terminal_clamp(self)?, PlacementTier::TerminalClamp))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tiers
// ────────────────────────────────────────────────────────────────────────────

/// Eight compass directions over the step ladder, role-biased ordering.
pub fn directional_search(
    ctx: &RunContext<'_>,
    state: &FragmentState,
) -> Result<Option<FragmentState>, MeasureError> {
    Ok(ctx.search(state))
}

/// Anchor x that centers a block of `width` on `center_x` under `align`.
fn centered_anchor_x(center_x: f32, width: f32, align: Alignment) -> f32 {
    match align {
        Alignment::Left => center_x - width / 2.0,
        Alignment::Center => center_x,
        Alignment::Right => center_x + width / 2.0,
    }
}

/// Only for blocks wider than 80 % of the canvas: data text goes to the
/// bottom center, everything else to the middle.
pub fn force_center(
    ctx: &RunContext<'_>,
    state: &FragmentState,
) -> Result<Option<FragmentState>, MeasureError> {
    if state.extent.width <= WIDE_BLOCK_FRACTION * ctx.width {
        return Ok(None);
    }
    let x = centered_anchor_x(ctx.width / 2.0, state.extent.width, state.style.align);
    let y = if ctx.role() == Role::Data {
        ctx.height - state.extent.height / 2.0 - safety_margin(&state.style)
    } else {
        ctx.height / 2.0
    };
    let candidate = state.moved(Anchor::new(x, y));
    Ok(ctx.is_valid(&candidate).then_some(candidate))
}

pub fn font_shrink(
    ctx: &RunContext<'_>,
    _state: &FragmentState,
) -> Result<Option<FragmentState>, MeasureError> {
    let original = &ctx.original.style;
    let long = ctx.text.chars().count() > LONG_TEXT_CHARS;
    for factor in SHRINK_FACTORS {
        let max_width = if long {
            original.max_width * factor
        } else {
            original.max_width
        };
        let candidate = ctx.lay_out(original.font_size * factor, max_width)?;
        if let Some(state) = ctx.settle(candidate) {
            return Ok(Some(state));
        }
    }
    Ok(None)
}

/// Narrower budgets at the smallest shrink size. Multi-line roles only.
pub fn rewrap(
    ctx: &RunContext<'_>,
    _state: &FragmentState,
) -> Result<Option<FragmentState>, MeasureError> {
    if ctx.role().is_single_line() {
        return Ok(None);
    }
    let original = &ctx.original.style;
    let size = original.font_size * SMALLEST_SHRINK;
    for fraction in REWRAP_FRACTIONS {
        let candidate = ctx.lay_out(size, original.max_width * fraction)?;
        if let Some(state) = ctx.settle(candidate) {
            return Ok(Some(state));
        }
    }
    Ok(None)
}

pub fn truncate(
    ctx: &RunContext<'_>,
    _state: &FragmentState,
) -> Result<Option<FragmentState>, MeasureError> {
    let original = &ctx.original.style;
    let size = original.font_size * SMALLEST_SHRINK;
    for fraction in TRUNCATE_FRACTIONS {
        let candidate = if ctx.role().is_single_line() {
            ctx.lay_out(size, original.max_width * fraction)?
        } else {
            ctx.truncated_block(size, fraction)?
        };
        if let Some(state) = ctx.settle(candidate) {
            return Ok(Some(state));
        }
    }
    Ok(None)
}

/// Moves a block so its box sits on the bottom edge and inside the canvas
/// horizontally (left edge wins when the box is wider than the canvas).
fn clamp_to_bottom(ctx: &RunContext<'_>, state: FragmentState) -> FragmentState {
    let b = state.bounds();
    let dy = ctx.height - b.bottom;
    let mut dx = (ctx.width - b.right).min(0.0);
    if b.left + dx < 0.0 {
        dx = -b.left;
    }
    let anchor = state.anchor.offset(dx, dy);
    FragmentState { anchor, ..state }
}

/// Last resort. Always yields a drawable state.
pub fn terminal_clamp(ctx: &RunContext<'_>) -> Result<FragmentState, MeasureError> {
    let original = &ctx.original.style;
    let state = match ctx.role() {
        Role::Data => {
            let style = Style {
                font_size: DATA_MIN_SIZE,
                ..original.clone()
            };
            let line = truncate_to_width(ctx.text, style.max_width, &style.font(), ctx.measure)?;
            let single =
                FragmentState::measured(vec![line], ctx.original.anchor, style, ctx.measure)?;
            clamp_to_bottom(ctx, single)
        }
        Role::Title | Role::Slogan => ctx.lay_out(
            original.font_size * TITLE_TERMINAL_SCALE,
            original.max_width,
        )?,
        Role::Body => ctx.lay_out(original.font_size * BODY_TERMINAL_SCALE, original.max_width)?,
    };
    warn!(
        kind = ?ctx.kind,
        font_size = state.style.font_size,
        "placement exhausted, using terminal clamp"
    );
    Ok(state)
}

// ────────────────────────────────────────────────────────────────────────────
// Adjust
// ────────────────────────────────────────────────────────────────────────────

/// Steps a single line down toward `floor` until it fits its budget. Jumps to
/// the proportional estimate first, then walks 1 px at a time.
fn fit_single_line(
    text: &str,
    style: &mut Style,
    floor: f32,
    measure: &dyn TextMeasure,
) -> Result<(), MeasureError> {
    let width = measure.measure(text, &style.font())?;
    if width <= style.max_width || style.font_size <= floor {
        return Ok(());
    }
    let estimate = (style.font_size * style.max_width / width).floor();
    style.font_size = estimate.clamp(floor, style.font_size);
    while style.font_size > floor && measure.measure(text, &style.font())? > style.max_width {
        style.font_size = (style.font_size - 1.0).max(floor);
    }
    Ok(())
}

/// Role rules applied to a seed: size floor/ceiling, long-text shrink, width
/// cap, and the data role's lower-third bias.
pub fn adjust(
    kind: FragmentKind,
    text: &str,
    seed: &FragmentSeed,
    width: f32,
    height: f32,
    measure: &dyn TextMeasure,
) -> Result<FragmentState, MeasureError> {
    let role = kind.role();
    let rules = role_rules(role);
    let mut style = seed.style.clone();
    let mut anchor = seed.anchor;

    style.max_width = style.max_width.min(MAX_WIDTH_FRACTION * width);

    let len = text.chars().count();
    if let Some(threshold) = rules.shrink_past {
        if len > threshold {
            style.font_size *= threshold as f32 / len as f32;
        }
    }
    if let Some(ceiling) = rules.ceiling {
        style.font_size = style.font_size.min(ceiling);
    }
    style.font_size = style.font_size.max(rules.floor);

    if role == Role::Data {
        anchor.y = anchor.y.max(height * 2.0 / 3.0);
    }

    let lines = if role.is_single_line() {
        fit_single_line(text, &mut style, rules.floor, measure)?;
        vec![text.to_string()]
    } else {
        wrap_text(text, style.max_width, kind, &style.font(), measure)?
    };
    FragmentState::measured(lines, anchor, style, measure)
}

// ────────────────────────────────────────────────────────────────────────────
// Run
// ────────────────────────────────────────────────────────────────────────────

/// One composition's placement state. Created per call, consumed by `finish`.
pub struct PlacementRun<'a> {
    width: f32,
    height: f32,
    measure: &'a dyn TextMeasure,
    config: &'a SolverConfig,
    accepted: Vec<BoundingBox>,
    placed: Vec<PlacedFragment>,
}

impl<'a> PlacementRun<'a> {
    pub fn new(
        width: f32,
        height: f32,
        measure: &'a dyn TextMeasure,
        config: &'a SolverConfig,
    ) -> Self {
        Self {
            width,
            height,
            measure,
            config,
            accepted: Vec::new(),
            placed: Vec::new(),
        }
    }

    /// Places one fragment against everything accepted so far. Empty or
    /// whitespace-only text is skipped and returns `None`.
    pub fn place(
        &mut self,
        kind: FragmentKind,
        text: &str,
        seed: &FragmentSeed,
    ) -> Result<Option<&PlacedFragment>, MeasureError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let text = seed.style.text_transform.apply(text);
        let original = adjust(kind, &text, seed, self.width, self.height, self.measure)?;

        let ctx = RunContext {
            kind,
            text: &text,
            original: &original,
            width: self.width,
            height: self.height,
            accepted: &self.accepted,
            measure: self.measure,
            config: self.config,
        };
        let (state, tier) = ctx.solve()?;

        // recorded from the final lines, whichever tier rebuilt them
        let bounds = bounding_box_of(&state.lines, state.anchor, &state.style, self.measure)?;
        debug!(kind = ?kind, tier = ?tier, lines = state.lines.len(), "fragment placed");
        self.accepted.push(bounds);
        self.placed.push(PlacedFragment {
            kind,
            lines: state.lines,
            anchor: state.anchor,
            style: state.style,
            bounds,
            tier,
        });
        Ok(self.placed.last())
    }

    #[cfg(test)]
    pub fn accepted(&self) -> &[BoundingBox] {
        &self.accepted
    }

    pub fn finish(self) -> Vec<PlacedFragment> {
        self.placed
    }
}

/// Places every present fragment in priority order.
pub fn place_all(
    seeds: &SeedTable,
    fragments: &Fragments,
    width: f32,
    height: f32,
    measure: &dyn TextMeasure,
    config: &SolverConfig,
) -> Result<Vec<PlacedFragment>, MeasureError> {
    let mut run = PlacementRun::new(width, height, measure, config);
    for kind in FragmentKind::PRIORITY_ORDER {
        if let Some(text) = fragments.get(kind) {
            run.place(kind, text, &seeds[kind.index()])?;
        }
    }
    Ok(run.finish())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::font_metrics::StaticMetrics;
    use crate::layout::templates::{resolve_template, template_by_id};
    use crate::layout::wrap::ELLIPSIS;
    use proptest::prelude::*;

    fn classic(width: f32, height: f32) -> SeedTable {
        resolve_template(template_by_id("classic"), width, height)
    }

    fn inside(b: &BoundingBox, width: f32, height: f32) -> bool {
        within_bounds(b, width, height, BoundsPolicy::Strict)
    }

    #[test]
    fn test_single_title_stays_at_template_anchor() {
        let fragments = Fragments {
            main_title: "Hello".to_string(),
            ..Default::default()
        };
        let config = SolverConfig::default();
        let placed = place_all(
            &classic(800.0, 600.0),
            &fragments,
            800.0,
            600.0,
            &StaticMetrics,
            &config,
        )
        .unwrap();
        assert_eq!(placed.len(), 1);
        let title = &placed[0];
        assert_eq!(title.tier, PlacementTier::Initial);
        assert!((title.anchor.x - 400.0).abs() < 1e-3);
        assert!((title.anchor.y - 120.0).abs() < 1e-3);
        assert!(inside(&title.bounds, 800.0, 600.0));
    }

    #[test]
    fn test_coinciding_anchors_are_separated() {
        let mut seeds = classic(800.0, 600.0);
        seeds[FragmentKind::Slogan.index()].anchor = seeds[FragmentKind::MainTitle.index()].anchor;
        let fragments = Fragments {
            main_title: "Hello".to_string(),
            slogan: "Act now".to_string(),
            ..Default::default()
        };
        let config = SolverConfig::default();

        let mut run = PlacementRun::new(800.0, 600.0, &StaticMetrics, &config);
        run.place(
            FragmentKind::MainTitle,
            "Hello",
            &seeds[FragmentKind::MainTitle.index()],
        )
        .unwrap();
        let title_box = run.accepted()[0];

        let slogan_seed = &seeds[FragmentKind::Slogan.index()];
        let initial = adjust(
            FragmentKind::Slogan,
            &fragments.slogan,
            slogan_seed,
            800.0,
            600.0,
            &StaticMetrics,
        )
        .unwrap()
        .bounds();

        let slogan = run
            .place(FragmentKind::Slogan, &fragments.slogan, slogan_seed)
            .unwrap()
            .unwrap()
            .clone();
        assert_ne!(slogan.bounds, initial);
        assert!(!overlaps(&slogan.bounds, &title_box, 0.0));
        assert_eq!(run.accepted()[0], title_box);
        assert_ne!(slogan.tier, PlacementTier::TerminalClamp);
    }

    #[test]
    fn test_long_cjk_data_text_wraps_within_budget() {
        let text = "海洋塑料污染".repeat(10);
        assert_eq!(text.chars().count(), 60);
        let fragments = Fragments {
            data_text: text,
            ..Default::default()
        };
        let config = SolverConfig::default();
        let placed = place_all(
            &classic(400.0, 600.0),
            &fragments,
            400.0,
            600.0,
            &StaticMetrics,
            &config,
        )
        .unwrap();
        let data = &placed[0];
        assert_ne!(data.tier, PlacementTier::TerminalClamp);
        assert!(data.lines.len() >= 2);
        for line in &data.lines {
            let w = StaticMetrics.measure(line.trim_end(), &data.style.font()).unwrap();
            assert!(w <= data.style.max_width + WIDTH_EPSILON);
        }
        assert!(data.anchor.y >= 400.0);
    }

    #[test]
    fn test_overlong_slogan_is_truncated_with_ellipsis() {
        let mut seeds = classic(800.0, 600.0);
        seeds[FragmentKind::Slogan.index()].style.max_width = 300.0;
        let fragments = Fragments {
            slogan: "ab".repeat(100),
            ..Default::default()
        };
        let config = SolverConfig::default();
        let placed =
            place_all(&seeds, &fragments, 800.0, 600.0, &StaticMetrics, &config).unwrap();
        let slogan = &placed[0];
        assert_eq!(slogan.lines.len(), 1);
        assert!(slogan.lines[0].ends_with(ELLIPSIS));
        let w = StaticMetrics
            .measure(&slogan.lines[0], &slogan.style.font())
            .unwrap();
        assert!(w <= 300.0, "measured {w}");
    }

    #[test]
    fn test_absent_fragments_leave_no_trace() {
        let fragments = Fragments {
            main_title: "Hello".to_string(),
            slogan: "   ".to_string(),
            ..Default::default()
        };
        let config = SolverConfig::default();
        let seeds = classic(800.0, 600.0);
        let mut run = PlacementRun::new(800.0, 600.0, &StaticMetrics, &config);
        assert!(run
            .place(FragmentKind::Slogan, &fragments.slogan, &seeds[1])
            .unwrap()
            .is_none());
        assert!(run.accepted().is_empty());
        let placed = place_all(&seeds, &fragments, 800.0, 600.0, &StaticMetrics, &config).unwrap();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].kind, FragmentKind::MainTitle);
    }

    #[test]
    fn test_adjust_role_rules() {
        let seeds = classic(800.0, 600.0);
        // 24 chars: 60 × 12 / 24 = 30
        let title = adjust(
            FragmentKind::MainTitle,
            "abcdefghijklmnopqrstuvwx",
            &seeds[0],
            800.0,
            600.0,
            &StaticMetrics,
        )
        .unwrap();
        assert!((title.style.font_size - 30.0).abs() < 1e-3);

        let tiny = classic(100.0, 100.0);
        let body = adjust(FragmentKind::MainText, "hi", &tiny[2], 100.0, 100.0, &StaticMetrics)
            .unwrap();
        assert_eq!(body.style.font_size, 12.0);
        assert!(body.style.max_width <= 90.0);

        let mut data_seed = seeds[4].clone();
        data_seed.style.font_size = 40.0;
        data_seed.anchor.y = 10.0;
        let data = adjust(FragmentKind::DataText, "70%", &data_seed, 800.0, 600.0, &StaticMetrics)
            .unwrap();
        assert_eq!(data.style.font_size, DATA_MAX_SIZE);
        assert!((data.anchor.y - 400.0).abs() < 1e-3);
    }

    #[test]
    fn test_single_line_steps_down_to_fit() {
        let mut seeds = classic(800.0, 600.0);
        seeds[0].style.max_width = 200.0;
        let state = adjust(
            FragmentKind::MainTitle,
            "Protect oceans",
            &seeds[0],
            800.0,
            600.0,
            &StaticMetrics,
        )
        .unwrap();
        assert!(state.extent.width <= 200.0);
        assert!(state.style.font_size >= 20.0);
        assert_eq!(state.lines, vec!["Protect oceans".to_string()]);
    }

    #[test]
    fn test_force_center_only_for_wide_blocks() {
        let seeds = classic(800.0, 600.0);
        let config = SolverConfig::default();
        let original = adjust(
            FragmentKind::MainText,
            "Hello",
            &seeds[2],
            800.0,
            600.0,
            &StaticMetrics,
        )
        .unwrap();
        let ctx = RunContext {
            kind: FragmentKind::MainText,
            text: "Hello",
            original: &original,
            width: 800.0,
            height: 600.0,
            accepted: &[],
            measure: &StaticMetrics,
            config: &config,
        };
        assert_eq!(force_center(&ctx, &original).unwrap(), None);

        let wide = FragmentState {
            extent: TextExtent {
                width: 700.0,
                height: 30.0,
            },
            style: Style {
                max_width: 720.0,
                ..original.style.clone()
            },
            anchor: Anchor::new(100.0, 100.0),
            ..original.clone()
        };
        let centered = force_center(&ctx, &wide).unwrap().unwrap();
        assert_eq!(centered.anchor, Anchor::new(400.0, 300.0));
    }

    #[test]
    fn test_directional_search_prefers_north_for_titles() {
        let config = SolverConfig::default();
        let seeds = classic(800.0, 600.0);
        let original = adjust(
            FragmentKind::MainTitle,
            "Hi",
            &seeds[0],
            800.0,
            600.0,
            &StaticMetrics,
        )
        .unwrap();
        // Move the state well below the top so north is feasible.
        let low = original.moved(Anchor::new(400.0, 400.0));
        let accepted = [box_at(low.extent, low.anchor, &low.style)];
        let ctx = RunContext {
            kind: FragmentKind::MainTitle,
            text: "Hi",
            original: &low,
            width: 800.0,
            height: 600.0,
            accepted: &accepted,
            measure: &StaticMetrics,
            config: &config,
        };
        let found = directional_search(&ctx, &low).unwrap().unwrap();
        assert_eq!(found.anchor.x, 400.0);
        assert!(found.anchor.y < 400.0);
        assert!(!overlaps(&found.bounds(), &accepted[0], 0.0));
    }

    #[test]
    fn test_tiny_canvas_terminates_with_terminal_clamp() {
        let fragments = Fragments {
            main_title: "Title".to_string(),
            slogan: "Slogan".to_string(),
            main_text: "Main body text".to_string(),
            sub_text: "Sub".to_string(),
            data_text: "42%".to_string(),
            ..Default::default()
        };
        let config = SolverConfig::default();
        let placed =
            place_all(&classic(1.0, 1.0), &fragments, 1.0, 1.0, &StaticMetrics, &config).unwrap();
        assert_eq!(placed.len(), 5);
        assert!(placed
            .iter()
            .all(|p| p.tier == PlacementTier::TerminalClamp));
        let data = &placed[4];
        assert_eq!(data.lines.len(), 1);
        assert_eq!(data.style.font_size, DATA_MIN_SIZE);
        assert!((data.bounds.bottom - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_placement_is_deterministic() {
        let fragments = Fragments {
            main_title: "守护蓝色星球".to_string(),
            slogan: "每一滴水都值得珍惜".to_string(),
            main_text: "海洋覆盖了地球表面的百分之七十，是无数生命的家园。".to_string(),
            sub_text: "从今天开始减少一次性塑料".to_string(),
            data_text: "每年约800万吨塑料进入海洋".to_string(),
            ..Default::default()
        };
        let config = SolverConfig::default();
        let seeds = classic(640.0, 960.0);
        let a = place_all(&seeds, &fragments, 640.0, 960.0, &StaticMetrics, &config).unwrap();
        let b = place_all(&seeds, &fragments, 640.0, 960.0, &StaticMetrics, &config).unwrap();
        assert_eq!(a, b);
    }

    /// No stroke or shadow, so the safety margin is max(10, 0.2 × size).
    fn bare(size: f32, max_width: f32) -> Style {
        Style {
            font_size: size,
            max_width,
            stroke_width: 0.0,
            shadow_blur: 0.0,
            ..Style::default()
        }
    }

    fn body_state(text: &str, size: f32, max_width: f32, anchor: Anchor) -> FragmentState {
        let style = bare(size, max_width);
        let lines = wrap_text(
            text,
            max_width,
            FragmentKind::MainText,
            &style.font(),
            &StaticMetrics,
        )
        .unwrap();
        FragmentState::measured(lines, anchor, style, &StaticMetrics).unwrap()
    }

    fn context<'a>(
        kind: FragmentKind,
        text: &'a str,
        original: &'a FragmentState,
        (width, height): (f32, f32),
        accepted: &'a [BoundingBox],
        config: &'a SolverConfig,
    ) -> RunContext<'a> {
        RunContext {
            kind,
            text,
            original,
            width,
            height,
            accepted,
            measure: &StaticMetrics,
            config,
        }
    }

    fn data_seed(x: f32, y: f32) -> FragmentSeed {
        FragmentSeed {
            anchor: Anchor::new(x, y),
            style: bare(10.0, 400.0),
        }
    }

    #[test]
    fn test_data_text_may_overflow_bottom_within_lenient_margin() {
        // 10 px line, 10 px margin: the box spans 573..603 on a 600 px canvas,
        // 3 px over against an allowance of 0.2 × 30.
        let seed = data_seed(300.0, 588.0);
        let config = SolverConfig::default();
        let mut run = PlacementRun::new(600.0, 600.0, &StaticMetrics, &config);
        let placed = run
            .place(FragmentKind::DataText, "70%", &seed)
            .unwrap()
            .unwrap();
        assert_eq!(placed.tier, PlacementTier::Initial);
        assert_eq!(placed.anchor, Anchor::new(300.0, 588.0));
        assert!((placed.bounds.bottom - 603.0).abs() < 1e-3);

        // Body text gets no such allowance.
        let state = adjust(FragmentKind::DataText, "70%", &seed, 600.0, 600.0, &StaticMetrics)
            .unwrap();
        let body = context(
            FragmentKind::MainText,
            "70%",
            &state,
            (600.0, 600.0),
            &[],
            &config,
        );
        assert!(!body.is_valid(&state));
    }

    #[test]
    fn test_strict_data_bounds_moves_overflowing_data_text_inside() {
        let config = SolverConfig {
            strict_data_bounds: true,
            ..SolverConfig::default()
        };
        let mut run = PlacementRun::new(600.0, 600.0, &StaticMetrics, &config);
        let placed = run
            .place(FragmentKind::DataText, "70%", &data_seed(300.0, 588.0))
            .unwrap()
            .unwrap();
        // south and sideways still overflow; north by one step is the first fit
        assert_eq!(placed.tier, PlacementTier::DirectionalSearch);
        assert_eq!(placed.anchor, Anchor::new(300.0, 568.0));
        assert!(inside(&placed.bounds, 600.0, 600.0));
    }

    #[test]
    fn test_data_text_tolerates_small_overlap_with_earlier_boxes() {
        let seed = data_seed(300.0, 450.0);
        let state = adjust(FragmentKind::DataText, "70%", &seed, 600.0, 600.0, &StaticMetrics)
            .unwrap();
        assert!((state.bounds().top - 435.0).abs() < 1e-3);
        // ends 2 px into the data box
        let accepted = [BoundingBox::new(0.0, 0.0, 600.0, 437.0)];

        let config = SolverConfig::default();
        let data = context(
            FragmentKind::DataText,
            "70%",
            &state,
            (600.0, 600.0),
            &accepted,
            &config,
        );
        let (placed, tier) = data.solve().unwrap();
        assert_eq!(tier, PlacementTier::Initial);
        assert_eq!(placed.anchor, state.anchor);

        let body = context(
            FragmentKind::SubText,
            "70%",
            &state,
            (600.0, 600.0),
            &accepted,
            &config,
        );
        assert!(!body.is_valid(&state));

        let exact = SolverConfig {
            data_overlap_tolerance: 0.0,
            ..SolverConfig::default()
        };
        let data = context(
            FragmentKind::DataText,
            "70%",
            &state,
            (600.0, 600.0),
            &accepted,
            &exact,
        );
        let (moved, tier) = data.solve().unwrap();
        assert_eq!(tier, PlacementTier::DirectionalSearch);
        assert!(!overlaps(&moved.bounds(), &accepted[0], 0.0));
    }

    #[test]
    fn test_font_shrink_takes_first_factor_that_fits() {
        // 88 px tall canvas: at 0.8 × 80 the box is 64 + 2 × 12.8 = 89.6 tall,
        // at 0.7 × 80 it is 56 + 2 × 11.2 = 78.4.
        let text = "保护海洋";
        let original = body_state(text, 80.0, 600.0, Anchor::new(400.0, 44.0));
        let config = SolverConfig::default();
        let ctx = context(
            FragmentKind::MainText,
            text,
            &original,
            (800.0, 88.0),
            &[],
            &config,
        );
        assert!(!ctx.is_valid(&original));
        assert_eq!(directional_search(&ctx, &original).unwrap(), None);

        let shrunk = font_shrink(&ctx, &original).unwrap().unwrap();
        assert!((shrunk.style.font_size - 80.0 * SHRINK_FACTORS[1]).abs() < 1e-3);
        assert_eq!(shrunk.style.max_width, 600.0);
        assert_eq!(shrunk.lines, vec![text.to_string()]);
        assert!(inside(&shrunk.bounds(), 800.0, 88.0));

        let (solved, tier) = ctx.solve().unwrap();
        assert_eq!(tier, PlacementTier::FontShrink);
        assert_eq!(solved, shrunk);
    }

    #[test]
    fn test_rewrap_narrows_budget_at_smallest_size() {
        // Full-width ideographs: every shrink size still leaves a line of at
        // least 240 px, too wide for a 201 px canvas.
        let text = "海洋生命保护海洋生命保护";
        let original = body_state(text, 50.0, 250.0, Anchor::new(100.5, 300.0));
        assert_eq!(original.lines.len(), 3);
        let config = SolverConfig::default();
        let ctx = context(
            FragmentKind::MainText,
            text,
            &original,
            (201.0, 600.0),
            &[],
            &config,
        );
        assert_eq!(force_center(&ctx, &original).unwrap(), None);
        assert_eq!(font_shrink(&ctx, &original).unwrap(), None);

        let rewrapped = rewrap(&ctx, &original).unwrap().unwrap();
        assert!((rewrapped.style.font_size - 50.0 * SMALLEST_SHRINK).abs() < 1e-3);
        assert_eq!(rewrapped.style.max_width, 250.0 * REWRAP_FRACTIONS[0]);
        // nine 20 px glyphs per 187.5 px line
        assert_eq!(rewrapped.lines.len(), 2);
        assert_eq!(rewrapped.lines[0].chars().count(), 9);
        assert_eq!(ctx.solve().unwrap().1, PlacementTier::Rewrap);

        let title = context(
            FragmentKind::MainTitle,
            text,
            &original,
            (201.0, 600.0),
            &[],
            &config,
        );
        assert_eq!(rewrap(&title, &original).unwrap(), None);
    }

    #[test]
    fn test_truncate_keeps_floor_of_line_fraction() {
        // At 0.4 × 20 = 8 px the text wraps to two lines (12 + 3). A 30 px
        // canvas only takes one: floor(2 × 0.75) = 1.
        let text = "海洋生命保护海洋生命保护海洋生";
        let original = body_state(text, 20.0, 100.0, Anchor::new(100.0, 15.0));
        let config = SolverConfig::default();
        let ctx = context(
            FragmentKind::MainText,
            text,
            &original,
            (200.0, 30.0),
            &[],
            &config,
        );
        assert_eq!(font_shrink(&ctx, &original).unwrap(), None);
        assert_eq!(rewrap(&ctx, &original).unwrap(), None);

        let full = ctx.lay_out(20.0 * SMALLEST_SHRINK, 100.0).unwrap();
        assert_eq!(full.lines.len(), 2);

        let cut = truncate(&ctx, &original).unwrap().unwrap();
        assert_eq!(cut.lines.len(), 1);
        assert!(cut.lines[0].ends_with(ELLIPSIS));
        assert!(cut.lines[0].starts_with("海洋生命"));
        assert!(cut.extent.width <= 100.0 + WIDTH_EPSILON);
        assert!(inside(&cut.bounds(), 200.0, 30.0));
        assert_eq!(ctx.solve().unwrap().1, PlacementTier::Truncate);
    }

    #[test]
    fn test_terminal_clamp_sizes_per_role() {
        let config = SolverConfig::default();
        let cases = [
            (FragmentKind::MainTitle, 20.0),
            (FragmentKind::Slogan, 20.0),
            (FragmentKind::MainText, 16.0),
            (FragmentKind::SubText, 16.0),
            (FragmentKind::DataText, 10.0),
        ];
        for (kind, expected) in cases {
            let original = body_state("Save the ocean", 40.0, 500.0, Anchor::new(300.0, 300.0));
            let ctx = context(kind, "Save the ocean", &original, (600.0, 600.0), &[], &config);
            let clamped = terminal_clamp(&ctx).unwrap();
            assert!(
                (clamped.style.font_size - expected).abs() < 1e-3,
                "{kind:?}: {}",
                clamped.style.font_size
            );
            if kind.role() != Role::Body {
                assert_eq!(clamped.lines.len(), 1);
            }
        }
    }

    fn text_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            "[a-z]{1,12}( [a-z]{1,10}){0,8}",
            "[海洋生命塑料保护，。]{1,50}",
            "[A-Za-z0-9%]{1,80}",
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_accepted_boxes_are_contained_and_disjoint(
            width in 1.0f32..1600.0,
            height in 1.0f32..1600.0,
            title in text_strategy(),
            slogan in text_strategy(),
            main in text_strategy(),
            sub in text_strategy(),
            data in text_strategy(),
        ) {
            let fragments = Fragments {
                main_title: title,
                slogan,
                main_text: main,
                sub_text: sub,
                data_text: data,
                ..Default::default()
            };
            let config = SolverConfig::default();
            let seeds = classic(width, height);
            let placed = place_all(&seeds, &fragments, width, height, &StaticMetrics, &config)
                .unwrap();

            let present = FragmentKind::PRIORITY_ORDER
                .iter()
                .filter(|k| fragments.get(**k).is_some())
                .count();
            prop_assert_eq!(placed.len(), present);

            let lenient = BoundsPolicy::Lenient { max_overflow: config.lenient_overflow };
            for (j, later) in placed.iter().enumerate() {
                if later.tier == PlacementTier::TerminalClamp {
                    continue;
                }
                let (policy, tolerance) = if later.kind == FragmentKind::DataText {
                    (lenient, config.data_overlap_tolerance)
                } else {
                    (BoundsPolicy::Strict, 0.0)
                };
                prop_assert!(within_bounds(&later.bounds, width, height, policy));
                for earlier in &placed[..j] {
                    prop_assert!(!overlaps(&later.bounds, &earlier.bounds, tolerance));
                }
            }
        }
    }
}
