//! Axis-aligned boxes and the bounds / overlap predicates the solver validates
//! against.

use serde::{Deserialize, Serialize};

use crate::layout::font_metrics::{MeasureError, TextMeasure};
use crate::layout::style::{Alignment, Anchor, Style};

/// Line pitch as a multiple of the font size.
pub const LINE_HEIGHT_EM: f32 = 1.2;
/// Lower bound of the size-proportional part of the safety margin.
const MIN_MARGIN_PX: f32 = 10.0;
const MARGIN_SIZE_FACTOR: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn inflate(&self, by: f32) -> Self {
        Self::new(
            self.left - by,
            self.top - by,
            self.right + by,
            self.bottom + by,
        )
    }
}

/// How strictly a box must stay on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundsPolicy {
    Strict,
    /// Per axis, the summed overflow past both edges may reach this fraction
    /// of the box's own extent on that axis.
    Lenient { max_overflow: f32 },
}

/// Raw text block size before the margin, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub width: f32,
    pub height: f32,
}

/// Stroke, shadow and breathing room added on every side of a text block.
pub fn safety_margin(style: &Style) -> f32 {
    style.stroke_width + style.shadow_blur + (MARGIN_SIZE_FACTOR * style.font_size).max(MIN_MARGIN_PX)
}

/// Height of `line_count` lines: one em for the first line plus a full line
/// pitch for each further line.
pub fn block_height(font_size: f32, line_count: usize) -> f32 {
    let extra = line_count.saturating_sub(1) as f32;
    font_size * (1.0 + LINE_HEIGHT_EM * extra)
}

/// Trailing whitespace left on a wrapped line is not part of its width.
pub fn text_extent<S: AsRef<str>>(
    lines: &[S],
    style: &Style,
    measure: &dyn TextMeasure,
) -> Result<TextExtent, MeasureError> {
    let font = style.font();
    let mut width = 0.0_f32;
    for line in lines {
        width = width.max(measure.measure(line.as_ref().trim_end(), &font)?);
    }
    Ok(TextExtent {
        width,
        height: block_height(style.font_size, lines.len().max(1)),
    })
}

/// Places an already-measured block at `anchor` and inflates it by the
/// safety margin.
pub fn box_at(extent: TextExtent, anchor: Anchor, style: &Style) -> BoundingBox {
    let left = match style.align {
        Alignment::Left => anchor.x,
        Alignment::Center => anchor.x - extent.width / 2.0,
        Alignment::Right => anchor.x - extent.width,
    };
    let top = anchor.y - extent.height / 2.0;
    BoundingBox::new(left, top, left + extent.width, top + extent.height)
        .inflate(safety_margin(style))
}

pub fn bounding_box_of<S: AsRef<str>>(
    lines: &[S],
    anchor: Anchor,
    style: &Style,
    measure: &dyn TextMeasure,
) -> Result<BoundingBox, MeasureError> {
    let extent = text_extent(lines, style, measure)?;
    Ok(box_at(extent, anchor, style))
}

pub fn within_bounds(b: &BoundingBox, width: f32, height: f32, policy: BoundsPolicy) -> bool {
    match policy {
        BoundsPolicy::Strict => {
            b.left >= 0.0 && b.top >= 0.0 && b.right <= width && b.bottom <= height
        }
        BoundsPolicy::Lenient { max_overflow } => {
            let over_x = (-b.left).max(0.0) + (b.right - width).max(0.0);
            let over_y = (-b.top).max(0.0) + (b.bottom - height).max(0.0);
            over_x <= max_overflow * b.width() && over_y <= max_overflow * b.height()
        }
    }
}

/// Separating-axis test after shrinking both boxes by `tolerance`. Boxes that
/// only touch do not overlap.
pub fn overlaps(a: &BoundingBox, b: &BoundingBox, tolerance: f32) -> bool {
    let a = a.inflate(-tolerance);
    let b = b.inflate(-tolerance);
    a.left < b.right && b.left < a.right && a.top < b.bottom && b.top < a.bottom
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::font_metrics::StaticMetrics;

    fn plain(font_size: f32) -> Style {
        Style {
            font_size,
            stroke_width: 0.0,
            shadow_blur: 0.0,
            ..Style::default()
        }
    }

    #[test]
    fn test_safety_margin_has_floor() {
        // 2 + 3 + max(10, 4.8)
        assert_eq!(safety_margin(&Style::default()), 15.0);
        let big = Style {
            font_size: 100.0,
            ..Style::default()
        };
        // 2 + 3 + 20
        assert_eq!(safety_margin(&big), 25.0);
    }

    #[test]
    fn test_block_height_line_pitch() {
        assert_eq!(block_height(20.0, 1), 20.0);
        assert!((block_height(20.0, 3) - 68.0).abs() < 1e-4);
    }

    #[test]
    fn test_box_at_respects_alignment() {
        let extent = TextExtent {
            width: 100.0,
            height: 20.0,
        };
        let anchor = Anchor::new(200.0, 100.0);
        let mut style = plain(20.0);
        let margin = safety_margin(&style);

        style.align = Alignment::Left;
        assert_eq!(box_at(extent, anchor, &style).left, 200.0 - margin);
        style.align = Alignment::Center;
        assert_eq!(box_at(extent, anchor, &style).left, 150.0 - margin);
        style.align = Alignment::Right;
        let b = box_at(extent, anchor, &style);
        assert_eq!(b.left, 100.0 - margin);
        assert_eq!(b.top, 90.0 - margin);
        assert_eq!(b.bottom, 110.0 + margin);
    }

    #[test]
    fn test_bounding_box_uses_widest_line() {
        let style = plain(10.0);
        let narrow = bounding_box_of(&["ii"], Anchor::new(0.0, 0.0), &style, &StaticMetrics)
            .unwrap();
        let wide = bounding_box_of(&["ii", "MMMM"], Anchor::new(0.0, 0.0), &style, &StaticMetrics)
            .unwrap();
        assert!(wide.width() > narrow.width());
        assert!(wide.height() > narrow.height());
    }

    #[test]
    fn test_strict_bounds() {
        let inside = BoundingBox::new(0.0, 0.0, 100.0, 50.0);
        assert!(within_bounds(&inside, 100.0, 50.0, BoundsPolicy::Strict));
        let out = BoundingBox::new(-1.0, 0.0, 99.0, 50.0);
        assert!(!within_bounds(&out, 100.0, 50.0, BoundsPolicy::Strict));
    }

    #[test]
    fn test_lenient_bounds_allows_fractional_overflow() {
        let lenient = BoundsPolicy::Lenient { max_overflow: 0.2 };
        // 100 wide: 4 past the left edge plus 15 past the right is 19 ≤ 20
        let b = BoundingBox::new(-4.0, 10.0, 96.0, 30.0);
        assert!(within_bounds(&b, 81.0, 100.0, lenient));
        // 4 + 26 = 30 > 20
        assert!(!within_bounds(&b, 70.0, 100.0, lenient));
        assert!(!within_bounds(&b, 81.0, 100.0, BoundsPolicy::Strict));
    }

    #[test]
    fn test_touching_boxes_do_not_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
        assert!(!overlaps(&a, &b, 0.0));
        let c = BoundingBox::new(9.0, 9.0, 20.0, 20.0);
        assert!(overlaps(&a, &c, 0.0));
    }

    #[test]
    fn test_overlap_tolerance_forgives_slight_intersection() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(7.0, 0.0, 20.0, 10.0);
        assert!(overlaps(&a, &b, 0.0));
        assert!(!overlaps(&a, &b, 2.0));
    }
}
