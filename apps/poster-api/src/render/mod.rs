//! Drawing a `RenderPlan` onto pixels and encoding the result.

pub mod raster;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use thiserror::Error;

use crate::layout::font_metrics::MeasureError;
use crate::layout::geometry::{block_height, LINE_HEIGHT_EM};
use crate::layout::style::{Alignment, Style};
use crate::layout::RenderPlan;

pub use raster::{load_font, RasterSurface};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Measure(#[from] MeasureError),

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// One positioned line of text: left edge, top of the em box, and the advance
/// `measure_text` reported for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineRun<'a> {
    pub text: &'a str,
    pub x: f32,
    pub top: f32,
    pub width: f32,
}

/// Minimal drawing backend.
pub trait DrawSurface {
    fn draw_image(&mut self, image: &RgbaImage);
    fn draw_filled_text(&mut self, line: &LineRun<'_>, style: &Style);
    fn draw_stroked_text(&mut self, line: &LineRun<'_>, style: &Style);
    fn measure_text(&self, text: &str, style: &Style) -> Result<f32, MeasureError>;
}

/// Draws the background, then every placed fragment line by line: stroke
/// first, fill on top.
pub fn render_plan(
    plan: &RenderPlan,
    background: &RgbaImage,
    surface: &mut dyn DrawSurface,
) -> Result<(), RenderError> {
    surface.draw_image(background);

    for placed in &plan.fragments {
        let style = &placed.style;
        let pitch = style.font_size * LINE_HEIGHT_EM;
        let top = placed.anchor.y - block_height(style.font_size, placed.lines.len()) / 2.0;

        for (i, line) in placed.lines.iter().enumerate() {
            let text = line.trim_end();
            if text.is_empty() {
                continue;
            }
            let width = surface.measure_text(text, style)?;
            let x = match style.align {
                Alignment::Left => placed.anchor.x,
                Alignment::Center => placed.anchor.x - width / 2.0,
                Alignment::Right => placed.anchor.x - width,
            };
            let run = LineRun {
                text,
                x,
                top: top + i as f32 * pitch,
                width,
            };
            if style.stroke_width > 0.0 {
                surface.draw_stroked_text(&run, style);
            }
            surface.draw_filled_text(&run, style);
        }
    }
    Ok(())
}

/// Outlines every accepted box, for inspecting layouts.
pub fn draw_debug_boxes(canvas: &mut RgbaImage, plan: &RenderPlan) {
    const DEBUG_COLOR: Rgba<u8> = Rgba([255, 0, 255, 255]);
    for placed in &plan.fragments {
        let b = placed.bounds;
        let w = b.width().round().max(1.0) as u32;
        let h = b.height().round().max(1.0) as u32;
        let rect = Rect::at(b.left.round() as i32, b.top.round() as i32).of_size(w, h);
        draw_hollow_rect_mut(canvas, rect, DEBUG_COLOR);
    }
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::font_metrics::{StaticMetrics, TextMeasure};
    use crate::layout::geometry::BoundingBox;
    use crate::layout::solver::{PlacedFragment, PlacementTier};
    use crate::layout::style::{Anchor, FragmentKind};

    #[derive(Default)]
    struct Recorder {
        backgrounds: usize,
        calls: Vec<(&'static str, String, f32, f32)>,
        fill_widths: Vec<f32>,
    }

    impl DrawSurface for Recorder {
        fn draw_image(&mut self, _: &RgbaImage) {
            self.backgrounds += 1;
        }

        fn draw_filled_text(&mut self, line: &LineRun<'_>, _: &Style) {
            self.calls.push(("fill", line.text.to_string(), line.x, line.top));
            self.fill_widths.push(line.width);
        }

        fn draw_stroked_text(&mut self, line: &LineRun<'_>, _: &Style) {
            self.calls.push(("stroke", line.text.to_string(), line.x, line.top));
        }

        fn measure_text(&self, text: &str, style: &Style) -> Result<f32, MeasureError> {
            StaticMetrics.measure(text, &style.font())
        }
    }

    /// Draws nothing; every measurement fails.
    struct Unmeasurable;

    impl DrawSurface for Unmeasurable {
        fn draw_image(&mut self, _: &RgbaImage) {}
        fn draw_filled_text(&mut self, _: &LineRun<'_>, _: &Style) {}
        fn draw_stroked_text(&mut self, _: &LineRun<'_>, _: &Style) {}

        fn measure_text(&self, _: &str, style: &Style) -> Result<f32, MeasureError> {
            Err(MeasureError::InvalidFontSize(style.font_size))
        }
    }

    fn plan_with(lines: &[&str], style: Style) -> RenderPlan {
        RenderPlan {
            width: 400,
            height: 300,
            template: "classic".to_string(),
            fragments: vec![PlacedFragment {
                kind: FragmentKind::MainText,
                lines: lines.iter().map(|s| s.to_string()).collect(),
                anchor: Anchor::new(200.0, 150.0),
                style,
                bounds: BoundingBox::new(50.0, 100.0, 350.0, 200.0),
                tier: PlacementTier::Initial,
            }],
        }
    }

    #[test]
    fn test_render_plan_draws_stroke_then_fill_per_line() {
        let style = Style {
            font_size: 20.0,
            ..Style::default()
        };
        let plan = plan_with(&["first ", "second"], style);
        let mut recorder = Recorder::default();
        render_plan(&plan, &RgbaImage::new(400, 300), &mut recorder).unwrap();

        assert_eq!(recorder.backgrounds, 1);
        let kinds: Vec<_> = recorder.calls.iter().map(|c| c.0).collect();
        assert_eq!(kinds, vec!["stroke", "fill", "stroke", "fill"]);
        // trailing separator is not drawn
        assert_eq!(recorder.calls[0].1, "first");
        // block height 20 × 2.2 = 44, so the first line starts at 150 − 22
        assert!((recorder.calls[0].3 - 128.0).abs() < 1e-3);
        assert!((recorder.calls[2].3 - 152.0).abs() < 1e-3);
    }

    #[test]
    fn test_render_plan_alignment_and_no_stroke() {
        let style = Style {
            font_size: 10.0,
            stroke_width: 0.0,
            align: Alignment::Right,
            ..Style::default()
        };
        let plan = plan_with(&["edge"], style.clone());
        let mut recorder = Recorder::default();
        render_plan(&plan, &RgbaImage::new(400, 300), &mut recorder).unwrap();
        assert_eq!(recorder.calls.len(), 1);
        let width = StaticMetrics.measure("edge", &style.font()).unwrap();
        assert!((recorder.calls[0].2 - (200.0 - width)).abs() < 1e-3);
        assert_eq!(recorder.fill_widths, vec![width]);
    }

    #[test]
    fn test_render_plan_propagates_measure_errors() {
        let plan = plan_with(&["text"], Style::default());
        let err = render_plan(&plan, &RgbaImage::new(400, 300), &mut Unmeasurable).unwrap_err();
        assert!(matches!(err, RenderError::Measure(MeasureError::InvalidFontSize(_))));
    }

    #[test]
    fn test_debug_boxes_outline_bounds() {
        let plan = plan_with(&["x"], Style::default());
        let mut canvas = RgbaImage::from_pixel(400, 300, Rgba([0, 0, 0, 255]));
        draw_debug_boxes(&mut canvas, &plan);
        assert_eq!(canvas.get_pixel(50, 100), &Rgba([255, 0, 255, 255]));
        assert_eq!(canvas.get_pixel(200, 150), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_encode_png_signature() {
        let bytes = encode_png(&RgbaImage::new(4, 4)).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 4));
    }
}
