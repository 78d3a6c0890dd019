//! CPU text rasterizer on top of `ab_glyph` outlines.
//!
//! Each line is drawn into a local coverage mask first. Stroke, faux bold,
//! faux italic and the drop shadow are all mask operations; the mask is then
//! blended onto the canvas with the style's color, alpha and opacity.

use std::path::Path;
use std::sync::Arc;

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use image::{imageops, GrayImage, Luma, Rgba, RgbaImage};
use imageproc::filter::gaussian_blur_f32;
use imageproc::pixelops::interpolate;
use tracing::{debug, warn};

use crate::layout::font_metrics::{GlyphMetrics, MeasureError, TextMeasure};
use crate::layout::style::{Color, FontSlant, FontWeight, Style, SHADOW_OFFSET};
use crate::render::{DrawSurface, LineRun};

/// Horizontal shear per pixel above the baseline for synthesized italics.
const ITALIC_SHEAR: f32 = 0.2;
/// Sample points on the stroke circle.
const STROKE_SAMPLES: usize = 16;

/// CJK-capable faces come first so mixed copy renders without tofu.
const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/PingFang.ttc",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\msyh.ttc",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Loads `preferred` if given and readable, else the first usable system font.
pub fn load_font(preferred: Option<&Path>) -> Option<FontVec> {
    if let Some(path) = preferred {
        match read_font(path) {
            Some(font) => return Some(font),
            None => warn!(path = %path.display(), "configured font unusable, trying system fonts"),
        }
    }

    for path in SYSTEM_FONT_PATHS {
        if let Some(font) = read_font(Path::new(path)) {
            return Some(font);
        }
    }

    debug!("no system font found");
    None
}

fn read_font(path: &Path) -> Option<FontVec> {
    let data = std::fs::read(path).ok()?;
    let font = FontVec::try_from_vec(data).ok()?;
    debug!(path = %path.display(), "loaded font");
    Some(font)
}

/// Coverage mask for one line plus where its (0, 0) lands on the canvas.
struct LineMask {
    mask: GrayImage,
    origin: (i32, i32),
}

pub struct RasterSurface {
    canvas: RgbaImage,
    font: Arc<FontVec>,
    metrics: GlyphMetrics,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32, font: Arc<FontVec>) -> Self {
        Self {
            canvas: RgbaImage::new(width, height),
            metrics: GlyphMetrics::new(Arc::clone(&font)),
            font,
        }
    }

    pub fn into_image(self) -> RgbaImage {
        self.canvas
    }

    fn rasterize_line(&self, line: &LineRun<'_>, style: &Style) -> LineMask {
        let size = style.font_size.max(1.0);
        let scale = PxScale::from(size);
        let scaled = self.font.as_scaled(scale);

        let pad = (style.stroke_width + style.shadow_blur * 2.0 + 2.0).ceil() as u32;
        let advance = line.width;
        let italic_extra = match style.font_style {
            FontSlant::Italic => (size * ITALIC_SHEAR).ceil() as u32,
            FontSlant::Normal => 0,
        };
        let width = advance.max(0.0).ceil() as u32 + italic_extra + 2 * pad + 1;
        let height = (size * 1.25).ceil() as u32 + 2 * pad;
        let mut mask = GrayImage::new(width, height);

        let bold_offsets: &[i32] = match style.font_weight {
            FontWeight::Bold => &[0, 1],
            FontWeight::Normal => &[0],
        };
        let italic = style.font_style == FontSlant::Italic;
        let baseline = pad as f32 + scaled.ascent();
        let spacing = style.letter_spacing * size;
        let mut caret = pad as f32;

        for c in line.text.chars() {
            let id = scaled.glyph_id(c);
            let glyph = id.with_scale_and_position(scale, point(caret, baseline));
            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let py = bounds.min.y + gy as f32;
                    let shear = if italic {
                        (baseline - py) * ITALIC_SHEAR
                    } else {
                        0.0
                    };
                    let px = (bounds.min.x + gx as f32 + shear).round() as i32;
                    let value = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
                    for dx in bold_offsets {
                        put_max(&mut mask, px + dx, py.round() as i32, value);
                    }
                });
            }
            caret += scaled.h_advance(id) + spacing;
        }

        LineMask {
            mask,
            origin: (
                line.x.round() as i32 - pad as i32,
                line.top.round() as i32 - pad as i32,
            ),
        }
    }

    fn cast_shadow(&mut self, glyphs: &LineMask, style: &Style) {
        let sigma = style.shadow_blur / 2.0;
        let blurred = if sigma > 0.0 {
            gaussian_blur_f32(&glyphs.mask, sigma)
        } else {
            glyphs.mask.clone()
        };
        let offset = SHADOW_OFFSET.round() as i32;
        let origin = (glyphs.origin.0 + offset, glyphs.origin.1 + offset);
        composite(
            &mut self.canvas,
            &blurred,
            origin,
            style.shadow_color(),
            style.opacity,
        );
    }
}

impl DrawSurface for RasterSurface {
    fn draw_image(&mut self, image: &RgbaImage) {
        imageops::overlay(&mut self.canvas, image, 0, 0);
    }

    fn draw_filled_text(&mut self, line: &LineRun<'_>, style: &Style) {
        let glyphs = self.rasterize_line(line, style);
        self.cast_shadow(&glyphs, style);
        composite(
            &mut self.canvas,
            &glyphs.mask,
            glyphs.origin,
            style.fill,
            style.opacity,
        );
    }

    fn draw_stroked_text(&mut self, line: &LineRun<'_>, style: &Style) {
        if style.stroke_width <= 0.0 {
            return;
        }
        let mut glyphs = self.rasterize_line(line, style);
        glyphs.mask = dilate(&glyphs.mask, style.stroke_width / 2.0);
        self.cast_shadow(&glyphs, style);
        composite(
            &mut self.canvas,
            &glyphs.mask,
            glyphs.origin,
            style.stroke,
            style.opacity,
        );
    }

    fn measure_text(&self, text: &str, style: &Style) -> Result<f32, MeasureError> {
        self.metrics.measure(text, &style.font())
    }
}

fn put_max(mask: &mut GrayImage, x: i32, y: i32, value: u8) {
    if x < 0 || y < 0 || x >= mask.width() as i32 || y >= mask.height() as i32 {
        return;
    }
    let pixel = mask.get_pixel_mut(x as u32, y as u32);
    pixel.0[0] = pixel.0[0].max(value);
}

/// Max-union of the mask shifted around a circle of `radius`.
fn dilate(mask: &GrayImage, radius: f32) -> GrayImage {
    let mut out = mask.clone();
    if radius <= 0.0 {
        return out;
    }
    let offsets: Vec<(i32, i32)> = (0..STROKE_SAMPLES)
        .map(|k| {
            let angle = k as f32 * std::f32::consts::TAU / STROKE_SAMPLES as f32;
            (
                (radius * angle.cos()).round() as i32,
                (radius * angle.sin()).round() as i32,
            )
        })
        .filter(|&offset| offset != (0, 0))
        .collect();

    for (x, y, Luma([value])) in mask.enumerate_pixels() {
        if *value == 0 {
            continue;
        }
        for (dx, dy) in &offsets {
            put_max(&mut out, x as i32 + dx, y as i32 + dy, *value);
        }
    }
    out
}

/// Source-over blend of `color` through `mask` placed at `origin`.
fn composite(canvas: &mut RgbaImage, mask: &GrayImage, origin: (i32, i32), color: Color, opacity: f32) {
    let strength = f32::from(color.a) / 255.0 * opacity.clamp(0.0, 1.0);
    if strength <= 0.0 {
        return;
    }
    let paint = Rgba([color.r, color.g, color.b, 255]);
    let (cw, ch) = (canvas.width() as i32, canvas.height() as i32);

    for (mx, my, Luma([coverage])) in mask.enumerate_pixels() {
        if *coverage == 0 {
            continue;
        }
        let (x, y) = (origin.0 + mx as i32, origin.1 + my as i32);
        if x < 0 || y < 0 || x >= cw || y >= ch {
            continue;
        }
        let weight = f32::from(*coverage) / 255.0 * strength;
        let under = *canvas.get_pixel(x as u32, y as u32);
        canvas.put_pixel(x as u32, y as u32, interpolate(paint, under, weight));
    }
}
