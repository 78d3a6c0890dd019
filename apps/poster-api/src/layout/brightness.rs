//! 3×3 region brightness analysis of the background image.

use image::RgbaImage;
use serde::Serialize;

/// Cells per axis.
pub const GRID: u32 = 3;
/// Per-axis cap on sampled pixels inside one cell.
const MAX_SAMPLES_PER_AXIS: u32 = 64;
/// Cells brighter than this suit dark text.
const DARK_TEXT_THRESHOLD: f32 = 0.6;

/// Pixel rectangle of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cell {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Cell {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionStats {
    pub cell: Cell,
    /// Mean channel values, 0..=255.
    pub mean_rgb: [f32; 3],
    /// `(r + g + b) / 3 / 255`, averaged over samples.
    pub luminance: f32,
    pub suits_dark_text: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageAnalysis {
    pub width: u32,
    pub height: u32,
    /// Row-major, index = row * 3 + column.
    pub regions: Vec<RegionStats>,
    /// Region indices, most extreme luminance first.
    pub ranked: Vec<usize>,
    pub overall_luminance: f32,
    pub is_dark: bool,
}

/// Integer span of cell `i` along an axis of `len` pixels, never empty on a
/// non-empty axis.
fn cell_span(len: u32, i: u32) -> (u32, u32) {
    let start = (len * i / GRID).min(len.saturating_sub(1));
    let end = (len * (i + 1) / GRID).max(start + 1).min(len.max(1));
    (start, end)
}

fn sample_region(img: &RgbaImage, col: u32, row: u32) -> RegionStats {
    let (w, h) = img.dimensions();
    let (x0, x1) = cell_span(w, col);
    let (y0, y1) = cell_span(h, row);
    let stride_x = (x1 - x0).div_ceil(MAX_SAMPLES_PER_AXIS).max(1);
    let stride_y = (y1 - y0).div_ceil(MAX_SAMPLES_PER_AXIS).max(1);

    let mut sum = [0u64; 3];
    let mut count = 0u64;
    for y in (y0..y1).step_by(stride_y as usize) {
        for x in (x0..x1).step_by(stride_x as usize) {
            let p = img.get_pixel(x, y);
            sum[0] += u64::from(p[0]);
            sum[1] += u64::from(p[1]);
            sum[2] += u64::from(p[2]);
            count += 1;
        }
    }

    let n = count.max(1) as f32;
    let mean_rgb = [sum[0] as f32 / n, sum[1] as f32 / n, sum[2] as f32 / n];
    let luminance = (mean_rgb[0] + mean_rgb[1] + mean_rgb[2]) / 3.0 / 255.0;
    let third_w = w as f32 / GRID as f32;
    let third_h = h as f32 / GRID as f32;
    RegionStats {
        cell: Cell {
            x: col as f32 * third_w,
            y: row as f32 * third_h,
            width: third_w,
            height: third_h,
        },
        mean_rgb,
        luminance,
        suits_dark_text: luminance > DARK_TEXT_THRESHOLD,
    }
}

/// Samples the image on a 3×3 grid. Callers reject zero-sized images first.
pub fn analyze_image(img: &RgbaImage) -> ImageAnalysis {
    let regions: Vec<RegionStats> = (0..GRID)
        .flat_map(|row| (0..GRID).map(move |col| (col, row)))
        .map(|(col, row)| sample_region(img, col, row))
        .collect();

    let overall_luminance =
        regions.iter().map(|r| r.luminance).sum::<f32>() / regions.len() as f32;

    let mut ranked: Vec<usize> = (0..regions.len()).collect();
    // Stable sort keeps index order among ties.
    ranked.sort_by(|&a, &b| {
        let da = (regions[a].luminance - 0.5).abs();
        let db = (regions[b].luminance - 0.5).abs();
        db.total_cmp(&da)
    });

    ImageAnalysis {
        width: img.width(),
        height: img.height(),
        regions,
        ranked,
        overall_luminance,
        is_dark: overall_luminance < 0.5,
    }
}
