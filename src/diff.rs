//! Per-pixel diff engine.
//!
//! Implements the pixelmatch comparison: perceptual color distance in YIQ
//! space with an anti-aliasing heuristic, so single-pixel rendering artifacts
//! along edges are reported separately from real content changes. The output
//! image renders unchanged pixels as a faded grayscale of the first input,
//! changed pixels in the diff colors, and anti-aliased pixels in a third color.

use image::RgbaImage;

use crate::error::{Result, VrtError};

/// Maximum possible YIQ color distance between two RGB pixels; thresholds are
/// expressed as a fraction of this.
const MAX_YIQ_DELTA: f64 = 35215.0;

#[derive(Debug, Clone, Copy)]
pub struct DiffOptions {
    /// Matching tolerance in 0..=1; 0 requires exact YIQ match, 1 flags
    /// almost nothing.
    pub threshold: f32,
    /// Count anti-aliased pixels as differences instead of classifying them.
    pub include_aa: bool,
    /// Opacity of the grayscale background rendered for unchanged pixels.
    pub alpha: f32,
    /// Color for pixels that lightened in the second image.
    pub diff_color: [u8; 3],
    /// Color for pixels that darkened in the second image; falls back to
    /// `diff_color` when unset.
    pub diff_color_alt: Option<[u8; 3]>,
    /// Color for detected anti-aliased edge pixels.
    pub aa_color: [u8; 3],
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            include_aa: false,
            alpha: 0.3,
            diff_color: [255, 0, 0],
            diff_color_alt: Some([0, 255, 0]),
            aa_color: [0, 0, 255],
        }
    }
}

impl DiffOptions {
    pub fn with_threshold(threshold: f32) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }
}

/// Outcome of a single diff computation. Immutable once produced; for
/// non-empty canvases `total_pixels` is always positive, so `diff_ratio` is
/// well defined in 0..=1.
#[derive(Debug, Clone)]
pub struct DiffResult {
    pub diff_pixels: u64,
    pub total_pixels: u64,
    pub diff_ratio: f64,
    pub width: u32,
    pub height: u32,
    pub image: RgbaImage,
}

/// Compares two equal-size canvases pixel by pixel.
///
/// Inputs are expected to come from the compositor; a dimension mismatch means
/// the caller bypassed it and is rejected as an invariant violation. The
/// computation is deterministic and per-pixel independent: the same canvases
/// and threshold always produce the same result.
pub fn diff_canvases(
    before: &RgbaImage,
    after: &RgbaImage,
    options: &DiffOptions,
) -> Result<DiffResult> {
    let (width, height) = before.dimensions();
    if after.dimensions() != (width, height) {
        return Err(VrtError::diff(format!(
            "canvas dimensions diverge: {}x{} vs {}x{}; composite both inputs first",
            width,
            height,
            after.width(),
            after.height()
        )));
    }
    if width == 0 || height == 0 {
        return Err(VrtError::diff("cannot diff an empty canvas"));
    }

    let a = before.as_raw().as_slice();
    let b = after.as_raw().as_slice();
    let mut out = vec![0u8; a.len()];

    let max_delta = MAX_YIQ_DELTA * f64::from(options.threshold) * f64::from(options.threshold);
    let mut diff_pixels = 0u64;

    for y in 0..height {
        for x in 0..width {
            let pos = ((y * width + x) * 4) as usize;
            let delta = color_delta(a, b, pos, pos, false);

            if delta.abs() > max_delta {
                let is_aa = !options.include_aa
                    && (antialiased(a, x, y, width, height, b)
                        || antialiased(b, x, y, width, height, a));
                if is_aa {
                    draw_pixel(&mut out, pos, options.aa_color);
                } else {
                    let color = if delta < 0.0 {
                        options.diff_color_alt.unwrap_or(options.diff_color)
                    } else {
                        options.diff_color
                    };
                    draw_pixel(&mut out, pos, color);
                    diff_pixels += 1;
                }
            } else {
                draw_gray_pixel(a, pos, f64::from(options.alpha), &mut out);
            }
        }
    }

    let total_pixels = u64::from(width) * u64::from(height);
    let image = RgbaImage::from_raw(width, height, out)
        .ok_or_else(|| VrtError::diff("diff buffer size mismatch"))?;

    Ok(DiffResult {
        diff_pixels,
        total_pixels,
        diff_ratio: diff_pixels as f64 / total_pixels as f64,
        width,
        height,
        image,
    })
}

/// Squared YIQ color distance between pixel `k` of `img1` and pixel `m` of
/// `img2`, alpha-composited over white. The sign encodes direction: negative
/// when the first pixel is the brighter one.
fn color_delta(img1: &[u8], img2: &[u8], k: usize, m: usize, y_only: bool) -> f64 {
    let (mut r1, mut g1, mut b1, a1) = rgba_at(img1, k);
    let (mut r2, mut g2, mut b2, a2) = rgba_at(img2, m);

    if a1 == a2 && r1 == r2 && g1 == g2 && b1 == b2 {
        return 0.0;
    }

    if a1 < 255.0 {
        let a = a1 / 255.0;
        r1 = blend(r1, a);
        g1 = blend(g1, a);
        b1 = blend(b1, a);
    }
    if a2 < 255.0 {
        let a = a2 / 255.0;
        r2 = blend(r2, a);
        g2 = blend(g2, a);
        b2 = blend(b2, a);
    }

    let y1 = rgb2y(r1, g1, b1);
    let y2 = rgb2y(r2, g2, b2);
    let y = y1 - y2;

    if y_only {
        return y;
    }

    let i = rgb2i(r1, g1, b1) - rgb2i(r2, g2, b2);
    let q = rgb2q(r1, g1, b1) - rgb2q(r2, g2, b2);
    let delta = 0.5053 * y * y + 0.299 * i * i + 0.1957 * q * q;

    if y1 > y2 {
        -delta
    } else {
        delta
    }
}

/// Local-neighborhood anti-aliasing heuristic: a flagged pixel is considered
/// an anti-aliased edge artifact when its darkest and brightest neighbors are
/// themselves surrounded by enough identical siblings in both images.
fn antialiased(img: &[u8], x1: u32, y1: u32, width: u32, height: u32, other: &[u8]) -> bool {
    let x0 = x1.saturating_sub(1);
    let y0 = y1.saturating_sub(1);
    let x2 = (x1 + 1).min(width - 1);
    let y2 = (y1 + 1).min(height - 1);
    let pos = ((y1 * width + x1) * 4) as usize;

    let mut zeroes: u32 = u32::from(x1 == x0 || x1 == x2 || y1 == y0 || y1 == y2);
    let mut min = 0.0f64;
    let mut max = 0.0f64;
    let (mut min_x, mut min_y) = (0u32, 0u32);
    let (mut max_x, mut max_y) = (0u32, 0u32);

    for x in x0..=x2 {
        for y in y0..=y2 {
            if x == x1 && y == y1 {
                continue;
            }

            // Brightness-only delta between the center pixel and its neighbor.
            let delta = color_delta(img, img, pos, ((y * width + x) * 4) as usize, true);

            if delta == 0.0 {
                zeroes += 1;
                // More than two identical neighbors means this is not an edge.
                if zeroes > 2 {
                    return false;
                }
            } else if delta < min {
                min = delta;
                min_x = x;
                min_y = y;
            } else if delta > max {
                max = delta;
                max_x = x;
                max_y = y;
            }
        }
    }

    // No both-darker and both-brighter neighbors means it is not anti-aliasing.
    if min == 0.0 || max == 0.0 {
        return false;
    }

    // The darkest or brightest neighbor must sit inside a flat run of
    // identical pixels in both images.
    (has_many_siblings(img, min_x, min_y, width, height)
        && has_many_siblings(other, min_x, min_y, width, height))
        || (has_many_siblings(img, max_x, max_y, width, height)
            && has_many_siblings(other, max_x, max_y, width, height))
}

/// Whether a pixel has three or more adjacent pixels of the exact same color.
fn has_many_siblings(img: &[u8], x1: u32, y1: u32, width: u32, height: u32) -> bool {
    let x0 = x1.saturating_sub(1);
    let y0 = y1.saturating_sub(1);
    let x2 = (x1 + 1).min(width - 1);
    let y2 = (y1 + 1).min(height - 1);
    let pos = ((y1 * width + x1) * 4) as usize;

    let mut zeroes: u32 = u32::from(x1 == x0 || x1 == x2 || y1 == y0 || y1 == y2);

    for x in x0..=x2 {
        for y in y0..=y2 {
            if x == x1 && y == y1 {
                continue;
            }
            let pos2 = ((y * width + x) * 4) as usize;
            if img[pos..pos + 4] == img[pos2..pos2 + 4] {
                zeroes += 1;
            }
            if zeroes > 2 {
                return true;
            }
        }
    }

    false
}

fn rgba_at(img: &[u8], pos: usize) -> (f64, f64, f64, f64) {
    (
        f64::from(img[pos]),
        f64::from(img[pos + 1]),
        f64::from(img[pos + 2]),
        f64::from(img[pos + 3]),
    )
}

fn draw_pixel(out: &mut [u8], pos: usize, color: [u8; 3]) {
    out[pos] = color[0];
    out[pos + 1] = color[1];
    out[pos + 2] = color[2];
    out[pos + 3] = 255;
}

fn draw_gray_pixel(img: &[u8], pos: usize, alpha: f64, out: &mut [u8]) {
    let (r, g, b, a) = rgba_at(img, pos);
    let val = blend(rgb2y(r, g, b), alpha * a / 255.0);
    let val = val.round().clamp(0.0, 255.0) as u8;
    out[pos] = val;
    out[pos + 1] = val;
    out[pos + 2] = val;
    out[pos + 3] = 255;
}

/// Blend a channel onto a white background with the given opacity.
fn blend(c: f64, a: f64) -> f64 {
    255.0 + (c - 255.0) * a
}

fn rgb2y(r: f64, g: f64, b: f64) -> f64 {
    r * 0.298_895_31 + g * 0.586_622_47 + b * 0.114_482_23
}

fn rgb2i(r: f64, g: f64, b: f64) -> f64 {
    r * 0.595_977_99 - g * 0.274_176_10 - b * 0.321_801_89
}

fn rgb2q(r: f64, g: f64, b: f64) -> f64 {
    r * 0.211_470_17 - g * 0.522_617_11 + b * 0.311_146_94
}
