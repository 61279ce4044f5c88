//! Allowed-region mask construction.
//!
//! A mask is a binary [`Grid`] marking which canvas pixels word ink may
//! occupy. It is built either from a built-in parametric shape (drawn with
//! closed-form geometry) or from an externally decoded image classified by
//! alpha or luminance threshold. Both variants support a signed
//! `shape_padding`: positive values erode the region by that Manhattan
//! radius, negative values dilate it.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::LayoutError;
use crate::grid::Grid;

/// Built-in parametric shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuiltinShape {
    Circle,
    RoundedRect,
    Star,
    Heart,
}

impl BuiltinShape {
    /// Parse a shape name. Unknown names fall back to `Circle`; this is a
    /// documented fallback, not a failure.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "circle" => Self::Circle,
            "rounded-rect" | "rounded_rect" | "roundedrect" | "rect" => Self::RoundedRect,
            "star" => Self::Star,
            "heart" => Self::Heart,
            other => {
                warn!(shape = other, "unknown shape name, falling back to circle");
                Self::Circle
            }
        }
    }
}

/// How image pixels are classified as inside or outside the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMode {
    /// Inside iff alpha >= threshold.
    Alpha { threshold: u8 },
    /// Inside by Rec. 709 luminance compared against the threshold.
    /// Fully transparent pixels are always outside regardless of polarity.
    Luminance { threshold: u8, polarity: LuminancePolarity },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LuminancePolarity {
    /// Pixels darker than the threshold are inside.
    DarkInside,
    /// Pixels lighter than the threshold are inside.
    LightInside,
}

/// A decoded RGBA8 image supplied by an external decoder.
#[derive(Debug, Clone)]
pub struct MaskImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl MaskImage {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, LayoutError> {
        if rgba.len() != width as usize * height as usize * 4 {
            return Err(LayoutError::ImageDimensionMismatch {
                len: rgba.len(),
                width,
                height,
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.rgba[i],
            self.rgba[i + 1],
            self.rgba[i + 2],
            self.rgba[i + 3],
        ]
    }
}

/// Specification of the allowed region for one render request.
#[derive(Debug, Clone)]
pub enum ShapeSpec {
    Builtin {
        shape: BuiltinShape,
        /// Inset from the canvas edge, in pixels.
        margin: u32,
        /// Positive erodes, negative dilates (Manhattan radius).
        shape_padding: i32,
    },
    Image {
        image: MaskImage,
        mode: SelectionMode,
        shape_padding: i32,
    },
}

/// Build the allowed mask for a `width` x `height` canvas.
pub fn build_mask(width: u32, height: u32, spec: &ShapeSpec) -> Grid {
    let (mut grid, padding) = match spec {
        ShapeSpec::Builtin {
            shape,
            margin,
            shape_padding,
        } => (draw_shape(width, height, *shape, *margin), *shape_padding),
        ShapeSpec::Image {
            image,
            mode,
            shape_padding,
        } => (classify_image(width, height, image, *mode), *shape_padding),
    };
    if padding > 0 {
        grid = erode(&grid, padding as u32);
    } else if padding < 0 {
        grid = dilate(&grid, padding.unsigned_abs());
    }
    grid
}

fn draw_shape(width: u32, height: u32, shape: BuiltinShape, margin: u32) -> Grid {
    let mut grid = Grid::new(width, height);
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let half = (width.min(height) as f32 / 2.0 - margin as f32).max(0.0);

    match shape {
        BuiltinShape::Circle => {
            let r2 = half * half;
            fill_where(&mut grid, |x, y| {
                let dx = x - cx;
                let dy = y - cy;
                dx * dx + dy * dy <= r2
            });
        }
        BuiltinShape::RoundedRect => {
            let m = margin as f32;
            let (x0, y0) = (m, m);
            let (x1, y1) = (width as f32 - m, height as f32 - m);
            if x1 <= x0 || y1 <= y0 {
                return grid;
            }
            let r = 0.2 * (x1 - x0).min(y1 - y0);
            fill_where(&mut grid, |x, y| {
                if x < x0 || x > x1 || y < y0 || y > y1 {
                    return false;
                }
                // Outside the corner squares the rect test is enough;
                // inside them, require the corner disc.
                let dx = (x0 + r - x).max(x - (x1 - r)).max(0.0);
                let dy = (y0 + r - y).max(y - (y1 - r)).max(0.0);
                dx * dx + dy * dy <= r * r
            });
        }
        BuiltinShape::Star => {
            let verts = star_vertices(cx, cy, half);
            fill_where(&mut grid, |x, y| point_in_polygon(x, y, &verts));
        }
        BuiltinShape::Heart => {
            // Classic implicit heart (x^2 + y^2 - 1)^3 - x^2 y^3 <= 0,
            // y up, nudged so the lobes and tip center in the canvas box.
            fill_where(&mut grid, |x, y| {
                if half <= 0.0 {
                    return false;
                }
                let nx = (x - cx) / half * 1.25;
                let ny = (cy - y) / half * 1.25 + 0.12;
                let a = nx * nx + ny * ny - 1.0;
                a * a * a - nx * nx * ny * ny * ny <= 0.0
            });
        }
    }
    grid
}

fn fill_where(grid: &mut Grid, mut inside: impl FnMut(f32, f32) -> bool) {
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            // Sample at the pixel center.
            if inside(x as f32 + 0.5, y as f32 + 0.5) {
                grid.set(x, y);
            }
        }
    }
}

/// Ten vertices of a five-point star, tip up, alternating outer and inner
/// radius.
fn star_vertices(cx: f32, cy: f32, outer: f32) -> Vec<(f32, f32)> {
    let inner = outer * 0.45;
    (0..10)
        .map(|i| {
            let r = if i % 2 == 0 { outer } else { inner };
            let a = -std::f32::consts::FRAC_PI_2 + i as f32 * std::f32::consts::PI / 5.0;
            (cx + r * a.cos(), cy + r * a.sin())
        })
        .collect()
}

/// Even-odd ray-cast point-in-polygon test.
fn point_in_polygon(x: f32, y: f32, verts: &[(f32, f32)]) -> bool {
    let mut inside = false;
    let n = verts.len();
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = verts[i];
        let (xj, yj) = verts[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Classify a decoded image into the canvas grid. The image is scaled to fit
/// inside the canvas preserving aspect ratio, centered; letterbox bands are
/// outside.
fn classify_image(width: u32, height: u32, image: &MaskImage, mode: SelectionMode) -> Grid {
    let mut grid = Grid::new(width, height);
    if image.width() == 0 || image.height() == 0 {
        return grid;
    }
    let scale = (width as f32 / image.width() as f32).min(height as f32 / image.height() as f32);
    let target_w = image.width() as f32 * scale;
    let target_h = image.height() as f32 * scale;
    let ox = (width as f32 - target_w) / 2.0;
    let oy = (height as f32 - target_h) / 2.0;

    for y in 0..height {
        for x in 0..width {
            let fx = x as f32 + 0.5 - ox;
            let fy = y as f32 + 0.5 - oy;
            if fx < 0.0 || fy < 0.0 || fx >= target_w || fy >= target_h {
                continue;
            }
            let sx = ((fx / scale) as u32).min(image.width() - 1);
            let sy = ((fy / scale) as u32).min(image.height() - 1);
            let [r, g, b, a] = image.pixel(sx, sy);
            if a == 0 {
                continue;
            }
            let inside = match mode {
                SelectionMode::Alpha { threshold } => a >= threshold,
                SelectionMode::Luminance { threshold, polarity } => {
                    let lum = 0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32;
                    match polarity {
                        LuminancePolarity::DarkInside => lum <= threshold as f32,
                        LuminancePolarity::LightInside => lum >= threshold as f32,
                    }
                }
            };
            if inside {
                grid.set(x, y);
            }
        }
    }
    grid
}

const DT_INF: u32 = u32::MAX / 2;

/// Two-pass chamfer pass computing Manhattan distances from the seeded cells.
fn chamfer(dist: &mut [u32], width: usize, height: usize) {
    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            let mut d = dist[i];
            if x > 0 {
                d = d.min(dist[i - 1] + 1);
            }
            if y > 0 {
                d = d.min(dist[i - width] + 1);
            }
            dist[i] = d;
        }
    }
    for y in (0..height).rev() {
        for x in (0..width).rev() {
            let i = y * width + x;
            let mut d = dist[i];
            if x + 1 < width {
                d = d.min(dist[i + 1] + 1);
            }
            if y + 1 < height {
                d = d.min(dist[i + width] + 1);
            }
            dist[i] = d;
        }
    }
}

/// Shrink the region by `radius`. Cells within `radius` of an outside cell
/// are cleared; the area beyond the canvas border counts as outside, so the
/// region always erodes at the canvas edge.
pub fn erode(grid: &Grid, radius: u32) -> Grid {
    let (w, h) = (grid.width() as usize, grid.height() as usize);
    let mut dist = vec![DT_INF; w * h];
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            if !grid.is_set(x as u32, y as u32) {
                dist[i] = 0;
            } else {
                // Virtual outside ring beyond the border.
                let edge = (x + 1).min(y + 1).min(w - x).min(h - y) as u32;
                dist[i] = edge;
            }
        }
    }
    chamfer(&mut dist, w, h);
    let mut out = Grid::new(grid.width(), grid.height());
    for y in 0..h {
        for x in 0..w {
            if grid.is_set(x as u32, y as u32) && dist[y * w + x] > radius {
                out.set(x as u32, y as u32);
            }
        }
    }
    out
}

/// Grow the region by `radius`. Off-canvas neighbors are absent, so dilation
/// has no effect past the border.
pub fn dilate(grid: &Grid, radius: u32) -> Grid {
    let (w, h) = (grid.width() as usize, grid.height() as usize);
    let mut dist = vec![DT_INF; w * h];
    for y in 0..h {
        for x in 0..w {
            if grid.is_set(x as u32, y as u32) {
                dist[y * w + x] = 0;
            }
        }
    }
    chamfer(&mut dist, w, h);
    let mut out = Grid::new(grid.width(), grid.height());
    for y in 0..h {
        for x in 0..w {
            if dist[y * w + x] <= radius {
                out.set(x as u32, y as u32);
            }
        }
    }
    out
}
