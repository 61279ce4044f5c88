//! Word sprite rasterization and caching.
//!
//! A sprite is the cropped, binary ink mask of one word at one font
//! configuration. The actual glyph painting sits behind the [`TextRenderer`]
//! trait so the engine only depends on two capabilities: reporting the ink
//! extents of a string and painting coverage into an alpha buffer. The
//! default backend is [`FontdueRenderer`]; tests inject synthetic renderers
//! the same way.
//!
//! Sprites are memoized by their full parameter tuple in a bounded
//! [`SpriteCache`] with least-recently-used eviction. Cache hits return the
//! same immutable `Arc`, never a copy; callers must not mutate sprite
//! contents.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::LayoutError;
use crate::grid::Grid;

/// Coverage level at or above which a painted pixel counts as ink.
const ALPHA_THRESHOLD: u8 = 16;

/// Extra buffer margin so antialiased fringes and rounding never clip.
const ANTI_CLIP_MARGIN: u32 = 2;

/// Default sprite cache capacity.
pub const DEFAULT_CACHE_CAPACITY: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

/// Font selection attributes. The renderer backend decides how much of this
/// it can honor; all of it participates in the sprite cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontAttrs {
    pub family: String,
    pub weight: u16,
    pub style: FontStyle,
}

impl Default for FontAttrs {
    fn default() -> Self {
        Self {
            family: "sans-serif".to_string(),
            weight: 400,
            style: FontStyle::Normal,
        }
    }
}

/// Ink extents of a string relative to a pen origin on the baseline.
/// The ink box spans `[pen + left, pen + right]` horizontally and
/// `[baseline - ascent, baseline + descent]` vertically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InkExtents {
    pub left: f32,
    pub right: f32,
    pub ascent: f32,
    pub descent: f32,
}

impl InkExtents {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }
}

/// Grayscale coverage buffer the renderer paints into.
#[derive(Debug, Clone)]
pub struct AlphaBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl AlphaBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        if x < self.width && y < self.height {
            self.data[y as usize * self.width as usize + x as usize]
        } else {
            0
        }
    }

    /// Max-blend a coverage value; overlapping glyph boxes must not erase
    /// each other.
    #[inline]
    pub fn blend_max(&mut self, x: i32, y: i32, value: u8) {
        if x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height {
            let i = y as usize * self.width as usize + x as usize;
            self.data[i] = self.data[i].max(value);
        }
    }
}

/// The external text-rendering capability: measure the ink of a string and
/// paint it into a pixel buffer.
pub trait TextRenderer {
    fn ink_extents(&self, text: &str, attrs: &FontAttrs, size: f32) -> InkExtents;

    /// Paint `text` with the pen at `(pen_x, baseline_y)`.
    fn paint(
        &self,
        text: &str,
        attrs: &FontAttrs,
        size: f32,
        target: &mut AlphaBuffer,
        pen_x: f32,
        baseline_y: f32,
    );
}

/// Glyph rasterization backed by a single loaded [`fontdue::Font`].
///
/// `FontAttrs.family`/`weight`/`style` are not resolved against a system
/// database here; the caller picks the font file. The attributes still key
/// the sprite cache so two fonts never share entries.
pub struct FontdueRenderer {
    font: fontdue::Font,
}

impl FontdueRenderer {
    pub fn from_bytes(data: &[u8]) -> Result<Self, LayoutError> {
        let font = fontdue::Font::from_bytes(data, fontdue::FontSettings::default())
            .map_err(|e| LayoutError::FontLoad(e.to_string()))?;
        Ok(Self { font })
    }
}

impl TextRenderer for FontdueRenderer {
    fn ink_extents(&self, text: &str, _attrs: &FontAttrs, size: f32) -> InkExtents {
        let mut pen = 0.0f32;
        let mut left = f32::INFINITY;
        let mut right = f32::NEG_INFINITY;
        let mut ascent = 0.0f32;
        let mut descent = 0.0f32;
        let mut any_ink = false;
        for ch in text.chars() {
            let m = self.font.metrics(ch, size);
            if m.width > 0 && m.height > 0 {
                any_ink = true;
                left = left.min(pen + m.xmin as f32);
                right = right.max(pen + m.xmin as f32 + m.width as f32);
                ascent = ascent.max((m.ymin + m.height as i32) as f32);
                descent = descent.max(-m.ymin as f32);
            }
            pen += m.advance_width;
        }
        if !any_ink {
            return InkExtents {
                left: 0.0,
                right: 0.0,
                ascent: 0.0,
                descent: 0.0,
            };
        }
        InkExtents {
            left,
            right,
            ascent,
            descent,
        }
    }

    fn paint(
        &self,
        text: &str,
        _attrs: &FontAttrs,
        size: f32,
        target: &mut AlphaBuffer,
        pen_x: f32,
        baseline_y: f32,
    ) {
        let mut pen = pen_x;
        for ch in text.chars() {
            let (m, bitmap) = self.font.rasterize(ch, size);
            let gx = (pen + m.xmin as f32).round() as i32;
            let gy = (baseline_y - (m.ymin + m.height as i32) as f32).round() as i32;
            for y in 0..m.height {
                for x in 0..m.width {
                    let cov = bitmap[y * m.width + x];
                    if cov > 0 {
                        target.blend_max(gx + x as i32, gy + y as i32, cov);
                    }
                }
            }
            pen += m.advance_width;
        }
    }
}

/// Tight ink bounding box inside a sprite mask, inclusive coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

/// The rasterized, cropped, binary ink representation of one word.
/// Immutable once created; shared by `Arc` out of the cache.
#[derive(Debug)]
pub struct Sprite {
    pub width: u32,
    pub height: u32,
    pub mask: Grid,
    pub bbox: BBox,
    pub rotation: f32,
    pub padding: u32,
    pub ink_count: usize,
}

impl Sprite {
    pub fn is_empty(&self) -> bool {
        self.ink_count == 0
    }

    /// Degenerate 1x1 sprite for zero-ink text (e.g. whitespace).
    fn empty(rotation: f32, padding: u32) -> Self {
        Self {
            width: 1,
            height: 1,
            mask: Grid::new(1, 1),
            bbox: BBox {
                x0: 0,
                y0: 0,
                x1: 0,
                y1: 0,
            },
            rotation,
            padding,
            ink_count: 0,
        }
    }
}

/// One sprite request; also the memoization key.
#[derive(Debug, Clone)]
pub struct SpriteParams<'a> {
    pub text: &'a str,
    pub attrs: &'a FontAttrs,
    pub font_size: f32,
    /// Rotation in radians, counterclockwise.
    pub rotation: f32,
    /// Ink dilation radius; this is what keeps placed words apart.
    pub padding: u32,
    /// Supersampling factor, rounded to an integer >= 1.
    pub pixel_density: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SpriteKey {
    text: String,
    attrs: FontAttrs,
    size_bits: u32,
    rotation_bits: u32,
    padding: u32,
    density: u32,
}

impl SpriteKey {
    fn of(params: &SpriteParams<'_>) -> Self {
        Self {
            text: params.text.to_string(),
            attrs: params.attrs.clone(),
            size_bits: params.font_size.to_bits(),
            rotation_bits: params.rotation.to_bits(),
            padding: params.padding,
            density: density_factor(params.pixel_density),
        }
    }
}

fn density_factor(pixel_density: f32) -> u32 {
    (pixel_density.round() as u32).max(1)
}

struct CacheEntry {
    epoch: u64,
    sprite: Arc<Sprite>,
}

/// Bounded sprite cache with least-recently-used eviction. The eviction
/// victim is found by a linear scan over the epochs, which stays cheap at
/// the few hundred entries this cache is sized for.
pub struct SpriteCache {
    entries: IndexMap<SpriteKey, CacheEntry>,
    capacity: usize,
    epoch: u64,
}

impl Default for SpriteCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl SpriteCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            capacity: capacity.max(1),
            epoch: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, params: &SpriteParams<'_>) -> bool {
        self.entries.contains_key(&SpriteKey::of(params))
    }

    /// Fetch the sprite for `params`, rasterizing and inserting on a miss.
    pub fn get_or_rasterize(
        &mut self,
        params: &SpriteParams<'_>,
        renderer: &dyn TextRenderer,
    ) -> Arc<Sprite> {
        self.epoch += 1;
        let key = SpriteKey::of(params);
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.epoch = self.epoch;
            return Arc::clone(&entry.sprite);
        }
        let sprite = Arc::new(rasterize_sprite(params, renderer));
        if self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.entries.insert(
            key,
            CacheEntry {
                epoch: self.epoch,
                sprite: Arc::clone(&sprite),
            },
        );
        sprite
    }

    fn evict_oldest(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.epoch)
            .map(|(k, _)| k.clone());
        if let Some(key) = victim {
            self.entries.swap_remove(&key);
        }
    }
}

/// Rasterize one word into its binary sprite.
///
/// Pipeline: paint glyphs (supersampled by the density factor) into an alpha
/// buffer sized to the ink extents plus padding and an anti-clip margin;
/// rotate by inverse nearest sampling; downsample; binarize; dilate the ink
/// by `padding`; crop to the tight ink box; re-pad with empty cells so the
/// footprint keeps its spacing margin.
pub fn rasterize_sprite(params: &SpriteParams<'_>, renderer: &dyn TextRenderer) -> Sprite {
    let density = density_factor(params.pixel_density);
    let paint_size = params.font_size * density as f32;
    let ext = renderer.ink_extents(params.text, params.attrs, paint_size);
    let ink_w = ext.width().ceil() as i64;
    let ink_h = ext.height().ceil() as i64;
    if ink_w <= 0 || ink_h <= 0 {
        return Sprite::empty(params.rotation, params.padding);
    }

    let margin = (params.padding + ANTI_CLIP_MARGIN) * density;
    let buf_w = ink_w as u32 + 2 * margin;
    let buf_h = ink_h as u32 + 2 * margin;
    let mut alpha = AlphaBuffer::new(buf_w, buf_h);
    let pen_x = margin as f32 - ext.left;
    let baseline_y = margin as f32 + ext.ascent;
    renderer.paint(
        params.text,
        params.attrs,
        paint_size,
        &mut alpha,
        pen_x,
        baseline_y,
    );

    if params.rotation != 0.0 {
        alpha = rotate_buffer(&alpha, params.rotation);
    }
    if density > 1 {
        alpha = downsample(&alpha, density);
    }

    binarize_and_crop(&alpha, params.rotation, params.padding)
}

/// Rotate a coverage buffer counterclockwise, resizing to the rotated
/// extents. Destination pixels sample the source with inverse nearest
/// mapping.
fn rotate_buffer(src: &AlphaBuffer, rotation: f32) -> AlphaBuffer {
    let (sin, cos) = rotation.sin_cos();
    let w = src.width() as f32;
    let h = src.height() as f32;
    // Rotated extents of the source rectangle.
    let out_w = (w * cos.abs() + h * sin.abs()).ceil() as u32;
    let out_h = (w * sin.abs() + h * cos.abs()).ceil() as u32;
    let (scx, scy) = (w / 2.0, h / 2.0);
    let (dcx, dcy) = (out_w as f32 / 2.0, out_h as f32 / 2.0);

    let mut out = AlphaBuffer::new(out_w, out_h);
    for y in 0..out_h {
        for x in 0..out_w {
            let dx = x as f32 + 0.5 - dcx;
            let dy = y as f32 + 0.5 - dcy;
            // Inverse rotation back into source space.
            let sx = dx * cos + dy * sin + scx;
            let sy = -dx * sin + dy * cos + scy;
            if sx >= 0.0 && sy >= 0.0 {
                let v = src.get(sx as u32, sy as u32);
                if v > 0 {
                    out.blend_max(x as i32, y as i32, v);
                }
            }
        }
    }
    out
}

/// Block-average a supersampled buffer down by an integer factor.
fn downsample(src: &AlphaBuffer, factor: u32) -> AlphaBuffer {
    let out_w = src.width().div_ceil(factor);
    let out_h = src.height().div_ceil(factor);
    let mut out = AlphaBuffer::new(out_w, out_h);
    for y in 0..out_h {
        for x in 0..out_w {
            let mut sum = 0u32;
            for sy in 0..factor {
                for sx in 0..factor {
                    sum += src.get(x * factor + sx, y * factor + sy) as u32;
                }
            }
            let avg = (sum / (factor * factor)) as u8;
            if avg > 0 {
                out.blend_max(x as i32, y as i32, avg);
            }
        }
    }
    out
}

fn binarize_and_crop(alpha: &AlphaBuffer, rotation: f32, padding: u32) -> Sprite {
    let w = alpha.width();
    let h = alpha.height();
    let mut ink = Grid::new(w, h);
    for y in 0..h {
        for x in 0..w {
            if alpha.get(x, y) >= ALPHA_THRESHOLD {
                ink.set(x, y);
            }
        }
    }

    // Padding dilates the ink so collision keeps neighboring words at a
    // distance; transparent cells are never collision-tested.
    let ink = if padding > 0 {
        dilate_square(&ink, padding)
    } else {
        ink
    };

    // Tight bounding box of the (dilated) ink.
    let mut x0 = w;
    let mut y0 = h;
    let mut x1 = 0u32;
    let mut y1 = 0u32;
    let mut ink_count = 0usize;
    for y in 0..h {
        for x in 0..w {
            if ink.is_set(x, y) {
                ink_count += 1;
                x0 = x0.min(x);
                y0 = y0.min(y);
                x1 = x1.max(x);
                y1 = y1.max(y);
            }
        }
    }
    if ink_count == 0 {
        return Sprite::empty(rotation, padding);
    }

    let crop_w = x1 - x0 + 1;
    let crop_h = y1 - y0 + 1;
    let out_w = crop_w + 2 * padding;
    let out_h = crop_h + 2 * padding;
    let mut mask = Grid::new(out_w, out_h);
    for y in 0..crop_h {
        for x in 0..crop_w {
            if ink.is_set(x0 + x, y0 + y) {
                mask.set(x + padding, y + padding);
            }
        }
    }

    Sprite {
        width: out_w,
        height: out_h,
        mask,
        bbox: BBox {
            x0: padding,
            y0: padding,
            x1: padding + crop_w - 1,
            y1: padding + crop_h - 1,
        },
        rotation,
        padding,
        ink_count,
    }
}

/// Dilate ink with a square structuring element of the given radius.
fn dilate_square(grid: &Grid, radius: u32) -> Grid {
    let w = grid.width();
    let h = grid.height();
    let r = radius as i32;
    let mut out = Grid::new(w, h);
    for y in 0..h {
        for x in 0..w {
            if !grid.is_set(x, y) {
                continue;
            }
            for dy in -r..=r {
                for dx in -r..=r {
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    if nx >= 0 && ny >= 0 {
                        out.set(nx as u32, ny as u32);
                    }
                }
            }
        }
    }
    out
}
