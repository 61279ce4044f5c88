//! Spiral-search word placement with pixel-exact collision testing.
//!
//! Words are tried along an Archimedean spiral from the canvas center (or a
//! caller-supplied anchor). A candidate position is accepted only when the
//! sprite's footprint lies fully inside the canvas and every ink pixel lands
//! on an allowed, unoccupied cell; transparent sprite pixels are never
//! tested, which is what lets irregular glyph shapes interlock tightly.
//! Accepted sprites are OR-ed into the occupancy grid, which only ever gains
//! bits within a pass.
//!
//! Callers are expected to pre-sort words by descending size so important
//! words claim central positions first. A word that exhausts its candidate
//! budget is omitted from this call's result; retry policy (shrinking,
//! forcing) lives in [`crate::adaptive`].

use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::LayoutError;
use crate::grid::Grid;
use crate::raster::{FontAttrs, Sprite, SpriteCache, SpriteParams, TextRenderer};

/// Angular candidate spacing along the spiral, about one per degree.
const ANGLE_STEP: f32 = std::f32::consts::PI / 180.0;

/// Marks a synthesized coverage-fill duplicate rather than an input word.
pub const DUPLICATE_INDEX: i32 = -1;

/// One word to place, already sized.
#[derive(Debug, Clone)]
pub struct WordRequest {
    pub text: String,
    pub font_size: f32,
    /// Rotation in radians.
    pub rotation: f32,
    pub color: String,
    /// Index of the word in the caller's input, or [`DUPLICATE_INDEX`].
    pub original_index: i32,
}

/// A committed placement. `(x, y)` is the sprite's top-left alignment point
/// in canvas coordinates. The sprite dimensions are copied out so the record
/// stays complete even if the cache later evicts the sprite entry.
#[derive(Debug, Clone, Serialize)]
pub struct Placement {
    pub text: String,
    pub x: i32,
    pub y: i32,
    #[serde(skip)]
    pub sprite: Arc<Sprite>,
    pub width: u32,
    pub height: u32,
    pub font_size: f32,
    pub rotation: f32,
    pub color: String,
    pub original_index: i32,
}

/// Options for one placement pass.
#[derive(Debug, Clone)]
pub struct PlaceOptions<'a> {
    pub width: u32,
    pub height: u32,
    /// Region words may occupy; `None` allows the whole canvas.
    pub allowed_mask: Option<&'a Grid>,
    pub attrs: &'a FontAttrs,
    /// Ink dilation radius keeping placed words apart.
    pub word_padding: u32,
    pub max_tries_per_word: u32,
    /// Spiral radius growth per radian of angle.
    pub spiral_step: f32,
    /// Hard cap on spiral angle, in full turns.
    pub spiral_turns: f32,
    /// Uniform random offset applied to each word's spiral center.
    pub start_jitter: f32,
    pub pixel_density: f32,
    /// Preferred spiral center; defaults to the canvas center.
    pub anchor: Option<(f32, f32)>,
    /// Seed occupancy for incremental packing onto a shared canvas.
    pub existing_occupancy: Option<Grid>,
}

impl<'a> PlaceOptions<'a> {
    pub fn new(width: u32, height: u32, attrs: &'a FontAttrs) -> Self {
        Self {
            width,
            height,
            allowed_mask: None,
            attrs,
            word_padding: 1,
            max_tries_per_word: 4000,
            spiral_step: 2.0,
            spiral_turns: 10.0,
            start_jitter: 0.0,
            pixel_density: 1.0,
            anchor: None,
            existing_occupancy: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlaceStats {
    pub placed_count: usize,
    pub total_count: usize,
}

/// Result of a placement pass. The occupancy grid is moved out so the next
/// phase can keep packing onto the same canvas without copying.
#[derive(Debug)]
pub struct PlaceOutcome {
    pub placements: Vec<Placement>,
    pub occupancy: Grid,
    pub stats: PlaceStats,
}

/// Place `words` in order. See the module documentation for the acceptance
/// rule and failure semantics.
pub fn place<R: Rng>(
    words: &[WordRequest],
    renderer: &dyn TextRenderer,
    cache: &mut SpriteCache,
    rng: &mut R,
    mut options: PlaceOptions<'_>,
) -> Result<PlaceOutcome, LayoutError> {
    let width = options.width;
    let height = options.height;

    if let Some(mask) = options.allowed_mask {
        if mask.width() != width || mask.height() != height {
            return Err(LayoutError::MaskDimensionMismatch {
                len: mask.width() as usize * mask.height() as usize,
                width,
                height,
            });
        }
        if mask.count_set() == 0 {
            return Err(LayoutError::EmptyAllowedRegion);
        }
    }

    let mut occupancy = match options.existing_occupancy.take() {
        Some(grid) => {
            if grid.width() != width || grid.height() != height {
                return Err(LayoutError::MaskDimensionMismatch {
                    len: grid.width() as usize * grid.height() as usize,
                    width,
                    height,
                });
            }
            grid
        }
        None => Grid::new(width, height),
    };

    let (center_x, center_y) = options
        .anchor
        .unwrap_or((width as f32 / 2.0, height as f32 / 2.0));

    let mut placements = Vec::new();
    for word in words {
        let sprite = cache.get_or_rasterize(
            &SpriteParams {
                text: &word.text,
                attrs: options.attrs,
                font_size: word.font_size,
                rotation: word.rotation,
                padding: options.word_padding,
                pixel_density: options.pixel_density,
            },
            renderer,
        );
        if sprite.width > width || sprite.height > height {
            warn!(
                text = word.text.as_str(),
                sprite_w = sprite.width,
                sprite_h = sprite.height,
                "sprite exceeds canvas, skipping word"
            );
            continue;
        }

        let jitter = options.start_jitter;
        let (jx, jy) = if jitter > 0.0 {
            (
                rng.random_range(-jitter..=jitter),
                rng.random_range(-jitter..=jitter),
            )
        } else {
            (0.0, 0.0)
        };
        let cx = center_x + jx;
        let cy = center_y + jy;

        if let Some((x, y)) = spiral_search(&sprite, cx, cy, options.allowed_mask, &occupancy, &options)
        {
            commit(&sprite, x, y, &mut occupancy);
            placements.push(Placement {
                text: word.text.clone(),
                x,
                y,
                width: sprite.width,
                height: sprite.height,
                sprite,
                font_size: word.font_size,
                rotation: word.rotation,
                color: word.color.clone(),
                original_index: word.original_index,
            });
        } else {
            debug!(text = word.text.as_str(), "no legal position on spiral");
        }
    }

    let stats = PlaceStats {
        placed_count: placements.len(),
        total_count: words.len(),
    };
    Ok(PlaceOutcome {
        placements,
        occupancy,
        stats,
    })
}

/// Walk the Archimedean spiral and return the first accepted top-left
/// position, if any.
fn spiral_search(
    sprite: &Sprite,
    cx: f32,
    cy: f32,
    allowed: Option<&Grid>,
    occupancy: &Grid,
    options: &PlaceOptions<'_>,
) -> Option<(i32, i32)> {
    let max_angle = options.spiral_turns * std::f32::consts::TAU;
    let half_w = sprite.width as f32 / 2.0;
    let half_h = sprite.height as f32 / 2.0;

    let mut t = 0.0f32;
    let mut tries = 0u32;
    while t <= max_angle && tries < options.max_tries_per_word {
        let r = options.spiral_step * t;
        let x = (cx + r * t.cos() - half_w).round() as i32;
        let y = (cy + r * t.sin() - half_h).round() as i32;
        tries += 1;
        t += ANGLE_STEP;
        if fits(sprite, x, y, allowed, occupancy, options.width, options.height) {
            return Some((x, y));
        }
    }
    None
}

/// Acceptance test: footprint inside the canvas, and every ink pixel on an
/// allowed, unoccupied cell. Rejection short-circuits at the first
/// violating pixel.
fn fits(
    sprite: &Sprite,
    x: i32,
    y: i32,
    allowed: Option<&Grid>,
    occupancy: &Grid,
    width: u32,
    height: u32,
) -> bool {
    if x < 0 || y < 0 {
        return false;
    }
    if x as u32 + sprite.width > width || y as u32 + sprite.height > height {
        return false;
    }
    let b = sprite.bbox;
    for sy in b.y0..=b.y1 {
        let gy = y as u32 + sy;
        for sx in b.x0..=b.x1 {
            if !sprite.mask.is_set(sx, sy) {
                continue;
            }
            let gx = x as u32 + sx;
            if let Some(mask) = allowed {
                if !mask.is_set(gx, gy) {
                    return false;
                }
            }
            if occupancy.is_set(gx, gy) {
                return false;
            }
        }
    }
    true
}

/// OR the sprite's ink into the occupancy grid.
fn commit(sprite: &Sprite, x: i32, y: i32, occupancy: &mut Grid) {
    let b = sprite.bbox;
    for sy in b.y0..=b.y1 {
        for sx in b.x0..=b.x1 {
            if sprite.mask.is_set(sx, sy) {
                occupancy.set(x as u32 + sx, y as u32 + sy);
            }
        }
    }
}
