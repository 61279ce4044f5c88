//! Two-phase layout orchestration on top of the placement engine.
//!
//! Phase 1 guarantees that every word appears: words are processed in
//! descending weight order, their sizes squeezed through a nonlinear
//! compression, and each word walks an explicit retry ladder: shrink by a
//! fixed factor down to a floor, then a force pass with relaxed padding and
//! a denser spiral down to a lower floor. Phase 2 tops up area coverage by
//! packing duplicates of low-weight words into the largest remaining gaps
//! until a target ratio or a duplicate budget is reached.
//!
//! Both phases share one occupancy grid, moved (never copied) through every
//! engine call, so words always pack around everything placed before them.

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::color::ColorScheme;
use crate::error::LayoutError;
use crate::grid::Grid;
use crate::place::{self, DUPLICATE_INDEX, PlaceOptions, Placement, WordRequest};
use crate::raster::{FontAttrs, SpriteCache, TextRenderer};

/// Gap rectangles narrower than this are not worth a duplicate.
const MIN_FILL_WIDTH: u32 = 8;

/// Mean glyph advance as a fraction of the font size, used to size a
/// duplicate to a gap width from its character count.
const MEAN_ADVANCE_EM: f32 = 0.6;

/// One input word with its upstream-computed base size.
#[derive(Debug, Clone)]
pub struct SizedWord {
    pub text: String,
    pub weight: f32,
    pub base_size: f32,
}

/// Layout options for one render request.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    pub width: u32,
    pub height: u32,
    pub attrs: FontAttrs,
    pub word_padding: u32,
    pub max_tries_per_word: u32,
    pub spiral_step: f32,
    pub spiral_turns: f32,
    pub start_jitter: f32,
    pub pixel_density: f32,
    /// Rotation applied to every sprite, in radians.
    pub rotation: f32,
    /// Enables the shrink/force retry ladder and the coverage-fill phase.
    pub adaptive_enabled: bool,
    /// Target coverage ratio in `[0, 1]`; 0 disables the fill phase.
    pub target_coverage: f32,
    /// Compression exponent in `[0.3, 1.0]`; smaller compresses harder.
    pub nonlinear_power: f32,
    /// Smallest size tried before entering the force pass.
    pub min_font_size: f32,
    /// Smallest size the force pass may degrade to.
    pub force_floor_size: f32,
    /// Multiplicative shrink per failed attempt.
    pub shrink_factor: f32,
    /// Duplicate budget multiplier: budget = word count x this.
    pub fill_multiplier: u32,
    pub scheme: ColorScheme,
    /// Emit a sampled point set of the allowed region for visualization.
    pub debug_mask: bool,
}

impl LayoutConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            attrs: FontAttrs::default(),
            word_padding: 1,
            max_tries_per_word: 4000,
            spiral_step: 2.0,
            spiral_turns: 10.0,
            start_jitter: 0.0,
            pixel_density: 1.0,
            rotation: 0.0,
            adaptive_enabled: true,
            target_coverage: 0.0,
            nonlinear_power: 0.6,
            min_font_size: 4.0,
            force_floor_size: 2.0,
            shrink_factor: 0.7,
            fill_multiplier: 4,
            scheme: ColorScheme::default(),
            debug_mask: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LayoutStats {
    /// Real input words placed; fill duplicates are not counted here.
    pub placed_count: usize,
    pub total_count: usize,
    pub coverage_ratio: f32,
}

/// Area accounting over the allowed region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoverageStats {
    pub allowed_area: usize,
    pub occupied_area: usize,
    pub ratio: f32,
}

impl CoverageStats {
    /// Measure occupancy against the allowed region (whole canvas when no
    /// mask is supplied).
    pub fn measure(occupancy: &Grid, allowed: Option<&Grid>) -> Self {
        let allowed_area = match allowed {
            Some(mask) => mask.count_set(),
            None => occupancy.width() as usize * occupancy.height() as usize,
        };
        let occupied_area = match allowed {
            Some(mask) => {
                let mut n = 0;
                for y in 0..occupancy.height() {
                    let occ = occupancy.row(y);
                    let m = mask.row(y);
                    n += occ
                        .iter()
                        .zip(m.iter())
                        .filter(|(o, a)| **o != 0 && **a != 0)
                        .count();
                }
                n
            }
            None => occupancy.count_set(),
        };
        let ratio = if allowed_area > 0 {
            occupied_area as f32 / allowed_area as f32
        } else {
            0.0
        };
        Self {
            allowed_area,
            occupied_area,
            ratio,
        }
    }
}

#[derive(Debug)]
pub struct LayoutResult {
    pub placements: Vec<Placement>,
    pub stats: LayoutStats,
    /// Sampled allowed-region points, present when `debug_mask` was set.
    pub debug_points: Option<Vec<(u32, u32)>>,
}

/// Retry ladder for a single word.
///
/// Attempts run at the starting size, shrink multiplicatively to the normal
/// floor, then switch to forced attempts (relaxed padding, denser spiral)
/// that shrink further to the force floor. After the force floor fails the
/// ladder is exhausted and the word is omitted.
#[derive(Debug, Clone, Copy)]
pub struct ShrinkPlan {
    size: f32,
    forced: bool,
    exhausted: bool,
    floor: f32,
    force_floor: f32,
    shrink: f32,
}

impl ShrinkPlan {
    pub fn new(initial: f32, config: &LayoutConfig) -> Self {
        Self {
            size: initial.max(config.force_floor_size),
            forced: false,
            exhausted: false,
            floor: config.min_font_size,
            force_floor: config.force_floor_size,
            shrink: config.shrink_factor,
        }
    }

    /// The attempt to run next, or `None` once the ladder is exhausted.
    pub fn attempt(&self) -> Option<(f32, bool)> {
        (!self.exhausted).then_some((self.size, self.forced))
    }

    /// Record a failed attempt and move to the next rung.
    pub fn fail(&mut self) {
        let floor = if self.forced {
            self.force_floor
        } else {
            self.floor
        };
        let next = self.size * self.shrink;
        if next >= floor {
            self.size = next;
        } else if self.size > floor {
            // Last rung before the floor: try the floor itself.
            self.size = floor;
        } else if self.forced {
            self.exhausted = true;
        } else {
            // Normal ladder done; re-enter at the same size with force
            // relaxations.
            self.forced = true;
        }
    }
}

/// Run the full two-phase layout. Returns every committed placement in
/// commit order (fill duplicates after real words) plus final statistics.
pub fn generate_layout<R: Rng>(
    words: &[SizedWord],
    renderer: &dyn TextRenderer,
    cache: &mut SpriteCache,
    rng: &mut R,
    allowed_mask: Option<&Grid>,
    config: &LayoutConfig,
) -> Result<LayoutResult, LayoutError> {
    if let Some(mask) = allowed_mask {
        if mask.width() != config.width || mask.height() != config.height {
            return Err(LayoutError::MaskDimensionMismatch {
                len: mask.width() as usize * mask.height() as usize,
                width: config.width,
                height: config.height,
            });
        }
        if mask.count_set() == 0 {
            return Err(LayoutError::EmptyAllowedRegion);
        }
    }

    let debug_points = config
        .debug_mask
        .then(|| sample_mask_points(config, allowed_mask));

    if words.is_empty() {
        return Ok(LayoutResult {
            placements: Vec::new(),
            stats: LayoutStats {
                placed_count: 0,
                total_count: 0,
                coverage_ratio: 0.0,
            },
            debug_points,
        });
    }

    // Largest first, stable on ties so input order still matters.
    let mut order: Vec<usize> = (0..words.len()).collect();
    order.sort_by(|&a, &b| {
        words[b]
            .weight
            .partial_cmp(&words[a].weight)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let band = SizeBand::of(words);
    let mut occupancy = Grid::new(config.width, config.height);
    let mut placements: Vec<Placement> = Vec::new();

    for &index in &order {
        let word = &words[index];
        let color = config.scheme.indexed(index);
        let placed = if config.adaptive_enabled {
            let start = band.compress(word.base_size, config.nonlinear_power);
            place_with_ladder(
                word, index, &color, start, renderer, cache, rng, allowed_mask, config,
                &mut occupancy, &mut placements,
            )?
        } else {
            attempt_one(
                word,
                index,
                &color,
                word.base_size,
                false,
                renderer,
                cache,
                rng,
                allowed_mask,
                config,
                &mut occupancy,
                &mut placements,
            )?
        };
        if !placed {
            warn!(
                text = word.text.as_str(),
                "word could not be placed and was omitted"
            );
        }
    }

    let placed_count = placements
        .iter()
        .filter(|p| p.original_index != DUPLICATE_INDEX)
        .count();

    if config.adaptive_enabled && config.target_coverage > 0.0 {
        fill_coverage(
            words, renderer, cache, rng, allowed_mask, config, &mut occupancy, &mut placements,
        )?;
    }

    let coverage = CoverageStats::measure(&occupancy, allowed_mask);
    info!(
        placed = placed_count,
        total = words.len(),
        coverage = coverage.ratio,
        "layout finished"
    );
    Ok(LayoutResult {
        placements,
        stats: LayoutStats {
            placed_count,
            total_count: words.len(),
            coverage_ratio: coverage.ratio,
        },
        debug_points,
    })
}

/// Input size band for the nonlinear compression.
#[derive(Debug, Clone, Copy)]
struct SizeBand {
    min: f32,
    max: f32,
}

impl SizeBand {
    fn of(words: &[SizedWord]) -> Self {
        let min = words
            .iter()
            .map(|w| w.base_size)
            .fold(f32::INFINITY, f32::min);
        let max = words
            .iter()
            .map(|w| w.base_size)
            .fold(f32::NEG_INFINITY, f32::max);
        Self { min, max }
    }

    /// Power remap inside the band: rank order is preserved while the
    /// spread between large and small words narrows (power < 1).
    fn compress(&self, size: f32, power: f32) -> f32 {
        let range = self.max - self.min;
        if range <= 0.0 {
            return size;
        }
        let norm = ((size - self.min) / range).clamp(0.0, 1.0);
        self.min + norm.powf(power) * range
    }
}

#[allow(clippy::too_many_arguments)]
fn place_with_ladder<R: Rng>(
    word: &SizedWord,
    index: usize,
    color: &str,
    start_size: f32,
    renderer: &dyn TextRenderer,
    cache: &mut SpriteCache,
    rng: &mut R,
    allowed_mask: Option<&Grid>,
    config: &LayoutConfig,
    occupancy: &mut Grid,
    placements: &mut Vec<Placement>,
) -> Result<bool, LayoutError> {
    let mut plan = ShrinkPlan::new(start_size, config);
    let mut entered_force = false;
    while let Some((size, forced)) = plan.attempt() {
        if forced && !entered_force {
            entered_force = true;
            debug!(text = word.text.as_str(), size, "entering force pass");
        }
        let placed = attempt_one(
            word, index, color, size, forced, renderer, cache, rng, allowed_mask, config,
            occupancy, placements,
        )?;
        if placed {
            return Ok(true);
        }
        plan.fail();
    }
    Ok(false)
}

/// One engine call for one word at one size. On success the placement is
/// appended and the shared occupancy updated.
#[allow(clippy::too_many_arguments)]
fn attempt_one<R: Rng>(
    word: &SizedWord,
    index: usize,
    color: &str,
    size: f32,
    forced: bool,
    renderer: &dyn TextRenderer,
    cache: &mut SpriteCache,
    rng: &mut R,
    allowed_mask: Option<&Grid>,
    config: &LayoutConfig,
    occupancy: &mut Grid,
    placements: &mut Vec<Placement>,
) -> Result<bool, LayoutError> {
    let request = WordRequest {
        text: word.text.clone(),
        font_size: size,
        rotation: config.rotation,
        color: color.to_string(),
        original_index: index as i32,
    };
    let mut options = PlaceOptions::new(config.width, config.height, &config.attrs);
    options.allowed_mask = allowed_mask;
    options.word_padding = if forced { 0 } else { config.word_padding };
    options.max_tries_per_word = if forced {
        config.max_tries_per_word * 2
    } else {
        config.max_tries_per_word
    };
    options.spiral_step = if forced {
        config.spiral_step * 0.5
    } else {
        config.spiral_step
    };
    options.spiral_turns = if forced {
        config.spiral_turns * 2.0
    } else {
        config.spiral_turns
    };
    options.start_jitter = config.start_jitter;
    options.pixel_density = config.pixel_density;
    options.existing_occupancy = Some(std::mem::replace(occupancy, Grid::new(0, 0)));

    let outcome = place::place(std::slice::from_ref(&request), renderer, cache, rng, options)?;
    *occupancy = outcome.occupancy;
    if let Some(placement) = outcome.placements.into_iter().next() {
        placements.push(placement);
        return Ok(true);
    }
    Ok(false)
}

/// A free axis-aligned gap found in the occupancy grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GapRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

/// Phase 2: pack duplicates of low-weight words into the widest remaining
/// gaps until the coverage target or the duplicate budget is reached.
#[allow(clippy::too_many_arguments)]
fn fill_coverage<R: Rng>(
    words: &[SizedWord],
    renderer: &dyn TextRenderer,
    cache: &mut SpriteCache,
    rng: &mut R,
    allowed_mask: Option<&Grid>,
    config: &LayoutConfig,
    occupancy: &mut Grid,
    placements: &mut Vec<Placement>,
) -> Result<(), LayoutError> {
    // Lower-weight tail the duplicates are drawn from.
    let mut by_weight: Vec<usize> = (0..words.len()).collect();
    by_weight.sort_by(|&a, &b| {
        words[a]
            .weight
            .partial_cmp(&words[b].weight)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let tail_len = (words.len() * 2 / 5).max(1);
    let tail = &by_weight[..tail_len];

    let band = SizeBand::of(words);
    let size_cap = band.compress(band.min, config.nonlinear_power);

    let mut budget = words.len() as u32 * config.fill_multiplier;
    let mut coverage = CoverageStats::measure(occupancy, allowed_mask);
    let mut added = 0usize;

    while coverage.ratio < config.target_coverage && budget > 0 {
        budget -= 1;
        let Some(gap) = widest_free_gap(occupancy, allowed_mask) else {
            break;
        };
        if gap.width < MIN_FILL_WIDTH {
            break;
        }

        let word = &words[tail[rng.random_range(0..tail.len())]];
        let chars = word.text.chars().count().max(1) as f32;
        let size = (gap.width as f32 / (chars * MEAN_ADVANCE_EM))
            .min(gap.height as f32)
            .min(size_cap);
        if size < config.min_font_size {
            break;
        }

        let request = WordRequest {
            text: word.text.clone(),
            font_size: size,
            rotation: config.rotation,
            color: config.scheme.random(rng),
            original_index: DUPLICATE_INDEX,
        };
        let mut options = PlaceOptions::new(config.width, config.height, &config.attrs);
        options.allowed_mask = allowed_mask;
        options.word_padding = config.word_padding;
        options.max_tries_per_word = config.max_tries_per_word;
        options.spiral_step = config.spiral_step;
        options.spiral_turns = config.spiral_turns;
        options.pixel_density = config.pixel_density;
        options.anchor = Some((
            gap.x as f32 + gap.width as f32 / 2.0,
            gap.y as f32 + gap.height as f32 / 2.0,
        ));
        options.existing_occupancy = Some(std::mem::replace(occupancy, Grid::new(0, 0)));

        let outcome = place::place(std::slice::from_ref(&request), renderer, cache, rng, options)?;
        *occupancy = outcome.occupancy;
        if let Some(placement) = outcome.placements.into_iter().next() {
            placements.push(placement);
            added += 1;
            coverage = CoverageStats::measure(occupancy, allowed_mask);
        }
    }
    debug!(
        duplicates = added,
        coverage = coverage.ratio,
        "coverage fill finished"
    );
    Ok(())
}

/// Find the widest contiguous free-and-allowed horizontal run, then grow it
/// upward and downward while every full row of that span stays free.
fn widest_free_gap(occupancy: &Grid, allowed: Option<&Grid>) -> Option<GapRect> {
    let width = occupancy.width();
    let height = occupancy.height();
    let free_at = |x: u32, y: u32| -> bool {
        !occupancy.is_set(x, y) && allowed.is_none_or(|m| m.is_set(x, y))
    };

    let mut best: Option<(u32, u32, u32)> = None; // (x, y, run length)
    for y in 0..height {
        let mut run_start = 0u32;
        let mut run_len = 0u32;
        for x in 0..width {
            if free_at(x, y) {
                if run_len == 0 {
                    run_start = x;
                }
                run_len += 1;
                if best.is_none_or(|(_, _, len)| run_len > len) {
                    best = Some((run_start, y, run_len));
                }
            } else {
                run_len = 0;
            }
        }
    }

    let (x, seed_y, len) = best?;
    let row_free = |y: u32| (x..x + len).all(|cx| free_at(cx, y));
    let mut top = seed_y;
    while top > 0 && row_free(top - 1) {
        top -= 1;
    }
    let mut bottom = seed_y;
    while bottom + 1 < height && row_free(bottom + 1) {
        bottom += 1;
    }
    Some(GapRect {
        x,
        y: top,
        width: len,
        height: bottom - top + 1,
    })
}

/// Sampled allowed-region points for visualization, bounded in count.
fn sample_mask_points(config: &LayoutConfig, allowed: Option<&Grid>) -> Vec<(u32, u32)> {
    let stride = (config.width.max(config.height) / 64).max(1);
    let mut points = Vec::new();
    for y in (0..config.height).step_by(stride as usize) {
        for x in (0..config.width).step_by(stride as usize) {
            let inside = allowed.is_none_or(|m| m.is_set(x, y));
            if inside {
                points.push((x, y));
            }
        }
    }
    points
}
