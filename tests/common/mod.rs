//! Shared test backend: a renderer that paints every non-space character as
//! a solid block, so sprite geometry is exact and no font file is needed.

use inkcloud::place::Placement;
use inkcloud::raster::{AlphaBuffer, FontAttrs, InkExtents, TextRenderer};

/// Canvas coordinates of every ink pixel of a committed placement.
#[allow(dead_code)]
pub fn ink_pixels(p: &Placement) -> Vec<(i32, i32)> {
    let b = p.sprite.bbox;
    let mut out = Vec::new();
    for sy in b.y0..=b.y1 {
        for sx in b.x0..=b.x1 {
            if p.sprite.mask.is_set(sx, sy) {
                out.push((p.x + sx as i32, p.y + sy as i32));
            }
        }
    }
    out
}

/// Each character advances by `0.6 * size` and paints a solid block one
/// pixel narrower than its advance, full ascent-to-descent height.
pub struct BlockRenderer;

impl BlockRenderer {
    pub fn advance(size: f32) -> f32 {
        (size * 0.6).round()
    }
}

impl TextRenderer for BlockRenderer {
    fn ink_extents(&self, text: &str, _attrs: &FontAttrs, size: f32) -> InkExtents {
        let inked = text.chars().filter(|c| !c.is_whitespace()).count();
        if inked == 0 {
            return InkExtents {
                left: 0.0,
                right: 0.0,
                ascent: 0.0,
                descent: 0.0,
            };
        }
        let chars = text.chars().count() as f32;
        InkExtents {
            left: 0.0,
            right: chars * Self::advance(size),
            ascent: (size * 0.8).round(),
            descent: (size * 0.2).round(),
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
        let advance = Self::advance(size);
        let ascent = (size * 0.8).round();
        let descent = (size * 0.2).round();
        let top = (baseline_y - ascent).round() as i32;
        let bottom = (baseline_y + descent).round() as i32;
        for (i, ch) in text.chars().enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            let x0 = (pen_x + i as f32 * advance).round() as i32;
            let x1 = x0 + advance as i32 - 1;
            for y in top..bottom {
                for x in x0..x1 {
                    target.blend_max(x, y, 255);
                }
            }
        }
    }
}
