mod common;

use std::sync::Arc;

use common::BlockRenderer;
use inkcloud::raster::{FontAttrs, SpriteCache, SpriteParams, rasterize_sprite};

fn params<'a>(text: &'a str, attrs: &'a FontAttrs, size: f32, padding: u32) -> SpriteParams<'a> {
    SpriteParams {
        text,
        attrs,
        font_size: size,
        rotation: 0.0,
        padding,
        pixel_density: 1.0,
    }
}

#[test]
fn sprite_is_cropped_tight() {
    let attrs = FontAttrs::default();
    // One block character: 6px advance paints a 5px-wide column, 10px tall.
    let sprite = rasterize_sprite(&params("A", &attrs, 10.0, 0), &BlockRenderer);
    assert_eq!(sprite.width, 5);
    assert_eq!(sprite.height, 10);
    assert_eq!(sprite.ink_count, 50);
    assert_eq!(sprite.bbox.x0, 0);
    assert_eq!(sprite.bbox.x1, 4);
    assert_eq!(sprite.bbox.y1, 9);
}

#[test]
fn padding_dilates_ink_and_repads_margin() {
    let attrs = FontAttrs::default();
    let sprite = rasterize_sprite(&params("A", &attrs, 10.0, 1), &BlockRenderer);
    // Ink dilated by 1 on each side (7x12), plus a 1-cell empty margin.
    assert_eq!(sprite.width, 9);
    assert_eq!(sprite.height, 14);
    assert_eq!(sprite.ink_count, 7 * 12);
    assert_eq!(sprite.bbox.x0, 1);
    assert_eq!(sprite.bbox.y0, 1);
    assert_eq!(sprite.bbox.x1, 7);
    assert_eq!(sprite.bbox.y1, 12);
    // The re-padded border rows stay transparent.
    assert!(!sprite.mask.is_set(0, 0));
    assert!(!sprite.mask.is_set(8, 13));
}

#[test]
fn whitespace_yields_degenerate_sprite() {
    let attrs = FontAttrs::default();
    let sprite = rasterize_sprite(&params("   ", &attrs, 24.0, 2), &BlockRenderer);
    assert!(sprite.is_empty());
    assert_eq!((sprite.width, sprite.height), (1, 1));
    assert_eq!(sprite.ink_count, 0);
}

#[test]
fn rotation_swaps_extents() {
    let attrs = FontAttrs::default();
    let upright = rasterize_sprite(&params("AB", &attrs, 10.0, 0), &BlockRenderer);
    let turned = rasterize_sprite(
        &SpriteParams {
            rotation: std::f32::consts::FRAC_PI_2,
            ..params("AB", &attrs, 10.0, 0)
        },
        &BlockRenderer,
    );
    assert!(turned.ink_count > 0);
    assert!(
        (turned.width as i32 - upright.height as i32).abs() <= 2,
        "rotated width {} vs upright height {}",
        turned.width,
        upright.height
    );
    assert!(
        (turned.height as i32 - upright.width as i32).abs() <= 2,
        "rotated height {} vs upright width {}",
        turned.height,
        upright.width
    );
}

#[test]
fn supersampling_matches_base_resolution() {
    let attrs = FontAttrs::default();
    let dense = rasterize_sprite(
        &SpriteParams {
            pixel_density: 2.0,
            ..params("A", &attrs, 10.0, 0)
        },
        &BlockRenderer,
    );
    assert_eq!(dense.height, 10);
    assert!(
        (5..=7).contains(&dense.width),
        "downsampled width {} should stay near the base raster",
        dense.width
    );
}

#[test]
fn cache_hits_return_the_same_sprite() {
    let attrs = FontAttrs::default();
    let mut cache = SpriteCache::new(8);
    let a = cache.get_or_rasterize(&params("word", &attrs, 12.0, 1), &BlockRenderer);
    let b = cache.get_or_rasterize(&params("word", &attrs, 12.0, 1), &BlockRenderer);
    assert!(Arc::ptr_eq(&a, &b), "hit must not rebuild");
    assert_eq!(cache.len(), 1);

    // Any key component change is a distinct entry.
    let c = cache.get_or_rasterize(&params("word", &attrs, 13.0, 1), &BlockRenderer);
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(cache.len(), 2);
}

#[test]
fn cache_evicts_least_recently_used() {
    let attrs = FontAttrs::default();
    let mut cache = SpriteCache::new(2);
    cache.get_or_rasterize(&params("one", &attrs, 10.0, 0), &BlockRenderer);
    cache.get_or_rasterize(&params("two", &attrs, 10.0, 0), &BlockRenderer);
    // Touch "one" so "two" becomes the eviction victim.
    cache.get_or_rasterize(&params("one", &attrs, 10.0, 0), &BlockRenderer);
    cache.get_or_rasterize(&params("three", &attrs, 10.0, 0), &BlockRenderer);

    assert_eq!(cache.len(), 2);
    assert!(cache.contains(&params("one", &attrs, 10.0, 0)));
    assert!(cache.contains(&params("three", &attrs, 10.0, 0)));
    assert!(!cache.contains(&params("two", &attrs, 10.0, 0)));
}
