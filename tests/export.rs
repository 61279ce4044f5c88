mod common;

use common::BlockRenderer;
use inkcloud::export::{to_png, to_svg};
use inkcloud::place::{PlaceOptions, WordRequest, place};
use inkcloud::raster::{FontAttrs, SpriteCache};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn one_placement(text: &str) -> inkcloud::place::PlaceOutcome {
    let attrs = FontAttrs::default();
    let mut cache = SpriteCache::default();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    place(
        &[WordRequest {
            text: text.to_string(),
            font_size: 16.0,
            rotation: 0.0,
            color: "#2a9d8f".to_string(),
            original_index: 0,
        }],
        &BlockRenderer,
        &mut cache,
        &mut rng,
        PlaceOptions::new(120, 120, &attrs),
    )
    .unwrap()
}

#[test]
fn png_stamps_exactly_the_collision_tested_ink() {
    let outcome = one_placement("ink");
    let sprite_ink = outcome.placements[0].sprite.ink_count;
    let img = to_png(&outcome.placements, 120, 120);
    let colored = img
        .pixels()
        .filter(|p| p.0 != [255, 255, 255, 255])
        .count();
    assert_eq!(colored, sprite_ink, "visible pixels must equal tested ink");
}

#[test]
fn svg_escapes_text_content() {
    let outcome = one_placement("a<b&c");
    let svg = to_svg(&outcome.placements, 120, 120, Some("#ffffff"), "sans-serif");
    assert!(svg.contains("a&lt;b&amp;c"));
    assert!(!svg.contains("a<b&c"));
    assert!(svg.starts_with("<svg"));
    assert!(svg.ends_with("</svg>"));
    assert!(svg.contains(r##"fill="#2a9d8f""##));
}
