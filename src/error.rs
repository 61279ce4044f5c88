//! Engine error types.
//!
//! Only input-validation failures are surfaced as errors; per-word placement
//! failures (a sprite larger than the canvas, an exhausted spiral search) are
//! recovered locally by skipping the word and are reported through the layout
//! statistics instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    /// A caller-supplied grid does not match the canvas dimensions.
    #[error("grid is {len} cells, expected {width}x{height}")]
    MaskDimensionMismatch { len: usize, width: u32, height: u32 },

    /// A decoded mask image buffer has the wrong byte length for its size.
    #[error("mask image buffer is {len} bytes, expected {width}x{height}x4")]
    ImageDimensionMismatch { len: usize, width: u32, height: u32 },

    /// The allowed mask contains no placeable pixels, so no word can ever
    /// be placed.
    #[error("allowed region is empty: no space to place any word")]
    EmptyAllowedRegion,

    /// The renderer backend rejected the supplied font data.
    #[error("font load failed: {0}")]
    FontLoad(String),
}
