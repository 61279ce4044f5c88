//! Binary pixel grid shared by the mask, occupancy and sprite layers.
//!
//! One byte (0/1) per cell, row-major. The same representation serves three
//! roles: the allowed mask (1 = inside the target shape), the occupancy grid
//! (1 = already covered by ink) and a sprite's ink mask (1 = ink pixel).
//! Grids that are consumed together must share identical dimensions;
//! mismatches are rejected up front as fatal input errors rather than
//! checked per access in the placement loops.

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<u8>,
}

impl Grid {
    /// Create a zeroed grid of the given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![0; width as usize * height as usize],
        }
    }

    /// Wrap an existing cell buffer, validating that its length matches
    /// `width * height`.
    pub fn from_cells(width: u32, height: u32, cells: Vec<u8>) -> Result<Self, LayoutError> {
        if cells.len() != width as usize * height as usize {
            return Err(LayoutError::MaskDimensionMismatch {
                len: cells.len(),
                width,
                height,
            });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn same_dims(&self, other: &Grid) -> bool {
        self.width == other.width && self.height == other.height
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Whether the cell at (x, y) is set. Out-of-range coordinates read as
    /// unset.
    #[inline]
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.cells[self.index(x, y)] != 0
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32) {
        if x < self.width && y < self.height {
            let i = self.index(x, y);
            self.cells[i] = 1;
        }
    }

    /// Raw row access for scan loops. The slice has `width` cells.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.width as usize;
        &self.cells[start..start + self.width as usize]
    }

    /// Number of set cells.
    pub fn count_set(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }

    /// Deep copy for handing one phase's end state to the next without
    /// aliasing the original.
    pub fn snapshot(&self) -> Grid {
        self.clone()
    }

    /// OR every set cell of `other` into this grid.
    pub fn merge(&mut self, other: &Grid) -> Result<(), LayoutError> {
        if !self.same_dims(other) {
            return Err(LayoutError::MaskDimensionMismatch {
                len: other.cells.len(),
                width: self.width,
                height: self.height,
            });
        }
        for (dst, src) in self.cells.iter_mut().zip(other.cells.iter()) {
            *dst |= *src;
        }
        Ok(())
    }
}
