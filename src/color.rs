//! Word color assignment.
//!
//! Real input words cycle through the palette by index so re-runs stay
//! visually stable; synthesized fill duplicates draw a random palette entry
//! instead, since they carry no stable identity.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Built-in palettes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorScheme {
    #[default]
    Ocean,
    Sunset,
    Forest,
    Monochrome,
}

impl ColorScheme {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "sunset" => Self::Sunset,
            "forest" => Self::Forest,
            "monochrome" | "mono" => Self::Monochrome,
            _ => Self::Ocean,
        }
    }

    pub fn colors(&self) -> &'static [&'static str] {
        match self {
            Self::Ocean => &["#264653", "#287271", "#2a9d8f", "#8ab17d", "#e9c46a"],
            Self::Sunset => &["#f94144", "#f3722c", "#f8961e", "#f9844a", "#f9c74f"],
            Self::Forest => &["#2d6a4f", "#40916c", "#52b788", "#74c69d", "#95d5b2"],
            Self::Monochrome => &["#212529", "#495057", "#6c757d", "#adb5bd", "#ced4da"],
        }
    }

    /// Color for the word at `index` in the input list.
    pub fn indexed(&self, index: usize) -> String {
        let colors = self.colors();
        colors[index % colors.len()].to_string()
    }

    /// Random palette entry, used for coverage-fill duplicates.
    pub fn random<R: Rng>(&self, rng: &mut R) -> String {
        let colors = self.colors();
        colors[rng.random_range(0..colors.len())].to_string()
    }
}
