//! Word-list parsing and weight-to-size scaling.
//!
//! Input is one entry per line, either `word` or `word,weight`. Weights that
//! fail to parse fall back to 1.0 rather than rejecting the line, and
//! duplicate words are merged keeping the maximum weight, so downstream code
//! sees each word exactly once.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub weight: f32,
}

/// Parse a multi-line word list. Blank lines are skipped.
pub fn parse_word_list(input: &str) -> Vec<Word> {
    let mut words = Vec::new();
    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (text, weight) = match line.split_once(',') {
            Some((t, w)) => (t.trim(), w.trim().parse::<f32>().unwrap_or(1.0)),
            None => (line, 1.0),
        };
        if text.is_empty() {
            continue;
        }
        words.push(Word {
            text: text.to_string(),
            weight,
        });
    }
    dedup_max_weight(words)
}

/// Merge duplicate entries, keeping the maximum weight per word. Order of
/// first appearance is preserved.
pub fn dedup_max_weight(words: Vec<Word>) -> Vec<Word> {
    let mut out: Vec<Word> = Vec::with_capacity(words.len());
    for word in words {
        match out.iter_mut().find(|w| w.text == word.text) {
            Some(existing) => existing.weight = existing.weight.max(word.weight),
            None => out.push(word),
        }
    }
    out
}

/// Map weights into font sizes on a square-root scale over
/// `[min_font, max_font]`. With a single distinct weight every word gets
/// `max_font`.
pub fn base_sizes(words: &[Word], min_font: f32, max_font: f32) -> Vec<f32> {
    let min_w = words.iter().map(|w| w.weight).fold(f32::INFINITY, f32::min);
    let max_w = words
        .iter()
        .map(|w| w.weight)
        .fold(f32::NEG_INFINITY, f32::max);
    let range = max_w - min_w;
    words
        .iter()
        .map(|w| {
            let norm = if range > 0.0 {
                (w.weight - min_w) / range
            } else {
                1.0
            };
            min_font + norm.sqrt() * (max_font - min_font)
        })
        .collect()
}
