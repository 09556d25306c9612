//! Splitting display text into main and connector segments
//!
//! `"Charlie Quinn and Friends"` becomes `Charlie Quinn` / `and` / `Friends`;
//! the layout engine renders connector segments on their own, smaller line.

use crate::config::LayoutConfig;
use serde::{Deserialize, Serialize};

/// Rendering role of a segment or line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Main,
    Connector,
}

/// A run of words sharing one rendering role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub role: Role,
    /// Non-empty, single-space separated words.
    pub text: String,
}

impl Segment {
    pub fn main(text: impl Into<String>) -> Self {
        Self {
            role: Role::Main,
            text: text.into(),
        }
    }

    pub fn connector(text: impl Into<String>) -> Self {
        Self {
            role: Role::Connector,
            text: text.into(),
        }
    }

    pub fn word_count(&self) -> usize {
        self.text.split(' ').count()
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split `text` into ordered main/connector segments.
///
/// Blank input yields an empty vector; callers treat that as nothing to render.
pub fn segment(text: &str, config: &LayoutConfig) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for word in text.split_whitespace() {
        if config.is_connector_word(word) {
            if !pending.is_empty() {
                segments.push(Segment::main(pending.join(" ")));
                pending.clear();
            }
            segments.push(Segment::connector(word));
        } else {
            pending.push(word);
        }
    }

    if !pending.is_empty() {
        segments.push(Segment::main(pending.join(" ")));
    }

    segments
}

/// Demote lead-in articles and chunk long main segments so no single line
/// dominates the block. Connector segments pass through unchanged.
pub fn expand(segments: Vec<Segment>, config: &LayoutConfig) -> Vec<Segment> {
    let max_words = config.max_words_per_line.max(1);
    let mut expanded = Vec::with_capacity(segments.len());

    for seg in segments {
        if seg.role == Role::Connector {
            expanded.push(seg);
            continue;
        }

        let words: Vec<&str> = seg.text.split(' ').collect();
        let rest = match words.split_first() {
            Some((first, rest)) if !rest.is_empty() && config.is_lead_in_word(first) => {
                expanded.push(Segment::connector(*first));
                rest
            }
            _ => &words[..],
        };

        for chunk in rest.chunks(max_words) {
            expanded.push(Segment::main(chunk.join(" ")));
        }
    }

    expanded
}

/// Rejoin segments with single spaces.
pub fn reconstruct(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
