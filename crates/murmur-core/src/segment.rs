//! Transcript model: timed segments and the derived flattened text.

use serde::{Deserialize, Serialize};

/// A timed span of transcribed text, as returned by the backend.
///
/// `start` and `end` are offsets in seconds with `0 <= start <= end`.
/// Segments are immutable once received and accumulate in arrival order,
/// which across multiple uploads is completion order, not time order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Accumulated transcription state: the ordered segment list plus the
/// flattened display text derived from it.
///
/// The flattened text can be edited independently of the segment list (see
/// [`Transcript::set_text`]), so caption exports built from the segments
/// always reflect the original transcription, not later hand edits.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    segments: Vec<Segment>,
    text: String,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// The flattened display text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The segments in arrival order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.segments.is_empty()
    }

    /// Append a batch of freshly transcribed segments.
    ///
    /// The segment texts are joined with single spaces and appended to the
    /// flattened text, separated from prior text by one space. The segment
    /// list is extended as-is: no merging, no de-duplication, no re-sort.
    pub fn append(&mut self, segments: Vec<Segment>) {
        if segments.is_empty() {
            return;
        }
        let flat = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(&flat);
        self.segments.extend(segments);
    }

    /// Replace the flattened text without touching the segment list.
    ///
    /// This is the hand-edit path: captions generated from the segments
    /// will keep reflecting the original transcription afterwards.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Drop all accumulated state.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.text.clear();
    }
}
