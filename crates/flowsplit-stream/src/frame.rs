//! Frame extraction
//!
//! Isolates the payload region of a model's text stream. The model wraps its
//! structured output in a fenced block (```` ```json ```` … ```` ``` ````);
//! everything before the opening marker is decorative and everything after the
//! closing marker is ignored.
//!
//! Fragments may split a marker anywhere, so the extractor holds back a short
//! tail (marker length − 1 bytes) until the next fragment arrives.

use serde::{Deserialize, Serialize};

/// Default opening frame marker
pub const DEFAULT_OPEN_MARKER: &str = "```json";

/// Default closing frame marker
pub const DEFAULT_CLOSE_MARKER: &str = "```";

/// Literal delimiters bracketing the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameMarkers {
    /// Marker that opens the payload
    pub open: String,
    /// Marker that closes the payload
    pub close: String,
}

impl FrameMarkers {
    /// Create markers from explicit delimiters
    #[inline]
    #[must_use]
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// Both markers are non-empty
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.open.is_empty() && !self.close.is_empty()
    }
}

impl Default for FrameMarkers {
    fn default() -> Self {
        Self::new(DEFAULT_OPEN_MARKER, DEFAULT_CLOSE_MARKER)
    }
}

/// How the payload frame ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingStatus {
    /// Opening and closing markers were both seen
    Closed,
    /// Opening marker seen, stream ended before the closing marker
    Unterminated,
    /// Opening marker never seen; no payload
    MarkerNotFound,
}

impl FramingStatus {
    /// A payload region was found
    #[inline]
    #[must_use]
    pub fn has_payload(self) -> bool {
        !matches!(self, Self::MarkerNotFound)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    SeekingOpen,
    InPayload,
    Closed,
}

/// Incremental frame extractor
///
/// Feed fragments with [`push`](Self::push); each call returns the payload text
/// that is now known to lie inside the frame. Call [`finish`](Self::finish)
/// when the source is exhausted to flush the held-back tail.
#[derive(Debug, Clone)]
pub struct FrameExtractor {
    markers: FrameMarkers,
    buffer: String,
    state: FrameState,
}

impl FrameExtractor {
    /// Create extractor for the given markers
    #[inline]
    #[must_use]
    pub fn new(markers: FrameMarkers) -> Self {
        debug_assert!(markers.is_valid(), "frame markers must be non-empty");
        Self {
            markers,
            buffer: String::new(),
            state: FrameState::SeekingOpen,
        }
    }

    /// Opening marker has been seen
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state != FrameState::SeekingOpen
    }

    /// Closing marker has been seen; further input is ignored
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == FrameState::Closed
    }

    /// Consume a fragment, returning newly available payload text
    pub fn push(&mut self, fragment: &str) -> String {
        let mut emitted = String::new();
        if self.state == FrameState::Closed {
            return emitted;
        }
        self.buffer.push_str(fragment);

        if self.state == FrameState::SeekingOpen {
            if let Some(idx) = self.buffer.find(&self.markers.open) {
                self.buffer.drain(..idx + self.markers.open.len());
                self.state = FrameState::InPayload;
                tracing::trace!("payload frame opened");
            } else {
                let keep_from = hold_back_point(&self.buffer, self.markers.open.len() - 1);
                self.buffer.drain(..keep_from);
                return emitted;
            }
        }

        if let Some(idx) = self.buffer.find(&self.markers.close) {
            emitted.push_str(&self.buffer[..idx]);
            self.buffer.clear();
            self.state = FrameState::Closed;
            tracing::trace!("payload frame closed");
        } else {
            let split = hold_back_point(&self.buffer, self.markers.close.len() - 1);
            emitted.push_str(&self.buffer[..split]);
            self.buffer.drain(..split);
        }

        emitted
    }

    /// Source exhausted: flush any held-back payload and report framing
    pub fn finish(&mut self) -> (String, FramingStatus) {
        match self.state {
            FrameState::SeekingOpen => {
                self.buffer.clear();
                (String::new(), FramingStatus::MarkerNotFound)
            }
            FrameState::InPayload => {
                self.state = FrameState::Closed;
                (std::mem::take(&mut self.buffer), FramingStatus::Unterminated)
            }
            FrameState::Closed => (String::new(), FramingStatus::Closed),
        }
    }
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new(FrameMarkers::default())
    }
}

/// Byte index from which the last `hold` bytes start, moved back to a char boundary
fn hold_back_point(buffer: &str, hold: usize) -> usize {
    let mut idx = buffer.len().saturating_sub(hold);
    while !buffer.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(fragments: &[&str]) -> (String, FramingStatus) {
        let mut extractor = FrameExtractor::default();
        let mut payload = String::new();
        for fragment in fragments {
            payload.push_str(&extractor.push(fragment));
        }
        let (tail, status) = extractor.finish();
        payload.push_str(&tail);
        (payload, status)
    }

    #[test]
    fn extracts_payload_between_markers() {
        let (payload, status) = run(&["Here you go:\n```json\n[1, 2]\n```\ntrailing prose"]);
        assert_eq!(payload, "\n[1, 2]\n");
        assert_eq!(status, FramingStatus::Closed);
    }

    #[test]
    fn opening_marker_split_across_fragments() {
        let (payload, status) = run(&["intro ```js", "on\n[{\"a\":1}]", "\n```"]);
        assert_eq!(payload, "\n[{\"a\":1}]\n");
        assert_eq!(status, FramingStatus::Closed);
    }

    #[test]
    fn closing_marker_split_across_fragments() {
        let (payload, status) = run(&["```json[1]`", "`", "` after"]);
        assert_eq!(payload, "[1]");
        assert_eq!(status, FramingStatus::Closed);
    }

    #[test]
    fn missing_opening_marker_yields_nothing() {
        let (payload, status) = run(&["[{\"text\":\"a\",\"ratio\":1}]"]);
        assert!(payload.is_empty());
        assert_eq!(status, FramingStatus::MarkerNotFound);
        assert!(!status.has_payload());
    }

    #[test]
    fn missing_closing_marker_flushes_tail() {
        let (payload, status) = run(&["```json\n[1,", " 2]"]);
        assert_eq!(payload, "\n[1, 2]");
        assert_eq!(status, FramingStatus::Unterminated);
    }

    #[test]
    fn input_after_close_is_ignored() {
        let mut extractor = FrameExtractor::default();
        assert_eq!(extractor.push("```json[]```"), "[]");
        assert!(extractor.is_closed());
        assert_eq!(extractor.push("```json[1]```"), "");
    }

    #[test]
    fn emission_is_incremental() {
        let mut extractor = FrameExtractor::default();
        assert_eq!(extractor.push("```json"), "");
        assert!(extractor.is_open());
        // Two trailing bytes may be the start of the closing marker
        assert_eq!(extractor.push("[{\"text\""), "[{\"tex");
        assert_eq!(extractor.push(":1"), "t\"");
    }

    #[test]
    fn multibyte_text_is_not_split() {
        let (payload, status) = run(&["前言```json\n[\"设计", "开发\"]\n```"]);
        assert_eq!(payload, "\n[\"设计开发\"]\n");
        assert_eq!(status, FramingStatus::Closed);
    }

    #[test]
    fn custom_markers() {
        let mut extractor = FrameExtractor::new(FrameMarkers::new("<json>", "</json>"));
        let mut payload = extractor.push("noise <json>[1]</js");
        payload.push_str(&extractor.push("on> more"));
        assert_eq!(payload, "[1]");
        assert!(extractor.is_closed());
    }
}
