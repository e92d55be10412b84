//! Incremental record parsing
//!
//! Consumes payload characters one at a time and emits each `{ "text", "ratio" }`
//! object as soon as its closing brace arrives, long before the enclosing array
//! is complete.
//!
//! The tokenizer tracks string-literal state (including escapes) so braces and
//! brackets inside strings are never treated as structure. Candidates start
//! only inside the enclosing array and hold scalar fields only.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One decomposition record as emitted by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    /// Work-item name
    pub text: String,
    /// Advisory share of the parent's effort
    pub ratio: f64,
}

impl StreamRecord {
    /// Create record
    #[inline]
    #[must_use]
    pub fn new(text: impl Into<String>, ratio: f64) -> Self {
        Self {
            text: text.into(),
            ratio,
        }
    }
}

/// Why a candidate object was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum MalformedReason {
    /// Candidate text is not valid JSON
    Syntax(String),
    /// Candidate parsed but is not an object
    NotAnObject,
    /// `text` field absent
    MissingText,
    /// `text` field present but not a string
    TextNotString,
    /// `text` field is blank
    EmptyText,
    /// `ratio` field absent
    MissingRatio,
    /// `ratio` field present but not a number
    RatioNotNumber,
    /// `ratio` is zero, negative, or not finite
    RatioOutOfRange(f64),
    /// Candidate was cut off by a new object, an array bracket, or end of input
    Unterminated,
}

impl std::fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax(msg) => write!(f, "invalid JSON: {msg}"),
            Self::NotAnObject => f.write_str("not an object"),
            Self::MissingText => f.write_str("missing `text`"),
            Self::TextNotString => f.write_str("`text` is not a string"),
            Self::EmptyText => f.write_str("`text` is blank"),
            Self::MissingRatio => f.write_str("missing `ratio`"),
            Self::RatioNotNumber => f.write_str("`ratio` is not a number"),
            Self::RatioOutOfRange(r) => write!(f, "`ratio` {r} is not positive"),
            Self::Unterminated => f.write_str("object never closed"),
        }
    }
}

/// Outcome of checking one candidate object
#[derive(Debug, Clone, PartialEq)]
pub enum RecordCandidate {
    /// Structurally and numerically well-formed
    Valid(StreamRecord),
    /// Rejected; the stream continues
    Malformed(MalformedReason),
}

impl RecordCandidate {
    /// Classify raw candidate text (including its braces)
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => return Self::Malformed(MalformedReason::Syntax(e.to_string())),
        };
        let Value::Object(map) = value else {
            return Self::Malformed(MalformedReason::NotAnObject);
        };

        let text = match map.get("text") {
            None => return Self::Malformed(MalformedReason::MissingText),
            Some(Value::String(s)) if s.trim().is_empty() => {
                return Self::Malformed(MalformedReason::EmptyText)
            }
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Self::Malformed(MalformedReason::TextNotString),
        };

        let ratio = match map.get("ratio") {
            None => return Self::Malformed(MalformedReason::MissingRatio),
            Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
            Some(_) => return Self::Malformed(MalformedReason::RatioNotNumber),
        };
        if !(ratio.is_finite() && ratio > 0.0) {
            return Self::Malformed(MalformedReason::RatioOutOfRange(ratio));
        }

        Self::Valid(StreamRecord { text, ratio })
    }

    /// Valid record, if any
    #[inline]
    #[must_use]
    pub fn into_record(self) -> Option<StreamRecord> {
        match self {
            Self::Valid(record) => Some(record),
            Self::Malformed(_) => None,
        }
    }
}

/// Event produced while feeding characters
#[derive(Debug, Clone, PartialEq)]
pub enum ParseEvent {
    /// A complete candidate object was checked
    Candidate(RecordCandidate),
    /// The enclosing array closed; the batch is complete
    ArrayClosed,
}

/// Character-level record parser
///
/// Records are flat. Any structural `{`, `[` or `]` met inside an open
/// candidate abandons it as [`MalformedReason::Unterminated`], so a truncated
/// fragment never swallows the records after it.
///
/// Not restartable: once the enclosing array closes, further input is ignored.
#[derive(Debug, Clone, Default)]
pub struct RecordParser {
    array_depth: usize,
    in_object: bool,
    in_string: bool,
    escaped: bool,
    candidate: String,
    finished: bool,
}

impl RecordParser {
    /// Create parser
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enclosing array has closed
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Currently inside a record object
    #[inline]
    #[must_use]
    pub fn in_record(&self) -> bool {
        self.in_object
    }

    /// Feed one character, appending any resulting events
    pub fn push_char(&mut self, c: char, events: &mut Vec<ParseEvent>) {
        if self.finished {
            return;
        }

        if self.in_string {
            if self.in_object {
                self.candidate.push(c);
            }
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_string = false;
            }
            return;
        }

        match c {
            '{' if self.array_depth > 0 => {
                self.abandon(events);
                self.candidate.push('{');
                self.in_object = true;
            }
            '}' if self.in_object => {
                self.candidate.push('}');
                self.in_object = false;
                let raw = std::mem::take(&mut self.candidate);
                events.push(ParseEvent::Candidate(RecordCandidate::classify(&raw)));
            }
            '[' => {
                self.abandon(events);
                self.array_depth += 1;
            }
            ']' if self.array_depth > 0 => {
                self.abandon(events);
                self.array_depth -= 1;
                if self.array_depth == 0 {
                    self.finished = true;
                    events.push(ParseEvent::ArrayClosed);
                }
            }
            _ => {
                if self.in_object {
                    self.candidate.push(c);
                }
                if c == '"' {
                    self.in_string = true;
                }
            }
        }
    }

    /// Feed a run of payload text, collecting events in order
    pub fn feed(&mut self, payload: &str) -> Vec<ParseEvent> {
        let mut events = Vec::new();
        for c in payload.chars() {
            if self.finished {
                break;
            }
            self.push_char(c, &mut events);
        }
        events
    }

    /// End of input: a candidate still open is reported as malformed
    pub fn finish(&mut self) -> Option<ParseEvent> {
        let mut events = Vec::new();
        self.abandon(&mut events);
        self.in_string = false;
        self.escaped = false;
        events.pop()
    }

    fn abandon(&mut self, events: &mut Vec<ParseEvent>) {
        if std::mem::take(&mut self.in_object) {
            self.candidate.clear();
            events.push(ParseEvent::Candidate(RecordCandidate::Malformed(
                MalformedReason::Unterminated,
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn valid(events: &[ParseEvent]) -> Vec<StreamRecord> {
        events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Candidate(RecordCandidate::Valid(r)) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn emits_records_in_order() {
        let mut parser = RecordParser::new();
        let events =
            parser.feed(r#"[{"text":"design","ratio":0.4},{"text":"build","ratio":0.6}]"#);

        assert_eq!(
            valid(&events),
            vec![StreamRecord::new("design", 0.4), StreamRecord::new("build", 0.6)]
        );
        assert_eq!(events.last(), Some(&ParseEvent::ArrayClosed));
        assert!(parser.is_finished());
    }

    #[test]
    fn emits_before_array_closes() {
        let mut parser = RecordParser::new();
        let events = parser.feed(r#"[{"text":"a","ratio":0.5},"#);
        assert_eq!(valid(&events), vec![StreamRecord::new("a", 0.5)]);
        assert!(!parser.is_finished());
    }

    #[test]
    fn braces_inside_strings_are_text() {
        let mut parser = RecordParser::new();
        let events = parser.feed(r#"[{"text":"parse {json} ] [","ratio":1}]"#);
        assert_eq!(valid(&events), vec![StreamRecord::new("parse {json} ] [", 1.0)]);
    }

    #[test]
    fn escaped_quotes_do_not_end_strings() {
        let mut parser = RecordParser::new();
        let events = parser.feed(r#"[{"text":"say \"}\" now","ratio":0.2}]"#);
        assert_eq!(valid(&events), vec![StreamRecord::new("say \"}\" now", 0.2)]);
    }

    #[test]
    fn malformed_records_are_skipped() {
        let mut parser = RecordParser::new();
        let events = parser.feed(
            r#"[{"text":"ok","ratio":0.5},{"text":3,"ratio":0.1},{"ratio":0.2},{"text":"x","ratio":"big"},{bad},{"text":"tail","ratio":0.5}]"#,
        );

        assert_eq!(
            valid(&events),
            vec![StreamRecord::new("ok", 0.5), StreamRecord::new("tail", 0.5)]
        );
        let malformed = events
            .iter()
            .filter(|e| matches!(e, ParseEvent::Candidate(RecordCandidate::Malformed(_))))
            .count();
        assert_eq!(malformed, 4);
    }

    fn malformed(events: &[ParseEvent]) -> Vec<MalformedReason> {
        events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Candidate(RecordCandidate::Malformed(reason)) => Some(reason.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn unclosed_candidate_does_not_swallow_later_records() {
        let mut parser = RecordParser::new();
        let events = parser
            .feed(r#"[{"text":"broken", {"text":"ok","ratio":0.5},{"text":"two","ratio":0.5}]"#);

        assert_eq!(
            valid(&events),
            vec![StreamRecord::new("ok", 0.5), StreamRecord::new("two", 0.5)]
        );
        assert_eq!(malformed(&events), vec![MalformedReason::Unterminated]);
        assert_eq!(events.last(), Some(&ParseEvent::ArrayClosed));
    }

    #[test]
    fn array_close_cuts_off_open_candidate() {
        let mut parser = RecordParser::new();
        let events = parser.feed(r#"[{"text":"a","ratio":1},{"text":"cut"]"#);
        assert_eq!(valid(&events), vec![StreamRecord::new("a", 1.0)]);
        assert_eq!(malformed(&events), vec![MalformedReason::Unterminated]);
        assert!(parser.is_finished());
    }

    #[test]
    fn nested_structure_is_malformed() {
        let mut parser = RecordParser::new();
        let events = parser.feed(
            r#"[{"text":"a","ratio":0.3,"meta":{"k":1}},{"text":"b","ratio":0.7}]"#,
        );
        assert_eq!(valid(&events), vec![StreamRecord::new("b", 0.7)]);
        assert_eq!(events.last(), Some(&ParseEvent::ArrayClosed));
    }

    #[test]
    fn objects_before_the_array_are_ignored() {
        let mut parser = RecordParser::new();
        let events = parser.feed(r#"{"text":"early","ratio":1} [{"text":"a","ratio":1}]"#);
        assert_eq!(valid(&events), vec![StreamRecord::new("a", 1.0)]);
        assert!(malformed(&events).is_empty());
    }

    #[test]
    fn finish_reports_open_candidate() {
        let mut parser = RecordParser::new();
        assert!(parser.feed(r#"[{"text":"a","ra"#).is_empty());
        assert!(parser.in_record());
        assert_eq!(
            parser.finish(),
            Some(ParseEvent::Candidate(RecordCandidate::Malformed(
                MalformedReason::Unterminated
            )))
        );
        assert_eq!(parser.finish(), None);
    }

    #[test]
    fn stops_after_array_closes() {
        let mut parser = RecordParser::new();
        let events = parser.feed(r#"[{"text":"a","ratio":1}] [{"text":"b","ratio":1}]"#);
        assert_eq!(valid(&events), vec![StreamRecord::new("a", 1.0)]);
        let mut events = Vec::new();
        parser.push_char('{', &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn classify_rejects_bad_ratios() {
        assert_eq!(
            RecordCandidate::classify(r#"{"text":"a","ratio":0}"#),
            RecordCandidate::Malformed(MalformedReason::RatioOutOfRange(0.0))
        );
        assert_eq!(
            RecordCandidate::classify(r#"{"text":"a","ratio":-0.5}"#),
            RecordCandidate::Malformed(MalformedReason::RatioOutOfRange(-0.5))
        );
        assert_eq!(
            RecordCandidate::classify(r#"{"text":"  ","ratio":0.5}"#),
            RecordCandidate::Malformed(MalformedReason::EmptyText)
        );
        assert_eq!(
            RecordCandidate::classify("[1]"),
            RecordCandidate::Malformed(MalformedReason::NotAnObject)
        );
    }

    #[test]
    fn classify_accepts_integer_ratio() {
        let record = RecordCandidate::classify(r#"{"text":"all","ratio":1}"#).into_record();
        assert_eq!(record, Some(StreamRecord::new("all", 1.0)));
    }
}
