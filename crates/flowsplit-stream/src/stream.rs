//! Async record streaming
//!
//! Connects a fragment source (any `Stream<Item = Result<String, E>>`) to the
//! frame extractor and the record parser. Records are yielded lazily in
//! document order; source errors pass through unchanged.
//!
//! ```text
//! fragments → FrameExtractor → RecordParser → StreamRecord …
//! ```

use crate::frame::{FrameExtractor, FrameMarkers, FramingStatus};
use crate::record::{ParseEvent, RecordCandidate, RecordParser, StreamRecord};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Why record streaming stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// Enclosing array closed; the source was not read further
    ArrayClosed,
    /// Closing frame marker seen
    FrameClosed,
    /// Source ran out
    SourceEnded,
    /// Source returned an error
    SourceFailed,
}

/// Bookkeeping for a finished (or failed) record stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSummary {
    /// Valid records, in arrival order
    pub records: Vec<StreamRecord>,
    /// How the payload frame ended
    pub framing: FramingStatus,
    /// Number of malformed candidates discarded
    pub malformed: usize,
    /// Why streaming stopped
    pub completion: Completion,
}

/// Lazy stream of records parsed from a fragment source
///
/// Not restartable; construct a new one per source.
#[derive(Debug)]
pub struct RecordStream<S> {
    source: S,
    extractor: FrameExtractor,
    parser: RecordParser,
    ready: VecDeque<StreamRecord>,
    malformed: usize,
    completion: Option<Completion>,
    framing: Option<FramingStatus>,
}

impl<S> RecordStream<S> {
    /// Wrap a fragment source
    #[must_use]
    pub fn new(source: S, markers: FrameMarkers) -> Self {
        Self {
            source,
            extractor: FrameExtractor::new(markers),
            parser: RecordParser::new(),
            ready: VecDeque::new(),
            malformed: 0,
            completion: None,
            framing: None,
        }
    }

    /// Malformed candidates discarded so far
    #[inline]
    #[must_use]
    pub fn malformed(&self) -> usize {
        self.malformed
    }

    /// Why streaming stopped, once it has
    #[inline]
    #[must_use]
    pub fn completion(&self) -> Option<Completion> {
        self.completion
    }

    /// Framing status so far
    #[must_use]
    pub fn framing(&self) -> FramingStatus {
        match self.framing {
            Some(status) => status,
            None if self.extractor.is_open() => FramingStatus::Unterminated,
            None => FramingStatus::MarkerNotFound,
        }
    }

    fn ingest(&mut self, fragment: &str) {
        let payload = self.extractor.push(fragment);
        self.parse(&payload);

        if self.parser.is_finished() {
            self.completion = Some(Completion::ArrayClosed);
            self.framing = Some(if self.extractor.is_closed() {
                FramingStatus::Closed
            } else {
                FramingStatus::Unterminated
            });
        } else if self.extractor.is_closed() {
            self.close_parser();
            self.completion = Some(Completion::FrameClosed);
            self.framing = Some(FramingStatus::Closed);
        }
    }

    fn finish(&mut self) {
        let (tail, status) = self.extractor.finish();
        self.parse(&tail);
        self.close_parser();
        self.framing = Some(status);
        self.completion = Some(if self.parser.is_finished() {
            Completion::ArrayClosed
        } else {
            Completion::SourceEnded
        });
        if status == FramingStatus::MarkerNotFound {
            tracing::warn!("stream ended without an opening frame marker");
        }
    }

    fn close_parser(&mut self) {
        if let Some(event) = self.parser.finish() {
            self.handle(event);
        }
    }

    fn parse(&mut self, payload: &str) {
        for event in self.parser.feed(payload) {
            self.handle(event);
        }
    }

    fn handle(&mut self, event: ParseEvent) {
        match event {
            ParseEvent::Candidate(RecordCandidate::Valid(record)) => {
                tracing::debug!(text = %record.text, ratio = record.ratio, "record parsed");
                self.ready.push_back(record);
            }
            ParseEvent::Candidate(RecordCandidate::Malformed(reason)) => {
                tracing::debug!(%reason, "discarding malformed record");
                self.malformed += 1;
            }
            ParseEvent::ArrayClosed => tracing::trace!("record array closed"),
        }
    }
}

impl<S, E> Stream for RecordStream<S>
where
    S: Stream<Item = Result<String, E>> + Unpin,
{
    type Item = Result<StreamRecord, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(record) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(record)));
            }
            if this.completion.is_some() {
                return Poll::Ready(None);
            }
            match futures::ready!(this.source.poll_next_unpin(cx)) {
                Some(Ok(fragment)) => this.ingest(&fragment),
                Some(Err(e)) => {
                    this.completion = Some(Completion::SourceFailed);
                    return Poll::Ready(Some(Err(e)));
                }
                None => this.finish(),
            }
        }
    }
}

/// Stream records, invoking `on_record` for each as soon as it is valid
///
/// # Errors
/// Returns the source's own error unchanged; records delivered to `on_record`
/// before the failure stay delivered.
pub async fn decompose_stream<S, E, F>(
    source: S,
    markers: FrameMarkers,
    mut on_record: F,
) -> Result<StreamSummary, E>
where
    S: Stream<Item = Result<String, E>> + Unpin,
    F: FnMut(&StreamRecord),
{
    let mut stream = RecordStream::new(source, markers);
    let mut records = Vec::new();

    while let Some(record) = stream.next().await {
        let record = record?;
        on_record(&record);
        records.push(record);
    }

    Ok(StreamSummary {
        records,
        framing: stream.framing(),
        malformed: stream.malformed(),
        completion: stream.completion().unwrap_or(Completion::SourceEnded),
    })
}

/// Collect the whole framed payload as one string
///
/// Used by consumers that parse the payload as a single document instead of
/// record by record.
///
/// # Errors
/// Returns the source's own error unchanged.
pub async fn collect_payload<S, E>(
    mut source: S,
    markers: FrameMarkers,
) -> Result<(String, FramingStatus), E>
where
    S: Stream<Item = Result<String, E>> + Unpin,
{
    let mut extractor = FrameExtractor::new(markers);
    let mut payload = String::new();

    while let Some(fragment) = source.next().await {
        payload.push_str(&extractor.push(&fragment?));
        if extractor.is_closed() {
            return Ok((payload, FramingStatus::Closed));
        }
    }

    let (tail, status) = extractor.finish();
    payload.push_str(&tail);
    Ok((payload, status))
}
