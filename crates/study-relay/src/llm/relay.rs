//! Streaming relay: upstream `text/event-stream` bytes in, normalized
//! `{content}` / `{error}` / `[DONE]` events out.
//!
//! Upstream chunks are arbitrary slices of the byte stream. A JSON record
//! (or a multi-byte UTF-8 character) may straddle two reads, so bytes are
//! buffered until a blank line closes the record and only then decoded.

use std::fmt::Display;
use std::time::Duration;

use bytes::BytesMut;
use futures_util::{Stream, StreamExt};
use serde_json::json;
use tracing::{debug, warn};

use super::types::StreamChunk;

const DONE_MARKER: &str = "[DONE]";

/// One event forwarded to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    Content(String),
    Error(String),
    Done,
}

impl RelayEvent {
    /// Payload for the downstream `data:` line.
    pub fn to_data(&self) -> String {
        match self {
            RelayEvent::Content(token) => json!({ "content": token }).to_string(),
            RelayEvent::Error(message) => json!({ "error": message }).to_string(),
            RelayEvent::Done => DONE_MARKER.to_string(),
        }
    }

    /// Full SSE record including the trailing blank line.
    pub fn to_sse_record(&self) -> String {
        format!("data: {}\n\n", self.to_data())
    }
}

/// Accumulates record bytes and yields the `data` payload of each complete
/// record.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
    /// Bytes before this offset hold no record separator.
    scanned: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one upstream chunk; returns payloads of every record it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some((end, separator_len)) = find_record_end(&self.buffer, self.scanned) {
            let record = self.buffer.split_to(end + separator_len);
            self.scanned = 0;
            if let Some(payload) = record_payload(&record[..end]) {
                payloads.push(payload);
            }
        }
        // A separator may start in the last two bytes and finish in the next chunk.
        self.scanned = self.buffer.len().saturating_sub(2);
        payloads
    }

    /// Whatever is left once upstream closes, treated as a final record.
    pub fn finish(&mut self) -> Option<String> {
        let rest = self.buffer.split();
        self.scanned = 0;
        record_payload(&rest)
    }
}

/// Locate the blank line ending the first record, looking no earlier than
/// `from`. Returns the record length and the length of the separator that
/// follows it.
fn find_record_end(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    buf.iter().enumerate().skip(from).find_map(|(i, &b)| {
        if b != b'\n' {
            return None;
        }
        let rest = &buf[i + 1..];
        if rest.starts_with(b"\n") {
            Some((i, 2))
        } else if rest.starts_with(b"\r\n") {
            Some((i, 3))
        } else {
            None
        }
    })
}

/// Join the `data:` lines of one record. Comments, `event:` and `id:` fields
/// are ignored; a record without data yields `None`.
fn record_payload(record: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(record);
    let data: Vec<&str> = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();

    if data.is_empty() {
        None
    } else {
        Some(data.join("\n"))
    }
}

/// What a single upstream payload means for the downstream stream.
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Token(String),
    Done,
    Skip,
}

fn interpret(payload: &str) -> Frame {
    let payload = payload.trim();
    if payload == DONE_MARKER {
        return Frame::Done;
    }

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .filter(|content| !content.is_empty())
            .map(Frame::Token)
            .unwrap_or(Frame::Skip),
        Err(e) => {
            warn!("Dropping malformed stream frame ({}): {}", e, payload);
            Frame::Skip
        }
    }
}

/// Re-frame an upstream SSE byte stream.
///
/// The returned stream always ends with exactly one [`RelayEvent::Done`]. If
/// upstream closes, errors, or stays silent for longer than `idle_timeout`
/// before sending `[DONE]`, an [`RelayEvent::Error`] precedes it. Dropping the
/// returned stream drops `upstream`, which releases the connection.
pub fn relay<S, B, E>(upstream: S, idle_timeout: Option<Duration>) -> impl Stream<Item = RelayEvent>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    async_stream::stream! {
        let mut decoder = SseDecoder::new();
        futures_util::pin_mut!(upstream);

        loop {
            let next = match idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, upstream.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!("Upstream stream stalled for {}s, closing", limit.as_secs());
                        yield RelayEvent::Error(format!(
                            "LLM stream stalled: no data for {} seconds",
                            limit.as_secs()
                        ));
                        yield RelayEvent::Done;
                        return;
                    }
                },
                None => upstream.next().await,
            };

            match next {
                Some(Ok(chunk)) => {
                    for payload in decoder.push(chunk.as_ref()) {
                        match interpret(&payload) {
                            Frame::Token(token) => {
                                yield RelayEvent::Content(token);
                            }
                            Frame::Done => {
                                debug!("Upstream sent [DONE]");
                                yield RelayEvent::Done;
                                return;
                            }
                            Frame::Skip => {}
                        }
                    }
                }
                Some(Err(e)) => {
                    warn!("Stream read error: {}", e);
                    yield RelayEvent::Error(format!("Stream read error: {}", e));
                    yield RelayEvent::Done;
                    return;
                }
                None => break,
            }
        }

        if let Some(payload) = decoder.finish() {
            match interpret(&payload) {
                Frame::Token(token) => {
                    yield RelayEvent::Content(token);
                }
                Frame::Done => {
                    yield RelayEvent::Done;
                    return;
                }
                Frame::Skip => {}
            }
        }

        warn!("Upstream closed before [DONE]");
        yield RelayEvent::Error("LLM stream ended unexpectedly".to_string());
        yield RelayEvent::Done;
    }
}

/// Reassembles relayed events into the final assistant message, the way the
/// browser does.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    text: String,
    error: Option<String>,
    tokens: usize,
    done: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: &RelayEvent) {
        match event {
            RelayEvent::Content(token) => {
                self.text.push_str(token);
                self.tokens += 1;
            }
            RelayEvent::Error(message) => self.error = Some(message.clone()),
            RelayEvent::Done => self.done = true,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn token_count(&self) -> usize {
        self.tokens
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}
