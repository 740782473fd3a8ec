use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_option_number_from_string;
use serde_json::{Map, Value};
use std::io::{ErrorKind, Read};
use thiserror::Error;
use crate::util::serialize_compact_opt;

pub type EventTable = Map<String, Value>;

// Metadata for one event. Times are seconds since epoch, as the feed publishes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDescriptor {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_number_from_string", serialize_with = "serialize_compact_opt")]
    pub start: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_option_number_from_string", serialize_with = "serialize_compact_opt")]
    pub end: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_option_number_from_string", serialize_with = "serialize_compact_opt")]
    pub len: Option<f64>,
}

#[derive(Debug)]
pub enum Scan {
    Pending,
    Found(EventTable),
    Overflow,
}

/// Incremental extractor for an `<identifier> = { ... };` assignment buried in a
/// script payload.
///
/// Bytes are accumulated as they arrive. Whenever the buffer holds a `};` past the
/// opening brace, the text up to that terminator is tried as a JSON object; a
/// failed attempt (a `};` inside a string, say) just moves on to the next
/// terminator. Once the buffer grows past `cap` without a hit the scanner reports
/// `Scan::Overflow` and the caller should stop feeding it.
pub struct EventScanner {
    identifier: Vec<u8>,
    cap: usize,
    buf: Vec<u8>,
    object_start: Option<usize>,
    tried_upto: usize,
    last_error: Option<serde_json::Error>,
}

impl EventScanner {
    pub fn new(identifier: &str, cap: usize) -> Self {
        Self {
            identifier: identifier.as_bytes().to_vec(),
            cap,
            buf: Vec::new(),
            object_start: None,
            tried_upto: 0,
            last_error: None,
        }
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Scan {
        self.buf.extend_from_slice(chunk);

        if let Some(table) = self.try_extract() {
            return Scan::Found(table);
        }
        if self.buf.len() > self.cap {
            return Scan::Overflow;
        }
        Scan::Pending
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn take_last_error(&mut self) -> Option<serde_json::Error> {
        self.last_error.take()
    }

    fn try_extract(&mut self) -> Option<EventTable> {
        if self.object_start.is_none() {
            self.object_start = find_assignment(&self.buf, &self.identifier);
        }
        let start = self.object_start?;

        let mut from = self.tried_upto.max(start);
        while let Some(offset) = find(&self.buf[from..], b"};") {
            let close = from + offset;
            self.tried_upto = close + 1;

            // Chunks may split multi-byte characters; lossy decoding only touches string contents.
            let text = String::from_utf8_lossy(&self.buf[start..=close]);
            match serde_json::from_str::<EventTable>(&text) {
                Ok(table) => return Some(table),
                Err(e) => self.last_error = Some(e),
            }

            from = close + 1;
        }

        None
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn skip_whitespace(buf: &[u8], mut i: usize) -> usize {
    while i < buf.len() && buf[i].is_ascii_whitespace() { i += 1; }
    i
}

// Offset of the `{` opening `ident = {`. None also when the buffer ends mid-statement,
// since the next chunk may complete it.
fn find_assignment(buf: &[u8], ident: &[u8]) -> Option<usize> {
    let mut from = 0;

    while let Some(offset) = find(&buf[from..], ident) {
        let at = from + offset;
        from = at + 1;

        if at > 0 && is_ident_byte(buf[at - 1]) { continue; }

        let after = at + ident.len();
        if after >= buf.len() { return None; }
        if is_ident_byte(buf[after]) { continue; }

        let eq = skip_whitespace(buf, after);
        if eq + 1 >= buf.len() { return None; }
        if buf[eq] != b'=' || buf[eq + 1] == b'=' { continue; }

        let brace = skip_whitespace(buf, eq + 1);
        if brace >= buf.len() { return None; }
        if buf[brace] == b'{' { return Some(brace); }
    }

    None
}

#[derive(Debug, Default)]
pub struct Resolution {
    pub active: Option<EventDescriptor>,
    // Records that decoded cleanly.
    pub considered: usize,
    // Records that were not event-shaped, or had no start time.
    pub skipped: usize,
}

// Latest-started event at `reference_ts`. Ties on start go to whichever record the
// feed listed last.
pub fn select_active_event(table: &EventTable, reference_ts: f64) -> Resolution {
    let mut resolution = Resolution::default();
    let mut best_start = f64::NEG_INFINITY;

    for (key, raw) in table {
        let mut event = match EventDescriptor::deserialize(raw) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(id = %key, error = %e, "skipping undecodable event record");
                resolution.skipped += 1;
                continue;
            }
        };
        resolution.considered += 1;

        let Some(start) = event.start else {
            resolution.skipped += 1;
            continue;
        };
        if start > reference_ts { continue; }

        if start >= best_start {
            event.id = Some(key.clone());
            best_start = start;
            resolution.active = Some(event);
        }
    }

    resolution
}

#[derive(Debug, Error)]
pub enum EventFeedError {
    #[error("reading the event feed failed")]
    Read(#[from] std::io::Error),

    #[error("no event table within the first {cap} bytes")]
    Oversized { cap: usize },

    #[error("event feed ended without a parseable event table")]
    NotFound {
        #[source]
        last_parse: Option<serde_json::Error>,
    },
}

// Reads `reader` chunk by chunk until the event table parses, then selects the
// active event. Nothing past the chunk holding the table is read.
pub fn resolve<R: Read>(
    mut reader: R,
    identifier: &str,
    reference_ts: f64,
    cap: usize,
    chunk_size: usize,
) -> Result<Resolution, EventFeedError> {
    let mut scanner = EventScanner::new(identifier, cap);
    let mut chunk = vec![0u8; chunk_size.max(1)];

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => {
                return Err(EventFeedError::NotFound { last_parse: scanner.take_last_error() });
            }
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        match scanner.feed(&chunk[..n]) {
            Scan::Pending => {}
            Scan::Overflow => return Err(EventFeedError::Oversized { cap }),
            Scan::Found(table) => {
                tracing::debug!(bytes = scanner.buffered(), events = table.len(), "event table parsed");
                return Ok(select_active_event(&table, reference_ts));
            }
        }
    }
}
