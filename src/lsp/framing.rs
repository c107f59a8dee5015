//! LSP message framing layer
//!
//! Reconstructs complete JSON-RPC messages from an incoming byte stream using
//! Content-Length headers, and frames outgoing messages the same way.
//!
//! LSP message framing format:
//! Content-Length: <length>\r\n[Name: <value>\r\n]*\r\n<content>

use serde::Serialize;
use serde_json::Value;
use tokio_util::bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

/// Header carrying the exact body size
pub const CONTENT_LENGTH: &str = "Content-Length";

/// Content type attached to every outgoing message
pub const CONTENT_TYPE_VALUE: &str = "application/vscode-jsonrpc;charset=utf-8";

/// Maximum message size to prevent memory exhaustion
const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024; // 16MB

/// A single header line longer than this is treated as garbage
const MAX_HEADER_LINE_SIZE: usize = 8 * 1024;

/// Error types for LSP framing
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("Malformed header line: {0}")]
    MalformedHeader(String),

    #[error("Missing Content-Length header")]
    MissingContentLength,

    #[error("Invalid content length: {0}")]
    InvalidContentLength(String),

    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Incomplete message: expected {expected} bytes, got {actual}")]
    IncompleteMessage { expected: usize, actual: usize },

    #[error("Message body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Message body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl FramingError {
    /// Whether the error left the stream without a known message boundary.
    ///
    /// Header-level failures lose track of where the next message starts;
    /// body failures happen after the full body was consumed.
    pub fn is_desynchronized(&self) -> bool {
        matches!(
            self,
            FramingError::MalformedHeader(_)
                | FramingError::MissingContentLength
                | FramingError::InvalidContentLength(_)
                | FramingError::MessageTooLarge { .. }
        )
    }
}

/// Framer state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    ReadingHeaders,
    ReadingBody { content_length: usize },
    Complete,
    /// A header-level error was reported; only `reset` leaves this state
    Failed,
}

/// A complete, framed message as received
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Header lines in arrival order
    pub headers: Vec<(String, String)>,

    /// Parsed JSON-RPC body
    pub body: Value,

    /// Copy of every byte that made up the message, headers included
    pub raw: Vec<u8>,
}

impl RawMessage {
    /// Case-insensitive header lookup
    #[cfg(test)]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Method name, if the body carries one
    #[cfg(test)]
    pub fn method(&self) -> Option<&str> {
        self.body.get("method").and_then(Value::as_str)
    }

    pub fn raw_text(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }
}

/// Incremental Content-Length framer.
///
/// Input may arrive one byte at a time or in arbitrary chunks. Bytes past the
/// end of the current body are kept and become the start of the next message
/// once the caller has taken the current one and called [`MessageFramer::reset`].
#[derive(Debug)]
pub struct MessageFramer {
    state: FramerState,

    /// Received but not yet consumed bytes
    pending: Vec<u8>,

    headers: Vec<(String, String)>,
    body: Vec<u8>,
    raw: Vec<u8>,
}

impl Default for MessageFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageFramer {
    pub fn new() -> Self {
        Self {
            state: FramerState::ReadingHeaders,
            pending: Vec::new(),
            headers: Vec::new(),
            body: Vec::new(),
            raw: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> FramerState {
        self.state
    }

    /// Feed more input and advance the state machine as far as possible.
    ///
    /// An empty slice is valid and processes bytes left over from a previous
    /// message. Parsing stops at the end of a body; leftover input stays buffered.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), FramingError> {
        if self.state == FramerState::Failed {
            return Ok(());
        }
        self.pending.extend_from_slice(bytes);
        self.advance()
    }

    pub fn is_message_complete(&self) -> bool {
        self.state == FramerState::Complete
    }

    /// Whether input past the current message is waiting to be processed
    #[cfg(test)]
    pub fn has_buffered_input(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Take the completed message, parsing its body as JSON.
    ///
    /// Call [`MessageFramer::reset`] afterwards, whether or not the body parsed.
    pub fn take_message(&mut self) -> Result<RawMessage, FramingError> {
        if self.state != FramerState::Complete {
            let expected = match self.state {
                FramerState::ReadingBody { content_length } => content_length,
                _ => 0,
            };
            return Err(FramingError::IncompleteMessage {
                expected,
                actual: self.body.len(),
            });
        }

        let headers = std::mem::take(&mut self.headers);
        let raw = std::mem::take(&mut self.raw);
        let text = std::str::from_utf8(&self.body)?;
        let body = serde_json::from_str(text)?;

        Ok(RawMessage { headers, body, raw })
    }

    /// Drop the current message and start reading headers again.
    ///
    /// Buffered bytes that followed the message are preserved and parsed on the
    /// next `feed`. After a header-level failure the buffer is discarded too,
    /// since its message boundary is unknown.
    pub fn reset(&mut self) {
        if self.state == FramerState::Failed {
            self.pending.clear();
        }
        self.state = FramerState::ReadingHeaders;
        self.headers.clear();
        self.body.clear();
        self.raw.clear();
    }

    fn advance(&mut self) -> Result<(), FramingError> {
        loop {
            match self.state {
                FramerState::ReadingHeaders => {
                    let Some(line_end) = find_crlf(&self.pending) else {
                        if self.pending.len() > MAX_HEADER_LINE_SIZE {
                            return self.fail(FramingError::MalformedHeader(format!(
                                "header line exceeds {MAX_HEADER_LINE_SIZE} bytes"
                            )));
                        }
                        return Ok(());
                    };

                    let line: Vec<u8> = self.pending.drain(..line_end + 2).collect();
                    self.raw.extend_from_slice(&line);
                    let line = &line[..line_end];

                    if line.is_empty() {
                        let content_length = match self.content_length() {
                            Ok(length) => length,
                            Err(e) => return self.fail(e),
                        };
                        self.body.reserve(content_length);
                        self.state = FramerState::ReadingBody { content_length };
                        continue;
                    }

                    match parse_header_line(line) {
                        Ok(header) => self.headers.push(header),
                        Err(e) => return self.fail(e),
                    }
                }
                FramerState::ReadingBody { content_length } => {
                    let missing = content_length - self.body.len();
                    let available = missing.min(self.pending.len());
                    self.body.extend(self.pending.drain(..available));

                    if self.body.len() < content_length {
                        trace!(
                            "MessageFramer: Incomplete message - need {} more bytes",
                            content_length - self.body.len()
                        );
                        return Ok(());
                    }

                    self.raw.extend_from_slice(&self.body);
                    self.state = FramerState::Complete;
                    trace!(
                        "MessageFramer: Parsed complete message ({} bytes)",
                        content_length
                    );
                    return Ok(());
                }
                FramerState::Complete | FramerState::Failed => return Ok(()),
            }
        }
    }

    fn fail(&mut self, error: FramingError) -> Result<(), FramingError> {
        self.state = FramerState::Failed;
        Err(error)
    }

    fn content_length(&self) -> Result<usize, FramingError> {
        let value =
            find_header(&self.headers, CONTENT_LENGTH).ok_or(FramingError::MissingContentLength)?;
        let length = value
            .parse::<usize>()
            .map_err(|_| FramingError::InvalidContentLength(value.to_string()))?;

        if length > MAX_MESSAGE_SIZE {
            return Err(FramingError::MessageTooLarge {
                size: length,
                max: MAX_MESSAGE_SIZE,
            });
        }

        Ok(length)
    }
}

fn find_crlf(bytes: &[u8]) -> Option<usize> {
    bytes.windows(2).position(|window| window == b"\r\n")
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn parse_header_line(line: &[u8]) -> Result<(String, String), FramingError> {
    let malformed = || FramingError::MalformedHeader(String::from_utf8_lossy(line).into_owned());

    let text = std::str::from_utf8(line).map_err(|_| malformed())?;
    let (name, value) = text.split_once(':').ok_or_else(malformed)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(malformed());
    }

    Ok((name.to_string(), value.trim().to_string()))
}

/// Frame an outgoing message: JSON body preceded by Content-Length and
/// Content-Type headers and a blank line.
pub fn encode_message<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    let content = serde_json::to_string(message)?;

    let mut framed = String::with_capacity(content.len() + 96);
    framed.push_str(&format!("{}: {}\r\n", CONTENT_LENGTH, content.len()));
    framed.push_str(&format!("Content-Type: {CONTENT_TYPE_VALUE}\r\n"));
    framed.push_str("\r\n");
    framed.push_str(&content);

    trace!(
        "MessageFramer: Encoded framed message ({} bytes content)",
        content.len()
    );
    Ok(framed)
}

/// Codec adapter driving a [`MessageFramer`] from a byte stream.
///
/// Framing failures are yielded as items so the session can answer them;
/// only I/O failures end the stream.
#[derive(Debug, Default)]
pub struct LspCodec {
    framer: MessageFramer,
}

impl LspCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for LspCodec {
    type Item = Result<RawMessage, FramingError>;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let chunk = src.split();

        if let Err(e) = self.framer.feed(&chunk) {
            self.framer.reset();
            return Ok(Some(Err(e)));
        }

        if !self.framer.is_message_complete() {
            return Ok(None);
        }

        let message = self.framer.take_message();
        self.framer.reset();
        Ok(Some(message))
    }
}
