//! Line-delimited JSON-RPC 2.0 codec for the stdio transport.
//!
//! One message per line, UTF-8, no embedded newlines. Blank lines are
//! skipped. Lines that are not UTF-8 or exceed `max_line_bytes` become
//! parse errors; the stream stays usable.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::types::{Error, INVALID_REQUEST, PARSE_ERROR};

pub const JSONRPC_VERSION: &str = "2.0";

/// Default cap on a single inbound line.
pub const DEFAULT_MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Inbound request or notification. Notifications carry no `id` member;
/// `"id": null` is a request and gets a reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default, deserialize_with = "present")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl Request {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Maps a present member (including `null`) to `Some`; absence stays `None`
/// through `#[serde(default)]`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<&Error> for RpcError {
    fn from(err: &Error) -> Self {
        Self {
            code: err.to_rpc_error_code(),
            message: err.to_string(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self::failure(
            id,
            RpcError {
                code,
                message: message.into(),
                data: None,
            },
        )
    }
}

/// Server-to-client notification message.
pub fn notification(method: &str) -> Value {
    json!({ "jsonrpc": JSONRPC_VERSION, "method": method })
}

/// Outcome of decoding one line.
#[derive(Debug)]
pub enum Inbound {
    Request(Request),
    /// Undecodable line; reply with this error and a null id.
    Invalid(Response),
}

/// Decode one non-empty line.
pub fn decode(line: &str) -> Inbound {
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            return Inbound::Invalid(Response::error(
                Value::Null,
                PARSE_ERROR,
                format!("Parse error: {e}"),
            ))
        }
    };
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    match serde_json::from_value::<Request>(value) {
        Ok(request) => Inbound::Request(request),
        Err(e) => Inbound::Invalid(Response::error(
            id,
            INVALID_REQUEST,
            format!("Invalid request: {e}"),
        )),
    }
}

/// Incremental line reader.
///
/// Partial lines stay buffered here between calls, so
/// [`next_message`](Self::next_message) can be raced in `tokio::select!`
/// without losing input. Memory per line is bounded by `max_line_bytes`.
#[derive(Debug)]
pub struct LineReader {
    buf: Vec<u8>,
    max_line_bytes: usize,
    /// Skipping the tail of an oversized line.
    discarding: bool,
}

impl LineReader {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_line_bytes,
            discarding: false,
        }
    }

    /// Read and decode the next non-blank line. `None` on EOF.
    pub async fn next_message<R: AsyncBufRead + Unpin>(
        &mut self,
        reader: &mut R,
    ) -> std::io::Result<Option<Inbound>> {
        loop {
            if self.discarding {
                let available = reader.fill_buf().await?;
                if available.is_empty() {
                    self.discarding = false;
                    return Ok(Some(self.oversized()));
                }
                match available.iter().position(|&b| b == b'\n') {
                    Some(end) => {
                        reader.consume(end + 1);
                        self.discarding = false;
                        return Ok(Some(self.oversized()));
                    }
                    None => {
                        let len = available.len();
                        reader.consume(len);
                        continue;
                    }
                }
            }

            let limit = (self.max_line_bytes + 1).saturating_sub(self.buf.len()) as u64;
            let read = (&mut *reader)
                .take(limit)
                .read_until(b'\n', &mut self.buf)
                .await?;

            let complete = self.buf.last() == Some(&b'\n');
            if !complete && self.buf.len() > self.max_line_bytes {
                self.buf.clear();
                self.discarding = true;
                continue;
            }
            if read == 0 && self.buf.is_empty() {
                return Ok(None);
            }
            if !complete && read != 0 {
                continue;
            }

            let bytes = std::mem::take(&mut self.buf);
            let line = match String::from_utf8(bytes) {
                Ok(line) => line,
                Err(_) => {
                    return Ok(Some(Inbound::Invalid(Response::error(
                        Value::Null,
                        PARSE_ERROR,
                        "Parse error: message is not valid UTF-8",
                    ))))
                }
            };
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(decode(trimmed)));
            }
        }
    }

    fn oversized(&self) -> Inbound {
        Inbound::Invalid(Response::error(
            Value::Null,
            PARSE_ERROR,
            format!("Parse error: message exceeds {} bytes", self.max_line_bytes),
        ))
    }
}

/// Write one message followed by a newline, then flush.
pub async fn write_message<W: AsyncWrite + Unpin, T: Serialize>(
    writer: &mut W,
    message: &T,
) -> std::io::Result<()> {
    let mut bytes = serde_json::to_vec(message)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}
