use serde::Serialize;
use serde_json::{Map, Value};
use std::io::{self, Read, Write};
use std::path::PathBuf;

use crate::channel::ChannelState;
use crate::exit;
use crate::install::paths::Scope;

pub const MAX_TO_BROWSER: usize = 1_048_576; // 1 MB (host -> browser)
pub const MAX_FROM_BROWSER: usize = 64 * 1_048_576; // 64 MB (browser -> host)

/// Size of the little-endian `u32` length prefix.
pub const HEADER_LEN: usize = 4;

/// Every failure the host can run into. All of them are fatal for the exchange.
#[derive(Debug, thiserror::Error)]
pub enum NmError {
    /// stdin closed before a single header byte arrived.
    #[error("native messaging stream closed before a frame header was received")]
    Disconnected,

    #[error("frame header truncated ({received} of 4 bytes received)")]
    TruncatedHeader { received: usize },

    #[error("frame body truncated ({received} of {expected} bytes received)")]
    TruncatedBody { expected: usize, received: usize },

    #[error("incoming message too large ({size} bytes, max {max})")]
    IncomingTooLarge { size: usize, max: usize },

    #[error("outgoing message too large ({size} bytes, max {max})")]
    OutgoingTooLarge { size: usize, max: usize },

    #[error("failed to serialize JSON: {0}")]
    SerializeJson(#[source] serde_json::Error),

    #[error("invalid JSON payload: {0}")]
    DeserializeJson(#[source] serde_json::Error),

    #[error("cannot check host manifest at {path:?}: {source}")]
    Registration {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot forward message to {path:?}: {source}")]
    Forward {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read config file {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown browser {0:?}")]
    UnknownBrowser(String),

    #[error("no {scope} manifest location for {browser} on {os}")]
    NoManifestLocation {
        browser: String,
        scope: Scope,
        os: &'static str,
    },

    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    #[error("channel step out of order (expected {expected:?}, channel is {actual:?})")]
    OutOfOrder {
        expected: ChannelState,
        actual: ChannelState,
    },

    #[error("native messaging I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, NmError>;

impl NmError {
    /// Process exit status reported for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            NmError::Disconnected
            | NmError::TruncatedHeader { .. }
            | NmError::TruncatedBody { .. } => exit::FAILURE,
            NmError::IncomingTooLarge { .. }
            | NmError::OutgoingTooLarge { .. }
            | NmError::DeserializeJson(_) => exit::DATA_INVALID,
            NmError::Registration { source, .. }
            | NmError::Forward { source, .. }
            | NmError::Io(source) => io_exit_code(source),
            NmError::ConfigRead { .. }
            | NmError::ConfigParse { .. }
            | NmError::InvalidConfig(_)
            | NmError::UnknownBrowser(_)
            | NmError::NoManifestLocation { .. }
            | NmError::MissingEnv(_) => exit::USAGE,
            NmError::SerializeJson(_) | NmError::OutOfOrder { .. } => exit::INTERNAL,
        }
    }
}

fn io_exit_code(err: &io::Error) -> i32 {
    match err.kind() {
        io::ErrorKind::PermissionDenied => exit::PERMISSION_DENIED,
        _ => exit::FAILURE,
    }
}

/// One inbound message: the JSON object plus the exact bytes it was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    raw: Vec<u8>,
    body: Map<String, Value>,
}

impl DecodedMessage {
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.raw
    }

    pub fn into_parts(self) -> (Vec<u8>, Map<String, Value>) {
        (self.raw, self.body)
    }
}

/// Encode any serde-serializable value into the native-messaging frame:
/// 4-byte little-endian length + JSON bytes.
pub fn encode_message<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(msg).map_err(NmError::SerializeJson)?;
    if json.len() > MAX_TO_BROWSER {
        return Err(NmError::OutgoingTooLarge {
            size: json.len(),
            max: MAX_TO_BROWSER,
        });
    }
    let mut out = Vec::with_capacity(HEADER_LEN + json.len());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&json);
    Ok(out)
}

/// Write one frame and flush, so the peer sees it before we block on reading.
pub fn write_message<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> Result<usize> {
    let frame = encode_message(msg)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(frame.len())
}

/// Block until the 4-byte length prefix has been read.
pub fn read_header<R: Read>(reader: &mut R) -> Result<u32> {
    let mut len_buf = Vec::with_capacity(HEADER_LEN);
    reader
        .by_ref()
        .take(HEADER_LEN as u64)
        .read_to_end(&mut len_buf)?;
    match len_buf.len() {
        0 => Err(NmError::Disconnected),
        HEADER_LEN => Ok(u32::from_le_bytes([
            len_buf[0], len_buf[1], len_buf[2], len_buf[3],
        ])),
        received => Err(NmError::TruncatedHeader { received }),
    }
}

/// Block until exactly `len` payload bytes have been read.
pub fn read_body<R: Read>(reader: &mut R, len: u32, max_size: usize) -> Result<Vec<u8>> {
    let expected = len as usize;
    let cap = max_size.min(MAX_FROM_BROWSER);
    if expected > cap {
        return Err(NmError::IncomingTooLarge {
            size: expected,
            max: cap,
        });
    }
    let mut buf = Vec::with_capacity(expected);
    reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != expected {
        return Err(NmError::TruncatedBody {
            expected,
            received: buf.len(),
        });
    }
    Ok(buf)
}

/// Parse a raw payload as a JSON object, keeping the bytes.
pub fn decode_payload(raw: Vec<u8>) -> Result<DecodedMessage> {
    let body: Map<String, Value> =
        serde_json::from_slice(&raw).map_err(NmError::DeserializeJson)?;
    Ok(DecodedMessage { raw, body })
}

/// Decode a single framed message from a reader (useful in tests).
pub fn decode_message<R: Read>(reader: &mut R, max_size: usize) -> Result<DecodedMessage> {
    let len = read_header(&mut *reader)?;
    let raw = read_body(&mut *reader, len, max_size)?;
    decode_payload(raw)
}
