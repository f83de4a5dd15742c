/*!
error module defines the error types used in gillstream.

[ParserError] covers decoding of a single MRT dump file, [GillError] covers the
acquisition pipeline (query construction, broker resolution, file retrieval).
*/
use num_enum::{TryFromPrimitive, TryFromPrimitiveError};
use oneio::OneIoError;
use std::io;
use std::io::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    /// A general IO error triggered by the internal reader.
    #[error(transparent)]
    IoError(io::Error),
    /// The reader ended in the middle of a record.
    #[error("unexpected end of file: {0}")]
    EofError(io::Error),
    /// Clean end of file at a record boundary.
    #[error("reach end of file")]
    EofExpected,
    /// Failure to open a local or compressed file.
    #[error(transparent)]
    OneIoError(#[from] OneIoError),
    /// This error represents a [num_enum::TryFromPrimitiveError] error for any of a number of
    /// different types.
    #[error("unrecognized value {value} for {type_name}")]
    UnrecognizedEnumVariant { type_name: &'static str, value: u64 },
    #[error("not enough bytes to read")]
    IoNotEnoughBytes(),
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("truncated message: {0}")]
    TruncatedMsg(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl<T> From<TryFromPrimitiveError<T>> for ParserError
where
    T: TryFromPrimitive,
    T::Primitive: Into<u64>,
{
    #[inline]
    fn from(value: TryFromPrimitiveError<T>) -> Self {
        ParserError::UnrecognizedEnumVariant {
            type_name: T::NAME,
            value: value.number.into(),
        }
    }
}

impl From<io::Error> for ParserError {
    fn from(io_error: io::Error) -> Self {
        match io_error.kind() {
            ErrorKind::UnexpectedEof => ParserError::EofError(io_error),
            _ => ParserError::IoError(io_error),
        }
    }
}

/// Errors raised while building or feeding a [GillStream](crate::GillStream).
///
/// Only query construction and broker resolution surface these to the caller; per-file
/// failures inside a running stream are logged and skipped.
#[derive(Debug, Error)]
pub enum GillError {
    #[error("invalid time {0:?}, expected a unix timestamp or 'YYYY-MM-DD HH:MM:SS'")]
    InvalidTime(String),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("unknown record type {0:?}, expected 'updates' or 'ribs'")]
    InvalidRecordType(String),
    #[error("unable to reach broker after {attempts} attempts")]
    BrokerUnreachable { attempts: usize },
    #[error("invalid broker URL {url}: {reason}")]
    InvalidBrokerUrl { url: String, reason: String },
    #[error("malformed broker payload: {0}")]
    BrokerPayload(String),
    #[error("GET {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("refusing to store {url} from peer {peer:?} outside the temporary directory")]
    UnsafeLocalPath { url: String, peer: String },
    #[error("unable to download {url} after {attempts} attempts")]
    FetchFailed { url: String, attempts: usize },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Parser(#[from] ParserError),
}
