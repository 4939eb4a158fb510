//! Legacy remote protocol framing.
//!
//! The pre-2016 TVs speak a binary protocol over TCP port 55000. Every frame
//! is an envelope around a payload:
//!
//! ```text
//! 0x00 | len(app_name) | 0x00 | app_name | len(payload) | 0x00 | payload
//! ```
//!
//! Payloads are built from base64 *fields*, each written as
//! `len(encoded) | 0x00 | encoded`. All lengths are a single byte, so no field,
//! application name or payload may exceed 255 bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::protocol_constants::{
    LEGACY_COMMAND_PREFIX, LEGACY_ENVELOPE_APP_NAME, LEGACY_HANDSHAKE_HEADER,
};

/// Largest value a single-byte length prefix can describe.
const MAX_FIELD_LEN: usize = u8::MAX as usize;

/// Errors produced while building or parsing legacy frames.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// A length-prefixed section does not fit in a single length byte.
    #[error("{section} is {len} bytes, the legacy format allows at most 255")]
    TooLong {
        /// Which section overflowed.
        section: &'static str,
        /// Actual length in bytes.
        len: usize,
    },

    /// The frame ended before a declared section was complete.
    #[error("frame truncated while reading {0}")]
    Truncated(&'static str),

    /// A padding byte that must be zero was not.
    #[error("expected zero padding before {0}")]
    BadPadding(&'static str),

    /// A field did not contain valid base64.
    #[error("invalid base64 field: {0}")]
    Base64(#[from] base64::DecodeError),

    /// A decoded field or application name was not UTF-8.
    #[error("field is not valid UTF-8")]
    Utf8,
}

/// Convenient Result alias for framing operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// A parsed legacy envelope borrowing from the received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    /// Application name the frame was tagged with.
    pub app_name: &'a str,
    /// Inner payload bytes.
    pub payload: &'a [u8],
}

fn length_byte(section: &'static str, len: usize) -> CodecResult<u8> {
    if len > MAX_FIELD_LEN {
        return Err(CodecError::TooLong { section, len });
    }
    Ok(len as u8)
}

/// Appends `value` as a base64 field: length byte, zero pad, encoded bytes.
fn put_base64_field(buf: &mut BytesMut, value: &str) -> CodecResult<()> {
    let encoded = STANDARD.encode(value);
    buf.put_u8(length_byte("base64 field", encoded.len())?);
    buf.put_u8(0x00);
    buf.put_slice(encoded.as_bytes());
    Ok(())
}

/// Builds the handshake payload identifying the connecting application.
///
/// # Arguments
/// * `host` - Address of the TV being controlled
/// * `app_id` - Application identifier registered with the TV
/// * `app_name` - Human-readable application name shown by the TV
pub fn encode_handshake(host: &str, app_id: &str, app_name: &str) -> CodecResult<Bytes> {
    let mut buf = BytesMut::with_capacity(128);
    buf.put_slice(&LEGACY_HANDSHAKE_HEADER);
    put_base64_field(&mut buf, host)?;
    put_base64_field(&mut buf, app_id)?;
    put_base64_field(&mut buf, app_name)?;
    Ok(buf.freeze())
}

/// Builds the payload for a single key press.
pub fn encode_command(key: &str) -> CodecResult<Bytes> {
    let mut buf = BytesMut::with_capacity(64);
    buf.put_slice(&LEGACY_COMMAND_PREFIX);
    put_base64_field(&mut buf, key)?;
    Ok(buf.freeze())
}

/// Wraps a payload in the envelope the TV expects.
pub fn wrap(payload: &[u8]) -> CodecResult<Bytes> {
    wrap_with_app_name(LEGACY_ENVELOPE_APP_NAME, payload)
}

/// Wraps a payload in an envelope tagged with an arbitrary application name.
pub fn wrap_with_app_name(app_name: &str, payload: &[u8]) -> CodecResult<Bytes> {
    let name_len = length_byte("application name", app_name.len())?;
    let payload_len = length_byte("payload", payload.len())?;

    let mut buf = BytesMut::with_capacity(5 + app_name.len() + payload.len());
    buf.put_u8(0x00);
    buf.put_u8(name_len);
    buf.put_u8(0x00);
    buf.put_slice(app_name.as_bytes());
    buf.put_u8(payload_len);
    buf.put_u8(0x00);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Splits `len` bytes off the front of `input`.
fn take<'a>(input: &'a [u8], len: usize, what: &'static str) -> CodecResult<(&'a [u8], &'a [u8])> {
    if input.len() < len {
        return Err(CodecError::Truncated(what));
    }
    Ok(input.split_at(len))
}

/// Parses an envelope produced by [`wrap`] / [`wrap_with_app_name`].
///
/// Bytes following the declared payload are ignored; the TV may coalesce
/// several frames into one read.
pub fn unwrap(frame: &[u8]) -> CodecResult<Envelope<'_>> {
    let (head, rest) = take(frame, 3, "envelope header")?;
    if head[0] != 0x00 || head[2] != 0x00 {
        return Err(CodecError::BadPadding("application name"));
    }
    let (name, rest) = take(rest, head[1] as usize, "application name")?;
    let app_name = std::str::from_utf8(name).map_err(|_| CodecError::Utf8)?;

    let (len, rest) = take(rest, 2, "payload length")?;
    if len[1] != 0x00 {
        return Err(CodecError::BadPadding("payload"));
    }
    let (payload, _) = take(rest, len[0] as usize, "payload")?;

    Ok(Envelope { app_name, payload })
}

/// Decodes one base64 field from the front of `input`.
///
/// Returns the decoded string and the remaining bytes.
pub fn decode_field(input: &[u8]) -> CodecResult<(String, &[u8])> {
    let (len, rest) = take(input, 2, "field length")?;
    if len[1] != 0x00 {
        return Err(CodecError::BadPadding("field"));
    }
    let (encoded, rest) = take(rest, len[0] as usize, "field")?;
    let decoded = STANDARD.decode(encoded)?;
    let value = String::from_utf8(decoded).map_err(|_| CodecError::Utf8)?;
    Ok((value, rest))
}
