//! Binary wire protocol for message lookup.
//!
//! Two fixed-size frames travel over the stream:
//! - Request (client -> server), 6 bytes
//! - Response (server -> client), 128 bytes
//!
//! ```text
//! Request:  [tag u8 = 1][message_index i32 BE][close_after_response u8]
//! Response: [status u8][text: 127 bytes UTF-8, space padded]
//! ```
//!
//! Response text longer than 127 bytes is cut at the last UTF-8 code point
//! boundary that fits. Decoding trims trailing whitespace, so text that really
//! ends in spaces does not survive a round trip unchanged.

use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;

/// Discriminator carried in the first byte of every request frame.
pub const REQUEST_TAG: u8 = 1;

/// Size of an encoded request.
pub const REQUEST_FRAME_LEN: usize = 6;

/// Size of the text field of a response.
pub const RESPONSE_TEXT_LEN: usize = 127;

/// Size of an encoded response.
pub const RESPONSE_FRAME_LEN: usize = 1 + RESPONSE_TEXT_LEN;

/// Byte used to pad response text.
const PADDING: u8 = b' ';

/// A client request for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    /// 1-based message number, or 0 for a random message.
    pub message_index: i32,
    /// Close the connection once the response has been sent.
    pub close_after_response: bool,
}

impl Request {
    pub fn new(message_index: i32, close_after_response: bool) -> Self {
        Self {
            message_index,
            close_after_response,
        }
    }

    /// Ask for a random message.
    pub fn random(close_after_response: bool) -> Self {
        Self::new(0, close_after_response)
    }

    pub fn is_random(&self) -> bool {
        self.message_index == 0
    }

    /// Append the 6-byte frame to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(REQUEST_FRAME_LEN);
        buf.put_u8(REQUEST_TAG);
        buf.put_i32(self.message_index);
        buf.put_u8(u8::from(self.close_after_response));
    }

    /// Decode a complete request frame.
    pub fn decode(frame: &[u8; REQUEST_FRAME_LEN]) -> Result<Self, ProtocolError> {
        let mut buf = &frame[..];
        let tag = buf.get_u8();
        if tag != REQUEST_TAG {
            return Err(ProtocolError::InvalidTag {
                expected: REQUEST_TAG,
                found: tag,
            });
        }
        let message_index = buf.get_i32();
        let close_after_response = buf.get_u8() != 0;
        Ok(Self::new(message_index, close_after_response))
    }
}

/// Outcome carried in the first byte of a response.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok = 0,
    Error = 1,
}

impl Status {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Status::Ok),
            1 => Some(Status::Error),
            _ => None,
        }
    }
}

/// A server response: either the requested message or an error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub text: String,
}

impl Response {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            text: text.into(),
        }
    }

    /// Error reply for a message number outside `0..=total`.
    pub fn out_of_range(total: usize) -> Self {
        Self::error(format!("valid values: 0 to {total}"))
    }

    /// Error reply for a random request against an empty catalog.
    pub fn no_messages() -> Self {
        Self::error("no messages available")
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Append the 128-byte frame to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        let text = truncate_to_boundary(&self.text, RESPONSE_TEXT_LEN);

        buf.reserve(RESPONSE_FRAME_LEN);
        buf.put_u8(self.status as u8);
        buf.put_slice(text.as_bytes());
        buf.put_bytes(PADDING, RESPONSE_TEXT_LEN - text.len());
    }

    /// Decode a complete response frame.
    pub fn decode(frame: &[u8; RESPONSE_FRAME_LEN]) -> Result<Self, ProtocolError> {
        let status = Status::from_u8(frame[0]).ok_or(ProtocolError::InvalidStatus(frame[0]))?;
        let text = String::from_utf8_lossy(&frame[1..]);
        Ok(Self {
            status,
            text: text.trim_end().to_string(),
        })
    }
}

/// Longest prefix of `text` that fits in `max` bytes without splitting a
/// code point.
fn truncate_to_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Read one request frame.
///
/// The tag byte is checked before the rest of the frame is read, so a peer
/// speaking something else is rejected without waiting for more bytes.
pub async fn read_request<R>(reader: &mut R) -> Result<Request, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut frame = [0u8; REQUEST_FRAME_LEN];
    frame[0] = reader.read_u8().await?;
    if frame[0] != REQUEST_TAG {
        return Err(ProtocolError::InvalidTag {
            expected: REQUEST_TAG,
            found: frame[0],
        });
    }
    reader.read_exact(&mut frame[1..]).await?;
    Request::decode(&frame)
}

/// Write one request frame and flush.
pub async fn write_request<W>(writer: &mut W, request: &Request) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(REQUEST_FRAME_LEN);
    request.encode(&mut buf);
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one response frame.
pub async fn read_response<R>(reader: &mut R) -> Result<Response, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut frame = [0u8; RESPONSE_FRAME_LEN];
    reader.read_exact(&mut frame).await?;
    Response::decode(&frame)
}

/// Write one response frame and flush.
pub async fn write_response<W>(writer: &mut W, response: &Response) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(RESPONSE_FRAME_LEN);
    response.encode(&mut buf);
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}
