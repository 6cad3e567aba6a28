//! Error types shared by the server, the sessions and the client driver.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while moving frames over a connection.
///
/// Every variant is fatal to the connection it occurred on and to nothing
/// else. Out-of-range message numbers are not errors at this level: they
/// travel back to the client as an ordinary ERROR response.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The first byte of a request frame was not the request tag.
    #[error("invalid frame: expected tag {expected}, found {found}")]
    InvalidTag { expected: u8, found: u8 },

    /// A response frame carried a status byte we do not know.
    #[error("invalid frame: unknown response status {0}")]
    InvalidStatus(u8),

    /// The peer closed the stream before a full frame arrived.
    #[error("connection closed")]
    ConnectionClosed,

    /// The client already sent a closing request on this connection.
    #[error("connection already finished by a closing request")]
    Finished,

    /// Transport failure.
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
}

impl From<std::io::Error> for ProtocolError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ProtocolError::ConnectionClosed
        } else {
            ProtocolError::Io(e)
        }
    }
}

impl ProtocolError {
    /// True when the peer simply went away, as opposed to misbehaving.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ProtocolError::ConnectionClosed => true,
            ProtocolError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

/// Errors loading the message source at startup.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read message file '{}': {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("message source is empty, expected a message count on the first line")]
    MissingCount,

    #[error("invalid message count '{0}'")]
    InvalidCount(String),

    #[error("message source declares {declared} messages but only {found} lines follow")]
    Truncated { declared: usize, found: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_unexpected_eof_maps_to_connection_closed() {
        let err: ProtocolError = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert!(matches!(err, ProtocolError::ConnectionClosed));
        assert!(err.is_disconnect());
    }

    #[test]
    fn test_other_io_errors_are_kept() {
        let err: ProtocolError = io::Error::new(io::ErrorKind::PermissionDenied, "nope").into();
        assert!(matches!(err, ProtocolError::Io(_)));
        assert!(!err.is_disconnect());

        let reset: ProtocolError = io::Error::new(io::ErrorKind::ConnectionReset, "rst").into();
        assert!(reset.is_disconnect());
    }

    #[test]
    fn test_display() {
        let err = ProtocolError::InvalidTag {
            expected: 1,
            found: 7,
        };
        assert_eq!(err.to_string(), "invalid frame: expected tag 1, found 7");

        let err = LoadError::Truncated {
            declared: 3,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "message source declares 3 messages but only 2 lines follow"
        );
    }
}
