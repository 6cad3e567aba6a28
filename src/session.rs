//! Per-connection session state machine.
//!
//! Each accepted connection is driven by one `Session`, which owns the stream
//! and its own random number generator. The only thing sessions share is the
//! read-only `MessageStore`.
//!
//! ```text
//! AwaitRequest -> Validate -> Respond -> AwaitRequest
//!                                     \-> Terminated (close requested)
//! any failure ----------------------------> Terminated
//! ```

use std::sync::Arc;

use rand::rngs::StdRng;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::ProtocolError;
use crate::protocol::{read_request, write_response, Request, Response};
use crate::storage::MessageStore;

/// Current state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the next request frame.
    AwaitRequest,
    /// A request has been decoded and must be checked against the catalog.
    Validate(Request),
    /// A response is ready to be written.
    Respond {
        response: Response,
        /// Terminate once the response is out.
        close: bool,
    },
    /// The connection is finished; no further frames are read or written.
    Terminated,
}

/// What a session did before it ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Responses written to the client.
    pub requests_served: u64,
    /// The client asked for the connection to be closed.
    pub closed_by_request: bool,
}

/// Serves one client connection.
pub struct Session<S> {
    stream: S,
    store: Arc<MessageStore>,
    rng: StdRng,
    state: SessionState,
    summary: SessionSummary,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, store: Arc<MessageStore>, rng: StdRng) -> Self {
        Self {
            stream,
            store,
            rng,
            state: SessionState::AwaitRequest,
            summary: SessionSummary::default(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    /// Drive the session until it terminates.
    ///
    /// Returns the summary when the client closed the connection through a
    /// request. Any decode or transport failure ends the session and is
    /// returned; `summary()` still reports what was served before it.
    pub async fn run(&mut self) -> Result<SessionSummary, ProtocolError> {
        while !self.is_terminated() {
            self.step().await?;
        }
        Ok(self.summary)
    }

    /// Perform a single state transition.
    ///
    /// On error the session is left in `Terminated`.
    pub async fn step(&mut self) -> Result<(), ProtocolError> {
        let state = std::mem::replace(&mut self.state, SessionState::Terminated);

        self.state = match state {
            SessionState::AwaitRequest => {
                let request = read_request(&mut self.stream).await?;
                trace!(
                    index = request.message_index,
                    close = request.close_after_response,
                    "Received request"
                );
                SessionState::Validate(request)
            }

            SessionState::Validate(request) => SessionState::Respond {
                response: self.resolve(&request),
                close: request.close_after_response,
            },

            SessionState::Respond { response, close } => {
                write_response(&mut self.stream, &response).await?;
                self.summary.requests_served += 1;

                if close {
                    self.summary.closed_by_request = true;
                    self.stream.shutdown().await?;
                    SessionState::Terminated
                } else {
                    SessionState::AwaitRequest
                }
            }

            SessionState::Terminated => SessionState::Terminated,
        };

        Ok(())
    }

    /// Answer a request from the catalog.
    ///
    /// Out-of-range numbers become an ERROR response; the connection stays up.
    fn resolve(&mut self, request: &Request) -> Response {
        let total = self.store.total();

        let index = match usize::try_from(request.message_index) {
            Ok(index) if index <= total => index,
            _ => return Response::out_of_range(total),
        };

        let message = if index == 0 {
            match self.store.random(&mut self.rng) {
                Some(message) => message,
                None => return Response::no_messages(),
            }
        } else {
            match self.store.by_index(index) {
                Some(message) => message,
                None => return Response::out_of_range(total),
            }
        };

        Response::ok(message)
    }
}
