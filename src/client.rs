//! Client side of the message lookup protocol.
//!
//! `Client` issues one request per round and waits for exactly one response.
//! A request carrying the close flag is the last one on the connection: the
//! client moves to `Closed` and refuses further requests.
//!
//! The interactive console loop lives here too, written against generic
//! readers and writers so the binary only has to plug in stdin and stdout.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, trace};

use crate::error::ProtocolError;
use crate::protocol::{read_response, write_request, Request, Response};

const INDEX_PROMPT: &str = "Message number (0 for random): ";
const CLOSE_PROMPT: &str = "Close connection after response? (y/n): ";
const INDEX_RETRY: &str = "Please enter a whole number.\n";

/// Connection state as seen from the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// More requests may be sent.
    Open,
    /// A closing request was answered, or the connection failed.
    Closed,
}

/// Drives requests over one connection.
pub struct Client<S> {
    stream: S,
    state: ClientState,
    rounds: u64,
}

impl Client<TcpStream> {
    /// Connect to a server.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ProtocolError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!(peer = ?stream.peer_addr().ok(), "Connected to server");
        Ok(Self::new(stream))
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            state: ClientState::Open,
            rounds: 0,
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ClientState::Closed
    }

    /// Completed request/response rounds.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Send one request and wait for its response.
    ///
    /// Fails with `ProtocolError::Finished` once the connection has been
    /// closed by an earlier request. A transport or framing failure also
    /// leaves the client closed.
    pub async fn request(&mut self, request: Request) -> Result<Response, ProtocolError> {
        if self.is_closed() {
            return Err(ProtocolError::Finished);
        }

        let response = match self.exchange(&request).await {
            Ok(response) => response,
            Err(e) => {
                self.state = ClientState::Closed;
                return Err(e);
            }
        };

        self.rounds += 1;
        if request.close_after_response {
            self.state = ClientState::Closed;
            // The server closes its side as well; a failed shutdown changes nothing.
            let _ = self.stream.shutdown().await;
        }

        Ok(response)
    }

    async fn exchange(&mut self, request: &Request) -> Result<Response, ProtocolError> {
        trace!(
            index = request.message_index,
            close = request.close_after_response,
            "Sending request"
        );
        write_request(&mut self.stream, request).await?;
        let response = read_response(&mut self.stream).await?;
        trace!(status = ?response.status, "Received response");
        Ok(response)
    }
}

/// Parse a message number typed at the console.
pub fn parse_index(input: &str) -> Option<i32> {
    input.trim().parse().ok()
}

/// Whether a console answer asks to close the connection.
///
/// Accepts `y`, `yes`, `s` and `sim` in any case; everything else keeps the
/// connection open.
pub fn parse_close_choice(input: &str) -> bool {
    matches!(
        input.trim().to_ascii_lowercase().as_str(),
        "y" | "yes" | "s" | "sim"
    )
}

/// Console line for a response.
pub fn render(response: &Response) -> String {
    if response.is_ok() {
        format!("Message: {}", response.text)
    } else {
        format!("Error: {}", response.text)
    }
}

/// Interactive loop: prompt, send, print, until the user closes the
/// connection or the input ends.
pub async fn run_console<S, I, O>(
    client: &mut Client<S>,
    input: I,
    output: &mut O,
) -> Result<(), ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    while !client.is_closed() {
        let index = loop {
            prompt(output, INDEX_PROMPT).await?;
            let Some(line) = lines.next_line().await? else {
                return Ok(());
            };
            match parse_index(&line) {
                Some(index) => break index,
                None => output.write_all(INDEX_RETRY.as_bytes()).await?,
            }
        };

        prompt(output, CLOSE_PROMPT).await?;
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        let close = parse_close_choice(&line);

        let response = client.request(Request::new(index, close)).await?;
        output
            .write_all(format!("{}\n\n", render(&response)).as_bytes())
            .await?;
        output.flush().await?;
    }

    Ok(())
}

async fn prompt<O: AsyncWrite + Unpin>(output: &mut O, text: &str) -> Result<(), ProtocolError> {
    output.write_all(text.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use tokio_test::io::Builder;

    fn request_frame(index: i32, close: bool) -> BytesMut {
        let mut buf = BytesMut::new();
        Request::new(index, close).encode(&mut buf);
        buf
    }

    fn response_frame(response: Response) -> BytesMut {
        let mut buf = BytesMut::new();
        response.encode(&mut buf);
        buf
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("3"), Some(3));
        assert_eq!(parse_index("  0 \n"), Some(0));
        assert_eq!(parse_index("-2"), Some(-2));
        assert_eq!(parse_index("two"), None);
        assert_eq!(parse_index(""), None);
    }

    #[test]
    fn test_parse_close_choice() {
        for yes in ["y", "Y", "yes", "s", "S", "sim", " y "] {
            assert!(parse_close_choice(yes), "{yes:?}");
        }
        for no in ["n", "no", "", "maybe"] {
            assert!(!parse_close_choice(no), "{no:?}");
        }
    }

    #[test]
    fn test_render() {
        assert_eq!(render(&Response::ok("World")), "Message: World");
        assert_eq!(
            render(&Response::error("valid values: 0 to 3")),
            "Error: valid values: 0 to 3"
        );
    }

    #[tokio::test]
    async fn test_persistent_then_closing_request() {
        let stream = Builder::new()
            .write(&request_frame(1, false))
            .read(&response_frame(Response::ok("Hello")))
            .write(&request_frame(9, true))
            .read(&response_frame(Response::out_of_range(3)))
            .build();
        let mut client = Client::new(stream);

        let response = client.request(Request::new(1, false)).await.unwrap();
        assert_eq!(response, Response::ok("Hello"));
        assert_eq!(client.state(), ClientState::Open);

        let response = client.request(Request::new(9, true)).await.unwrap();
        assert!(!response.is_ok());
        assert_eq!(response.text, "valid values: 0 to 3");
        assert!(client.is_closed());
        assert_eq!(client.rounds(), 2);

        let result = client.request(Request::new(1, false)).await;
        assert!(matches!(result, Err(ProtocolError::Finished)));
    }

    #[tokio::test]
    async fn test_server_drop_closes_client() {
        let stream = Builder::new().write(&request_frame(1, false)).build();
        let mut client = Client::new(stream);

        let result = client.request(Request::new(1, false)).await;
        assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
        assert!(client.is_closed());
        assert_eq!(client.rounds(), 0);
    }

    #[tokio::test]
    async fn test_console_session() {
        let stream = Builder::new()
            .write(&request_frame(2, false))
            .read(&response_frame(Response::ok("World")))
            .write(&request_frame(5, true))
            .read(&response_frame(Response::out_of_range(3)))
            .build();
        let mut client = Client::new(stream);

        let input: &[u8] = b"2\nn\nabc\n5\ny\n";
        let mut output = Vec::new();
        run_console(&mut client, input, &mut output).await.unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Message: World\n"));
        assert!(output.contains(INDEX_RETRY));
        assert!(output.contains("Error: valid values: 0 to 3\n"));
        assert!(client.is_closed());
    }

    #[tokio::test]
    async fn test_console_stops_at_end_of_input() {
        let stream = Builder::new()
            .write(&request_frame(0, false))
            .read(&response_frame(Response::ok("Foo")))
            .build();
        let mut client = Client::new(stream);

        let input: &[u8] = b"0\nn\n";
        let mut output = Vec::new();
        run_console(&mut client, input, &mut output).await.unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Message: Foo"));
        assert!(output.ends_with(INDEX_PROMPT));
        assert!(!client.is_closed());
    }
}
