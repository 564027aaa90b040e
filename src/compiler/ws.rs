//! compiler::ws
//!
//! WebSocket implementation of the compiler transport.
//!
//! # Design
//!
//! One WebSocket connection per creation request. The request is written as
//! a single text frame during `connect`; result messages arrive as text
//! frames. Ping, pong, and binary frames are skipped. A close frame with a
//! non-normal code surfaces as [`CompilerError::AbnormalClose`]; a normal
//! close (or the peer dropping the stream after its close handshake) ends
//! the stream with `Ok(None)`.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

use super::protocol::{SyntaxCreationRequest, SyntaxCreationResult};
use super::transport::{CompilerError, CompilerStream, CompilerTransport};

/// WebSocket transport for the remote grammar compiler.
#[derive(Debug, Clone)]
pub struct WsCompilerTransport {
    url: Url,
}

impl WsCompilerTransport {
    /// Create a transport for the given `ws://` or `wss://` endpoint.
    ///
    /// # Errors
    ///
    /// Returns `CompilerError::InvalidEndpoint` if the URL does not parse or
    /// uses another scheme.
    pub fn new(url: impl AsRef<str>) -> Result<Self, CompilerError> {
        let raw = url.as_ref();
        let url = Url::parse(raw).map_err(|e| CompilerError::InvalidEndpoint {
            url: raw.to_string(),
            message: e.to_string(),
        })?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(CompilerError::InvalidEndpoint {
                url: raw.to_string(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Ok(Self { url })
    }

    /// The configured endpoint.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl CompilerTransport for WsCompilerTransport {
    async fn connect(
        &self,
        request: &SyntaxCreationRequest,
    ) -> Result<Box<dyn CompilerStream>, CompilerError> {
        let (mut socket, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| CompilerError::Connect(e.to_string()))?;
        debug!(namespace = %request.namespace, "compiler channel established");

        let payload =
            serde_json::to_string(request).map_err(|e| CompilerError::Send(e.to_string()))?;
        socket
            .send(Message::Text(payload))
            .await
            .map_err(|e| CompilerError::Send(e.to_string()))?;

        Ok(Box::new(WsCompilerStream { socket }))
    }
}

#[derive(Debug)]
struct WsCompilerStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl CompilerStream for WsCompilerStream {
    async fn next_result(&mut self) -> Result<Option<SyntaxCreationResult>, CompilerError> {
        loop {
            match self.socket.next().await {
                None => return Ok(None),
                Some(Err(e)) => return Err(CompilerError::Receive(e.to_string())),
                Some(Ok(Message::Text(text))) => {
                    let result = serde_json::from_str(&text)
                        .map_err(|e| CompilerError::MalformedMessage(e.to_string()))?;
                    return Ok(Some(result));
                }
                Some(Ok(Message::Close(frame))) => {
                    return match frame {
                        Some(frame) if frame.code != CloseCode::Normal => {
                            Err(CompilerError::AbnormalClose {
                                code: frame.code.into(),
                                reason: frame.reason.to_string(),
                            })
                        }
                        _ => Ok(None),
                    };
                }
                // Control and binary frames are not results
                Some(Ok(_)) => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ws_and_wss() {
        assert!(WsCompilerTransport::new("ws://localhost:8888/compile").is_ok());
        assert!(WsCompilerTransport::new("wss://compiler.example.org/compile").is_ok());
    }

    #[test]
    fn rejects_other_schemes() {
        let err = WsCompilerTransport::new("https://compiler.example.org").unwrap_err();
        assert!(matches!(err, CompilerError::InvalidEndpoint { .. }));
    }

    #[test]
    fn rejects_garbage() {
        assert!(WsCompilerTransport::new("not a url").is_err());
    }
}
