//! compiler::transport
//!
//! Transport seam for the out-of-band compiler channel.
//!
//! # Design
//!
//! The traits are async because the channel involves network I/O. A
//! [`CompilerTransport`] opens one connection per creation request and sends
//! the request during `connect`; the returned [`CompilerStream`] is then
//! pulled for result messages by the single task that owns the corresponding
//! status record. `Ok(None)` from the stream is a normal close; an abnormal
//! close or any transport failure is an error and must leave the status
//! record untouched.

use async_trait::async_trait;
use thiserror::Error;

use super::protocol::{SyntaxCreationRequest, SyntaxCreationResult};

/// Errors from the compiler channel.
#[derive(Debug, Clone, Error)]
pub enum CompilerError {
    /// The channel endpoint is not a usable WebSocket URL.
    #[error("invalid compiler endpoint '{url}': {message}")]
    InvalidEndpoint {
        /// The offending URL
        url: String,
        /// What was wrong with it
        message: String,
    },

    /// Opening the channel failed.
    #[error("failed to open compiler channel: {0}")]
    Connect(String),

    /// Sending the creation request failed.
    #[error("failed to send creation request: {0}")]
    Send(String),

    /// Receiving from the channel failed.
    #[error("compiler channel failure: {0}")]
    Receive(String),

    /// The channel closed with a non-normal close code.
    #[error("compiler channel closed abnormally ({code}): {reason}")]
    AbnormalClose {
        /// The close code sent by the peer
        code: u16,
        /// The close reason, possibly empty
        reason: String,
    },

    /// A frame arrived that does not deserialize as a result message.
    #[error("malformed compiler message: {0}")]
    MalformedMessage(String),
}

/// Opens one channel per creation request.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the coordinator shares one
/// transport across all submitted requests.
#[async_trait]
pub trait CompilerTransport: Send + Sync {
    /// Open a connection and send `request` over it.
    ///
    /// # Errors
    ///
    /// - `InvalidEndpoint` / `Connect` if the channel cannot be opened
    /// - `Send` if the request cannot be written
    async fn connect(
        &self,
        request: &SyntaxCreationRequest,
    ) -> Result<Box<dyn CompilerStream>, CompilerError>;
}

/// One open channel, pulled for result messages.
#[async_trait]
pub trait CompilerStream: Send + std::fmt::Debug {
    /// The next result message.
    ///
    /// Returns `Ok(None)` when the peer closed the channel normally.
    ///
    /// # Errors
    ///
    /// - `AbnormalClose` for a non-normal close code
    /// - `Receive` for transport-level failures
    /// - `MalformedMessage` for an undecodable frame
    async fn next_result(&mut self) -> Result<Option<SyntaxCreationResult>, CompilerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            format!(
                "{}",
                CompilerError::AbnormalClose {
                    code: 1006,
                    reason: "going away".into()
                }
            ),
            "compiler channel closed abnormally (1006): going away"
        );
        assert_eq!(
            format!("{}", CompilerError::Connect("connection refused".into())),
            "failed to open compiler channel: connection refused"
        );
    }
}
