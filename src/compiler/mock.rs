//! compiler::mock
//!
//! Scripted compiler transport for deterministic testing.
//!
//! # Design
//!
//! The mock hands out one scripted connection per `connect` call, in the
//! order they were pushed, and records every request it sees. An exhausted
//! script yields connections that close normally without delivering a
//! result.
//!
//! # Example
//!
//! ```
//! use mrn_registry::compiler::mock::{ChannelEvent, MockCompilerTransport};
//! use mrn_registry::compiler::protocol::{SyntaxCreationRequest, SyntaxCreationResult};
//! use mrn_registry::compiler::transport::{CompilerStream, CompilerTransport};
//! use mrn_registry::core::entities::CreationState;
//! use mrn_registry::core::types::{Mrn, OwnerContact};
//!
//! # tokio_test::block_on(async {
//! let transport = MockCompilerTransport::new();
//! transport.push_connection(vec![ChannelEvent::Result(SyntaxCreationResult {
//!     code: CreationState::Complete,
//!     namespace: Some(Mrn::new("urn:mrn:test").unwrap()),
//!     regex: Some(r"^urn:mrn:test:\d+$".to_string()),
//!     message: None,
//! })]);
//!
//! let request = SyntaxCreationRequest::new(
//!     "grammar",
//!     Mrn::new("urn:mrn:test").unwrap(),
//!     None,
//!     OwnerContact::new("IALA", "ops@example.org"),
//! );
//! let mut stream = transport.connect(&request).await.unwrap();
//! let result = stream.next_result().await.unwrap().unwrap();
//! assert_eq!(result.code, CreationState::Complete);
//! assert_eq!(transport.requests().len(), 1);
//! # });
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::protocol::{SyntaxCreationRequest, SyntaxCreationResult};
use super::transport::{CompilerError, CompilerStream, CompilerTransport};

/// One scripted event on a mock channel.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// Deliver a result message.
    Result(SyntaxCreationResult),
    /// Close the channel normally.
    Close,
    /// Fail the channel with the given error.
    Fail(CompilerError),
}

/// Mock compiler transport.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone, Default)]
pub struct MockCompilerTransport {
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Debug, Default)]
struct MockInner {
    /// Scripted connections, consumed in push order.
    connections: VecDeque<Vec<ChannelEvent>>,
    /// Error to return from the next `connect` call.
    fail_connect: Option<CompilerError>,
    /// Requests seen, for verification.
    requests: Vec<SyntaxCreationRequest>,
}

impl MockCompilerTransport {
    /// Create a mock with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a scripted connection.
    pub fn push_connection(&self, events: Vec<ChannelEvent>) {
        self.inner.lock().unwrap().connections.push_back(events);
    }

    /// Make the next `connect` call fail with `error`.
    pub fn fail_next_connect(&self, error: CompilerError) {
        self.inner.lock().unwrap().fail_connect = Some(error);
    }

    /// All requests sent so far.
    pub fn requests(&self) -> Vec<SyntaxCreationRequest> {
        self.inner.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl CompilerTransport for MockCompilerTransport {
    async fn connect(
        &self,
        request: &SyntaxCreationRequest,
    ) -> Result<Box<dyn CompilerStream>, CompilerError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_connect.take() {
            return Err(error);
        }
        inner.requests.push(request.clone());
        let events = inner.connections.pop_front().unwrap_or_default();
        Ok(Box::new(MockStream {
            events: events.into(),
        }))
    }
}

#[derive(Debug)]
struct MockStream {
    events: VecDeque<ChannelEvent>,
}

#[async_trait]
impl CompilerStream for MockStream {
    async fn next_result(&mut self) -> Result<Option<SyntaxCreationResult>, CompilerError> {
        match self.events.pop_front() {
            Some(ChannelEvent::Result(result)) => Ok(Some(result)),
            Some(ChannelEvent::Fail(error)) => Err(error),
            Some(ChannelEvent::Close) | None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Mrn, OwnerContact};

    fn request() -> SyntaxCreationRequest {
        SyntaxCreationRequest::new(
            "grammar",
            Mrn::new("a:b").unwrap(),
            None,
            OwnerContact::new("X", "x@example.org"),
        )
    }

    #[tokio::test]
    async fn empty_script_closes_normally() {
        let transport = MockCompilerTransport::new();
        let mut stream = transport.connect(&request()).await.unwrap();
        assert!(stream.next_result().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn scripted_failure() {
        let transport = MockCompilerTransport::new();
        transport.push_connection(vec![ChannelEvent::Fail(CompilerError::AbnormalClose {
            code: 1011,
            reason: "server error".into(),
        })]);
        let mut stream = transport.connect(&request()).await.unwrap();
        assert!(stream.next_result().await.is_err());
    }

    #[tokio::test]
    async fn connect_failure() {
        let transport = MockCompilerTransport::new();
        transport.fail_next_connect(CompilerError::Connect("refused".into()));
        assert!(transport.connect(&request()).await.is_err());
        // Failure is one-shot
        assert!(transport.connect(&request()).await.is_ok());
    }

    #[tokio::test]
    async fn records_requests() {
        let transport = MockCompilerTransport::new();
        transport.connect(&request()).await.unwrap();
        let seen = transport.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].namespace.as_str(), "a:b");
    }
}
