//! compiler::coordinator
//!
//! Asynchronous syntax-creation workflow.
//!
//! # State machine
//!
//! Each submission owns one status record moving `CREATING → {COMPLETE,
//! ERROR}`. Terminal states absorb: once reached, further channel messages
//! are ignored. The spawned receiving task is the only writer of its
//! record, and the shared store is the single synchronization point between
//! it and status polls.
//!
//! # Failure handling
//!
//! Transport errors and abnormal closes are logged and leave the record
//! non-terminal; callers polling a long-stalled `CREATING` record should
//! treat it as timed out. Retrying is an explicit new submission, never
//! automatic.

use std::sync::Arc;

use tracing::{debug, error};

use super::protocol::{SyntaxCreationRequest, SyntaxCreationResult};
use super::transport::CompilerTransport;
use crate::core::entities::{CreationState, SyntaxCreationStatus, SyntaxDefinition};
use crate::core::types::{CorrelationId, Mrn, OwnerContact};
use crate::store::RegistryStore;

/// Input for one syntax-creation submission.
#[derive(Debug, Clone)]
pub struct CreationSubmission {
    /// The namespace the grammar will govern.
    pub namespace: Mrn,
    /// The namespace it extends, if any.
    pub parent_namespace: Option<Mrn>,
    /// The ABNF grammar text.
    pub abnf: String,
    /// The submitting party.
    pub owner: OwnerContact,
}

/// Coordinates creation requests against the remote compiler.
#[derive(Clone)]
pub struct CreationCoordinator {
    store: RegistryStore,
    transport: Arc<dyn CompilerTransport>,
}

impl CreationCoordinator {
    /// Create a coordinator writing through `store` and opening channels via
    /// `transport`.
    pub fn new(store: RegistryStore, transport: Arc<dyn CompilerTransport>) -> Self {
        Self { store, transport }
    }

    /// Accept a creation request.
    ///
    /// Persists the `CREATING` status record, spawns the channel task, and
    /// returns the correlation id immediately; the caller never blocks on
    /// compilation. The record is visible to [`status`] polls before this
    /// method returns.
    ///
    /// [`status`]: CreationCoordinator::status
    pub fn submit(&self, submission: CreationSubmission) -> CorrelationId {
        let id = CorrelationId::generate();
        self.store.write().upsert_status(SyntaxCreationStatus::creating(
            id.clone(),
            submission.namespace.clone(),
        ));

        let request = SyntaxCreationRequest::new(
            submission.abnf,
            submission.namespace,
            submission.parent_namespace,
            submission.owner,
        );
        let store = self.store.clone();
        let transport = Arc::clone(&self.transport);
        let task_id = id.clone();
        tokio::spawn(async move {
            drive_channel(store, transport.as_ref(), task_id, request).await;
        });

        id
    }

    /// Read the current status for a correlation id.
    pub fn status(&self, id: &CorrelationId) -> Option<SyntaxCreationStatus> {
        self.store.read().status(id).cloned()
    }
}

impl std::fmt::Debug for CreationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreationCoordinator").finish_non_exhaustive()
    }
}

/// Drive one channel to completion.
///
/// Opens the connection, then pulls messages until a terminal result has
/// been applied, the channel closes, or the transport fails. This function
/// is the only writer of the record identified by `id`.
pub(crate) async fn drive_channel(
    store: RegistryStore,
    transport: &dyn CompilerTransport,
    id: CorrelationId,
    request: SyntaxCreationRequest,
) {
    let mut stream = match transport.connect(&request).await {
        Ok(stream) => stream,
        Err(e) => {
            error!(namespace = %request.namespace, "could not open compiler channel: {e}");
            return;
        }
    };

    loop {
        match stream.next_result().await {
            Ok(Some(result)) => {
                if apply_result(&store, &id, &request, result) {
                    return;
                }
            }
            Ok(None) => {
                debug!(namespace = %request.namespace, "compiler channel closed");
                return;
            }
            Err(e) => {
                // The status stays non-terminal; a poller sees a stall, and
                // retry is an explicit new submission.
                error!(namespace = %request.namespace, "compiler channel failed: {e}");
                return;
            }
        }
    }
}

/// Apply one received message to the status record. Returns `true` once the
/// record is terminal.
fn apply_result(
    store: &RegistryStore,
    id: &CorrelationId,
    request: &SyntaxCreationRequest,
    result: SyntaxCreationResult,
) -> bool {
    if result.code == CreationState::Creating {
        debug!(namespace = %request.namespace, "compiler progress message");
        return false;
    }

    let effective = if result.code == CreationState::Error {
        error!(
            namespace = %request.namespace,
            "syntax creation failed: {}",
            result.message.as_deref().unwrap_or("no message")
        );
        result
    } else if result.namespace.as_ref() != Some(&request.namespace) {
        // A misrouted or stale response must never complete this record.
        SyntaxCreationResult::error(
            "the namespace of the compiler response did not match the namespace of the original request",
        )
    } else if result.regex.is_none() {
        SyntaxCreationResult::error("the compiler response did not include a regular expression")
    } else {
        result
    };

    let mut state = store.write();
    let mut status = match state.status(id) {
        Some(status) => {
            if status.state.is_terminal() {
                return true;
            }
            status.clone()
        }
        // A completed compilation is never dropped: if the record vanished,
        // recreate it under the same correlation id.
        None => SyntaxCreationStatus::creating(id.clone(), request.namespace.clone()),
    };

    status.state = effective.code;
    status.regex = effective.regex.clone();
    status.message = effective.message.clone();
    status.updated_at = chrono::Utc::now();
    state.upsert_status(status);

    if effective.code == CreationState::Complete {
        if let Some(regex) = effective.regex {
            state.put_syntax(SyntaxDefinition {
                namespace: request.namespace.clone(),
                abnf: request.abnf.clone(),
                regex,
                owner: request.namespace_owner.clone(),
            });
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::mock::{ChannelEvent, MockCompilerTransport};
    use crate::compiler::transport::CompilerError;

    fn mrn(s: &str) -> Mrn {
        Mrn::new(s).unwrap()
    }

    fn owner() -> OwnerContact {
        OwnerContact::new("IALA", "ops@example.org")
    }

    fn request_for(namespace: &str) -> SyntaxCreationRequest {
        SyntaxCreationRequest::new("grammar", mrn(namespace), None, owner())
    }

    fn complete_for(namespace: &str, regex: &str) -> SyntaxCreationResult {
        SyntaxCreationResult {
            code: CreationState::Complete,
            namespace: Some(mrn(namespace)),
            regex: Some(regex.to_string()),
            message: None,
        }
    }

    fn creating_record(store: &RegistryStore, namespace: &str) -> CorrelationId {
        let id = CorrelationId::generate();
        store
            .write()
            .upsert_status(SyntaxCreationStatus::creating(id.clone(), mrn(namespace)));
        id
    }

    #[tokio::test]
    async fn complete_stores_regex_and_definition() {
        let store = RegistryStore::new();
        let transport = MockCompilerTransport::new();
        transport.push_connection(vec![ChannelEvent::Result(complete_for(
            "urn:mrn:test",
            r"^urn:mrn:test:\d+$",
        ))]);
        let id = creating_record(&store, "urn:mrn:test");

        drive_channel(store.clone(), &transport, id.clone(), request_for("urn:mrn:test")).await;

        let state = store.read();
        let status = state.status(&id).unwrap();
        assert_eq!(status.state, CreationState::Complete);
        assert_eq!(status.regex.as_deref(), Some(r"^urn:mrn:test:\d+$"));
        let definition = state.syntax_exact(&mrn("urn:mrn:test")).unwrap();
        assert_eq!(definition.regex, r"^urn:mrn:test:\d+$");
        assert!(state.tree.contains(&mrn("urn")));
    }

    #[tokio::test]
    async fn error_copied_through() {
        let store = RegistryStore::new();
        let transport = MockCompilerTransport::new();
        transport.push_connection(vec![ChannelEvent::Result(SyntaxCreationResult::error(
            "grammar does not parse",
        ))]);
        let id = creating_record(&store, "a:b");

        drive_channel(store.clone(), &transport, id.clone(), request_for("a:b")).await;

        let state = store.read();
        let status = state.status(&id).unwrap();
        assert_eq!(status.state, CreationState::Error);
        assert_eq!(status.message.as_deref(), Some("grammar does not parse"));
        assert!(state.syntax_exact(&mrn("a:b")).is_none());
    }

    #[tokio::test]
    async fn namespace_mismatch_becomes_error() {
        let store = RegistryStore::new();
        let transport = MockCompilerTransport::new();
        transport.push_connection(vec![ChannelEvent::Result(complete_for("other:ns", ".*"))]);
        let id = creating_record(&store, "a:b");

        drive_channel(store.clone(), &transport, id.clone(), request_for("a:b")).await;

        let state = store.read();
        let status = state.status(&id).unwrap();
        assert_eq!(status.state, CreationState::Error);
        assert!(status.message.as_deref().unwrap().contains("did not match"));
        assert!(state.syntax_exact(&mrn("a:b")).is_none());
        assert!(state.syntax_exact(&mrn("other:ns")).is_none());
    }

    #[tokio::test]
    async fn terminal_state_absorbs_later_messages() {
        let store = RegistryStore::new();
        let transport = MockCompilerTransport::new();
        transport.push_connection(vec![ChannelEvent::Result(SyntaxCreationResult::error(
            "first answer",
        ))]);
        let id = creating_record(&store, "a:b");
        drive_channel(store.clone(), &transport, id.clone(), request_for("a:b")).await;

        // A second channel delivering a different answer for the same id
        transport.push_connection(vec![ChannelEvent::Result(complete_for("a:b", ".*"))]);
        drive_channel(store.clone(), &transport, id.clone(), request_for("a:b")).await;

        let state = store.read();
        let status = state.status(&id).unwrap();
        assert_eq!(status.state, CreationState::Error);
        assert_eq!(status.message.as_deref(), Some("first answer"));
    }

    #[tokio::test]
    async fn progress_messages_do_not_terminate() {
        let store = RegistryStore::new();
        let transport = MockCompilerTransport::new();
        transport.push_connection(vec![
            ChannelEvent::Result(SyntaxCreationResult {
                code: CreationState::Creating,
                namespace: Some(mrn("a:b")),
                regex: None,
                message: None,
            }),
            ChannelEvent::Result(complete_for("a:b", ".*")),
        ]);
        let id = creating_record(&store, "a:b");

        drive_channel(store.clone(), &transport, id.clone(), request_for("a:b")).await;

        assert_eq!(
            store.read().status(&id).unwrap().state,
            CreationState::Complete
        );
    }

    #[tokio::test]
    async fn abnormal_close_leaves_creating() {
        let store = RegistryStore::new();
        let transport = MockCompilerTransport::new();
        transport.push_connection(vec![ChannelEvent::Fail(CompilerError::AbnormalClose {
            code: 1006,
            reason: String::new(),
        })]);
        let id = creating_record(&store, "a:b");

        drive_channel(store.clone(), &transport, id.clone(), request_for("a:b")).await;

        assert_eq!(
            store.read().status(&id).unwrap().state,
            CreationState::Creating
        );
    }

    #[tokio::test]
    async fn normal_close_without_result_leaves_creating() {
        let store = RegistryStore::new();
        let transport = MockCompilerTransport::new();
        transport.push_connection(vec![ChannelEvent::Close]);
        let id = creating_record(&store, "a:b");

        drive_channel(store.clone(), &transport, id.clone(), request_for("a:b")).await;

        assert_eq!(
            store.read().status(&id).unwrap().state,
            CreationState::Creating
        );
    }

    #[tokio::test]
    async fn connect_failure_leaves_creating() {
        let store = RegistryStore::new();
        let transport = MockCompilerTransport::new();
        transport.fail_next_connect(CompilerError::Connect("refused".into()));
        let id = creating_record(&store, "a:b");

        drive_channel(store.clone(), &transport, id.clone(), request_for("a:b")).await;

        assert_eq!(
            store.read().status(&id).unwrap().state,
            CreationState::Creating
        );
    }

    #[tokio::test]
    async fn missing_record_is_recreated_not_dropped() {
        let store = RegistryStore::new();
        let transport = MockCompilerTransport::new();
        transport.push_connection(vec![ChannelEvent::Result(complete_for("a:b", ".*"))]);
        // No status record was ever written for this id
        let id = CorrelationId::generate();

        drive_channel(store.clone(), &transport, id.clone(), request_for("a:b")).await;

        let state = store.read();
        let status = state.status(&id).unwrap();
        assert_eq!(status.state, CreationState::Complete);
        assert!(state.syntax_exact(&mrn("a:b")).is_some());
    }

    #[tokio::test]
    async fn complete_without_regex_becomes_error() {
        let store = RegistryStore::new();
        let transport = MockCompilerTransport::new();
        transport.push_connection(vec![ChannelEvent::Result(SyntaxCreationResult {
            code: CreationState::Complete,
            namespace: Some(mrn("a:b")),
            regex: None,
            message: None,
        })]);
        let id = creating_record(&store, "a:b");

        drive_channel(store.clone(), &transport, id.clone(), request_for("a:b")).await;

        assert_eq!(store.read().status(&id).unwrap().state, CreationState::Error);
    }

    #[tokio::test]
    async fn submit_makes_status_visible_immediately() {
        let store = RegistryStore::new();
        let coordinator = CreationCoordinator::new(
            store.clone(),
            Arc::new(MockCompilerTransport::new()),
        );
        let id = coordinator.submit(CreationSubmission {
            namespace: mrn("a:b"),
            parent_namespace: Some(mrn("a")),
            abnf: "grammar".into(),
            owner: owner(),
        });
        // Visible before the channel task has done anything
        assert!(coordinator.status(&id).is_some());
    }
}
