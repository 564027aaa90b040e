//! core::entities
//!
//! Registry entities referencing into the namespace tree. Entities carry the
//! namespace path as a key reference; the tree remains the single owner of
//! node identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{CorrelationId, Mrn, OwnerContact, Version};

/// A syntax definition governing one namespace.
///
/// At most one definition exists per namespace node. Descendant namespaces
/// without their own definition inherit the nearest ancestor's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxDefinition {
    /// The namespace this definition describes.
    pub namespace: Mrn,
    /// The ABNF grammar text the definition was compiled from.
    pub abnf: String,
    /// The compiled regular expression identifiers are validated against.
    pub regex: String,
    /// The party entitled to manage the namespace.
    pub owner: OwnerContact,
}

/// A federation member authoritative for one namespace subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederationRecord {
    /// Store-assigned id.
    pub id: u64,
    /// The namespace subtree this registry owns.
    pub namespace: Mrn,
    /// HTTPS endpoint queries should be redirected to.
    pub endpoint: String,
    /// The party operating the registry.
    pub owner: OwnerContact,
}

/// One version of a registered resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedResource {
    /// Store-assigned id.
    pub id: u64,
    /// The resource's MRN.
    pub mrn: Mrn,
    /// Version string; unique per MRN.
    pub version: Version,
    /// Where the resource itself lives.
    pub location: String,
    /// Human-readable title.
    pub name: String,
    /// Free-form description.
    pub description: String,
}

/// State of an asynchronous syntax-creation request.
///
/// `Complete` and `Error` are terminal and absorbing: once either is
/// reached, no further transition occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreationState {
    Creating,
    Complete,
    Error,
}

impl CreationState {
    /// Whether this state absorbs further updates.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CreationState::Complete | CreationState::Error)
    }
}

impl std::fmt::Display for CreationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreationState::Creating => write!(f, "CREATING"),
            CreationState::Complete => write!(f, "COMPLETE"),
            CreationState::Error => write!(f, "ERROR"),
        }
    }
}

/// Caller-visible record of one syntax-creation request.
///
/// Created in `Creating` state when a request is accepted; receives exactly
/// one terminal update when the compiler channel delivers a result. The
/// system never expires these records; a long-stalled `Creating` record is
/// the caller's signal that the channel died without an answer, detectable
/// via [`SyntaxCreationStatus::is_stalled`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxCreationStatus {
    /// Correlation id handed back to the submitter.
    pub id: CorrelationId,
    /// The namespace the syntax was requested for.
    pub namespace: Mrn,
    /// Current state.
    pub state: CreationState,
    /// Compiled regex, present once `Complete`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// Error message, present once `Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When the request was accepted.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

impl SyntaxCreationStatus {
    /// A fresh `Creating` record for an accepted request.
    pub fn creating(id: CorrelationId, namespace: Mrn) -> Self {
        let now = Utc::now();
        Self {
            id,
            namespace,
            state: CreationState::Creating,
            regex: None,
            message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the record is non-terminal and older than `timeout`.
    pub fn is_stalled(&self, now: DateTime<Utc>, timeout: chrono::Duration) -> bool {
        !self.state.is_terminal() && now - self.updated_at > timeout
    }
}
