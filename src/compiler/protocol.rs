//! compiler::protocol
//!
//! Wire types exchanged with the external grammar compiler.
//!
//! The channel speaks JSON text frames: one structured creation request out,
//! zero or more result messages back, of which at most one is terminal.

use serde::{Deserialize, Serialize};

use crate::core::entities::CreationState;
use crate::core::types::{Mrn, OwnerContact};

/// Function tag identifying a creation request on the channel.
const FUNCTION_CREATE: &str = "create";

/// A syntax-creation request sent to the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxCreationRequest {
    /// Operation selector; always `"create"` for this request type.
    pub function: String,
    /// The ABNF grammar text to compile.
    pub abnf: String,
    /// The namespace the grammar will govern.
    pub namespace: Mrn,
    /// The namespace the new one extends, if any.
    pub parent_namespace: Option<Mrn>,
    /// Contact for the party registering the namespace.
    pub namespace_owner: OwnerContact,
}

impl SyntaxCreationRequest {
    /// Build a creation request with the `create` function tag.
    pub fn new(
        abnf: impl Into<String>,
        namespace: Mrn,
        parent_namespace: Option<Mrn>,
        namespace_owner: OwnerContact,
    ) -> Self {
        Self {
            function: FUNCTION_CREATE.to_string(),
            abnf: abnf.into(),
            namespace,
            parent_namespace,
            namespace_owner,
        }
    }
}

/// A result message received from the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxCreationResult {
    /// Creation state reported by the compiler.
    pub code: CreationState,
    /// The namespace the compiler believes it compiled for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<Mrn>,
    /// The compiled regular expression, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// An error message, on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SyntaxCreationResult {
    /// A terminal error result synthesized on this side of the channel.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: CreationState::Error,
            namespace: None,
            regex: None,
            message: Some(message.into()),
        }
    }
}
