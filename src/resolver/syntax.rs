//! resolver::syntax
//!
//! Nearest-ancestor syntax resolution and identifier validation.
//!
//! # Algorithm
//!
//! Resolution first tries an exact match on the identifier, then repeatedly
//! strips the last colon-segment and retries until a definition is found or
//! the path runs out of colons. A descendant namespace without its own
//! grammar therefore inherits the closest ancestor's grammar.
//!
//! Validation requires a full-string match: a pattern matching a prefix of
//! the identifier does not validate it. The absence of any definition on the
//! whole ancestor chain is a hard failure, never "anything matches".

use std::collections::BTreeMap;

use regex::Regex;
use thiserror::Error;

use crate::core::entities::SyntaxDefinition;
use crate::core::types::Mrn;

/// Errors from syntax validation.
#[derive(Debug, Error)]
pub enum SyntaxError {
    /// The identifier does not match the governing grammar.
    #[error("'{mrn}' does not follow the syntax definition for {namespace}")]
    Mismatch {
        /// The identifier that failed validation
        mrn: Mrn,
        /// The namespace whose definition was applied
        namespace: Mrn,
    },

    /// The stored regular expression failed to compile.
    #[error("syntax definition for {namespace} holds an invalid pattern: {source}")]
    BadPattern {
        /// The namespace whose definition is broken
        namespace: Mrn,
        /// The underlying regex error
        source: regex::Error,
    },
}

/// Find the syntax definition governing `mrn`.
///
/// Exact match first, then the nearest-ancestor walk. Returns `None` when no
/// definition exists anywhere on the chain including the root.
pub fn resolve<'a>(
    definitions: &'a BTreeMap<String, SyntaxDefinition>,
    mrn: &Mrn,
) -> Option<&'a SyntaxDefinition> {
    if let Some(definition) = definitions.get(mrn.as_str()) {
        return Some(definition);
    }
    mrn.ancestors()
        .find_map(|ancestor| definitions.get(ancestor.as_str()))
}

/// Validate `mrn` against a resolved definition, requiring a full-string
/// match.
///
/// # Errors
///
/// - `SyntaxError::Mismatch` if the identifier fails the full match
/// - `SyntaxError::BadPattern` if the stored pattern does not compile
pub fn validate(mrn: &Mrn, definition: &SyntaxDefinition) -> Result<(), SyntaxError> {
    // Anchoring the stored pattern forces whole-string semantics even when
    // the compiled grammar arrived unanchored.
    let anchored = format!("^(?:{})$", definition.regex);
    let pattern = Regex::new(&anchored).map_err(|source| SyntaxError::BadPattern {
        namespace: definition.namespace.clone(),
        source,
    })?;
    if pattern.is_match(mrn.as_str()) {
        Ok(())
    } else {
        Err(SyntaxError::Mismatch {
            mrn: mrn.clone(),
            namespace: definition.namespace.clone(),
        })
    }
}
