//! auth
//!
//! Namespace entitlement.
//!
//! # Design
//!
//! Credential handling and claim extraction live outside this crate; what
//! reaches the registry is the caller's set of managed namespaces. The
//! [`Entitlement`] trait reduces that to the one predicate every mutating
//! entry point consumes: may the caller manage the target namespace?
//!
//! A caller manages a namespace when one of its claimed namespaces is a
//! segment-wise prefix of (or equal to) the target. The prefix test is
//! segment-wise on purpose: managing `urn:mrn:a` must not grant anything
//! under `urn:mrn:ab`.

use tracing::debug;

use crate::core::types::Mrn;

/// The capability predicate consumed by every mutating entry point.
pub trait Entitlement: Send + Sync {
    /// Whether the caller may manage `namespace`.
    fn can_manage(&self, namespace: &Mrn) -> bool;
}

/// Entitlement backed by the caller's namespace claims.
#[derive(Debug, Clone, Default)]
pub struct ClaimsEntitlement {
    managed: Vec<Mrn>,
}

impl ClaimsEntitlement {
    /// Build from the namespaces the caller's credential claims to manage.
    pub fn new(managed: Vec<Mrn>) -> Self {
        Self { managed }
    }
}

impl Entitlement for ClaimsEntitlement {
    fn can_manage(&self, namespace: &Mrn) -> bool {
        let allowed = self
            .managed
            .iter()
            .any(|claimed| claimed.is_prefix_of(namespace));
        debug!(
            namespace = %namespace,
            allowed,
            "namespace entitlement check"
        );
        allowed
    }
}

/// Grants everything. For tests and trusted internal callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Entitlement for AllowAll {
    fn can_manage(&self, _namespace: &Mrn) -> bool {
        true
    }
}

/// Grants nothing. For tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl Entitlement for DenyAll {
    fn can_manage(&self, _namespace: &Mrn) -> bool {
        false
    }
}
