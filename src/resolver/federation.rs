//! resolver::federation
//!
//! Delegate and overlap search across federation records.
//!
//! # Algorithms
//!
//! - [`find_delegate`]: exact match, then strip the last colon-segment and
//!   retry until a record is found or the path is exhausted. Absence means
//!   this registry is authoritative and no delegation happens.
//! - [`find_overlapping`]: if the namespace itself carries a record, return
//!   it; otherwise search every child subtree and return the first record
//!   encountered. Sibling subtrees are visited in path order. Under the
//!   no-overlap invariant at most one record can exist down there; if a
//!   prior violation left several, returning any one is acceptable.
//!
//! A new federation record is admissible only when *both* searches miss;
//! the caller must run that combined check and the subsequent insert as one
//! transaction.

use std::collections::BTreeMap;

use crate::core::entities::FederationRecord;
use crate::core::tree::NamespaceTree;
use crate::core::types::Mrn;

/// Self-or-ancestor search for the registry owning `namespace`.
pub fn find_delegate<'a>(
    records: &'a BTreeMap<String, FederationRecord>,
    namespace: &Mrn,
) -> Option<&'a FederationRecord> {
    if let Some(record) = records.get(namespace.as_str()) {
        return Some(record);
    }
    namespace
        .ancestors()
        .find_map(|ancestor| records.get(ancestor.as_str()))
}

/// Self-or-descendant search for any registry under `namespace`.
pub fn find_overlapping<'a>(
    records: &'a BTreeMap<String, FederationRecord>,
    tree: &NamespaceTree,
    namespace: &Mrn,
) -> Option<&'a FederationRecord> {
    if let Some(record) = records.get(namespace.as_str()) {
        return Some(record);
    }
    // Descendants can only exist if the node does: registration always
    // materializes the full ancestor chain.
    tree.find(namespace)?;
    tree.children(namespace)
        .find_map(|child| find_overlapping(records, tree, &child.path))
}
