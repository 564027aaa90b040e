//! store
//!
//! In-memory registry store.
//!
//! # Architecture
//!
//! All shared mutable registry state lives in one [`StoreState`]: the
//! namespace tree, the syntax index, the federation records, the versioned
//! resources, and the syntax-creation statuses. [`RegistryStore`] wraps the
//! state in a single `RwLock`; a write guard is the serializing transaction
//! scope, so every composite check-then-write (overlap check before a
//! federation insert, duplicate check before a resource save, terminal-state
//! application) runs atomically by holding the guard across the whole
//! operation. Reads see a consistent snapshot under the read guard.
//!
//! The store is the seam a persistence engine would plug into; everything
//! above it only talks in terms of the operations defined here.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::entities::{
    FederationRecord, SyntaxCreationStatus, SyntaxDefinition, VersionedResource,
};
use crate::core::tree::NamespaceTree;
use crate::core::types::{CorrelationId, Mrn, OwnerContact, TypeError, Version};

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The (MRN, version) pair already exists.
    #[error("a resource with MRN '{mrn}' and version '{version}' already exists")]
    DuplicateVersion {
        /// The resource MRN
        mrn: Mrn,
        /// The already-registered version
        version: Version,
    },

    /// A stored version string failed integer-component parsing. Surfaced
    /// when versions are compared, never when they are written.
    #[error(transparent)]
    MalformedVersion(#[from] TypeError),
}

/// A page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Zero-based page index.
    pub page: usize,
    /// Requested page size.
    pub size: usize,
    /// Total matching items across all pages.
    pub total: usize,
}

impl<T> Page<T> {
    /// Map the items, keeping the paging envelope.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total: self.total,
        }
    }

    fn slice(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len();
        let items = all
            .into_iter()
            .skip(request.page.saturating_mul(request.size))
            .take(request.size)
            .collect();
        Page {
            items,
            page: request.page,
            size: request.size,
            total,
        }
    }
}

/// Paging parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Zero-based page index.
    pub page: usize,
    /// Page size.
    pub size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 0, size: 20 }
    }
}

/// Input for registering one resource version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewResource {
    pub mrn: Mrn,
    pub version: Version,
    pub location: String,
    pub name: String,
    pub description: String,
}

/// The complete mutable registry state.
///
/// Methods on this type assume the caller holds the appropriate guard from
/// [`RegistryStore`]; composite operations stay atomic by keeping one write
/// guard across every step.
#[derive(Debug, Default)]
pub struct StoreState {
    /// Namespace tree backbone.
    pub tree: NamespaceTree,
    /// Syntax definitions keyed by namespace path.
    pub syntaxes: BTreeMap<String, SyntaxDefinition>,
    /// Federation records keyed by namespace path.
    pub records: BTreeMap<String, FederationRecord>,
    resources: BTreeMap<u64, VersionedResource>,
    statuses: HashMap<String, SyntaxCreationStatus>,
    next_resource_id: u64,
    next_record_id: u64,
}

impl StoreState {
    // ------------------------------------------------------------------
    // Versioned resources
    // ------------------------------------------------------------------

    /// Save a new resource version.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateVersion` if the (MRN, version) pair is
    /// already registered. Version strings are not parsed here.
    pub fn save_resource(&mut self, new: NewResource) -> Result<VersionedResource, StoreError> {
        if self.resource_by_mrn_and_version(&new.mrn, new.version.as_str()).is_some() {
            return Err(StoreError::DuplicateVersion {
                mrn: new.mrn,
                version: new.version,
            });
        }
        self.next_resource_id += 1;
        let resource = VersionedResource {
            id: self.next_resource_id,
            mrn: new.mrn,
            version: new.version,
            location: new.location,
            name: new.name,
            description: new.description,
        };
        self.resources.insert(resource.id, resource.clone());
        Ok(resource)
    }

    /// Exact lookup by MRN and version string.
    pub fn resource_by_mrn_and_version(
        &self,
        mrn: &Mrn,
        version: &str,
    ) -> Option<&VersionedResource> {
        self.resources
            .values()
            .find(|r| r.mrn == *mrn && r.version.as_str() == version)
    }

    /// Lookup by store-assigned id.
    pub fn resource_by_id(&self, id: u64) -> Option<&VersionedResource> {
        self.resources.get(&id)
    }

    /// The greatest registered version for `mrn` under dotted-integer
    /// ordering, or `None` if no version exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::MalformedVersion` if any stored version for the
    /// MRN fails component parsing.
    pub fn latest_resource(&self, mrn: &Mrn) -> Result<Option<&VersionedResource>, StoreError> {
        let mut latest: Option<&VersionedResource> = None;
        for resource in self.resources.values().filter(|r| r.mrn == *mrn) {
            latest = match latest {
                None => {
                    // Malformed versions must surface even for a lone entry.
                    resource.version.components()?;
                    Some(resource)
                }
                Some(best) => {
                    if resource.version.compare(&best.version)? == std::cmp::Ordering::Greater {
                        Some(resource)
                    } else {
                        Some(best)
                    }
                }
            };
        }
        Ok(latest)
    }

    /// All versions registered under `mrn`, paged, in insertion order.
    pub fn resources_for_mrn(&self, mrn: &Mrn, request: PageRequest) -> Page<VersionedResource> {
        let all: Vec<VersionedResource> = self
            .resources
            .values()
            .filter(|r| r.mrn == *mrn)
            .cloned()
            .collect();
        Page::slice(all, request)
    }

    /// Remove the resource with the given MRN and version. Returns the
    /// removed entity, or `None` if it was not registered.
    pub fn delete_resource_by_mrn_and_version(
        &mut self,
        mrn: &Mrn,
        version: &str,
    ) -> Option<VersionedResource> {
        let id = self.resource_by_mrn_and_version(mrn, version)?.id;
        self.resources.remove(&id)
    }

    /// Remove the resource with the given id.
    pub fn delete_resource_by_id(&mut self, id: u64) -> Option<VersionedResource> {
        self.resources.remove(&id)
    }

    // ------------------------------------------------------------------
    // Syntax definitions
    // ------------------------------------------------------------------

    /// Exact-namespace lookup, no ancestor traversal.
    pub fn syntax_exact(&self, namespace: &Mrn) -> Option<&SyntaxDefinition> {
        self.syntaxes.get(namespace.as_str())
    }

    /// Attach a definition to its namespace node, materializing the node and
    /// any missing ancestors. An existing definition for the same namespace
    /// is replaced, keeping at most one definition per node.
    pub fn put_syntax(&mut self, definition: SyntaxDefinition) {
        self.tree.get_or_create(&definition.namespace);
        self.syntaxes
            .insert(definition.namespace.as_str().to_string(), definition);
    }

    /// All definitions at or under `namespace`, paged, in path order.
    pub fn syntaxes_under(&self, namespace: &Mrn, request: PageRequest) -> Page<SyntaxDefinition> {
        let all: Vec<SyntaxDefinition> = self
            .syntaxes
            .values()
            .filter(|d| namespace.is_prefix_of(&d.namespace))
            .cloned()
            .collect();
        Page::slice(all, request)
    }

    // ------------------------------------------------------------------
    // Federation records
    // ------------------------------------------------------------------

    /// Exact-namespace lookup.
    pub fn record_exact(&self, namespace: &Mrn) -> Option<&FederationRecord> {
        self.records.get(namespace.as_str())
    }

    /// Lookup by store-assigned id.
    pub fn record_by_id(&self, id: u64) -> Option<&FederationRecord> {
        self.records.values().find(|r| r.id == id)
    }

    /// Insert a federation record, materializing its namespace node. The
    /// caller is responsible for having run the overlap check under the same
    /// write guard.
    pub fn insert_record(
        &mut self,
        namespace: Mrn,
        endpoint: String,
        owner: OwnerContact,
    ) -> &FederationRecord {
        self.next_record_id += 1;
        let record = FederationRecord {
            id: self.next_record_id,
            namespace: namespace.clone(),
            endpoint,
            owner,
        };
        self.tree.get_or_create(&namespace);
        self.records
            .insert(namespace.as_str().to_string(), record);
        &self.records[namespace.as_str()]
    }

    /// Remove the record for the exact namespace.
    pub fn delete_record(&mut self, namespace: &Mrn) -> Option<FederationRecord> {
        self.records.remove(namespace.as_str())
    }

    /// Remove the record with the given id.
    pub fn delete_record_by_id(&mut self, id: u64) -> Option<FederationRecord> {
        let namespace = self
            .records
            .values()
            .find(|r| r.id == id)
            .map(|r| r.namespace.clone())?;
        self.records.remove(namespace.as_str())
    }

    // ------------------------------------------------------------------
    // Syntax-creation statuses
    // ------------------------------------------------------------------

    /// Read a status record by correlation id.
    pub fn status(&self, id: &CorrelationId) -> Option<&SyntaxCreationStatus> {
        self.statuses.get(id.as_str())
    }

    /// Insert or replace a status record.
    pub fn upsert_status(&mut self, status: SyntaxCreationStatus) {
        self.statuses.insert(status.id.as_str().to_string(), status);
    }
}

/// Shared handle to the registry state.
///
/// Cheap to clone; all clones see the same state. The guard accessors are
/// the transaction primitives: hold a write guard across a whole composite
/// operation to make it atomic against concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct RegistryStore {
    inner: Arc<RwLock<StoreState>>,
}

impl RegistryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the read guard (consistent snapshot).
    pub fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.inner.read().unwrap()
    }

    /// Acquire the write guard (serializing transaction scope).
    pub fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.inner.write().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mrn(s: &str) -> Mrn {
        Mrn::new(s).unwrap()
    }

    fn new_resource(mrn_str: &str, version: &str) -> NewResource {
        NewResource {
            mrn: mrn(mrn_str),
            version: Version::new(version),
            location: "https://registry.example.org/doc".into(),
            name: "doc".into(),
            description: String::new(),
        }
    }

    mod resources {
        use super::*;

        #[test]
        fn save_assigns_increasing_ids() {
            let mut state = StoreState::default();
            let a = state.save_resource(new_resource("a:b", "1.0.0")).unwrap();
            let b = state.save_resource(new_resource("a:b", "1.1.0")).unwrap();
            assert_eq!(a.id, 1);
            assert_eq!(b.id, 2);
        }

        #[test]
        fn duplicate_version_rejected() {
            let mut state = StoreState::default();
            state.save_resource(new_resource("a:b:c", "1.0.0")).unwrap();
            let err = state
                .save_resource(new_resource("a:b:c", "1.0.0"))
                .unwrap_err();
            assert!(matches!(err, StoreError::DuplicateVersion { .. }));
        }

        #[test]
        fn same_version_different_mrn_allowed() {
            let mut state = StoreState::default();
            state.save_resource(new_resource("a:b", "1.0.0")).unwrap();
            assert!(state.save_resource(new_resource("a:c", "1.0.0")).is_ok());
        }

        #[test]
        fn latest_is_component_wise_numeric() {
            let mut state = StoreState::default();
            for v in ["1.2.0", "1.10.0", "1.2.3"] {
                state.save_resource(new_resource("a:b", v)).unwrap();
            }
            let latest = state.latest_resource(&mrn("a:b")).unwrap().unwrap();
            assert_eq!(latest.version.as_str(), "1.10.0");
        }

        #[test]
        fn latest_of_nothing_is_none() {
            let state = StoreState::default();
            assert!(state.latest_resource(&mrn("a:b")).unwrap().is_none());
        }

        #[test]
        fn malformed_version_surfaces_on_latest_not_save() {
            let mut state = StoreState::default();
            state.save_resource(new_resource("a:b", "not.a.version")).unwrap();
            assert!(state.latest_resource(&mrn("a:b")).is_err());
        }

        #[test]
        fn paging() {
            let mut state = StoreState::default();
            for i in 0..5 {
                state
                    .save_resource(new_resource("a:b", &format!("1.{i}")))
                    .unwrap();
            }
            let page = state.resources_for_mrn(&mrn("a:b"), PageRequest { page: 1, size: 2 });
            assert_eq!(page.total, 5);
            assert_eq!(page.items.len(), 2);
            assert_eq!(page.items[0].version.as_str(), "1.2");
        }

        #[test]
        fn delete_by_mrn_and_version() {
            let mut state = StoreState::default();
            state.save_resource(new_resource("a:b", "1.0")).unwrap();
            assert!(state
                .delete_resource_by_mrn_and_version(&mrn("a:b"), "1.0")
                .is_some());
            assert!(state
                .delete_resource_by_mrn_and_version(&mrn("a:b"), "1.0")
                .is_none());
        }
    }

    mod syntaxes {
        use super::*;
        use crate::core::entities::SyntaxDefinition;

        fn definition(namespace: &str) -> SyntaxDefinition {
            SyntaxDefinition {
                namespace: mrn(namespace),
                abnf: String::new(),
                regex: ".*".into(),
                owner: OwnerContact::new("IALA", "ops@example.org"),
            }
        }

        #[test]
        fn put_materializes_nodes() {
            let mut state = StoreState::default();
            state.put_syntax(definition("urn:mrn:test"));
            assert!(state.tree.contains(&mrn("urn")));
            assert!(state.tree.contains(&mrn("urn:mrn")));
            assert!(state.tree.contains(&mrn("urn:mrn:test")));
        }

        #[test]
        fn put_replaces_existing() {
            let mut state = StoreState::default();
            state.put_syntax(definition("a:b"));
            let mut updated = definition("a:b");
            updated.regex = "b.*".into();
            state.put_syntax(updated);
            assert_eq!(state.syntax_exact(&mrn("a:b")).unwrap().regex, "b.*");
            assert_eq!(state.syntaxes.len(), 1);
        }

        #[test]
        fn under_is_segment_wise() {
            let mut state = StoreState::default();
            state.put_syntax(definition("a:b"));
            state.put_syntax(definition("a:b:c"));
            state.put_syntax(definition("a:bc"));
            let page = state.syntaxes_under(&mrn("a:b"), PageRequest::default());
            assert_eq!(page.total, 2);
        }
    }

    mod records {
        use super::*;

        #[test]
        fn insert_materializes_nodes_and_assigns_id() {
            let store = RegistryStore::new();
            let mut state = store.write();
            let record = state.insert_record(
                mrn("urn:mrn:other"),
                "https://other.example.org".into(),
                OwnerContact::new("Other", "other@example.org"),
            );
            assert_eq!(record.id, 1);
            assert!(state.tree.contains(&mrn("urn:mrn")));
        }

        #[test]
        fn delete_by_id() {
            let mut state = StoreState::default();
            state.insert_record(
                mrn("a:b"),
                "https://x.example.org".into(),
                OwnerContact::new("X", "x@example.org"),
            );
            assert!(state.delete_record_by_id(1).is_some());
            assert!(state.record_exact(&mrn("a:b")).is_none());
        }
    }

    mod statuses {
        use super::*;
        use crate::core::entities::SyntaxCreationStatus;

        #[test]
        fn visible_after_upsert() {
            let store = RegistryStore::new();
            let status = SyntaxCreationStatus::creating(CorrelationId::generate(), mrn("a:b"));
            let id = status.id.clone();
            store.write().upsert_status(status);
            assert!(store.read().status(&id).is_some());
        }
    }
}
