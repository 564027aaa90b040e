//! service
//!
//! Registry service facade.
//!
//! # Architecture
//!
//! The service orchestrates the stores and resolvers into the operations the
//! interface boundary exposes: syntax lookup with redirect decisions, the
//! resource-creation pipeline, federation-record registration under the
//! no-overlap invariant, and the syntax-creation workflow passthrough.
//!
//! Every composite mutation holds the store's write guard across its whole
//! check-then-write sequence, so two concurrent registrations for
//! overlapping namespaces cannot both pass the check before either writes.
//!
//! Entitlement is deliberately absent here: the boundary layer gates calls
//! before they reach the service, mirroring where the capability check sits
//! in the deployment.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::compiler::transport::CompilerTransport;
use crate::compiler::{CreationCoordinator, CreationSubmission};
use crate::core::entities::{
    FederationRecord, SyntaxCreationStatus, SyntaxDefinition, VersionedResource,
};
use crate::core::types::{CorrelationId, Mrn, OwnerContact, TypeError, Version};
use crate::resolver::{federation, syntax};
use crate::store::{NewResource, Page, PageRequest, RegistryStore, StoreError};

pub use crate::resolver::syntax::SyntaxError;

/// Errors from registry operations.
///
/// `Delegated` is a successful negative result rather than a failure: it
/// names the federation member that owns the namespace so the caller can
/// repeat the request there.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No syntax definition exists on the ancestor chain.
    #[error("a syntax definition could not be found for '{0}'")]
    SyntaxNotFound(Mrn),

    /// The identifier failed validation against the governing grammar.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// The (MRN, version) pair already exists.
    #[error("a resource with MRN '{mrn}' and version '{version}' already exists")]
    DuplicateVersion {
        /// The resource MRN
        mrn: Mrn,
        /// The already-registered version
        version: Version,
    },

    /// Registration collides with an existing record for the same, an
    /// ancestor, or a descendant namespace.
    #[error("a registry entry already exists for this, a broader, or a descendant namespace: {namespace}")]
    FederationOverlap {
        /// The namespace of the colliding record
        namespace: Mrn,
    },

    /// Another federation member owns the namespace; not a failure.
    #[error("the namespace is owned by the registry for '{}'", .record.namespace)]
    Delegated {
        /// The owning registry
        record: FederationRecord,
    },

    /// A stored version string failed parsing during comparison.
    #[error(transparent)]
    MalformedVersion(TypeError),

    /// The endpoint URL is not usable.
    #[error("invalid registry endpoint: {0}")]
    InvalidEndpoint(String),

    /// The requested entity does not exist.
    #[error("the requested entity could not be found")]
    NotFound,
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateVersion { mrn, version } => {
                ServiceError::DuplicateVersion { mrn, version }
            }
            StoreError::MalformedVersion(e) => ServiceError::MalformedVersion(e),
        }
    }
}

/// The registry service.
#[derive(Debug, Clone)]
pub struct RegistryService {
    store: RegistryStore,
    coordinator: CreationCoordinator,
}

impl RegistryService {
    /// Create a service over `store`, opening compiler channels via
    /// `transport`.
    pub fn new(store: RegistryStore, transport: Arc<dyn CompilerTransport>) -> Self {
        let coordinator = CreationCoordinator::new(store.clone(), transport);
        Self { store, coordinator }
    }

    /// The underlying store handle.
    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    // ------------------------------------------------------------------
    // Syntax
    // ------------------------------------------------------------------

    /// The syntax definition that applies to `mrn`.
    ///
    /// Exact match first; if none, a federation delegate owning the
    /// namespace turns into [`ServiceError::Delegated`]; otherwise the
    /// nearest-ancestor walk decides.
    pub fn syntax_for_mrn(&self, mrn: &Mrn) -> Result<SyntaxDefinition, ServiceError> {
        let state = self.store.read();
        if let Some(definition) = state.syntax_exact(mrn) {
            return Ok(definition.clone());
        }
        if let Some(record) = federation::find_delegate(&state.records, mrn) {
            return Err(ServiceError::Delegated {
                record: record.clone(),
            });
        }
        syntax::resolve(&state.syntaxes, mrn)
            .cloned()
            .ok_or_else(|| ServiceError::SyntaxNotFound(mrn.clone()))
    }

    /// All syntax definitions at or under `namespace`, paged.
    pub fn syntaxes_under(
        &self,
        namespace: &Mrn,
        page: PageRequest,
    ) -> Page<SyntaxDefinition> {
        self.store.read().syntaxes_under(namespace, page)
    }

    /// Submit a syntax-creation request to the remote compiler.
    ///
    /// Returns the correlation id immediately; compilation completes out of
    /// band and is observable via [`creation_status`].
    ///
    /// [`creation_status`]: RegistryService::creation_status
    pub fn submit_syntax_creation(&self, submission: CreationSubmission) -> CorrelationId {
        debug!(namespace = %submission.namespace, "syntax creation submitted");
        self.coordinator.submit(submission)
    }

    /// The status record for a creation request.
    pub fn creation_status(
        &self,
        id: &CorrelationId,
    ) -> Result<SyntaxCreationStatus, ServiceError> {
        self.coordinator.status(id).ok_or(ServiceError::NotFound)
    }

    // ------------------------------------------------------------------
    // Versioned resources
    // ------------------------------------------------------------------

    /// Register a new resource version.
    ///
    /// The pipeline runs inside one write transaction: federation ownership
    /// check, duplicate-version check, syntax resolution, full-match
    /// validation, namespace materialization, save.
    pub fn create_resource(&self, new: NewResource) -> Result<VersionedResource, ServiceError> {
        let mut state = self.store.write();

        if let Some(record) = federation::find_delegate(&state.records, &new.mrn) {
            return Err(ServiceError::Delegated {
                record: record.clone(),
            });
        }

        if state
            .resource_by_mrn_and_version(&new.mrn, new.version.as_str())
            .is_some()
        {
            return Err(ServiceError::DuplicateVersion {
                mrn: new.mrn,
                version: new.version,
            });
        }

        let definition = syntax::resolve(&state.syntaxes, &new.mrn)
            .cloned()
            .ok_or_else(|| ServiceError::SyntaxNotFound(new.mrn.clone()))?;
        syntax::validate(&new.mrn, &definition)?;

        state.tree.get_or_create(&new.mrn);
        let resource = state.save_resource(new)?;
        debug!(mrn = %resource.mrn, version = %resource.version, "resource registered");
        Ok(resource)
    }

    /// The resource with the given MRN and version; a miss falls back to the
    /// federation delegate search.
    pub fn resource(&self, mrn: &Mrn, version: &str) -> Result<VersionedResource, ServiceError> {
        let state = self.store.read();
        if let Some(resource) = state.resource_by_mrn_and_version(mrn, version) {
            return Ok(resource.clone());
        }
        Err(self.miss(&state.records, mrn))
    }

    /// The latest version of the resource with the given MRN.
    pub fn latest_resource(&self, mrn: &Mrn) -> Result<VersionedResource, ServiceError> {
        let state = self.store.read();
        if let Some(resource) = state.latest_resource(mrn)? {
            return Ok(resource.clone());
        }
        Err(self.miss(&state.records, mrn))
    }

    /// All versions registered under `mrn`, paged. An empty result set is
    /// checked against the federation before being returned.
    pub fn resources_for_mrn(
        &self,
        mrn: &Mrn,
        page: PageRequest,
    ) -> Result<Page<VersionedResource>, ServiceError> {
        let state = self.store.read();
        let result = state.resources_for_mrn(mrn, page);
        if result.total == 0 {
            if let Some(record) = federation::find_delegate(&state.records, mrn) {
                return Err(ServiceError::Delegated {
                    record: record.clone(),
                });
            }
        }
        Ok(result)
    }

    /// Lookup by store-assigned id.
    pub fn resource_by_id(&self, id: u64) -> Result<VersionedResource, ServiceError> {
        self.store
            .read()
            .resource_by_id(id)
            .cloned()
            .ok_or(ServiceError::NotFound)
    }

    /// Delete the resource with the given MRN and version.
    pub fn delete_resource(&self, mrn: &Mrn, version: &str) -> Result<(), ServiceError> {
        self.store
            .write()
            .delete_resource_by_mrn_and_version(mrn, version)
            .map(|_| ())
            .ok_or(ServiceError::NotFound)
    }

    /// Delete the resource with the given id, returning it.
    pub fn delete_resource_by_id(&self, id: u64) -> Result<VersionedResource, ServiceError> {
        self.store
            .write()
            .delete_resource_by_id(id)
            .ok_or(ServiceError::NotFound)
    }

    // ------------------------------------------------------------------
    // Federation records
    // ------------------------------------------------------------------

    /// Register a federation record.
    ///
    /// Fails with [`ServiceError::FederationOverlap`] when a record already
    /// exists for the same namespace, an ancestor, or a descendant. The
    /// combined check and the insert run as one transaction.
    pub fn register_federation(
        &self,
        namespace: Mrn,
        endpoint: String,
        owner: OwnerContact,
    ) -> Result<FederationRecord, ServiceError> {
        let parsed = url::Url::parse(&endpoint)
            .map_err(|e| ServiceError::InvalidEndpoint(e.to_string()))?;
        if parsed.scheme() != "https" {
            return Err(ServiceError::InvalidEndpoint(format!(
                "endpoint must use https, got '{}'",
                parsed.scheme()
            )));
        }

        let mut state = self.store.write();
        let colliding = federation::find_delegate(&state.records, &namespace)
            .or_else(|| federation::find_overlapping(&state.records, &state.tree, &namespace))
            .map(|record| record.namespace.clone());
        if let Some(colliding) = colliding {
            return Err(ServiceError::FederationOverlap {
                namespace: colliding,
            });
        }

        let record = state.insert_record(namespace, endpoint, owner).clone();
        debug!(namespace = %record.namespace, "federation record registered");
        Ok(record)
    }

    /// The record for the exact namespace.
    pub fn federation_record(&self, namespace: &Mrn) -> Result<FederationRecord, ServiceError> {
        self.store
            .read()
            .record_exact(namespace)
            .cloned()
            .ok_or(ServiceError::NotFound)
    }

    /// Lookup by store-assigned id.
    pub fn federation_record_by_id(&self, id: u64) -> Result<FederationRecord, ServiceError> {
        self.store
            .read()
            .record_by_id(id)
            .cloned()
            .ok_or(ServiceError::NotFound)
    }

    /// Delete the record for the exact namespace.
    pub fn delete_federation(&self, namespace: &Mrn) -> Result<(), ServiceError> {
        self.store
            .write()
            .delete_record(namespace)
            .map(|_| ())
            .ok_or(ServiceError::NotFound)
    }

    /// Delete the record with the given id, returning it.
    pub fn delete_federation_by_id(&self, id: u64) -> Result<FederationRecord, ServiceError> {
        self.store
            .write()
            .delete_record_by_id(id)
            .ok_or(ServiceError::NotFound)
    }

    fn miss(
        &self,
        records: &std::collections::BTreeMap<String, FederationRecord>,
        mrn: &Mrn,
    ) -> ServiceError {
        match federation::find_delegate(records, mrn) {
            Some(record) => ServiceError::Delegated {
                record: record.clone(),
            },
            None => ServiceError::NotFound,
        }
    }
}
