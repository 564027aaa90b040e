//! api
//!
//! Interface boundary: DTOs, the structured error body, and handler
//! functions.
//!
//! # Design
//!
//! HTTP routing and serialization live outside this crate; the functions
//! here are the handlers a router binds to. Each returns an
//! [`ApiResponse`] carrying the status code and JSON-serializable body, or
//! an [`ApiError`] with the stable error structure `{timestamp, status,
//! error, message, path}` — plus `location` when the answer is a federation
//! redirect, so a client can follow the delegate.
//!
//! Entitlement gating happens here, before anything reaches the service:
//! every mutating call and the creation-status read require the caller to
//! manage the target namespace.

use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::auth::Entitlement;
use crate::compiler::CreationSubmission;
use crate::core::entities::{
    FederationRecord, SyntaxCreationStatus, SyntaxDefinition, VersionedResource,
};
use crate::core::types::{CorrelationId, Mrn, OwnerContact, Version};
use crate::service::{RegistryService, ServiceError};
use crate::store::{NewResource, Page, PageRequest};

/// A successful boundary response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse<T> {
    /// HTTP status to respond with.
    pub status: StatusCode,
    /// JSON-serializable body.
    pub body: T,
}

impl<T> ApiResponse<T> {
    fn ok(body: T) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    fn with_status(status: StatusCode, body: T) -> Self {
        Self { status, body }
    }
}

/// The stable structured error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// When the error was produced.
    pub timestamp: DateTime<Utc>,
    /// HTTP status code.
    pub status: u16,
    /// Short error label (the status reason phrase).
    pub error: String,
    /// Detailed message naming the offending condition.
    pub message: String,
    /// The request path.
    pub path: String,
    /// Delegate URL on a federation redirect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>, path: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: message.into(),
            path: path.to_string(),
            location: None,
        }
    }

    /// A `303 See Other` pointing at the federation member owning the
    /// namespace. The location is the delegate's endpoint joined with the
    /// original request path.
    fn redirect(record: &FederationRecord, path: &str) -> Self {
        let mut error = Self::new(
            StatusCode::SEE_OTHER,
            format!(
                "please repeat your query in the registry for the namespace '{}'",
                record.namespace
            ),
            path,
        );
        error.location = Some(format!(
            "{}{}",
            record.endpoint.trim_end_matches('/'),
            path
        ));
        error
    }

    fn forbidden(path: &str) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "you are not allowed to manage this namespace",
            path,
        )
    }

    fn not_found(message: impl Into<String>, path: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, path)
    }
}

const RESOURCE_NOT_FOUND: &str = "the requested resource could not be found";
const RECORD_NOT_FOUND: &str = "a registry entry for the given namespace could not be found";

/// Map a service error on a read path. `Delegated` becomes a redirect.
fn read_error(err: ServiceError, path: &str) -> ApiError {
    match err {
        ServiceError::Delegated { record } => ApiError::redirect(&record, path),
        ServiceError::NotFound => ApiError::not_found(RESOURCE_NOT_FOUND, path),
        ServiceError::SyntaxNotFound(mrn) => ApiError::not_found(
            format!("a syntax definition could not be found for '{mrn}'"),
            path,
        ),
        ServiceError::MalformedVersion(e) => {
            ApiError::new(StatusCode::BAD_REQUEST, e.to_string(), path)
        }
        other => ApiError::new(StatusCode::BAD_REQUEST, other.to_string(), path),
    }
}

// ---------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------

/// Syntax definition representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntaxDto {
    pub mrn_namespace: Mrn,
    pub abnf_syntax: String,
    pub regex: String,
}

impl From<SyntaxDefinition> for SyntaxDto {
    fn from(definition: SyntaxDefinition) -> Self {
        Self {
            mrn_namespace: definition.namespace,
            abnf_syntax: definition.abnf,
            regex: definition.regex,
        }
    }
}

/// Versioned resource representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub mrn: Mrn,
    pub version: Version,
    pub location: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl From<VersionedResource> for ResourceDto {
    fn from(resource: VersionedResource) -> Self {
        Self {
            id: Some(resource.id),
            mrn: resource.mrn,
            version: resource.version,
            location: resource.location,
            name: resource.name,
            description: resource.description,
        }
    }
}

/// Federation record representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub mrn_namespace: Mrn,
    pub endpoint: String,
    pub owner: OwnerContact,
}

impl From<FederationRecord> for FederationDto {
    fn from(record: FederationRecord) -> Self {
        Self {
            id: Some(record.id),
            mrn_namespace: record.namespace,
            endpoint: record.endpoint,
            owner: record.owner,
        }
    }
}

/// Body of a syntax-creation submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntaxCreationBody {
    pub namespace: Mrn,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_namespace: Option<Mrn>,
    pub abnf_syntax: String,
    pub namespace_owner: OwnerContact,
}

/// Acknowledgement of an accepted creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationAccepted {
    pub correlation_id: CorrelationId,
}

// ---------------------------------------------------------------------
// Syntax handlers
// ---------------------------------------------------------------------

/// `GET /syntax/{mrn}` — the syntax definition that applies to the MRN.
///
/// `303` with a `Location` header when a federation delegate owns the
/// namespace, `404` when no definition exists on the ancestor chain.
pub fn get_syntax_for_mrn(
    service: &RegistryService,
    mrn: &Mrn,
    path: &str,
) -> Result<ApiResponse<SyntaxDto>, ApiError> {
    service
        .syntax_for_mrn(mrn)
        .map(|definition| ApiResponse::ok(definition.into()))
        .map_err(|e| read_error(e, path))
}

/// `GET /syntax?under={namespace}` — all definitions at or under a
/// namespace, paged.
pub fn list_syntaxes_under(
    service: &RegistryService,
    namespace: &Mrn,
    page: PageRequest,
) -> ApiResponse<Page<SyntaxDto>> {
    ApiResponse::ok(service.syntaxes_under(namespace, page).map(SyntaxDto::from))
}

/// `POST /syntax` — submit a creation request; `202` with the correlation
/// id. Requires entitlement for the target namespace.
pub fn create_syntax(
    service: &RegistryService,
    entitlement: &dyn Entitlement,
    body: SyntaxCreationBody,
    path: &str,
) -> Result<ApiResponse<CreationAccepted>, ApiError> {
    if !entitlement.can_manage(&body.namespace) {
        return Err(ApiError::forbidden(path));
    }
    let correlation_id = service.submit_syntax_creation(CreationSubmission {
        namespace: body.namespace,
        parent_namespace: body.parent_namespace,
        abnf: body.abnf_syntax,
        owner: body.namespace_owner,
    });
    Ok(ApiResponse::with_status(
        StatusCode::ACCEPTED,
        CreationAccepted { correlation_id },
    ))
}

/// `GET /syntax/status/{id}` — current creation status.
///
/// `404` if unknown, `403` if the caller does not manage the target
/// namespace.
pub fn get_creation_status(
    service: &RegistryService,
    entitlement: &dyn Entitlement,
    id: &CorrelationId,
    path: &str,
) -> Result<ApiResponse<SyntaxCreationStatus>, ApiError> {
    let status = service.creation_status(id).map_err(|_| {
        ApiError::not_found("the syntax creation status could not be found", path)
    })?;
    if !entitlement.can_manage(&status.namespace) {
        return Err(ApiError::forbidden(path));
    }
    Ok(ApiResponse::ok(status))
}

// ---------------------------------------------------------------------
// Resource handlers
// ---------------------------------------------------------------------

/// `GET /resource/{mrn}` — a page of all versions registered under the MRN;
/// `303` when the namespace belongs to a federation delegate.
pub fn list_resources(
    service: &RegistryService,
    mrn: &Mrn,
    page: PageRequest,
    path: &str,
) -> Result<ApiResponse<Page<ResourceDto>>, ApiError> {
    service
        .resources_for_mrn(mrn, page)
        .map(|page| ApiResponse::ok(page.map(ResourceDto::from)))
        .map_err(|e| read_error(e, path))
}

/// `GET /resource/{mrn}/{version}`.
pub fn get_resource(
    service: &RegistryService,
    mrn: &Mrn,
    version: &str,
    path: &str,
) -> Result<ApiResponse<ResourceDto>, ApiError> {
    service
        .resource(mrn, version)
        .map(|resource| ApiResponse::ok(resource.into()))
        .map_err(|e| read_error(e, path))
}

/// `GET /resource/{mrn}/latest` — resolved by dotted-integer ordering.
pub fn get_latest_resource(
    service: &RegistryService,
    mrn: &Mrn,
    path: &str,
) -> Result<ApiResponse<ResourceDto>, ApiError> {
    service
        .latest_resource(mrn)
        .map(|resource| ApiResponse::ok(resource.into()))
        .map_err(|e| read_error(e, path))
}

/// `GET /resource/id/{id}`.
pub fn get_resource_by_id(
    service: &RegistryService,
    id: u64,
    path: &str,
) -> Result<ApiResponse<ResourceDto>, ApiError> {
    service
        .resource_by_id(id)
        .map(|resource| ApiResponse::ok(resource.into()))
        .map_err(|_| ApiError::not_found(RESOURCE_NOT_FOUND, path))
}

/// `POST /resource` — register a new resource version.
///
/// `201` on success; `400` when validation or federation ownership fails;
/// `409` on a duplicate version.
pub fn create_resource(
    service: &RegistryService,
    entitlement: &dyn Entitlement,
    body: ResourceDto,
    path: &str,
) -> Result<ApiResponse<ResourceDto>, ApiError> {
    if !entitlement.can_manage(&body.mrn) {
        return Err(ApiError::forbidden(path));
    }
    let created = service
        .create_resource(NewResource {
            mrn: body.mrn,
            version: body.version,
            location: body.location,
            name: body.name,
            description: body.description,
        })
        .map_err(|e| match e {
            ServiceError::Delegated { record } => ApiError::new(
                StatusCode::BAD_REQUEST,
                format!(
                    "a registry for the namespace '{}' exists, please register your resource there",
                    record.namespace
                ),
                path,
            ),
            ServiceError::DuplicateVersion { .. } => ApiError::new(
                StatusCode::CONFLICT,
                "a resource with the given combination of MRN and version already exists",
                path,
            ),
            other => ApiError::new(StatusCode::BAD_REQUEST, other.to_string(), path),
        })?;
    Ok(ApiResponse::with_status(
        StatusCode::CREATED,
        created.into(),
    ))
}

/// `DELETE /resource/{mrn}/{version}`.
pub fn delete_resource(
    service: &RegistryService,
    entitlement: &dyn Entitlement,
    mrn: &Mrn,
    version: &str,
    path: &str,
) -> Result<ApiResponse<()>, ApiError> {
    if !entitlement.can_manage(mrn) {
        return Err(ApiError::forbidden(path));
    }
    service
        .delete_resource(mrn, version)
        .map(|_| ApiResponse::with_status(StatusCode::NO_CONTENT, ()))
        .map_err(|_| ApiError::not_found(RESOURCE_NOT_FOUND, path))
}

/// `DELETE /resource/id/{id}` — the entitlement check runs against the MRN
/// of the stored resource.
pub fn delete_resource_by_id(
    service: &RegistryService,
    entitlement: &dyn Entitlement,
    id: u64,
    path: &str,
) -> Result<ApiResponse<()>, ApiError> {
    let resource = service
        .resource_by_id(id)
        .map_err(|_| ApiError::not_found(RESOURCE_NOT_FOUND, path))?;
    if !entitlement.can_manage(&resource.mrn) {
        return Err(ApiError::forbidden(path));
    }
    service
        .delete_resource_by_id(id)
        .map(|_| ApiResponse::with_status(StatusCode::NO_CONTENT, ()))
        .map_err(|_| ApiError::not_found(RESOURCE_NOT_FOUND, path))
}

// ---------------------------------------------------------------------
// Federation handlers
// ---------------------------------------------------------------------

/// `GET /mrr/{mrnNamespace}`.
pub fn get_federation_record(
    service: &RegistryService,
    namespace: &Mrn,
    path: &str,
) -> Result<ApiResponse<FederationDto>, ApiError> {
    service
        .federation_record(namespace)
        .map(|record| ApiResponse::ok(record.into()))
        .map_err(|_| ApiError::not_found(RECORD_NOT_FOUND, path))
}

/// `GET /mrr/id/{id}`.
pub fn get_federation_record_by_id(
    service: &RegistryService,
    id: u64,
    path: &str,
) -> Result<ApiResponse<FederationDto>, ApiError> {
    service
        .federation_record_by_id(id)
        .map(|record| ApiResponse::ok(record.into()))
        .map_err(|_| ApiError::not_found(RECORD_NOT_FOUND, path))
}

/// `POST /mrr` — register a federation record.
///
/// `400` when a record already governs the same, a broader, or a descendant
/// namespace (the no-overlap invariant), or the endpoint is not HTTPS.
pub fn create_federation_record(
    service: &RegistryService,
    entitlement: &dyn Entitlement,
    body: FederationDto,
    path: &str,
) -> Result<ApiResponse<FederationDto>, ApiError> {
    if !entitlement.can_manage(&body.mrn_namespace) {
        return Err(ApiError::forbidden(path));
    }
    service
        .register_federation(body.mrn_namespace, body.endpoint, body.owner)
        .map(|record| ApiResponse::ok(record.into()))
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string(), path))
}

/// `DELETE /mrr/{mrnNamespace}`.
pub fn delete_federation_record(
    service: &RegistryService,
    entitlement: &dyn Entitlement,
    namespace: &Mrn,
    path: &str,
) -> Result<ApiResponse<()>, ApiError> {
    if !entitlement.can_manage(namespace) {
        return Err(ApiError::forbidden(path));
    }
    service
        .delete_federation(namespace)
        .map(|_| ApiResponse::with_status(StatusCode::NO_CONTENT, ()))
        .map_err(|_| ApiError::not_found(RECORD_NOT_FOUND, path))
}

/// `DELETE /mrr/id/{id}` — the entitlement check runs against the namespace
/// of the stored record.
pub fn delete_federation_record_by_id(
    service: &RegistryService,
    entitlement: &dyn Entitlement,
    id: u64,
    path: &str,
) -> Result<ApiResponse<()>, ApiError> {
    let record = service
        .federation_record_by_id(id)
        .map_err(|_| ApiError::not_found(RECORD_NOT_FOUND, path))?;
    if !entitlement.can_manage(&record.namespace) {
        return Err(ApiError::forbidden(path));
    }
    service
        .delete_federation_by_id(id)
        .map(|_| ApiResponse::with_status(StatusCode::NO_CONTENT, ()))
        .map_err(|_| ApiError::not_found(RECORD_NOT_FOUND, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::auth::{AllowAll, ClaimsEntitlement, DenyAll};
    use crate::compiler::mock::MockCompilerTransport;
    use crate::core::entities::SyntaxDefinition;
    use crate::store::RegistryStore;

    fn mrn(s: &str) -> Mrn {
        Mrn::new(s).unwrap()
    }

    fn owner() -> OwnerContact {
        OwnerContact::new("IALA", "ops@example.org")
    }

    fn service() -> RegistryService {
        RegistryService::new(RegistryStore::new(), Arc::new(MockCompilerTransport::new()))
    }

    fn with_syntax(service: &RegistryService, namespace: &str, regex: &str) {
        service.store().write().put_syntax(SyntaxDefinition {
            namespace: mrn(namespace),
            abnf: String::new(),
            regex: regex.into(),
            owner: owner(),
        });
    }

    fn federation_body(namespace: &str, endpoint: &str) -> FederationDto {
        FederationDto {
            id: None,
            mrn_namespace: mrn(namespace),
            endpoint: endpoint.into(),
            owner: owner(),
        }
    }

    fn resource_body(mrn_str: &str, version: &str) -> ResourceDto {
        ResourceDto {
            id: None,
            mrn: mrn(mrn_str),
            version: Version::new(version),
            location: "https://registry.example.org/doc".into(),
            name: "doc".into(),
            description: String::new(),
        }
    }

    #[test]
    fn redirect_carries_location_from_delegate() {
        let svc = service();
        create_federation_record(
            &svc,
            &AllowAll,
            federation_body("urn:mrn:other", "https://other.example.org"),
            "/mrr",
        )
        .unwrap();

        let err = get_syntax_for_mrn(
            &svc,
            &mrn("urn:mrn:other:thing"),
            "/syntax/urn:mrn:other:thing",
        )
        .unwrap_err();
        assert_eq!(err.status, StatusCode::SEE_OTHER.as_u16());
        assert_eq!(
            err.location.as_deref(),
            Some("https://other.example.org/syntax/urn:mrn:other:thing")
        );
    }

    #[test]
    fn syntax_miss_is_404() {
        let svc = service();
        let err = get_syntax_for_mrn(&svc, &mrn("urn:mrn:x"), "/syntax/urn:mrn:x").unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND.as_u16());
    }

    #[test]
    fn create_resource_maps_statuses() {
        let svc = service();
        with_syntax(&svc, "urn:mrn:test", r"^urn:mrn:test:\d+$");

        let created = create_resource(
            &svc,
            &AllowAll,
            resource_body("urn:mrn:test:5", "1.0.0"),
            "/resource",
        )
        .unwrap();
        assert_eq!(created.status, StatusCode::CREATED);
        assert_eq!(created.body.id, Some(1));

        let dup = create_resource(
            &svc,
            &AllowAll,
            resource_body("urn:mrn:test:5", "1.0.0"),
            "/resource",
        )
        .unwrap_err();
        assert_eq!(dup.status, StatusCode::CONFLICT.as_u16());

        let mismatch = create_resource(
            &svc,
            &AllowAll,
            resource_body("urn:mrn:test:abc", "1.0.0"),
            "/resource",
        )
        .unwrap_err();
        assert_eq!(mismatch.status, StatusCode::BAD_REQUEST.as_u16());
    }

    #[test]
    fn create_resource_against_foreign_namespace_is_400() {
        let svc = service();
        with_syntax(&svc, "urn", ".*");
        create_federation_record(
            &svc,
            &AllowAll,
            federation_body("urn:mrn:other", "https://other.example.org"),
            "/mrr",
        )
        .unwrap();

        let err = create_resource(
            &svc,
            &AllowAll,
            resource_body("urn:mrn:other:thing", "1.0.0"),
            "/resource",
        )
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST.as_u16());
        assert!(err.message.contains("urn:mrn:other"));
    }

    #[test]
    fn entitlement_gates_mutations() {
        let svc = service();
        with_syntax(&svc, "urn:mrn:test", ".*");

        let err = create_resource(
            &svc,
            &DenyAll,
            resource_body("urn:mrn:test:5", "1.0.0"),
            "/resource",
        )
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN.as_u16());

        let scoped = ClaimsEntitlement::new(vec![mrn("urn:mrn:test")]);
        assert!(create_resource(
            &svc,
            &scoped,
            resource_body("urn:mrn:test:5", "1.0.0"),
            "/resource",
        )
        .is_ok());
    }

    #[tokio::test]
    async fn creation_status_gated_by_namespace() {
        let svc = service();
        let accepted = create_syntax(
            &svc,
            &AllowAll,
            SyntaxCreationBody {
                namespace: mrn("urn:mrn:test"),
                parent_namespace: None,
                abnf_syntax: "grammar".into(),
                namespace_owner: owner(),
            },
            "/syntax",
        )
        .unwrap();
        assert_eq!(accepted.status, StatusCode::ACCEPTED);
        let id = accepted.body.correlation_id;

        let err = get_creation_status(&svc, &DenyAll, &id, "/syntax/status").unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN.as_u16());

        let ok = get_creation_status(&svc, &AllowAll, &id, "/syntax/status").unwrap();
        assert_eq!(ok.body.namespace, mrn("urn:mrn:test"));
    }

    #[test]
    fn unknown_creation_status_is_404() {
        let svc = service();
        let err = get_creation_status(
            &svc,
            &AllowAll,
            &CorrelationId::generate(),
            "/syntax/status",
        )
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND.as_u16());
    }

    #[test]
    fn delete_by_id_checks_stored_namespace() {
        let svc = service();
        with_syntax(&svc, "urn:mrn:test", ".*");
        let created = create_resource(
            &svc,
            &AllowAll,
            resource_body("urn:mrn:test:5", "1.0.0"),
            "/resource",
        )
        .unwrap();
        let id = created.body.id.unwrap();

        let foreign = ClaimsEntitlement::new(vec![mrn("urn:mrn:elsewhere")]);
        let err = delete_resource_by_id(&svc, &foreign, id, "/resource/id/1").unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN.as_u16());

        let ok = delete_resource_by_id(&svc, &AllowAll, id, "/resource/id/1").unwrap();
        assert_eq!(ok.status, StatusCode::NO_CONTENT);
    }

    #[test]
    fn federation_overlap_is_400() {
        let svc = service();
        create_federation_record(
            &svc,
            &AllowAll,
            federation_body("a", "https://a.example.org"),
            "/mrr",
        )
        .unwrap();
        let err = create_federation_record(
            &svc,
            &AllowAll,
            federation_body("a:b", "https://b.example.org"),
            "/mrr",
        )
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST.as_u16());
    }

    #[test]
    fn error_body_serializes_stable_shape() {
        let err = ApiError::not_found("nothing here", "/resource/x");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["status"], 404);
        assert_eq!(json["error"], "Not Found");
        assert_eq!(json["message"], "nothing here");
        assert_eq!(json["path"], "/resource/x");
        assert!(json.get("location").is_none());
        assert!(json.get("timestamp").is_some());
    }
}
