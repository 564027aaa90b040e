//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`Mrn`] - Validated colon-delimited resource name / namespace path
//! - [`Version`] - Dotted-integer resource version with lazy comparison
//! - [`CorrelationId`] - Identifier correlating async syntax-creation results
//! - [`OwnerContact`] - Contact information for a namespace owner
//!
//! # Validation
//!
//! [`Mrn`] enforces validity at construction time. Invalid values cannot be
//! represented, preventing entire classes of bugs. [`Version`] is the
//! deliberate exception: version strings are accepted as written and their
//! integer components are parsed only when two versions are compared.
//!
//! # Examples
//!
//! ```
//! use mrn_registry::core::types::{Mrn, Version};
//!
//! let mrn = Mrn::new("urn:mrn:test:device:5").unwrap();
//! assert_eq!(mrn.parent().unwrap().as_str(), "urn:mrn:test:device");
//!
//! // Invalid constructions fail at creation time
//! assert!(Mrn::new("urn::test").is_err());
//! assert!(Mrn::new(":urn").is_err());
//!
//! // Versions are permissive on write, strict on compare
//! let bad = Version::new("1.x.0");
//! assert!(bad.compare(&Version::new("1.0.0")).is_err());
//! ```

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid MRN: {0}")]
    InvalidMrn(String),

    #[error("malformed version '{0}': components must be dotted integers")]
    MalformedVersion(String),

    #[error("invalid correlation id: {0}")]
    InvalidCorrelationId(String),
}

/// A validated Maritime Resource Name or namespace path.
///
/// MRNs are hierarchical, colon-delimited identifiers. A namespace is simply
/// a prefix of an MRN under colon-segmentation, so both are represented by
/// this one type.
///
/// Rules enforced at construction:
/// - Cannot be empty
/// - Cannot start or end with `:`
/// - Cannot contain an empty segment (`::`)
/// - Cannot contain whitespace or ASCII control characters
///
/// # Example
///
/// ```
/// use mrn_registry::core::types::Mrn;
///
/// let mrn = Mrn::new("urn:mrn:iala:vts").unwrap();
/// assert_eq!(mrn.as_str(), "urn:mrn:iala:vts");
/// assert_eq!(mrn.parent().unwrap().as_str(), "urn:mrn:iala");
///
/// // A single segment has no parent
/// assert!(Mrn::new("urn").unwrap().parent().is_none());
///
/// assert!(Mrn::new("").is_err());
/// assert!(Mrn::new("urn:").is_err());
/// assert!(Mrn::new("has space:x").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Mrn(String);

impl Mrn {
    /// Create a new validated MRN.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidMrn` if the value violates the MRN rules.
    pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        Self::validate(&value)?;
        Ok(Self(value))
    }

    fn validate(value: &str) -> Result<(), TypeError> {
        if value.is_empty() {
            return Err(TypeError::InvalidMrn("MRN cannot be empty".into()));
        }
        if value.starts_with(':') || value.ends_with(':') {
            return Err(TypeError::InvalidMrn(
                "MRN cannot start or end with ':'".into(),
            ));
        }
        if value.contains("::") {
            return Err(TypeError::InvalidMrn(
                "MRN cannot contain an empty segment".into(),
            ));
        }
        for c in value.chars() {
            if c.is_whitespace() {
                return Err(TypeError::InvalidMrn(
                    "MRN cannot contain whitespace".into(),
                ));
            }
            if c.is_ascii_control() {
                return Err(TypeError::InvalidMrn(
                    "MRN cannot contain control characters".into(),
                ));
            }
        }
        Ok(())
    }

    /// Get the MRN as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the colon-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(':')
    }

    /// The namespace one level up, obtained by stripping the last segment.
    ///
    /// Returns `None` when the path has no colon left to strip.
    pub fn parent(&self) -> Option<Mrn> {
        let idx = self.0.rfind(':')?;
        // A prefix of a valid MRN up to a colon is itself valid.
        Some(Mrn(self.0[..idx].to_string()))
    }

    /// Iterate over all proper ancestors, nearest first.
    ///
    /// # Example
    ///
    /// ```
    /// use mrn_registry::core::types::Mrn;
    ///
    /// let mrn = Mrn::new("a:b:c").unwrap();
    /// let ancestors: Vec<String> =
    ///     mrn.ancestors().map(|a| a.as_str().to_string()).collect();
    /// assert_eq!(ancestors, vec!["a:b", "a"]);
    /// ```
    pub fn ancestors(&self) -> impl Iterator<Item = Mrn> {
        std::iter::successors(self.parent(), Mrn::parent)
    }

    /// Segment-wise prefix test.
    ///
    /// `a:b` is a prefix of `a:b` and of `a:b:c`, but not of `a:bc`.
    ///
    /// # Example
    ///
    /// ```
    /// use mrn_registry::core::types::Mrn;
    ///
    /// let ns = Mrn::new("a:b").unwrap();
    /// assert!(ns.is_prefix_of(&Mrn::new("a:b").unwrap()));
    /// assert!(ns.is_prefix_of(&Mrn::new("a:b:c").unwrap()));
    /// assert!(!ns.is_prefix_of(&Mrn::new("a:bc").unwrap()));
    /// ```
    pub fn is_prefix_of(&self, other: &Mrn) -> bool {
        other.0 == self.0
            || other
                .0
                .strip_prefix(&self.0)
                .is_some_and(|rest| rest.starts_with(':'))
    }
}

impl TryFrom<String> for Mrn {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Mrn> for String {
    fn from(mrn: Mrn) -> Self {
        mrn.0
    }
}

impl AsRef<str> for Mrn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Mrn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resource version string in dotted-integer form.
///
/// Versions are stored exactly as written. Component parsing happens at
/// comparison time, so a malformed version is accepted on write and only
/// surfaces as [`TypeError::MalformedVersion`] when something needs to
/// order it.
///
/// Ordering compares integer components left to right over the shared
/// prefix length; on a shared-prefix tie the version with more components
/// is the greater one.
///
/// # Example
///
/// ```
/// use std::cmp::Ordering;
/// use mrn_registry::core::types::Version;
///
/// let a = Version::new("1.2.0");
/// let b = Version::new("1.10.0");
/// assert_eq!(a.compare(&b).unwrap(), Ordering::Less);
///
/// // Shared-prefix tie: more components wins
/// let short = Version::new("1.2");
/// let long = Version::new("1.2.0");
/// assert_eq!(short.compare(&long).unwrap(), Ordering::Less);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Create a version from its raw string form. Never fails; validation
    /// is deferred to comparison.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the version as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the dotted-integer components.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::MalformedVersion` if any component is not a
    /// base-10 integer.
    pub fn components(&self) -> Result<Vec<u64>, TypeError> {
        self.0
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| TypeError::MalformedVersion(self.0.clone()))
            })
            .collect()
    }

    /// Compare two versions component-wise over their shared prefix length,
    /// falling back to "more components wins" on a shared-prefix tie.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::MalformedVersion` if either side fails integer
    /// parsing.
    pub fn compare(&self, other: &Version) -> Result<Ordering, TypeError> {
        let a = self.components()?;
        let b = other.components()?;
        for (x, y) in a.iter().zip(b.iter()) {
            match x.cmp(y) {
                Ordering::Equal => continue,
                ord => return Ok(ord),
            }
        }
        Ok(a.len().cmp(&b.len()))
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier correlating an asynchronous syntax-creation result with the
/// request that produced it.
///
/// Generated ids are UUIDv4 in simple (hyphen-free) form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a fresh correlation id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Wrap an existing id, e.g. one received from a status poll.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidCorrelationId` if the value is empty or
    /// contains whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        if value.is_empty() || value.chars().any(|c| c.is_whitespace()) {
            return Err(TypeError::InvalidCorrelationId(value));
        }
        Ok(Self(value))
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CorrelationId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CorrelationId> for String {
    fn from(id: CorrelationId) -> Self {
        id.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Contact information for the party owning a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerContact {
    /// Organisation or person name
    pub name: String,
    /// Point-of-contact mail address
    pub email: String,
    /// Phone number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Website
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Postal address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Country
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl OwnerContact {
    /// Create a contact with just the required fields.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: None,
            url: None,
            address: None,
            country: None,
        }
    }
}
