//! core
//!
//! Domain types, the namespace tree arena, and registry entities.
//!
//! # Modules
//!
//! - [`types`]: Validated core types ([`Mrn`], [`Version`], ids, contacts)
//! - [`tree`]: Namespace tree arena with cascading creation
//! - [`entities`]: Entities referencing into the tree
//!
//! [`Mrn`]: types::Mrn
//! [`Version`]: types::Version

pub mod entities;
pub mod tree;
pub mod types;
