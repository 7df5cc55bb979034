//! Package model.
//!
//! A [`Package`] holds the parts of an office document, its content type
//! map, and the relationship graph between parts. A document layout turns
//! the main part into a [`ContentIndex`]: the ordered content nodes, the
//! units holding them, and the shared resource pools they reference.

pub mod constants;
pub mod content_types;
pub mod node;
#[allow(clippy::module_inception)]
pub mod package;
pub mod packuri;
pub mod pool;
pub mod rel;
pub mod rules;

pub use content_types::ContentTypes;
pub use node::{BreakMarkers, ContentIndex, ContentNode, ContentUnit};
pub use package::{Package, Part};
pub use packuri::PackURI;
pub use pool::{PoolEntry, PoolKind, PoolSet, RefList, ResourceRef, SharedResourcePool};
pub use rel::{Relationship, RelationshipGraph, Relationships};
