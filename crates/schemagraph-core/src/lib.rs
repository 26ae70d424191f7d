//! Schemagraph Core - Schema object tree, dependency resolution and descriptions.
//!
//! Schema objects of a database are held in a [`MetadataTree`]. Descriptions
//! and dependencies are read from the database catalog on demand through
//! the [`CatalogAccess`] interface.

pub mod catalog;
pub mod config;
pub mod dependency;
pub mod description;
pub mod error;
pub mod loader;
pub mod metadata;
pub mod session;

#[cfg(test)]
mod testing;

pub use catalog::{
    text_chunks, BlobId, CatalogAccess, CatalogTransaction, Row, TextStream, TransactionMode,
    Value,
};
pub use config::EngineConfig;
pub use dependency::{Dependency, DependencyResolver, Direction};
pub use description::{Description, DescriptionStore};
pub use error::{CatalogError, Error, Result};
pub use loader::CatalogLoader;
pub use metadata::{
    new_shared_tree, trim_name, DescriptionState, ForeignKey, MetadataNode, MetadataTree,
    NodeDetails, NodeId, NodeKind, NodeObserver, ObserverId, ProcedureSnapshot,
    RelationSnapshot, SchemaSnapshot, SharedMetadataTree, TableSnapshot, ALL_KINDS,
};
pub use session::MetadataSession;
