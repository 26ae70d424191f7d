//! In-memory model of a database's schema objects.
//!
//! The tree mirrors one or more catalogs: databases at the top, schema
//! objects below them, columns and parameters below their owners.

mod kind;
mod node;
mod observer;
mod snapshot;
mod tree;

pub use kind::{NodeKind, ALL_KINDS};
pub use node::{trim_name, DescriptionState, ForeignKey, MetadataNode, NodeDetails, NodeId};
pub use observer::{NodeObserver, ObserverId};
pub use snapshot::{ProcedureSnapshot, RelationSnapshot, SchemaSnapshot, TableSnapshot};
pub use tree::{new_shared_tree, MetadataTree, SharedMetadataTree};

#[cfg(test)]
pub(crate) use observer::recording;
