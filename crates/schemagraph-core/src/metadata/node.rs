//! Metadata nodes.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::NodeKind;

/// Handle of a node inside a [`MetadataTree`](super::MetadataTree).
///
/// Slots are reused after a drop; the generation tells a stale handle
/// apart from the node now occupying its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Arena slot index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of times the slot was reused before this node took it.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// A foreign key declared on a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,
    /// Referencing columns on the owning table.
    pub columns: Vec<String>,
    /// Referenced table name.
    pub referenced_table: String,
    /// Referenced columns, in key order.
    pub referenced_columns: Vec<String>,
}

impl ForeignKey {
    /// Create a foreign key.
    pub fn new(
        name: impl Into<String>,
        referenced_table: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            referenced_table: referenced_table.into(),
            referenced_columns: Vec::new(),
        }
    }

    /// Add a `column -> referenced column` pair.
    pub fn with_column(
        mut self,
        column: impl Into<String>,
        referenced: impl Into<String>,
    ) -> Self {
        self.columns.push(column.into());
        self.referenced_columns.push(referenced.into());
        self
    }

    /// Referenced columns joined with `", "`.
    pub fn referenced_column_list(&self) -> String {
        self.referenced_columns.join(", ")
    }
}

/// Kind-specific payload of a node.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NodeDetails {
    /// No extra data.
    #[default]
    Plain,
    /// Table data.
    Table {
        /// Foreign keys declared on the table.
        foreign_keys: Vec<ForeignKey>,
    },
}

impl NodeDetails {
    /// Default payload for a kind.
    pub fn for_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Table => NodeDetails::Table {
                foreign_keys: Vec::new(),
            },
            _ => NodeDetails::Plain,
        }
    }
}

/// Cached description of a node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DescriptionState {
    /// Not fetched yet, or the last fetch failed.
    #[default]
    Unloaded,
    /// Reflects the catalog as of the last fetch or successful write.
    Loaded(String),
}

/// A node of the metadata tree.
#[derive(Debug, Clone)]
pub struct MetadataNode {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) description: DescriptionState,
    pub(crate) details: NodeDetails,
}

impl MetadataNode {
    pub(crate) fn new(id: NodeId, kind: NodeKind, name: &str, parent: Option<NodeId>) -> Self {
        Self {
            id,
            name: trim_name(name).to_string(),
            kind,
            parent,
            children: Vec::new(),
            description: DescriptionState::Unloaded,
            details: NodeDetails::for_kind(kind),
        }
    }

    /// Node handle.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Object name, without catalog padding.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Parent node, if attached.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Name used in item paths.
    pub fn path_name(&self) -> &str {
        &self.name
    }

    /// Whether the name carries the reserved system prefix.
    pub fn is_system(&self, system_prefix: &str) -> bool {
        self.name.starts_with(system_prefix)
    }

    /// `DROP <type> <name>;` for kinds that can be dropped directly.
    pub fn drop_sql_statement(&self) -> Option<String> {
        if !self.kind.supports_drop() {
            return None;
        }
        Some(format!("DROP {} {};", self.kind.type_name(), self.name))
    }

    /// Whether the description reflects the catalog.
    pub fn description_loaded(&self) -> bool {
        matches!(self.description, DescriptionState::Loaded(_))
    }

    /// Cached description, if loaded.
    pub fn cached_description(&self) -> Option<&str> {
        match &self.description {
            DescriptionState::Loaded(text) => Some(text.as_str()),
            DescriptionState::Unloaded => None,
        }
    }

    /// Kind-specific payload.
    pub fn details(&self) -> &NodeDetails {
        &self.details
    }

    /// Foreign keys, for tables only.
    pub fn as_foreign_key_source(&self) -> Option<&[ForeignKey]> {
        match &self.details {
            NodeDetails::Table { foreign_keys } => Some(foreign_keys.as_slice()),
            NodeDetails::Plain => None,
        }
    }

    pub(crate) fn foreign_keys_mut(&mut self) -> Option<&mut Vec<ForeignKey>> {
        match &mut self.details {
            NodeDetails::Table { foreign_keys } => Some(foreign_keys),
            NodeDetails::Plain => None,
        }
    }
}

/// Strip trailing blank padding from a catalog name.
pub fn trim_name(name: &str) -> &str {
    name.trim_end_matches(' ')
}
