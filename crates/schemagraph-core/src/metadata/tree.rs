//! The metadata tree.
//!
//! Nodes live in an arena owned by [`MetadataTree`]. Each database forms
//! one root; objects hang below their database and sub-objects (columns,
//! parameters) below their table, view or procedure. Parent links are
//! plain ids used for path and database lookups; ownership only flows
//! through each node's child list.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::node::{trim_name, DescriptionState};
use super::observer::ObserverList;
use super::{ForeignKey, MetadataNode, NodeId, NodeKind, NodeObserver, ObserverId};
use crate::config::DEFAULT_SYSTEM_PREFIX;
use crate::error::{Error, Result};

/// Shared tree handle for callers that serialize access themselves.
pub type SharedMetadataTree = Arc<RwLock<MetadataTree>>;

/// Wrap a tree in a shared handle.
pub fn new_shared_tree(tree: MetadataTree) -> SharedMetadataTree {
    Arc::new(RwLock::new(tree))
}

/// One arena slot. The generation is bumped each time the slot is vacated.
struct Slot {
    generation: u32,
    node: Option<MetadataNode>,
}

/// Arena of metadata nodes with name lookup.
pub struct MetadataTree {
    slots: Vec<Slot>,
    /// Vacant slot indices, reused before the arena grows.
    free: Vec<usize>,
    live: usize,
    /// Top-level nodes in insertion order.
    roots: Vec<NodeId>,
    /// Nodes by kind and name.
    index: HashMap<(NodeKind, String), Vec<NodeId>>,
    /// Observers by node.
    observers: HashMap<NodeId, ObserverList>,
    next_observer_id: u64,
    system_prefix: String,
}

impl MetadataTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::with_system_prefix(DEFAULT_SYSTEM_PREFIX)
    }

    /// Create an empty tree using a custom system-object prefix.
    pub fn with_system_prefix(prefix: impl Into<String>) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            roots: Vec::new(),
            index: HashMap::new(),
            observers: HashMap::new(),
            next_observer_id: 1,
            system_prefix: prefix.into(),
        }
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether the tree holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Top-level nodes.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Number of arena slots, live or vacant.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Iterate over live nodes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &MetadataNode> {
        self.slots.iter().filter_map(|s| s.node.as_ref())
    }

    /// Add a database root.
    pub fn add_database(&mut self, name: &str) -> NodeId {
        let id = self.insert(NodeKind::Database, name, None);
        self.roots.push(id);
        id
    }

    /// Add a node under `parent`.
    pub fn add_node(&mut self, parent: NodeId, kind: NodeKind, name: &str) -> Result<NodeId> {
        let p = self.get(parent)?;
        if !p.kind.can_contain(kind) {
            return Err(Error::NotAContainer {
                kind: p.kind,
                name: p.name.clone(),
                child: kind,
            });
        }
        let id = self.insert(kind, name, Some(parent));
        self.get_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Attach a foreign key to a table.
    pub fn add_foreign_key(&mut self, table: NodeId, foreign_key: ForeignKey) -> Result<()> {
        let node = self.get_mut(table)?;
        let kind = node.kind;
        match node.foreign_keys_mut() {
            Some(keys) => {
                keys.push(foreign_key);
                Ok(())
            }
            None => Err(Error::UnsupportedType {
                kind,
                operation: "foreign keys",
            }),
        }
    }

    fn insert(&mut self, kind: NodeKind, name: &str, parent: Option<NodeId>) -> NodeId {
        let id = match self.free.pop() {
            Some(index) => NodeId::new(index, self.slots[index].generation),
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: None,
                });
                NodeId::new(self.slots.len() - 1, 0)
            }
        };
        let node = MetadataNode::new(id, kind, name, parent);
        self.index
            .entry((kind, node.name.clone()))
            .or_default()
            .push(id);
        self.slots[id.index].node = Some(node);
        self.live += 1;
        id
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&MetadataNode> {
        self.slots
            .get(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
    }

    /// Look up a node, failing on a stale id.
    pub fn get(&self, id: NodeId) -> Result<&MetadataNode> {
        self.node(id).ok_or(Error::InvalidNode(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut MetadataNode> {
        self.slots
            .get_mut(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
            .ok_or(Error::InvalidNode(id))
    }

    /// Children of a node.
    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(self.get(id)?.children())
    }

    /// Append the children of a composite node to `out`.
    ///
    /// Returns false for leaf kinds, leaving `out` untouched.
    pub fn collect_children(&self, id: NodeId, out: &mut Vec<NodeId>) -> bool {
        match self.node(id) {
            Some(node) if is_composite(node.kind) => {
                out.extend_from_slice(&node.children);
                true
            }
            _ => false,
        }
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Move a node under another parent.
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> Result<()> {
        let kind = self.get(id)?.kind;
        let target = self.get(new_parent)?;
        if !target.kind.can_contain(kind) {
            return Err(Error::NotAContainer {
                kind: target.kind,
                name: target.name.clone(),
                child: kind,
            });
        }
        // A node cannot move below its own subtree.
        let mut cursor = Some(new_parent);
        while let Some(current) = cursor {
            if current == id {
                return Err(Error::NotAContainer {
                    kind: target.kind,
                    name: target.name.clone(),
                    child: kind,
                });
            }
            cursor = self.parent(current);
        }

        self.unlink(id);
        self.get_mut(new_parent)?.children.push(id);
        self.get_mut(id)?.parent = Some(new_parent);
        Ok(())
    }

    /// Rename a node. Trailing padding is stripped.
    pub fn set_name(&mut self, id: NodeId, name: &str) -> Result<()> {
        let node = self.get_mut(id)?;
        let old = std::mem::replace(&mut node.name, trim_name(name).to_string());
        let kind = node.kind;
        let new = node.name.clone();
        self.unindex(kind, &old, id);
        self.index.entry((kind, new)).or_default().push(id);
        self.notify_changed(id);
        Ok(())
    }

    /// Assign a kind to a node created as `Unknown`.
    pub fn reclassify(&mut self, id: NodeId, kind: NodeKind) -> Result<()> {
        let node = self.get(id)?;
        if node.kind != NodeKind::Unknown {
            return Err(Error::AlreadyClassified {
                name: node.name.clone(),
                kind: node.kind,
            });
        }
        if let Some(parent) = node.parent.and_then(|p| self.node(p)) {
            if !parent.kind.can_contain(kind) {
                return Err(Error::NotAContainer {
                    kind: parent.kind,
                    name: parent.name.clone(),
                    child: kind,
                });
            }
        }
        let name = node.name.clone();
        self.unindex(NodeKind::Unknown, &name, id);
        self.index.entry((kind, name)).or_default().push(id);

        let node = self.get_mut(id)?;
        node.kind = kind;
        node.details = super::NodeDetails::for_kind(kind);
        Ok(())
    }

    /// Owning database of a node.
    ///
    /// Walks parent links; the node itself is not considered.
    pub fn database_of(&self, id: NodeId) -> Option<NodeId> {
        let mut cursor = self.parent(id);
        while let Some(current) = cursor {
            let node = self.node(current)?;
            if node.kind == NodeKind::Database {
                return Some(current);
            }
            cursor = node.parent;
        }
        None
    }

    /// Name used for the node in item paths.
    pub fn path_name(&self, id: NodeId) -> Result<&str> {
        Ok(self.get(id)?.path_name())
    }

    /// Qualified identifier such as `TABLE(CUSTOMERS)::COLUMN(ID)`.
    ///
    /// Databases contribute no segment, so paths are relative to the
    /// owning database.
    pub fn item_path(&self, id: NodeId) -> Result<String> {
        let node = self.get(id)?;
        if node.kind == NodeKind::Database {
            return Ok(String::new());
        }
        let own = format!("{}({})", node.kind.type_name(), node.path_name());
        match node.parent {
            Some(parent) => {
                let parent_path = self.item_path(parent)?;
                if parent_path.is_empty() {
                    Ok(own)
                } else {
                    Ok(format!("{}::{}", parent_path, own))
                }
            }
            None => Ok(own),
        }
    }

    /// Display name with the child count appended when non-zero.
    pub fn printable_name(&self, id: NodeId) -> Result<String> {
        let node = self.get(id)?;
        match node.children.len() {
            0 => Ok(node.name.clone()),
            n => Ok(format!("{} ({})", node.name, n)),
        }
    }

    /// `DROP` statement for the node, if its kind can be dropped directly.
    pub fn drop_sql_statement(&self, id: NodeId) -> Result<Option<String>> {
        Ok(self.get(id)?.drop_sql_statement())
    }

    /// Whether the node is a catalog system object.
    pub fn is_system(&self, id: NodeId) -> Result<bool> {
        Ok(self.get(id)?.is_system(&self.system_prefix))
    }

    /// First node of `kind` named `name`, anywhere in the tree.
    pub fn find_by_name_and_type(&self, kind: NodeKind, name: &str) -> Option<NodeId> {
        self.index
            .get(&(kind, trim_name(name).to_string()))
            .and_then(|ids| ids.first().copied())
    }

    /// Node of `kind` named `name` inside `database`.
    pub fn find_in_database(&self, database: NodeId, kind: NodeKind, name: &str) -> Option<NodeId> {
        self.index
            .get(&(kind, trim_name(name).to_string()))?
            .iter()
            .copied()
            .find(|id| self.database_of(*id) == Some(database))
    }

    /// Remove a node and its subtree.
    ///
    /// Children are dropped first; each dropped node notifies its
    /// observers, and the node is finally unlinked from its parent.
    pub fn drop_node(&mut self, id: NodeId) -> Result<()> {
        self.get(id)?;
        self.unlink(id);
        self.roots.retain(|r| *r != id);
        self.drop_subtree(id);
        Ok(())
    }

    fn drop_subtree(&mut self, id: NodeId) {
        let Some(slot) = self
            .slots
            .get_mut(id.index)
            .filter(|s| s.generation == id.generation)
        else {
            return;
        };
        let Some(node) = slot.node.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;

        for child in &node.children {
            self.drop_subtree(*child);
        }
        self.unindex(node.kind, &node.name, id);
        if let Some(observers) = self.observers.remove(&id) {
            for (_, observer) in observers {
                observer.node_removed(id);
            }
        }
        tracing::trace!(node = %node.name, kind = %node.kind, "node dropped");
    }

    fn unlink(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            if let Ok(p) = self.get_mut(parent) {
                p.children.retain(|c| *c != id);
            }
        }
    }

    fn unindex(&mut self, kind: NodeKind, name: &str, id: NodeId) {
        let key = (kind, name.to_string());
        if let Some(ids) = self.index.get_mut(&key) {
            ids.retain(|i| *i != id);
            if ids.is_empty() {
                self.index.remove(&key);
            }
        }
    }

    /// Register an observer for a node.
    pub fn subscribe(&mut self, id: NodeId, observer: Arc<dyn NodeObserver>) -> Result<ObserverId> {
        self.get(id)?;
        let observer_id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers
            .entry(id)
            .or_default()
            .push((observer_id, observer));
        Ok(observer_id)
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: NodeId, observer: ObserverId) -> bool {
        let Some(list) = self.observers.get_mut(&id) else {
            return false;
        };
        let before = list.len();
        list.retain(|(oid, _)| *oid != observer);
        before != list.len()
    }

    pub(crate) fn notify_changed(&self, id: NodeId) {
        if let Some(observers) = self.observers.get(&id) {
            for (_, observer) in observers {
                observer.node_changed(id);
            }
        }
    }

    pub(crate) fn set_description_state(
        &mut self,
        id: NodeId,
        state: DescriptionState,
    ) -> Result<()> {
        self.get_mut(id)?.description = state;
        Ok(())
    }
}

impl Default for MetadataTree {
    fn default() -> Self {
        Self::new()
    }
}

fn is_composite(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Database | NodeKind::Table | NodeKind::View | NodeKind::Procedure
    )
}
