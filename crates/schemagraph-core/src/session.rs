//! Session facade tying a catalog, a configuration and a tree together.

use crate::catalog::CatalogAccess;
use crate::config::EngineConfig;
use crate::dependency::{Dependency, DependencyResolver, Direction};
use crate::description::{Description, DescriptionStore};
use crate::error::Result;
use crate::loader::CatalogLoader;
use crate::metadata::{MetadataTree, NodeId, NodeKind, SchemaSnapshot};

/// Metadata for one catalog connection.
///
/// Owns the tree; every catalog call opens and finishes its own
/// transaction.
pub struct MetadataSession<C: CatalogAccess> {
    catalog: C,
    config: EngineConfig,
    tree: MetadataTree,
}

impl<C: CatalogAccess> MetadataSession<C> {
    /// Create a session with default settings.
    pub fn new(catalog: C) -> Self {
        Self::with_config(catalog, EngineConfig::default())
    }

    /// Create a session with a custom configuration.
    pub fn with_config(catalog: C, config: EngineConfig) -> Self {
        let tree = MetadataTree::with_system_prefix(config.system_prefix.clone());
        Self {
            catalog,
            config,
            tree,
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tree(&self) -> &MetadataTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut MetadataTree {
        &mut self.tree
    }

    /// Consume the session, keeping the tree.
    pub fn into_tree(self) -> MetadataTree {
        self.tree
    }

    /// Read a database's schema from the catalog and (re)build its subtree.
    pub fn load_database(&mut self, name: &str) -> Result<NodeId> {
        let snapshot = CatalogLoader::new(&self.catalog, &self.config).load(name)?;
        self.load_snapshot(&snapshot)
    }

    /// Build a database subtree from a snapshot.
    ///
    /// An existing database of the same name is dropped first.
    pub fn load_snapshot(&mut self, snapshot: &SchemaSnapshot) -> Result<NodeId> {
        let stale: Vec<NodeId> = self
            .tree
            .roots()
            .iter()
            .copied()
            .filter(|id| {
                self.tree
                    .node(*id)
                    .is_some_and(|n| n.name() == snapshot.database.trim_end_matches(' '))
            })
            .collect();
        for id in stale {
            tracing::debug!(database = %snapshot.database, "replacing database subtree");
            self.tree.drop_node(id)?;
        }
        self.tree.add_snapshot(snapshot)
    }

    /// Database root with the given name.
    pub fn database(&self, name: &str) -> Option<NodeId> {
        self.tree.find_by_name_and_type(NodeKind::Database, name)
    }

    /// Object of a kind in a database.
    pub fn find(&self, database: NodeId, kind: NodeKind, name: &str) -> Option<NodeId> {
        self.tree.find_in_database(database, kind, name)
    }

    /// Description of a node, loaded on first use.
    pub fn description(&mut self, id: NodeId) -> Result<Description> {
        DescriptionStore::new(&self.catalog, &self.config).get_description(&mut self.tree, id)
    }

    /// Description text, or the configured "not available" text.
    pub fn description_text(&mut self, id: NodeId) -> Result<String> {
        let description = self.description(id)?;
        Ok(description
            .text_or(&self.config.not_available_text)
            .to_string())
    }

    pub fn set_description(&mut self, id: NodeId, text: &str) -> Result<()> {
        DescriptionStore::new(&self.catalog, &self.config).set_description(&mut self.tree, id, text)
    }

    /// Forget a cached description.
    pub fn invalidate_description(&mut self, id: NodeId) -> Result<()> {
        DescriptionStore::new(&self.catalog, &self.config).invalidate(&mut self.tree, id)
    }

    pub fn dependencies(&self, id: NodeId, direction: Direction) -> Result<Vec<Dependency>> {
        DependencyResolver::new(&self.catalog).resolve(&self.tree, id, direction)
    }

    /// Remove a node and its subtree from the tree.
    pub fn drop_node(&mut self, id: NodeId) -> Result<()> {
        self.tree.drop_node(id)
    }
}
