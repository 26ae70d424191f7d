//! Lazily loaded object descriptions.
//!
//! A node's description is fetched from the catalog the first time it is
//! asked for and cached on the node afterwards. Writes always go to the
//! catalog and refresh the cache only once committed.

use std::fmt;

use crate::catalog::{text_chunks, CatalogAccess, CatalogTransaction, TransactionMode, Value};
use crate::config::{EngineConfig, DEFAULT_NOT_AVAILABLE_TEXT};
use crate::error::{CatalogError, Error, Result};
use crate::metadata::{DescriptionState, MetadataTree, NodeId};

/// Column holding the description in every description query.
const DESCRIPTION_COLUMN: &str = "RDB$DESCRIPTION";

/// Outcome of a description lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Description {
    /// The stored text; empty when the object has no description.
    Text(String),
    /// The node kind has no description, or the node has no database.
    NotAvailable,
}

impl Description {
    /// The text, if available.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Description::Text(text) => Some(text.as_str()),
            Description::NotAvailable => None,
        }
    }

    /// The text, or `fallback` when not available.
    pub fn text_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.as_text().unwrap_or(fallback)
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text_or(DEFAULT_NOT_AVAILABLE_TEXT))
    }
}

/// Reads and writes node descriptions through the catalog.
pub struct DescriptionStore<'a, C: CatalogAccess + ?Sized> {
    catalog: &'a C,
    config: &'a EngineConfig,
}

impl<'a, C: CatalogAccess + ?Sized> DescriptionStore<'a, C> {
    /// Create a store over a catalog.
    pub fn new(catalog: &'a C, config: &'a EngineConfig) -> Self {
        Self { catalog, config }
    }

    /// Description of a node, loading it on first use.
    ///
    /// A failed load leaves the node unloaded so a later call retries.
    pub fn get_description(&self, tree: &mut MetadataTree, id: NodeId) -> Result<Description> {
        let node = tree.get(id)?;
        if let Some(text) = node.cached_description() {
            tracing::trace!(node = %node.name(), "description cache hit");
            return Ok(Description::Text(text.to_string()));
        }

        let kind = node.kind();
        let Some(sql) = kind.description_query() else {
            return Ok(Description::NotAvailable);
        };
        if tree.database_of(id).is_none() {
            return Ok(Description::NotAvailable);
        }

        let keys = key_params(tree, id)?;
        let text = match self.fetch(sql, &keys) {
            Ok(Some(text)) => text,
            Ok(None) => {
                return Err(Error::ObjectNotFound {
                    kind,
                    name: tree.get(id)?.name().to_string(),
                })
            }
            Err(e) => {
                tracing::warn!(node = %tree.get(id)?.name(), error = %e, "description load failed");
                return Err(e.into());
            }
        };

        tracing::debug!(node = %tree.get(id)?.name(), bytes = text.len(), "description loaded");
        tree.set_description_state(id, DescriptionState::Loaded(text.clone()))?;
        Ok(Description::Text(text))
    }

    /// Replace the description of a node.
    ///
    /// An empty `text` stores SQL null, which reads back as an empty
    /// description.
    pub fn set_description(&self, tree: &mut MetadataTree, id: NodeId, text: &str) -> Result<()> {
        let kind = tree.get(id)?.kind();
        if tree.database_of(id).is_none() {
            return Err(Error::DatabaseNotAttached);
        }
        let sql = kind.description_update().ok_or(Error::UnsupportedType {
            kind,
            operation: "description",
        })?;
        let keys = key_params(tree, id)?;

        let mut tx = self.catalog.begin(TransactionMode::ReadWrite)?;
        match self.write(&mut *tx, sql, text, keys) {
            Ok(()) => tx.commit()?,
            Err(e) => {
                if let Err(rollback) = tx.rollback() {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                return Err(e.into());
            }
        }

        tree.set_description_state(id, DescriptionState::Loaded(text.to_string()))?;
        tree.notify_changed(id);
        tracing::debug!(node = %tree.get(id)?.name(), bytes = text.len(), "description saved");
        Ok(())
    }

    /// Drop the cached description so the next lookup reads the catalog.
    pub fn invalidate(&self, tree: &mut MetadataTree, id: NodeId) -> Result<()> {
        tree.set_description_state(id, DescriptionState::Unloaded)
    }

    /// Read the description column; `None` when the object row is missing.
    fn fetch(&self, sql: &str, keys: &[Value]) -> std::result::Result<Option<String>, CatalogError> {
        let mut tx = self.catalog.begin(TransactionMode::ReadOnly)?;
        let rows = tx.query(sql, keys)?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };

        let mut text = String::new();
        if let Some(blob) = row.blob(DESCRIPTION_COLUMN)? {
            for chunk in tx.read_text(blob)? {
                text.push_str(&chunk?);
            }
        }
        tx.commit()?;
        Ok(Some(text))
    }

    fn write(
        &self,
        tx: &mut dyn CatalogTransaction,
        sql: &str,
        text: &str,
        keys: Vec<Value>,
    ) -> std::result::Result<(), CatalogError> {
        let value = if text.is_empty() {
            Value::Null
        } else {
            let mut chunks = text_chunks(text, self.config.blob_chunk_size);
            Value::Blob(tx.write_text(&mut chunks)?)
        };
        let mut params = Vec::with_capacity(keys.len() + 1);
        params.push(value);
        params.extend(keys);
        tx.execute(sql, &params)?;
        Ok(())
    }
}

/// Catalog key of a node: its name, then its container's name for
/// columns and parameters.
fn key_params(tree: &MetadataTree, id: NodeId) -> Result<Vec<Value>> {
    let node = tree.get(id)?;
    let mut keys = vec![Value::from(node.name())];
    if node.kind().is_sub_object() {
        let parent = node.parent().ok_or(Error::DatabaseNotAttached)?;
        keys.push(Value::from(tree.get(parent)?.name()));
    }
    Ok(keys)
}
