//! Serializable schema snapshots used to populate the tree.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{ForeignKey, MetadataTree, NodeId, NodeKind};
use crate::error::Result;

/// A table with its columns and foreign keys.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableSnapshot {
    /// Table name.
    pub name: String,
    /// Column names in position order.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Foreign keys declared on the table.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSnapshot {
    /// Create a table snapshot.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a column.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    /// Add a foreign key.
    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }
}

/// A view with its columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RelationSnapshot {
    /// View name.
    pub name: String,
    /// Column names in position order.
    #[serde(default)]
    pub columns: Vec<String>,
}

impl RelationSnapshot {
    /// Create a view snapshot.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add a column.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }
}

/// A procedure with its parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcedureSnapshot {
    /// Procedure name.
    pub name: String,
    /// Input parameters followed by output parameters.
    #[serde(default)]
    pub parameters: Vec<String>,
}

impl ProcedureSnapshot {
    /// Create a procedure snapshot.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    /// Add a parameter.
    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameters.push(parameter.into());
        self
    }
}

/// Every schema object of one database.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    /// Database name.
    pub database: String,
    #[serde(default)]
    pub tables: Vec<TableSnapshot>,
    #[serde(default)]
    pub views: Vec<RelationSnapshot>,
    #[serde(default)]
    pub procedures: Vec<ProcedureSnapshot>,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub generators: Vec<String>,
    #[serde(default)]
    pub functions: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub exceptions: Vec<String>,
}

impl SchemaSnapshot {
    /// Create an empty snapshot.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Default::default()
        }
    }

    /// Add a table.
    pub fn with_table(mut self, table: TableSnapshot) -> Self {
        self.tables.push(table);
        self
    }

    /// Add a view.
    pub fn with_view(mut self, view: RelationSnapshot) -> Self {
        self.views.push(view);
        self
    }

    /// Add a procedure.
    pub fn with_procedure(mut self, procedure: ProcedureSnapshot) -> Self {
        self.procedures.push(procedure);
        self
    }

    /// Add a leaf object of the given kind.
    ///
    /// Kinds without a leaf list (tables, views, procedures, columns...)
    /// are ignored.
    pub fn with_object(mut self, kind: NodeKind, name: impl Into<String>) -> Self {
        if let Some(list) = self.objects_mut(kind) {
            list.push(name.into());
        }
        self
    }

    pub(crate) fn objects_mut(&mut self, kind: NodeKind) -> Option<&mut Vec<String>> {
        match kind {
            NodeKind::Trigger => Some(&mut self.triggers),
            NodeKind::Generator => Some(&mut self.generators),
            NodeKind::Function => Some(&mut self.functions),
            NodeKind::Domain => Some(&mut self.domains),
            NodeKind::Role => Some(&mut self.roles),
            NodeKind::Exception => Some(&mut self.exceptions),
            _ => None,
        }
    }

    fn leaf_objects(&self) -> [(NodeKind, &Vec<String>); 6] {
        [
            (NodeKind::Trigger, &self.triggers),
            (NodeKind::Generator, &self.generators),
            (NodeKind::Function, &self.functions),
            (NodeKind::Domain, &self.domains),
            (NodeKind::Role, &self.roles),
            (NodeKind::Exception, &self.exceptions),
        ]
    }

    /// Total number of objects, sub-objects included.
    pub fn object_count(&self) -> usize {
        let tables: usize = self.tables.iter().map(|t| 1 + t.columns.len()).sum();
        let views: usize = self.views.iter().map(|v| 1 + v.columns.len()).sum();
        let procedures: usize = self
            .procedures
            .iter()
            .map(|p| 1 + p.parameters.len())
            .sum();
        let leaves: usize = self.leaf_objects().iter().map(|(_, l)| l.len()).sum();
        tables + views + procedures + leaves
    }

    /// Parse a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the snapshot to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a snapshot from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl MetadataTree {
    /// Build a database subtree from a snapshot.
    ///
    /// Returns the id of the new database node.
    pub fn add_snapshot(&mut self, snapshot: &SchemaSnapshot) -> Result<NodeId> {
        let db = self.add_database(&snapshot.database);

        for table in &snapshot.tables {
            let id = self.add_node(db, NodeKind::Table, &table.name)?;
            for column in &table.columns {
                self.add_node(id, NodeKind::Column, column)?;
            }
            for fk in &table.foreign_keys {
                self.add_foreign_key(id, fk.clone())?;
            }
        }
        for view in &snapshot.views {
            let id = self.add_node(db, NodeKind::View, &view.name)?;
            for column in &view.columns {
                self.add_node(id, NodeKind::Column, column)?;
            }
        }
        for procedure in &snapshot.procedures {
            let id = self.add_node(db, NodeKind::Procedure, &procedure.name)?;
            for parameter in &procedure.parameters {
                self.add_node(id, NodeKind::Parameter, parameter)?;
            }
        }
        for (kind, names) in snapshot.leaf_objects() {
            for name in names {
                self.add_node(db, kind, name)?;
            }
        }

        tracing::debug!(
            database = %snapshot.database,
            objects = snapshot.object_count(),
            "snapshot imported"
        );
        Ok(db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> SchemaSnapshot {
        SchemaSnapshot::new("EMPLOYEE")
            .with_table(
                TableSnapshot::new("CUSTOMERS")
                    .with_column("ID")
                    .with_column("NAME"),
            )
            .with_table(
                TableSnapshot::new("ORDERS")
                    .with_column("ID")
                    .with_column("CUST_ID")
                    .with_foreign_key(
                        ForeignKey::new("FK_ORDERS_CUSTOMERS", "CUSTOMERS")
                            .with_column("CUST_ID", "ID"),
                    ),
            )
            .with_view(RelationSnapshot::new("V_ORDERS").with_column("ID"))
            .with_procedure(ProcedureSnapshot::new("SP_TOTAL").with_parameter("CUST_ID"))
            .with_object(NodeKind::Generator, "GEN_ORDERS")
            .with_object(NodeKind::Exception, "E_NO_STOCK")
            .with_object(NodeKind::Column, "IGNORED")
    }

    #[test]
    fn test_add_snapshot() {
        let snapshot = sample_snapshot();
        let mut tree = MetadataTree::new();
        let db = tree.add_snapshot(&snapshot).unwrap();

        assert_eq!(snapshot.object_count(), 12);
        assert_eq!(tree.len(), 13);
        assert_eq!(tree.children(db).unwrap().len(), 6);

        let orders = tree.find_in_database(db, NodeKind::Table, "ORDERS").unwrap();
        let keys = tree.get(orders).unwrap().as_foreign_key_source().unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].referenced_table, "CUSTOMERS");

        let param = tree.find_in_database(db, NodeKind::Parameter, "CUST_ID").unwrap();
        assert_eq!(
            tree.item_path(param).unwrap(),
            "PROCEDURE(SP_TOTAL)::PARAMETER(CUST_ID)"
        );
    }

    #[test]
    fn test_json_round_trip() {
        let snapshot = sample_snapshot();
        let json = snapshot.to_json().unwrap();
        assert_eq!(SchemaSnapshot::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn test_json_defaults() {
        let snapshot =
            SchemaSnapshot::from_json(r#"{"database":"X","roles":["RDB$ADMIN"]}"#).unwrap();
        assert_eq!(snapshot.roles, vec!["RDB$ADMIN".to_string()]);
        assert!(snapshot.tables.is_empty());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, sample_snapshot().to_json().unwrap()).unwrap();

        let snapshot = SchemaSnapshot::from_path(&path).unwrap();
        assert_eq!(snapshot.database, "EMPLOYEE");
        assert!(SchemaSnapshot::from_path(dir.path().join("missing.json")).is_err());
    }
}
