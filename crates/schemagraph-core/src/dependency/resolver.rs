//! Dependency resolution against `RDB$DEPENDENCIES`.
//!
//! The catalog's dependency table records what procedures, triggers and
//! views reference. It does not record foreign keys, so for tables the
//! result is extended with relationships inferred from constraints.

use super::{Dependency, Direction};
use crate::catalog::{CatalogAccess, CatalogTransaction, Row, TransactionMode, Value};
use crate::error::{CatalogError, Error, Result};
use crate::metadata::{trim_name, MetadataNode, MetadataTree, NodeId, NodeKind};

const DEPENDS_ON_SQL: &str = "SELECT RDB$DEPENDED_ON_TYPE AS OBJECT_TYPE, \
     RDB$DEPENDED_ON_NAME AS OBJECT_NAME, RDB$FIELD_NAME AS FIELD_NAME \
     FROM RDB$DEPENDENCIES \
     WHERE RDB$DEPENDENT_TYPE = ? AND RDB$DEPENDENT_NAME = ? \
     ORDER BY 1, 2, 3";

const DEPENDED_ON_BY_SQL: &str = "SELECT RDB$DEPENDENT_TYPE AS OBJECT_TYPE, \
     RDB$DEPENDENT_NAME AS OBJECT_NAME, RDB$FIELD_NAME AS FIELD_NAME \
     FROM RDB$DEPENDENCIES \
     WHERE RDB$DEPENDED_ON_TYPE = ? AND RDB$DEPENDED_ON_NAME = ? \
     ORDER BY 1, 2, 3";

const REFERENCING_TABLES_SQL: &str = "SELECT r1.RDB$RELATION_NAME AS TABLE_NAME, \
     i.RDB$FIELD_NAME AS FIELD_NAME \
     FROM RDB$RELATION_CONSTRAINTS r1 \
     JOIN RDB$REF_CONSTRAINTS c ON r1.RDB$CONSTRAINT_NAME = c.RDB$CONSTRAINT_NAME \
     JOIN RDB$RELATION_CONSTRAINTS r2 ON c.RDB$CONST_NAME_UQ = r2.RDB$CONSTRAINT_NAME \
     JOIN RDB$INDEX_SEGMENTS i ON r1.RDB$INDEX_NAME = i.RDB$INDEX_NAME \
     WHERE r2.RDB$RELATION_NAME = ? AND r1.RDB$CONSTRAINT_TYPE = 'FOREIGN KEY' \
     ORDER BY r1.RDB$RELATION_NAME, r1.RDB$CONSTRAINT_NAME, i.RDB$FIELD_POSITION";

/// One row of the dependency-table query.
struct DependencyRow {
    object_type: i64,
    object_name: String,
    field_name: Option<String>,
}

impl DependencyRow {
    fn decode(row: &Row) -> std::result::Result<Self, CatalogError> {
        Ok(Self {
            object_type: row
                .integer("OBJECT_TYPE")?
                .ok_or_else(|| CatalogError::decode("OBJECT_TYPE", "unexpected null"))?,
            object_name: trim_name(row.required_text("OBJECT_NAME")?).to_string(),
            field_name: row.text("FIELD_NAME")?.map(|f| trim_name(f).to_string()),
        })
    }
}

/// One row of the referencing-tables query.
struct ReferenceRow {
    table_name: String,
    field_name: String,
}

impl ReferenceRow {
    fn decode(row: &Row) -> std::result::Result<Self, CatalogError> {
        Ok(Self {
            table_name: trim_name(row.required_text("TABLE_NAME")?).to_string(),
            field_name: trim_name(row.required_text("FIELD_NAME")?).to_string(),
        })
    }
}

/// Computes the dependencies of tree nodes.
pub struct DependencyResolver<'a, C: CatalogAccess + ?Sized> {
    catalog: &'a C,
}

impl<'a, C: CatalogAccess + ?Sized> DependencyResolver<'a, C> {
    /// Create a resolver over a catalog.
    pub fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    /// Objects the node depends on.
    pub fn depends_on(&self, tree: &MetadataTree, id: NodeId) -> Result<Vec<Dependency>> {
        self.resolve(tree, id, Direction::DependsOn)
    }

    /// Objects depending on the node.
    pub fn depended_on_by(&self, tree: &MetadataTree, id: NodeId) -> Result<Vec<Dependency>> {
        self.resolve(tree, id, Direction::DependedOnBy)
    }

    /// Resolve dependencies in one direction.
    ///
    /// Catalog-recorded dependencies come first, one entry per target.
    /// For tables, foreign-key relationships follow as separate entries,
    /// even when they target an object already listed.
    pub fn resolve(
        &self,
        tree: &MetadataTree,
        id: NodeId,
        direction: Direction,
    ) -> Result<Vec<Dependency>> {
        let node = tree.get(id)?;
        let database = tree.database_of(id).ok_or(Error::DatabaseNotAttached)?;
        let ordinal = node.kind().catalog_type_ordinal()?;

        let mut tx = self.catalog.begin(TransactionMode::ReadOnly)?;
        let mut list =
            self.catalog_dependencies(&mut *tx, tree, database, node, ordinal, direction)?;

        if node.kind() == NodeKind::Table {
            match direction {
                Direction::DependsOn => append_foreign_keys(tree, database, node, &mut list)?,
                Direction::DependedOnBy => {
                    self.append_referencing_tables(&mut *tx, tree, database, node, &mut list)?
                }
            }
        }
        tx.commit()?;

        tracing::debug!(
            node = %node.name(),
            kind = %node.kind(),
            ?direction,
            count = list.len(),
            "dependencies resolved"
        );
        Ok(list)
    }

    fn catalog_dependencies(
        &self,
        tx: &mut dyn CatalogTransaction,
        tree: &MetadataTree,
        database: NodeId,
        node: &MetadataNode,
        ordinal: i16,
        direction: Direction,
    ) -> Result<Vec<Dependency>> {
        let sql = match direction {
            Direction::DependsOn => DEPENDS_ON_SQL,
            Direction::DependedOnBy => DEPENDED_ON_BY_SQL,
        };
        let rows = tx.query(sql, &[Value::from(ordinal), Value::from(node.name())])?;

        let mut list: Vec<Dependency> = Vec::new();
        let mut last: Option<NodeId> = None;
        for row in &rows {
            let row = DependencyRow::decode(row)?;
            let kind = NodeKind::from_catalog_ordinal(row.object_type);
            if kind == NodeKind::Unknown {
                tracing::trace!(
                    object = %row.object_name,
                    object_type = row.object_type,
                    "skipping catalog-internal object"
                );
                continue;
            }

            let found = tree
                .find_in_database(database, kind, &row.object_name)
                // views are sometimes recorded with the table type code
                .or_else(|| match kind {
                    NodeKind::Table => {
                        tree.find_in_database(database, NodeKind::View, &row.object_name)
                    }
                    _ => None,
                });
            let Some(target) = found else {
                tracing::trace!(object = %row.object_name, %kind, "dependency target not in tree");
                continue;
            };

            let position = if last == Some(target) {
                list.len() - 1
            } else {
                last = Some(target);
                match list.iter().position(|d| d.target() == target) {
                    Some(existing) => existing,
                    None => {
                        list.push(Dependency::new(target));
                        list.len() - 1
                    }
                }
            };
            if let Some(field) = row.field_name {
                list[position].add_field(field);
            }
        }
        Ok(list)
    }

    fn append_referencing_tables(
        &self,
        tx: &mut dyn CatalogTransaction,
        tree: &MetadataTree,
        database: NodeId,
        node: &MetadataNode,
        list: &mut Vec<Dependency>,
    ) -> Result<()> {
        let rows = tx.query(REFERENCING_TABLES_SQL, &[Value::from(node.name())])?;

        // (table name, index of its entry; None when the table is not in the tree)
        let mut current: Option<(String, Option<usize>)> = None;
        for row in &rows {
            let row = ReferenceRow::decode(row)?;
            let same_table = matches!(&current, Some((name, _)) if *name == row.table_name);
            if !same_table {
                let slot = tree
                    .find_in_database(database, NodeKind::Table, &row.table_name)
                    .map(|table| {
                        list.push(Dependency::new(table));
                        list.len() - 1
                    });
                current = Some((row.table_name, slot));
            }
            if let Some((_, Some(index))) = &current {
                list[*index].add_field(row.field_name);
            }
        }
        Ok(())
    }
}

/// Add one entry per foreign key, targeting the referenced table.
fn append_foreign_keys(
    tree: &MetadataTree,
    database: NodeId,
    node: &MetadataNode,
    list: &mut Vec<Dependency>,
) -> Result<()> {
    for fk in node.as_foreign_key_source().unwrap_or_default() {
        let table = tree
            .find_in_database(database, NodeKind::Table, &fk.referenced_table)
            .ok_or_else(|| Error::ObjectNotFound {
                kind: NodeKind::Table,
                name: fk.referenced_table.clone(),
            })?;
        list.push(Dependency::with_fields(table, fk.referenced_columns.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ForeignKey;
    use crate::testing::ScriptedCatalog;

    struct Fixture {
        tree: MetadataTree,
        customers: NodeId,
        orders: NodeId,
        v_orders: NodeId,
        sp_total: NodeId,
        trg_orders: NodeId,
    }

    fn fixture() -> Fixture {
        let mut tree = MetadataTree::new();
        let db = tree.add_database("EMPLOYEE");
        let customers = tree.add_node(db, NodeKind::Table, "CUSTOMERS").unwrap();
        let orders = tree.add_node(db, NodeKind::Table, "ORDERS").unwrap();
        let v_orders = tree.add_node(db, NodeKind::View, "V_ORDERS").unwrap();
        let sp_total = tree.add_node(db, NodeKind::Procedure, "SP_TOTAL").unwrap();
        let trg_orders = tree.add_node(db, NodeKind::Trigger, "TRG_ORDERS_BI").unwrap();
        tree.add_foreign_key(
            orders,
            ForeignKey::new("FK_ORDERS_CUSTOMERS", "CUSTOMERS").with_column("CUST_ID", "ID"),
        )
        .unwrap();
        Fixture {
            tree,
            customers,
            orders,
            v_orders,
            sp_total,
            trg_orders,
        }
    }

    fn dep_row(object_type: i64, name: &str, field: Option<&str>) -> Row {
        let row = Row::new()
            .with("OBJECT_TYPE", object_type)
            .with("OBJECT_NAME", name);
        match field {
            Some(f) => row.with("FIELD_NAME", f),
            None => row.with_null("FIELD_NAME"),
        }
    }

    #[test]
    fn test_groups_fields_by_target() {
        let f = fixture();
        let catalog = ScriptedCatalog::new();
        catalog.respond(
            "FROM RDB$DEPENDENCIES",
            vec![
                dep_row(0, "CUSTOMERS                      ", Some("ID     ")),
                dep_row(0, "CUSTOMERS", Some("NAME")),
                dep_row(0, "ORDERS", Some("TOTAL")),
                dep_row(5, "SP_TOTAL", None),
            ],
        );

        let list = DependencyResolver::new(&catalog)
            .depends_on(&f.tree, f.v_orders)
            .unwrap();

        assert_eq!(list.len(), 3);
        assert_eq!(list[0].target(), f.customers);
        assert_eq!(list[0].fields(), &["ID".to_string(), "NAME".to_string()]);
        assert_eq!(list[1].target(), f.orders);
        assert_eq!(list[1].field_list(), "TOTAL");
        assert_eq!(list[2].target(), f.sp_total);
        assert!(list[2].fields().is_empty());

        let issued = &catalog.queries()[0];
        assert!(issued.sql.contains("WHERE RDB$DEPENDENT_TYPE = ?"));
        assert_eq!(issued.params, vec![Value::Integer(1), Value::from("V_ORDERS")]);
        assert_eq!(catalog.begins(), vec![TransactionMode::ReadOnly]);
        assert_eq!(catalog.commits(), 1);
    }

    #[test]
    fn test_skips_internal_and_unknown_objects() {
        let f = fixture();
        let catalog = ScriptedCatalog::new();
        catalog.respond(
            "FROM RDB$DEPENDENCIES",
            vec![
                dep_row(3, "RDB$1", Some("X")),
                dep_row(0, "NOT_IN_TREE", Some("X")),
                dep_row(2, "TRG_ORDERS_BI", None),
                dep_row(16, "FUTURE_TYPE", None),
                dep_row(-1, "BROKEN", None),
            ],
        );

        let list = DependencyResolver::new(&catalog)
            .depended_on_by(&f.tree, f.sp_total)
            .unwrap();

        assert_eq!(list, vec![Dependency::new(f.trg_orders)]);
        assert!(catalog.queries()[0]
            .sql
            .contains("WHERE RDB$DEPENDED_ON_TYPE = ?"));
    }

    #[test]
    fn test_view_recorded_as_table() {
        let f = fixture();
        let catalog = ScriptedCatalog::new();
        catalog.respond(
            "FROM RDB$DEPENDENCIES",
            vec![dep_row(0, "V_ORDERS", Some("ID"))],
        );

        let list = DependencyResolver::new(&catalog)
            .depends_on(&f.tree, f.sp_total)
            .unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].target(), f.v_orders);
    }

    #[test]
    fn test_non_adjacent_rows_share_entry() {
        let f = fixture();
        let catalog = ScriptedCatalog::new();
        catalog.respond(
            "FROM RDB$DEPENDENCIES",
            vec![
                dep_row(0, "V_ORDERS", Some("ID")),
                dep_row(0, "ORDERS", Some("TOTAL")),
                dep_row(1, "V_ORDERS", Some("CUST")),
            ],
        );

        let list = DependencyResolver::new(&catalog)
            .depends_on(&f.tree, f.sp_total)
            .unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].target(), f.v_orders);
        assert_eq!(list[0].fields(), &["ID".to_string(), "CUST".to_string()]);
    }

    #[test]
    fn test_table_appends_foreign_keys_unmerged() {
        let f = fixture();
        let catalog = ScriptedCatalog::new();
        catalog.respond(
            "FROM RDB$DEPENDENCIES",
            vec![dep_row(0, "CUSTOMERS", Some("ID"))],
        );

        let list = DependencyResolver::new(&catalog)
            .depends_on(&f.tree, f.orders)
            .unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].target(), f.customers);
        assert_eq!(list[1].target(), f.customers);
        assert_eq!(list[1].fields(), &["ID".to_string()]);
    }

    #[test]
    fn test_foreign_keys_to_other_tables() {
        let mut f = fixture();
        let db = f.tree.database_of(f.orders).unwrap();
        let regions = f.tree.add_node(db, NodeKind::Table, "REGIONS").unwrap();
        f.tree
            .add_foreign_key(
                f.orders,
                ForeignKey::new("FK_ORDERS_REGIONS", "REGIONS")
                    .with_column("REGION", "CODE")
                    .with_column("COUNTRY", "COUNTRY"),
            )
            .unwrap();
        let catalog = ScriptedCatalog::new();
        catalog.respond(
            "FROM RDB$DEPENDENCIES",
            vec![dep_row(5, "SP_TOTAL", None)],
        );

        let list = DependencyResolver::new(&catalog)
            .depends_on(&f.tree, f.orders)
            .unwrap();

        let targets: Vec<NodeId> = list.iter().map(|d| d.target()).collect();
        assert_eq!(targets, vec![f.sp_total, f.customers, regions]);
        assert!(list[0].fields().is_empty());
        assert_eq!(list[1].field_list(), "ID");
        assert_eq!(list[2].field_list(), "CODE, COUNTRY");
        assert_eq!(catalog.commits(), 1);
    }

    #[test]
    fn test_missing_referenced_table_aborts() {
        let mut f = fixture();
        f.tree
            .add_foreign_key(
                f.orders,
                ForeignKey::new("FK_ORDERS_REGIONS", "REGIONS").with_column("REGION", "CODE"),
            )
            .unwrap();
        let catalog = ScriptedCatalog::new();

        let err = DependencyResolver::new(&catalog)
            .depends_on(&f.tree, f.orders)
            .unwrap_err();

        assert!(matches!(
            err,
            Error::ObjectNotFound { kind: NodeKind::Table, ref name } if name == "REGIONS"
        ));
        assert_eq!(err.to_string(), "Table REGIONS not found");
        assert_eq!(catalog.commits(), 0);
        assert_eq!(catalog.aborts(), 1);
    }

    #[test]
    fn test_table_referenced_by_foreign_keys() {
        let f = fixture();
        let catalog = ScriptedCatalog::new();
        catalog.respond(
            "FROM RDB$DEPENDENCIES",
            vec![dep_row(1, "V_ORDERS", Some("ID"))],
        );
        catalog.respond(
            "FROM RDB$RELATION_CONSTRAINTS",
            vec![
                Row::new()
                    .with("TABLE_NAME", "ORDERS   ")
                    .with("FIELD_NAME", "CUST_ID   "),
                Row::new()
                    .with("TABLE_NAME", "ORDERS")
                    .with("FIELD_NAME", "CUST_REGION"),
                Row::new()
                    .with("TABLE_NAME", "ARCHIVE")
                    .with("FIELD_NAME", "CUST_ID"),
            ],
        );

        let list = DependencyResolver::new(&catalog)
            .depended_on_by(&f.tree, f.customers)
            .unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].target(), f.v_orders);
        assert_eq!(list[1].target(), f.orders);
        assert_eq!(list[1].field_list(), "CUST_ID, CUST_REGION");

        let queries = catalog.queries();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1].params, vec![Value::from("CUSTOMERS")]);
        assert_eq!(catalog.begins().len(), 1);
    }

    #[test]
    fn test_referencing_query_failure_aborts() {
        let f = fixture();
        let catalog = ScriptedCatalog::new();
        catalog
            .respond(
                "FROM RDB$DEPENDENCIES",
                vec![dep_row(1, "V_ORDERS", Some("ID"))],
            )
            .fail(
                "FROM RDB$RELATION_CONSTRAINTS",
                CatalogError::Execute("deadlock".to_string()),
            );

        let result = DependencyResolver::new(&catalog).depended_on_by(&f.tree, f.customers);

        assert!(matches!(result, Err(Error::Catalog(CatalogError::Execute(_)))));
        assert_eq!(catalog.queries().len(), 2);
        assert_eq!(catalog.commits(), 0);
        assert_eq!(catalog.aborts(), 1);
    }

    #[test]
    fn test_unsupported_kind_fails_before_query() {
        let mut f = fixture();
        let column = f.tree.add_node(f.orders, NodeKind::Column, "ID").unwrap();
        let catalog = ScriptedCatalog::new();

        let err = DependencyResolver::new(&catalog)
            .depends_on(&f.tree, column)
            .unwrap_err();

        assert!(matches!(err, Error::UnsupportedType { kind: NodeKind::Column, .. }));
        assert!(catalog.begins().is_empty());
        assert!(catalog.queries().is_empty());
    }

    #[test]
    fn test_unattached_node() {
        let mut tree = MetadataTree::new();
        let db = tree.add_database("EMPLOYEE");
        let catalog = ScriptedCatalog::new();

        assert!(matches!(
            DependencyResolver::new(&catalog).depends_on(&tree, db),
            Err(Error::DatabaseNotAttached)
        ));
    }

    #[test]
    fn test_query_failure_propagates() {
        let f = fixture();
        let catalog = ScriptedCatalog::new();
        catalog.fail(
            "FROM RDB$DEPENDENCIES",
            CatalogError::Prepare {
                sql: DEPENDS_ON_SQL.to_string(),
                reason: "table unknown".to_string(),
            },
        );

        let err = DependencyResolver::new(&catalog)
            .depends_on(&f.tree, f.trg_orders)
            .unwrap_err();

        assert!(matches!(err, Error::Catalog(CatalogError::Prepare { .. })));
        assert_eq!(catalog.aborts(), 1);
    }

    #[test]
    fn test_begin_failure() {
        let f = fixture();
        let catalog = ScriptedCatalog::new();
        catalog.fail_begin(CatalogError::Connection("server shut down".to_string()));

        let err = DependencyResolver::new(&catalog)
            .depended_on_by(&f.tree, f.orders)
            .unwrap_err();
        assert!(matches!(err, Error::Catalog(CatalogError::Connection(_))));
        assert!(catalog.queries().is_empty());
    }

    #[test]
    fn test_decode_failure() {
        let f = fixture();
        let catalog = ScriptedCatalog::new();
        catalog.respond(
            "FROM RDB$DEPENDENCIES",
            vec![Row::new().with("OBJECT_TYPE", "TABLE")],
        );

        let err = DependencyResolver::new(&catalog)
            .depends_on(&f.tree, f.trg_orders)
            .unwrap_err();
        assert!(matches!(err, Error::Catalog(CatalogError::Decode { .. })));
    }
}
