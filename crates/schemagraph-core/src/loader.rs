//! Reads a database's schema objects from the system tables.

use std::collections::HashMap;

use crate::catalog::{CatalogAccess, CatalogTransaction, Row, TransactionMode};
use crate::config::EngineConfig;
use crate::error::{CatalogError, Result};
use crate::metadata::{
    trim_name, ForeignKey, NodeKind, ProcedureSnapshot, RelationSnapshot, SchemaSnapshot,
    TableSnapshot,
};

const RELATIONS_SQL: &str = "SELECT RDB$RELATION_NAME AS NAME, \
     CASE WHEN RDB$VIEW_BLR IS NULL THEN 0 ELSE 1 END AS IS_VIEW \
     FROM RDB$RELATIONS ORDER BY RDB$RELATION_NAME";

const RELATION_FIELDS_SQL: &str = "SELECT RDB$RELATION_NAME AS OWNER_NAME, \
     RDB$FIELD_NAME AS NAME \
     FROM RDB$RELATION_FIELDS ORDER BY RDB$RELATION_NAME, RDB$FIELD_POSITION";

const PROCEDURES_SQL: &str =
    "SELECT RDB$PROCEDURE_NAME AS NAME FROM RDB$PROCEDURES ORDER BY RDB$PROCEDURE_NAME";

const PROCEDURE_PARAMETERS_SQL: &str = "SELECT RDB$PROCEDURE_NAME AS OWNER_NAME, \
     RDB$PARAMETER_NAME AS NAME \
     FROM RDB$PROCEDURE_PARAMETERS \
     ORDER BY RDB$PROCEDURE_NAME, RDB$PARAMETER_TYPE, RDB$PARAMETER_NUMBER";

const FOREIGN_KEYS_SQL: &str = "SELECT r1.RDB$RELATION_NAME AS TABLE_NAME, \
     r1.RDB$CONSTRAINT_NAME AS CONSTRAINT_NAME, i1.RDB$FIELD_NAME AS FIELD_NAME, \
     r2.RDB$RELATION_NAME AS REFERENCED_TABLE, i2.RDB$FIELD_NAME AS REFERENCED_FIELD \
     FROM RDB$RELATION_CONSTRAINTS r1 \
     JOIN RDB$REF_CONSTRAINTS c ON r1.RDB$CONSTRAINT_NAME = c.RDB$CONSTRAINT_NAME \
     JOIN RDB$RELATION_CONSTRAINTS r2 ON c.RDB$CONST_NAME_UQ = r2.RDB$CONSTRAINT_NAME \
     JOIN RDB$INDEX_SEGMENTS i1 ON r1.RDB$INDEX_NAME = i1.RDB$INDEX_NAME \
     JOIN RDB$INDEX_SEGMENTS i2 ON r2.RDB$INDEX_NAME = i2.RDB$INDEX_NAME \
     AND i1.RDB$FIELD_POSITION = i2.RDB$FIELD_POSITION \
     WHERE r1.RDB$CONSTRAINT_TYPE = 'FOREIGN KEY' \
     ORDER BY r1.RDB$RELATION_NAME, r1.RDB$CONSTRAINT_NAME, i1.RDB$FIELD_POSITION";

/// Single-name queries for kinds without sub-objects.
const LEAF_QUERIES: [(NodeKind, &str); 6] = [
    (
        NodeKind::Trigger,
        "SELECT RDB$TRIGGER_NAME AS NAME FROM RDB$TRIGGERS ORDER BY RDB$TRIGGER_NAME",
    ),
    (
        NodeKind::Generator,
        "SELECT RDB$GENERATOR_NAME AS NAME FROM RDB$GENERATORS ORDER BY RDB$GENERATOR_NAME",
    ),
    (
        NodeKind::Function,
        "SELECT RDB$FUNCTION_NAME AS NAME FROM RDB$FUNCTIONS ORDER BY RDB$FUNCTION_NAME",
    ),
    (
        NodeKind::Domain,
        "SELECT RDB$FIELD_NAME AS NAME FROM RDB$FIELDS ORDER BY RDB$FIELD_NAME",
    ),
    (
        NodeKind::Role,
        "SELECT RDB$ROLE_NAME AS NAME FROM RDB$ROLES ORDER BY RDB$ROLE_NAME",
    ),
    (
        NodeKind::Exception,
        "SELECT RDB$EXCEPTION_NAME AS NAME FROM RDB$EXCEPTIONS ORDER BY RDB$EXCEPTION_NAME",
    ),
];

/// A trimmed, non-null name column.
fn name_column(row: &Row, column: &str) -> std::result::Result<String, CatalogError> {
    Ok(trim_name(row.required_text(column)?).to_string())
}

/// A foreign-key segment row.
struct ForeignKeyRow {
    table_name: String,
    constraint_name: String,
    field_name: String,
    referenced_table: String,
    referenced_field: String,
}

impl ForeignKeyRow {
    fn decode(row: &Row) -> std::result::Result<Self, CatalogError> {
        Ok(Self {
            table_name: name_column(row, "TABLE_NAME")?,
            constraint_name: name_column(row, "CONSTRAINT_NAME")?,
            field_name: name_column(row, "FIELD_NAME")?,
            referenced_table: name_column(row, "REFERENCED_TABLE")?,
            referenced_field: name_column(row, "REFERENCED_FIELD")?,
        })
    }
}

/// Where a relation landed in the snapshot.
#[derive(Clone, Copy)]
enum RelationSlot {
    Table(usize),
    View(usize),
}

/// Builds [`SchemaSnapshot`]s from the catalog's system tables.
pub struct CatalogLoader<'a, C: CatalogAccess + ?Sized> {
    catalog: &'a C,
    config: &'a EngineConfig,
}

impl<'a, C: CatalogAccess + ?Sized> CatalogLoader<'a, C> {
    /// Create a loader.
    pub fn new(catalog: &'a C, config: &'a EngineConfig) -> Self {
        Self { catalog, config }
    }

    /// Read every schema object into a snapshot named `database`.
    ///
    /// All queries run in one read-only transaction, so the snapshot is
    /// consistent.
    pub fn load(&self, database: &str) -> Result<SchemaSnapshot> {
        let mut tx = self.catalog.begin(TransactionMode::ReadOnly)?;
        let snapshot = self.read(&mut *tx, database)?;
        tx.commit()?;

        tracing::info!(
            database = %snapshot.database,
            tables = snapshot.tables.len(),
            views = snapshot.views.len(),
            objects = snapshot.object_count(),
            "schema loaded from catalog"
        );
        Ok(snapshot)
    }

    fn read(
        &self,
        tx: &mut dyn CatalogTransaction,
        database: &str,
    ) -> std::result::Result<SchemaSnapshot, CatalogError> {
        let mut snapshot = SchemaSnapshot::new(trim_name(database));

        let relations = self.read_relations(tx, &mut snapshot)?;
        for row in &tx.query(RELATION_FIELDS_SQL, &[])? {
            let owner = name_column(row, "OWNER_NAME")?;
            let column = name_column(row, "NAME")?;
            match relations.get(&owner) {
                Some(RelationSlot::Table(i)) => snapshot.tables[*i].columns.push(column),
                Some(RelationSlot::View(i)) => snapshot.views[*i].columns.push(column),
                None => {}
            }
        }
        self.read_foreign_keys(tx, &relations, &mut snapshot)?;

        let mut procedures = HashMap::new();
        for row in &tx.query(PROCEDURES_SQL, &[])? {
            let name = name_column(row, "NAME")?;
            if self.keep(&name) {
                procedures.insert(name.clone(), snapshot.procedures.len());
                snapshot.procedures.push(ProcedureSnapshot::new(name));
            }
        }
        for row in &tx.query(PROCEDURE_PARAMETERS_SQL, &[])? {
            let owner = name_column(row, "OWNER_NAME")?;
            if let Some(i) = procedures.get(&owner) {
                snapshot.procedures[*i]
                    .parameters
                    .push(name_column(row, "NAME")?);
            }
        }

        for (kind, sql) in LEAF_QUERIES {
            let mut names = Vec::new();
            for row in &tx.query(sql, &[])? {
                let name = name_column(row, "NAME")?;
                if self.keep(&name) {
                    names.push(name);
                }
            }
            if let Some(list) = snapshot.objects_mut(kind) {
                list.extend(names);
            }
        }

        Ok(snapshot)
    }

    fn read_relations(
        &self,
        tx: &mut dyn CatalogTransaction,
        snapshot: &mut SchemaSnapshot,
    ) -> std::result::Result<HashMap<String, RelationSlot>, CatalogError> {
        let mut relations = HashMap::new();
        for row in &tx.query(RELATIONS_SQL, &[])? {
            let name = name_column(row, "NAME")?;
            if !self.keep(&name) {
                tracing::trace!(relation = %name, "skipping system relation");
                continue;
            }
            let is_view = row.integer("IS_VIEW")?.unwrap_or(0) != 0;
            let slot = if is_view {
                snapshot.views.push(RelationSnapshot::new(name.clone()));
                RelationSlot::View(snapshot.views.len() - 1)
            } else {
                snapshot.tables.push(TableSnapshot::new(name.clone()));
                RelationSlot::Table(snapshot.tables.len() - 1)
            };
            relations.insert(name, slot);
        }
        Ok(relations)
    }

    /// Attach foreign keys; rows arrive grouped by table and constraint.
    fn read_foreign_keys(
        &self,
        tx: &mut dyn CatalogTransaction,
        relations: &HashMap<String, RelationSlot>,
        snapshot: &mut SchemaSnapshot,
    ) -> std::result::Result<(), CatalogError> {
        let mut current: Option<(usize, ForeignKey)> = None;
        for row in &tx.query(FOREIGN_KEYS_SQL, &[])? {
            let row = ForeignKeyRow::decode(row)?;
            let Some(RelationSlot::Table(table)) = relations.get(&row.table_name).copied() else {
                continue;
            };

            let continues = matches!(
                &current,
                Some((t, fk)) if *t == table && fk.name == row.constraint_name
            );
            if !continues {
                if let Some((t, fk)) = current.take() {
                    snapshot.tables[t].foreign_keys.push(fk);
                }
                current = Some((
                    table,
                    ForeignKey::new(row.constraint_name, row.referenced_table),
                ));
            }
            if let Some((_, fk)) = current.as_mut() {
                fk.columns.push(row.field_name);
                fk.referenced_columns.push(row.referenced_field);
            }
        }
        if let Some((t, fk)) = current {
            snapshot.tables[t].foreign_keys.push(fk);
        }
        Ok(())
    }

    fn keep(&self, name: &str) -> bool {
        self.config.include_system_objects || !name.starts_with(&self.config.system_prefix)
    }
}
