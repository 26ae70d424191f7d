//! Node kinds and their catalog mappings.
//!
//! The catalog identifies object kinds two ways: by keyword (as used in
//! DDL and in the front-end) and by the small integer stored in the
//! `RDB$DEPENDENCIES` type columns. Both mappings live here, together with
//! the per-kind statements that read and write object descriptions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Kind of a metadata node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodeKind {
    /// Unclassified node or unrecognized catalog type.
    #[default]
    Unknown,
    /// A database (top of a catalog subtree).
    Database,
    /// Base table.
    Table,
    /// View.
    View,
    /// Stored procedure.
    Procedure,
    /// Trigger.
    Trigger,
    /// Generator (sequence).
    Generator,
    /// External function.
    Function,
    /// Domain.
    Domain,
    /// Role.
    Role,
    /// Column of a table or view.
    Column,
    /// Input or output parameter of a procedure.
    Parameter,
    /// User-defined exception.
    Exception,
}

/// Kinds indexed by their `RDB$DEPENDENCIES` type code.
///
/// Slots holding `Unknown` are catalog-internal object types (computed
/// fields, validation expressions, indices, users...) that never appear
/// as tree nodes.
const DEPENDENCY_TYPES: [NodeKind; 16] = [
    NodeKind::Table,     // 0
    NodeKind::View,      // 1
    NodeKind::Trigger,   // 2
    NodeKind::Unknown,   // 3 computed field
    NodeKind::Unknown,   // 4 validation
    NodeKind::Procedure, // 5
    NodeKind::Unknown,   // 6 expression index
    NodeKind::Exception, // 7
    NodeKind::Unknown,   // 8 user
    NodeKind::Unknown,   // 9 field
    NodeKind::Unknown,   // 10 index
    NodeKind::Unknown,
    NodeKind::Unknown,
    NodeKind::Unknown,
    NodeKind::Generator, // 14
    NodeKind::Function,  // 15
];

/// Every kind, in declaration order.
pub const ALL_KINDS: [NodeKind; 13] = [
    NodeKind::Unknown,
    NodeKind::Database,
    NodeKind::Table,
    NodeKind::View,
    NodeKind::Procedure,
    NodeKind::Trigger,
    NodeKind::Generator,
    NodeKind::Function,
    NodeKind::Domain,
    NodeKind::Role,
    NodeKind::Column,
    NodeKind::Parameter,
    NodeKind::Exception,
];

impl NodeKind {
    /// Map a catalog keyword to its kind.
    ///
    /// Matching is exact and case-sensitive; anything else is `Unknown`.
    pub fn classify(type_name: &str) -> NodeKind {
        match type_name {
            "TABLE" => NodeKind::Table,
            "VIEW" => NodeKind::View,
            "PROCEDURE" => NodeKind::Procedure,
            "TRIGGER" => NodeKind::Trigger,
            "GENERATOR" => NodeKind::Generator,
            "FUNCTION" => NodeKind::Function,
            "DOMAIN" => NodeKind::Domain,
            "ROLE" => NodeKind::Role,
            "COLUMN" => NodeKind::Column,
            "EXCEPTION" => NodeKind::Exception,
            _ => NodeKind::Unknown,
        }
    }

    /// Catalog keyword for this kind, empty for `Unknown`.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Unknown => "",
            NodeKind::Database => "DATABASE",
            NodeKind::Table => "TABLE",
            NodeKind::View => "VIEW",
            NodeKind::Procedure => "PROCEDURE",
            NodeKind::Trigger => "TRIGGER",
            NodeKind::Generator => "GENERATOR",
            NodeKind::Function => "FUNCTION",
            NodeKind::Domain => "DOMAIN",
            NodeKind::Role => "ROLE",
            NodeKind::Column => "COLUMN",
            NodeKind::Parameter => "PARAMETER",
            NodeKind::Exception => "EXCEPTION",
        }
    }

    /// Human-readable name used in messages.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Unknown => "Object",
            NodeKind::Database => "Database",
            NodeKind::Table => "Table",
            NodeKind::View => "View",
            NodeKind::Procedure => "Procedure",
            NodeKind::Trigger => "Trigger",
            NodeKind::Generator => "Generator",
            NodeKind::Function => "Function",
            NodeKind::Domain => "Domain",
            NodeKind::Role => "Role",
            NodeKind::Column => "Column",
            NodeKind::Parameter => "Parameter",
            NodeKind::Exception => "Exception",
        }
    }

    /// Type code used for this kind in `RDB$DEPENDENCIES`.
    pub fn catalog_type_ordinal(&self) -> Result<i16> {
        if *self == NodeKind::Unknown {
            return Err(self.unsupported("dependencies"));
        }
        DEPENDENCY_TYPES
            .iter()
            .position(|k| k == self)
            .map(|i| i as i16)
            .ok_or_else(|| self.unsupported("dependencies"))
    }

    /// Kind stored under a `RDB$DEPENDENCIES` type code.
    ///
    /// Out-of-range and catalog-internal codes yield `Unknown`.
    pub fn from_catalog_ordinal(ordinal: i64) -> NodeKind {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| DEPENDENCY_TYPES.get(i).copied())
            .unwrap_or(NodeKind::Unknown)
    }

    /// Query reading the description of an object of this kind.
    ///
    /// Binds the object name, then the container name for columns and
    /// parameters.
    pub fn description_query(&self) -> Option<&'static str> {
        let sql = match self {
            NodeKind::Table | NodeKind::View => {
                "SELECT RDB$DESCRIPTION FROM RDB$RELATIONS WHERE RDB$RELATION_NAME = ?"
            }
            NodeKind::Procedure => {
                "SELECT RDB$DESCRIPTION FROM RDB$PROCEDURES WHERE RDB$PROCEDURE_NAME = ?"
            }
            NodeKind::Trigger => {
                "SELECT RDB$DESCRIPTION FROM RDB$TRIGGERS WHERE RDB$TRIGGER_NAME = ?"
            }
            NodeKind::Function => {
                "SELECT RDB$DESCRIPTION FROM RDB$FUNCTIONS WHERE RDB$FUNCTION_NAME = ?"
            }
            NodeKind::Column => {
                "SELECT RDB$DESCRIPTION FROM RDB$RELATION_FIELDS \
                 WHERE RDB$FIELD_NAME = ? AND RDB$RELATION_NAME = ?"
            }
            NodeKind::Parameter => {
                "SELECT RDB$DESCRIPTION FROM RDB$PROCEDURE_PARAMETERS \
                 WHERE RDB$PARAMETER_NAME = ? AND RDB$PROCEDURE_NAME = ?"
            }
            NodeKind::Domain => {
                "SELECT RDB$DESCRIPTION FROM RDB$FIELDS WHERE RDB$FIELD_NAME = ?"
            }
            NodeKind::Exception => {
                "SELECT RDB$DESCRIPTION FROM RDB$EXCEPTIONS WHERE RDB$EXCEPTION_NAME = ?"
            }
            _ => return None,
        };
        Some(sql)
    }

    /// Statement replacing the description of an object of this kind.
    ///
    /// Binds the description first, then the same keys as
    /// [`description_query`](Self::description_query).
    pub fn description_update(&self) -> Option<&'static str> {
        let sql = match self {
            NodeKind::Table | NodeKind::View => {
                "UPDATE RDB$RELATIONS SET RDB$DESCRIPTION = ? WHERE RDB$RELATION_NAME = ?"
            }
            NodeKind::Procedure => {
                "UPDATE RDB$PROCEDURES SET RDB$DESCRIPTION = ? WHERE RDB$PROCEDURE_NAME = ?"
            }
            NodeKind::Trigger => {
                "UPDATE RDB$TRIGGERS SET RDB$DESCRIPTION = ? WHERE RDB$TRIGGER_NAME = ?"
            }
            NodeKind::Function => {
                "UPDATE RDB$FUNCTIONS SET RDB$DESCRIPTION = ? WHERE RDB$FUNCTION_NAME = ?"
            }
            NodeKind::Column => {
                "UPDATE RDB$RELATION_FIELDS SET RDB$DESCRIPTION = ? \
                 WHERE RDB$FIELD_NAME = ? AND RDB$RELATION_NAME = ?"
            }
            NodeKind::Parameter => {
                "UPDATE RDB$PROCEDURE_PARAMETERS SET RDB$DESCRIPTION = ? \
                 WHERE RDB$PARAMETER_NAME = ? AND RDB$PROCEDURE_NAME = ?"
            }
            NodeKind::Domain => {
                "UPDATE RDB$FIELDS SET RDB$DESCRIPTION = ? WHERE RDB$FIELD_NAME = ?"
            }
            NodeKind::Exception => {
                "UPDATE RDB$EXCEPTIONS SET RDB$DESCRIPTION = ? WHERE RDB$EXCEPTION_NAME = ?"
            }
            _ => return None,
        };
        Some(sql)
    }

    /// Whether the catalog keys this kind by `(container, name)`.
    pub fn is_sub_object(&self) -> bool {
        matches!(self, NodeKind::Column | NodeKind::Parameter)
    }

    /// Whether nodes of this kind may hold `child` nodes.
    pub fn can_contain(&self, child: NodeKind) -> bool {
        match self {
            NodeKind::Database => !matches!(
                child,
                NodeKind::Database | NodeKind::Column | NodeKind::Parameter
            ),
            NodeKind::Table | NodeKind::View => child == NodeKind::Column,
            NodeKind::Procedure => child == NodeKind::Parameter,
            _ => false,
        }
    }

    /// Whether a plain `DROP <type> <name>` removes objects of this kind.
    pub fn supports_drop(&self) -> bool {
        !matches!(
            self,
            NodeKind::Unknown | NodeKind::Database | NodeKind::Column | NodeKind::Parameter
        )
    }

    fn unsupported(&self, operation: &'static str) -> Error {
        Error::UnsupportedType {
            kind: *self,
            operation,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Unknown => f.write_str("UNKNOWN"),
            other => f.write_str(other.type_name()),
        }
    }
}
