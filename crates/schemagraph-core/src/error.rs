//! Core error types.

use thiserror::Error;

use crate::metadata::{NodeId, NodeKind};

/// Errors raised by a catalog access implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The connection to the database server failed or was lost.
    #[error("connection error: {0}")]
    Connection(String),

    /// A statement could not be prepared.
    #[error("failed to prepare statement: {reason}")]
    Prepare {
        /// Statement text.
        sql: String,
        /// Server-reported reason.
        reason: String,
    },

    /// A prepared statement failed during execution.
    #[error("execution error: {0}")]
    Execute(String),

    /// Reading or writing a blob failed.
    #[error("blob error: {0}")]
    Blob(String),

    /// A row column was missing or had an unexpected type.
    #[error("cannot decode column {column}: {reason}")]
    Decode {
        /// Column name.
        column: String,
        /// What went wrong.
        reason: String,
    },

    /// Anything the implementation could not classify.
    #[error("{0}")]
    Other(String),
}

impl CatalogError {
    /// Create a decode error for a column.
    pub fn decode(column: impl Into<String>, reason: impl Into<String>) -> Self {
        CatalogError::Decode {
            column: column.into(),
            reason: reason.into(),
        }
    }
}

/// Metadata engine errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The node has no owning database.
    #[error("Database not set")]
    DatabaseNotAttached,

    /// The node kind has no catalog mapping for the requested operation.
    #[error("Unsupported type {kind} for {operation}")]
    UnsupportedType {
        /// Kind of the node the operation was requested on.
        kind: NodeKind,
        /// Operation that needed the mapping.
        operation: &'static str,
    },

    /// A referenced object could not be located in the tree.
    #[error("{} {name} not found", .kind.label())]
    ObjectNotFound {
        /// Expected kind of the object.
        kind: NodeKind,
        /// Object name.
        name: String,
    },

    /// The catalog collaborator reported a failure.
    #[error("catalog error: {0}")]
    Catalog(CatalogError),

    /// Unclassified collaborator failure.
    #[error("unknown error: {0}")]
    Unknown(String),

    /// The node id does not refer to a live node.
    #[error("invalid node id {0}")]
    InvalidNode(NodeId),

    /// Children were added under a kind that cannot hold them.
    #[error("{kind} {name} cannot contain {child}")]
    NotAContainer {
        /// Parent kind.
        kind: NodeKind,
        /// Parent name.
        name: String,
        /// Kind of the rejected child.
        child: NodeKind,
    },

    /// Reclassification was attempted on an already classified node.
    #[error("node {name} is already classified as {kind}")]
    AlreadyClassified {
        /// Node name.
        name: String,
        /// Current kind.
        kind: NodeKind,
    },

    /// Snapshot serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<CatalogError> for Error {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::Other(message) => Error::Unknown(message),
            other => Error::Catalog(other),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Serialization(format!("I/O error: {}", e))
    }
}

/// Result type for metadata operations.
pub type Result<T> = std::result::Result<T, Error>;
