//! Parameter values and result rows exchanged with the catalog.

use crate::error::CatalogError;

/// Opaque identifier of a blob stored by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobId(pub u64);

/// A bound parameter or a column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// SQL null.
    Null,
    /// Integer value.
    Integer(i64),
    /// Character value.
    Text(String),
    /// Reference to a blob.
    Blob(BlobId),
}

impl Value {
    /// Whether the value is SQL null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<BlobId> for Value {
    fn from(b: BlobId) -> Self {
        Value::Blob(b)
    }
}

/// A result row whose columns are addressed by name.
///
/// Names are compared case-insensitively, matching how the server
/// reports unquoted identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.push((name.into(), value.into()));
        self
    }

    /// Add a null column.
    pub fn with_null(mut self, name: impl Into<String>) -> Self {
        self.columns.push((name.into(), Value::Null));
        self
    }

    /// Raw value of a column.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    fn require(&self, name: &str) -> Result<&Value, CatalogError> {
        self.get(name)
            .ok_or_else(|| CatalogError::decode(name, "column not present in row"))
    }

    /// Whether a column is null.
    pub fn is_null(&self, name: &str) -> Result<bool, CatalogError> {
        Ok(self.require(name)?.is_null())
    }

    /// Character column; `None` when null.
    pub fn text(&self, name: &str) -> Result<Option<&str>, CatalogError> {
        match self.require(name)? {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s.as_str())),
            other => Err(CatalogError::decode(name, format!("expected text, got {:?}", other))),
        }
    }

    /// Non-null character column.
    pub fn required_text(&self, name: &str) -> Result<&str, CatalogError> {
        self.text(name)?
            .ok_or_else(|| CatalogError::decode(name, "unexpected null"))
    }

    /// Integer column; `None` when null.
    pub fn integer(&self, name: &str) -> Result<Option<i64>, CatalogError> {
        match self.require(name)? {
            Value::Null => Ok(None),
            Value::Integer(v) => Ok(Some(*v)),
            other => Err(CatalogError::decode(
                name,
                format!("expected integer, got {:?}", other),
            )),
        }
    }

    /// Blob column; `None` when null.
    pub fn blob(&self, name: &str) -> Result<Option<BlobId>, CatalogError> {
        match self.require(name)? {
            Value::Null => Ok(None),
            Value::Blob(b) => Ok(Some(*b)),
            other => Err(CatalogError::decode(name, format!("expected blob, got {:?}", other))),
        }
    }
}
