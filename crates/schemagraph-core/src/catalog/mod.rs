//! Interface to the database catalog.
//!
//! The engine never manages connections itself. Everything it needs from
//! the server goes through [`CatalogAccess`]: short-lived transactions,
//! parameterized statements, and streamed blob text.

mod value;

pub use value::{BlobId, Row, Value};

use crate::error::CatalogError;

/// Transaction access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Snapshot reads only.
    ReadOnly,
    /// Reads and writes.
    ReadWrite,
}

/// Lazy, finite sequence of text chunks read from a blob.
///
/// Chunks arrive in storage order; the stream cannot be restarted.
pub type TextStream<'a> = Box<dyn Iterator<Item = Result<String, CatalogError>> + 'a>;

/// Entry point to a catalog.
pub trait CatalogAccess {
    /// Start a transaction.
    fn begin(
        &self,
        mode: TransactionMode,
    ) -> Result<Box<dyn CatalogTransaction + '_>, CatalogError>;
}

/// An open catalog transaction.
///
/// Dropping a transaction without calling [`commit`](Self::commit) aborts it.
pub trait CatalogTransaction {
    /// Run a query and return every row.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, CatalogError>;

    /// Run a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, CatalogError>;

    /// Open a blob for reading.
    fn read_text(&mut self, blob: BlobId) -> Result<TextStream<'_>, CatalogError>;

    /// Create a blob from a sequence of chunks.
    fn write_text(
        &mut self,
        chunks: &mut dyn Iterator<Item = &str>,
    ) -> Result<BlobId, CatalogError>;

    /// Commit the transaction.
    fn commit(self: Box<Self>) -> Result<(), CatalogError>;

    /// Roll the transaction back.
    fn rollback(self: Box<Self>) -> Result<(), CatalogError>;
}

/// Split `text` into chunks of at most `chunk_size` bytes on char boundaries.
///
/// Sizes below four bytes are raised to four so every chunk can hold a char.
pub fn text_chunks(text: &str, chunk_size: usize) -> impl Iterator<Item = &str> {
    let chunk_size = chunk_size.max(4);
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let mut end = chunk_size.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_chunks() {
        let chunks: Vec<&str> = text_chunks("abcdefghij", 4).collect();
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);

        assert_eq!(text_chunks("", 8).count(), 0);
    }

    #[test]
    fn test_text_chunks_respects_char_boundaries() {
        let text = "ééééé";
        let chunks: Vec<&str> = text_chunks(text, 5).collect();
        assert!(chunks.iter().all(|c| c.len() <= 5));
        assert_eq!(chunks.concat(), text);
    }
}
