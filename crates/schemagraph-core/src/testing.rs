//! Scripted in-memory catalog for tests.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::catalog::{
    BlobId, CatalogAccess, CatalogTransaction, Row, TextStream, TransactionMode, Value,
};
use crate::error::CatalogError;

/// A statement issued against the scripted catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Issued {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Default)]
struct State {
    responses: Vec<(String, Result<Vec<Row>, CatalogError>)>,
    execute_error: Option<CatalogError>,
    begin_error: Option<CatalogError>,
    blobs: HashMap<u64, String>,
    next_blob: u64,
    queries: Vec<Issued>,
    executes: Vec<Issued>,
    begins: Vec<TransactionMode>,
    commits: usize,
    aborts: usize,
}

/// Catalog answering queries from canned responses.
///
/// A response is selected by the first registered fragment contained in
/// the statement text.
pub struct ScriptedCatalog {
    state: Mutex<State>,
    read_chunk: usize,
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_blob: 1,
                ..Default::default()
            }),
            read_chunk: 3,
        }
    }

    pub fn respond(&self, fragment: &str, rows: Vec<Row>) -> &Self {
        self.state
            .lock()
            .responses
            .push((fragment.to_string(), Ok(rows)));
        self
    }

    pub fn fail(&self, fragment: &str, error: CatalogError) -> &Self {
        self.state
            .lock()
            .responses
            .push((fragment.to_string(), Err(error)));
        self
    }

    pub fn fail_execute(&self, error: CatalogError) {
        self.state.lock().execute_error = Some(error);
    }

    pub fn fail_begin(&self, error: CatalogError) {
        self.state.lock().begin_error = Some(error);
    }

    pub fn add_blob(&self, text: &str) -> BlobId {
        let mut state = self.state.lock();
        let id = state.next_blob;
        state.next_blob += 1;
        state.blobs.insert(id, text.to_string());
        BlobId(id)
    }

    pub fn blob_text(&self, blob: BlobId) -> Option<String> {
        self.state.lock().blobs.get(&blob.0).cloned()
    }

    pub fn queries(&self) -> Vec<Issued> {
        self.state.lock().queries.clone()
    }

    pub fn executes(&self) -> Vec<Issued> {
        self.state.lock().executes.clone()
    }

    pub fn begins(&self) -> Vec<TransactionMode> {
        self.state.lock().begins.clone()
    }

    pub fn commits(&self) -> usize {
        self.state.lock().commits
    }

    pub fn aborts(&self) -> usize {
        self.state.lock().aborts
    }
}

impl Default for ScriptedCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogAccess for ScriptedCatalog {
    fn begin(
        &self,
        mode: TransactionMode,
    ) -> Result<Box<dyn CatalogTransaction + '_>, CatalogError> {
        let mut state = self.state.lock();
        if let Some(err) = state.begin_error.clone() {
            return Err(err);
        }
        state.begins.push(mode);
        Ok(Box::new(ScriptedTransaction {
            catalog: self,
            finished: false,
        }))
    }
}

struct ScriptedTransaction<'a> {
    catalog: &'a ScriptedCatalog,
    finished: bool,
}

impl CatalogTransaction for ScriptedTransaction<'_> {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, CatalogError> {
        let mut state = self.catalog.state.lock();
        state.queries.push(Issued {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        state
            .responses
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, CatalogError> {
        let mut state = self.catalog.state.lock();
        if let Some(err) = state.execute_error.clone() {
            return Err(err);
        }
        state.executes.push(Issued {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        Ok(1)
    }

    fn read_text(&mut self, blob: BlobId) -> Result<TextStream<'_>, CatalogError> {
        let text = self
            .catalog
            .blob_text(blob)
            .ok_or_else(|| CatalogError::Blob(format!("no blob {}", blob.0)))?;
        let chunks: Vec<String> = text
            .chars()
            .collect::<Vec<_>>()
            .chunks(self.catalog.read_chunk)
            .map(|c| c.iter().collect())
            .collect();
        Ok(Box::new(chunks.into_iter().map(Ok)))
    }

    fn write_text(
        &mut self,
        chunks: &mut dyn Iterator<Item = &str>,
    ) -> Result<BlobId, CatalogError> {
        let text: String = chunks.collect();
        Ok(self.catalog.add_blob(&text))
    }

    fn commit(mut self: Box<Self>) -> Result<(), CatalogError> {
        self.finished = true;
        self.catalog.state.lock().commits += 1;
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> Result<(), CatalogError> {
        self.finished = true;
        self.catalog.state.lock().aborts += 1;
        Ok(())
    }
}

impl Drop for ScriptedTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.catalog.state.lock().aborts += 1;
        }
    }
}
