//! Durable document/chunk metadata store.
//!
//! A single redb database file holds two tables: `documents` keyed by the
//! caller-assigned string id, and `chunks` keyed by the u64 id handed out
//! by the vector store. Values are JSON-encoded records. Every save
//! commits its write transaction before returning, so a saved record
//! survives a crash; redb serializes write transactions, which gives the
//! per-key write ordering the ingest protocol relies on (document first,
//! then its chunks).

use crate::error::{Error, Result};
use crate::types::{Chunk, Document};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;

const DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");
const CHUNKS: TableDefinition<u64, &[u8]> = TableDefinition::new("chunks");

/// Key→blob store for documents and chunks.
pub struct MetadataStore {
    db: Database,
}

impl MetadataStore {
    /// Opens (or creates) the database at `path` and ensures both tables
    /// exist, so later reads never race table creation.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path)?;
        let txn = db.begin_write()?;
        txn.open_table(DOCUMENTS)?;
        txn.open_table(CHUNKS)?;
        txn.commit()?;
        Ok(Self { db })
    }

    /// Saves a document, overwriting any previous record under the same id.
    pub fn save_document(&self, doc: &Document) -> Result<()> {
        let bytes = serde_json::to_vec(doc)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(DOCUMENTS)?;
            table.insert(doc.id.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Loads a document by id.
    pub fn get_document(&self, id: &str) -> Result<Document> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(DOCUMENTS)?;
        let guard = table
            .get(id)?
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;
        Ok(serde_json::from_slice(guard.value())?)
    }

    /// Saves a chunk record under its vector-store id.
    pub fn save_chunk(&self, chunk: &Chunk) -> Result<()> {
        let bytes = serde_json::to_vec(chunk)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CHUNKS)?;
            table.insert(chunk.id, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Loads a chunk by id.
    pub fn get_chunk(&self, id: u64) -> Result<Chunk> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CHUNKS)?;
        let guard = table.get(id)?.ok_or(Error::ChunkNotFound(id))?;
        Ok(serde_json::from_slice(guard.value())?)
    }
}
