//! In-memory record store.
//!
//! Paper metadata is read once from a CSV file with a header row. The file
//! must contain at least the `title`, `abstract` and `url` columns; any other
//! column is ignored. A record's identifier is its data-row position, which is
//! the identifier the vector index was built with.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::models::Record;

/// Errors that can occur while loading the record store.
#[derive(Debug, Error)]
pub enum RecordStoreError {
    /// The file could not be opened
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A row could not be parsed (malformed CSV or missing column)
    #[error("Parse error at row {row}: {message}")]
    ParseError { row: usize, message: String },
}

/// Result type for record store operations.
pub type RecordStoreResult<T> = Result<T, RecordStoreError>;

/// Raw CSV row. Every field is read as a string.
#[derive(Debug, Deserialize)]
struct RecordRow {
    title: String,
    #[serde(rename = "abstract")]
    abstract_text: String,
    url: String,
}

/// Immutable table of paper records keyed by row position.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    /// Build a store from records already in memory.
    ///
    /// Identifiers are reassigned to match positions, so `records[i].id == i`
    /// always holds.
    pub fn new(records: Vec<Record>) -> Self {
        let records = records
            .into_iter()
            .enumerate()
            .map(|(id, record)| Record { id, ..record })
            .collect();
        Self { records }
    }

    /// Load a store from a CSV file.
    ///
    /// # Errors
    /// Returns `RecordStoreError::IoError` if the file cannot be opened and
    /// `RecordStoreError::ParseError` for the first row that fails to parse
    pub fn from_csv_path(path: &Path) -> RecordStoreResult<Self> {
        info!("Loading records from {}", path.display());
        let file = File::open(path)?;
        let store = Self::from_csv_reader(file)?;
        info!("Loaded {} records", store.len());
        Ok(store)
    }

    /// Load a store from any CSV source.
    pub fn from_csv_reader<R: Read>(reader: R) -> RecordStoreResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let mut records = Vec::new();
        for (id, row) in csv_reader.deserialize::<RecordRow>().enumerate() {
            let row = row.map_err(|e| RecordStoreError::ParseError {
                row: id,
                message: e.to_string(),
            })?;
            records.push(Record {
                id,
                title: row.title,
                abstract_text: row.abstract_text,
                url: row.url,
            });
        }

        Ok(Self { records })
    }

    /// Look up a record by identifier.
    pub fn get(&self, id: usize) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }
}
