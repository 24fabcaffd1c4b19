//! Tabular artifacts written with the `csv` crate.

use async_trait::async_trait;
use chrono::Utc;
use std::fs::File;
use std::path::{Path, PathBuf};

use super::{Artifact, ChunkWriter, RecordSink};
use crate::errors::SinkWriteError;
use crate::records::{dedup, value_text, IdentitySchema, Record};
use crate::utils::file_timestamp;

const SINK: &str = "csv";

/// Column set of a record batch: every key, in first-seen order.
#[must_use]
pub fn columns_of(records: &[Record]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Writes `records` as CSV with a header row. Returns the row count.
pub fn write_csv(path: &Path, records: &[Record]) -> Result<usize, SinkWriteError> {
    let file = File::create(path).map_err(|e| SinkWriteError::io(SINK, &e))?;
    let mut writer = csv::Writer::from_writer(file);
    let columns = columns_of(records);

    let to_err = |e: csv::Error| SinkWriteError::new(SINK, e.to_string());
    if !columns.is_empty() {
        writer.write_record(&columns).map_err(to_err)?;
    }
    for record in records {
        let row = columns.iter().map(|c| record.get(c).map(value_text).unwrap_or_default());
        writer.write_record(row).map_err(to_err)?;
    }
    writer.flush().map_err(|e| SinkWriteError::io(SINK, &e))?;
    Ok(records.len())
}

/// Writes numbered chunk files `<base>_chunk_<N>.csv`.
#[derive(Debug, Clone)]
pub struct CsvChunkWriter {
    dir: PathBuf,
    base_name: String,
    schema: IdentitySchema,
}

impl CsvChunkWriter {
    /// Creates a writer for one session directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, base_name: impl Into<String>, schema: IdentitySchema) -> Self {
        Self {
            dir: dir.into(),
            base_name: base_name.into(),
            schema,
        }
    }

    /// Path of chunk `number`.
    #[must_use]
    pub fn chunk_path(&self, number: u32) -> PathBuf {
        self.dir.join(format!("{}_chunk_{number}.csv", self.base_name))
    }
}

impl ChunkWriter for CsvChunkWriter {
    fn write_chunk(&self, number: u32, records: &[Record]) -> Result<Artifact, SinkWriteError> {
        // Duplicates are removed within the chunk only; chunks are never
        // compared against each other.
        let unique = dedup(records, &self.schema).records;
        let path = self.chunk_path(number);
        let written = write_csv(&path, &unique)?;
        Ok(Artifact::file(SINK, &path, written))
    }
}

/// Consolidated tabular artifact `<base>_<timestamp>.csv`.
#[derive(Debug, Clone)]
pub struct CsvRecordStore {
    dir: PathBuf,
    base_name: String,
}

impl CsvRecordStore {
    /// Creates a store writing into `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base_name: base_name.into(),
        }
    }
}

#[async_trait]
impl RecordSink for CsvRecordStore {
    fn name(&self) -> &str {
        SINK
    }

    async fn persist(&self, records: &[Record]) -> Result<Artifact, SinkWriteError> {
        let path = self
            .dir
            .join(format!("{}_{}.csv", self.base_name, file_timestamp(&Utc::now())));
        let rows = records.to_vec();
        let target = path.clone();
        let written = tokio::task::spawn_blocking(move || write_csv(&target, &rows))
            .await
            .map_err(|e| SinkWriteError::new(SINK, e.to_string()))??;
        Ok(Artifact::file(SINK, &path, written))
    }
}
