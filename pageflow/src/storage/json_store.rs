//! Structured single-artifact record file.

use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;

use super::{Artifact, RecordSink};
use crate::errors::SinkWriteError;
use crate::records::{annotate_page_review, format_threads, CollectionMode, Record};
use crate::utils::file_timestamp;

const SINK: &str = "json";

/// Writes one pretty-printed JSON array `<base>_<timestamp>.json`.
///
/// Primary items gain a leading `Page_Review` field; threads are reshaped
/// into thread documents.
#[derive(Debug, Clone)]
pub struct JsonRecordStore {
    dir: PathBuf,
    base_name: String,
    mode: CollectionMode,
}

impl JsonRecordStore {
    /// Creates a store writing into `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, base_name: impl Into<String>, mode: CollectionMode) -> Self {
        Self {
            dir: dir.into(),
            base_name: base_name.into(),
            mode,
        }
    }

    fn render(&self, records: &[Record]) -> Result<String, serde_json::Error> {
        match self.mode {
            CollectionMode::PrimaryItemCollection => {
                let annotated: Vec<Record> = records.iter().map(annotate_page_review).collect();
                serde_json::to_string_pretty(&annotated)
            }
            CollectionMode::ThreadCollection => serde_json::to_string_pretty(&format_threads(records)),
        }
    }
}

#[async_trait]
impl RecordSink for JsonRecordStore {
    fn name(&self) -> &str {
        SINK
    }

    async fn persist(&self, records: &[Record]) -> Result<Artifact, SinkWriteError> {
        let body = self
            .render(records)
            .map_err(|e| SinkWriteError::new(SINK, e.to_string()))?;
        let path = self
            .dir
            .join(format!("{}_{}.json", self.base_name, file_timestamp(&Utc::now())));

        tokio::fs::write(&path, body)
            .await
            .map_err(|e| SinkWriteError::io(SINK, &e))?;
        Ok(Artifact::file(SINK, &path, records.len()))
    }
}
