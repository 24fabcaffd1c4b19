//! Final fan-out of the deduplicated session set.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::{
    Artifact, CsvRecordStore, DocumentStore, JsonRecordStore, RecordSink, RemoteRecordSink,
    SessionOutput,
};
use crate::config::StorageConfig;
use crate::errors::SinkWriteError;
use crate::observability::SpanTimer;
use crate::records::{dedup, CollectionMode, IdentitySchema, Record};

/// What persisting the session set achieved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistReport {
    /// Records left after deduplication.
    pub unique_count: usize,
    /// Records dropped as duplicates.
    pub duplicates_removed: usize,
    /// Artifacts written, in sink order.
    pub artifacts: Vec<Artifact>,
    /// Sinks that failed.
    pub failures: Vec<SinkWriteError>,
}

impl PersistReport {
    /// Returns true if every sink succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Converts the report to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("unique_count".to_string(), serde_json::json!(self.unique_count));
        map.insert(
            "duplicates_removed".to_string(),
            serde_json::json!(self.duplicates_removed),
        );
        map.insert(
            "artifacts".to_string(),
            serde_json::to_value(&self.artifacts).unwrap_or_default(),
        );
        map.insert(
            "failures".to_string(),
            serde_json::to_value(&self.failures).unwrap_or_default(),
        );
        map
    }
}

/// Writes the deduplicated session set to every enabled sink.
pub struct StorageRouter {
    schema: IdentitySchema,
    sinks: Vec<Box<dyn RecordSink>>,
}

impl std::fmt::Debug for StorageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.sinks.iter().map(|s| s.name()).collect();
        f.debug_struct("StorageRouter")
            .field("schema", &self.schema)
            .field("sinks", &names)
            .finish()
    }
}

impl StorageRouter {
    /// A router with no sinks.
    #[must_use]
    pub fn new(schema: IdentitySchema) -> Self {
        Self {
            schema,
            sinks: Vec::new(),
        }
    }

    /// Adds a sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn RecordSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Wires the sinks enabled in `config` for one session.
    ///
    /// The consolidated tabular artifact is only added for modes whose
    /// tabular output the chunk files do not already cover. The remote sink
    /// needs both the setting and a store.
    #[must_use]
    pub fn for_session(
        config: &StorageConfig,
        mode: CollectionMode,
        output: &SessionOutput,
        document_store: Option<Arc<dyn DocumentStore>>,
    ) -> Self {
        let mut router = Self::new(mode.identity_schema());

        if config.json.enabled {
            router = router.with_sink(Box::new(JsonRecordStore::new(
                output.dir(),
                config.base_name.clone(),
                mode,
            )));
        }
        if config.tabular.enabled && !mode.is_chunk_covered() {
            router = router.with_sink(Box::new(CsvRecordStore::new(output.dir(), config.base_name.clone())));
        }
        if config.remote.enabled {
            match document_store {
                Some(store) => {
                    router = router.with_sink(Box::new(RemoteRecordSink::new(
                        store,
                        config.remote_collection(),
                        mode.identity_schema(),
                    )));
                }
                None => warn!("Remote store enabled but no store is configured"),
            }
        }
        router
    }

    /// Names of the wired sinks.
    #[must_use]
    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Deduplicates `records` and writes the survivors to every sink.
    ///
    /// Never fails as a whole: sink errors are collected in the report. An
    /// empty deduplicated set writes nothing.
    pub async fn persist(&self, records: &[Record]) -> PersistReport {
        let outcome = dedup(records, &self.schema);
        let mut report = PersistReport {
            unique_count: outcome.records.len(),
            duplicates_removed: outcome.duplicates_removed,
            ..PersistReport::default()
        };

        if outcome.records.is_empty() {
            info!("No records to persist");
            return report;
        }

        for sink in &self.sinks {
            let timer = SpanTimer::start(format!("persist:{}", sink.name()));
            match sink.persist(&outcome.records).await {
                Ok(artifact) => {
                    info!(
                        sink = sink.name(),
                        records = artifact.records,
                        location = %artifact.location,
                        duration_ms = timer.finish(),
                        "Sink write complete"
                    );
                    report.artifacts.push(artifact);
                }
                Err(err) => {
                    warn!(sink = sink.name(), error = %err, "Sink write failed");
                    report.failures.push(err);
                }
            }
        }

        report
    }
}
