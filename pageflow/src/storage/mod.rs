//! Accumulation, chunked flushing and final persistence of records.
//!
//! During extraction every record goes into a [`ChunkedSink`], which keeps
//! the full session set and flushes page-count chunks to tabular files as
//! it goes. When extraction ends, [`StorageRouter::persist`] deduplicates
//! the full set and fans it out to every enabled [`RecordSink`]. Sink
//! failures are isolated: one failing sink never costs another its records.

mod chunked;
mod csv_store;
mod json_store;
mod layout;
mod remote;
mod router;

pub use chunked::{ChunkRecord, ChunkedSink};
pub use csv_store::{columns_of, write_csv, CsvChunkWriter, CsvRecordStore};
pub use json_store::JsonRecordStore;
pub use layout::SessionOutput;
#[cfg(feature = "remote")]
pub use remote::HttpDocumentStore;
pub use remote::{to_documents, DocumentStore, RemoteRecordSink, DOCUMENT_ID_FIELD};
pub use router::{PersistReport, StorageRouter};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::SinkWriteError;
use crate::records::Record;

/// Something a sink produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Sink that wrote it.
    pub sink: String,
    /// File path or remote location.
    pub location: String,
    /// Number of records it holds.
    pub records: usize,
}

impl Artifact {
    /// An artifact written to a local file.
    #[must_use]
    pub fn file(sink: &str, path: &Path, records: usize) -> Self {
        Self {
            sink: sink.to_string(),
            location: path.display().to_string(),
            records,
        }
    }

    /// An artifact held by a remote store.
    #[must_use]
    pub fn remote(sink: &str, location: String, records: usize) -> Self {
        Self {
            sink: sink.to_string(),
            location,
            records,
        }
    }

    /// The location as a path.
    #[must_use]
    pub fn path(&self) -> &Path {
        Path::new(&self.location)
    }
}

/// Receives the deduplicated full record set at session end.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Sink name for reports and logs.
    fn name(&self) -> &str;

    /// Writes the records.
    async fn persist(&self, records: &[Record]) -> Result<Artifact, SinkWriteError>;
}

/// Writes one numbered chunk of records.
pub trait ChunkWriter: Send + Sync {
    /// Writes chunk `number`.
    fn write_chunk(&self, number: u32, records: &[Record]) -> Result<Artifact, SinkWriteError>;
}
