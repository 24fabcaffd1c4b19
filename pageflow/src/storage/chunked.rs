//! Threshold-based chunk flushing.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{Artifact, ChunkWriter};
use crate::errors::SinkWriteError;
use crate::records::Record;

/// A chunk that was flushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Contiguous chunk number starting at 1.
    pub number: u32,
    /// First page covered.
    pub first_page: u32,
    /// Last page covered.
    pub last_page: u32,
    /// What the writer produced.
    pub artifact: Artifact,
}

/// Buffers records and flushes a chunk every `threshold` pages.
///
/// Without a writer the sink only accumulates the session set; that is how
/// modes whose tabular output is written once at the end use it.
pub struct ChunkedSink {
    threshold: u32,
    writer: Option<Box<dyn ChunkWriter>>,
    all_records: Vec<Record>,
    chunk_buffer: Vec<Record>,
    pages_completed: u32,
    chunk_first_page: u32,
    next_number: u32,
    chunks: Vec<ChunkRecord>,
    failures: Vec<SinkWriteError>,
}

impl std::fmt::Debug for ChunkedSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedSink")
            .field("threshold", &self.threshold)
            .field("chunked", &self.writer.is_some())
            .field("records", &self.all_records.len())
            .field("buffered", &self.chunk_buffer.len())
            .field("pages_completed", &self.pages_completed)
            .field("next_number", &self.next_number)
            .finish_non_exhaustive()
    }
}

impl ChunkedSink {
    /// A sink flushing to `writer` every `threshold` pages.
    #[must_use]
    pub fn new(threshold: u32, writer: Box<dyn ChunkWriter>) -> Self {
        Self::build(threshold, Some(writer))
    }

    /// A sink that only accumulates.
    #[must_use]
    pub fn accumulate_only() -> Self {
        Self::build(u32::MAX, None)
    }

    fn build(threshold: u32, writer: Option<Box<dyn ChunkWriter>>) -> Self {
        Self {
            threshold: threshold.max(1),
            writer,
            all_records: Vec::new(),
            chunk_buffer: Vec::new(),
            pages_completed: 0,
            chunk_first_page: 1,
            next_number: 1,
            chunks: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Adds a record to the session set and the open chunk.
    pub fn append(&mut self, record: Record) {
        if self.writer.is_some() {
            self.chunk_buffer.push(record.clone());
        }
        self.all_records.push(record);
    }

    /// Marks one page as completed; flushes the open chunk once it spans
    /// `threshold` pages.
    pub fn on_page_boundary(&mut self) -> Result<Option<ChunkRecord>, SinkWriteError> {
        self.pages_completed += 1;
        let pages_in_chunk = self.pages_completed + 1 - self.chunk_first_page;
        if self.writer.is_none() || pages_in_chunk < self.threshold {
            return Ok(None);
        }
        self.flush()
    }

    /// Flushes whatever remains at session end.
    pub fn finalize(&mut self) -> Result<Option<ChunkRecord>, SinkWriteError> {
        if self.writer.is_none() || self.chunk_buffer.is_empty() {
            return Ok(None);
        }
        self.flush()
    }

    fn flush(&mut self) -> Result<Option<ChunkRecord>, SinkWriteError> {
        let Some(writer) = self.writer.as_ref() else {
            return Ok(None);
        };

        let first_page = self.chunk_first_page;
        let last_page = self.pages_completed.max(first_page);

        if self.chunk_buffer.is_empty() {
            debug!(first_page, last_page, "Chunk window closed without records");
            self.chunk_first_page = self.pages_completed + 1;
            return Ok(None);
        }

        let number = self.next_number;
        match writer.write_chunk(number, &self.chunk_buffer) {
            Ok(artifact) => {
                info!(
                    chunk = number,
                    first_page,
                    last_page,
                    records = artifact.records,
                    location = %artifact.location,
                    "Chunk flushed"
                );
                let chunk = ChunkRecord {
                    number,
                    first_page,
                    last_page,
                    artifact,
                };
                self.chunks.push(chunk.clone());
                self.chunk_buffer.clear();
                self.chunk_first_page = self.pages_completed + 1;
                self.next_number += 1;
                Ok(Some(chunk))
            }
            Err(err) => {
                // The buffer and the number are kept; the next boundary
                // retries with the same chunk.
                warn!(chunk = number, error = %err, buffered = self.chunk_buffer.len(), "Chunk flush failed");
                self.failures.push(err.clone());
                Err(err)
            }
        }
    }

    /// The full session set, in arrival order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.all_records
    }

    /// Consumes the sink into the full session set.
    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        self.all_records
    }

    /// Chunks flushed so far.
    #[must_use]
    pub fn chunks(&self) -> &[ChunkRecord] {
        &self.chunks
    }

    /// Flush failures so far.
    #[must_use]
    pub fn failures(&self) -> &[SinkWriteError] {
        &self.failures
    }

    /// Pages completed so far.
    #[must_use]
    pub fn pages_completed(&self) -> u32 {
        self.pages_completed
    }

    /// Records waiting in the open chunk.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.chunk_buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::IdentitySchema;
    use crate::storage::CsvChunkWriter;
    use crate::testing::MemoryChunkWriter;
    use pretty_assertions::assert_eq;

    fn page_record(page: u32) -> Record {
        Record::new()
            .with_field("Reviewer Name", format!("user{page}"))
            .with_field("Content", format!("page {page}"))
    }

    fn run_pages(sink: &mut ChunkedSink, pages: u32) {
        for page in 1..=pages {
            sink.append(page_record(page));
            let _ = sink.on_page_boundary();
        }
        let _ = sink.finalize();
    }

    #[test]
    fn test_130_pages_threshold_50_gives_three_chunks() {
        let writer = MemoryChunkWriter::new();
        let mut sink = ChunkedSink::new(50, Box::new(writer.clone()));

        run_pages(&mut sink, 130);

        let spans: Vec<_> = sink
            .chunks()
            .iter()
            .map(|c| (c.number, c.first_page, c.last_page, c.artifact.records))
            .collect();
        assert_eq!(spans, vec![(1, 1, 50, 50), (2, 51, 100, 50), (3, 101, 130, 30)]);
        assert_eq!(writer.written_numbers(), vec![1, 2, 3]);
        assert_eq!(sink.records().len(), 130);
        assert_eq!(sink.buffered(), 0);
    }

    #[test]
    fn test_exact_multiple_leaves_nothing_to_finalize() {
        let writer = MemoryChunkWriter::new();
        let mut sink = ChunkedSink::new(50, Box::new(writer.clone()));

        run_pages(&mut sink, 100);

        assert_eq!(writer.written_numbers(), vec![1, 2]);
    }

    #[test]
    fn test_csv_chunk_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CsvChunkWriter::new(dir.path(), "reviews", IdentitySchema::primary_items());
        let mut sink = ChunkedSink::new(2, Box::new(writer));

        run_pages(&mut sink, 5);

        for n in 1..=3 {
            assert!(dir.path().join(format!("reviews_chunk_{n}.csv")).is_file());
        }
        assert!(!dir.path().join("reviews_chunk_4.csv").exists());
    }

    #[test]
    fn test_failed_flush_keeps_buffer_and_number() {
        let writer = MemoryChunkWriter::new().failing_first(1);
        let mut sink = ChunkedSink::new(2, Box::new(writer.clone()));

        sink.append(page_record(1));
        assert!(sink.on_page_boundary().unwrap().is_none());
        sink.append(page_record(2));
        assert!(sink.on_page_boundary().is_err());
        assert_eq!(sink.buffered(), 2);

        sink.append(page_record(3));
        let chunk = sink.on_page_boundary().unwrap().unwrap();

        assert_eq!(chunk.number, 1);
        assert_eq!((chunk.first_page, chunk.last_page), (1, 3));
        assert_eq!(chunk.artifact.records, 3);
        assert_eq!(sink.failures().len(), 1);
    }

    #[test]
    fn test_empty_window_consumes_no_number() {
        let writer = MemoryChunkWriter::new();
        let mut sink = ChunkedSink::new(2, Box::new(writer.clone()));

        // Two pages that yielded nothing.
        sink.on_page_boundary().unwrap();
        sink.on_page_boundary().unwrap();
        sink.append(page_record(3));
        sink.on_page_boundary().unwrap();
        sink.finalize().unwrap();

        assert_eq!(writer.written_numbers(), vec![1]);
        assert_eq!(sink.chunks()[0].first_page, 3);
    }

    #[test]
    fn test_accumulate_only_never_writes() {
        let mut sink = ChunkedSink::accumulate_only();
        for page in 1..=5 {
            sink.append(page_record(page));
            assert!(sink.on_page_boundary().unwrap().is_none());
        }
        assert!(sink.finalize().unwrap().is_none());
        assert_eq!(sink.into_records().len(), 5);
    }
}
