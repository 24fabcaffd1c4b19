//! Testing utilities for collection sessions.
//!
//! This module provides:
//! - A scriptable browser and tab with linear or block pagination
//! - A scripted extractor
//! - In-memory chunk writer and document store
//! - Record and configuration fixtures

mod fixtures;
mod mocks;

pub use fixtures::{fast_config, sample_page, sample_record, PRODUCT_URL};
pub use mocks::{
    MemoryChunkWriter, MemoryDocumentStore, MockBrowser, MockPagination, MockTab,
    ScriptedExtractor,
};
