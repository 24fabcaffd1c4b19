//! # Pageflow
//!
//! Browser-driven, multi-page collection sessions with chunked and
//! deduplicated persistence.
//!
//! A session:
//!
//! - **Arrives** at a target page, whether the browser gets there in place
//!   or in a tab the site opens by itself
//! - **Paginates** with a linear or a block-windowed strategy, verifying
//!   where it landed
//! - **Extracts** records through a site-specific [`extraction::Extractor`]
//! - **Persists** chunk files while it runs and the deduplicated whole at
//!   the end
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pageflow::prelude::*;
//!
//! let crawler = Crawler::new(browser, extractor, CrawlConfig::from_file("pageflow.json")?)
//!     .with_progress(progress);
//!
//! let request = SessionRequest::new("wireless earbuds", CollectionMode::PrimaryItemCollection)
//!     .with_page_budget(PageBudget::fixed(20));
//! let result = crawler.start(request, &CancellationToken::new()).await;
//! println!("{} records in {:?}", result.record_count, result.output_location);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod browser;
pub mod cancellation;
pub mod config;
pub mod errors;
pub mod events;
pub mod extraction;
pub mod navigation;
pub mod observability;
pub mod pagination;
pub mod records;
pub mod session;
pub mod storage;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::browser::{BrowserContext, BrowserTab, Control, ControlState, TabHandle};
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{
        CrawlConfig, NavigationConfig, PaginationConfig, SiteProfile, StorageConfig,
    };
    pub use crate::errors::{BrowserError, CrawlError, ExtractionError, SinkWriteError};
    pub use crate::events::{
        ChannelProgressSink, LoggingProgressSink, NoOpProgressSink, ProgressEvent, ProgressSink,
        Severity,
    };
    pub use crate::extraction::{Extractor, PageContext, StopReason};
    pub use crate::navigation::{SessionNavigator, SessionTarget, TargetMatcher};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pagination::{PageBudget, PageCursor, Paginator};
    pub use crate::records::{CollectionMode, DedupKey, IdentitySchema, Record};
    pub use crate::session::{
        Crawler, ExclusionFlags, SessionRequest, SessionResult, SessionSpec, SortOrder,
    };
    pub use crate::storage::{DocumentStore, PersistReport};
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
