//! Invocation parameters and the session result.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::errors::CrawlError;
use crate::extraction::StopReason;
use crate::navigation::SessionTarget;
use crate::pagination::PageBudget;
use crate::records::CollectionMode;
use crate::storage::{ChunkRecord, PersistReport};

/// Order the site lists items in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// The site's own ranking.
    #[default]
    Ranking,
    /// Newest first.
    Recent,
    /// Lowest rating first.
    LowestRating,
}

impl SortOrder {
    /// Returns the snake_case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ranking => "ranking",
            Self::Recent => "recent",
            Self::LowestRating => "lowest_rating",
        }
    }
}

/// Filters applied to the listing before extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExclusionFlags {
    /// Hide threads marked secret.
    #[serde(default)]
    pub exclude_secret_threads: bool,
}

/// The options the extractor applies once after arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSpec {
    /// What is collected.
    pub mode: CollectionMode,
    /// Listing order.
    pub sort_order: SortOrder,
    /// Listing filters.
    pub exclusion: ExclusionFlags,
}

/// One `start` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    /// Page address or search query.
    pub target: SessionTarget,
    /// What is collected.
    pub mode: CollectionMode,
    /// Listing order.
    pub sort_order: SortOrder,
    /// How many pages to visit.
    pub page_budget: PageBudget,
    /// Root the session directory is created under; overrides the
    /// configured root.
    pub output_location: Option<PathBuf>,
    /// Listing filters.
    pub exclusion: ExclusionFlags,
}

impl SessionRequest {
    /// A request over raw target input with an unbounded budget.
    #[must_use]
    pub fn new(target: &str, mode: CollectionMode) -> Self {
        Self {
            target: SessionTarget::parse(target),
            mode,
            sort_order: SortOrder::default(),
            page_budget: PageBudget::Unbounded,
            output_location: None,
            exclusion: ExclusionFlags::default(),
        }
    }

    /// Sets the sort order.
    #[must_use]
    pub fn with_sort_order(mut self, order: SortOrder) -> Self {
        self.sort_order = order;
        self
    }

    /// Sets the page budget.
    #[must_use]
    pub fn with_page_budget(mut self, budget: PageBudget) -> Self {
        self.page_budget = budget;
        self
    }

    /// Sets the output root.
    #[must_use]
    pub fn with_output_location(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_location = Some(root.into());
        self
    }

    /// Sets the listing filters.
    #[must_use]
    pub fn with_exclusion(mut self, exclusion: ExclusionFlags) -> Self {
        self.exclusion = exclusion;
        self
    }

    /// The options handed to the extractor.
    #[must_use]
    pub fn spec(&self) -> SessionSpec {
        SessionSpec {
            mode: self.mode,
            sort_order: self.sort_order,
            exclusion: self.exclusion,
        }
    }
}

/// Outcome of one session.
///
/// `success` is false only when the session never reached its target page
/// (or could not start). Every other failure is partial and described by
/// `report`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionResult {
    /// Whether the session reached its target and ran extraction.
    pub success: bool,
    /// Records persisted after deduplication.
    pub record_count: usize,
    /// The session directory, once created.
    pub output_location: Option<PathBuf>,
    /// Fatal error message.
    pub error: Option<String>,
    /// Fatal error kind.
    pub error_kind: Option<String>,
    /// Why extraction stopped.
    pub stop_reason: Option<StopReason>,
    /// Pages the extractor ran on.
    pub pages_visited: u32,
    /// Pages skipped after an extraction failure.
    pub pages_failed: u32,
    /// What final persistence achieved.
    pub report: PersistReport,
    /// Chunks flushed during extraction.
    pub chunks: Vec<ChunkRecord>,
}

impl SessionResult {
    /// A failed session.
    #[must_use]
    pub fn failed(error: &CrawlError, output_location: Option<PathBuf>) -> Self {
        Self {
            success: false,
            output_location,
            error: Some(error.to_string()),
            error_kind: Some(error.kind().to_string()),
            ..Self::default()
        }
    }

    /// Converts the result to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("success".to_string(), serde_json::json!(self.success));
        if self.success {
            map.insert("recordCount".to_string(), serde_json::json!(self.record_count));
            map.insert(
                "outputLocation".to_string(),
                serde_json::json!(self.output_location.as_ref().map(|p| p.display().to_string())),
            );
            map.insert(
                "stopReason".to_string(),
                serde_json::json!(self.stop_reason.as_ref().map(StopReason::as_str)),
            );
            map.insert("pagesVisited".to_string(), serde_json::json!(self.pages_visited));
            map.insert("report".to_string(), serde_json::json!(self.report.to_dict()));
        } else {
            map.insert("error".to_string(), serde_json::json!(self.error));
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_classifies_target() {
        let by_url = SessionRequest::new(
            "https://smartstore.naver.com/shop/products/42",
            CollectionMode::PrimaryItemCollection,
        );
        assert!(matches!(by_url.target, SessionTarget::Url(_)));

        let by_query = SessionRequest::new("wireless earbuds", CollectionMode::ThreadCollection)
            .with_page_budget(PageBudget::fixed(5))
            .with_sort_order(SortOrder::Recent);
        assert_eq!(by_query.target, SessionTarget::Query("wireless earbuds".to_string()));
        assert_eq!(by_query.page_budget.limit(), Some(5));
        assert_eq!(by_query.spec().sort_order, SortOrder::Recent);
    }

    #[test]
    fn test_failed_result_dict() {
        let result = SessionResult::failed(&CrawlError::navigation_timeout(120.0), None);
        let dict = result.to_dict();

        assert_eq!(dict["success"], false);
        assert!(dict["error"].as_str().unwrap().contains("120"));
        assert!(!dict.contains_key("recordCount"));
        assert_eq!(result.error_kind.as_deref(), Some("NavigationTimeout"));
    }

    #[test]
    fn test_success_result_dict() {
        let result = SessionResult {
            success: true,
            record_count: 24,
            output_location: Some(PathBuf::from("/data/results/reviews_x")),
            stop_reason: Some(StopReason::BudgetReached),
            ..SessionResult::default()
        };
        let dict = result.to_dict();

        assert_eq!(dict["recordCount"], 24);
        assert_eq!(dict["outputLocation"], "/data/results/reviews_x");
        assert_eq!(dict["stopReason"], "budget_reached");
    }

    #[test]
    fn test_exclusion_flags_default_off() {
        let flags: ExclusionFlags = serde_json::from_str("{}").unwrap();
        assert!(!flags.exclude_secret_threads);
    }
}
