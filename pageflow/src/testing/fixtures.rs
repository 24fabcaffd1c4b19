//! Record and configuration fixtures.

use crate::config::{CrawlConfig, NavigationConfig, PaginationConfig, SiteProfile, StorageConfig};
use crate::records::{CollectionMode, Record};

/// A product page recognised by [`fast_config`].
pub const PRODUCT_URL: &str = "https://smartstore.naver.com/shop/products/42";

/// A record whose identity depends only on `page` and `index`.
#[must_use]
pub fn sample_record(mode: CollectionMode, page: u32, index: usize) -> Record {
    match mode {
        CollectionMode::PrimaryItemCollection => Record::new()
            .with_field("Reviewer Name", format!("reviewer-{page}-{index}"))
            .with_field("Review Date", format!("25.10.{:02}.", page % 28 + 1))
            .with_field("Review Score", "5")
            .with_field("Content", format!("review {page}-{index}"))
            .with_field(
                "Photos",
                vec![format!("photos/review_page{page}_{}_photo_1.jpg", index + 1)],
            ),
        CollectionMode::ThreadCollection => Record::new()
            .with_field("answerStatus", "답변완료")
            .with_field("title", format!("question {page}-{index}"))
            .with_field("author", format!("buyer-{page}-{index}"))
            .with_field("date", "2025.10.30.")
            .with_field("question", format!("does item {page}-{index} ship today?"))
            .with_field("answer", "yes")
            .with_field("answerAuthor", "seller")
            .with_field("answerDate", "2025.10.31."),
    }
}

/// `count` distinct records for one page.
#[must_use]
pub fn sample_page(mode: CollectionMode, page: u32, count: usize) -> Vec<Record> {
    (0..count).map(|index| sample_record(mode, page, index)).collect()
}

/// Defaults with every delay shortened, writing under `root`.
#[must_use]
pub fn fast_config(root: &str) -> CrawlConfig {
    let navigation = NavigationConfig {
        arrival_timeout_secs: 30.0,
        page_ready_timeout_secs: 5.0,
        page_ready_interval_ms: 100,
        ..NavigationConfig::default()
    };
    CrawlConfig::new()
        .with_navigation(navigation)
        .with_pagination(
            PaginationConfig::default()
                .with_delay_range_ms(0, 0)
                .with_block_settle_ms(0)
                .with_verification(2, 10),
        )
        .with_storage(StorageConfig::default().with_base_name("reviews").with_root_dir(root))
        .with_site(SiteProfile::default())
}
