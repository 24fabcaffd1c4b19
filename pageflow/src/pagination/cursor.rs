//! Page cursor and page budget.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How many pages a session may visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageBudget {
    /// At most this many pages (at least 1).
    Fixed(u32),
    /// Until pagination is exhausted.
    #[default]
    Unbounded,
}

impl PageBudget {
    /// A fixed budget; zero is raised to one.
    #[must_use]
    pub fn fixed(pages: u32) -> Self {
        Self::Fixed(pages.max(1))
    }

    /// Returns true if `page` is within the budget.
    #[must_use]
    pub fn allows(&self, page: u32) -> bool {
        match self {
            Self::Fixed(limit) => page <= *limit,
            Self::Unbounded => true,
        }
    }

    /// Returns the limit, if any.
    #[must_use]
    pub fn limit(&self) -> Option<u32> {
        match self {
            Self::Fixed(limit) => Some(*limit),
            Self::Unbounded => None,
        }
    }
}

impl fmt::Display for PageBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{n} pages"),
            Self::Unbounded => f.write_str("all pages"),
        }
    }
}

/// Position of the extraction loop in the page sequence.
///
/// `current` starts at 1, only ever increases, and never passes the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    current: u32,
    budget: PageBudget,
    block_size: u32,
}

impl PageCursor {
    /// A cursor on page 1.
    #[must_use]
    pub fn new(budget: PageBudget, block_size: u32) -> Self {
        Self {
            current: 1,
            budget,
            block_size: block_size.max(1),
        }
    }

    /// The page currently displayed.
    #[must_use]
    pub fn current(&self) -> u32 {
        self.current
    }

    /// The page budget.
    #[must_use]
    pub fn budget(&self) -> PageBudget {
        self.budget
    }

    /// Size of a page-number block.
    #[must_use]
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// The page after the current one.
    #[must_use]
    pub fn next_target(&self) -> u32 {
        self.current.saturating_add(1)
    }

    /// Returns true if the budget forbids visiting another page.
    #[must_use]
    pub fn budget_exhausted(&self) -> bool {
        !self.budget.allows(self.next_target())
    }

    /// Zero-based block index containing `page`.
    #[must_use]
    pub fn block_of(&self, page: u32) -> u32 {
        page.saturating_sub(1) / self.block_size
    }

    /// Returns true if `page` opens its block.
    #[must_use]
    pub fn is_block_start(&self, page: u32) -> bool {
        page >= 1 && (page - 1) % self.block_size == 0
    }

    /// Moves to `page`.
    ///
    /// Refused (returning false) if it would move backwards, stay in place,
    /// or leave the budget.
    pub fn advance_to(&mut self, page: u32) -> bool {
        if page <= self.current || !self.budget.allows(page) {
            return false;
        }
        self.current = page;
        true
    }
}
