//! Browser capability seam.
//!
//! The crate never talks a browser protocol itself. A driver implements
//! [`BrowserContext`] and [`BrowserTab`]; the session only ever sees tabs
//! through an owned [`TabHandle`].
//!
//! Event subscriptions are plain unbounded receivers. Dropping a receiver is
//! how a subscription is released, so drivers must treat a closed sender as
//! "nobody is listening any more".

mod handle;

pub use handle::TabHandle;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::errors::BrowserError;

/// A pagination control on the rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// The numbered button for a page.
    PageNumber(u32),
    /// The generic "next page" button.
    Next,
    /// Shifts the visible window of page numbers forward by one block.
    BlockForward,
    /// Shifts the visible window of page numbers back by one block.
    BlockBackward,
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageNumber(n) => write!(f, "page {n}"),
            Self::Next => f.write_str("next"),
            Self::BlockForward => f.write_str("block forward"),
            Self::BlockBackward => f.write_str("block backward"),
        }
    }
}

/// Whether a control can currently be activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlState {
    /// Not rendered.
    #[default]
    Absent,
    /// Rendered but disabled.
    Disabled,
    /// Rendered and clickable.
    Enabled,
}

impl ControlState {
    /// Returns true if the control can be clicked.
    #[must_use]
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// One browser page or tab.
#[async_trait]
pub trait BrowserTab: Send + Sync + fmt::Debug {
    /// Stable identifier of the tab within its browser context.
    fn id(&self) -> u64;

    /// Reads the tab's current location.
    async fn current_url(&self) -> Result<String, BrowserError>;

    /// Subscribes to main-frame navigations; each item is the new URL.
    fn navigation_events(&self) -> mpsc::UnboundedReceiver<String>;

    /// Brings the tab to the foreground.
    async fn bring_to_front(&self) -> Result<(), BrowserError>;

    /// Looks up a pagination control.
    async fn locate(&self, control: Control) -> Result<ControlState, BrowserError>;

    /// Clicks a control. Returns false if it was absent or disabled.
    async fn click(&self, control: Control) -> Result<bool, BrowserError>;

    /// Reads the "currently selected page" indicator, if one is rendered.
    async fn read_selected_page(&self) -> Result<Option<u32>, BrowserError>;
}

/// A browser context that can open tabs and announces tabs it creates.
#[async_trait]
pub trait BrowserContext: Send + Sync {
    /// Subscribes to tab creation, including tabs opened by the page itself.
    fn tab_events(&self) -> mpsc::UnboundedReceiver<Arc<dyn BrowserTab>>;

    /// Opens a new tab on `url`.
    async fn open_tab(&self, url: &str) -> Result<Arc<dyn BrowserTab>, BrowserError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_display() {
        assert_eq!(Control::PageNumber(7).to_string(), "page 7");
        assert_eq!(Control::BlockForward.to_string(), "block forward");
    }

    #[test]
    fn test_control_state() {
        assert!(ControlState::Enabled.is_enabled());
        assert!(!ControlState::Disabled.is_enabled());
        assert!(!ControlState::default().is_enabled());
    }
}
