//! Exclusive ownership of the session's active tab.

use std::ops::Deref;
use std::sync::Arc;

use super::BrowserTab;

/// The session's active tab.
///
/// Deliberately not `Clone`: whoever holds the handle is the only component
/// allowed to drive navigation on the tab. The navigator returns it on
/// arrival and the extraction loop takes it by value.
#[derive(Debug)]
pub struct TabHandle {
    tab: Arc<dyn BrowserTab>,
}

impl TabHandle {
    /// Takes ownership of a tab.
    #[must_use]
    pub fn new(tab: Arc<dyn BrowserTab>) -> Self {
        Self { tab }
    }

    /// Identifier of the underlying tab.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.tab.id()
    }

    /// Releases the handle back into a shared tab reference.
    #[must_use]
    pub fn into_inner(self) -> Arc<dyn BrowserTab> {
        self.tab
    }
}

impl Deref for TabHandle {
    type Target = dyn BrowserTab;

    fn deref(&self) -> &Self::Target {
        self.tab.as_ref()
    }
}
