//! The browser capabilities the harvest needs.

use std::future::Future;
use std::time::Duration;

use crate::error::BrowserError;

/// A driven browser session, one page at a time.
///
/// [`Spider`](crate::spider::Spider) implements this over WebDriver; tests
/// substitute a fake that writes files into the download directory itself.
pub trait Browser {
    /// Navigates to `url`. For a direct file URL this starts a download.
    fn navigate(&self, url: &str) -> impl Future<Output = Result<(), BrowserError>>;

    /// Fully rendered markup of the current page.
    fn page_source(&self) -> impl Future<Output = Result<String, BrowserError>>;

    /// Clicks the first element matching a CSS selector.
    fn click(&self, selector: &str) -> impl Future<Output = Result<(), BrowserError>>;

    /// Waits until the current document reports it has finished loading.
    fn wait_for_load(&self, timeout: Duration)
        -> impl Future<Output = Result<(), BrowserError>>;
}
