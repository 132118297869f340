//! Bulk download of Pixabay sound effects through a driven browser.
//!
//! The browser only navigates; completion is detected by watching the
//! download directory ([`detector`]) and each finished file is renamed after
//! its scraped title ([`reconcile`]).

pub mod browser;
pub mod config;
pub mod detector;
pub mod error;
pub mod extract;
pub mod harvest;
pub mod reconcile;
pub mod report;
pub mod sanitize;
pub mod snapshot;
pub mod spider;
pub mod unique;

pub use browser::Browser;
pub use config::{BrowserKind, Config};
pub use error::{BrowserError, ItemError};
pub use harvest::{HarvestSummary, Harvester, ItemOutcome, ItemRecord};
