//! Run configuration, read once at start-up.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use url::Url;

use crate::detector::DetectorOptions;

/// Bulk-download Pixabay sound effects through a driven browser.
#[derive(Debug, Clone, Parser)]
#[command(name = "sound-spider", version, about)]
pub struct Config {
    /// Search term, e.g. "fire alarm"
    #[arg(long, default_value = "fire alarm")]
    pub query: String,

    /// Site root the search pages live under
    #[arg(long, default_value = "https://pixabay.com/en/")]
    pub base_url: String,

    /// First result page to visit
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page_start: u32,

    /// Last result page to visit (inclusive)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page_end: u32,

    /// Stop after this many downloads
    #[arg(long, default_value_t = 30_000)]
    pub max_items: usize,

    /// Where the browser saves files and where they are renamed
    /// [default: ~/Downloads/pixabay_<query>]
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Run the browser without a window
    #[arg(long, env = "HEADLESS")]
    pub headless: bool,

    #[arg(long, value_enum, default_value_t = BrowserKind::Chrome)]
    pub browser: BrowserKind,

    /// WebDriver server (chromedriver / geckodriver)
    #[arg(long, env = "WEBDRIVER_URL", default_value = "http://localhost:9515")]
    pub webdriver_url: String,

    /// Give up on a download after this many seconds
    #[arg(long, default_value_t = 60)]
    pub download_timeout_secs: u64,

    /// Download directory polling interval
    #[arg(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,

    #[arg(long, default_value_t = 15)]
    pub page_load_timeout_secs: u64,

    /// Pause after each successful download
    #[arg(long, default_value_t = 1000)]
    pub pause_ms: u64,

    /// Only download items whose title or tags contain one of these (repeatable)
    #[arg(long = "keyword")]
    pub keywords: Vec<String>,

    /// CSS selector of a cookie banner button to click once, best-effort
    #[arg(long)]
    pub consent_selector: Option<String>,

    /// Write a CSV line per processed item to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BrowserKind {
    Chrome,
    Firefox,
}

impl BrowserKind {
    /// Suffix the browser gives files it is still writing.
    pub fn in_progress_marker(self) -> &'static str {
        match self {
            BrowserKind::Chrome => ".crdownload",
            BrowserKind::Firefox => ".part",
        }
    }
}

impl Config {
    /// Rejects combinations clap cannot check on its own.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.page_start > self.page_end {
            anyhow::bail!(
                "--page-start ({}) must not be after --page-end ({})",
                self.page_start,
                self.page_end
            );
        }
        if self.query.trim().is_empty() {
            anyhow::bail!("--query must not be empty");
        }
        Url::parse(&self.base_url)
            .map_err(|e| anyhow::anyhow!("invalid --base-url '{}': {e}", self.base_url))?;
        Ok(())
    }

    /// The configured download directory, or `~/Downloads/pixabay_<query>`.
    pub fn resolved_download_dir(&self) -> PathBuf {
        if let Some(dir) = &self.download_dir {
            return dir.clone();
        }
        let slug = self
            .query
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase();
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        home.join("Downloads").join(format!("pixabay_{slug}"))
    }

    /// Scheme and host of `base_url`, used to resolve relative links.
    pub fn site_origin(&self) -> String {
        Url::parse(&self.base_url)
            .map(|u| u.origin().ascii_serialization())
            .unwrap_or_else(|_| self.base_url.trim_end_matches('/').to_string())
    }

    pub fn detector_options(&self) -> DetectorOptions {
        DetectorOptions::new(self.browser.in_progress_marker())
            .with_timeout(Duration::from_secs(self.download_timeout_secs))
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms.max(1)))
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}
