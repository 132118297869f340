//! The page → item → download → rename loop.
//!
//! Strictly sequential: one page, one item, one download at a time. Every
//! per-item failure is recorded and skipped; nothing here aborts the run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::browser::Browser;
use crate::config::Config;
use crate::detector::{wait_for_download, DetectorOptions, Detection};
use crate::error::{BrowserError, ItemError};
use crate::extract::{collect_detail_links, extract_target, search_page_url, DownloadTarget};
use crate::reconcile::{rename_completed, RenamedArtifact};
use crate::snapshot::DirectorySnapshot;

#[derive(Debug)]
pub enum ItemOutcome {
    /// Downloaded and renamed.
    Saved(RenamedArtifact),
    /// Downloaded, but the rename failed; the file keeps its browser-given name.
    Kept { path: PathBuf, error: ItemError },
    /// Did not match any configured keyword.
    Filtered,
    Failed(ItemError),
}

impl ItemOutcome {
    /// Whether a file was produced, renamed or not.
    pub fn is_download(&self) -> bool {
        matches!(self, ItemOutcome::Saved(_) | ItemOutcome::Kept { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ItemOutcome::Saved(_) => "saved",
            ItemOutcome::Kept { .. } => "kept",
            ItemOutcome::Filtered => "filtered",
            ItemOutcome::Failed(e) => e.kind(),
        }
    }

    pub fn file(&self) -> Option<&Path> {
        match self {
            ItemOutcome::Saved(artifact) => Some(&artifact.path),
            ItemOutcome::Kept { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ItemError> {
        match self {
            ItemOutcome::Kept { error, .. } | ItemOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ItemRecord {
    pub detail_url: String,
    pub title: String,
    pub source_url: String,
    pub outcome: ItemOutcome,
    pub finished_at: DateTime<Utc>,
}

impl ItemRecord {
    fn for_target(target: &DownloadTarget, outcome: ItemOutcome) -> Self {
        Self {
            detail_url: target.detail_url.clone(),
            title: target.title.clone(),
            source_url: target.source_url.clone(),
            outcome,
            finished_at: Utc::now(),
        }
    }

    fn failed(detail_url: &str, error: ItemError) -> Self {
        Self {
            detail_url: detail_url.to_string(),
            title: String::new(),
            source_url: String::new(),
            outcome: ItemOutcome::Failed(error),
            finished_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
pub struct HarvestSummary {
    pub records: Vec<ItemRecord>,
    pub pages_visited: u32,
    pub cancelled: bool,
}

impl HarvestSummary {
    pub fn saved(&self) -> impl Iterator<Item = &RenamedArtifact> {
        self.records.iter().filter_map(|r| match &r.outcome {
            ItemOutcome::Saved(artifact) => Some(artifact),
            _ => None,
        })
    }

    /// Files produced, including those whose rename failed.
    pub fn downloaded(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_download()).count()
    }

    pub fn kept(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Kept { .. }))
    }

    pub fn filtered(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Filtered))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.outcome)).count()
    }
}

pub struct Harvester<'a, B> {
    config: &'a Config,
    browser: &'a B,
    download_dir: PathBuf,
    detector: DetectorOptions,
    cancel: CancellationToken,
}

impl<'a, B: Browser> Harvester<'a, B> {
    pub fn new(
        config: &'a Config,
        browser: &'a B,
        download_dir: impl Into<PathBuf>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            browser,
            download_dir: download_dir.into(),
            detector: config.detector_options(),
            cancel,
        }
    }

    /// Visits the configured result pages and downloads what they link to,
    /// until the page range or `max_items` is exhausted or the run is cancelled.
    pub async fn run(&self) -> HarvestSummary {
        let mut summary = HarvestSummary::default();
        let mut consent_pending = self.config.consent_selector.is_some();

        log::info!(
            "harvesting '{}' pages {}..={} into {}",
            self.config.query,
            self.config.page_start,
            self.config.page_end,
            self.download_dir.display()
        );

        'pages: for page in self.config.page_start..=self.config.page_end {
            if summary.downloaded() >= self.config.max_items {
                break;
            }
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let url = search_page_url(&self.config.base_url, &self.config.query, page);
            let links = match self.open_search_page(&url, &mut consent_pending).await {
                Ok(links) => links,
                Err(e) => {
                    eprintln!("✗ Could not load result page {page}: {e}");
                    continue;
                }
            };
            summary.pages_visited += 1;
            println!("\n=== Page {page}: {} detail links ===", links.len());

            for (index, link) in links.iter().enumerate() {
                if summary.downloaded() >= self.config.max_items {
                    log::info!("reached max items ({})", self.config.max_items);
                    break 'pages;
                }
                if self.cancel.is_cancelled() {
                    summary.cancelled = true;
                    break 'pages;
                }

                println!("[{}/{}] {link}", index + 1, links.len());
                let record = self.process_item(link).await;
                report_item(&record);

                let cancelled = matches!(record.outcome, ItemOutcome::Failed(ItemError::Cancelled));
                let downloaded = record.outcome.is_download();
                summary.records.push(record);

                if cancelled {
                    summary.cancelled = true;
                    break 'pages;
                }
                if downloaded {
                    self.pause().await;
                }
            }
        }

        summary
    }

    /// Loads one search result page and returns the detail links on it.
    async fn open_search_page(
        &self,
        url: &str,
        consent_pending: &mut bool,
    ) -> Result<Vec<String>, BrowserError> {
        self.browser.navigate(url).await?;
        self.browser
            .wait_for_load(self.config.page_load_timeout())
            .await?;

        if *consent_pending {
            *consent_pending = false;
            if let Some(selector) = &self.config.consent_selector {
                match self.browser.click(selector).await {
                    Ok(()) => log::info!("dismissed consent banner via '{selector}'"),
                    Err(e) => log::debug!("no consent banner dismissed: {e}"),
                }
            }
        }

        self.pause().await;
        let html = self.browser.page_source().await?;
        Ok(collect_detail_links(&html, &self.config.site_origin()))
    }

    /// Handles one detail page end to end. Never fails; the outcome says how it went.
    pub async fn process_item(&self, detail_url: &str) -> ItemRecord {
        let target = match self.fetch_target(detail_url).await {
            Ok(target) => target,
            Err(e) => return ItemRecord::failed(detail_url, e),
        };

        if !target.matches_keywords(&self.config.keywords) {
            return ItemRecord::for_target(&target, ItemOutcome::Filtered);
        }

        let outcome = self.download(&target).await;
        ItemRecord::for_target(&target, outcome)
    }

    async fn fetch_target(&self, detail_url: &str) -> Result<DownloadTarget, ItemError> {
        self.browser.navigate(detail_url).await?;
        self.browser
            .wait_for_load(self.config.page_load_timeout())
            .await?;
        let html = self.browser.page_source().await?;
        extract_target(detail_url, &html)
    }

    async fn download(&self, target: &DownloadTarget) -> ItemOutcome {
        let baseline = match DirectorySnapshot::capture(&self.download_dir) {
            Ok(snapshot) => snapshot,
            Err(e) => return ItemOutcome::Failed(ItemError::Snapshot(e)),
        };

        log::debug!("triggering download of {}", target.source_url);
        // Drivers often report an error for navigations that turn into
        // downloads, so the directory is the only source of truth.
        if let Err(e) = self.browser.navigate(&target.source_url).await {
            log::debug!("navigation to {} reported: {e}", target.source_url);
        }

        match wait_for_download(&self.download_dir, &baseline, &self.detector, &self.cancel).await
        {
            Detection::Completed(file) => match rename_completed(
                &file,
                &target.title,
                target.extension_hint.as_deref(),
                target.hash_hint.as_deref(),
            ) {
                Ok(artifact) => ItemOutcome::Saved(artifact),
                Err(error) => ItemOutcome::Kept {
                    path: file.path,
                    error,
                },
            },
            Detection::TimedOut { waited } => ItemOutcome::Failed(ItemError::DownloadTimeout {
                source_url: target.source_url.clone(),
                waited,
            }),
            Detection::Cancelled => ItemOutcome::Failed(ItemError::Cancelled),
        }
    }

    async fn pause(&self) {
        let pause = self.config.pause();
        if pause.is_zero() {
            return;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(pause) => {}
        }
    }
}

fn report_item(record: &ItemRecord) {
    match &record.outcome {
        ItemOutcome::Saved(artifact) => println!(
            "  ✓ {} → {}",
            artifact.original_name,
            artifact
                .path
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default()
        ),
        ItemOutcome::Kept { path, error } => {
            eprintln!("  ⚠ {error}; kept as {}", path.display())
        }
        ItemOutcome::Filtered => println!("  ⏩ skip (title '{}')", record.title),
        ItemOutcome::Failed(error) => eprintln!("  ✗ {error}"),
    }
}
