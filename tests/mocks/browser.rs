use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};
use sound_spider_rs::{Browser, BrowserError};

#[derive(Clone)]
enum FakeDownload {
    /// The file appears finished as soon as the URL is visited.
    Complete { file_name: String },
    /// Only the in-progress partial file ever appears.
    Stuck { file_name: String },
}

/// A browser that serves canned pages and "downloads" by writing straight
/// into the download directory.
#[derive(Clone)]
pub struct MockBrowser {
    download_dir: PathBuf,
    pages: HashMap<String, String>,
    downloads: HashMap<String, FakeDownload>,
    current: Arc<Mutex<Option<String>>>,
    pub visited: Arc<Mutex<Vec<String>>>,
    pub clicks: Arc<Mutex<Vec<String>>>,
}

impl MockBrowser {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            pages: HashMap::new(),
            downloads: HashMap::new(),
            current: Arc::new(Mutex::new(None)),
            visited: Arc::new(Mutex::new(Vec::new())),
            clicks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    pub fn download(mut self, url: &str, file_name: &str) -> Self {
        self.downloads.insert(
            url.to_string(),
            FakeDownload::Complete {
                file_name: file_name.to_string(),
            },
        );
        self
    }

    pub fn stuck_download(mut self, url: &str, file_name: &str) -> Self {
        self.downloads.insert(
            url.to_string(),
            FakeDownload::Stuck {
                file_name: file_name.to_string(),
            },
        );
        self
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

impl Browser for MockBrowser {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.visited.lock().unwrap().push(url.to_string());

        if let Some(download) = self.downloads.get(url) {
            let name = match download {
                FakeDownload::Complete { file_name } => file_name.clone(),
                FakeDownload::Stuck { file_name } => format!("{file_name}.crdownload"),
            };
            fs::write(self.download_dir.join(name), b"ID3 fake audio").unwrap();
            return Ok(());
        }

        if self.pages.contains_key(url) {
            *self.current.lock().unwrap() = Some(url.to_string());
            Ok(())
        } else {
            Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "404 in mock".to_string(),
            })
        }
    }

    async fn page_source(&self) -> Result<String, BrowserError> {
        let current = self.current.lock().unwrap().clone();
        current
            .and_then(|url| self.pages.get(&url).cloned())
            .ok_or_else(|| BrowserError::Navigation {
                url: String::new(),
                reason: "no page loaded".to_string(),
            })
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        self.clicks.lock().unwrap().push(selector.to_string());
        Ok(())
    }

    async fn wait_for_load(&self, _timeout: Duration) -> Result<(), BrowserError> {
        Ok(())
    }
}
