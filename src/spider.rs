//! WebDriver-backed browser session.

use std::path::Path;
use std::time::Duration;

use serde_json::json;
use thirtyfour::common::capabilities::firefox::FirefoxPreferences;
use thirtyfour::extensions::cdp::ChromeDevTools;
use thirtyfour::{prelude::*, support, ChromiumLikeCapabilities};

use crate::browser::Browser;
use crate::config::{BrowserKind, Config};
use crate::error::BrowserError;

const READY_STATE_POLL: Duration = Duration::from_millis(250);

/// MIME types Firefox should save without asking.
const FIREFOX_SAVE_TYPES: &str =
    "audio/mpeg,audio/mp3,audio/wav,audio/x-wav,audio/flac,audio/mp4,audio/x-m4a,audio/ogg,application/octet-stream";

pub struct Spider {
    pub driver: WebDriver,
}

impl Spider {
    /// Starts a session on the configured WebDriver server with downloads
    /// going straight into `download_dir`.
    pub async fn launch(config: &Config, download_dir: &Path) -> Result<Self, BrowserError> {
        let dir = download_dir.to_string_lossy().into_owned();

        let driver = match config.browser {
            BrowserKind::Chrome => {
                let mut caps = DesiredCapabilities::chrome();
                if config.headless {
                    caps.add_arg("--headless=new")?;
                }
                caps.add_arg("--lang=en-US")?;
                caps.add_arg("--window-size=1400,1000")?;
                caps.add_experimental_option(
                    "prefs",
                    json!({
                        "download.default_directory": dir,
                        "download.prompt_for_download": false,
                        "safebrowsing.enabled": true,
                    }),
                )?;
                let driver = WebDriver::new(&config.webdriver_url, caps).await?;

                // Headless Chrome ignores the prefs above unless told explicitly.
                let dev_tools = ChromeDevTools::new(driver.handle.clone());
                if let Err(e) = dev_tools
                    .execute_cdp_with_params(
                        "Page.setDownloadBehavior",
                        json!({ "behavior": "allow", "downloadPath": dir }),
                    )
                    .await
                {
                    log::warn!("could not set download behavior via CDP: {e}");
                }
                driver
            }
            BrowserKind::Firefox => {
                let mut caps = DesiredCapabilities::firefox();
                if config.headless {
                    caps.set_headless()?;
                }
                caps.set_preferences(firefox_download_prefs(&dir)?)?;
                WebDriver::new(&config.webdriver_url, caps).await?
            }
        };

        log::info!(
            "{:?} session started on {} (headless: {})",
            config.browser,
            config.webdriver_url,
            config.headless
        );
        Ok(Self { driver })
    }

    pub async fn quit(self) -> Result<(), BrowserError> {
        self.driver.quit().await?;
        Ok(())
    }
}

/// Profile preferences that send every audio download to `dir` unprompted.
fn firefox_download_prefs(dir: &str) -> Result<FirefoxPreferences, BrowserError> {
    let mut prefs = FirefoxPreferences::new();
    prefs.set("browser.download.folderList", 2)?;
    prefs.set("browser.download.dir", dir)?;
    prefs.set("browser.download.useDownloadDir", true)?;
    prefs.set("browser.download.manager.showWhenStarting", false)?;
    prefs.set("browser.helperApps.neverAsk.saveToDisk", FIREFOX_SAVE_TYPES)?;
    prefs.set("intl.accept_languages", "en-US")?;
    Ok(prefs)
}

impl Browser for Spider {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.driver.goto(url).await?;
        Ok(())
    }

    async fn page_source(&self) -> Result<String, BrowserError> {
        Ok(self.driver.source().await?)
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let element = self
            .driver
            .find(By::Css(selector))
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element.scroll_into_view().await?;
        element.click().await?;
        Ok(())
    }

    async fn wait_for_load(&self, timeout: Duration) -> Result<(), BrowserError> {
        let started = std::time::Instant::now();
        loop {
            let ret = self
                .driver
                .execute("return document.readyState", Vec::new())
                .await?;
            if ret.json().as_str() == Some("complete") {
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(BrowserError::LoadTimeout(timeout));
            }
            support::sleep(READY_STATE_POLL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn firefox_prefs_point_downloads_at_dir() {
        let prefs = firefox_download_prefs("/tmp/pixabay_fire_alarm").unwrap();
        let value = serde_json::to_value(&prefs).unwrap();

        assert_eq!(value["browser.download.folderList"], 2);
        assert_eq!(value["browser.download.dir"], "/tmp/pixabay_fire_alarm");
        assert_eq!(value["browser.download.useDownloadDir"], true);
        let save_types = value["browser.helperApps.neverAsk.saveToDisk"]
            .as_str()
            .unwrap();
        assert!(save_types.contains("audio/mpeg"));
    }
}
