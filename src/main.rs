// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use futures::FutureExt;
use sound_spider_rs::report::write_report;
use sound_spider_rs::spider::Spider;
use sound_spider_rs::{Config, HarvestSummary, Harvester};
use std::fs;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use tokio_util::sync::CancellationToken;

fn print_summary(summary: &HarvestSummary, download_dir: &Path) {
    println!("\n=== Harvest complete! ===\n");
    if summary.cancelled {
        println!("Run was interrupted before the page range was exhausted.");
    }
    println!("Result pages visited: {}", summary.pages_visited);
    println!("Items processed: {}", summary.records.len());
    println!("Files downloaded: {}", summary.downloaded());
    println!("  renamed: {}", summary.saved().count());
    println!("  kept under browser name: {}", summary.kept());
    println!("Skipped by keyword filter: {}", summary.filtered());
    println!("Failed items: {}", summary.failed());
    println!("Saved to: {}", download_dir.display());
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    config.validate()?;

    let download_dir = config.resolved_download_dir();
    fs::create_dir_all(&download_dir).with_context(|| {
        format!(
            "Failed to create download directory {}",
            download_dir.display()
        )
    })?;
    // The browser needs an absolute path for its download preference.
    let download_dir = fs::canonicalize(&download_dir).unwrap_or(download_dir);

    if config.headless {
        println!("Running in headless mode");
    } else {
        println!("Running in normal (visible) mode. Pass --headless or set HEADLESS=true to hide the browser.");
    }
    println!(
        "▶ '{}' pages {}..={}, at most {} items",
        config.query, config.page_start, config.page_end, config.max_items
    );

    let spider = Spider::launch(&config, &download_dir)
        .await
        .with_context(|| {
            format!(
                "Could not start a {:?} session via {}. Is the WebDriver server running?",
                config.browser, config.webdriver_url
            )
        })?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, stopping after the current step...");
            on_interrupt.cancel();
        }
    });

    let outcome = {
        let harvester = Harvester::new(&config, &spider, &download_dir, cancel);
        AssertUnwindSafe(harvester.run()).catch_unwind().await
    };

    // The session is closed on every path out of the run, panics included.
    if let Err(e) = spider.quit().await {
        log::warn!("browser session did not shut down cleanly: {e}");
    }
    let summary = match outcome {
        Ok(summary) => summary,
        Err(panic) => std::panic::resume_unwind(panic),
    };

    if let Some(report_path) = &config.report {
        match write_report(report_path, &summary.records) {
            Ok(()) => println!("CSV report saved to: {}", report_path.display()),
            Err(e) => log::error!("{e:#}"),
        }
    }

    print_summary(&summary, &download_dir);
    Ok(())
}
