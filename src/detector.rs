//! Download completion detection.
//!
//! The browser gives no completion callback, so completion is inferred from the
//! download directory: a new audio file has appeared and no entry carries the
//! browser's in-progress marker any more. A file that is still growing without
//! a marker is indistinguishable from a finished one.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::snapshot::DirectorySnapshot;

/// Extensions treated as finished audio downloads.
pub const AUDIO_EXTENSIONS: [&str; 5] = [".mp3", ".wav", ".flac", ".m4a", ".ogg"];

pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct DetectorOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Suffix the browser puts on files it is still writing, e.g. `.crdownload`.
    pub in_progress_marker: String,
    pub extensions: Vec<String>,
}

impl DetectorOptions {
    pub fn new(in_progress_marker: impl Into<String>) -> Self {
        Self {
            timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            in_progress_marker: in_progress_marker.into(),
            extensions: AUDIO_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn is_audio(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.extensions
            .iter()
            .any(|ext| name.ends_with(&ext.to_lowercase()))
    }
}

/// A new, marker-free audio file found in the download directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl CompletedFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    Completed(CompletedFile),
    TimedOut { waited: Duration },
    Cancelled,
}

/// Polls `dir` until a download started after `baseline` was taken completes,
/// the timeout elapses, or `cancel` fires.
///
/// When several new audio files qualify, the most recently modified one wins
/// (ties broken by name). This is a best-effort attribution: files dropped into
/// the directory by someone else during the wait can be picked instead.
pub async fn wait_for_download(
    dir: &Path,
    baseline: &DirectorySnapshot,
    options: &DetectorOptions,
    cancel: &CancellationToken,
) -> Detection {
    let started = Instant::now();
    let deadline = started + options.timeout;

    loop {
        match DirectorySnapshot::capture(dir) {
            Ok(current) => {
                if let Some(found) = find_completed(dir, baseline, &current, options) {
                    log::debug!(
                        "download completed after {:?}: {}",
                        started.elapsed(),
                        found.path.display()
                    );
                    return Detection::Completed(found);
                }
            }
            Err(e) => log::warn!("could not list {}: {e}", dir.display()),
        }

        let now = Instant::now();
        if now >= deadline {
            return Detection::TimedOut {
                waited: now - started,
            };
        }

        let nap = options.poll_interval.min(deadline - now);
        tokio::select! {
            _ = cancel.cancelled() => return Detection::Cancelled,
            _ = tokio::time::sleep(nap) => {}
        }
    }
}

/// One poll: the newest new audio file, unless a download is still in progress.
pub fn find_completed(
    dir: &Path,
    baseline: &DirectorySnapshot,
    current: &DirectorySnapshot,
    options: &DetectorOptions,
) -> Option<CompletedFile> {
    if current.has_in_progress(&options.in_progress_marker) {
        return None;
    }

    current
        .added_since(baseline)
        .filter(|name| options.is_audio(name))
        .filter_map(|name| {
            let path = dir.join(name);
            let meta = path.metadata().ok().filter(|m| m.is_file())?;
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            Some(CompletedFile { path, modified })
        })
        .max_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fast_options() -> DetectorOptions {
        DetectorOptions::new(".crdownload")
            .with_timeout(Duration::from_millis(400))
            .with_poll_interval(Duration::from_millis(20))
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"data").unwrap();
    }

    #[tokio::test]
    async fn returns_the_single_new_audio_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.mp3");
        let baseline = DirectorySnapshot::capture(dir.path()).unwrap();
        touch(dir.path(), "b.wav");

        let detection = wait_for_download(
            dir.path(),
            &baseline,
            &fast_options(),
            &CancellationToken::new(),
        )
        .await;

        match detection {
            Detection::Completed(file) => assert_eq!(file.file_name(), "b.wav"),
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn waits_for_a_file_that_appears_later() {
        let dir = tempfile::tempdir().unwrap();
        let baseline = DirectorySnapshot::capture(dir.path()).unwrap();

        let path = dir.path().to_path_buf();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            fs::write(path.join("late.ogg"), b"data").unwrap();
        });

        let options = fast_options().with_timeout(Duration::from_secs(5));
        let detection =
            wait_for_download(dir.path(), &baseline, &options, &CancellationToken::new()).await;
        assert!(matches!(detection, Detection::Completed(f) if f.file_name() == "late.ogg"));
    }

    #[tokio::test]
    async fn in_progress_marker_blocks_until_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let baseline = DirectorySnapshot::capture(dir.path()).unwrap();
        touch(dir.path(), "done.mp3");
        touch(dir.path(), "other.mp3.crdownload");

        let detection = wait_for_download(
            dir.path(),
            &baseline,
            &fast_options(),
            &CancellationToken::new(),
        )
        .await;

        match detection {
            Detection::TimedOut { waited } => assert!(waited >= Duration::from_millis(400)),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn completes_once_the_marker_goes_away() {
        let dir = tempfile::tempdir().unwrap();
        let baseline = DirectorySnapshot::capture(dir.path()).unwrap();
        touch(dir.path(), "bell.mp3.crdownload");

        let path = dir.path().to_path_buf();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(80)).await;
            fs::rename(path.join("bell.mp3.crdownload"), path.join("bell.mp3")).unwrap();
        });

        let options = fast_options().with_timeout(Duration::from_secs(5));
        let detection =
            wait_for_download(dir.path(), &baseline, &options, &CancellationToken::new()).await;
        assert!(matches!(detection, Detection::Completed(f) if f.file_name() == "bell.mp3"));
    }

    #[tokio::test]
    async fn ignores_non_audio_and_preexisting_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "old.mp3");
        let baseline = DirectorySnapshot::capture(dir.path()).unwrap();
        touch(dir.path(), "cover.jpg");
        touch(dir.path(), "notes.txt");

        let detection = wait_for_download(
            dir.path(),
            &baseline,
            &fast_options(),
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(detection, Detection::TimedOut { .. }));
    }

    #[test]
    fn uppercase_extensions_count_as_audio() {
        let dir = tempfile::tempdir().unwrap();
        let baseline = DirectorySnapshot::default();
        touch(dir.path(), "LOUD.MP3");
        let current = DirectorySnapshot::capture(dir.path()).unwrap();

        let found = find_completed(dir.path(), &baseline, &current, &fast_options()).unwrap();
        assert_eq!(found.file_name(), "LOUD.MP3");
    }

    #[test]
    fn newest_of_several_new_files_wins() {
        let dir = tempfile::tempdir().unwrap();
        let baseline = DirectorySnapshot::default();
        let epoch = SystemTime::UNIX_EPOCH;
        for (name, secs) in [("first.mp3", 1_000), ("second.wav", 3_000), ("third.flac", 2_000)] {
            touch(dir.path(), name);
            fs::File::options()
                .write(true)
                .open(dir.path().join(name))
                .unwrap()
                .set_modified(epoch + Duration::from_secs(secs))
                .unwrap();
        }
        let current = DirectorySnapshot::capture(dir.path()).unwrap();

        let found = find_completed(dir.path(), &baseline, &current, &fast_options()).unwrap();
        assert_eq!(found.file_name(), "second.wav");
    }

    #[tokio::test]
    async fn cancellation_stops_the_wait() {
        let dir = tempfile::tempdir().unwrap();
        let baseline = DirectorySnapshot::capture(dir.path()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let options = fast_options().with_timeout(Duration::from_secs(30));
        let detection = wait_for_download(dir.path(), &baseline, &options, &cancel).await;
        assert_eq!(detection, Detection::Cancelled);
    }
}
