//! Collision-free target paths.

use std::path::{Path, PathBuf};

/// Numbered candidates tried before falling back to a timestamp suffix.
pub const MAX_NUMBERED_ATTEMPTS: u32 = 998;

/// Returns `path` if nothing exists there, otherwise the first free
/// `stem(n).ext` for `n` in `1..=MAX_NUMBERED_ATTEMPTS`.
///
/// When all numbered names are taken, appends the current Unix time in seconds
/// (`stem_<secs>.ext`), adding `_<n>` on top if even that is taken.
pub fn make_unique_path(path: &Path) -> PathBuf {
    make_unique_path_at(path, chrono::Utc::now().timestamp())
}

fn make_unique_path_at(path: &Path, unix_secs: i64) -> PathBuf {
    if !exists(path) {
        return path.to_path_buf();
    }

    let (stem, ext) = split_name(path);
    for i in 1..=MAX_NUMBERED_ATTEMPTS {
        let candidate = path.with_file_name(format!("{stem}({i}){ext}"));
        if !exists(&candidate) {
            return candidate;
        }
    }

    log::warn!(
        "{MAX_NUMBERED_ATTEMPTS} numbered names taken for {}, using timestamp suffix",
        path.display()
    );
    let stamped = path.with_file_name(format!("{stem}_{unix_secs}{ext}"));
    if !exists(&stamped) {
        return stamped;
    }
    let mut n: u64 = 1;
    loop {
        let candidate = path.with_file_name(format!("{stem}_{unix_secs}_{n}{ext}"));
        if !exists(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Existence check that also counts dangling symlinks as taken.
fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

fn split_name(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn free_path_is_returned_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("siren.mp3");
        assert_eq!(make_unique_path(&target), target);
    }

    #[test]
    fn numbered_suffixes_increment() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "siren.mp3");
        let target = dir.path().join("siren.mp3");
        assert_eq!(make_unique_path(&target), dir.path().join("siren(1).mp3"));

        touch(dir.path(), "siren(1).mp3");
        assert_eq!(make_unique_path(&target), dir.path().join("siren(2).mp3"));
    }

    #[test]
    fn result_never_matches_an_existing_entry() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["bell.wav", "bell(1).wav", "bell(3).wav"] {
            touch(dir.path(), name);
        }
        let resolved = make_unique_path(&dir.path().join("bell.wav"));
        assert_eq!(resolved, dir.path().join("bell(2).wav"));

        let existing: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert!(!existing.contains(&resolved));
    }

    #[test]
    fn names_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "clip");
        assert_eq!(
            make_unique_path(&dir.path().join("clip")),
            dir.path().join("clip(1)")
        );
    }

    #[test]
    fn falls_back_to_timestamp_when_numbers_run_out() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "alarm.ogg");
        for i in 1..=MAX_NUMBERED_ATTEMPTS {
            touch(dir.path(), &format!("alarm({i}).ogg"));
        }
        let target = dir.path().join("alarm.ogg");
        assert_eq!(
            make_unique_path_at(&target, 1_700_000_000),
            dir.path().join("alarm_1700000000.ogg")
        );

        touch(dir.path(), "alarm_1700000000.ogg");
        assert_eq!(
            make_unique_path_at(&target, 1_700_000_000),
            dir.path().join("alarm_1700000000_1.ogg")
        );
    }
}
