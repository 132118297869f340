//! Point-in-time listings of the download directory.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

/// File names present in a directory at one moment. Names only, no metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySnapshot {
    names: BTreeSet<String>,
}

impl DirectorySnapshot {
    /// Lists the direct entries of `dir`. Names that are not valid UTF-8 are
    /// converted lossily.
    pub fn capture(dir: &Path) -> io::Result<Self> {
        let mut names = BTreeSet::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(Self { names })
    }

    /// Names present here but not in `baseline`, in sorted order.
    pub fn added_since<'a>(
        &'a self,
        baseline: &'a DirectorySnapshot,
    ) -> impl Iterator<Item = &'a str> {
        self.names.difference(&baseline.names).map(String::as_str)
    }

    /// Whether any entry still carries the browser's in-progress marker.
    pub fn has_in_progress(&self, marker: &str) -> bool {
        let marker = marker.to_lowercase();
        self.names.iter().any(|n| n.to_lowercase().ends_with(&marker))
    }
}

impl<S: Into<String>> FromIterator<S> for DirectorySnapshot {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
impl DirectorySnapshot {
    fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    fn len(&self) -> usize {
        self.names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_lists_directory_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.mp3"), b"a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let snap = DirectorySnapshot::capture(dir.path()).unwrap();
        assert_eq!(snap.len(), 2);
        assert!(snap.contains("a.mp3"));
        assert!(snap.contains("sub"));
    }

    #[test]
    fn capture_of_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DirectorySnapshot::capture(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn diff_against_baseline() {
        let baseline: DirectorySnapshot = ["a.mp3"].into_iter().collect();
        let current: DirectorySnapshot = ["a.mp3", "b.wav", "c.txt"].into_iter().collect();
        let added: Vec<_> = current.added_since(&baseline).collect();
        assert_eq!(added, vec!["b.wav", "c.txt"]);
    }

    #[test]
    fn marker_detection_is_case_insensitive() {
        let snap: DirectorySnapshot = ["x.mp3", "Unconfirmed 1.CRDOWNLOAD"].into_iter().collect();
        assert!(snap.has_in_progress(".crdownload"));
        assert!(!snap.has_in_progress(".part"));
    }
}
