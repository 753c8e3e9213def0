use crate::file::TMP_MARKER;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{error, info};
use walkdir::{DirEntry, WalkDir};

/// Temporary files younger than this may belong to a write still in flight.
const STALE_AFTER: Duration = Duration::from_secs(300);

pub(crate) async fn purge_tmp(root: &Path) {
    let root = root.to_path_buf();
    let now = SystemTime::now();
    let threshold = STALE_AFTER;

    match tokio::task::spawn_blocking(move || remove_stale(&root, now, threshold)).await {
        Ok((removed, failed)) if removed > 0 || failed > 0 => {
            info!(removed, failed, "Purged orphaned temporary records");
        },
        Err(e) => {
            error!(error = %e, "Temporary record purge task panicked");
        },
        _ => {},
    }
}

pub(crate) fn remove_stale(root: &Path, now: SystemTime, threshold: Duration) -> (usize, usize) {
    let mut removed = 0;
    let mut failed = 0;

    WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .flatten()
        .filter(|entry| is_tmp(entry) && is_stale(entry, now, threshold))
        .for_each(|entry| match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "Failed to purge temporary record");
                failed += 1;
            },
        });

    (removed, failed)
}

fn is_tmp(entry: &DirEntry) -> bool {
    if !entry.file_type().is_file() {
        return false;
    }
    entry
        .path()
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.contains(TMP_MARKER))
}

fn is_stale(entry: &DirEntry, now: SystemTime, threshold: Duration) -> bool {
    std::fs::metadata(entry.path())
        .ok()
        .and_then(|m| m.modified().ok())
        .and_then(|modified| now.duration_since(modified).ok())
        .map_or(true, |age| age > threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_stale_temporaries_are_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::write(root.join(format!("abcd.json{TMP_MARKER}7")), b"{}").unwrap();
        std::fs::write(root.join("abcd.json"), b"{}").unwrap();

        let (removed, failed) = remove_stale(root, SystemTime::now(), STALE_AFTER);
        assert_eq!((removed, failed), (0, 0), "fresh temporaries may still be in flight");

        let later = SystemTime::now() + STALE_AFTER * 2;
        let (removed, failed) = remove_stale(root, later, STALE_AFTER);
        assert_eq!((removed, failed), (1, 0));
        assert!(root.join("abcd.json").exists(), "committed records are never purged");
    }
}
