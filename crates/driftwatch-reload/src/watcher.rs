//! mtime-then-hash change detection (spec.md §4.10): a modification-time
//! touch with unchanged content is a no-op, so a full parse only runs when
//! the bytes genuinely changed. Grounded in the pack's config-snapshot
//! examples (`penserai-acteon` config-snapshot.rs, `nearcore`
//! client_config.rs), both of which hash before committing to a reparse.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

pub struct FileWatcher {
    path: PathBuf,
    last_mtime: Mutex<Option<SystemTime>>,
    last_hash: Mutex<Option<[u8; 32]>>,
}

impl FileWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_mtime: Mutex::new(None),
            last_hash: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `Some(bytes)` if the file's content hash changed since the
    /// last call that returned `Some`, `None` if mtime hasn't advanced or
    /// advanced without a content change (a touch, not an edit).
    pub async fn poll(&self) -> std::io::Result<Option<Vec<u8>>> {
        let metadata = tokio::fs::metadata(&self.path).await?;
        let mtime = metadata.modified()?;

        {
            let last_mtime = self.last_mtime.lock().await;
            if matches!(*last_mtime, Some(last) if mtime <= last) {
                return Ok(None);
            }
        }

        let bytes = tokio::fs::read(&self.path).await?;
        let digest: [u8; 32] = Sha256::digest(&bytes).into();

        *self.last_mtime.lock().await = Some(mtime);

        let mut last_hash = self.last_hash.lock().await;
        if last_hash.as_ref() == Some(&digest) {
            return Ok(None);
        }
        *last_hash = Some(digest);
        Ok(Some(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn first_poll_of_an_existing_file_returns_its_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();
        let watcher = FileWatcher::new(file.path());

        let bytes = watcher.poll().await.unwrap();
        assert_eq!(bytes, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn unchanged_content_after_mtime_touch_is_a_no_op() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();
        let watcher = FileWatcher::new(file.path());
        assert!(watcher.poll().await.unwrap().is_some());

        // Touch mtime forward without changing content.
        let future = SystemTime::now() + std::time::Duration::from_secs(2);
        file.as_file().set_modified(future).unwrap();

        assert_eq!(watcher.poll().await.unwrap(), None);
    }

    #[tokio::test]
    async fn changed_content_is_reported_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"v1").unwrap();
        let watcher = FileWatcher::new(file.path());
        assert!(watcher.poll().await.unwrap().is_some());

        let future = SystemTime::now() + std::time::Duration::from_secs(2);
        file.as_file().set_len(0).unwrap();
        use std::io::Seek;
        file.as_file().seek(std::io::SeekFrom::Start(0)).unwrap();
        file.write_all(b"v2").unwrap();
        file.as_file().set_modified(future).unwrap();

        let bytes = watcher.poll().await.unwrap();
        assert_eq!(bytes, Some(b"v2".to_vec()));
        assert_eq!(watcher.poll().await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_file_surfaces_an_io_error() {
        let watcher = FileWatcher::new("/nonexistent/driftwatch-reload-test.yaml");
        assert!(watcher.poll().await.is_err());
    }
}
