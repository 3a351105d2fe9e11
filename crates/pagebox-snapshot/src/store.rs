use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::SnapshotError;
use crate::snapshot::PageSnapshot;

static WRITE_NONCE: AtomicU64 = AtomicU64::new(0);

/// Postcard-encoded snapshots on disk, one file per key.
///
/// Writes go to a temporary file that is renamed into place, so readers never
/// observe a partial snapshot.
#[derive(Clone, Debug)]
pub struct FileSnapshotStore {
    root: PathBuf,
    max_file_bytes: usize,
}

impl FileSnapshotStore {
    pub const DEFAULT_MAX_FILE_BYTES: usize = 4 * 1024 * 1024;

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_file_bytes: Self::DEFAULT_MAX_FILE_BYTES,
        }
    }

    pub fn with_max_file_bytes(mut self, max_file_bytes: usize) -> Self {
        self.max_file_bytes = max_file_bytes.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File for `key`: a readable sanitised stem plus a hash of the raw key,
    /// so keys that sanitise alike still get distinct files.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{safe}-{:016x}.page", key_hash(key.as_bytes())))
    }

    pub fn store(&self, key: &str, snapshot: &PageSnapshot) -> Result<PathBuf, SnapshotError> {
        let bytes = snapshot.to_postcard()?;
        if bytes.len() > self.max_file_bytes {
            return Err(SnapshotError::TooLarge {
                actual: bytes.len(),
                limit: self.max_file_bytes,
            });
        }
        fs::create_dir_all(&self.root)?;
        let final_path = self.path_for(key);
        let nonce = WRITE_NONCE.fetch_add(1, Ordering::Relaxed);
        let temp_path = self
            .root
            .join(format!(".{}.tmp-{}-{}", key.len(), std::process::id(), nonce));

        let result = (|| -> Result<(), SnapshotError> {
            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&temp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            drop(file);
            fs::rename(&temp_path, &final_path)?;
            Ok(())
        })();
        if let Err(err) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(err);
        }
        log::debug!("stored snapshot {} ({} bytes)", final_path.display(), bytes.len());
        Ok(final_path)
    }

    /// Load a stored snapshot. A missing file is `Ok(None)`.
    pub fn load(&self, key: &str) -> Result<Option<PageSnapshot>, SnapshotError> {
        let path = self.path_for(key);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let limit = self.max_file_bytes as u64;
        let mut payload = Vec::with_capacity(8);
        file.take(limit.saturating_add(1)).read_to_end(&mut payload)?;
        if payload.len() > self.max_file_bytes {
            return Err(SnapshotError::TooLarge {
                actual: payload.len(),
                limit: self.max_file_bytes,
            });
        }
        PageSnapshot::from_postcard(&payload).map(Some)
    }

    /// Remove a stored snapshot. Removing a missing key is not an error.
    pub fn remove(&self, key: &str) -> Result<(), SnapshotError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn key_hash(payload: &[u8]) -> u64 {
    let mut hash = 0xcbf29ce484222325u64;
    for b in payload {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}
