//! Voice sample cache
//!
//! Two-tier cache for encoded audio samples (e.g. synthesized voice clips or
//! downloaded background beds): an in-memory map in front of a folder of files.
//!
//! The cache is an ordinary value. Whoever needs it receives it explicitly;
//! there is no process-wide instance.
//!
//! The memory tier holds at most `DEFAULT_MEMORY_LIMIT_BYTES` unless
//! configured otherwise; the disk tier is unbounded.
//!
//! Disk entries are named by the SHA-256 hex digest of the key so arbitrary
//! keys (URLs, prompt text) map to safe file names.

use crate::Result;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

const ENTRY_EXTENSION: &str = "bin";

/// Default memory tier budget (256 MiB of encoded samples)
pub const DEFAULT_MEMORY_LIMIT_BYTES: usize = 256 * 1024 * 1024;

/// Memory + disk cache of encoded audio samples
///
/// The memory tier is bounded by a byte budget; once full, the oldest
/// entries are evicted first. Evicted samples stay available from disk.
#[derive(Debug)]
pub struct SampleCache {
    dir: PathBuf,
    memory_limit_bytes: usize,
    memory: RwLock<MemoryTier>,
}

#[derive(Debug, Default)]
struct MemoryTier {
    entries: HashMap<String, Arc<Vec<u8>>>,
    order: VecDeque<String>,
    bytes: usize,
}

impl MemoryTier {
    fn insert(&mut self, key: &str, sample: Arc<Vec<u8>>, limit: usize) {
        self.remove(key);
        if sample.len() > limit {
            debug!(key, bytes = sample.len(), limit, "Sample larger than memory budget, disk only");
            return;
        }

        while self.bytes + sample.len() > limit {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(evicted) = self.entries.remove(&oldest) {
                self.bytes -= evicted.len();
                debug!(key = %oldest, bytes = evicted.len(), "Evicted sample from memory tier");
            }
        }

        self.bytes += sample.len();
        self.order.push_back(key.to_string());
        self.entries.insert(key.to_string(), sample);
    }

    fn remove(&mut self, key: &str) {
        if let Some(old) = self.entries.remove(key) {
            self.bytes -= old.len();
            self.order.retain(|k| k != key);
        }
    }
}

impl SampleCache {
    /// Open (creating if needed) a cache rooted at `cache_dir`
    pub fn init<P: AsRef<Path>>(cache_dir: P) -> Result<Self> {
        let dir = cache_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Sample cache initialized");

        Ok(Self {
            dir,
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT_BYTES,
            memory: RwLock::new(MemoryTier::default()),
        })
    }

    /// Replace the memory tier byte budget (0 keeps everything on disk only)
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit_bytes = bytes;
        self
    }

    /// Folder holding the disk tier
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Look up a sample, checking memory first and then disk.
    ///
    /// Disk hits are promoted into the memory tier.
    pub fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        {
            let memory = self.memory.read().unwrap_or_else(|e| e.into_inner());
            if let Some(sample) = memory.entries.get(key) {
                debug!(key, "Sample cache memory hit");
                return Some(Arc::clone(sample));
            }
        }

        let path = self.entry_path(key);
        match std::fs::read(&path) {
            Ok(bytes) => {
                debug!(key, bytes = bytes.len(), "Sample cache disk hit");
                let sample = Arc::new(bytes);
                self.memory
                    .write()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(key, Arc::clone(&sample), self.memory_limit_bytes);
                Some(sample)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read cached sample");
                None
            }
        }
    }

    /// Store a sample in both tiers
    ///
    /// The memory tier is always updated; a disk write failure is returned
    /// to the caller.
    pub fn put(&self, key: &str, sample: Vec<u8>) -> Result<()> {
        let sample = Arc::new(sample);
        self.memory
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, Arc::clone(&sample), self.memory_limit_bytes);

        std::fs::write(self.entry_path(key), sample.as_slice())?;
        debug!(key, bytes = sample.len(), "Sample cached");
        Ok(())
    }

    /// Number of entries in the memory tier
    pub fn len(&self) -> usize {
        self.memory.read().unwrap_or_else(|e| e.into_inner()).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently held by the memory tier
    pub fn memory_bytes(&self) -> usize {
        self.memory.read().unwrap_or_else(|e| e.into_inner()).bytes
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir
            .join(format!("{:x}", digest))
            .with_extension(ENTRY_EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_folder() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested").join("cache");
        let cache = SampleCache::init(&dir).unwrap();

        assert!(dir.is_dir());
        assert_eq!(cache.dir(), dir.as_path());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_missing() {
        let root = tempfile::tempdir().unwrap();
        let cache = SampleCache::init(root.path()).unwrap();
        assert!(cache.get("https://example.com/a.wav").is_none());
    }

    #[test]
    fn test_put_then_get() {
        let root = tempfile::tempdir().unwrap();
        let cache = SampleCache::init(root.path()).unwrap();

        cache.put("voice:alloy:hello", vec![1, 2, 3, 4]).unwrap();
        let sample = cache.get("voice:alloy:hello").unwrap();

        assert_eq!(sample.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_disk_tier_survives_new_instance() {
        let root = tempfile::tempdir().unwrap();
        {
            let cache = SampleCache::init(root.path()).unwrap();
            cache.put("bgm/lofi.wav", vec![9; 16]).unwrap();
        }

        let reopened = SampleCache::init(root.path()).unwrap();
        assert!(reopened.is_empty());

        let sample = reopened.get("bgm/lofi.wav").unwrap();
        assert_eq!(sample.len(), 16);
        // Promoted into memory
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn test_entry_names_are_hashed() {
        let root = tempfile::tempdir().unwrap();
        let cache = SampleCache::init(root.path()).unwrap();
        cache.put("https://cdn.example.com/a b/c?d=1", vec![0]).unwrap();

        let names: Vec<String> = std::fs::read_dir(root.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();

        assert_eq!(names.len(), 1);
        // 64 hex chars + ".bin"
        assert_eq!(names[0].len(), 68);
        assert!(names[0].ends_with(".bin"));
    }

    #[test]
    fn test_memory_tier_evicts_oldest_over_budget() {
        let root = tempfile::tempdir().unwrap();
        let cache = SampleCache::init(root.path()).unwrap().with_memory_limit(10);

        cache.put("a", vec![1; 4]).unwrap();
        cache.put("b", vec![2; 4]).unwrap();
        assert_eq!(cache.memory_bytes(), 8);

        cache.put("c", vec![3; 4]).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.memory_bytes(), 8);

        // Evicted entry is still served from disk and promoted again
        assert_eq!(cache.get("a").unwrap().as_slice(), &[1; 4]);
        assert_eq!(cache.len(), 2);
        assert!(cache.memory_bytes() <= 10);
    }

    #[test]
    fn test_oversized_sample_stays_on_disk() {
        let root = tempfile::tempdir().unwrap();
        let cache = SampleCache::init(root.path()).unwrap().with_memory_limit(3);

        cache.put("big", vec![7; 8]).unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.memory_bytes(), 0);
        assert_eq!(cache.get("big").unwrap().len(), 8);
    }

    #[test]
    fn test_replacing_key_keeps_byte_count() {
        let root = tempfile::tempdir().unwrap();
        let cache = SampleCache::init(root.path()).unwrap();

        cache.put("k", vec![0; 6]).unwrap();
        cache.put("k", vec![0; 2]).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.memory_bytes(), 2);
    }
}
