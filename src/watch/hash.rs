use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let bytes = fs.read(path)?;
    let mut hasher = Hasher::new();
    hasher.update(&bytes);
    Ok(hasher.finalize().to_hex().to_string())
}

/// Abstract storage for per-file content hashes, keyed by source-relative path.
pub trait HashStore: Send + Sync {
    fn load(&self, rel_path: &str) -> Option<String>;
    fn save(&mut self, rel_path: &str, hash: &str);
    fn forget(&mut self, rel_path: &str);
}

/// Stores hashes in memory only. Hashes live for the process lifetime.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: HashMap<String, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, rel_path: &str) -> Option<String> {
        self.map.get(rel_path).cloned()
    }

    fn save(&mut self, rel_path: &str, hash: &str) {
        self.map.insert(rel_path.to_string(), hash.to_string());
        debug!(path = %rel_path, hash = %hash, "stored file hash");
    }

    fn forget(&mut self, rel_path: &str) {
        self.map.remove(rel_path);
    }
}
