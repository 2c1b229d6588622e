// lectern-common/src/cache.rs
// Raw file store under the cache directory. Higher-level snapshot semantics
// live in lectern-core.
use std::fs;
use std::path::{Path, PathBuf};

use super::config::Config;
use super::error::{LecternError, Result};

pub struct Cache {
    cache_dir: PathBuf,
}

impl Cache {
    pub fn new(config: &Config) -> Result<Self> {
        let cache_dir = config.cache_dir();
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir)?;
        }
        Ok(Self { cache_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Stores raw string data in the cache.
    pub fn store_raw(&self, filename: &str, data: &str) -> Result<()> {
        let path = self.cache_dir.join(filename);
        tracing::debug!("Saving raw data to cache file: {:?}", path);
        fs::write(&path, data)?;
        Ok(())
    }

    /// Loads raw string data from the cache.
    pub fn load_raw(&self, filename: &str) -> Result<String> {
        let path = self.cache_dir.join(filename);
        tracing::debug!("Loading raw data from cache file: {:?}", path);
        if !path.exists() {
            return Err(LecternError::Cache(format!(
                "Cache file {filename} does not exist"
            )));
        }
        fs::read_to_string(&path).map_err(|e| LecternError::Cache(format!("IO error: {e}")))
    }
}
