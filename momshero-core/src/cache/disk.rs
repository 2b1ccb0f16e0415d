//! On-disk tier: one JSON record per key.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::types::CallKind;

/// Persisted form of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub timestamp: DateTime<Utc>,
    pub call_kind: CallKind,
    pub prompt: String,
    pub result: String,
}

#[derive(Debug, Clone)]
pub struct DiskTier {
    cache_dir: PathBuf,
}

impl DiskTier {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Default cache directory: ~/.momshero/llm-cache
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".momshero").join("llm-cache"))
            .unwrap_or_else(|| PathBuf::from(".cache/llm-cache"))
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Format: {cache_dir}/{hash[0:2]}/{hash}.json
    fn record_path(&self, hash: &str) -> PathBuf {
        let shard = hash.get(..2).unwrap_or(hash);
        self.cache_dir.join(shard).join(format!("{hash}.json"))
    }

    pub fn read(&self, hash: &str) -> Result<Option<CacheRecord>, CacheError> {
        let path = self.record_path(hash);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Write through a temp file and rename, so readers never see a partial record.
    pub fn write(&self, hash: &str, record: &CacheRecord) -> Result<(), CacheError> {
        let path = self.record_path(hash);
        let parent = path.parent().unwrap_or(&self.cache_dir);
        fs::create_dir_all(parent)?;

        let json = serde_json::to_string_pretty(record)?;
        let tmp = parent.join(format!(".{hash}.{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Remove a record. Missing records are not an error.
    pub fn remove(&self, hash: &str) -> Result<(), CacheError> {
        match fs::remove_file(self.record_path(hash)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Hashes of every record file on disk.
    pub fn hashes(&self) -> Vec<String> {
        let mut hashes = Vec::new();
        collect_hashes(&self.cache_dir, &mut hashes);
        hashes
    }

    pub fn count(&self) -> usize {
        self.hashes().len()
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }
}

fn collect_hashes(dir: &Path, hashes: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            collect_hashes(&path, hashes);
        } else if path.extension().is_some_and(|ext| ext == "json") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                hashes.push(stem.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(result: &str) -> CacheRecord {
        CacheRecord {
            timestamp: Utc::now(),
            call_kind: CallKind::Substitution,
            prompt: "用戶想做：蔥油拌飯".to_string(),
            result: result.to_string(),
        }
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let tier = DiskTier::new(dir.path().to_path_buf());

        tier.write("abcdef", &record("用鹽替代醬油")).unwrap();

        assert!(dir.path().join("ab").join("abcdef.json").exists());
        assert_eq!(tier.read("abcdef").unwrap().unwrap().result, "用鹽替代醬油");
        assert_eq!(tier.hashes(), vec!["abcdef"]);
    }

    #[test]
    fn test_missing_record() {
        let dir = TempDir::new().unwrap();
        let tier = DiskTier::new(dir.path().to_path_buf());
        assert!(tier.read("ffff").unwrap().is_none());
        tier.remove("ffff").unwrap();
        assert_eq!(tier.count(), 0);
    }

    #[test]
    fn test_corrupt_record_is_an_error() {
        let dir = TempDir::new().unwrap();
        let tier = DiskTier::new(dir.path().to_path_buf());
        fs::create_dir_all(dir.path().join("12")).unwrap();
        fs::write(dir.path().join("12").join("1234.json"), "{not json").unwrap();

        assert!(matches!(
            tier.read("1234"),
            Err(CacheError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let tier = DiskTier::new(dir.path().join("cache"));
        tier.write("aa01", &record("x")).unwrap();
        tier.write("bb02", &record("y")).unwrap();
        assert_eq!(tier.count(), 2);

        tier.clear().unwrap();
        assert_eq!(tier.count(), 0);
    }

    #[test]
    fn test_record_format() {
        let json = serde_json::to_value(record("r")).unwrap();
        assert_eq!(json["call_kind"], "substitution");
        assert!(json["timestamp"].is_string());
        assert_eq!(json["result"], "r");
    }
}
