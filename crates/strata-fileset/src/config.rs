use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FilesetError, FilesetResult};

/// Tuning for fileset storage and compaction.
///
/// Fixed when a [`Storage`](crate::Storage) is built and read-only after.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesetConfig {
    /// Minimum size ratio between adjacent compacted layers.
    pub level_factor: i64,
    /// Most references (or shards) combined in one distributed step.
    pub max_fan_in: usize,
    /// A shard is closed once its entries reach this many bytes.
    pub shard_size_threshold: i64,
    /// A shard is closed once it holds this many entries.
    pub shard_count_threshold: usize,
    /// TTL given to intermediate results, in seconds.
    pub default_ttl_secs: u64,
    /// Number of tasks a pooled worker runs at once.
    pub worker_concurrency: usize,
}

impl Default for FilesetConfig {
    fn default() -> Self {
        Self {
            level_factor: 10,
            max_fan_in: 10,
            shard_size_threshold: 64 * 1024 * 1024,
            shard_count_threshold: 10_000,
            default_ttl_secs: 600,
            worker_concurrency: 4,
        }
    }
}

impl FilesetConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> FilesetResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| FilesetError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> FilesetResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| FilesetError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// Reject values the compaction algorithms cannot run with.
    pub fn validate(&self) -> FilesetResult<()> {
        if self.level_factor < 1 {
            return Err(FilesetError::Config(format!(
                "level_factor must be at least 1, got {}",
                self.level_factor
            )));
        }
        if self.max_fan_in < 2 {
            return Err(FilesetError::Config(format!(
                "max_fan_in must be at least 2, got {}",
                self.max_fan_in
            )));
        }
        if self.shard_size_threshold < 1 || self.shard_count_threshold < 1 {
            return Err(FilesetError::Config("shard thresholds must be positive".into()));
        }
        if self.worker_concurrency < 1 {
            return Err(FilesetError::Config("worker_concurrency must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let c = FilesetConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.level_factor, 10);
        assert_eq!(c.max_fan_in, 10);
        assert_eq!(c.default_ttl(), Duration::from_secs(600));
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let c = FilesetConfig::from_toml_str("level_factor = 4\nmax_fan_in = 3\n").unwrap();
        assert_eq!(c.level_factor, 4);
        assert_eq!(c.max_fan_in, 3);
        assert_eq!(c.shard_count_threshold, 10_000);
    }

    #[test]
    fn rejects_fan_in_below_two() {
        let err = FilesetConfig::from_toml_str("max_fan_in = 1").unwrap_err();
        assert!(err.to_string().contains("max_fan_in"));
    }

    #[test]
    fn rejects_zero_level_factor() {
        let c = FilesetConfig {
            level_factor: 0,
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(FilesetError::Config(_))));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            FilesetConfig::from_toml_str("level_factor = \"ten\""),
            Err(FilesetError::Config(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "shard_size_threshold = 1024").unwrap();
        writeln!(file, "worker_concurrency = 8").unwrap();
        let c = FilesetConfig::load(file.path()).unwrap();
        assert_eq!(c.shard_size_threshold, 1024);
        assert_eq!(c.worker_concurrency, 8);
    }

    #[test]
    fn load_missing_file_fails() {
        let err = FilesetConfig::load(Path::new("/nonexistent/strata.toml")).unwrap_err();
        assert!(matches!(err, FilesetError::Config(_)));
    }
}
