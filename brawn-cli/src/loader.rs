//! Filesystem-backed data source.
use std::fs;
use std::path::{Path, PathBuf};

use brawn_levels::{AvgWeights, BundledData, DataLoader, StandardsConfig, StandardsDocument};
use thiserror::Error;

pub const STANDARDS_FILE: &str = "standards.json";
pub const AVG_WEIGHTS_FILE: &str = "avg-weights.json";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Bundled(#[from] brawn_levels::LevelsError),
}

/// Reads standards and average weights from a directory, falling back to the
/// bundled assets when no directory is given. An optional JSON file supplies
/// configuration overrides.
#[derive(Debug, Clone, Default)]
pub struct FileData {
    data_dir: Option<PathBuf>,
    config_path: Option<PathBuf>,
}

impl FileData {
    #[must_use]
    pub const fn new(data_dir: Option<PathBuf>, config_path: Option<PathBuf>) -> Self {
        Self {
            data_dir,
            config_path,
        }
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
        let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl DataLoader for FileData {
    type Error = LoadError;

    fn load_standards(&self) -> Result<StandardsDocument, Self::Error> {
        match &self.data_dir {
            Some(dir) => Self::read_json(&dir.join(STANDARDS_FILE)),
            None => Ok(BundledData.load_standards()?),
        }
    }

    fn load_avg_weights(&self) -> Result<AvgWeights, Self::Error> {
        match &self.data_dir {
            Some(dir) => Self::read_json(&dir.join(AVG_WEIGHTS_FILE)),
            None => Ok(BundledData.load_avg_weights()?),
        }
    }

    fn load_config(&self) -> Result<StandardsConfig, Self::Error> {
        match &self.config_path {
            Some(path) => {
                log::debug!("loading configuration from {}", path.display());
                Self::read_json(path)
            }
            None => Ok(StandardsConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brawn_levels::Activity;

    fn temp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "brawn-loader-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn falls_back_to_bundled_assets() {
        let loader = FileData::default();
        let standards = loader.load_standards().unwrap();
        assert!(standards.get(Activity::Run).is_some());
        assert!(!loader.load_avg_weights().unwrap().weights.is_empty());
        assert_eq!(loader.load_config().unwrap(), StandardsConfig::default());
    }

    #[test]
    fn reads_documents_from_directory() {
        let dir = temp_dir("read");
        fs::write(
            dir.join(STANDARDS_FILE),
            r#"{"Run": {"metadata": {"attribute": "Endurance", "unit": "ms", "name": "Run"}}}"#,
        )
        .unwrap();
        fs::write(
            dir.join(AVG_WEIGHTS_FILE),
            r#"{"metadata": {"unit": "kg"}, "weights": []}"#,
        )
        .unwrap();
        let config = dir.join("config.json");
        fs::write(&config, r#"{"global": {"max_level": 20}}"#).unwrap();

        let loader = FileData::new(Some(dir), Some(config));
        let standards = loader.load_standards().unwrap();
        assert_eq!(standards.activities().collect::<Vec<_>>(), vec![Activity::Run]);
        assert!(loader.load_avg_weights().unwrap().weights.is_empty());
        assert_eq!(loader.load_config().unwrap().max_level(), 20);
    }

    #[test]
    fn reports_missing_and_malformed_files() {
        let dir = temp_dir("errors");
        let loader = FileData::new(Some(dir.clone()), None);
        assert!(matches!(loader.load_standards(), Err(LoadError::Io { .. })));

        fs::write(dir.join(AVG_WEIGHTS_FILE), "{ not json").unwrap();
        assert!(matches!(
            loader.load_avg_weights(),
            Err(LoadError::Parse { .. })
        ));
    }
}
