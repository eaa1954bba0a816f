use std::ffi::OsString;
use std::path::{Path, PathBuf};

use core::fmt::Debug;

/// Configuration IO error.
#[derive(Debug)]
pub enum ConfigError {
    /// Invalid format.
    InvalidFormat(String),

    /// File not found.
    FileNotFound(String),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut message = "Config error => ".to_string();

        match self {
            Self::InvalidFormat(err) => {
                message += format!("Invalid format: {err}").as_str();
            }
            Self::FileNotFound(err) => {
                message += format!("File not found: {err}").as_str();
            }
        };

        f.write_str(message.as_str())
    }
}

impl core::error::Error for ConfigError {}

/// Configuration trait.
pub trait Config: Debug + serde::Serialize + serde::de::DeserializeOwned {
    /// Saves the configuration to a file as pretty JSON.
    fn save<P: AsRef<Path>>(&self, file: P) -> std::io::Result<()> {
        std::fs::write(file, config_to_json(self)?)
    }

    /// Loads the configuration from a file.
    fn load<P: AsRef<Path>>(file: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(file.as_ref())
            .map_err(|_| ConfigError::FileNotFound(file.as_ref().to_string_lossy().to_string()))?;
        config_from_str(&content)
    }

    /// Loads the configuration from a binary buffer.
    fn load_binary(data: &[u8]) -> Result<Self, ConfigError> {
        let content = core::str::from_utf8(data).map_err(|_| {
            ConfigError::InvalidFormat("Could not parse data as utf-8.".to_string())
        })?;
        config_from_str(content)
    }
}

/// Converts a configuration to a JSON string.
pub fn config_to_json<C: Config>(config: &C) -> std::io::Result<String> {
    serde_json::to_string_pretty(config).map_err(std::io::Error::other)
}

fn config_from_str<C: Config>(content: &str) -> Result<C, ConfigError> {
    serde_json::from_str(content).map_err(|err| ConfigError::InvalidFormat(format!("{err}")))
}

/// Configuration of a [Packer](crate::Packer).
#[derive(new, Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PackerConfig {
    /// Path of the data file.
    pub data_path: PathBuf,
    /// Path of the metadata file, `<data_path>.meta` when not set.
    #[new(default)]
    #[serde(default)]
    pub meta_path: Option<PathBuf>,
    /// Number of fractional digits used when writing values in scientific notation.
    ///
    /// When not set, values are written with the shortest representation that reads back
    /// to the exact same number.
    #[new(default)]
    #[serde(default)]
    pub float_precision: Option<usize>,
}

impl Config for PackerConfig {}

impl PackerConfig {
    /// Set the path of the metadata file.
    pub fn with_meta_path(mut self, meta_path: impl Into<PathBuf>) -> Self {
        self.meta_path = Some(meta_path.into());
        self
    }

    /// Set the number of fractional digits used when writing values.
    pub fn with_float_precision(mut self, float_precision: usize) -> Self {
        self.float_precision = Some(float_precision);
        self
    }

    /// Path of the metadata file, falling back to `<data_path>.meta`.
    pub fn resolved_meta_path(&self) -> PathBuf {
        match &self.meta_path {
            Some(path) => path.clone(),
            None => default_meta_path(&self.data_path),
        }
    }
}

pub(crate) fn default_meta_path(data_path: &Path) -> PathBuf {
    let mut path = OsString::from(data_path.as_os_str());
    path.push(".meta");

    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_meta_path_next_to_data_file() {
        let config = PackerConfig::new("/tmp/model.txt".into());

        assert_eq!(
            config.resolved_meta_path(),
            PathBuf::from("/tmp/model.txt.meta")
        );
        assert_eq!(
            config.with_meta_path("/tmp/index").resolved_meta_path(),
            PathBuf::from("/tmp/index")
        );
    }

    #[test]
    fn should_save_and_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("packer.json");
        let config = PackerConfig::new(dir.path().join("model")).with_float_precision(6);

        config.save(&file).unwrap();
        let loaded = PackerConfig::load(&file).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn should_fill_missing_optional_fields() {
        let config = PackerConfig::load_binary(br#"{ "data_path": "model" }"#).unwrap();

        assert_eq!(config.meta_path, None);
        assert_eq!(config.float_precision, None);
    }

    #[test]
    fn should_report_invalid_config() {
        let result = PackerConfig::load_binary(b"{ not json");

        assert!(matches!(result, Err(ConfigError::InvalidFormat(_))));
    }
}
