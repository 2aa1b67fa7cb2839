use serde::{Deserialize, Serialize};

use std::path::Path;
use std::path::PathBuf;

use crate::error::MdbaseError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How long an edit's origin stays set after the edit, in milliseconds.
    pub quiet_window_ms: u64,
    /// Delay before source edits are re-parsed. 0 syncs on every keystroke.
    pub source_debounce_ms: u64,
    /// Reading speed used for the reading-time estimate.
    pub words_per_minute: u32,
    /// Whether the Markdown source pane is shown next to the editor.
    pub split_view: bool,
    /// Whether the outline panel is shown.
    pub outline_visible: bool,
    /// Where the document store lives. Defaults to the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Loads the configuration from the provided loader.
    pub fn load(loader: &impl Loader) -> Result<Self, MdbaseError> {
        loader.load()
    }

    /// Saves the configuration using the provided saver.
    pub fn save(&self, saver: &impl Saver) -> Result<(), MdbaseError> {
        saver.save(self)
    }

    /// Directory holding the document store.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Path of the document store file.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir().join("documents.json")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quiet_window_ms: 100,
            source_debounce_ms: 0,
            words_per_minute: 200,
            split_view: true,
            outline_visible: false,
            data_dir: None,
        }
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("./"))
        .join("mdbase")
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("./"))
        .join("mdbase/config.toml")
}

/// The trait for loading configuration data.
pub trait Loader {
    /// Loads the configuration data.
    fn load(&self) -> Result<Config, MdbaseError>;
}

/// The trait for saving configuration data.
pub trait Saver {
    /// Saves the configuration data.
    fn save(&self, config: &Config) -> Result<(), MdbaseError>;
}

/// An implementation of [`Loader`] and [`Saver`] that reads and writes a configuration file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a new [`FileStore`] with the given path.
    ///
    /// [`Config`] data will be serialized and deserialized using the file extension.
    /// `.json` and `.toml` files are supported.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|ext| ext.to_str())
    }
}

impl Loader for FileStore {
    fn load(&self) -> Result<Config, MdbaseError> {
        match self.extension() {
            Some("json") => Ok(serde_json::from_str(&std::fs::read_to_string(&self.path)?)?),
            Some("toml") => Ok(toml::from_str(&std::fs::read_to_string(&self.path)?)?),
            other => Err(MdbaseError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }
}

impl Saver for FileStore {
    fn save(&self, config: &Config) -> Result<(), MdbaseError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match self.extension() {
            Some("json") => Ok(std::fs::write(
                &self.path,
                serde_json::to_string_pretty(config)?,
            )?),
            Some("toml") => Ok(std::fs::write(&self.path, toml::to_string_pretty(config)?)?),
            other => Err(MdbaseError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mdbase-config-{}-{}", rand::random::<u32>(), name))
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str("quiet_window_ms = 250\nsplit_view = false").unwrap();
        assert_eq!(config.quiet_window_ms, 250);
        assert!(!config.split_view);
        assert_eq!(config.words_per_minute, 200);
    }

    #[test]
    fn saves_and_loads_by_extension() {
        for name in ["config.json", "config.toml"] {
            let path = temp_path(name);
            let store = FileStore::new(&path);
            let config = Config {
                source_debounce_ms: 300,
                outline_visible: true,
                ..Config::default()
            };
            config.save(&store).unwrap();
            assert_eq!(Config::load(&store).unwrap(), config);
            std::fs::remove_file(&path).unwrap();
        }
    }

    #[test]
    fn rejects_unknown_extension() {
        let store = FileStore::new(temp_path("config.yaml"));
        assert!(matches!(
            Config::load(&store),
            Err(MdbaseError::UnsupportedFormat(ext)) if ext == "yaml"
        ));
    }
}
