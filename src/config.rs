use crate::error::NotetypeError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::PathBuf,
    time::Duration,
};

/// File name of the per-vault settings file read by [TomlSettingsProvider].
pub const SETTINGS_FILE_NAME: &str = ".notetype.toml";

/// Maps a note type tag onto the vault folder its notes live in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeFolder {
    pub notetype: String,
    pub folder: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Consulted in declared order: classification takes the first folder that prefixes a
    /// path, creation takes the first entry for a tag.
    #[serde(default)]
    pub type_folders: Vec<TypeFolder>,
    /// Upper bound on how long creation waits for the cache to pick up a new file.
    #[serde(default = "default_creation_timeout_ms")]
    pub creation_timeout_ms: u64,
    /// chrono format string prepended to capture titles.
    #[serde(default = "default_capture_stamp_format")]
    pub capture_stamp_format: String,
    #[serde(default = "default_markdown_extensions")]
    pub markdown_extensions: Vec<String>,
}

fn default_creation_timeout_ms() -> u64 {
    2000
}

fn default_capture_stamp_format() -> String {
    "%Y%m%d%H%M".to_string()
}

fn default_markdown_extensions() -> Vec<String> {
    vec!["md".to_string()]
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            type_folders: Vec::new(),
            creation_timeout_ms: default_creation_timeout_ms(),
            capture_stamp_format: default_capture_stamp_format(),
            markdown_extensions: default_markdown_extensions(),
        }
    }
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self, NotetypeError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, NotetypeError> {
        Ok(toml::to_string(self)?)
    }

    /// Builder-style helper, mostly for tests and embedding hosts.
    pub fn with_folder(mut self, notetype: &str, folder: &str) -> Self {
        self.type_folders.push(TypeFolder {
            notetype: notetype.to_string(),
            folder: folder.to_string(),
        });
        self
    }

    /// The configured folder for a type tag, trailing slashes removed.
    pub fn folder_for(&self, notetype: &str) -> Option<&str> {
        self.type_folders
            .iter()
            .find(|entry| entry.notetype == notetype)
            .map(|entry| entry.folder.trim_end_matches('/'))
    }

    /// The type tag of the first configured folder that is a prefix of `path`. Deliberately
    /// first-match rather than longest-match.
    pub fn type_for_path(&self, path: &str) -> Option<&str> {
        self.type_folders
            .iter()
            .find(|entry| {
                let folder = entry.folder.trim_end_matches('/');
                !folder.is_empty() && path.starts_with(&format!("{folder}/"))
            })
            .map(|entry| entry.notetype.as_str())
    }

    pub fn creation_timeout(&self) -> Duration {
        Duration::from_millis(self.creation_timeout_ms)
    }

    pub fn is_markdown_path(&self, path: &str) -> bool {
        path.rsplit_once('.')
            .map(|(_, ext)| self.markdown_extensions.iter().any(|known| known == ext))
            .unwrap_or(false)
    }
}

/// The host's key-value settings store.
pub trait SettingsProvider: Send + Sync {
    fn get_settings(&self) -> Result<Settings, NotetypeError>;
    fn set_settings(&self, settings: Settings) -> Result<(), NotetypeError>;
}

#[derive(Debug)]
pub struct TomlSettingsProvider {
    path: PathBuf,
}

impl TomlSettingsProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlSettingsProvider { path }
    }

    /// Provider for the settings file at the root of a vault directory.
    pub fn for_vault(root: &std::path::Path) -> Self {
        TomlSettingsProvider::new(root.join(SETTINGS_FILE_NAME))
    }
}

impl SettingsProvider for TomlSettingsProvider {
    fn get_settings(&self) -> Result<Settings, NotetypeError> {
        tracing::debug!("Attempting to read settings from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Settings file not found, using defaults.");
            return Ok(Settings::default());
        }
        let content = read_to_string(&self.path)?;
        Settings::from_toml(&content)
    }

    fn set_settings(&self, settings: Settings) -> Result<(), NotetypeError> {
        tracing::debug!("Attempting to write settings to: {:?}", &self.path);
        write(&self.path, settings.to_toml()?)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct StaticSettingsProvider(RwLock<Settings>);

impl StaticSettingsProvider {
    pub fn new(settings: Settings) -> Self {
        StaticSettingsProvider(RwLock::new(settings))
    }
}

impl SettingsProvider for StaticSettingsProvider {
    fn get_settings(&self) -> Result<Settings, NotetypeError> {
        Ok(self.0.read().clone())
    }

    fn set_settings(&self, settings: Settings) -> Result<(), NotetypeError> {
        *self.0.write() = settings;
        Ok(())
    }
}
