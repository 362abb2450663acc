use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "service")]
use notify::{Error as NotifyError, ErrorKind as NotifyErrorKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum NotetypeError {
    #[error("Note cache error: {0}")]
    Cache(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Note creation aborted: {0}")]
    Creation(String),
    #[error("Cycle detected in note hierarchy at '{path}'")]
    CycleDetected { path: String },
    #[error("Custom error: {0}")]
    Custom(String),
    #[error("Duplicate note type tag '{0}' in registry")]
    DuplicateType(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Timed out waiting for: {0}")]
    Timeout(String),
    #[error("Unknown note type '{0}'")]
    UnknownType(String),
}

impl NotetypeError {
    /// Errors the user caused and can fix, as opposed to internal failures. These are the
    /// ones surfaced through [crate::vault::Vault::notice].
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            NotetypeError::Creation(_)
                | NotetypeError::Config(_)
                | NotetypeError::CycleDetected { .. }
                | NotetypeError::UnknownType(_)
        )
    }
}

impl From<toml::de::Error> for NotetypeError {
    fn from(src: toml::de::Error) -> NotetypeError {
        NotetypeError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for NotetypeError {
    fn from(src: toml::ser::Error) -> NotetypeError {
        NotetypeError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<serde_yaml::Error> for NotetypeError {
    fn from(src: serde_yaml::Error) -> NotetypeError {
        NotetypeError::Serialization(format!("YAML (de)serialization error: {src}"))
    }
}

impl From<io::Error> for NotetypeError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => NotetypeError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => NotetypeError::PermissionDenied,
            _ => NotetypeError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<walkdir::Error> for NotetypeError {
    fn from(x: walkdir::Error) -> Self {
        match x.into_io_error() {
            Some(io_error) => NotetypeError::from(io_error),
            None => NotetypeError::Io("walkdir: filesystem loop detected".to_string()),
        }
    }
}

#[cfg(feature = "service")]
impl From<NotifyError> for NotetypeError {
    fn from(notify_error: NotifyError) -> Self {
        match notify_error.kind {
            NotifyErrorKind::Generic(msg) => NotetypeError::Custom(format!(
                "notify-debouncer: {}, paths: {:?}",
                msg, notify_error.paths
            )),
            NotifyErrorKind::Io(io_error) => NotetypeError::Custom(format!(
                "notify-debouncer: io error {}, paths: {:?}",
                io_error.kind(),
                notify_error.paths
            )),
            NotifyErrorKind::PathNotFound => NotetypeError::NotFound(format!(
                "notify-debouncer: path(s) not found: {:?}",
                notify_error.paths
            )),
            NotifyErrorKind::WatchNotFound => NotetypeError::NotFound(format!(
                "notify-debouncer: watch not found, paths: {:?}",
                notify_error.paths
            )),
            NotifyErrorKind::InvalidConfig(_) => {
                NotetypeError::Custom("notify-debouncer invalid config".to_string())
            }
            NotifyErrorKind::MaxFilesWatch => {
                NotetypeError::Custom("notify-debouncer max file watch limit reached".to_string())
            }
        }
    }
}
