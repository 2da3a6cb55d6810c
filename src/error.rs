use std::{fmt, io, path::StripPrefixError};

use regex::Error as RegexError;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use serde_yaml::Error as YamlError;
use thiserror::Error;
use url::ParseError as UrlParseError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum FolioError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Duplicate location in record store: {0}")]
    DuplicateLocation(String),
    #[error("Ill-formed navigation menu: {0}")]
    IllformedNavmenu(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Required field '{field}' missing from {location}")]
    MissingField { location: String, field: String },
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

impl FolioError {
    pub fn missing_field(location: impl Into<String>, field: impl Into<String>) -> Self {
        FolioError::MissingField {
            location: location.into(),
            field: field.into(),
        }
    }

    /// Errors that only invalidate a single menu node. The navigation menu resolver substitutes
    /// a fallback link for these instead of failing the menu.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FolioError::IllformedNavmenu(_))
    }
}

impl From<StripPrefixError> for FolioError {
    fn from(src: StripPrefixError) -> FolioError {
        FolioError::NotFound(format!("Strip prefix failed for path. Error: {src}"))
    }
}

impl From<toml::de::Error> for FolioError {
    fn from(src: toml::de::Error) -> FolioError {
        FolioError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<YamlError> for FolioError {
    fn from(src: YamlError) -> FolioError {
        FolioError::Serialization(format!("YAML (de)serialization error: {src}"))
    }
}

impl From<JsonError> for FolioError {
    fn from(src: JsonError) -> FolioError {
        FolioError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<UrlParseError> for FolioError {
    fn from(src: UrlParseError) -> FolioError {
        FolioError::Config(format!("Invalid URL: {src}"))
    }
}

impl From<io::Error> for FolioError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => FolioError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => FolioError::PermissionDenied,
            _ => FolioError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<walkdir::Error> for FolioError {
    fn from(x: walkdir::Error) -> Self {
        match x.into_io_error() {
            Some(io_error) => FolioError::from(io_error),
            None => FolioError::Io("directory walk failed: filesystem loop".to_string()),
        }
    }
}

impl From<fmt::Error> for FolioError {
    fn from(x: fmt::Error) -> Self {
        FolioError::Serialization(format!("{x}"))
    }
}

impl From<globset::Error> for FolioError {
    fn from(x: globset::Error) -> Self {
        FolioError::Config(format!("Invalid glob pattern: {x}"))
    }
}

impl From<RegexError> for FolioError {
    fn from(x: RegexError) -> Self {
        FolioError::Config(format!("Regex parse failed: {x}"))
    }
}
