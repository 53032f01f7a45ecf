//! Configuration loading for pdflib-scope.

use crate::version::MIN_PDF_VERSION;
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Virtual file prefix used when a caller does not supply one.
pub const DEFAULT_VIRTUAL_FILE_PREFIX: &str = "pvf";

/// Result type for configuration loading
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Errors raised while locating or reading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read {what} {path}: {source}")]
    Read {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path} as TOML: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    pub license: Option<LicenseConfig>,
    pub virtual_files: Option<VirtualFileConfig>,
    pub documents: Option<DocumentConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct LicenseConfig {
    pub key: Option<String>,
    /// File whose first non-empty line is the key. Ignored if `key` is set.
    pub key_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct VirtualFileConfig {
    pub prefix: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct DocumentConfig {
    pub min_pdf_version: Option<u32>,
}

impl Config {
    /// The configured license key, reading `key_file` if needed.
    pub fn license_key(&self) -> ConfigResult<Option<String>> {
        let Some(license) = self.license.as_ref() else {
            return Ok(None);
        };
        if let Some(key) = &license.key {
            return Ok(Some(key.trim().to_string()));
        }
        let Some(path) = &license.key_file else {
            return Ok(None);
        };

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            what: "license key file",
            path: path.clone(),
            source,
        })?;
        Ok(contents
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string))
    }

    pub fn virtual_file_prefix(&self) -> String {
        self.virtual_files
            .as_ref()
            .and_then(|vf| vf.prefix.clone())
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or_else(|| DEFAULT_VIRTUAL_FILE_PREFIX.to_string())
    }

    /// Lowest PDF version (times ten) for versioned document creation.
    /// Never below the engine minimum of 1.4.
    pub fn min_pdf_version(&self) -> u32 {
        self.documents
            .as_ref()
            .and_then(|d| d.min_pdf_version)
            .unwrap_or(MIN_PDF_VERSION)
            .max(MIN_PDF_VERSION)
    }

    /// Settings applied to every root object created from this configuration.
    pub fn root_config(&self) -> ConfigResult<RootConfig> {
        Ok(RootConfig {
            license_key: self.license_key()?,
            virtual_file_prefix: self.virtual_file_prefix(),
            min_pdf_version: self.min_pdf_version(),
        })
    }
}

/// Settings for a single [`RootObject`](crate::RootObject).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootConfig {
    /// Applied at construction; a rejected key only produces a warning.
    pub license_key: Option<String>,
    pub virtual_file_prefix: String,
    pub min_pdf_version: u32,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            license_key: None,
            virtual_file_prefix: DEFAULT_VIRTUAL_FILE_PREFIX.to_string(),
            min_pdf_version: MIN_PDF_VERSION,
        }
    }
}

pub fn default_config_path() -> ConfigResult<PathBuf> {
    let dirs = ProjectDirs::from("", "", "pdfscope").ok_or(ConfigError::NoConfigDir)?;
    Ok(dirs.config_dir().join("config.toml"))
}

pub fn load_config(path: &Path) -> ConfigResult<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        what: "config file",
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
