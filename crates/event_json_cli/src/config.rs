use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::{fs, io};

use event_json::{EncoderConfig, ErrorDetailCapture, ReaderLimits};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("reader.max_line_bytes must be greater than zero")]
    ZeroLineLimit,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorDetails {
    #[default]
    Redacted,
    Full,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReaderSection {
    pub max_line_bytes: Option<usize>,
}

/// On-disk TOML settings. Every key is optional.
///
/// ```toml
/// ensure_ascii = true
/// error_details = "redacted"
///
/// [defaults]
/// inode = 0
///
/// [reader]
/// max_line_bytes = 1048576
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub ensure_ascii: Option<bool>,
    #[serde(default)]
    pub error_details: ErrorDetails,
    /// Extra `{field -> default}` rules layered over the built-in `inode = 0`.
    #[serde(default)]
    pub defaults: BTreeMap<String, Value>,
    #[serde(default)]
    pub reader: ReaderSection,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn encoder_config(&self) -> EncoderConfig {
        let mut config = EncoderConfig::default();
        for (field, default) in &self.defaults {
            config.field_defaults.set(field.clone(), default.clone());
        }
        if let Some(ensure_ascii) = self.ensure_ascii {
            config.ensure_ascii = ensure_ascii;
        }
        config.error_detail_capture = match self.error_details {
            ErrorDetails::Redacted => ErrorDetailCapture::RedactedSummaryOnly,
            ErrorDetails::Full => ErrorDetailCapture::FullDetails,
        };
        config
    }

    pub fn reader_limits(&self) -> Result<ReaderLimits, ConfigError> {
        let mut limits = ReaderLimits::default();
        if let Some(max_line_bytes) = self.reader.max_line_bytes {
            if max_line_bytes == 0 {
                return Err(ConfigError::ZeroLineLimit);
            }
            limits.max_line_bytes = max_line_bytes;
        }
        Ok(limits)
    }
}
