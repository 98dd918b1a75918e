//! TOML settings file and the resolved runtime configuration.
//!
//! Settings are layered: built-in defaults, then the TOML file given with
//! `--config`, then command-line flags and `SLIDEGATE_*` environment
//! variables.  The first two layers live here; the last is applied by the
//! binary before calling [`ClientConfig::from_settings`].
//!
//! ```toml
//! [session]
//! url = "https://door.example/alice#<base64 secret key>"
//! reconnect_ms = 2000
//! profile = "challenge-response"   # or "direct"
//!
//! [track]
//! length = 300.0
//! thumb = 60.0
//! ```
//!
//! Every field is optional; absent fields keep their defaults.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use slidegate_core::{ProtocolProfile, TrackGeometry};

use crate::infrastructure::transport::{page_url_to_ws, TransportError};

/// Error type for loading and resolving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// No page URL was given anywhere.
    #[error("no page URL configured (use --url, SLIDEGATE_URL or [session] url)")]
    MissingUrl,

    /// The page URL is not a valid absolute URL.
    #[error("invalid page URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The page URL has no WebSocket counterpart.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// ── Settings file schema ──────────────────────────────────────────────────────

/// Top-level settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SettingsFile {
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub track: TrackSettings,
}

/// Connection and protocol settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSettings {
    /// Page URL; the fragment carries the user's key material.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Delay between a close and the next connection attempt.
    #[serde(default = "default_reconnect_ms")]
    pub reconnect_ms: u64,
    #[serde(default)]
    pub profile: ProfileName,
}

/// Slider track measurements used to compute drag progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackSettings {
    #[serde(default = "default_track_length")]
    pub length: f64,
    #[serde(default = "default_thumb_length")]
    pub thumb: f64,
}

/// Protocol profile as written in settings and on the command line.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileName {
    Direct,
    #[default]
    ChallengeResponse,
}

impl FromStr for ProfileName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Self::Direct),
            "challenge-response" => Ok(Self::ChallengeResponse),
            other => Err(format!(
                "unknown profile {other:?} (expected \"direct\" or \"challenge-response\")"
            )),
        }
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Direct => "direct",
            Self::ChallengeResponse => "challenge-response",
        })
    }
}

impl From<ProfileName> for ProtocolProfile {
    fn from(name: ProfileName) -> Self {
        match name {
            ProfileName::Direct => ProtocolProfile::Direct,
            ProfileName::ChallengeResponse => ProtocolProfile::ChallengeResponse,
        }
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_reconnect_ms() -> u64 {
    2000
}
fn default_track_length() -> f64 {
    300.0
}
fn default_thumb_length() -> f64 {
    60.0
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            url: None,
            reconnect_ms: default_reconnect_ms(),
            profile: ProfileName::default(),
        }
    }
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            length: default_track_length(),
            thumb: default_thumb_length(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parses settings from TOML text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed.
pub fn parse_settings(text: &str) -> Result<SettingsFile, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Loads settings from `path`.  The file must exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_settings(path: &Path) -> Result<SettingsFile, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_settings(&text)
}

// ── Resolved configuration ────────────────────────────────────────────────────

/// Fully resolved runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub page_url: Url,
    pub ws_url: Url,
    pub reconnect_delay: Duration,
    pub profile: ProtocolProfile,
    pub track: TrackGeometry,
}

impl ClientConfig {
    /// Resolves the final settings layer into a runtime configuration.
    ///
    /// # Errors
    ///
    /// Fails when no URL is set, the URL does not parse, or it cannot be
    /// mapped to a WebSocket URL.
    pub fn from_settings(settings: &SettingsFile) -> Result<Self, ConfigError> {
        let raw = settings
            .session
            .url
            .as_deref()
            .ok_or(ConfigError::MissingUrl)?;
        let page_url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
            url: raw.to_string(),
            source,
        })?;
        let ws_url = page_url_to_ws(&page_url)?;

        Ok(Self {
            page_url,
            ws_url,
            reconnect_delay: Duration::from_millis(settings.session.reconnect_ms),
            profile: settings.session.profile.into(),
            track: TrackGeometry::new(settings.track.length, settings.track.thumb),
        })
    }

    /// Key material carried in the page URL fragment (empty when absent).
    pub fn key_material(&self) -> &str {
        self.page_url.fragment().unwrap_or("")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
