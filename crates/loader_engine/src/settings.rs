use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use loader_core::{MatchPolicy, UnclassifiedPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a batch decides between native stylesheet events and polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StylesheetEventMode {
    /// Ask the host once per batch whether stylesheet `onload` is supported.
    #[default]
    Detect,
    /// Trust native `onload` without probing.
    Native,
    /// Always poll the rule list.
    Poll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    pub poll_interval_ms: u64,
    /// Start loading on the next scheduler tick so callers can chain `then` first.
    pub defer_start: bool,
    pub match_policy: MatchPolicy,
    pub unclassified: UnclassifiedPolicy,
    pub stylesheet_events: StylesheetEventMode,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 200,
            defer_start: true,
            match_policy: MatchPolicy::Anchored,
            unclassified: UnclassifiedPolicy::Skip,
            stylesheet_events: StylesheetEventMode::Detect,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("invalid settings: {0}")]
    Invalid(&'static str),
}

impl LoaderSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn from_ron_str(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = ron::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&text)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.poll_interval_ms == 0 {
            return Err(SettingsError::Invalid("poll_interval_ms must be at least 1"));
        }
        Ok(())
    }
}
