//! Scenario files: which batches to load and when each resource arrives.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use loader_engine::sim::SheetPlan;
use loader_engine::LoaderSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioBatch {
    pub urls: Vec<String>,
    /// Batches that start once this one settles.
    #[serde(default)]
    pub then_load: Vec<ScenarioBatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub native_stylesheet_onload: bool,
    pub settings: Option<LoaderSettings>,
    pub batches: Vec<ScenarioBatch>,
    /// Milliseconds between injection and arrival, per URL.
    pub latency_ms: BTreeMap<String, u64>,
    /// Latency for URLs missing from `latency_ms`. `None` means they never arrive.
    pub default_latency_ms: Option<u64>,
    /// Probe behaviour of polled stylesheets, per URL.
    pub sheets: BTreeMap<String, SheetPlan>,
    /// Stop the replay at this virtual time.
    pub horizon_ms: u64,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            native_stylesheet_onload: true,
            settings: None,
            batches: Vec::new(),
            latency_ms: BTreeMap::new(),
            default_latency_ms: Some(0),
            sheets: BTreeMap::new(),
            horizon_ms: 60_000,
        }
    }
}

impl Scenario {
    pub fn latency_for(&self, url: &str) -> Option<u64> {
        self.latency_ms
            .get(url)
            .copied()
            .or(self.default_latency_ms)
    }
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

pub fn load_scenario(path: &Path) -> Result<Scenario, ScenarioError> {
    let text = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&text).map_err(|source| ScenarioError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
