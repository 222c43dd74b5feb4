use serde::Deserialize;
use std::fs;
use tracing::warn;

use crate::core::MAX_THREADS;
use crate::dns::Transport;
use crate::error::SetupError;

/// Effective configuration for one run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub threads: usize,
    pub resolver: Option<String>,
    pub resolvers_file: Option<String>,
    pub use_default: bool,
    pub protocol: Transport,
    pub port: u16,
    pub domain: bool,
    pub list: Option<String>,
    pub timeout: u64,
    pub retries: u32,
    pub verbose: bool,
    pub output: Option<String>,
    pub show_failed: bool,
    pub rate_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            threads: 100,
            resolver: None,
            resolvers_file: None,
            use_default: false,
            protocol: Transport::Udp,
            port: 53,
            domain: false,
            list: None,
            timeout: 2,
            retries: 1,
            verbose: false,
            output: None,
            show_failed: false,
            rate_limit: 0,
        }
    }
}

impl Config {
    /// Load a YAML config file. Missing keys keep their defaults and unknown
    /// keys are ignored.
    pub fn from_file(path: &str) -> Result<Self, SetupError> {
        let content = fs::read_to_string(path).map_err(|e| SetupError::ConfigFile {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(&content).map_err(|e| SetupError::ConfigFile {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(content)
    }

    /// Reject a zero-sized pool and clamp oversized ones.
    pub fn validate(mut self) -> Result<Self, SetupError> {
        if self.threads == 0 {
            return Err(SetupError::NoThreads);
        }
        if self.threads > MAX_THREADS {
            warn!("Thread count limited to {} for system stability", MAX_THREADS);
            self.threads = MAX_THREADS;
        }
        Ok(self)
    }
}
