use crate::error::{Result, VigilError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for a single supervised process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Process name (unique identifier)
    pub name: String,

    /// Time allowed after a start before the first crash check (in seconds)
    #[serde(default = "default_start_grace")]
    pub start_grace_secs: u64,

    /// Delay before the automatic restart of a crashed process (in seconds)
    #[serde(default = "default_restart_grace")]
    pub restart_grace_secs: u64,

    /// Interval between periodic liveness polls (in seconds)
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Triggers watching this process
    #[serde(default = "default_triggers")]
    pub triggers: Vec<TriggerConfig>,
}

/// Trigger configuration, tagged by kind
///
/// Flapping is the only kind today; the closed enum leaves room for
/// future trigger kinds without touching the state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerConfig {
    Flapping(FlappingConfig),
}

/// Flapping trigger settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlappingConfig {
    /// Number of crashes inside the window that counts as flapping
    #[serde(default = "default_times")]
    pub times: usize,

    /// Trailing window the crashes are counted in (in seconds)
    #[serde(default = "default_within")]
    pub within_secs: u64,

    /// Delay before an automatic retry after flapping (absent = no retry)
    #[serde(default)]
    pub retry_in_secs: Option<u64>,

    /// Cap on automatic retries since the last user command (absent = unlimited)
    #[serde(default)]
    pub retry_times: Option<u32>,
}

// Default value functions for serde
fn default_start_grace() -> u64 {
    3
}

fn default_restart_grace() -> u64 {
    1
}

fn default_check_interval() -> u64 {
    5
}

fn default_times() -> usize {
    10
}

fn default_within() -> u64 {
    10
}

fn default_triggers() -> Vec<TriggerConfig> {
    vec![TriggerConfig::Flapping(FlappingConfig::default())]
}

impl Default for FlappingConfig {
    fn default() -> Self {
        Self {
            times: default_times(),
            within_secs: default_within(),
            retry_in_secs: None,
            retry_times: None,
        }
    }
}

impl ProcessConfig {
    /// Create a configuration with default grace periods and triggers
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start_grace_secs: default_start_grace(),
            restart_grace_secs: default_restart_grace(),
            check_interval_secs: default_check_interval(),
            triggers: default_triggers(),
        }
    }

    /// Load process configurations from a file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<Vec<ProcessConfig>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| VigilError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let configs = match extension {
            "toml" => Self::parse_toml(&contents)?,
            "json" => Self::parse_json(&contents)?,
            _ => {
                return Err(VigilError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .toml or .json",
                    extension
                )))
            }
        };

        for config in &configs {
            config.validate()?;
        }

        Ok(configs)
    }

    /// Parse TOML configuration file
    fn parse_toml(contents: &str) -> Result<Vec<ProcessConfig>> {
        // Support both single process and array of processes
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum ConfigFile {
            Single(ProcessConfig),
            Multiple { processes: Vec<ProcessConfig> },
        }

        let config_file: ConfigFile = toml::from_str(contents)
            .map_err(|e| VigilError::InvalidConfig(format!("Failed to parse TOML: {}", e)))?;

        match config_file {
            ConfigFile::Single(config) => Ok(vec![config]),
            ConfigFile::Multiple { processes } => {
                if processes.is_empty() {
                    Err(VigilError::InvalidConfig(
                        "No process configuration found in file".to_string(),
                    ))
                } else {
                    Ok(processes)
                }
            }
        }
    }

    /// Parse JSON configuration file
    fn parse_json(contents: &str) -> Result<Vec<ProcessConfig>> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum ConfigFile {
            Single(ProcessConfig),
            Multiple { processes: Vec<ProcessConfig> },
        }

        let config_file: ConfigFile = serde_json::from_str(contents)
            .map_err(|e| VigilError::InvalidConfig(format!("Failed to parse JSON: {}", e)))?;

        match config_file {
            ConfigFile::Single(config) => Ok(vec![config]),
            ConfigFile::Multiple { processes } => {
                if processes.is_empty() {
                    Err(VigilError::InvalidConfig(
                        "No process configuration found in file".to_string(),
                    ))
                } else {
                    Ok(processes)
                }
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(VigilError::MissingConfigField("name".to_string()));
        }

        if self.check_interval_secs == 0 {
            return Err(VigilError::ConfigValidationError(
                "check_interval_secs must be at least 1".to_string(),
            ));
        }

        for trigger in &self.triggers {
            trigger.validate()?;
        }

        Ok(())
    }

    /// Get start grace as Duration
    pub fn start_grace(&self) -> Duration {
        Duration::from_secs(self.start_grace_secs)
    }

    /// Get restart grace as Duration
    pub fn restart_grace(&self) -> Duration {
        Duration::from_secs(self.restart_grace_secs)
    }

    /// Get liveness poll interval as Duration
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

impl TriggerConfig {
    /// Validate the trigger configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            TriggerConfig::Flapping(flapping) => flapping.validate(),
        }
    }
}

impl FlappingConfig {
    /// Validate the flapping settings
    pub fn validate(&self) -> Result<()> {
        if self.times == 0 {
            return Err(VigilError::ConfigValidationError(
                "flapping times must be at least 1".to_string(),
            ));
        }

        if self.within_secs == 0 {
            return Err(VigilError::ConfigValidationError(
                "flapping within_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the crash-counting window as Duration
    pub fn within(&self) -> Duration {
        Duration::from_secs(self.within_secs)
    }

    /// Get the retry delay as Duration, if configured
    pub fn retry_in(&self) -> Option<Duration> {
        self.retry_in_secs.map(Duration::from_secs)
    }
}
