use std::{
    fs,
    path::{Path, PathBuf},
};

use common::clap::{CliSecret, PlainRedactor};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error reading configuration: {0}")]
    IO(#[from] std::io::Error),
    #[error("Invalid configuration YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings from `attack-range.yml`.
///
/// Loaded once at start up and owned by the [`RangeController`](crate::RangeController) for
/// its lifetime. Keys we don't know about are ignored, the same file also feeds other range
/// tooling.
#[derive(Clone, Debug, Deserialize)]
pub struct RangeConfig {
    pub subscription_id: String,
    #[serde(default = "default_resource_group")]
    pub resource_group: String,
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    #[serde(default)]
    pub admin_password: Option<CliSecret<String, PlainRedactor>>,
    /// Path to the Defender for Endpoint onboarding script, relative to the range directory
    #[serde(default)]
    pub defender_onboarding_script: Option<PathBuf>,
}

impl RangeConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: RangeConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subscription_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "subscription_id cannot be empty".to_string(),
            ));
        }

        if self.resource_group.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "resource_group cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Replaces the subscription id, used when one is given on the command line.
    pub fn with_subscription_id(mut self, subscription_id: Option<String>) -> Self {
        if let Some(subscription_id) = subscription_id {
            self.subscription_id = subscription_id;
        }
        self
    }

    /// The admin password, treating an empty value the same as a missing one.
    pub fn admin_password(&self) -> Option<&str> {
        self.admin_password
            .as_deref()
            .map(String::as_str)
            .filter(|password| !password.is_empty())
    }
}

fn default_resource_group() -> String {
    "attack-range-rg".to_string()
}

fn default_admin_username() -> String {
    "azureuser".to_string()
}
