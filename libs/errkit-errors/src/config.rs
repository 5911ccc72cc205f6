//! Declarative problem settings
//!
//! Matchers are code, but the fallback problem is plain data and can come from the
//! service's configuration file:
//!
//! ```yaml
//! problems:
//!   fallback:
//!     status: 503
//!     detail: "service is under maintenance"
//!     type: "https://errors.example.com/MAINTENANCE"
//! ```

use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::problem::Problem;

/// Errors raised while loading or validating [`ProblemsConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to extract problem settings from '{key}': {source}")]
    Extract {
        key: String,
        #[source]
        source: Box<figment::Error>,
    },

    #[error("invalid fallback problem status {0}: expected 100..=599")]
    InvalidStatus(u16),
}

/// Problem settings section.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ProblemsConfig {
    /// Problem returned as is when no matcher accepts an error.
    pub fallback: Option<FallbackProblemConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FallbackProblemConfig {
    pub status: u16,
    pub detail: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_url: Option<String>,
    /// Overrides the title derived from the status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ProblemsConfig {
    /// Extract the settings stored under `key`. A missing section yields defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError::Extract`] if the section is malformed.
    pub fn from_figment(figment: &Figment, key: &str) -> Result<Self, ConfigError> {
        if !figment.contains(key) {
            return Ok(Self::default());
        }
        figment
            .extract_inner(key)
            .map_err(|source| ConfigError::Extract {
                key: key.to_owned(),
                source: Box::new(source),
            })
    }

    /// Build the configured fallback problem.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidStatus`] if the status is not a valid HTTP
    /// error or success status.
    pub fn fallback_problem(&self) -> Result<Option<Problem>, ConfigError> {
        let Some(fallback) = &self.fallback else {
            return Ok(None);
        };
        if !(100..=599).contains(&fallback.status) {
            return Err(ConfigError::InvalidStatus(fallback.status));
        }

        let mut problem = Problem::new(fallback.status, fallback.detail.clone());
        if let Some(type_url) = &fallback.type_url {
            problem = problem.with_type(type_url.clone());
        }
        if let Some(title) = &fallback.title {
            problem = problem.with_title(title.clone());
        }
        Ok(Some(problem))
    }
}
