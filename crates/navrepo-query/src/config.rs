//! Repository configuration.
//!
//! Values come from defaults, an optional serde document, or environment
//! variables (`NAVREPO_*`), the same way the server binary reads its port and
//! database path.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::discovery::{DEFAULT_IGNORE_MARKERS, DEFAULT_MAX_DEPTH};

pub const ENV_MAX_DEPTH: &str = "NAVREPO_MAX_DEPTH";
pub const ENV_IGNORE_MARKERS: &str = "NAVREPO_IGNORE_MARKERS";
pub const ENV_REPROBE_SECS: &str = "NAVREPO_REPROBE_SECS";
pub const ENV_QUERY_TIMEOUT_MS: &str = "NAVREPO_QUERY_TIMEOUT_MS";

/// How long a circular-reference flag stays set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagPolicy {
    /// Once flagged, an entity type always loads tracked.
    #[default]
    Permanent,
    /// A flagged type is probed untracked again after `after` has elapsed.
    Reprobe { after: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub max_depth: usize,
    pub ignore_markers: Vec<String>,
    pub flag_policy: FlagPolicy,
    /// Applied to every store query; `None` leaves the store's own limit.
    pub query_timeout: Option<Duration>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        RepositoryConfig {
            max_depth: DEFAULT_MAX_DEPTH,
            ignore_markers: DEFAULT_IGNORE_MARKERS.iter().map(|m| m.to_string()).collect(),
            flag_policy: FlagPolicy::Permanent,
            query_timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl RepositoryConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads overrides through `lookup`; unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = RepositoryConfig::default();

        if let Some(raw) = lookup(ENV_MAX_DEPTH) {
            config.max_depth = parse_number(ENV_MAX_DEPTH, &raw)?;
        }
        if let Some(raw) = lookup(ENV_IGNORE_MARKERS) {
            config.ignore_markers = raw
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(raw) = lookup(ENV_REPROBE_SECS) {
            let secs: u64 = parse_number(ENV_REPROBE_SECS, &raw)?;
            config.flag_policy = if secs == 0 {
                FlagPolicy::Permanent
            } else {
                FlagPolicy::Reprobe {
                    after: Duration::from_secs(secs),
                }
            };
        }
        if let Some(raw) = lookup(ENV_QUERY_TIMEOUT_MS) {
            let ms: u64 = parse_number(ENV_QUERY_TIMEOUT_MS, &raw)?;
            config.query_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }

        Ok(config)
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_ignore_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_flag_policy(mut self, policy: FlagPolicy) -> Self {
        self.flag_policy = policy;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }
}

fn parse_number<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
