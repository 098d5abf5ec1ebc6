//! Configuration for the load test.
//!
//! Configuration can be loaded from multiple sources with the following precedence (highest to
//! lowest):
//!
//! 1. Environment variables (prefixed with `LT__`)
//! 2. YAML configuration file (specified via `-c` or `--config` flag)
//! 3. Defaults
//!
//! Environment variables use double underscores (`__`) to denote nested configuration structures,
//! for example `LT__REMOTE=http://localhost:8080` or `LT__LOGGING__LEVEL=debug`.
//!
//! A YAML configuration file looks like this:
//!
//! ```yaml
//! remote: http://localhost:5000
//! duration: 5m
//!
//! workloads:
//!   - name: messages
//!     users: 50
//!     spawn_rate: 5
//!     weights:
//!       add_message: 2
//!       get_messages: 1
//!     think_time:
//!       min: 500ms
//!       max: 2s
//!     body:
//!       type: string
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::request::BodyFormat;
use crate::workload::{self, WorkloadError};

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "LT__";

/// Top-level load test configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the messages service.
    ///
    /// # Default
    ///
    /// `http://localhost:5000`
    pub remote: String,

    /// How long users keep sending requests.
    ///
    /// # Default
    ///
    /// `60s`
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// Abort requests that take longer than this.
    ///
    /// # Default
    ///
    /// `30s`
    #[serde(with = "humantime_serde")]
    pub request_timeout: Option<Duration>,

    /// Logging configuration.
    pub logging: Logging,

    /// Workloads that run concurrently against the remote.
    pub workloads: Vec<Workload>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: "http://localhost:5000".to_owned(),
            duration: Duration::from_secs(60),
            request_timeout: Some(Duration::from_secs(30)),
            logging: Logging::default(),
            workloads: vec![Workload::default()],
        }
    }
}

impl Config {
    /// Loads configuration from defaults, an optional YAML file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("failed to load configuration")?;

        Ok(config)
    }
}

/// Settings of a single workload.
///
/// Used in: [`Config::workloads`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Workload {
    /// Name of the workload, shown in the report.
    pub name: String,
    /// Number of concurrent simulated users.
    pub users: usize,
    /// Users started per second.
    pub spawn_rate: f64,
    /// Seed for reproducible runs. Random if unset.
    pub seed: Option<u64>,
    /// Range of actor ids to target.
    pub actor_ids: ActorIds,
    /// Range of message text lengths.
    pub text_length: TextLength,
    /// Relative weights of the actions.
    pub weights: Weights,
    /// Pause between two actions of a user.
    pub think_time: ThinkTime,
    /// Encoding of the `AddMessage` request body.
    pub body: BodyFormat,
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            name: "messages".to_owned(),
            users: 10,
            spawn_rate: 2.0,
            seed: None,
            actor_ids: ActorIds::default(),
            text_length: TextLength::default(),
            weights: Weights::default(),
            think_time: ThinkTime::default(),
            body: BodyFormat::default(),
        }
    }
}

impl Workload {
    /// Builds the [`workload::Workload`] described by this configuration.
    pub fn build(&self) -> Result<workload::Workload, WorkloadError> {
        let mut builder = workload::Workload::builder(self.name.as_str())
            .users(self.users)
            .spawn_rate(self.spawn_rate)
            .actor_ids(self.actor_ids.min, self.actor_ids.max)
            .text_length(self.text_length.min, self.text_length.max)
            .action_weights(self.weights.add_message, self.weights.get_messages)
            .think_time(self.think_time.min, self.think_time.max)
            .body(self.body.clone());
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        builder.build()
    }
}

/// Inclusive range of actor ids. A missing bound keeps its default.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ActorIds {
    /// Lowest actor id.
    pub min: u32,
    /// Highest actor id.
    pub max: u32,
}

impl Default for ActorIds {
    fn default() -> Self {
        Self { min: 1, max: 100 }
    }
}

/// Inclusive range of message text lengths. A missing bound keeps its default.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TextLength {
    /// Shortest text.
    pub min: u32,
    /// Longest text.
    pub max: u32,
}

impl Default for TextLength {
    fn default() -> Self {
        Self { min: 10, max: 50 }
    }
}

/// Relative weights of the two actions.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Weights {
    /// Weight of `AddMessage`.
    pub add_message: u32,
    /// Weight of `GetMessages`.
    pub get_messages: u32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            add_message: 2,
            get_messages: 1,
        }
    }
}

/// Interval from which the think-time is drawn uniformly.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ThinkTime {
    /// Shortest pause.
    #[serde(with = "humantime_serde")]
    pub min: Duration,
    /// Longest pause.
    #[serde(with = "humantime_serde")]
    pub max: Duration,
}

impl Default for ThinkTime {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(500),
            max: Duration::from_secs(2),
        }
    }
}

/// Logging configuration.
///
/// Logs are always written to stderr. The `RUST_LOG` environment variable takes precedence.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Minimum log level to output.
    ///
    /// # Default
    ///
    /// `INFO`
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,

    /// Log output format.
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Auto,
        }
    }
}

/// The output format of logs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty when stderr is a terminal, simplified otherwise.
    #[default]
    Auto,
    /// Multi-line, human readable output with colors.
    Pretty,
    /// Compact single-line output without colors.
    Simplified,
}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
