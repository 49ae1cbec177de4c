use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings file structure for circle-builder.
///
/// Every value has a default, so the file is optional and may be partial.
/// Files are loaded from the current directory or from an explicit path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    #[serde(default)]
    pub api: ApiConfig,

    /// Retry policy applied to every remote call
    #[serde(default)]
    pub retry: RetryConfig,

    /// Retry policy for the final workflow status check
    #[serde(
        default = "default_final_status_retry",
        deserialize_with = "deserialize_final_status_retry"
    )]
    pub final_status_retry: RetryConfig,

    #[serde(default)]
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApiConfig {
    /// CircleCI v1.1 API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Delay between attempts, in seconds
    #[serde(default = "default_retry_interval_secs")]
    pub interval_secs: u64,

    /// Maximum number of attempts, including the first one
    #[serde(default = "default_retry_attempts")]
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PollingConfig {
    /// Interval between build detail polls while a build runs
    #[serde(default = "default_build_interval_secs")]
    pub build_interval_secs: u64,

    /// Interval between build summary polls while locating builds
    #[serde(default = "default_summary_interval_secs")]
    pub summary_interval_secs: u64,

    /// Clock skew tolerated between this host and CircleCI
    #[serde(default = "default_queued_skew_secs")]
    pub queued_skew_secs: u64,

    /// How long to wait for a triggered build to show up
    #[serde(default = "default_trigger_wait_secs")]
    pub trigger_wait_secs: u64,

    /// How long to wait for the next job of a workflow to show up
    #[serde(default = "default_next_build_wait_secs")]
    pub next_build_wait_secs: u64,

    /// Log progress every N poll ticks
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

impl RetryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl PollingConfig {
    pub fn build_interval(&self) -> Duration {
        Duration::from_secs(self.build_interval_secs)
    }

    pub fn summary_interval(&self) -> Duration {
        Duration::from_secs(self.summary_interval_secs)
    }

    pub fn queued_skew(&self) -> Duration {
        Duration::from_secs(self.queued_skew_secs)
    }

    pub fn trigger_wait(&self) -> Duration {
        Duration::from_secs(self.trigger_wait_secs)
    }

    pub fn next_build_wait(&self) -> Duration {
        Duration::from_secs(self.next_build_wait_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            retry: RetryConfig::default(),
            final_status_retry: default_final_status_retry(),
            polling: PollingConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_retry_interval_secs(),
            attempts: default_retry_attempts(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            build_interval_secs: default_build_interval_secs(),
            summary_interval_secs: default_summary_interval_secs(),
            queued_skew_secs: default_queued_skew_secs(),
            trigger_wait_secs: default_trigger_wait_secs(),
            next_build_wait_secs: default_next_build_wait_secs(),
            progress_every: default_progress_every(),
        }
    }
}

fn default_base_url() -> String {
    "https://circleci.com/api/v1.1/".to_string()
}

fn default_retry_interval_secs() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_final_status_retry() -> RetryConfig {
    RetryConfig {
        interval_secs: 5,
        attempts: 3,
    }
}

/// A retry table whose missing keys are filled from a policy other than
/// the general `[retry]` defaults.
#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PartialRetryConfig {
    interval_secs: Option<u64>,
    attempts: Option<u32>,
}

impl PartialRetryConfig {
    fn or(self, defaults: RetryConfig) -> RetryConfig {
        RetryConfig {
            interval_secs: self.interval_secs.unwrap_or(defaults.interval_secs),
            attempts: self.attempts.unwrap_or(defaults.attempts),
        }
    }
}

fn deserialize_final_status_retry<'de, D>(
    deserializer: D,
) -> std::result::Result<RetryConfig, D::Error>
where
    D: Deserializer<'de>,
{
    PartialRetryConfig::deserialize(deserializer)
        .map(|partial| partial.or(default_final_status_retry()))
}

fn default_build_interval_secs() -> u64 {
    2
}

fn default_summary_interval_secs() -> u64 {
    1
}

fn default_queued_skew_secs() -> u64 {
    3
}

fn default_trigger_wait_secs() -> u64 {
    60
}

fn default_next_build_wait_secs() -> u64 {
    60
}

fn default_progress_every() -> usize {
    10
}

impl Settings {
    /// Load settings from a file.
    ///
    /// Searches for settings files in this order:
    /// 1. Specified path
    /// 2. ./circle-builder.toml
    /// 3. ./circle-builder.json
    /// 4. ./circle-builder.yaml
    /// 5. ./circle-builder.yml
    ///
    /// Returns default settings if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "circle-builder.toml",
            "circle-builder.json",
            "circle-builder.yaml",
            "circle-builder.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML settings: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON settings: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML settings: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse settings file: {}", path.display())),
        }
    }
}
