use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub github: GithubConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub miner: MinerConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(".")
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::load_layers(path, Environment::default().separator("__"))
    }

    /// `config/default` and `config/local` under `path`, then `env` on top.
    fn load_layers<P: AsRef<Path>>(path: P, env: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/default")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/local")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(env)
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "GithubConfig::default_api_base")]
    pub api_base: String,
    #[serde(default = "GithubConfig::default_user_agent")]
    pub user_agent: String,
    /// Sent verbatim as a bearer token when present.
    #[serde(default)]
    pub token: Option<String>,
}

impl GithubConfig {
    fn default_api_base() -> String {
        "https://api.github.com/".to_string()
    }

    fn default_user_agent() -> String {
        "repo-activity-miner".to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "FetchConfig::default_page_size")]
    pub page_size: u32,
    #[serde(default = "FetchConfig::default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "FetchConfig::default_rate_limit_cooldown_secs")]
    pub rate_limit_cooldown_secs: u64,
    #[serde(default = "FetchConfig::default_max_rate_limit_retries")]
    pub max_rate_limit_retries: u32,
    #[serde(default = "FetchConfig::default_transient_retry_delay_ms")]
    pub transient_retry_delay_ms: u64,
    #[serde(default = "FetchConfig::default_max_transient_retries")]
    pub max_transient_retries: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: Self::default_page_size(),
            request_delay_ms: Self::default_request_delay_ms(),
            rate_limit_cooldown_secs: Self::default_rate_limit_cooldown_secs(),
            max_rate_limit_retries: Self::default_max_rate_limit_retries(),
            transient_retry_delay_ms: Self::default_transient_retry_delay_ms(),
            max_transient_retries: Self::default_max_transient_retries(),
        }
    }
}

impl FetchConfig {
    const fn default_page_size() -> u32 {
        100
    }

    const fn default_request_delay_ms() -> u64 {
        1_000
    }

    const fn default_rate_limit_cooldown_secs() -> u64 {
        60
    }

    const fn default_max_rate_limit_retries() -> u32 {
        3
    }

    const fn default_transient_retry_delay_ms() -> u64 {
        5_000
    }

    const fn default_max_transient_retries() -> u32 {
        3
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cooldown_secs)
    }

    pub fn transient_retry_delay(&self) -> Duration {
        Duration::from_millis(self.transient_retry_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinerConfig {
    pub owner: String,
    pub repo: String,
    /// One of `issues`, `pulls`, `comments`, `reviews`, `commits`, `contributors`.
    #[serde(default = "MinerConfig::default_collection")]
    pub collection: String,
    /// Limits `reviews` to one pull request; unset walks every listed one.
    #[serde(default)]
    pub pull_number: Option<u64>,
    #[serde(default = "MinerConfig::default_state")]
    pub state: String,
    #[serde(default)]
    pub labels: Option<String>,
    #[serde(default)]
    pub fetch_pr_details: bool,
    #[serde(default = "MinerConfig::default_top_n")]
    pub top_n: usize,
}

impl MinerConfig {
    fn default_collection() -> String {
        "issues".to_string()
    }

    fn default_state() -> String {
        "all".to_string()
    }

    const fn default_top_n() -> usize {
        5
    }
}
