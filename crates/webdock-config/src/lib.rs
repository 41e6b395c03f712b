//! Webdock provider configuration
//!
//! 設定は次の順に重ねて決定する:
//! 1. デフォルト値
//! 2. 設定ファイル (YAML)
//! 3. 環境変数 (`WEBDOCK_TOKEN`, `WEBDOCK_API_URL`, `WEBDOCK_SERVER_UP_PORT`)

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "WEBDOCK_CONFIG_PATH";
pub const TOKEN_ENV: &str = "WEBDOCK_TOKEN";
pub const API_URL_ENV: &str = "WEBDOCK_API_URL";
pub const SERVER_UP_PORT_ENV: &str = "WEBDOCK_SERVER_UP_PORT";

pub const DEFAULT_API_ENDPOINT: &str = "https://api.webdock.io";

const CANDIDATES: [&str; 2] = ["webdock.yaml", ".webdock.yaml"];

/// Provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API token; required after all layers are applied
    pub token: Option<String>,
    pub api_endpoint: String,
    /// Port probed to decide that a new server is up
    pub server_up_port: u16,
    pub poll: PollConfig,
    pub timeouts: TimeoutConfig,
    pub create: CreateConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            server_up_port: 22,
            poll: PollConfig::default(),
            timeouts: TimeoutConfig::default(),
            create: CreateConfig::default(),
        }
    }
}

/// Event log polling cadence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub delay_secs: u64,
    pub min_interval_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            delay_secs: 10,
            min_interval_secs: 3,
            connect_timeout_secs: 60,
        }
    }
}

impl PollConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Overall wait deadlines per resource kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub server_minutes: u64,
    pub shell_user_minutes: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            server_minutes: 60,
            shell_user_minutes: 10,
        }
    }
}

impl TimeoutConfig {
    pub fn server(&self) -> Duration {
        Duration::from_secs(self.server_minutes.saturating_mul(60))
    }

    pub fn shell_user(&self) -> Duration {
        Duration::from_secs(self.shell_user_minutes.saturating_mul(60))
    }
}

/// Server creation pacing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateConfig {
    /// Extra delay per server already created by this process
    pub stagger_secs: u64,
    pub retries: u32,
    pub backoff_secs: u64,
}

impl Default for CreateConfig {
    fn default() -> Self {
        Self {
            stagger_secs: 10,
            retries: 3,
            backoff_secs: 60,
        }
    }
}

impl CreateConfig {
    pub fn stagger(&self) -> Duration {
        Duration::from_secs(self.stagger_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}

impl ProviderConfig {
    /// 環境変数で上書きする
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(token) = non_empty_env(TOKEN_ENV) {
            self.token = Some(token);
        }

        if let Some(url) = non_empty_env(API_URL_ENV) {
            self.api_endpoint = url;
        }

        if let Some(port) = non_empty_env(SERVER_UP_PORT_ENV) {
            self.server_up_port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: SERVER_UP_PORT_ENV,
                value: port.clone(),
            })?;
        }

        Ok(())
    }

    /// The configured token, or `MissingToken`
    pub fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)
    }

    pub fn validate(&self) -> Result<()> {
        self.token()?;

        if self.api_endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("api_endpoint is empty".to_string()));
        }
        if self.server_up_port == 0 {
            return Err(ConfigError::Invalid("server_up_port must not be 0".to_string()));
        }
        if self.timeouts.server_minutes == 0 || self.timeouts.shell_user_minutes == 0 {
            return Err(ConfigError::Invalid("timeouts must be positive".to_string()));
        }

        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 WEBDOCK_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: webdock.yaml, .webdock.yaml
/// 3. ~/.config/webdock/config.yaml (グローバル設定)
///
/// 見つからない場合は `None` (デフォルト値と環境変数のみで動作する)
pub fn find_config_file() -> Result<Option<PathBuf>> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    // 2. カレントディレクトリで検索
    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    // 3. グローバル設定ファイル
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("webdock").join("config.yaml");
        if global_config.exists() {
            return Ok(Some(global_config));
        }
    }

    Ok(None)
}

/// YAML ファイルを読み込む (環境変数は適用しない)
pub fn load_file(path: &Path) -> Result<ProviderConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content, path)
}

fn parse(content: &str, path: &Path) -> Result<ProviderConfig> {
    if content.trim().is_empty() {
        return Ok(ProviderConfig::default());
    }

    serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// デフォルト → 設定ファイル → 環境変数の順に読み込み、検証する
pub fn load() -> Result<ProviderConfig> {
    let mut config = match find_config_file()? {
        Some(path) => load_file(&path)?,
        None => ProviderConfig::default(),
    };

    config.apply_env()?;
    config.validate()?;

    Ok(config)
}
