use eyre::{Context, Result, eyre};
use remindr::daemon::TickConfig;
use remindr::domain::UserDefaults;
use remindr::sender::{TELEGRAM_API_URL, TelegramConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
const ENV_DB_PATH: &str = "REMINDR_DB_PATH";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub telegram: TelegramSection,
    pub storage: StorageConfig,
    pub scheduler: SchedulerConfig,
    pub defaults: UserDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
    pub bot_token: Option<String>,
    pub api_base: String,
    pub timeout_ms: u64,
    /// Chat the CLI acts for when `--chat-id` is not given
    pub chat_id: Option<i64>,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base: TELEGRAM_API_URL.to_string(),
            timeout_ms: 10000,
            chat_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("remindr")
                .join("remindr.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub check_interval_secs: u64,
    pub reset_hour: u32,
    pub reset_minute: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 300,
            reset_hour: 0,
            reset_minute: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            telegram: TelegramSection::default(),
            storage: StorageConfig::default(),
            scheduler: SchedulerConfig::default(),
            defaults: UserDefaults::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain, then apply environment overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file_chain(config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file_chain(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Environment wins over the file for secrets and the database location
    fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(token) = get(ENV_BOT_TOKEN).filter(|t| !t.is_empty()) {
            self.telegram.bot_token = Some(token);
        }
        if let Some(path) = get(ENV_DB_PATH).filter(|p| !p.is_empty()) {
            self.storage.db_path = PathBuf::from(path);
        }
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn tick_config(&self) -> TickConfig {
        TickConfig::new(Duration::from_secs(self.scheduler.check_interval_secs.max(1)))
            .with_reset_at(self.scheduler.reset_hour, self.scheduler.reset_minute)
    }

    /// Sender settings; a bot token is required
    pub fn telegram_config(&self) -> Result<TelegramConfig> {
        let token = self
            .telegram
            .bot_token
            .clone()
            .ok_or_else(|| eyre!("No bot token: set telegram.bot_token or {}", ENV_BOT_TOKEN))?;
        let mut telegram = TelegramConfig::new(token);
        telegram.api_base = self.telegram.api_base.clone();
        telegram.timeout = Duration::from_millis(self.telegram.timeout_ms);
        Ok(telegram)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.scheduler.check_interval_secs, 300);
        assert_eq!(config.defaults.timezone, "Europe/Moscow");
        assert!(config.storage.db_path.ends_with("remindr/remindr.db"));
        assert!(config.telegram.bot_token.is_none());
    }

    #[test]
    fn test_load_partial_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("remindr.yml");
        fs::write(
            &path,
            "log_level: debug\nscheduler:\n  check_interval_secs: 60\ndefaults:\n  timezone: UTC\n  work_end_hour: 17\n",
        )
        .unwrap();

        let config = Config::load_file_chain(Some(&path)).unwrap();
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.scheduler.check_interval_secs, 60);
        assert_eq!(config.scheduler.reset_hour, 0);
        assert_eq!(config.defaults.timezone, "UTC");
        assert_eq!(config.defaults.work_start_hour, 9);
        assert_eq!(config.defaults.work_end_hour, 17);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.yml");
        assert!(Config::load_file_chain(Some(&path)).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(ENV_BOT_TOKEN, "123:abc"), (ENV_DB_PATH, "/tmp/r.db")].into();
        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.storage.db_path, PathBuf::from("/tmp/r.db"));
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let mut config = Config::default();
        config.telegram.bot_token = Some("from-file".to_string());
        config.apply_overrides(|_| Some(String::new()));
        assert_eq!(config.telegram.bot_token.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_telegram_config_requires_token() {
        let mut config = Config::default();
        assert!(config.telegram_config().is_err());

        config.telegram.bot_token = Some("123:abc".to_string());
        config.telegram.timeout_ms = 2500;
        let telegram = config.telegram_config().unwrap();
        assert_eq!(telegram.bot_token, "123:abc");
        assert_eq!(telegram.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_tick_config() {
        let mut config = Config::default();
        config.scheduler.check_interval_secs = 0;
        config.scheduler.reset_hour = 2;
        let tick = config.tick_config();
        assert_eq!(tick.check_interval, Duration::from_secs(1));
        assert_eq!(tick.reset_at.format("%H:%M").to_string(), "02:00");
    }
}
