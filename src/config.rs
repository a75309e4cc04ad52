use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment keys that override the config file.
pub const ENV_KEYS: [&str; 10] = [
    "LOG_LEVEL",
    "HTTP_PORT",
    "TOKEN_TTL",
    "REFRESH_TTL",
    "DATABASE_URL",
    "CACHE_URL",
    "CLIENT_URL",
    "SMTP_HOST",
    "SMTP_USER",
    "SMTP_PASSWORD",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub database: DatabaseConfig,

    pub auth: AuthConfig,

    pub security: SecurityConfig,

    pub client: ClientConfig,

    pub smtp: SmtpConfig,

    pub observability: ObservabilityConfig,

    /// Problems noticed while loading. Logged once tracing is up.
    #[serde(skip)]
    pub load_warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            worker_threads: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    /// Whether to set the Secure flag on credential cookies.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Deadline applied to every HTTP request.
    pub request_timeout_secs: u64,

    /// Outgoing queue length of each realtime client.
    pub ws_client_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            secure_cookies: true,
            request_timeout_secs: 30,
            ws_client_buffer: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,

    pub max_connections: u32,

    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:data/depot.db".to_string(),
            max_connections: 5,
            min_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of the access credential, in seconds.
    pub token_ttl_secs: u64,

    /// Lifetime of the refresh credential, in seconds.
    pub refresh_ttl_secs: u64,

    /// External credential cache. Credentials are kept in process; a value
    /// here is reported at startup and otherwise ignored.
    pub cache_url: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: 60 * 60,
            refresh_ttl_secs: 7 * 24 * 60 * 60,
            cache_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations) - higher = more CPU work
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Origin of the browser client, allowed by CORS with credentials.
    pub url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,

    pub user: String,

    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            security: SecurityConfig::default(),
            client: ClientConfig::default(),
            smtp: SmtpConfig::default(),
            observability: ObservabilityConfig::default(),
            load_warnings: Vec::new(),
        }
    }
}

/// Parses `90`, `90s`, `15m`, `1h` or `7d` into seconds.
pub fn parse_duration_secs(value: &str) -> Option<u64> {
    let value = value.trim();
    let (digits, unit) = match value.char_indices().last()? {
        (i, c) if c.is_ascii_alphabetic() => (&value[..i], c),
        _ => (value, 's'),
    };

    let amount: u64 = digits.trim().parse().ok()?;
    let scale = match unit.to_ascii_lowercase() {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        _ => return None,
    };
    amount.checked_mul(scale)
}

impl Config {
    /// Loads the first config file found, then `.env` and the process
    /// environment on top of it.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match Self::config_paths().into_iter().find(|p| p.exists()) {
            Some(path) => {
                info!("Loading config from: {}", path.display());
                Self::load_from_path(&path)?
            }
            None => {
                let mut config = Self::default();
                config.load_warnings.push(
                    "No config file found, using defaults and environment".to_string(),
                );
                for key in ENV_KEYS {
                    if std::env::var_os(key).is_none() {
                        config
                            .load_warnings
                            .push(format!("{key} is not set, using the default"));
                    }
                }
                config
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Applies overrides from `lookup`. Unparseable values are kept out and
    /// recorded as warnings.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("LOG_LEVEL") {
            self.general.log_level = level;
        }

        if let Some(port) = lookup("HTTP_PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => self.load_warnings.push(format!("Ignoring HTTP_PORT={port}")),
            }
        }

        if let Some(ttl) = lookup("TOKEN_TTL") {
            match parse_duration_secs(&ttl) {
                Some(secs) => self.auth.token_ttl_secs = secs,
                None => self.load_warnings.push(format!("Ignoring TOKEN_TTL={ttl}")),
            }
        }

        if let Some(ttl) = lookup("REFRESH_TTL") {
            match parse_duration_secs(&ttl) {
                Some(secs) => self.auth.refresh_ttl_secs = secs,
                None => self.load_warnings.push(format!("Ignoring REFRESH_TTL={ttl}")),
            }
        }

        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(url) = lookup("CACHE_URL") {
            self.auth.cache_url = Some(url).filter(|u| !u.is_empty());
        }

        if let Some(url) = lookup("CLIENT_URL") {
            self.client.url = url;
        }

        if let Some(host) = lookup("SMTP_HOST") {
            self.smtp.host = host;
        }

        if let Some(user) = lookup("SMTP_USER") {
            self.smtp.user = user;
        }

        if let Some(password) = lookup("SMTP_PASSWORD") {
            self.smtp.password = password;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("depot").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".depot").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port must be > 0");
        }

        if self.auth.token_ttl_secs == 0 || self.auth.refresh_ttl_secs == 0 {
            anyhow::bail!("Credential lifetimes must be > 0");
        }

        if self.auth.refresh_ttl_secs < self.auth.token_ttl_secs {
            anyhow::bail!("auth.refresh_ttl_secs must not be shorter than auth.token_ttl_secs");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("database.url cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("database.max_connections must be > 0");
        }

        if self.server.request_timeout_secs == 0 {
            anyhow::bail!("server.request_timeout_secs must be > 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.token_ttl_secs, 3600);
        assert_eq!(config.auth.refresh_ttl_secs, 604_800);
        assert!(config.server.secure_cookies);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[auth]"));
        assert!(!toml_str.contains("load_warnings"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [server]
            port = 9000
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.server.port, 9000);

        assert_eq!(config.database.url, "sqlite:data/depot.db");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("HTTP_PORT", "9100"),
            ("TOKEN_TTL", "15m"),
            ("REFRESH_TTL", "2d"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("CLIENT_URL", "https://depot.example"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.auth.token_ttl_secs, 900);
        assert_eq!(config.auth.refresh_ttl_secs, 172_800);
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.client.url, "https://depot.example");
        assert!(config.load_warnings.is_empty());
    }

    #[test]
    fn test_bad_env_values_become_warnings() {
        let mut config = Config::default();
        config.apply_env(|key| (key == "HTTP_PORT").then(|| "eighty".to_string()));

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.load_warnings.len(), 1);
    }

    #[test]
    fn test_parse_duration_secs() {
        assert_eq!(parse_duration_secs("90"), Some(90));
        assert_eq!(parse_duration_secs("90s"), Some(90));
        assert_eq!(parse_duration_secs("1h"), Some(3600));
        assert_eq!(parse_duration_secs("7d"), Some(604_800));
        assert_eq!(parse_duration_secs("soon"), None);
        assert_eq!(parse_duration_secs(""), None);
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let mut config = Config::default();
        config.auth.token_ttl_secs = 0;
        assert!(config.validate().is_err());
    }
}
