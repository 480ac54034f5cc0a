use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

/// Two independent secret/ttl pairs, one per token class
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    #[serde(default)]
    pub access_secret: String,
    #[serde(default = "default_access_token_expire")]
    pub access_token_expire_minutes: u64,
    #[serde(default)]
    pub refresh_secret: String,
    #[serde(default = "default_refresh_token_expire")]
    pub refresh_token_expire_days: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_local_path")]
    pub local_path: String,
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: usize,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "data/filehost.db".to_string()
}

fn default_access_token_expire() -> u64 {
    15 // 15 minutes
}

fn default_refresh_token_expire() -> u64 {
    7 // 7 days
}

fn default_local_path() -> String {
    "file".to_string()
}

fn default_max_upload_size() -> usize {
    15 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            access_secret: String::new(),
            access_token_expire_minutes: default_access_token_expire(),
            refresh_secret: String::new(),
            refresh_token_expire_days: default_refresh_token_expire(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_path: default_local_path(),
            max_upload_size: default_max_upload_size(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::info!("Loaded environment from {:?}", path);
        }

        let mut config = Self::load_from_file()?;
        config.apply_env_overrides();
        config.ensure_directories()?;
        config.ensure_jwt_secrets()?;
        Ok(config)
    }

    /// Parse a TOML document, filling unspecified keys with defaults
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Ensure both JWT secrets are set, generating and persisting missing ones
    fn ensure_jwt_secrets(&mut self) -> anyhow::Result<()> {
        if self.jwt.access_secret.is_empty() {
            self.jwt.access_secret = load_or_generate_secret(Path::new("data/.jwt_access_secret"))?;
        }
        if self.jwt.refresh_secret.is_empty() {
            self.jwt.refresh_secret =
                load_or_generate_secret(Path::new("data/.jwt_refresh_secret"))?;
        }
        if self.jwt.access_secret == self.jwt.refresh_secret {
            tracing::warn!("Access and refresh token secrets are identical");
        }
        Ok(())
    }

    /// Load configuration from config.toml
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["config.toml", "data/config.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config = Self::from_toml(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment variable overrides
    /// Format: FH_CONF_<SECTION>_<KEY>
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(val) = env::var("FH_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = env::var("FH_CONF_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }

        // Database overrides
        if let Ok(val) = env::var("FH_CONF_DATABASE_PATH") {
            self.database.path = val;
        }

        // JWT overrides
        if let Ok(val) = env::var("FH_CONF_JWT_ACCESS_SECRET") {
            self.jwt.access_secret = val;
        }
        if let Ok(val) = env::var("FH_CONF_JWT_ACCESS_EXPIRE") {
            if let Ok(minutes) = val.parse() {
                self.jwt.access_token_expire_minutes = minutes;
            }
        }
        if let Ok(val) = env::var("FH_CONF_JWT_REFRESH_SECRET") {
            self.jwt.refresh_secret = val;
        }
        if let Ok(val) = env::var("FH_CONF_JWT_REFRESH_EXPIRE") {
            if let Ok(days) = val.parse() {
                self.jwt.refresh_token_expire_days = days;
            }
        }

        // Storage overrides
        if let Ok(val) = env::var("FH_CONF_STORAGE_LOCAL_PATH") {
            self.storage.local_path = val;
        }
        if let Ok(val) = env::var("FH_CONF_STORAGE_MAX_UPLOAD_SIZE") {
            if let Ok(size) = val.parse() {
                self.storage.max_upload_size = size;
            }
        }
    }

    /// Ensure required directories exist
    fn ensure_directories(&self) -> anyhow::Result<()> {
        if let Some(parent) = Path::new(&self.database.path).parent() {
            fs::create_dir_all(parent)?;
        }

        fs::create_dir_all(&self.storage.local_path)?;

        Ok(())
    }
}

fn load_or_generate_secret(path: &Path) -> anyhow::Result<String> {
    if path.exists() {
        let secret = fs::read_to_string(path)?;
        tracing::info!("Loaded persisted JWT secret from {:?}", path);
        return Ok(secret.trim().to_string());
    }

    let secret = uuid::Uuid::new_v4().to_string();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &secret)?;
    tracing::info!("Generated and persisted new JWT secret to {:?}", path);
    Ok(secret)
}
