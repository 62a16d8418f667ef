use std::env;

use auth::PasswordError;
use auth::PasswordHasher;
use auth::TokenSigner;
use chrono::Duration;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::identity::models::LifecycleSettings;
use crate::identity::models::RefreshPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    /// Absent means the in-memory credential store
    pub database: Option<DatabaseConfig>,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub password: PasswordConfig,
    #[serde(default)]
    pub revocation: RevocationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub reset_secret: String,
    pub expiration_hours: i64,
    #[serde(default = "default_refresh_expiration_days")]
    pub refresh_expiration_days: i64,
    #[serde(default = "default_reset_expiration_minutes")]
    pub reset_expiration_minutes: i64,
    #[serde(default)]
    pub refresh_policy: RefreshPolicy,
}

/// Argon2id cost
#[derive(Debug, Deserialize, Clone)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RevocationConfig {
    pub sweep_every: usize,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self { sweep_every: 64 }
    }
}

fn default_api_prefix() -> String {
    "api".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_refresh_expiration_days() -> i64 {
    30
}

fn default_reset_expiration_minutes() -> i64 {
    60
}

fn ttl(
    key: &str,
    value: i64,
    to_duration: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::Message(format!(
            "{} must be positive, got {}",
            key, value
        )));
    }
    to_duration(value)
        .ok_or_else(|| ConfigError::Message(format!("{} is out of range: {}", key, value)))
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (JWT__SECRET, SERVER__HTTP_PORT, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: JWT__SECRET=... overrides jwt.secret
            .add_source(Environment::default().separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.lifecycle_settings()?;

        Ok(config)
    }

    /// Token lifetimes and policies.
    ///
    /// # Errors
    /// * `Message` - A lifetime is zero, negative, or out of range
    pub fn lifecycle_settings(&self) -> Result<LifecycleSettings, ConfigError> {
        Ok(LifecycleSettings {
            access_token_ttl: ttl(
                "jwt.expiration_hours",
                self.jwt.expiration_hours,
                Duration::try_hours,
            )?,
            refresh_token_ttl: ttl(
                "jwt.refresh_expiration_days",
                self.jwt.refresh_expiration_days,
                Duration::try_days,
            )?,
            reset_token_ttl: ttl(
                "jwt.reset_expiration_minutes",
                self.jwt.reset_expiration_minutes,
                Duration::try_minutes,
            )?,
            refresh_policy: self.jwt.refresh_policy,
            revocation_sweep_every: self.revocation.sweep_every,
        })
    }

    pub fn token_signer(&self) -> TokenSigner {
        TokenSigner::new(
            self.jwt.secret.as_bytes(),
            self.jwt.reset_secret.as_bytes(),
        )
    }

    pub fn password_hasher(&self) -> Result<PasswordHasher, PasswordError> {
        PasswordHasher::with_cost(
            self.password.memory_kib,
            self.password.iterations,
            self.password.parallelism,
        )
    }
}
