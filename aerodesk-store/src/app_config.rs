use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub booking: BookingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    /// Whole-transaction attempts when the ticket uniqueness constraint fires at commit.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Capacity of the in-process booking event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout() -> u64 { 3 }
fn default_true() -> bool { true }
fn default_max_attempts() -> u32 { 3 }
fn default_event_buffer() -> usize { 100 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `AERODESK_DATABASE__URL=postgres://...` sets `database.url`
            .add_source(config::Environment::with_prefix("AERODESK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_defaults_when_section_missing() {
        let raw = config::Config::builder()
            .set_override("server.port", 8080).unwrap()
            .set_override("database.url", "postgres://localhost/aerodesk").unwrap()
            .set_override("auth.jwt_secret", "secret").unwrap()
            .set_override("auth.jwt_expiration_seconds", 3600).unwrap()
            .build()
            .unwrap();

        let config: Config = raw.try_deserialize().unwrap();
        assert_eq!(config.booking.max_attempts, 3);
        assert_eq!(config.booking.event_buffer, 100);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.database.run_migrations);
    }
}
