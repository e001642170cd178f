use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

/// Profile fields counted by the completion percentage shown to candidates.
pub const PROFILE_COMPLETION_FIELDS: u32 = 10;
/// Jobs scoring below this are dropped from match results.
pub const JOB_MATCH_THRESHOLD: f64 = 30.0;
/// Number of CV uploads kept on a candidate profile.
pub const MAX_STORED_CVS: usize = 5;
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub secret_key: String,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub cors_origins: Vec<String>,
    pub api_rps: u32,
    pub environment: String,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:8000"),
            database_url: get_env("DATABASE_URL")?,
            database_max_connections: get_env_parse_or("DATABASE_MAX_CONNECTIONS", 20)?,
            secret_key: get_env("SECRET_KEY")?,
            access_token_expire_minutes: get_env_parse_or("ACCESS_TOKEN_EXPIRE_MINUTES", 30)?,
            refresh_token_expire_days: get_env_parse_or("REFRESH_TOKEN_EXPIRE_DAYS", 7)?,
            openai_api_key: env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            openai_model: get_env_or("OPENAI_MODEL", "gpt-4o-mini"),
            cors_origins: parse_origins(&get_env_or(
                "BACKEND_CORS_ORIGINS",
                "http://localhost:3000,http://localhost:3001",
            )),
            api_rps: get_env_parse_or("API_RPS", 100)?,
            environment: get_env_or("ENVIRONMENT", "development"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

/// Accepts either a comma separated list or a JSON array of origins.
fn parse_origins(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        if let Ok(list) = serde_json::from_str::<Vec<String>>(trimmed) {
            return list;
        }
    }
    trimmed
        .split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_accept_comma_list_and_json() {
        assert_eq!(
            parse_origins("http://a.test/, http://b.test"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert_eq!(
            parse_origins(r#"["http://c.test"]"#),
            vec!["http://c.test".to_string()]
        );
        assert!(parse_origins("  ").is_empty());
    }
}
