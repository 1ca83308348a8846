//! Environment-driven configuration (§6 "Configuration surface", §A.1).
//!
//! Mirrors the teacher's `OidcConfig::from_env` idiom: read env vars with a
//! `GATEWAY_` prefix, apply documented defaults, validate eagerly so a
//! misconfigured deployment fails at startup rather than on first request.

use std::env;
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub base_url: String,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub idle_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub authorization_servers: Vec<String>,
    pub audience: String,
    pub scopes_supported: Vec<String>,
    pub jwks_cache_ttl: Duration,
    pub clock_skew: Duration,
}

#[derive(Debug, Clone)]
pub struct McpConfig {
    /// Reserved; not enforced anywhere in this gateway (spec §6).
    pub session_ttl: Option<Duration>,
}

#[derive(Debug, Clone)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub oauth: OAuthConfig,
    pub mcp: McpConfig,
    pub log_format: LogFormat,
}

fn env_var(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn env_var_or(name: &'static str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_secs(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidVar(name, e.to_string()))
}

fn split_nonempty(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env_var_or("GATEWAY_ADDR", "0.0.0.0:8080");
        let base_url = env_var("GATEWAY_BASE_URL")?;

        let read_timeout = parse_secs(
            "GATEWAY_READ_TIMEOUT_SECS",
            &env_var_or("GATEWAY_READ_TIMEOUT_SECS", "30"),
        )?;
        let write_timeout = parse_secs(
            "GATEWAY_WRITE_TIMEOUT_SECS",
            &env_var_or("GATEWAY_WRITE_TIMEOUT_SECS", "30"),
        )?;
        let idle_timeout = parse_secs(
            "GATEWAY_IDLE_TIMEOUT_SECS",
            &env_var_or("GATEWAY_IDLE_TIMEOUT_SECS", "90"),
        )?;

        let authorization_servers =
            split_nonempty(&env_var("GATEWAY_OAUTH_AUTHORIZATION_SERVERS")?);
        if authorization_servers.is_empty() {
            return Err(ConfigError::EmptyAuthorizationServers);
        }

        let audience = env_var("GATEWAY_OAUTH_AUDIENCE")?;
        if audience.trim().is_empty() {
            // Resolves spec §9 open question (b): empty configured
            // audience is a hard startup-config error.
            return Err(ConfigError::EmptyAudience);
        }

        let scopes_supported =
            split_nonempty(&env_var_or("GATEWAY_OAUTH_SCOPES_SUPPORTED", ""));

        let jwks_cache_ttl = parse_secs(
            "GATEWAY_OAUTH_JWKS_CACHE_TTL_SECS",
            &env_var_or("GATEWAY_OAUTH_JWKS_CACHE_TTL_SECS", "600"),
        )?;
        let clock_skew = parse_secs(
            "GATEWAY_OAUTH_CLOCK_SKEW_SECS",
            &env_var_or("GATEWAY_OAUTH_CLOCK_SKEW_SECS", "60"),
        )?;

        let session_ttl = match env::var("GATEWAY_MCP_SESSION_TTL_SECS") {
            Ok(v) => Some(parse_secs("GATEWAY_MCP_SESSION_TTL_SECS", &v)?),
            Err(_) => None,
        };

        let log_format = match env_var_or("GATEWAY_LOG_FORMAT", "pretty").as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(AppConfig {
            server: ServerConfig {
                addr,
                base_url,
                read_timeout,
                write_timeout,
                idle_timeout,
            },
            oauth: OAuthConfig {
                authorization_servers,
                audience,
                scopes_supported,
                jwks_cache_ttl,
                clock_skew,
            },
            mcp: McpConfig { session_ttl },
            log_format,
        })
    }
}
