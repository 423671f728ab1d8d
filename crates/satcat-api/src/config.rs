//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use satcat_core::{Error, Result};

/// Configuration for the satcat API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server port.
    pub http_port: u16,

    /// Enable debug mode.
    ///
    /// When enabled:
    /// - logs are pretty-printed instead of JSON
    /// - the server may run on an in-memory store (no `database_path`)
    /// - CORS may allow any origin
    pub debug: bool,

    /// SQLite database file. Required unless `debug` is set.
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsConfig,

    /// Per-request timeout in seconds; unset disables the timeout.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Maximum number of in-flight requests across all routes; unset
    /// disables the limit.
    #[serde(default)]
    pub concurrency_limit: Option<usize>,

    /// Run the idempotent demo seed at startup.
    #[serde(default)]
    pub seed_on_start: bool,
}

/// CORS configuration for browser-based access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. Use `["*"]` to allow all origins (debug only).
    /// Empty list disables CORS entirely.
    pub allowed_origins: Vec<String>,

    /// Max age for preflight cache (seconds).
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_age_seconds: 3600,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8000,
            debug: false,
            database_path: None,
            cors: CorsConfig::default(),
            request_timeout_secs: None,
            concurrency_limit: None,
            seed_on_start: false,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Supported env vars:
    /// - `SATCAT_HTTP_PORT` (default 8000)
    /// - `SATCAT_DEBUG`
    /// - `SATCAT_DATABASE_PATH`
    /// - `SATCAT_CORS_ALLOWED_ORIGINS` (comma-separated, or `*`)
    /// - `SATCAT_CORS_MAX_AGE_SECONDS`
    /// - `SATCAT_REQUEST_TIMEOUT_SECS`
    /// - `SATCAT_CONCURRENCY_LIMIT`
    /// - `SATCAT_SEED_ON_START`
    ///
    /// # Errors
    ///
    /// Returns an error if any environment variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is present but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        let mut config = Self::default();

        if let Some(port) = vars.u16("SATCAT_HTTP_PORT")? {
            config.http_port = port;
        }
        if let Some(debug) = vars.bool("SATCAT_DEBUG")? {
            config.debug = debug;
        }
        config.database_path = vars.string("SATCAT_DATABASE_PATH").map(PathBuf::from);

        if let Some(origins) = vars.string("SATCAT_CORS_ALLOWED_ORIGINS") {
            config.cors.allowed_origins = parse_cors_allowed_origins(&origins);
        }
        if let Some(max_age) = vars.u64("SATCAT_CORS_MAX_AGE_SECONDS")? {
            config.cors.max_age_seconds = max_age;
        }

        if let Some(secs) = vars.u64("SATCAT_REQUEST_TIMEOUT_SECS")? {
            if secs == 0 {
                return Err(Error::InvalidInput(
                    "SATCAT_REQUEST_TIMEOUT_SECS must be greater than 0".to_string(),
                ));
            }
            config.request_timeout_secs = Some(secs);
        }
        if let Some(limit) = vars.usize("SATCAT_CONCURRENCY_LIMIT")? {
            if limit == 0 {
                return Err(Error::InvalidInput(
                    "SATCAT_CONCURRENCY_LIMIT must be greater than 0".to_string(),
                ));
            }
            config.concurrency_limit = Some(limit);
        }
        if let Some(seed) = vars.bool("SATCAT_SEED_ON_START")? {
            config.seed_on_start = seed;
        }

        Ok(config)
    }

    /// Returns the request timeout, if configured.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.0)(name).and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn u16(&self, name: &str) -> Result<Option<u16>> {
        let Some(v) = self.string(name) else {
            return Ok(None);
        };
        v.parse::<u16>()
            .map(Some)
            .map_err(|e| Error::InvalidInput(format!("{name} must be a u16: {e}")))
    }

    fn u64(&self, name: &str) -> Result<Option<u64>> {
        let Some(v) = self.string(name) else {
            return Ok(None);
        };
        v.parse::<u64>()
            .map(Some)
            .map_err(|e| Error::InvalidInput(format!("{name} must be a u64: {e}")))
    }

    fn usize(&self, name: &str) -> Result<Option<usize>> {
        let Some(v) = self.string(name) else {
            return Ok(None);
        };
        v.parse::<usize>()
            .map(Some)
            .map_err(|e| Error::InvalidInput(format!("{name} must be a usize: {e}")))
    }

    fn bool(&self, name: &str) -> Result<Option<bool>> {
        let Some(v) = self.string(name) else {
            return Ok(None);
        };
        parse_bool(name, &v).map(Some)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(Error::InvalidInput(format!(
            "{name} must be a boolean (true/false/1/0)"
        ))),
    }
}

fn parse_cors_allowed_origins(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed == "*" {
        return vec!["*".to_string()];
    }

    trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
