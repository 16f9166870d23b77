use std::env::VarError;
use std::net::SocketAddr;

use crate::app_config::{Environment, FrontendConfig, InspectorConfig};
use crate::ConfigError;

const DEFAULT_INSPECTOR_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_FRONTEND_BIND_ADDR: &str = "127.0.0.1:8081";

/// Load Inspection Service configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_inspector_config() -> Result<InspectorConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_inspector_config_from_env()
}

/// Like [`load_inspector_config`] but does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_inspector_config_from_env() -> Result<InspectorConfig, ConfigError> {
    build_inspector_config(|key| std::env::var(key))
}

/// Load Upload Front-End configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if `SATQA_BUCKET` or `SATQA_INSPECTOR_URL` is missing,
/// or any value is invalid.
pub fn load_frontend_config() -> Result<FrontendConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_frontend_config_from_env()
}

/// Like [`load_frontend_config`] but does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if `SATQA_BUCKET` or `SATQA_INSPECTOR_URL` is missing,
/// or any value is invalid.
pub fn load_frontend_config_from_env() -> Result<FrontendConfig, ConfigError> {
    build_frontend_config(|key| std::env::var(key))
}

/// Env-var access shared by both service configs.
///
/// Empty values count as unset so a blank line in `.env` does not shadow a default.
struct Lookup<F> {
    lookup: F,
}

impl<F> Lookup<F>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    fn optional(&self, var: &str) -> Option<String> {
        (self.lookup)(var)
            .ok()
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, var: &str) -> Result<String, ConfigError> {
        self.optional(var)
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    }

    fn or_default(&self, var: &str, default: &str) -> String {
        self.optional(var).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, var: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.or_default(var, default);
        raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    }

    fn environment(&self) -> Result<Environment, ConfigError> {
        parse_environment(&self.or_default("SATQA_ENV", "development"))
    }

    /// `SATQA_BIND_ADDR` wins; otherwise a platform-provided `PORT` binds all
    /// interfaces; otherwise the per-service default.
    fn bind_addr(&self, default: &str) -> Result<SocketAddr, ConfigError> {
        if self.optional("SATQA_BIND_ADDR").is_none() {
            if let Some(port) = self.optional("PORT") {
                let port = port.parse::<u16>().map_err(|e| ConfigError::InvalidEnvVar {
                    var: "PORT".to_string(),
                    reason: e.to_string(),
                })?;
                return Ok(SocketAddr::from(([0, 0, 0, 0], port)));
            }
        }
        self.parse("SATQA_BIND_ADDR", default)
    }
}

/// Build Inspection Service configuration using the provided env-var lookup.
///
/// Decoupled from the process environment so tests can pass a `HashMap`.
fn build_inspector_config<F>(lookup: F) -> Result<InspectorConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let env = Lookup { lookup };

    let vertex_endpoint = env.optional("SATQA_VERTEX_ENDPOINT");
    if let Some(endpoint) = &vertex_endpoint {
        validate_http_url("SATQA_VERTEX_ENDPOINT", endpoint)?;
    }

    Ok(InspectorConfig {
        env: env.environment()?,
        bind_addr: env.bind_addr(DEFAULT_INSPECTOR_BIND_ADDR)?,
        log_level: env.or_default("SATQA_LOG_LEVEL", "info"),
        http_timeout_secs: env.parse("SATQA_HTTP_TIMEOUT_SECS", "300")?,
        access_token: env.optional("SATQA_ACCESS_TOKEN"),
        project_id: env.optional("GOOGLE_CLOUD_PROJECT"),
        vertex_location: env.or_default("SATQA_VERTEX_LOCATION", "us-central1"),
        vertex_model: env.or_default("SATQA_VERTEX_MODEL", "gemini-2.5-flash"),
        vertex_endpoint,
    })
}

/// Build Upload Front-End configuration using the provided env-var lookup.
fn build_frontend_config<F>(lookup: F) -> Result<FrontendConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let env = Lookup { lookup };

    let bucket = env.require("SATQA_BUCKET")?;
    let inspector_url = env.require("SATQA_INSPECTOR_URL")?;
    validate_http_url("SATQA_INSPECTOR_URL", &inspector_url)?;

    let storage_endpoint = env.or_default("SATQA_STORAGE_ENDPOINT", "https://storage.googleapis.com");
    validate_http_url("SATQA_STORAGE_ENDPOINT", &storage_endpoint)?;

    let upload_prefix = env
        .or_default("SATQA_UPLOAD_PREFIX", "uploads")
        .trim_matches('/')
        .to_owned();

    let max_upload_bytes: usize = env.parse("SATQA_MAX_UPLOAD_BYTES", "33554432")?;
    if max_upload_bytes == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "SATQA_MAX_UPLOAD_BYTES".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    Ok(FrontendConfig {
        env: env.environment()?,
        bind_addr: env.bind_addr(DEFAULT_FRONTEND_BIND_ADDR)?,
        log_level: env.or_default("SATQA_LOG_LEVEL", "info"),
        http_timeout_secs: env.parse("SATQA_HTTP_TIMEOUT_SECS", "300")?,
        access_token: env.optional("SATQA_ACCESS_TOKEN"),
        bucket,
        inspector_url,
        upload_prefix,
        storage_endpoint: storage_endpoint.trim_end_matches('/').to_owned(),
        max_upload_bytes,
    })
}

fn validate_http_url(var: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected an http(s) URL, got \"{value}\""),
        })
    }
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SATQA_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
