use std::str::FromStr;

use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_REWRITE_CONCURRENCY: usize = 4;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Upper bound on block rewrite calls in flight for one run. Always ≥ 1.
    pub rewrite_concurrency: usize,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let rewrite_concurrency: usize = parse_or_default(
            "REWRITE_CONCURRENCY",
            std::env::var("REWRITE_CONCURRENCY").ok(),
            DEFAULT_REWRITE_CONCURRENCY,
        )?;
        if rewrite_concurrency == 0 {
            anyhow::bail!("REWRITE_CONCURRENCY must be at least 1");
        }

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: parse_or_default("PORT", std::env::var("PORT").ok(), DEFAULT_PORT)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            rewrite_concurrency,
            max_upload_bytes: parse_or_default(
                "MAX_UPLOAD_BYTES",
                std::env::var("MAX_UPLOAD_BYTES").ok(),
                DEFAULT_MAX_UPLOAD_BYTES,
            )?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_or_default<T>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_default_uses_default_when_unset() {
        let port: u16 = parse_or_default("PORT", None, DEFAULT_PORT).unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_parse_or_default_parses_value() {
        let n: usize = parse_or_default("REWRITE_CONCURRENCY", Some(" 8 ".to_string()), 4).unwrap();
        assert_eq!(n, 8);
    }

    #[test]
    fn test_parse_or_default_rejects_garbage() {
        let err = parse_or_default::<u16>("PORT", Some("eighty".to_string()), DEFAULT_PORT)
            .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
