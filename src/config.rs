use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Base URL of the scoring backend, e.g. `http://127.0.0.1:8000/api/v1`.
    pub backend_base_url: String,
    pub backend_timeout_secs: u64,
    /// Maximum number of leads requested per snapshot.
    pub snapshot_limit: usize,
    pub snapshot_ttl_secs: u64,
    pub default_page_size: usize,
}

/// Reads an optional numeric variable, falling back to `default` when unset.
fn env_number<T: FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", name)),
        _ => Ok(default),
    }
}

fn validate_base_url(raw: String) -> anyhow::Result<String> {
    if raw.trim().is_empty() {
        anyhow::bail!("BACKEND_BASE_URL cannot be empty");
    }
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| anyhow::anyhow!("BACKEND_BASE_URL is not a valid URL: {}", e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("BACKEND_BASE_URL must start with http:// or https://");
    }
    Ok(raw.trim().trim_end_matches('/').to_string())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            backend_base_url: std::env::var("BACKEND_BASE_URL")
                .map_err(|_| anyhow::anyhow!("BACKEND_BASE_URL environment variable required"))
                .and_then(validate_base_url)?,
            backend_timeout_secs: env_number("BACKEND_TIMEOUT_SECS", 30)?,
            snapshot_limit: env_number("SNAPSHOT_LIMIT", 2000)?,
            snapshot_ttl_secs: env_number("SNAPSHOT_TTL_SECS", 30)?,
            default_page_size: env_number("DEFAULT_PAGE_SIZE", 10)?,
        };

        if config.default_page_size == 0 {
            anyhow::bail!("DEFAULT_PAGE_SIZE must be at least 1");
        }
        if config.snapshot_limit == 0 {
            anyhow::bail!("SNAPSHOT_LIMIT must be at least 1");
        }

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Backend Base URL: {}", config.backend_base_url);
        tracing::debug!(
            "Snapshot limit: {}, TTL: {}s",
            config.snapshot_limit,
            config.snapshot_ttl_secs
        );
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_validation() {
        assert_eq!(
            validate_base_url("http://127.0.0.1:8000/api/v1/".to_string()).unwrap(),
            "http://127.0.0.1:8000/api/v1"
        );
        assert!(validate_base_url("".to_string()).is_err());
        assert!(validate_base_url("ftp://backend".to_string()).is_err());
        assert!(validate_base_url("not a url".to_string()).is_err());
    }

    #[test]
    fn test_env_number_default() {
        let value: u64 = env_number("SMARTCONVERT_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
