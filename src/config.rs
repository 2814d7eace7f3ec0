//! Configuration loader: merges env vars, .env file, and config.toml.

use common::{Error, ResolverConfig};
use std::path::Path;

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn parse_positive_u32(raw: &str, env_name: &str) -> Result<u32, Error> {
    let parsed = parse_positive_u64(raw, env_name)?;
    u32::try_from(parsed).map_err(|_| Error::Config(format!("{env_name} is out of range")))
}

fn validate_config(config: &ResolverConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.app_id == 0 {
        issues.push("app_id must be > 0".into());
    }
    if config.ws_url.trim().is_empty() {
        issues.push("ws_url must not be empty".into());
    } else if !(config.ws_url.starts_with("wss://") || config.ws_url.starts_with("ws://")) {
        issues.push("ws_url must start with ws:// or wss://".into());
    }
    if config.language.trim().is_empty() {
        issues.push("language must not be empty".into());
    }
    if config.cache_ttl_secs == 0 {
        issues.push("cache_ttl_secs must be > 0".into());
    }
    if config.store_path.trim().is_empty() {
        issues.push("store_path must not be empty".into());
    }
    if config.requests_per_sec == 0 {
        issues.push("requests_per_sec must be > 0".into());
    }
    if config.request_timeout_secs == 0 {
        issues.push("request_timeout_secs must be > 0".into());
    }

    let catalog = &config.catalog;
    if catalog.contract_categories.is_empty() {
        issues.push("catalog.contract_categories must not be empty".into());
    }
    for name in &catalog.category_names {
        if catalog.contract_category(&name.category).is_none() {
            issues.push(format!(
                "catalog.category_names entry '{}' has no contract category",
                name.category
            ));
        }
    }
    for category in &catalog.contract_categories {
        for member in &category.members {
            if catalog.opposites_for(member).is_none() {
                issues.push(format!(
                    "catalog.opposites has no entry for trade type '{}'",
                    member
                ));
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load configuration from environment and optional config file.
pub fn load_config(config_path: Option<&Path>) -> Result<ResolverConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = ResolverConfig::default();

    // 3. Try loading config.toml if it exists.
    let config_path = config_path.unwrap_or_else(|| Path::new("config.toml"));
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", config_path.display(), e))
        })?;
        config = toml::from_str(&contents).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", config_path.display(), e))
        })?;
    }

    // 4. Override with environment variables (highest priority).
    if let Ok(raw) = std::env::var("BINARY_APP_ID") {
        config.app_id = parse_positive_u32(&raw, "BINARY_APP_ID")?;
    }
    if let Ok(url) = std::env::var("BINARY_WS_URL") {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            tracing::warn!("Ignoring empty BINARY_WS_URL override");
        } else {
            tracing::info!("Using BINARY_WS_URL override: {}", trimmed);
            config.ws_url = trimmed.to_string();
        }
    }
    if let Ok(lang) = std::env::var("BINARY_LANGUAGE") {
        config.language = lang.trim().to_ascii_uppercase();
    }
    if let Ok(raw) = std::env::var("DURATIONS_CACHE_TTL_SECS") {
        config.cache_ttl_secs = parse_positive_u64(&raw, "DURATIONS_CACHE_TTL_SECS")?;
    }
    if let Ok(path) = std::env::var("DURATIONS_STORE_PATH") {
        config.store_path = path.trim().to_string();
    }
    if let Ok(raw) = std::env::var("DURATIONS_REQUESTS_PER_SEC") {
        config.requests_per_sec = parse_positive_u32(&raw, "DURATIONS_REQUESTS_PER_SEC")?;
    }
    if let Ok(raw) = std::env::var("DURATIONS_REQUEST_TIMEOUT_SECS") {
        config.request_timeout_secs = parse_positive_u64(&raw, "DURATIONS_REQUEST_TIMEOUT_SECS")?;
    }

    // 5. Validate.
    validate_config(&config)?;

    Ok(config)
}
