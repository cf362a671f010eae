use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_MAPS_BASE_URL: &str = "https://maps.googleapis.com";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Absent key is tolerated at start-up; searches then fail with a configuration error.
    pub google_maps_api_key: Option<String>,
    pub google_maps_base_url: String,
    pub max_pages_per_zone: usize,
    pub detail_concurrency: usize,
    pub search_timeout_secs: u64,
    pub geocode_cache_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Maps Base URL: {}", config.google_maps_base_url);
        tracing::debug!(
            "Pagination cap: {} page(s) per zone, detail concurrency: {}",
            config.max_pages_per_zone,
            config.detail_concurrency
        );
        tracing::debug!("Search timeout: {}s", config.search_timeout_secs);
        tracing::debug!("Server Port: {}", config.port);
        if config.google_maps_api_key.is_none() {
            tracing::warn!("GOOGLE_MAPS_API_KEY not set; place searches will be rejected");
        }

        Ok(config)
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            port: lookup("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))
                .and_then(|port: u16| {
                    if port == 0 {
                        anyhow::bail!("PORT must be a valid number between 1-65535");
                    }
                    Ok(port)
                })?,
            google_maps_api_key: lookup("GOOGLE_MAPS_API_KEY").filter(|s| !s.trim().is_empty()),
            google_maps_base_url: lookup("GOOGLE_MAPS_BASE_URL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MAPS_BASE_URL.to_string())
                .parse::<url::Url>()
                .map_err(|e| anyhow::anyhow!("GOOGLE_MAPS_BASE_URL is not a valid URL: {}", e))
                .and_then(|url| {
                    if url.scheme() != "http" && url.scheme() != "https" {
                        anyhow::bail!("GOOGLE_MAPS_BASE_URL must start with http:// or https://");
                    }
                    Ok(url.as_str().trim_end_matches('/').to_string())
                })?,
            max_pages_per_zone: positive(&lookup, "PLACES_MAX_PAGES", 3)?,
            detail_concurrency: positive(&lookup, "PLACES_DETAIL_CONCURRENCY", 8)?,
            search_timeout_secs: positive(&lookup, "SEARCH_TIMEOUT_SECS", 60)? as u64,
            geocode_cache_ttl_secs: lookup("GEOCODE_CACHE_TTL_SECS")
                .unwrap_or_else(|| "3600".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("GEOCODE_CACHE_TTL_SECS must be a whole number"))?,
        };

        Ok(config)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn geocode_cache_ttl(&self) -> Option<Duration> {
        (self.geocode_cache_ttl_secs > 0).then(|| Duration::from_secs(self.geocode_cache_ttl_secs))
    }
}

fn positive<F>(lookup: &F, key: &str, default: usize) -> anyhow::Result<usize>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(value) if value >= 1 => Ok(value),
            _ => anyhow::bail!("{} must be a whole number >= 1", key),
        },
    }
}
