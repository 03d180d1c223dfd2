use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheOptions;
use crate::error::ConfigError;
use crate::rate_limit::RateLimiterOptions;
use crate::utils::hash_api_key;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    /// API Key 的 SHA-256 摘要
    pub api_key_hashes: Vec<String>,
    pub rate_limit_window_ms: u64,
    pub rate_limit_requests: u32,
    pub search_rate_limit_requests: u32,
    pub upload_rate_limit_requests: u32,
    pub rate_limit_skip_successful: bool,
    pub rate_limit_skip_failed: bool,
    pub cleanup_interval_secs: u64,
    pub cache_max_size: usize,
    pub cache_default_ttl_ms: u64,
    pub barter_rates_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_vars(env::vars())
    }

    /// 从任意键值对加载配置，除 `API_KEYS` 外均有默认值
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let api_keys = vars.get("API_KEYS").ok_or(ConfigError::Missing("API_KEYS"))?;
        let api_key_hashes: Vec<String> = api_keys
            .split(',')
            .filter(|key| !key.trim().is_empty())
            .map(hash_api_key)
            .collect();
        if api_key_hashes.is_empty() {
            return Err(ConfigError::Invalid {
                name: "API_KEYS",
                value: api_keys.clone(),
            });
        }

        Ok(Config {
            server_host: vars
                .get("SERVER_HOST")
                .cloned()
                .unwrap_or_else(|| "::".to_string()),
            server_port: parse_or(&vars, "SERVER_PORT", 3000)?,
            api_base_uri: vars
                .get("API_BASE_URI")
                .cloned()
                .unwrap_or_else(|| "/api".to_string()),
            api_key_hashes,
            rate_limit_window_ms: parse_or(&vars, "RATE_LIMIT_WINDOW_MS", 60_000)?,
            rate_limit_requests: parse_or(&vars, "RATE_LIMIT_REQUESTS", 100)?,
            search_rate_limit_requests: parse_or(&vars, "SEARCH_RATE_LIMIT_REQUESTS", 30)?,
            upload_rate_limit_requests: parse_or(&vars, "UPLOAD_RATE_LIMIT_REQUESTS", 10)?,
            rate_limit_skip_successful: parse_bool_or(&vars, "RATE_LIMIT_SKIP_SUCCESSFUL", false)?,
            rate_limit_skip_failed: parse_bool_or(&vars, "RATE_LIMIT_SKIP_FAILED", false)?,
            cleanup_interval_secs: parse_or(&vars, "CLEANUP_INTERVAL_SECS", 60)?,
            cache_max_size: parse_or(&vars, "CACHE_MAX_SIZE", 100)?,
            cache_default_ttl_ms: parse_or(&vars, "CACHE_DEFAULT_TTL_MS", 300_000)?,
            barter_rates_path: vars
                .get("BARTER_RATES_PATH")
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    fn rate_limit(&self, max_requests: u32) -> RateLimiterOptions {
        RateLimiterOptions::new(self.rate_limit_window_ms, max_requests)
            .skip_successful_requests(self.rate_limit_skip_successful)
            .skip_failed_requests(self.rate_limit_skip_failed)
    }

    pub fn api_rate_limit(&self) -> RateLimiterOptions {
        self.rate_limit(self.rate_limit_requests)
    }

    pub fn search_rate_limit(&self) -> RateLimiterOptions {
        self.rate_limit(self.search_rate_limit_requests)
    }

    pub fn upload_rate_limit(&self) -> RateLimiterOptions {
        self.rate_limit(self.upload_rate_limit_requests)
    }

    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            max_size: self.cache_max_size,
            default_ttl_ms: self.cache_default_ttl_ms,
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }

    pub fn is_valid_api_key(&self, key: &str) -> bool {
        let digest = hash_api_key(key);
        self.api_key_hashes.iter().any(|h| *h == digest)
    }
}

fn parse_or<T: FromStr>(
    vars: &HashMap<String, String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw.clone(),
        }),
    }
}

fn parse_bool_or(
    vars: &HashMap<String, String>,
    name: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match vars.get(name).map(|raw| raw.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(raw) => match raw.as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value: raw }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_only_api_keys_given() {
        let config = Config::from_vars([("API_KEYS", "alpha")]).unwrap();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.api_base_uri, "/api");
        assert_eq!(config.api_rate_limit(), RateLimiterOptions::new(60_000, 100));
        assert_eq!(config.search_rate_limit().max_requests, 30);
        assert_eq!(config.upload_rate_limit().max_requests, 10);
        assert_eq!(config.cache_options(), CacheOptions::default());
        assert_eq!(config.cleanup_interval(), Duration::from_secs(60));
        assert!(config.barter_rates_path.is_none());
    }

    #[test]
    fn api_keys_are_required() {
        let err = Config::from_vars(Vec::<(String, String)>::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("API_KEYS")));

        let err = Config::from_vars([("API_KEYS", " , ")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "API_KEYS", .. }));
    }

    #[test]
    fn api_keys_are_kept_as_digests() {
        let config = Config::from_vars([("API_KEYS", "alpha, beta")]).unwrap();

        assert_eq!(config.api_key_hashes.len(), 2);
        assert!(!config.api_key_hashes.iter().any(|h| h == "alpha"));
        assert!(config.is_valid_api_key("alpha"));
        assert!(config.is_valid_api_key("beta"));
        assert!(!config.is_valid_api_key("gamma"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_vars([
            ("API_KEYS", "alpha"),
            ("SERVER_PORT", "8080"),
            ("RATE_LIMIT_WINDOW_MS", "1000"),
            ("RATE_LIMIT_REQUESTS", "5"),
            ("RATE_LIMIT_SKIP_FAILED", "true"),
            ("CACHE_MAX_SIZE", "7"),
            ("BARTER_RATES_PATH", "/etc/agrimarket/rates.json"),
        ])
        .unwrap();

        assert_eq!(config.server_port, 8080);
        let api = config.api_rate_limit();
        assert_eq!(api.window_ms, 1000);
        assert_eq!(api.max_requests, 5);
        assert!(api.skip_failed_requests);
        assert!(!api.skip_successful_requests);
        assert_eq!(config.cache_options().max_size, 7);
        assert_eq!(
            config.barter_rates_path,
            Some(PathBuf::from("/etc/agrimarket/rates.json"))
        );
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = Config::from_vars([("API_KEYS", "alpha"), ("SERVER_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SERVER_PORT", .. }));

        let err = Config::from_vars([("API_KEYS", "alpha"), ("RATE_LIMIT_SKIP_FAILED", "maybe")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "RATE_LIMIT_SKIP_FAILED", .. }));
    }
}
