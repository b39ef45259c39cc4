use std::env;
use std::time::Duration;

pub const DEFAULT_PRIMARY_API_BASE: &str = "https://image.pollinations.ai";
pub const DEFAULT_FALLBACK_API_BASE: &str = "https://picsum.photos";
pub const DEFAULT_IMAGE_SIZE: u32 = 512;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080/api/v1/dalle";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionConfig {
    pub primary_api_base: String,
    pub fallback_api_base: String,
    pub image_size: u32,
    pub timeout: Duration,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            primary_api_base: DEFAULT_PRIMARY_API_BASE.to_string(),
            fallback_api_base: DEFAULT_FALLBACK_API_BASE.to_string(),
            image_size: DEFAULT_IMAGE_SIZE,
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl AcquisitionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(non_empty_env)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            primary_api_base: lookup("DRAPE_PRIMARY_API_BASE")
                .map(|value| normalize_api_base(&value))
                .unwrap_or(defaults.primary_api_base),
            fallback_api_base: lookup("DRAPE_FALLBACK_API_BASE")
                .map(|value| normalize_api_base(&value))
                .unwrap_or(defaults.fallback_api_base),
            image_size: parse_or_default(lookup("DRAPE_IMAGE_SIZE"), "DRAPE_IMAGE_SIZE")
                .filter(|size: &u32| *size > 0)
                .unwrap_or(defaults.image_size),
            timeout: parse_or_default(lookup("DRAPE_HTTP_TIMEOUT_SECS"), "DRAPE_HTTP_TIMEOUT_SECS")
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

pub fn backend_url_from_env() -> String {
    non_empty_env("DRAPE_BACKEND_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
}

pub fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn normalize_api_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn parse_or_default<T: std::str::FromStr>(raw: Option<String>, key: &str) -> Option<T> {
    let raw = raw?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("ignoring {key}={raw:?}: not a valid number");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::AcquisitionConfig;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = AcquisitionConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, AcquisitionConfig::default());
        assert_eq!(config.image_size, 512);
    }

    #[test]
    fn overrides_are_applied_and_bases_normalized() {
        let config = AcquisitionConfig::from_lookup(lookup_from(&[
            ("DRAPE_PRIMARY_API_BASE", "http://127.0.0.1:9000/"),
            ("DRAPE_FALLBACK_API_BASE", "http://127.0.0.1:9001"),
            ("DRAPE_IMAGE_SIZE", "256"),
            ("DRAPE_HTTP_TIMEOUT_SECS", "5"),
        ]));
        assert_eq!(config.primary_api_base, "http://127.0.0.1:9000");
        assert_eq!(config.fallback_api_base, "http://127.0.0.1:9001");
        assert_eq!(config.image_size, 256);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let config = AcquisitionConfig::from_lookup(lookup_from(&[
            ("DRAPE_IMAGE_SIZE", "huge"),
            ("DRAPE_HTTP_TIMEOUT_SECS", "0"),
        ]));
        assert_eq!(config.image_size, 512);
        assert_eq!(config.timeout, Duration::from_secs(60));
    }
}
