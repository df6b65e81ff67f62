use serde::{Deserialize, Serialize};
use url::Url;

use crate::util::redacted::Redacted;

pub const DEFAULT_API_URL: &str = "https://api.vrchat.cloud/api/1/";
pub const DEFAULT_PIPELINE_URL: &str = "wss://pipeline.vrchat.cloud/";
pub const DEFAULT_USER_AGENT: &str = concat!("vrcaa-cache/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub api: Api,
    #[serde(default)]
    pub pipeline: Pipeline,
    #[serde(default)]
    pub cache: Cache,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Api {
    #[serde(default = "default_api_url")]
    pub base_url: Url,
    pub auth_token: Redacted<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Pipeline {
    #[serde(default = "default_pipeline_url")]
    pub url: Url,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            url: default_pipeline_url(),
            enabled: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Cache {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

fn default_api_url() -> Url {
    Url::parse(DEFAULT_API_URL).expect("default api url is valid")
}

fn default_pipeline_url() -> Url {
    Url::parse(DEFAULT_PIPELINE_URL).expect("default pipeline url is valid")
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config: Config = toml::from_str(r#"
            [api]
            auth_token = "authcookie_abc"
        "#).unwrap();

        assert_eq!(config.api.base_url.as_str(), DEFAULT_API_URL);
        assert_eq!(config.api.auth_token.as_inner(), "authcookie_abc");
        assert_eq!(config.api.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.pipeline.url.as_str(), DEFAULT_PIPELINE_URL);
        assert!(config.pipeline.enabled);
        assert_eq!(config.cache.page_size, 50);
    }

    #[test]
    fn token_is_not_printed() {
        let config: Config = toml::from_str(r#"
            [api]
            auth_token = "authcookie_secret"

            [pipeline]
            enabled = false

            [cache]
            page_size = 25
        "#).unwrap();

        let printed = format!("{:?}", config);
        assert!(!printed.contains("authcookie_secret"));
        assert!(!config.pipeline.enabled);
        assert_eq!(config.cache.page_size, 25);
    }
}
