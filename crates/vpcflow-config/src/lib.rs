pub mod error;

pub use error::*;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_REGION: &str = "us-south";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_RETRIES: u32 = 10;
pub const DEFAULT_GENERATION: u32 = 2;
pub const DEFAULT_IAM_ENDPOINT: &str = "https://iam.cloud.ibm.com";
pub const DEFAULT_RESOURCE_CONTROLLER_ENDPOINT: &str = "https://resource-controller.cloud.ibm.com";

/// Constant delay between API retries
pub const RETRY_API_DELAY: Duration = Duration::from_secs(5);

/// Environment variables consulted for each setting, first match wins
pub mod env {
    pub const BLUEMIX_API_KEY: &[&str] = &["BM_API_KEY", "BLUEMIX_API_KEY"];
    pub const BLUEMIX_TIMEOUT: &[&str] = &["BM_TIMEOUT", "BLUEMIX_TIMEOUT"];
    pub const IBMCLOUD_API_KEY: &[&str] = &["IC_API_KEY", "IBMCLOUD_API_KEY"];
    pub const IBMCLOUD_TIMEOUT: &[&str] = &["IC_TIMEOUT", "IBMCLOUD_TIMEOUT"];
    pub const REGION: &[&str] = &[
        "IC_REGION",
        "IBMCLOUD_REGION",
        "BM_REGION",
        "BLUEMIX_REGION",
    ];
    pub const ZONE: &[&str] = &["IC_ZONE", "IBMCLOUD_ZONE"];
    pub const RESOURCE_GROUP: &[&str] = &[
        "IC_RESOURCE_GROUP",
        "IBMCLOUD_RESOURCE_GROUP",
        "BM_RESOURCE_GROUP",
        "BLUEMIX_RESOURCE_GROUP",
    ];
    pub const MAX_RETRIES: &[&str] = &["MAX_RETRIES"];
    pub const RIAAS_ENDPOINT: &[&str] = &["RIAAS_ENDPOINT"];
    pub const GENERATION: &[&str] = &["IC_GENERATION", "IBMCLOUD_GENERATION"];
    pub const IAM_TOKEN: &[&str] = &["IC_IAM_TOKEN", "IBMCLOUD_IAM_TOKEN"];
    pub const IAM_REFRESH_TOKEN: &[&str] = &["IC_IAM_REFRESH_TOKEN", "IBMCLOUD_IAM_REFRESH_TOKEN"];
    pub const VPC_ENDPOINT: &[&str] = &["IBMCLOUD_IS_NG_API_ENDPOINT"];
    pub const IAM_ENDPOINT: &[&str] = &["IBMCLOUD_IAM_API_ENDPOINT"];
    pub const RESOURCE_CONTROLLER_ENDPOINT: &[&str] =
        &["IBMCLOUD_RESOURCE_CONTROLLER_API_ENDPOINT"];

    /// Every variable the provider reads
    pub const ALL: &[&[&str]] = &[
        BLUEMIX_API_KEY,
        BLUEMIX_TIMEOUT,
        IBMCLOUD_API_KEY,
        IBMCLOUD_TIMEOUT,
        REGION,
        ZONE,
        RESOURCE_GROUP,
        MAX_RETRIES,
        RIAAS_ENDPOINT,
        GENERATION,
        IAM_TOKEN,
        IAM_REFRESH_TOKEN,
        VPC_ENDPOINT,
        IAM_ENDPOINT,
        RESOURCE_CONTROLLER_ENDPOINT,
    ];
}

/// Provider settings as supplied by the user
///
/// Unset (or empty) fields fall back to the environment variables listed in
/// [`env`], then to the documented defaults. The `bluemix_*` and
/// `riaas_endpoint` fields are deprecated and kept for compatibility.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    #[serde(deserialize_with = "optional_secret")]
    pub bluemix_api_key: Option<SecretString>,
    pub bluemix_timeout: Option<u64>,
    #[serde(deserialize_with = "optional_secret")]
    pub ibmcloud_api_key: Option<SecretString>,
    pub ibmcloud_timeout: Option<u64>,
    pub region: Option<String>,
    pub zone: Option<String>,
    pub resource_group: Option<String>,
    pub max_retries: Option<u32>,
    pub riaas_endpoint: Option<String>,
    pub generation: Option<u32>,
    #[serde(deserialize_with = "optional_secret")]
    pub iam_token: Option<SecretString>,
    #[serde(deserialize_with = "optional_secret")]
    pub iam_refresh_token: Option<SecretString>,
}

impl ProviderSettings {
    /// Settings with every field left to the environment
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Parse settings from a JSON document handed over by a host
    pub fn from_json(document: &str) -> Result<Self> {
        Ok(serde_json::from_str(document)?)
    }

    /// Apply environment fallbacks and defaults
    pub fn resolve(self) -> Result<Config> {
        let bluemix_api_key = secret_or_env(self.bluemix_api_key, env::BLUEMIX_API_KEY);
        let ibmcloud_api_key = secret_or_env(self.ibmcloud_api_key, env::IBMCLOUD_API_KEY);
        if bluemix_api_key.is_some() {
            tracing::warn!("bluemix_api_key is deprecated, please use ibmcloud_api_key");
        }
        // The non-deprecated key is applied last and wins
        let api_key = ibmcloud_api_key.or(bluemix_api_key);

        let bluemix_timeout =
            number_or_env(self.bluemix_timeout, "bluemix_timeout", env::BLUEMIX_TIMEOUT)?;
        let ibmcloud_timeout = number_or_env(
            self.ibmcloud_timeout,
            "ibmcloud_timeout",
            env::IBMCLOUD_TIMEOUT,
        )?;
        if bluemix_timeout.is_some() {
            tracing::warn!("bluemix_timeout is deprecated, please use ibmcloud_timeout");
        }
        let timeout_secs = ibmcloud_timeout
            .or(bluemix_timeout)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let riaas_endpoint = string_or_env(self.riaas_endpoint, env::RIAAS_ENDPOINT);
        if riaas_endpoint.is_some() {
            tracing::warn!("riaas_endpoint is deprecated, please use generation");
        }
        let vpc_endpoint = env_fallback(env::VPC_ENDPOINT).or(riaas_endpoint);

        Ok(Config {
            api_key,
            region: string_or_env(self.region, env::REGION)
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            resource_group: string_or_env(self.resource_group, env::RESOURCE_GROUP)
                .unwrap_or_default(),
            timeout: Duration::from_secs(timeout_secs),
            retry_count: number_or_env(self.max_retries, "max_retries", env::MAX_RETRIES)?
                .unwrap_or(DEFAULT_MAX_RETRIES),
            retry_delay: RETRY_API_DELAY,
            vpc_endpoint,
            generation: number_or_env(self.generation, "generation", env::GENERATION)?
                .unwrap_or(DEFAULT_GENERATION),
            iam_token: secret_or_env(self.iam_token, env::IAM_TOKEN),
            iam_refresh_token: secret_or_env(self.iam_refresh_token, env::IAM_REFRESH_TOKEN),
            zone: string_or_env(self.zone, env::ZONE).unwrap_or_default(),
            iam_endpoint: env_fallback(env::IAM_ENDPOINT)
                .unwrap_or_else(|| DEFAULT_IAM_ENDPOINT.to_string()),
            resource_controller_endpoint: env_fallback(env::RESOURCE_CONTROLLER_ENDPOINT)
                .unwrap_or_else(|| DEFAULT_RESOURCE_CONTROLLER_ENDPOINT.to_string()),
        })
    }
}

/// Immutable provider configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<SecretString>,
    pub region: String,
    pub resource_group: String,
    /// HTTP timeout for API calls; zero leaves requests unbounded
    pub timeout: Duration,
    pub retry_count: u32,
    pub retry_delay: Duration,
    /// VPC API endpoint override (host name or full URL)
    pub vpc_endpoint: Option<String>,
    pub generation: u32,
    pub iam_token: Option<SecretString>,
    pub iam_refresh_token: Option<SecretString>,
    pub zone: String,
    pub iam_endpoint: String,
    pub resource_controller_endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            region: DEFAULT_REGION.to_string(),
            resource_group: String::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry_count: DEFAULT_MAX_RETRIES,
            retry_delay: RETRY_API_DELAY,
            vpc_endpoint: None,
            generation: DEFAULT_GENERATION,
            iam_token: None,
            iam_refresh_token: None,
            zone: String::new(),
            iam_endpoint: DEFAULT_IAM_ENDPOINT.to_string(),
            resource_controller_endpoint: DEFAULT_RESOURCE_CONTROLLER_ENDPOINT.to_string(),
        }
    }
}

/// First non-empty value among the given environment variables
pub fn env_fallback(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.is_empty())
}

fn string_or_env(explicit: Option<String>, keys: &[&str]) -> Option<String> {
    explicit
        .filter(|value| !value.is_empty())
        .or_else(|| env_fallback(keys))
}

fn secret_or_env(explicit: Option<SecretString>, keys: &[&str]) -> Option<SecretString> {
    explicit
        .filter(|value| !value.expose_secret().is_empty())
        .or_else(|| env_fallback(keys).map(SecretString::from))
}

fn optional_secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

fn number_or_env<T: FromStr>(
    explicit: Option<T>,
    field: &'static str,
    keys: &[&str],
) -> Result<Option<T>> {
    if explicit.is_some() {
        return Ok(explicit);
    }
    match env_fallback(keys) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { field, value: raw }),
        None => Ok(None),
    }
}
