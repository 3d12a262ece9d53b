//! IAM identity service client
//!
//! Exchanges an API key for an access token, or refreshes a token pair.
//! Neither call is retried here; a failure ends session resolution.

use crate::error::SessionError;
use crate::transport::client_builder;
use reqwest::header::ACCEPT;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

const TOKEN_PATH: &str = "/identity/token";
const API_KEY_GRANT: &str = "urn:ibm:params:oauth:grant-type:apikey";
const REFRESH_GRANT: &str = "refresh_token";

/// Client id/secret the IBM Cloud CLI tooling uses for token grants
const CLIENT_ID: &str = "bx";
const CLIENT_SECRET: &str = "bx";

/// Token set returned by the identity service
#[derive(Debug, Clone, Deserialize)]
pub struct IamToken {
    #[serde(deserialize_with = "secret")]
    pub access_token: SecretString,

    #[serde(default, deserialize_with = "optional_secret")]
    pub refresh_token: Option<SecretString>,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    #[serde(default)]
    pub expires_in: Option<u64>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

fn optional_secret<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

impl IamToken {
    /// Authorization header value, e.g. `Bearer eyJ...`
    pub fn authorization(&self) -> SecretString {
        SecretString::from(format!(
            "{} {}",
            self.token_type,
            self.access_token.expose_secret()
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IamErrorBody {
    error_code: Option<String>,
    error_message: Option<String>,
}

/// Client for the IAM token endpoint
#[derive(Debug, Clone)]
pub struct IamClient {
    client: reqwest::Client,
    token_url: String,
}

impl IamClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, SessionError> {
        let client = client_builder(timeout)
            .build()
            .map_err(|e| SessionError::ClientConstructionFailed {
                service: "iam",
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            token_url: format!("{}{}", endpoint.trim_end_matches('/'), TOKEN_PATH),
        })
    }

    /// Exchange an API key for a token set
    pub async fn authenticate_api_key(
        &self,
        api_key: &SecretString,
    ) -> Result<IamToken, SessionError> {
        tracing::debug!("Authenticating API key with IAM");
        let token = self
            .request_token(&[
                ("grant_type", API_KEY_GRANT),
                ("apikey", api_key.expose_secret()),
            ])
            .await
            .map_err(SessionError::AuthenticationFailed)?;
        tracing::info!("IAM authentication completed successfully");
        Ok(token)
    }

    /// Trade a refresh token for a new token set
    pub async fn refresh_token(
        &self,
        refresh_token: &SecretString,
    ) -> Result<IamToken, SessionError> {
        tracing::debug!("Refreshing IAM access token");
        let token = self
            .request_token(&[
                ("grant_type", REFRESH_GRANT),
                ("refresh_token", refresh_token.expose_secret()),
            ])
            .await
            .map_err(SessionError::RefreshFailed)?;
        tracing::info!("IAM token refresh completed successfully");
        Ok(token)
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<IamToken, String> {
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(CLIENT_ID, Some(CLIENT_SECRET))
            .header(ACCEPT, "application/json")
            .form(form)
            .send()
            .await
            .map_err(|e| format!("token request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<IamErrorBody>(&body) {
                Ok(IamErrorBody {
                    error_code,
                    error_message: Some(message),
                }) => match error_code {
                    Some(code) => format!("{} ({})", message, code),
                    None => message,
                },
                _ => body,
            };
            return Err(format!("status {}: {}", status.as_u16(), message));
        }

        response
            .json()
            .await
            .map_err(|e| format!("failed to parse token response: {}", e))
    }
}
