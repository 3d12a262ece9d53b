//! Credential and session resolution
//!
//! Turns a [`Config`] into an [`IbmClientSession`]: picks the credential
//! source, authenticates against IAM, and builds the API clients. Client
//! construction errors are stored and surfaced by the accessor that needs
//! the client, so one broken client never blocks the others.

use crate::error::SessionError;
use crate::iam::{IamClient, IamToken};
use crate::resource_controller::ResourceControllerApi;
use crate::transport::ClientOptions;
use crate::vpc::VpcV1;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use vpcflow_cloud::RetryPolicy;
use vpcflow_config::{Config, DEFAULT_REGION};

/// Capability bundle handed to every resource operation
///
/// Each accessor returns either the ready client or the error that kept it
/// from being built.
pub trait ClientSession: Send + Sync {
    /// The authenticated IAM session
    fn iam_session(&self) -> Result<&IamSession, SessionError>;

    /// VPC API client
    fn vpc_v1_api(&self) -> Result<&VpcV1, SessionError>;

    /// Resource controller API client
    fn resource_controller_api(&self) -> Result<&ResourceControllerApi, SessionError>;

    /// Region in effect for this session
    fn region(&self) -> &str;
}

/// How the session authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    ApiKey,
    IamToken,
}

/// Authenticated IAM session
#[derive(Debug, Clone)]
pub struct IamSession {
    auth_method: AuthMethod,
    api_key: Option<SecretString>,
    /// Authorization value including the `Bearer ` prefix
    access_token: SecretString,
    refresh_token: SecretString,
    region: String,
    resource_group: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl IamSession {
    fn with_tokens(
        config: &Config,
        access_token: &SecretString,
        refresh_token: &SecretString,
    ) -> Self {
        Self {
            auth_method: AuthMethod::IamToken,
            api_key: None,
            access_token: access_token.clone(),
            refresh_token: refresh_token.clone(),
            ..Self::base(config)
        }
    }

    fn with_api_key(config: &Config, api_key: &SecretString) -> Self {
        Self {
            auth_method: AuthMethod::ApiKey,
            api_key: Some(api_key.clone()),
            ..Self::base(config)
        }
    }

    fn base(config: &Config) -> Self {
        Self {
            auth_method: AuthMethod::ApiKey,
            api_key: None,
            access_token: SecretString::from(String::new()),
            refresh_token: SecretString::from(String::new()),
            region: normalize_region(&config.region),
            resource_group: config.resource_group.clone(),
            timeout: config.timeout,
            retry: RetryPolicy::new(config.retry_count, config.retry_delay),
        }
    }

    /// Exchange the API key, or refresh the token pair, once
    async fn authenticate(&mut self, iam: &IamClient) -> Result<(), SessionError> {
        let token = match (&self.auth_method, &self.api_key) {
            (AuthMethod::ApiKey, Some(api_key)) => iam.authenticate_api_key(api_key).await?,
            _ => iam.refresh_token(&self.refresh_token).await?,
        };
        self.apply_token(token);
        Ok(())
    }

    fn apply_token(&mut self, token: IamToken) {
        self.access_token = token.authorization();
        if let Some(refresh_token) = token.refresh_token {
            self.refresh_token = refresh_token;
        }
    }

    pub fn auth_method(&self) -> AuthMethod {
        self.auth_method
    }

    /// Access token as an authorization value (`Bearer ...`)
    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    /// Access token without the `Bearer ` prefix
    pub fn bearer_token(&self) -> SecretString {
        SecretString::from(strip_bearer(self.access_token.expose_secret()).to_string())
    }

    pub fn refresh_token(&self) -> &SecretString {
        &self.refresh_token
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn client_options(&self, url: String) -> ClientOptions {
        ClientOptions {
            url,
            bearer_token: self.bearer_token(),
            timeout: self.timeout,
            retry: self.retry,
        }
    }
}

/// Concrete [`ClientSession`] with pre-resolved clients and errors
#[derive(Debug)]
pub struct IbmClientSession {
    session: Result<IamSession, SessionError>,
    vpc: Result<VpcV1, SessionError>,
    resource_controller: Result<ResourceControllerApi, SessionError>,
    region: String,
}

impl IbmClientSession {
    /// A session without credentials; every accessor reports `err`
    fn unconfigured(region: String, err: SessionError) -> Self {
        Self {
            session: Err(err.clone()),
            vpc: Err(err.clone()),
            resource_controller: Err(err),
            region,
        }
    }
}

impl ClientSession for IbmClientSession {
    fn iam_session(&self) -> Result<&IamSession, SessionError> {
        self.session.as_ref().map_err(Clone::clone)
    }

    fn vpc_v1_api(&self) -> Result<&VpcV1, SessionError> {
        self.vpc.as_ref().map_err(Clone::clone)
    }

    fn resource_controller_api(&self) -> Result<&ResourceControllerApi, SessionError> {
        self.resource_controller.as_ref().map_err(Clone::clone)
    }

    fn region(&self) -> &str {
        &self.region
    }
}

/// Resolve a configuration into a client session
///
/// Fails only for an incomplete token pair or a rejected IAM call. Missing
/// credentials and client construction failures are stored on the session.
pub async fn resolve(config: &Config) -> Result<IbmClientSession, SessionError> {
    let Some(mut session) = new_session(config)? else {
        tracing::info!("No credentials supplied, skipping IBM Cloud clients configuration");
        return Ok(IbmClientSession::unconfigured(
            normalize_region(&config.region),
            SessionError::MissingCredentials,
        ));
    };

    let iam = IamClient::new(&config.iam_endpoint, config.timeout)?;
    session.authenticate(&iam).await?;

    let region = session.region().to_string();
    tracing::info!("Configured region: {}", region);

    let vpc_url = vpc_service_url(&region, config.vpc_endpoint.as_deref());
    tracing::debug!("VPC endpoint: {}", vpc_url);
    let vpc = VpcV1::new(session.client_options(vpc_url), config.generation);
    if let Err(e) = &vpc {
        tracing::warn!("{}", e);
    }

    let resource_controller = ResourceControllerApi::new(
        session.client_options(config.resource_controller_endpoint.clone()),
    );
    if let Err(e) = &resource_controller {
        tracing::warn!("{}", e);
    }

    Ok(IbmClientSession {
        session: Ok(session),
        vpc,
        resource_controller,
        region,
    })
}

/// Pick the credential source, without calling IAM
///
/// A token pair takes precedence over an API key. `None` means no
/// credentials were supplied at all.
fn new_session(config: &Config) -> Result<Option<IamSession>, SessionError> {
    let token = non_empty(&config.iam_token);
    let refresh_token = non_empty(&config.iam_refresh_token);

    match (token, refresh_token) {
        (Some(token), Some(refresh_token)) => {
            tracing::info!("Configuring IBM Cloud session with token");
            Ok(Some(IamSession::with_tokens(config, token, refresh_token)))
        }
        (Some(_), None) | (None, Some(_)) => Err(SessionError::IncompleteTokenPair),
        (None, None) => match non_empty(&config.api_key) {
            Some(api_key) => {
                tracing::info!("Configuring IBM Cloud session with API key");
                Ok(Some(IamSession::with_api_key(config, api_key)))
            }
            None => Ok(None),
        },
    }
}

fn non_empty(value: &Option<SecretString>) -> Option<&SecretString> {
    value.as_ref().filter(|v| !v.expose_secret().is_empty())
}

/// Region as the session uses it
pub fn normalize_region(region: &str) -> String {
    let region = region.trim().to_ascii_lowercase();
    if region.is_empty() {
        DEFAULT_REGION.to_string()
    } else {
        region
    }
}

/// VPC base URL for a region, honouring an endpoint override
///
/// An override that is not an absolute URL is treated as a host name.
pub fn vpc_service_url(region: &str, endpoint_override: Option<&str>) -> String {
    match endpoint_override.map(str::trim).filter(|v| !v.is_empty()) {
        Some(url) if url.starts_with("https://") || url.starts_with("http://") => url.to_string(),
        Some(host) => format!("https://{}/v1", host),
        None => format!("https://{}.iaas.cloud.ibm.com/v1", region),
    }
}

/// Strip a literal `Bearer ` prefix from an authorization value
pub fn strip_bearer(token: &str) -> &str {
    token.strip_prefix("Bearer ").unwrap_or(token)
}
