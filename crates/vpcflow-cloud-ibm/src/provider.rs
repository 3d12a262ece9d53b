//! IBM Cloud provider entry point

use crate::error::Result;
use crate::session::{self, IbmClientSession};
use crate::ssh_key::{self, SshKeyResource};
use vpcflow_config::{Config, ProviderSettings};

/// Provider name used in state keys
pub const PROVIDER_NAME: &str = "ibm";

/// IBM Cloud provider
///
/// Configuring the provider resolves settings and credentials into the
/// client session every resource operation receives.
#[derive(Debug, Clone, Copy, Default)]
pub struct IbmProvider;

impl IbmProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn name(&self) -> &str {
        PROVIDER_NAME
    }

    pub fn display_name(&self) -> &str {
        "IBM Cloud"
    }

    /// Resource types this provider manages
    pub fn resource_types(&self) -> &'static [&'static str] {
        &[ssh_key::RESOURCE_TYPE]
    }

    /// Resolve user settings and build the client session
    pub async fn configure(&self, settings: ProviderSettings) -> Result<IbmClientSession> {
        let config = settings.resolve()?;
        self.configure_with(&config).await
    }

    /// Build the client session from an already resolved configuration
    pub async fn configure_with(&self, config: &Config) -> Result<IbmClientSession> {
        tracing::debug!("Configuring {} provider: {:?}", self.display_name(), config);
        Ok(session::resolve(config).await?)
    }

    pub fn ssh_key(&self) -> SshKeyResource {
        SshKeyResource::new()
    }
}
