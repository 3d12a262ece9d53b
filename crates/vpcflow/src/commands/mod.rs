pub mod sshkey;

use std::path::Path;
use vpcflow_cloud::StateStore;
use vpcflow_cloud_ibm::{IbmClientSession, IbmProvider};
use vpcflow_config::{Config, ProviderSettings};

/// Everything a resource command needs: resolved provider and state store
pub struct Context {
    pub config: Config,
    pub provider: IbmProvider,
    pub session: IbmClientSession,
    pub state: StateStore,
}

impl Context {
    pub async fn new(project_dir: &Path, settings: ProviderSettings) -> anyhow::Result<Self> {
        let config = settings.resolve()?;
        let provider = IbmProvider::new();
        let session = provider.configure_with(&config).await?;
        let state = StateStore::in_project(project_dir);
        tracing::debug!("State file: {}", state.path().display());

        Ok(Self {
            config,
            provider,
            session,
            state,
        })
    }
}
