//! IBM Cloud provider for vpcflow
//!
//! Resolves credentials into a client session and implements the `sshkey`
//! resource on top of the VPC API.
//!
//! # Authentication
//!
//! - API key (`IC_API_KEY`), exchanged for a token at IAM
//! - IAM access + refresh token pair (`IC_IAM_TOKEN`, `IC_IAM_REFRESH_TOKEN`),
//!   refreshed once at IAM
//!
//! Without either, configuration still succeeds and every client accessor
//! on the session reports the missing credentials.
//!
//! # Example
//!
//! ```ignore
//! use vpcflow_cloud::{Resource, ResourceData};
//! use vpcflow_cloud_ibm::{IbmProvider, SshKey};
//! use vpcflow_config::ProviderSettings;
//!
//! let provider = IbmProvider::new();
//! let session = provider.configure(ProviderSettings::from_env()).await?;
//!
//! let mut key = ResourceData::new(SshKey::new("deploy", "ssh-ed25519 AAAA..."));
//! provider.ssh_key().create(&mut key, &session).await?;
//! println!("created {}", key.id());
//! ```

pub mod error;
pub mod iam;
pub mod provider;
pub mod resource_controller;
pub mod session;
pub mod ssh_key;
mod transport;
pub mod vpc;

pub use error::{ApiError, IbmError, Result, SessionError};
pub use iam::{IamClient, IamToken};
pub use provider::{IbmProvider, PROVIDER_NAME};
pub use resource_controller::ResourceControllerApi;
pub use session::{AuthMethod, ClientSession, IamSession, IbmClientSession, resolve};
pub use ssh_key::{SshKey, SshKeyResource};
pub use transport::ClientOptions;
pub use vpc::{CreateKeyOptions, Key, KeyPatch, VpcV1};
