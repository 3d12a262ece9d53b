//! `sshkey` resource
//!
//! Manages a VPC SSH public key. Only the name can change in place; a new
//! public key or resource group means a new key. Keys created elsewhere can
//! be imported by ID.

use crate::error::{IbmError, Result};
use crate::session::ClientSession;
use crate::vpc::{CreateKeyOptions, Key, KeyPatch};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vpcflow_cloud::{FieldSchema, Resource, ResourceData};

/// Resource type name
pub const RESOURCE_TYPE: &str = "sshkey";

/// Console path listing SSH keys, appended to the console base URL
pub const CONSOLE_SSH_KEYS_PATH: &str = "/vpc-ext/compute/sshKeys";

/// Attribute names
pub mod field {
    pub const NAME: &str = "name";
    pub const PUBLIC_KEY: &str = "public_key";
    pub const TYPE: &str = "type";
    pub const FINGERPRINT: &str = "fingerprint";
    pub const LENGTH: &str = "length";
    pub const RESOURCE_GROUP: &str = "resource_group";
    pub const RESOURCE_NAME: &str = "resource_name";
    pub const RESOURCE_CRN: &str = "resource_crn";
    pub const RESOURCE_GROUP_NAME: &str = "resource_group_name";
    pub const RESOURCE_CONTROLLER_URL: &str = "resource_controller_url";
}

static SCHEMA: [FieldSchema; 10] = [
    FieldSchema::required(field::NAME, "SSH key name"),
    FieldSchema::required(field::PUBLIC_KEY, "SSH public key data").force_new(),
    FieldSchema::computed(field::TYPE, "Key type"),
    FieldSchema::computed(field::FINGERPRINT, "SSH key fingerprint"),
    FieldSchema::computed(field::LENGTH, "SSH key length"),
    FieldSchema::optional_computed(field::RESOURCE_GROUP, "Resource group ID").force_new(),
    FieldSchema::computed(field::RESOURCE_NAME, "The name of the resource"),
    FieldSchema::computed(field::RESOURCE_CRN, "The crn of the resource"),
    FieldSchema::computed(
        field::RESOURCE_GROUP_NAME,
        "The resource group name in which resource is provisioned",
    ),
    FieldSchema::computed(
        field::RESOURCE_CONTROLLER_URL,
        "The URL of the IBM Cloud dashboard that can be used to explore and view details about this instance",
    ),
];

/// Persisted attributes of an SSH key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshKey {
    pub name: String,
    pub public_key: String,
    #[serde(rename = "type")]
    pub key_type: String,
    pub fingerprint: String,
    pub length: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    pub resource_name: String,
    pub resource_crn: String,
    pub resource_group_name: String,
    pub resource_controller_url: String,
}

impl SshKey {
    pub fn new(name: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public_key: public_key.into(),
            ..Default::default()
        }
    }

    pub fn with_resource_group(mut self, resource_group: impl Into<String>) -> Self {
        self.resource_group = Some(resource_group.into());
        self
    }

    /// Overwrite every attribute from the remote key
    pub fn apply_remote(&mut self, key: &Key, console_url: Option<&str>) {
        self.name = key.name.clone();
        self.public_key = key.public_key.clone();
        self.key_type = key.key_type.clone();
        self.fingerprint = key.fingerprint.clone();
        self.length = key.length;
        self.resource_name = key.name.clone();
        self.resource_crn = key.crn.clone();
        match &key.resource_group {
            Some(group) => {
                self.resource_group = Some(group.id.clone());
                self.resource_group_name = group.name.clone();
            }
            None => {
                self.resource_group = None;
                self.resource_group_name.clear();
            }
        }
        self.resource_controller_url = console_url
            .map(|base| format!("{}{}", base, CONSOLE_SSH_KEYS_PATH))
            .unwrap_or_default();
    }
}

/// Lifecycle handler for [`SshKey`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SshKeyResource;

impl SshKeyResource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Resource for SshKeyResource {
    type State = SshKey;
    type Meta = dyn ClientSession;
    type Error = IbmError;

    fn type_name(&self) -> &str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> &'static [FieldSchema] {
        &SCHEMA
    }

    async fn create(&self, d: &mut ResourceData<SshKey>, meta: &Self::Meta) -> Result<()> {
        let vpc = meta.vpc_v1_api()?;
        let name = d.attrs().name.clone();

        let keys = vpc
            .list_keys()
            .await
            .map_err(|source| IbmError::DuplicateNameResolutionFailed {
                name: name.clone(),
                source,
            })?;

        if let Some(existing) = keys.iter().find(|k| k.name == name) {
            tracing::info!("SSH key {} already exists as {}, adopting it", name, existing.id);
            d.set_id(existing.id.clone());
            return self.read(d, meta).await;
        }

        let attrs = d.attrs();
        let mut options = CreateKeyOptions::new(&attrs.name, &attrs.public_key);
        if let Some(group) = attrs.resource_group.as_deref().filter(|g| !g.is_empty()) {
            options = options.with_resource_group(group);
        }

        let key = vpc
            .create_key(&options)
            .await
            .map_err(|source| IbmError::RemoteCreateFailed {
                name: name.clone(),
                source,
            })?;

        tracing::info!("Created SSH key {} ({})", name, key.id);
        d.set_id(key.id);
        self.read(d, meta).await
    }

    async fn read(&self, d: &mut ResourceData<SshKey>, meta: &Self::Meta) -> Result<()> {
        let vpc = meta.vpc_v1_api()?;
        let id = d.id().to_string();

        let key = match vpc.get_key(&id).await {
            Ok(key) => key,
            Err(e) if e.is_not_found() => {
                tracing::info!("SSH key {} is gone, removing it from state", id);
                d.clear_id();
                return Ok(());
            }
            Err(source) => return Err(IbmError::RemoteReadFailed { id, source }),
        };

        let console_url = match meta.resource_controller_api() {
            Ok(rc) => Some(rc.console_url()),
            Err(e) => {
                tracing::debug!("No console link for SSH key {}: {}", id, e);
                None
            }
        };

        d.attrs_mut().apply_remote(&key, console_url);
        Ok(())
    }

    async fn update(&self, d: &mut ResourceData<SshKey>, meta: &Self::Meta) -> Result<()> {
        let vpc = meta.vpc_v1_api()?;

        let mut patch = KeyPatch::default();
        if d.has_change(field::NAME) {
            patch.name = Some(d.attrs().name.clone());
        }

        if !patch.is_empty() {
            let id = d.id().to_string();
            vpc.update_key(&id, &patch)
                .await
                .map_err(|source| IbmError::RemoteUpdateFailed {
                    id: id.clone(),
                    source,
                })?;
            tracing::info!("Updated SSH key {}", id);
        }

        self.read(d, meta).await
    }

    async fn delete(&self, d: &mut ResourceData<SshKey>, meta: &Self::Meta) -> Result<()> {
        let id = d.id().to_string();
        let vpc = match meta.vpc_v1_api() {
            Ok(vpc) => vpc,
            Err(e) => {
                tracing::warn!("Cannot reach VPC API to delete SSH key {}: {}", id, e);
                d.clear_id();
                return Ok(());
            }
        };

        match vpc.get_key(&id).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                tracing::info!("SSH key {} already deleted", id);
                d.clear_id();
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("Error checking SSH key {} before delete: {}", id, e);
                d.clear_id();
                return Ok(());
            }
        }

        match vpc.delete_key(&id).await {
            Ok(()) => tracing::info!("Deleted SSH key {}", id),
            Err(e) => tracing::warn!("Error deleting SSH key {}: {}", id, e),
        }

        d.clear_id();
        Ok(())
    }

    async fn exists(&self, d: &ResourceData<SshKey>, meta: &Self::Meta) -> Result<bool> {
        let vpc = meta.vpc_v1_api()?;
        let id = d.id();

        match vpc.get_key(id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(source) => Err(IbmError::RemoteReadFailed {
                id: id.to_string(),
                source,
            }),
        }
    }

    async fn import(&self, id: &str, meta: &Self::Meta) -> Result<ResourceData<SshKey>> {
        let mut d = ResourceData::existing(id, SshKey::default());
        self.read(&mut d, meta).await?;
        if d.is_absent() {
            return Err(IbmError::ImportNotFound { id: id.to_string() });
        }

        tracing::info!("Imported SSH key {} ({})", d.attrs().name, id);
        Ok(d)
    }
}
