//! IBM Cloud VPC API client
//!
//! Covers the key endpoints of the VPC (`/v1`) API. Every request carries
//! the `version` and `generation` query parameters the API requires.

use crate::error::{ApiError, SessionError};
use crate::transport::{ApiTransport, ClientOptions};
use serde::{Deserialize, Serialize};

const MERGE_PATCH: &str = "application/merge-patch+json";

/// API version date for requests; any date up to today is accepted
pub fn create_version_date() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

/// VPC API client
#[derive(Debug, Clone)]
pub struct VpcV1 {
    transport: ApiTransport,
    version: String,
    generation: String,
}

impl VpcV1 {
    pub fn new(options: ClientOptions, generation: u32) -> Result<Self, SessionError> {
        Ok(Self {
            transport: ApiTransport::new("vpc", options)?,
            version: create_version_date(),
            generation: generation.to_string(),
        })
    }

    /// Pin the API version date instead of using today's date
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn service_url(&self) -> &str {
        self.transport.base_url()
    }

    fn query(&self) -> [(&'static str, &str); 2] {
        [("version", self.version.as_str()), ("generation", self.generation.as_str())]
    }

    /// List all keys in the account, following pagination
    pub async fn list_keys(&self) -> Result<Vec<Key>, ApiError> {
        let url = self.transport.url("/keys");
        let mut keys = Vec::new();
        let mut start: Option<String> = None;

        loop {
            let page: KeyCollection = self
                .transport
                .json(|c| {
                    let request = c.get(&url).query(&self.query());
                    match &start {
                        Some(token) => request.query(&[("start", token)]),
                        None => request,
                    }
                })
                .await?;

            keys.extend(page.keys);
            start = page.next.as_ref().and_then(PageLink::start_token);
            if start.is_none() {
                break;
            }
        }

        tracing::debug!("Listed {} SSH keys", keys.len());
        Ok(keys)
    }

    /// Get a key by ID
    pub async fn get_key(&self, id: &str) -> Result<Key, ApiError> {
        let url = self.transport.url(&format!("/keys/{}", id));
        self.transport
            .json(|c| c.get(&url).query(&self.query()))
            .await
    }

    /// Create a key
    pub async fn create_key(&self, options: &CreateKeyOptions) -> Result<Key, ApiError> {
        let url = self.transport.url("/keys");
        self.transport
            .json(|c| c.post(&url).query(&self.query()).json(options))
            .await
    }

    /// Apply a merge patch to a key
    pub async fn update_key(&self, id: &str, patch: &KeyPatch) -> Result<Key, ApiError> {
        let url = self.transport.url(&format!("/keys/{}", id));
        // A content type set up front survives `json()`
        self.transport
            .json(|c| {
                c.patch(&url)
                    .query(&self.query())
                    .header(reqwest::header::CONTENT_TYPE, MERGE_PATCH)
                    .json(patch)
            })
            .await
    }

    /// Delete a key
    pub async fn delete_key(&self, id: &str) -> Result<(), ApiError> {
        let url = self.transport.url(&format!("/keys/{}", id));
        self.transport
            .send(|c| c.delete(&url).query(&self.query()))
            .await?;
        Ok(())
    }
}

// ============ API Types ============

/// SSH key as returned by the VPC API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Key {
    pub id: String,
    #[serde(default)]
    pub crn: String,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(rename = "type", default)]
    pub key_type: String,
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default)]
    pub length: i64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub resource_group: Option<ResourceGroupReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceGroupReference {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeyCollection {
    #[serde(default)]
    keys: Vec<Key>,
    #[serde(default)]
    next: Option<PageLink>,
}

#[derive(Debug, Deserialize)]
struct PageLink {
    href: String,
}

impl PageLink {
    /// Extract the `start` token from the next-page link
    fn start_token(&self) -> Option<String> {
        let url = reqwest::Url::parse(&self.href).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == "start")
            .map(|(_, v)| v.into_owned())
    }
}

/// Identity of a resource group, by ID
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceGroupIdentity {
    pub id: String,
}

/// Request body for creating a key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateKeyOptions {
    pub name: String,
    pub public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<ResourceGroupIdentity>,
}

impl CreateKeyOptions {
    pub fn new(name: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public_key: public_key.into(),
            resource_group: None,
        }
    }

    pub fn with_resource_group(mut self, id: impl Into<String>) -> Self {
        self.resource_group = Some(ResourceGroupIdentity { id: id.into() });
        self
    }
}

/// Mutable key fields; unset fields are left out of the patch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl KeyPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
    }
}
