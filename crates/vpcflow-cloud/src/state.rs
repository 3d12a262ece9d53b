//! Local record of applied resources
//!
//! The host keeps one JSON document per project under `.vpcflow/`. Every
//! write bumps a serial, keeps the previous document as `state.json.backup`
//! and replaces the file through a temporary file so a crash mid-write never
//! leaves a truncated state behind.

use crate::error::{CloudError, Result};
use crate::resource::ResourceData;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;

const FORMAT_VERSION: u32 = 1;
const DIR_NAME: &str = ".vpcflow";
const FILE_NAME: &str = "state.json";
const BACKUP_NAME: &str = "state.json.backup";
const TEMP_NAME: &str = "state.json.tmp";

/// Where a resource lives in state: `provider:type:name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceAddress {
    pub provider: String,
    pub resource_type: String,
    pub name: String,
}

impl ResourceAddress {
    pub fn new(
        provider: impl Into<String>,
        resource_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.provider, self.resource_type, self.name)
    }
}

/// One applied resource as last read from its provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResource {
    pub id: String,
    pub resource_type: String,
    pub attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredResource {
    /// Typed handle for the lifecycle operations
    pub fn to_data<T: DeserializeOwned>(&self) -> Result<ResourceData<T>> {
        let attrs = T::deserialize(&self.attributes)?;
        Ok(ResourceData::existing(self.id.as_str(), attrs))
    }
}

/// Contents of `state.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,

    /// Incremented on every change
    #[serde(default)]
    pub serial: u64,

    pub updated_at: DateTime<Utc>,

    /// Keyed by the [`ResourceAddress`] string form
    #[serde(default)]
    pub resources: BTreeMap<String, StoredResource>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            serial: 0,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl StateFile {
    pub fn get(&self, address: &ResourceAddress) -> Option<&StoredResource> {
        self.resources.get(&address.to_string())
    }

    /// Record a resource handle, keeping the original creation time
    pub fn put<T: Serialize>(
        &mut self,
        address: &ResourceAddress,
        data: &ResourceData<T>,
    ) -> Result<()> {
        if data.is_absent() {
            return Err(CloudError::StateError(format!(
                "{} has no id and cannot be recorded",
                address
            )));
        }

        let now = Utc::now();
        let created_at = self.get(address).map_or(now, |r| r.created_at);
        let entry = StoredResource {
            id: data.id().to_string(),
            resource_type: address.resource_type.clone(),
            attributes: serde_json::to_value(data.attrs())?,
            created_at,
            updated_at: now,
        };

        self.resources.insert(address.to_string(), entry);
        self.touch();
        Ok(())
    }

    /// Drop a resource; returns what was stored, if anything
    pub fn forget(&mut self, address: &ResourceAddress) -> Option<StoredResource> {
        let removed = self.resources.remove(&address.to_string());
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    fn touch(&mut self) {
        self.serial += 1;
        self.updated_at = Utc::now();
    }
}

/// Reads and writes the state file of one project
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn in_project(project_root: impl AsRef<Path>) -> Self {
        Self {
            dir: project_root.as_ref().join(DIR_NAME),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(FILE_NAME)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.dir.join(BACKUP_NAME)
    }

    /// Current state, or an empty one when nothing was applied yet
    pub async fn read(&self) -> Result<StateFile> {
        let path = self.path();
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No state at {}, starting empty", path.display());
                return Ok(StateFile::default());
            }
            Err(e) => return Err(e.into()),
        };

        let state: StateFile = serde_json::from_str(&content)?;
        if state.version > FORMAT_VERSION {
            return Err(CloudError::StateError(format!(
                "{} uses format version {}, this build understands up to {}",
                path.display(),
                state.version,
                FORMAT_VERSION
            )));
        }

        tracing::debug!(
            "Read state serial {} ({} resources)",
            state.serial,
            state.resources.len()
        );
        Ok(state)
    }

    /// Replace the state file, keeping the previous one as a backup
    pub async fn write(&self, state: &StateFile) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.path();
        if fs::try_exists(&path).await? {
            fs::copy(&path, self.backup_path()).await?;
        }

        let temp = self.dir.join(TEMP_NAME);
        fs::write(&temp, serde_json::to_vec_pretty(state)?).await?;
        fs::rename(&temp, &path).await?;

        tracing::debug!(
            "Wrote state serial {} ({} resources)",
            state.serial,
            state.resources.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Key {
        name: String,
        fingerprint: String,
    }

    fn address() -> ResourceAddress {
        ResourceAddress::new("ibm", "sshkey", "deploy")
    }

    fn data(id: &str, fingerprint: &str) -> ResourceData<Key> {
        ResourceData::existing(
            id,
            Key {
                name: "deploy".to_string(),
                fingerprint: fingerprint.to_string(),
            },
        )
    }

    #[test]
    fn test_address_format() {
        assert_eq!(address().to_string(), "ibm:sshkey:deploy");
    }

    #[test]
    fn test_put_keeps_creation_time() {
        let mut state = StateFile::default();
        state.put(&address(), &data("r-1", "SHA256:a")).unwrap();
        let created = state.get(&address()).unwrap().created_at;

        state.put(&address(), &data("r-1", "SHA256:b")).unwrap();
        let stored = state.get(&address()).unwrap();
        assert_eq!(stored.created_at, created);
        assert_eq!(stored.attributes["fingerprint"], "SHA256:b");
        assert_eq!(stored.resource_type, "sshkey");
        assert_eq!(state.serial, 2);
    }

    #[test]
    fn test_put_rejects_absent_resource() {
        let mut state = StateFile::default();
        let planned = ResourceData::new(Key::default());
        assert!(matches!(
            state.put(&address(), &planned),
            Err(CloudError::StateError(_))
        ));
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_forget() {
        let mut state = StateFile::default();
        assert!(state.forget(&address()).is_none());
        assert_eq!(state.serial, 0);

        state.put(&address(), &data("r-1", "SHA256:a")).unwrap();
        let removed = state.forget(&address()).unwrap();
        assert_eq!(removed.id, "r-1");
        assert!(state.get(&address()).is_none());
    }

    #[test]
    fn test_stored_resource_round_trips_to_data() {
        let mut state = StateFile::default();
        state.put(&address(), &data("r-1", "SHA256:a")).unwrap();

        let back: ResourceData<Key> = state.get(&address()).unwrap().to_data().unwrap();
        assert_eq!(back, data("r-1", "SHA256:a"));
    }

    #[tokio::test]
    async fn test_read_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::in_project(dir.path());

        let state = store.read().await.unwrap();
        assert!(state.resources.is_empty());
        assert_eq!(state.version, FORMAT_VERSION);
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::in_project(dir.path());

        let mut state = StateFile::default();
        state.put(&address(), &data("r-1", "SHA256:a")).unwrap();
        store.write(&state).await.unwrap();

        assert_eq!(store.path(), dir.path().join(".vpcflow/state.json"));
        let loaded = store.read().await.unwrap();
        assert_eq!(loaded.serial, 1);
        assert_eq!(loaded.get(&address()).unwrap().id, "r-1");
        assert!(!dir.path().join(".vpcflow/state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_keeps_previous_as_backup() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::in_project(dir.path());

        let mut state = StateFile::default();
        state.put(&address(), &data("r-1", "SHA256:a")).unwrap();
        store.write(&state).await.unwrap();
        assert!(!store.backup_path().exists());

        state.forget(&address());
        store.write(&state).await.unwrap();

        let backup: StateFile =
            serde_json::from_str(&std::fs::read_to_string(store.backup_path()).unwrap()).unwrap();
        assert!(backup.get(&address()).is_some());
        assert!(store.read().await.unwrap().resources.is_empty());
    }

    #[tokio::test]
    async fn test_newer_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::in_project(dir.path());
        std::fs::create_dir_all(dir.path().join(".vpcflow")).unwrap();
        std::fs::write(
            store.path(),
            r#"{"version": 99, "updated_at": "2024-01-01T00:00:00Z", "resources": {}}"#,
        )
        .unwrap();

        assert!(matches!(
            store.read().await,
            Err(CloudError::StateError(_))
        ));
    }
}
