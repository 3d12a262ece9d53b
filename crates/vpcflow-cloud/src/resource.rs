//! Resource lifecycle contract
//!
//! Every managed resource type implements [`Resource`]. The host owns
//! scheduling, diffing against prior state and persistence; a resource only
//! reconciles one [`ResourceData`] handle against the remote API.

use crate::schema::FieldSchema;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lifecycle of a single resource type
///
/// `Meta` is the opaque client session handed out by the provider when it
/// was configured. Each entry point reports only an error; results flow
/// back through the `ResourceData` handle.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Typed attributes persisted for the resource
    type State: Clone + Default + Serialize + DeserializeOwned + Send + Sync;

    /// Client session the operations call through
    type Meta: ?Sized + Sync;

    type Error: std::error::Error + Send + Sync + 'static;

    /// Resource type name as registered with the host (e.g. "sshkey")
    fn type_name(&self) -> &str;

    /// Attribute declarations
    fn schema(&self) -> &'static [FieldSchema];

    /// Create the remote resource and populate `d` from it
    async fn create(
        &self,
        d: &mut ResourceData<Self::State>,
        meta: &Self::Meta,
    ) -> Result<(), Self::Error>;

    /// Refresh `d` from the remote resource, clearing the id if it is gone
    async fn read(
        &self,
        d: &mut ResourceData<Self::State>,
        meta: &Self::Meta,
    ) -> Result<(), Self::Error>;

    /// Push the changed attributes of `d` to the remote resource
    async fn update(
        &self,
        d: &mut ResourceData<Self::State>,
        meta: &Self::Meta,
    ) -> Result<(), Self::Error>;

    /// Remove the remote resource and clear the id of `d`
    async fn delete(
        &self,
        d: &mut ResourceData<Self::State>,
        meta: &Self::Meta,
    ) -> Result<(), Self::Error>;

    /// Probe whether the remote resource still exists
    async fn exists(
        &self,
        d: &ResourceData<Self::State>,
        meta: &Self::Meta,
    ) -> Result<bool, Self::Error>;

    /// Adopt a resource created outside the host, by its remote id
    ///
    /// Fails when no resource exists under `id`.
    async fn import(
        &self,
        id: &str,
        meta: &Self::Meta,
    ) -> Result<ResourceData<Self::State>, Self::Error>;
}

/// Declarative state handle for one resource instance
///
/// An empty id means the resource is absent: either not created yet, or
/// gone and due to be dropped from state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceData<T> {
    id: String,

    attrs: T,

    /// Names of attributes the host detected as changed
    #[serde(skip)]
    changes: BTreeSet<String>,
}

impl<T> ResourceData<T> {
    /// A planned resource with no remote identity yet
    pub fn new(attrs: T) -> Self {
        Self {
            id: String::new(),
            attrs,
            changes: BTreeSet::new(),
        }
    }

    /// A resource already known under `id`
    pub fn existing(id: impl Into<String>, attrs: T) -> Self {
        Self {
            id: id.into(),
            attrs,
            changes: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Drop the remote identity; the host removes the resource from state
    pub fn clear_id(&mut self) {
        self.id.clear();
    }

    pub fn is_absent(&self) -> bool {
        self.id.is_empty()
    }

    pub fn attrs(&self) -> &T {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut T {
        &mut self.attrs
    }

    /// Names of attributes the host saw change
    pub fn with_changes<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.changes.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn has_change(&self, field: &str) -> bool {
        self.changes.contains(field)
    }

    pub fn changes(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(String::as_str)
    }
}
