//! vpcflow cloud resource contract
//!
//! This crate provides the provider-neutral pieces of vpcflow: the lifecycle
//! contract every managed resource implements, attribute schemas, change
//! planning and the host-side state file.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  vpcflow CLI                     │
//! │           (sshkey apply/show/destroy)            │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                vpcflow-cloud                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │           Lifecycle Contract              │   │
//! │  │  trait Resource { create/read/... }       │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │   Planning   │  │  State Mgmt  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐
//! │ ibm-cloud VPC │
//! │   provider    │
//! └───────────────┘
//! ```

pub mod action;
pub mod error;
pub mod resource;
pub mod retry;
pub mod schema;
pub mod state;

// Re-exports
pub use action::{ActionType, Plan, plan_change};
pub use error::{CloudError, Result};
pub use resource::{Resource, ResourceData};
pub use retry::RetryPolicy;
pub use schema::{FieldKind, FieldSchema};
pub use state::{ResourceAddress, StateFile, StateStore, StoredResource};
