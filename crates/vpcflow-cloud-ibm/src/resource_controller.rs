//! IBM Cloud resource controller API client

use crate::error::SessionError;
use crate::transport::{ApiTransport, ClientOptions};

/// Console base used for links to managed resources
pub const CONSOLE_BASE_URL: &str = "https://cloud.ibm.com";

/// Resource controller API client
#[derive(Debug, Clone)]
pub struct ResourceControllerApi {
    transport: ApiTransport,
    console_url: String,
}

impl ResourceControllerApi {
    pub fn new(options: ClientOptions) -> Result<Self, SessionError> {
        Ok(Self {
            transport: ApiTransport::new("resource controller", options)?,
            console_url: CONSOLE_BASE_URL.to_string(),
        })
    }

    pub fn service_url(&self) -> &str {
        self.transport.base_url()
    }

    /// Console base URL for resource links
    pub fn console_url(&self) -> &str {
        &self.console_url
    }
}
