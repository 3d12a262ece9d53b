//! IBM Cloud provider error types

use thiserror::Error;

/// Errors raised while resolving a client session
///
/// Stored errors are handed out again by every accessor that depends on
/// them, hence `Clone`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(
        "ibmcloud_api_key or bluemix_api_key or iam_token and iam_refresh_token must be provided. \
         Please see the documentation on how to configure it"
    )]
    MissingCredentials,

    #[error("iam_token and iam_refresh_token must be provided")]
    IncompleteTokenPair,

    #[error("IAM authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("IAM token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Error occurred while configuring {service} service: {message}")]
    ClientConstructionFailed {
        service: &'static str,
        message: String,
    },
}

/// Errors returned by the VPC and resource controller API clients
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}{}", request_id_suffix(.request_id))]
    Status {
        status: u16,
        body: String,
        request_id: Option<String>,
    },
}

fn request_id_suffix(request_id: &Option<String>) -> String {
    request_id
        .as_ref()
        .map(|id| format!(" (request id {id})"))
        .unwrap_or_default()
}

impl ApiError {
    /// HTTP status of the response, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            ApiError::Status { status, .. } => Some(*status),
        }
    }

    /// Whether the remote reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Provider errors surfaced to the host
#[derive(Error, Debug)]
pub enum IbmError {
    #[error(transparent)]
    Config(#[from] vpcflow_config::ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Error creating SSH key {name}: {source}")]
    RemoteCreateFailed { name: String, source: ApiError },

    #[error("Error fetching SSH keys while looking up {name}: {source}")]
    DuplicateNameResolutionFailed { name: String, source: ApiError },

    #[error("Error getting SSH key ({id}): {source}")]
    RemoteReadFailed { id: String, source: ApiError },

    #[error("Error updating SSH key ({id}): {source}")]
    RemoteUpdateFailed { id: String, source: ApiError },

    #[error("Cannot import SSH key {id}: no such key")]
    ImportNotFound { id: String },
}

pub type Result<T> = std::result::Result<T, IbmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = ApiError::Status {
            status: 404,
            body: r#"{"errors":[{"code":"not_found"}]}"#.to_string(),
            request_id: Some("req-1".to_string()),
        };
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            r#"API returned status 404: {"errors":[{"code":"not_found"}]} (request id req-1)"#
        );
    }

    #[test]
    fn test_server_error_is_not_not_found() {
        let err = ApiError::Status {
            status: 500,
            body: String::new(),
            request_id: None,
        };
        assert!(!err.is_not_found());
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_remote_errors_wrap_context() {
        let err = IbmError::RemoteReadFailed {
            id: "r006-key".to_string(),
            source: ApiError::Status {
                status: 503,
                body: "unavailable".to_string(),
                request_id: None,
            },
        };
        assert_eq!(
            err.to_string(),
            "Error getting SSH key (r006-key): API returned status 503: unavailable"
        );
    }
}
