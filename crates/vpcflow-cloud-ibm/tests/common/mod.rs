use secrecy::SecretString;
use serde_json::{Value, json};
use std::time::Duration;
use vpcflow_cloud_ibm::{IbmClientSession, resolve};
use vpcflow_config::Config;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ACCESS_TOKEN: &str = "access-1";

/// IAM, VPC and resource controller behind one mock server
pub struct MockCloud {
    pub server: MockServer,
}

impl MockCloud {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Accept any token grant and hand out [`ACCESS_TOKEN`]
    pub async fn mount_iam(&self) {
        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": ACCESS_TOKEN,
                "refresh_token": "refresh-2",
                "token_type": "Bearer",
                "expires_in": 3600,
            })))
            .mount(&self.server)
            .await;
    }

    pub fn vpc_url(&self) -> String {
        format!("{}/v1", self.server.uri())
    }

    /// Configuration pointing every endpoint at the mock server
    pub fn config(&self) -> Config {
        Config {
            api_key: secret("k1"),
            region: "us-south".to_string(),
            retry_count: 0,
            retry_delay: Duration::ZERO,
            timeout: Duration::from_secs(5),
            vpc_endpoint: Some(self.vpc_url()),
            iam_endpoint: self.server.uri(),
            resource_controller_endpoint: self.server.uri(),
            ..Default::default()
        }
    }

    #[allow(dead_code)]
    /// API-key session against the mock server
    pub async fn session(&self) -> IbmClientSession {
        self.mount_iam().await;
        resolve(&self.config()).await.unwrap()
    }
}

#[allow(dead_code)]
pub fn secret(value: &str) -> Option<SecretString> {
    Some(SecretString::from(value.to_string()))
}

#[allow(dead_code)]
pub fn key_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "crn": format!("crn:v1:bluemix:public:is:us-south:a/acc::key:{id}"),
        "href": format!("https://us-south.iaas.cloud.ibm.com/v1/keys/{id}"),
        "name": name,
        "public_key": "ssh-rsa AAAAB3NzaC1yc2E",
        "type": "rsa",
        "fingerprint": "SHA256:9fk2OzJ7Lq",
        "length": 2048,
        "created_at": "2024-01-01T00:00:00Z",
        "resource_group": { "id": "rg-1", "name": "default" },
    })
}

#[allow(dead_code)]
pub fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "errors": [{ "code": "not_found", "message": "Key not found" }],
    }))
}
