#![allow(deprecated)] // Command::cargo_bin

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A vpcflow command with every provider variable cleared
fn vpcflow(project_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("vpcflow").unwrap();
    for keys in vpcflow_config::env::ALL {
        for key in *keys {
            cmd.env_remove(key);
        }
    }
    cmd.env_remove("RUST_LOG")
        .arg("--project-dir")
        .arg(project_dir);
    cmd
}

const PUBLIC_KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5";

/// Point the provider at the mock server
fn with_cloud(cmd: &mut Command, server: &MockServer) {
    cmd.env("IC_API_KEY", "k1")
        .env("MAX_RETRIES", "0")
        .env("IBMCLOUD_IAM_API_ENDPOINT", server.uri())
        .env("IBMCLOUD_IS_NG_API_ENDPOINT", format!("{}/v1", server.uri()))
        .env("IBMCLOUD_RESOURCE_CONTROLLER_API_ENDPOINT", server.uri());
}

async fn mount_iam(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/identity/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "token_type": "Bearer",
        })))
        .mount(server)
        .await;
}

fn read_state(dir: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(dir.join(".vpcflow/state.json")).unwrap())
        .unwrap()
}

fn key_json(id: &str, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "crn": format!("crn:v1:bluemix:public:is:us-south:a/acc::key:{id}"),
        "name": name,
        "public_key": PUBLIC_KEY,
        "type": "ed25519",
        "fingerprint": "SHA256:Jd2m0Hx",
        "length": 256,
        "resource_group": { "id": "rg-1", "name": "default" },
    })
}

#[test]
fn test_cli_help() {
    let dir = tempfile::tempdir().unwrap();
    vpcflow(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sshkey"))
        .stdout(predicate::str::contains("version"));
}

#[test]
fn test_cli_version() {
    let dir = tempfile::tempdir().unwrap();
    vpcflow(dir.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vpcflow"));
}

#[test]
fn test_apply_help() {
    let dir = tempfile::tempdir().unwrap();
    vpcflow(dir.path())
        .args(["sshkey", "apply", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--public-key"))
        .stdout(predicate::str::contains("--resource-group"));
}

#[test]
fn test_apply_without_credentials_fails() {
    let dir = tempfile::tempdir().unwrap();
    vpcflow(dir.path())
        .args(["sshkey", "apply", "--name", "key1", "--public-key", "ssh-ed25519 AAAA"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ibmcloud_api_key"));
}

#[test]
fn test_incomplete_token_pair_fails() {
    let dir = tempfile::tempdir().unwrap();
    vpcflow(dir.path())
        .args(["--iam-token", "Bearer abc", "sshkey", "exists", "--name", "key1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "iam_token and iam_refresh_token must be provided",
        ));
}

#[test]
fn test_invalid_max_retries_env_fails() {
    let dir = tempfile::tempdir().unwrap();
    vpcflow(dir.path())
        .env("MAX_RETRIES", "many")
        .args(["sshkey", "exists", "--name", "key1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_retries"));
}

#[test]
fn test_destroy_unmanaged_key() {
    let dir = tempfile::tempdir().unwrap();
    vpcflow(dir.path())
        .env("IC_API_KEY", "")
        .args(["sshkey", "destroy", "--name", "key1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to destroy"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sshkey_apply_exists_destroy() {
    let server = MockServer::start().await;
    mount_iam(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/keys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": [] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/keys"))
        .respond_with(ResponseTemplate::new(201).set_body_json(key_json("r006-key1", "key1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/keys/r006-key1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(key_json("r006-key1", "key1")))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/keys/r006-key1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut apply = vpcflow(dir.path());
    with_cloud(&mut apply, &server);
    apply
        .args(["sshkey", "apply", "--name", "key1"])
        .args(["--public-key", PUBLIC_KEY])
        .assert()
        .success()
        .stdout(predicate::str::contains("r006-key1"));

    let state = read_state(dir.path());
    let stored = &state["resources"]["ibm:sshkey:key1"];
    assert_eq!(stored["id"], "r006-key1");
    assert_eq!(stored["attributes"]["fingerprint"], "SHA256:Jd2m0Hx");
    assert_eq!(stored["attributes"]["type"], "ed25519");

    // Re-applying the same attributes is a no-op
    let mut again = vpcflow(dir.path());
    with_cloud(&mut again, &server);
    again
        .args(["sshkey", "apply", "--name", "key1"])
        .args(["--public-key", PUBLIC_KEY])
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date"));

    let mut show = vpcflow(dir.path());
    with_cloud(&mut show, &server);
    show.args(["sshkey", "show", "--name", "key1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": \"r006-key1\""))
        .stdout(predicate::str::contains("/vpc-ext/compute/sshKeys"));

    let mut exists = vpcflow(dir.path());
    with_cloud(&mut exists, &server);
    exists
        .args(["sshkey", "exists", "--name", "key1"])
        .assert()
        .success()
        .stdout(predicate::str::diff("true\n"));

    let mut destroy = vpcflow(dir.path());
    with_cloud(&mut destroy, &server);
    destroy
        .args(["sshkey", "destroy", "--name", "key1"])
        .assert()
        .success();

    let state = read_state(dir.path());
    assert!(state["resources"].get("ibm:sshkey:key1").is_none());
    assert!(dir.path().join(".vpcflow/state.json.backup").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rename_keeps_label_and_patches_in_place() {
    let server = MockServer::start().await;
    mount_iam(&server).await;
    // Import and the refresh before apply see the old name
    Mock::given(method("GET"))
        .and(path("/v1/keys/r006-key1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(key_json("r006-key1", "old")))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/keys/r006-key1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(key_json("r006-key1", "new")))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/v1/keys/r006-key1"))
        .and(body_json(json!({ "name": "new" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(key_json("r006-key1", "new")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/keys"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();

    let mut import = vpcflow(dir.path());
    with_cloud(&mut import, &server);
    import
        .args(["sshkey", "import", "--id", "r006-key1", "--label", "deploy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("imported r006-key1"));
    assert_eq!(
        read_state(dir.path())["resources"]["ibm:sshkey:deploy"]["attributes"]["name"],
        "old"
    );

    let mut rename = vpcflow(dir.path());
    with_cloud(&mut rename, &server);
    rename
        .args(["sshkey", "apply", "--name", "new", "--label", "deploy"])
        .args(["--public-key", PUBLIC_KEY])
        .assert()
        .success()
        .stdout(predicate::str::contains("update (name)"));

    let state = read_state(dir.path());
    let stored = &state["resources"]["ibm:sshkey:deploy"];
    assert_eq!(stored["id"], "r006-key1");
    assert_eq!(stored["attributes"]["name"], "new");
    assert!(state["resources"].get("ibm:sshkey:new").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_import_unknown_key_fails() {
    let server = MockServer::start().await;
    mount_iam(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/keys/r006-nothing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut import = vpcflow(dir.path());
    with_cloud(&mut import, &server);
    import
        .args(["sshkey", "import", "--id", "r006-nothing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot import SSH key r006-nothing"));

    assert!(!dir.path().join(".vpcflow/state.json").exists());
}
