// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared helpers for unit tests that talk to a mocked Kubernetes API server.

use crate::context::{Context, IntegrationSettings};
use crate::crd::ManagedCluster;
use base64::Engine;
use kube::{Client, Config};
use serde_json::{json, Value};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Client configuration pointed at the mock API server.
pub fn mock_config(server: &MockServer) -> Config {
    let _ = rustls::crypto::ring::default_provider().install_default();
    let uri = server
        .uri()
        .parse::<http::Uri>()
        .expect("mock server uri should parse");
    Config::new(uri)
}

/// Build a client pointed at the mock API server.
pub fn mock_client(server: &MockServer) -> Client {
    Client::try_from(mock_config(server)).expect("client should build")
}

/// Build a controller context pointed at the mock API server.
pub fn mock_context(server: &MockServer) -> Context {
    Context::new(mock_client(server), IntegrationSettings::default())
}

/// Kubernetes `Status` body for a 404.
pub fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": "not found",
        "reason": "NotFound",
        "code": 404
    }))
}

/// Kubernetes `Status` body for an arbitrary failure.
pub fn api_failure(code: u16, reason: &str) -> ResponseTemplate {
    ResponseTemplate::new(code).set_body_json(json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": reason,
        "reason": reason,
        "code": code
    }))
}

/// Kubernetes `Status` body for an accepted delete.
pub fn deleted() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Success",
        "code": 200
    }))
}

/// Echo the request body back with the given status code.
pub fn echo(code: u16) -> impl wiremock::Respond {
    move |req: &wiremock::Request| {
        let body: Value = serde_json::from_slice(&req.body).unwrap_or_else(|_| json!({}));
        ResponseTemplate::new(code).set_body_json(body)
    }
}

/// Fail the test if any write verb reaches the API server.
pub async fn forbid_writes(server: &MockServer) {
    for verb in ["POST", "PUT", "PATCH", "DELETE"] {
        Mock::given(method(verb))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .named(format!("no {verb} expected"))
            .mount(server)
            .await;
    }
}

/// `ManagedCluster` JSON with an optional gate label, finalizer and deletion marker.
pub fn managed_cluster_json(
    name: &str,
    gate_label: Option<&str>,
    with_finalizer: bool,
    deleting: bool,
) -> Value {
    let mut metadata = json!({
        "name": name,
        "uid": format!("{name}-uid"),
        "resourceVersion": "100",
    });
    if let Some(value) = gate_label {
        metadata["labels"] = json!({ "acm/cnv-operator-install": value });
    }
    if with_finalizer {
        metadata["finalizers"] =
            json!(["mtv-integrations.open-cluster-management.io/resource-cleanup"]);
    }
    if deleting {
        metadata["deletionTimestamp"] = json!("2025-01-01T00:00:00Z");
    }
    json!({
        "apiVersion": "cluster.open-cluster-management.io/v1",
        "kind": "ManagedCluster",
        "metadata": metadata,
        "spec": {
            "hubAcceptsClient": true,
            "managedClusterClientConfigs": [
                { "url": format!("https://api.{name}.example.com:6443") }
            ]
        }
    })
}

/// Typed `ManagedCluster` built from [`managed_cluster_json`].
pub fn managed_cluster(
    name: &str,
    gate_label: Option<&str>,
    with_finalizer: bool,
    deleting: bool,
) -> ManagedCluster {
    serde_json::from_value(managed_cluster_json(
        name,
        gate_label,
        with_finalizer,
        deleting,
    ))
    .expect("managed cluster fixture should deserialize")
}

/// `ManagedServiceAccount` JSON, optionally with an issued token reference.
pub fn managed_service_account_json(cluster: &str, token_secret: Option<&str>) -> Value {
    let mut msa = json!({
        "apiVersion": "authentication.open-cluster-management.io/v1beta1",
        "kind": "ManagedServiceAccount",
        "metadata": {
            "name": format!("{cluster}-mtv"),
            "namespace": cluster,
            "resourceVersion": "7"
        },
        "spec": { "rotation": { "enabled": true, "validity": "1h0m0s" } }
    });
    if let Some(secret) = token_secret {
        msa["status"] = json!({ "tokenSecretRef": { "name": secret } });
    }
    msa
}

/// Base64-encode a string the way the API server returns `Secret.data`.
pub fn b64(value: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(value)
}

/// `Secret` JSON with base64-encoded data.
pub fn secret_json(
    namespace: &str,
    name: &str,
    resource_version: &str,
    data: &[(&str, &str)],
) -> Value {
    let encoded: serde_json::Map<String, Value> = data
        .iter()
        .map(|(k, v)| ((*k).to_string(), Value::String(b64(v))))
        .collect();
    json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "resourceVersion": resource_version
        },
        "data": encoded
    })
}

/// Established provider CRD JSON.
pub fn provider_crd_json(established: &str) -> Value {
    json!({
        "apiVersion": "apiextensions.k8s.io/v1",
        "kind": "CustomResourceDefinition",
        "metadata": { "name": "providers.forklift.konveyor.io" },
        "spec": {
            "group": "forklift.konveyor.io",
            "names": { "kind": "Provider", "plural": "providers" },
            "scope": "Namespaced",
            "versions": []
        },
        "status": {
            "conditions": [
                { "type": "NamesAccepted", "status": "True" },
                { "type": "Established", "status": established }
            ]
        }
    })
}
