// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `resources.rs`

#[cfg(test)]
mod tests {
    use super::super::{ensure_namespace, ensure_resource, EnsureOutcome};
    use crate::reconcilers::payloads::PROVIDER;
    use crate::test_support::{api_failure, echo, forbid_writes, mock_client, not_found};
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PROVIDERS: &str = "/apis/forklift.konveyor.io/v1beta1/namespaces/mtv-integrations/providers";

    fn provider_doc() -> Value {
        json!({
            "apiVersion": "forklift.konveyor.io/v1beta1",
            "kind": "Provider",
            "metadata": { "name": "foo-mtv", "namespace": "mtv-integrations" },
            "spec": { "type": "openshift", "url": "https://api.foo.example.com:6443" }
        })
    }

    #[tokio::test]
    async fn test_absent_resource_is_created_from_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{PROVIDERS}/foo-mtv")))
            .respond_with(not_found())
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(PROVIDERS))
            .respond_with(echo(201))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = ensure_resource(
            &mock_client(&server),
            &PROVIDER,
            "mtv-integrations",
            "foo-mtv",
            provider_doc(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, EnsureOutcome::Created);

        let requests = server.received_requests().await.unwrap();
        let create = requests
            .iter()
            .find(|r| r.method.as_str() == "POST")
            .unwrap();
        let body: Value = serde_json::from_slice(&create.body).unwrap();
        assert_eq!(body["kind"], "Provider");
        assert_eq!(body["spec"]["type"], "openshift");
    }

    #[tokio::test]
    async fn test_existing_resource_is_never_patched() {
        let server = MockServer::start().await;
        let mut existing = provider_doc();
        existing["spec"]["url"] = json!("https://stale.example.com:6443");
        Mock::given(method("GET"))
            .and(path(format!("{PROVIDERS}/foo-mtv")))
            .respond_with(ResponseTemplate::new(200).set_body_json(existing))
            .mount(&server)
            .await;
        forbid_writes(&server).await;

        let outcome = ensure_resource(
            &mock_client(&server),
            &PROVIDER,
            "mtv-integrations",
            "foo-mtv",
            provider_doc(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, EnsureOutcome::Existing);
    }

    #[tokio::test]
    async fn test_read_error_propagates_without_create() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{PROVIDERS}/foo-mtv")))
            .respond_with(api_failure(500, "InternalError"))
            .mount(&server)
            .await;
        forbid_writes(&server).await;

        let result = ensure_resource(
            &mock_client(&server),
            &PROVIDER,
            "mtv-integrations",
            "foo-mtv",
            provider_doc(),
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_create_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{PROVIDERS}/foo-mtv")))
            .respond_with(not_found())
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(PROVIDERS))
            .respond_with(api_failure(403, "Forbidden"))
            .mount(&server)
            .await;

        let result = ensure_resource(
            &mock_client(&server),
            &PROVIDER,
            "mtv-integrations",
            "foo-mtv",
            provider_doc(),
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_ensure_namespace() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/mtv-integrations"))
            .respond_with(not_found())
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/namespaces"))
            .respond_with(echo(201))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = ensure_namespace(&mock_client(&server), "mtv-integrations")
            .await
            .unwrap();

        assert_eq!(outcome, EnsureOutcome::Created);
    }

    #[tokio::test]
    async fn test_existing_namespace_is_left_alone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/mtv-integrations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apiVersion": "v1",
                "kind": "Namespace",
                "metadata": { "name": "mtv-integrations" }
            })))
            .mount(&server)
            .await;
        forbid_writes(&server).await;

        let outcome = ensure_namespace(&mock_client(&server), "mtv-integrations")
            .await
            .unwrap();

        assert_eq!(outcome, EnsureOutcome::Existing);
    }
}
