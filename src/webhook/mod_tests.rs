// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the webhook routers

#[cfg(test)]
mod tests {
    use super::super::plan::{PlanAdmission, ProjectView, VisibilityQuery};
    use super::super::{metrics_router, webhook_router, WebhookState};
    use crate::errors::AdmissionError;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use k8s_openapi::api::authentication::v1::UserInfo;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct StaticViews(Vec<ProjectView>);

    #[async_trait::async_trait]
    impl VisibilityQuery for StaticViews {
        async fn visible_projects(
            &self,
            _caller: &UserInfo,
        ) -> Result<Vec<ProjectView>, AdmissionError> {
            Ok(self.0.clone())
        }
    }

    fn state() -> Arc<WebhookState> {
        let views = StaticViews(vec![ProjectView {
            cluster: Some("foo".into()),
            project: Some("ns1".into()),
        }]);
        Arc::new(WebhookState::new(PlanAdmission::new(Arc::new(views))))
    }

    fn review(target_namespace: &str) -> Value {
        json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "3c2a8a9e-0f0b-4f37-b3a4-6b0d1e6f2b11",
                "kind": {"group": "forklift.konveyor.io", "version": "v1beta1", "kind": "Plan"},
                "resource": {"group": "forklift.konveyor.io", "version": "v1beta1", "resource": "plans"},
                "name": "migrate-vms",
                "namespace": "openshift-mtv",
                "operation": "CREATE",
                "userInfo": {"username": "alice", "groups": ["system:authenticated"]},
                "object": {
                    "apiVersion": "forklift.konveyor.io/v1beta1",
                    "kind": "Plan",
                    "metadata": {"name": "migrate-vms", "namespace": "openshift-mtv"},
                    "spec": {
                        "targetNamespace": target_namespace,
                        "provider": {
                            "source": {"name": "host", "namespace": "openshift-mtv"},
                            "destination": {"name": "foo-mtv", "namespace": "mtv-integrations"}
                        }
                    }
                },
                "dryRun": false
            }
        })
    }

    async fn post_review(body: &Value) -> Value {
        let request = Request::builder()
            .method("POST")
            .uri("/validate-plan")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = webhook_router(state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validate_plan_allows_visible_namespace() {
        let reply = post_review(&review("ns1")).await;

        assert_eq!(reply["kind"], "AdmissionReview");
        assert_eq!(reply["response"]["uid"], "3c2a8a9e-0f0b-4f37-b3a4-6b0d1e6f2b11");
        assert_eq!(reply["response"]["allowed"], true);
    }

    #[tokio::test]
    async fn test_validate_plan_denies_other_namespace() {
        let reply = post_review(&review("ns9")).await;

        assert_eq!(reply["response"]["allowed"], false);
        assert_eq!(
            reply["response"]["status"]["message"],
            "User does not have permission to access the target namespace: ns9 in cluster: foo"
        );
    }

    #[tokio::test]
    async fn test_review_without_request_is_invalid() {
        let reply = post_review(&json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview"
        }))
        .await;

        assert_eq!(reply["response"]["allowed"], false);
    }

    #[tokio::test]
    async fn test_undecodable_object_is_denied_not_rejected() {
        let mut body = review("ns1");
        body["request"]["object"] = json!("not-an-object");

        let reply = post_review(&body).await;

        assert_eq!(reply["kind"], "AdmissionReview");
        assert_eq!(reply["response"]["uid"], "3c2a8a9e-0f0b-4f37-b3a4-6b0d1e6f2b11");
        assert_eq!(reply["response"]["allowed"], false);
        assert_eq!(
            reply["response"]["status"]["message"],
            "Failed to parse request object into Plan"
        );
    }

    #[tokio::test]
    async fn test_probes() {
        for probe in ["/healthz", "/readyz"] {
            let request = Request::builder().uri(probe).body(Body::empty()).unwrap();
            let response = webhook_router(state()).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{probe}");
        }
    }

    #[tokio::test]
    async fn test_metrics_endpoint_exposes_registry() {
        crate::metrics::record_admission_decision(true, "skipped");

        let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let response = metrics_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("mtv_integrations_admission_decisions_total"));
    }
}
