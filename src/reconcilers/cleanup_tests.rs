// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `cleanup.rs`

#[cfg(test)]
mod tests {
    use crate::reconcilers::finalizers::handle_cluster_deletion;
    use crate::test_support::{
        api_failure, deleted, managed_cluster, managed_cluster_json, mock_context, not_found,
    };
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FINALIZER: &str = "mtv-integrations.open-cluster-management.io/resource-cleanup";
    const CLUSTER_PATH: &str = "/apis/cluster.open-cluster-management.io/v1/managedclusters/foo";

    /// Delete paths in the order cleanup must issue them.
    const DELETE_PATHS: [&str; 4] = [
        "/apis/rbac.open-cluster-management.io/v1alpha1/namespaces/foo/clusterpermissions/foo-mtv",
        "/apis/authentication.open-cluster-management.io/v1beta1/namespaces/foo/managedserviceaccounts/foo-mtv",
        "/api/v1/namespaces/mtv-integrations/secrets/foo-mtv",
        "/apis/forklift.konveyor.io/v1beta1/namespaces/mtv-integrations/providers/foo-mtv",
    ];

    async fn mount_finalizer_removal(server: &MockServer, times: u64) {
        Mock::given(method("PATCH"))
            .and(path(CLUSTER_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(managed_cluster_json("foo", Some("true"), false, true)),
            )
            .expect(times)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_cleanup_succeeds_for_every_subset_of_missing_resources() {
        for missing_mask in 0u8..16 {
            let server = MockServer::start().await;
            for (i, delete_path) in DELETE_PATHS.iter().enumerate() {
                let response = if missing_mask & (1 << i) != 0 {
                    not_found()
                } else {
                    deleted()
                };
                Mock::given(method("DELETE"))
                    .and(path(*delete_path))
                    .respond_with(response)
                    .expect(1)
                    .mount(&server)
                    .await;
            }
            mount_finalizer_removal(&server, 1).await;

            let ctx = mock_context(&server);
            let cluster = managed_cluster("foo", Some("true"), true, true);
            handle_cluster_deletion(&ctx, &cluster, FINALIZER)
                .await
                .unwrap_or_else(|e| panic!("mask {missing_mask:04b}: {e:#}"));

            server.verify().await;
        }
    }

    #[tokio::test]
    async fn test_cleanup_deletes_in_order_then_removes_finalizer() {
        let server = MockServer::start().await;
        for delete_path in DELETE_PATHS {
            Mock::given(method("DELETE"))
                .and(path(delete_path))
                .respond_with(deleted())
                .mount(&server)
                .await;
        }
        mount_finalizer_removal(&server, 1).await;

        let ctx = mock_context(&server);
        let cluster = managed_cluster("foo", None, true, false);
        handle_cluster_deletion(&ctx, &cluster, FINALIZER)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let issued: Vec<(String, String)> = requests
            .iter()
            .map(|r| (r.method.to_string(), r.url.path().to_string()))
            .collect();
        let mut expected: Vec<(String, String)> = DELETE_PATHS
            .iter()
            .map(|p| ("DELETE".to_string(), (*p).to_string()))
            .collect();
        expected.push(("PATCH".to_string(), CLUSTER_PATH.to_string()));
        assert_eq!(issued, expected);
    }

    #[tokio::test]
    async fn test_first_error_aborts_and_keeps_finalizer() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(DELETE_PATHS[0]))
            .respond_with(deleted())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(DELETE_PATHS[1]))
            .respond_with(api_failure(500, "InternalError"))
            .expect(1)
            .mount(&server)
            .await;
        for delete_path in &DELETE_PATHS[2..] {
            Mock::given(method("DELETE"))
                .and(path(*delete_path))
                .respond_with(deleted())
                .expect(0)
                .mount(&server)
                .await;
        }
        mount_finalizer_removal(&server, 0).await;

        let ctx = mock_context(&server);
        let cluster = managed_cluster("foo", Some("true"), true, true);
        let result = handle_cluster_deletion(&ctx, &cluster, FINALIZER).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_no_finalizer_is_noop() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(deleted())
            .expect(0)
            .mount(&server)
            .await;
        mount_finalizer_removal(&server, 0).await;

        let ctx = mock_context(&server);
        let cluster = managed_cluster("foo", Some("true"), false, true);
        handle_cluster_deletion(&ctx, &cluster, FINALIZER)
            .await
            .unwrap();
    }
}
