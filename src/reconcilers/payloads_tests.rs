// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `payloads.rs`

#[cfg(test)]
mod tests {
    use super::super::{
        cluster_endpoint, cluster_permission_payload, provider_payload, CLUSTER_PERMISSION,
        PROVIDER,
    };
    use crate::context::IntegrationSettings;
    use crate::test_support::managed_cluster;

    #[test]
    fn test_descriptors() {
        assert_eq!(
            CLUSTER_PERMISSION.api_version(),
            "rbac.open-cluster-management.io/v1alpha1"
        );
        assert_eq!(CLUSTER_PERMISSION.api_resource().plural, "clusterpermissions");
        assert_eq!(PROVIDER.api_version(), "forklift.konveyor.io/v1beta1");
        assert_eq!(PROVIDER.api_resource().plural, "providers");
        assert_eq!(PROVIDER.api_resource().kind, "Provider");
    }

    #[test]
    fn test_cluster_endpoint() {
        let mut cluster = managed_cluster("foo", Some("true"), true, false);
        assert_eq!(
            cluster_endpoint(&cluster).unwrap(),
            "https://api.foo.example.com:6443"
        );

        for bad in ["api.foo.example.com:6443", "ftp://api.foo.example.com", "not a url"] {
            cluster.spec.managed_cluster_client_configs[0].url = bad.to_string();
            assert!(cluster_endpoint(&cluster).is_err(), "{bad}");
        }

        cluster.spec.managed_cluster_client_configs.clear();
        assert!(cluster_endpoint(&cluster).is_err());
    }

    #[test]
    fn test_cluster_permission_payload() {
        let cluster = managed_cluster("foo", Some("true"), true, false);
        let payload = cluster_permission_payload(
            &cluster,
            &IntegrationSettings::default(),
            "custom-addon-ns",
        )
        .unwrap();

        assert_eq!(payload["kind"], "ClusterPermission");
        assert_eq!(payload["metadata"]["name"], "foo-mtv");
        assert_eq!(payload["metadata"]["namespace"], "foo");
        assert_eq!(payload["metadata"]["ownerReferences"][0]["name"], "foo");
        assert_eq!(payload["metadata"]["ownerReferences"][0]["uid"], "foo-uid");

        let binding = &payload["spec"]["clusterRoleBinding"];
        assert_eq!(binding["subject"]["kind"], "ServiceAccount");
        assert_eq!(binding["subject"]["name"], "foo-mtv");
        assert_eq!(binding["subject"]["namespace"], "custom-addon-ns");
        assert_eq!(binding["roleRef"]["kind"], "ClusterRole");
        assert_eq!(binding["roleRef"]["name"], "cluster-admin");
        assert_eq!(binding["roleRef"]["apiGroup"], "rbac.authorization.k8s.io");
    }

    #[test]
    fn test_provider_payload() {
        let cluster = managed_cluster("foo", Some("true"), true, false);
        let payload = provider_payload(&cluster, &IntegrationSettings::default()).unwrap();

        assert_eq!(payload["apiVersion"], "forklift.konveyor.io/v1beta1");
        assert_eq!(payload["kind"], "Provider");
        assert_eq!(payload["metadata"]["name"], "foo-mtv");
        assert_eq!(payload["metadata"]["namespace"], "mtv-integrations");
        assert_eq!(payload["spec"]["type"], "openshift");
        assert_eq!(payload["spec"]["url"], "https://api.foo.example.com:6443");
        assert_eq!(payload["spec"]["secret"]["name"], "foo-mtv");
        assert_eq!(payload["spec"]["secret"]["namespace"], "mtv-integrations");
    }

    #[test]
    fn test_provider_payload_requires_endpoint() {
        let mut cluster = managed_cluster("foo", Some("true"), true, false);
        cluster.spec.managed_cluster_client_configs.clear();

        assert!(provider_payload(&cluster, &IntegrationSettings::default()).is_err());
    }
}
