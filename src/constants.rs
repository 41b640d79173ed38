// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the MTV integrations operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance. Values that operators may
//! want to override are only defaults here; the live values travel in
//! [`crate::context::IntegrationSettings`].

// ============================================================================
// Naming Constants
// ============================================================================

/// Suffix appended to a managed cluster name for every resource this operator creates
pub const MTV_NAME_SUFFIX: &str = "-mtv";

/// Default namespace that hosts provider secrets and `Provider` registrations
pub const DEFAULT_INTEGRATION_NAMESPACE: &str = "mtv-integrations";

/// Name of the CRD that must be established before any managed cluster is processed
pub const DEFAULT_PROVIDER_CRD_NAME: &str = "providers.forklift.konveyor.io";

/// Name of the managed-serviceaccount addon agent deployment
pub const DEFAULT_ADDON_AGENT_DEPLOYMENT: &str = "managed-serviceaccount-addon-agent";

/// Namespace used for the addon agent when no deployment can be found
pub const DEFAULT_ADDON_NAMESPACE: &str = "open-cluster-management-agent-addon";

/// Role bound to the managed service account on the remote cluster
pub const PROVIDER_CLUSTER_ROLE: &str = "cluster-admin";

/// Forklift provider type for OpenShift/Kubernetes endpoints
pub const PROVIDER_TYPE_OPENSHIFT: &str = "openshift";

// ============================================================================
// API Constants (external resource types)
// ============================================================================

/// API group of `ManagedCluster`
pub const CLUSTER_API_GROUP: &str = "cluster.open-cluster-management.io";

/// API version of `ManagedCluster`
pub const CLUSTER_API_VERSION: &str = "v1";

/// Kind name for `ManagedCluster`
pub const KIND_MANAGED_CLUSTER: &str = "ManagedCluster";

/// Kind name for `ManagedServiceAccount`
pub const KIND_MANAGED_SERVICE_ACCOUNT: &str = "ManagedServiceAccount";

/// API group of `ClusterPermission`
pub const CLUSTER_PERMISSION_GROUP: &str = "rbac.open-cluster-management.io";

/// API version of `ClusterPermission`
pub const CLUSTER_PERMISSION_VERSION: &str = "v1alpha1";

/// Kind name for `ClusterPermission`
pub const KIND_CLUSTER_PERMISSION: &str = "ClusterPermission";

/// Plural resource name for `ClusterPermission`
pub const CLUSTER_PERMISSION_PLURAL: &str = "clusterpermissions";

/// API group of Forklift resources
pub const FORKLIFT_API_GROUP: &str = "forklift.konveyor.io";

/// API version of Forklift resources
pub const FORKLIFT_API_VERSION: &str = "v1beta1";

/// Kind name for `Provider`
pub const KIND_PROVIDER: &str = "Provider";

/// Plural resource name for `Provider`
pub const PROVIDER_PLURAL: &str = "providers";

/// Kind name for the provider `Secret`
pub const KIND_PROVIDER_SECRET: &str = "Secret";

/// API group of the cluster view resources queried during admission
pub const CLUSTER_VIEW_API_GROUP: &str = "clusterview.open-cluster-management.io";

/// API version of the cluster view resources
pub const CLUSTER_VIEW_API_VERSION: &str = "v1";

/// Kind name for `KubevirtProject`
pub const KIND_KUBEVIRT_PROJECT: &str = "KubevirtProject";

/// Plural resource name for `KubevirtProject`
pub const KUBEVIRT_PROJECT_PLURAL: &str = "kubevirtprojects";

// ============================================================================
// Credential Constants
// ============================================================================

/// Validity of a rotated managed service account token (60 minutes)
pub const CREDENTIAL_VALIDITY_SECS: u64 = 3600;

// ============================================================================
// Secret Data Keys
// ============================================================================

/// Token key written by the managed-serviceaccount addon and read by Forklift
pub const SECRET_KEY_TOKEN: &str = "token";

/// CA bundle key written by the managed-serviceaccount addon
pub const SECRET_KEY_SOURCE_CA: &str = "ca.crt";

/// CA bundle key expected by Forklift
pub const SECRET_KEY_CACERT: &str = "cacert";

/// Endpoint URL key expected by Forklift
pub const SECRET_KEY_URL: &str = "url";

/// TLS verification toggle expected by Forklift
pub const SECRET_KEY_INSECURE_SKIP_VERIFY: &str = "insecureSkipVerify";

// ============================================================================
// Controller Requeue Constants
// ============================================================================

/// Delay before checking again for a freshly created credential's token (2 seconds)
pub const TOKEN_ISSUANCE_REQUEUE_SECS: u64 = 2;

/// Requeue delay when the prerequisite CRD cannot be read (10 seconds)
pub const GATE_ERROR_REQUEUE_SECS: u64 = 10;

/// Initial error backoff for a failing managed cluster (1 second)
pub const ERROR_BACKOFF_INITIAL_SECS: u64 = 1;

/// Maximum error backoff for a failing managed cluster (5 minutes)
pub const ERROR_BACKOFF_MAX_SECS: u64 = 300;

/// Default number of managed clusters reconciled concurrently
pub const DEFAULT_RECONCILE_CONCURRENCY: u16 = 4;

// ============================================================================
// Leader Election Constants
// ============================================================================

/// Name of the lease used for leader election
pub const LEADER_LEASE_NAME: &str = "mtv-integrations-leader";

/// Default leader election lease duration (15 seconds)
pub const DEFAULT_LEASE_DURATION_SECS: u64 = 15;

/// Default leader election grace period (5 seconds)
pub const DEFAULT_LEASE_GRACE_SECS: u64 = 5;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Field manager recorded on every write
pub const FIELD_MANAGER: &str = "mtv-integrations";

// ============================================================================
// Admission Webhook Constants
// ============================================================================

/// Path the API server posts `Plan` admission reviews to
pub const WEBHOOK_VALIDATE_PLAN_PATH: &str = "/validate-plan";

/// Default bind address of the admission webhook server
pub const DEFAULT_WEBHOOK_BIND_ADDRESS: &str = "0.0.0.0:9443";

/// Default timeout for the impersonated visibility query (10 seconds)
pub const DEFAULT_ADMISSION_QUERY_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Default bind address of the Prometheus metrics server
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";
