// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation for the MTV integration lifecycle.
//!
//! # Reconciliation Architecture
//!
//! The operator follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - `ManagedCluster` objects and the `ManagedServiceAccount`s they own
//! 2. **Gate** - Do nothing until the Forklift `Provider` CRD is established
//! 3. **Reconcile** - Create the missing downstream resources, in order
//! 4. **Clean up** - Delete them again when the cluster opts out or is deleted
//!
//! # Stages
//!
//! - [`gate::check_provider_crd`] - Prerequisite CRD check
//! - [`credential::ensure_credential`] - `ManagedServiceAccount` provisioning
//! - [`addon::discover_addon_namespace`] - Namespace of the service account on the managed cluster
//! - [`resources::ensure_resource`] - Create-once for `ClusterPermission` and `Provider`
//! - [`secret_sync::sync_provider_secret`] - Provider secret projection
//! - [`finalizers::handle_cluster_deletion`] - Cleanup and finalizer removal
//!
//! # Example: Using the Reconciler
//!
//! ```rust,no_run
//! use mtv_integrations::context::{Context, IntegrationSettings};
//! use mtv_integrations::reconcilers::reconcile_managed_cluster;
//! use kube::Client;
//!
//! async fn reconcile_once(client: Client) -> anyhow::Result<()> {
//!     let ctx = Context::new(client, IntegrationSettings::default());
//!     let progress = reconcile_managed_cluster(&ctx, "foo").await?;
//!     println!("{progress:?}");
//!     Ok(())
//! }
//! ```

pub mod addon;
pub mod backoff;
pub mod cleanup;
pub mod credential;
pub mod finalizers;
pub mod gate;
pub mod managedcluster;
pub mod payloads;
pub mod resources;
pub mod secret_sync;

pub use managedcluster::{
    error_action, lifecycle_phase, progress_action, reconcile_managed_cluster, LifecyclePhase,
    Progress,
};
