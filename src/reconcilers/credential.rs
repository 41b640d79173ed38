// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Rotating credential provisioning for managed clusters.
//!
//! Each opted-in cluster gets a `ManagedServiceAccount` named `<cluster>-mtv` in the
//! cluster's hub namespace. The managed-serviceaccount addon issues the token
//! asynchronously and records the backing secret in `status.tokenSecretRef`.

use crate::constants::{CREDENTIAL_VALIDITY_SECS, FIELD_MANAGER, KIND_MANAGED_SERVICE_ACCOUNT};
use crate::context::managed_cluster_mtv_name;
use crate::crd::{
    ManagedCluster, ManagedServiceAccount, ManagedServiceAccountRotation, ManagedServiceAccountSpec,
};
use crate::metrics;
use anyhow::{anyhow, Context as _, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::PostParams;
use kube::runtime::reflector::ObjectRef;
use kube::{Api, Client, Resource, ResourceExt};
use std::time::Duration;
use tracing::{debug, info};

/// Observed state of a cluster's credential after [`ensure_credential`].
#[derive(Debug, Clone)]
pub enum CredentialState {
    /// The credential was just created; the token is not issued yet.
    Created,
    /// The credential exists but the addon has not referenced a token secret yet.
    Pending,
    /// The token secret is referenced.
    Ready(Box<ManagedServiceAccount>),
}

/// Format a duration the way Go's `time.Duration.String()` does (`1h0m0s`).
#[must_use]
pub fn format_go_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Owner reference to the managed cluster that never blocks its deletion.
///
/// # Errors
///
/// Returns an error if the cluster has no UID (never persisted).
pub fn cluster_owner_reference(cluster: &ManagedCluster) -> Result<OwnerReference> {
    let uid = cluster
        .uid()
        .ok_or_else(|| anyhow!("ManagedCluster {} has no uid", cluster.name_any()))?;

    Ok(OwnerReference {
        api_version: ManagedCluster::api_version(&()).to_string(),
        kind: ManagedCluster::kind(&()).to_string(),
        name: cluster.name_any(),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(false),
    })
}

/// Desired `ManagedServiceAccount` for a cluster.
///
/// # Errors
///
/// Returns an error if the owner reference cannot be built.
pub fn build_managed_service_account(cluster: &ManagedCluster) -> Result<ManagedServiceAccount> {
    let cluster_name = cluster.name_any();
    let mut msa = ManagedServiceAccount::new(
        &managed_cluster_mtv_name(&cluster_name),
        ManagedServiceAccountSpec {
            rotation: ManagedServiceAccountRotation {
                enabled: true,
                validity: Some(format_go_duration(Duration::from_secs(
                    CREDENTIAL_VALIDITY_SECS,
                ))),
            },
        },
    );
    msa.metadata.namespace = Some(cluster_name);
    msa.metadata.owner_references = Some(vec![cluster_owner_reference(cluster)?]);
    Ok(msa)
}

/// Create the cluster's credential if absent and report whether its token is issued.
///
/// # Errors
///
/// Returns an error if the credential cannot be read or created.
pub async fn ensure_credential(client: &Client, cluster: &ManagedCluster) -> Result<CredentialState> {
    let cluster_name = cluster.name_any();
    let name = managed_cluster_mtv_name(&cluster_name);
    let api: Api<ManagedServiceAccount> = Api::namespaced(client.clone(), &cluster_name);

    match api
        .get_opt(&name)
        .await
        .with_context(|| format!("failed to read ManagedServiceAccount {cluster_name}/{name}"))?
    {
        Some(msa) if msa.token_secret_name().is_some() => {
            debug!(cluster = %cluster_name, "Credential token is issued");
            Ok(CredentialState::Ready(Box::new(msa)))
        }
        Some(_) => {
            debug!(cluster = %cluster_name, "Credential exists, waiting for token issuance");
            Ok(CredentialState::Pending)
        }
        None => {
            let msa = build_managed_service_account(cluster)?;
            api.create(
                &PostParams {
                    field_manager: Some(FIELD_MANAGER.to_string()),
                    ..Default::default()
                },
                &msa,
            )
            .await
            .with_context(|| {
                format!("failed to create ManagedServiceAccount {cluster_name}/{name}")
            })?;

            metrics::record_resource_created(KIND_MANAGED_SERVICE_ACCOUNT);
            info!(cluster = %cluster_name, name = %name, "Created ManagedServiceAccount");
            Ok(CredentialState::Created)
        }
    }
}

/// Managed clusters that own a credential, for the controller's owned-object watch.
///
/// `ManagedCluster` is cluster-scoped while the credential lives in the cluster's hub
/// namespace, so owners are resolved by name only.
#[must_use]
pub fn owning_clusters(msa: &ManagedServiceAccount) -> Vec<ObjectRef<ManagedCluster>> {
    let kind = ManagedCluster::kind(&());
    let api_version = ManagedCluster::api_version(&());
    msa.owner_references()
        .iter()
        .filter(|owner| owner.kind == kind && owner.api_version == api_version)
        .map(|owner| ObjectRef::new(&owner.name))
        .collect()
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod credential_tests;
