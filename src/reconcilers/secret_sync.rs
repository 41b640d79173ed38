// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Projection of a cluster's issued token into the Forklift provider secret.
//!
//! The provider secret `<cluster>-mtv` in the integration namespace carries the
//! endpoint URL, the CA certificate and the token. Only `cacert` and `token` are
//! compared with the credential secret; when they already match no write is issued.
//! Updates go through `replace` with the read `resourceVersion`, so a concurrent edit
//! surfaces as a 409 and is retried on the next pass.

use crate::constants::{
    FIELD_MANAGER, KIND_PROVIDER_SECRET, SECRET_KEY_CACERT, SECRET_KEY_INSECURE_SKIP_VERIFY,
    SECRET_KEY_SOURCE_CA, SECRET_KEY_TOKEN, SECRET_KEY_URL,
};
use crate::context::{managed_cluster_mtv_name, IntegrationSettings};
use crate::crd::ManagedCluster;
use crate::labels::provider_secret_labels;
use crate::metrics;
use crate::reconcilers::payloads::cluster_endpoint;
use anyhow::{Context as _, Result};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::{ObjectMeta, PostParams};
use kube::{Api, Client, ResourceExt};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Result of a provider secret synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Created,
    Updated,
    Unchanged,
}

fn data_value<'a>(secret: &'a Secret, key: &str) -> Option<&'a ByteString> {
    secret.data.as_ref().and_then(|data| data.get(key))
}

/// Whether the provider secret's `cacert`/`token` differ from the credential's `ca.crt`/`token`.
#[must_use]
pub fn secret_needs_update(target: &Secret, source: &Secret) -> bool {
    data_value(target, SECRET_KEY_CACERT) != data_value(source, SECRET_KEY_SOURCE_CA)
        || data_value(target, SECRET_KEY_TOKEN) != data_value(source, SECRET_KEY_TOKEN)
}

/// Desired provider secret for `cluster`, built from the credential secret.
///
/// # Errors
///
/// Returns an error if the cluster has not registered an API endpoint.
pub fn build_provider_secret(
    settings: &IntegrationSettings,
    source: &Secret,
    cluster: &ManagedCluster,
) -> Result<Secret> {
    let url = cluster_endpoint(cluster)?;

    let mut data = BTreeMap::new();
    data.insert(
        SECRET_KEY_URL.to_string(),
        ByteString(url.as_bytes().to_vec()),
    );
    data.insert(
        SECRET_KEY_INSECURE_SKIP_VERIFY.to_string(),
        ByteString(b"false".to_vec()),
    );
    if let Some(ca) = data_value(source, SECRET_KEY_SOURCE_CA) {
        data.insert(SECRET_KEY_CACERT.to_string(), ca.clone());
    }
    if let Some(token) = data_value(source, SECRET_KEY_TOKEN) {
        data.insert(SECRET_KEY_TOKEN.to_string(), token.clone());
    }

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(managed_cluster_mtv_name(&cluster.name_any())),
            namespace: Some(settings.integration_namespace.clone()),
            labels: Some(provider_secret_labels(&settings.provider_type)),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    })
}

/// Bring the provider secret in line with the credential secret.
///
/// # Errors
///
/// Returns an error if the provider secret cannot be read, created or replaced.
/// A stale `resourceVersion` on replace surfaces as a conflict error.
pub async fn sync_provider_secret(
    client: &Client,
    settings: &IntegrationSettings,
    source: &Secret,
    cluster: &ManagedCluster,
) -> Result<SyncOutcome> {
    let name = managed_cluster_mtv_name(&cluster.name_any());
    let namespace = &settings.integration_namespace;
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let params = PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    };

    let current = api
        .get_opt(&name)
        .await
        .with_context(|| format!("failed to read provider secret {namespace}/{name}"))?;

    let Some(mut current) = current else {
        let desired = build_provider_secret(settings, source, cluster)?;
        api.create(&params, &desired)
            .await
            .with_context(|| format!("failed to create provider secret {namespace}/{name}"))?;

        metrics::record_resource_created(KIND_PROVIDER_SECRET);
        info!(namespace = %namespace, name = %name, "Created provider secret");
        return Ok(SyncOutcome::Created);
    };

    if !secret_needs_update(&current, source) {
        debug!(namespace = %namespace, name = %name, "Provider secret already in sync");
        return Ok(SyncOutcome::Unchanged);
    }

    let data = current.data.get_or_insert_with(BTreeMap::new);
    for (target_key, source_key) in [
        (SECRET_KEY_CACERT, SECRET_KEY_SOURCE_CA),
        (SECRET_KEY_TOKEN, SECRET_KEY_TOKEN),
    ] {
        match data_value(source, source_key) {
            Some(value) => {
                data.insert(target_key.to_string(), value.clone());
            }
            None => {
                data.remove(target_key);
            }
        }
    }

    api.replace(&name, &params, &current)
        .await
        .with_context(|| format!("failed to update provider secret {namespace}/{name}"))?;

    metrics::record_resource_updated(KIND_PROVIDER_SECRET);
    info!(namespace = %namespace, name = %name, "Updated provider secret credentials");
    Ok(SyncOutcome::Updated)
}

#[cfg(test)]
#[path = "secret_sync_tests.rs"]
mod secret_sync_tests;
