// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic get-or-create helpers for downstream resources.
//!
//! Downstream resources are created once and never diffed or patched afterwards:
//! an existing object with the deterministic name is left untouched.
//!
//! # Example
//!
//! ```rust,no_run
//! use mtv_integrations::reconcilers::payloads::PROVIDER;
//! use mtv_integrations::reconcilers::resources::ensure_resource;
//! use kube::Client;
//! use anyhow::Result;
//!
//! async fn example(client: &Client, payload: serde_json::Value) -> Result<()> {
//!     ensure_resource(client, &PROVIDER, "mtv-integrations", "foo-mtv", payload).await?;
//!     Ok(())
//! }
//! ```

use crate::constants::FIELD_MANAGER;
use crate::metrics;
use crate::reconcilers::payloads::ResourceDescriptor;
use anyhow::{Context as _, Result};
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{DynamicObject, ObjectMeta, PostParams};
use kube::{Api, Client};
use tracing::{debug, info};

/// Whether [`ensure_resource`] had to create the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    Existing,
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

/// Create an untyped resource if no object with `name` exists in `namespace`.
///
/// # Arguments
///
/// * `client` - Kubernetes API client
/// * `descriptor` - Group, version, kind and plural of the resource
/// * `namespace` - Namespace of the resource
/// * `name` - Deterministic name of the resource
/// * `payload` - Full document to create when absent
///
/// # Errors
///
/// Returns an error if the payload is not a valid object, or if the read or create fails.
pub async fn ensure_resource(
    client: &Client,
    descriptor: &ResourceDescriptor,
    namespace: &str,
    name: &str,
    payload: serde_json::Value,
) -> Result<EnsureOutcome> {
    let api: Api<DynamicObject> =
        Api::namespaced_with(client.clone(), namespace, &descriptor.api_resource());

    if api
        .get_opt(name)
        .await
        .with_context(|| format!("failed to read {} {namespace}/{name}", descriptor.kind))?
        .is_some()
    {
        debug!(kind = %descriptor.kind, namespace = %namespace, name = %name, "Resource already exists");
        return Ok(EnsureOutcome::Existing);
    }

    let object: DynamicObject = serde_json::from_value(payload)
        .with_context(|| format!("invalid {} payload for {namespace}/{name}", descriptor.kind))?;

    api.create(&post_params(), &object)
        .await
        .with_context(|| format!("failed to create {} {namespace}/{name}", descriptor.kind))?;

    metrics::record_resource_created(descriptor.kind);
    info!(kind = %descriptor.kind, namespace = %namespace, name = %name, "Created resource");
    Ok(EnsureOutcome::Created)
}

/// Create the namespace if it does not exist.
///
/// # Errors
///
/// Returns an error if the read or create fails.
pub async fn ensure_namespace(client: &Client, name: &str) -> Result<EnsureOutcome> {
    let api: Api<Namespace> = Api::all(client.clone());

    if api
        .get_opt(name)
        .await
        .with_context(|| format!("failed to read Namespace {name}"))?
        .is_some()
    {
        return Ok(EnsureOutcome::Existing);
    }

    let namespace = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    api.create(&post_params(), &namespace)
        .await
        .with_context(|| format!("failed to create Namespace {name}"))?;

    metrics::record_resource_created("Namespace");
    info!(namespace = %name, "Created namespace");
    Ok(EnsureOutcome::Created)
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod resources_tests;
