// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Admission review for Forklift `Plan` objects.
//!
//! A `Plan` whose destination provider is one of ours (`<cluster>-mtv`) is admitted only
//! if the requesting user can see the plan's target namespace on that cluster. The
//! check lists `KubevirtProject` cluster views while impersonating the user, so the
//! managed cluster's own RBAC decides; nothing is cached between requests.
//!
//! Every failure denies the request.

use crate::constants::{
    CLUSTER_VIEW_API_GROUP, CLUSTER_VIEW_API_VERSION, KIND_KUBEVIRT_PROJECT,
    KUBEVIRT_PROJECT_PLURAL, MTV_NAME_SUFFIX,
};
use crate::crd::Plan;
use crate::errors::AdmissionError;
use crate::labels::{VIEW_ALL_PROJECTS, VIEW_LABEL_CLUSTER, VIEW_LABEL_PROJECT};
use crate::metrics;
use http::{HeaderName, HeaderValue};
use k8s_openapi::api::authentication::v1::UserInfo;
use kube::api::{DynamicObject, ListParams};
use kube::core::admission::{AdmissionRequest, AdmissionResponse, Operation};
use kube::core::{ApiResource, GroupVersionKind};
use kube::{Api, Client, Config};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// `cluster`/`project` labels of one cluster view the caller can list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectView {
    pub cluster: Option<String>,
    pub project: Option<String>,
}

impl ProjectView {
    /// Read the view labels of a listed object.
    #[must_use]
    pub fn from_object(object: &DynamicObject) -> Self {
        let label = |key: &str| {
            object
                .metadata
                .labels
                .as_ref()
                .and_then(|labels| labels.get(key))
                .cloned()
        };
        Self {
            cluster: label(VIEW_LABEL_CLUSTER),
            project: label(VIEW_LABEL_PROJECT),
        }
    }
}

/// Lists the cluster views visible to a caller.
#[async_trait::async_trait]
pub trait VisibilityQuery: Send + Sync {
    /// List the views `caller` can see.
    ///
    /// # Errors
    ///
    /// [`AdmissionError::ClientSetup`] if the caller cannot be impersonated,
    /// [`AdmissionError::VisibilityQuery`] if the list call fails.
    async fn visible_projects(&self, caller: &UserInfo) -> Result<Vec<ProjectView>, AdmissionError>;
}

/// [`VisibilityQuery`] backed by the API server, impersonating the caller.
pub struct ImpersonatedViewQuery {
    base: Config,
    timeout: Duration,
}

impl ImpersonatedViewQuery {
    /// Query through clients derived from `base`, bounding each list by `timeout`.
    #[must_use]
    pub fn new(base: Config, timeout: Duration) -> Self {
        Self { base, timeout }
    }

    /// Client sending `Impersonate-User`, `Impersonate-Group` and `Impersonate-Uid`.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::ClientSetup`] if the identity is not a valid header
    /// value or the client cannot be built.
    pub fn impersonating_client(&self, caller: &UserInfo) -> Result<Client, AdmissionError> {
        let header = |name: &'static str, value: &str| {
            HeaderValue::from_str(value)
                .map(|v| (HeaderName::from_static(name), v))
                .map_err(|e| AdmissionError::ClientSetup(format!("invalid {name} header: {e}")))
        };

        let mut config = self.base.clone();
        config.headers.push(header(
            "impersonate-user",
            caller.username.as_deref().unwrap_or_default(),
        )?);
        for group in caller.groups.iter().flatten() {
            config.headers.push(header("impersonate-group", group.as_str())?);
        }
        if let Some(uid) = caller.uid.as_deref().filter(|uid| !uid.is_empty()) {
            config.headers.push(header("impersonate-uid", uid)?);
        }

        Client::try_from(config).map_err(|e| AdmissionError::ClientSetup(e.to_string()))
    }
}

#[async_trait::async_trait]
impl VisibilityQuery for ImpersonatedViewQuery {
    async fn visible_projects(&self, caller: &UserInfo) -> Result<Vec<ProjectView>, AdmissionError> {
        let client = self.impersonating_client(caller)?;
        let resource = ApiResource::from_gvk_with_plural(
            &GroupVersionKind::gvk(
                CLUSTER_VIEW_API_GROUP,
                CLUSTER_VIEW_API_VERSION,
                KIND_KUBEVIRT_PROJECT,
            ),
            KUBEVIRT_PROJECT_PLURAL,
        );
        let api: Api<DynamicObject> = Api::all_with(client, &resource);

        let list = tokio::time::timeout(self.timeout, api.list(&ListParams::default()))
            .await
            .map_err(|_| {
                AdmissionError::VisibilityQuery(format!("timed out after {:?}", self.timeout))
            })?
            .map_err(|e| AdmissionError::VisibilityQuery(e.to_string()))?;

        Ok(list.items.iter().map(ProjectView::from_object).collect())
    }
}

/// Whether any view grants `target_namespace` (or every project) on `cluster`.
#[must_use]
pub fn decide_visibility(views: &[ProjectView], cluster: &str, target_namespace: &str) -> bool {
    views.iter().any(|view| {
        view.cluster.as_deref() == Some(cluster)
            && matches!(
                view.project.as_deref(),
                Some(project) if project == target_namespace || project == VIEW_ALL_PROJECTS
            )
    })
}

/// Why a review ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// Operation other than create or update
    NotApplicable,
    /// Destination provider is not managed by this operator
    Skipped,
    /// The caller can see the target namespace
    Visible,
    /// The caller cannot see the target namespace
    NotVisible,
    /// Missing or malformed object
    InvalidRequest,
    /// Impersonation or list failure
    QueryFailed,
}

impl DecisionReason {
    /// Metric label for this reason.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionReason::NotApplicable => "not_applicable",
            DecisionReason::Skipped => "skipped",
            DecisionReason::Visible => "visible",
            DecisionReason::NotVisible => "not_visible",
            DecisionReason::InvalidRequest => "invalid_request",
            DecisionReason::QueryFailed => "query_failed",
        }
    }
}

/// Outcome of reviewing one `Plan` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub reason: DecisionReason,
    pub message: String,
}

impl Decision {
    fn allow(reason: DecisionReason, message: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason,
            message: message.into(),
        }
    }

    fn deny(reason: DecisionReason, message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason,
            message: message.into(),
        }
    }

    fn from_error(err: &AdmissionError) -> Self {
        let reason = match err {
            AdmissionError::EmptyObject | AdmissionError::MalformedPlan(_) => {
                DecisionReason::InvalidRequest
            }
            AdmissionError::ClientSetup(_) | AdmissionError::VisibilityQuery(_) => {
                DecisionReason::QueryFailed
            }
        };
        Self::deny(reason, err.denial_message())
    }
}

/// Cluster name encoded in a managed destination provider name (`foo-mtv` -> `foo`).
///
/// Any name carrying the suffix is managed, so `-mtv` maps to the empty cluster
/// name and still goes through the visibility check.
#[must_use]
pub fn managed_cluster_for_provider(provider_name: &str) -> Option<&str> {
    provider_name.strip_suffix(MTV_NAME_SUFFIX)
}

/// Stateless reviewer for `Plan` admission requests.
#[derive(Clone)]
pub struct PlanAdmission {
    query: Arc<dyn VisibilityQuery>,
}

impl PlanAdmission {
    #[must_use]
    pub fn new(query: Arc<dyn VisibilityQuery>) -> Self {
        Self { query }
    }

    /// Review a request and build the admission response.
    pub async fn review(&self, req: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
        let decision = self.evaluate(req).await;
        metrics::record_admission_decision(decision.allowed, decision.reason.as_str());

        let response = AdmissionResponse::from(req);
        if decision.allowed {
            debug!(uid = %req.uid, reason = %decision.message, "Plan admitted");
            response
        } else {
            info!(uid = %req.uid, reason = %decision.message, "Plan denied");
            response.deny(decision.message)
        }
    }

    /// Decide a request without building a response.
    pub async fn evaluate(&self, req: &AdmissionRequest<DynamicObject>) -> Decision {
        if !matches!(req.operation, Operation::Create | Operation::Update) {
            return Decision::allow(DecisionReason::NotApplicable, "operation not reviewed");
        }

        let plan = match parse_plan(req.object.as_ref()) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(uid = %req.uid, error = %e, "Rejecting unreadable Plan");
                return Decision::from_error(&e);
            }
        };

        let target_namespace = plan.spec.target_namespace.as_str();
        let destination = plan.spec.provider.destination.name.as_str();
        let Some(cluster) = managed_cluster_for_provider(destination) else {
            return Decision::allow(
                DecisionReason::Skipped,
                "Plan validation skipped: destination provider is not managed by MTV controller",
            );
        };

        let views = match self.query.visible_projects(&req.user_info).await {
            Ok(views) => views,
            Err(e) => {
                warn!(
                    uid = %req.uid,
                    user = ?req.user_info.username,
                    error = %e,
                    "Cluster view query failed"
                );
                return Decision::from_error(&e);
            }
        };

        if decide_visibility(&views, cluster, target_namespace) {
            Decision::allow(
                DecisionReason::Visible,
                format!("User has access to namespace {target_namespace} in cluster {cluster}"),
            )
        } else {
            Decision::deny(
                DecisionReason::NotVisible,
                format!(
                    "User does not have permission to access the target namespace: {target_namespace} in cluster: {cluster}"
                ),
            )
        }
    }
}

fn parse_plan(object: Option<&DynamicObject>) -> Result<Plan, AdmissionError> {
    let object = object.ok_or(AdmissionError::EmptyObject)?;
    let value = serde_json::to_value(object).map_err(AdmissionError::MalformedPlan)?;
    serde_json::from_value(value).map_err(AdmissionError::MalformedPlan)
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod plan_tests;
