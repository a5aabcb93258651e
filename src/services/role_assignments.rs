//! # Role Assignments
//!
//! Grants roles to the managed cluster's system-assigned identity. The principal
//! ID is looked up on every reconcile before specs are built.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

use crate::client::{AsyncClient, ClientError};
use crate::engine::{AsyncReconciler, Deadline, Progress, ReconcileError};
use crate::spec::ResourceSpec;

use super::{delete_specs, reconcile_specs, ServiceReconciler};

pub const SERVICE_NAME: &str = "roleassignments";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignmentProperties {
    pub role_definition_id: String,
    pub principal_id: String,
}

/// Remote role assignment as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<RoleAssignmentProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleAssignmentSpec {
    /// Assignment name (a GUID on most APIs); empty is tolerated with a warning
    pub name: String,
    pub resource_group: String,
    /// Scope the role is granted on
    pub scope: String,
    pub role_definition_id: String,
    /// `None` when specs are built for deletion
    pub principal_id: Option<String>,
}

impl ResourceSpec for RoleAssignmentSpec {
    type Object = RoleAssignment;
    type Parameters = RoleAssignmentProperties;

    fn resource_name(&self) -> &str {
        &self.name
    }

    fn owner_resource_name(&self) -> &str {
        &self.scope
    }

    fn resource_group_name(&self) -> &str {
        &self.resource_group
    }

    fn parameters(
        &self,
        existing: Option<&RoleAssignment>,
    ) -> anyhow::Result<Option<RoleAssignmentProperties>> {
        if existing.is_some() {
            return Ok(None);
        }

        let principal_id = self.principal_id.clone().ok_or_else(|| {
            anyhow::anyhow!(
                "principal ID is required to assign role {}",
                self.role_definition_id
            )
        })?;

        Ok(Some(RoleAssignmentProperties {
            role_definition_id: self.role_definition_id.clone(),
            principal_id,
        }))
    }
}

/// Desired role assignments for one cluster
pub trait RoleAssignmentScope: Send + Sync {
    /// Specs for the given principal; `None` when deleting
    fn role_assignment_specs(&self, principal_id: Option<&str>) -> Vec<RoleAssignmentSpec>;

    fn resource_group(&self) -> &str;

    fn cluster_name(&self) -> &str;
}

/// Lookup of the managed cluster's system-assigned identity
#[async_trait]
pub trait ClusterIdentity: Send + Sync {
    /// Principal ID of the cluster identity; `Ok(None)` when the cluster has none yet
    async fn principal_id(
        &self,
        resource_group: &str,
        cluster_name: &str,
    ) -> Result<Option<String>, ClientError>;
}

pub struct RoleAssignmentService<C: AsyncClient> {
    engine: AsyncReconciler<C>,
    scope: Arc<dyn RoleAssignmentScope>,
    identity: Arc<dyn ClusterIdentity>,
}

impl<C: AsyncClient> std::fmt::Debug for RoleAssignmentService<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleAssignmentService")
            .field("engine", &self.engine)
            .field("cluster", &self.scope.cluster_name())
            .finish_non_exhaustive()
    }
}

impl<C> RoleAssignmentService<C>
where
    C: AsyncClient<Object = RoleAssignment, Parameters = RoleAssignmentProperties>,
{
    #[must_use]
    pub fn new(
        engine: AsyncReconciler<C>,
        scope: Arc<dyn RoleAssignmentScope>,
        identity: Arc<dyn ClusterIdentity>,
    ) -> Self {
        Self {
            engine,
            scope,
            identity,
        }
    }

    async fn cluster_principal_id(&self, deadline: &Deadline) -> Result<Option<String>, ReconcileError> {
        let resource_group = self.scope.resource_group();
        let cluster_name = self.scope.cluster_name();
        debug!(cluster = cluster_name, "Fetching principal ID for managed cluster");

        deadline
            .run(self.identity.principal_id(resource_group, cluster_name))
            .await
            .map_err(|e| {
                error!(
                    cluster = cluster_name,
                    "Failed to get managed cluster principal ID: {}", e
                );
                ReconcileError::from_client(
                    SERVICE_NAME,
                    cluster_name,
                    "failed to get managed cluster principal ID",
                    e,
                )
            })
    }
}

#[async_trait]
impl<C> ServiceReconciler for RoleAssignmentService<C>
where
    C: AsyncClient<Object = RoleAssignment, Parameters = RoleAssignmentProperties> + 'static,
{
    fn name(&self) -> &str {
        SERVICE_NAME
    }

    async fn reconcile(&self, deadline: &Deadline) -> Result<Progress, ReconcileError> {
        let principal_id = self.cluster_principal_id(deadline).await?;
        let specs = self.scope.role_assignment_specs(principal_id.as_deref());
        reconcile_specs(&self.engine, deadline, SERVICE_NAME, &specs).await
    }

    async fn delete(&self, deadline: &Deadline) -> Result<Progress, ReconcileError> {
        let specs = self.scope.role_assignment_specs(None);
        delete_specs(&self.engine, deadline, SERVICE_NAME, &specs).await
    }

    async fn is_managed(&self) -> Result<bool, ReconcileError> {
        Ok(true)
    }
}
