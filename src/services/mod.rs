//! # Services
//!
//! A service reconciles every resource of one kind, in order, through the engine.
//!
//! - `role_definitions.rs` - Custom role definitions (deletion retained)
//! - `role_assignments.rs` - Role assignments for the cluster's managed identity
//!
//! [`ResourceService`] covers any kind that is just "a list of specs and an engine".

pub mod role_assignments;
pub mod role_definitions;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::client::AsyncClient;
use crate::engine::{AsyncReconciler, Deadline, Progress, ReconcileError};
use crate::observability::metrics;
use crate::spec::{ResourceSpec, SpecProvider};

/// One step of a [`ServiceOrchestrator`](crate::orchestrator::ServiceOrchestrator)
#[async_trait]
pub trait ServiceReconciler: Send + Sync {
    /// Stable name, used as the token kind and in conditions
    fn name(&self) -> &str;

    /// Create or update every resource of this kind
    async fn reconcile(&self, deadline: &Deadline) -> Result<Progress, ReconcileError>;

    /// Delete every resource of this kind
    async fn delete(&self, deadline: &Deadline) -> Result<Progress, ReconcileError>;

    /// Whether this service owns its resources; informational only
    async fn is_managed(&self) -> Result<bool, ReconcileError>;
}

/// What `delete` does for a [`ResourceService`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Delete each resource through the engine
    Delete,
    /// Leave resources in place and report completion
    Retain,
}

/// Log and count a spec with no resource name; reconciliation carries on
pub fn warn_if_unnamed(service_name: &str, resource_name: &str) {
    if resource_name.is_empty() {
        warn!(
            service = service_name,
            "Resource name is empty; the resource will be reconciled without a name"
        );
        metrics::increment_config_warnings(service_name);
    }
}

/// Create or update `specs` in order, stopping at the first one that is not done
pub async fn reconcile_specs<C, S>(
    engine: &AsyncReconciler<C>,
    deadline: &Deadline,
    service_name: &str,
    specs: &[S],
) -> Result<Progress, ReconcileError>
where
    C: AsyncClient,
    S: ResourceSpec<Object = C::Object, Parameters = C::Parameters>,
{
    for spec in specs {
        warn_if_unnamed(service_name, spec.resource_name());
        match engine
            .create_or_update_resource(deadline, spec, service_name)
            .await
            .into_progress()?
        {
            Progress::Done => {}
            pending @ Progress::Pending(_) => return Ok(pending),
        }
    }
    Ok(Progress::Done)
}

/// Delete `specs` in order, stopping at the first one that is not done
pub async fn delete_specs<C, S>(
    engine: &AsyncReconciler<C>,
    deadline: &Deadline,
    service_name: &str,
    specs: &[S],
) -> Result<Progress, ReconcileError>
where
    C: AsyncClient,
    S: ResourceSpec<Object = C::Object, Parameters = C::Parameters>,
{
    for spec in specs {
        warn_if_unnamed(service_name, spec.resource_name());
        match engine
            .delete_resource(deadline, spec, service_name)
            .await
            .into_progress()?
        {
            Progress::Done => {}
            pending @ Progress::Pending(_) => return Ok(pending),
        }
    }
    Ok(Progress::Done)
}

/// Service over an engine and a spec list
pub struct ResourceService<C: AsyncClient, S> {
    name: String,
    engine: AsyncReconciler<C>,
    specs: Box<dyn SpecProvider<S>>,
    delete_policy: DeletePolicy,
    managed: bool,
}

impl<C: AsyncClient, S> std::fmt::Debug for ResourceService<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceService")
            .field("name", &self.name)
            .field("delete_policy", &self.delete_policy)
            .field("managed", &self.managed)
            .finish_non_exhaustive()
    }
}

impl<C: AsyncClient, S> ResourceService<C, S> {
    /// Managed service that deletes its resources
    pub fn new(
        name: impl Into<String>,
        engine: AsyncReconciler<C>,
        specs: impl SpecProvider<S> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            engine,
            specs: Box::new(specs),
            delete_policy: DeletePolicy::Delete,
            managed: true,
        }
    }

    #[must_use]
    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    #[must_use]
    pub fn with_managed(mut self, managed: bool) -> Self {
        self.managed = managed;
        self
    }

    #[must_use]
    pub fn engine(&self) -> &AsyncReconciler<C> {
        &self.engine
    }
}

#[async_trait]
impl<C, S> ServiceReconciler for ResourceService<C, S>
where
    C: AsyncClient + 'static,
    S: ResourceSpec<Object = C::Object, Parameters = C::Parameters> + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn reconcile(&self, deadline: &Deadline) -> Result<Progress, ReconcileError> {
        let specs = self.specs.specs();
        debug!(service = %self.name, count = specs.len(), "Reconciling resources");
        reconcile_specs(&self.engine, deadline, &self.name, &specs).await
    }

    async fn delete(&self, deadline: &Deadline) -> Result<Progress, ReconcileError> {
        match self.delete_policy {
            DeletePolicy::Retain => {
                debug!(service = %self.name, "Retaining resources on delete");
                Ok(Progress::Done)
            }
            DeletePolicy::Delete => {
                let specs = self.specs.specs();
                debug!(service = %self.name, count = specs.len(), "Deleting resources");
                delete_specs(&self.engine, deadline, &self.name, &specs).await
            }
        }
    }

    async fn is_managed(&self) -> Result<bool, ReconcileError> {
        Ok(self.managed)
    }
}
