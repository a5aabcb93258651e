//! # Service Orchestrator
//!
//! Runs a fixed, ordered list of services for one top-level object. `reconcile`
//! walks the list front to back and `delete` walks it back to front. Either stops
//! at the first service that fails or still has work in flight; the next
//! invocation starts again from the top and completed services become no-ops.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, info_span, Instrument};

use crate::engine::{Deadline, ErrorKind, Progress, ReconcileError};
use crate::services::ServiceReconciler;
use crate::status::{AsyncStatusUpdater, ConditionReason, ServiceCondition};

/// First failure of a pass, tagged with the service that produced it
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("failed to reconcile service {service}: {source}")]
    Reconcile {
        service: String,
        #[source]
        source: ReconcileError,
    },
    #[error("failed to delete service {service}: {source}")]
    Delete {
        service: String,
        #[source]
        source: ReconcileError,
    },
}

impl OrchestratorError {
    #[must_use]
    pub fn service(&self) -> &str {
        match self {
            OrchestratorError::Reconcile { service, .. }
            | OrchestratorError::Delete { service, .. } => service,
        }
    }

    #[must_use]
    pub fn source_error(&self) -> &ReconcileError {
        match self {
            OrchestratorError::Reconcile { source, .. }
            | OrchestratorError::Delete { source, .. } => source,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.source_error().kind
    }

    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        self.source_error().retry_after
    }
}

pub struct ServiceOrchestrator {
    services: Vec<Box<dyn ServiceReconciler>>,
    status: Arc<dyn AsyncStatusUpdater>,
    service_timeout: Duration,
}

impl std::fmt::Debug for ServiceOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceOrchestrator")
            .field("services", &self.service_names())
            .field("service_timeout", &self.service_timeout)
            .finish_non_exhaustive()
    }
}

impl ServiceOrchestrator {
    /// `services` are reconciled in the given order and deleted in reverse
    #[must_use]
    pub fn new(
        services: Vec<Box<dyn ServiceReconciler>>,
        status: Arc<dyn AsyncStatusUpdater>,
        service_timeout: Duration,
    ) -> Self {
        Self {
            services,
            status,
            service_timeout,
        }
    }

    #[must_use]
    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name()).collect()
    }

    /// Create or update every service in order
    pub async fn reconcile(&self) -> Result<Progress, OrchestratorError> {
        for service in &self.services {
            let name = service.name();
            let span = info_span!("service.reconcile", service.name = name);
            let deadline = Deadline::after(self.service_timeout);

            let result = service.reconcile(&deadline).instrument(span).await;
            match result {
                Ok(Progress::Done) => {
                    debug!(service = name, "Service reconciled");
                    self.status.update_service_condition(
                        name,
                        ServiceCondition::ready(ConditionReason::Succeeded),
                    );
                }
                Ok(pending @ Progress::Pending(_)) => {
                    info!(service = name, "Service has an operation in progress");
                    self.status.update_service_condition(
                        name,
                        ServiceCondition::not_ready(
                            ConditionReason::Creating,
                            format!("{name} create or update in progress"),
                        ),
                    );
                    return Ok(pending);
                }
                Err(source) => {
                    error!(service = name, "Failed to reconcile service: {}", source);
                    self.status.update_service_condition(
                        name,
                        ServiceCondition::not_ready(ConditionReason::Failed, source.to_string()),
                    );
                    return Err(OrchestratorError::Reconcile {
                        service: name.to_string(),
                        source,
                    });
                }
            }
        }

        Ok(Progress::Done)
    }

    /// Delete every service in reverse order
    pub async fn delete(&self) -> Result<Progress, OrchestratorError> {
        for service in self.services.iter().rev() {
            let name = service.name();
            let span = info_span!("service.delete", service.name = name);
            let deadline = Deadline::after(self.service_timeout);

            let result = service.delete(&deadline).instrument(span).await;
            match result {
                Ok(Progress::Done) => {
                    debug!(service = name, "Service deleted");
                    self.status.update_service_condition(
                        name,
                        ServiceCondition::not_ready(
                            ConditionReason::Deleted,
                            format!("{name} deleted"),
                        ),
                    );
                }
                Ok(pending @ Progress::Pending(_)) => {
                    info!(service = name, "Service delete in progress");
                    self.status.update_service_condition(
                        name,
                        ServiceCondition::not_ready(
                            ConditionReason::Deleting,
                            format!("{name} delete in progress"),
                        ),
                    );
                    return Ok(pending);
                }
                Err(source) => {
                    error!(service = name, "Failed to delete service: {}", source);
                    self.status.update_service_condition(
                        name,
                        ServiceCondition::not_ready(ConditionReason::Failed, source.to_string()),
                    );
                    return Err(OrchestratorError::Delete {
                        service: name.to_string(),
                        source,
                    });
                }
            }
        }

        Ok(Progress::Done)
    }

    /// Managed flag of every service, in declared order
    pub async fn managed_services(&self) -> Result<Vec<(String, bool)>, OrchestratorError> {
        let mut managed = Vec::with_capacity(self.services.len());
        for service in &self.services {
            let is_managed = service
                .is_managed()
                .await
                .map_err(|source| OrchestratorError::Reconcile {
                    service: service.name().to_string(),
                    source,
                })?;
            managed.push((service.name().to_string(), is_managed));
        }
        Ok(managed)
    }
}
