//! # Reconciliation Engine
//!
//! Generic create-or-update and delete for one remote resource, driven by an
//! [`AsyncClient`] and resumable across invocations through the [`OperationTracker`].
//!
//! - `types.rs` - Outcomes and classified errors
//! - `deadline.rs` - Per-invocation time budget
//!
//! Neither operation ever waits for a long-running operation to finish. A
//! submission that does not complete synchronously is recorded as an
//! [`OperationToken`] and reported as [`ReconcileOutcome::InProgress`]; later
//! invocations poll it with `is_done` before doing anything else.

mod deadline;
mod types;

pub use deadline::Deadline;
pub use types::{ErrorKind, Progress, ReconcileError, ReconcileOutcome};

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, field, info, info_span, warn, Instrument};

use crate::client::{AsyncClient, ClientError, Submission};
use crate::observability::metrics;
use crate::spec::ResourceSpec;
use crate::status::{OperationToken, OperationType};
use crate::tracker::OperationTracker;

/// Result of a single non-blocking poll
enum Poll {
    Pending,
    Done,
    /// The remote API no longer knows the operation
    Vanished,
}

/// Engine for one resource kind
pub struct AsyncReconciler<C: AsyncClient> {
    client: Arc<C>,
    tracker: OperationTracker,
}

impl<C: AsyncClient> std::fmt::Debug for AsyncReconciler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncReconciler")
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

impl<C: AsyncClient> AsyncReconciler<C> {
    #[must_use]
    pub fn new(client: Arc<C>, tracker: OperationTracker) -> Self {
        Self { client, tracker }
    }

    #[must_use]
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    #[must_use]
    pub fn tracker(&self) -> &OperationTracker {
        &self.tracker
    }

    /// Drive one resource toward its desired state
    ///
    /// Resumes an outstanding operation if one is tracked, otherwise fetches the
    /// current object, asks the `ResourceSpec` for parameters and submits only when they
    /// differ from what exists.
    pub async fn create_or_update_resource<S>(
        &self,
        deadline: &Deadline,
        spec: &S,
        service_name: &str,
    ) -> ReconcileOutcome<C::Object>
    where
        S: ResourceSpec<Object = C::Object, Parameters = C::Parameters>,
    {
        let span = info_span!(
            "resource.create_or_update",
            resource.service = service_name,
            resource.name = spec.resource_name(),
            resource.group = spec.resource_group_name(),
            operation.outcome = field::Empty,
            operation.duration_ms = field::Empty,
        );
        let span_clone = span.clone();
        let start = Instant::now();

        async move {
            let outcome = self.create_or_update_inner(deadline, spec, service_name).await;

            let label = outcome_label(&outcome);
            metrics::record_operation(
                service_name,
                "create_or_update",
                label,
                start.elapsed().as_secs_f64(),
            );
            span_clone.record("operation.outcome", label);
            span_clone.record(
                "operation.duration_ms",
                u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            );
            outcome
        }
        .instrument(span)
        .await
    }

    /// Drive one resource toward absence
    ///
    /// A tracked create-or-update is abandoned: delete is the only way to cancel it.
    /// A resource that is already gone counts as deleted.
    pub async fn delete_resource<S>(
        &self,
        deadline: &Deadline,
        spec: &S,
        service_name: &str,
    ) -> ReconcileOutcome<C::Object>
    where
        S: ResourceSpec<Object = C::Object, Parameters = C::Parameters>,
    {
        let span = info_span!(
            "resource.delete",
            resource.service = service_name,
            resource.name = spec.resource_name(),
            resource.group = spec.resource_group_name(),
            operation.outcome = field::Empty,
            operation.duration_ms = field::Empty,
        );
        let span_clone = span.clone();
        let start = Instant::now();

        async move {
            let outcome = self.delete_inner(deadline, spec, service_name).await;

            let label = outcome_label(&outcome);
            metrics::record_operation(service_name, "delete", label, start.elapsed().as_secs_f64());
            span_clone.record("operation.outcome", label);
            span_clone.record(
                "operation.duration_ms",
                u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            );
            outcome
        }
        .instrument(span)
        .await
    }

    async fn create_or_update_inner<S>(
        &self,
        deadline: &Deadline,
        spec: &S,
        service_name: &str,
    ) -> ReconcileOutcome<C::Object>
    where
        S: ResourceSpec<Object = C::Object, Parameters = C::Parameters>,
    {
        let name = spec.resource_name();
        let owner = spec.owner_resource_name();
        let mut existing: Option<C::Object> = None;
        let mut fetched = false;

        if let Some(token) = self.tracker.load(service_name, name) {
            match self.poll(deadline, &token).await {
                Ok(Poll::Pending) => {
                    debug!(operation = %token.operation_type, "Operation still in progress");
                    return ReconcileOutcome::InProgress(token);
                }
                Ok(Poll::Vanished) => {
                    warn!(
                        operation = %token.operation_type,
                        "Tracked operation no longer known to the remote API, re-reading state"
                    );
                    self.tracker.clear(service_name, name);
                }
                Ok(Poll::Done) => match token.operation_type {
                    OperationType::CreateOrUpdate => {
                        match deadline.run(self.client.result(&token)).await {
                            Ok(object) => {
                                info!("Create or update of {} '{}' finished", service_name, name);
                                self.tracker.clear(service_name, name);
                                fetched = object.is_some();
                                existing = object;
                            }
                            Err(err) if err.is_not_found() => {
                                warn!(
                                    "Result of {} '{}' no longer available, re-reading state",
                                    service_name, name
                                );
                                self.tracker.clear(service_name, name);
                            }
                            Err(err) => {
                                self.tracker.clear(service_name, name);
                                return self.fail(
                                    service_name,
                                    name,
                                    "failed to get result of create or update",
                                    err,
                                    None,
                                );
                            }
                        }
                    }
                    OperationType::Delete => {
                        info!(
                            "Previous delete of {} '{}' finished, continuing with create",
                            service_name, name
                        );
                        self.tracker.clear(service_name, name);
                    }
                },
                Err(err) => {
                    return self.fail(
                        service_name,
                        name,
                        "failed to poll operation",
                        err,
                        Some(&token),
                    );
                }
            }
        }

        if !fetched {
            existing = match deadline.run(self.client.get(owner, name)).await {
                Ok(object) => object,
                Err(err) if err.is_not_found() => None,
                Err(err) => {
                    return self.fail(service_name, name, "failed to get existing resource", err, None);
                }
            };
        }

        let parameters = match spec.parameters(existing.as_ref()) {
            Ok(Some(parameters)) => parameters,
            Ok(None) => {
                debug!("{} '{}' already in desired state", service_name, name);
                return ReconcileOutcome::Completed(existing);
            }
            Err(err) => {
                error!("Invalid parameters for {} '{}': {:#}", service_name, name, err);
                metrics::increment_service_errors(service_name, ErrorKind::Terminal.as_str());
                return ReconcileOutcome::Failed(ReconcileError::terminal(
                    service_name,
                    name,
                    format!("failed to compute parameters: {err:#}"),
                ));
            }
        };

        info!(
            "Submitting create or update for {} '{}' (exists: {})",
            service_name,
            name,
            existing.is_some()
        );
        match deadline
            .run(self.client.create_or_update_async(owner, name, parameters))
            .await
        {
            Ok(Submission::Completed(object)) => {
                info!("Create or update of {} '{}' completed", service_name, name);
                ReconcileOutcome::Completed(Some(object))
            }
            Ok(Submission::Pending(handle)) => {
                let token = OperationToken::new(
                    service_name,
                    name,
                    spec.resource_group_name(),
                    OperationType::CreateOrUpdate,
                    handle.into_bytes(),
                );
                self.tracker.save(token.clone());
                metrics::increment_lro_submissions(service_name);
                info!("Create or update of {} '{}' in progress", service_name, name);
                ReconcileOutcome::InProgress(token)
            }
            Err(err) => self.fail(
                service_name,
                name,
                "failed to submit create or update",
                err,
                None,
            ),
        }
    }

    async fn delete_inner<S>(
        &self,
        deadline: &Deadline,
        spec: &S,
        service_name: &str,
    ) -> ReconcileOutcome<C::Object>
    where
        S: ResourceSpec<Object = C::Object, Parameters = C::Parameters>,
    {
        let name = spec.resource_name();
        let owner = spec.owner_resource_name();

        if let Some(token) = self.tracker.load(service_name, name) {
            match token.operation_type {
                OperationType::CreateOrUpdate => {
                    info!(
                        "Abandoning in-flight create or update of {} '{}' for delete",
                        service_name, name
                    );
                    self.tracker.clear(service_name, name);
                }
                OperationType::Delete => match self.poll(deadline, &token).await {
                    Ok(Poll::Pending) => {
                        debug!("Delete of {} '{}' still in progress", service_name, name);
                        return ReconcileOutcome::InProgress(token);
                    }
                    Ok(Poll::Vanished) => {
                        warn!(
                            "Tracked delete of {} '{}' no longer known to the remote API, resubmitting",
                            service_name, name
                        );
                        self.tracker.clear(service_name, name);
                    }
                    Ok(Poll::Done) => {
                        return match deadline.run(self.client.result(&token)).await {
                            Ok(_) => {
                                info!("Delete of {} '{}' finished", service_name, name);
                                self.tracker.clear(service_name, name);
                                ReconcileOutcome::Completed(None)
                            }
                            Err(err) if err.is_not_found() => {
                                info!("Delete of {} '{}' finished", service_name, name);
                                self.tracker.clear(service_name, name);
                                ReconcileOutcome::Completed(None)
                            }
                            Err(err) => {
                                self.tracker.clear(service_name, name);
                                self.fail(
                                    service_name,
                                    name,
                                    "failed to get result of delete",
                                    err,
                                    None,
                                )
                            }
                        };
                    }
                    Err(err) => {
                        return self.fail(
                            service_name,
                            name,
                            "failed to poll delete",
                            err,
                            Some(&token),
                        );
                    }
                },
            }
        }

        info!("Deleting {} '{}'", service_name, name);
        match deadline.run(self.client.delete_async(owner, name)).await {
            Ok(None) => {
                info!("Delete of {} '{}' completed", service_name, name);
                ReconcileOutcome::Completed(None)
            }
            Ok(Some(handle)) => {
                let token = OperationToken::new(
                    service_name,
                    name,
                    spec.resource_group_name(),
                    OperationType::Delete,
                    handle.into_bytes(),
                );
                self.tracker.save(token.clone());
                metrics::increment_lro_submissions(service_name);
                info!("Delete of {} '{}' in progress", service_name, name);
                ReconcileOutcome::InProgress(token)
            }
            Err(err) if err.is_not_found() => {
                debug!("{} '{}' already absent", service_name, name);
                ReconcileOutcome::Completed(None)
            }
            Err(err) => self.fail(service_name, name, "failed to submit delete", err, None),
        }
    }

    async fn poll(&self, deadline: &Deadline, token: &OperationToken) -> Result<Poll, ClientError> {
        match deadline.run(self.client.is_done(token)).await {
            Ok(true) => Ok(Poll::Done),
            Ok(false) => Ok(Poll::Pending),
            Err(err) if err.is_not_found() => Ok(Poll::Vanished),
            Err(err) => Err(err),
        }
    }

    /// Classify and log a client failure
    ///
    /// When `token` is the operation being polled, a terminal failure drops it and a
    /// retryable one keeps it so the next invocation polls instead of resubmitting.
    /// A failed `result` clears the token before getting here: the operation has
    /// finished, so the next invocation re-reads state through `get`.
    fn fail(
        &self,
        service_name: &str,
        name: &str,
        context: &str,
        err: ClientError,
        token: Option<&OperationToken>,
    ) -> ReconcileOutcome<C::Object> {
        let failure = ReconcileError::from_client(service_name, name, context, err);
        metrics::increment_service_errors(service_name, failure.kind.as_str());

        match failure.kind {
            ErrorKind::Retryable => {
                warn!("{}", failure);
            }
            ErrorKind::Terminal => {
                error!("{}", failure);
                if token.is_some() {
                    self.tracker.clear(service_name, name);
                }
            }
        }

        ReconcileOutcome::Failed(failure)
    }
}

fn outcome_label<T>(outcome: &ReconcileOutcome<T>) -> &'static str {
    match outcome {
        ReconcileOutcome::Completed(_) => "completed",
        ReconcileOutcome::InProgress(_) => "in_progress",
        ReconcileOutcome::Failed(_) => "failed",
    }
}
