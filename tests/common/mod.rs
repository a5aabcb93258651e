//! Shared fakes for integration tests
//!
//! `FakeClient` is an in-memory remote API for "widgets". It can complete
//! submissions synchronously or as long-running operations that finish after a
//! scripted number of polls, and counts every call.

#![allow(dead_code, reason = "each test binary uses a different subset of the fakes")]

use async_trait::async_trait;
use resource_reconciler::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Widget {
    pub name: String,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetParams {
    pub size: u32,
}

#[derive(Debug, Clone)]
pub struct WidgetSpec {
    pub name: String,
    pub owner: String,
    pub group: String,
    pub size: u32,
}

impl WidgetSpec {
    pub fn new(name: &str, size: u32) -> Self {
        Self {
            name: name.to_string(),
            owner: "owner".to_string(),
            group: "rg".to_string(),
            size,
        }
    }
}

impl ResourceSpec for WidgetSpec {
    type Object = Widget;
    type Parameters = WidgetParams;

    fn resource_name(&self) -> &str {
        &self.name
    }

    fn owner_resource_name(&self) -> &str {
        &self.owner
    }

    fn resource_group_name(&self) -> &str {
        &self.group
    }

    fn parameters(&self, existing: Option<&Widget>) -> anyhow::Result<Option<WidgetParams>> {
        if self.size == 0 {
            anyhow::bail!("size must be positive");
        }
        match existing {
            Some(widget) if widget.size == self.size => Ok(None),
            _ => Ok(Some(WidgetParams { size: self.size })),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Sync,
    /// Operations finish after this many `is_done` calls returned false
    Async { polls: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calls {
    pub get: usize,
    pub create: usize,
    pub is_done: usize,
    pub result: usize,
    pub delete: usize,
}

#[derive(Debug, Clone)]
enum PendingOp {
    Put(Widget),
    Delete,
}

#[derive(Debug)]
struct Pending {
    op: PendingOp,
    polls_left: usize,
    finished: bool,
}

#[derive(Debug)]
struct FakeState {
    mode: Mode,
    objects: HashMap<String, Widget>,
    pending: HashMap<String, Pending>,
    calls: Calls,
    /// One-shot failures keyed by operation name
    failures: HashMap<&'static str, (u16, Option<Duration>)>,
    latency: Option<Duration>,
    /// One-shot delays applied after the call's effect, keyed by operation name
    trailing: HashMap<&'static str, Duration>,
}

#[derive(Debug)]
pub struct FakeClient {
    state: Mutex<FakeState>,
}

impl FakeClient {
    pub fn new(mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                mode,
                objects: HashMap::new(),
                pending: HashMap::new(),
                calls: Calls::default(),
                failures: HashMap::new(),
                latency: None,
                trailing: HashMap::new(),
            }),
        })
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls
    }

    pub fn object(&self, name: &str) -> Option<Widget> {
        self.state.lock().unwrap().objects.get(name).cloned()
    }

    pub fn insert(&self, widget: Widget) {
        self.state
            .lock()
            .unwrap()
            .objects
            .insert(widget.name.clone(), widget);
    }

    /// Fail the next call of `op` ("get", "create", "is_done", "result", "delete")
    pub fn fail_once(&self, op: &'static str, status: u16) {
        self.state.lock().unwrap().failures.insert(op, (status, None));
    }

    pub fn throttle_once(&self, op: &'static str, retry_after: Duration) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(op, (429, Some(retry_after)));
    }

    /// Make every call take this long
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().unwrap().latency = Some(latency);
    }

    /// Apply the next call of `op` right away but return only after `latency`
    pub fn slow_once(&self, op: &'static str, latency: Duration) {
        self.state.lock().unwrap().trailing.insert(op, latency);
    }

    /// Forget all in-flight operations, as if the remote API expired them
    pub fn forget_operations(&self) {
        self.state.lock().unwrap().pending.clear();
    }

    /// Register an in-flight create that a previous invocation submitted
    pub fn seed_pending_put(&self, widget: Widget, polls: usize) {
        self.state.lock().unwrap().pending.insert(
            widget.name.clone(),
            Pending {
                op: PendingOp::Put(widget),
                polls_left: polls,
                finished: false,
            },
        );
    }

    pub fn seed_pending_delete(&self, name: &str, polls: usize) {
        self.state.lock().unwrap().pending.insert(
            name.to_string(),
            Pending {
                op: PendingOp::Delete,
                polls_left: polls,
                finished: false,
            },
        );
    }

    async fn linger(&self, op: &'static str) {
        let trailing = self.state.lock().unwrap().trailing.remove(op);
        if let Some(latency) = trailing {
            tokio::time::sleep(latency).await;
        }
    }

    async fn enter(&self, op: &'static str) -> Result<(), ClientError> {
        let latency = self.state.lock().unwrap().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock().unwrap();
        match op {
            "get" => state.calls.get += 1,
            "create" => state.calls.create += 1,
            "is_done" => state.calls.is_done += 1,
            "result" => state.calls.result += 1,
            "delete" => state.calls.delete += 1,
            _ => {}
        }
        match state.failures.remove(op) {
            Some((status, retry_after)) => {
                let err = ClientError::from_status(status, format!("{op} failed"));
                Err(match retry_after {
                    Some(delay) => err.with_retry_after(delay),
                    None => err,
                })
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AsyncClient for FakeClient {
    type Object = Widget;
    type Parameters = WidgetParams;

    async fn get(&self, _owner: &str, name: &str) -> Result<Option<Widget>, ClientError> {
        self.enter("get").await?;
        Ok(self.state.lock().unwrap().objects.get(name).cloned())
    }

    async fn create_or_update_async(
        &self,
        _owner: &str,
        name: &str,
        parameters: WidgetParams,
    ) -> Result<Submission<Widget>, ClientError> {
        self.enter("create").await?;
        let widget = Widget {
            name: name.to_string(),
            size: parameters.size,
        };

        let submission = {
            let mut state = self.state.lock().unwrap();
            match state.mode {
                Mode::Sync => {
                    state.objects.insert(name.to_string(), widget.clone());
                    Submission::Completed(widget)
                }
                Mode::Async { polls } => {
                    state.pending.insert(
                        name.to_string(),
                        Pending {
                            op: PendingOp::Put(widget),
                            polls_left: polls,
                            finished: false,
                        },
                    );
                    Submission::Pending(OperationHandle::new(name.as_bytes()))
                }
            }
        };
        self.linger("create").await;
        Ok(submission)
    }

    async fn is_done(&self, token: &OperationToken) -> Result<bool, ClientError> {
        self.enter("is_done").await?;

        let mut state = self.state.lock().unwrap();
        let pending = state
            .pending
            .get_mut(&token.resource_name)
            .ok_or(ClientError::NotFound)?;
        if pending.finished {
            return Ok(true);
        }
        if pending.polls_left > 0 {
            pending.polls_left -= 1;
            return Ok(false);
        }
        pending.finished = true;
        let op = pending.op.clone();
        match op {
            PendingOp::Put(widget) => {
                state.objects.insert(widget.name.clone(), widget);
            }
            PendingOp::Delete => {
                state.objects.remove(&token.resource_name);
            }
        }
        Ok(true)
    }

    async fn result(&self, token: &OperationToken) -> Result<Option<Widget>, ClientError> {
        self.enter("result").await?;

        let mut state = self.state.lock().unwrap();
        let pending = state
            .pending
            .remove(&token.resource_name)
            .ok_or(ClientError::NotFound)?;
        match pending.op {
            PendingOp::Put(_) => Ok(state.objects.get(&token.resource_name).cloned()),
            PendingOp::Delete => Ok(None),
        }
    }

    async fn delete_async(
        &self,
        _owner: &str,
        name: &str,
    ) -> Result<Option<OperationHandle>, ClientError> {
        self.enter("delete").await?;

        let mut state = self.state.lock().unwrap();
        if !state.objects.contains_key(name) {
            return Err(ClientError::NotFound);
        }
        match state.mode {
            Mode::Sync => {
                state.objects.remove(name);
                Ok(None)
            }
            Mode::Async { polls } => {
                state.pending.insert(
                    name.to_string(),
                    Pending {
                        op: PendingOp::Delete,
                        polls_left: polls,
                        finished: false,
                    },
                );
                Ok(Some(OperationHandle::new(name.as_bytes())))
            }
        }
    }
}

/// Engine over a fresh in-memory status store
pub fn engine(client: &Arc<FakeClient>) -> (AsyncReconciler<FakeClient>, SharedStatus) {
    let status = SharedStatus::default();
    let engine = engine_with_status(client, &status);
    (engine, status)
}

pub fn engine_with_status(
    client: &Arc<FakeClient>,
    status: &SharedStatus,
) -> AsyncReconciler<FakeClient> {
    AsyncReconciler::new(
        Arc::clone(client),
        OperationTracker::new(Arc::new(status.clone())),
    )
}

pub fn deadline() -> Deadline {
    Deadline::after(Duration::from_secs(5))
}

/// What a scripted service returns from `reconcile` / `delete`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Done,
    Pending,
    Fail(ErrorKind),
}

/// Service that records every call into a shared log and returns scripted results
#[derive(Debug)]
pub struct ScriptedService {
    pub name: String,
    pub reconcile: Script,
    pub delete: Script,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl ScriptedService {
    pub fn boxed(
        name: &str,
        reconcile: Script,
        delete: Script,
        log: &Arc<Mutex<Vec<String>>>,
    ) -> Box<dyn ServiceReconciler> {
        Box::new(Self {
            name: name.to_string(),
            reconcile,
            delete,
            log: Arc::clone(log),
        })
    }

    fn run(&self, action: &str, script: Script) -> Result<Progress, ReconcileError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{action}:{}", self.name));
        match script {
            Script::Done => Ok(Progress::Done),
            Script::Pending => Ok(Progress::Pending(OperationToken::new(
                self.name.clone(),
                "res",
                "rg",
                OperationType::CreateOrUpdate,
                vec![],
            ))),
            Script::Fail(kind) => {
                let status = match kind {
                    ErrorKind::Retryable => 503,
                    ErrorKind::Terminal => 400,
                };
                Err(ReconcileError::from_client(
                    &self.name,
                    "res",
                    "scripted failure",
                    ClientError::from_status(status, "boom"),
                ))
            }
        }
    }
}

#[async_trait]
impl ServiceReconciler for ScriptedService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reconcile(&self, _deadline: &Deadline) -> Result<Progress, ReconcileError> {
        self.run("reconcile", self.reconcile)
    }

    async fn delete(&self, _deadline: &Deadline) -> Result<Progress, ReconcileError> {
        self.run("delete", self.delete)
    }

    async fn is_managed(&self) -> Result<bool, ReconcileError> {
        Ok(true)
    }
}
