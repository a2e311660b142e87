#![cfg(feature = "mock")]

use std::{
    collections::VecDeque,
    marker::PhantomData,
    sync::{Arc, Mutex},
};

use futures_util::future::BoxFuture;

use crate::{
    errors::{Error, Result, ValidationError},
    identifiers::RunId,
    runs::{RunResource, RunSnapshot},
};

/// In-memory [`RunResource`] that replays queued snapshots.
///
/// `create` returns the create response; each `retrieve` pops the next queued
/// snapshot. Once the queue is empty the last snapshot is repeated, so a
/// never-finishing run needs only one queued value.
pub struct MockRuns<Run, Req = serde_json::Value> {
    inner: Arc<MockInner<Run>>,
    _request: PhantomData<fn(Req)>,
}

impl<Run, Req> Clone for MockRuns<Run, Req> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _request: PhantomData,
        }
    }
}

struct MockInner<Run> {
    created: Mutex<Option<Result<Run>>>,
    retrieves: Mutex<VecDeque<Result<Run>>>,
    last: Mutex<Option<Run>>,
    create_calls: Mutex<usize>,
    retrieved_ids: Mutex<Vec<RunId>>,
}

impl<Run, Req> MockRuns<Run, Req>
where
    Run: RunSnapshot + Clone + Send + 'static,
{
    /// Mock whose `create` returns `created`.
    pub fn new(created: Run) -> Self {
        Self::from_create(Ok(created))
    }

    /// Mock whose `create` fails.
    pub fn failing_create(err: Error) -> Self {
        Self::from_create(Err(err))
    }

    fn from_create(created: Result<Run>) -> Self {
        Self {
            inner: Arc::new(MockInner {
                created: Mutex::new(Some(created)),
                retrieves: Mutex::new(VecDeque::new()),
                last: Mutex::new(None),
                create_calls: Mutex::new(0),
                retrieved_ids: Mutex::new(Vec::new()),
            }),
            _request: PhantomData,
        }
    }

    /// Queue a snapshot for the next `retrieve`.
    pub fn then(self, run: Run) -> Self {
        self.push(Ok(run));
        self
    }

    /// Queue a failure for the next `retrieve`.
    pub fn then_error(self, err: Error) -> Self {
        self.push(Err(err));
        self
    }

    fn push(&self, result: Result<Run>) {
        self.inner
            .retrieves
            .lock()
            .expect("lock poisoned")
            .push_back(result);
    }

    pub fn create_calls(&self) -> usize {
        *self.inner.create_calls.lock().expect("lock poisoned")
    }

    pub fn retrieve_calls(&self) -> usize {
        self.inner.retrieved_ids.lock().expect("lock poisoned").len()
    }

    /// Ids passed to `retrieve`, in call order.
    pub fn retrieved_ids(&self) -> Vec<RunId> {
        self.inner.retrieved_ids.lock().expect("lock poisoned").clone()
    }

    fn next_create(&self) -> Result<Run> {
        *self.inner.create_calls.lock().expect("lock poisoned") += 1;
        self.inner
            .created
            .lock()
            .expect("lock poisoned")
            .take()
            .unwrap_or_else(|| Err(Error::Validation(ValidationError::new("mock run was already created"))))
    }

    fn next_retrieve(&self, id: &RunId) -> Result<Run> {
        self.inner
            .retrieved_ids
            .lock()
            .expect("lock poisoned")
            .push(id.clone());
        let next = self.inner.retrieves.lock().expect("lock poisoned").pop_front();
        let mut last = self.inner.last.lock().expect("lock poisoned");
        match next {
            Some(Ok(run)) => {
                *last = Some(run.clone());
                Ok(run)
            }
            Some(Err(err)) => Err(err),
            None => last.clone().ok_or_else(|| {
                Error::Validation(ValidationError::new("no mock run snapshot queued"))
            }),
        }
    }
}

impl<Run, Req> RunResource for MockRuns<Run, Req>
where
    Run: RunSnapshot + Clone + Send + 'static,
    Req: Send + 'static,
{
    type CreateRequest = Req;
    type Run = Run;

    fn create(&self, _request: Req) -> BoxFuture<'_, Result<Run>> {
        let result = self.next_create();
        Box::pin(async move { result })
    }

    fn retrieve<'a>(&'a self, id: &'a RunId) -> BoxFuture<'a, Result<Run>> {
        let result = self.next_retrieve(id);
        Box::pin(async move { result })
    }
}

pub mod fixtures {
    use serde_json::{Map, Value};

    use crate::runs::{ProcessorRun, ProcessorRunStatus, WorkflowRun, WorkflowRunStatus};

    pub fn processor_run(id: &str, status: ProcessorRunStatus) -> ProcessorRun {
        ProcessorRun {
            id: id.into(),
            object: Some("extract_run".into()),
            status,
            output: None,
            failure_reason: None,
            failure_message: None,
            metadata: None,
            extra: Map::new(),
        }
    }

    pub fn processed_extract_run(id: &str, output: Value) -> ProcessorRun {
        ProcessorRun {
            output: Some(output),
            ..processor_run(id, ProcessorRunStatus::Processed)
        }
    }

    pub fn workflow_run(id: &str, status: WorkflowRunStatus) -> WorkflowRun {
        WorkflowRun {
            id: id.into(),
            status,
            workflow: None,
            outputs: Vec::new(),
            failure_reason: None,
            metadata: None,
            extra: Map::new(),
        }
    }
}
