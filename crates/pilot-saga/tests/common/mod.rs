#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use pilot_core::{Cancellation, Interrupted, OperationType, RollbackData, RollbackState, RunMetadata};
use pilot_saga::{Compensate, RetryPolicy, SagaConfig, SagaStep};
use pilot_store::{StateRepository, StoreError};

#[derive(Default)]
pub struct TestContext {
    pub log: Mutex<Vec<String>>,
}

impl TestContext {
    pub fn push(&self, entry: String) {
        self.log.lock().expect("lock poisoned").push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.log.lock().expect("lock poisoned").clone()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TestError {
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

pub fn fast_config(enable_rollback: bool) -> SagaConfig {
    SagaConfig {
        enable_rollback,
        retry: RetryPolicy::new(3, Duration::from_millis(1)),
        rollback_timeout: Duration::from_secs(5),
    }
}

/// Step that succeeds after `failures` failed attempts and logs every call.
pub struct TrackedStep {
    pub name: &'static str,
    pub operation_type: OperationType,
    pub failures: u32,
    pub fail_compensation: bool,
    pub attempts: AtomicU32,
}

impl TrackedStep {
    pub fn ok(name: &'static str, operation_type: OperationType) -> Self {
        Self {
            name,
            operation_type,
            failures: 0,
            fail_compensation: false,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn failing(name: &'static str, operation_type: OperationType) -> Self {
        Self {
            failures: u32::MAX,
            ..Self::ok(name, operation_type)
        }
    }

    pub fn flaky(name: &'static str, operation_type: OperationType, failures: u32) -> Self {
        Self {
            failures,
            ..Self::ok(name, operation_type)
        }
    }

    pub fn with_failing_compensation(mut self) -> Self {
        self.fail_compensation = true;
        self
    }
}

impl Compensate<TestContext, TestError> for TrackedStep {
    fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn compensate(
        &self,
        ctx: &TestContext,
        _cancellation: &Cancellation,
        _metadata: &RunMetadata,
        data: &RollbackData,
    ) -> Result<(), TestError> {
        if self.fail_compensation {
            ctx.push(format!("failed to compensate {}", self.name));
            return Err(TestError::Failed(format!("cannot undo {}", self.name)));
        }
        let RollbackData::Version { version } = data else {
            return Err(TestError::Failed(format!("unexpected data {data:?}")));
        };
        ctx.push(format!("compensate {} ({version})", self.name));
        Ok(())
    }
}

impl SagaStep<TestContext, TestError> for TrackedStep {
    fn execute(
        &self,
        ctx: &TestContext,
        _cancellation: &Cancellation,
        _metadata: &mut RunMetadata,
    ) -> Result<RollbackData, TestError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        ctx.push(format!("execute {} attempt {attempt}", self.name));
        if attempt <= self.failures {
            return Err(TestError::Failed(format!("{} exploded", self.name)));
        }
        Ok(RollbackData::Version {
            version: self.name.to_string(),
        })
    }
}

/// In-memory repository that can be told to reject saves.
#[derive(Default)]
pub struct MemoryRepository {
    states: Mutex<HashMap<String, RollbackState>>,
    latest: Mutex<Option<String>>,
    saves: AtomicU32,
    accept_saves: Option<u32>,
}

impl MemoryRepository {
    /// Accepts the first `count` saves and rejects every later one.
    pub fn accepting(count: u32) -> Self {
        Self {
            accept_saves: Some(count),
            ..Self::default()
        }
    }

    pub fn save_count(&self) -> u32 {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn stored(&self, session_id: &str) -> Option<RollbackState> {
        self.states
            .lock()
            .expect("lock poisoned")
            .get(session_id)
            .cloned()
    }
}

impl StateRepository for MemoryRepository {
    fn save(&self, _cancellation: &Cancellation, state: &RollbackState) -> Result<(), StoreError> {
        let count = self.saves.fetch_add(1, Ordering::SeqCst);
        if self.accept_saves.is_some_and(|limit| count >= limit) {
            return Err(StoreError::Io {
                path: "memory".into(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.states
            .lock()
            .expect("lock poisoned")
            .insert(state.session_id().to_string(), state.clone());
        *self.latest.lock().expect("lock poisoned") = Some(state.session_id().to_string());
        Ok(())
    }

    fn load(&self, _cancellation: &Cancellation, session_id: &str) -> Result<RollbackState, StoreError> {
        self.stored(session_id).ok_or_else(|| StoreError::NotFound {
            session_id: session_id.to_string(),
        })
    }

    fn load_latest(&self, cancellation: &Cancellation) -> Result<RollbackState, StoreError> {
        let latest = self.latest.lock().expect("lock poisoned").clone();
        match latest {
            Some(session_id) => self.load(cancellation, &session_id),
            None => Err(StoreError::NoLatestState {
                dir: "memory".into(),
            }),
        }
    }

    fn delete(&self, _cancellation: &Cancellation, session_id: &str) -> Result<(), StoreError> {
        self.states.lock().expect("lock poisoned").remove(session_id);
        Ok(())
    }

    fn exists(&self, session_id: &str) -> Result<bool, StoreError> {
        Ok(self.stored(session_id).is_some())
    }
}
