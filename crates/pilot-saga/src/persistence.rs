use std::sync::Arc;

use pilot_core::{Cancellation, RollbackState};
use pilot_store::{StateRepository, StoreError};
use tracing::warn;

/// Writes snapshots of the workflow state when persistence is enabled.
pub(crate) struct Persistence {
    repository: Arc<dyn StateRepository>,
    enabled: bool,
}

impl Persistence {
    pub(crate) fn new(repository: Arc<dyn StateRepository>, enabled: bool) -> Self {
        Self {
            repository,
            enabled,
        }
    }

    pub(crate) fn save(
        &self,
        cancellation: &Cancellation,
        state: &RollbackState,
    ) -> Result<(), StoreError> {
        if !self.enabled {
            return Ok(());
        }
        self.repository.save(cancellation, state)
    }

    /// Saves progress without letting a storage failure stop the workflow.
    pub(crate) fn save_best_effort(&self, cancellation: &Cancellation, state: &RollbackState) {
        if let Err(error) = self.save(cancellation, state) {
            warn!(
                session_id = state.session_id(),
                status = %state.status(),
                %error,
                "failed to persist workflow state"
            );
        }
    }
}
