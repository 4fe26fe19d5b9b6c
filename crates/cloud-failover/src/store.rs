//! Persistence of the shared task state record.

use crate::provider::CloudProvider;
use crate::types::{STATE_FILE_NAME, TaskState};
use common::{Error, Result};
use std::sync::Arc;
use tracing::debug;

/// Reads and replaces the task state through the provider's storage backend.
///
/// Nothing is cached: every read goes to storage, which is the arbiter of the
/// current value across nodes.
pub struct TaskStateStore {
    provider: Arc<dyn CloudProvider>,
    key: String,
}

impl TaskStateStore {
    pub fn new(provider: Arc<dyn CloudProvider>) -> Self {
        Self::with_key(provider, STATE_FILE_NAME)
    }

    pub fn with_key(provider: Arc<dyn CloudProvider>, key: impl Into<String>) -> Self {
        Self {
            provider,
            key: key.into(),
        }
    }

    /// Current task state, or a PASS record when storage holds none
    pub async fn load(&self) -> Result<TaskState> {
        let stored = self
            .provider
            .download_data_from_storage(&self.key)
            .await
            .map_err(into_storage_error)?;

        let mut state = match stored {
            Some(state) => state,
            None => {
                debug!(key = %self.key, "No task state stored, starting from PASS");
                TaskState::initial()
            }
        };
        if state.code == 0 {
            state.code = state.task_state.code();
        }
        Ok(state)
    }

    /// Replace the stored record with `state`
    pub async fn save(&self, state: &TaskState) -> Result<()> {
        debug!(
            key = %self.key,
            task_state = %state.task_state,
            instance = ?state.instance,
            "Writing task state"
        );
        self.provider
            .upload_data_to_storage(&self.key, state)
            .await
            .map_err(into_storage_error)
    }
}

fn into_storage_error(err: Error) -> Error {
    match err {
        Error::Storage(_) => err,
        other => Error::storage(other),
    }
}
