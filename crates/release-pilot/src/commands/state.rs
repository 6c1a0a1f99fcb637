use std::path::Path;

use pilot_core::Cancellation;
use pilot_operations::config::PilotConfig;
use pilot_store::{JsonStateRepository, StateRepository, StoreError};

use super::StateCommand;
use crate::error::Result;
use crate::output;

pub(crate) fn run(command: StateCommand, project_root: &Path) -> Result<()> {
    let config = PilotConfig::load(project_root)?;
    let repository = JsonStateRepository::new(config.store_config(project_root));
    let cancellation = Cancellation::new();

    match command {
        StateCommand::Show { session_id } => {
            let state = match session_id {
                Some(id) => repository.load(&cancellation, &id)?,
                None => repository.load_latest(&cancellation)?,
            };
            print!("{}", output::format_state(&state));
        }
        StateCommand::Delete { session_id } => {
            if !repository.exists(&session_id)? {
                return Err(StoreError::NotFound { session_id }.into());
            }
            repository.delete(&cancellation, &session_id)?;
            println!("Deleted session {session_id}");
        }
    }
    Ok(())
}
