pub mod compensation;
pub mod config;
mod error;
pub mod operations;
pub mod pr_body;
pub mod providers;
pub mod traits;
pub mod validation;

#[cfg(test)]
pub mod mocks;

pub use error::{CompensationFailure, OperationError, Result};
