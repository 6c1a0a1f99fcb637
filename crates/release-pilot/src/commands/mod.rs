mod dry_run;
mod pr_release;
mod state;

use std::path::Path;

use clap::{Args, Subcommand};
use pilot_core::Cancellation;

use crate::error::Result;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Prepare a release branch and open its pull request
    PrRelease(PrReleaseArgs),
    /// Validate a release pull request before merging
    DryRun(DryRunArgs),
    /// Inspect or delete saved release sessions
    State {
        #[command(subcommand)]
        command: StateCommand,
    },
}

#[derive(Args)]
pub(crate) struct PrReleaseArgs {
    /// Release even if nothing changed since the latest tag
    #[arg(long)]
    pub force: bool,

    /// Prepare the release locally; nothing is committed or pushed
    #[arg(long)]
    pub dry_run: bool,

    /// Print `key=value` lines for CI instead of a summary
    #[arg(long)]
    pub ci_output: bool,

    /// Do not create a pull request
    #[arg(long)]
    pub skip_pr: bool,

    /// Save progress and undo completed steps if a step fails
    #[arg(long, conflicts_with = "rollback")]
    pub enable_rollback: bool,

    /// Undo a saved release session instead of releasing
    #[arg(long)]
    pub rollback: bool,

    /// Session to roll back (default: the most recent one)
    #[arg(long, requires = "rollback")]
    pub session_id: Option<String>,
}

#[derive(Args)]
pub(crate) struct DryRunArgs {
    /// Print `key=value` lines for CI instead of a summary
    #[arg(long)]
    pub ci_output: bool,
}

#[derive(Subcommand)]
pub(crate) enum StateCommand {
    /// Show a saved session (default: the most recent one)
    Show {
        #[arg(long)]
        session_id: Option<String>,
    },
    /// Delete a saved session
    Delete {
        #[arg(long)]
        session_id: String,
    },
}

impl Commands {
    pub(crate) fn execute(self, project_root: &Path) -> Result<()> {
        let cancellation = Cancellation::new();
        match self {
            Self::PrRelease(args) => pr_release::run(&args, project_root, &cancellation),
            Self::DryRun(args) => dry_run::run(&args, project_root, &cancellation),
            Self::State { command } => state::run(command, project_root),
        }
    }
}
