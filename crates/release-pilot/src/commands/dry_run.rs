use std::path::Path;

use pilot_core::Cancellation;
use pilot_operations::config::PilotConfig;
use pilot_operations::operations::dry_run::{CiEnvironment, DryRunOperation};
use pilot_operations::providers::{
    GhCliCodeHost, Git2VersionControl, GitCliffChangelog, GoReleaserSnapshot,
};

use super::DryRunArgs;
use crate::error::Result;
use crate::output;

const TOKEN_VAR: &str = "GITHUB_TOKEN";

pub(crate) fn run(
    args: &DryRunArgs,
    project_root: &Path,
    cancellation: &Cancellation,
) -> Result<()> {
    let config = PilotConfig::load(project_root)?;
    let token = std::env::var(TOKEN_VAR).ok().filter(|token| !token.is_empty());
    let ci = CiEnvironment::from_lookup(|name| std::env::var(name).ok());

    let operation = DryRunOperation::new(
        project_root.to_path_buf(),
        Git2VersionControl::new(),
        GhCliCodeHost::new(token).with_cancellation(cancellation.clone()),
        GitCliffChangelog::new().with_cancellation(cancellation.clone()),
        GoReleaserSnapshot::new().with_cancellation(cancellation.clone()),
        config,
    )
    .with_cancellation(cancellation.clone());
    let output = operation.execute(&ci)?;

    if args.ci_output {
        print!("{}", output::dry_run_ci_lines(&output));
    } else {
        output::print_dry_run(&output);
    }
    Ok(())
}
