use std::path::Path;
use std::sync::Arc;

use pilot_core::Cancellation;
use pilot_git::RemoteAuth;
use pilot_operations::config::PilotConfig;
use pilot_operations::operations::release::{ReleaseInput, ReleaseOperation};
use pilot_operations::providers::{
    FileSystemManifestUpdater, GhCliCodeHost, Git2VersionControl, GitCliffChangelog, NoopCodeHost,
};
use pilot_operations::traits::CodeHost;
use pilot_operations::validation::require_env;
use pilot_store::{JsonStateRepository, StateRepository};

use super::PrReleaseArgs;
use crate::error::Result;
use crate::output;

const TOKEN_VAR: &str = "GITHUB_TOKEN";

type Operation<H> =
    ReleaseOperation<Git2VersionControl, H, GitCliffChangelog, FileSystemManifestUpdater>;

pub(crate) fn run(
    args: &PrReleaseArgs,
    project_root: &Path,
    cancellation: &Cancellation,
) -> Result<()> {
    let config = PilotConfig::load(project_root)?;
    let repository: Arc<dyn StateRepository> =
        Arc::new(JsonStateRepository::new(config.store_config(project_root)));
    let token = std::env::var(TOKEN_VAR).ok().filter(|token| !token.is_empty());

    if args.rollback {
        let code_host = GhCliCodeHost::new(token.clone()).with_cancellation(cancellation.clone());
        let operation = build(project_root, code_host, token, repository, config, cancellation);
        let output = operation.rollback(args.session_id.as_deref())?;
        output::print_rollback(&output);
        return Ok(());
    }

    let input = ReleaseInput {
        force: args.force,
        dry_run: args.dry_run,
        skip_pr: args.skip_pr,
        enable_rollback: args.enable_rollback,
    };

    let output = if args.dry_run || args.skip_pr {
        build(project_root, NoopCodeHost, token, repository, config, cancellation)
            .execute(&input)?
    } else {
        require_env(&[TOKEN_VAR], |name| std::env::var(name).ok())?;
        let code_host = GhCliCodeHost::new(token.clone()).with_cancellation(cancellation.clone());
        build(project_root, code_host, token, repository, config, cancellation).execute(&input)?
    };

    if args.ci_output {
        print!("{}", output::ci_lines(&output));
    } else {
        output::print_release(&output, args.dry_run);
    }
    Ok(())
}

fn build<H: CodeHost + 'static>(
    project_root: &Path,
    code_host: H,
    token: Option<String>,
    repository: Arc<dyn StateRepository>,
    config: PilotConfig,
    cancellation: &Cancellation,
) -> Operation<H> {
    let vcs = token.map_or_else(Git2VersionControl::new, |token| {
        Git2VersionControl::with_auth(RemoteAuth::token(token))
    });

    ReleaseOperation::new(
        project_root.to_path_buf(),
        vcs,
        code_host,
        GitCliffChangelog::new().with_cancellation(cancellation.clone()),
        FileSystemManifestUpdater::new(),
        repository,
        config,
    )
    .with_cancellation(cancellation.clone())
}
