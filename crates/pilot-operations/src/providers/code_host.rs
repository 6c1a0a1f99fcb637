use std::path::Path;
use std::process::Command;
use std::time::Duration;

use pilot_core::Cancellation;
use serde::Deserialize;
use tracing::{debug, info};

use super::command;
use crate::traits::{CodeHost, PullRequest, PullRequestState};
use crate::{OperationError, Result};

const DEFAULT_PROGRAM: &str = "gh";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// [`CodeHost`] for GitHub, driving the `gh` command line tool.
///
/// The repository is the one `gh` infers from the project's git remote.
#[derive(Debug, Clone)]
pub struct GhCliCodeHost {
    program: String,
    token: Option<String>,
    timeout: Duration,
    cancellation: Cancellation,
}

#[derive(Deserialize)]
struct PrListEntry {
    number: u64,
}

#[derive(Deserialize)]
struct PrView {
    state: String,
}

impl GhCliCodeHost {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            token,
            timeout: DEFAULT_TIMEOUT,
            cancellation: Cancellation::new(),
        }
    }

    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Scope that stops a running command when interrupted.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    fn gh(&self, project_root: &Path, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(project_root).args(args);
        if let Some(token) = &self.token {
            cmd.env("GH_TOKEN", token);
        }
        command::run(&mut cmd, &self.program, self.timeout, &self.cancellation)
    }

    fn find_open_pr(&self, project_root: &Path, head: &str, base: &str) -> Result<Option<u64>> {
        let output = self.gh(
            project_root,
            &[
                "pr", "list", "--head", head, "--base", base, "--state", "open", "--json",
                "number", "--limit", "1",
            ],
        )?;
        let entries: Vec<PrListEntry> =
            serde_json::from_str(&output).map_err(|_| self.unexpected(&output))?;
        Ok(entries.first().map(|entry| entry.number))
    }

    fn unexpected(&self, output: &str) -> OperationError {
        OperationError::UnexpectedOutput {
            program: self.program.clone(),
            output: output.trim().to_string(),
        }
    }
}

impl CodeHost for GhCliCodeHost {
    fn create_or_update_pr(&self, project_root: &Path, pr: &PullRequest<'_>) -> Result<u64> {
        let labels = pr.labels.join(",");

        if let Some(number) = self.find_open_pr(project_root, pr.head, pr.base)? {
            let number_arg = number.to_string();
            let mut args = vec![
                "pr", "edit", number_arg.as_str(), "--title", pr.title, "--body", pr.body,
            ];
            if !labels.is_empty() {
                args.extend(["--add-label", labels.as_str()]);
            }
            self.gh(project_root, &args)?;
            info!(number, head = pr.head, "updated existing pull request");
            return Ok(number);
        }

        let mut args = vec![
            "pr", "create", "--head", pr.head, "--base", pr.base, "--title", pr.title, "--body",
            pr.body,
        ];
        if !labels.is_empty() {
            args.extend(["--label", labels.as_str()]);
        }
        let output = self.gh(project_root, &args)?;
        let number = parse_pr_number(&output).ok_or_else(|| self.unexpected(&output))?;
        info!(number, head = pr.head, "created pull request");
        Ok(number)
    }

    fn add_comment(&self, project_root: &Path, number: u64, body: &str) -> Result<()> {
        self.gh(
            project_root,
            &["pr", "comment", number.to_string().as_str(), "--body", body],
        )?;
        Ok(())
    }

    fn close_pr(&self, project_root: &Path, number: u64) -> Result<()> {
        match self.gh(project_root, &["pr", "close", number.to_string().as_str()]) {
            Ok(_) => Ok(()),
            Err(OperationError::CommandFailed { stderr, .. })
                if stderr.contains("already closed") =>
            {
                Err(OperationError::PullRequestAlreadyClosed { number })
            }
            Err(error) => Err(error),
        }
    }

    fn pr_state(&self, project_root: &Path, number: u64) -> Result<Option<PullRequestState>> {
        let output = match self.gh(
            project_root,
            &["pr", "view", number.to_string().as_str(), "--json", "state"],
        ) {
            Ok(output) => output,
            Err(OperationError::CommandFailed { stderr, .. }) if is_missing_pr(&stderr) => {
                debug!(number, "pull request not found");
                return Ok(None);
            }
            Err(error) => return Err(error),
        };
        let view: PrView = serde_json::from_str(&output).map_err(|_| self.unexpected(&output))?;
        parse_state(&view.state)
            .map(Some)
            .ok_or_else(|| self.unexpected(&output))
    }
}

/// `gh pr create` prints the URL of the new pull request last.
fn parse_pr_number(output: &str) -> Option<u64> {
    let url = output.lines().rev().find(|line| !line.trim().is_empty())?;
    url.trim().trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

fn parse_state(state: &str) -> Option<PullRequestState> {
    match state.to_ascii_uppercase().as_str() {
        "OPEN" => Some(PullRequestState::Open),
        "CLOSED" => Some(PullRequestState::Closed),
        "MERGED" => Some(PullRequestState::Merged),
        _ => None,
    }
}

fn is_missing_pr(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("could not resolve to a pullrequest")
        || stderr.contains("no pull requests found")
        || stderr.contains("not found")
}

/// A [`CodeHost`] that only logs. Used when pull requests are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCodeHost;

impl CodeHost for NoopCodeHost {
    fn create_or_update_pr(&self, _project_root: &Path, pr: &PullRequest<'_>) -> Result<u64> {
        info!(head = pr.head, base = pr.base, title = pr.title, "skipping pull request");
        Ok(0)
    }

    fn add_comment(&self, _project_root: &Path, number: u64, _body: &str) -> Result<()> {
        debug!(number, "skipping pull request comment");
        Ok(())
    }

    fn close_pr(&self, _project_root: &Path, number: u64) -> Result<()> {
        debug!(number, "skipping pull request close");
        Ok(())
    }

    fn pr_state(&self, _project_root: &Path, _number: u64) -> Result<Option<PullRequestState>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pr_number_from_create_output() {
        assert_eq!(
            parse_pr_number("https://github.com/owner/repo/pull/42\n"),
            Some(42)
        );
        assert_eq!(
            parse_pr_number("Creating pull request for release/v1.0.0\n\nhttps://github.com/o/r/pull/7\n"),
            Some(7)
        );
        assert_eq!(parse_pr_number("something went sideways"), None);
        assert_eq!(parse_pr_number(""), None);
    }

    #[test]
    fn states_are_case_insensitive() {
        assert_eq!(parse_state("OPEN"), Some(PullRequestState::Open));
        assert_eq!(parse_state("closed"), Some(PullRequestState::Closed));
        assert_eq!(parse_state("MERGED"), Some(PullRequestState::Merged));
        assert_eq!(parse_state("DRAFT"), None);
    }

    #[test]
    fn missing_pr_messages() {
        assert!(is_missing_pr(
            "GraphQL: Could not resolve to a PullRequest with the number of 99999. (repository.pullRequest)"
        ));
        assert!(is_missing_pr("no pull requests found for branch \"x\""));
        assert!(!is_missing_pr("HTTP 401: Bad credentials"));
    }

    #[test]
    fn list_output_parses() {
        let entries: Vec<PrListEntry> =
            serde_json::from_str(r#"[{"number":12}]"#).expect("valid json");
        assert_eq!(entries.first().map(|e| e.number), Some(12));
    }

    #[test]
    fn noop_host_reports_nothing() {
        let host = NoopCodeHost;
        let labels = vec!["automated".to_string()];
        let pr = PullRequest {
            head: "release/v1.0.0",
            base: "main",
            title: "ci(release): Release v1.0.0",
            body: "## Release v1.0.0",
            labels: &labels,
        };

        assert_eq!(host.create_or_update_pr(Path::new("."), &pr).expect("noop"), 0);
        assert_eq!(host.pr_state(Path::new("."), 1).expect("noop"), None);
    }
}
