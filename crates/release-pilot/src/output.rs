use pilot_core::{RollbackData, RollbackState};
use pilot_operations::operations::dry_run::{CommentOutcome, DryRunOutput};
use pilot_operations::operations::release::{ReleaseOutput, RollbackOutput};

/// `key=value` lines for CI steps to export.
pub(crate) fn ci_lines(output: &ReleaseOutput) -> String {
    format!(
        "has_changes={}\nlatest_tag={}\nversion={}\nsession_id={}\n",
        output.has_changes,
        output.latest_tag.as_deref().unwrap_or_default(),
        output.version.as_deref().unwrap_or_default(),
        output.session_id,
    )
}

pub(crate) fn dry_run_ci_lines(output: &DryRunOutput) -> String {
    let commented = output
        .comment
        .pr_number()
        .map(|number| number.to_string())
        .unwrap_or_default();
    format!("version={}\ncommented_pr={commented}\n", output.version)
}

pub(crate) fn print_dry_run(output: &DryRunOutput) {
    print!("{}", format_dry_run(output));
}

pub(crate) fn print_release(output: &ReleaseOutput, dry_run: bool) {
    print!("{}", format_release(output, dry_run));
}

pub(crate) fn print_rollback(output: &RollbackOutput) {
    println!("Rolled back session {}.", output.session_id);
    if !output.audit.is_empty() {
        println!("\n{}", output.audit);
    }
}

fn format_release(output: &ReleaseOutput, dry_run: bool) -> String {
    let mut text = String::new();
    if dry_run {
        text.push_str("Dry run - nothing was committed or pushed.\n\n");
    }

    let Some(version) = output.version.as_deref() else {
        match output.latest_tag.as_deref() {
            Some(tag) => {
                text.push_str(&format!("No changes since {tag}; nothing to release.\n"));
            }
            None => text.push_str("Nothing to release.\n"),
        }
        return text;
    };

    text.push_str(&format!("Prepared release {version}\n"));
    if let Some(branch) = output.branch_name.as_deref() {
        text.push_str(&format!("  branch: {branch}\n"));
    }
    if let Some(sha) = output.commit_sha.as_deref() {
        text.push_str(&format!("  commit: {sha}\n"));
    }
    if output.pushed {
        text.push_str("  pushed: yes\n");
    }
    if let Some(number) = output.pr_number {
        text.push_str(&format!("  pull request: #{number}\n"));
    }
    text.push_str(&format!("  session: {}\n", output.session_id));

    if !output.audit.is_empty() {
        text.push_str(&format!("\n{}\n", output.audit));
    }
    text
}

fn format_dry_run(output: &DryRunOutput) -> String {
    let mut text = format!(
        "Dry run completed for version {} (branch {}).\n",
        output.version, output.branch
    );
    match output.comment {
        CommentOutcome::Posted { number } => {
            text.push_str(&format!("Commented on pull request #{number}.\n"));
        }
        CommentOutcome::NoPullRequest => text.push_str("No pull request to comment on.\n"),
        CommentOutcome::NotInCi => text.push_str("Review required.\n"),
    }
    text
}

pub(crate) fn format_state(state: &RollbackState) -> String {
    let mut text = String::new();
    let metadata = state.metadata();

    text.push_str(&format!("Session: {}\n", state.session_id()));
    text.push_str(&format!("Status: {}\n", state.status()));
    text.push_str(&format!("Started: {}\n", state.started_at().to_rfc3339()));
    text.push_str(&format!("Updated: {}\n", state.updated_at().to_rfc3339()));
    for (label, value) in [
        ("Version", &metadata.version),
        ("Branch", &metadata.branch_name),
        ("Original branch", &metadata.original_branch),
    ] {
        if let Some(value) = value {
            text.push_str(&format!("{label}: {value}\n"));
        }
    }
    if let Some(error) = state.error() {
        text.push_str(&format!("Error: {error}\n"));
    }

    text.push_str("\nOperations:\n");
    for record in state.operations() {
        let status = record.status().to_string();
        text.push_str(&format!("  {status:<10} {}", record.operation_type()));
        if let Some(RollbackData::Skipped { reason }) = record.rollback_data() {
            text.push_str(&format!(" (skipped: {reason})"));
        }
        if let Some(error) = record.error() {
            text.push_str(&format!(" ({error})"));
        }
        text.push('\n');
    }
    text
}
