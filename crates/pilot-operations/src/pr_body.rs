//! Pull request body rendering.
//!
//! The changelog comes from commit messages, so it is HTML-escaped before
//! being embedded. Markdown that escaping would break (blockquotes, and
//! quotes or ampersands in headings and list items) is restored line by
//! line afterwards.

use crate::{OperationError, Result};

const FORBIDDEN: [&str; 2] = ["<script", "javascript:"];
const TEMPLATE_MARKERS: [&str; 2] = ["{{", "}}"];

/// Renders the body of the release pull request for `version`.
///
/// # Errors
///
/// Returns [`OperationError::UnsafePrBody`] if the rendered body still
/// contains script or template markers.
pub fn render_pr_body(version: &str, changelog: &str) -> Result<String> {
    let version = escape_html(version);
    let changelog = restore_markdown(&escape_html(changelog));
    let body = format!(
        "\n## Release {version}\n\nThis PR prepares the release of version {version}.\n\n### Changelog\n\n{changelog}\n"
    );
    check_body(&body)?;
    Ok(body)
}

/// Renders the comment posted on a release pull request after a successful
/// dry run. `platforms` lists the built `os/arch` pairs.
///
/// # Errors
///
/// Returns [`OperationError::UnsafePrBody`] if the rendered comment contains
/// script or template markers.
pub fn render_dry_run_comment(
    version: &str,
    commit: &str,
    platforms: &[String],
) -> Result<String> {
    let artifacts = if platforms.is_empty() {
        "Not available.".to_string()
    } else {
        platforms
            .iter()
            .map(|platform| format!("- {}", escape_html(platform)))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let body = format!(
        "## ✅ Dry-Run Completed Successfully\n\n\
         ### 📊 Build Summary\n\
         - **Version**: {}\n\
         - **Commit**: {}\n\n\
         ### 📦 Built Artifacts\n\
         {artifacts}\n\n\
         ---\n\
         *This is an automated comment from the release dry-run check.*\n",
        escape_html(version),
        escape_html(commit),
    );
    check_body(&body)?;
    Ok(body)
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn restore_markdown(escaped: &str) -> String {
    escaped
        .split('\n')
        .map(|line| {
            let line = match line.strip_prefix("&gt; ") {
                Some(rest) => format!("> {rest}"),
                None => line.to_string(),
            };
            if is_heading(&line) || is_list_item(&line) {
                line.replace("&#34;", "\"")
                    .replace("&#39;", "'")
                    .replace("&amp;", "&")
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_heading(line: &str) -> bool {
    line.starts_with('#')
}

fn is_list_item(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("- ") || trimmed.starts_with("* ")
}

fn check_body(body: &str) -> Result<()> {
    let lower = body.to_lowercase();
    if let Some(pattern) = FORBIDDEN.into_iter().find(|p| lower.contains(p)) {
        return Err(OperationError::UnsafePrBody { pattern });
    }
    if let Some(pattern) = TEMPLATE_MARKERS.into_iter().find(|p| body.contains(p)) {
        return Err(OperationError::UnsafePrBody { pattern });
    }
    Ok(())
}
