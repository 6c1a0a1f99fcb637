use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn git(dir: &TempDir, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir.path())
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// A repository on `main` whose only commit is tagged `v1.0.0`.
pub fn create_released_project() -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");

    git(&dir, &["init", "--initial-branch=main"]);
    git(&dir, &["config", "user.email", "test@example.com"]);
    git(&dir, &["config", "user.name", "Test"]);

    fs::write(
        dir.path().join("package.json"),
        "{\n  \"name\": \"demo\",\n  \"version\": \"1.0.0\"\n}\n",
    )
    .expect("failed to write package.json");

    git(&dir, &["add", "-A"]);
    git(&dir, &["commit", "-m", "chore: initial commit"]);
    git(&dir, &["tag", "-a", "v1.0.0", "-m", "v1.0.0"]);

    dir
}

pub fn release_pilot() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("release-pilot");
    cmd.env_remove("GITHUB_TOKEN").env_remove("RUST_LOG");
    cmd
}
