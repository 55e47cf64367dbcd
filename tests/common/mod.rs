// Shared helpers for integration tests.
//
// Builds an isolated source tree, a bare "remote" repository, and a
// destination clone of it, all inside temporary directories, using the real
// `git` binary.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use repo_mirror::config::SyncConfig;
use repo_mirror::exec::SystemExecutor;
use repo_mirror::publish::GitClient;

/// Whether the `git` executable is available; tests return early without it.
pub fn git_available() -> bool {
    which::which("git").is_ok()
}

/// Run `git` in `dir` and return trimmed stdout, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Give a working copy a local identity and disable signing.
fn configure_identity(dir: &Path) {
    git(dir, &["config", "user.name", "Sync Test"]);
    git(dir, &["config", "user.email", "sync-test@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

/// Write `content` to `root/rel`, creating parent directories.
pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
    std::fs::write(path, content).expect("write file");
}

/// A source tree, a bare remote on `main`, a destination clone, and a second
/// clone ("upstream") that plays another contributor.
pub struct SyncFixture {
    root: tempfile::TempDir,
}

impl SyncFixture {
    /// Create the repositories; the remote starts with one commit holding
    /// `README.md`.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        let base = root.path();
        std::fs::create_dir_all(base.join("source")).expect("create source");

        git(base, &["init", "--bare", "--initial-branch=main", "remote.git"]);
        git(base, &["clone", "--quiet", "remote.git", "upstream"]);
        let upstream = base.join("upstream");
        configure_identity(&upstream);
        git(&upstream, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        write(&upstream, "README.md", "# project\n");
        git(&upstream, &["add", "-A"]);
        git(&upstream, &["commit", "--quiet", "-m", "initial"]);
        git(&upstream, &["push", "--quiet", "origin", "main"]);

        git(base, &["clone", "--quiet", "remote.git", "destination"]);
        configure_identity(&base.join("destination"));

        Self { root }
    }

    pub fn source(&self) -> PathBuf {
        self.root.path().join("source")
    }

    pub fn destination(&self) -> PathBuf {
        self.root.path().join("destination")
    }

    pub fn remote(&self) -> PathBuf {
        self.root.path().join("remote.git")
    }

    pub fn upstream(&self) -> PathBuf {
        self.root.path().join("upstream")
    }

    /// Validated config mirroring `source` into `destination`.
    pub fn config(&self) -> SyncConfig {
        SyncConfig::new(self.source(), self.destination())
            .validate()
            .expect("valid config")
    }

    /// A git client for the destination using the real `git` binary.
    pub fn git_client(&self, config: &SyncConfig) -> GitClient {
        GitClient::open(config, Arc::new(SystemExecutor)).expect("open destination")
    }

    /// Commit `content` at `rel` from the other contributor's clone and push it.
    pub fn push_upstream_change(&self, rel: &str, content: &str, message: &str) {
        let upstream = self.upstream();
        git(&upstream, &["pull", "--quiet", "--rebase", "origin", "main"]);
        write(&upstream, rel, content);
        git(&upstream, &["add", "-A"]);
        git(&upstream, &["commit", "--quiet", "-m", message]);
        git(&upstream, &["push", "--quiet", "origin", "main"]);
    }

    /// File names in the remote's `main` tree (top level only).
    pub fn remote_files(&self) -> Vec<String> {
        let listing = git(&self.remote(), &["ls-tree", "--name-only", "main"]);
        listing.lines().map(str::to_string).collect()
    }

    /// Number of commits on the remote's `main`.
    pub fn remote_commit_count(&self) -> usize {
        git(&self.remote(), &["rev-list", "--count", "main"])
            .parse()
            .expect("commit count")
    }

    /// Subject of the remote's `main` tip.
    pub fn remote_head_subject(&self) -> String {
        git(&self.remote(), &["log", "-1", "--format=%s", "main"])
    }
}
