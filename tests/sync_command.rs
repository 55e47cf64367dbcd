#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! End-to-end tests for the `sync` pipeline against real git repositories.
//!
//! Each test mirrors a source tree into a clone of a local bare repository
//! and checks what reached the remote.

mod common;

use common::{SyncFixture, git, git_available, write};
use repo_mirror::commands::sync::execute;
use repo_mirror::error::{PublishError, SyncError};
use repo_mirror::logging::Logger;
use repo_mirror::mirror::MirrorOptions;
use repo_mirror::publish::PublishOutcome;

fn logger() -> Logger {
    Logger::with_log_file(None)
}

// ---------------------------------------------------------------------------
// Mirror and publish
// ---------------------------------------------------------------------------

/// Excluded files never reach the remote; everything else does.
#[test]
fn excluded_file_is_not_published() {
    if !git_available() {
        return;
    }
    let fx = SyncFixture::new();
    write(&fx.source(), "a.txt", "alpha\n");
    write(&fx.source(), ".env", "TOKEN=secret\n");
    write(&fx.source(), "__pycache__/a.cpython-312.pyc", "bytecode");

    let config = fx.config();
    let git_client = fx.git_client(&config);
    let outcome = execute(&config, &git_client, &MirrorOptions::default(), &logger()).unwrap();

    assert!(matches!(outcome, Some(PublishOutcome::Committed)));
    assert_eq!(fx.remote_files(), vec!["a.txt".to_string()]);
    assert_eq!(fx.remote_head_subject(), "Sync from working directory");
}

/// A second run with an unchanged source commits nothing.
#[test]
fn unchanged_source_is_a_no_op_publish() {
    if !git_available() {
        return;
    }
    let fx = SyncFixture::new();
    write(&fx.source(), "a.txt", "alpha\n");
    let config = fx.config();
    let git_client = fx.git_client(&config);

    execute(&config, &git_client, &MirrorOptions::default(), &logger()).unwrap();
    let commits = fx.remote_commit_count();

    let outcome = execute(&config, &git_client, &MirrorOptions::default(), &logger()).unwrap();
    assert!(matches!(outcome, Some(PublishOutcome::NoChanges)));
    assert_eq!(fx.remote_commit_count(), commits);
}

/// A source identical to a fresh clone commits nothing and rewrites nothing.
#[test]
fn source_matching_fresh_clone_is_a_no_op() {
    if !git_available() {
        return;
    }
    let fx = SyncFixture::new();
    write(&fx.source(), "README.md", "# project\n");
    let config = fx.config();
    let git_client = fx.git_client(&config);

    let outcome = execute(&config, &git_client, &MirrorOptions::default(), &logger()).unwrap();
    assert!(matches!(outcome, Some(PublishOutcome::NoChanges)));
    assert_eq!(fx.remote_commit_count(), 1);
    assert_eq!(git(&fx.destination(), &["status", "--porcelain"]), "");
}

/// Files removed from the source are removed from the remote.
#[test]
fn deletions_are_published() {
    if !git_available() {
        return;
    }
    let fx = SyncFixture::new();
    write(&fx.source(), "keep.txt", "k");
    write(&fx.source(), "drop.txt", "d");
    let config = fx.config();
    let git_client = fx.git_client(&config);
    execute(&config, &git_client, &MirrorOptions::default(), &logger()).unwrap();

    std::fs::remove_file(fx.source().join("drop.txt")).unwrap();
    execute(&config, &git_client, &MirrorOptions::default(), &logger()).unwrap();

    assert_eq!(fx.remote_files(), vec!["keep.txt".to_string()]);
}

/// An excluded file committed to the remote by someone else is purged.
#[test]
fn tracked_excluded_file_is_purged() {
    if !git_available() {
        return;
    }
    let fx = SyncFixture::new();
    fx.push_upstream_change("bot_state.db", "state", "oops, commit the db");
    git(&fx.destination(), &["pull", "--quiet", "--rebase", "origin", "main"]);
    write(&fx.source(), "bot.py", "print('run')\n");

    let config = fx.config();
    let git_client = fx.git_client(&config);
    execute(&config, &git_client, &MirrorOptions::default(), &logger()).unwrap();

    assert!(!fx.remote_files().contains(&"bot_state.db".to_string()));
    assert!(!fx.destination().join("bot_state.db").exists());
}

// ---------------------------------------------------------------------------
// Upstream integration
// ---------------------------------------------------------------------------

/// The local commit is replayed on top of a newer remote commit, then pushed.
#[test]
fn remote_ahead_is_rebased_then_pushed() {
    if !git_available() {
        return;
    }
    let fx = SyncFixture::new();
    fx.push_upstream_change("other.txt", "from upstream\n", "upstream work");
    write(&fx.source(), "a.txt", "alpha\n");

    let config = fx.config();
    let git_client = fx.git_client(&config);
    let outcome = execute(&config, &git_client, &MirrorOptions::default(), &logger()).unwrap();

    assert!(matches!(outcome, Some(PublishOutcome::Committed)));
    assert_eq!(fx.remote_head_subject(), "Sync from working directory");
    let parent_subject = git(&fx.remote(), &["log", "-1", "--format=%s", "main~1"]);
    assert_eq!(parent_subject, "upstream work");
    let files = fx.remote_files();
    assert!(files.contains(&"a.txt".to_string()));
    assert!(files.contains(&"other.txt".to_string()));
    let merges = git(&fx.remote(), &["rev-list", "--merges", "--count", "main"]);
    assert_eq!(merges, "0");
}

/// A conflicting upstream edit fails the run and leaves no rebase in progress.
#[test]
fn conflicting_upstream_edit_is_reported() {
    if !git_available() {
        return;
    }
    let fx = SyncFixture::new();
    write(&fx.source(), "shared.txt", "v1\n");
    let config = fx.config();
    let git_client = fx.git_client(&config);
    execute(&config, &git_client, &MirrorOptions::default(), &logger()).unwrap();

    fx.push_upstream_change("shared.txt", "upstream v2\n", "upstream edit");
    write(&fx.source(), "shared.txt", "local v2\n");

    let err = execute(&config, &git_client, &MirrorOptions::default(), &logger()).unwrap_err();
    assert!(
        matches!(err, SyncError::Publish(PublishError::IntegrationConflict { .. })),
        "{err:?}"
    );
    let git_dir = fx.destination().join(".git");
    assert!(!git_dir.join("rebase-merge").exists());
    assert!(!git_dir.join("rebase-apply").exists());
    let head_subject = git(&fx.destination(), &["log", "-1", "--format=%s"]);
    assert_eq!(head_subject, "Sync from working directory");
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

/// Dry run changes neither the destination nor the remote.
#[test]
fn dry_run_publishes_nothing() {
    if !git_available() {
        return;
    }
    let fx = SyncFixture::new();
    write(&fx.source(), "a.txt", "alpha\n");
    let config = fx.config();
    let git_client = fx.git_client(&config);
    let opts = MirrorOptions {
        dry_run: true,
        parallel: true,
    };

    let outcome = execute(&config, &git_client, &opts, &logger()).unwrap();
    assert!(outcome.is_none());
    assert!(!fx.destination().join("a.txt").exists());
    assert!(fx.destination().join("README.md").exists());
    assert_eq!(fx.remote_commit_count(), 1);
}
