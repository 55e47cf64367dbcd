//! [`VersionControl`] backed by the `git` CLI and libgit2.
//!
//! Mutations (add, commit, pull, push) go through the `git` executable so
//! hooks, credential helpers and user config behave as they do for a person
//! at the terminal. Read-only queries use git2.
use git2::{ErrorCode, Repository};
use std::path::PathBuf;
use std::sync::Arc;

use super::VersionControl;
use crate::config::SyncConfig;
use crate::error::{ConfigError, PublishError};
use crate::exec::Executor;

/// Git working copy at a fixed path.
#[derive(Debug)]
pub struct GitClient {
    workdir: PathBuf,
    git_dir: PathBuf,
    remote: String,
    branch: String,
    executor: Arc<dyn Executor>,
}

impl GitClient {
    /// Open the destination of `config` and check it can be published.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `git` is not on `PATH`, the destination is
    /// not a working copy, the remote is missing, or the branch cannot be
    /// determined.
    pub fn open(config: &SyncConfig, executor: Arc<dyn Executor>) -> Result<Self, ConfigError> {
        if !executor.which("git") {
            return Err(ConfigError::GitNotFound);
        }

        let workdir = &config.destination_path;
        let repo = Repository::open(workdir).map_err(|e| ConfigError::NotAWorkingCopy {
            path: workdir.display().to_string(),
            message: e.message().to_string(),
        })?;
        if repo.is_bare() {
            return Err(ConfigError::NotAWorkingCopy {
                path: workdir.display().to_string(),
                message: "repository is bare".to_string(),
            });
        }
        repo.find_remote(&config.remote)
            .map_err(|_| ConfigError::MissingRemote(config.remote.clone()))?;

        let current = current_branch(&repo)?;
        let branch = match &config.branch {
            Some(wanted) if *wanted != current => {
                return Err(ConfigError::UnknownBranch(format!(
                    "'{wanted}' is configured but '{current}' is checked out"
                )));
            }
            _ => current,
        };

        Ok(Self {
            workdir: workdir.clone(),
            git_dir: repo.path().to_path_buf(),
            remote: config.remote.clone(),
            branch,
            executor,
        })
    }

    /// `<remote>/<branch>`.
    #[must_use]
    pub fn upstream(&self) -> String {
        format!("{}/{}", self.remote, self.branch)
    }

    fn repo(&self) -> Result<Repository, PublishError> {
        Repository::open(&self.workdir)
            .map_err(|e| PublishError::Inspect(e.message().to_string()))
    }

    fn git(&self, args: &[&str]) -> anyhow::Result<crate::exec::ExecResult> {
        self.executor.run_in(&self.workdir, "git", args)
    }

    fn mid_rebase(&self) -> bool {
        self.git_dir.join("rebase-merge").exists() || self.git_dir.join("rebase-apply").exists()
    }

    /// Whether the remote has the branch at all; an empty remote has nothing
    /// to rebase onto.
    fn remote_has_branch(&self) -> Result<bool, PublishError> {
        let result = self
            .executor
            .run_in_unchecked(
                &self.workdir,
                "git",
                &["ls-remote", "--exit-code", "--heads", &self.remote, &self.branch],
            )
            .map_err(|e| PublishError::Integration(format!("{e:#}")))?;
        match result.code {
            Some(0) => Ok(true),
            Some(2) => Ok(false),
            _ => Err(PublishError::Integration(result.combined_output())),
        }
    }
}

/// Name of the branch `HEAD` points at, born or not.
fn current_branch(repo: &Repository) -> Result<String, ConfigError> {
    let head = repo
        .find_reference("HEAD")
        .map_err(|e| ConfigError::UnknownBranch(e.message().to_string()))?;
    head.symbolic_target()
        .and_then(|target| target.strip_prefix("refs/heads/"))
        .map(str::to_string)
        .ok_or_else(|| ConfigError::UnknownBranch("HEAD is detached".to_string()))
}

impl VersionControl for GitClient {
    fn stage_all(&self) -> Result<(), PublishError> {
        self.git(&["add", "-A"])
            .map(drop)
            .map_err(|e| PublishError::Stage(format!("{e:#}")))
    }

    fn has_staged_changes(&self) -> Result<bool, PublishError> {
        let inspect = |e: git2::Error| PublishError::Inspect(e.message().to_string());
        let repo = self.repo()?;
        let mut index = repo.index().map_err(inspect)?;
        match repo.head() {
            Ok(head) => {
                let head_tree = head.peel_to_tree().map_err(inspect)?.id();
                let staged_tree = index.write_tree().map_err(inspect)?;
                Ok(head_tree != staged_tree)
            }
            Err(e) if e.code() == ErrorCode::UnbornBranch => Ok(!index.is_empty()),
            Err(e) => Err(inspect(e)),
        }
    }

    fn commit(&self, message: &str) -> Result<(), PublishError> {
        self.git(&["commit", "--quiet", "-m", message])
            .map(drop)
            .map_err(|e| PublishError::Commit(format!("{e:#}")))
    }

    fn pull_rebase(&self) -> Result<(), PublishError> {
        if !self.remote_has_branch()? {
            return Ok(());
        }
        let result = self
            .executor
            .run_in_unchecked(
                &self.workdir,
                "git",
                &["pull", "--rebase", &self.remote, &self.branch],
            )
            .map_err(|e| PublishError::Integration(format!("{e:#}")))?;
        if result.success {
            return Ok(());
        }

        let output = result.combined_output();
        if self.mid_rebase() || output.contains("CONFLICT") {
            // Leave the working copy on the local commit, not mid-rebase.
            let upstream = self.upstream();
            let abort = self
                .executor
                .run_in_unchecked(&self.workdir, "git", &["rebase", "--abort"]);
            return Err(match abort {
                Ok(r) if r.success => PublishError::IntegrationConflict { upstream },
                Ok(r) => PublishError::RebaseAbort {
                    upstream,
                    output: r.combined_output(),
                },
                Err(e) => PublishError::RebaseAbort {
                    upstream,
                    output: format!("{e:#}"),
                },
            });
        }
        Err(PublishError::Integration(output))
    }

    fn push(&self) -> Result<(), PublishError> {
        let refspec = format!("HEAD:refs/heads/{}", self.branch);
        self.git(&["push", &self.remote, &refspec])
            .map(drop)
            .map_err(|e| PublishError::Push(format!("{e:#}")))
    }

    fn commits_ahead(&self) -> Result<Option<usize>, PublishError> {
        let inspect = |e: git2::Error| PublishError::Inspect(e.message().to_string());
        let repo = self.repo()?;
        let local = match repo.head() {
            Ok(head) => head.target(),
            Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(inspect(e)),
        };
        let tracking = format!("refs/remotes/{}/{}", self.remote, self.branch);
        let upstream = match repo.refname_to_id(&tracking) {
            Ok(oid) => oid,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(inspect(e)),
        };
        let Some(local) = local else {
            return Ok(None);
        };
        let (ahead, _behind) = repo.graph_ahead_behind(local, upstream).map_err(inspect)?;
        Ok(Some(ahead))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::exec::test_helpers::MockExecutor;
    use std::fs;
    use std::path::Path;

    /// Non-bare repository with one commit on `main` and an `origin` remote.
    fn repo_with_commit() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.set_head("refs/heads/main").unwrap();
        repo.remote("origin", "https://example.invalid/repo.git").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        commit_all(&repo, "initial");
        (dir, repo)
    }

    fn commit_all(repo: &Repository, message: &str) {
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap();
    }

    fn stage(repo: &Repository, path: &str) {
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(path)).unwrap();
        index.write().unwrap();
    }

    fn client(dir: &Path, executor: MockExecutor) -> Result<GitClient, ConfigError> {
        let src = tempfile::tempdir().unwrap();
        let config = SyncConfig::new(src.path(), dir);
        GitClient::open(&config, Arc::new(executor))
    }

    fn no_calls() -> MockExecutor {
        MockExecutor::with_responses(vec![])
    }

    #[test]
    fn open_requires_git_on_path() {
        let (dir, _repo) = repo_with_commit();
        let err = client(dir.path(), no_calls().with_which(false)).unwrap_err();
        assert!(matches!(err, ConfigError::GitNotFound));
    }

    #[test]
    fn open_rejects_plain_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = client(dir.path(), no_calls()).unwrap_err();
        assert!(matches!(err, ConfigError::NotAWorkingCopy { .. }), "{err:?}");
    }

    #[test]
    fn open_rejects_missing_remote() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        let err = client(dir.path(), no_calls()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRemote(ref r) if r == "origin"));
    }

    #[test]
    fn open_resolves_current_branch() {
        let (dir, _repo) = repo_with_commit();
        let git = client(dir.path(), no_calls()).unwrap();
        assert_eq!(git.upstream(), "origin/main");
    }

    #[test]
    fn open_rejects_branch_mismatch() {
        let (dir, _repo) = repo_with_commit();
        let src = tempfile::tempdir().unwrap();
        let mut config = SyncConfig::new(src.path(), dir.path());
        config.branch = Some("release".to_string());
        let err = GitClient::open(&config, Arc::new(no_calls())).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownBranch(_)));
    }

    #[test]
    fn staged_detection_compares_index_with_head() {
        let (dir, repo) = repo_with_commit();
        let git = client(dir.path(), no_calls()).unwrap();
        assert!(!git.has_staged_changes().unwrap());

        fs::write(dir.path().join("b.txt"), "b").unwrap();
        assert!(!git.has_staged_changes().unwrap(), "unstaged file is not staged");

        stage(&repo, "b.txt");
        assert!(git.has_staged_changes().unwrap());
    }

    #[test]
    fn unborn_branch_with_staged_file_has_changes() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.remote("origin", "https://example.invalid/repo.git").unwrap();
        let git = client(dir.path(), no_calls()).unwrap();
        assert!(!git.has_staged_changes().unwrap());

        fs::write(dir.path().join("first.txt"), "1").unwrap();
        stage(&repo, "first.txt");
        assert!(git.has_staged_changes().unwrap());
        assert_eq!(git.commits_ahead().unwrap(), None);
    }

    #[test]
    fn cli_steps_run_expected_commands() {
        let (dir, _repo) = repo_with_commit();
        let executor = Arc::new(MockExecutor::with_responses(vec![
            (true, ""),
            (true, ""),
            (true, "abc\trefs/heads/main"),
            (true, ""),
            (true, ""),
        ]));
        let src = tempfile::tempdir().unwrap();
        let git =
            GitClient::open(&SyncConfig::new(src.path(), dir.path()), executor.clone()).unwrap();

        git.stage_all().unwrap();
        git.commit("Sync from working directory").unwrap();
        git.pull_rebase().unwrap();
        git.push().unwrap();

        assert_eq!(
            executor.calls(),
            vec![
                "git add -A",
                "git commit --quiet -m Sync from working directory",
                "git ls-remote --exit-code --heads origin main",
                "git pull --rebase origin main",
                "git push origin HEAD:refs/heads/main",
            ]
        );
    }

    #[test]
    fn pull_conflict_aborts_rebase() {
        let (dir, _repo) = repo_with_commit();
        let executor = Arc::new(MockExecutor::with_responses(vec![
            (true, "abc\trefs/heads/main"),
            (false, "CONFLICT (content): Merge conflict in a.txt"),
            (true, ""),
        ]));
        let src = tempfile::tempdir().unwrap();
        let git =
            GitClient::open(&SyncConfig::new(src.path(), dir.path()), executor.clone()).unwrap();

        let err = git.pull_rebase().unwrap_err();
        assert!(matches!(
            err,
            PublishError::IntegrationConflict { ref upstream } if upstream == "origin/main"
        ));
        assert_eq!(executor.calls().last().map(String::as_str), Some("git rebase --abort"));
    }

    #[test]
    fn failed_abort_is_reported_with_its_output() {
        let (dir, _repo) = repo_with_commit();
        let executor = Arc::new(MockExecutor::with_responses(vec![
            (true, "abc\trefs/heads/main"),
            (false, "CONFLICT (content): Merge conflict in a.txt"),
            (false, "error: could not write index"),
        ]));
        let src = tempfile::tempdir().unwrap();
        let git = GitClient::open(&SyncConfig::new(src.path(), dir.path()), executor).unwrap();

        let err = git.pull_rebase().unwrap_err();
        assert!(matches!(
            err,
            PublishError::RebaseAbort { ref upstream, ref output }
                if upstream == "origin/main" && output.contains("could not write index")
        ));
        assert!(err.to_string().contains("mid-rebase"));
    }

    #[test]
    fn pull_failure_without_conflict_is_integration_error() {
        let (dir, _repo) = repo_with_commit();
        let executor = Arc::new(MockExecutor::with_responses(vec![
            (true, "abc\trefs/heads/main"),
            (false, "fatal: unable to access remote"),
        ]));
        let src = tempfile::tempdir().unwrap();
        let git = GitClient::open(&SyncConfig::new(src.path(), dir.path()), executor).unwrap();

        let err = git.pull_rebase().unwrap_err();
        assert!(matches!(err, PublishError::Integration(ref m) if m.contains("unable to access")));
    }

    #[test]
    fn push_rejection_is_push_error() {
        let (dir, _repo) = repo_with_commit();
        let executor = MockExecutor::with_responses(vec![(false, "! [rejected] main -> main")]);
        let git = client(dir.path(), executor).unwrap();
        let err = git.push().unwrap_err();
        assert!(matches!(err, PublishError::Push(ref m) if m.contains("rejected")));
    }

    #[test]
    fn commits_ahead_of_tracking_branch() {
        let (dir, repo) = repo_with_commit();
        let base = repo.head().unwrap().target().unwrap();
        repo.reference("refs/remotes/origin/main", base, true, "test")
            .unwrap();
        let git = client(dir.path(), no_calls()).unwrap();
        assert_eq!(git.commits_ahead().unwrap(), Some(0));

        fs::write(dir.path().join("c.txt"), "c").unwrap();
        commit_all(&repo, "local only");
        assert_eq!(git.commits_ahead().unwrap(), Some(1));
    }
}
