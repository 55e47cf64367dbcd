//! Command: print version information.

/// Version string: the build's `git describe` when available.
#[must_use]
pub fn version() -> &'static str {
    option_env!("REPO_MIRROR_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the repo-mirror version to stdout.
pub fn run() {
    println!("repo-mirror {}", version());
}
