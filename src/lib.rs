//! Mirror a working directory into a git working copy and publish it.
//!
//! One invocation copies the source tree into the destination (skipping
//! excluded directory and file names, deleting what the source no longer
//! has), then stages everything, commits only when the index differs from
//! `HEAD`, rebases onto the remote branch and pushes.
//!
//! The public API is organised into four layers:
//!
//! - **[`config`]**: resolve and validate [`config::SyncConfig`] from flags, environment and TOML
//! - **[`mirror`]**: the planning walk, apply phase and excluded-file sweep
//! - **[`publish`]**: the stage/commit/rebase/push state machine over [`publish::VersionControl`]
//! - **[`commands`]**: top-level subcommand orchestration (`sync`, `mirror`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod mirror;
pub mod publish;
