//! # fakit
//!
//! A CLI tool to fabricate git history: rewrite commit authors, commit
//! messages or commit dates across every ref of a repository.
//!
//! This crate provides functionality to:
//! - List every commit reachable from any ref
//! - Replace author identities, prompting per identity or randomizing them
//! - Replace commit messages with ones generated from an example corpus
//! - Spread commit dates over a new range of years
//! - Remove the backup refs `git filter-branch` leaves behind
//!
//! ## Usage
//!
//! ```bash
//! # Pick the operation from a menu
//! fakit path/to/repo
//!
//! # Skip the menu
//! fakit --operation dates path/to/repo
//! ```
//!
//! ## Modules
//!
//! - [`cli`] - Command-line interface and main entry point
//! - [`git`] - Commit enumeration and git command wrappers
//! - [`rewrite`] - Planning and running a rewrite
//! - [`filter`] - Lookup scripts and tables for `git filter-branch`
//! - [`identity`] - Fake author identities
//! - [`message`] - Fake commit messages from a Markov chain
//! - [`cleanup`] - Removal of backup refs
//! - [`prompt`] - User input abstractions
//! - [`spinner`] - Progress indicator
//! - [`banner`] - Warning banner

pub mod banner;
pub mod cleanup;
pub mod cli;
pub mod error;
pub mod filter;
pub mod git;
pub mod identity;
pub mod message;
pub mod prompt;
pub mod rewrite;
pub mod spinner;

pub use error::{Error, Result};
