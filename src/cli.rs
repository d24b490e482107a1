use std::path::PathBuf;

use clap::Parser;
use console::style;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::banner::print_banner;
use crate::cleanup;
use crate::error::Result;
use crate::git::{self, Repo};
use crate::prompt::{self, DialoguerConfirmPrompter, DialoguerStringPrompter};
use crate::rewrite::{Operation, Outcome, Rewriter};

/// Rewrite authors, messages or dates across a git repository's history.
///
/// After a rewrite fakit offers to remove the backup refs (refs/original)
/// and garbage-collect, so the old commits do not linger.
///
/// WARNING: all operations are destructive. Make a backup first.
#[derive(Parser, Debug)]
#[command(name = "fakit", version)]
pub struct Cli {
    /// Path to the git repository.
    pub path: PathBuf,

    /// Run this operation instead of showing the menu.
    #[arg(short, long, value_enum)]
    pub operation: Option<Operation>,

    /// Commit message corpus, one example message per line.
    #[arg(long, env = "FAKIT_CORPUS", value_name = "FILE")]
    pub corpus: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Installs the stderr log subscriber.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}

/// Runs one session against the parsed arguments and returns the exit code.
///
/// 1. Opens the repository and lists every commit.
/// 2. Picks the operation from `--operation` or the menu.
/// 3. Shows the warning banner and asks to start.
/// 4. Plans and runs the rewrite.
/// 5. Offers cleanup of backup refs after a successful rewrite.
pub fn run(cli: Cli) -> Result<i32> {
    let repo = Repo::open(&cli.path)?;
    let commits = git::list_commits(&repo)?;

    let mut strings = DialoguerStringPrompter;
    let mut confirms = DialoguerConfirmPrompter;

    let operation = match cli.operation {
        Some(op) => op,
        None => match prompt::choose_operation(&mut strings).map_err(crate::Error::Prompt)? {
            Some(op) => op,
            None => {
                println!("{}", style("Invalid choice. Exiting.").yellow());
                return Ok(0);
            }
        },
    };
    debug!(operation = operation.name(), "selected operation");

    print_banner(&repo.root().display().to_string(), operation, commits.len());
    if !prompt::confirm_start(&mut confirms).map_err(crate::Error::Prompt)? {
        println!("{}", style("Canceled by user. No changes made.").yellow().bold());
        return Ok(0);
    }

    let mut rewriter = Rewriter::new(&repo, &commits, strings, confirms);
    match rewriter.run(operation, cli.corpus.as_deref())? {
        Outcome::Rewritten { .. } => {
            println!(
                "{}",
                style("Done. Remember to force-push if it's a remote repo!")
                    .green()
                    .bold()
            );
            let mut confirms = rewriter.into_confirms();
            cleanup::offer_cleanup(&repo, &mut confirms)?;
        }
        Outcome::NoChanges(reason) => {
            println!(
                "{}",
                style(format!("No changes to apply ({reason}). Exiting."))
                    .yellow()
                    .bold()
            );
        }
    }

    Ok(0)
}

/// Main CLI entry point for `fakit`.
///
/// Parses arguments, installs logging and runs one session. Errors are
/// printed in red and reported as `Err(())`, which the binary maps to exit
/// status 1.
pub fn entry() -> std::result::Result<i32, ()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => Ok(code),
        Err(e) => {
            eprintln!("{}", style(format!("Error: {e}")).red().bold());
            Err(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use crate::rewrite::Operation;
    use clap::{CommandFactory, Parser};
    use std::path::PathBuf;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_path_only() {
        let cli = Cli::try_parse_from(["fakit", "/tmp/repo"]).unwrap();
        assert_eq!(cli.path, PathBuf::from("/tmp/repo"));
        assert_eq!(cli.operation, None);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parses_operation_and_verbosity() {
        let cli = Cli::try_parse_from(["fakit", "-vv", "--operation", "dates", "."]).unwrap();
        assert_eq!(cli.operation, Some(Operation::Dates));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn rejects_unknown_operation() {
        assert!(Cli::try_parse_from(["fakit", "-o", "branches", "."]).is_err());
    }

    #[test]
    fn requires_path() {
        assert!(Cli::try_parse_from(["fakit"]).is_err());
    }
}
