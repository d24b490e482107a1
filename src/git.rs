use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use console::style;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::filter::{FilterProgram, TABLE_ENV};
use crate::identity::Identity;

/// Separates fields of one commit in the `git log` format below.
const FIELD_SEPARATOR: char = '\u{1f}';

/// `%x1f`-separated fields; `-z` terminates each commit with NUL.
const LOG_FORMAT: &str = "--format=%H%x1f%an%x1f%ae%x1f%cn%x1f%ce%x1f%at%x1f%ct%x1f%B";

/// Namespace where `filter-branch` keeps the pre-rewrite refs.
pub const BACKUP_REF_PREFIX: &str = "refs/original/";

/// Keeps backup refs out of the following `--all`.
const EXCLUDE_BACKUPS: &str = "--exclude=refs/original/*";

/// Read-only view of one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub hash: String,
    pub author: Identity,
    pub committer: Identity,
    /// Author timestamp, seconds since the epoch.
    pub authored: i64,
    /// Committer timestamp, seconds since the epoch.
    pub committed: i64,
    pub message: String,
}

impl Commit {
    /// First eight characters of the hash.
    pub fn short_hash(&self) -> &str {
        self.hash.get(..8).unwrap_or(&self.hash)
    }

    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim()
    }
}

/// Runs a command and returns its trimmed standard output on success.
///
/// A non-zero exit becomes [`Error::Subprocess`] carrying the trimmed
/// standard error; a spawn failure is returned as [`Error::Io`].
fn run_output(mut cmd: Command, label: &str) -> Result<String> {
    debug!(command = label, "running git");
    let out = cmd.output()?;
    if out.status.success() {
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    } else {
        let mut stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
        if stderr.is_empty() {
            stderr = format!("exited with {}", out.status);
        }
        Err(Error::Subprocess {
            command: label.to_string(),
            stderr,
        })
    }
}

/// Like [`run_output`], discarding standard output.
fn run_status(cmd: Command, label: &str) -> Result<()> {
    run_output(cmd, label).map(|_| ())
}

/// Parses the output of `git log -z` with [`LOG_FORMAT`].
pub(crate) fn parse_log(output: &str) -> Result<Vec<Commit>> {
    let mut commits = Vec::new();
    for record in output.split('\0') {
        let record = record.trim_start_matches('\n');
        if record.is_empty() {
            continue;
        }

        let fields: Vec<&str> = record.splitn(8, FIELD_SEPARATOR).collect();
        let [hash, an, ae, cn, ce, at, ct, body] = fields[..] else {
            return Err(Error::InvalidOutput(format!(
                "expected 8 fields in log record, got {}",
                fields.len()
            )));
        };

        let timestamp = |s: &str| {
            s.parse::<i64>()
                .map_err(|_| Error::InvalidOutput(format!("bad timestamp '{s}' for {hash}")))
        };

        commits.push(Commit {
            hash: hash.to_string(),
            author: Identity::new(an, ae),
            committer: Identity::new(cn, ce),
            authored: timestamp(at)?,
            committed: timestamp(ct)?,
            message: body.trim_end().to_string(),
        });
    }
    Ok(commits)
}

/// A git work tree, driven through the `git` executable.
#[derive(Debug, Clone)]
pub struct Repo {
    root: PathBuf,
}

impl Repo {
    /// Opens the repository containing `path`.
    ///
    /// # Errors
    ///
    /// * [`Error::GitNotFound`] if `git` is not on `PATH`.
    /// * [`Error::RepositoryNotFound`] if `path` is missing or not inside a work tree.
    pub fn open(path: &Path) -> Result<Self> {
        which::which("git").map_err(|_| Error::GitNotFound)?;

        if !path.is_dir() {
            return Err(Error::RepositoryNotFound(path.to_path_buf()));
        }

        let mut cmd = Command::new("git");
        cmd.current_dir(path).args(["rev-parse", "--show-toplevel"]);
        let root = run_output(cmd, "git rev-parse --show-toplevel")
            .map_err(|_| Error::RepositoryNotFound(path.to_path_buf()))?;
        if root.is_empty() {
            return Err(Error::RepositoryNotFound(path.to_path_buf()));
        }

        info!(root = %root, "opened repository");
        Ok(Self {
            root: PathBuf::from(root),
        })
    }

    /// Top-level directory of the work tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.root);
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Every commit reachable from any ref, in git's native order.
    ///
    /// Backup refs under [`BACKUP_REF_PREFIX`] are not walked.
    pub fn commits(&self) -> Result<Vec<Commit>> {
        let mut cmd = self.git();
        cmd.args(["log", "-z", LOG_FORMAT, EXCLUDE_BACKUPS, "--all"]);
        let commits = match run_output(cmd, "git log --all") {
            Ok(out) => parse_log(&out)?,
            // an unborn branch has nothing to walk
            Err(Error::Subprocess { stderr, .. })
                if stderr.contains("does not have any commits") =>
            {
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        debug!(count = commits.len(), "enumerated commits");
        Ok(commits)
    }

    /// Runs one `git filter-branch` pass over all refs with `program`.
    ///
    /// The script and its table are written to a fresh temporary directory
    /// that is removed once the call returns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Subprocess`] if `filter-branch` exits non-zero.
    pub fn filter_branch(&self, program: &FilterProgram) -> Result<()> {
        let workspace = tempfile::Builder::new().prefix("fakit-").tempdir()?;
        let (script, table) = program.write_to(workspace.path())?;

        let mut cmd = self.git();
        cmd.args(["filter-branch", "-f"])
            .arg(program.kind().flag())
            .arg(program.invocation(&script))
            .args(["--tag-name-filter", "cat", "--", EXCLUDE_BACKUPS, "--all"])
            .env(TABLE_ENV, &table)
            .env("FILTER_BRANCH_SQUELCH_WARNING", "1")
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        info!(
            filter = program.kind().flag(),
            records = program.len(),
            "running git filter-branch"
        );
        let result = run_status(cmd, "git filter-branch");

        if let Err(e) = workspace.close() {
            warn!(error = %e, "failed to remove filter workspace");
        }
        result
    }

    /// Full names of refs under `prefix`.
    pub fn refs_under(&self, prefix: &str) -> Result<Vec<String>> {
        let mut cmd = self.git();
        cmd.args(["for-each-ref", "--format=%(refname)", prefix]);
        let out = run_output(cmd, "git for-each-ref")?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Deletes the fully qualified ref `name`.
    pub fn delete_ref(&self, name: &str) -> Result<()> {
        let mut cmd = self.git();
        cmd.args(["update-ref", "-d", name]);
        run_status(cmd, "git update-ref -d")
    }

    /// Expires every reflog entry immediately.
    pub fn expire_reflogs(&self) -> Result<()> {
        let mut cmd = self.git();
        cmd.args(["reflog", "expire", "--expire=now", "--all"]);
        run_status(cmd, "git reflog expire")
    }

    /// Garbage-collects, pruning unreachable objects immediately.
    pub fn gc_prune(&self) -> Result<()> {
        let mut cmd = self.git();
        cmd.args(["gc", "--prune=now", "--quiet"]);
        run_status(cmd, "git gc --prune=now")
    }
}

/// Enumerates all commits and prints one line per commit.
pub fn list_commits(repo: &Repo) -> Result<Vec<Commit>> {
    let commits = repo.commits()?;
    for (idx, c) in commits.iter().enumerate() {
        println!(
            "{}: {} {} {}",
            idx,
            style(c.short_hash()).yellow(),
            c.author,
            c.summary()
        );
    }
    Ok(commits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hash: &str, author: &str, email: &str, ct: i64, body: &str) -> String {
        format!(
            "{hash}\u{1f}{author}\u{1f}{email}\u{1f}{author}\u{1f}{email}\u{1f}{ct}\u{1f}{ct}\u{1f}{body}\n"
        )
    }

    #[test]
    fn parse_log_reads_every_field() {
        let out = [
            record("a".repeat(40).as_str(), "Ann", "ann@x.com", 200, "Second\n\nbody text"),
            record("b".repeat(40).as_str(), "Bob", "bob@x.com", 100, "First"),
        ]
        .join("\0");

        let commits = parse_log(&out).unwrap();
        assert_eq!(commits.len(), 2);

        let first = &commits[0];
        assert_eq!(first.hash, "a".repeat(40));
        assert_eq!(first.author, Identity::new("Ann", "ann@x.com"));
        assert_eq!(first.committer, Identity::new("Ann", "ann@x.com"));
        assert_eq!(first.committed, 200);
        assert_eq!(first.message, "Second\n\nbody text");
        assert_eq!(first.summary(), "Second");
        assert_eq!(first.short_hash(), "aaaaaaaa");

        assert_eq!(commits[1].author.name, "Bob");
        assert_eq!(commits[1].authored, 100);
    }

    #[test]
    fn parse_log_tolerates_trailing_terminator() {
        let out = format!("{}\0", record("c".repeat(40).as_str(), "C", "c@x", 1, "msg"));
        assert_eq!(parse_log(&out).unwrap().len(), 1);
    }

    #[test]
    fn parse_log_empty_output_has_no_commits() {
        assert!(parse_log("").unwrap().is_empty());
    }

    #[test]
    fn parse_log_rejects_truncated_record() {
        let err = parse_log("abc\u{1f}Name").unwrap_err();
        assert!(matches!(err, Error::InvalidOutput(_)));
    }

    #[test]
    fn parse_log_rejects_bad_timestamp() {
        let out = "h\u{1f}a\u{1f}e\u{1f}a\u{1f}e\u{1f}soon\u{1f}1\u{1f}msg";
        assert!(matches!(parse_log(out), Err(Error::InvalidOutput(_))));
    }

    #[test]
    fn open_rejects_missing_directory() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let missing = dir.path().join("nope");
        match Repo::open(&missing) {
            Err(Error::RepositoryNotFound(p)) => assert_eq!(p, missing),
            Err(Error::GitNotFound) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn short_hash_handles_short_input() {
        let c = Commit {
            hash: "abc".to_string(),
            author: Identity::new("A", "a@x"),
            committer: Identity::new("A", "a@x"),
            authored: 0,
            committed: 0,
            message: String::new(),
        };
        assert_eq!(c.short_hash(), "abc");
        assert_eq!(c.summary(), "");
    }
}
