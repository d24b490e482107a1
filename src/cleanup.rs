use console::style;
use tracing::warn;

use crate::error::{Error, Result};
use crate::git::{BACKUP_REF_PREFIX, Repo};
use crate::prompt::{self, ConfirmPrompter};

/// What a cleanup pass managed to do.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
    /// Set when the backup refs could not be listed.
    pub list_error: Option<String>,
    /// Set when reflog expiry or `gc` failed.
    pub gc_error: Option<String>,
}

impl CleanupReport {
    /// True when every step succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.list_error.is_none() && self.gc_error.is_none()
    }
}

/// Deletes the backup refs left by `filter-branch`, expires reflogs and
/// prunes unreachable objects.
///
/// Every step is best effort: refs are deleted one at a time, and a failure
/// to list or delete them, or of the final reflog/gc step, is logged and
/// recorded in the report.
pub fn remove_backup_refs(repo: &Repo) -> CleanupReport {
    let mut report = CleanupReport::default();

    let refs = match repo.refs_under(BACKUP_REF_PREFIX) {
        Ok(refs) => refs,
        Err(e) => {
            warn!(error = %e, "failed to list backup refs");
            report.list_error = Some(e.to_string());
            Vec::new()
        }
    };

    for name in refs {
        match repo.delete_ref(&name) {
            Ok(()) => {
                println!("Deleted {name}");
                report.deleted.push(name);
            }
            Err(e) => {
                warn!(reference = %name, error = %e, "failed to delete backup ref");
                report.failed.push(name);
            }
        }
    }

    if let Err(e) = repo.expire_reflogs().and_then(|()| repo.gc_prune()) {
        warn!(error = %e, "garbage collection failed");
        report.gc_error = Some(e.to_string());
    }

    report
}

/// Asks before running [`remove_backup_refs`]. Returns `None` when declined.
///
/// # Errors
///
/// Only a failing confirmation prompt is returned; cleanup failures end up
/// in the report.
pub fn offer_cleanup<P: ConfirmPrompter>(
    repo: &Repo,
    prompter: &mut P,
) -> Result<Option<CleanupReport>> {
    println!();
    if !prompt::confirm_cleanup(prompter).map_err(Error::Prompt)? {
        println!("Skipping cleanup. Backup refs remain under {BACKUP_REF_PREFIX}.");
        return Ok(None);
    }

    let report = remove_backup_refs(repo);
    if report.is_complete() {
        println!("{}", style("Cleanup done.").green());
    } else {
        eprintln!(
            "{}",
            style("Cleanup incomplete, see warnings above.").yellow()
        );
    }
    Ok(Some(report))
}
