//! Planning and running one history rewrite.
//!
//! Each operation first builds a [`ReplacementMap`] from the enumerated
//! commits, turns it into a [`FilterProgram`] and hands that to a single
//! `git filter-branch` call over every ref. Nothing is executed when the plan
//! is empty.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use console::style;
use rand::Rng;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::filter::{FilterProgram, ReplacementMap};
use crate::git::{Commit, Repo};
use crate::identity::{self, Identity};
use crate::message::MessageModel;
use crate::prompt::{self, ConfirmPrompter, StringPrompter};
use crate::spinner::Spinner;

const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_YEAR: f64 = 365.0 * SECONDS_PER_DAY as f64;

/// 9999-12-31T23:59:59Z, the latest date a window may reach after jitter.
const MAX_TIMESTAMP: i64 = 253_402_300_799;

/// The metadata a run rewrites. Exactly one per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Operation {
    Authors,
    Messages,
    Dates,
}

impl Operation {
    /// Lowercase name, as accepted by `--operation`.
    pub fn name(self) -> &'static str {
        match self {
            Operation::Authors => "authors",
            Operation::Messages => "messages",
            Operation::Dates => "dates",
        }
    }
}

/// How a run ended, short of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `filter-branch` ran with this many replacement records.
    Rewritten { operation: Operation, records: usize },
    /// Nothing to do; history was not touched.
    NoChanges(String),
}

/// Distinct author identities in first-seen order.
pub fn distinct_identities(commits: &[Commit]) -> Vec<Identity> {
    let mut seen = HashSet::new();
    commits
        .iter()
        .filter(|c| seen.insert(c.author.clone()))
        .map(|c| c.author.clone())
        .collect()
}

/// Resolves a replacement for every identity, dropping those left unchanged.
pub fn plan_authors<F>(
    identities: &[Identity],
    mut resolve: F,
) -> Result<ReplacementMap<Identity, Identity>>
where
    F: FnMut(&Identity) -> Result<Identity>,
{
    let mut map = ReplacementMap::new();
    for old in identities {
        let new = resolve(old)?;
        if new != *old {
            map.insert(old.clone(), new);
        }
    }
    debug!(
        identities = identities.len(),
        changed = map.len(),
        "planned author rewrite"
    );
    Ok(map)
}

/// One independently generated message per commit.
pub fn plan_messages<R: Rng + ?Sized>(
    commits: &[Commit],
    model: &MessageModel,
    rng: &mut R,
) -> ReplacementMap<String, String> {
    let mut map = ReplacementMap::new();
    for c in commits {
        map.insert(c.hash.clone(), model.next(rng));
    }
    map
}

/// The span new commit dates are spread over, in epoch seconds.
///
/// `start <= end` always holds; the oldest commit lands on `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: i64,
    pub end: i64,
}

impl DateWindow {
    /// Anchors the window at `now + base_offset_years`.
    ///
    /// A positive `range_years` extends the window forward from the anchor, a
    /// negative one backward, so history ends at the anchor. Returns `None`
    /// for a zero range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDateRange`] if the window starts before the
    /// epoch or a jittered date could pass the year 9999.
    pub fn resolve(now: i64, base_offset_years: f64, range_years: f64) -> Result<Option<Self>> {
        if range_years == 0.0 {
            return Ok(None);
        }
        let out_of_range = || Error::InvalidDateRange {
            base_offset_years,
            range_years,
        };

        let anchor = years_to_seconds(base_offset_years)
            .and_then(|s| now.checked_add(s))
            .ok_or_else(out_of_range)?;
        let other = years_to_seconds(range_years)
            .and_then(|s| anchor.checked_add(s))
            .ok_or_else(out_of_range)?;

        let (start, end) = (anchor.min(other), anchor.max(other));
        let last = end.checked_add(SECONDS_PER_DAY);
        if start < 0 || last.is_none_or(|last| last > MAX_TIMESTAMP) {
            return Err(out_of_range());
        }
        Ok(Some(Self { start, end }))
    }
}

/// Whole seconds in `years`, or `None` if not representable as a date offset.
fn years_to_seconds(years: f64) -> Option<i64> {
    let secs = (years * SECONDS_PER_YEAR).round();
    if secs.is_finite() && secs.abs() <= MAX_TIMESTAMP as f64 {
        Some(secs as i64)
    } else {
        None
    }
}

/// Spreads commits over `window` by rank of their original commit time.
///
/// Each date gets up to a day of random jitter; author and committer date
/// are set to the same value.
pub fn plan_dates<R: Rng + ?Sized>(
    commits: &[Commit],
    window: DateWindow,
    rng: &mut R,
) -> ReplacementMap<String, i64> {
    let mut sorted: Vec<&Commit> = commits.iter().collect();
    sorted.sort_by_key(|c| c.committed);

    let steps = sorted.len().saturating_sub(1).max(1) as f64;
    let span = window.end.saturating_sub(window.start) as f64;

    let mut map = ReplacementMap::new();
    for (i, c) in sorted.into_iter().enumerate() {
        let t = i as f64 / steps;
        let base = window.start.saturating_add((span * t).round() as i64);
        let jitter = rng.gen_range(0..SECONDS_PER_DAY);
        map.insert(c.hash.clone(), base.saturating_add(jitter));
    }
    map
}

fn day(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Drives one interactive rewrite of `repo`.
pub struct Rewriter<'a, S, C> {
    repo: &'a Repo,
    commits: &'a [Commit],
    strings: S,
    confirms: C,
}

impl<'a, S: StringPrompter, C: ConfirmPrompter> Rewriter<'a, S, C> {
    /// Creates a rewriter over `commits` of `repo`.
    pub fn new(repo: &'a Repo, commits: &'a [Commit], strings: S, confirms: C) -> Self {
        Self {
            repo,
            commits,
            strings,
            confirms,
        }
    }

    /// Plans and runs `operation`.
    ///
    /// For messages the corpus is loaded first, so a missing corpus fails
    /// before history is touched.
    pub fn run(&mut self, operation: Operation, corpus: Option<&Path>) -> Result<Outcome> {
        let mut rng = rand::thread_rng();
        match operation {
            Operation::Authors => self.rewrite_authors(&mut rng),
            Operation::Messages => {
                let model = MessageModel::load(corpus)?;
                self.rewrite_messages(&model, &mut rng)
            }
            Operation::Dates => self.rewrite_dates(Utc::now(), &mut rng),
        }
    }

    /// Replaces author identities, randomized or prompted per identity.
    pub fn rewrite_authors<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Outcome> {
        let identities = distinct_identities(self.commits);
        let randomize = prompt::confirm_randomize(&mut self.confirms).map_err(Error::Prompt)?;

        let strings = &mut self.strings;
        let map = plan_authors(&identities, |old| {
            if randomize {
                let new = identity::generate(&mut *rng, old)?;
                println!("Randomized: {old} -> {new}");
                Ok(new)
            } else {
                println!();
                println!("Original author: {old}");
                prompt::ask_identity(&mut *strings, old).map_err(Error::Prompt)
            }
        })?;

        if map.is_empty() {
            return Ok(Outcome::NoChanges("no author changes to apply".to_string()));
        }

        let program = FilterProgram::authors(&map)?;
        self.execute(Operation::Authors, &program)
    }

    /// Replaces every commit message with one generated by `model`.
    pub fn rewrite_messages<R: Rng + ?Sized>(
        &mut self,
        model: &MessageModel,
        rng: &mut R,
    ) -> Result<Outcome> {
        println!("Randomizing commit messages...");
        let map = plan_messages(self.commits, model, rng);
        if map.is_empty() {
            return Ok(Outcome::NoChanges("no commits found".to_string()));
        }

        let program = FilterProgram::messages(&map)?;
        self.execute(Operation::Messages, &program)
    }

    /// Spreads commit dates over a window read from the prompts.
    pub fn rewrite_dates<R: Rng + ?Sized>(
        &mut self,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Outcome> {
        let (Some(first), Some(last)) = (
            self.commits.iter().map(|c| c.committed).min(),
            self.commits.iter().map(|c| c.committed).max(),
        ) else {
            return Ok(Outcome::NoChanges("no commits found".to_string()));
        };

        println!("Current commit range: {} -> {}", day(first), day(last));
        println!(
            "Approximate range in years: {:.2}",
            (last - first) as f64 / (365.25 * SECONDS_PER_DAY as f64)
        );

        let base_offset = prompt::ask_years(
            &mut self.strings,
            "Base offset in years (negative for past, positive for future)",
        )
        .map_err(Error::Prompt)?;
        let range = prompt::ask_years(
            &mut self.strings,
            "Range in years (negative ends history at the offset)",
        )
        .map_err(Error::Prompt)?;

        let Some(window) = DateWindow::resolve(now.timestamp(), base_offset, range)? else {
            return Ok(Outcome::NoChanges("no range specified".to_string()));
        };
        println!();
        println!(
            "New commit range will be: {} -> {}",
            day(window.start),
            day(window.end)
        );

        let map = plan_dates(self.commits, window, rng);
        let program = FilterProgram::dates(&map)?;
        self.execute(Operation::Dates, &program)
    }

    fn execute(&self, operation: Operation, program: &FilterProgram) -> Result<Outcome> {
        println!();
        println!(
            "{}",
            style(format!(
                "Rewriting {}... (destructive, make a backup!)",
                operation.name()
            ))
            .yellow()
        );

        let spinner = Spinner::start(&format!("Rewriting {}", operation.name()));
        let result = self.repo.filter_branch(program);
        spinner.stop();
        result?;

        info!(operation = operation.name(), records = program.len(), "rewrite complete");
        Ok(Outcome::Rewritten {
            operation,
            records: program.len(),
        })
    }

    /// Gives back the confirm prompter, e.g. to offer cleanup afterwards.
    pub fn into_confirms(self) -> C {
        self.confirms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn commit(hash: &str, name: &str, email: &str, committed: i64) -> Commit {
        Commit {
            hash: hash.to_string(),
            author: Identity::new(name, email),
            committer: Identity::new(name, email),
            authored: committed,
            committed,
            message: format!("Commit {hash}"),
        }
    }

    #[test]
    fn distinct_identities_keeps_first_seen_order() {
        let commits = vec![
            commit("1", "B", "b@x.com", 3),
            commit("2", "A", "a@x.com", 2),
            commit("3", "B", "b@x.com", 1),
            commit("4", "B", "other@x.com", 0),
        ];
        let ids = distinct_identities(&commits);
        assert_eq!(
            ids,
            vec![
                Identity::new("B", "b@x.com"),
                Identity::new("A", "a@x.com"),
                Identity::new("B", "other@x.com"),
            ]
        );
    }

    #[test]
    fn plan_authors_drops_identity_mappings() {
        let ids = vec![Identity::new("A", "a@x.com"), Identity::new("B", "b@x.com")];
        let map = plan_authors(&ids, |old| {
            if old.name == "A" {
                Ok(Identity::new("Z", "z@x.com"))
            } else {
                Ok(old.clone())
            }
        })
        .unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(
            map.get(&Identity::new("A", "a@x.com")),
            Some(&Identity::new("Z", "z@x.com"))
        );
        assert_eq!(map.get(&Identity::new("B", "b@x.com")), None);
    }

    #[test]
    fn plan_authors_all_unchanged_is_empty() {
        let ids = vec![Identity::new("A", "a@x.com")];
        let map = plan_authors(&ids, |old| Ok(old.clone())).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn plan_authors_propagates_resolver_errors() {
        let ids = vec![Identity::new("A", "a@x.com")];
        let err = plan_authors(&ids, |_| Err(Error::InvalidNameFormat("A".to_string())));
        assert!(matches!(err, Err(Error::InvalidNameFormat(_))));
    }

    #[test]
    fn randomized_plan_is_disjoint_from_originals() {
        let ids = vec![Identity::new("A B", "a@x.com"), Identity::new("C D", "c@x.com")];
        let mut rng = StdRng::seed_from_u64(5);
        let map = plan_authors(&ids, |old| identity::generate(&mut rng, old)).unwrap();
        assert_eq!(map.len(), 2);
        for (_, new) in map.iter() {
            assert!(!ids.contains(new));
        }
    }

    #[test]
    fn plan_messages_covers_every_commit() {
        let commits = vec![commit("a", "A", "a@x", 1), commit("b", "A", "a@x", 2)];
        let model = MessageModel::build("one\ntwo");
        let mut rng = StdRng::seed_from_u64(1);
        let map = plan_messages(&commits, &model, &mut rng);
        assert_eq!(map.len(), 2);
        assert!(map.get(&"a".to_string()).is_some());
        assert!(map.get(&"b".to_string()).is_some());
    }

    const YEAR: i64 = SECONDS_PER_YEAR as i64;

    #[test]
    fn window_zero_range_is_none() {
        assert_eq!(DateWindow::resolve(1_000, 1.0, 0.0).unwrap(), None);
    }

    #[test]
    fn window_positive_range_extends_forward() {
        let now = 50 * YEAR;
        let w = DateWindow::resolve(now, -2.0, 1.0).unwrap().unwrap();
        assert_eq!(w, DateWindow { start: 48 * YEAR, end: 49 * YEAR });
    }

    #[test]
    fn window_negative_range_ends_at_anchor() {
        let now = 50 * YEAR;
        let w = DateWindow::resolve(now, 1.0, -3.0).unwrap().unwrap();
        assert_eq!(w, DateWindow { start: 48 * YEAR, end: 51 * YEAR });
    }

    #[test]
    fn window_with_huge_offset_is_rejected() {
        let err = DateWindow::resolve(1_700_000_000, 1e300, 1.0).unwrap_err();
        assert!(matches!(err, Error::InvalidDateRange { .. }));
        assert!(DateWindow::resolve(1_700_000_000, 1.0, -1e300).is_err());
        assert!(DateWindow::resolve(1_700_000_000, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn window_before_the_epoch_is_rejected() {
        let err = DateWindow::resolve(1_700_000_000, -80.0, 1.0).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidDateRange { base_offset_years, range_years }
                if base_offset_years == -80.0 && range_years == 1.0
        ));
    }

    #[test]
    fn window_past_year_9999_is_rejected() {
        assert!(DateWindow::resolve(1_700_000_000, 8000.0, 1.0).is_err());
        assert!(DateWindow::resolve(1_700_000_000, 7000.0, 1.0).unwrap().is_some());
    }

    #[test]
    fn plan_dates_interpolates_by_rank() {
        // enumeration order differs from chronological order
        let commits = vec![
            commit("newest", "A", "a@x", 300),
            commit("oldest", "A", "a@x", 100),
            commit("middle", "A", "a@x", 200),
        ];
        let window = DateWindow { start: 0, end: 10 * SECONDS_PER_DAY };
        let mut rng = StdRng::seed_from_u64(3);
        let map = plan_dates(&commits, window, &mut rng);

        let at = |h: &str| *map.get(&h.to_string()).unwrap();
        assert!((0..SECONDS_PER_DAY).contains(&at("oldest")));
        assert!((5 * SECONDS_PER_DAY..6 * SECONDS_PER_DAY).contains(&at("middle")));
        assert!((10 * SECONDS_PER_DAY..11 * SECONDS_PER_DAY).contains(&at("newest")));
    }

    #[test]
    fn plan_dates_single_commit_lands_on_start() {
        let commits = vec![commit("only", "A", "a@x", 5)];
        let window = DateWindow { start: 1_000_000, end: 2_000_000 };
        let mut rng = StdRng::seed_from_u64(8);
        let map = plan_dates(&commits, window, &mut rng);
        let ts = *map.get(&"only".to_string()).unwrap();
        assert!((1_000_000..1_000_000 + SECONDS_PER_DAY).contains(&ts));
    }

    #[test]
    fn operation_names() {
        assert_eq!(Operation::Authors.name(), "authors");
        assert_eq!(Operation::Messages.name(), "messages");
        assert_eq!(Operation::Dates.name(), "dates");
    }
}
