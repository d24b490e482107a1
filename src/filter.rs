//! Filter programs handed to `git filter-branch`.
//!
//! A filter program is a fixed lookup script plus a data table. The scripts
//! never contain replacement values: those live in the table, are read with
//! `read -r` and only ever expanded inside double quotes, so names, emails and
//! messages cannot inject shell syntax. The table path reaches the script via
//! the [`TABLE_ENV`] environment variable.

use std::collections::HashSet;
use std::fs;
use std::hash::Hash;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::identity::Identity;

/// Environment variable holding the table path while the filter runs.
pub const TABLE_ENV: &str = "FAKIT_TABLE";

/// Separates fields within a table record.
const FIELD_SEPARATOR: char = '\u{1f}';

const AUTHORS_SCRIPT: &str = r#"# fakit author lookup, sourced by git filter-branch --env-filter
fakit_us=$(printf '\037')
while IFS="$fakit_us" read -r fakit_old_name fakit_old_email fakit_new_name fakit_new_email; do
    if [ "$GIT_AUTHOR_NAME" = "$fakit_old_name" ] && [ "$GIT_AUTHOR_EMAIL" = "$fakit_old_email" ]; then
        GIT_AUTHOR_NAME="$fakit_new_name"
        GIT_AUTHOR_EMAIL="$fakit_new_email"
        GIT_COMMITTER_NAME="$fakit_new_name"
        GIT_COMMITTER_EMAIL="$fakit_new_email"
        export GIT_AUTHOR_NAME GIT_AUTHOR_EMAIL GIT_COMMITTER_NAME GIT_COMMITTER_EMAIL
        break
    fi
done < "$FAKIT_TABLE"
"#;

const MESSAGES_SCRIPT: &str = r#"#!/bin/sh
# fakit message lookup, run by git filter-branch --msg-filter
fakit_us=$(printf '\037')
while IFS="$fakit_us" read -r fakit_hash fakit_message; do
    if [ "$fakit_hash" = "$GIT_COMMIT" ]; then
        printf '%s\n' "$fakit_message"
        exit 0
    fi
done < "$FAKIT_TABLE"
cat
"#;

const DATES_SCRIPT: &str = r#"# fakit date lookup, sourced by git filter-branch --env-filter
fakit_us=$(printf '\037')
while IFS="$fakit_us" read -r fakit_hash fakit_date; do
    if [ "$fakit_hash" = "$GIT_COMMIT" ]; then
        GIT_AUTHOR_DATE="$fakit_date"
        GIT_COMMITTER_DATE="$fakit_date"
        export GIT_AUTHOR_DATE GIT_COMMITTER_DATE
        break
    fi
done < "$FAKIT_TABLE"
"#;

/// Insertion-ordered map that refuses to repeat a key.
#[derive(Debug, Clone)]
pub struct ReplacementMap<K, V> {
    entries: Vec<(K, V)>,
    keys: HashSet<K>,
}

impl<K: Eq + Hash + Clone, V> ReplacementMap<K, V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            keys: HashSet::new(),
        }
    }

    /// Inserts `key -> value`. Returns `false` and keeps the first entry if
    /// `key` is already mapped.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        if !self.keys.insert(key.clone()) {
            return false;
        }
        self.entries.push((key, value));
        true
    }

    /// The value mapped to `key`, if any.
    pub fn get(&self, key: &K) -> Option<&V> {
        if !self.keys.contains(key) {
            return None;
        }
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Number of mapped keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no key is mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl<K: Eq + Hash + Clone, V> Default for ReplacementMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Which `filter-branch` hook a program plugs into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Sourced once per commit; exports `GIT_AUTHOR_*` / `GIT_COMMITTER_*`.
    Env,
    /// Run once per commit with the message on stdin; prints the new message.
    Msg,
}

impl FilterKind {
    /// The `filter-branch` option for this hook.
    pub fn flag(self) -> &'static str {
        match self {
            FilterKind::Env => "--env-filter",
            FilterKind::Msg => "--msg-filter",
        }
    }
}

/// A lookup script together with its replacement table.
#[derive(Debug, Clone)]
pub struct FilterProgram {
    kind: FilterKind,
    script: &'static str,
    table: String,
    records: usize,
}

impl FilterProgram {
    /// Env filter replacing author and committer identity for matching authors.
    pub fn authors(map: &ReplacementMap<Identity, Identity>) -> Result<Self> {
        let mut table = String::new();
        for (old, new) in map.iter() {
            push_record(
                &mut table,
                &[
                    ("author name", old.name.as_str()),
                    ("author email", old.email.as_str()),
                    ("new name", new.name.as_str()),
                    ("new email", new.email.as_str()),
                ],
            )?;
        }
        Ok(Self::new(FilterKind::Env, AUTHORS_SCRIPT, table, map.len()))
    }

    /// Message filter keyed by commit hash; unmatched commits keep their message.
    pub fn messages(map: &ReplacementMap<String, String>) -> Result<Self> {
        let mut table = String::new();
        for (hash, message) in map.iter() {
            push_record(
                &mut table,
                &[("commit hash", hash.as_str()), ("message", message.as_str())],
            )?;
        }
        Ok(Self::new(FilterKind::Msg, MESSAGES_SCRIPT, table, map.len()))
    }

    /// Env filter setting author and committer date of matching commits.
    pub fn dates(map: &ReplacementMap<String, i64>) -> Result<Self> {
        let mut table = String::new();
        for (hash, timestamp) in map.iter() {
            let date = format!("@{timestamp} +0000");
            push_record(
                &mut table,
                &[("commit hash", hash.as_str()), ("date", date.as_str())],
            )?;
        }
        Ok(Self::new(FilterKind::Env, DATES_SCRIPT, table, map.len()))
    }

    fn new(kind: FilterKind, script: &'static str, table: String, records: usize) -> Self {
        Self {
            kind,
            script,
            table,
            records,
        }
    }

    /// The hook this program plugs into.
    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    /// Text of the lookup script.
    pub fn script(&self) -> &str {
        self.script
    }

    /// Replacement records, one per line.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Number of replacement records.
    pub fn len(&self) -> usize {
        self.records
    }

    /// True when the table has no records.
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Writes `filter.sh` (mode 0755) and `table` into `dir`.
    ///
    /// Returns `(script_path, table_path)`.
    pub fn write_to(&self, dir: &Path) -> Result<(PathBuf, PathBuf)> {
        let script_path = dir.join("filter.sh");
        let table_path = dir.join("table");
        fs::write(&script_path, self.script)?;
        fs::write(&table_path, &self.table)?;
        make_executable(&script_path)?;
        Ok((script_path, table_path))
    }

    /// The command text `filter-branch` evaluates to run the script at `script_path`.
    pub fn invocation(&self, script_path: &Path) -> String {
        let quoted = shell_quote(&script_path.to_string_lossy());
        match self.kind {
            FilterKind::Env => format!(". {quoted}"),
            FilterKind::Msg => quoted,
        }
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

fn push_record(table: &mut String, fields: &[(&'static str, &str)]) -> Result<()> {
    for (i, &(field, value)) in fields.iter().enumerate() {
        if value
            .chars()
            .any(|c| matches!(c, '\n' | '\r' | '\0') || c == FIELD_SEPARATOR)
        {
            return Err(Error::UnencodableValue {
                field,
                value: value.to_string(),
            });
        }
        if i > 0 {
            table.push(FIELD_SEPARATOR);
        }
        table.push_str(value);
    }
    table.push('\n');
    Ok(())
}

/// Wraps `s` in single quotes for POSIX `sh`.
pub(crate) fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
