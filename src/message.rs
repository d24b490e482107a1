//! Fake commit messages from a word-level Markov chain.
//!
//! The chain is built from a newline-delimited corpus where every line is one
//! example commit message. Generated sentences that reproduce too much of a
//! corpus line are rejected, and after [`MAX_TRIES`] rejected walks the
//! generator falls back to [`FALLBACK_MESSAGE`].

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Returned when the chain cannot produce an acceptable sentence.
pub const FALLBACK_MESSAGE: &str = "Update project files";

/// File name of the bundled corpus.
pub const CORPUS_FILE_NAME: &str = "good_commits.txt";

/// The bundled corpus, compiled in.
pub const BUNDLED_CORPUS: &str = include_str!("../data/good_commits.txt");

const MAX_TRIES: usize = 10;
const MAX_WORDS: usize = 64;
const MAX_OVERLAP_RATIO: f64 = 0.7;
const MAX_OVERLAP_TOTAL: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Token {
    Begin,
    Word(String),
    End,
}

type State = (Token, Token);

/// A Markov chain of state size two over the words of a corpus.
#[derive(Debug, Clone)]
pub struct MessageModel {
    // followers are stored with repetition, so a uniform pick is frequency-weighted
    chain: HashMap<State, Vec<Token>>,
    lines: Vec<String>,
}

impl MessageModel {
    /// Builds a model from newline-delimited example sentences.
    pub fn build(corpus: &str) -> Self {
        let mut chain: HashMap<State, Vec<Token>> = HashMap::new();
        let mut lines = Vec::new();

        for line in corpus.lines() {
            let words: Vec<&str> = line.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }
            lines.push(words.join(" "));

            let mut tokens = vec![Token::Begin, Token::Begin];
            tokens.extend(words.iter().map(|w| Token::Word((*w).to_string())));
            tokens.push(Token::End);

            for window in tokens.windows(3) {
                let state = (window[0].clone(), window[1].clone());
                chain.entry(state).or_default().push(window[2].clone());
            }
        }

        debug!(
            lines = lines.len(),
            states = chain.len(),
            "built commit message model"
        );
        Self { chain, lines }
    }

    /// Reads a corpus file and builds a model from it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorpusNotFound`] if the file cannot be read.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).map_err(|_| Error::CorpusNotFound(path.to_path_buf()))?;
        Ok(Self::build(&text))
    }

    /// Builds a model from [`BUNDLED_CORPUS`].
    pub fn bundled() -> Self {
        Self::build(BUNDLED_CORPUS)
    }

    /// Loads the corpus [`locate_corpus`] finds, falling back to the bundled one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorpusNotFound`] if `explicit` is given but unreadable.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match locate_corpus(explicit)? {
            Some(path) => {
                info!(path = %path.display(), "loading commit message corpus");
                Self::from_file(&path)
            }
            None => {
                info!("using bundled commit message corpus");
                Ok(Self::bundled())
            }
        }
    }

    /// Produces one trimmed, single-line, non-empty commit message.
    pub fn next<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        for _ in 0..MAX_TRIES {
            if let Some(sentence) = self.walk(rng) {
                if self.is_acceptable(&sentence) {
                    return sentence;
                }
            }
        }
        FALLBACK_MESSAGE.to_string()
    }

    fn walk<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<String> {
        let mut state = (Token::Begin, Token::Begin);
        let mut words: Vec<&str> = Vec::new();

        loop {
            let next = self.chain.get(&state)?.choose(rng)?;
            match next {
                Token::End => break,
                Token::Word(w) => {
                    words.push(w);
                    if words.len() > MAX_WORDS {
                        return None;
                    }
                }
                Token::Begin => return None,
            }
            state = (state.1, next.clone());
        }

        let sentence = words.join(" ");
        let trimmed = sentence.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Rejects sentences that copy a long run of words from a single corpus line.
    fn is_acceptable(&self, sentence: &str) -> bool {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        if words.is_empty() {
            return false;
        }

        let ratio = (MAX_OVERLAP_RATIO * words.len() as f64).round() as usize;
        let overlap = ratio.min(MAX_OVERLAP_TOTAL);
        let width = (overlap + 1).min(words.len());

        !words.windows(width).any(|gram| {
            let needle = format!(" {} ", gram.join(" "));
            self.lines
                .iter()
                .any(|line| format!(" {line} ").contains(&needle))
        })
    }
}

/// Finds a commit message corpus on disk.
///
/// An explicit path wins and is never substituted: if it does not exist the
/// lookup fails. Otherwise `good_commits.txt` is searched next to the
/// executable and in a `data/` directory beside it. `Ok(None)` means no file
/// was found and the corpus compiled into the binary should be used.
///
/// # Errors
///
/// Returns [`Error::CorpusNotFound`] if the explicit path is not a file.
pub fn locate_corpus(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(Some(path.to_path_buf()))
        } else {
            Err(Error::CorpusNotFound(path.to_path_buf()))
        };
    }

    let Some(dir) = env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
    else {
        return Ok(None);
    };

    for candidate in [
        dir.join(CORPUS_FILE_NAME),
        dir.join("data").join(CORPUS_FILE_NAME),
    ] {
        debug!(path = %candidate.display(), "looking for corpus");
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}
