use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::{Error, Result};

/// A `(name, email)` pair attributed to a commit's author or committer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    /// Builds an identity from a display name and email.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

const FIRST_NAMES: &[&str] = &[
    "Aaron", "Abigail", "Adam", "Adrian", "Alice", "Amanda", "Andrew", "Angela", "Anthony",
    "Ashley", "Benjamin", "Brandon", "Brenda", "Brian", "Caroline", "Carlos", "Catherine",
    "Charles", "Christina", "Daniel", "David", "Deborah", "Diana", "Donna", "Edward", "Elena",
    "Emily", "Eric", "Felix", "Fiona", "Frank", "Gabriel", "Grace", "Gregory", "Hannah",
    "Henry", "Isabel", "Jacob", "James", "Jennifer", "Jessica", "Jonathan", "Joseph", "Julia",
    "Karen", "Kevin", "Laura", "Leah", "Linda", "Lucas", "Margaret", "Maria", "Matthew",
    "Megan", "Michael", "Nathan", "Nicole", "Olivia", "Oscar", "Patricia", "Paul", "Rachel",
    "Rebecca", "Richard", "Robert", "Samantha", "Samuel", "Sarah", "Sophia", "Stephen",
    "Teresa", "Thomas", "Tyler", "Victoria", "William", "Zachary",
];

const LAST_NAMES: &[&str] = &[
    "Adams", "Allen", "Alvarez", "Anderson", "Bailey", "Baker", "Bennett", "Brooks", "Brown",
    "Campbell", "Carter", "Castillo", "Clark", "Collins", "Cook", "Cooper", "Davis", "Diaz",
    "Edwards", "Evans", "Fisher", "Flores", "Foster", "Garcia", "Gomez", "Gonzalez", "Gray",
    "Green", "Hall", "Harris", "Hayes", "Hernandez", "Hill", "Howard", "Hughes", "Jackson",
    "James", "Jenkins", "Johnson", "Jones", "Kelly", "King", "Lee", "Lewis", "Long", "Lopez",
    "Martin", "Martinez", "Miller", "Mitchell", "Moore", "Morgan", "Morris", "Murphy",
    "Nelson", "Nguyen", "Parker", "Perez", "Phillips", "Powell", "Price", "Ramirez", "Reed",
    "Rivera", "Roberts", "Robinson", "Rogers", "Ross", "Sanchez", "Scott", "Smith",
    "Stewart", "Sullivan", "Taylor", "Thomas", "Thompson", "Torres", "Turner", "Walker",
    "Ward", "Watson", "White", "Williams", "Wilson", "Wood", "Wright", "Young",
];

const DOMAIN_WORDS: &[&str] = &[
    "acme", "apex", "atlas", "beacon", "bright", "cedar", "cobalt", "crest", "delta", "ember",
    "fable", "forge", "granite", "harbor", "horizon", "ivory", "juniper", "keystone", "lumen",
    "maple", "meridian", "nimbus", "north", "oak", "orbit", "pioneer", "quartz", "ridge",
    "river", "summit", "tidal", "vertex", "willow", "zenith",
];

const TLDS: &[&str] = &["com", "net", "org", "io", "biz", "info"];

/// Derives a lowercase `first.last@domain` address from a display name.
///
/// Only the first two whitespace-separated tokens of `name` are used.
///
/// # Errors
///
/// Returns [`Error::InvalidNameFormat`] when `name` has fewer than two tokens.
pub fn email_from_name(name: &str, domain: &str) -> Result<String> {
    let lower = name.to_lowercase();
    let mut tokens = lower.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(first), Some(last)) => Ok(format!("{first}.{last}@{domain}")),
        _ => Err(Error::InvalidNameFormat(name.to_string())),
    }
}

fn random_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Alex");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Smith");
    format!("{first} {last}")
}

fn random_domain<R: Rng + ?Sized>(rng: &mut R) -> String {
    let word = DOMAIN_WORDS.choose(rng).copied().unwrap_or("example");
    let tld = TLDS.choose(rng).copied().unwrap_or("com");
    if rng.gen_range(0..3) == 0 {
        let second = DOMAIN_WORDS.choose(rng).copied().unwrap_or("labs");
        format!("{word}-{second}.{tld}")
    } else {
        format!("{word}.{tld}")
    }
}

/// Generates a plausible replacement for `old`.
///
/// The result is never equal to `old`. Two calls may return the same identity.
pub fn generate<R: Rng + ?Sized>(rng: &mut R, old: &Identity) -> Result<Identity> {
    loop {
        let name = random_name(rng);
        let email = email_from_name(&name, &random_domain(rng))?;
        let candidate = Identity { name, email };
        if candidate != *old {
            return Ok(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn email_uses_first_two_tokens_lowercased() {
        let email = email_from_name("Jane Q Doe", "example.org").unwrap();
        assert_eq!(email, "jane.q@example.org");
    }

    #[test]
    fn email_rejects_single_token_name() {
        let err = email_from_name("Cher", "example.org").unwrap_err();
        assert!(matches!(err, Error::InvalidNameFormat(n) if n == "Cher"));
    }

    #[test]
    fn email_rejects_blank_name() {
        assert!(email_from_name("   ", "example.org").is_err());
    }

    #[test]
    fn generated_identity_is_well_formed() {
        let mut rng = StdRng::seed_from_u64(7);
        let old = Identity::new("Old Name", "old@x.com");
        for _ in 0..50 {
            let new = generate(&mut rng, &old).unwrap();
            assert!(new.name.split_whitespace().count() >= 2);
            assert_eq!(new.email, new.email.to_lowercase());
            let (local, domain) = new.email.split_once('@').unwrap();
            assert!(local.contains('.'));
            assert!(domain.contains('.'));
        }
    }

    #[test]
    fn generate_never_returns_the_input() {
        let mut rng = StdRng::seed_from_u64(42);
        let seed = generate(&mut rng, &Identity::new("A B", "a@b.c")).unwrap();
        // feed each generated identity back in as the "old" one
        let mut old = seed;
        for _ in 0..200 {
            let new = generate(&mut rng, &old).unwrap();
            assert_ne!(new, old);
            old = new;
        }
    }

    #[test]
    fn display_formats_like_git() {
        let id = Identity::new("Ada Lovelace", "ada@example.com");
        assert_eq!(id.to_string(), "Ada Lovelace <ada@example.com>");
    }
}
