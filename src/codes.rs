// 🎲 Code Generator - random `WED-XXXXXX` invitation codes
//
// Generation is pure; uniqueness is enforced by the registry, which
// retries a bounded number of times against the UNIQUE(code) constraint.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

pub const CODE_PREFIX: &str = "WED-";
pub const CODE_SUFFIX_LEN: usize = 6;
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

enum Source {
    Random(StdRng),
    #[cfg(test)]
    Fixed(Vec<String>, usize),
}

pub struct CodeGenerator {
    source: Mutex<Source>,
}

impl CodeGenerator {
    /// Generator seeded from OS entropy
    pub fn new() -> Self {
        CodeGenerator {
            source: Mutex::new(Source::Random(StdRng::from_entropy())),
        }
    }

    /// Deterministic generator (same seed, same sequence)
    pub fn seeded(seed: u64) -> Self {
        CodeGenerator {
            source: Mutex::new(Source::Random(StdRng::seed_from_u64(seed))),
        }
    }

    /// Cycles through the given codes forever
    #[cfg(test)]
    pub(crate) fn fixed(codes: &[&str]) -> Self {
        CodeGenerator {
            source: Mutex::new(Source::Fixed(
                codes.iter().map(|c| c.to_string()).collect(),
                0,
            )),
        }
    }

    /// Produce a candidate code: "WED-" + 6 chars drawn uniformly from [A-Z0-9]
    pub fn generate(&self) -> String {
        let mut source = match self.source.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        match &mut *source {
            Source::Random(rng) => {
                let suffix: String = (0..CODE_SUFFIX_LEN)
                    .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
                    .collect();
                format!("{}{}", CODE_PREFIX, suffix)
            }
            #[cfg(test)]
            Source::Fixed(codes, next) => {
                let code = codes[*next % codes.len()].clone();
                *next += 1;
                code
            }
        }
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Trim and upper-case user input so "wed-ab12cd " finds "WED-AB12CD"
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Check the `^WED-[A-Z0-9]{6}$` shape
pub fn is_well_formed(code: &str) -> bool {
    match code.strip_prefix(CODE_PREFIX) {
        Some(suffix) => {
            suffix.len() == CODE_SUFFIX_LEN && suffix.bytes().all(|b| CODE_ALPHABET.contains(&b))
        }
        None => false,
    }
}
