use std::collections::BTreeSet;

use rand::{Rng, seq::IndexedRandom};
use thiserror::Error;

use crate::dao::models::RevealMode;

/// Longest secret accepted from the host, in characters.
pub const MAX_SECRET_CHARS: usize = 50;
const PLACEHOLDER: char = '_';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordError {
    #[error("password cannot be empty")]
    Empty,
    #[error("password cannot exceed {MAX_SECRET_CHARS} characters")]
    TooLong,
}

/// Secret phrase of an event and the character positions already disclosed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordState {
    secret: String,
    revealed: BTreeSet<usize>,
    pub mode: RevealMode,
}

impl PasswordState {
    /// Wrap an already normalised secret with nothing revealed.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            revealed: BTreeSet::new(),
            mode: RevealMode::Auto,
        }
    }

    /// Restore a persisted state; indices outside the secret are dropped.
    pub fn restore(secret: String, revealed: impl IntoIterator<Item = usize>, mode: RevealMode) -> Self {
        let len = secret.chars().count();
        Self {
            revealed: revealed.into_iter().filter(|index| *index < len).collect(),
            secret,
            mode,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn revealed(&self) -> &BTreeSet<usize> {
        &self.revealed
    }

    /// Replace the secret (trimmed and upper-cased) and hide every position again.
    pub fn set_secret(&mut self, raw: &str) -> Result<(), PasswordError> {
        let secret = raw.trim().to_uppercase();
        if secret.is_empty() {
            return Err(PasswordError::Empty);
        }
        if secret.chars().count() > MAX_SECRET_CHARS {
            return Err(PasswordError::TooLong);
        }
        self.secret = secret;
        self.revealed.clear();
        Ok(())
    }

    /// Client-visible projection: spaces render as two blanks, hidden characters as `_`.
    pub fn display(&self) -> String {
        let mut out = String::with_capacity(self.secret.len() * 2);
        for (index, ch) in self.secret.chars().enumerate() {
            if ch == ' ' {
                out.push_str("  ");
            } else if self.revealed.contains(&index) {
                out.push(ch);
            } else {
                out.push(PLACEHOLDER);
            }
        }
        out
    }

    /// Positions that are neither spaces nor already revealed.
    pub fn hidden_indices(&self) -> Vec<usize> {
        self.secret
            .chars()
            .enumerate()
            .filter(|(index, ch)| *ch != ' ' && !self.revealed.contains(index))
            .map(|(index, _)| index)
            .collect()
    }

    /// Reveal one hidden position chosen uniformly at random.
    pub fn reveal_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        let index = *self.hidden_indices().choose(rng)?;
        self.revealed.insert(index);
        Some(index)
    }

    /// Union `indices` into the revealed set, ignoring positions outside the secret.
    ///
    /// Returns how many positions became visible.
    pub fn reveal_manual(&mut self, indices: &[usize]) -> usize {
        let len = self.secret.chars().count();
        indices
            .iter()
            .filter(|index| **index < len)
            .filter(|index| self.revealed.insert(**index))
            .count()
    }

    /// Forget every revealed position.
    pub fn hide_all(&mut self) {
        self.revealed.clear();
    }
}
