//! Style selection.
//!
//! Channels run in one of two selection modes. RANDOM picks uniformly from
//! the enabled set; AI_ASSISTED trusts the detector's hint when it names an
//! enabled style and falls back to RANDOM otherwise. Regrants prefer styles
//! the quote has not used yet and only repeat after the set is exhausted.

use std::collections::HashSet;

use rand::Rng;

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Per-channel style selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleMode {
    Random,
    AiAssisted,
}

impl StyleMode {
    /// Database representation.
    pub fn as_str(self) -> &'static str {
        match self {
            StyleMode::Random => "random",
            StyleMode::AiAssisted => "ai_assisted",
        }
    }

    /// Parse the database representation. Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "random" => Some(StyleMode::Random),
            "ai_assisted" => Some(StyleMode::AiAssisted),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Pick one style from `enabled` according to `mode`.
///
/// Returns `None` only when `enabled` is empty; a channel with zero
/// enabled styles cannot be serviced.
pub fn select_style(enabled: &[DbId], mode: StyleMode, hint: Option<DbId>) -> Option<DbId> {
    if enabled.is_empty() {
        return None;
    }
    if mode == StyleMode::AiAssisted {
        if let Some(h) = hint {
            if enabled.contains(&h) {
                return Some(h);
            }
        }
    }
    let mut rng = rand::rng();
    Some(enabled[rng.random_range(0..enabled.len())])
}

/// Candidate set for a follow-up attempt on an existing quote.
///
/// Prefers enabled styles the quote has not used; once every enabled style
/// has been used, falls back to the full enabled set (cycle, don't starve).
pub fn regrant_candidates(enabled: &[DbId], used: &HashSet<DbId>) -> Vec<DbId> {
    let unused: Vec<DbId> = enabled.iter().copied().filter(|id| !used.contains(id)).collect();
    if unused.is_empty() {
        enabled.to_vec()
    } else {
        unused
    }
}

/// Pick one unused style for a regrant, repeating only after exhaustion.
pub fn select_regrant_style(enabled: &[DbId], used: &HashSet<DbId>) -> Option<DbId> {
    let candidates = regrant_candidates(enabled, used);
    select_style(&candidates, StyleMode::Random, None)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
