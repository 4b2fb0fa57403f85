//! Maps free-form player utterances to choices in the current scene.
//!
//! Matching is a deliberately permissive three-pass heuristic. Passes run in
//! order and each pass walks the scene's choices in declared order; the first
//! hit wins:
//!
//! 1. **Exact** - the normalized utterance equals a choice id.
//! 2. **Anchored** - the choice id appears inside the utterance, or one of the
//!    first four words of the choice description does.
//! 3. **Keyword** - any word of the choice description appears inside the
//!    utterance.
//!
//! Matching is by substring, so a short description word such as "the" can
//! select a choice the player did not mean. That ambiguity is part of the
//! observable behavior and is pinned by tests rather than tightened here.

use crate::content::{Choice, Scene};
use serde::{Deserialize, Serialize};

/// Number of leading description words considered by the anchored pass.
const ANCHOR_WORDS: usize = 4;

/// Which pass produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPass {
    Exact,
    Anchored,
    Keyword,
}

/// Outcome of resolving one utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    Resolved { choice: &'a Choice, pass: MatchPass },
    Unresolved,
}

impl<'a> Resolution<'a> {
    pub fn choice(&self) -> Option<&'a Choice> {
        match self {
            Resolution::Resolved { choice, .. } => Some(choice),
            Resolution::Unresolved => None,
        }
    }

    pub fn choice_id(&self) -> Option<&'a str> {
        self.choice().map(|c| c.id.as_str())
    }

    pub fn pass(&self) -> Option<MatchPass> {
        match self {
            Resolution::Resolved { pass, .. } => Some(*pass),
            Resolution::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved { .. })
    }
}

/// Resolves utterances against a scene. Stateless and deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionResolver;

impl ActionResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve<'a>(&self, scene: &'a Scene, utterance: &str) -> Resolution<'a> {
        let utterance = normalize(utterance);

        if let Some(choice) = scene.choices.iter().find(|c| c.id == utterance) {
            return Resolution::Resolved {
                choice,
                pass: MatchPass::Exact,
            };
        }

        if let Some(choice) = scene
            .choices
            .iter()
            .find(|c| anchored_match(c, &utterance))
        {
            return Resolution::Resolved {
                choice,
                pass: MatchPass::Anchored,
            };
        }

        if let Some(choice) = scene
            .choices
            .iter()
            .find(|c| keyword_match(c, &utterance))
        {
            return Resolution::Resolved {
                choice,
                pass: MatchPass::Keyword,
            };
        }

        Resolution::Unresolved
    }
}

/// Lowercase and trim an utterance.
pub fn normalize(utterance: &str) -> String {
    utterance.trim().to_lowercase()
}

fn anchored_match(choice: &Choice, utterance: &str) -> bool {
    if utterance.contains(choice.id.as_str()) {
        return true;
    }
    choice
        .description
        .to_lowercase()
        .split_whitespace()
        .take(ANCHOR_WORDS)
        .any(|word| utterance.contains(word))
}

fn keyword_match(choice: &Choice, utterance: &str) -> bool {
    choice
        .description
        .to_lowercase()
        .split_whitespace()
        .any(|word| utterance.contains(word))
}
