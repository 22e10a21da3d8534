//! Refinement Gate: decides whether the Refiner runs and on which candidates.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::pipeline::scorer::ScoreMap;

/// Candidates scoring strictly below this are refined.
pub const REFINEMENT_THRESHOLD: f64 = 0.7;

/// One piece of human feedback. `candidate_index` scopes it to a single candidate
/// of the current request; unscoped notes apply to every candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackNote {
    pub text: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub candidate_index: Option<usize>,
    /// Loaded from storage rather than supplied with this request.
    #[serde(skip)]
    pub from_history: bool,
}

impl FeedbackNote {
    pub fn applies_to(&self, index: usize) -> bool {
        self.candidate_index.map_or(true, |i| i == index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackContext {
    #[serde(default)]
    pub notes: Vec<FeedbackNote>,
}

impl FeedbackContext {
    /// Notes with non-blank text.
    pub fn active(&self) -> impl Iterator<Item = &FeedbackNote> {
        self.notes.iter().filter(|n| !n.text.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.active().next().is_none()
    }

    /// Feedback lines relevant to one candidate, request notes first.
    pub fn lines_for(&self, index: usize) -> Vec<String> {
        let mut notes: Vec<&FeedbackNote> = self.active().filter(|n| n.applies_to(index)).collect();
        notes.sort_by_key(|n| n.from_history);
        notes.into_iter().map(|n| n.text.trim().to_string()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementTrigger {
    Feedback,
    LowScores,
    FeedbackAndLowScores,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefinementDecision {
    pub refine: bool,
    pub affected: BTreeSet<usize>,
    pub trigger: Option<RefinementTrigger>,
}

/// Gate decision over the candidates in `indices`.
///
/// Low scores flag exactly the candidates below `REFINEMENT_THRESHOLD`; candidates
/// absent from a partial map are not flagged. Feedback flags every candidate
/// unless all of its notes are scoped, in which case only the named candidates
/// are flagged. Both sets are unioned.
pub fn needs_refinement(
    scores: Option<&ScoreMap>,
    feedback: Option<&FeedbackContext>,
    indices: &[usize],
) -> RefinementDecision {
    let low: BTreeSet<usize> = match scores {
        Some(scores) => indices
            .iter()
            .copied()
            .filter(|&i| scores.get(i).is_some_and(|s| s < REFINEMENT_THRESHOLD))
            .collect(),
        None => BTreeSet::new(),
    };

    let feedback_flagged: BTreeSet<usize> = match feedback {
        Some(feedback) if !feedback.is_empty() => {
            let all_scoped = feedback.active().all(|n| n.candidate_index.is_some());
            if all_scoped {
                indices
                    .iter()
                    .copied()
                    .filter(|&i| feedback.active().any(|n| n.candidate_index == Some(i)))
                    .collect()
            } else {
                indices.iter().copied().collect()
            }
        }
        _ => BTreeSet::new(),
    };

    let trigger = match (!feedback_flagged.is_empty(), !low.is_empty()) {
        (true, true) => Some(RefinementTrigger::FeedbackAndLowScores),
        (true, false) => Some(RefinementTrigger::Feedback),
        (false, true) => Some(RefinementTrigger::LowScores),
        (false, false) => None,
    };

    let affected: BTreeSet<usize> = feedback_flagged.union(&low).copied().collect();
    RefinementDecision {
        refine: !affected.is_empty(),
        affected,
        trigger,
    }
}
