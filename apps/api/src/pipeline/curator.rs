//! Curator: picks the winning candidate.

use serde::Serialize;
use tracing::{info, warn};

use crate::pipeline::candidates::Candidate;
use crate::pipeline::scorer::ScoreMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub rank: usize,
    pub index: usize,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub winner: Candidate,
    /// Empty when the fallback was used.
    pub rankings: Vec<Ranking>,
    pub fallback: bool,
}

/// Highest score wins, ties go to the lowest index. Without usable scores the
/// lowest surviving index wins. `None` only for an empty candidate list.
pub fn select(candidates: &[Candidate], scores: Option<&ScoreMap>) -> Option<Selection> {
    let mut scored: Vec<(usize, f64)> = scores
        .map(|scores| {
            candidates
                .iter()
                .filter_map(|c| scores.get(c.index).map(|s| (c.index, s)))
                .collect()
        })
        .unwrap_or_default();

    if scored.is_empty() {
        let winner = candidates.iter().min_by_key(|c| c.index)?.clone();
        warn!(
            "No usable scores, falling back to candidate {}",
            winner.index
        );
        return Some(Selection {
            winner,
            rankings: Vec::new(),
            fallback: true,
        });
    }

    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let rankings: Vec<Ranking> = scored
        .iter()
        .enumerate()
        .map(|(i, &(index, score))| Ranking {
            rank: i + 1,
            index,
            score,
        })
        .collect();

    let best = rankings[0].index;
    let winner = candidates.iter().find(|c| c.index == best)?.clone();
    for r in &rankings {
        info!("Rank {} | candidate {} | score={:.3}", r.rank, r.index, r.score);
    }

    Some(Selection {
        winner,
        rankings,
        fallback: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::candidate;

    fn scores(pairs: &[(usize, f64)]) -> ScoreMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_highest_score_wins() {
        let candidates = vec![candidate(0), candidate(1), candidate(2)];
        let selection = select(&candidates, Some(&scores(&[(0, 0.8), (1, 0.65), (2, 0.9)]))).unwrap();

        assert_eq!(selection.winner.index, 2);
        assert!(!selection.fallback);
        let order: Vec<usize> = selection.rankings.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![2, 0, 1]);
        assert_eq!(selection.rankings[0].rank, 1);
    }

    #[test]
    fn test_ties_go_to_lowest_index() {
        let candidates = vec![candidate(0), candidate(1), candidate(2)];
        let selection = select(&candidates, Some(&scores(&[(0, 0.7), (1, 0.9), (2, 0.9)]))).unwrap();
        assert_eq!(selection.winner.index, 1);
    }

    #[test]
    fn test_missing_scores_fall_back_to_index_zero() {
        let candidates = vec![candidate(0), candidate(1)];
        let selection = select(&candidates, None).unwrap();
        assert_eq!(selection.winner.index, 0);
        assert!(selection.fallback);
        assert!(selection.rankings.is_empty());
    }

    #[test]
    fn test_fallback_uses_lowest_surviving_index() {
        let candidates = vec![candidate(1), candidate(3)];
        let selection = select(&candidates, None).unwrap();
        assert_eq!(selection.winner.index, 1);
    }

    #[test]
    fn test_unscored_candidates_are_not_eligible() {
        let candidates = vec![candidate(0), candidate(1)];
        let selection = select(&candidates, Some(&scores(&[(1, 0.2)]))).unwrap();
        assert_eq!(selection.winner.index, 1);
        assert_eq!(selection.rankings.len(), 1);
    }

    #[test]
    fn test_empty_candidates_select_nothing() {
        assert!(select(&[], None).is_none());
    }
}
