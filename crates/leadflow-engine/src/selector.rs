// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Weighted-random selection with a deterministic round-robin fallback.
//!
//! Standard roulette-wheel selection: draw `r` uniformly from `[0, S)` where
//! `S` is the weight sum, then walk the candidates in slice order
//! accumulating weight until the cumulative sum exceeds `r`. Strictly
//! increasing cumulative sums give every candidate with weight > 0 a
//! selection probability of exactly `weight / S`.
//!
//! When weights are degenerate (all zero), a process-local cursor rotates
//! through the candidates so configuration-free deployments still make
//! forward progress. The cursor is best-effort state: it does not survive
//! restarts and is not shared across instances, which is acceptable because
//! round-robin is only a tie-break, never a correctness requirement.

use std::sync::atomic::{AtomicUsize, Ordering};

use leadflow_core::{Agent, AgentId};
use rand::Rng;

/// An eligible agent and its clamped weight.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub agent: Agent,
    pub weight: u32,
}

/// Which path produced a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Weighted(AgentId),
    RoundRobin(AgentId),
}

impl Selection {
    /// The selected agent, regardless of path.
    pub fn agent_id(self) -> AgentId {
        match self {
            Selection::Weighted(id) | Selection::RoundRobin(id) => id,
        }
    }
}

/// Process-local fallback cursor, advanced by one (mod candidate count) on
/// every degenerate-weight pick.
#[derive(Debug, Default)]
pub struct RoundRobinCursor(AtomicUsize);

impl RoundRobinCursor {
    pub fn new() -> Self {
        Self::default()
    }

    fn advance(&self, len: usize) -> usize {
        self.0.fetch_add(1, Ordering::Relaxed) % len
    }
}

/// Pick one candidate. Returns `None` for an empty slice; the caller decides
/// disposition (requeue).
pub fn pick<R: Rng>(
    candidates: &[Candidate],
    cursor: &RoundRobinCursor,
    rng: &mut R,
) -> Option<Selection> {
    if candidates.is_empty() {
        return None;
    }

    let total: u64 = candidates.iter().map(|c| u64::from(c.weight)).sum();
    if total == 0 {
        let idx = cursor.advance(candidates.len());
        return Some(Selection::RoundRobin(candidates[idx].agent.id));
    }

    let r = rng.gen_range(0..total);
    let mut cumulative = 0u64;
    for candidate in candidates {
        cumulative += u64::from(candidate.weight);
        if r < cumulative {
            return Some(Selection::Weighted(candidate.agent.id));
        }
    }

    // Unreachable: r < total and the final cumulative sum equals total.
    Some(Selection::Weighted(candidates[candidates.len() - 1].agent.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadflow_core::AgentRole;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn make_candidate(handle: &str, weight: u32) -> Candidate {
        let now = chrono::Utc::now();
        Candidate {
            agent: leadflow_core::Agent {
                id: AgentId::new(),
                handle: handle.to_string(),
                display_name: None,
                role: AgentRole::Sales,
                online: true,
                last_seen: now,
                created_at: now,
            },
            weight,
        }
    }

    #[test]
    fn empty_candidates_yield_none() {
        let cursor = RoundRobinCursor::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(pick(&[], &cursor, &mut rng).is_none());
    }

    #[test]
    fn single_candidate_always_wins() {
        let cursor = RoundRobinCursor::new();
        let mut rng = StdRng::seed_from_u64(2);
        let candidates = vec![make_candidate("solo", 10)];
        for _ in 0..50 {
            let selection = pick(&candidates, &cursor, &mut rng).unwrap();
            assert_eq!(selection.agent_id(), candidates[0].agent.id);
        }
    }

    #[test]
    fn zero_weight_candidate_is_never_selected() {
        let cursor = RoundRobinCursor::new();
        let mut rng = StdRng::seed_from_u64(3);
        let candidates = vec![
            make_candidate("weighted", 5),
            make_candidate("zero", 0),
        ];
        for _ in 0..1000 {
            let selection = pick(&candidates, &cursor, &mut rng).unwrap();
            assert_eq!(selection.agent_id(), candidates[0].agent.id);
        }
    }

    /// Weighted fairness: selection frequencies converge to w_i / sum(w)
    /// within chi-square tolerance over 10 000 draws.
    #[test]
    fn weighted_selection_matches_configured_proportions() {
        let cursor = RoundRobinCursor::new();
        let mut rng = StdRng::seed_from_u64(42);
        let candidates = vec![
            make_candidate("a", 50),
            make_candidate("b", 30),
            make_candidate("c", 20),
        ];

        const DRAWS: u32 = 10_000;
        let mut observed: HashMap<AgentId, u32> = HashMap::new();
        for _ in 0..DRAWS {
            let selection = pick(&candidates, &cursor, &mut rng).unwrap();
            assert!(matches!(selection, Selection::Weighted(_)));
            *observed.entry(selection.agent_id()).or_default() += 1;
        }

        // Chi-square with df = 2; critical value at p = 0.001 is 13.82.
        let total_weight: f64 = 100.0;
        let mut chi_square = 0.0;
        for candidate in &candidates {
            let expected = f64::from(DRAWS) * f64::from(candidate.weight) / total_weight;
            let got = f64::from(*observed.get(&candidate.agent.id).unwrap_or(&0));
            chi_square += (got - expected).powi(2) / expected;
        }
        assert!(
            chi_square < 13.82,
            "selection frequencies diverge from weights: chi2 = {chi_square:.2}, {observed:?}"
        );
    }

    /// Round-robin fallback determinism: K consecutive picks over all-zero
    /// weights visit each candidate exactly once, in list order.
    #[test]
    fn all_zero_weights_round_robin_in_list_order() {
        let cursor = RoundRobinCursor::new();
        let mut rng = StdRng::seed_from_u64(4);
        let candidates: Vec<Candidate> = (0..5)
            .map(|i| make_candidate(&format!("agent-{i}"), 0))
            .collect();

        for round in 0..3 {
            for (i, candidate) in candidates.iter().enumerate() {
                let selection = pick(&candidates, &cursor, &mut rng).unwrap();
                assert_eq!(
                    selection,
                    Selection::RoundRobin(candidate.agent.id),
                    "round {round}, position {i}"
                );
            }
        }
    }

    proptest::proptest! {
        /// The selector always returns a member of the candidate set.
        #[test]
        fn pick_returns_a_member(weights in proptest::collection::vec(0u32..=100, 1..8), seed in 0u64..1000) {
            let candidates: Vec<Candidate> = weights
                .iter()
                .enumerate()
                .map(|(i, w)| make_candidate(&format!("p-{i}"), *w))
                .collect();
            let cursor = RoundRobinCursor::new();
            let mut rng = StdRng::seed_from_u64(seed);

            let selection = pick(&candidates, &cursor, &mut rng).unwrap();
            let id = selection.agent_id();
            proptest::prop_assert!(candidates.iter().any(|c| c.agent.id == id));

            // A weighted selection never lands on a zero-weight candidate.
            if let Selection::Weighted(id) = selection {
                let winner = candidates.iter().find(|c| c.agent.id == id).unwrap();
                proptest::prop_assert!(winner.weight > 0);
            }
        }
    }
}
