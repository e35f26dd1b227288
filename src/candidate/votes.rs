//! Window-local vote accumulation and ranking.

use crate::candidate::HashTableCandidate;
use crate::template::TemplateId;
use std::collections::HashMap;

/// Order among candidates with equal vote counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoteTieBreak {
    /// The template that received its first vote earlier ranks first.
    #[default]
    FirstVote,
    /// The lower template id ranks first.
    TemplateId,
}

/// Vote counts of one window query.
#[derive(Debug, Default)]
pub(crate) struct VoteAccumulator {
    candidates: Vec<HashTableCandidate>,
    index: HashMap<TemplateId, usize>,
}

impl VoteAccumulator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn vote(&mut self, template: TemplateId) {
        let slot = *self.index.entry(template).or_insert_with(|| {
            self.candidates.push(HashTableCandidate::new(template, 0));
            self.candidates.len() - 1
        });
        self.candidates[slot].vote();
    }

    /// Candidates with at least `min_votes`, best first.
    pub(crate) fn into_ranked(self, min_votes: u32, tie_break: VoteTieBreak) -> Vec<HashTableCandidate> {
        let mut kept: Vec<HashTableCandidate> = self
            .candidates
            .into_iter()
            .filter(|c| c.votes() >= min_votes)
            .collect();
        // Stable sort: equal keys keep first-vote order.
        kept.sort_by(|a, b| match tie_break {
            VoteTieBreak::FirstVote => b.votes().cmp(&a.votes()),
            VoteTieBreak::TemplateId => b
                .votes()
                .cmp(&a.votes())
                .then_with(|| a.template().cmp(&b.template())),
        });
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::{VoteAccumulator, VoteTieBreak};
    use crate::template::TemplateId;

    fn accumulate(order: &[usize]) -> VoteAccumulator {
        let mut acc = VoteAccumulator::new();
        for &id in order {
            acc.vote(TemplateId(id));
        }
        acc
    }

    #[test]
    fn ranking_drops_templates_below_threshold() {
        let ranked = accumulate(&[1, 2, 2, 3, 3, 3]).into_ranked(2, VoteTieBreak::FirstVote);
        let ids: Vec<usize> = ranked.iter().map(|c| c.template().0).collect();
        assert_eq!(ids, vec![3, 2]);
        assert!(ranked.iter().all(|c| c.votes() >= 2));
    }

    #[test]
    fn first_vote_tie_break_keeps_arrival_order() {
        let ranked = accumulate(&[7, 2, 7, 2]).into_ranked(1, VoteTieBreak::FirstVote);
        let ids: Vec<usize> = ranked.iter().map(|c| c.template().0).collect();
        assert_eq!(ids, vec![7, 2]);
    }

    #[test]
    fn template_id_tie_break_orders_by_id() {
        let ranked = accumulate(&[7, 2, 7, 2]).into_ranked(1, VoteTieBreak::TemplateId);
        let ids: Vec<usize> = ranked.iter().map(|c| c.template().0).collect();
        assert_eq!(ids, vec![2, 7]);
    }
}
