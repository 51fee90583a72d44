//! Selection of assignments to drop from a category.
//!
//! Both strategies are pure: they take the assignment list and return the
//! indices to remove in descending order, so callers can remove them one by one
//! without shifting the positions still to be removed.

use std::collections::HashSet;

use crate::gradebook::types::Assignment;

/// Upper bound on refinement rounds for [`DropStrategy::Optimal`]. The kept
/// set stabilizes in a handful of rounds for realistic gradebooks.
const MAX_ITERATIONS: usize = 64;

/// How a category chooses which assignments to drop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DropStrategy {
    /// Slot-based streaming selection. Every candidate is ranked by the score
    /// the category would have if that one assignment alone were removed from
    /// the full totals. Matches the best choice for a single drop but can miss
    /// the best combination when dropping several.
    #[default]
    Greedy,
    /// Exact maximization of the remaining `got / possible` ratio.
    Optimal,
}

impl DropStrategy {
    /// Indices to remove, highest first. `how_many` is clamped to the number of
    /// assignments.
    pub fn select(self, assignments: &[Assignment], how_many: usize) -> Vec<usize> {
        match self {
            DropStrategy::Greedy => greedy_selection(assignments, how_many),
            DropStrategy::Optimal => optimal_selection(assignments, how_many),
        }
    }
}

fn totals(assignments: &[Assignment]) -> (f64, f64) {
    assignments.iter().fold((0.0, 0.0), |(got, possible), a| {
        (got + a.points_got, possible + a.points_possible)
    })
}

/// Category ratio if `a` alone were removed from the given totals.
///
/// Removing the last possible points leaves nothing to grade, which is ranked
/// below every real outcome.
fn score_if_removed(total_got: f64, total_possible: f64, a: &Assignment) -> f64 {
    let remaining = total_possible - a.points_possible;
    if remaining == 0.0 {
        return f64::NEG_INFINITY;
    }
    (total_got - a.points_got) / remaining
}

/// Streaming selection over `how_many` removal slots.
///
/// Empty slots are filled first, in slot order. Once all are taken a candidate
/// evicts the first slot holding the lowest score-if-removed, and only when it
/// is strictly higher. Scores are always computed against the full totals.
pub fn greedy_selection(assignments: &[Assignment], how_many: usize) -> Vec<usize> {
    let how_many = how_many.min(assignments.len());
    let (total_got, total_possible) = totals(assignments);
    let mut slots: Vec<Option<(f64, usize)>> = vec![None; how_many];

    for (i, a) in assignments.iter().enumerate() {
        let score = score_if_removed(total_got, total_possible, a);

        if let Some(empty) = slots.iter().position(Option::is_none) {
            slots[empty] = Some((score, i));
            continue;
        }

        let mut lowest: Option<(usize, f64)> = None;
        for (slot, held) in slots.iter().enumerate() {
            if let Some((held_score, _)) = held {
                if lowest.is_none_or(|(_, min)| *held_score < min) {
                    lowest = Some((slot, *held_score));
                }
            }
        }

        if let Some((slot, min)) = lowest {
            if score > min {
                slots[slot] = Some((score, i));
            }
        }
    }

    let mut indices: Vec<usize> = slots.into_iter().flatten().map(|(_, i)| i).collect();
    indices.sort_unstable_by(|a, b| b.cmp(a));
    indices
}

/// Exact selection by Dinkelbach iteration.
///
/// With `λ` the current kept ratio, keeps the `len - how_many` assignments with
/// the largest `got - λ * possible` and recomputes `λ` until the kept set stops
/// changing. Ties go to the lower index.
pub fn optimal_selection(assignments: &[Assignment], how_many: usize) -> Vec<usize> {
    let n = assignments.len();
    let how_many = how_many.min(n);
    if how_many == 0 {
        return Vec::new();
    }

    let keep = n - how_many;
    if keep == 0 {
        return (0..n).rev().collect();
    }

    let (total_got, total_possible) = totals(assignments);
    let mut lambda = if total_possible == 0.0 {
        0.0
    } else {
        total_got / total_possible
    };
    let mut kept: Vec<usize> = Vec::new();

    for _ in 0..MAX_ITERATIONS {
        let value = |i: usize| assignments[i].points_got - lambda * assignments[i].points_possible;
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| value(b).total_cmp(&value(a)).then(a.cmp(&b)));

        let mut candidate = order[..keep].to_vec();
        candidate.sort_unstable();
        if candidate == kept {
            break;
        }

        let (got, possible) = candidate.iter().fold((0.0, 0.0), |(g, p), &i| {
            (g + assignments[i].points_got, p + assignments[i].points_possible)
        });
        kept = candidate;
        if possible <= 0.0 {
            break;
        }
        lambda = got / possible;
    }

    let kept: HashSet<usize> = kept.into_iter().collect();
    (0..n).rev().filter(|i| !kept.contains(i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignments(raw: &[(f64, f64)]) -> Vec<Assignment> {
        raw.iter().map(|&(g, p)| Assignment::new(g, p)).collect()
    }

    #[test]
    fn test_greedy_single_drop_picks_lowest() {
        let a = assignments(&[(5.0, 10.0), (9.0, 10.0), (10.0, 10.0)]);
        assert_eq!(greedy_selection(&a, 1), vec![0]);
    }

    #[test]
    fn test_greedy_zero_is_empty() {
        let a = assignments(&[(5.0, 10.0), (9.0, 10.0)]);
        assert!(greedy_selection(&a, 0).is_empty());
        assert!(optimal_selection(&a, 0).is_empty());
    }

    #[test]
    fn test_greedy_returns_descending_indices() {
        let a = assignments(&[(1.0, 10.0), (10.0, 10.0), (2.0, 10.0), (10.0, 10.0)]);
        assert_eq!(greedy_selection(&a, 2), vec![2, 0]);
    }

    #[test]
    fn test_greedy_clamps_to_available() {
        let a = assignments(&[(5.0, 10.0), (9.0, 10.0)]);
        assert_eq!(greedy_selection(&a, 5), vec![1, 0]);
        assert_eq!(optimal_selection(&a, 5), vec![1, 0]);
    }

    #[test]
    fn test_greedy_fills_slots_even_when_every_removal_scores_zero() {
        // Every score-if-removed is 0, so all slots must still hold distinct indices.
        let a = assignments(&[(0.0, 10.0), (0.0, 10.0), (0.0, 10.0)]);
        assert_eq!(greedy_selection(&a, 2), vec![1, 0]);
    }

    #[test]
    fn test_greedy_ranks_emptying_removal_last() {
        // Dropping the only graded assignment would leave 5/0; keep it instead.
        let a = assignments(&[(0.0, 10.0), (5.0, 0.0), (3.0, 0.0)]);
        let picked = greedy_selection(&a, 1);
        assert_eq!(picked.len(), 1);
        assert_ne!(picked, vec![0]);
    }

    #[test]
    fn test_greedy_is_not_optimal_for_multiple_drops() {
        let a = assignments(&[(0.0, 1.0), (5.0, 20.0), (18.0, 20.0), (20.0, 20.0)]);
        // Greedy keeps 18/20 + 20/20 = 95%; dropping 5/20 and 18/20 keeps 20/21.
        assert_eq!(greedy_selection(&a, 2), vec![1, 0]);
        assert_eq!(optimal_selection(&a, 2), vec![2, 1]);
    }

    #[test]
    fn test_optimal_matches_greedy_for_single_drop() {
        let a = assignments(&[(7.0, 10.0), (3.0, 5.0), (10.0, 10.0), (18.0, 20.0)]);
        assert_eq!(optimal_selection(&a, 1), greedy_selection(&a, 1));
    }

    #[test]
    fn test_optimal_can_drop_everything() {
        let a = assignments(&[(5.0, 10.0), (9.0, 10.0)]);
        assert_eq!(optimal_selection(&a, 2), vec![1, 0]);
    }

    #[test]
    fn test_strategy_dispatch() {
        let a = assignments(&[(0.0, 1.0), (5.0, 20.0), (18.0, 20.0), (20.0, 20.0)]);
        assert_eq!(DropStrategy::default(), DropStrategy::Greedy);
        assert_eq!(DropStrategy::Greedy.select(&a, 2), vec![1, 0]);
        assert_eq!(DropStrategy::Optimal.select(&a, 2), vec![2, 1]);
    }
}
