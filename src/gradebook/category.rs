use tracing::{info, warn};

use crate::gradebook::drop::DropStrategy;
use crate::gradebook::types::Assignment;
use crate::gradebook::utility::percent;

/// A weighted group of assignments within a course (homework, tests, ...).
///
/// The running totals always equal the sums over `assignments`; they are only
/// touched by [`Category::add`], [`Category::drop`] and [`Category::reset`].
#[derive(Debug, Clone)]
pub struct Category {
    name: String,
    weight: f64,
    assignments: Vec<Assignment>,
    total_points_got: f64,
    total_points_possible: f64,
    score: Option<f64>,
}

impl Category {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            assignments: Vec::new(),
            total_points_got: 0.0,
            total_points_possible: 0.0,
            score: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn total_points_got(&self) -> f64 {
        self.total_points_got
    }

    pub fn total_points_possible(&self) -> f64 {
        self.total_points_possible
    }

    /// Score as of the last [`Category::calc_score`].
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    /// Recomputes the percentage score from the running totals.
    ///
    /// `None` means no graded work yet; such a category is left out of the
    /// course aggregate.
    pub fn calc_score(&mut self) -> Option<f64> {
        self.score = percent(self.total_points_got, self.total_points_possible);
        self.score
    }

    pub fn reset(&mut self) {
        self.assignments.clear();
        self.total_points_got = 0.0;
        self.total_points_possible = 0.0;
    }

    /// Appends an assignment. Values are taken as given, including zero or
    /// negative points possible.
    pub fn add(&mut self, points_got: f64, points_possible: f64) {
        self.assignments
            .push(Assignment::new(points_got, points_possible));
        self.total_points_got += points_got;
        self.total_points_possible += points_possible;
    }

    /// Drops `how_many` assignments with the default [`DropStrategy::Greedy`].
    pub fn drop(&mut self, how_many: usize) -> Vec<Assignment> {
        self.drop_with(how_many, DropStrategy::Greedy)
    }

    /// Drops `how_many` assignments chosen by `strategy` and returns them in
    /// removal order (highest original index first).
    ///
    /// Requests beyond the number of assignments are clamped.
    pub fn drop_with(&mut self, how_many: usize, strategy: DropStrategy) -> Vec<Assignment> {
        if how_many > self.assignments.len() {
            warn!(
                category = %self.name,
                requested = how_many,
                available = self.assignments.len(),
                "Drop request exceeds assignments, clamping"
            );
        }

        let indices = strategy.select(&self.assignments, how_many);
        let mut removed = Vec::with_capacity(indices.len());

        for index in indices {
            let a = self.assignments.remove(index);
            info!(category = %self.name, "Removed {}", a);
            self.total_points_got -= a.points_got;
            self.total_points_possible -= a.points_possible;
            removed.push(a);
        }

        removed
    }
}
