use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::gradebook::category::Category;
use crate::gradebook::drop::DropStrategy;
use crate::gradebook::grade::letter;
use crate::gradebook::types::{Assignment, CategorySummary, CourseSummary, Identifier};
use crate::gradebook::utility::weighted_mean;
use crate::source::{GradeSource, normalize_label};

/// Category treated as the remaining assessment when none is configured.
pub const DEFAULT_FINAL_CATEGORY: &str = "Final?";

/// A course: its weighted categories and the aggregate computed from them.
#[derive(Debug, Clone)]
pub struct Course {
    key: String,
    name: String,
    identifier: Identifier,
    categories: IndexMap<String, Category>,
    final_category: String,
    score: Option<f64>,
    weights_sum: f64,
    retrieved: bool,
    retrieved_at: Option<DateTime<Utc>>,
}

impl Course {
    /// Builds a course with empty categories, in the given order.
    pub fn new<I, S>(
        key: impl Into<String>,
        name: impl Into<String>,
        identifier: Identifier,
        categories: I,
    ) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let categories = categories
            .into_iter()
            .map(|(name, weight)| {
                let name = name.into();
                (name.clone(), Category::new(name, weight))
            })
            .collect();

        Self {
            key: key.into(),
            name: name.into(),
            identifier,
            categories,
            final_category: DEFAULT_FINAL_CATEGORY.to_string(),
            score: None,
            weights_sum: 0.0,
            retrieved: false,
            retrieved_at: None,
        }
    }

    /// Names the category used by [`Course::calculate_final_needed`].
    pub fn with_final_category(mut self, name: impl Into<String>) -> Self {
        self.final_category = name.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn categories(&self) -> &IndexMap<String, Category> {
        &self.categories
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.get(name)
    }

    pub fn final_category(&self) -> &str {
        &self.final_category
    }

    /// Overall percentage as of the last [`Course::calc_score`]; `None` while
    /// no category has graded work.
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn weights_sum(&self) -> f64 {
        self.weights_sum
    }

    pub fn retrieved(&self) -> bool {
        self.retrieved
    }

    /// Clearing the flag makes the next [`Course::get_grades`] fetch again.
    pub fn set_retrieved(&mut self, retrieved: bool) {
        self.retrieved = retrieved;
    }

    pub fn retrieved_at(&self) -> Option<DateTime<Utc>> {
        self.retrieved_at
    }

    /// Recomputes every category and the weighted course score.
    pub fn calc_score(&mut self) -> Option<f64> {
        let (score, weights_sum) = weighted_mean(
            self.categories
                .values_mut()
                .map(|c| (c.calc_score(), c.weight())),
        );
        self.score = score;
        self.weights_sum = weights_sum;
        score
    }

    pub fn reset(&mut self) {
        for c in self.categories.values_mut() {
            c.reset();
        }
    }

    /// Pulls assignment records from `source` unless already retrieved.
    ///
    /// Returns `Ok(true)` when a fetch happened. On a failed fetch the course is
    /// left exactly as it was and stays unretrieved.
    #[tracing::instrument(skip(self, source), fields(course = %self.key))]
    pub async fn get_grades<S>(&mut self, source: &S) -> Result<bool>
    where
        S: GradeSource + ?Sized,
    {
        if self.retrieved {
            debug!("Grades already retrieved, skipping fetch");
            return Ok(false);
        }

        let records = source
            .fetch(&self.identifier)
            .await
            .with_context(|| format!("failed to fetch grades for course '{}'", self.key))?;

        self.reset();

        let mut routed = 0usize;
        let mut unmatched = 0usize;
        let mut unparsable = 0usize;

        for record in &records {
            let label = normalize_label(&record.label);
            let Some(category) = self.categories.get_mut(&label) else {
                debug!(label = %label, "No matching category, skipping record");
                unmatched += 1;
                continue;
            };

            let Some(a) = record.parse_points() else {
                debug!(label = %label, got = %record.points_got, "Unparsable points, skipping record");
                unparsable += 1;
                continue;
            };

            category.add(a.points_got, a.points_possible);
            routed += 1;
        }

        self.retrieved = true;
        self.retrieved_at = Some(Utc::now());
        self.calc_score();

        info!(
            records = records.len(),
            routed,
            unmatched,
            unparsable,
            "Grades retrieved"
        );
        Ok(true)
    }

    /// Score needed on the final category to finish at `desired_score`.
    ///
    /// Scores are percentages and weights are on a 100-point scale, so
    /// `needed = (desired * 100 - score * weights_sum) / final_weight`. The
    /// final is assumed to be ungraded; if it already has a score the formula
    /// is still applied as is.
    pub fn calculate_final_needed(&self, desired_score: f64) -> Result<f64> {
        let final_category = self.categories.get(&self.final_category).ok_or_else(|| {
            anyhow!(
                "course '{}' has no '{}' category",
                self.key,
                self.final_category
            )
        })?;

        let final_weight = final_category.weight();
        if final_weight == 0.0 {
            bail!(
                "category '{}' in course '{}' has zero weight",
                self.final_category,
                self.key
            );
        }

        if let Some(existing) = final_category.score() {
            warn!(
                course = %self.key,
                category = %self.final_category,
                existing,
                "Final category already graded; its current score is not subtracted"
            );
        }

        let current = self.score.map_or(0.0, |s| s * self.weights_sum);
        let needed = (desired_score * 100.0 - current) / final_weight;

        info!(
            course = %self.key,
            "To get a {:.2} you need a {:.2} on the final",
            desired_score,
            needed
        );
        Ok(needed)
    }

    /// Drops `how_many` assignments from `category` and recomputes the score.
    pub fn drop(&mut self, category: &str, how_many: usize) -> Result<Vec<Assignment>> {
        self.drop_with(category, how_many, DropStrategy::Greedy)
    }

    pub fn drop_with(
        &mut self,
        category: &str,
        how_many: usize,
        strategy: DropStrategy,
    ) -> Result<Vec<Assignment>> {
        let removed = self.category_mut(category)?.drop_with(how_many, strategy);
        self.calc_score();
        Ok(removed)
    }

    /// Adds a hypothetical assignment to `category` and recomputes the score.
    pub fn add_and_update(
        &mut self,
        category: &str,
        points_got: f64,
        points_possible: f64,
    ) -> Result<()> {
        self.category_mut(category)?.add(points_got, points_possible);
        self.calc_score();
        Ok(())
    }

    pub fn summary(&self) -> CourseSummary {
        CourseSummary {
            key: self.key.clone(),
            name: self.name.clone(),
            categories: self
                .categories
                .values()
                .map(|c| CategorySummary {
                    name: c.name().to_string(),
                    weight: c.weight(),
                    score: c.score(),
                    assignments: c.assignments().len(),
                    points_got: c.total_points_got(),
                    points_possible: c.total_points_possible(),
                })
                .collect(),
            score: self.score,
            weights_sum: self.weights_sum,
            letter: self.score.map(letter),
            retrieved_at: self.retrieved_at,
        }
    }

    fn category_mut(&mut self, name: &str) -> Result<&mut Category> {
        let key = &self.key;
        self.categories
            .get_mut(name)
            .ok_or_else(|| anyhow!("course '{key}' has no '{name}' category"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RawRecord;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        records: Vec<RawRecord>,
        calls: AtomicUsize,
    }

    impl CountingSource {
        fn new(records: Vec<RawRecord>) -> Self {
            Self {
                records,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl GradeSource for CountingSource {
        async fn fetch(&self, _identifier: &Identifier) -> Result<Vec<RawRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.records.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl GradeSource for FailingSource {
        async fn fetch(&self, _identifier: &Identifier) -> Result<Vec<RawRecord>> {
            bail!("portal unreachable")
        }
    }

    fn two_category_course() -> Course {
        Course::new("bio", "Biology", Identifier::Number(1), [("A", 1.0), ("B", 1.0)])
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_weighted_aggregation() {
        let mut course = two_category_course();
        course.add_and_update("A", 40.0, 50.0).unwrap();
        course.add_and_update("B", 10.0, 10.0).unwrap();

        assert!(approx(course.score().unwrap(), 90.0));
        assert_eq!(course.weights_sum(), 2.0);
    }

    #[test]
    fn test_ungraded_category_excluded_from_weights() {
        let mut course =
            Course::new("bio", "Biology", Identifier::Number(1), [("A", 1.0), ("B", 3.0)]);
        course.add_and_update("A", 8.0, 10.0).unwrap();
        course.add_and_update("B", 5.0, 0.0).unwrap();

        assert!(approx(course.score().unwrap(), 80.0));
        assert_eq!(course.weights_sum(), 1.0);
        assert_eq!(course.category("B").unwrap().score(), None);
    }

    #[test]
    fn test_ungraded_course_has_no_score() {
        let mut course = two_category_course();
        assert_eq!(course.calc_score(), None);
        assert_eq!(course.weights_sum(), 0.0);
        assert_eq!(course.summary().letter, None);
    }

    #[test]
    fn test_unknown_category_is_an_error() {
        let mut course = two_category_course();
        assert!(course.add_and_update("C", 1.0, 1.0).is_err());
        assert!(course.drop("C", 1).is_err());
    }

    #[test]
    fn test_drop_recomputes_course_score() {
        let mut course = two_category_course();
        for (got, possible) in [(5.0, 10.0), (9.0, 10.0), (10.0, 10.0)] {
            course.add_and_update("A", got, possible).unwrap();
        }
        course.add_and_update("B", 10.0, 10.0).unwrap();

        let removed = course.drop("A", 1).unwrap();
        assert_eq!(removed, vec![Assignment::new(5.0, 10.0)]);
        assert!(approx(course.score().unwrap(), 97.5));
    }

    #[test]
    fn test_final_needed_on_hundred_point_weights() {
        let mut course = Course::new(
            "bio",
            "Biology",
            Identifier::Number(1),
            [("HW", 60.0), ("Final?", 40.0)],
        );
        course.add_and_update("HW", 45.0, 50.0).unwrap();

        let needed = course.calculate_final_needed(92.0).unwrap();
        assert!(approx(needed, 95.0));
    }

    #[test]
    fn test_final_needed_applies_formula_to_given_scale() {
        let mut course = Course::new(
            "bio",
            "Biology",
            Identifier::Number(1),
            [("HW", 1.0), ("Final?", 1.0)],
        );
        course.add_and_update("HW", 9.0, 10.0).unwrap();
        assert_eq!(course.weights_sum(), 1.0);

        let needed = course.calculate_final_needed(0.92).unwrap();
        assert!(approx(needed, 2.0));
    }

    #[test]
    fn test_final_needed_when_final_already_graded_is_mechanical() {
        let mut course = Course::new(
            "bio",
            "Biology",
            Identifier::Number(1),
            [("HW", 50.0), ("Final?", 50.0)],
        );
        course.add_and_update("HW", 8.0, 10.0).unwrap();
        course.add_and_update("Final?", 10.0, 10.0).unwrap();

        // score 90 over weights 100; the graded final is not backed out.
        let needed = course.calculate_final_needed(90.0).unwrap();
        assert!(approx(needed, 0.0));
    }

    #[test]
    fn test_final_needed_for_ungraded_course() {
        let course = Course::new("bio", "Biology", Identifier::Number(1), [("Final?", 20.0)]);
        let needed = course.calculate_final_needed(90.0).unwrap();
        assert!(approx(needed, 450.0));
    }

    #[test]
    fn test_final_needed_uses_configured_category() {
        let mut course = Course::new(
            "bio",
            "Biology",
            Identifier::Number(1),
            [("HW", 80.0), ("Exam", 20.0)],
        )
        .with_final_category("Exam");
        course.add_and_update("HW", 9.0, 10.0).unwrap();

        let needed = course.calculate_final_needed(90.0).unwrap();
        assert!(approx(needed, 90.0));
    }

    #[test]
    fn test_final_needed_without_final_category() {
        let course = two_category_course();
        assert!(course.calculate_final_needed(90.0).is_err());
    }

    #[test]
    fn test_final_needed_with_zero_weight_final() {
        let course = Course::new("bio", "Biology", Identifier::Number(1), [("Final?", 0.0)]);
        assert!(course.calculate_final_needed(90.0).is_err());
    }

    #[tokio::test]
    async fn test_get_grades_routes_records() {
        let source = CountingSource::new(vec![
            RawRecord::from_cell("A", "40/50"),
            RawRecord::from_cell(" B ", "10/10"),
            RawRecord::from_cell("Labs", "5/5"),
            RawRecord::from_cell("A", "--/10"),
        ]);
        let mut course = two_category_course();

        assert!(course.get_grades(&source).await.unwrap());
        assert!(course.retrieved());
        assert!(course.retrieved_at().is_some());
        assert_eq!(course.category("A").unwrap().assignments().len(), 1);
        assert_eq!(course.category("B").unwrap().assignments().len(), 1);
        assert!(approx(course.score().unwrap(), 90.0));
    }

    #[tokio::test]
    async fn test_get_grades_fetches_once_until_cleared() {
        let source = CountingSource::new(vec![RawRecord::from_cell("A", "8/10")]);
        let mut course = two_category_course();

        assert!(course.get_grades(&source).await.unwrap());
        assert!(!course.get_grades(&source).await.unwrap());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        course.set_retrieved(false);
        assert!(course.get_grades(&source).await.unwrap());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        // a refetch replaces rather than appends
        assert_eq!(course.category("A").unwrap().assignments().len(), 1);
    }

    #[tokio::test]
    async fn test_get_grades_discards_local_edits_on_refetch() {
        let source = CountingSource::new(vec![RawRecord::from_cell("A", "8/10")]);
        let mut course = two_category_course();
        course.get_grades(&source).await.unwrap();
        course.add_and_update("A", 0.0, 10.0).unwrap();

        course.set_retrieved(false);
        course.get_grades(&source).await.unwrap();
        assert!(approx(course.score().unwrap(), 80.0));
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_course_untouched() {
        let mut course = two_category_course();
        course.add_and_update("A", 7.0, 10.0).unwrap();

        let err = course.get_grades(&FailingSource).await.unwrap_err();
        assert!(err.to_string().contains("bio"));
        assert!(!course.retrieved());
        assert_eq!(course.category("A").unwrap().assignments().len(), 1);
        assert!(approx(course.score().unwrap(), 70.0));
    }

    #[test]
    fn test_summary_lists_categories_in_config_order() {
        let mut course = Course::new(
            "bio",
            "Biology",
            Identifier::Number(1),
            [("Test", 2.0), ("HW", 1.0)],
        );
        course.add_and_update("HW", 9.0, 10.0).unwrap();
        course.add_and_update("Test", 30.0, 40.0).unwrap();

        let summary = course.summary();
        let names: Vec<_> = summary.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Test", "HW"]);
        assert_eq!(summary.letter.as_deref(), Some("B-"));
    }
}
