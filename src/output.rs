//! Text and JSON rendering of course grades.

use anyhow::Result;
use std::fmt::Write;
use tracing::debug;

use crate::gradebook::course::Course;
use crate::gradebook::types::{Assignment, CourseSummary};

fn fmt_score(score: Option<f64>) -> String {
    score.map_or_else(|| "n/a".to_string(), |s| format!("{s:.2}"))
}

/// Fixed-width table of category scores and weights followed by the overall
/// score and letter grade.
pub fn render_course(course: &Course) -> String {
    let summary = course.summary();
    let mut output = String::new();

    let _ = writeln!(
        output,
        "{:40} {:20} {:20}",
        summary.name, "Category Score", "Category Weight"
    );
    for c in &summary.categories {
        let _ = writeln!(
            output,
            "{:40} {:<20} {:<20}",
            c.name,
            fmt_score(c.score),
            format!("{:.0}", c.weight)
        );
    }

    match (summary.score, summary.letter.as_deref()) {
        (Some(score), Some(letter)) => {
            let _ = writeln!(output, "Overall: {score:.2} ({letter})");
        }
        _ => {
            let _ = writeln!(output, "Overall: n/a (no graded work yet)");
        }
    }

    output
}

/// Lines reporting assignments removed by a drop.
pub fn render_removed(removed: &[Assignment]) -> String {
    if removed.is_empty() {
        return "Nothing removed\n".to_string();
    }

    let mut output = String::new();
    for a in removed {
        let _ = writeln!(output, "Removed {a}");
    }
    output
}

pub fn render_final_needed(desired_score: f64, needed: f64) -> String {
    format!("To get a {desired_score:.2} you need a {needed:.2} on the final\n")
}

/// Serializes a course summary as pretty-printed JSON.
pub fn render_json(summary: &CourseSummary) -> Result<String> {
    let json = serde_json::to_string_pretty(summary)?;
    debug!(course = %summary.key, bytes = json.len(), "Rendered JSON summary");
    Ok(json)
}
