//! Data types shared by the grade model, the importer and the output layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::gradebook::utility::percent;

/// A single scored assignment: points earned out of points possible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub points_got: f64,
    pub points_possible: f64,
}

impl Assignment {
    pub fn new(points_got: f64, points_possible: f64) -> Self {
        Self {
            points_got,
            points_possible,
        }
    }

    /// Raw percentage for this assignment alone, `None` when nothing was possible.
    pub fn percent(&self) -> Option<f64> {
        percent(self.points_got, self.points_possible)
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percent() {
            Some(p) => write!(
                f,
                "{:.2}/{:.2} ({:.2})",
                self.points_got, self.points_possible, p
            ),
            None => write!(f, "{:.2}/{:.2} (n/a)", self.points_got, self.points_possible),
        }
    }
}

/// Opaque handle a grade source uses to locate a course.
///
/// Course files written by hand usually carry a row number, exports from other
/// tools carry a string code; both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Number(u64),
    Text(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Number(n) => write!(f, "{n}"),
            Identifier::Text(s) => f.write_str(s),
        }
    }
}

/// Per-category line of a [`CourseSummary`].
#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub weight: f64,
    pub score: Option<f64>,
    pub assignments: usize,
    pub points_got: f64,
    pub points_possible: f64,
}

/// Snapshot of a course's computed grade, serialized for `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct CourseSummary {
    pub key: String,
    pub name: String,
    pub categories: Vec<CategorySummary>,
    pub score: Option<f64>,
    pub weights_sum: f64,
    pub letter: Option<String>,
    pub retrieved_at: Option<DateTime<Utc>>,
}
