//! Grade sources: where raw assignment records come from.
//!
//! A [`GradeSource`] yields unvalidated [`RawRecord`]s for one course. The
//! course routes them to categories through [`normalize_label`] and keeps only
//! the records whose points parse.

mod csv_file;
mod http;

pub use csv_file::CsvGradeSource;
pub use http::HttpGradeSource;

use anyhow::Result;
use serde::Deserialize;
use tracing::debug;

use crate::gradebook::types::{Assignment, Identifier};

/// Entity token some portals leave in category labels for `&`.
const AMP_ENTITY: &str = "&amp;";

/// One assignment row as reported by a grade source, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawRecord {
    pub label: String,
    pub points_got: String,
    pub points_possible: Option<String>,
}

impl RawRecord {
    /// Builds a record from a points cell such as `"9/10"`.
    ///
    /// A cell without `/` (e.g. `"--"` or `"5"`) has no points possible.
    /// Anything after a second `/` is ignored.
    pub fn from_cell(label: impl Into<String>, cell: &str) -> Self {
        let mut parts = cell.splitn(3, '/');
        let got = parts.next().unwrap_or(cell);
        let possible = parts.next().map(str::to_string);

        Self {
            label: label.into(),
            points_got: got.to_string(),
            points_possible: possible,
        }
    }

    /// Parses the point values. Missing points possible count as `0`, an
    /// ungraded or informational item; non-numeric or non-finite values
    /// (`NaN`, `inf`) give `None`.
    pub fn parse_points(&self) -> Option<Assignment> {
        let got = parse_finite(&self.points_got)?;
        let possible = match &self.points_possible {
            Some(p) => parse_finite(p)?,
            None => 0.0,
        };
        Some(Assignment::new(got, possible))
    }
}

fn parse_finite(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Canonical form of a category label: `&amp;` collapsed to `&`, all
/// whitespace removed.
pub fn normalize_label(label: &str) -> String {
    label
        .replace(AMP_ENTITY, "&")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Abstraction over a provider of assignment records (gradebook export, portal).
///
/// A fetch either returns every record for the course or fails as a whole.
#[async_trait::async_trait]
pub trait GradeSource: Send + Sync {
    async fn fetch(&self, identifier: &Identifier) -> Result<Vec<RawRecord>>;
}

#[async_trait::async_trait]
impl<T: GradeSource + ?Sized> GradeSource for Box<T> {
    async fn fetch(&self, identifier: &Identifier) -> Result<Vec<RawRecord>> {
        (**self).fetch(identifier).await
    }
}

/// Parses a `category,points` CSV export into raw records.
///
/// Shared by the file and HTTP sources. Rows without a points cell are
/// skipped; unparsable points are kept and filtered later. Read errors and
/// an unusable header still fail the whole export.
pub(crate) fn records_from_csv<R: std::io::Read>(reader: R) -> Result<Vec<RawRecord>> {
    #[derive(Deserialize)]
    struct ExportRow {
        category: String,
        points: Option<String>,
    }

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let mut records = Vec::new();

    for result in rdr.deserialize::<ExportRow>() {
        let row = result?;
        let Some(points) = row.points else {
            debug!(label = %row.category, "Export row has no points, skipping");
            continue;
        };
        records.push(RawRecord::from_cell(row.category, &points));
    }

    Ok(records)
}
