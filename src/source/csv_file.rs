use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs::File;
use std::path::PathBuf;
use tracing::debug;

use super::{GradeSource, RawRecord, records_from_csv};
use crate::gradebook::types::Identifier;

/// Reads gradebook exports from a directory, one `<identifier>.csv` per course.
///
/// Each file has a `category,points` header; points cells look like `9/10`.
pub struct CsvGradeSource {
    dir: PathBuf,
}

impl CsvGradeSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, identifier: &Identifier) -> PathBuf {
        self.dir.join(format!("{identifier}.csv"))
    }
}

#[async_trait]
impl GradeSource for CsvGradeSource {
    async fn fetch(&self, identifier: &Identifier) -> Result<Vec<RawRecord>> {
        let path = self.path_for(identifier);
        debug!(path = %path.display(), "Reading grade export");

        let file = File::open(&path)
            .with_context(|| format!("failed to open grade export {}", path.display()))?;
        records_from_csv(file)
            .with_context(|| format!("malformed grade export {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir); // clean up any prior run
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_fetch_reads_course_file() {
        let dir = temp_dir("gradebook_csv_source_read");
        fs::write(dir.join("3.csv"), "category,points\nHW,9/10\nTest,--\n").unwrap();

        let source = CsvGradeSource::new(&dir);
        let records = source.fetch(&Identifier::Number(3)).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], RawRecord::from_cell("HW", "9/10"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_fetch_missing_file_fails() {
        let dir = temp_dir("gradebook_csv_source_missing");
        let source = CsvGradeSource::new(&dir);

        let err = source
            .fetch(&Identifier::Text("chem".to_string()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("chem.csv"));

        fs::remove_dir_all(&dir).unwrap();
    }
}
