use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::models::ReportDocument;

/// Writes one markdown file per report into a directory.
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{prefix}_{YYYY-MM-DD}_{HHMMSS}.md`, in local time
    pub fn file_name(prefix: &str, document: &ReportDocument) -> String {
        let local = document.generated_at.with_timezone(&Local);
        format!("{}_{}.md", prefix, local.format("%Y-%m-%d_%H%M%S"))
    }

    pub fn save(&self, prefix: &str, document: &ReportDocument) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create reports directory {:?}", self.dir))?;

        let path = self.dir.join(Self::file_name(prefix, document));
        fs::write(&path, document.to_markdown())
            .with_context(|| format!("Failed to write report to {:?}", path))?;

        tracing::info!("Report saved to {:?}", path);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_embeds_local_date() {
        let document = ReportDocument::new("Title", "Body");
        let name = ReportStore::file_name("hn_report", &document);
        let date = document
            .generated_at
            .with_timezone(&Local)
            .format("%Y-%m-%d")
            .to_string();
        assert!(name.starts_with(&format!("hn_report_{}_", date)));
        assert!(name.ends_with(".md"));
    }

    #[test]
    fn save_creates_directory_and_writes_markdown() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ReportStore::new(dir.path().join("nested").join("reports"));
        let document = ReportDocument::new("Sentinel Alert Report", "All quiet.");

        let path = store.save("sentinel_report", &document).unwrap();
        assert!(path.starts_with(store.dir()));

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Sentinel Alert Report\n"));
        assert!(written.contains("All quiet."));
    }

    #[test]
    fn save_into_a_file_path_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("reports");
        fs::write(&blocker, "not a directory").unwrap();

        let store = ReportStore::new(&blocker);
        assert!(store
            .save("sentinel_report", &ReportDocument::new("T", "B"))
            .is_err());
    }
}
