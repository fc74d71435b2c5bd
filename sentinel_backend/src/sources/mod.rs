pub mod hackernews;

use async_trait::async_trait;

use crate::config::{ReportKind, SourceConfig};
use crate::error::{ConfigError, FetchError};
use crate::models::{AlertRecord, SourceKind};

pub use hackernews::HackerNewsSource;

/// An external signal source polled once per reporting cycle.
#[async_trait]
pub trait AlertSource: Send + Sync {
    /// Human-readable name for this source (used in logs and cycle summaries)
    fn name(&self) -> &str;

    /// Fetch the current alerts. An empty feed is `Ok(vec![])`, never an error.
    async fn fetch(&self) -> Result<Vec<AlertRecord>, FetchError>;
}

/// Build a source from its configuration entry for a loop producing `report_kind`.
pub fn build_source(
    config: &SourceConfig,
    report_kind: ReportKind,
) -> Result<Box<dyn AlertSource>, ConfigError> {
    match config.source_kind()? {
        SourceKind::Hackernews => Ok(Box::new(HackerNewsSource::from_config(
            config,
            report_kind,
        )?)),
        other => Err(ConfigError::UnsupportedSource(other.to_string())),
    }
}
