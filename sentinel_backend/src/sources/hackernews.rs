use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::AlertSource;
use crate::config::{ReportKind, SourceConfig};
use crate::error::{ConfigError, FetchError};
use crate::http_client::build_http_client;
use crate::models::{AlertRecord, Severity, SourceKind};

pub const DEFAULT_API_URL: &str = "https://hn.algolia.com/api/v1/search";
const ITEM_URL: &str = "https://news.ycombinator.com/item?id=";

// ========================================================================
// Algolia search API types
// ========================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    points: Option<u64>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    created_at_i: Option<i64>,
    #[serde(default, rename = "objectID")]
    object_id: Option<String>,
}

impl Hit {
    fn into_record(self) -> Option<AlertRecord> {
        let title = self.title.filter(|t| !t.trim().is_empty())?;
        let points = self.points.unwrap_or(0);
        let link = self
            .url
            .filter(|u| !u.is_empty())
            .or_else(|| self.object_id.map(|id| format!("{}{}", ITEM_URL, id)));
        let timestamp = self
            .created_at_i
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(Utc::now);

        Some(AlertRecord {
            title,
            content: format!("Points: {} | {}", points, link.as_deref().unwrap_or("-")),
            severity: Severity::from_popularity(points),
            source: SourceKind::Hackernews,
            timestamp,
            link,
            popularity: Some(points),
        })
    }
}

// ========================================================================
// Hacker News source
// ========================================================================

/// Popular stories from the Hacker News Algolia search API.
pub struct HackerNewsSource {
    api_url: String,
    min_points: u64,
    max_results: u32,
    window: Option<ChronoDuration>,
    client: Client,
}

fn window_duration(hours: u64) -> Result<ChronoDuration, ConfigError> {
    i64::try_from(hours)
        .ok()
        .and_then(ChronoDuration::try_hours)
        .ok_or_else(|| ConfigError::InvalidValue {
            field: "sources.window_hours",
            reason: format!("{} hours is not a representable time window", hours),
        })
}

impl HackerNewsSource {
    pub fn new(api_url: String, min_points: u64, max_results: u32) -> Result<Self, ConfigError> {
        if max_results == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sources.max_results",
                reason: "result cap must be at least 1".to_string(),
            });
        }
        Ok(Self {
            api_url,
            min_points,
            max_results,
            window: None,
            client: build_http_client()?,
        })
    }

    /// Thresholds left unset in `config` follow the report kind.
    pub fn from_config(config: &SourceConfig, report_kind: ReportKind) -> Result<Self, ConfigError> {
        let source = Self::new(
            config
                .api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            config.min_points_for(report_kind),
            config.max_results_for(report_kind),
        )?;
        match config.window_hours {
            Some(hours) => source.with_window_hours(hours),
            None => Ok(source),
        }
    }

    /// Only fetch stories created within the last `hours`
    pub fn with_window_hours(mut self, hours: u64) -> Result<Self, ConfigError> {
        self.window = Some(window_duration(hours)?);
        Ok(self)
    }

    fn numeric_filters(&self, now: DateTime<Utc>) -> String {
        let mut filters = format!("points>{}", self.min_points);
        // A window reaching past the earliest representable date covers every story
        if let Some(since) = self.window.and_then(|w| now.checked_sub_signed(w)) {
            filters.push_str(&format!(",created_at_i>{}", since.timestamp()));
        }
        filters
    }

    fn request_error(&self, error: reqwest::Error) -> FetchError {
        FetchError::Request {
            source_name: self.name().to_string(),
            error,
        }
    }
}

#[async_trait]
impl AlertSource for HackerNewsSource {
    fn name(&self) -> &str {
        "hackernews"
    }

    async fn fetch(&self) -> Result<Vec<AlertRecord>, FetchError> {
        let filters = self.numeric_filters(Utc::now());
        tracing::debug!("Polling {} with numericFilters={}", self.api_url, filters);

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("tags", "story".to_string()),
                ("hitsPerPage", self.max_results.to_string()),
                ("numericFilters", filters),
            ])
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                source_name: self.name().to_string(),
                status,
                body,
            });
        }

        let search: SearchResponse = response.json().await.map_err(|error| FetchError::Decode {
            source_name: self.name().to_string(),
            error,
        })?;

        let records: Vec<AlertRecord> = search
            .hits
            .into_iter()
            .filter_map(Hit::into_record)
            .take(self.max_results as usize)
            .collect();

        tracing::info!("Fetched {} alert(s) from {}", records.len(), self.name());
        Ok(records)
    }
}
