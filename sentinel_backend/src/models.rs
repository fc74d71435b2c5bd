use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Popularity units per severity band for popularity-ranked feeds.
pub const POPULARITY_PER_BAND: u64 = 50;

/// Alert severity band, 1 (lowest) to 5 (highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Severity(u8);

impl Severity {
    pub fn new(level: u8) -> Option<Self> {
        (1..=5).contains(&level).then_some(Self(level))
    }

    /// One band per started `POPULARITY_PER_BAND` points, clamped to 1..=5.
    /// 0..=50 is band 1, 51..=100 band 2, 150 band 3, above 200 band 5.
    pub fn from_popularity(points: u64) -> Self {
        let band = points.div_ceil(POPULARITY_PER_BAND).clamp(1, 5);
        Self(band as u8)
    }

    pub fn level(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Informational",
            2 => "Low",
            3 => "Medium",
            4 => "High",
            _ => "Critical",
        }
    }
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Severity::new(level).ok_or_else(|| format!("severity {} outside 1..=5", level))
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.0
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an alert came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Github,
    Hackernews,
    Rss,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Github => "github",
            SourceKind::Hackernews => "hackernews",
            SourceKind::Rss => "rss",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(SourceKind::Github),
            "hackernews" | "hn" => Ok(SourceKind::Hackernews),
            "rss" => Ok(SourceKind::Rss),
            other => Err(ConfigError::UnsupportedSource(other.to_string())),
        }
    }
}

/// One normalized unit of signal from an external source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub title: String,
    pub content: String,
    pub severity: Severity,
    pub source: SourceKind,
    pub timestamp: DateTime<Utc>,
    /// Original link, cited in reports when present.
    #[serde(default)]
    pub link: Option<String>,
    /// Raw popularity score the severity was derived from.
    #[serde(default)]
    pub popularity: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A generated report, rendered once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub title: String,
    pub body: String,
    pub generated_at: DateTime<Utc>,
}

impl ReportDocument {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            generated_at: Utc::now(),
        }
    }

    pub fn to_markdown(&self) -> String {
        format!("# {}\n\n{}\n", self.title, self.body.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_bands_follow_popularity() {
        assert_eq!(Severity::from_popularity(0).level(), 1);
        assert_eq!(Severity::from_popularity(49).level(), 1);
        assert_eq!(Severity::from_popularity(50).level(), 1);
        assert_eq!(Severity::from_popularity(51).level(), 2);
        assert_eq!(Severity::from_popularity(60).level(), 2);
        assert_eq!(Severity::from_popularity(150).level(), 3);
        assert_eq!(Severity::from_popularity(151).level(), 4);
        assert_eq!(Severity::from_popularity(200).level(), 4);
        assert_eq!(Severity::from_popularity(249).level(), 5);
        assert_eq!(Severity::from_popularity(400).level(), 5);
        assert_eq!(Severity::from_popularity(1000).level(), 5);
        assert_eq!(Severity::from_popularity(u64::MAX).level(), 5);
    }

    #[test]
    fn severity_rejects_out_of_range_levels() {
        assert!(Severity::new(0).is_none());
        assert!(Severity::new(6).is_none());
        assert_eq!(Severity::new(4).map(Severity::level), Some(4));
        assert!(serde_json::from_str::<Severity>("7").is_err());
        assert_eq!(serde_json::from_str::<Severity>("2").unwrap().level(), 2);
    }

    #[test]
    fn source_kind_parses_aliases() {
        assert_eq!("HN".parse::<SourceKind>().unwrap(), SourceKind::Hackernews);
        assert_eq!(" rss ".parse::<SourceKind>().unwrap(), SourceKind::Rss);
        assert!(matches!(
            "mastodon".parse::<SourceKind>(),
            Err(ConfigError::UnsupportedSource(_))
        ));
    }

    #[test]
    fn report_markdown_starts_with_title() {
        let doc = ReportDocument::new("Sentinel Alert Report", "body text\n\n");
        assert_eq!(doc.to_markdown(), "# Sentinel Alert Report\n\nbody text\n");
    }

    #[test]
    fn chat_roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::system("hi")).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "hi");
    }
}
