use std::collections::BTreeMap;

use crate::models::{AlertRecord, Severity};

pub const NO_ALERTS: &str = "No alerts were collected during this cycle.";
const EXCERPT_CHARS: usize = 160;

pub type SeverityGroups = BTreeMap<Severity, Vec<AlertRecord>>;

/// Partition records by severity band, keeping arrival order within a band.
/// Only bands with at least one record appear in the result.
pub fn group_by_severity(records: Vec<AlertRecord>) -> SeverityGroups {
    let mut grouped = SeverityGroups::new();
    for record in records {
        grouped.entry(record.severity).or_default().push(record);
    }
    grouped
}

/// Render grouped alerts as the user message for report generation,
/// most severe band first.
pub fn render(grouped: &SeverityGroups) -> String {
    let total: usize = grouped.values().map(Vec::len).sum();
    if total == 0 {
        return NO_ALERTS.to_string();
    }

    let mut out = format!(
        "Alert summary: {} alert(s) across {} severity band(s)\n",
        total,
        grouped.len()
    );
    for (severity, alerts) in grouped.iter().rev() {
        out.push_str(&format!(
            "\n## Severity {} ({})\n",
            severity.level(),
            severity.label()
        ));
        for alert in alerts {
            out.push_str(&render_alert(alert));
            out.push('\n');
        }
    }
    out
}

fn render_alert(alert: &AlertRecord) -> String {
    let mut line = format!("- [{}] {}: {}", alert.source, alert.title, excerpt(&alert.content));
    if let Some(link) = &alert.link {
        if !alert.content.contains(link.as_str()) {
            line.push_str(&format!(" ({})", link));
        }
    }
    line
}

/// First non-blank line, truncated.
fn excerpt(content: &str) -> String {
    let line = content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    if line.chars().count() <= EXCERPT_CHARS {
        line.to_string()
    } else {
        let cut: String = line.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", cut.trim_end())
    }
}

/// Render the most popular records as a trend digest.
pub fn render_trending(records: &[AlertRecord], limit: usize) -> String {
    if records.is_empty() {
        return NO_ALERTS.to_string();
    }

    let mut ranked: Vec<&AlertRecord> = records.iter().collect();
    // Stable sort keeps feed order among equal scores
    ranked.sort_by(|a, b| b.popularity.unwrap_or(0).cmp(&a.popularity.unwrap_or(0)));

    let mut out = String::from("Analyze the trends in the following Hacker News stories:\n");
    for record in ranked.into_iter().take(limit.max(1)) {
        out.push_str(&format!(
            "- {} (🔥{})\n",
            record.title,
            record.popularity.unwrap_or(0)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::alert;

    #[test]
    fn grouping_partitions_without_loss_or_duplication() {
        let records = vec![
            alert("a", 10),
            alert("b", 60),
            alert("c", 20),
            alert("d", 400),
            alert("e", 75),
        ];
        let grouped = group_by_severity(records.clone());

        let total: usize = grouped.values().map(Vec::len).sum();
        assert_eq!(total, records.len());
        assert!(grouped.values().all(|band| !band.is_empty()));
        for record in &records {
            let band = &grouped[&record.severity];
            assert_eq!(band.iter().filter(|r| *r == record).count(), 1);
        }

        let low: Vec<&str> = grouped[&Severity::new(1).unwrap()]
            .iter()
            .map(|r| r.title.as_str())
            .collect();
        assert_eq!(low, vec!["a", "c"]);
        let medium: Vec<&str> = grouped[&Severity::new(2).unwrap()]
            .iter()
            .map(|r| r.title.as_str())
            .collect();
        assert_eq!(medium, vec!["b", "e"]);
        assert!(!grouped.contains_key(&Severity::new(3).unwrap()));
    }

    #[test]
    fn empty_input_renders_explicit_notice() {
        let grouped = group_by_severity(Vec::new());
        assert!(grouped.is_empty());
        assert_eq!(render(&grouped), NO_ALERTS);
        assert_eq!(render_trending(&[], 10), NO_ALERTS);
    }

    #[test]
    fn render_lists_bands_from_most_severe() {
        let grouped = group_by_severity(vec![
            alert("Minor thing", 60),
            alert("Big thing", 400),
        ]);
        let text = render(&grouped);

        let critical = text.find("## Severity 5 (Critical)").unwrap();
        let low = text.find("## Severity 2 (Low)").unwrap();
        assert!(critical < low);
        assert!(text.starts_with("Alert summary: 2 alert(s) across 2 severity band(s)"));
        assert!(text.contains(
            "- [hackernews] Big thing: Points: 400 | https://example.com/400"
        ));
        assert_eq!(render(&grouped), text);
    }

    #[test]
    fn render_excerpts_first_line_and_appends_missing_link() {
        let mut record = alert("Long one", 120);
        record.content = format!("\n{}\nsecond line", "x".repeat(300));
        record.link = Some("https://example.org/post".to_string());
        let text = render(&group_by_severity(vec![record]));

        assert!(!text.contains("second line"));
        assert!(text.contains(&format!("{}...", "x".repeat(EXCERPT_CHARS))));
        assert!(text.contains("(https://example.org/post)"));
    }

    #[test]
    fn trending_ranks_by_popularity_and_caps() {
        let records = vec![alert("mid", 150), alert("top", 900), alert("low", 101)];
        let text = render_trending(&records, 2);
        let lines: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(lines, vec!["- top (🔥900)", "- mid (🔥150)"]);
    }
}
