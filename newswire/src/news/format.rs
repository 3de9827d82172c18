use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::{Article, NOT_AVAILABLE};

const DISPLAY_FORMAT: &str = "%d %b %Y, %I:%M %p";

/// Render an ISO-8601 timestamp as e.g. "15 Jan 2024, 10:30 AM", in the offset it
/// was given in. Anything unparsable is returned unchanged.
pub fn format_date(raw: &str) -> String {
    if raw.is_empty() || raw == NOT_AVAILABLE {
        return NOT_AVAILABLE.to_string();
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(DISPLAY_FORMAT).to_string();
    }
    // Offset-less or minute-precision timestamps are shown as-is; a trailing
    // `Z` carries no shift.
    let naive = raw.strip_suffix('Z').unwrap_or(raw);
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, pattern) {
            return dt.format(DISPLAY_FORMAT).to_string();
        }
    }
    // A bare date is taken as midnight.
    if let Some(dt) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return dt.format(DISPLAY_FORMAT).to_string();
    }
    raw.to_string()
}

/// Human-readable listing of `articles`, one entry per line.
pub fn format_articles(articles: &[Article]) -> Vec<String> {
    if articles.is_empty() {
        return vec!["No articles found for your query.".to_string()];
    }

    let mut lines = vec![format!("\nFound {} articles:", articles.len())];
    for (i, art) in articles.iter().enumerate() {
        lines.push(format!("\nArticle {}", i + 1));
        lines.push(format!("Title       : {}", art.title));
        lines.push(format!("Source      : {}", art.source_name));
        lines.push(format!("Published   : {}", format_date(&art.published_at)));
        lines.push(format!("Description : {}", art.description));
        lines.push(format!("URL         : {}", art.url));
        lines.push("-".repeat(50));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, published_at: &str) -> Article {
        Article {
            title: title.to_string(),
            description: "desc".to_string(),
            url: "https://example.org/a".to_string(),
            published_at: published_at.to_string(),
            source_name: "BBC News".to_string(),
        }
    }

    #[test]
    fn formats_utc_timestamp() {
        assert_eq!(format_date("2024-01-15T10:30:00Z"), "15 Jan 2024, 10:30 AM");
        assert_eq!(format_date("2024-01-15T22:05:00+00:00"), "15 Jan 2024, 10:05 PM");
    }

    #[test]
    fn keeps_given_offset_and_naive_times() {
        assert_eq!(format_date("2024-03-01T09:00:00+02:00"), "01 Mar 2024, 09:00 AM");
        assert_eq!(format_date("2024-03-01T13:15:00"), "01 Mar 2024, 01:15 PM");
    }

    #[test]
    fn date_only_and_minute_precision_values_are_formatted() {
        assert_eq!(format_date("2024-01-15"), "15 Jan 2024, 12:00 AM");
        assert_eq!(format_date("2024-01-15T10:30Z"), "15 Jan 2024, 10:30 AM");
        assert_eq!(format_date("2024-01-15T22:45"), "15 Jan 2024, 10:45 PM");
    }

    #[test]
    fn unparsable_dates_pass_through() {
        assert_eq!(format_date("not-a-date"), "not-a-date");
        assert_eq!(format_date("N/A"), "N/A");
        assert_eq!(format_date(""), "N/A");
    }

    #[test]
    fn empty_list_reports_no_results() {
        assert_eq!(format_articles(&[]), vec!["No articles found for your query."]);
    }

    #[test]
    fn listing_numbers_articles_and_formats_dates() {
        let lines = format_articles(&[article("First", "2024-01-15T10:30:00Z"), article("Second", "x")]);
        assert_eq!(lines[0], "\nFound 2 articles:");
        assert_eq!(lines[1], "\nArticle 1");
        assert_eq!(lines[2], "Title       : First");
        assert_eq!(lines[4], "Published   : 15 Jan 2024, 10:30 AM");
        assert!(lines.contains(&"Published   : x".to_string()));
        assert_eq!(lines.iter().filter(|l| *l == &"-".repeat(50)).count(), 2);
    }
}
