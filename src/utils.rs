use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse a W3C datetime as used in sitemaps: `YYYY`, `YYYY-MM`, `YYYY-MM-DD`,
/// or a full timestamp with optional seconds and a `Z`/`±hh:mm` designator.
/// Timestamps without a designator are read as UTC.
pub fn parse_w3c_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let zoned = match s.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{}+00:00", rest),
        None => s.to_string(),
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&zoned) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(&zoned, "%Y-%m-%dT%H:%M%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    let date = match s.len() {
        10 => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
        7 => NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").ok(),
        4 if s.bytes().all(|b| b.is_ascii_digit()) => {
            NaiveDate::from_ymd_opt(s.parse().ok()?, 1, 1)
        }
        _ => None,
    }?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// Sitemap boolean: `yes`/`no`, also `true`/`false`.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" => Some(true),
        "no" | "false" => Some(false),
        _ => None,
    }
}

/// Split a comma-separated list, trimming items and dropping blanks.
pub fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}
