/// Video-platform utility functions for the resolver

/// Link utilities
pub mod links {
    use crate::types::VideoId;
    use once_cell::sync::Lazy;
    use regex::Regex;
    use std::collections::HashSet;

    // Watch (`v=` anywhere in the query), short and embed forms. The trailing
    // group keeps an 11-char prefix of a longer token from matching.
    static VIDEO_LINK_PATTERN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r#"(?i)(?:https?://)?(?:www\.|m\.|music\.)?(?:youtube\.com/(?:watch\?(?:[^\s#"'<>]*?&)?v=|embed/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)"#,
        )
        .expect("video link pattern is valid")
    });

    /// Extract video identifiers from free text, in order of appearance,
    /// each at most once.
    pub fn extract_video_ids(text: &str) -> Vec<VideoId> {
        let mut seen = HashSet::new();
        VIDEO_LINK_PATTERN
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|id| seen.insert(id.to_string()))
            .map(VideoId::new)
            .collect()
    }

    pub fn first_video_id(text: &str) -> Option<VideoId> {
        extract_video_ids(text).into_iter().next()
    }
}

/// Duration parsing for the formats search backends report
pub mod duration {
    use std::time::Duration;

    /// Parse `"225"`, `"3:45"` or `"1:02:03"`.
    pub fn parse_clock(text: &str) -> Option<Duration> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let mut total: u64 = 0;
        let parts: Vec<&str> = text.split(':').collect();
        if parts.len() > 3 {
            return None;
        }
        for part in parts {
            let value: u64 = part.trim().parse().ok()?;
            total = total.checked_mul(60)?.checked_add(value)?;
        }
        Some(Duration::from_secs(total))
    }

    /// Parse ISO-8601 durations as the Data API returns them (`PT1H2M3S`).
    pub fn parse_iso8601(text: &str) -> Option<Duration> {
        let rest = text.trim().strip_prefix('P')?;
        let (days_part, time_part) = match rest.split_once('T') {
            Some((d, t)) => (d, t),
            None => (rest, ""),
        };

        let mut total: u64 = 0;
        let mut number = String::new();
        for c in days_part.chars() {
            if c.is_ascii_digit() {
                number.push(c);
            } else if c == 'D' {
                let days = number.parse::<u64>().ok()?;
                total = total.checked_add(days.checked_mul(86_400)?)?;
                number.clear();
            } else {
                return None;
            }
        }
        if !number.is_empty() {
            return None;
        }

        for c in time_part.chars() {
            if c.is_ascii_digit() {
                number.push(c);
                continue;
            }
            let value: u64 = number.parse().ok()?;
            number.clear();
            let seconds = match c {
                'H' => value.checked_mul(3_600)?,
                'M' => value.checked_mul(60)?,
                'S' => value,
                _ => return None,
            };
            total = total.checked_add(seconds)?;
        }
        if !number.is_empty() {
            return None;
        }

        Some(Duration::from_secs(total))
    }
}

/// Text helpers shared by parsing and ranking
pub mod text {
    /// Case-insensitive substring test. An empty needle never matches.
    pub fn contains_ci(haystack: &str, needle: &str) -> bool {
        let needle = needle.trim();
        !needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
    }

    /// Trim and drop empty strings.
    pub fn clean(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Undo the handful of HTML entities search APIs put in titles.
    pub fn unescape_html(text: &str) -> String {
        text.replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&#039;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&")
    }
}
