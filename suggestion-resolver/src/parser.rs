use crate::media_utils::text::clean;
use crate::types::{Category, PriorItem, RawSuggestion, SourceError, UNKNOWN};
use indexmap::IndexSet;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Iterator over balanced `open ... close` spans of free text, left to right.
///
/// Delimiters inside JSON string literals are ignored. A span that never
/// closes is skipped and scanning resumes just after its opening delimiter,
/// so chatty replies with a stray bracket before the payload still work.
pub struct BalancedSpans<'a> {
    text: &'a str,
    position: usize,
    last_start: Option<usize>,
    open: char,
    close: char,
}

impl BalancedSpans<'_> {
    /// Resume scanning just inside the span returned last, so spans nested
    /// in it are visited too.
    pub fn rewind_into_last(&mut self) {
        if let Some(start) = self.last_start.take() {
            self.position = start + self.open.len_utf8();
        }
    }
}

impl<'a> Iterator for BalancedSpans<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        while self.position < self.text.len() {
            let offset = self.text[self.position..].find(self.open)?;
            let start = self.position + offset;
            match balanced_end(&self.text[start..], self.open, self.close) {
                Some(len) => {
                    self.position = start + len;
                    self.last_start = Some(start);
                    return Some(&self.text[start..start + len]);
                }
                None => {
                    self.position = start + self.open.len_utf8();
                }
            }
        }
        None
    }
}

/// Balanced bracketed lists found in `text`.
pub fn bracketed_spans(text: &str) -> BalancedSpans<'_> {
    BalancedSpans {
        text,
        position: 0,
        last_start: None,
        open: '[',
        close: ']',
    }
}

/// Byte length of the balanced span at the start of `text`, if it closes.
fn balanced_end(text: &str, open: char, close: char) -> Option<usize> {
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (index, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        if c == '"' {
            in_string = true;
        } else if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(index + c.len_utf8());
            }
        }
    }
    None
}

/// First bracketed span in `text` that parses as a JSON array holding at
/// least one object. A span that does not parse is searched for nested lists.
pub fn extract_first_list(text: &str) -> Option<Vec<Value>> {
    let mut spans = bracketed_spans(text);
    while let Some(span) = spans.next() {
        match serde_json::from_str::<Value>(span) {
            Ok(Value::Array(values)) if values.iter().any(Value::is_object) => return Some(values),
            _ => spans.rewind_into_last(),
        }
    }
    None
}

// Field names the generative source has been seen to use, most specific first.
const TITLE_KEYS: &[&str] = &["title", "quote", "song", "scene", "name"];
const SOURCE_KEYS: &[&str] = &["source", "movie", "film", "show", "work", "album", "game"];
const CONTRIBUTOR_KEYS: &[&str] = &["artist", "character", "speaker", "contributor", "band", "author", "performer"];
const LINK_KEYS: &[&str] = &["link", "url", "youtube", "video", "youtube_link"];
const DESCRIPTION_KEYS: &[&str] = &["description", "scene_description"];
const ANONYMIZED_KEYS: &[&str] = &["anonymized_description", "anonymized", "anonymous_description", "hint"];

/// Turns untrusted replies into validated suggestions for one category.
pub struct SuggestionParser {
    category: Category,
}

impl SuggestionParser {
    pub fn new(category: Category) -> Self {
        Self { category }
    }

    /// Parse a full reply. Fails when no list can be found or nothing in it
    /// survives validation; never returns an invalid item.
    pub fn parse_reply(
        &self,
        reply: &str,
        exclude: &IndexSet<PriorItem>,
        limit: usize,
    ) -> Result<Vec<RawSuggestion>, SourceError> {
        debug!("Parsing generative reply ({} bytes)", reply.len());

        let values = extract_first_list(reply).ok_or_else(|| {
            SourceError::MalformedResponse("no JSON list of objects found in reply".to_string())
        })?;
        let offered = values.len();

        let mut seen: HashSet<PriorItem> = HashSet::new();
        let mut suggestions = Vec::new();

        for value in &values {
            let Some(raw) = raw_from_value(value) else {
                debug!("Discarding non-object list element");
                continue;
            };
            let Some(normalized) = normalize(raw, self.category) else {
                debug!("Discarding suggestion without a title");
                continue;
            };

            let identity = normalized.prior_item();
            if exclude.contains(&identity) {
                debug!("Discarding excluded suggestion: {}", identity);
                continue;
            }
            if !seen.insert(identity.clone()) {
                debug!("Discarding repeated suggestion: {}", identity);
                continue;
            }

            suggestions.push(normalized);
        }

        if suggestions.is_empty() {
            return Err(SourceError::MalformedResponse(format!(
                "none of the {} listed items had the expected {} fields",
                offered,
                self.category.label()
            )));
        }

        if suggestions.len() > limit {
            debug!("Truncating {} suggestions to the requested {}", suggestions.len(), limit);
            suggestions.truncate(limit);
        }

        if suggestions.len() < offered {
            warn!(
                "Kept {} of {} suggested {}",
                suggestions.len(),
                offered,
                self.category.plural()
            );
        } else {
            info!("Parsed {} suggested {}", suggestions.len(), self.category.plural());
        }

        Ok(suggestions)
    }
}

/// Read one list element. Non-objects are rejected; unknown keys ignored.
pub fn raw_from_value(value: &Value) -> Option<RawSuggestion> {
    let map = value.as_object()?;
    Some(RawSuggestion {
        title: first_text(map, TITLE_KEYS),
        source: first_text(map, SOURCE_KEYS),
        contributor: first_text(map, CONTRIBUTOR_KEYS),
        year: first_text(map, &["year", "release_year"]),
        genre: first_text(map, &["genre"]),
        link: first_text(map, LINK_KEYS),
        description: first_text(map, DESCRIPTION_KEYS),
        anonymized_description: first_text(map, ANONYMIZED_KEYS),
    })
}

fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key)? {
        Value::String(s) => clean(Some(s.clone())),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Validate and complete one suggestion.
///
/// Drops items without a title and fills source, contributor, year and genre
/// with [`UNKNOWN`] so display code never has to check for absence. Scene
/// descriptions are left as they are: a missing anonymized description is
/// never made up.
pub fn normalize(raw: RawSuggestion, category: Category) -> Option<RawSuggestion> {
    let title = clean(raw.title)?;
    let unknown = || Some(UNKNOWN.to_string());

    let mut normalized = RawSuggestion {
        title: Some(title),
        source: clean(raw.source).or_else(unknown),
        contributor: clean(raw.contributor).or_else(unknown),
        year: clean(raw.year).or_else(unknown),
        genre: clean(raw.genre).or_else(unknown),
        link: clean(raw.link),
        description: clean(raw.description),
        anonymized_description: clean(raw.anonymized_description),
    };

    if category != Category::MovieScene {
        normalized.description = None;
        normalized.anonymized_description = None;
    }

    Some(normalized)
}
