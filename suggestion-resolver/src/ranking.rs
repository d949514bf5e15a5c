use crate::media_utils::text::contains_ci;
use crate::traits::SearchCandidate;
use crate::types::{MarkerPreference, UNKNOWN};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Reverse;
use std::time::Duration;
use tracing::debug;

/// Whole title words that mark a version other than the original recording.
static LOW_FIDELITY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:covers?|karaoke|instrumental|remix(?:es|ed)?|sped[ -]up|slowed|nightcore)\b")
        .expect("low-fidelity marker regex is valid")
});

/// Markers that are the point of the search under `PreferKaraoke`.
static KARAOKE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:karaoke|instrumental)\b").expect("karaoke marker regex is valid")
});

const OFFICIAL_CHANNEL_MARKERS: &[&str] = &["vevo", "official", "records"];
const TOPIC_CHANNEL_SUFFIX: &str = "- topic";
const MIN_FULL_LENGTH: Duration = Duration::from_secs(60);

/// What the candidate is being compared against.
#[derive(Debug, Clone)]
pub struct RankingContext<'a> {
    pub title: &'a str,
    pub contributor: &'a str,
    pub preference: MarkerPreference,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredCandidate {
    pub candidate: SearchCandidate,
    pub score: i32,
    /// Index in the raw search results.
    pub position: usize,
}

/// Heuristic score of one search hit; higher is better.
pub fn score_candidate(candidate: &SearchCandidate, context: &RankingContext<'_>) -> i32 {
    let title = candidate.title.to_lowercase();
    let channel = candidate.channel.trim().to_lowercase();
    let mut score = 0;

    if contains_ci(&title, context.title) {
        score += 3;
    }
    if OFFICIAL_CHANNEL_MARKERS.iter().any(|m| channel.contains(m)) {
        score += 4;
    }
    if channel.ends_with(TOPIC_CHANNEL_SUFFIX) {
        score += 3;
    }
    if context.contributor != UNKNOWN && contains_ci(&channel, context.contributor) {
        score += 2;
    }
    if title.contains("official") {
        score += 2;
    }
    score += marker_adjustment(&title, context.preference);
    if candidate.duration.is_some_and(|d| d > MIN_FULL_LENGTH) {
        score += 1;
    }

    score
}

fn marker_adjustment(title: &str, preference: MarkerPreference) -> i32 {
    match preference {
        MarkerPreference::PreferOriginal => {
            if LOW_FIDELITY_PATTERN.is_match(title) {
                -3
            } else {
                0
            }
        }
        MarkerPreference::PreferKaraoke => {
            if KARAOKE_PATTERN.is_match(title) {
                3
            } else if LOW_FIDELITY_PATTERN.is_match(title) {
                -3
            } else {
                0
            }
        }
    }
}

/// Score and sort, best first. Equal scores keep the search service's order.
pub fn rank_candidates(
    candidates: Vec<SearchCandidate>,
    context: &RankingContext<'_>,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .enumerate()
        .map(|(position, candidate)| ScoredCandidate {
            score: score_candidate(&candidate, context),
            candidate,
            position,
        })
        .collect();

    // sort_by_key is stable
    scored.sort_by_key(|c| Reverse(c.score));

    for c in &scored {
        debug!(
            "Candidate {} '{}' ({}) scored {}",
            c.candidate.video_id, c.candidate.title, c.candidate.channel, c.score
        );
    }
    scored
}
