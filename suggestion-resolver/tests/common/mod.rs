#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, Once};
use std::time::Duration;
use suggestion_resolver::{
    AvailabilityProbe, ProbeOutcome, ResolverError, Result, SearchCandidate, VideoId, VideoSearch,
};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

pub fn candidate(id: &str, title: &str, channel: &str, seconds: Option<u64>) -> SearchCandidate {
    SearchCandidate {
        video_id: VideoId::new(id),
        title: title.to_string(),
        channel: channel.to_string(),
        duration: seconds.map(Duration::from_secs),
    }
}

/// Search fake answering from a fixed table keyed by query substring.
#[derive(Default)]
pub struct ScriptedSearch {
    answers: Vec<(String, Vec<SearchCandidate>)>,
    failing: bool,
    queries: Mutex<Vec<(String, usize)>>,
}

impl ScriptedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, query_contains: &str, candidates: Vec<SearchCandidate>) -> Self {
        self.answers.push((query_contains.to_lowercase(), candidates));
        self
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl VideoSearch for ScriptedSearch {
    fn backend_name(&self) -> String {
        "scripted search".to_string()
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchCandidate>> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), limit));
        if self.failing {
            return Err(ResolverError::Search("search service down".to_string()));
        }
        let lowered = query.to_lowercase();
        Ok(self
            .answers
            .iter()
            .find(|(needle, _)| lowered.contains(needle.as_str()))
            .map(|(_, candidates)| candidates.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

/// Probe fake: listed ids are unavailable, everything else is confirmed,
/// optionally with a canonical title.
#[derive(Default)]
pub struct ScriptedProbe {
    unavailable: HashSet<String>,
    titles: HashMap<String, String>,
    probed: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable(mut self, id: &str) -> Self {
        self.unavailable.insert(id.to_string());
        self
    }

    pub fn titled(mut self, id: &str, title: &str) -> Self {
        self.titles.insert(id.to_string(), title.to_string());
        self
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AvailabilityProbe for ScriptedProbe {
    async fn probe(&self, video: &VideoId) -> ProbeOutcome {
        self.probed.lock().unwrap().push(video.as_str().to_string());
        if self.unavailable.contains(video.as_str()) {
            ProbeOutcome::Unavailable
        } else {
            ProbeOutcome::Confirmed {
                canonical_title: self.titles.get(video.as_str()).cloned(),
            }
        }
    }
}
