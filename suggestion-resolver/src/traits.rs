use crate::types::{Availability, Result, SourceError, VideoId};
use async_trait::async_trait;
use std::time::Duration;

/// Instructions handed to the generative text source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// A one-shot text completion service (the "generative text source").
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    /// Human-readable name for logs
    fn source_name(&self) -> String;

    /// Send both instructions and return the raw reply text
    async fn complete(&self, prompt: &Prompt) -> std::result::Result<String, SourceError>;
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCandidate {
    pub video_id: VideoId,
    pub title: String,
    pub channel: String,
    pub duration: Option<Duration>,
}

/// Free-text video search, results in the service's own ranking order.
#[async_trait]
pub trait VideoSearch: Send + Sync {
    fn backend_name(&self) -> String;

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchCandidate>>;
}

/// Verdict of an availability probe. A probe never fails; transport problems
/// are folded into one of these by its failure policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Confirmed { canonical_title: Option<String> },
    Unavailable,
}

impl ProbeOutcome {
    pub fn availability(&self) -> Availability {
        match self {
            ProbeOutcome::Confirmed { .. } => Availability::Confirmed,
            ProbeOutcome::Unavailable => Availability::ConfirmedUnavailable,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, ProbeOutcome::Confirmed { .. })
    }

    pub fn canonical_title(&self) -> Option<&str> {
        match self {
            ProbeOutcome::Confirmed { canonical_title } => canonical_title.as_deref(),
            ProbeOutcome::Unavailable => None,
        }
    }
}

#[async_trait]
pub trait AvailabilityProbe: Send + Sync {
    async fn probe(&self, video: &VideoId) -> ProbeOutcome;
}
