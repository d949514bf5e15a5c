use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use url::Url;
// Use the interfaces crate for core types
pub use interfaces::defs::{
    Availability, Category, DisplayMeta, HintLevel, PriorItem, RawSuggestion, RequestError,
    ResolutionPath, ResolvedItem, ResultSet, SceneHints, SuggestionRequest, Theme, VideoId,
    UNKNOWN,
};

/// Which video search service Strategy B talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchBackend {
    /// YouTube Data API v3, needs `youtube_api_key`.
    DataApi,
    /// The `yt-dlp` command-line tool.
    YtDlp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Try the link the generative source embedded, search when that fails.
    TrustLinkThenSearch,
    /// Ignore embedded links entirely.
    SearchOnly,
}

/// How low-fidelity versions (covers, karaoke, remixes...) are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerPreference {
    PreferOriginal,
    PreferKaraoke,
}

/// What a probe concludes when it cannot reach the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeFailurePolicy {
    /// An unreachable probe is no evidence against the media: treat as available.
    FailOpen,
    FailClosed,
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout_seconds: u64,
    pub probe_timeout_seconds: u64,
    pub search_timeout_seconds: u64,
    pub search_limit: usize,
    pub search_backend: SearchBackend,
    pub youtube_api_key: Option<String>,
    pub youtube_api_base_url: String,
    pub yt_dlp_program: String,
    pub oembed_url: String,
    pub watch_url: String,
    pub strategy: ResolutionStrategy,
    pub marker_preference: MarkerPreference,
    pub probe_failure_policy: ProbeFailurePolicy,
    pub movie_scene_clips: bool,
    pub user_agent: String,
}

/// Strategy B never ranks fewer candidates than this.
pub const MIN_SEARCH_CANDIDATES: usize = 5;

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            request_timeout_seconds: 60,
            probe_timeout_seconds: 5,
            search_timeout_seconds: 20,
            search_limit: 10,
            search_backend: SearchBackend::YtDlp,
            youtube_api_key: None,
            youtube_api_base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            yt_dlp_program: "yt-dlp".to_string(),
            oembed_url: "https://www.youtube.com/oembed".to_string(),
            watch_url: "https://www.youtube.com/watch".to_string(),
            strategy: ResolutionStrategy::TrustLinkThenSearch,
            marker_preference: MarkerPreference::PreferOriginal,
            probe_failure_policy: ProbeFailurePolicy::FailOpen,
            movie_scene_clips: true,
            user_agent: "SongGame-Resolver/1.0".to_string(),
        }
    }
}

impl ResolverConfig {
    /// Defaults overlaid with whatever the environment provides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(key) = non_empty_var("OPENAI_API_KEY") {
            config.openai_api_key = Some(key);
        }
        if let Some(model) = non_empty_var("OPENAI_MODEL") {
            config.model = model;
        }
        if let Some(base_url) = non_empty_var("OPENAI_BASE_URL") {
            config.openai_base_url = base_url;
        }
        if let Some(key) = non_empty_var("YOUTUBE_API_KEY") {
            config.youtube_api_key = Some(key);
            config.search_backend = SearchBackend::DataApi;
        }
        match non_empty_var("SONGGAME_SEARCH_BACKEND").as_deref() {
            Some("yt-dlp") | Some("yt_dlp") => config.search_backend = SearchBackend::YtDlp,
            Some("data-api") | Some("data_api") => config.search_backend = SearchBackend::DataApi,
            _ => {}
        }

        config
    }

    /// Checks everything a resolution call needs before any request is sent.
    pub fn validate(&self) -> Result<()> {
        if self.openai_api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(ResolverError::Configuration(
                "OpenAI API key not found (set OPENAI_API_KEY)".to_string(),
            ));
        }
        if self.search_backend == SearchBackend::DataApi
            && self.youtube_api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(ResolverError::Configuration(
                "YouTube Data API search selected but no API key configured (set YOUTUBE_API_KEY)"
                    .to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ResolverError::Configuration(format!(
                "temperature {} outside 0.0..=2.0",
                self.temperature
            )));
        }
        if self.probe_timeout_seconds == 0 || self.probe_timeout_seconds > 9 {
            return Err(ResolverError::Configuration(format!(
                "probe timeout must be between 1 and 9 seconds, got {}",
                self.probe_timeout_seconds
            )));
        }
        for endpoint in [
            &self.openai_base_url,
            &self.youtube_api_base_url,
            &self.oembed_url,
            &self.watch_url,
        ] {
            Url::parse(endpoint)?;
        }
        Ok(())
    }

    /// Candidates requested per search, never below the ranking floor.
    pub fn effective_search_limit(&self) -> usize {
        self.search_limit.max(MIN_SEARCH_CANDIDATES)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_seconds)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Failures talking to, or interpreting, the generative text source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Transport(format!("request timed out: {}", err))
        } else {
            SourceError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Search error: {0}")]
    Search(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<RequestError> for ResolverError {
    fn from(err: RequestError) -> Self {
        ResolverError::Configuration(err.to_string())
    }
}

impl ResolverError {
    /// Whether offering the user a "try again" makes sense.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ResolverError::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, ResolverError>;
