pub mod types;
pub mod traits;
pub mod media_utils;
pub mod parser;
pub mod prompt;
pub mod llm_adapter;
pub mod fetcher;
pub mod ranking;
pub mod probe;
pub mod sources;
pub mod dedupe;
pub mod resolver;

pub use types::*;
pub use traits::{AvailabilityProbe, ProbeOutcome, Prompt, SearchCandidate, SuggestionSource, VideoSearch};
pub use fetcher::SuggestionFetcher;
pub use parser::SuggestionParser;
pub use llm_adapter::{MockLlmAdapter, OpenAiChatAdapter};
pub use probe::OEmbedProbe;
pub use sources::{build_search, YouTubeApiSearch, YtDlpSearch};
pub use resolver::{Resolution, ResolutionReport, ResolutionSettings, Resolver};
pub use interfaces::state::{ExclusionHistory, GameSession};
