pub mod youtube_api;
pub mod yt_dlp;

pub use youtube_api::YouTubeApiSearch;
pub use yt_dlp::YtDlpSearch;

use crate::traits::VideoSearch;
use crate::types::{ResolverConfig, Result, SearchBackend};
use std::sync::Arc;

/// Search backend selected by the configuration.
pub fn build_search(config: &ResolverConfig) -> Result<Arc<dyn VideoSearch>> {
    Ok(match config.search_backend {
        SearchBackend::DataApi => Arc::new(YouTubeApiSearch::new(config)?),
        SearchBackend::YtDlp => Arc::new(YtDlpSearch::new(config)),
    })
}
