use crate::parser::SuggestionParser;
use crate::prompt::build_prompt;
use crate::traits::SuggestionSource;
use crate::types::{MarkerPreference, RawSuggestion, SourceError, SuggestionRequest};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Asks the generative source for a themed list and validates the reply.
///
/// One call per request. Retrying is the caller's decision because every
/// call is metered by the provider.
pub struct SuggestionFetcher {
    source: Arc<dyn SuggestionSource>,
    marker_preference: MarkerPreference,
}

impl SuggestionFetcher {
    pub fn new(source: Arc<dyn SuggestionSource>, marker_preference: MarkerPreference) -> Self {
        Self {
            source,
            marker_preference,
        }
    }

    pub fn source_name(&self) -> String {
        self.source.source_name()
    }

    /// Returns a non-empty list of normalized suggestions or a `SourceError`.
    pub async fn fetch_suggestions(
        &self,
        request: &SuggestionRequest,
    ) -> Result<Vec<RawSuggestion>, SourceError> {
        let start_time = Instant::now();
        let prompt = build_prompt(request, self.marker_preference);

        info!(
            "Fetching {} {} for theme '{}' from {} ({} excluded)",
            request.count(),
            request.category().plural(),
            request.theme(),
            self.source.source_name(),
            request.exclude().len()
        );
        debug!("User instruction: {}", prompt.user);

        let reply = self.source.complete(&prompt).await.map_err(|e| {
            error!("Generative source call failed: {}", e);
            e
        })?;

        let parser = SuggestionParser::new(request.category());
        let suggestions = parser.parse_reply(&reply, request.exclude(), request.count())?;

        debug!(
            "Fetched {} suggestions in {}ms",
            suggestions.len(),
            start_time.elapsed().as_millis()
        );
        Ok(suggestions)
    }
}
