use crate::dedupe::dedupe;
use crate::fetcher::SuggestionFetcher;
use crate::llm_adapter::OpenAiChatAdapter;
use crate::media_utils::links::first_video_id;
use crate::probe::OEmbedProbe;
use crate::ranking::{rank_candidates, RankingContext};
use crate::sources::build_search;
use crate::traits::{AvailabilityProbe, SuggestionSource, VideoSearch};
use crate::types::{
    Availability, Category, DisplayMeta, MarkerPreference, RawSuggestion, ResolutionPath,
    ResolutionStrategy, ResolvedItem, ResolverConfig, Result, ResultSet, SceneHints,
    SuggestionRequest, VideoId, MIN_SEARCH_CANDIDATES, UNKNOWN,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Knobs of the resolution chain that do not concern any single backend.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionSettings {
    pub strategy: ResolutionStrategy,
    pub marker_preference: MarkerPreference,
    pub search_limit: usize,
    pub movie_scene_clips: bool,
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        Self::from(&ResolverConfig::default())
    }
}

impl From<&ResolverConfig> for ResolutionSettings {
    fn from(config: &ResolverConfig) -> Self {
        Self {
            strategy: config.strategy,
            marker_preference: config.marker_preference,
            search_limit: config.effective_search_limit(),
            movie_scene_clips: config.movie_scene_clips,
        }
    }
}

/// Outcome of resolving one suggestion to a playable video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaResolution {
    pub video: VideoId,
    pub availability: Availability,
    pub canonical_title: Option<String>,
    pub path: ResolutionPath,
}

/// Bookkeeping for one resolution call. Partial resolution is reported here,
/// never raised.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    pub requested: usize,
    pub suggested: usize,
    pub resolved: usize,
    /// Titles that could not be matched to any video.
    pub unresolved: Vec<String>,
    pub duplicates_dropped: usize,
    pub via_link: usize,
    pub via_search: usize,
    pub unconfirmed: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl ResolutionReport {
    fn new(requested: usize) -> Self {
        Self {
            requested,
            suggested: 0,
            resolved: 0,
            unresolved: Vec::new(),
            duplicates_dropped: 0,
            via_link: 0,
            via_search: 0,
            unconfirmed: 0,
            started_at: Utc::now(),
            elapsed_ms: 0,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.resolved < self.requested
    }

    /// Fewer than half of the requested items made it through.
    pub fn needs_warning(&self) -> bool {
        self.resolved * 2 < self.requested
    }

    fn record(&mut self, item: &ResolvedItem) {
        match item.resolution {
            ResolutionPath::EmbeddedLink => self.via_link += 1,
            ResolutionPath::Search => self.via_search += 1,
            ResolutionPath::TextOnly => {}
        }
        if item.available == Availability::Unconfirmed {
            self.unconfirmed += 1;
        }
    }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub result_set: ResultSet,
    pub report: ResolutionReport,
}

/// Turns a themed request into an ordered, de-duplicated set of game-ready
/// items. Holds no per-session state; exclusions come in with the request.
pub struct Resolver {
    fetcher: SuggestionFetcher,
    search: Arc<dyn VideoSearch>,
    probe: Arc<dyn AvailabilityProbe>,
    settings: ResolutionSettings,
}

impl Resolver {
    pub fn new(
        source: Arc<dyn SuggestionSource>,
        search: Arc<dyn VideoSearch>,
        probe: Arc<dyn AvailabilityProbe>,
        settings: ResolutionSettings,
    ) -> Self {
        Self {
            fetcher: SuggestionFetcher::new(source, settings.marker_preference),
            search,
            probe,
            settings,
        }
    }

    /// Wires the production backends. Configuration problems surface here,
    /// before any request goes out.
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        config.validate()?;

        let source: Arc<dyn SuggestionSource> = Arc::new(OpenAiChatAdapter::new(config)?);
        let search = build_search(config)?;
        let probe: Arc<dyn AvailabilityProbe> = Arc::new(OEmbedProbe::new(config)?);

        info!(
            "Resolver ready: source={}, search={}, strategy={:?}",
            source.source_name(),
            search.backend_name(),
            config.strategy
        );
        Ok(Self::new(source, search, probe, ResolutionSettings::from(config)))
    }

    pub fn settings(&self) -> &ResolutionSettings {
        &self.settings
    }

    fn wants_media(&self, category: Category) -> bool {
        category.supports_media()
            && (category != Category::MovieScene || self.settings.movie_scene_clips)
    }

    pub async fn resolve(&self, request: &SuggestionRequest) -> Result<Resolution> {
        let start_time = Instant::now();
        let category = request.category();
        let mut report = ResolutionReport::new(request.count());

        let suggestions = self.fetcher.fetch_suggestions(request).await?;
        report.suggested = suggestions.len();

        let mut items = Vec::with_capacity(suggestions.len());
        for raw in &suggestions {
            if !self.wants_media(category) {
                items.push(build_item(raw, category, None));
                continue;
            }

            match self.resolve_media(raw, category).await {
                Some(media) => items.push(build_item(raw, category, Some(media))),
                None => {
                    warn!("No video found for '{}'", raw.title_or_unknown());
                    report.unresolved.push(raw.title_or_unknown().to_string());
                }
            }
        }

        let before = items.len();
        let items = dedupe(items);
        report.duplicates_dropped = before - items.len();
        report.resolved = items.len();
        for item in &items {
            report.record(item);
        }
        report.elapsed_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Resolved {}/{} {} for '{}' ({} via link, {} via search, {} unresolved, {} duplicates) in {}ms",
            report.resolved,
            report.requested,
            category.plural(),
            request.theme(),
            report.via_link,
            report.via_search,
            report.unresolved.len(),
            report.duplicates_dropped,
            report.elapsed_ms
        );
        if report.needs_warning() {
            warn!(
                "Only {} of {} requested {} could be resolved",
                report.resolved,
                report.requested,
                category.plural()
            );
        }

        Ok(Resolution {
            result_set: ResultSet::new(category, request.theme().clone(), items),
            report,
        })
    }

    /// Strategy A (embedded link) then Strategy B (ranked search). `None`
    /// means the item has no usable video.
    pub async fn resolve_media(
        &self,
        raw: &RawSuggestion,
        category: Category,
    ) -> Option<MediaResolution> {
        let mut unavailable_link = None;

        if self.settings.strategy == ResolutionStrategy::TrustLinkThenSearch {
            if let Some(video) = raw.link.as_deref().and_then(first_video_id) {
                let outcome = self.probe.probe(&video).await;
                if outcome.is_confirmed() {
                    debug!("Embedded link {} confirmed for '{}'", video, raw.title_or_unknown());
                    return Some(MediaResolution {
                        canonical_title: outcome.canonical_title().map(str::to_string),
                        availability: Availability::Confirmed,
                        path: ResolutionPath::EmbeddedLink,
                        video,
                    });
                }
                debug!("Embedded link {} unavailable, searching instead", video);
                unavailable_link = Some(video);
            }
        }

        match self.search_media(raw, category).await {
            Some(found) => Some(found),
            None => unavailable_link.map(|video| MediaResolution {
                video,
                availability: Availability::ConfirmedUnavailable,
                canonical_title: None,
                path: ResolutionPath::EmbeddedLink,
            }),
        }
    }

    async fn search_media(&self, raw: &RawSuggestion, category: Category) -> Option<MediaResolution> {
        let query = search_query(raw, category, self.settings.marker_preference);
        let limit = self.settings.search_limit.max(MIN_SEARCH_CANDIDATES);

        let candidates = match self.search.search(&query, limit).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("{} failed for '{}': {}", self.search.backend_name(), query, e);
                return None;
            }
        };
        if candidates.is_empty() {
            debug!("No candidates for '{}'", query);
            return None;
        }

        let context = RankingContext {
            title: raw.title_or_unknown(),
            contributor: ranking_contributor(raw, category),
            preference: self.settings.marker_preference,
        };
        let ranked = rank_candidates(candidates, &context);

        for scored in &ranked {
            let outcome = self.probe.probe(&scored.candidate.video_id).await;
            if outcome.is_confirmed() {
                return Some(MediaResolution {
                    video: scored.candidate.video_id.clone(),
                    availability: Availability::Confirmed,
                    canonical_title: outcome.canonical_title().map(str::to_string),
                    path: ResolutionPath::Search,
                });
            }
        }

        // Nothing probed as available; the best guess is still worth offering.
        ranked.into_iter().next().map(|top| MediaResolution {
            video: top.candidate.video_id,
            availability: Availability::Unconfirmed,
            canonical_title: None,
            path: ResolutionPath::Search,
        })
    }
}

/// Free-text query for Strategy B.
pub fn search_query(raw: &RawSuggestion, category: Category, preference: MarkerPreference) -> String {
    let mut parts: Vec<&str> = Vec::new();
    match category {
        Category::MovieScene => {
            if let Some(movie) = known(raw.source.as_deref()) {
                parts.push(movie);
            }
            parts.push(raw.title_or_unknown());
            parts.push("scene");
        }
        Category::Song | Category::Quote => {
            parts.push(raw.title_or_unknown());
            if let Some(contributor) = known(raw.contributor.as_deref()) {
                parts.push(contributor);
            }
            parts.push(match preference {
                MarkerPreference::PreferOriginal => "official",
                MarkerPreference::PreferKaraoke => "karaoke",
            });
        }
    }
    parts.join(" ")
}

fn known(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && *v != UNKNOWN)
}

fn ranking_contributor(raw: &RawSuggestion, category: Category) -> &str {
    match category {
        Category::MovieScene => known(raw.source.as_deref()).unwrap_or(UNKNOWN),
        Category::Song | Category::Quote => raw.contributor_or_unknown(),
    }
}

fn build_item(raw: &RawSuggestion, category: Category, media: Option<MediaResolution>) -> ResolvedItem {
    let suggested_title = raw.title_or_unknown().to_string();
    let display_meta = DisplayMeta {
        source: raw.source.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        contributor: raw.contributor_or_unknown().to_string(),
        year: raw.year.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        genre: raw.genre.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        suggested_title: suggested_title.clone(),
    };
    let hints = (category == Category::MovieScene).then(|| SceneHints {
        anonymized: raw.anonymized_description.clone(),
        description: raw.description.clone(),
    });

    match media {
        Some(media) => {
            let display_title = media
                .canonical_title
                .or_else(|| (suggested_title != UNKNOWN).then(|| suggested_title.clone()))
                .unwrap_or_else(|| media.video.placeholder_title());
            ResolvedItem {
                display_title,
                display_meta,
                media: Some(media.video),
                available: media.availability,
                resolution: media.path,
                hints,
            }
        }
        None => ResolvedItem {
            display_title: suggested_title,
            display_meta,
            media: None,
            // nothing to probe for display-only items
            available: Availability::Confirmed,
            resolution: ResolutionPath::TextOnly,
            hints,
        },
    }
}
