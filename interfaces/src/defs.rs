use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use uuid::Uuid;

/// Sentinel used for every optional display field the generative source left out.
pub const UNKNOWN: &str = "Unknown";

/// What the players are guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Song,
    Quote,
    MovieScene,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Song => "song",
            Category::Quote => "quote",
            Category::MovieScene => "movie scene",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            Category::Song => "songs",
            Category::Quote => "quotes",
            Category::MovieScene => "movie scenes",
        }
    }

    /// Whether items of this category can carry a playable clip at all.
    pub fn supports_media(&self) -> bool {
        matches!(self, Category::Song | Category::MovieScene)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "song" | "songs" => Ok(Category::Song),
            "quote" | "quotes" => Ok(Category::Quote),
            "moviescene" | "moviescenes" | "movie" | "scene" => Ok(Category::MovieScene),
            other => Err(RequestError::UnknownCategory(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("theme must not be empty")]
    EmptyTheme,

    #[error("requested item count must be positive")]
    ZeroCount,

    #[error("unknown category: {0}")]
    UnknownCategory(String),
}

/// User-supplied theme text. Trimmed, otherwise opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Theme(String);

impl Theme {
    pub fn new(raw: &str) -> Result<Self, RequestError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RequestError::EmptyTheme);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of an item already shown in this session, used to ask the
/// generative source for something new.
///
/// Equality and hashing ignore case and surrounding whitespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorItem {
    pub title: String,
    pub contributor: String,
}

impl PriorItem {
    pub fn new(title: impl Into<String>, contributor: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            contributor: contributor.into(),
        }
    }

    pub fn identity_key(&self) -> (String, String) {
        (
            self.title.trim().to_lowercase(),
            self.contributor.trim().to_lowercase(),
        )
    }
}

impl PartialEq for PriorItem {
    fn eq(&self, other: &Self) -> bool {
        self.identity_key() == other.identity_key()
    }
}

impl Eq for PriorItem {}

impl Hash for PriorItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity_key().hash(state);
    }
}

impl fmt::Display for PriorItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.title.trim(), self.contributor.trim())
    }
}

/// One resolution call's input. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct SuggestionRequest {
    category: Category,
    theme: Theme,
    exclude: IndexSet<PriorItem>,
    count: usize,
}

impl SuggestionRequest {
    pub fn new(category: Category, theme: Theme, count: usize) -> Result<Self, RequestError> {
        if count == 0 {
            return Err(RequestError::ZeroCount);
        }
        Ok(Self {
            category,
            theme,
            exclude: IndexSet::new(),
            count,
        })
    }

    pub fn with_exclusions<I>(mut self, prior: I) -> Self
    where
        I: IntoIterator<Item = PriorItem>,
    {
        self.exclude.extend(prior);
        self
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn exclude(&self) -> &IndexSet<PriorItem> {
        &self.exclude
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Unvalidated item as the generative source described it. Any field may be
/// missing or invented.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSuggestion {
    pub title: Option<String>,
    pub source: Option<String>,
    pub contributor: Option<String>,
    pub year: Option<String>,
    pub genre: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub anonymized_description: Option<String>,
}

impl RawSuggestion {
    pub fn title_or_unknown(&self) -> &str {
        self.title.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn contributor_or_unknown(&self) -> &str {
        self.contributor.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn prior_item(&self) -> PriorItem {
        PriorItem::new(self.title_or_unknown(), self.contributor_or_unknown())
    }
}

/// A YouTube video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }

    pub fn embed_url(&self) -> String {
        format!("https://www.youtube.com/embed/{}", self.0)
    }

    /// Title shown when neither the generative source nor the platform named the video.
    pub fn placeholder_title(&self) -> String {
        let short: String = self.0.chars().take(8).collect();
        format!("Video {}...", short)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// The platform answered and the video exists, or the check could not be
    /// completed under a fail-open policy.
    Confirmed,
    /// No candidate passed a probe; the media is a best guess.
    Unconfirmed,
    /// The platform explicitly reported the video as missing.
    ConfirmedUnavailable,
}

/// How an item's media reference was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPath {
    /// Taken from the link the generative source embedded.
    EmbeddedLink,
    /// Found by an independent ranked search.
    Search,
    /// Display-only item, no media requested.
    TextOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMeta {
    pub source: String,
    pub contributor: String,
    pub year: String,
    pub genre: String,
    /// Title as the generative source phrased it, kept even when the platform renamed it.
    pub suggested_title: String,
}

/// Staged hint texts for a movie scene.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneHints {
    pub anonymized: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintLevel {
    Anonymized = 0,
    NamesRevealed = 1,
    FullyRevealed = 2,
}

impl HintLevel {
    pub fn next(self) -> Self {
        match self {
            HintLevel::Anonymized => HintLevel::NamesRevealed,
            HintLevel::NamesRevealed | HintLevel::FullyRevealed => HintLevel::FullyRevealed,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl SceneHints {
    /// Lowest level this item can show. Missing texts are never invented, so
    /// an item without an anonymized description simply starts higher.
    pub fn first_level(&self) -> HintLevel {
        if self.anonymized.is_some() {
            HintLevel::Anonymized
        } else if self.description.is_some() {
            HintLevel::NamesRevealed
        } else {
            HintLevel::FullyRevealed
        }
    }

    pub fn levels_available(&self) -> usize {
        3 - self.first_level().index()
    }
}

/// A validated, game-ready item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedItem {
    pub display_title: String,
    pub display_meta: DisplayMeta,
    pub media: Option<VideoId>,
    pub available: Availability,
    pub resolution: ResolutionPath,
    pub hints: Option<SceneHints>,
}

impl ResolvedItem {
    pub fn prior_item(&self) -> PriorItem {
        PriorItem::new(&self.display_meta.suggested_title, &self.display_meta.contributor)
    }

    /// Hint text visible at `level`, or `None` for items without staged hints.
    pub fn hint_text(&self, level: HintLevel) -> Option<String> {
        let hints = self.hints.as_ref()?;
        let level = level.max(hints.first_level());
        match level {
            HintLevel::Anonymized => hints.anonymized.clone(),
            HintLevel::NamesRevealed => hints.description.clone(),
            HintLevel::FullyRevealed => {
                let base = hints
                    .description
                    .as_deref()
                    .or(hints.anonymized.as_deref())
                    .unwrap_or(&self.display_title);
                Some(format!(
                    "{} ({}, {})",
                    base, self.display_meta.year, self.display_meta.genre
                ))
            }
        }
    }
}

/// Ordered output of one resolution call plus the navigation state layered on it.
///
/// The cursor is clamped to `[0, len - 1]` and never wraps. Moving to a
/// different item hides the reveal and restarts hint staging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "StoredResultSet")]
pub struct ResultSet {
    id: Uuid,
    category: Category,
    theme: Theme,
    items: Vec<ResolvedItem>,
    cursor: usize,
    revealed: bool,
    hint_level: Option<HintLevel>,
    generated_at: DateTime<Utc>,
}

impl ResultSet {
    pub fn new(category: Category, theme: Theme, items: Vec<ResolvedItem>) -> Self {
        let mut result_set = Self {
            id: Uuid::new_v4(),
            category,
            theme,
            items,
            cursor: 0,
            revealed: false,
            hint_level: None,
            generated_at: Utc::now(),
        };
        result_set.reset_round();
        result_set
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn items(&self) -> &[ResolvedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&ResolvedItem> {
        self.items.get(self.cursor)
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn reveal(&mut self) {
        if !self.items.is_empty() {
            self.revealed = true;
        }
    }

    /// Hint level of the current item, `None` when it has no staged hints.
    pub fn hint_level(&self) -> Option<HintLevel> {
        self.hint_level
    }

    /// Moves hint staging one level up, saturating at the last level.
    pub fn advance_hint(&mut self) -> Option<HintLevel> {
        self.hint_level = self.hint_level.map(HintLevel::next);
        self.hint_level
    }

    pub fn current_hint_text(&self) -> Option<String> {
        let level = self.hint_level?;
        self.current()?.hint_text(level)
    }

    /// Returns whether the cursor moved.
    pub fn next(&mut self) -> bool {
        if self.cursor + 1 < self.items.len() {
            self.move_to(self.cursor + 1);
            true
        } else {
            false
        }
    }

    /// Returns whether the cursor moved.
    pub fn previous(&mut self) -> bool {
        if self.cursor > 0 {
            self.move_to(self.cursor - 1);
            true
        } else {
            false
        }
    }

    /// Clamps `index` into range. Returns whether the cursor moved.
    pub fn jump_to(&mut self, index: usize) -> bool {
        if self.items.is_empty() {
            return false;
        }
        let target = index.min(self.items.len() - 1);
        if target == self.cursor {
            return false;
        }
        self.move_to(target);
        true
    }

    pub fn prior_items(&self) -> Vec<PriorItem> {
        self.items.iter().map(ResolvedItem::prior_item).collect()
    }

    fn move_to(&mut self, index: usize) {
        self.cursor = index;
        self.reset_round();
    }

    /// Explicit reset of the per-item round state.
    pub fn reset_round(&mut self) {
        self.revealed = false;
        self.hint_level = self
            .current()
            .and_then(|item| item.hints.as_ref())
            .map(SceneHints::first_level);
    }
}

/// Wire form of [`ResultSet`]; its round state is re-checked on the way in.
#[derive(Deserialize)]
struct StoredResultSet {
    id: Uuid,
    category: Category,
    theme: Theme,
    items: Vec<ResolvedItem>,
    cursor: usize,
    revealed: bool,
    hint_level: Option<HintLevel>,
    generated_at: DateTime<Utc>,
}

impl From<StoredResultSet> for ResultSet {
    fn from(stored: StoredResultSet) -> Self {
        let mut result_set = Self {
            id: stored.id,
            category: stored.category,
            theme: stored.theme,
            items: stored.items,
            cursor: stored.cursor,
            revealed: stored.revealed,
            hint_level: stored.hint_level,
            generated_at: stored.generated_at,
        };

        let has_hints = result_set.current().is_some_and(|item| item.hints.is_some());
        if result_set.cursor >= result_set.items.len() {
            result_set.cursor = result_set.items.len().saturating_sub(1);
            result_set.reset_round();
        } else if has_hints != result_set.hint_level.is_some() {
            let revealed = result_set.revealed;
            result_set.reset_round();
            result_set.revealed = revealed;
        }
        result_set
    }
}
