use indexmap::IndexSet;
use uuid::Uuid;

use crate::defs::{Category, PriorItem, RequestError, ResultSet, SuggestionRequest, Theme};

/// Everything already played in a session. Only ever grows.
#[derive(Debug, Clone, Default)]
pub struct ExclusionHistory {
    items: IndexSet<PriorItem>,
}

impl ExclusionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds items not seen before and returns how many were new.
    pub fn accumulate<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = PriorItem>,
    {
        let before = self.items.len();
        self.items.extend(items);
        self.items.len() - before
    }

    pub fn accumulate_result_set(&mut self, result_set: &ResultSet) -> usize {
        self.accumulate(result_set.prior_items())
    }

    pub fn contains(&self, item: &PriorItem) -> bool {
        self.items.contains(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriorItem> {
        self.items.iter()
    }
}

/// Caller-owned state for one theme and category: the exclusion history and
/// the result set currently on screen.
///
/// A new theme means a new session. Requests are built from `&mut self`,
/// so two generations can never interleave their read-then-extend of the
/// history.
#[derive(Debug, Clone)]
pub struct GameSession {
    id: Uuid,
    category: Category,
    theme: Theme,
    history: ExclusionHistory,
    current: Option<ResultSet>,
    rounds: usize,
}

impl GameSession {
    pub fn new(category: Category, theme: Theme) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            theme,
            history: ExclusionHistory::new(),
            current: None,
            rounds: 0,
        }
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

    pub fn history(&self) -> &ExclusionHistory {
        &self.history
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Request for the next batch, carrying every item accepted so far.
    pub fn next_request(&mut self, count: usize) -> Result<SuggestionRequest, RequestError> {
        let request = SuggestionRequest::new(self.category, self.theme.clone(), count)?;
        Ok(request.with_exclusions(self.history.iter().cloned()))
    }

    /// Installs a freshly resolved batch and records its items as played.
    /// Returns how many identities were new to the history.
    pub fn install(&mut self, result_set: ResultSet) -> usize {
        let added = self.history.accumulate_result_set(&result_set);
        self.current = Some(result_set);
        self.rounds += 1;
        added
    }

    pub fn current(&self) -> Option<&ResultSet> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut ResultSet> {
        self.current.as_mut()
    }
}
