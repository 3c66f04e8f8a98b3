use tracing::{debug, info, warn};

use crate::error::GatewayError;
use crate::models::Article;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus {
    Idle,
    Loading,
    /// Possibly empty; an empty result set is still a success.
    Success(Vec<Article>),
    Error(String),
}

/// What the results area should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome<'a> {
    NotSearched,
    Loading,
    NoResults,
    Results(&'a [Article]),
    Failed(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub term: String, // trimmed, as sent to the backend
    pub seq: u64,
}

/// Owns the search term and the result state machine
/// `Idle -> Loading -> Success | Error -> Loading -> ...`.
#[derive(Debug)]
pub struct QueryController {
    term: String,
    status: SearchStatus,
    seq: u64,
}

impl Default for QueryController {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryController {
    pub fn new() -> Self {
        Self {
            term: String::new(),
            status: SearchStatus::Idle,
            seq: 0,
        }
    }

    /// Text currently in the search box.
    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn status(&self) -> &SearchStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == SearchStatus::Loading
    }

    pub fn results(&self) -> &[Article] {
        match &self.status {
            SearchStatus::Success(articles) => articles,
            _ => &[],
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            SearchStatus::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn outcome(&self) -> SearchOutcome<'_> {
        match &self.status {
            SearchStatus::Idle => SearchOutcome::NotSearched,
            SearchStatus::Loading => SearchOutcome::Loading,
            SearchStatus::Success(a) if a.is_empty() => SearchOutcome::NoResults,
            SearchStatus::Success(a) => SearchOutcome::Results(a),
            SearchStatus::Error(msg) => SearchOutcome::Failed(msg),
        }
    }

    pub fn set_term(&mut self, text: impl Into<String>) {
        self.term = text.into();
    }

    /// Searches for whatever is in the search box.
    pub fn submit(&mut self) -> Option<SearchTicket> {
        let term = self.term.clone();
        self.search(&term)
    }

    /// Starts a search. Blank terms are ignored and leave state untouched.
    pub fn search(&mut self, term: &str) -> Option<SearchTicket> {
        let trimmed = term.trim();
        if trimmed.is_empty() {
            debug!("Ignoring blank search term");
            return None;
        }

        self.term = term.to_string();
        self.seq += 1;
        self.status = SearchStatus::Loading;
        debug!("Search issued - term={}, seq={}", trimmed, self.seq);

        Some(SearchTicket {
            term: trimmed.to_string(),
            seq: self.seq,
        })
    }

    /// Clicking a suggested keyword: the keyword becomes the search box text
    /// and is searched immediately.
    pub fn choose_keyword(&mut self, keyword: &str) -> Option<SearchTicket> {
        self.search(keyword)
    }

    /// Applies a search response. Returns `false` if a newer search has been
    /// issued since `ticket`, in which case nothing changes.
    pub fn apply(&mut self, ticket: &SearchTicket, result: Result<Vec<Article>, GatewayError>) -> bool {
        if ticket.seq != self.seq {
            debug!(
                "Dropping stale search result - term={}, seq={}, current={}",
                ticket.term, ticket.seq, self.seq
            );
            return false;
        }

        self.status = match result {
            Ok(articles) => {
                info!("Search results applied - term={}, articles={}", ticket.term, articles.len());
                SearchStatus::Success(articles)
            }
            Err(e) => {
                warn!("Search failed - term={}, error={}", ticket.term, e);
                SearchStatus::Error(e.user_message())
            }
        };
        true
    }
}
