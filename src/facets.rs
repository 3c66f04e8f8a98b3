use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::GatewayError;
use crate::models::FacetKind;

/// Keywords associated with one facet value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSuggestionSet {
    pub facet_kind: FacetKind,
    pub facet_name: String,
    pub keywords: Vec<String>,
}

/// Handed out by [`FacetStore::select`]; the keyword fetch result only applies
/// while `seq` is still the slot's current sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordTicket {
    pub kind: FacetKind,
    pub name: String,
    pub seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStatus {
    NotLoaded,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug)]
struct FacetSlot {
    names: Vec<String>,
    list_status: ListStatus,
    selected: Option<String>,
    suggestions: Option<KeywordSuggestionSet>,
    seq: u64,
    in_flight: bool,
}

impl FacetSlot {
    fn new() -> Self {
        Self {
            names: Vec::new(),
            list_status: ListStatus::NotLoaded,
            selected: None,
            suggestions: None,
            seq: 0,
            in_flight: false,
        }
    }
}

/// Department and category lists plus the keyword suggestions for whichever
/// value is selected in each. The two kinds never affect each other.
#[derive(Debug)]
pub struct FacetStore {
    departments: FacetSlot,
    categories: FacetSlot,
    fetched: HashMap<(FacetKind, String), Vec<String>>,
    load_error: Option<String>,
}

impl Default for FacetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FacetStore {
    pub fn new() -> Self {
        Self {
            departments: FacetSlot::new(),
            categories: FacetSlot::new(),
            fetched: HashMap::new(),
            load_error: None,
        }
    }

    fn slot(&self, kind: FacetKind) -> &FacetSlot {
        match kind {
            FacetKind::Department => &self.departments,
            FacetKind::Category => &self.categories,
        }
    }

    fn slot_mut(&mut self, kind: FacetKind) -> &mut FacetSlot {
        match kind {
            FacetKind::Department => &mut self.departments,
            FacetKind::Category => &mut self.categories,
        }
    }

    pub fn names(&self, kind: FacetKind) -> &[String] {
        &self.slot(kind).names
    }

    pub fn list_status(&self, kind: FacetKind) -> ListStatus {
        self.slot(kind).list_status
    }

    pub fn selected(&self, kind: FacetKind) -> Option<&str> {
        self.slot(kind).selected.as_deref()
    }

    pub fn suggestions(&self, kind: FacetKind) -> Option<&KeywordSuggestionSet> {
        self.slot(kind).suggestions.as_ref()
    }

    /// Visible keywords for `kind`, empty when nothing is selected.
    pub fn keywords(&self, kind: FacetKind) -> &[String] {
        self.slot(kind)
            .suggestions
            .as_ref()
            .map(|s| s.keywords.as_slice())
            .unwrap_or(&[])
    }

    pub fn keywords_loading(&self, kind: FacetKind) -> bool {
        self.slot(kind).in_flight
    }

    /// Non-fatal: set when either facet list could not be loaded.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn begin_load(&mut self) {
        self.load_error = None;
        for kind in FacetKind::ALL {
            self.slot_mut(kind).list_status = ListStatus::Loading;
        }
    }

    pub fn apply_list(&mut self, kind: FacetKind, result: Result<Vec<String>, GatewayError>) {
        match result {
            Ok(names) => {
                info!("Facet list loaded - kind={}, count={}", kind, names.len());
                let slot = self.slot_mut(kind);
                slot.names = names;
                slot.list_status = ListStatus::Loaded;
            }
            Err(e) => {
                warn!("Facet list unavailable - kind={}, error={}", kind, e);
                let slot = self.slot_mut(kind);
                slot.names.clear();
                slot.list_status = ListStatus::Failed;
                self.load_error = Some("Failed to load initial data".to_string());
            }
        }
    }

    /// Changes the selection for `kind`. Returns a ticket when a keyword fetch
    /// has to be issued; `None` when the selection was cleared, unchanged, or
    /// served from suggestions already fetched this session.
    pub fn select(&mut self, kind: FacetKind, name: &str) -> Option<KeywordTicket> {
        let name = name.trim();

        if name.is_empty() {
            let slot = self.slot_mut(kind);
            slot.seq += 1;
            slot.selected = None;
            slot.suggestions = None;
            slot.in_flight = false;
            debug!("Facet selection cleared - kind={}", kind);
            return None;
        }

        if self.slot(kind).selected.as_deref() == Some(name) {
            debug!("Facet reselected, nothing to do - kind={}, name={}", kind, name);
            return None;
        }

        let cached = self.fetched.get(&(kind, name.to_string())).cloned();
        let slot = self.slot_mut(kind);
        slot.seq += 1;
        slot.selected = Some(name.to_string());

        if let Some(keywords) = cached {
            debug!("Keyword suggestions reused - kind={}, name={}", kind, name);
            slot.in_flight = false;
            slot.suggestions = Some(KeywordSuggestionSet {
                facet_kind: kind,
                facet_name: name.to_string(),
                keywords,
            });
            return None;
        }

        // previous suggestions stay visible until this ticket resolves
        slot.in_flight = true;
        Some(KeywordTicket {
            kind,
            name: name.to_string(),
            seq: slot.seq,
        })
    }

    /// Applies a keyword fetch result. Returns `false` when the ticket has
    /// been superseded and the result was dropped.
    pub fn apply_keywords(
        &mut self,
        ticket: &KeywordTicket,
        result: Result<Vec<String>, GatewayError>,
    ) -> bool {
        let slot = self.slot_mut(ticket.kind);
        if slot.seq != ticket.seq {
            debug!(
                "Dropping stale keyword result - kind={}, name={}, seq={}, current={}",
                ticket.kind, ticket.name, ticket.seq, slot.seq
            );
            return false;
        }
        slot.in_flight = false;

        let keywords = match result {
            Ok(keywords) => {
                self.fetched
                    .insert((ticket.kind, ticket.name.clone()), keywords.clone());
                keywords
            }
            Err(e) => {
                warn!(
                    "Keyword suggestions unavailable - kind={}, name={}, error={}",
                    ticket.kind, ticket.name, e
                );
                Vec::new()
            }
        };

        self.slot_mut(ticket.kind).suggestions = Some(KeywordSuggestionSet {
            facet_kind: ticket.kind,
            facet_name: ticket.name.clone(),
            keywords,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kws(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_selection_issues_exactly_one_fetch() {
        let mut store = FacetStore::new();
        let ticket = store.select(FacetKind::Category, "Sports").expect("ticket");
        assert_eq!(ticket.kind, FacetKind::Category);
        assert_eq!(ticket.name, "Sports");
        assert!(store.keywords_loading(FacetKind::Category));

        assert!(store.select(FacetKind::Category, "Sports").is_none());
    }

    #[test]
    fn previous_suggestions_remain_while_new_fetch_in_flight() {
        let mut store = FacetStore::new();
        let t1 = store.select(FacetKind::Department, "Health").unwrap();
        assert!(store.apply_keywords(&t1, Ok(kws(&["hospital", "vaccine"]))));

        let t2 = store.select(FacetKind::Department, "Finance").unwrap();
        assert_eq!(store.keywords(FacetKind::Department), kws(&["hospital", "vaccine"]).as_slice());
        assert_eq!(store.selected(FacetKind::Department), Some("Finance"));

        assert!(store.apply_keywords(&t2, Ok(kws(&["budget"]))));
        let set = store.suggestions(FacetKind::Department).unwrap();
        assert_eq!(set.facet_name, "Finance");
        assert_eq!(set.keywords, kws(&["budget"]));
    }

    #[test]
    fn stale_keyword_result_is_dropped() {
        let mut store = FacetStore::new();
        let old = store.select(FacetKind::Category, "Sports").unwrap();
        let new = store.select(FacetKind::Category, "Politics").unwrap();

        assert!(store.apply_keywords(&new, Ok(kws(&["election"]))));
        assert!(!store.apply_keywords(&old, Ok(kws(&["cricket"]))));
        assert_eq!(store.keywords(FacetKind::Category), kws(&["election"]).as_slice());
    }

    #[test]
    fn kinds_are_independent() {
        let mut store = FacetStore::new();
        let d = store.select(FacetKind::Department, "Health").unwrap();
        let c = store.select(FacetKind::Category, "Sports").unwrap();
        assert!(store.apply_keywords(&d, Ok(kws(&["hospital"]))));
        assert!(store.apply_keywords(&c, Ok(kws(&["cricket"]))));
        assert_eq!(store.selected(FacetKind::Department), Some("Health"));
        assert_eq!(store.keywords(FacetKind::Category), kws(&["cricket"]).as_slice());
    }

    #[test]
    fn keyword_failure_degrades_to_empty() {
        let mut store = FacetStore::new();
        let t = store.select(FacetKind::Category, "Sports").unwrap();
        let applied = store.apply_keywords(&t, Err(GatewayError::unavailable("/keywords/", "HTTP 500")));
        assert!(applied);
        assert!(store.keywords(FacetKind::Category).is_empty());
        assert!(!store.keywords_loading(FacetKind::Category));
        assert!(store.load_error().is_none());
    }

    #[test]
    fn returning_to_a_fetched_facet_does_not_refetch() {
        let mut store = FacetStore::new();
        let t = store.select(FacetKind::Category, "Sports").unwrap();
        store.apply_keywords(&t, Ok(kws(&["cricket"])));
        let t2 = store.select(FacetKind::Category, "Politics").unwrap();

        assert!(store.select(FacetKind::Category, "Sports").is_none());
        assert_eq!(store.keywords(FacetKind::Category), kws(&["cricket"]).as_slice());
        // the Politics fetch was superseded by the reselection
        assert!(!store.apply_keywords(&t2, Ok(kws(&["election"]))));
    }

    #[test]
    fn blank_selection_clears_slot() {
        let mut store = FacetStore::new();
        let t = store.select(FacetKind::Department, "Health").unwrap();
        store.apply_keywords(&t, Ok(kws(&["hospital"])));
        assert!(store.select(FacetKind::Department, "   ").is_none());
        assert_eq!(store.selected(FacetKind::Department), None);
        assert!(store.keywords(FacetKind::Department).is_empty());
    }

    #[test]
    fn list_failure_is_recorded_per_kind() {
        let mut store = FacetStore::new();
        store.begin_load();
        store.apply_list(FacetKind::Department, Ok(kws(&["Health", "Finance"])));
        store.apply_list(
            FacetKind::Category,
            Err(GatewayError::network("/categories", "connection refused")),
        );
        assert_eq!(store.names(FacetKind::Department).len(), 2);
        assert_eq!(store.list_status(FacetKind::Category), ListStatus::Failed);
        assert!(store.names(FacetKind::Category).is_empty());
        assert_eq!(store.load_error(), Some("Failed to load initial data"));
    }
}
