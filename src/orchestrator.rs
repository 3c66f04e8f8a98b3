use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::analysis::{AnalysisController, AnalysisTicket};
use crate::error::GatewayError;
use crate::facets::{FacetStore, KeywordTicket};
use crate::fetch::Gateway;
use crate::models::{Article, FacetKind};
use crate::query::{QueryController, SearchTicket};

/// Completion of a gateway call, routed back to the loop that owns the
/// controllers. Tickets decide whether the result still applies.
#[derive(Debug)]
pub enum AppEvent {
    FacetListLoaded {
        kind: FacetKind,
        result: Result<Vec<String>, GatewayError>,
    },
    KeywordsLoaded {
        ticket: KeywordTicket,
        result: Result<Vec<String>, GatewayError>,
    },
    SearchCompleted {
        ticket: SearchTicket,
        result: Result<Vec<Article>, GatewayError>,
    },
    AnalysisCompleted {
        ticket: AnalysisTicket,
        result: Result<String, GatewayError>,
    },
}

impl AppEvent {
    pub fn slot(&self) -> Slot {
        match self {
            AppEvent::FacetListLoaded { kind, .. } => Slot::FacetList(*kind),
            AppEvent::KeywordsLoaded { ticket, .. } => Slot::Keywords(ticket.kind),
            AppEvent::SearchCompleted { .. } => Slot::Search,
            AppEvent::AnalysisCompleted { .. } => Slot::Analysis,
        }
    }
}

/// The piece of state an event targets, so the view can redraw just that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    FacetList(FacetKind),
    Keywords(FacetKind),
    Search,
    Analysis,
}

/// Owns the facet store and both controllers. User actions go through the
/// methods below; gateway calls run as spawned tasks whose results come back
/// through [`Session::next_event`] and are applied by [`Session::handle`]. The
/// session itself is only ever touched from one task.
pub struct Session {
    gateway: Arc<dyn Gateway>,
    facets: FacetStore,
    query: QueryController,
    analysis: AnalysisController,
    tx: UnboundedSender<AppEvent>,
    rx: UnboundedReceiver<AppEvent>,
    outstanding: usize,
}

impl Session {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            gateway,
            facets: FacetStore::new(),
            query: QueryController::new(),
            analysis: AnalysisController::new(),
            tx,
            rx,
            outstanding: 0,
        }
    }

    pub fn facets(&self) -> &FacetStore {
        &self.facets
    }

    pub fn query(&self) -> &QueryController {
        &self.query
    }

    pub fn analysis(&self) -> &AnalysisController {
        &self.analysis
    }

    /// Gateway calls issued whose completion has not been handled yet,
    /// superseded ones included.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    fn spawn<F>(&mut self, call: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        self.outstanding += 1;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            // receiver gone means the session was dropped; nothing to apply
            let _ = tx.send(call.await);
        });
    }

    /// Fetches both facet lists concurrently. Failures are recorded on the
    /// facet store and never block searching.
    pub fn load_facets(&mut self) {
        self.facets.begin_load();
        self.outstanding += 2;
        let gateway = Arc::clone(&self.gateway);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let (departments, categories) =
                futures::future::join(
                    gateway.list_facet(FacetKind::Department),
                    gateway.list_facet(FacetKind::Category),
                )
                .await;
            let _ = tx.send(AppEvent::FacetListLoaded {
                kind: FacetKind::Department,
                result: departments,
            });
            let _ = tx.send(AppEvent::FacetListLoaded {
                kind: FacetKind::Category,
                result: categories,
            });
        });
    }

    pub fn select_facet(&mut self, kind: FacetKind, name: &str) -> bool {
        let Some(ticket) = self.facets.select(kind, name) else {
            return false;
        };
        let gateway = Arc::clone(&self.gateway);
        self.spawn(async move {
            let result = gateway.list_keywords(ticket.kind, &ticket.name).await;
            AppEvent::KeywordsLoaded { ticket, result }
        });
        true
    }

    pub fn set_term(&mut self, text: impl Into<String>) {
        self.query.set_term(text);
    }

    fn issue_search(&mut self, ticket: Option<SearchTicket>) -> bool {
        let Some(ticket) = ticket else {
            return false;
        };
        let gateway = Arc::clone(&self.gateway);
        self.spawn(async move {
            let result = gateway.search(&ticket.term).await;
            AppEvent::SearchCompleted { ticket, result }
        });
        true
    }

    /// Searches for `term`; blank terms do nothing and return `false`.
    pub fn search(&mut self, term: &str) -> bool {
        let ticket = self.query.search(term);
        self.issue_search(ticket)
    }

    pub fn submit_search(&mut self) -> bool {
        let ticket = self.query.submit();
        self.issue_search(ticket)
    }

    /// A suggested keyword was clicked.
    pub fn choose_keyword(&mut self, keyword: &str) -> bool {
        let ticket = self.query.choose_keyword(keyword);
        self.issue_search(ticket)
    }

    fn issue_analysis(&mut self, ticket: Option<AnalysisTicket>) -> bool {
        let Some(ticket) = ticket else {
            return false;
        };
        let gateway = Arc::clone(&self.gateway);
        self.spawn(async move {
            let result = gateway.analyze(&ticket.article, &ticket.term).await;
            AppEvent::AnalysisCompleted { ticket, result }
        });
        true
    }

    /// Opens the analysis dialog on `article` and asks for its analysis using
    /// the current search term as context.
    pub fn request_analysis(&mut self, article: &Article) -> bool {
        let ticket = self.analysis.request(article, self.query.term());
        self.issue_analysis(ticket)
    }

    /// Same as [`Session::request_analysis`] for the `index`th search result.
    pub fn analyze_result(&mut self, index: usize) -> bool {
        match self.query.results().get(index).cloned() {
            Some(article) => self.request_analysis(&article),
            None => false,
        }
    }

    pub fn retry_analysis(&mut self) -> bool {
        let ticket = self.analysis.retry(self.query.term());
        self.issue_analysis(ticket)
    }

    pub fn close_analysis(&mut self) {
        self.analysis.close();
    }

    /// Applies one completion. Returns `true` if it changed visible state,
    /// `false` if it was superseded and dropped.
    pub fn handle(&mut self, event: AppEvent) -> bool {
        self.outstanding = self.outstanding.saturating_sub(1);
        match event {
            AppEvent::FacetListLoaded { kind, result } => {
                self.facets.apply_list(kind, result);
                true
            }
            AppEvent::KeywordsLoaded { ticket, result } => self.facets.apply_keywords(&ticket, result),
            AppEvent::SearchCompleted { ticket, result } => self.query.apply(&ticket, result),
            AppEvent::AnalysisCompleted { ticket, result } => self.analysis.apply(&ticket, result),
        }
    }

    /// Waits for the next completion without applying it.
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }

    /// Applies completions until nothing is outstanding.
    pub async fn settle(&mut self) {
        let start = std::time::Instant::now();
        let mut applied = 0usize;
        let mut dropped = 0usize;
        while self.outstanding > 0 {
            let Some(event) = self.rx.recv().await else {
                break;
            };
            debug!("Completion received - slot={:?}", event.slot());
            if self.handle(event) {
                applied += 1;
            } else {
                dropped += 1;
            }
        }
        info!(
            "Session settled - duration={:.2}s, applied={}, dropped={}",
            start.elapsed().as_secs_f32(),
            applied,
            dropped
        );
    }
}
