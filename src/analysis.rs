use tracing::{debug, info, warn};

use crate::error::GatewayError;
use crate::models::{Article, ArticleKey};
use crate::render::{render, Document};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisStatus {
    Idle,
    Pending,
    Done(String),
    Failed(String),
}

/// What the analysis dialog shows.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisView<'a> {
    /// Nothing requested yet for this article.
    Prompt,
    Pending,
    Done(Document),
    /// Message plus a retry affordance.
    Failed(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisTicket {
    pub article: Article,
    pub term: String,
    pub seq: u64,
}

impl AnalysisTicket {
    pub fn key(&self) -> ArticleKey {
        self.article.key()
    }
}

/// Lifecycle of the analysis dialog: `Idle -> Pending -> Done | Failed`,
/// back to `Idle` whenever the target article changes or the dialog closes.
#[derive(Debug)]
pub struct AnalysisController {
    target: Option<Article>,
    status: AnalysisStatus,
    seq: u64,
}

impl Default for AnalysisController {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisController {
    pub fn new() -> Self {
        Self {
            target: None,
            status: AnalysisStatus::Idle,
            seq: 0,
        }
    }

    pub fn target(&self) -> Option<&Article> {
        self.target.as_ref()
    }

    pub fn article_key(&self) -> Option<ArticleKey> {
        self.target.as_ref().map(Article::key)
    }

    pub fn status(&self) -> &AnalysisStatus {
        &self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == AnalysisStatus::Pending
    }

    pub fn text(&self) -> Option<&str> {
        match &self.status {
            AnalysisStatus::Done(text) => Some(text),
            _ => None,
        }
    }

    pub fn view(&self) -> AnalysisView<'_> {
        match &self.status {
            AnalysisStatus::Idle => AnalysisView::Prompt,
            AnalysisStatus::Pending => AnalysisView::Pending,
            AnalysisStatus::Done(text) => AnalysisView::Done(render(text)),
            AnalysisStatus::Failed(msg) => AnalysisView::Failed(msg),
        }
    }

    fn reset(&mut self) {
        self.seq += 1;
        self.status = AnalysisStatus::Idle;
    }

    /// Points the dialog at `article`. A different article discards whatever
    /// was shown or pending for the previous one.
    pub fn open(&mut self, article: &Article) {
        if self.article_key() == Some(article.key()) {
            return;
        }
        debug!("Analysis dialog retargeted - article={}", article.key());
        self.reset();
        self.target = Some(article.clone());
    }

    pub fn close(&mut self) {
        if self.target.is_some() {
            debug!("Analysis dialog closed");
        }
        self.reset();
        self.target = None;
    }

    /// Requests analysis of `article` in the context of `term`. Returns `None`
    /// if that article already has a request pending.
    pub fn request(&mut self, article: &Article, term: &str) -> Option<AnalysisTicket> {
        if self.is_pending() && self.article_key() == Some(article.key()) {
            debug!("Analysis already pending - article={}", article.key());
            return None;
        }
        self.open(article);

        self.seq += 1;
        self.status = AnalysisStatus::Pending;
        debug!("Analysis issued - article={}, seq={}", article.key(), self.seq);

        Some(AnalysisTicket {
            article: article.clone(),
            term: term.to_string(),
            seq: self.seq,
        })
    }

    /// Re-requests the current article after a failure. Never automatic.
    pub fn retry(&mut self, term: &str) -> Option<AnalysisTicket> {
        if !matches!(self.status, AnalysisStatus::Failed(_)) {
            return None;
        }
        let article = self.target.clone()?;
        self.request(&article, term)
    }

    pub fn apply(&mut self, ticket: &AnalysisTicket, result: Result<String, GatewayError>) -> bool {
        if ticket.seq != self.seq {
            debug!(
                "Dropping stale analysis - article={}, seq={}, current={}",
                ticket.key(),
                ticket.seq,
                self.seq
            );
            return false;
        }

        self.status = match result {
            Ok(text) => {
                info!("Analysis applied - article={}, length={} chars", ticket.key(), text.len());
                AnalysisStatus::Done(text)
            }
            Err(e) => {
                warn!("Analysis failed - article={}, error={}", ticket.key(), e);
                AnalysisStatus::Failed(e.user_message())
            }
        };
        true
    }
}
