use std::sync::Mutex;

use async_trait::async_trait;
use media_search::{Article, FacetKind, Gateway, GatewayError};
use tokio::sync::oneshot;

type Reply<T> = oneshot::Sender<Result<T, GatewayError>>;

/// Calls received by [`ScriptedGateway`] that are still waiting for the test
/// to answer them.
#[derive(Default)]
pub struct Pending {
    pub departments: Vec<Reply<Vec<String>>>,
    pub categories: Vec<Reply<Vec<String>>>,
    pub keywords: Vec<(FacetKind, String, Reply<Vec<String>>)>,
    pub searches: Vec<(String, Reply<Vec<Article>>)>,
    pub analyses: Vec<(Article, String, Reply<String>)>,
}

/// Gateway whose every call blocks until the test resolves it, so responses
/// can be delivered in any order.
#[derive(Default)]
pub struct ScriptedGateway {
    pub pending: Mutex<Pending>,
    pub calls: Mutex<Vec<String>>,
}

async fn wait<T>(rx: oneshot::Receiver<Result<T, GatewayError>>) -> Result<T, GatewayError> {
    rx.await
        .unwrap_or_else(|_| Err(GatewayError::network("scripted", "reply dropped")))
}

impl ScriptedGateway {
    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn with_pending<R>(&self, f: impl FnOnce(&mut Pending) -> R) -> R {
        f(&mut self.pending.lock().expect("pending lock"))
    }

    /// Yields to the runtime until `ready` holds for the pending calls.
    pub async fn wait_until(&self, ready: impl Fn(&Pending) -> bool) {
        for _ in 0..1000 {
            if self.with_pending(|p| ready(p)) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("scripted gateway never reached the expected state; calls={:?}", self.calls());
    }

    pub fn answer_search(&self, term: &str, result: Result<Vec<Article>, GatewayError>) {
        let reply = self.with_pending(|p| {
            let idx = p
                .searches
                .iter()
                .position(|(t, _)| t == term)
                .unwrap_or_else(|| panic!("no pending search for {:?}", term));
            p.searches.remove(idx).1
        });
        let _ = reply.send(result);
    }

    pub fn answer_analysis(&self, headline: &str, result: Result<String, GatewayError>) {
        let reply = self.with_pending(|p| {
            let idx = p
                .analyses
                .iter()
                .position(|(a, _, _)| a.headline == headline)
                .unwrap_or_else(|| panic!("no pending analysis for {:?}", headline));
            p.analyses.remove(idx).2
        });
        let _ = reply.send(result);
    }

    pub fn answer_keywords(&self, kind: FacetKind, name: &str, result: Result<Vec<String>, GatewayError>) {
        let reply = self.with_pending(|p| {
            let idx = p
                .keywords
                .iter()
                .position(|(k, n, _)| *k == kind && n == name)
                .unwrap_or_else(|| panic!("no pending keywords for {:?}/{:?}", kind, name));
            p.keywords.remove(idx).2
        });
        let _ = reply.send(result);
    }

    pub fn answer_lists(
        &self,
        departments: Result<Vec<String>, GatewayError>,
        categories: Result<Vec<String>, GatewayError>,
    ) {
        let (d, c) = self.with_pending(|p| (p.departments.remove(0), p.categories.remove(0)));
        let _ = d.send(departments);
        let _ = c.send(categories);
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn list_departments(&self) -> Result<Vec<String>, GatewayError> {
        self.record("departments".into());
        let (tx, rx) = oneshot::channel();
        self.with_pending(|p| p.departments.push(tx));
        wait(rx).await
    }

    async fn list_categories(&self) -> Result<Vec<String>, GatewayError> {
        self.record("categories".into());
        let (tx, rx) = oneshot::channel();
        self.with_pending(|p| p.categories.push(tx));
        wait(rx).await
    }

    async fn list_keywords(&self, kind: FacetKind, name: &str) -> Result<Vec<String>, GatewayError> {
        self.record(format!("keywords:{}:{}", kind, name));
        let (tx, rx) = oneshot::channel();
        self.with_pending(|p| p.keywords.push((kind, name.to_string(), tx)));
        wait(rx).await
    }

    async fn search(&self, term: &str) -> Result<Vec<Article>, GatewayError> {
        self.record(format!("search:{}", term));
        let (tx, rx) = oneshot::channel();
        self.with_pending(|p| p.searches.push((term.to_string(), tx)));
        wait(rx).await
    }

    async fn analyze(&self, article: &Article, term: &str) -> Result<String, GatewayError> {
        self.record(format!("analyze:{}", article.headline));
        let (tx, rx) = oneshot::channel();
        self.with_pending(|p| p.analyses.push((article.clone(), term.to_string(), tx)));
        wait(rx).await
    }
}

pub fn article(headline: &str) -> Article {
    Article {
        image_id: format!("{}.jpg", headline.to_lowercase().replace(' ', "_")),
        headline: headline.to_string(),
        full_text: format!("{}. Full report follows.", headline),
        published_date: "2025-08-14".to_string(),
    }
}
