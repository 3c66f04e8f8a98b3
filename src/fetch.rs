use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::api_types::*;
use crate::error::GatewayError;
use crate::models::{Article, FacetKind};

/// Shown by the view whenever an article image cannot be loaded.
pub const PLACEHOLDER_IMAGE: &str = "/abstract-geometric-shapes.png";

/// Request/response mapping over the backend. Implementations hold no state
/// that outlives a call; every failure is returned, never swallowed.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn list_departments(&self) -> Result<Vec<String>, GatewayError>;

    async fn list_categories(&self) -> Result<Vec<String>, GatewayError>;

    /// Keyword suggestions for one facet value. No keywords is `Ok(vec![])`.
    async fn list_keywords(&self, kind: FacetKind, name: &str) -> Result<Vec<String>, GatewayError>;

    /// Caller guarantees `term.trim()` is non-empty.
    async fn search(&self, term: &str) -> Result<Vec<Article>, GatewayError>;

    async fn analyze(&self, article: &Article, term: &str) -> Result<String, GatewayError>;

    async fn list_facet(&self, kind: FacetKind) -> Result<Vec<String>, GatewayError> {
        match kind {
            FacetKind::Department => self.list_departments().await,
            FacetKind::Category => self.list_categories().await,
        }
    }
}

/// How a non-success status (or unreadable body) is reported for an endpoint.
#[derive(Clone, Copy)]
enum FailureKind {
    Unavailable,
    Search,
    Analysis,
}

impl FailureKind {
    fn error(self, endpoint: &str, reason: String) -> GatewayError {
        match self {
            FailureKind::Unavailable => GatewayError::unavailable(endpoint, reason),
            FailureKind::Search => GatewayError::SearchFailed { reason },
            FailureKind::Analysis => GatewayError::AnalysisFailed { reason },
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base: Url,
}

impl HttpGateway {
    pub fn new(base: Url, accept_invalid_certs: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("media-search/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;
        Ok(Self::with_client(client, base))
    }

    pub fn with_client(client: Client, mut base: Url) -> Self {
        // `Url::join` replaces the last segment unless the base ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { client, base }
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base
            .join(path)
            .map_err(|e| GatewayError::InvalidRequest(format!("bad endpoint {}: {}", path, e)))
    }

    /// Address of an article image; `None` when the article has no image.
    pub fn image_url(&self, image_id: &str) -> Option<Url> {
        if image_id.trim().is_empty() {
            return None;
        }
        let mut url = self.base.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push("image")
            .push(image_id);
        Some(url)
    }

    pub async fn fetch_image(&self, image_id: &str) -> Result<Vec<u8>, GatewayError> {
        let url = self
            .image_url(image_id)
            .ok_or_else(|| GatewayError::InvalidRequest("article has no image".into()))?;
        let endpoint = "/image/";
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::network(endpoint, e))?;
        if !resp.status().is_success() {
            warn!("Image fetch failed - image={}, status={}", image_id, resp.status());
            return Err(GatewayError::unavailable(endpoint, format!("HTTP {}", resp.status())));
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| GatewayError::network(endpoint, e))?;
        debug!("Image fetched - image={}, bytes={}", image_id, body.len());
        Ok(body.to_vec())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        endpoint: &str,
        failure: FailureKind,
    ) -> Result<T, GatewayError> {
        let resp = req
            .send()
            .await
            .map_err(|e| GatewayError::network(endpoint, e))?;

        let status = resp.status();
        if !status.is_success() {
            warn!("Backend returned non-success - endpoint={}, status={}", endpoint, status);
            return Err(failure.error(endpoint, format!("HTTP {}", status)));
        }

        resp.json::<T>().await.map_err(|e| {
            if e.is_decode() {
                warn!("Malformed response body - endpoint={}, error={}", endpoint, e);
                failure.error(endpoint, format!("malformed response: {}", e))
            } else {
                GatewayError::network(endpoint, e)
            }
        })
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn list_departments(&self) -> Result<Vec<String>, GatewayError> {
        let start = std::time::Instant::now();
        debug!("Fetching department list");

        let url = self.endpoint("departments")?;
        let body: ApiDepartments = self
            .send_json(self.client.get(url), "/departments", FailureKind::Unavailable)
            .await?;

        info!(
            "Departments fetched - duration={:.2}s, count={}",
            start.elapsed().as_secs_f32(),
            body.departments.len()
        );
        Ok(body.departments)
    }

    async fn list_categories(&self) -> Result<Vec<String>, GatewayError> {
        let start = std::time::Instant::now();
        debug!("Fetching category list");

        let url = self.endpoint("categories")?;
        let body: ApiCategories = self
            .send_json(self.client.get(url), "/categories", FailureKind::Unavailable)
            .await?;

        info!(
            "Categories fetched - duration={:.2}s, count={}",
            start.elapsed().as_secs_f32(),
            body.categories.len()
        );
        Ok(body.categories)
    }

    async fn list_keywords(&self, kind: FacetKind, name: &str) -> Result<Vec<String>, GatewayError> {
        if name.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("facet name must not be empty".into()));
        }
        let start = std::time::Instant::now();
        debug!("Fetching keywords - kind={}, name={}", kind, name);

        let url = self.endpoint("keywords/")?;
        let req = self.client.get(url).query(&[
            ("type", kind.wire_code().to_string()),
            ("name", name.to_string()),
        ]);
        let body: ApiKeywords = self
            .send_json(req, "/keywords/", FailureKind::Unavailable)
            .await?;

        info!(
            "Keywords fetched - kind={}, name={}, duration={:.2}s, count={}",
            kind,
            name,
            start.elapsed().as_secs_f32(),
            body.keywords.len()
        );
        Ok(body.keywords)
    }

    async fn search(&self, term: &str) -> Result<Vec<Article>, GatewayError> {
        let start = std::time::Instant::now();
        debug!("Searching - term={}", term);

        let url = self.endpoint("search/")?;
        let req = self.client.get(url).query(&[("keyword", term)]);
        let body: Vec<ApiArticle> = self.send_json(req, "/search/", FailureKind::Search).await?;

        let articles: Vec<Article> = body.into_iter().map(Article::from).collect();
        info!(
            "Search completed - term={}, duration={:.2}s, articles={}",
            term,
            start.elapsed().as_secs_f32(),
            articles.len()
        );
        Ok(articles)
    }

    async fn analyze(&self, article: &Article, term: &str) -> Result<String, GatewayError> {
        let start = std::time::Instant::now();
        debug!("Requesting analysis - article={}, term={}", article.key(), term);

        let url = self.endpoint("analyze/")?;
        let payload = ApiAnalyzeRequest {
            headline: &article.headline,
            full_text: &article.full_text,
            keyword: term,
            image_name: &article.image_id,
        };
        let body: ApiAnalysis = self
            .send_json(self.client.post(url).json(&payload), "/analyze/", FailureKind::Analysis)
            .await?;

        info!(
            "Analysis completed - article={}, duration={:.2}s, response_length={} chars",
            article.key(),
            start.elapsed().as_secs_f32(),
            body.analysis.len()
        );
        Ok(body.analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base: &str) -> HttpGateway {
        HttpGateway::with_client(Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn base_without_trailing_slash_keeps_its_path() {
        let gw = gateway("http://localhost:8002/api");
        assert_eq!(gw.endpoint("search/").unwrap().as_str(), "http://localhost:8002/api/search/");
    }

    #[test]
    fn image_url_encodes_the_name() {
        let gw = gateway("http://localhost:8002");
        let url = gw.image_url("front page.jpg").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8002/image/front%20page.jpg");
        assert!(gw.image_url("  ").is_none());
    }
}
