//! Client for a remote news article index: facet browsing, keyword
//! suggestions, search, and on-demand AI analysis rendered from untrusted
//! markdown.
//!
//! Every asynchronous result is applied through a ticket issued by the
//! controller that owns the state, so a superseded response can never
//! overwrite a newer one.

pub mod analysis;
pub mod api_types;
pub mod config;
pub mod error;
pub mod facets;
pub mod fetch;
pub mod models;
pub mod orchestrator;
pub mod query;
pub mod render;
pub mod repl;
pub mod view;

pub use error::GatewayError;
pub use fetch::{Gateway, HttpGateway};
pub use models::{Article, ArticleKey, FacetKind};
pub use orchestrator::{AppEvent, Session};
