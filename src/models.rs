use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh3::xxh3_64;

use crate::api_types::ApiArticle;

/// Identity of an article within a result set. The backend gives no global id,
/// so the (image, headline) pair is hashed instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArticleKey(u64);

impl ArticleKey {
    pub fn of(image_id: &str, headline: &str) -> Self {
        ArticleKey(xxh3_64(format!("{}|{}", image_id, headline).as_bytes()))
    }
}

impl fmt::Display for ArticleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub image_id: String,
    pub headline: String,
    pub full_text: String,
    pub published_date: String, // as sent by the backend
}

impl Article {
    pub fn key(&self) -> ArticleKey {
        ArticleKey::of(&self.image_id, &self.headline)
    }

    /// Calendar date of publication, if the backend string is one we understand.
    pub fn published_on(&self) -> Option<NaiveDate> {
        let raw = self.published_date.trim();
        if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(d);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.date_naive());
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Some(dt.date());
            }
        }
        None
    }

    /// Long-form date ("14 August 2025"); falls back to the raw string.
    pub fn display_date(&self) -> String {
        match self.published_on() {
            Some(d) => d.format("%-d %B %Y").to_string(),
            None => self.published_date.trim().to_string(),
        }
    }
}

impl From<ApiArticle> for Article {
    fn from(a: ApiArticle) -> Self {
        Article {
            image_id: a.image_name,
            headline: a.headline.trim().to_string(),
            full_text: a.full_text,
            published_date: a.article_date,
        }
    }
}

/// Classification axis used to narrow or suggest searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FacetKind {
    Department,
    Category,
}

impl FacetKind {
    pub const ALL: [FacetKind; 2] = [FacetKind::Department, FacetKind::Category];

    /// Value of the `type` query parameter on `/keywords/`.
    pub fn wire_code(self) -> u8 {
        match self {
            FacetKind::Department => 0,
            FacetKind::Category => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FacetKind::Department => "department",
            FacetKind::Category => "category",
        }
    }
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
