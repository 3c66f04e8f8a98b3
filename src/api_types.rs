use serde::{Deserialize, Deserializer, Serialize};

/// Lists the backend may send as `null` as well as omit.
fn null_as_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiDepartments {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub departments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCategories {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeywords {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub keywords: Vec<String>,      // absent / null → no suggestions
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiArticle {
    #[serde(default)]
    pub image_name: String,         // key for GET /image/{image_name}
    pub headline: String,
    #[serde(default)]
    pub full_text: String,
    #[serde(default)]
    pub article_date: String,       // "2025-08-14" or full ISO timestamp
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiAnalyzeRequest<'a> {
    pub headline: &'a str,
    pub full_text: &'a str,
    pub keyword: &'a str,           // the search term active when analysis was asked for
    pub image_name: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiAnalysis {
    pub analysis: String,           // markdown, untrusted
}
