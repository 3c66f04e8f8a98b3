use clap::Parser;
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://80.225.232.134:8002";

/// Media Search - browse and analyze news articles from the terminal
#[derive(Parser, Debug, Clone)]
#[command(name = "media-search", version, about, long_about = None)]
pub struct Args {
    /// Backend address all endpoints are resolved against
    #[arg(long, env = "MEDIA_SEARCH_API_BASE", default_value = DEFAULT_API_BASE)]
    pub base_url: Url,

    /// Accept self-signed TLS certificates from the backend
    #[arg(long, default_value_t = false)]
    pub insecure: bool,

    /// Search for this term right after start-up
    pub query: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_fixed_backend() {
        let args = Args::try_parse_from(["media-search"]).unwrap();
        assert_eq!(args.base_url.as_str(), "https://80.225.232.134:8002/");
        assert!(!args.insecure);
        assert_eq!(args.query, None);
    }

    #[test]
    fn accepts_overrides_and_initial_query() {
        let args = Args::try_parse_from([
            "media-search",
            "--base-url",
            "http://localhost:9000/api/",
            "--insecure",
            "election results",
        ])
        .unwrap();
        assert_eq!(args.base_url.as_str(), "http://localhost:9000/api/");
        assert!(args.insecure);
        assert_eq!(args.query.as_deref(), Some("election results"));
    }

    #[test]
    fn rejects_malformed_base() {
        assert!(Args::try_parse_from(["media-search", "--base-url", "not a url"]).is_err());
    }
}
