//! Text rendering of session state. Reads only; never mutates.
//!
//! Every string that came from the backend or the user goes through
//! [`escape_terminal`] before it is printed.

use crate::analysis::{AnalysisController, AnalysisView};
use crate::facets::{FacetStore, ListStatus};
use crate::fetch::PLACEHOLDER_IMAGE;
use crate::models::{Article, FacetKind};
use crate::query::{QueryController, SearchOutcome};
use crate::render::escape_terminal;

pub const APP_TITLE: &str = "CMO Media Search";

pub fn render_header() -> String {
    format!("{}\nCMO News Portal\n", APP_TITLE)
}

pub fn render_search_box(query: &QueryController) -> String {
    let button = if query.is_loading() { "Searching..." } else { "Search" };
    if query.term().is_empty() {
        format!("Search for news articles...  [{}]\n", button)
    } else {
        format!("> {}  [{}]\n", escape_terminal(query.term()), button)
    }
}

pub fn render_facets(facets: &FacetStore, kind: FacetKind) -> String {
    let title = match kind {
        FacetKind::Department => "Departments",
        FacetKind::Category => "Categories",
    };
    let mut out = format!("{}:\n", title);

    match facets.list_status(kind) {
        ListStatus::NotLoaded | ListStatus::Loading => out.push_str("  (loading...)\n"),
        ListStatus::Failed => out.push_str("  (unavailable)\n"),
        ListStatus::Loaded if facets.names(kind).is_empty() => out.push_str("  (none)\n"),
        ListStatus::Loaded => {
            let selected = facets.selected(kind);
            for (i, name) in facets.names(kind).iter().enumerate() {
                let mark = if selected == Some(name.as_str()) { '*' } else { ' ' };
                out.push_str(&format!(" {}{:>3}. {}\n", mark, i + 1, escape_terminal(name)));
            }
        }
    }

    out.push_str(&render_keywords(facets, kind));
    out
}

pub fn render_keywords(facets: &FacetStore, kind: FacetKind) -> String {
    let mut out = String::new();
    let keywords = facets.keywords(kind);
    if let Some(set) = facets.suggestions(kind) {
        if !keywords.is_empty() {
            out.push_str(&format!("  Keywords for {}:\n", escape_terminal(&set.facet_name)));
            for (i, kw) in keywords.iter().enumerate() {
                out.push_str(&format!("    [{}] {}\n", i + 1, escape_terminal(kw)));
            }
        }
    }
    if facets.keywords_loading(kind) {
        out.push_str("  (loading keywords...)\n");
    }
    out
}

pub fn render_results(query: &QueryController) -> String {
    match query.outcome() {
        SearchOutcome::NotSearched => String::new(),
        SearchOutcome::Loading => "Searching...\n".to_string(),
        SearchOutcome::NoResults => "No articles found\n\
             Try searching with different keywords or browse by department/category.\n"
            .to_string(),
        SearchOutcome::Failed(msg) => format!("Error: {}\n", msg),
        SearchOutcome::Results(articles) => {
            let mut out = format!("Search Results ({} articles found)\n", articles.len());
            for (i, a) in articles.iter().enumerate() {
                out.push_str(&format!(
                    "{:>3}. {} ({})\n",
                    i + 1,
                    escape_terminal(&a.headline),
                    escape_terminal(&a.display_date())
                ));
            }
            out
        }
    }
}

/// Full article, as shown in the "View" dialog. `image` is the resolved image
/// address, if there is one.
pub fn render_article(article: &Article, image: Option<&str>) -> String {
    let headline = escape_terminal(&article.headline);
    let mut out = String::new();
    out.push_str(&headline);
    out.push('\n');
    out.push_str(&"=".repeat(headline.chars().count().clamp(3, 80)));
    out.push('\n');
    out.push_str(&format!("Image: {}\n", escape_terminal(image.unwrap_or(PLACEHOLDER_IMAGE))));
    out.push_str(&format!("Date:  {}\n\n", escape_terminal(&article.display_date())));
    out.push_str(escape_terminal(&article.full_text).trim_end());
    out.push('\n');
    out
}

pub fn render_analysis(analysis: &AnalysisController) -> String {
    let mut out = String::from("AI Analysis\n");
    if let Some(article) = analysis.target() {
        out.push_str(&format!("({})\n", escape_terminal(&article.headline)));
    }
    out.push('\n');
    match analysis.view() {
        AnalysisView::Prompt => out.push_str("Click analyze to get AI insights on this article.\n"),
        AnalysisView::Pending => out.push_str("Analyzing article...\n"),
        AnalysisView::Done(doc) => out.push_str(&doc.to_terminal()),
        AnalysisView::Failed(msg) => {
            out.push_str(&escape_terminal(msg));
            out.push_str("\nType `retry` to try again.\n");
        }
    }
    out
}

/// Banner shown when a facet list failed to load; search still works.
pub fn render_notice(facets: &FacetStore) -> Option<String> {
    facets.load_error().map(|e| format!("Notice: {}\n", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use pretty_assertions::assert_eq;

    fn article(headline: &str) -> Article {
        Article {
            image_id: "p.jpg".into(),
            headline: headline.into(),
            full_text: "Body text.\n".into(),
            published_date: "2025-03-09".into(),
        }
    }

    #[test]
    fn results_distinguish_three_empty_states() {
        let mut q = QueryController::new();
        assert_eq!(render_results(&q), "");

        let t = q.search("x").unwrap();
        assert_eq!(render_results(&q), "Searching...\n");

        q.apply(&t, Ok(vec![]));
        assert!(render_results(&q).starts_with("No articles found"));

        let t = q.search("y").unwrap();
        q.apply(&t, Err(GatewayError::SearchFailed { reason: "HTTP 500".into() }));
        assert_eq!(render_results(&q), "Error: Search failed. Please try again.\n");
    }

    #[test]
    fn results_list_counts_articles() {
        let mut q = QueryController::new();
        let t = q.search("election").unwrap();
        q.apply(&t, Ok(vec![article("One"), article("Two")]));
        let out = render_results(&q);
        assert!(out.starts_with("Search Results (2 articles found)\n"));
        assert!(out.contains("  1. One (9 March 2025)"));
    }

    #[test]
    fn article_without_image_uses_placeholder() {
        let out = render_article(&article("Headline"), None);
        assert!(out.contains(PLACEHOLDER_IMAGE));
        assert!(out.ends_with("Body text.\n"));
    }

    #[test]
    fn analysis_dialog_states() {
        let mut a = AnalysisController::new();
        assert!(render_analysis(&a).ends_with("Click analyze to get AI insights on this article.\n"));

        let art = article("One");
        let t = a.request(&art, "kw").unwrap();
        assert!(render_analysis(&a).contains("Analyzing article..."));

        a.apply(&t, Ok("## Summary\nFine.".into()));
        let out = render_analysis(&a);
        assert!(out.contains("Summary\n-------\n"));
        assert!(!out.contains("##"));
    }

    #[test]
    fn backend_strings_are_stripped_of_escape_sequences() {
        let mut hostile = article("H\x1b[2J");
        hostile.full_text = "body\x1b]52;c;ZXZpbA==\x07 end".into();
        hostile.published_date = "\x1b[31msoon".into();

        let mut a = AnalysisController::new();
        a.open(&hostile);
        let dialog = render_analysis(&a);
        assert!(dialog.contains("(H[2J)\n"));

        let page = render_article(&hostile, None);
        assert!(page.contains("body]52;c;ZXZpbA== end"));

        let mut q = QueryController::new();
        let t = q.search("h").unwrap();
        q.apply(&t, Ok(vec![hostile]));
        let listing = render_results(&q);

        let mut f = FacetStore::new();
        f.begin_load();
        f.apply_list(FacetKind::Department, Ok(vec!["Health\u{9b}2J".into()]));
        let facets = render_facets(&f, FacetKind::Department);

        for out in [dialog, page, listing, facets] {
            assert!(!out.chars().any(|c| c.is_control() && c != '\n'), "{:?}", out);
        }
    }

    #[test]
    fn facets_mark_selection_and_keywords() {
        let mut f = FacetStore::new();
        f.begin_load();
        f.apply_list(FacetKind::Category, Ok(vec!["Sports".into(), "Politics".into()]));
        let t = f.select(FacetKind::Category, "Politics").unwrap();
        assert!(render_facets(&f, FacetKind::Category).contains("(loading keywords...)"));
        f.apply_keywords(&t, Ok(vec!["election".into()]));

        let out = render_facets(&f, FacetKind::Category);
        assert!(out.contains(" *  2. Politics\n"));
        assert!(out.contains("Keywords for Politics:\n    [1] election\n"));
        assert_eq!(render_facets(&f, FacetKind::Department), "Departments:\n  (loading...)\n");
    }
}
