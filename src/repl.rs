use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::models::FacetKind;

/// One REPL input line. Each line is its own invocation, the first word
/// naming the command.
#[derive(Parser, Debug)]
#[command(
    multicall = true,
    disable_help_flag = true,
    help_template = "{all-args}"
)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Search for a term, or for the current search box text
    #[command(visible_alias = "s")]
    Search {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        term: Vec<String>,
    },
    /// Type into the search box without searching
    Term {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// List departments, or select one by number or name
    #[command(visible_alias = "departments")]
    Dept {
        #[arg(trailing_var_arg = true)]
        choice: Vec<String>,
    },
    /// List categories, or select one by number or name
    #[command(visible_alias = "categories")]
    Cat {
        #[arg(trailing_var_arg = true)]
        choice: Vec<String>,
    },
    /// Search for the n-th keyword suggested for the selected facet.
    /// Suggestions are fetched once per facet value and reused for the session
    #[command(name = "kw", visible_alias = "keyword")]
    Keyword { facet: FacetArg, n: NonZeroUsize },
    /// Show the current results
    #[command(visible_alias = "r")]
    Results,
    /// Show the full text of result n
    #[command(visible_alias = "v")]
    View { n: NonZeroUsize },
    /// Request AI analysis of result n
    #[command(visible_alias = "a")]
    Analyze { n: NonZeroUsize },
    /// Retry a failed analysis
    Retry,
    /// Close the analysis dialog
    Close,
    /// Write the current analysis as HTML
    Export { file: PathBuf },
    /// Download the image of result n
    Image { n: NonZeroUsize, file: PathBuf },
    /// Exit
    #[command(visible_aliases = ["exit", "q"])]
    Quit,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetArg {
    #[value(alias = "d", alias = "department")]
    Dept,
    #[value(alias = "c", alias = "category")]
    Cat,
}

impl From<FacetArg> for FacetKind {
    fn from(arg: FacetArg) -> Self {
        match arg {
            FacetArg::Dept => FacetKind::Department,
            FacetArg::Cat => FacetKind::Category,
        }
    }
}

/// Result numbers are 1-based on screen.
pub fn index(n: NonZeroUsize) -> usize {
    n.get() - 1
}

/// Joins the words of a free-text argument; `None` when there were none.
pub fn words(parts: &[String]) -> Option<String> {
    (!parts.is_empty()).then(|| parts.join(" "))
}

/// Parses one input line. `Ok(None)` for blank lines. `Err` carries the text
/// to show: a usage error, or the help output for `help`.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }
    Line::try_parse_from(words)
        .map(|l| Some(l.command))
        .map_err(|e| e.render().to_string().trim_end().to_string())
}

/// Resolves a facet choice typed as either a list number or a name.
pub fn resolve_choice<'a>(names: &'a [String], choice: &'a str) -> Option<&'a str> {
    if let Ok(n) = choice.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| names.get(i)).map(String::as_str);
    }
    names
        .iter()
        .find(|n| n.eq_ignore_ascii_case(choice))
        .map(String::as_str)
        .or(Some(choice))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn parses_search_forms() {
        assert_eq!(parse("  "), Ok(None));
        assert_eq!(parse("search"), Ok(Some(Command::Search { term: vec![] })));
        let Ok(Some(Command::Search { term })) = parse("s  flood relief ") else {
            panic!("expected search");
        };
        assert_eq!(words(&term), Some("flood relief".to_string()));
        assert_eq!(
            parse("term -5 degrees"),
            Ok(Some(Command::Term {
                text: vec!["-5".into(), "degrees".into()]
            }))
        );
        assert!(parse("term").is_err());
    }

    #[test]
    fn parses_facets_and_keywords() {
        assert_eq!(
            parse("cat Arts & Culture"),
            Ok(Some(Command::Cat {
                choice: vec!["Arts".into(), "&".into(), "Culture".into()]
            }))
        );
        assert_eq!(parse("departments"), Ok(Some(Command::Dept { choice: vec![] })));
        assert_eq!(
            parse("kw d 2"),
            Ok(Some(Command::Keyword {
                facet: FacetArg::Dept,
                n: nz(2)
            }))
        );
        assert_eq!(FacetKind::from(FacetArg::Cat), FacetKind::Category);
        assert!(parse("kw dept").is_err());
        assert!(parse("kw planet 1").is_err());
    }

    #[test]
    fn indices_are_one_based() {
        assert_eq!(parse("analyze 1"), Ok(Some(Command::Analyze { n: nz(1) })));
        assert_eq!(index(nz(1)), 0);
        assert!(parse("view 0").is_err());
        assert!(parse("view x").is_err());
        assert_eq!(
            parse("image 3 out/pic.jpg"),
            Ok(Some(Command::Image {
                n: nz(3),
                file: PathBuf::from("out/pic.jpg")
            }))
        );
    }

    #[test]
    fn unknown_command_and_help_come_back_as_text() {
        assert!(parse("frobnicate").unwrap_err().contains("frobnicate"));
        assert!(parse("export").is_err());
        assert_eq!(parse("exit"), Ok(Some(Command::Quit)));

        let help = parse("help").unwrap_err();
        assert!(help.contains("Commands:"));
        assert!(help.contains("analyze"));
        assert!(help.contains("Write the current analysis as HTML"));
        assert!(help.contains("fetched once per facet value"));
    }

    #[test]
    fn resolves_number_or_name() {
        let names = vec!["Health".to_string(), "Finance".to_string()];
        assert_eq!(resolve_choice(&names, "2"), Some("Finance"));
        assert_eq!(resolve_choice(&names, "3"), None);
        assert_eq!(resolve_choice(&names, "health"), Some("Health"));
        assert_eq!(resolve_choice(&names, "Transport"), Some("Transport"));
    }
}
