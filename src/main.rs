use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use media_search::config::Args;
use media_search::fetch::HttpGateway;
use media_search::models::FacetKind;
use media_search::orchestrator::{Session, Slot};
use media_search::repl::{self, Command};
use media_search::view;

/// Lists a facet, or selects the value typed as a number or name.
fn facet_command(session: &mut Session, kind: FacetKind, choice: &[String]) {
    let Some(choice) = repl::words(choice) else {
        print!("{}", view::render_facets(session.facets(), kind));
        return;
    };
    let name = repl::resolve_choice(session.facets().names(kind), &choice).map(str::to_string);
    match name {
        Some(name) => {
            session.select_facet(kind, &name);
            print!("{}", view::render_facets(session.facets(), kind));
        }
        None => println!("No {} number {}.", kind, choice),
    }
}

/// Runs one REPL command against the session. Returns `false` on quit.
async fn run_command(session: &mut Session, gateway: &HttpGateway, cmd: Command) -> Result<bool> {
    match cmd {
        Command::Quit => return Ok(false),
        Command::Term { text } => {
            session.set_term(text.join(" "));
            print!("{}", view::render_search_box(session.query()));
        }
        Command::Search { term } => {
            let issued = match repl::words(&term) {
                Some(t) => session.search(&t),
                None => session.submit_search(),
            };
            if issued {
                print!("{}", view::render_search_box(session.query()));
            } else {
                println!("Enter a search term first.");
            }
        }
        Command::Dept { choice } => facet_command(session, FacetKind::Department, &choice),
        Command::Cat { choice } => facet_command(session, FacetKind::Category, &choice),
        Command::Keyword { facet, n } => {
            let kind = FacetKind::from(facet);
            let index = repl::index(n);
            let keyword = session.facets().keywords(kind).get(index).cloned();
            match keyword {
                Some(kw) => {
                    session.choose_keyword(&kw);
                    print!("{}", view::render_search_box(session.query()));
                }
                None => println!("No keyword {} for the selected {}.", index + 1, kind),
            }
        }
        Command::Results => print!("{}", view::render_results(session.query())),
        Command::View { n } => match session.query().results().get(repl::index(n)) {
            Some(article) => {
                let image = gateway.image_url(&article.image_id).map(|u| u.to_string());
                print!("{}", view::render_article(article, image.as_deref()));
            }
            None => println!("No result {}.", n),
        },
        Command::Analyze { n } => {
            let index = repl::index(n);
            if index >= session.query().results().len() {
                println!("No result {}.", n);
            } else {
                session.analyze_result(index);
                print!("{}", view::render_analysis(session.analysis()));
            }
        }
        Command::Retry => {
            if !session.retry_analysis() {
                println!("Nothing to retry.");
            }
            print!("{}", view::render_analysis(session.analysis()));
        }
        Command::Close => session.close_analysis(),
        Command::Export { file: path } => match session.analysis().text() {
            Some(text) => {
                let html = media_search::render::render(text).to_html();
                std::fs::write(&path, html)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Wrote {}", path.display());
            }
            None => println!("No finished analysis to export."),
        },
        Command::Image { n, file: path } => {
            let Some(article) = session.query().results().get(repl::index(n)).cloned() else {
                println!("No result {}.", n);
                return Ok(true);
            };
            match gateway.fetch_image(&article.image_id).await {
                Ok(bytes) => {
                    std::fs::write(&path, &bytes)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Wrote {} ({} bytes)", path.display(), bytes.len());
                }
                Err(e) => {
                    warn!("Image unavailable - article={}, error={}", article.key(), e);
                    println!("Image unavailable, placeholder: {}", media_search::fetch::PLACEHOLDER_IMAGE);
                }
            }
        }
    }
    Ok(true)
}

/// Re-renders whatever an applied completion changed.
fn redraw(session: &Session, slot: Slot) {
    match slot {
        Slot::FacetList(_) => {
            if let Some(notice) = view::render_notice(session.facets()) {
                print!("{}", notice);
            }
        }
        Slot::Keywords(kind) => print!("{}", view::render_keywords(session.facets(), kind)),
        Slot::Search => print!("{}", view::render_results(session.query())),
        Slot::Analysis => print!("{}", view::render_analysis(session.analysis())),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr so they never interleave with the REPL on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    let args = Args::parse();
    info!("Starting media-search - base_url={}", args.base_url);
    if args.insecure {
        warn!("TLS certificate verification disabled");
    }

    let gateway = Arc::new(HttpGateway::new(args.base_url.clone(), args.insecure)?);
    let mut session = Session::new(gateway.clone());

    print!("{}", view::render_header());
    println!("Type `help` for commands.");
    session.load_facets();

    if let Some(q) = args.query.as_deref() {
        debug!("Initial query from command line: {}", q);
        session.search(q);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match repl::parse(&line) {
                    Ok(None) => {}
                    Ok(Some(cmd)) => {
                        if !run_command(&mut session, &gateway, cmd).await? {
                            break;
                        }
                    }
                    Err(msg) => println!("{}", msg),
                }
            }
            Some(event) = session.next_event() => {
                let slot = event.slot();
                if session.handle(event) {
                    redraw(&session, slot);
                } else {
                    debug!("Superseded completion ignored - slot={:?}", slot);
                }
            }
        }
    }

    info!("Exiting - outstanding requests={}", session.outstanding());
    Ok(())
}
