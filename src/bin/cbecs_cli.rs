//!
//! cbecs CLI binary
//! ----------------
//! Command-line tool and interactive interpreter over the CBECS question
//! catalog. Queries run directly against PostgreSQL or a fixture file, or
//! remotely against a `cbecs_server` HTTP API.

use std::env;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use cbecs_insight::catalog;
use cbecs_insight::cli::{format_catalog, format_view, get_terminal_width, QuerySource, ReplCommand, REPL_HELP};
use cbecs_insight::config::CliConfig;
use cbecs_insight::table::SortState;
use cbecs_insight::view::QueryView;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} --list\n  {program} [--query] <N> [--json] (--database-url <url> | --fixtures <path> | --connect <http-url>)\n  {program} --repl (--database-url <url> | --fixtures <path> | --connect <http-url>)\n\nFlags:\n  --list, -l               Print the question catalog (visualized and data-only groups)\n  -q, --query <N>          Run catalog query N (1-26); a bare N works too\n  --repl                   Start interactive mode (default when no query or --list is given)\n  --json                   Print raw result JSON instead of table and chart (env: CBECS_OUTPUT=json)\n  --database-url <url>     Run procedures directly on PostgreSQL (env: CBECS_DATABASE_URL, POSTGRES_URL)\n  --schema <name>          Schema holding the procedures (env: CBECS_DB_SCHEMA)\n  --fixtures <path>        Serve results from a JSON fixture file (env: CBECS_FIXTURES)\n  --connect <url>          Use a running cbecs_server, e.g. http://127.0.0.1:7878\n  -h, --help               Show this help\n\n{REPL_HELP}"
    );
}

/// Entry point for the cbecs CLI. Parses flags, then lists the catalog, runs
/// a one-shot query, or starts the interactive interpreter.
fn main() -> Result<()> {
    // Initialize tracing subscriber so backend errors are visible on the command line
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let mut args: Vec<String> = env::args().collect();
    let program = if args.is_empty() { "cbecs_cli".to_string() } else { args.remove(0) };

    let cfg = match CliConfig::from_process(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            print_usage(&program);
            std::process::exit(2);
        }
    };
    if cfg.help {
        print_usage(&program);
        return Ok(());
    }
    if cfg.list {
        print!("{}", format_catalog(&catalog::partition()));
    }
    if cfg.query.is_none() && !cfg.wants_repl() {
        return Ok(());
    }

    let Some(source_cfg) = cfg.source.clone() else {
        eprintln!("no data source: pass --database-url, --fixtures or --connect");
        print_usage(&program);
        std::process::exit(2);
    };

    // Tokio runtime
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    let source = rt
        .block_on(QuerySource::open(&source_cfg))
        .with_context(|| format!("failed to open {}", source_cfg.describe()))?;

    let mut json = cfg.json;
    if let Some(raw) = cfg.query.as_deref() {
        match rt.block_on(run_query(&source, raw)) {
            Ok(view) => print_view(&view, json),
            Err(e) => {
                eprintln!("error: {}", e);
                if !cfg.repl { std::process::exit(1); }
            }
        }
        if !cfg.repl { return Ok(()); }
    }

    let mut rl = DefaultEditor::new().context("failed to start line editor")?;
    let mut current: Option<QueryView> = None;
    println!("cbecs-cli interpreter ({}). Type 'help' for commands.", source.ident());
    loop {
        let line = match rl.readline("> ") {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("error: {}", e);
                break;
            }
        };
        let cmd = ReplCommand::parse(&line);
        if cmd != ReplCommand::Empty {
            let _ = rl.add_history_entry(line.as_str());
        }
        match cmd {
            ReplCommand::Empty => {}
            ReplCommand::Quit => break,
            ReplCommand::Help => println!("{}", REPL_HELP),
            ReplCommand::List => print!("{}", format_catalog(&catalog::partition())),
            ReplCommand::Status => println!("source: {}\noutput: {}", source.ident(), if json { "json" } else { "table" }),
            ReplCommand::ToggleJson => {
                json = !json;
                println!("output: {}", if json { "json" } else { "table" });
            }
            ReplCommand::Run(raw) => match rt.block_on(run_query(&source, &raw)) {
                Ok(view) => {
                    print_view(&view, json);
                    current = Some(view);
                }
                Err(e) => eprintln!("error: {}", e),
            },
            ReplCommand::Sort { field, direction } => {
                let Some(view) = current.as_ref() else {
                    eprintln!("no result to sort; run a query first");
                    continue;
                };
                let next = match direction {
                    Some(dir) => SortState::by(field, dir),
                    None => view.sort().toggle(&field),
                };
                match view.resort(&next) {
                    Ok(v) => {
                        print_view(&v, json);
                        current = Some(v);
                    }
                    Err(e) => eprintln!("error: {}", e),
                }
            }
            ReplCommand::Unknown(text) => eprintln!("unknown command: {} (type 'help')", text),
        }
    }
    Ok(())
}

async fn run_query(source: &QuerySource, raw: &str) -> cbecs_insight::AppResult<QueryView> {
    let result = source.execute(Some(raw)).await?;
    QueryView::build(result, &SortState::unsorted())
}

fn print_view(view: &QueryView, json: bool) {
    if json {
        let pretty = serde_json::to_string_pretty(&view.result).unwrap_or_else(|_| format!("{:?}", view.result));
        println!("{}", pretty);
    } else {
        print!("{}", format_view(view, get_terminal_width()));
    }
}
