mod config;
mod error;
mod history;

use std::path::PathBuf;

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use runtime::{Agent, Outcome, Reporter};
use storage::{Event, EventKind, EventStore, RunId};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "clerk.toml";
const DEFAULT_LOG_FILTER: &str = "clerk=info,runtime=info";

#[derive(Parser)]
#[command(name = "clerk")]
#[command(about = "A shopping assistant that looks up prices and does the tax math", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one question
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Print the tool transcript before the answer
        #[arg(short, long)]
        verbose: bool,
        /// Print {"answer": ...} or {"error": ...} as JSON
        #[arg(long)]
        json: bool,
        /// Do not record the run in the history
        #[arg(long)]
        no_history: bool,
    },
    /// List the tools the agent can use
    Tools,
    /// List recorded runs
    Runs {
        /// Show only the last N runs
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Show the event log of a run
    Logs {
        /// Run ID (prefix match supported)
        run: String,
        /// Filter by event kind (tool_call, tool_result, correction, ...)
        #[arg(short, long)]
        kind: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    init_logging();

    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("CLERK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Returns the process exit code.
async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Ask {
            query,
            verbose,
            json,
            no_history,
        } => cmd_ask(&config, &query.join(" "), verbose, json, !no_history).await,
        Commands::Tools => cmd_tools(&config).map(|()| 0),
        Commands::Runs { limit } => cmd_runs(limit).map(|()| 0),
        Commands::Logs { run, kind } => cmd_logs(&run, kind.as_deref()).map(|()| 0),
    }
}

async fn cmd_ask(
    config: &Config,
    query: &str,
    verbose: bool,
    json: bool,
    record: bool,
) -> Result<i32> {
    let env = |var: &str| std::env::var(var).ok();
    let provider = config.provider(env)?;
    let registry = config.tools_config().build()?;

    info!(backend = %provider, tools = ?registry.names(), "starting run");

    let agent = Agent::builder(provider, registry)
        .config(config.agent_config())
        .system_prompt(config.agent.system_prompt.clone())
        .build();

    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let run = agent.run_until(query, cancel).await;

    if record {
        if let Err(e) = record_run(&run) {
            warn!(error = %e, "could not record run history");
        }
    }

    let report = Reporter::new().with_transcript(verbose).report(&run);
    if json {
        println!("{}", serde_json::to_string(&Outcome::from(&run))?);
    } else {
        println!("{}", report.output);
    }
    if verbose {
        if let Some(diagnostic) = &report.diagnostic {
            eprintln!("{diagnostic}");
        }
    }

    Ok(if report.is_failure() { 1 } else { 0 })
}

fn record_run(run: &runtime::Run) -> Result<()> {
    let data_dir = data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let mut store = EventStore::open(data_dir.join("runs.db"))?;
    store.append_all(&history::events(run))?;
    Ok(())
}

fn cmd_tools(config: &Config) -> Result<()> {
    let registry = config.tools_config().build()?;

    for spec in registry.describe_all() {
        println!("{}", spec.name);
        println!("    {}", spec.description);
        for param in &spec.params {
            let note = match (&param.default, param.required) {
                (_, true) => " (required)".to_string(),
                (Some(default), false) => format!(" (default: {default})"),
                (None, false) => String::new(),
            };
            println!(
                "    - {}: {}{note}  {}",
                param.name,
                param.kind.as_str(),
                param.description
            );
        }
        println!();
    }

    Ok(())
}

fn cmd_runs(limit: usize) -> Result<()> {
    let Some(store) = open_store()? else {
        println!("No runs recorded yet.");
        return Ok(());
    };
    let runs = store.list_runs()?;

    if runs.is_empty() {
        println!("No runs recorded yet.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<16}  {:<5}  {:<24}  QUERY",
        "RUN ID", "STARTED", "TOOLS", "STATUS"
    );
    println!("{}", "-".repeat(110));

    for summary in runs.into_iter().take(limit) {
        let started = Local
            .from_utc_datetime(&summary.started_at.naive_utc())
            .format("%Y-%m-%d %H:%M");
        println!(
            "{:<36}  {:<16}  {:<5}  {:<24}  {}",
            summary.id,
            started,
            summary.tool_calls,
            summary.status.to_string(),
            truncate(&summary.query, 60)
        );
    }

    Ok(())
}

fn cmd_logs(run_prefix: &str, kind_filter: Option<&str>) -> Result<()> {
    let not_found = || Error::RunNotFound {
        prefix: run_prefix.to_string(),
    };
    let store = open_store()?.ok_or_else(not_found)?;

    // Find run by prefix
    let runs = store.list_runs()?;
    let matching: Vec<RunId> = runs
        .iter()
        .map(|r| r.id)
        .filter(|id| id.to_string().starts_with(run_prefix))
        .collect();

    let run_id = match matching.as_slice() {
        [] => return Err(not_found()),
        [id] => *id,
        _ => {
            return Err(Error::AmbiguousRun {
                prefix: run_prefix.to_string(),
                matches: matching.iter().map(|id| id.to_string()).collect(),
            });
        }
    };

    let events = store.load_run(run_id, kind_filter)?;

    if events.is_empty() {
        println!("No events found for run {run_id}");
        return Ok(());
    }

    println!("Run: {run_id}\n");

    for event in events {
        print_event(&event);
    }

    Ok(())
}

fn print_event(event: &Event) {
    let time = Local
        .from_utc_datetime(&event.timestamp.naive_utc())
        .format("%H:%M:%S");

    match &event.kind {
        EventKind::RunStart { query } => {
            println!("[{time}] QUERY: {query}");
        }
        EventKind::ToolCall { name, input } => {
            println!("[{time}] TOOL CALL: {name} {input}");
        }
        EventKind::ToolResult {
            name,
            output,
            is_error,
        } => {
            let label = if *is_error { "TOOL ERROR" } else { "TOOL RESULT" };
            println!("[{time}] {label}: {name}: {}", truncate(output, 200));
        }
        EventKind::Correction { reason } => {
            println!("[{time}] CORRECTION: {reason}");
        }
        EventKind::Answer { text } => {
            println!("[{time}] ANSWER: {text}");
        }
        EventKind::Failure { error_kind, detail } => {
            println!("[{time}] FAILED ({error_kind}): {detail}");
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// The run history database, if any run has been recorded.
fn open_store() -> Result<Option<EventStore>> {
    let db_path = data_dir().join("runs.db");
    if !db_path.exists() {
        return Ok(None);
    }
    Ok(Some(EventStore::open(&db_path)?))
}

fn data_dir() -> PathBuf {
    dirs_data_dir().unwrap_or_else(|| ".clerk".into())
}

fn dirs_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share/clerk"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("clerk"))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|h| PathBuf::from(h).join("clerk"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ask_joins_words() {
        let cli = Cli::parse_from(["clerk", "ask", "price", "of", "bread", "--json"]);
        let Commands::Ask { query, json, .. } = cli.command else {
            panic!("expected ask");
        };
        assert_eq!(query.join(" "), "price of bread");
        assert!(json);
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE));
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("€€€€", 2), "€€...");
        assert_eq!(truncate("ok", 2), "ok");
    }
}
