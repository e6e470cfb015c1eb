//! Deep Research - iterative, cited research reports
//!
//! CLI entry point: reads a topic, runs the research loop, prints the report.

use std::fs;
use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use deepresearch::acquire::{ChunkSettings, ContentAcquirer};
use deepresearch::cli::Cli;
use deepresearch::config::{Config, RunConfig};
use deepresearch::fetch::{FETCH_TIMEOUT, Fetcher};
use deepresearch::http::{HttpTransport, ReqwestTransport};
use deepresearch::llm::{LlmClient, OpenAIClient};
use deepresearch::progress::TerminalProgress;
use deepresearch::prompts::PromptLoader;
use deepresearch::research::{FindingSink, ResearchEngine, SqliteSink};
use deepresearch::search::create_provider;

const NO_INPUT: &str =
    "No input provided. Provide a topic as a command-line argument or pipe input into the process.";

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<PathBuf> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("deepresearch")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_path = log_dir.join("deepresearch.log");
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(log_path)
}

/// Topic from the arguments, an interactive prompt, or piped stdin
fn read_topic(cli: &Cli) -> Result<Option<String>> {
    if let Some(topic) = cli.topic() {
        debug!("read_topic: topic from arguments");
        return Ok(Some(topic));
    }

    let stdin = io::stdin();
    let mut input = String::new();
    if stdin.is_terminal() {
        debug!("read_topic: prompting on terminal");
        print!("Enter research topic: ");
        io::stdout().flush().context("Failed to flush stdout")?;
        stdin.lock().read_line(&mut input).context("Failed to read topic")?;
    } else {
        debug!("read_topic: reading piped stdin");
        stdin.lock().read_to_string(&mut input).context("Failed to read stdin")?;
    }

    let topic = input.trim();
    Ok((!topic.is_empty()).then(|| topic.to_string()))
}

fn open_store(run: &RunConfig) -> Option<Box<dyn FindingSink>> {
    let path = run.db_path.as_ref()?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!(path = %parent.display(), error = %e, "Failed to create store directory");
    }
    match SqliteSink::open(path) {
        Ok(sink) => {
            info!(path = %path.display(), "Finding store opened");
            Some(Box::new(sink))
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Finding store unavailable, continuing without it");
            eprintln!("{} finding store unavailable: {}", "Warning:".yellow(), e);
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    config.apply_env_overrides().context("Invalid environment override")?;
    cli.apply_to(&mut config);

    let Some(topic) = read_topic(&cli)? else {
        info!("No topic provided, exiting");
        println!("{}", NO_INPUT);
        return Ok(());
    };

    let run = RunConfig::resolve(&config)?;
    info!(model = %run.model, "Deep research loaded config");

    let llm: Arc<dyn LlmClient> =
        Arc::new(OpenAIClient::from_run_config(&run).context("Failed to create model client")?);
    let pages: Arc<dyn HttpTransport> =
        Arc::new(ReqwestTransport::new(FETCH_TIMEOUT).context("Failed to create HTTP client")?);
    let search = create_provider(&run.search, pages.clone()).context("Failed to create search provider")?;

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let prompts = Arc::new(PromptLoader::new(&cwd));

    let summarizer = Arc::new(ContentAcquirer::new(
        Fetcher::new(pages).context("Failed to create page fetcher")?,
        llm.clone(),
        prompts.clone(),
        ChunkSettings::from(&run.research),
    ));

    let mut engine = ResearchEngine::new(
        llm,
        search,
        summarizer,
        prompts,
        run.research.clone(),
        run.scoring.clone(),
    )?
    .with_progress(Arc::new(TerminalProgress::stdout()));
    if let Some(store) = open_store(&run) {
        engine = engine.with_store(store);
    }

    println!("{} {}", "Researching:".bold(), topic);
    let outcome = engine.run(&topic).await?;

    println!();
    println!("{}", "=== Final Report ===".bold().green());
    println!(
        "{}",
        format!(
            "{} sources, {} refinement rounds, {}",
            outcome.findings.len(),
            outcome.refinement_rounds,
            chrono::Local::now().format("%Y-%m-%d %H:%M")
        )
        .dimmed()
    );
    println!();
    println!("{}", outcome.report);
    Ok(())
}
