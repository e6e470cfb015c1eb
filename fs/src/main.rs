use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use findingstore::cli::{Cli, Command};
use findingstore::config::Config;
use findingstore::{Finding, FindingStore};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn print_finding(finding: &Finding) {
    let id = finding.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
    println!(
        "{} {} {}",
        format!("#{}", id).yellow(),
        format!("{:.2}", finding.score).green(),
        finding.source.cyan()
    );
    println!("  {} {}", "query:".dimmed(), finding.query);
    println!("  {} {}", "at:".dimmed(), finding.timestamp.dimmed());
    for line in finding.content.lines() {
        println!("  {}", line);
    }
    println!();
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let db_path = cli.db.unwrap_or(config.db_path);

    info!("findingstore starting: {}", db_path.display());

    let store = FindingStore::open(&db_path)?;

    match cli.command {
        Command::Query { pattern, limit } => {
            let findings = store.query_by_substring(&pattern, limit.unwrap_or(config.default_limit))?;
            if findings.is_empty() {
                println!("No findings match '{}'", pattern);
            }
            for finding in &findings {
                print_finding(finding);
            }
        }
        Command::Recent { limit } => {
            let findings = store.recent(limit.unwrap_or(config.default_limit))?;
            if findings.is_empty() {
                println!("No findings stored");
            }
            for finding in &findings {
                print_finding(finding);
            }
        }
        Command::Stats => {
            let stats = store.stats()?;
            println!("Store: {}", db_path.display().to_string().cyan());
            println!("  Findings: {}", stats.finding_count);
            println!("  Sources: {}", stats.source_count);
            println!("  Sub-tasks: {}", stats.query_count);
            println!("  Mean score: {:.2}", stats.mean_score);
        }
    }

    store.close()
}
