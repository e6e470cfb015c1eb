//! CLI argument parsing for findingstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fs")]
#[command(author, version, about = "Inspect findings gathered by deep research runs", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the findings database (overrides config)
    #[arg(short, long)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Findings whose sub-task contains a substring, best score first
    Query {
        /// Substring to match against the sub-task text
        #[arg(required = true)]
        pattern: String,

        /// Maximum results to return
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Most recently stored findings
    Recent {
        /// Maximum results to return
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show statistics for the store
    Stats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        let cli = Cli::try_parse_from(["fs", "query", "sleep", "--limit", "3"]).unwrap();
        match cli.command {
            Command::Query { pattern, limit } => {
                assert_eq!(pattern, "sleep");
                assert_eq!(limit, Some(3));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_db_override() {
        let cli = Cli::try_parse_from(["fs", "--db", "/tmp/x.db", "stats"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        assert!(matches!(cli.command, Command::Stats));
    }

    #[test]
    fn test_query_requires_pattern() {
        assert!(Cli::try_parse_from(["fs", "query"]).is_err());
    }
}
