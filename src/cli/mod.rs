//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "paperlens",
    version,
    author = "neur0map",
    about = "Question answering over research papers with hybrid retrieval",
    long_about = "paperlens chunks a corpus of research-paper records, builds a dense embedding index and a \
                  BM25 keyword index over the chunks, and answers questions with a language model grounded \
                  in the fused search results."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/paperlens/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk a JSONL corpus into the chunk collection
    Ingest {
        /// Corpus file (defaults to paths.corpus)
        input: Option<PathBuf>,
    },

    /// Build the dense and keyword indices from the chunk collection
    Build,

    /// Ingest and build in one step
    Index {
        /// Corpus file (defaults to paths.corpus)
        input: Option<PathBuf>,
    },

    /// Interactive question answering
    Chat {
        /// Number of context chunks per question
        #[arg(short = 'n', long)]
        top_k: Option<usize>,
    },

    /// Answer a single question
    Ask {
        /// Question to ask
        question: String,

        /// Number of context chunks to retrieve
        #[arg(short = 'n', long)]
        top_k: Option<usize>,

        /// Maximum tokens to generate
        #[arg(long)]
        max_tokens: Option<usize>,
    },

    /// Show retrieved chunks without generating an answer
    Query {
        /// Search query text
        query: String,

        /// Maximum number of results to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Analyze every message in a CSV file
    Batch {
        /// Input CSV with a message column
        input: PathBuf,

        /// Output CSV (defaults to <stem>_analyzed_<timestamp>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show artifact presence and index manifest
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ask_flags() {
        let cli = Cli::try_parse_from(["paperlens", "ask", "what is BM25?", "-n", "3", "--max-tokens", "100"])
            .unwrap();
        match cli.command {
            Commands::Ask {
                question,
                top_k,
                max_tokens,
            } => {
                assert_eq!(question, "what is BM25?");
                assert_eq!(top_k, Some(3));
                assert_eq!(max_tokens, Some(100));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["paperlens", "status", "--verbose", "-c", "x.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }
}
