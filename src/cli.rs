//! Command-line interface definition for Docportal
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for the document Q&A chat and the stateless
//! analysis and comparison operations.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Docportal - document analysis and Q&A client
///
/// Upload documents to a document-intelligence server, ask questions
/// about them in a session, or run one-shot analysis and comparison.
#[derive(Parser, Debug, Clone)]
#[command(name = "docportal")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/docportal.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Server base URL (overrides config and DOCPORTAL_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Docportal
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive Q&A session about uploaded documents
    Chat {
        /// Files to upload before the first question
        #[arg(short, long, num_args = 1..)]
        upload: Vec<PathBuf>,
    },

    /// Analyze one or more documents
    Analyze {
        /// Documents to analyze
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print the raw JSON result
        #[arg(long)]
        json: bool,
    },

    /// Compare two sets of documents
    Compare {
        /// First document set
        #[arg(short = 'a', long = "a", required = true, num_args = 1..)]
        a: Vec<PathBuf>,

        /// Second document set
        #[arg(short = 'b', long = "b", required = true, num_args = 1..)]
        b: Vec<PathBuf>,

        /// Print the raw JSON result
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/docportal.yaml".to_string()),
            verbose: false,
            base_url: None,
            command: Commands::Chat { upload: Vec::new() },
        }
    }
}
