//! CLI module - Command-line interface for Bolão
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Bolão - football pool server
/// Predict match scores, earn a point for every exact result
#[derive(Parser)]
#[command(name = "bolao")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API (default)
    #[command(alias = "daemon")]
    Serve,

    /// Create default config file
    Init,

    /// Import fixtures for a round from a CSV file
    ImportMatches {
        /// CSV with columns home_team,away_team,kickoff
        file: PathBuf,
        /// Round the fixtures belong to
        #[arg(long, short)]
        round: i32,
    },

    /// Record finished results from a CSV file
    ImportResults {
        /// CSV as produced by export-results, with scores filled in
        file: PathBuf,
    },

    /// Write the results sheet of a round
    ExportResults {
        /// Round to export
        round: i32,
        /// Output file (stdout when omitted)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Show the leaderboard
    Ranking {
        /// Number of entries to show
        #[arg(long, short)]
        limit: Option<u64>,
    },
}

pub use commands::*;
