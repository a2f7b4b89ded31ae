use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::LogDestination;

/// Find public contact emails for a list of websites.
#[derive(Debug, Parser)]
#[command(name = "leadgen", version, about)]
pub struct Cli {
    /// Directory holding the session, history and optional leadgen.ron.
    #[arg(long, global = true, default_value = ".")]
    pub data_dir: PathBuf,

    /// Where log output goes.
    #[arg(long, global = true, value_enum, default_value_t = LogDestination::File)]
    pub log: LogDestination,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add websites from pasted text and/or a spreadsheet.
    Add {
        /// Websites separated by newlines, commas or semicolons.
        text: Vec<String>,
        /// Spreadsheet (.xlsx, .xls, .ods), CSV or text file to scan.
        #[arg(long, short)]
        file: Option<PathBuf>,
    },
    /// Show the current list and statistics.
    List,
    /// Remove one website from the list.
    Remove { id: u64 },
    /// Empty the list without touching history.
    Clear,
    /// Save finished lookups to history, then empty the list.
    Save,
    /// Write the list to a dated spreadsheet.
    Export {
        /// Output directory (defaults to the configured export dir or the data dir).
        #[arg(long)]
        out: Option<PathBuf>,
        /// Write CSV instead of an Excel workbook.
        #[arg(long)]
        csv: bool,
    },
    /// Look up emails for every idle website, one at a time.
    Run {
        /// Roles to prioritize, e.g. "CEOs" or "Marketing Directors".
        #[arg(long)]
        audience: Option<String>,
        /// Override the pause between lookups, in milliseconds.
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Override the model name.
        #[arg(long)]
        model: Option<String>,
    },
    /// Show previously attempted websites.
    History,
}

impl Command {
    /// Whether the command may rewrite the session file. Such commands hold
    /// the data directory lock for their whole run.
    pub fn changes_session(&self) -> bool {
        !matches!(self, Command::List | Command::Export { .. } | Command::History)
    }
}
