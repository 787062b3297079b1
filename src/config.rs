use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::db::DEFAULT_DB_PATH;

#[derive(Debug, Parser)]
#[command(name = "expense-tracker", version, about = "Record personal expenses in a local SQLite file")]
pub struct Cli {
    /// SQLite file holding the expenses table.
    #[arg(long, global = true, env = "EXPENSE_TRACKER_DB", default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,

    /// Append logs to this file (the only log output while the UI is running).
    #[arg(long, global = true, env = "EXPENSE_TRACKER_LOG")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Open the interactive expense form (default).
    Ui,
    /// Print every stored expense.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Record one expense.
    Add {
        /// YYYY-MM-DD, defaults to today.
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value = "Food")]
        category: String,
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Delete the expense with this id.
    Delete {
        id: i64,
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },
    /// Write all expenses to a CSV file.
    Export { path: PathBuf },
    /// Add expenses from a CSV file (Date,Category,Amount,Description).
    Import { path: PathBuf },
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Ui)
    }

    pub fn is_interactive(&self) -> bool {
        self.command() == Command::Ui
    }
}
