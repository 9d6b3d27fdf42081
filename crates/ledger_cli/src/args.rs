//! CLI argument definitions using clap.
//!
//! Commands:
//! - ledger ping
//! - ledger add-user --username <name>
//! - ledger add-category --name <name>
//! - ledger record-bill --user-id <id> --category-id <id> --bill-type <type> --date <ms> --amount <n>
//! - ledger show-user --id <id> [--primary]
//! - ledger sync-replica

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Personal ledger over a primary/replica SQLite pair
#[derive(Parser, Debug)]
#[command(name = "ledger")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to JSON configuration file. Without it both stores are in-memory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check core linkage and print the core version
    Ping,

    /// Create a user on the primary store
    AddUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        nickname: Option<String>,
    },

    /// Create a bill category on the primary store
    AddCategory {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// Record one bill and print the user's updated totals
    RecordBill {
        #[arg(long)]
        user_id: i64,
        #[arg(long)]
        category_id: i64,
        /// `expense` or `income`
        #[arg(long)]
        bill_type: String,
        /// Bill date as Unix epoch milliseconds
        #[arg(long)]
        date: i64,
        /// Amount in minor units
        #[arg(long)]
        amount: i64,
        #[arg(long)]
        description: Option<String>,
    },

    /// Print one user
    ShowUser {
        #[arg(long)]
        id: i64,
        /// Read from the primary instead of the replica
        #[arg(long)]
        primary: bool,
    },

    /// Copy the committed primary state onto the replica
    SyncReplica,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
