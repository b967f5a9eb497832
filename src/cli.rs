//! CLI argument parsing for BEO.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "beo",
    about = "Medical-equipment loan bank",
    version,
    after_help = "Logs are written to: ~/.local/share/beo/logs/beo.log"
)]
pub struct Cli {
    /// Path to the store directory (default: current directory)
    #[arg(short = 'd', long, global = true)]
    pub dir: Option<PathBuf>,

    /// Path to a YAML config file (return policy, loan defaults)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a new store in the current directory
    Init,

    /// Register a new inventory item
    Register {
        /// Inventory code (unique, e.g. SR-001)
        code: String,

        /// Item name
        name: String,

        /// Category name
        #[arg(short = 'C', long, default_value = "Other")]
        category: String,

        /// Deposit name
        #[arg(short = 'D', long, default_value = "Main deposit")]
        deposit: String,

        #[arg(long)]
        brand: Option<String>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        serial: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Who is registering the item
        #[arg(long, default_value = "admin")]
        by: String,
    },

    /// List inventory items
    Items {
        /// Filter by state (available, loaned, maintenance, decommissioned)
        #[arg(short, long)]
        state: Option<String>,

        /// Filter by code substring
        #[arg(long)]
        code: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one item by code
    Item {
        /// Inventory code
        code: String,
    },

    /// Register a beneficiary
    Beneficiary {
        /// Beneficiary name
        name: String,

        /// The beneficiary is a member's relative, not a member
        #[arg(long)]
        relative: bool,

        /// Kinship to the responsible member (relatives only)
        #[arg(long)]
        kinship: Option<String>,

        /// Member answering for the loan (relatives only)
        #[arg(long)]
        responsible: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        address: Option<String>,
    },

    /// List beneficiaries
    Beneficiaries,

    /// Open a loan for an item
    Open {
        /// Item inventory code
        code: String,

        /// Beneficiary ID (bf-...)
        beneficiary: String,

        /// Requesting member
        #[arg(long)]
        requested_by: String,

        /// Loan date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Duration in days (default: from config)
        #[arg(long)]
        days: Option<u32>,

        #[arg(long)]
        authorized_by: Option<String>,

        #[arg(long)]
        delivered_by: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Close a loan: equipment returned
    Close {
        /// Loan ID (ln-...)
        loan: String,

        /// Reported condition (mapped through the return policy)
        condition: String,

        /// Return date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        received_by: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// Return the item to this deposit (by name)
        #[arg(long)]
        deposit: Option<String>,

        /// Who is recording the return
        #[arg(long, default_value = "admin")]
        by: String,
    },

    /// Close a loan: equipment lost
    Lost {
        /// Loan ID (ln-...)
        loan: String,

        #[arg(long)]
        notes: Option<String>,

        /// Who is recording the loss
        #[arg(long, default_value = "admin")]
        by: String,
    },

    /// List loans
    Loans {
        /// Show the full loan history of one item (by code)
        #[arg(long)]
        item: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show active loans with due-date alert tiers
    Alerts {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check item states against the loan ledger
    Audit {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Repair drift found by the audit
    Reconcile,

    /// Show an item's state-change history
    History {
        /// Inventory code
        code: String,
    },

    /// Administrative item state override
    SetState {
        /// Inventory code
        code: String,

        /// Target state (available, maintenance, decommissioned)
        state: String,

        /// Why the state is changing
        #[arg(short, long)]
        reason: String,

        /// Who is changing it
        #[arg(long, default_value = "admin")]
        by: String,
    },

    /// Register a deposit
    Deposit {
        /// Deposit name
        name: String,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        manager: Option<String>,

        #[arg(long)]
        phone: Option<String>,
    },

    /// Show inventory counters
    Status,
}
