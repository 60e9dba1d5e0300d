//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - daemon: run the reminder loop
//! - add/list/done/delete: manage tasks
//! - settings: timezone and working hours
//! - schedule: preview reminder times

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Remindr - deadline reminders paced by importance
#[derive(Parser, Debug)]
#[command(name = "remindr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Chat to act for (defaults to telegram.chat_id from the config)
    #[arg(long, global = true)]
    pub chat_id: Option<i64>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the reminder daemon until interrupted
    Daemon {
        /// Print reminders instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Add a task; asks step by step when no description is given
    Add {
        /// Task description
        description: Option<String>,

        /// Deadline, DD.MM.YYYY or YYYY-MM-DD
        #[arg(short, long)]
        deadline: Option<String>,

        /// Importance 1-5 (reminders per day)
        #[arg(short, long, default_value_t = 3)]
        importance: u32,

        /// daily, every_other_day or weekly
        #[arg(short, long, default_value = "daily")]
        frequency: String,
    },

    /// List open tasks
    List,

    /// Mark a task as done
    Done {
        /// Task ID
        id: i64,
    },

    /// Delete a task
    Delete {
        /// Task ID
        id: i64,
    },

    /// Show or change timezone and working hours
    Settings {
        /// IANA timezone, e.g. Europe/Moscow
        #[arg(short, long)]
        timezone: Option<String>,

        /// First working hour (0-23)
        #[arg(long)]
        work_start: Option<u32>,

        /// Hour the working day ends (1-23)
        #[arg(long)]
        work_end: Option<u32>,

        /// Working hours per day used for estimates
        #[arg(long)]
        hours_per_day: Option<u32>,
    },

    /// Preview reminder times for an importance and work window
    Schedule {
        /// Importance 1-5
        #[arg(short, long, default_value_t = 5)]
        importance: u32,

        /// First working hour
        #[arg(long, default_value_t = 9)]
        work_start: u32,

        /// Hour the working day ends
        #[arg(long, default_value_t = 18)]
        work_end: u32,

        /// Timezone to render in
        #[arg(short, long, default_value = "UTC")]
        timezone: String,
    },
}
