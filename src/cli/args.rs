//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs,
    config::ConfigCommands,
    export::ExportArgs,
    import::ImportArgs,
    init::InitArgs,
    pdf::PdfArgs,
    photo::PhotoCommands,
    record::{DeleteArgs, EditArgs, ListArgs, NewArgs, ShowArgs, TransitionArgs},
    report::ReportArgs,
    status::StatusArgs,
};

#[derive(Parser)]
#[command(name = "rnc")]
#[command(author, version, about = "Non-conformance report (RNC) tracker")]
#[command(
    long_about = "Register and track non-conformance reports with sequential per-year numbers (2025-001, 2025-002, ...), status workflow, photos, CSV exchange and PDF summaries."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .rnc/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    /// Quality-role password for commands that change records
    #[arg(long, global = true, env = "RNC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new RNC project
    Init(InitArgs),

    /// Register a new RNC
    New(NewArgs),

    /// List RNCs with filtering
    List(ListArgs),

    /// Show an RNC's details
    Show(ShowArgs),

    /// Edit an RNC's fields
    Edit(EditArgs),

    /// Close an open RNC
    Close(TransitionArgs),

    /// Reopen a closed RNC (moves it to in progress)
    Reopen(TransitionArgs),

    /// Cancel an RNC
    Cancel(TransitionArgs),

    /// Permanently delete an RNC and its photos
    Delete(DeleteArgs),

    /// Manage photos attached to an RNC
    #[command(subcommand)]
    Photo(PhotoCommands),

    /// Export RNCs to CSV
    Export(ExportArgs),

    /// Import RNCs from CSV
    Import(ImportArgs),

    /// Render an RNC as a PDF summary
    Pdf(PdfArgs),

    /// Summary tables by status, year and area
    Report(ReportArgs),

    /// Show project status dashboard
    Status(StatusArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (human for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just numbers, one per line
    Id,
}
