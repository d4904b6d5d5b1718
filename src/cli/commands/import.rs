//! `rnc import` command - Import RNCs from CSV files

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::cli::helpers::{truncate_str, Context};
use crate::cli::GlobalOpts;
use crate::core::csvio::{self, ImportOptions};

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// CSV file to import
    pub file: Option<PathBuf>,

    /// Print a CSV template with the expected header
    #[arg(long)]
    pub template: bool,

    /// Validate the CSV without creating records
    #[arg(long)]
    pub dry_run: bool,

    /// Import valid rows and report bad ones (default: any bad row aborts the import)
    #[arg(long)]
    pub skip_errors: bool,
}

pub fn run(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    if args.template {
        print!("{}", csvio::template());
        // Hint on stderr so it doesn't end up in a redirected file
        eprintln!();
        eprintln!(
            "{} Template generated. Redirect to file: rnc import --template > rncs.csv",
            style("→").blue()
        );
        return Ok(());
    }

    let file_path = args
        .file
        .clone()
        .ok_or_else(|| miette::miette!("CSV file required. Usage: rnc import rncs.csv"))?;
    if !file_path.exists() {
        return Err(miette::miette!("File not found: {}", file_path.display()));
    }

    let ctx = Context::load(global)?;
    let session = ctx.session(global)?;
    let mut service = ctx.service()?;

    println!(
        "{} Importing RNCs from {}{}",
        style("→").blue(),
        style(file_path.display()).yellow(),
        if args.dry_run {
            style(" (dry run)").dim().to_string()
        } else {
            String::new()
        }
    );
    println!();

    let file = File::open(&file_path).into_diagnostic()?;
    let options = ImportOptions {
        dry_run: args.dry_run,
        skip_errors: args.skip_errors,
    };
    let stats = service.import_csv(&session, BufReader::new(file), options)?;

    for error in &stats.errors {
        eprintln!(
            "{} Row {}: {}",
            style("✗").red(),
            error.row,
            truncate_str(&error.message, 80)
        );
    }
    if !global.quiet {
        for number in &stats.created {
            println!("{} Created {}", style("✓").green(), style(number).cyan());
        }
    }

    println!();
    println!("{}", style("─".repeat(50)).dim());
    println!("{}", style("Import Summary").bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  Rows processed: {}", style(stats.rows_processed).cyan());
    if args.dry_run {
        println!("  Valid rows:     {}", style(stats.valid).green());
    } else {
        println!("  RNCs created:   {}", style(stats.created.len()).green());
    }
    if !stats.errors.is_empty() {
        println!("  Errors:         {}", style(stats.errors.len()).red());
    }

    if args.dry_run {
        println!();
        println!(
            "{}",
            style("Dry run complete. No records were created.").yellow()
        );
    }

    Ok(())
}
