//! `rnc photo` command - Photos attached to an RNC

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::{parse_number, write_output, Context};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::service::sanitize_filename;
use crate::entities::rnc::PhotoCategory;

#[derive(Subcommand, Debug)]
pub enum PhotoCommands {
    /// Upload a photo and attach it to an RNC
    Add(AddArgs),

    /// List photos attached to an RNC
    List(ListArgs),

    /// Download an attached photo
    Get(GetArgs),

    /// Detach a photo and delete it from storage
    Rm(RmArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// RNC number (e.g. 2025-003)
    pub number: String,

    /// Image file to upload
    pub file: PathBuf,

    /// Lifecycle moment the photo documents (opening, closing, reopening)
    #[arg(long, short = 'c', default_value = "opening", value_parser = parse_category)]
    pub category: PhotoCategory,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// RNC number (e.g. 2025-003)
    pub number: String,
}

#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// RNC number (e.g. 2025-003)
    pub number: String,

    /// Storage key (see `rnc photo list`)
    pub key: String,

    /// Output file (default: original file name in the current directory; `-` for stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct RmArgs {
    /// RNC number (e.g. 2025-003)
    pub number: String,

    /// Storage key (see `rnc photo list`)
    pub key: String,
}

fn parse_category(s: &str) -> std::result::Result<PhotoCategory, String> {
    s.parse()
}

pub fn run(cmd: PhotoCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        PhotoCommands::Add(args) => run_add(args, global),
        PhotoCommands::List(args) => run_list(args, global),
        PhotoCommands::Get(args) => run_get(args, global),
        PhotoCommands::Rm(args) => run_rm(args, global),
    }
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let number = parse_number(&args.number)?;

    if !args.file.is_file() {
        return Err(miette::miette!("File not found: {}", args.file.display()));
    }
    let bytes = std::fs::read(&args.file).into_diagnostic()?;
    let filename = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let session = ctx.session(global)?;
    let photo = ctx
        .service()?
        .attach_photo(&session, number, args.category, &filename, &bytes)?;

    if global.quiet {
        println!("{}", photo.key);
    } else {
        println!(
            "{} Attached {} photo to RNC {}",
            style("✓").green(),
            photo.category,
            style(number).cyan()
        );
        println!("   key: {}", style(&photo.key).yellow());
        println!("   url: {}", style(&photo.url).dim());
    }
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let number = parse_number(&args.number)?;
    let rnc = ctx.service()?.get(number)?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rnc.photos).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&rnc.photos).into_diagnostic()?);
        }
        OutputFormat::Id => {
            for photo in &rnc.photos {
                println!("{}", photo.key);
            }
        }
        _ => {
            if rnc.photos.is_empty() {
                println!("No photos attached to RNC {}.", number);
                return Ok(());
            }
            for photo in &rnc.photos {
                println!(
                    "{:<10} {:<24} {}",
                    photo.category,
                    photo.filename,
                    style(&photo.key).yellow()
                );
            }
        }
    }
    Ok(())
}

fn run_get(args: GetArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let number = parse_number(&args.number)?;
    let (photo, bytes) = ctx.service()?.fetch_photo(number, &args.key)?;

    match args.output {
        Some(ref path) if path.as_os_str() == "-" => write_output(&bytes, None),
        Some(ref path) => write_output(&bytes, Some(path)),
        None => write_output(&bytes, Some(&PathBuf::from(sanitize_filename(&photo.filename)))),
    }
}

fn run_rm(args: RmArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let number = parse_number(&args.number)?;
    let session = ctx.session(global)?;
    let photo = ctx.service()?.detach_photo(&session, number, &args.key)?;

    if !global.quiet {
        println!(
            "{} Removed {} from RNC {}",
            style("✓").green(),
            photo.filename,
            style(number).cyan()
        );
    }
    Ok(())
}
