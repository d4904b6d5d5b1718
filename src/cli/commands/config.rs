//! `rnc config` command - Inspect configuration

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::Context;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration (the quality password is masked)
    Show(ShowArgs),

    /// Show paths to configuration files
    Path,

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

/// Valid configuration keys with their environment overrides
const VALID_KEYS: &[(&str, &str, &str)] = &[
    ("database_url", "RNC_DATABASE_URL", "SQLite connection string"),
    ("backend", "RNC_BACKEND", "Record backend: sql or json"),
    ("storage_dir", "RNC_STORAGE_DIR", "Object storage directory for photos"),
    ("public_base_url", "RNC_PUBLIC_URL", "Base URL for published photos"),
    ("quality_pass", "RNC_QUALITY_PASS", "Quality-role password"),
    ("author", "RNC_AUTHOR", "Name recorded on changes"),
];

pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Path => run_path(global),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let root = ctx.project.root();
    let shown = ctx.config.redacted();

    let effective: Vec<(&str, String)> = vec![
        ("database_url", shown.database_url().to_string()),
        ("backend", shown.backend().to_string()),
        ("storage_dir", shown.storage_dir(root).display().to_string()),
        (
            "public_base_url",
            shown.public_base_url.clone().unwrap_or_default(),
        ),
        ("quality_pass", shown.quality_pass.clone().unwrap_or_default()),
        ("author", shown.author()),
    ];

    if let Some(ref key) = args.key {
        let (_, value) = effective
            .iter()
            .find(|(k, _)| k == key)
            .ok_or_else(|| miette::miette!("Unknown config key '{}'. See `rnc config keys`", key))?;
        println!("{}", value);
        return Ok(());
    }

    match global.format {
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = effective
                .into_iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::String(v)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&map).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&shown).into_diagnostic()?);
        }
        _ => {
            println!("{}", style("Effective Configuration").bold().underlined());
            println!();
            for (key, value) in &effective {
                if value.is_empty() {
                    println!("  {:<16} {}", style(key).cyan(), style("(not set)").dim());
                } else {
                    println!("  {:<16} {}", style(key).cyan(), value);
                }
            }
            println!();
            println!("{}", style("Config Sources (in priority order):").dim());
            println!("  1. Environment variables (RNC_*)");
            println!("  2. Project config (.rnc/config.yaml)");
            println!("  3. Global config (~/.config/rnc/config.yaml)");
        }
    }
    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    match Config::global_config_path() {
        Some(path) => println!("global:  {}", path.display()),
        None => println!("global:  {}", style("(no home directory)").dim()),
    }
    match Context::load(global) {
        Ok(ctx) => println!("project: {}", ctx.project.config_path().display()),
        Err(_) => println!("project: {}", style("(not in an RNC project)").dim()),
    }
    Ok(())
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys").bold());
    println!();
    for (key, env, description) in VALID_KEYS {
        println!(
            "  {:<16} {:<18} {}",
            style(key).cyan(),
            style(env).yellow(),
            description
        );
    }
    Ok(())
}
