//! `rnc status` command - Project status dashboard

use chrono::{Datelike, Local};
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{style_status, Context};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::auth::QualityGate;
use crate::core::config::Backend;
use crate::core::dburl::DatabaseUrl;
use crate::entities::rnc::RncStatus;

#[derive(clap::Args, Debug)]
pub struct StatusArgs {}

pub fn run(_args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let config = &ctx.config;
    let root = ctx.project.root();

    let storage = match config.backend() {
        Backend::Sql => DatabaseUrl::parse(config.database_url(), root)?.target.to_string(),
        Backend::Json => format!(
            "{}",
            config
                .storage_dir(root)
                .join(crate::core::store::RECORDS_KEY)
                .display()
        ),
    };
    let password_configured = QualityGate::new(config.quality_pass.as_deref()).is_configured();

    let rncs = ctx.service()?.list()?;
    let this_year = Local::now().year();
    let counts: Vec<(RncStatus, usize)> = RncStatus::ALL
        .iter()
        .map(|&s| (s, rncs.iter().filter(|r| r.status == s).count()))
        .collect();
    let last_this_year = rncs
        .iter()
        .filter(|r| r.number.year() == this_year)
        .map(|r| r.number)
        .max();

    match global.format {
        OutputFormat::Json => {
            let by_status: serde_json::Map<String, serde_json::Value> = counts
                .iter()
                .map(|(s, c)| (s.to_string(), serde_json::json!(c)))
                .collect();
            let status = serde_json::json!({
                "project": root.display().to_string(),
                "backend": config.backend().to_string(),
                "storage": storage,
                "objects": config.storage_dir(root).display().to_string(),
                "quality_password_configured": password_configured,
                "total": rncs.len(),
                "by_status": by_status,
                "last_number_this_year": last_this_year.map(|n| n.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&status).into_diagnostic()?);
        }
        _ => {
            let width = 60;
            println!("{}", style("RNC Project Status").bold().underlined());
            println!("{}", "═".repeat(width));
            println!("  Project:   {}", style(root.display()).cyan());
            println!("  Backend:   {}", config.backend());
            println!("  Records:   {}", storage);
            println!("  Photos:    {}", config.storage_dir(root).display());
            println!(
                "  Quality:   {}",
                if password_configured {
                    style("password configured").green()
                } else {
                    style("no password configured (writes refused)").red()
                }
            );
            println!();
            println!("{}", style("RECORDS").bold());
            println!("{}", "─".repeat(width));
            for (status, count) in &counts {
                println!("  {:<14} {}", style_status(*status), count);
            }
            println!("  {:<14} {}", "total", style(rncs.len()).cyan());
            println!();
            match last_this_year {
                Some(n) => println!("  Last number in {}: {}", this_year, style(n).cyan()),
                None => println!("  No RNCs yet in {}", this_year),
            }
        }
    }

    Ok(())
}
