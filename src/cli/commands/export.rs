//! `rnc export` command - Export RNCs to CSV

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use crate::cli::helpers::Context;
use crate::cli::GlobalOpts;
use crate::core::csvio::ExportOptions;

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Prefix a UTF-8 byte order mark (helps spreadsheet tools detect the encoding)
    #[arg(long)]
    pub bom: bool,
}

pub fn run(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let service = ctx.service()?;
    let options = ExportOptions { bom: args.bom };

    match args.output {
        Some(path) => {
            let file = File::create(&path).into_diagnostic()?;
            let count = service.export_csv(BufWriter::new(file), options)?;
            if !global.quiet {
                eprintln!(
                    "{} Exported {} RNC(s) to {}",
                    style("✓").green(),
                    style(count).cyan(),
                    style(path.display()).cyan()
                );
            }
        }
        None => {
            service.export_csv(std::io::stdout().lock(), options)?;
        }
    }
    Ok(())
}
