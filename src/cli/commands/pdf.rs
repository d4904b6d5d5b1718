//! `rnc pdf` command - PDF summary of one RNC

use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{parse_number, write_output, Context};
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct PdfArgs {
    /// RNC number (e.g. 2025-003)
    pub number: String,

    /// Output file (default: RNC_<number>.pdf; `-` for stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: PdfArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let number = parse_number(&args.number)?;
    let bytes = ctx.service()?.render_pdf(number)?;

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("RNC_{}.pdf", number)));
    if path.as_os_str() == "-" {
        write_output(&bytes, None)
    } else {
        write_output(&bytes, Some(&path))
    }
}
