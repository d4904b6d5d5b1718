//! Shared helper functions for CLI commands

use console::{style, StyledObject};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::cli::GlobalOpts;
use crate::core::auth::{AuthError, QualityGate, QualitySession};
use crate::core::numbering::RncNumber;
use crate::core::project::Project;
use crate::core::service::RncService;
use crate::core::Config;
use crate::entities::rnc::RncStatus;

/// Project and effective configuration for one invocation
pub struct Context {
    pub project: Project,
    pub config: Config,
}

impl Context {
    /// Locate the project (`--project` or upward search) and load its config
    pub fn load(global: &GlobalOpts) -> Result<Self> {
        let project = match global.project {
            Some(ref path) => Project::discover_from(path),
            None => Project::discover(),
        }
        .map_err(|e| miette::miette!("{}", e))?;
        let config = Config::load(Some(&project));
        Ok(Self { project, config })
    }

    pub fn service(&self) -> Result<RncService> {
        Ok(RncService::open(&self.config, self.project.root())?)
    }

    /// Authenticate as the quality role
    ///
    /// The password comes from `--password` / `RNC_PASSWORD`, or a prompt
    /// when a terminal is attached.
    pub fn session(&self, global: &GlobalOpts) -> Result<QualitySession> {
        let gate = QualityGate::new(self.config.quality_pass.as_deref());
        if !gate.is_configured() {
            return Err(AuthError::NotConfigured.into());
        }

        let password = match global.password {
            Some(ref p) => p.clone(),
            None if console::Term::stderr().is_term() => dialoguer::Password::new()
                .with_prompt("Quality password")
                .interact()
                .into_diagnostic()?,
            None => return Err(AuthError::PasswordRequired.into()),
        };

        Ok(gate.login(&password, &self.config.author())?)
    }
}

/// Parse a `YYYY-NNN` argument
pub fn parse_number(s: &str) -> Result<RncNumber> {
    s.trim()
        .parse()
        .map_err(|e| miette::miette!("invalid RNC number '{}': {}", s, e))
}

/// Status colored for terminal output
pub fn style_status(status: RncStatus) -> StyledObject<String> {
    let label = status.to_string();
    match status {
        RncStatus::Open => style(label).yellow(),
        RncStatus::InProgress => style(label).cyan(),
        RncStatus::Closed => style(label).green(),
        RncStatus::Cancelled => style(label).dim(),
    }
}

/// Write to a file, or stdout when no path is given
pub fn write_output(content: &[u8], output_path: Option<&Path>) -> Result<()> {
    match output_path {
        Some(path) => {
            let file = File::create(path).into_diagnostic()?;
            let mut writer = BufWriter::new(file);
            writer.write_all(content).into_diagnostic()?;
            writer.flush().into_diagnostic()?;
            eprintln!(
                "{} Written to {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content).into_diagnostic()?;
            stdout.flush().into_diagnostic()?;
        }
    }
    Ok(())
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
