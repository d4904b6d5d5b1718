//! Database connection string normalization
//!
//! Connection strings are pasted from chat messages, dashboards and other
//! tools' config files, so they arrive with stray quotes, whitespace, driver
//! suffixes and query strings. [`DatabaseUrl::parse`] rewrites what it can
//! into a SQLite target and reports each rewrite so the caller can log it.

use std::fmt;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum DbUrlError {
    #[error("database URL is not configured")]
    #[diagnostic(
        code(rnc::db_url::not_configured),
        help("set RNC_DATABASE_URL or `database_url` in .rnc/config.yaml")
    )]
    NotConfigured,

    #[error("unsupported database scheme '{scheme}'")]
    #[diagnostic(
        code(rnc::db_url::unsupported_scheme),
        help("use sqlite://path/to/rnc.db, sqlite:///absolute/path.db, a plain file path, or :memory:")
    )]
    UnsupportedScheme { scheme: String },

    #[error("database URL '{0}' has no file path")]
    #[diagnostic(code(rnc::db_url::empty_path))]
    EmptyPath(String),
}

/// Where the SQLite database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    File(PathBuf),
    Memory,
}

/// A parsed URL plus the rewrites applied to reach it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    pub target: DatabaseUrl,
    pub rewrites: Vec<String>,
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseUrl::File(path) => write!(f, "sqlite://{}", path.display()),
            DatabaseUrl::Memory => write!(f, "sqlite::memory:"),
        }
    }
}

impl DatabaseUrl {
    /// Parse and normalize `raw`; relative paths resolve against `base_dir`
    pub fn parse(raw: &str, base_dir: &Path) -> Result<NormalizedUrl, DbUrlError> {
        let mut rewrites = Vec::new();

        let mut s = raw.trim();
        if s.len() != raw.len() {
            rewrites.push("trimmed surrounding whitespace".to_string());
        }

        for quote in ['"', '\''] {
            if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
                s = s[1..s.len() - 1].trim();
                rewrites.push("removed surrounding quotes".to_string());
            }
        }

        if s.is_empty() {
            return Err(DbUrlError::NotConfigured);
        }

        if s == ":memory:" {
            return Ok(NormalizedUrl {
                target: DatabaseUrl::Memory,
                rewrites,
            });
        }

        let location = match split_scheme(s) {
            Some((scheme, rest)) => {
                let scheme_lower = scheme.to_lowercase();
                let (base, driver) = match scheme_lower.split_once('+') {
                    Some((base, driver)) => (base.to_string(), Some(driver.to_string())),
                    None => (scheme_lower.clone(), None),
                };

                match base.as_str() {
                    "sqlite" | "sqlite3" | "file" => {}
                    _ => return Err(DbUrlError::UnsupportedScheme { scheme: scheme_lower }),
                }
                if let Some(driver) = driver {
                    rewrites.push(format!("dropped driver suffix '+{}'", driver));
                }
                if base == "sqlite3" {
                    rewrites.push("treated 'sqlite3' scheme as 'sqlite'".to_string());
                }

                let (rest, query) = match rest.split_once('?') {
                    Some((rest, query)) => (rest, Some(query)),
                    None => (rest, None),
                };
                if let Some(query) = query {
                    rewrites.push(format!("dropped query string '?{}'", query));
                }
                rest.to_string()
            }
            None => s.to_string(),
        };

        if location == ":memory:" {
            return Ok(NormalizedUrl {
                target: DatabaseUrl::Memory,
                rewrites,
            });
        }

        // sqlite:////abs (four slashes) and similar collapse to one leading slash
        let mut location = location;
        if location.starts_with("//") {
            location = format!("/{}", location.trim_start_matches('/'));
            rewrites.push("collapsed repeated leading slashes".to_string());
        }

        if location.is_empty() {
            return Err(DbUrlError::EmptyPath(raw.trim().to_string()));
        }

        let path = match location.strip_prefix("~/") {
            Some(rest) => match directories::BaseDirs::new() {
                Some(dirs) => {
                    rewrites.push("expanded '~' to the home directory".to_string());
                    dirs.home_dir().join(rest)
                }
                None => PathBuf::from(&location),
            },
            None => PathBuf::from(&location),
        };

        let path = if path.is_absolute() {
            path
        } else {
            base_dir.join(path)
        };

        Ok(NormalizedUrl {
            target: DatabaseUrl::File(path),
            rewrites,
        })
    }
}

/// Split `scheme://rest` or `scheme:rest` for the schemes we recognise
///
/// Bare paths (including Windows drive letters) return `None`.
fn split_scheme(s: &str) -> Option<(&str, &str)> {
    if let Some(idx) = s.find("://") {
        let scheme = &s[..idx];
        let is_scheme = scheme.len() > 1
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.');
        if is_scheme {
            return Some((scheme, &s[idx + 3..]));
        }
    }

    let lower = s.to_lowercase();
    for scheme in ["sqlite3", "sqlite", "file"] {
        if lower.starts_with(scheme) && s[scheme.len()..].starts_with(':') {
            return Some((&s[..scheme.len()], &s[scheme.len() + 1..]));
        }
    }

    None
}
