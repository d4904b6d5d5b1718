//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::Project;

/// Default database location, relative to the project root
pub const DEFAULT_DATABASE_URL: &str = "sqlite://.rnc/rnc.db";

/// Default object storage bucket, relative to the project root
pub const DEFAULT_STORAGE_DIR: &str = ".rnc/objects";

/// Where records are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Relational tables in SQLite
    #[default]
    Sql,
    /// A single JSON document in object storage
    Json,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Sql => write!(f, "sql"),
            Backend::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sql" | "sqlite" => Ok(Backend::Sql),
            "json" | "blob" => Ok(Backend::Json),
            _ => Err(format!("Unknown backend: {}. Use sql or json", s)),
        }
    }
}

/// RNC configuration with layered hierarchy
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database connection string (SQLite)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Record backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<Backend>,

    /// Object storage directory for photos (and the JSON backend)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,

    /// Base URL under which stored objects are published
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,

    /// Shared quality-role password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_pass: Option<String>,

    /// Name recorded on status changes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (resolved lazily by the accessors)

        // 2. Global user config (~/.config/rnc/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.rnc/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.config_path()) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        config.merge(Self::from_env(|key| std::env::var(key).ok()));

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                None
            }
        }
    }

    /// Build the environment layer from a variable lookup
    pub fn from_env<F>(lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Config {
            database_url: get("RNC_DATABASE_URL"),
            backend: get("RNC_BACKEND").and_then(|v| match v.parse() {
                Ok(b) => Some(b),
                Err(e) => {
                    tracing::warn!("ignoring RNC_BACKEND: {}", e);
                    None
                }
            }),
            storage_dir: get("RNC_STORAGE_DIR").map(PathBuf::from),
            public_base_url: get("RNC_PUBLIC_URL"),
            quality_pass: get("RNC_QUALITY_PASS"),
            author: get("RNC_AUTHOR"),
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "rnc")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        if other.database_url.is_some() {
            self.database_url = other.database_url;
        }
        if other.backend.is_some() {
            self.backend = other.backend;
        }
        if other.storage_dir.is_some() {
            self.storage_dir = other.storage_dir;
        }
        if other.public_base_url.is_some() {
            self.public_base_url = other.public_base_url;
        }
        if other.quality_pass.is_some() {
            self.quality_pass = other.quality_pass;
        }
        if other.author.is_some() {
            self.author = other.author;
        }
    }

    pub fn database_url(&self) -> &str {
        self.database_url.as_deref().unwrap_or(DEFAULT_DATABASE_URL)
    }

    pub fn backend(&self) -> Backend {
        self.backend.unwrap_or_default()
    }

    /// Storage directory resolved against `root`
    pub fn storage_dir(&self, root: &Path) -> PathBuf {
        let dir = self
            .storage_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR));
        if dir.is_absolute() {
            dir
        } else {
            root.join(dir)
        }
    }

    /// Get the author name, falling back to git config or username
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        // Try git config
        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        // Fall back to username
        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    /// A copy safe to print: the password is masked
    pub fn redacted(&self) -> Config {
        let mut shown = self.clone();
        if shown.quality_pass.is_some() {
            shown.quality_pass = Some("********".to_string());
        }
        shown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.database_url(), DEFAULT_DATABASE_URL);
        assert_eq!(config.backend(), Backend::Sql);
        assert_eq!(
            config.storage_dir(Path::new("/p")),
            PathBuf::from("/p/.rnc/objects")
        );
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut base: Config = serde_yml::from_str(
            "database_url: sqlite://a.db\nbackend: json\nauthor: ana\n",
        )
        .unwrap();
        base.merge(Config {
            database_url: Some("sqlite://b.db".to_string()),
            ..Default::default()
        });
        assert_eq!(base.database_url(), "sqlite://b.db");
        assert_eq!(base.backend(), Backend::Json);
        assert_eq!(base.author(), "ana");
    }

    #[test]
    fn test_env_layer() {
        let vars: HashMap<&str, &str> = [
            ("RNC_DATABASE_URL", "sqlite:///tmp/x.db"),
            ("RNC_BACKEND", "json"),
            ("RNC_QUALITY_PASS", "s3cret"),
            ("RNC_AUTHOR", "  "),
        ]
        .into_iter()
        .collect();
        let config = Config::from_env(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.database_url.as_deref(), Some("sqlite:///tmp/x.db"));
        assert_eq!(config.backend, Some(Backend::Json));
        assert_eq!(config.quality_pass.as_deref(), Some("s3cret"));
        assert_eq!(config.author, None);
    }

    #[test]
    fn test_invalid_backend_env_is_ignored() {
        let config = Config::from_env(|k| (k == "RNC_BACKEND").then(|| "mongo".to_string()));
        assert_eq!(config.backend, None);
    }

    #[test]
    fn test_redacted_masks_password() {
        let config = Config {
            quality_pass: Some("s3cret".to_string()),
            ..Default::default()
        };
        let yaml = serde_yml::to_string(&config.redacted()).unwrap();
        assert!(!yaml.contains("s3cret"));
        assert!(yaml.contains("********"));
    }
}
