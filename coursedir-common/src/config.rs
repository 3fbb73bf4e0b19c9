//! Configuration loading and root folder resolution

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

/// Environment variable naming the catalog root folder
pub const ROOT_ENV_VAR: &str = "COURSEDIR_ROOT";

/// Optional TOML configuration file contents
///
/// A missing or unparsable file never prevents startup: every field has a
/// compiled default and load failures degrade to a warning.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Catalog root folder
    pub root_folder: Option<PathBuf>,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Load from the platform config location (`<config_dir>/coursedir/config.toml`)
    pub fn load() -> Self {
        let Some(path) = config_file_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load from an explicit path; missing file is silent, bad TOML warns
    pub fn load_from(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "ignoring unparsable config file");
                Self::default()
            }
        }
    }
}

fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("coursedir").join("config.toml"))
}

/// Root folder resolution priority:
/// 1. Command-line argument (highest priority)
/// 2. `COURSEDIR_ROOT` environment variable
/// 3. TOML config file
/// 4. Platform default (`<data_local_dir>/coursedir`)
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(ROOT_ENV_VAR) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    if let Some(path) = &config.root_folder {
        return path.clone();
    }
    default_root_folder()
}

/// Platform default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("coursedir"))
        .unwrap_or_else(|| PathBuf::from("./coursedir_data"))
}

/// Well-known file locations under the catalog root
#[derive(Debug, Clone)]
pub struct CatalogPaths {
    root: PathBuf,
}

impl CatalogPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Course catalog file
    pub fn courses(&self) -> PathBuf {
        self.root.join("courses.tsv")
    }

    /// Offering catalog file
    pub fn offerings(&self) -> PathBuf {
        self.root.join("offerings.tsv")
    }

    /// Partner lookup table
    pub fn partners(&self) -> PathBuf {
        self.root.join("partners.tsv")
    }

    /// Change-log directory
    pub fn log_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}
