//! Configuration loading and root folder resolution
//!
//! Resolution order for every bootstrap value:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal: a warning is logged and
//! compiled defaults are used.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "CLINIC_ROOT_FOLDER";

/// Secondary (short) environment variable naming the root folder
pub const ROOT_ENV: &str = "CLINIC_ROOT";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "clinic.db";

/// Working directory name inside the root folder for transient downloads
pub const WORK_DIR_NAME: &str = "tmp";

/// Bootstrap configuration loaded from `<module>.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database and working directory
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP listen port
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// TUSS importer settings
    #[serde(default)]
    pub tuss: TussConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// `[tuss]` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TussConfig {
    /// Override for the ANS download URL
    #[serde(default)]
    pub source_url: Option<String>,

    /// Download timeout in seconds
    #[serde(default)]
    pub download_timeout_secs: Option<u64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load the config file for `module_name`, falling back to defaults
    ///
    /// An explicit path wins over the platform search locations.
    pub fn load(module_name: &str, explicit_path: Option<&Path>) -> Self {
        let path = match explicit_path {
            Some(path) => path.to_path_buf(),
            None => match config_file_path(module_name) {
                Some(path) => path,
                None => {
                    info!("No config file found for {}, using defaults", module_name);
                    return Self::default();
                }
            },
        };

        match Self::from_file(&path) {
            Ok(config) => {
                info!("Loaded config file: {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Locate `<module>.toml` in the platform config locations
///
/// Linux checks `~/.config/clinic/` then `/etc/clinic/`; other platforms only
/// check the user config directory.
pub fn config_file_path(module_name: &str) -> Option<PathBuf> {
    let file_name = format!("{}.toml", module_name);

    let user_config = dirs::config_dir().map(|d| d.join("clinic").join(&file_name));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/clinic").join(&file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Compiled-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
        }
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/clinic (or /var/lib/clinic for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("clinic"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/clinic"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("clinic"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/clinic"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("clinic"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\clinic"))
    } else {
        PathBuf::from("./clinic_data")
    }
}

/// Resolves the root folder through the four-tier priority order
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_arg: None,
            toml_root: None,
        }
    }

    /// Command-line override
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Root folder read from an already-loaded TOML config
    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!("Root folder from command line: {}", path.display());
            return path.clone();
        }

        // CLINIC_ROOT_FOLDER takes precedence over CLINIC_ROOT
        for var in [ROOT_FOLDER_ENV, ROOT_ENV] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    info!("Root folder from {}: {}", var, path);
                    return PathBuf::from(path);
                }
            }
        }

        if let Some(path) = &self.toml_root {
            info!("Root folder from {} config: {}", self.module_name, path.display());
            return path.clone();
        }

        let fallback = CompiledDefaults::for_current_platform().root_folder;
        info!("Root folder from compiled default: {}", fallback.display());
        fallback
    }
}

/// Creates the root folder layout and hands out well-known paths in it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root folder (and parents) if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if self.root_folder.exists() && !self.root_folder.is_dir() {
            return Err(Error::Config(format!(
                "Root folder is not a directory: {}",
                self.root_folder.display()
            )));
        }
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root_folder.join(WORK_DIR_NAME)
    }
}
