//! Configuration management for kbforge.
//!
//! Parses `kbforge.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "kbforge.toml";

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Clone, Default)]
pub struct CliSettings {
    /// Override path to the XML knowledge-base export.
    pub export_file: Option<PathBuf>,
    /// Override path to the structure description.
    pub structure_file: Option<PathBuf>,
    /// Override templates directory.
    pub templates_dir: Option<PathBuf>,
    /// Override output directory.
    pub output_dir: Option<PathBuf>,
}

impl CliSettings {
    /// Check if all override fields are None (no overrides specified).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.export_file.is_none()
            && self.structure_file.is_none()
            && self.templates_dir.is_none()
            && self.output_dir.is_none()
    }
}

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input/output paths (relative strings from TOML).
    paths: PathsConfigRaw,

    /// Resolved paths configuration (set after loading).
    #[serde(skip)]
    pub paths_resolved: PathsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw paths configuration as parsed from TOML (paths as strings).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct PathsConfigRaw {
    export_file: Option<String>,
    structure_file: Option<String>,
    templates_dir: Option<String>,
    output_dir: Option<String>,
}

/// Resolved paths configuration with absolute paths.
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// XML knowledge-base export file.
    pub export_file: PathBuf,
    /// Structure description file.
    pub structure_file: PathBuf,
    /// Directory containing template definitions.
    pub templates_dir: PathBuf,
    /// Directory receiving generated output.
    pub output_dir: PathBuf,
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    /// File not found.
    NotFound(PathBuf),
    /// IO error.
    Io(std::io::Error),
    /// TOML parsing error.
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "Configuration file not found: {}", path.display()),
            Self::Io(err) => write!(f, "IO error: {err}"),
            Self::Parse(err) => write!(f, "TOML parse error: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err)
    }
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `kbforge.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(export_file) = &settings.export_file {
            self.paths_resolved.export_file.clone_from(export_file);
        }
        if let Some(structure_file) = &settings.structure_file {
            self.paths_resolved
                .structure_file
                .clone_from(structure_file);
        }
        if let Some(templates_dir) = &settings.templates_dir {
            self.paths_resolved.templates_dir.clone_from(templates_dir);
        }
        if let Some(output_dir) = &settings.output_dir {
            self.paths_resolved.output_dir.clone_from(output_dir);
        }
    }

    /// Search for config file in current directory and parents.
    #[must_use]
    pub fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    #[must_use]
    pub fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    #[must_use]
    pub fn default_with_base(base: &Path) -> Self {
        Self {
            paths: PathsConfigRaw::default(),
            paths_resolved: PathsConfig {
                export_file: base.join("data/export.xml"),
                structure_file: base.join("config/structure.yaml"),
                templates_dir: base.join("templates"),
                output_dir: base.join("output"),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.paths_resolved = PathsConfig {
            export_file: resolve(self.paths.export_file.as_deref(), "data/export.xml"),
            structure_file: resolve(
                self.paths.structure_file.as_deref(),
                "config/structure.yaml",
            ),
            templates_dir: resolve(self.paths.templates_dir.as_deref(), "templates"),
            output_dir: resolve(self.paths.output_dir.as_deref(), "output"),
        };
    }
}
