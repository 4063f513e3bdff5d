use std::fs;
use std::path::{Path, PathBuf};
use tt_core::{ConfigError, WorldConfig};

/// Default directory for world configurations.
pub const CONFIGS_DIR: &str = "assets/worlds";

/// Error type for config I/O operations.
#[derive(Debug)]
pub enum ConfigIoError {
    Io(std::io::Error),
    Ron(ron::Error),
    RonSpanned(ron::error::SpannedError),
    /// The file parsed but describes a world the synthesizer cannot serve.
    Invalid(ConfigError),
}

impl From<std::io::Error> for ConfigIoError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ron::Error> for ConfigIoError {
    fn from(err: ron::Error) -> Self {
        Self::Ron(err)
    }
}

impl From<ron::error::SpannedError> for ConfigIoError {
    fn from(err: ron::error::SpannedError) -> Self {
        Self::RonSpanned(err)
    }
}

impl From<ConfigError> for ConfigIoError {
    fn from(err: ConfigError) -> Self {
        Self::Invalid(err)
    }
}

impl std::fmt::Display for ConfigIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Ron(e) => write!(f, "RON serialization error: {}", e),
            Self::RonSpanned(e) => write!(f, "RON parse error: {}", e),
            Self::Invalid(e) => write!(f, "invalid world config: {}", e),
        }
    }
}

impl std::error::Error for ConfigIoError {}

/// Save a world configuration to a RON file.
pub fn save_config(path: &Path, config: &WorldConfig) -> Result<(), ConfigIoError> {
    let pretty_config = ron::ser::PrettyConfig::new().depth_limit(3);

    let ron_string = ron::ser::to_string_pretty(config, pretty_config)?;
    fs::write(path, ron_string)?;
    Ok(())
}

/// Load a world configuration from a RON file and validate it.
pub fn load_config(path: &Path) -> Result<WorldConfig, ConfigIoError> {
    let contents = fs::read_to_string(path)?;
    let config: WorldConfig = ron::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

/// Ensure the configs directory exists.
pub fn ensure_configs_dir(dir: &Path) -> Result<(), std::io::Error> {
    fs::create_dir_all(dir)
}

/// List all config files in a directory, sorted by path.
pub fn list_configs(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut configs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("ron") {
            configs.push(path);
        }
    }

    configs.sort();
    Ok(configs)
}

/// Generate a filename from a world name.
pub fn config_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}.ron", sanitized.to_lowercase())
}

/// Get the full path for a world's config file.
pub fn config_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(config_filename(name))
}
