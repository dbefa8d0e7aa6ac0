use crate::config::types::{Config, ScraperConfig};
use crate::config::validation::validate;
use crate::ConfigResult;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Serialization format of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Picks the format from the file extension; anything but `.yaml`/`.yml` is TOML
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Toml,
        }
    }
}

/// Loads, parses and validates a configuration file from the given path
///
/// Invalid rate limits, concurrency caps and empty user agents are replaced by
/// their defaults during validation; missing required fields are errors.
///
/// # Arguments
///
/// * `path` - Path to the TOML or YAML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use scrape_pipeline::config::load_config;
///
/// let config = load_config(Path::new("config.yaml")).unwrap();
/// println!("Scrapers: {}", config.scrapers.len());
/// ```
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content, ConfigFormat::from_path(path))
}

/// Parses and validates configuration text in the given format
pub fn parse_config(content: &str, format: ConfigFormat) -> ConfigResult<Config> {
    let mut config: Config = match format {
        ConfigFormat::Toml => toml::from_str(content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
    };

    validate(&mut config)?;

    Ok(config)
}

/// Starter configuration: one polite scraper aimed at example.com
pub fn default_config() -> Config {
    Config {
        scrapers: vec![ScraperConfig {
            name: "Default Scraper".to_string(),
            url: "https://example.com".to_string(),
            respect_robots_txt: true,
            ..ScraperConfig::default()
        }],
        ..Config::default()
    }
}

/// Writes [`default_config`] to `path`, as YAML or TOML by extension
pub fn write_default_config(path: &Path) -> ConfigResult<()> {
    let config = default_config();
    let content = match ConfigFormat::from_path(path) {
        ConfigFormat::Toml => toml::to_string_pretty(&config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(&config)?,
    };

    std::fs::write(path, content)?;
    tracing::info!("Wrote default configuration to {}", path.display());
    Ok(())
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so that run summaries can be tied to the exact
/// configuration that produced them.
pub fn compute_config_hash(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> ConfigResult<(Config, String)> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
