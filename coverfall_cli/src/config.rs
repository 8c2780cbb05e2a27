use anyhow::{Context, Result};
use colored::Colorize;
use coverfall_core::ResolverConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Persistent resolution-cache settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CacheConfig {
    /// Cache backend: "file", "memory", or "none"
    pub backend: String,
    /// Maximum number of persisted resolutions
    pub max_entries: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub default_format: String,
    pub color_enabled: bool,
    pub progress_enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: "file".to_string(),
            max_entries: 10_000,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: "text".to_string(),
            color_enabled: true,
            progress_enabled: true,
        }
    }
}

/// Configuration manager that handles XDG-compliant paths and layered configuration
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    /// Create a new ConfigManager with default XDG-compliant paths
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a ConfigManager with a specific path (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn get_config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    /// Get the default XDG-compliant configuration path
    fn default_config_path() -> PathBuf {
        #[cfg(not(target_os = "windows"))]
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg_config).join("coverfall/config.toml");
        }

        #[cfg(target_os = "linux")]
        {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config/coverfall/config.toml")
        }

        #[cfg(target_os = "macos")]
        {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Library/Application Support/coverfall/config.toml")
        }

        #[cfg(target_os = "windows")]
        {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("coverfall\\config.toml")
        }
    }

    /// Load configuration with layered priority: ENV > File > Defaults
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new();

        // Layer 1: Defaults
        figment = figment.merge(Serialized::defaults(AppConfig::default()));

        // Layer 2: Config file (if exists)
        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        // Layer 3: Environment variables
        figment = figment.merge(Env::prefixed("COVERFALL_").split("__"));

        figment.extract().context("Failed to load configuration")
    }

    /// Get a configuration value by key (dot notation)
    pub fn get(&self, key: &str) -> Result<String> {
        let config = self.load()?;
        let toml_string = toml::to_string(&config)?;
        let value: toml::Value = toml::from_str(&toml_string)?;

        let parts: Vec<&str> = key.split('.').collect();
        let mut current = &value;

        for part in parts {
            match current {
                toml::Value::Table(table) => {
                    current = table
                        .get(part)
                        .ok_or_else(|| anyhow::anyhow!("Key '{}' not found", key))?;
                }
                _ => anyhow::bail!("Invalid key path: {}", key),
            }
        }

        match current {
            toml::Value::String(s) => Ok(s.clone()),
            toml::Value::Integer(i) => Ok(i.to_string()),
            toml::Value::Float(f) => Ok(f.to_string()),
            toml::Value::Boolean(b) => Ok(b.to_string()),
            _ => anyhow::bail!("Value at '{}' is not a simple type", key),
        }
    }

    /// Set a configuration value by key (dot notation)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.validate_config_value(key, value)?;

        // Load existing config or create new
        let mut config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            toml::from_str(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let parts: Vec<&str> = key.split('.').collect();
        if parts.is_empty() {
            anyhow::bail!("Empty key");
        }

        // Navigate to the correct position and set the value
        let mut current = &mut config;
        for (i, part) in parts.iter().enumerate() {
            if i == parts.len() - 1 {
                if let toml::Value::Table(table) = current {
                    let parsed_value = self.parse_config_value(key, value)?;
                    table.insert(part.to_string(), parsed_value);
                } else {
                    anyhow::bail!("Cannot set value on non-table");
                }
            } else {
                if let toml::Value::Table(table) = current {
                    if !table.contains_key(*part) {
                        table.insert(part.to_string(), toml::Value::Table(toml::map::Map::new()));
                    }
                    current = table.get_mut(*part).expect("key inserted above");
                } else {
                    anyhow::bail!("Invalid key path: expected table at '{}'", part);
                }
            }
        }

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(&config)?;
        fs::write(&self.config_path, toml_string)?;

        Ok(())
    }

    /// List all configuration values
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let config = self.load()?;
        let toml_string = toml::to_string(&config)?;
        let value: toml::Value = toml::from_str(&toml_string)?;

        let mut items = Vec::new();
        Self::collect_values(&value, String::new(), &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(items)
    }

    /// Recursively collect all key-value pairs from TOML
    fn collect_values(value: &toml::Value, prefix: String, items: &mut Vec<(String, String)>) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let new_prefix = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    Self::collect_values(val, new_prefix, items);
                }
            }
            toml::Value::String(s) => items.push((prefix, s.clone())),
            toml::Value::Integer(i) => items.push((prefix, i.to_string())),
            toml::Value::Float(f) => items.push((prefix, f.to_string())),
            toml::Value::Boolean(b) => items.push((prefix, b.to_string())),
            _ => {} // Skip arrays and other complex types
        }
    }

    /// Validate a configuration value
    fn validate_config_value(&self, key: &str, value: &str) -> Result<()> {
        match key {
            "resolver.probe_timeout_secs"
            | "resolver.preload_timeout_secs"
            | "resolver.lookup_timeout_secs" => {
                let secs: u64 = value
                    .parse()
                    .context("timeout must be a positive integer")?;
                if secs == 0 {
                    anyhow::bail!("timeout must be greater than 0");
                }
            }
            "resolver.max_results" => {
                let count: usize = value
                    .parse()
                    .context("max_results must be a positive integer")?;
                if count == 0 {
                    anyhow::bail!("max_results must be greater than 0");
                }
            }
            "resolver.min_confidence" => {
                let confidence: f32 = value
                    .parse()
                    .context("min_confidence must be a number")?;
                if !(0.0..=1.0).contains(&confidence) {
                    anyhow::bail!("min_confidence must be between 0.0 and 1.0");
                }
            }
            "cache.backend" => {
                if !matches!(value, "file" | "memory" | "none") {
                    anyhow::bail!("cache.backend must be 'file', 'memory', or 'none'");
                }
            }
            "cache.max_entries" => {
                let count: usize = value
                    .parse()
                    .context("max_entries must be a positive integer")?;
                if count == 0 {
                    anyhow::bail!("max_entries must be greater than 0");
                }
            }
            "output.default_format" => {
                if !matches!(value, "text" | "json" | "csv") {
                    anyhow::bail!("output.default_format must be 'text', 'json', or 'csv'");
                }
            }
            "output.color_enabled" | "output.progress_enabled" => {
                let _: bool = value.parse().context("Value must be 'true' or 'false'")?;
            }
            _ => {} // No validation for unknown keys
        }
        Ok(())
    }

    /// Parse a value to the appropriate TOML type
    fn parse_config_value(&self, key: &str, value: &str) -> Result<toml::Value> {
        match key {
            k if k.ends_with("_secs") || k.ends_with("_entries") || k.ends_with("_results") => {
                let num: i64 = value.parse().context("Expected integer value")?;
                Ok(toml::Value::Integer(num))
            }
            k if k.ends_with("_enabled") => {
                let bool_val: bool = value
                    .parse()
                    .context("Expected boolean value (true/false)")?;
                Ok(toml::Value::Boolean(bool_val))
            }
            "resolver.min_confidence" => {
                let num: f64 = value.parse().context("Expected number")?;
                Ok(toml::Value::Float(num))
            }
            // Force string types for these fields
            k if k == "resolver.user_agent" || k == "cache.backend" => {
                Ok(toml::Value::String(value.to_string()))
            }
            _ => {
                // Try parsing as different types
                if let Ok(b) = value.parse::<bool>() {
                    Ok(toml::Value::Boolean(b))
                } else if let Ok(i) = value.parse::<i64>() {
                    Ok(toml::Value::Integer(i))
                } else if let Ok(f) = value.parse::<f64>() {
                    Ok(toml::Value::Float(f))
                } else {
                    Ok(toml::Value::String(value.to_string()))
                }
            }
        }
    }

    /// Write a fully commented default configuration file. Refuses to
    /// overwrite an existing file unless `force` is set.
    pub fn init(&self, force: bool) -> Result<()> {
        if self.config_path.exists() && !force {
            anyhow::bail!(
                "Configuration already exists at {} (use --force to overwrite)",
                self.config_path.display()
            );
        }

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let defaults = toml::to_string_pretty(&AppConfig::default())?;
        fs::write(&self.config_path, defaults)?;

        eprintln!("{}", "Configuration written".green());
        eprintln!("Config file: {}", self.config_path.display());
        Ok(())
    }
}

/// Get the default configuration
pub fn get_config() -> Result<AppConfig> {
    ConfigManager::new().load()
}
