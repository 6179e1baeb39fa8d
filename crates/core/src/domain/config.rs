//! Configuration management for Ladder
//!
//! This module provides:
//! - Application settings (stream format, devices, preset location)
//! - Parameter presets with TOML serialization, plus built-in factory presets
//! - The main config file with factory-default fallback and corrupt-file backup

use crate::domain::audio::ChainConfig;
use crate::domain::params::{ParameterSet, ParameterValues};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info, instrument};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("State error: {0}")]
    State(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Preset not found: {0}")]
    PresetNotFound(String),
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Sample rate requested from the devices
    pub sample_rate: u32,

    /// Audio buffer size in frames
    pub buffer_size: u32,

    /// Channel count (1 or 2)
    pub channels: u16,

    /// Input device name (None = system default)
    pub input_device: Option<String>,

    /// Output device name (None = system default)
    pub output_device: Option<String>,

    /// Metering decay rate in dB per second
    pub meter_decay_rate: f32,

    /// Preset directory, relative paths resolve against the config directory
    pub preset_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 512,
            channels: 2,
            input_device: None,
            output_device: None,
            meter_decay_rate: 12.0,
            preset_dir: PathBuf::from("presets"),
        }
    }
}

impl AppConfig {
    /// Chain configuration for these stream settings
    pub fn chain_config(&self) -> ChainConfig {
        ChainConfig::new(
            self.sample_rate as f32,
            self.channels,
            self.buffer_size as usize,
        )
    }

    pub fn validate(&self) -> Result<()> {
        self.chain_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Complete Ladder configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LadderConfig {
    pub app: AppConfig,
    pub parameters: ParameterValues,
}

impl LadderConfig {
    /// Load configuration from TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).await?;
        let config: Self = toml::from_str(&contents)?;
        config.app.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Save configuration to TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving configuration");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str).await?;

        debug!("Configuration saved successfully");
        Ok(())
    }

    /// Create factory default configuration
    pub fn factory_default() -> Self {
        Self::default()
    }
}

// ============================================================================
// PRESETS
// ============================================================================

/// Named set of parameter values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub parameters: ParameterValues,
}

impl Preset {
    pub fn new(name: impl Into<String>, parameters: ParameterValues) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            parameters,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Capture the current values of a parameter set
    pub fn capture(name: impl Into<String>, parameters: &ParameterSet) -> Self {
        Self::new(name, parameters.snapshot())
    }

    /// Store these values into a parameter set (clamped)
    pub fn apply_to(&self, parameters: &ParameterSet) {
        parameters.apply(&self.parameters);
    }

    /// Presets that ship with the application
    pub fn factory_presets() -> Vec<Preset> {
        vec![
            Preset::new("init", ParameterValues::default())
                .with_description("Default settings"),
            Preset::new(
                "warm",
                ParameterValues {
                    drive: 3.0,
                    cutoff_hz: 4000.0,
                    resonance: 0.2,
                    trim_db: -2.0,
                },
            )
            .with_description("Gentle saturation with the top end rolled off"),
            Preset::new(
                "acid",
                ParameterValues {
                    drive: 6.0,
                    cutoff_hz: 900.0,
                    resonance: 0.85,
                    trim_db: -6.0,
                },
            )
            .with_description("Driven, squelchy resonance"),
            Preset::new(
                "dark",
                ParameterValues {
                    drive: 1.0,
                    cutoff_hz: 250.0,
                    resonance: 0.4,
                    trim_db: 3.0,
                },
            )
            .with_description("Low cutoff for muffled textures"),
        ]
    }

    pub fn factory(name: &str) -> Option<Preset> {
        Self::factory_presets().into_iter().find(|p| p.name == name)
    }
}

/// Preset manager
pub struct PresetManager {
    preset_dir: PathBuf,
}

impl PresetManager {
    /// Create a new preset manager
    pub fn new(preset_dir: PathBuf) -> Self {
        Self { preset_dir }
    }

    pub fn preset_dir(&self) -> &Path {
        &self.preset_dir
    }

    fn preset_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(ConfigError::Invalid(format!("invalid preset name: {:?}", name)));
        }
        Ok(self.preset_dir.join(format!("{}.toml", name)))
    }

    /// List all presets saved on disk
    #[instrument(skip(self))]
    pub async fn list_presets(&self) -> Result<Vec<String>> {
        let mut presets = Vec::new();

        if !self.preset_dir.exists() {
            return Ok(presets);
        }

        let mut entries = fs::read_dir(&self.preset_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "toml").unwrap_or(false) {
                if let Some(name) = path.file_stem() {
                    if let Some(name_str) = name.to_str() {
                        presets.push(name_str.to_string());
                    }
                }
            }
        }

        presets.sort();
        debug!(count = presets.len(), "Listed presets");
        Ok(presets)
    }

    /// Load a preset by name, falling back to the factory presets
    #[instrument(skip(self))]
    pub async fn load_preset(&self, name: &str) -> Result<Preset> {
        let path = self.preset_path(name)?;

        if !path.exists() {
            return Preset::factory(name).ok_or_else(|| ConfigError::PresetNotFound(name.to_string()));
        }

        let contents = fs::read_to_string(&path).await?;
        let preset: Preset = toml::from_str(&contents)?;
        debug!(name, "Preset loaded");
        Ok(preset)
    }

    /// Save a preset under its name
    #[instrument(skip(self, preset), fields(name = %preset.name))]
    pub async fn save_preset(&self, preset: &Preset) -> Result<()> {
        let path = self.preset_path(&preset.name)?;
        fs::create_dir_all(&self.preset_dir).await?;

        let toml_str = toml::to_string_pretty(preset)?;
        fs::write(&path, toml_str).await?;

        info!(path = %path.display(), "Preset saved");
        Ok(())
    }

    /// Delete a preset by name
    #[instrument(skip(self))]
    pub async fn delete_preset(&self, name: &str) -> Result<()> {
        let path = self.preset_path(name)?;

        if !path.exists() {
            return Err(ConfigError::PresetNotFound(name.to_string()));
        }

        fs::remove_file(&path).await?;
        info!(name, "Preset deleted");
        Ok(())
    }

    /// Check if a preset exists on disk
    pub async fn preset_exists(&self, name: &str) -> bool {
        self.preset_path(name).map(|p| p.exists()).unwrap_or(false)
    }
}

// ============================================================================
// CONFIG FILE
// ============================================================================

/// Configuration manager for the main Ladder config
///
/// Manages the main configuration file at `~/.config/ladder/config.toml`.
pub struct ConfigManager {
    config_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager rooted at `config_dir`
    pub fn new(config_dir: PathBuf) -> Self {
        let config_path = config_dir.join("config.toml");

        Self {
            config_dir,
            config_path,
        }
    }

    /// Get the default config directory path
    ///
    /// Returns `~/.config/ladder` on Linux, the platform equivalent elsewhere
    pub fn default_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("ladder"))
            .ok_or_else(|| ConfigError::Invalid("Could not determine config directory".to_string()))
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get the config file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Preset directory for `app`, resolved against the config directory
    pub fn preset_dir(&self, app: &AppConfig) -> PathBuf {
        if app.preset_dir.is_absolute() {
            app.preset_dir.clone()
        } else {
            self.config_dir.join(&app.preset_dir)
        }
    }

    /// Load configuration from file
    ///
    /// If the config file doesn't exist, writes and returns factory default.
    /// If the config file is corrupt, backs it up and returns factory default.
    #[instrument(skip(self))]
    pub async fn load(&self) -> LadderConfig {
        if !self.config_path.exists() {
            info!(
                path = %self.config_path.display(),
                "Config file not found, creating factory default"
            );

            let config = LadderConfig::factory_default();

            if let Err(e) = self.save(&config).await {
                error!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to save factory default config"
                );
            }

            return config;
        }

        match LadderConfig::load_from_file(&self.config_path).await {
            Ok(config) => {
                info!(
                    path = %self.config_path.display(),
                    "Configuration loaded successfully"
                );
                config
            }
            Err(e) => {
                error!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to load config, using factory default"
                );

                let backup_path = self.config_path.with_extension("toml.corrupt");
                if let Err(copy_err) = fs::copy(&self.config_path, &backup_path).await {
                    error!(
                        path = %backup_path.display(),
                        error = %copy_err,
                        "Failed to backup corrupt config"
                    );
                }

                LadderConfig::factory_default()
            }
        }
    }

    /// Save configuration to file
    #[instrument(skip(self, config))]
    pub async fn save(&self, config: &LadderConfig) -> Result<()> {
        fs::create_dir_all(&self.config_dir).await?;
        config.save_to_file(&self.config_path).await
    }

    /// Clear configuration (delete config file)
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        if self.config_path.exists() {
            fs::remove_file(&self.config_path).await?;
            info!(
                path = %self.config_path.display(),
                "Configuration cleared"
            );
        }

        Ok(())
    }

    /// Check if config file exists
    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }
}
