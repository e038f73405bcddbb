use crate::naming::MultiEpStyle;
use crate::quality::{Quality, QualityPreference};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub naming: NamingConfig,

    pub quality: QualityConfig,

    pub subtitles: SubtitleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "telarr.db".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Naming engine settings shared by every show; per-show flags (flatten
/// folders, air-by-date) live on the show record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Pattern for regular episodes. Path separators split the pattern
    /// into folder segments plus a filename segment.
    pub pattern: String,

    /// Pattern used for air-by-date shows when `custom_abd` is on.
    pub abd_pattern: String,

    pub custom_abd: bool,

    pub multi_ep: MultiEpStyle,

    /// Strip a trailing "(YYYY)" from show names before substitution.
    pub strip_year: bool,

    /// Create season folders even for shows that request flat layout.
    pub force_folders: bool,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            pattern: "Season %0S/%SN - S%0SE%0E - %EN".to_string(),
            abd_pattern: "%SN - %A-D - %EN".to_string(),
            custom_abd: false,
            multi_ep: MultiEpStyle::default(),
            strip_year: false,
            force_folders: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Qualities acceptable as a first acquisition for new shows.
    pub default_any: Vec<Quality>,

    /// Qualities worth upgrading to for new shows.
    pub default_best: Vec<Quality>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        let defaults = QualityPreference::default();
        Self {
            default_any: defaults.any,
            default_best: defaults.best,
        }
    }
}

impl QualityConfig {
    #[must_use]
    pub fn default_preference(&self) -> QualityPreference {
        QualityPreference::new(self.default_any.clone(), self.default_best.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    pub enabled: bool,

    /// Wanted subtitle language codes, e.g. "en", "fr".
    pub languages: Vec<String>,

    /// Subfolder (relative to the episode) where subtitle sidecars live;
    /// empty keeps them next to the episode file.
    pub directory: String,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            languages: vec!["en".to_string()],
            directory: String::new(),
        }
    }
}

const CONFIG_FILE: &str = "config.toml";

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_FILE)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn create_default_if_missing() -> Result<()> {
        let path = Path::new(CONFIG_FILE);
        if path.exists() {
            return Ok(());
        }
        let serialized =
            toml::to_string_pretty(&Self::default()).context("failed to serialize defaults")?;
        std::fs::write(path, serialized)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.naming.pattern.trim().is_empty() {
            anyhow::bail!("naming.pattern must not be empty");
        }
        if !self.naming.pattern.to_uppercase().contains("%E")
            && !self.naming.pattern.to_uppercase().contains("%0E")
        {
            anyhow::bail!("naming.pattern needs an episode number token (%E or %0E)");
        }
        if self.general.database_path.trim().is_empty() {
            anyhow::bail!("general.database_path must not be empty");
        }
        Ok(())
    }
}
