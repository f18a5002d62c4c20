// Application settings
// Loaded from --config, $PHOTOKIT_CONFIG, or ~/.config/photokit/config.toml

use std::fs;
use std::path::{Path, PathBuf};

use photokit_recon::{DuplicateNames, ReconOptions};
use photokit_sheet::{Layout, Paper};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const CONFIG_ENV: &str = "PHOTOKIT_CONFIG";

/// Remote bucket to compare against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    pub region: String,
    /// S3-compatible endpoint (path-style). None = AWS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub prefix: String,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            bucket: None,
            region: "us-east-1".to_string(),
            endpoint: None,
            prefix: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareSettings {
    pub duplicate_names: DuplicateNames,
    pub content_fallback: bool,
    /// Leading bytes fetched per remote object for fingerprinting.
    pub fingerprint_bytes: u64,
    /// Only files with these extensions are compared. Empty = all files.
    pub extensions: Vec<String>,
}

impl Default for CompareSettings {
    fn default() -> Self {
        Self {
            duplicate_names: DuplicateNames::default(),
            content_fallback: true,
            fingerprint_bytes: 256 * 1024,
            extensions: jpeg_extensions(),
        }
    }
}

impl CompareSettings {
    pub fn recon_options(&self) -> ReconOptions {
        ReconOptions {
            duplicate_names: self.duplicate_names,
            content_fallback: self.content_fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetFormat {
    #[default]
    Pdf,
    Jpeg,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetSettings {
    pub format: SheetFormat,
    /// Sets the page size unless `layout` overrides it.
    pub paper: Paper,
    /// JPEG quality for embedded images and page files.
    pub quality: u8,
    /// Resolution of JPEG page output.
    pub dpi: f64,
    /// Page header title. None = name of the source folder or prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub extensions: Vec<String>,
    pub layout: Layout,
}

impl Default for SheetSettings {
    fn default() -> Self {
        Self {
            format: SheetFormat::Pdf,
            paper: Paper::A4,
            quality: 85,
            dpi: 150.0,
            title: None,
            extensions: jpeg_extensions(),
            layout: Layout::default(),
        }
    }
}

impl SheetSettings {
    /// Layout with `paper` applied when the file gave no explicit page size.
    pub fn effective_layout(&self) -> Layout {
        let a4 = Paper::A4.size_points();
        let explicit = (self.layout.page_width, self.layout.page_height) != a4;
        if explicit {
            self.layout.clone()
        } else {
            self.layout.clone().with_paper(self.paper)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameSettings {
    /// Script file name, written to the working directory.
    pub script: String,
    pub extensions: Vec<String>,
}

impl Default for RenameSettings {
    fn default() -> Self {
        Self {
            script: "rename_commands.sh".to_string(),
            extensions: jpeg_extensions(),
        }
    }
}

fn jpeg_extensions() -> Vec<String> {
    vec!["jpg".to_string(), "jpeg".to_string()]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub remote: RemoteSettings,
    pub compare: CompareSettings,
    pub sheet: SheetSettings,
    pub rename: RenameSettings,
}

/// Where the settings came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Flag(PathBuf),
    Env(PathBuf),
    Default(PathBuf),
    /// No file anywhere; built-in defaults.
    BuiltIn,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Flag(p) | Self::Env(p) | Self::Default(p) => Some(p),
            Self::BuiltIn => None,
        }
    }
}

impl Settings {
    /// Default settings file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("photokit").join("config.toml"))
    }

    /// Pick the settings file: flag, then environment, then the default
    /// location if it exists.
    pub fn resolve_source(
        flag: Option<&Path>,
        env: Option<String>,
        default_path: Option<PathBuf>,
    ) -> ConfigSource {
        if let Some(path) = flag {
            return ConfigSource::Flag(path.to_path_buf());
        }
        if let Some(path) = env.filter(|p| !p.trim().is_empty()) {
            return ConfigSource::Env(PathBuf::from(path));
        }
        match default_path {
            Some(path) if path.exists() => ConfigSource::Default(path),
            _ => ConfigSource::BuiltIn,
        }
    }

    /// Load using the real environment and config directory.
    pub fn load(flag: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        let source = Self::resolve_source(flag, std::env::var(CONFIG_ENV).ok(), Self::default_path());
        let settings = Self::load_from(&source)?;
        Ok((settings, source))
    }

    pub fn load_from(source: &ConfigSource) -> Result<Self, ConfigError> {
        let Some(path) = source.path() else {
            log::debug!("no config file, using defaults");
            return Ok(Self::default());
        };
        if !path.exists() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let settings = Self::from_toml(&contents).map_err(|e| match e {
            ConfigError::Invalid(message) => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        log::debug!("loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(input).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote.region.trim().is_empty() {
            return Err(ConfigError::Invalid("remote.region must not be empty".into()));
        }
        if self.compare.fingerprint_bytes == 0 {
            return Err(ConfigError::Invalid("compare.fingerprint_bytes must be positive".into()));
        }
        if !(1..=100).contains(&self.sheet.quality) {
            return Err(ConfigError::Invalid(format!(
                "sheet.quality must be 1-100, got {}",
                self.sheet.quality
            )));
        }
        if !(self.sheet.dpi.is_finite() && self.sheet.dpi > 0.0) {
            return Err(ConfigError::Invalid(format!("sheet.dpi must be positive, got {}", self.sheet.dpi)));
        }
        self.sheet
            .effective_layout()
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("sheet.layout: {}", e)))?;
        if self.rename.script.trim().is_empty() {
            return Err(ConfigError::Invalid("rename.script must not be empty".into()));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
