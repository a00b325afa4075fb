//! Configuration system
//!
//! Bootstrap settings are plain serde structs. Every field has a default, so a
//! config file only needs to name what it overrides.

pub use serde::{Deserialize, Serialize};

use ash::vk;

use crate::initialization::diagnostics::{Category, Severity, SinkKind};
use crate::initialization::physical_device::DeviceRequirements;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Load configuration from file, falling back to defaults when the file is absent
    fn load_or_default(path: &str) -> Result<Self, ConfigError> {
        if std::path::Path::new(path).exists() {
            Self::load_from_file(path)
        } else {
            log::debug!("No config at {path}, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Value the driver would reject
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Three-part version number, packed into Vulkan's version encoding on use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
    /// Patch version
    #[serde(default)]
    pub patch: u32,
}

impl Version {
    /// Construct a version
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Pack into the `VK_MAKE_API_VERSION` encoding (variant 0)
    pub fn to_vk(self) -> u32 {
        vk::make_api_version(0, self.major, self.minor, self.patch)
    }

    /// Unpack a Vulkan-encoded version
    pub fn from_vk(packed: u32) -> Self {
        Self {
            major: vk::api_version_major(packed),
            minor: vk::api_version_minor(packed),
            patch: vk::api_version_patch(packed),
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Native window settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Client area width in pixels
    pub width: u32,
    /// Client area height in pixels
    pub height: u32,
    /// Title bar text
    pub title: String,
    /// Whether the user may resize the window
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "\"Simple\" Vulkan Renderer".to_string(),
            resizable: false,
        }
    }
}

/// Validation layer and debug messenger settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Enable the validation layer and debug messenger
    pub enabled: bool,
    /// Name of the validation layer to load
    pub validation_layer: String,
    /// Severities forwarded to the sink
    pub severities: Vec<Severity>,
    /// Categories forwarded to the sink
    pub categories: Vec<Category>,
    /// Where formatted events go
    pub sink: SinkKind,
    /// Turn on synchronization validation in the validation layer
    pub synchronization_validation: bool,
    /// Turn on best-practices checks in the validation layer
    pub best_practices: bool,
}

impl DiagnosticsConfig {
    /// Severity filter as Vulkan flags
    pub fn severity_mask(&self) -> vk::DebugUtilsMessageSeverityFlagsEXT {
        self.severities
            .iter()
            .fold(vk::DebugUtilsMessageSeverityFlagsEXT::empty(), |mask, s| mask | s.to_vk())
    }

    /// Category filter as Vulkan flags
    pub fn category_mask(&self) -> vk::DebugUtilsMessageTypeFlagsEXT {
        self.categories
            .iter()
            .fold(vk::DebugUtilsMessageTypeFlagsEXT::empty(), |mask, c| mask | c.to_vk())
    }

    /// Check the filters before they reach the driver
    ///
    /// Both masks must be non-empty when diagnostics are enabled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if self.severities.is_empty() {
            return Err(ConfigError::Invalid {
                field: "diagnostics.severities".to_string(),
                reason: "at least one severity is required".to_string(),
            });
        }
        if self.categories.is_empty() {
            return Err(ConfigError::Invalid {
                field: "diagnostics.categories".to_string(),
                reason: "at least one category is required".to_string(),
            });
        }
        Ok(())
    }

    /// Validation features to chain into instance creation
    pub fn validation_features(&self) -> Vec<vk::ValidationFeatureEnableEXT> {
        let mut features = Vec::new();
        if self.synchronization_validation {
            features.push(vk::ValidationFeatureEnableEXT::SYNCHRONIZATION_VALIDATION);
        }
        if self.best_practices {
            features.push(vk::ValidationFeatureEnableEXT::BEST_PRACTICES);
        }
        features
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: cfg!(debug_assertions),
            validation_layer: "VK_LAYER_KHRONOS_validation".to_string(),
            severities: vec![Severity::Error, Severity::Warning],
            categories: vec![Category::General, Category::Validation, Category::Performance],
            sink: SinkKind::Stderr,
            synchronization_validation: false,
            best_practices: false,
        }
    }
}

/// Top-level bootstrap configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Application name reported to the driver
    pub app_name: String,
    /// Application version reported to the driver
    pub app_version: Version,
    /// Vulkan API version requested at instance creation
    pub api_version: Version,
    /// Native window settings
    pub window: WindowConfig,
    /// Validation and debug messenger settings
    pub diagnostics: DiagnosticsConfig,
    /// Physical and logical device requirements
    pub device: DeviceRequirements,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            app_name: "\"Simple\" Vulkan Renderer".to_string(),
            app_version: Version::new(0, 0, 0),
            api_version: Version::new(1, 1, 0),
            window: WindowConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            device: DeviceRequirements::default(),
        }
    }
}

impl Config for BootstrapConfig {}
