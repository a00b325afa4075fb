//! Vulkan instance creation

use ash::vk;

use crate::backend::{InstanceDescriptor, MessengerDescriptor, VulkanApi};
use crate::config::Version;
use crate::error::{BootstrapError, BootstrapResult};

/// Instance extension carrying the debug messenger
pub const DEBUG_UTILS_EXTENSION: &str = "VK_EXT_debug_utils";

/// Validation layer, messenger and features requested together
#[derive(Debug, Clone)]
pub struct InstanceDiagnostics {
    /// Validation layer name
    pub layer: String,
    /// Messenger chained into instance creation
    pub messenger: MessengerDescriptor,
    /// Validation features to enable
    pub features: Vec<vk::ValidationFeatureEnableEXT>,
}

/// Builds the instance descriptor and creates the instance
#[derive(Debug, Clone)]
pub struct InstanceBuilder {
    app_name: String,
    app_version: Version,
    api_version: Version,
    window_extensions: Vec<String>,
    diagnostics: Option<InstanceDiagnostics>,
}

impl InstanceBuilder {
    /// Start a builder for `app_name` targeting Vulkan 1.1
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            app_version: Version::new(0, 0, 0),
            api_version: Version::new(1, 1, 0),
            window_extensions: Vec::new(),
            diagnostics: None,
        }
    }

    /// Application version reported to the driver
    pub fn app_version(mut self, version: Version) -> Self {
        self.app_version = version;
        self
    }

    /// API version requested
    pub fn api_version(mut self, version: Version) -> Self {
        self.api_version = version;
        self
    }

    /// Extensions the windowing layer needs for presentation
    pub fn window_extensions(mut self, extensions: Vec<String>) -> Self {
        self.window_extensions = extensions;
        self
    }

    /// Enable the validation layer and debug messenger
    pub fn diagnostics(mut self, diagnostics: Option<InstanceDiagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Layers and extensions this builder will request
    pub fn descriptor(&self) -> InstanceDescriptor {
        let mut extensions = self.window_extensions.clone();
        let mut layers = Vec::new();

        if let Some(diagnostics) = &self.diagnostics {
            layers.push(diagnostics.layer.clone());
            if !extensions.iter().any(|name| name == DEBUG_UTILS_EXTENSION) {
                extensions.push(DEBUG_UTILS_EXTENSION.to_string());
            }
        }

        InstanceDescriptor {
            app_name: self.app_name.clone(),
            app_version: self.app_version.to_vk(),
            api_version: self.api_version.to_vk(),
            layers,
            extensions,
            diagnostics: self.diagnostics.as_ref().map(|d| d.messenger),
            validation_features: self
                .diagnostics
                .as_ref()
                .map(|d| d.features.clone())
                .unwrap_or_default(),
        }
    }

    /// Create the instance
    pub fn build<A: VulkanApi>(&self, api: &mut A) -> BootstrapResult<vk::Instance> {
        match api.instance_extensions() {
            Ok(available) => {
                log::debug!("{} instance extensions available", available.len());
                for name in &available {
                    log::debug!("  {name}");
                }
            }
            Err(e) => log::warn!("Could not enumerate instance extensions: {e}"),
        }

        let descriptor = self.descriptor();

        if !descriptor.layers.is_empty() {
            let installed = api.instance_layers()?;
            if let Some(missing) = descriptor
                .layers
                .iter()
                .find(|layer| !installed.contains(layer))
            {
                return Err(BootstrapError::LayerUnavailable { layer: missing.clone() });
            }
        }

        let instance = api.create_instance(&descriptor)?;
        log::debug!(
            "Instance created for \"{}\" (API {}, layers {:?}, extensions {:?})",
            self.app_name,
            self.api_version,
            descriptor.layers,
            descriptor.extensions
        );
        Ok(instance)
    }
}
