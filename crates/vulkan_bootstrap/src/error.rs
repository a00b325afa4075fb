//! Bootstrap error types
//!
//! Every stage of the bootstrap reports failure through [`BootstrapError`].
//! Failures are terminal for the attempt: the orchestrator releases whatever
//! was created so far and hands the error to its caller.

use ash::vk;
use thiserror::Error;

use crate::config::ConfigError;
use crate::window::WindowError;

/// Bootstrap failure kinds
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// The windowing layer could not create the native window
    #[error("Window creation failed: {0}")]
    WindowCreationFailed(#[source] WindowError),

    /// The Vulkan loader or `vkCreateInstance` rejected the request
    #[error("Instance creation failed: {reason}")]
    InstanceCreationFailed {
        /// Loader or driver supplied reason
        reason: String,
    },

    /// A requested instance layer is not installed on this host
    #[error("Instance layer not available: {layer}")]
    LayerUnavailable {
        /// Name of the missing layer
        layer: String,
    },

    /// A dynamically resolved extension entry point is missing
    #[error("Extension entry point missing: {name}")]
    ExtensionEntryPointMissing {
        /// Name of the unresolved function
        name: String,
    },

    /// The platform rejected the native window while creating the surface
    #[error("Surface creation failed: {0}")]
    SurfaceCreationFailed(#[source] WindowError),

    /// No enumerated GPU satisfied the device requirements
    #[error("No suitable physical device found")]
    NoSuitablePhysicalDevice,

    /// The selected GPU exposes no graphics-capable queue family
    #[error("No graphics queue family found")]
    MissingGraphicsQueueFamily,

    /// No queue family was found that can present to the surface
    #[error("No presentation queue family found")]
    MissingPresentationQueueFamily,

    /// `vkCreateDevice` rejected the descriptor
    #[error("Logical device creation failed: {0:?}")]
    DeviceCreationFailed(vk::Result),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Any other API failure outside the named stages
    #[error("Unknown failure: {0}")]
    UnknownFailure(String),
}

impl BootstrapError {
    /// Wrap an unexpected `vk::Result` from a query call
    pub fn api(context: &str, result: vk::Result) -> Self {
        Self::UnknownFailure(format!("{context}: {result:?}"))
    }
}

/// Result type for bootstrap operations
pub type BootstrapResult<T> = Result<T, BootstrapError>;
