//! Graphics API boundary
//!
//! The bootstrap talks to Vulkan only through [`VulkanApi`]. Handles are the
//! plain `ash::vk` handle types; the implementor keeps whatever function
//! tables it needs to service calls on them.

use ash::vk;

use crate::error::BootstrapResult;
use crate::initialization::diagnostics::SinkHandle;

pub mod ash_backend;

#[cfg(test)]
pub(crate) mod fake;

pub use ash_backend::{AshBackend, AshMessenger};

/// Names of the dynamically resolved debug messenger entry points
pub const MESSENGER_ENTRY_POINTS: [&str; 2] = [
    "vkCreateDebugUtilsMessengerEXT",
    "vkDestroyDebugUtilsMessengerEXT",
];

/// Debug messenger registration parameters
#[derive(Debug, Clone, Copy)]
pub struct MessengerDescriptor {
    /// Severities delivered to the callback
    pub severities: vk::DebugUtilsMessageSeverityFlagsEXT,
    /// Categories delivered to the callback
    pub categories: vk::DebugUtilsMessageTypeFlagsEXT,
    /// Sink the callback forwards events to
    pub sink: SinkHandle,
}

/// Everything needed for `vkCreateInstance`
#[derive(Debug, Clone)]
pub struct InstanceDescriptor {
    /// Application name
    pub app_name: String,
    /// Packed application version
    pub app_version: u32,
    /// Packed API version requested
    pub api_version: u32,
    /// Instance layers to enable
    pub layers: Vec<String>,
    /// Instance extensions to enable
    pub extensions: Vec<String>,
    /// Messenger chained into instance creation so creation itself is observed
    pub diagnostics: Option<MessengerDescriptor>,
    /// Validation layer features to enable
    pub validation_features: Vec<vk::ValidationFeatureEnableEXT>,
}

/// Queues requested from one family at device creation
#[derive(Debug, Clone, PartialEq)]
pub struct QueueRequest {
    /// Queue family index
    pub family_index: u32,
    /// One priority per requested queue
    pub priorities: Vec<f32>,
}

/// Everything needed for `vkCreateDevice`
#[derive(Debug, Clone, Default)]
pub struct DeviceDescriptor {
    /// One entry per distinct queue family
    pub queue_requests: Vec<QueueRequest>,
    /// Device extensions to enable
    pub extensions: Vec<String>,
    /// Device features to enable
    pub features: vk::PhysicalDeviceFeatures,
}

/// Resolved `VK_EXT_debug_utils` messenger entry points
pub trait MessengerEntryPoints {
    /// Register a messenger
    fn create_messenger(&self, descriptor: &MessengerDescriptor) -> BootstrapResult<vk::DebugUtilsMessengerEXT>;

    /// Unregister a messenger
    fn destroy_messenger(&self, messenger: vk::DebugUtilsMessengerEXT);
}

/// Vulkan calls made during bootstrap and teardown
pub trait VulkanApi {
    /// Messenger entry points resolved from an instance
    type Messenger: MessengerEntryPoints;

    /// Names of the instance extensions the loader offers
    fn instance_extensions(&self) -> BootstrapResult<Vec<String>>;

    /// Names of the instance layers installed on this host
    fn instance_layers(&self) -> BootstrapResult<Vec<String>>;

    /// Create the instance
    fn create_instance(&mut self, descriptor: &InstanceDescriptor) -> BootstrapResult<vk::Instance>;

    /// Destroy the instance
    fn destroy_instance(&mut self, instance: vk::Instance);

    /// Look up the messenger create/destroy functions on an instance
    fn resolve_messenger_entry_points(&self, instance: vk::Instance) -> BootstrapResult<Self::Messenger>;

    /// Destroy a surface created against `instance`
    fn destroy_surface(&mut self, instance: vk::Instance, surface: vk::SurfaceKHR);

    /// GPUs visible to the instance, in driver order
    fn enumerate_physical_devices(&self, instance: vk::Instance) -> BootstrapResult<Vec<vk::PhysicalDevice>>;

    /// Name, type, API version and limits of a GPU
    fn physical_device_properties(
        &self,
        instance: vk::Instance,
        device: vk::PhysicalDevice,
    ) -> BootstrapResult<vk::PhysicalDeviceProperties>;

    /// Optional features a GPU supports
    fn physical_device_features(
        &self,
        instance: vk::Instance,
        device: vk::PhysicalDevice,
    ) -> BootstrapResult<vk::PhysicalDeviceFeatures>;

    /// Queue families a GPU exposes, in index order
    fn queue_family_properties(
        &self,
        instance: vk::Instance,
        device: vk::PhysicalDevice,
    ) -> BootstrapResult<Vec<vk::QueueFamilyProperties>>;

    /// Whether `family_index` can present to `surface`
    fn surface_support(
        &self,
        device: vk::PhysicalDevice,
        family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> BootstrapResult<bool>;

    /// Create the logical device
    fn create_device(
        &mut self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        descriptor: &DeviceDescriptor,
    ) -> BootstrapResult<vk::Device>;

    /// Fetch a queue created with the device
    fn device_queue(&self, device: vk::Device, family_index: u32, queue_index: u32) -> BootstrapResult<vk::Queue>;

    /// Destroy the logical device
    fn destroy_device(&mut self, device: vk::Device);
}
