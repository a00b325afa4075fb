//! Physical device selection
//!
//! Devices are tried in the order the driver enumerates them. The first one
//! that satisfies [`DeviceRequirements`] wins; there is no scoring and no
//! fallback to a weaker device type.

use std::ffi::CStr;

use ash::vk;
use serde::{Deserialize, Serialize};

use crate::backend::VulkanApi;
use crate::config::Version;
use crate::error::{BootstrapError, BootstrapResult};
use crate::initialization::queue_family::PresentationProbe;

/// GPU kind, mirroring `VkPhysicalDeviceType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Dedicated GPU
    DiscreteGpu,
    /// GPU sharing memory with the host
    IntegratedGpu,
    /// GPU exposed through virtualization
    VirtualGpu,
    /// Software rasterizer
    Cpu,
    /// Anything else
    Other,
}

impl DeviceKind {
    /// Vulkan device type
    pub fn to_vk(self) -> vk::PhysicalDeviceType {
        match self {
            Self::DiscreteGpu => vk::PhysicalDeviceType::DISCRETE_GPU,
            Self::IntegratedGpu => vk::PhysicalDeviceType::INTEGRATED_GPU,
            Self::VirtualGpu => vk::PhysicalDeviceType::VIRTUAL_GPU,
            Self::Cpu => vk::PhysicalDeviceType::CPU,
            Self::Other => vk::PhysicalDeviceType::OTHER,
        }
    }
}

/// What the application needs from a GPU and its logical device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceRequirements {
    /// Required device type
    pub device_type: DeviceKind,
    /// Require the geometry shader feature
    pub require_geometry_shader: bool,
    /// Device extensions enabled on the logical device
    pub extensions: Vec<String>,
    /// Which family index the presentation support query uses
    pub presentation_probe: PresentationProbe,
}

impl Default for DeviceRequirements {
    fn default() -> Self {
        Self {
            device_type: DeviceKind::DiscreteGpu,
            require_geometry_shader: true,
            extensions: Vec::new(),
            presentation_probe: PresentationProbe::GraphicsFamily,
        }
    }
}

impl DeviceRequirements {
    /// Whether a device with these properties and features qualifies
    pub fn is_satisfied_by(
        &self,
        properties: &vk::PhysicalDeviceProperties,
        features: &vk::PhysicalDeviceFeatures,
    ) -> bool {
        properties.device_type == self.device_type.to_vk()
            && (!self.require_geometry_shader || features.geometry_shader == vk::TRUE)
    }
}

/// Selected GPU
///
/// The handle is owned by the instance; nothing here needs destroying.
#[derive(Debug, Clone)]
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle
    pub device: vk::PhysicalDevice,
    /// Position in the driver's enumeration
    pub index: usize,
    /// Device name
    pub name: String,
    /// Device properties and limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Supported device features
    pub features: vk::PhysicalDeviceFeatures,
}

impl PhysicalDeviceInfo {
    /// Vulkan version the driver reports for this device
    pub fn api_version(&self) -> Version {
        Version::from_vk(self.properties.api_version)
    }
}

fn device_name(properties: &vk::PhysicalDeviceProperties) -> String {
    unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

/// Pick the first enumerated GPU that satisfies `requirements`
pub fn select_physical_device<A: VulkanApi>(
    api: &A,
    instance: vk::Instance,
    requirements: &DeviceRequirements,
) -> BootstrapResult<PhysicalDeviceInfo> {
    let devices = api.enumerate_physical_devices(instance)?;
    log::debug!("{} physical device(s) enumerated", devices.len());

    for (index, device) in devices.into_iter().enumerate() {
        let properties = api.physical_device_properties(instance, device)?;
        let features = api.physical_device_features(instance, device)?;
        let name = device_name(&properties);

        if !requirements.is_satisfied_by(&properties, &features) {
            log::debug!("Skipping GPU {index} \"{name}\" ({:?})", properties.device_type);
            continue;
        }

        let info = PhysicalDeviceInfo {
            device,
            index,
            name,
            properties,
            features,
        };
        let limits = &info.properties.limits;
        log::info!("Selected GPU: {}", info.name);
        log::info!("  Vulkan version: {}", info.api_version());
        log::info!(
            "  Max compute shared memory size: {} KB",
            limits.max_compute_shared_memory_size / 1024
        );
        log::info!("  Max push constants size: {} bytes", limits.max_push_constants_size);
        return Ok(info);
    }

    Err(BootstrapError::NoSuitablePhysicalDevice)
}
