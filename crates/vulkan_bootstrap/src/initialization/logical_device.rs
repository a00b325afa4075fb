//! Logical device creation

use ash::vk;

use crate::backend::{DeviceDescriptor, QueueRequest, VulkanApi};
use crate::error::{BootstrapError, BootstrapResult};
use crate::initialization::queue_family::QueueFamilyIndices;

/// Logical device plus the queues fetched from it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalDevice {
    /// Logical device handle
    pub device: vk::Device,
    /// Graphics operations queue
    pub graphics_queue: vk::Queue,
    /// Surface presentation queue
    pub present_queue: vk::Queue,
    /// Index of the graphics queue family
    pub graphics_family: u32,
    /// Index of the presentation queue family
    pub present_family: u32,
}

/// Descriptor requesting one queue at priority 1.0 from each distinct family
/// among graphics and presentation, graphics first
pub fn device_descriptor(indices: &QueueFamilyIndices, extensions: &[String]) -> BootstrapResult<DeviceDescriptor> {
    let graphics_family = indices.graphics.ok_or(BootstrapError::MissingGraphicsQueueFamily)?;
    let present_family = indices
        .presentation
        .ok_or(BootstrapError::MissingPresentationQueueFamily)?;

    let mut families = vec![graphics_family];
    if present_family != graphics_family {
        families.push(present_family);
    }

    Ok(DeviceDescriptor {
        queue_requests: families
            .into_iter()
            .map(|family_index| QueueRequest {
                family_index,
                priorities: vec![1.0],
            })
            .collect(),
        extensions: extensions.to_vec(),
        features: vk::PhysicalDeviceFeatures::default(),
    })
}

/// Create the logical device and fetch its graphics and presentation queues
///
/// If fetching a queue fails the device is destroyed before returning.
pub fn create_logical_device<A: VulkanApi>(
    api: &mut A,
    instance: vk::Instance,
    physical_device: vk::PhysicalDevice,
    indices: &QueueFamilyIndices,
    extensions: &[String],
) -> BootstrapResult<LogicalDevice> {
    let descriptor = device_descriptor(indices, extensions)?;
    let graphics_family = descriptor.queue_requests[0].family_index;
    let present_family = descriptor
        .queue_requests
        .last()
        .map_or(graphics_family, |request| request.family_index);

    let device = api.create_device(instance, physical_device, &descriptor)?;

    let queues = api
        .device_queue(device, graphics_family, 0)
        .and_then(|graphics| Ok((graphics, api.device_queue(device, present_family, 0)?)));

    match queues {
        Ok((graphics_queue, present_queue)) => {
            log::debug!(
                "Logical device created: graphics family {graphics_family}, present family {present_family}"
            );
            Ok(LogicalDevice {
                device,
                graphics_queue,
                present_queue,
                graphics_family,
                present_family,
            })
        }
        Err(e) => {
            api.destroy_device(device);
            Err(e)
        }
    }
}
