//! Recording in-memory [`VulkanApi`] for tests
//!
//! Every create/destroy call is appended to a call log shared with
//! [`FakeWindow`], so tests can assert on exact creation and destruction order.

use std::cell::RefCell;
use std::ffi::c_char;
use std::rc::Rc;

use ash::vk::{self, Handle};

use super::{DeviceDescriptor, InstanceDescriptor, MessengerDescriptor, MessengerEntryPoints, VulkanApi};
use crate::error::{BootstrapError, BootstrapResult};
use crate::window::{WindowError, WindowResult, WindowSurfaceProvider};

pub(crate) const INSTANCE: u64 = 0x1;
pub(crate) const SURFACE: u64 = 0x2;
pub(crate) const MESSENGER: u64 = 0x3;
pub(crate) const DEVICE: u64 = 0x4;

/// Calls that create or destroy something
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ApiCall {
    CreateInstance,
    DestroyInstance,
    CreateMessenger(vk::DebugUtilsMessengerEXT),
    DestroyMessenger(vk::DebugUtilsMessengerEXT),
    CreateSurface,
    DestroySurface,
    CreateDevice,
    DestroyDevice,
}

type CallLog = Rc<RefCell<Vec<ApiCall>>>;

/// Scripted GPU
#[derive(Clone)]
pub(crate) struct FakeGpu {
    pub properties: vk::PhysicalDeviceProperties,
    pub features: vk::PhysicalDeviceFeatures,
    pub queue_families: Vec<vk::QueueFamilyProperties>,
    pub present_support: Vec<bool>,
}

impl FakeGpu {
    /// GPU with one family that does graphics, compute, transfer and presentation
    pub fn new(name: &str, device_type: vk::PhysicalDeviceType, geometry_shader: bool) -> Self {
        let mut properties = vk::PhysicalDeviceProperties {
            device_type,
            api_version: vk::make_api_version(0, 1, 3, 250),
            ..Default::default()
        };
        properties.limits.max_compute_shared_memory_size = 48 * 1024;
        properties.limits.max_push_constants_size = 256;
        for (slot, byte) in properties.device_name.iter_mut().zip(name.bytes()) {
            *slot = byte as c_char;
        }

        let features = vk::PhysicalDeviceFeatures {
            geometry_shader: vk::Bool32::from(geometry_shader),
            ..Default::default()
        };

        Self {
            properties,
            features,
            queue_families: vec![family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER)],
            present_support: vec![true],
        }
    }

    /// Discrete GPU with geometry shaders
    pub fn discrete(name: &str) -> Self {
        Self::new(name, vk::PhysicalDeviceType::DISCRETE_GPU, true)
    }

    /// Replace the queue families: (flags, can present)
    pub fn with_families(mut self, families: &[(vk::QueueFlags, bool)]) -> Self {
        self.queue_families = families.iter().map(|(flags, _)| family(*flags)).collect();
        self.present_support = families.iter().map(|(_, present)| *present).collect();
        self
    }
}

fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
    vk::QueueFamilyProperties {
        queue_flags: flags,
        queue_count: 1,
        ..Default::default()
    }
}

fn gpu_handle(index: usize) -> vk::PhysicalDevice {
    vk::PhysicalDevice::from_raw(0x100 + index as u64)
}

/// Recording fake of the Vulkan boundary
pub(crate) struct FakeVulkan {
    log: CallLog,
    pub layers: Vec<String>,
    pub extensions: Vec<String>,
    pub gpus: Vec<FakeGpu>,
    pub fail_instance: bool,
    pub fail_device: bool,
    pub fail_queue: bool,
    hidden_entry_points: Vec<String>,
    pub instance_descriptor: Option<InstanceDescriptor>,
    pub device_descriptor: Option<DeviceDescriptor>,
}

impl FakeVulkan {
    /// Host with the validation layer installed and one capable discrete GPU
    pub fn new() -> Self {
        Self {
            log: CallLog::default(),
            layers: vec!["VK_LAYER_KHRONOS_validation".to_string()],
            extensions: vec![
                "VK_KHR_surface".to_string(),
                "VK_KHR_xcb_surface".to_string(),
                "VK_EXT_debug_utils".to_string(),
            ],
            gpus: vec![FakeGpu::discrete("Fake Discrete")],
            fail_instance: false,
            fail_device: false,
            fail_queue: false,
            hidden_entry_points: Vec::new(),
            instance_descriptor: None,
            device_descriptor: None,
        }
    }

    /// Host with the given GPUs
    pub fn with_gpus(gpus: Vec<FakeGpu>) -> Self {
        Self { gpus, ..Self::new() }
    }

    /// Make an entry point unresolvable
    pub fn hide_entry_point(&mut self, name: &str) {
        self.hidden_entry_points.push(name.to_string());
    }

    /// Handle of the GPU at `index`
    pub fn gpu(&self, index: usize) -> vk::PhysicalDevice {
        gpu_handle(index)
    }

    /// Window sharing this fake's call log
    pub fn window(&self) -> FakeWindow {
        FakeWindow {
            log: Rc::clone(&self.log),
            extensions: vec!["VK_KHR_surface".to_string(), "VK_KHR_xcb_surface".to_string()],
            fail_surface: false,
            polls_until_close: 0,
        }
    }

    /// Snapshot of the call log
    pub fn calls(&self) -> Vec<ApiCall> {
        self.log.borrow().clone()
    }

    /// Shared call log, still readable after the fake is moved into a context
    pub fn call_log(&self) -> Rc<RefCell<Vec<ApiCall>>> {
        Rc::clone(&self.log)
    }

    fn record(&self, call: ApiCall) {
        self.log.borrow_mut().push(call);
    }

    fn find_gpu(&self, device: vk::PhysicalDevice) -> BootstrapResult<&FakeGpu> {
        self.gpus
            .iter()
            .enumerate()
            .find(|(index, _)| gpu_handle(*index) == device)
            .map(|(_, gpu)| gpu)
            .ok_or_else(|| BootstrapError::UnknownFailure(format!("unknown physical device {device:?}")))
    }
}

impl VulkanApi for FakeVulkan {
    type Messenger = FakeMessenger;

    fn instance_extensions(&self) -> BootstrapResult<Vec<String>> {
        Ok(self.extensions.clone())
    }

    fn instance_layers(&self) -> BootstrapResult<Vec<String>> {
        Ok(self.layers.clone())
    }

    fn create_instance(&mut self, descriptor: &InstanceDescriptor) -> BootstrapResult<vk::Instance> {
        self.instance_descriptor = Some(descriptor.clone());
        if self.fail_instance {
            return Err(BootstrapError::InstanceCreationFailed {
                reason: "vkCreateInstance returned ERROR_INCOMPATIBLE_DRIVER".to_string(),
            });
        }
        self.record(ApiCall::CreateInstance);
        Ok(vk::Instance::from_raw(INSTANCE))
    }

    fn destroy_instance(&mut self, _instance: vk::Instance) {
        self.record(ApiCall::DestroyInstance);
    }

    fn resolve_messenger_entry_points(&self, _instance: vk::Instance) -> BootstrapResult<Self::Messenger> {
        for name in super::MESSENGER_ENTRY_POINTS {
            if self.hidden_entry_points.iter().any(|hidden| hidden == name) {
                return Err(BootstrapError::ExtensionEntryPointMissing { name: name.to_string() });
            }
        }
        Ok(FakeMessenger {
            log: Rc::clone(&self.log),
        })
    }

    fn destroy_surface(&mut self, _instance: vk::Instance, _surface: vk::SurfaceKHR) {
        self.record(ApiCall::DestroySurface);
    }

    fn enumerate_physical_devices(&self, _instance: vk::Instance) -> BootstrapResult<Vec<vk::PhysicalDevice>> {
        Ok((0..self.gpus.len()).map(gpu_handle).collect())
    }

    fn physical_device_properties(
        &self,
        _instance: vk::Instance,
        device: vk::PhysicalDevice,
    ) -> BootstrapResult<vk::PhysicalDeviceProperties> {
        Ok(self.find_gpu(device)?.properties)
    }

    fn physical_device_features(
        &self,
        _instance: vk::Instance,
        device: vk::PhysicalDevice,
    ) -> BootstrapResult<vk::PhysicalDeviceFeatures> {
        Ok(self.find_gpu(device)?.features)
    }

    fn queue_family_properties(
        &self,
        _instance: vk::Instance,
        device: vk::PhysicalDevice,
    ) -> BootstrapResult<Vec<vk::QueueFamilyProperties>> {
        Ok(self.find_gpu(device)?.queue_families.clone())
    }

    fn surface_support(
        &self,
        device: vk::PhysicalDevice,
        family_index: u32,
        _surface: vk::SurfaceKHR,
    ) -> BootstrapResult<bool> {
        let gpu = self.find_gpu(device)?;
        Ok(gpu.present_support.get(family_index as usize).copied().unwrap_or(false))
    }

    fn create_device(
        &mut self,
        _instance: vk::Instance,
        _physical_device: vk::PhysicalDevice,
        descriptor: &DeviceDescriptor,
    ) -> BootstrapResult<vk::Device> {
        self.device_descriptor = Some(descriptor.clone());
        if self.fail_device {
            return Err(BootstrapError::DeviceCreationFailed(vk::Result::ERROR_INITIALIZATION_FAILED));
        }
        self.record(ApiCall::CreateDevice);
        Ok(vk::Device::from_raw(DEVICE))
    }

    fn device_queue(&self, _device: vk::Device, family_index: u32, queue_index: u32) -> BootstrapResult<vk::Queue> {
        if self.fail_queue {
            return Err(BootstrapError::UnknownFailure(format!(
                "queue {queue_index} of family {family_index} unavailable"
            )));
        }
        let requested = self.device_descriptor.as_ref().and_then(|descriptor| {
            descriptor
                .queue_requests
                .iter()
                .find(|request| request.family_index == family_index)
        });
        match requested {
            Some(request) if (queue_index as usize) < request.priorities.len() => Ok(vk::Queue::from_raw(
                0x5000 + u64::from(family_index) * 0x10 + u64::from(queue_index),
            )),
            _ => Err(BootstrapError::UnknownFailure(format!(
                "queue {queue_index} of family {family_index} was not requested at device creation"
            ))),
        }
    }

    fn destroy_device(&mut self, _device: vk::Device) {
        self.record(ApiCall::DestroyDevice);
    }
}

/// Entry points handed out by [`FakeVulkan`]
pub(crate) struct FakeMessenger {
    log: CallLog,
}

impl MessengerEntryPoints for FakeMessenger {
    fn create_messenger(&self, _descriptor: &MessengerDescriptor) -> BootstrapResult<vk::DebugUtilsMessengerEXT> {
        let handle = vk::DebugUtilsMessengerEXT::from_raw(MESSENGER);
        self.log.borrow_mut().push(ApiCall::CreateMessenger(handle));
        Ok(handle)
    }

    fn destroy_messenger(&self, messenger: vk::DebugUtilsMessengerEXT) {
        self.log.borrow_mut().push(ApiCall::DestroyMessenger(messenger));
    }
}

/// Window that records surface creation into the shared call log
pub(crate) struct FakeWindow {
    log: CallLog,
    pub extensions: Vec<String>,
    pub fail_surface: bool,
    pub polls_until_close: usize,
}

impl WindowSurfaceProvider for FakeWindow {
    fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        Ok(self.extensions.clone())
    }

    fn create_surface(&mut self, _instance: vk::Instance) -> WindowResult<vk::SurfaceKHR> {
        if self.fail_surface {
            return Err(WindowError::SurfaceRejected(vk::Result::ERROR_NATIVE_WINDOW_IN_USE_KHR));
        }
        self.log.borrow_mut().push(ApiCall::CreateSurface);
        Ok(vk::SurfaceKHR::from_raw(SURFACE))
    }

    fn poll_events(&mut self) {
        self.polls_until_close = self.polls_until_close.saturating_sub(1);
    }

    fn should_close(&self) -> bool {
        self.polls_until_close == 0
    }
}
