//! [`VulkanApi`] on top of `ash`
//!
//! The loader is opened at runtime. Function tables for the instance, the
//! surface extension and the device are kept here and looked up by handle.

use std::ffi::{c_char, CStr, CString};

use ash::extensions::{ext::DebugUtils, khr};
use ash::{vk, Device, Entry, Instance};

use super::{
    DeviceDescriptor, InstanceDescriptor, MessengerDescriptor, MessengerEntryPoints, VulkanApi,
    MESSENGER_ENTRY_POINTS,
};
use crate::error::{BootstrapError, BootstrapResult};
use crate::initialization::diagnostics::diagnostics_callback;

/// Production Vulkan backend
pub struct AshBackend {
    entry: Entry,
    instance: Option<Instance>,
    surface_loader: Option<khr::Surface>,
    device: Option<Device>,
}

impl AshBackend {
    /// Load the system Vulkan loader
    pub fn load() -> BootstrapResult<Self> {
        let entry = unsafe { Entry::load() }.map_err(|e| BootstrapError::InstanceCreationFailed {
            reason: format!("Failed to load Vulkan: {e}"),
        })?;

        Ok(Self {
            entry,
            instance: None,
            surface_loader: None,
            device: None,
        })
    }

    fn instance_fns(&self, handle: vk::Instance) -> BootstrapResult<&Instance> {
        self.instance
            .as_ref()
            .filter(|instance| instance.handle() == handle)
            .ok_or_else(|| BootstrapError::UnknownFailure(format!("Unknown instance {handle:?}")))
    }

    fn surface_fns(&self) -> BootstrapResult<&khr::Surface> {
        self.surface_loader
            .as_ref()
            .ok_or_else(|| BootstrapError::UnknownFailure("Surface loader used before instance creation".to_string()))
    }

    fn device_fns(&self, handle: vk::Device) -> BootstrapResult<&Device> {
        self.device
            .as_ref()
            .filter(|device| device.handle() == handle)
            .ok_or_else(|| BootstrapError::UnknownFailure(format!("Unknown device {handle:?}")))
    }
}

fn to_cstrings(names: &[String]) -> Result<Vec<CString>, std::ffi::NulError> {
    names.iter().map(|name| CString::new(name.as_str())).collect()
}

fn name_from_bytes(raw: &[c_char]) -> String {
    unsafe { CStr::from_ptr(raw.as_ptr()) }.to_string_lossy().into_owned()
}

fn messenger_create_info(descriptor: &MessengerDescriptor) -> vk::DebugUtilsMessengerCreateInfoEXT {
    vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(descriptor.severities)
        .message_type(descriptor.categories)
        .pfn_user_callback(Some(diagnostics_callback))
        .user_data(descriptor.sink.as_user_data())
        .build()
}

impl VulkanApi for AshBackend {
    type Messenger = AshMessenger;

    fn instance_extensions(&self) -> BootstrapResult<Vec<String>> {
        let properties = self
            .entry
            .enumerate_instance_extension_properties(None)
            .map_err(|e| BootstrapError::api("vkEnumerateInstanceExtensionProperties", e))?;

        Ok(properties
            .iter()
            .map(|property| name_from_bytes(&property.extension_name))
            .collect())
    }

    fn instance_layers(&self) -> BootstrapResult<Vec<String>> {
        let properties = self
            .entry
            .enumerate_instance_layer_properties()
            .map_err(|e| BootstrapError::api("vkEnumerateInstanceLayerProperties", e))?;

        Ok(properties
            .iter()
            .map(|property| name_from_bytes(&property.layer_name))
            .collect())
    }

    fn create_instance(&mut self, descriptor: &InstanceDescriptor) -> BootstrapResult<vk::Instance> {
        let invalid_name = |e: std::ffi::NulError| BootstrapError::InstanceCreationFailed {
            reason: format!("Invalid name: {e}"),
        };

        let app_name = CString::new(descriptor.app_name.as_str()).map_err(invalid_name)?;
        let engine_name = CString::new(env!("CARGO_PKG_NAME")).map_err(invalid_name)?;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(descriptor.app_version)
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(descriptor.api_version);

        let layers = to_cstrings(&descriptor.layers).map_err(invalid_name)?;
        let layer_ptrs: Vec<*const c_char> = layers.iter().map(|name| name.as_ptr()).collect();
        let extensions = to_cstrings(&descriptor.extensions).map_err(invalid_name)?;
        let extension_ptrs: Vec<*const c_char> = extensions.iter().map(|name| name.as_ptr()).collect();

        let mut messenger_info = descriptor.diagnostics.as_ref().map(messenger_create_info);
        let mut validation_features =
            vk::ValidationFeaturesEXT::builder().enabled_validation_features(&descriptor.validation_features);

        let mut create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&extension_ptrs);

        if let Some(info) = messenger_info.as_mut() {
            create_info = create_info.push_next(info);
        }
        if !descriptor.validation_features.is_empty() {
            create_info = create_info.push_next(&mut validation_features);
        }

        let instance = unsafe { self.entry.create_instance(&create_info, None) }.map_err(|e| {
            BootstrapError::InstanceCreationFailed {
                reason: format!("vkCreateInstance returned {e:?}"),
            }
        })?;

        let handle = instance.handle();
        self.surface_loader = Some(khr::Surface::new(&self.entry, &instance));
        self.instance = Some(instance);
        Ok(handle)
    }

    fn destroy_instance(&mut self, instance: vk::Instance) {
        match self.instance.take() {
            Some(fns) if fns.handle() == instance => {
                self.surface_loader = None;
                unsafe { fns.destroy_instance(None) };
            }
            other => {
                log::error!("destroy_instance called with unknown handle {:?}", instance);
                self.instance = other;
            }
        }
    }

    fn resolve_messenger_entry_points(&self, instance: vk::Instance) -> BootstrapResult<Self::Messenger> {
        let fns = self.instance_fns(instance)?;

        for name in MESSENGER_ENTRY_POINTS {
            let missing = || BootstrapError::ExtensionEntryPointMissing { name: name.to_string() };
            let c_name = CString::new(name).map_err(|_| missing())?;
            let address = unsafe { self.entry.get_instance_proc_addr(instance, c_name.as_ptr()) };
            if address.is_none() {
                return Err(missing());
            }
        }

        Ok(AshMessenger {
            debug_utils: DebugUtils::new(&self.entry, fns),
        })
    }

    fn destroy_surface(&mut self, _instance: vk::Instance, surface: vk::SurfaceKHR) {
        match &self.surface_loader {
            Some(loader) => unsafe { loader.destroy_surface(surface, None) },
            None => log::error!("destroy_surface called after instance destruction"),
        }
    }

    fn enumerate_physical_devices(&self, instance: vk::Instance) -> BootstrapResult<Vec<vk::PhysicalDevice>> {
        let fns = self.instance_fns(instance)?;
        unsafe { fns.enumerate_physical_devices() }.map_err(|e| BootstrapError::api("vkEnumeratePhysicalDevices", e))
    }

    fn physical_device_properties(
        &self,
        instance: vk::Instance,
        device: vk::PhysicalDevice,
    ) -> BootstrapResult<vk::PhysicalDeviceProperties> {
        let fns = self.instance_fns(instance)?;
        Ok(unsafe { fns.get_physical_device_properties(device) })
    }

    fn physical_device_features(
        &self,
        instance: vk::Instance,
        device: vk::PhysicalDevice,
    ) -> BootstrapResult<vk::PhysicalDeviceFeatures> {
        let fns = self.instance_fns(instance)?;
        Ok(unsafe { fns.get_physical_device_features(device) })
    }

    fn queue_family_properties(
        &self,
        instance: vk::Instance,
        device: vk::PhysicalDevice,
    ) -> BootstrapResult<Vec<vk::QueueFamilyProperties>> {
        let fns = self.instance_fns(instance)?;
        Ok(unsafe { fns.get_physical_device_queue_family_properties(device) })
    }

    fn surface_support(
        &self,
        device: vk::PhysicalDevice,
        family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> BootstrapResult<bool> {
        let loader = self.surface_fns()?;
        unsafe { loader.get_physical_device_surface_support(device, family_index, surface) }
            .map_err(|e| BootstrapError::api("vkGetPhysicalDeviceSurfaceSupportKHR", e))
    }

    fn create_device(
        &mut self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        descriptor: &DeviceDescriptor,
    ) -> BootstrapResult<vk::Device> {
        let fns = self.instance_fns(instance)?;

        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = descriptor
            .queue_requests
            .iter()
            .map(|request| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(request.family_index)
                    .queue_priorities(&request.priorities)
                    .build()
            })
            .collect();

        let extensions = to_cstrings(&descriptor.extensions)
            .map_err(|_| BootstrapError::DeviceCreationFailed(vk::Result::ERROR_EXTENSION_NOT_PRESENT))?;
        let extension_ptrs: Vec<*const c_char> = extensions.iter().map(|name| name.as_ptr()).collect();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_ptrs)
            .enabled_features(&descriptor.features);

        let device = unsafe { fns.create_device(physical_device, &create_info, None) }
            .map_err(BootstrapError::DeviceCreationFailed)?;

        let handle = device.handle();
        self.device = Some(device);
        Ok(handle)
    }

    fn device_queue(&self, device: vk::Device, family_index: u32, queue_index: u32) -> BootstrapResult<vk::Queue> {
        let fns = self.device_fns(device)?;
        Ok(unsafe { fns.get_device_queue(family_index, queue_index) })
    }

    fn destroy_device(&mut self, device: vk::Device) {
        match self.device.take() {
            Some(fns) if fns.handle() == device => unsafe {
                // Ensure device is idle before destruction
                let _ = fns.device_wait_idle();
                fns.destroy_device(None);
            },
            other => {
                log::error!("destroy_device called with unknown handle {:?}", device);
                self.device = other;
            }
        }
    }
}

/// `VK_EXT_debug_utils` entry points resolved from a live instance
pub struct AshMessenger {
    debug_utils: DebugUtils,
}

impl MessengerEntryPoints for AshMessenger {
    fn create_messenger(&self, descriptor: &MessengerDescriptor) -> BootstrapResult<vk::DebugUtilsMessengerEXT> {
        let create_info = messenger_create_info(descriptor);
        unsafe { self.debug_utils.create_debug_utils_messenger(&create_info, None) }
            .map_err(|e| BootstrapError::api("vkCreateDebugUtilsMessengerEXT", e))
    }

    fn destroy_messenger(&self, messenger: vk::DebugUtilsMessengerEXT) {
        unsafe { self.debug_utils.destroy_debug_utils_messenger(messenger, None) };
    }
}
