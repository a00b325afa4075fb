//! Vulkan context bootstrap and teardown
//!
//! Stages run strictly in order:
//! instance → diagnostics messenger → surface → physical device → logical device.
//! Every created resource is pushed onto a [`ResourceStack`]; if any stage fails
//! the stack is dropped and releases what exists in reverse creation order.
//! Teardown of a ready context follows the same path:
//! device → surface → messenger → instance.

use ash::vk;

use crate::backend::{MessengerDescriptor, VulkanApi};
use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, BootstrapResult};
use crate::initialization::diagnostics::{DiagnosticSink, DiagnosticsMessenger, SinkSlot};
use crate::initialization::instance::{InstanceBuilder, InstanceDiagnostics};
use crate::initialization::logical_device::{create_logical_device, LogicalDevice};
use crate::initialization::physical_device::{select_physical_device, PhysicalDeviceInfo};
use crate::initialization::queue_family::{resolve_queue_families, QueueFamilyIndices};
use crate::initialization::surface::{create_surface, destroy_surface};
use crate::window::WindowSurfaceProvider;

/// Bootstrap progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootstrapState {
    /// Nothing created yet
    Uninitialized,
    /// Instance exists
    InstanceCreated,
    /// Debug messenger registered (or diagnostics disabled)
    DiagnosticsInstalled,
    /// Surface bound to the window
    SurfaceBound,
    /// GPU chosen
    PhysicalDeviceSelected,
    /// Logical device and queues exist
    LogicalDeviceCreated,
    /// Context handed to the caller
    Ready,
    /// Everything released
    TornDown,
}

/// Owned Vulkan resources, released in reverse creation order
struct ResourceStack<A: VulkanApi> {
    api: A,
    state: BootstrapState,
    instance: Option<vk::Instance>,
    messenger: Option<DiagnosticsMessenger<A::Messenger>>,
    surface: Option<vk::SurfaceKHR>,
    device: Option<vk::Device>,
    // Referenced by the driver until the instance is gone
    sink: Option<Box<SinkSlot>>,
}

impl<A: VulkanApi> ResourceStack<A> {
    fn new(api: A) -> Self {
        Self {
            api,
            state: BootstrapState::Uninitialized,
            instance: None,
            messenger: None,
            surface: None,
            device: None,
            sink: None,
        }
    }

    fn advance(&mut self, next: BootstrapState) {
        log::debug!("Bootstrap: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn release(&mut self) {
        if let Some(device) = self.device.take() {
            self.api.destroy_device(device);
        }

        if let Some(instance) = self.instance.take() {
            if let Some(surface) = self.surface.take() {
                destroy_surface(&mut self.api, instance, surface);
            }
            if let Some(messenger) = self.messenger.take() {
                messenger.destroy();
            }
            self.api.destroy_instance(instance);
        }

        self.sink = None;
        if self.state != BootstrapState::TornDown {
            self.advance(BootstrapState::TornDown);
        }
    }
}

impl<A: VulkanApi> Drop for ResourceStack<A> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Ready Vulkan context: instance, diagnostics, surface, device and queues
///
/// Dropping the context tears it down; [`GraphicsContext::teardown`] does the
/// same explicitly.
pub struct GraphicsContext<A: VulkanApi> {
    resources: ResourceStack<A>,
    instance: vk::Instance,
    surface: vk::SurfaceKHR,
    physical_device: PhysicalDeviceInfo,
    queue_families: QueueFamilyIndices,
    device: LogicalDevice,
}

impl<A: VulkanApi> GraphicsContext<A> {
    /// Bootstrap with the sink named in the configuration
    pub fn bootstrap<W>(api: A, window: &mut W, config: &BootstrapConfig) -> BootstrapResult<Self>
    where
        W: WindowSurfaceProvider + ?Sized,
    {
        Self::bootstrap_with_sink(api, window, config, config.diagnostics.sink.into_sink())
    }

    /// Bootstrap, forwarding diagnostic events to `sink`
    pub fn bootstrap_with_sink<W>(
        api: A,
        window: &mut W,
        config: &BootstrapConfig,
        sink: Box<dyn DiagnosticSink>,
    ) -> BootstrapResult<Self>
    where
        W: WindowSurfaceProvider + ?Sized,
    {
        let mut resources = ResourceStack::new(api);

        match Self::run_stages(&mut resources, window, config, sink) {
            Ok((instance, surface, physical_device, queue_families, device)) => {
                resources.advance(BootstrapState::Ready);
                Ok(Self {
                    resources,
                    instance,
                    surface,
                    physical_device,
                    queue_families,
                    device,
                })
            }
            Err(e) => {
                log::error!("Bootstrap failed after {:?}: {}", resources.state, e);
                Err(e)
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn run_stages<W>(
        resources: &mut ResourceStack<A>,
        window: &mut W,
        config: &BootstrapConfig,
        sink: Box<dyn DiagnosticSink>,
    ) -> BootstrapResult<(
        vk::Instance,
        vk::SurfaceKHR,
        PhysicalDeviceInfo,
        QueueFamilyIndices,
        LogicalDevice,
    )>
    where
        W: WindowSurfaceProvider + ?Sized,
    {
        config.diagnostics.validate()?;

        let window_extensions = window
            .required_instance_extensions()
            .map_err(BootstrapError::WindowCreationFailed)?;

        let messenger_descriptor = if config.diagnostics.enabled {
            let slot = SinkSlot::new(sink);
            let descriptor = MessengerDescriptor {
                severities: config.diagnostics.severity_mask(),
                categories: config.diagnostics.category_mask(),
                sink: slot.handle(),
            };
            resources.sink = Some(slot);
            Some(descriptor)
        } else {
            None
        };

        let instance = InstanceBuilder::new(config.app_name.clone())
            .app_version(config.app_version)
            .api_version(config.api_version)
            .window_extensions(window_extensions)
            .diagnostics(messenger_descriptor.map(|messenger| InstanceDiagnostics {
                layer: config.diagnostics.validation_layer.clone(),
                messenger,
                features: config.diagnostics.validation_features(),
            }))
            .build(&mut resources.api)?;
        resources.instance = Some(instance);
        resources.advance(BootstrapState::InstanceCreated);

        if let Some(descriptor) = &messenger_descriptor {
            let messenger = DiagnosticsMessenger::install(&resources.api, instance, descriptor)?;
            resources.messenger = Some(messenger);
        }
        resources.advance(BootstrapState::DiagnosticsInstalled);

        let surface = create_surface(window, instance)?;
        resources.surface = Some(surface);
        resources.advance(BootstrapState::SurfaceBound);

        let physical_device = select_physical_device(&resources.api, instance, &config.device)?;
        resources.advance(BootstrapState::PhysicalDeviceSelected);

        let queue_families = resolve_queue_families(
            &resources.api,
            instance,
            physical_device.device,
            surface,
            config.device.presentation_probe,
        )?;

        let device = create_logical_device(
            &mut resources.api,
            instance,
            physical_device.device,
            &queue_families,
            &config.device.extensions,
        )?;
        resources.device = Some(device.device);
        resources.advance(BootstrapState::LogicalDeviceCreated);

        Ok((instance, surface, physical_device, queue_families, device))
    }

    /// Destroy everything in reverse creation order
    pub fn teardown(mut self) {
        self.resources.release();
    }

    /// Current lifecycle state
    pub fn state(&self) -> BootstrapState {
        self.resources.state
    }

    /// Backend the context was created with
    pub fn api(&self) -> &A {
        &self.resources.api
    }

    /// Instance handle
    pub fn instance(&self) -> vk::Instance {
        self.instance
    }

    /// Debug messenger handle, if diagnostics are enabled
    pub fn messenger(&self) -> Option<vk::DebugUtilsMessengerEXT> {
        self.resources.messenger.as_ref().map(DiagnosticsMessenger::handle)
    }

    /// Surface handle
    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Selected GPU
    pub fn physical_device(&self) -> &PhysicalDeviceInfo {
        &self.physical_device
    }

    /// Queue families resolved on the selected GPU
    pub fn queue_families(&self) -> QueueFamilyIndices {
        self.queue_families
    }

    /// Logical device and queue handles
    pub fn device(&self) -> &LogicalDevice {
        &self.device
    }

    /// Graphics queue
    pub fn graphics_queue(&self) -> vk::Queue {
        self.device.graphics_queue
    }

    /// Presentation queue
    pub fn present_queue(&self) -> vk::Queue {
        self.device.present_queue
    }
}
