// Vulkan initialization components

pub mod context;
pub mod diagnostics;
pub mod instance;
pub mod logical_device;
pub mod physical_device;
pub mod queue_family;
pub mod surface;

pub use context::{BootstrapState, GraphicsContext};
pub use diagnostics::{
    Category, DiagnosticEvent, DiagnosticSink, DiagnosticsMessenger, LogSink, ObjectRef, Severity, SinkKind,
    StderrSink,
};
pub use instance::{InstanceBuilder, InstanceDiagnostics};
pub use logical_device::LogicalDevice;
pub use physical_device::{DeviceKind, DeviceRequirements, PhysicalDeviceInfo};
pub use queue_family::{PresentationProbe, QueueFamilyIndices};
