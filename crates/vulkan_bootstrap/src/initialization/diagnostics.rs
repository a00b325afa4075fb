//! Validation and debug diagnostics
//!
//! The driver calls [`diagnostics_callback`] synchronously, on whatever thread
//! made the API call that triggered the event. The callback converts the raw
//! callback data into a [`DiagnosticEvent`] and hands it to a
//! [`DiagnosticSink`]. It never unwinds into the driver and always tells the
//! driver not to abort the triggering call.

use std::ffi::{c_char, c_void, CStr};
use std::fmt;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};

use ash::vk;
use serde::{Deserialize, Serialize};

use crate::backend::{MessengerDescriptor, MessengerEntryPoints, VulkanApi};
use crate::error::BootstrapResult;

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Diagnostic chatter from loader, layers and driver
    Verbose,
    /// Informational message
    Info,
    /// Likely application bug or questionable usage
    Warning,
    /// Invalid usage
    Error,
}

impl Severity {
    /// Classify a severity bit set, highest severity wins
    pub fn from_vk(flags: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            Self::Error
        } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            Self::Warning
        } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            Self::Info
        } else {
            Self::Verbose
        }
    }

    /// Single Vulkan flag for this severity
    pub fn to_vk(self) -> vk::DebugUtilsMessageSeverityFlagsEXT {
        match self {
            Self::Verbose => vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
            Self::Info => vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
            Self::Warning => vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
            Self::Error => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Verbose => "VERBOSE",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        };
        f.write_str(tag)
    }
}

/// Event category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Not tied to the specification or performance
    General,
    /// Specification violation
    Validation,
    /// Potentially non-optimal use of the API
    Performance,
}

impl Category {
    /// Classify a type bit set; validation outranks performance outranks general
    pub fn from_vk(flags: vk::DebugUtilsMessageTypeFlagsEXT) -> Self {
        if flags.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
            Self::Validation
        } else if flags.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
            Self::Performance
        } else {
            Self::General
        }
    }

    /// Single Vulkan flag for this category
    pub fn to_vk(self) -> vk::DebugUtilsMessageTypeFlagsEXT {
        match self {
            Self::General => vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
            Self::Validation => vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
            Self::Performance => vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::General => "GENERAL",
            Self::Validation => "VALIDATION",
            Self::Performance => "PERFORMANCE",
        };
        f.write_str(tag)
    }
}

/// Vulkan object named in an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    /// Object type
    pub object_type: vk::ObjectType,
    /// Opaque handle value
    pub handle: u64,
    /// Debug name, if the application assigned one
    pub name: Option<String>,
}

/// One validation or debug message from the driver
///
/// Objects and labels keep the order the driver supplied them in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEvent {
    /// Severity
    pub severity: Severity,
    /// Category
    pub category: Category,
    /// Message identifier, e.g. a VUID
    pub message_id_name: Option<String>,
    /// Numeric message identifier
    pub message_id_number: i32,
    /// Human-readable message
    pub message: String,
    /// Objects related to the event
    pub objects: Vec<ObjectRef>,
    /// Labels of the command buffers in flight
    pub command_buffer_labels: Vec<String>,
    /// Labels of the queues in flight
    pub queue_labels: Vec<String>,
}

impl DiagnosticEvent {
    /// Copy the driver's callback data into an owned event
    ///
    /// # Safety
    /// Every pointer in `data` must be null or valid for the counts it is paired with,
    /// as the driver guarantees for the duration of the callback.
    pub unsafe fn from_raw(
        severity: vk::DebugUtilsMessageSeverityFlagsEXT,
        category: vk::DebugUtilsMessageTypeFlagsEXT,
        data: &vk::DebugUtilsMessengerCallbackDataEXT,
    ) -> Self {
        let objects = raw_slice(data.p_objects, data.object_count)
            .iter()
            .map(|object| ObjectRef {
                object_type: object.object_type,
                handle: object.object_handle,
                name: lossy_string(object.p_object_name),
            })
            .collect();

        let label_text = |label: &vk::DebugUtilsLabelEXT| lossy_string(label.p_label_name).unwrap_or_default();

        Self {
            severity: Severity::from_vk(severity),
            category: Category::from_vk(category),
            message_id_name: lossy_string(data.p_message_id_name),
            message_id_number: data.message_id_number,
            message: lossy_string(data.p_message).unwrap_or_default(),
            objects,
            command_buffer_labels: raw_slice(data.p_cmd_buf_labels, data.cmd_buf_label_count)
                .iter()
                .map(label_text)
                .collect(),
            queue_labels: raw_slice(data.p_queue_labels, data.queue_label_count)
                .iter()
                .map(label_text)
                .collect(),
        }
    }
}

unsafe fn raw_slice<'a, T>(ptr: *const T, count: u32) -> &'a [T] {
    if ptr.is_null() || count == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, count as usize)
    }
}

unsafe fn lossy_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] [{}] ", self.severity, self.category)?;
        if let Some(id_name) = &self.message_id_name {
            write!(f, "{} ({}): ", id_name, self.message_id_number)?;
        }
        f.write_str(&self.message)?;

        if !self.objects.is_empty() {
            write!(f, "\n    Objects: {}", self.objects.len())?;
            for (index, object) in self.objects.iter().enumerate() {
                write!(
                    f,
                    "\n        #{} handle=0x{:x}, type={:?}",
                    index, object.handle, object.object_type
                )?;
                if let Some(name) = &object.name {
                    write!(f, ", name={name}")?;
                }
            }
        }

        write_labels(f, "Command buffer labels", &self.command_buffer_labels)?;
        write_labels(f, "Queue labels", &self.queue_labels)
    }
}

fn write_labels(f: &mut fmt::Formatter<'_>, heading: &str, labels: &[String]) -> fmt::Result {
    if labels.is_empty() {
        return Ok(());
    }
    write!(f, "\n    {}: {}", heading, labels.len())?;
    for (index, label) in labels.iter().enumerate() {
        write!(f, "\n        #{index} {label}")?;
    }
    Ok(())
}

/// Receiver of diagnostic events
///
/// Called from inside arbitrary Vulkan calls. Implementations must not call
/// back into instance or device creation or destruction.
pub trait DiagnosticSink {
    /// Handle one event
    fn report(&self, event: &DiagnosticEvent);
}

/// Writes each formatted event to the process error stream
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn report(&self, event: &DiagnosticEvent) {
        let _ = writeln!(std::io::stderr().lock(), "{event}");
    }
}

/// Routes events to the `log` facade by severity
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, event: &DiagnosticEvent) {
        match event.severity {
            Severity::Error => log::error!(target: "vulkan", "{event}"),
            Severity::Warning => log::warn!(target: "vulkan", "{event}"),
            Severity::Info => log::info!(target: "vulkan", "{event}"),
            Severity::Verbose => log::debug!(target: "vulkan", "{event}"),
        }
    }
}

/// Built-in sink selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// [`StderrSink`]
    #[default]
    Stderr,
    /// [`LogSink`]
    Log,
}

impl SinkKind {
    /// Instantiate the selected sink
    pub fn into_sink(self) -> Box<dyn DiagnosticSink> {
        match self {
            Self::Stderr => Box::new(StderrSink),
            Self::Log => Box::new(LogSink),
        }
    }
}

/// Heap home of the sink the driver's user-data pointer refers to
///
/// Must stay at a fixed address until the instance is destroyed.
pub struct SinkSlot {
    sink: Box<dyn DiagnosticSink>,
}

impl SinkSlot {
    /// Box a sink so its address is stable
    pub fn new(sink: Box<dyn DiagnosticSink>) -> Box<Self> {
        Box::new(Self { sink })
    }

    /// Pointer handed to the driver as callback user data
    pub fn handle(&self) -> SinkHandle {
        SinkHandle(self as *const Self)
    }

    fn report(&self, event: &DiagnosticEvent) {
        self.sink.report(event);
    }
}

/// Address of a [`SinkSlot`], passed through the driver as user data
#[derive(Debug, Clone, Copy)]
pub struct SinkHandle(*const SinkSlot);

impl SinkHandle {
    /// Raw user-data pointer
    pub fn as_user_data(self) -> *mut c_void {
        self.0.cast_mut().cast()
    }
}

/// `PFN_vkDebugUtilsMessengerCallbackEXT` forwarding to a [`SinkSlot`]
///
/// # Safety
/// `user_data` must be null or point to a live [`SinkSlot`]; `data` must be
/// null or valid callback data.
pub unsafe extern "system" fn diagnostics_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    user_data: *mut c_void,
) -> vk::Bool32 {
    let _ = panic::catch_unwind(AssertUnwindSafe(|| {
        let Some(data) = callback_data.as_ref() else {
            return;
        };
        let event = DiagnosticEvent::from_raw(message_severity, message_type, data);

        match user_data.cast::<SinkSlot>().cast_const().as_ref() {
            Some(slot) => slot.report(&event),
            None => LogSink.report(&event),
        }
    }));

    vk::FALSE
}

/// Registered debug messenger
///
/// Owns the entry points it was created with, so it can always destroy itself.
pub struct DiagnosticsMessenger<M: MessengerEntryPoints> {
    entry_points: M,
    handle: vk::DebugUtilsMessengerEXT,
}

impl<M: MessengerEntryPoints> DiagnosticsMessenger<M> {
    /// Resolve the messenger entry points on `instance` and register a messenger
    pub fn install<A>(api: &A, instance: vk::Instance, descriptor: &MessengerDescriptor) -> BootstrapResult<Self>
    where
        A: VulkanApi<Messenger = M>,
    {
        let entry_points = api.resolve_messenger_entry_points(instance)?;
        let handle = entry_points.create_messenger(descriptor)?;
        log::debug!(
            "Debug messenger installed (severities {:?}, categories {:?})",
            descriptor.severities,
            descriptor.categories
        );

        Ok(Self { entry_points, handle })
    }

    /// Messenger handle
    pub fn handle(&self) -> vk::DebugUtilsMessengerEXT {
        self.handle
    }

    /// Unregister the messenger
    pub fn destroy(self) {
        self.entry_points.destroy_messenger(self.handle);
    }
}
