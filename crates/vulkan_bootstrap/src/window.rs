//! Window management using GLFW
//!
//! The bootstrap only needs two things from a window: the instance extensions
//! the platform requires for presentation, and a surface bound to the native
//! window. [`WindowSurfaceProvider`] is that boundary; [`GlfwWindow`] is the
//! production implementation.

use ash::vk;
use thiserror::Error;

use crate::config::WindowConfig;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// `glfwInit` failed
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// `glfwCreateWindow` returned no window
    #[error("Window creation failed")]
    CreationFailed,

    /// GLFW cannot report Vulkan instance extensions on this platform
    #[error("Vulkan is not supported by the windowing layer")]
    VulkanUnsupported,

    /// The platform rejected surface creation for this window
    #[error("Surface creation rejected: {0:?}")]
    SurfaceRejected(vk::Result),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// Native window that can host a Vulkan surface
///
/// Construction creates the native window and dropping the implementor
/// destroys it.
pub trait WindowSurfaceProvider {
    /// Instance extensions the platform needs to create a surface for this window
    fn required_instance_extensions(&self) -> WindowResult<Vec<String>>;

    /// Create a presentable surface bound to this window
    fn create_surface(&mut self, instance: vk::Instance) -> WindowResult<vk::SurfaceKHR>;

    /// Process pending window system events
    fn poll_events(&mut self);

    /// Whether the user or the application asked the window to close
    fn should_close(&self) -> bool;
}

/// GLFW window configured for Vulkan (no client API)
pub struct GlfwWindow {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl GlfwWindow {
    /// Initialize GLFW and open a window
    pub fn new(config: &WindowConfig) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors).map_err(|_| WindowError::InitializationFailed)?;

        // Configure for Vulkan (no OpenGL context)
        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(config.resizable));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);

        log::debug!("Created {}x{} window \"{}\"", config.width, config.height, config.title);

        Ok(Self { glfw, window, events })
    }

    /// Request (or cancel a request) that the window close
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    /// Drain events gathered by the last poll, closing on Escape
    fn handle_events(&mut self) {
        let mut close_requested = false;
        for (_, event) in glfw::flush_messages(&self.events) {
            log::trace!("{:?}", event);
            if let glfw::WindowEvent::Key(glfw::Key::Escape, _, glfw::Action::Press, _) = event {
                close_requested = true;
            }
        }
        if close_requested {
            self.set_should_close(true);
        }
    }
}

impl WindowSurfaceProvider for GlfwWindow {
    fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or(WindowError::VulkanUnsupported)
    }

    fn create_surface(&mut self, instance: vk::Instance) -> WindowResult<vk::SurfaceKHR> {
        let mut surface = vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::SurfaceRejected(result))
        }
    }

    fn poll_events(&mut self) {
        self.glfw.poll_events();
        self.handle_events();
    }

    fn should_close(&self) -> bool {
        self.window.should_close()
    }
}
