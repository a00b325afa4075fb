//! # Vulkan Bootstrap
//!
//! Brings a Vulkan context from nothing to "device and queues ready":
//! instance with validation, debug messenger, window surface, GPU selection,
//! queue family discovery, logical device and queues.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vulkan_bootstrap::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BootstrapConfig::default();
//!     let mut window = GlfwWindow::new(&config.window)?;
//!     let context = GraphicsContext::bootstrap(AshBackend::load()?, &mut window, &config)?;
//!
//!     while !window.should_close() {
//!         window.poll_events();
//!     }
//!
//!     context.teardown();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names)]

pub mod backend;
pub mod config;
pub mod error;
pub mod initialization;
pub mod window;

pub use error::{BootstrapError, BootstrapResult};
pub use initialization::{BootstrapState, GraphicsContext};

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        backend::{AshBackend, VulkanApi},
        config::{BootstrapConfig, Config},
        error::{BootstrapError, BootstrapResult},
        initialization::{DiagnosticEvent, DiagnosticSink, GraphicsContext, LogSink, StderrSink},
        window::{GlfwWindow, WindowSurfaceProvider},
    };
}
