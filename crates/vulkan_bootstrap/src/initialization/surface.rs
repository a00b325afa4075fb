//! Vulkan surface management
//!
//! Binds a presentable surface to the native window. The surface is created
//! after the instance and before device selection, and destroyed before the
//! instance.

use ash::vk;

use crate::backend::VulkanApi;
use crate::error::{BootstrapError, BootstrapResult};
use crate::window::WindowSurfaceProvider;

/// Create a surface for `window` on `instance`
pub fn create_surface<W>(window: &mut W, instance: vk::Instance) -> BootstrapResult<vk::SurfaceKHR>
where
    W: WindowSurfaceProvider + ?Sized,
{
    let surface = window
        .create_surface(instance)
        .map_err(BootstrapError::SurfaceCreationFailed)?;
    log::debug!("Surface created: {:?}", surface);
    Ok(surface)
}

/// Destroy a surface created by [`create_surface`]
pub fn destroy_surface<A: VulkanApi>(api: &mut A, instance: vk::Instance, surface: vk::SurfaceKHR) {
    api.destroy_surface(instance, surface);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::{ApiCall, FakeVulkan};

    #[test]
    fn test_rejected_window_maps_to_surface_failure() {
        let api = FakeVulkan::new();
        let mut window = api.window();
        window.fail_surface = true;

        let result = create_surface(&mut window, vk::Instance::null());
        assert!(matches!(result, Err(BootstrapError::SurfaceCreationFailed(_))));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_create_then_destroy() {
        let mut api = FakeVulkan::new();
        let mut window = api.window();

        let surface = create_surface(&mut window, vk::Instance::null()).unwrap();
        destroy_surface(&mut api, vk::Instance::null(), surface);

        assert_eq!(api.calls(), vec![ApiCall::CreateSurface, ApiCall::DestroySurface]);
    }
}
