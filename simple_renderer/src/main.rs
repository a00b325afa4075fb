//! Opens a window, bootstraps a Vulkan context on it and idles until the
//! window is closed.

use std::process::ExitCode;

use vulkan_bootstrap::prelude::*;

const CONFIG_PATH: &str = "simple_renderer.toml";

fn run() -> BootstrapResult<()> {
    let config = BootstrapConfig::load_or_default(CONFIG_PATH)?;

    let mut window = GlfwWindow::new(&config.window).map_err(BootstrapError::WindowCreationFailed)?;
    let api = AshBackend::load()?;
    let context = GraphicsContext::bootstrap(api, &mut window, &config)?;

    log::info!(
        "Context ready on \"{}\" (graphics family {}, present family {})",
        context.physical_device().name,
        context.device().graphics_family,
        context.device().present_family
    );

    while !window.should_close() {
        window.poll_events();
    }

    context.teardown();
    Ok(())
}

/// Print a failure once and map the outcome to a process exit status
fn exit_status(result: BootstrapResult<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    ExitCode::from(exit_status(run()))
}
