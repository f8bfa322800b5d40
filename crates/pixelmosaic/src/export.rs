use anyhow::{bail, Context, Result};
use mosaic::{
    ComponentStatus, CssColorResolver, ManualFrames, MosaicComponent, SoftwareCanvas,
    ThemeVariables, TickOutcome,
};

use crate::cli::ExportArgs;
use crate::settings::ConfigSource;

/// Renders one frame at `args.time` into a PNG without touching the GPU.
///
/// The component goes through the same mount / resize / tick path as the
/// window, with a manual frame source standing in for the display.
pub fn run_export(source: &ConfigSource, args: &ExportArgs) -> Result<()> {
    let mut file = source.load()?;
    // Exported frames always show the requested time.
    file.mosaic.paused = false;

    let theme = ThemeVariables::from_map(&file.theme);
    let mut component = MosaicComponent::mount(
        Ok(SoftwareCanvas::new()),
        &file.mosaic,
        CssColorResolver::new(theme),
        ManualFrames::new(),
        0.0,
    );
    component.observe_resize(f64::from(args.size.0), f64::from(args.size.1), args.scale);
    if component.status() != ComponentStatus::Running {
        bail!(
            "cannot render {}x{} at scale {}: software canvas unavailable",
            args.size.0,
            args.size.1,
            args.scale
        );
    }

    let handle = component
        .pending_frame()
        .context("mosaic frame loop did not start")?;
    let outcome = component.tick(handle, args.time);
    if outcome != TickOutcome::Drawn {
        bail!(
            "nothing was rendered ({outcome:?}); surface size {:?}",
            component.surface_size()
        );
    }

    let canvas = component
        .backend()
        .context("software canvas was released before export")?;
    if let Some(parent) = args.output.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    canvas
        .save_png(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!(
        "{} ({}x{}, t={}s)",
        args.output.display(),
        canvas.width(),
        canvas.height(),
        args.time
    );
    Ok(())
}
