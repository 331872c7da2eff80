use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use image::RgbaImage;
use renderer::{
    EffectAssets, EffectModel, EffectRenderer, FrameStatus, RenderError,
    RendererConfig, MASK_BITMAP,
};
use tracing_subscriber::EnvFilter;
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::cli::Cli;

pub fn initialise_tracing() {
    let default_filter =
        "warn,shaderplay=info,renderer=info,naga=error,wgpu=error,wgpu_core=error,wgpu_hal=error,winit=error";
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    // Resources are read before any window exists so bad paths fail fast.
    let assets = load_assets(&cli)?;

    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let window = WindowBuilder::new()
        .with_title("shaderplay")
        .with_inner_size(LogicalSize::new(cli.size.0, cli.size.1))
        .with_transparent(true)
        .build(&event_loop)
        .context("failed to create preview window")?;
    let window = Arc::new(window);

    let physical = window.inner_size();
    let logical = physical.to_logical::<f32>(window.scale_factor());
    let config = RendererConfig {
        logical_size: (logical.width, logical.height),
        surface_size: (physical.width, physical.height),
        surface_format: cli.surface_format,
        color_space: cli.color_space,
        gpu_power: cli.gpu_power,
        policy: cli.policy(),
        model: EffectModel::with_resolution(logical.width, logical.height),
        ..RendererConfig::default()
    };

    let mut renderer = EffectRenderer::configure(Arc::clone(&window), &config, assets)
        .context("failed to configure effect renderer")?;
    if let Some(error) = renderer.mask_error() {
        tracing::warn!(%error, "mask bitmap unavailable; rendering the photo without rays");
    }
    let profile = renderer.adapter_profile();
    if profile.is_software() {
        tracing::warn!(adapter = %profile.name, "running on a software adapter; expect low frame rates");
    }

    let mut fatal: Option<RenderError> = None;
    window.request_redraw();
    event_loop
        .run(|event, elwt| {
            // Presentation is FIFO, so waiting between events paces frames to vblank.
            elwt.set_control_flow(ControlFlow::Wait);

            match event {
                Event::WindowEvent { window_id, event } if window_id == window.id() => {
                    match event {
                        WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                        WindowEvent::Resized(size) => {
                            renderer.resize_surface((size.width, size.height));
                            let logical = size.to_logical::<f32>(window.scale_factor());
                            renderer.on_surface_resize((logical.width, logical.height));
                        }
                        WindowEvent::RedrawRequested => match renderer.render_frame() {
                            Ok(FrameStatus::Presented) => {}
                            Ok(FrameStatus::Dropped(reason)) => {
                                tracing::trace!(%reason, "frame skipped");
                            }
                            Err(error) => {
                                tracing::error!(%error, "rendering stopped");
                                fatal = Some(error);
                                elwt.exit();
                            }
                        },
                        _ => {}
                    }
                }
                Event::AboutToWait => window.request_redraw(),
                _ => {}
            }
        })
        .map_err(|err| anyhow!("event loop error: {err}"))?;

    let stats = renderer.stats();
    tracing::info!(
        presented = stats.presented,
        dropped = stats.dropped,
        "preview closed"
    );
    if let Some(error) = fatal {
        return Err(error).context("effect renderer failed");
    }
    Ok(())
}

fn load_assets(cli: &Cli) -> Result<EffectAssets> {
    let photo = cli.photo.as_deref().map(load_photo).transpose()?;
    let mask_bitmap = match cli.mask.as_deref() {
        Some(path) => Cow::Owned(
            fs::read(path).with_context(|| format!("failed to read mask at {}", path.display()))?,
        ),
        None => Cow::Borrowed(MASK_BITMAP),
    };
    Ok(EffectAssets { photo, mask_bitmap })
}

fn load_photo(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to open photo at {}", path.display()))?
        .to_rgba8();
    if image.width() == 0 || image.height() == 0 {
        bail!("photo at {} has no pixels", path.display());
    }
    tracing::debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "loaded photo"
    );
    Ok(image)
}
