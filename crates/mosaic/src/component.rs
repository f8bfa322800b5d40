//! Lifecycle of one mosaic surface.
//!
//! [`MosaicComponent`] ties a [`RenderBackend`] to the frame loop, the resize
//! reconciler and the uniform syncer. It owns every resource it was given and
//! releases them on [`MosaicComponent::unmount`] or drop.

use thiserror::Error;

use crate::color::ColorResolver;
use crate::config::RenderConfiguration;
use crate::frame::{FrameHandle, FrameLoop, FrameRequester};
use crate::surface::{ResizeReconciler, SurfaceSize};
use crate::uniforms::{MosaicUniforms, UniformSyncer};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("graphics context unavailable: {0}")]
    ContextUnavailable(String),
    #[error("mosaic shader failed to compile: {0}")]
    ShaderCompilation(String),
    #[error("presentation surface lost")]
    SurfaceLost,
    #[error("graphics device out of memory")]
    OutOfMemory,
    #[error("render backend failure: {0}")]
    Backend(String),
    #[error("failed to write image: {0}")]
    Export(#[from] image::ImageError),
}

impl RenderError {
    /// True for errors the next frame may recover from on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, RenderError::SurfaceLost)
    }
}

/// Drawing surface the component renders through.
///
/// Implemented by the wgpu backend in the `renderer` crate and by
/// [`SoftwareCanvas`](crate::canvas::SoftwareCanvas).
pub trait RenderBackend {
    /// Resizes the render target and returns the size actually allocated.
    ///
    /// A backend bound by device limits may return less than `size`; the
    /// resolution uniform follows the returned size. Empty sizes must be
    /// accepted and leave the backend in a state where `draw` is never called
    /// until a real size arrives.
    fn reallocate(&mut self, size: SurfaceSize) -> Result<SurfaceSize, RenderError>;

    /// Renders one full frame with the given parameters.
    fn draw(&mut self, uniforms: &MosaicUniforms) -> Result<(), RenderError>;

    /// Frees every resource. Called exactly once.
    fn release(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStatus {
    Running,
    /// No usable backend; ticks are no-ops.
    Degraded,
    Unmounted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Drawn,
    /// Tick accepted but nothing was rendered (empty surface, paused, or a
    /// transient backend error).
    Skipped,
    /// Stale handle or the component is not running.
    Ignored,
}

pub struct MosaicComponent<B: RenderBackend, F: FrameRequester, R: ColorResolver> {
    backend: Option<B>,
    frames: Option<FrameLoop<F>>,
    reconciler: ResizeReconciler,
    syncer: UniformSyncer<R>,
    uniforms: MosaicUniforms,
    config: RenderConfiguration,
    status: ComponentStatus,
    dirty: bool,
    frames_drawn: u64,
}

impl<B: RenderBackend, F: FrameRequester, R: ColorResolver> MosaicComponent<B, F, R> {
    /// Attaches to a backend and starts the frame loop.
    ///
    /// A failed backend puts the component in [`ComponentStatus::Degraded`]:
    /// the error is logged, no frame is requested, and the host carries on.
    pub fn mount(
        backend: Result<B, RenderError>,
        config: &RenderConfiguration,
        resolver: R,
        requester: F,
        now: f64,
    ) -> Self {
        let syncer = UniformSyncer::new(resolver);
        let uniforms = syncer.stage(config);
        let reconciler = ResizeReconciler::new(config.quality);

        let (backend, frames, status) = match backend {
            Ok(backend) => {
                let frames = FrameLoop::start(requester, now, config.paused);
                tracing::info!(
                    quality = %config.quality,
                    paused = config.paused,
                    palette = uniforms.palette_count,
                    "mosaic mounted"
                );
                (Some(backend), Some(frames), ComponentStatus::Running)
            }
            Err(err) => {
                tracing::error!(error = %err, "mosaic renderer unavailable; rendering disabled");
                (None, None, ComponentStatus::Degraded)
            }
        };

        Self {
            backend,
            frames,
            reconciler,
            syncer,
            uniforms,
            config: config.clone(),
            status,
            dirty: true,
            frames_drawn: 0,
        }
    }

    /// Applies a new configuration between frames.
    ///
    /// The uniform block is restaged and swapped in whole. A quality change
    /// reallocates the render target straight away.
    pub fn update(&mut self, config: &RenderConfiguration) {
        if self.status == ComponentStatus::Unmounted {
            return;
        }
        let quality_changed = config.quality != self.config.quality;
        self.config = config.clone();
        self.syncer.sync(config, &mut self.uniforms);
        self.dirty = true;

        if let Some(frames) = self.frames.as_mut() {
            frames.set_paused(config.paused);
        }
        if quality_changed {
            tracing::debug!(quality = %config.quality, "quality changed");
            if let Some(size) = self.reconciler.set_quality(config.quality) {
                self.apply_size(size);
            }
        }
    }

    /// Feeds a content-box observation in logical pixels.
    pub fn observe_resize(&mut self, css_width: f64, css_height: f64, device_pixel_ratio: f64) {
        if self.status == ComponentStatus::Unmounted {
            return;
        }
        if let Some(size) = self
            .reconciler
            .observe(css_width, css_height, device_pixel_ratio)
        {
            self.apply_size(size);
        }
    }

    /// Handles the host's frame callback for `handle`.
    pub fn tick(&mut self, handle: FrameHandle, now: f64) -> TickOutcome {
        if self.status != ComponentStatus::Running {
            return TickOutcome::Ignored;
        }
        let Some(frames) = self.frames.as_mut() else {
            return TickOutcome::Ignored;
        };
        let Some(elapsed) = frames.begin_tick(handle, now) else {
            return TickOutcome::Ignored;
        };
        let paused = frames.state().paused;
        self.uniforms.set_time(elapsed);

        let outcome = if self.uniforms.has_empty_resolution() || (paused && !self.dirty) {
            TickOutcome::Skipped
        } else {
            self.draw()
        };

        if let Some(frames) = self.frames.as_mut() {
            frames.finish_tick();
        }
        outcome
    }

    /// Tears everything down. Safe to call repeatedly.
    pub fn unmount(&mut self) {
        if self.status == ComponentStatus::Unmounted {
            return;
        }
        self.status = ComponentStatus::Unmounted;
        if let Some(frames) = self.frames.as_mut() {
            frames.stop();
        }
        self.reconciler.dispose();
        if let Some(mut backend) = self.backend.take() {
            backend.release();
        }
        tracing::info!(frames = self.frames_drawn, "mosaic unmounted");
    }

    pub fn status(&self) -> ComponentStatus {
        self.status
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.frames.as_ref().and_then(FrameLoop::pending)
    }

    pub fn surface_size(&self) -> Option<SurfaceSize> {
        self.reconciler.applied()
    }

    pub fn elapsed_time(&self) -> f64 {
        self.frames
            .as_ref()
            .map(|frames| frames.state().elapsed_time)
            .unwrap_or(0.0)
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn config(&self) -> &RenderConfiguration {
        &self.config
    }

    pub fn uniforms(&self) -> &MosaicUniforms {
        &self.uniforms
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.backend.as_mut()
    }

    pub fn frame_requester(&self) -> Option<&F> {
        self.frames.as_ref().map(FrameLoop::requester)
    }

    /// The host's frame primitive, while the loop exists.
    pub fn frame_requester_mut(&mut self) -> Option<&mut F> {
        self.frames.as_mut().map(FrameLoop::requester_mut)
    }

    fn apply_size(&mut self, size: SurfaceSize) {
        self.dirty = true;
        let applied = match self.backend.as_mut().map(|backend| backend.reallocate(size)) {
            Some(Ok(applied)) => applied,
            Some(Err(err)) => {
                self.uniforms.set_resolution(size.width, size.height);
                self.fail(err);
                return;
            }
            None => size,
        };
        self.uniforms.set_resolution(applied.width, applied.height);
        tracing::debug!(
            width = applied.width,
            height = applied.height,
            requested_width = size.width,
            requested_height = size.height,
            scale = size.scale,
            "surface resized"
        );
    }

    fn draw(&mut self) -> TickOutcome {
        let Some(backend) = self.backend.as_mut() else {
            return TickOutcome::Skipped;
        };
        match backend.draw(&self.uniforms) {
            Ok(()) => {
                self.dirty = false;
                self.frames_drawn += 1;
                TickOutcome::Drawn
            }
            Err(err) if err.is_transient() => {
                tracing::warn!(error = %err, "frame dropped; retrying next tick");
                TickOutcome::Skipped
            }
            Err(err) => {
                self.fail(err);
                TickOutcome::Skipped
            }
        }
    }

    fn fail(&mut self, err: RenderError) {
        if err.is_transient() {
            tracing::warn!(error = %err, "transient render error");
            return;
        }
        tracing::error!(error = %err, "mosaic renderer failed; rendering disabled");
        self.status = ComponentStatus::Degraded;
        if let Some(frames) = self.frames.as_mut() {
            frames.stop();
        }
        if let Some(mut backend) = self.backend.take() {
            backend.release();
        }
    }
}

impl<B: RenderBackend, F: FrameRequester, R: ColorResolver> Drop for MosaicComponent<B, F, R> {
    fn drop(&mut self) {
        self.unmount();
    }
}
