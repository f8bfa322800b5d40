//! wgpu backend for the mosaic component.
//!
//! - `context` owns instance/device/surface wiring and reconfigures the
//!   swapchain when the window resizes or the surface is lost.
//! - `pipeline` compiles the GLSL programs under a validation error scope and
//!   allocates the offscreen mosaic target.
//! - `state` glues everything together behind `mosaic::RenderBackend`.

mod context;
mod pipeline;
mod state;

pub use state::GpuState;
