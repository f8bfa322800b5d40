//! GPU backend and preview window for the pixel mosaic.
//!
//! The crate plugs `wgpu` into the platform-independent component from the
//! `mosaic` crate and hosts it in a `winit` window:
//!
//! ```text
//!   pixelmosaic CLI
//!          │ WindowOptions / MosaicFile updates
//!          ▼
//!   WindowRuntime ──▶ window thread ──▶ winit event loop
//!                                          │ Resized / RedrawRequested
//!                                          ▼
//!                     MosaicComponent<GpuState> ──▶ mosaic pass ──▶ blit ──▶ swapchain
//! ```
//!
//! The mosaic program runs into an offscreen target sized by the component's
//! quality policy; a nearest-filtered blit scales it to the window so the
//! cells stay crisp at any density.

mod compile;
mod gpu;
mod pacing;
mod types;
mod window;

pub use gpu::GpuState;
pub use types::{WindowOptions, DEFAULT_WINDOW_SIZE};
pub use window::WindowRuntime;
