//! Core of the pixel mosaic background renderer.
//!
//! Everything in this crate is platform independent: the GPU backend in the
//! `renderer` crate and the software canvas used for still exports both plug
//! into the same lifecycle. The flow for one component instance is:
//!
//! ```text
//!   host ── mount(config) ──▶ MosaicComponent ──▶ FrameLoop ──▶ FrameRequester
//!     │                          │   ▲                             │
//!     │ observe_resize()         │   └──────── tick(handle) ◀──────┘
//!     ▼                          ▼
//!   ResizeReconciler ──▶ RenderBackend::reallocate / draw(MosaicUniforms)
//!                                ▲
//!   update(config) ──▶ UniformSyncer ──▶ ColorResolver
//! ```
//!
//! `shading` holds the per-pixel algorithm as plain Rust. The GLSL program in
//! the `renderer` crate mirrors it line for line, and the software canvas runs
//! it directly.

pub mod canvas;
pub mod color;
pub mod component;
pub mod config;
pub mod frame;
pub mod shading;
pub mod surface;
pub mod uniforms;

pub use canvas::SoftwareCanvas;
pub use color::{ColorError, ColorResolver, CssColorResolver, Rgb, ThemeVariables};
pub use component::{ComponentStatus, MosaicComponent, RenderBackend, RenderError, TickOutcome};
pub use config::{ConfigError, MosaicFile, Quality, RenderConfiguration, MAX_PALETTE};
pub use frame::{FrameHandle, FrameLoop, FrameRequester, ManualFrames, RenderLoopState};
pub use surface::{ResizeReconciler, SurfaceSize};
pub use uniforms::{MosaicUniforms, UniformSyncer};
