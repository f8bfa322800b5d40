use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Sender};
use mosaic::{
    CssColorResolver, FrameHandle, FrameRequester, MosaicComponent, MosaicFile, ThemeVariables,
    TickOutcome,
};
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::window::{Window, WindowBuilder};

use crate::gpu::GpuState;
use crate::pacing::{Pace, RedrawPacer};
use crate::types::WindowOptions;

type WindowComponent = MosaicComponent<GpuState, RedrawRequester, CssColorResolver>;

/// Frame primitive backed by winit redraw requests.
///
/// Requests are held by a [`RedrawPacer`] until the host schedules them, so a
/// tick that presented nothing does not spin straight into the next redraw.
/// winit cannot withdraw a redraw once issued; the resulting event carries no
/// handle and is dropped.
struct RedrawRequester {
    window: Arc<Window>,
    pacer: RedrawPacer,
}

impl RedrawRequester {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            pacer: RedrawPacer::default(),
        }
    }

    fn schedule(&mut self, idle: bool) {
        if self.pacer.schedule(idle, Instant::now()) {
            self.window.request_redraw();
        }
    }

    fn wake(&mut self) {
        if self.pacer.wake() {
            self.window.request_redraw();
        }
    }

    fn take_redraw(&mut self) -> Option<FrameHandle> {
        self.pacer.take_redraw()
    }

    fn control_flow(&mut self) -> ControlFlow {
        match self.pacer.poll(Instant::now()) {
            Pace::RedrawNow => {
                self.window.request_redraw();
                ControlFlow::Wait
            }
            Pace::WaitUntil(deadline) => ControlFlow::WaitUntil(deadline),
            Pace::Idle => ControlFlow::Wait,
        }
    }
}

impl FrameRequester for RedrawRequester {
    fn request_frame(&mut self) -> FrameHandle {
        self.pacer.request()
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.pacer.cancel(handle);
        tracing::trace!(%handle, "redraw request abandoned");
    }
}

#[derive(Debug, Clone)]
enum WindowCommand {
    Update(Box<MosaicFile>),
    Shutdown,
}

/// Preview window running its event loop on a dedicated thread.
pub struct WindowRuntime {
    proxy: EventLoopProxy<WindowCommand>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl WindowRuntime {
    pub fn spawn(options: WindowOptions) -> Result<Self> {
        let (ready_tx, ready_rx) = bounded(1);
        let handle = thread::Builder::new()
            .name("pixelmosaic-window".into())
            .spawn(move || run_window_thread(options, ready_tx))
            .map_err(|err| anyhow!("failed to spawn window thread: {err}"))?;

        let proxy = ready_rx
            .recv()
            .map_err(|err| anyhow!("window thread failed to initialise: {err}"))??;

        Ok(Self {
            proxy,
            join_handle: Some(handle),
        })
    }

    /// Pushes new mosaic settings and theme variables to the running window.
    pub fn update(&self, file: MosaicFile) -> Result<()> {
        self.proxy
            .send_event(WindowCommand::Update(Box::new(file)))
            .map_err(|err| anyhow!("window is no longer running: {err}"))
    }

    /// True once the window was closed and its thread finished.
    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    pub fn shutdown(mut self) -> Result<()> {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            handle
                .join()
                .map_err(|err| anyhow!("window thread panicked: {err:?}"))??;
        }
        Ok(())
    }
}

impl Drop for WindowRuntime {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            let _ = handle.join();
        }
    }
}

fn run_window_thread(
    options: WindowOptions,
    ready_tx: Sender<Result<EventLoopProxy<WindowCommand>>>,
) -> Result<()> {
    let mut builder = EventLoopBuilder::<WindowCommand>::with_user_event();
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;
        EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }

    #[cfg(any(
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    ))]
    {
        use winit::platform::x11::EventLoopBuilderExtX11;
        EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
    }
    let event_loop = match builder.build() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            let message = format!("failed to create event loop: {err}");
            let _ = ready_tx.send(Err(anyhow!(message.clone())));
            return Err(anyhow!(message));
        }
    };
    let proxy = event_loop.create_proxy();

    let window = WindowBuilder::new()
        .with_title(options.title.as_str())
        .with_inner_size(LogicalSize::new(options.size.0, options.size.1))
        .with_transparent(true)
        .build(&event_loop);
    let window = match window {
        Ok(window) => Arc::new(window),
        Err(err) => {
            let message = format!("failed to create preview window: {err}");
            let _ = ready_tx.send(Err(anyhow!(message.clone())));
            return Err(anyhow!(message));
        }
    };

    let theme = ThemeVariables::from_map(&options.file.theme);
    let started = Instant::now();
    // A missing GPU leaves the window open and blank; the component logs why.
    let mut component: WindowComponent = MosaicComponent::mount(
        GpuState::new(window.clone()),
        &options.file.mosaic,
        CssColorResolver::new(theme.clone()),
        RedrawRequester::new(window.clone()),
        0.0,
    );
    observe(&mut component, window.inner_size(), window.scale_factor());
    if let Some(frames) = component.frame_requester_mut() {
        frames.schedule(false);
    }

    let _ = ready_tx.send(Ok(proxy));

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::UserEvent(WindowCommand::Update(file)) => {
            theme.replace_all(&file.theme);
            component.update(&file.mosaic);
            wake(&mut component);
            tracing::info!(
                theme_variables = theme.len(),
                paused = file.mosaic.paused,
                "applied configuration update"
            );
        }
        Event::UserEvent(WindowCommand::Shutdown) => elwt.exit(),
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = component.backend_mut() {
                    gpu.resize_surface(new_size);
                }
                observe(&mut component, new_size, window.scale_factor());
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                observe(&mut component, window.inner_size(), scale_factor);
            }
            WindowEvent::RedrawRequested => {
                let Some(handle) = component
                    .frame_requester_mut()
                    .and_then(RedrawRequester::take_redraw)
                else {
                    return;
                };
                let outcome = component.tick(handle, started.elapsed().as_secs_f64());
                if outcome == TickOutcome::Drawn && component.frames_drawn() == 1 {
                    tracing::info!(
                        size = ?component.surface_size(),
                        "first mosaic frame presented"
                    );
                }
                if let Some(frames) = component.frame_requester_mut() {
                    frames.schedule(outcome != TickOutcome::Drawn);
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            let flow = component
                .frame_requester_mut()
                .map_or(ControlFlow::Wait, RedrawRequester::control_flow);
            elwt.set_control_flow(flow);
        }
        Event::LoopExiting => component.unmount(),
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

fn observe(component: &mut WindowComponent, size: PhysicalSize<u32>, scale_factor: f64) {
    let logical: LogicalSize<f64> = size.to_logical(scale_factor);
    component.observe_resize(logical.width, logical.height, scale_factor);
    wake(component);
}

/// Redraws promptly after a change instead of waiting out an idle interval.
fn wake(component: &mut WindowComponent) {
    if let Some(frames) = component.frame_requester_mut() {
        frames.wake();
    }
}
