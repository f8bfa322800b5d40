//! Cancellable frame scheduling.
//!
//! A [`FrameLoop`] holds at most one outstanding request with its host. Ticks
//! are matched against that request by [`FrameHandle`]; anything else (a late
//! callback after `stop`, a duplicate redraw) is ignored. New requests are only
//! issued from inside a tick, so a loop can never fork into two chains.

use std::fmt;

/// Opaque token for one scheduled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// Host primitive that delivers a tick "on the next frame".
pub trait FrameRequester {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Clock state owned by one loop.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderLoopState {
    /// Seconds of animated time; frozen while paused.
    pub elapsed_time: f64,
    pub paused: bool,
}

pub struct FrameLoop<F> {
    requester: F,
    pending: Option<FrameHandle>,
    state: RenderLoopState,
    last_tick: f64,
    running: bool,
}

impl<F: FrameRequester> FrameLoop<F> {
    /// Requests the first frame. `now` is the host clock in seconds.
    pub fn start(mut requester: F, now: f64, paused: bool) -> Self {
        let handle = requester.request_frame();
        tracing::debug!(%handle, paused, "frame loop started");
        Self {
            requester,
            pending: Some(handle),
            state: RenderLoopState {
                elapsed_time: 0.0,
                paused,
            },
            last_tick: now,
            running: true,
        }
    }

    /// Accepts a tick for `handle` and advances the clock.
    ///
    /// Returns the elapsed animated time, or `None` when the handle is stale or
    /// the loop has stopped. A paused loop still accepts ticks but its time
    /// does not move.
    pub fn begin_tick(&mut self, handle: FrameHandle, now: f64) -> Option<f64> {
        if !self.running || self.pending != Some(handle) {
            tracing::trace!(%handle, "ignoring stale frame");
            return None;
        }
        self.pending = None;

        let delta = now - self.last_tick;
        self.last_tick = now;
        if !self.state.paused && delta.is_finite() && delta > 0.0 {
            self.state.elapsed_time += delta;
        }
        Some(self.state.elapsed_time)
    }

    /// Schedules the next frame after a tick has been handled.
    pub fn finish_tick(&mut self) {
        if self.running && self.pending.is_none() {
            self.pending = Some(self.requester.request_frame());
        }
    }

    /// Cancels the outstanding request and stops accepting ticks.
    pub fn stop(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.requester.cancel_frame(handle);
        }
        if self.running {
            self.running = false;
            tracing::debug!(elapsed = self.state.elapsed_time, "frame loop stopped");
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.state.paused = paused;
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    pub fn state(&self) -> RenderLoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn requester(&self) -> &F {
        &self.requester
    }

    pub fn requester_mut(&mut self) -> &mut F {
        &mut self.requester
    }
}

/// Requester with no host behind it: handles are numbered and recorded.
///
/// Used for headless rendering, where the caller drives ticks itself.
#[derive(Debug, Default)]
pub struct ManualFrames {
    next_id: u64,
    requested: usize,
    cancelled: Vec<FrameHandle>,
}

impl ManualFrames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn cancelled(&self) -> &[FrameHandle] {
        &self.cancelled
    }
}

impl FrameRequester for ManualFrames {
    fn request_frame(&mut self) -> FrameHandle {
        self.next_id += 1;
        self.requested += 1;
        FrameHandle::new(self.next_id)
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.cancelled.push(handle);
    }
}
