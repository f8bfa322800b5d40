use std::time::{Duration, Instant};

use mosaic::FrameHandle;

/// Delay before re-ticking when the last tick presented nothing.
///
/// Roughly one refresh at 60 Hz. Without a present there is no vsync to
/// throttle the loop, so skipped ticks wait this long instead.
pub(crate) const IDLE_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// What the event loop should do before it goes back to sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pace {
    RedrawNow,
    WaitUntil(Instant),
    Idle,
}

/// Tracks the frame the mosaic loop is waiting for and when it reaches the
/// window as a redraw request.
///
/// A requested frame is only forwarded once the host calls
/// [`schedule`](Self::schedule): straight away after a presented frame, one
/// [`IDLE_FRAME_INTERVAL`] later after a skipped one.
#[derive(Debug, Default)]
pub(crate) struct RedrawPacer {
    next_id: u64,
    requested: Option<FrameHandle>,
    issued: bool,
    deadline: Option<Instant>,
}

impl RedrawPacer {
    pub(crate) fn request(&mut self) -> FrameHandle {
        self.next_id += 1;
        let handle = FrameHandle::new(self.next_id);
        self.requested = Some(handle);
        self.issued = false;
        self.deadline = None;
        handle
    }

    pub(crate) fn cancel(&mut self, handle: FrameHandle) {
        if self.requested == Some(handle) {
            self.requested = None;
            self.issued = false;
            self.deadline = None;
        }
    }

    /// Returns true when a redraw must be issued now.
    pub(crate) fn schedule(&mut self, idle: bool, now: Instant) -> bool {
        if self.requested.is_none() || self.issued {
            return false;
        }
        if idle {
            self.deadline = Some(now + IDLE_FRAME_INTERVAL);
            false
        } else {
            self.deadline = None;
            self.issued = true;
            true
        }
    }

    /// Cuts a pending idle wait short. Returns true when a redraw must be
    /// issued now.
    pub(crate) fn wake(&mut self) -> bool {
        if self.deadline.take().is_some() && self.requested.is_some() {
            self.issued = true;
            return true;
        }
        false
    }

    pub(crate) fn poll(&mut self, now: Instant) -> Pace {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.issued = true;
                Pace::RedrawNow
            }
            Some(deadline) => Pace::WaitUntil(deadline),
            None => Pace::Idle,
        }
    }

    /// The frame a delivered redraw belongs to. `None` for redraws the
    /// platform sent on its own.
    pub(crate) fn take_redraw(&mut self) -> Option<FrameHandle> {
        if !self.issued {
            return None;
        }
        self.issued = false;
        self.requested.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presented_frames_redraw_immediately() {
        let mut pacer = RedrawPacer::default();
        let handle = pacer.request();
        assert!(pacer.schedule(false, Instant::now()));
        assert_eq!(pacer.poll(Instant::now()), Pace::Idle);
        assert_eq!(pacer.take_redraw(), Some(handle));
        assert_eq!(pacer.take_redraw(), None);
    }

    #[test]
    fn skipped_frames_wait_one_interval() {
        let mut pacer = RedrawPacer::default();
        let handle = pacer.request();
        let now = Instant::now();
        assert!(!pacer.schedule(true, now));

        let deadline = now + IDLE_FRAME_INTERVAL;
        assert_eq!(pacer.poll(now), Pace::WaitUntil(deadline));
        // A redraw arriving before the deadline is not ours.
        assert_eq!(pacer.take_redraw(), None);

        assert_eq!(pacer.poll(deadline), Pace::RedrawNow);
        assert_eq!(pacer.poll(deadline), Pace::Idle);
        assert_eq!(pacer.take_redraw(), Some(handle));
    }

    #[test]
    fn repeated_skips_never_redraw_back_to_back() {
        let mut pacer = RedrawPacer::default();
        let mut now = Instant::now();
        for _ in 0..5 {
            pacer.request();
            assert!(!pacer.schedule(true, now));
            assert!(matches!(pacer.poll(now), Pace::WaitUntil(_)));
            now += IDLE_FRAME_INTERVAL;
            assert_eq!(pacer.poll(now), Pace::RedrawNow);
            assert!(pacer.take_redraw().is_some());
        }
    }

    #[test]
    fn wake_cuts_idle_wait_short() {
        let mut pacer = RedrawPacer::default();
        let handle = pacer.request();
        assert!(!pacer.schedule(true, Instant::now()));
        assert!(pacer.wake());
        assert!(!pacer.wake());
        assert_eq!(pacer.poll(Instant::now()), Pace::Idle);
        assert_eq!(pacer.take_redraw(), Some(handle));
    }

    #[test]
    fn cancelled_frame_is_never_delivered() {
        let mut pacer = RedrawPacer::default();
        let handle = pacer.request();
        assert!(pacer.schedule(false, Instant::now()));
        pacer.cancel(handle);
        assert_eq!(pacer.take_redraw(), None);
        assert!(!pacer.schedule(false, Instant::now()));
        assert!(!pacer.wake());
    }

    #[test]
    fn stale_cancel_keeps_current_request() {
        let mut pacer = RedrawPacer::default();
        let first = pacer.request();
        let second = pacer.request();
        assert_ne!(first, second);
        pacer.cancel(first);
        assert!(pacer.schedule(false, Instant::now()));
        assert_eq!(pacer.take_redraw(), Some(second));
    }
}
