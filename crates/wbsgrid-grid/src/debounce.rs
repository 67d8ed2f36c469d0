//! Trailing-edge debouncer driven by host timestamps.

/// Resize repaint window in milliseconds
pub const DEFAULT_RESIZE_DEBOUNCE_MS: f64 = 150.0;

/// Fires once, `window_ms` after the last trigger.
///
/// Time is supplied by the caller (animation-frame timestamps on the web
/// host), so there are no timers inside.
#[derive(Clone, Debug)]
pub struct Debouncer {
    window_ms: f64,
    deadline: Option<f64>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_RESIZE_DEBOUNCE_MS)
    }
}

impl Debouncer {
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms: window_ms.max(0.0),
            deadline: None,
        }
    }

    pub fn window_ms(&self) -> f64 {
        self.window_ms
    }

    /// Restart the window at `now_ms`
    pub fn trigger(&mut self, now_ms: f64) {
        self.deadline = Some(now_ms + self.window_ms);
    }

    /// True exactly once when the window has elapsed
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
