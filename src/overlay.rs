//! Injectable status surface for visual feedback during a session.
//!
//! The sampler owns exactly one sink per session: it renders a short
//! status line every tick and clears the surface once at finalization,
//! whichever path ended the session.

use log::info;

pub trait OverlaySink: Send + 'static {
    /// Show the current session status (sample counts, angles, feedback).
    fn render(&mut self, status: &str);
    /// Tear the surface down. Called exactly once, at finalization.
    fn clear(&mut self);
}

/// Renders status lines into the log stream.
pub struct ConsoleOverlay;

impl OverlaySink for ConsoleOverlay {
    fn render(&mut self, status: &str) {
        info!("[overlay] {status}");
    }

    fn clear(&mut self) {
        info!("[overlay] cleared");
    }
}

/// Headless surface for tests and quiet runs.
pub struct NullOverlay;

impl OverlaySink for NullOverlay {
    fn render(&mut self, _status: &str) {}

    fn clear(&mut self) {}
}
