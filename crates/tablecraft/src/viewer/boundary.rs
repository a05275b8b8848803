//! Render error boundary.
//!
//! Surface and device failures land here instead of tearing down the
//! window. While failed, the viewer stops drawing the table and shows the
//! error in the title bar; pressing R asks for a retry, which rebuilds the
//! GPU resources on the next frame. The composer and its loaded assets are
//! never touched.
//!
//! ```text
//!            fail()                 request_retry() + take_retry()
//!  Healthy ─────────► Failed ───────────────────────────► Retrying
//!     ▲                 ▲                                    │
//!     │                 └────────────── fail() ──────────────┤
//!     └───────────────────────── frame_ok() ─────────────────┘
//! ```

/// Consecutive lost or outdated surfaces tolerated before giving up.
pub const LOST_SURFACE_LIMIT: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BoundaryState {
    #[default]
    Healthy,
    Failed { message: String, retries: u32 },
    Retrying { retries: u32 },
}

#[derive(Debug, Default)]
pub struct ErrorBoundary {
    state: BoundaryState,
    consecutive_lost: u32,
    retry_requested: bool,
}

impl ErrorBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &BoundaryState {
        &self.state
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, BoundaryState::Failed { .. })
    }

    /// Enter the failed state. A failure while retrying keeps the count.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::error!("Rendering stopped: {message}. Press R to retry.");
        let retries = match self.state {
            BoundaryState::Failed { retries, .. } | BoundaryState::Retrying { retries } => retries,
            BoundaryState::Healthy => 0,
        };
        self.state = BoundaryState::Failed { message, retries };
        self.retry_requested = false;
    }

    /// Count a lost or outdated surface. Returns true while the caller
    /// should reconfigure and carry on; past [`LOST_SURFACE_LIMIT`] the
    /// boundary fails instead.
    pub fn surface_lost(&mut self) -> bool {
        self.consecutive_lost += 1;
        if self.consecutive_lost > LOST_SURFACE_LIMIT {
            self.fail(format!("surface lost {} frames in a row", self.consecutive_lost));
            false
        } else {
            true
        }
    }

    /// A frame was presented.
    pub fn frame_ok(&mut self) {
        self.consecutive_lost = 0;
        if let BoundaryState::Retrying { retries } = self.state {
            log::info!("Rendering recovered after {retries} retr{}", if retries == 1 { "y" } else { "ies" });
            self.state = BoundaryState::Healthy;
        }
    }

    /// The user asked to retry. Ignored unless failed.
    pub fn request_retry(&mut self) -> bool {
        if self.is_failed() {
            self.retry_requested = true;
        }
        self.retry_requested
    }

    /// Consume a pending retry request, moving to `Retrying`.
    pub fn take_retry(&mut self) -> bool {
        if !std::mem::take(&mut self.retry_requested) {
            return false;
        }
        if let BoundaryState::Failed { retries, .. } = self.state {
            self.state = BoundaryState::Retrying { retries: retries + 1 };
            self.consecutive_lost = 0;
            true
        } else {
            false
        }
    }

    /// Window title suffix describing the failure, if any.
    pub fn status_line(&self) -> Option<String> {
        match &self.state {
            BoundaryState::Failed { message, .. } => Some(format!("render error: {message} (press R to retry)")),
            BoundaryState::Retrying { .. } => Some("retrying...".to_string()),
            BoundaryState::Healthy => None,
        }
    }
}
