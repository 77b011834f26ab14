use std::time::Duration;

pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_millis(1000);
pub const DEFAULT_TERMS_VERSION: &str = "1";

/// Runtime configuration shared by the route guards.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Delay before an unauthenticated session is treated as a real logout.
    pub grace_window: Duration,
    /// Terms-of-service version a user must have accepted.
    pub terms_version: String,
}

impl GuardConfig {
    /// Construct config with the default one second grace window.
    pub fn new(terms_version: impl Into<String>) -> Self {
        Self {
            grace_window: DEFAULT_GRACE_WINDOW,
            terms_version: terms_version.into(),
        }
    }

    /// Adjust the grace window.
    pub fn with_grace_window(mut self, grace_window: Duration) -> Self {
        self.grace_window = grace_window;
        self
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TERMS_VERSION)
    }
}
