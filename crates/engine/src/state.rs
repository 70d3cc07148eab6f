//! Engine lifecycle state

use std::fmt;

/// Lifecycle of a forwarding run
///
/// `Unconfigured -> Configuring -> Listening -> Draining -> Stopped`.
/// A fatal error moves straight from `Listening` to `Stopped` after
/// in-flight deliveries were awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// Collaborators not built yet
    #[default]
    Unconfigured,
    /// Building source, router and sink
    Configuring,
    /// Receiving and dispatching messages
    Listening,
    /// Source closed, buffered messages still being dispatched
    Draining,
    /// All deliveries finished and the sink closed
    Stopped,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Configuring => "configuring",
            Self::Listening => "listening",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }

    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Listening | Self::Draining)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
