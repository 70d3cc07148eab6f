//! ReplayMarkerStorage trait - persistent subscription cursors

use crate::{ForwarderError, ReplayMarker};

/// Stores the last seen replay id of each subscription
#[trait_variant::make(ReplayMarkerStorage: Send)]
pub trait LocalReplayMarkerStorage {
    /// Stored marker for `key`, `None` if never stored
    async fn get_marker(&self, key: &str) -> Result<Option<ReplayMarker>, ForwarderError>;

    /// Store `marker` for `key`
    async fn set_marker(&self, key: &str, marker: ReplayMarker) -> Result<(), ForwarderError>;
}
