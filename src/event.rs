//! Control events the plugin thread consumes, and the markers it emits
//! at the end of each reconciliation phase.
//!
//! Dispatch is single-threaded: every `Event` is handled synchronously
//! on the plugin thread in the order it was sent, so nothing here needs
//! its own locking beyond the channel itself.

use std::net::SocketAddr;

use log::info;

/// A control event the plugin thread reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Force a reconnect even if currently connected.
    Reconnect,
    /// Disable the plugin; tears down any active connection.
    Disable,
    /// Re-enable the plugin after a prior [`Event::Disable`].
    Enable,
    /// Point the connection at a new peer address and reconnect.
    SetAddress(SocketAddr),
    /// Revert to the built-in default address and reconnect.
    UnsetAddress,
    /// Zero every counter in place.
    ResetCounters,
    /// Toggle nexthop-group replication on or off.
    ToggleNhg(bool),
    /// Emitted by the connection state machine itself when a socket
    /// error forces a teardown, distinguished from an operator-requested
    /// [`Event::Reconnect`] only for logging purposes.
    InternalReconnect,
    /// The walker finished a full pass over the LSP table.
    LspFinished,
    /// The walker finished a full pass over the nexthop-group table.
    NhgFinished,
    /// The walker finished a full pass over the RIB.
    RibFinished,
    /// The walker finished a full pass over the router-MAC table.
    RmacFinished,
}

impl Event {
    /// True for the four walker-completion markers.
    pub fn is_finished_marker(&self) -> bool {
        matches!(
            self,
            Event::LspFinished | Event::NhgFinished | Event::RibFinished | Event::RmacFinished
        )
    }
}

/// Dispatch one event, logging it the way an operator expects to see in
/// the plugin's log stream.
pub fn log_event(event: &Event) {
    match event {
        Event::Reconnect => info!("fpm: reconnect requested"),
        Event::Disable => info!("fpm: plugin disabled"),
        Event::Enable => info!("fpm: plugin enabled"),
        Event::SetAddress(addr) => info!("fpm: address set to {addr}"),
        Event::UnsetAddress => info!("fpm: address unset, reverting to default"),
        Event::ResetCounters => info!("fpm: counters reset"),
        Event::ToggleNhg(on) => info!("fpm: nexthop-group replication set to {on}"),
        Event::InternalReconnect => info!("fpm: connection reset, reconnecting"),
        Event::LspFinished => info!("fpm: LSP_FINISHED"),
        Event::NhgFinished => info!("fpm: NHG_FINISHED"),
        Event::RibFinished => info!("fpm: RIB_FINISHED"),
        Event::RmacFinished => info!("fpm: RMAC_FINISHED"),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn finished_markers_are_identified() {
        assert!(Event::RibFinished.is_finished_marker());
        assert!(!Event::Reconnect.is_finished_marker());
    }
}
