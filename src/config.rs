//! The typed surface a CLI node calls into: address configuration,
//! nexthop-group policy, and counter inspection/reset.
//!
//! Parsing CLI argument strings and wiring up a command tree is out of
//! scope here; these functions take already-parsed values and operate
//! on a running [`PluginHandle`].

use std::net::{IpAddr, SocketAddr};

use crate::{
    consts::fpm::{default_fpm_address, DEFAULT_FPM_PORT},
    provider::PluginHandle,
};

/// Resolve a configured address and optional port into a socket
/// address, falling back to the default FPM port.
pub fn resolve_address(addr: IpAddr, port: Option<u16>) -> SocketAddr {
    SocketAddr::new(addr, port.unwrap_or(DEFAULT_FPM_PORT))
}

/// The address the plugin connects to absent any `set_address` call.
pub fn default_address() -> SocketAddr {
    SocketAddr::new(default_fpm_address(), DEFAULT_FPM_PORT)
}

/// `set address <v4|v6> [port 1-65535]`: point the plugin at a new
/// peer and force a reconnect to it.
pub fn set_address(handle: &PluginHandle, addr: IpAddr, port: Option<u16>) {
    handle.set_address(resolve_address(addr, port));
}

/// `unset address`: revert to the built-in default and reconnect.
pub fn unset_address(handle: &PluginHandle) {
    handle.unset_address();
}

/// Turn nexthop-group replication on, forcing a reconnect so the
/// replay chain re-runs under the new policy.
pub fn enable_nhg(handle: &PluginHandle) {
    handle.toggle_nhg(true);
}

/// Turn nexthop-group replication off.
pub fn disable_nhg(handle: &PluginHandle) {
    handle.toggle_nhg(false);
}

/// `clear counters`: zero every counter without disturbing live
/// buffer/queue occupancy.
pub fn reset_counters(handle: &PluginHandle) {
    handle.reset_counters();
}

/// `show counters`: the snapshot rendered as `key: value` lines.
pub fn counters_text(handle: &PluginHandle) -> String {
    crate::counters::render_text(&handle.counters_snapshot())
}

/// `show counters json`: the snapshot as a JSON value, hyphenated keys
/// intact.
pub fn counters_json(handle: &PluginHandle) -> serde_json::Value {
    serde_json::to_value(handle.counters_snapshot()).unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn resolve_address_falls_back_to_default_port() {
        let addr = resolve_address(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), None);
        assert_eq!(addr.port(), DEFAULT_FPM_PORT);
    }

    #[test]
    fn resolve_address_honors_explicit_port() {
        let addr = resolve_address(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), Some(4567));
        assert_eq!(addr.port(), 4567);
    }

    #[test]
    fn default_address_matches_documented_port() {
        assert_eq!(default_address().port(), DEFAULT_FPM_PORT);
    }
}
