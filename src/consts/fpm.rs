//! Constants for the 4-byte FPM frame header.

use std::net::{IpAddr, Ipv4Addr};

/// Only supported frame version.
pub const FPM_VERSION: u8 = 1;
/// Only supported frame message type: netlink payload.
pub const FPM_MSG_TYPE_NETLINK: u8 = 1;
/// Size of the frame header in bytes.
pub const FPM_HEADER_LEN: usize = 4;
/// Largest `length` field value (payload must fit behind a `u16`).
pub const FPM_MAX_FRAME_LEN: usize = u16::MAX as usize;

/// Default TCP port for the FPM peer.
pub const DEFAULT_FPM_PORT: u16 = 2620;

/// Default peer address: IPv4 loopback.
pub fn default_fpm_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

/// Scratch-buffer size used when encoding a single netlink message,
/// mirrored from the C implementation's `NL_PKT_BUF_SIZE`.
pub const NL_PKT_BUF_SIZE: usize = 4096;

/// Capacity of the output buffer: `NL_PKT_BUF_SIZE * 128`.
pub const OUTPUT_BUFFER_CAPACITY: usize = NL_PKT_BUF_SIZE * 128;

/// Fixed reconnect backoff.
pub const RECONNECT_BACKOFF_SECS: u64 = 3;
/// Walker resume delay for the LSP and NHG phases.
pub const WALKER_RESUME_FAST_SECS: u64 = 0;
/// Walker resume delay for the RIB and RMAC phases.
pub const WALKER_RESUME_SLOW_SECS: u64 = 1;
