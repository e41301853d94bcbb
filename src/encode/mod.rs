//! Netlink/TLV encoders for each dataplane operation kind.
//!
//! Every encoder returns the raw netlink message bytes (header + payload)
//! for zero, one or two messages; it never touches the output buffer
//! directly. [`crate::obuf::OutputBuffer::enqueue`] is the only thing that
//! frames and appends them.

pub mod lsp;
pub mod mac;
pub mod nexthop;
pub mod route;

use std::net::IpAddr;

/// `rtm_family`/`ndm_family` byte for an address.
pub fn family_of(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => crate::consts::nl::af::INET,
        IpAddr::V6(_) => crate::consts::nl::af::INET6,
    }
}

/// The raw address bytes, 4 for v4 and 16 for v6.
pub fn addr_bytes(addr: &IpAddr) -> Vec<u8> {
    match addr {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    }
}

/// Split a VRF/table id into the `rtm_table`/`ndm_...`-style inline byte
/// plus an optional `RTA_TABLE` overflow attribute.
///
/// Values below 256 fit directly in the one-byte field; larger VRF ids
/// are signaled with `RT_TABLE_UNSPEC` and carried in full in the
/// attribute instead.
pub fn table_field(vrf_id: u32) -> (u8, Option<u32>) {
    if vrf_id < 256 {
        (vrf_id as u8, None)
    } else {
        (0, Some(vrf_id))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn table_field_inlines_small_vrf_ids() {
        assert_eq!(table_field(5), (5, None));
    }

    #[test]
    fn table_field_overflows_large_vrf_ids() {
        assert_eq!(table_field(4000), (0, Some(4000)));
    }
}
