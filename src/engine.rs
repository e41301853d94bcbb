//! Trait-shaped interfaces to the host routing engine.
//!
//! The host routing engine itself — the dataplane context allocator,
//! dataplane operation queues, RIB/NHG/LSP/L3VNI table iterators, VRF
//! lookup, and the low-level netlink helpers — is out of scope for this
//! crate. This module is the Rust realization of those interfaces: small
//! traits the core depends on and a real engine implements, instead of
//! module-level globals.

use std::net::Ipv6Addr;

use crate::{
    context::{DplaneContext, LspInfo, NexthopGroup, RmacInfo},
    decode::RouteNotify,
};

/// SRv6 locator metadata used to encode the `FORMAT` TLV and to decide
/// whether an action should be substituted for its uSID variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Locator {
    pub block_len: u8,
    pub node_len: u8,
    pub func_len: u8,
    pub arg_len: u8,
    pub is_usid: bool,
}

/// VRF name resolution and SRv6 locator/encap-source lookups the route
/// encoder needs.
pub trait EngineLookup {
    /// Resolve a table id to its VRF name, used for `END_T`/`END_DT*`
    /// localsid actions.
    fn vrf_name(&self, table_id: u32) -> Option<String>;

    /// Find the locator matching an SRv6 SID, if any.
    fn match_locator(&self, sid: Ipv6Addr) -> Option<Locator>;

    /// The first non-loopback, non-link-local IPv6 address on interface
    /// `lo` in the default VRF, or [`Ipv6Addr::UNSPECIFIED`] if none
    /// exists.
    fn lo_encap_source(&self) -> Ipv6Addr;
}

/// Sink for routes the peer notified us about, so the engine can
/// redistribute them.
pub trait EngineNotifySink {
    fn on_route_notify(&mut self, notify: RouteNotify);
}

/// An object owned by an engine table that the reconciliation walker can
/// mark as replayed for the current connection epoch
/// "Per-object sent flags"). Mutated only on the engine thread.
pub trait SentFlag {
    fn sent(&self) -> bool;
    fn set_sent(&mut self, sent: bool);
}

/// The engine's LSP table.
pub trait EngineLsps {
    type Handle: SentFlag;

    /// Clear every entry's sent flag (walker "reset" step).
    fn reset_sent(&mut self);

    /// Iterate entries with their handle (for flag mutation) and the
    /// [`LspInfo`] to encode.
    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = (&mut Self::Handle, LspInfo)> + '_>;
}

/// The engine's nexthop-group table.
pub trait EngineNhgs {
    type Handle: SentFlag;

    fn reset_sent(&mut self);
    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = (&mut Self::Handle, NexthopGroup)> + '_>;
}

/// The engine's RIB (selected-for-install routes).
pub trait EngineRib {
    type Handle: SentFlag;

    fn reset_sent(&mut self);
    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = (&mut Self::Handle, DplaneContext)> + '_>;

    /// Reset only destinations whose selected nexthop carries a nonzero
    /// `seg6_segs` nonzero (mirrors `fpm_srv6_route_reset`).
    fn reset_sent_srv6(&mut self);
}

/// The engine's L3VNI router-MAC table.
pub trait EngineRmacs {
    type Handle: SentFlag;

    fn reset_sent(&mut self);
    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = (&mut Self::Handle, RmacInfo)> + '_>;
}

/// Aggregate of every engine table the walker chains over, plus the
/// lookup interface the encoders need. A real engine provides one
/// concrete type implementing this; the crate is generic over it so it
/// never depends on a specific engine's internal representation.
pub trait Engine: EngineLookup + EngineNotifySink {
    type Lsps: EngineLsps;
    type Nhgs: EngineNhgs;
    type Rib: EngineRib;
    type Rmacs: EngineRmacs;

    fn lsps(&mut self) -> &mut Self::Lsps;
    fn nhgs(&mut self) -> &mut Self::Nhgs;
    fn rib(&mut self) -> &mut Self::Rib;
    fn rmacs(&mut self) -> &mut Self::Rmacs;

    /// Split off a mutable borrow of the RIB alongside a shared lookup
    /// handle, so the route encoder can resolve VRF names and SRv6
    /// locators while the walker iterates RIB entries. A real engine
    /// implements this as a disjoint field borrow (its lookup tables and
    /// its RIB live in different fields), which the borrow checker
    /// accepts without needing a single combined `&mut self` borrow for
    /// the whole walk.
    fn rib_and_lookup(&mut self) -> (&mut Self::Rib, &dyn EngineLookup);
}
