//! In-memory stand-in for a host routing engine, built only to exercise
//! the core against something concrete: a handful of `Vec`-backed tables
//! implementing the [`fpm_dplane::engine`] traits, with no netlink or
//! process state of its own.
//!
//! Nothing here ships as part of the library; it exists for
//! `tests/reconciliation.rs` and for anyone wiring this crate into a
//! real engine to have a worked example to read.

use std::collections::HashMap;
use std::net::Ipv6Addr;

use fpm_dplane::context::{DplaneContext, LspInfo, NexthopGroup, RmacInfo};
use fpm_dplane::decode::RouteNotify;
use fpm_dplane::engine::{Engine, EngineLookup, EngineLsps, EngineNhgs, EngineNotifySink, EngineRib, EngineRmacs, Locator, SentFlag};

/// A table entry plus the walker's per-object sent flag.
pub struct Entry<T> {
    pub data: T,
    pub sent: bool,
}

impl<T> Entry<T> {
    fn new(data: T) -> Self {
        Entry { data, sent: false }
    }
}

impl<T> SentFlag for Entry<T> {
    fn sent(&self) -> bool {
        self.sent
    }

    fn set_sent(&mut self, sent: bool) {
        self.sent = sent;
    }
}

/// Whether a RIB entry's selected nexthop carries an SRv6 extension,
/// the condition [`InMemoryRib::reset_sent_srv6`] re-marks unsent.
fn is_srv6_destination(ctx: &DplaneContext) -> bool {
    ctx.nhg
        .as_ref()
        .and_then(|nhg| nhg.selected())
        .map(|nh| nh.seg6local_action.is_some() || nh.seg6_vpn_sid.is_some())
        .unwrap_or(false)
}

#[derive(Default)]
pub struct InMemoryLsps {
    entries: Vec<Entry<LspInfo>>,
}

impl InMemoryLsps {
    pub fn install(&mut self, info: LspInfo) {
        self.entries.push(Entry::new(info));
    }
}

impl EngineLsps for InMemoryLsps {
    type Handle = Entry<LspInfo>;

    fn reset_sent(&mut self) {
        for e in &mut self.entries {
            e.sent = false;
        }
    }

    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = (&mut Self::Handle, LspInfo)> + '_> {
        Box::new(self.entries.iter_mut().map(|e| {
            let info = e.data.clone();
            (e, info)
        }))
    }
}

#[derive(Default)]
pub struct InMemoryNhgs {
    entries: Vec<Entry<NexthopGroup>>,
}

impl InMemoryNhgs {
    pub fn install(&mut self, group: NexthopGroup) {
        self.entries.push(Entry::new(group));
    }
}

impl EngineNhgs for InMemoryNhgs {
    type Handle = Entry<NexthopGroup>;

    fn reset_sent(&mut self) {
        for e in &mut self.entries {
            e.sent = false;
        }
    }

    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = (&mut Self::Handle, NexthopGroup)> + '_> {
        Box::new(self.entries.iter_mut().map(|e| {
            let group = e.data.clone();
            (e, group)
        }))
    }
}

#[derive(Default)]
pub struct InMemoryRib {
    entries: Vec<Entry<DplaneContext>>,
}

impl InMemoryRib {
    pub fn install(&mut self, ctx: DplaneContext) {
        self.entries.push(Entry::new(ctx));
    }
}

impl EngineRib for InMemoryRib {
    type Handle = Entry<DplaneContext>;

    fn reset_sent(&mut self) {
        for e in &mut self.entries {
            e.sent = false;
        }
    }

    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = (&mut Self::Handle, DplaneContext)> + '_> {
        Box::new(self.entries.iter_mut().map(|e| {
            let ctx = e.data.clone();
            (e, ctx)
        }))
    }

    fn reset_sent_srv6(&mut self) {
        for e in &mut self.entries {
            if is_srv6_destination(&e.data) {
                e.sent = false;
            }
        }
    }
}

#[derive(Default)]
pub struct InMemoryRmacs {
    entries: Vec<Entry<RmacInfo>>,
}

impl InMemoryRmacs {
    pub fn install(&mut self, info: RmacInfo) {
        self.entries.push(Entry::new(info));
    }
}

impl EngineRmacs for InMemoryRmacs {
    type Handle = Entry<RmacInfo>;

    fn reset_sent(&mut self) {
        for e in &mut self.entries {
            e.sent = false;
        }
    }

    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = (&mut Self::Handle, RmacInfo)> + '_> {
        Box::new(self.entries.iter_mut().map(|e| {
            let info = e.data;
            (e, info)
        }))
    }
}

/// VRF-name and SRv6-locator resolution, held as its own field so
/// [`InMemoryEngine::rib_and_lookup`] can hand out a disjoint borrow of
/// it alongside a mutable borrow of the RIB.
#[derive(Default)]
pub struct Lookup {
    pub vrf_names: HashMap<u32, String>,
    pub locators: Vec<(Ipv6Addr, u8, Locator)>,
    pub lo_encap_source: Ipv6Addr,
}

impl EngineLookup for Lookup {
    fn vrf_name(&self, table_id: u32) -> Option<String> {
        self.vrf_names.get(&table_id).cloned()
    }

    fn match_locator(&self, sid: Ipv6Addr) -> Option<Locator> {
        self.locators
            .iter()
            .find(|(prefix, prefix_len, _)| sid_in_prefix(sid, *prefix, *prefix_len))
            .map(|(_, _, locator)| *locator)
    }

    fn lo_encap_source(&self) -> Ipv6Addr {
        self.lo_encap_source
    }
}

fn sid_in_prefix(sid: Ipv6Addr, prefix: Ipv6Addr, prefix_len: u8) -> bool {
    let sid = u128::from(sid);
    let prefix = u128::from(prefix);
    let mask = if prefix_len == 0 {
        0
    } else {
        u128::MAX << (128 - prefix_len as u32)
    };
    (sid & mask) == (prefix & mask)
}

/// The aggregate in-memory engine: four tables, a lookup side-table, and
/// a log of route-notifies received from the peer.
#[derive(Default)]
pub struct InMemoryEngine {
    pub lsps: InMemoryLsps,
    pub nhgs: InMemoryNhgs,
    pub rib: InMemoryRib,
    pub rmacs: InMemoryRmacs,
    pub lookup: Lookup,
    pub notifies: Vec<RouteNotify>,
}

impl EngineLookup for InMemoryEngine {
    fn vrf_name(&self, table_id: u32) -> Option<String> {
        self.lookup.vrf_name(table_id)
    }

    fn match_locator(&self, sid: Ipv6Addr) -> Option<Locator> {
        self.lookup.match_locator(sid)
    }

    fn lo_encap_source(&self) -> Ipv6Addr {
        self.lookup.lo_encap_source()
    }
}

impl EngineNotifySink for InMemoryEngine {
    fn on_route_notify(&mut self, notify: RouteNotify) {
        self.notifies.push(notify);
    }
}

impl Engine for InMemoryEngine {
    type Lsps = InMemoryLsps;
    type Nhgs = InMemoryNhgs;
    type Rib = InMemoryRib;
    type Rmacs = InMemoryRmacs;

    fn lsps(&mut self) -> &mut Self::Lsps {
        &mut self.lsps
    }

    fn nhgs(&mut self) -> &mut Self::Nhgs {
        &mut self.nhgs
    }

    fn rib(&mut self) -> &mut Self::Rib {
        &mut self.rib
    }

    fn rmacs(&mut self) -> &mut Self::Rmacs {
        &mut self.rmacs
    }

    fn rib_and_lookup(&mut self) -> (&mut Self::Rib, &dyn EngineLookup) {
        (&mut self.rib, &self.lookup)
    }
}
