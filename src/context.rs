//! Dataplane operation contexts handed from the engine to the plugin
//! The engine owns every [`DplaneContext`] before it is
//! dequeued and after it is finally pushed back onto the engine's output
//! queue; the plugin only ever borrows one long enough to encode it.

use std::net::{IpAddr, Ipv6Addr};

use derive_builder::Builder;

use crate::consts::tlv::Srv6Action;

/// An IPv4 or IPv6 network prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Prefix {
    pub addr: IpAddr,
    pub prefix_len: u8,
}

impl Prefix {
    pub fn new(addr: IpAddr, prefix_len: u8) -> Self {
        Prefix { addr, prefix_len }
    }

    pub fn is_v6(&self) -> bool {
        matches!(self.addr, IpAddr::V6(_))
    }
}

/// One nexthop within a [`NexthopGroup`], including the SRv6 extensions a
/// route's selected nexthop may carry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Nexthop {
    pub gateway: Option<IpAddr>,
    pub ifindex: u32,
    pub ifname: Option<String>,
    pub weight: Option<u8>,
    /// Non-`None` when this nexthop is an SRv6 localsid endpoint
    /// ("SRv6 localsid route").
    pub seg6local_action: Option<Srv6Action>,
    /// The SRv6 VPN SID this nexthop encapsulates into, when nonzero
    /// ("SRv6 VPN route"). `seg6local_action` and this
    /// field are mutually exclusive.
    pub seg6_vpn_sid: Option<Ipv6Addr>,
}

impl Nexthop {
    pub fn plain(gateway: Option<IpAddr>, ifindex: u32, ifname: impl Into<String>) -> Self {
        Nexthop {
            gateway,
            ifindex,
            ifname: Some(ifname.into()),
            ..Default::default()
        }
    }
}

/// A reusable set of nexthops a route may select.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NexthopGroup {
    pub id: Option<u32>,
    pub nexthops: Vec<Nexthop>,
}

impl NexthopGroup {
    pub fn single(nh: Nexthop) -> Self {
        NexthopGroup {
            id: None,
            nexthops: vec![nh],
        }
    }

    pub fn is_multipath(&self) -> bool {
        self.nexthops.len() > 1
    }

    /// The nexthop the route encoder should inspect for SRv6 extensions:
    /// the single selected nexthop (multipath SRv6 is not modeled by the
    /// upstream protocol and is out of scope here).
    pub fn selected(&self) -> Option<&Nexthop> {
        if self.nexthops.len() == 1 {
            self.nexthops.first()
        } else {
            None
        }
    }
}

/// Incoming label and its outgoing actions for one LSP table entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LspInfo {
    pub in_label: u32,
    pub nexthops: Vec<LspNexthop>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LspNexthop {
    pub out_label: Option<u32>,
    pub gateway: Option<IpAddr>,
    pub ifindex: u32,
}

/// A router-MAC entry for an EVPN L3VNI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RmacInfo {
    pub vni: u32,
    pub mac: [u8; 6],
    pub vtep: IpAddr,
    /// Index of the VXLAN device this FDB entry belongs to (`ndm_ifindex`).
    pub ifindex: u32,
}

/// The kind of dataplane operation a context represents. Kinds not
/// handled elsewhere (address changes aside) collapse
/// into [`DplaneOp::Other`] and are never encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DplaneOp {
    RouteInstall,
    RouteUpdate { old_proto: u8, new_proto: u8 },
    RouteDelete,
    NhInstall,
    NhUpdate,
    NhDelete,
    LspInstall,
    LspUpdate,
    LspDelete,
    MacInstall,
    MacDelete,
    /// Address install/uninstall on an interface; only "lo" addresses are
    /// meaningful to the core (drives `fpm_srv6_route_reset`).
    AddrInstall,
    AddrUninstall,
    /// Anything else the engine may hand over; silently ignored.
    Other,
}

impl DplaneOp {
    pub fn is_route(&self) -> bool {
        matches!(
            self,
            DplaneOp::RouteInstall | DplaneOp::RouteUpdate { .. } | DplaneOp::RouteDelete
        )
    }

    pub fn is_nexthop_group(&self) -> bool {
        matches!(self, DplaneOp::NhInstall | DplaneOp::NhUpdate | DplaneOp::NhDelete)
    }

    pub fn is_delete(&self) -> bool {
        matches!(
            self,
            DplaneOp::RouteDelete | DplaneOp::NhDelete | DplaneOp::LspDelete | DplaneOp::MacDelete
        )
    }
}

/// One dataplane operation the engine is notifying the plugin about.
#[derive(Clone, Debug, Builder)]
#[builder(setter(strip_option), build_fn(validate = "Self::validate"))]
pub struct DplaneContext {
    pub op: DplaneOp,
    #[builder(default)]
    pub prefix: Option<Prefix>,
    #[builder(default)]
    pub nhg: Option<NexthopGroup>,
    #[builder(default)]
    pub table_id: u32,
    #[builder(default)]
    pub vrf_id: u32,
    #[builder(default)]
    pub protocol: u8,
    #[builder(default)]
    pub ifname: Option<String>,
    /// Whether the engine signals replace semantics for a v6 install
    /// v4 installs always carry `REPLACE` regardless of
    /// this flag.
    #[builder(default = "true")]
    pub replace: bool,
    #[builder(default)]
    pub lsp: Option<LspInfo>,
    #[builder(default)]
    pub mac: Option<RmacInfo>,
}

impl DplaneContextBuilder {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl DplaneContext {
    /// True for a `DPLANE_OP_ADDR_{IN,UN}INSTALL` on interface `lo`
    /// the encap source address candidate list may have
    /// changed, and the RIB walker's SRv6 destinations need re-marking.
    pub fn is_lo_address_change(&self) -> bool {
        matches!(self.op, DplaneOp::AddrInstall | DplaneOp::AddrUninstall)
            && self.ifname.as_deref() == Some("lo")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn selected_nexthop_requires_singlepath() {
        let nhg = NexthopGroup {
            id: None,
            nexthops: vec![Nexthop::default(), Nexthop::default()],
        };
        assert!(nhg.selected().is_none());
        assert!(nhg.is_multipath());
    }

    #[test]
    fn builder_defaults_optional_fields() {
        let ctx = DplaneContextBuilder::default()
            .op(DplaneOp::RouteDelete)
            .build()
            .unwrap();
        assert!(ctx.prefix.is_none());
        assert_eq!(ctx.table_id, 0);
    }
}
