//! Routing-netlink attribute and `rtm_*` field constants (`man 7 rtnetlink`).
//!
//! These are stable kernel ABI numbers; they are defined locally rather
//! than pulled from `libc` so the crate isn't at the mercy of which of
//! them a given libc binding happens to expose for the target triple.

use crate::macros::impl_var;

impl_var!(
    /// `Rtattr.rta_type` for `RTM_{NEW,DEL}ROUTE` messages.
    Rta, u16,
    Unspec => 0,
    Dst => 1,
    Src => 2,
    Iif => 3,
    Oif => 4,
    Gateway => 5,
    Priority => 6,
    Prefsrc => 7,
    Metrics => 8,
    Multipath => 9,
    Flow => 11,
    Cacheinfo => 12,
    Table => 15,
    Mark => 16,
    Via => 18,
    Newdst => 19,
    Pref => 20,
    EncapType => 21,
    Encap => 22,
);

impl_var!(
    /// `Rtattr.rta_type` for `RTM_{NEW,DEL}NEIGH` (used for RMAC/FDB).
    Nda, u16,
    Unspec => 0,
    Dst => 1,
    Lladdr => 2,
    Cacheinfo => 3,
    Probes => 4,
    Vlan => 5,
    Port => 6,
    Vni => 7,
    Ifindex => 8,
    Master => 9,
    SrcVni => 11,
);

impl_var!(
    /// `Rtattr.rta_type` for `RTM_{NEW,DEL}NEXTHOP`.
    Nha, u16,
    Unspec => 0,
    Id => 1,
    Group => 2,
    GroupType => 3,
    Blackhole => 4,
    Oif => 5,
    Gateway => 6,
    EncapType => 7,
    Encap => 8,
    Groups => 9,
    Master => 10,
    Fdb => 11,
);

impl_var!(
    /// Reserved routing table identifiers (`rt_class_t`).
    RtTable, u32,
    Unspec => 0,
    Default => 253,
    Main => 254,
    Local => 255,
);

/// `rtm_type` values.
pub mod rtn {
    pub const UNSPEC: u8 = 0;
    pub const UNICAST: u8 = 1;
    pub const BLACKHOLE: u8 = 6;
    pub const UNREACHABLE: u8 = 7;
    pub const PROHIBIT: u8 = 8;
}

/// `rtm_protocol` values (only the ones the encoders need).
pub mod rtprot {
    pub const UNSPEC: u8 = 0;
    pub const KERNEL: u8 = 2;
    pub const STATIC: u8 = 4;
}

/// `rtm_scope` values.
pub mod rtscope {
    pub const UNIVERSE: u8 = 0;
    pub const LINK: u8 = 253;
}

/// Route encapsulation type used in `RTA_ENCAP_TYPE`.
pub const FPM_ROUTE_ENCAP_SRV6: u16 = 101;

/// `NUD_*` neighbor cache states used for router-MAC entries.
pub mod nud {
    pub const PERMANENT: u16 = 0x80;
    pub const NOARP: u16 = 0x40;
}

/// `NTF_*` neighbor cache flags used for router-MAC entries.
pub mod ntf {
    pub const SELF_: u8 = 0x02;
    pub const EXT_LEARNED: u8 = 0x10;
}
