//! Wire constants, broken down the way the routing netlink subsystem
//! itself is: frame-level constants in [`fpm`], message/flag constants in
//! [`nl`], route attribute constants in [`rtnl`], and the plugin's own
//! custom TLV numbering in [`tlv`].

pub mod fpm;
pub mod nl;
pub mod rtnl;
pub mod tlv;
