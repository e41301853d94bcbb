//! Netlink header constants: message types (`nlmsg_type`) and flags
//! (`nlmsg_flags`).

use bitflags::bitflags;

use crate::macros::impl_var;

impl_var!(
    /// `nlmsg_type` values this plugin emits or decodes.
    ///
    /// The `Srv6LocalSid` variants are the custom command remapping
    /// a custom command remapping: `RTM_NEWROUTE`/`RTM_DELROUTE` become
    /// `1000`/`1001` when the route carries an SRv6 localsid action.
    RtmType, u16,
    NewRoute => 24,
    DelRoute => 25,
    GetRoute => 26,
    NewNeigh => 28,
    DelNeigh => 29,
    NewNextHop => 104,
    DelNextHop => 105,
    GetNextHop => 106,
    NewSrv6LocalSid => 1000,
    DelSrv6LocalSid => 1001,
);

bitflags! {
    /// `nlmsg_flags`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct NlmF: u16 {
        const REQUEST = 0x0001;
        const MULTI   = 0x0002;
        const ACK     = 0x0004;
        const ECHO    = 0x0008;
        const ROOT    = 0x0100;
        const MATCH   = 0x0200;
        const ATOMIC  = 0x0400;
        /// Also doubles as `NLM_F_REPLACE` for request messages.
        const REPLACE = 0x0100;
        const EXCL    = 0x0200;
        const CREATE  = 0x0400;
        const APPEND  = 0x0800;
    }
}

/// Address families used in route/neighbor messages we build.
pub mod af {
    pub const INET: u8 = 2;
    pub const INET6: u8 = 10;
    pub const MPLS: u8 = 28;
    pub const BRIDGE: u8 = 7;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rtm_type_round_trips() {
        let v: u16 = RtmType::NewSrv6LocalSid.into();
        assert_eq!(v, 1000);
        assert_eq!(RtmType::from(1000), RtmType::NewSrv6LocalSid);
        assert_eq!(RtmType::from(9999), RtmType::UnrecognizedVariant(9999));
    }

    #[test]
    fn nlmf_install_flags() {
        let flags = NlmF::REQUEST | NlmF::CREATE | NlmF::REPLACE;
        assert!(flags.contains(NlmF::REQUEST));
        assert!(flags.contains(NlmF::CREATE));
        assert_eq!(flags.bits(), 0x0001 | 0x0400 | 0x0100);
    }
}
