//! Custom TLV numbering for the SRv6 localsid and SRv6 VPN encap
//! extensions. These numbers are the wire
//! contract with the FPM peer and must never be renumbered.

use crate::macros::impl_var;

impl_var!(
    /// Top level TLVs nested inside an `RTM_NEWSRV6LOCALSID` /
    /// `RTM_DELSRV6LOCALSID` message.
    Srv6LocalSidTlv, u16,
    SidValue => 1,
    Format => 2,
    Action => 3,
    VrfName => 4,
    Nh6 => 5,
    Nh4 => 6,
    Iif => 7,
    Oif => 8,
    Bpf => 9,
    SidList => 10,
    EncapSrcAddr => 11,
);

impl_var!(
    /// TLVs nested inside a [`Srv6LocalSidTlv::Format`] attribute.
    Srv6FormatTlv, u16,
    BlockLen => 1,
    NodeLen => 2,
    FuncLen => 3,
    ArgLen => 4,
);

impl_var!(
    /// TLVs nested inside an `RTA_ENCAP` attribute of type
    /// [`crate::consts::rtnl::FPM_ROUTE_ENCAP_SRV6`].
    Srv6VpnEncapTlv, u16,
    VpnSid => 1,
    EncapSrcAddr => 2,
);

impl_var!(
    /// SRv6 endpoint behavior codes, including the uSID variants
    /// substituted in when the matched locator has the uSID flag set.
    Srv6Action, u32,
    End => 1,
    EndX => 2,
    EndT => 3,
    EndDx2 => 4,
    EndDx6 => 5,
    EndDx4 => 6,
    EndDt6 => 7,
    EndDt4 => 8,
    EndDt46 => 9,
    B6Encaps => 10,
    B6EncapsRed => 11,
    B6Insert => 12,
    B6InsertRed => 13,
    Un => 14,
    Ua => 15,
    Udx2 => 16,
    Udx6 => 17,
    Udx4 => 18,
    Udt6 => 19,
    Udt4 => 20,
    Udt46 => 21,
);

impl Srv6Action {
    /// Substitute the uSID variant for an action when the matched
    /// locator carries the uSID flag.
    pub fn to_usid_variant(self) -> Option<Srv6Action> {
        match self {
            Srv6Action::End => Some(Srv6Action::Un),
            Srv6Action::EndX => Some(Srv6Action::Ua),
            Srv6Action::EndDx6 => Some(Srv6Action::Udx6),
            Srv6Action::EndDx4 => Some(Srv6Action::Udx4),
            Srv6Action::EndDt6 => Some(Srv6Action::Udt6),
            Srv6Action::EndDt4 => Some(Srv6Action::Udt4),
            Srv6Action::EndDt46 => Some(Srv6Action::Udt46),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn action_numbering_is_bit_exact() {
        assert_eq!(u32::from(Srv6Action::End), 1);
        assert_eq!(u32::from(Srv6Action::Udt4), 20);
        assert_eq!(u32::from(Srv6Action::Udt46), 21);
    }

    #[test]
    fn usid_substitution() {
        assert_eq!(Srv6Action::EndDt4.to_usid_variant(), Some(Srv6Action::Udt4));
        assert_eq!(Srv6Action::End.to_usid_variant(), Some(Srv6Action::Un));
        assert_eq!(Srv6Action::EndX.to_usid_variant(), Some(Srv6Action::Ua));
        assert_eq!(Srv6Action::B6Encaps.to_usid_variant(), None);
    }

    #[test]
    fn format_tlv_numbering() {
        assert_eq!(u16::from(Srv6FormatTlv::BlockLen), 1);
        assert_eq!(u16::from(Srv6FormatTlv::ArgLen), 4);
    }
}
