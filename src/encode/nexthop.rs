//! Nexthop-group encoding: `RTM_NEWNEXTHOP`/`RTM_DELNEXTHOP`.
//!
//! Entirely suppressed when the plugin has nexthop-group replication
//! toggled off; the RIB encoder falls back to inlining gateways/oifs
//! directly on each route in that mode.

use crate::{
    attr::TlvWriter,
    consts::nl::{NlmF, RtmType},
    context::{DplaneContext, DplaneOp, NexthopGroup},
    encode::{addr_bytes, family_of},
    err::EncodeError,
    nl::wrap_nlmsg,
};

fn nhmsg_fixed(family: u8) -> [u8; 4] {
    // struct nhmsg { nh_family, nh_scope, nh_protocol, resvd }
    [family, 0, 0, 0]
}

/// Encode one nexthop-group context. Returns `Ok(None)` for anything that
/// is not a nexthop-group operation.
pub fn encode_nexthop(ctx: &DplaneContext) -> Result<Option<Vec<u8>>, EncodeError> {
    if !ctx.op.is_nexthop_group() {
        return Ok(None);
    }
    let is_delete = matches!(ctx.op, DplaneOp::NhDelete);
    let nhg = ctx.nhg.as_ref().ok_or(EncodeError::InvalidNexthop)?;
    let id = nhg.id.ok_or(EncodeError::InvalidNexthop)?;

    let mut tlv = TlvWriter::new();
    tlv.push_u32(crate::consts::rtnl::Nha::Id, id);

    let (msg_type, flags) = if is_delete {
        (RtmType::DelNextHop, NlmF::REQUEST)
    } else {
        (
            RtmType::NewNextHop,
            NlmF::REQUEST | NlmF::CREATE | NlmF::REPLACE,
        )
    };

    if !is_delete {
        encode_nhg_body(&mut tlv, nhg)?;
    }

    let family = nhg
        .nexthops
        .first()
        .and_then(|nh| nh.gateway)
        .map(|addr| family_of(&addr))
        .unwrap_or(crate::consts::nl::af::INET);

    let fixed = nhmsg_fixed(family);
    let mut payload = Vec::with_capacity(fixed.len() + tlv.len());
    payload.extend_from_slice(&fixed);
    payload.extend_from_slice(tlv.as_bytes());
    Ok(Some(wrap_nlmsg(msg_type.into(), flags, &payload)))
}

fn encode_nhg_body(tlv: &mut TlvWriter, nhg: &NexthopGroup) -> Result<(), EncodeError> {
    if nhg.is_multipath() {
        let mut group = Vec::new();
        for nh in &nhg.nexthops {
            // struct nexthop_grp { id: u32, weight: u8, resvd1: u8, resvd2: u16 }
            group.extend_from_slice(&nh.ifindex.to_ne_bytes());
            group.push(nh.weight.unwrap_or(0));
            group.push(0);
            group.extend_from_slice(&0u16.to_ne_bytes());
        }
        tlv.push(crate::consts::rtnl::Nha::Group, &group);
        return Ok(());
    }

    let nh = nhg.nexthops.first().ok_or(EncodeError::InvalidNexthop)?;
    tlv.push_u32(crate::consts::rtnl::Nha::Oif, nh.ifindex);
    if let Some(gw) = nh.gateway {
        tlv.push(crate::consts::rtnl::Nha::Gateway, &addr_bytes(&gw));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::{DplaneContextBuilder, Nexthop};
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn non_nexthop_ops_are_skipped() {
        let ctx = DplaneContextBuilder::default()
            .op(DplaneOp::RouteInstall)
            .build()
            .unwrap();
        assert!(encode_nexthop(&ctx).unwrap().is_none());
    }

    #[test]
    fn single_nexthop_group_carries_id_and_oif() {
        let nh = Nexthop::plain(Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))), 7, "eth0");
        let mut nhg = NexthopGroup::single(nh);
        nhg.id = Some(42);
        let ctx = DplaneContextBuilder::default()
            .op(DplaneOp::NhInstall)
            .nhg(nhg)
            .build()
            .unwrap();
        let msg = encode_nexthop(&ctx).unwrap().unwrap();
        let msg_type = u16::from_ne_bytes([msg[4], msg[5]]);
        assert_eq!(msg_type, u16::from(RtmType::NewNextHop));
        assert!(msg.windows(4).any(|w| w == 42u32.to_ne_bytes()));
    }

    #[test]
    fn delete_carries_only_id() {
        let nh = Nexthop::plain(None, 7, "eth0");
        let mut nhg = NexthopGroup::single(nh);
        nhg.id = Some(9);
        let ctx = DplaneContextBuilder::default()
            .op(DplaneOp::NhDelete)
            .nhg(nhg)
            .build()
            .unwrap();
        let msg = encode_nexthop(&ctx).unwrap().unwrap();
        let msg_type = u16::from_ne_bytes([msg[4], msg[5]]);
        assert_eq!(msg_type, u16::from(RtmType::DelNextHop));
    }
}
