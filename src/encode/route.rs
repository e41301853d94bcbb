//! Route encoding: plain multipath routes and the two SRv6 variants.

use std::net::{IpAddr, Ipv6Addr};

use byteorder::{NativeEndian, WriteBytesExt};

use crate::{
    attr::TlvWriter,
    consts::{
        nl::{af, NlmF, RtmType},
        rtnl::{rtn, rtprot, rtscope, Rta, RtTable, FPM_ROUTE_ENCAP_SRV6},
        tlv::{Srv6Action, Srv6FormatTlv, Srv6LocalSidTlv, Srv6VpnEncapTlv},
    },
    context::{DplaneContext, DplaneOp, Nexthop, Prefix},
    encode::{addr_bytes, family_of, table_field},
    engine::EngineLookup,
    err::EncodeError,
    nl::wrap_nlmsg,
};

fn rtmsg_fixed(family: u8, dst_len: u8, table_byte: u8, protocol: u8, scope: u8, rtype: u8) -> [u8; 12] {
    let mut buf = [0u8; 12];
    buf[0] = family;
    buf[1] = dst_len;
    buf[2] = 0; // rtm_src_len
    buf[3] = 0; // rtm_tos
    buf[4] = table_byte;
    buf[5] = protocol;
    buf[6] = scope;
    buf[7] = rtype;
    // buf[8..12] is rtm_flags (RTM_F_*), left at 0: none of our encoders
    // set them.
    buf
}

fn encode_rtnexthop(nh: &Nexthop) -> Vec<u8> {
    let mut attrs = TlvWriter::new();
    if let Some(gw) = nh.gateway {
        attrs.push(Rta::Gateway, &addr_bytes(&gw));
    }
    let header_len = 8;
    let mut out = Vec::with_capacity(header_len + attrs.len());
    let rtnh_len = (header_len + attrs.len()) as u16;
    out.write_u16::<NativeEndian>(rtnh_len).unwrap();
    out.push(0); // rtnh_flags
    out.push(nh.weight.unwrap_or(0)); // rtnh_hops
    out.write_u32::<NativeEndian>(nh.ifindex).unwrap();
    out.extend_from_slice(attrs.as_bytes());
    out
}

fn nlm_install_flags(is_v6: bool, replace: bool) -> NlmF {
    let mut flags = NlmF::REQUEST | NlmF::CREATE;
    if !is_v6 || replace {
        flags |= NlmF::REPLACE;
    }
    flags
}

/// Encode a single (non-update) route context into zero or one netlink
/// messages. Returns `Ok(None)` for the silently-dropped default-table
/// case.
fn encode_single(
    ctx: &DplaneContext,
    lookup: &dyn EngineLookup,
) -> Result<Option<Vec<u8>>, EncodeError> {
    if ctx.table_id == u32::from(RtTable::Default) {
        return Ok(None);
    }
    let prefix = ctx.prefix.ok_or(EncodeError::Unsupported)?;
    let nhg = ctx.nhg.as_ref();
    let is_delete = matches!(ctx.op, DplaneOp::RouteDelete);
    let selected = nhg.and_then(|g| g.selected());

    if let Some(nh) = selected {
        if let Some(action) = nh.seg6local_action {
            return encode_srv6_localsid(ctx, prefix, nh, action, is_delete, lookup).map(Some);
        }
        if nh.seg6_vpn_sid.is_some() {
            return encode_srv6_vpn(ctx, prefix, nh, is_delete, lookup).map(Some);
        }
    }
    encode_plain(ctx, prefix, nhg, is_delete).map(Some)
}

fn encode_plain(
    ctx: &DplaneContext,
    prefix: Prefix,
    nhg: Option<&crate::context::NexthopGroup>,
    is_delete: bool,
) -> Result<Vec<u8>, EncodeError> {
    let family = family_of(&prefix.addr);
    let (table_byte, table_attr) = table_field(ctx.vrf_id);

    let mut tlv = TlvWriter::new();
    tlv.push(Rta::Dst, &addr_bytes(&prefix.addr));
    if let Some(vrf_id) = table_attr {
        tlv.push_u32(Rta::Table, vrf_id);
    }

    match nhg {
        Some(g) if g.is_multipath() => {
            let mut nested = Vec::new();
            for nh in &g.nexthops {
                nested.extend_from_slice(&encode_rtnexthop(nh));
            }
            tlv.push(Rta::Multipath, &nested);
        }
        Some(g) => {
            let nh = g.nexthops.first().ok_or(EncodeError::InvalidNexthop)?;
            if let Some(gw) = nh.gateway {
                tlv.push(Rta::Gateway, &addr_bytes(&gw));
            }
            tlv.push_u32(Rta::Oif, nh.ifindex);
        }
        None if !is_delete => return Err(EncodeError::InvalidNexthop),
        None => {}
    }

    let (msg_type, flags) = if is_delete {
        (u16::from(RtmType::DelRoute), NlmF::REQUEST)
    } else {
        (
            u16::from(RtmType::NewRoute),
            nlm_install_flags(prefix.is_v6(), ctx.replace),
        )
    };

    let rtm = rtmsg_fixed(
        family,
        prefix.prefix_len,
        table_byte,
        rtprot::STATIC,
        rtscope::UNIVERSE,
        rtn::UNICAST,
    );
    let mut payload = Vec::with_capacity(rtm.len() + tlv.len());
    payload.extend_from_slice(&rtm);
    payload.extend_from_slice(tlv.as_bytes());
    Ok(wrap_nlmsg(msg_type, flags, &payload))
}

fn encode_srv6_localsid(
    ctx: &DplaneContext,
    prefix: Prefix,
    nh: &Nexthop,
    action: Srv6Action,
    is_delete: bool,
    lookup: &dyn EngineLookup,
) -> Result<Vec<u8>, EncodeError> {
    let IpAddr::V6(sid) = prefix.addr else {
        return Err(EncodeError::InvalidNexthop);
    };
    let (table_byte, table_attr) = table_field(ctx.vrf_id);

    let locator = lookup.match_locator(sid);
    let effective_action = locator
        .filter(|l| l.is_usid)
        .and_then(|_| action.to_usid_variant())
        .unwrap_or(action);

    let mut tlv = TlvWriter::new();
    tlv.push(Srv6LocalSidTlv::SidValue, &sid.octets());
    if let Some(loc) = locator {
        let mut fmt = TlvWriter::new();
        if loc.block_len != 0 {
            fmt.push_u8(Srv6FormatTlv::BlockLen, loc.block_len);
        }
        if loc.node_len != 0 {
            fmt.push_u8(Srv6FormatTlv::NodeLen, loc.node_len);
        }
        if loc.func_len != 0 {
            fmt.push_u8(Srv6FormatTlv::FuncLen, loc.func_len);
        }
        if loc.arg_len != 0 {
            fmt.push_u8(Srv6FormatTlv::ArgLen, loc.arg_len);
        }
        if !fmt.is_empty() {
            tlv.push_nested(Srv6LocalSidTlv::Format, &fmt);
        }
    }
    tlv.push_u32(Srv6LocalSidTlv::Action, effective_action.into());

    use Srv6Action::*;
    match effective_action {
        EndX | EndDx6 | Ua | Udx6 => {
            let addr = match nh.gateway {
                Some(IpAddr::V6(v6)) => v6,
                _ => return Err(EncodeError::InvalidNexthop),
            };
            tlv.push(Srv6LocalSidTlv::Nh6, &addr.octets());
        }
        EndDx4 | Udx4 => {
            let addr = match nh.gateway {
                Some(IpAddr::V4(v4)) => v4,
                _ => return Err(EncodeError::InvalidNexthop),
            };
            tlv.push(Srv6LocalSidTlv::Nh4, &addr.octets());
        }
        EndT | EndDt6 | EndDt4 | EndDt46 | Udt6 | Udt4 | Udt46 => {
            let vrf_name = lookup
                .vrf_name(ctx.table_id)
                .ok_or(EncodeError::VrfNotFound)?;
            tlv.push_cstr(Srv6LocalSidTlv::VrfName, &vrf_name);
        }
        _ => {}
    }

    let msg_type = if is_delete {
        RtmType::DelSrv6LocalSid
    } else {
        RtmType::NewSrv6LocalSid
    };
    let flags = if is_delete {
        NlmF::REQUEST
    } else {
        nlm_install_flags(true, ctx.replace)
    };

    let rtm = rtmsg_fixed(
        af::INET6,
        prefix.prefix_len,
        table_byte,
        rtprot::STATIC,
        rtscope::UNIVERSE,
        rtn::UNICAST,
    );
    let mut payload = Vec::with_capacity(rtm.len() + tlv.len() + 8);
    payload.extend_from_slice(&rtm);
    if let Some(vrf_id) = table_attr {
        let mut table_tlv = TlvWriter::new();
        table_tlv.push_u32(Rta::Table, vrf_id);
        payload.extend_from_slice(table_tlv.as_bytes());
    }
    payload.extend_from_slice(tlv.as_bytes());
    Ok(wrap_nlmsg(msg_type.into(), flags, &payload))
}

fn encode_srv6_vpn(
    ctx: &DplaneContext,
    prefix: Prefix,
    nh: &Nexthop,
    is_delete: bool,
    lookup: &dyn EngineLookup,
) -> Result<Vec<u8>, EncodeError> {
    let vpn_sid: Ipv6Addr = nh.seg6_vpn_sid.ok_or(EncodeError::InvalidNexthop)?;
    let family = family_of(&prefix.addr);
    let (table_byte, table_attr) = table_field(ctx.vrf_id);
    let src_addr = lookup.lo_encap_source();

    let mut encap = TlvWriter::new();
    encap.push(Srv6VpnEncapTlv::EncapSrcAddr, &src_addr.octets());
    encap.push(Srv6VpnEncapTlv::VpnSid, &vpn_sid.octets());

    let mut tlv = TlvWriter::new();
    tlv.push(Rta::Dst, &addr_bytes(&prefix.addr));
    if let Some(vrf_id) = table_attr {
        tlv.push_u32(Rta::Table, vrf_id);
    }
    // SRv6 VPN routes forward purely via encapsulation: no RTA_GATEWAY,
    // just the egress interface and the encap attributes.
    tlv.push_u32(Rta::Oif, nh.ifindex);
    tlv.push_raw(u16::from(Rta::EncapType), &FPM_ROUTE_ENCAP_SRV6.to_ne_bytes());
    tlv.push_nested(Rta::Encap, &encap);
    let bytes = tlv.into_bytes();

    let (msg_type, flags) = if is_delete {
        (RtmType::DelRoute, NlmF::REQUEST)
    } else {
        (RtmType::NewRoute, nlm_install_flags(prefix.is_v6(), ctx.replace))
    };
    let rtm = rtmsg_fixed(
        family,
        prefix.prefix_len,
        table_byte,
        rtprot::STATIC,
        rtscope::UNIVERSE,
        rtn::UNICAST,
    );
    let mut payload = Vec::with_capacity(rtm.len() + bytes.len());
    payload.extend_from_slice(&rtm);
    payload.extend_from_slice(&bytes);
    Ok(wrap_nlmsg(msg_type.into(), flags, &payload))
}

/// Encode a route context, expanding `RouteUpdate` into a DEL followed by
/// an INSTALL. Returns one message per non-update op,
/// two for an update, or zero when the route is silently dropped.
pub fn encode_route(
    ctx: &DplaneContext,
    lookup: &dyn EngineLookup,
) -> Result<Vec<Vec<u8>>, EncodeError> {
    if let DplaneOp::RouteUpdate { .. } = ctx.op {
        let mut del_ctx = ctx.clone();
        del_ctx.op = DplaneOp::RouteDelete;
        let mut ins_ctx = ctx.clone();
        ins_ctx.op = DplaneOp::RouteInstall;

        let mut out = Vec::with_capacity(2);
        if let Some(del) = encode_single(&del_ctx, lookup)? {
            out.push(del);
        }
        if let Some(ins) = encode_single(&ins_ctx, lookup)? {
            out.push(ins);
        }
        Ok(out)
    } else {
        Ok(encode_single(ctx, lookup)?.into_iter().collect())
    }
}
