//! MPLS LSP encoding, modeled as `RTM_NEWROUTE`/`RTM_DELROUTE` with
//! `AF_MPLS` family: the kernel's MPLS dataplane is just another RIB
//! under that address family, keyed by incoming label instead of a
//! prefix.

use byteorder::{NativeEndian, WriteBytesExt};

use crate::{
    attr::TlvWriter,
    consts::{
        nl::{af, NlmF, RtmType},
        rtnl::{rtn, rtprot, rtscope, Rta},
    },
    context::{DplaneContext, DplaneOp, LspInfo},
    encode::addr_bytes,
    err::EncodeError,
    nl::wrap_nlmsg,
};

/// `mpls_label` encoding: 20-bit label, 3-bit TC, 1-bit bottom-of-stack,
/// 8-bit TTL, packed big-endian as the kernel expects on the wire.
fn encode_mpls_label(label: u32, bos: bool) -> [u8; 4] {
    let mut word = (label & 0x000F_FFFF) << 12;
    if bos {
        word |= 1 << 8;
    }
    word.to_be_bytes()
}

fn encode_label_stack(labels: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(labels.len() * 4);
    let last = labels.len().saturating_sub(1);
    for (i, label) in labels.iter().enumerate() {
        out.extend_from_slice(&encode_mpls_label(*label, i == last));
    }
    out
}

/// Encode one LSP context. Returns `Ok(None)` for anything that is not
/// an LSP operation.
pub fn encode_lsp(ctx: &DplaneContext) -> Result<Option<Vec<u8>>, EncodeError> {
    if !matches!(
        ctx.op,
        DplaneOp::LspInstall | DplaneOp::LspUpdate | DplaneOp::LspDelete
    ) {
        return Ok(None);
    }
    let is_delete = matches!(ctx.op, DplaneOp::LspDelete);
    let lsp = ctx.lsp.as_ref().ok_or(EncodeError::Unsupported)?;

    let mut tlv = TlvWriter::new();
    tlv.push(Rta::Dst, &encode_mpls_label(lsp.in_label, true));

    let (msg_type, flags) = if is_delete {
        (RtmType::DelRoute, NlmF::REQUEST)
    } else {
        encode_lsp_nexthops(&mut tlv, lsp)?;
        (RtmType::NewRoute, NlmF::REQUEST | NlmF::CREATE | NlmF::REPLACE)
    };

    // struct rtmsg, family AF_MPLS, 20-bit label as the "address" being
    // matched so dst_len is the full label width.
    let mut rtm = [0u8; 12];
    rtm[0] = af::MPLS;
    rtm[1] = 20;
    rtm[4] = 0; // rtm_table: MPLS has a single implicit table
    rtm[5] = rtprot::STATIC;
    rtm[6] = rtscope::UNIVERSE;
    rtm[7] = rtn::UNICAST;

    let mut payload = Vec::with_capacity(rtm.len() + tlv.len());
    payload.extend_from_slice(&rtm);
    payload.extend_from_slice(tlv.as_bytes());
    Ok(Some(wrap_nlmsg(msg_type.into(), flags, &payload)))
}

fn encode_lsp_nexthops(tlv: &mut TlvWriter, lsp: &LspInfo) -> Result<(), EncodeError> {
    if lsp.nexthops.len() > 1 {
        let mut nested = Vec::new();
        for nh in &lsp.nexthops {
            let mut attrs = TlvWriter::new();
            if let Some(gw) = nh.gateway {
                attrs.push(Rta::Via, &addr_bytes(&gw));
            }
            if let Some(out_label) = nh.out_label {
                attrs.push(Rta::Newdst, &encode_label_stack(&[out_label]));
            }
            let header_len = 8;
            let rtnh_len = (header_len + attrs.len()) as u16;
            let mut entry = Vec::with_capacity(rtnh_len as usize);
            entry.write_u16::<NativeEndian>(rtnh_len).unwrap();
            entry.push(0); // rtnh_flags
            entry.push(0); // rtnh_hops
            entry.write_u32::<NativeEndian>(nh.ifindex).unwrap();
            entry.extend_from_slice(attrs.as_bytes());
            nested.extend_from_slice(&entry);
        }
        tlv.push(Rta::Multipath, &nested);
        return Ok(());
    }

    let nh = lsp.nexthops.first().ok_or(EncodeError::InvalidNexthop)?;
    tlv.push_u32(Rta::Oif, nh.ifindex);
    if let Some(gw) = nh.gateway {
        tlv.push(Rta::Via, &addr_bytes(&gw));
    }
    if let Some(out_label) = nh.out_label {
        tlv.push(Rta::Newdst, &encode_label_stack(&[out_label]));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::{DplaneContextBuilder, LspNexthop};
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn non_lsp_ops_are_skipped() {
        let ctx = DplaneContextBuilder::default()
            .op(DplaneOp::RouteInstall)
            .build()
            .unwrap();
        assert!(encode_lsp(&ctx).unwrap().is_none());
    }

    #[test]
    fn install_sets_mpls_family_and_label() {
        let lsp = LspInfo {
            in_label: 100,
            nexthops: vec![LspNexthop {
                out_label: Some(200),
                gateway: Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 2))),
                ifindex: 3,
            }],
        };
        let ctx = DplaneContextBuilder::default()
            .op(DplaneOp::LspInstall)
            .lsp(lsp)
            .build()
            .unwrap();
        let msg = encode_lsp(&ctx).unwrap().unwrap();
        assert_eq!(msg[16], af::MPLS);
        let msg_type = u16::from_ne_bytes([msg[4], msg[5]]);
        assert_eq!(msg_type, u16::from(RtmType::NewRoute));
    }

    #[test]
    fn delete_carries_only_in_label() {
        let lsp = LspInfo {
            in_label: 100,
            nexthops: vec![],
        };
        let ctx = DplaneContextBuilder::default()
            .op(DplaneOp::LspDelete)
            .lsp(lsp)
            .build()
            .unwrap();
        let msg = encode_lsp(&ctx).unwrap().unwrap();
        let msg_type = u16::from_ne_bytes([msg[4], msg[5]]);
        assert_eq!(msg_type, u16::from(RtmType::DelRoute));
    }
}
