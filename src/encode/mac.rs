//! Router-MAC (EVPN L3VNI) encoding: `RTM_NEWNEIGH`/`RTM_DELNEIGH` FDB
//! entries, keyed by the MAC rather than an IP destination.

use crate::{
    attr::TlvWriter,
    consts::{
        nl::{af, NlmF, RtmType},
        rtnl::{nud, ntf, Nda},
    },
    context::{DplaneContext, DplaneOp, RmacInfo},
    encode::addr_bytes,
    err::EncodeError,
    nl::wrap_nlmsg,
};

fn ndmsg_fixed(family: u8, ifindex: u32, state: u16, flags: u8) -> [u8; 12] {
    let mut buf = [0u8; 12];
    buf[0] = family;
    // buf[1] ndm_pad1, buf[2..4] ndm_pad2
    buf[4..8].copy_from_slice(&(ifindex as i32).to_ne_bytes());
    buf[8..10].copy_from_slice(&state.to_ne_bytes());
    buf[10] = flags;
    buf[11] = 0; // ndm_type
    buf
}

/// Encode one router-MAC context. Returns `Ok(None)` for anything that
/// is not a MAC operation.
pub fn encode_mac(ctx: &DplaneContext) -> Result<Option<Vec<u8>>, EncodeError> {
    if !matches!(ctx.op, DplaneOp::MacInstall | DplaneOp::MacDelete) {
        return Ok(None);
    }
    let is_delete = matches!(ctx.op, DplaneOp::MacDelete);
    let mac: &RmacInfo = ctx.mac.as_ref().ok_or(EncodeError::Unsupported)?;

    let mut tlv = TlvWriter::new();
    tlv.push(Nda::Lladdr, &mac.mac);
    tlv.push(Nda::Dst, &addr_bytes(&mac.vtep));
    tlv.push_u32(Nda::Vni, mac.vni);

    let (msg_type, flags) = if is_delete {
        (RtmType::DelNeigh, NlmF::REQUEST)
    } else {
        (RtmType::NewNeigh, NlmF::REQUEST | NlmF::CREATE | NlmF::REPLACE)
    };

    let state = nud::PERMANENT | nud::NOARP;
    let ndm_flags = ntf::SELF_ | ntf::EXT_LEARNED;
    let fixed = ndmsg_fixed(af::BRIDGE, mac.ifindex, state, ndm_flags);

    let mut payload = Vec::with_capacity(fixed.len() + tlv.len());
    payload.extend_from_slice(&fixed);
    payload.extend_from_slice(tlv.as_bytes());
    Ok(Some(wrap_nlmsg(msg_type.into(), flags, &payload)))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::DplaneContextBuilder;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn non_mac_ops_are_skipped() {
        let ctx = DplaneContextBuilder::default()
            .op(DplaneOp::RouteInstall)
            .build()
            .unwrap();
        assert!(encode_mac(&ctx).unwrap().is_none());
    }

    #[test]
    fn install_carries_lladdr_vtep_and_vni() {
        let mac = RmacInfo {
            vni: 5000,
            mac: [0x02, 0x00, 0x00, 0x00, 0x00, 0x01],
            vtep: IpAddr::V4(Ipv4Addr::new(198, 51, 100, 9)),
            ifindex: 12,
        };
        let ctx = DplaneContextBuilder::default()
            .op(DplaneOp::MacInstall)
            .mac(mac)
            .build()
            .unwrap();
        let msg = encode_mac(&ctx).unwrap().unwrap();
        let msg_type = u16::from_ne_bytes([msg[4], msg[5]]);
        assert_eq!(msg_type, u16::from(RtmType::NewNeigh));
        assert!(msg.windows(6).any(|w| w == [0x02, 0x00, 0x00, 0x00, 0x00, 0x01]));
        let ndm_ifindex = i32::from_ne_bytes(msg[20..24].try_into().unwrap());
        assert_eq!(ndm_ifindex, 12);
    }

    #[test]
    fn delete_uses_delneigh() {
        let mac = RmacInfo {
            vni: 5000,
            mac: [0; 6],
            vtep: IpAddr::V4(Ipv4Addr::new(198, 51, 100, 9)),
            ifindex: 12,
        };
        let ctx = DplaneContextBuilder::default()
            .op(DplaneOp::MacDelete)
            .mac(mac)
            .build()
            .unwrap();
        let msg = encode_mac(&ctx).unwrap().unwrap();
        let msg_type = u16::from_ne_bytes([msg[4], msg[5]]);
        assert_eq!(msg_type, u16::from(RtmType::DelNeigh));
    }
}
