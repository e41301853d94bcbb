//! Decoding of inbound messages from the FPM peer.
//!
//! Only `RTM_NEWROUTE` is meaningful inbound: the peer echoes back
//! routes it learned from other sources so they can be redistributed.
//! Everything else is logged and dropped.

use std::net::IpAddr;

use log::debug;

use crate::{
    consts::{
        nl::{af, NlmF, RtmType},
        rtnl::Rta,
    },
    err::FrameError,
    nl::{NlmsghdrView, NLMSGHDR_LEN},
};

/// A route the peer notified us about, translated from raw attributes
/// into the handful of fields the engine's redistribution path needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteNotify {
    pub addr: IpAddr,
    pub prefix_len: u8,
    pub table_id: u8,
    pub protocol: u8,
    pub gateway: Option<IpAddr>,
    pub oif: Option<u32>,
}

/// Parse one netlink message payload (header already stripped by the
/// frame decoder). Returns `Ok(None)` for message types other than
/// `RTM_NEWROUTE`, which this plugin has no use for inbound.
pub fn decode_route_notify(payload: &[u8]) -> Result<Option<RouteNotify>, FrameError> {
    let view = NlmsghdrView::parse(payload).ok_or(FrameError::ShortLength(payload.len() as u16))?;
    if (view.nlmsg_len as usize) < NLMSGHDR_LEN {
        return Err(FrameError::ShortNlmsgLen(view.nlmsg_len));
    }
    if view.nlmsg_len as usize > payload.len() {
        return Err(FrameError::InnerTooLong {
            nlmsg_len: view.nlmsg_len,
            payload_len: payload.len(),
        });
    }
    if RtmType::from(view.nlmsg_type) != RtmType::NewRoute {
        return Ok(None);
    }
    if !NlmF::from_bits_truncate(view.nlmsg_flags).contains(NlmF::REQUEST) {
        debug!("fpm: skipping non-request route-notify (nlmsg_flags={:#x})", view.nlmsg_flags);
        return Ok(None);
    }

    let body = &payload[NLMSGHDR_LEN..view.nlmsg_len as usize];
    if body.len() < 12 {
        return Err(FrameError::ShortLength(body.len() as u16));
    }
    let family = body[0];
    let prefix_len = body[1];
    let table_id = body[4];
    let protocol = body[5];

    let mut addr = None;
    let mut gateway = None;
    let mut oif = None;
    let mut cursor = 12;
    while cursor + 4 <= body.len() {
        let rta_len = u16::from_ne_bytes([body[cursor], body[cursor + 1]]) as usize;
        if rta_len < 4 || cursor + rta_len > body.len() {
            break;
        }
        let rta_type = u16::from_ne_bytes([body[cursor + 2], body[cursor + 3]]);
        let attr_payload = &body[cursor + 4..cursor + rta_len];
        match Rta::from(rta_type) {
            Rta::Dst => addr = parse_addr(family, attr_payload),
            Rta::Gateway => gateway = parse_addr(family, attr_payload),
            Rta::Oif => {
                if attr_payload.len() == 4 {
                    oif = Some(u32::from_ne_bytes(attr_payload.try_into().unwrap()));
                }
            }
            _ => {}
        }
        cursor += crate::attr::alignto(rta_len);
    }

    let addr = match addr {
        Some(a) => a,
        None => return Ok(None),
    };

    Ok(Some(RouteNotify {
        addr,
        prefix_len,
        table_id,
        protocol,
        gateway,
        oif,
    }))
}

fn parse_addr(family: u8, bytes: &[u8]) -> Option<IpAddr> {
    if family == af::INET && bytes.len() == 4 {
        Some(IpAddr::from(<[u8; 4]>::try_from(bytes).unwrap()))
    } else if family == af::INET6 && bytes.len() == 16 {
        Some(IpAddr::from(<[u8; 16]>::try_from(bytes).unwrap()))
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        attr::TlvWriter,
        consts::{nl::NlmF, rtnl::Rta},
        nl::wrap_nlmsg,
    };
    use std::net::Ipv4Addr;

    #[test]
    fn decodes_new_route_with_dst_and_gateway() {
        let mut tlv = TlvWriter::new();
        tlv.push(Rta::Dst, &[10, 0, 0, 0]);
        tlv.push(Rta::Gateway, &[192, 0, 2, 1]);
        tlv.push_u32(Rta::Oif, 3);
        let mut rtm = [0u8; 12];
        rtm[0] = af::INET;
        rtm[1] = 24;
        rtm[4] = 254;
        rtm[5] = 2; // rtprot kernel
        let mut payload = rtm.to_vec();
        payload.extend_from_slice(tlv.as_bytes());
        let msg = wrap_nlmsg(u16::from(RtmType::NewRoute), NlmF::REQUEST, &payload);

        let notify = decode_route_notify(&msg).unwrap().unwrap();
        assert_eq!(notify.addr, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0)));
        assert_eq!(notify.prefix_len, 24);
        assert_eq!(notify.gateway, Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))));
        assert_eq!(notify.oif, Some(3));
    }

    #[test]
    fn ignores_non_route_messages() {
        let msg = wrap_nlmsg(u16::from(RtmType::NewNeigh), NlmF::REQUEST, &[0u8; 12]);
        assert!(decode_route_notify(&msg).unwrap().is_none());
    }

    #[test]
    fn skips_new_route_without_request_flag() {
        let mut rtm = [0u8; 12];
        rtm[0] = af::INET;
        let msg = wrap_nlmsg(u16::from(RtmType::NewRoute), NlmF::MULTI, &rtm);
        assert!(decode_route_notify(&msg).unwrap().is_none());
    }
}
