//! The top level `nlmsghdr` every encoded message is wrapped in.

use byteorder::{NativeEndian, WriteBytesExt};

use crate::consts::nl::NlmF;

/// Size of `struct nlmsghdr`.
pub const NLMSGHDR_LEN: usize = 16;

/// Wrap `payload` in a `nlmsghdr` with the given type and flags. Sequence
/// number and port id are left at 0: this plugin is write-mostly and does
/// not correlate replies by sequence.
pub fn wrap_nlmsg(msg_type: u16, flags: NlmF, payload: &[u8]) -> Vec<u8> {
    let total_len = NLMSGHDR_LEN + payload.len();
    let mut buf = Vec::with_capacity(total_len);
    buf.write_u32::<NativeEndian>(total_len as u32).unwrap();
    buf.write_u16::<NativeEndian>(msg_type).unwrap();
    buf.write_u16::<NativeEndian>(flags.bits()).unwrap();
    buf.write_u32::<NativeEndian>(0).unwrap(); // nlmsg_seq
    buf.write_u32::<NativeEndian>(0).unwrap(); // nlmsg_pid
    buf.extend_from_slice(payload);
    buf
}

/// Minimal parse of a `nlmsghdr` prefix, used only to validate inbound
/// route-notify messages.
#[derive(Debug, Clone, Copy)]
pub struct NlmsghdrView {
    pub nlmsg_len: u32,
    pub nlmsg_type: u16,
    pub nlmsg_flags: u16,
}

impl NlmsghdrView {
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < NLMSGHDR_LEN {
            return None;
        }
        Some(NlmsghdrView {
            nlmsg_len: u32::from_ne_bytes(buf[0..4].try_into().unwrap()),
            nlmsg_type: u16::from_ne_bytes(buf[4..6].try_into().unwrap()),
            nlmsg_flags: u16::from_ne_bytes(buf[6..8].try_into().unwrap()),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wrap_nlmsg_sets_length_and_type() {
        let msg = wrap_nlmsg(24, NlmF::REQUEST | NlmF::CREATE, &[1, 2, 3, 4]);
        assert_eq!(msg.len(), NLMSGHDR_LEN + 4);
        let view = NlmsghdrView::parse(&msg).unwrap();
        assert_eq!(view.nlmsg_len as usize, msg.len());
        assert_eq!(view.nlmsg_type, 24);
    }
}
