//! The 4-byte FPM frame header: `{version: u8, type: u8, len: u16 be}`
//! Frames the netlink payload in a small fixed header.

use byteorder::{BigEndian, WriteBytesExt};

use crate::{
    consts::fpm::{FPM_HEADER_LEN, FPM_MSG_TYPE_NETLINK, FPM_VERSION},
    err::FrameError,
};

/// Prefix `payload` with an FPM frame header and return the full frame.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let total_len = FPM_HEADER_LEN + payload.len();
    let mut out = Vec::with_capacity(total_len);
    out.push(FPM_VERSION);
    out.push(FPM_MSG_TYPE_NETLINK);
    out.write_u16::<BigEndian>(total_len as u16)
        .expect("writes into a Vec never fail");
    out.extend_from_slice(payload);
    out
}

/// Result of polling the decoder for one more frame.
#[derive(Debug)]
pub enum FrameEvent {
    /// Not enough bytes buffered yet; wait for more reads.
    NeedMore,
    /// A complete frame was decoded; this is its payload (header stripped).
    Frame(Vec<u8>),
    /// The stream is desynchronized; the input buffer has been reset and
    /// the caller must tear down the connection and reconnect.
    Reconnect(FrameError),
}

/// Incremental decoder over a byte stream of FPM frames.
///
/// Bytes arrive in arbitrary chunks from a non-blocking socket read; the
/// decoder buffers them until a complete frame is available, consuming
/// exactly the bytes belonging to each frame so multiple frames in one
/// read are all surfaced by repeated calls to [`Decoder::poll`].
#[derive(Debug, Default)]
pub struct Decoder {
    buf: Vec<u8>,
}

impl Decoder {
    pub fn new() -> Self {
        Decoder::default()
    }

    /// Append newly read bytes to the internal buffer.
    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Drop all buffered bytes, e.g. on reconnect.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Try to decode the next frame from the buffered bytes.
    pub fn poll(&mut self) -> FrameEvent {
        if self.buf.len() < FPM_HEADER_LEN {
            return FrameEvent::NeedMore;
        }
        let version = self.buf[0];
        let msg_type = self.buf[1];
        let length = u16::from_be_bytes([self.buf[2], self.buf[3]]);

        if version != FPM_VERSION || msg_type != FPM_MSG_TYPE_NETLINK {
            self.reset();
            return FrameEvent::Reconnect(FrameError::BadHeader { version, msg_type });
        }
        if (length as usize) < FPM_HEADER_LEN {
            self.reset();
            return FrameEvent::Reconnect(FrameError::ShortLength(length));
        }
        let length = length as usize;
        if length > self.buf.len() {
            // Rewind to frame start: nothing consumed, wait for more bytes.
            return FrameEvent::NeedMore;
        }

        let payload = self.buf[FPM_HEADER_LEN..length].to_vec();
        self.buf.drain(0..length);
        FrameEvent::Frame(payload)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encode_frame_header_is_big_endian() {
        let frame = encode_frame(&[0xAA; 10]);
        assert_eq!(&frame[0..2], &[1, 1]);
        assert_eq!(&frame[2..4], &14u16.to_be_bytes());
        assert_eq!(frame.len(), 14);
    }

    #[test]
    fn decoder_waits_for_full_frame() {
        let mut d = Decoder::new();
        let frame = encode_frame(b"hello");
        d.feed(&frame[..6]);
        assert!(matches!(d.poll(), FrameEvent::NeedMore));
        d.feed(&frame[6..]);
        match d.poll() {
            FrameEvent::Frame(payload) => assert_eq!(payload, b"hello"),
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[test]
    fn decoder_splits_back_to_back_frames() {
        let mut d = Decoder::new();
        d.feed(&encode_frame(b"one"));
        d.feed(&encode_frame(b"two"));
        assert!(matches!(d.poll(), FrameEvent::Frame(p) if p == b"one"));
        assert!(matches!(d.poll(), FrameEvent::Frame(p) if p == b"two"));
        assert!(matches!(d.poll(), FrameEvent::NeedMore));
    }

    #[test]
    fn decoder_rejects_bad_version() {
        let mut d = Decoder::new();
        d.feed(&[2, 1, 0, 4]);
        assert!(matches!(d.poll(), FrameEvent::Reconnect(FrameError::BadHeader { .. })));
        assert_eq!(d.buffered(), 0);
    }

    #[test]
    fn decoder_rejects_bad_type_even_if_version_ok() {
        let mut d = Decoder::new();
        // Both fields must be correct, not just one.
        d.feed(&[1, 2, 0, 4]);
        assert!(matches!(d.poll(), FrameEvent::Reconnect(FrameError::BadHeader { .. })));
    }

    #[test]
    fn decoder_rejects_short_length() {
        let mut d = Decoder::new();
        d.feed(&[1, 1, 0, 2]);
        assert!(matches!(d.poll(), FrameEvent::Reconnect(FrameError::ShortLength(2))));
    }
}
