//! The output byte buffer: framed netlink messages waiting to be written
//! to the peer socket.
//!
//! Writes are all-or-nothing — `enqueue` never partially appends a
//! frame — so a caller that gets `Err(BufferFull)` can always retry the
//! exact same context later without risking a split message on the
//! wire.

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::{consts::fpm::OUTPUT_BUFFER_CAPACITY, err::FpmError, frame::encode_frame};

/// FIFO byte buffer of framed messages ready to write to the socket.
pub struct OutputBuffer {
    buf: Mutex<Vec<u8>>,
    capacity: usize,
    bytes: AtomicU32,
    peak: AtomicU32,
}

impl Default for OutputBuffer {
    fn default() -> Self {
        OutputBuffer::new(OUTPUT_BUFFER_CAPACITY)
    }
}

impl OutputBuffer {
    pub fn new(capacity: usize) -> Self {
        OutputBuffer {
            buf: Mutex::new(Vec::new()),
            capacity,
            bytes: AtomicU32::new(0),
            peak: AtomicU32::new(0),
        }
    }

    /// Frame `payload` and append it, failing without partial writes if
    /// it would not fit within capacity.
    pub fn enqueue(&self, payload: &[u8]) -> Result<(), FpmError> {
        let frame = encode_frame(payload);
        let mut buf = self.buf.lock();
        if buf.len() + frame.len() > self.capacity {
            return Err(FpmError::BufferFull);
        }
        buf.extend_from_slice(&frame);
        let new_len = buf.len() as u32;
        drop(buf);
        self.bytes.store(new_len, Ordering::Relaxed);
        self.peak.fetch_max(new_len, Ordering::Relaxed);
        Ok(())
    }

    /// Frame and append every payload in `payloads` as a single
    /// all-or-nothing unit: if the combined framed size would not fit
    /// within capacity, none of them are enqueued. Used where a single
    /// logical object encodes to more than one netlink message (e.g. a
    /// route update's DEL followed by INSTALL) and partially enqueueing
    /// would frame one half of the pair without the other.
    pub fn enqueue_all(&self, payloads: &[Vec<u8>]) -> Result<(), FpmError> {
        let frames: Vec<Vec<u8>> = payloads.iter().map(|p| encode_frame(p)).collect();
        let total: usize = frames.iter().map(|f| f.len()).sum();
        let mut buf = self.buf.lock();
        if buf.len() + total > self.capacity {
            return Err(FpmError::BufferFull);
        }
        for frame in &frames {
            buf.extend_from_slice(frame);
        }
        let new_len = buf.len() as u32;
        drop(buf);
        self.bytes.store(new_len, Ordering::Relaxed);
        self.peak.fetch_max(new_len, Ordering::Relaxed);
        Ok(())
    }

    /// Copy up to `max_len` bytes from the front without removing them,
    /// for a non-blocking socket write whose actual written length is
    /// not known until the write call returns.
    pub fn peek_front(&self, max_len: usize) -> Vec<u8> {
        let buf = self.buf.lock();
        let take = max_len.min(buf.len());
        buf[..take].to_vec()
    }

    /// Remove exactly `n` bytes from the front, once the caller has
    /// confirmed that many were actually written to the socket.
    pub fn consume(&self, n: usize) {
        let mut buf = self.buf.lock();
        let n = n.min(buf.len());
        buf.drain(0..n);
        self.bytes.store(buf.len() as u32, Ordering::Relaxed);
    }

    pub fn is_empty(&self) -> bool {
        self.buf.lock().is_empty()
    }

    pub fn bytes(&self) -> u32 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn peak(&self) -> u32 {
        self.peak.load(Ordering::Relaxed)
    }

    /// Drop all buffered bytes, e.g. on reconnect.
    pub fn clear(&self) {
        self.buf.lock().clear();
        self.bytes.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn enqueue_frames_and_tracks_bytes() {
        let ob = OutputBuffer::new(64);
        ob.enqueue(b"hello").unwrap();
        assert_eq!(ob.bytes() as usize, 4 + 5);
    }

    #[test]
    fn full_buffer_rejects_cleanly() {
        let ob = OutputBuffer::new(8);
        let before = ob.bytes();
        assert!(matches!(ob.enqueue(b"toolong"), Err(FpmError::BufferFull)));
        assert_eq!(ob.bytes(), before);
    }

    #[test]
    fn peek_front_does_not_remove_bytes() {
        let ob = OutputBuffer::new(64);
        ob.enqueue(b"ab").unwrap();
        let peeked = ob.peek_front(3);
        assert_eq!(peeked.len(), 3);
        assert_eq!(ob.bytes() as usize, 6);
    }

    #[test]
    fn consume_removes_exactly_n_bytes() {
        let ob = OutputBuffer::new(64);
        ob.enqueue(b"ab").unwrap();
        ob.consume(3);
        assert_eq!(ob.bytes() as usize, 3);
    }

    #[test]
    fn enqueue_all_is_all_or_nothing() {
        let ob = OutputBuffer::new(10);
        let payloads = vec![b"ab".to_vec(), b"cd".to_vec()];
        // Combined framed size (4 + 2 each = 12) exceeds capacity; neither
        // payload should land in the buffer.
        assert!(matches!(ob.enqueue_all(&payloads), Err(FpmError::BufferFull)));
        assert_eq!(ob.bytes(), 0);

        let ob = OutputBuffer::new(64);
        ob.enqueue_all(&payloads).unwrap();
        assert_eq!(ob.bytes() as usize, (4 + 2) * 2);
    }
}
