//! Generic netlink attribute (TLV) nesting, modeled directly on the
//! `Rtattr<T, P>` shape from routing netlink: a 2-byte length, a 2-byte
//! type, and a payload padded up to 4-byte alignment.

use byteorder::{NativeEndian, WriteBytesExt};

/// Round a length up to the next multiple of `NLA_ALIGNTO` (4).
pub fn alignto(len: usize) -> usize {
    (len + 3) & !3
}

/// Incrementally builds a buffer of netlink attributes (`Rtattr` /
/// `Nlattr` in kernel terms), handling length-prefixing, type tagging and
/// alignment padding so callers never hand-roll byte offsets.
#[derive(Debug, Default, Clone)]
pub struct TlvWriter {
    buf: Vec<u8>,
}

impl TlvWriter {
    pub fn new() -> Self {
        TlvWriter { buf: Vec::new() }
    }

    /// Append one attribute with a raw numeric type and payload bytes.
    pub fn push_raw(&mut self, ty: u16, payload: &[u8]) {
        let header_len = 4;
        let total_len = header_len + payload.len();
        // Safe to unwrap: writes into a Vec never fail.
        self.buf.write_u16::<NativeEndian>(total_len as u16).unwrap();
        self.buf.write_u16::<NativeEndian>(ty).unwrap();
        self.buf.extend_from_slice(payload);
        let padded = alignto(total_len);
        self.buf.resize(self.buf.len() + (padded - total_len), 0);
    }

    /// Append one attribute whose type comes from one of the crate's
    /// `impl_var!`-declared enums.
    pub fn push<T>(&mut self, ty: T, payload: &[u8])
    where
        T: Into<u16>,
    {
        self.push_raw(ty.into(), payload);
    }

    /// Append a `u8` payload attribute.
    pub fn push_u8<T: Into<u16>>(&mut self, ty: T, v: u8) {
        self.push(ty, &[v]);
    }

    /// Append a `u32` (native-endian) payload attribute.
    pub fn push_u32<T: Into<u16>>(&mut self, ty: T, v: u32) {
        self.push(ty, &v.to_ne_bytes());
    }

    /// Append a NUL-terminated string payload attribute.
    pub fn push_cstr<T: Into<u16>>(&mut self, ty: T, s: &str) {
        let mut payload = Vec::with_capacity(s.len() + 1);
        payload.extend_from_slice(s.as_bytes());
        payload.push(0);
        self.push(ty, &payload);
    }

    /// Append an already-built nested [`TlvWriter`] as the payload of one
    /// attribute of the given type.
    pub fn push_nested<T: Into<u16>>(&mut self, ty: T, nested: &TlvWriter) {
        self.push(ty, nested.as_bytes());
    }

    /// Current encoded length, including alignment padding already applied.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::consts::tlv::Srv6LocalSidTlv;

    #[test]
    fn push_pads_to_four_bytes() {
        let mut w = TlvWriter::new();
        w.push_u8(Srv6LocalSidTlv::Action, 3);
        // header(4) + payload(1) = 5, padded to 8
        assert_eq!(w.len(), 8);
    }

    #[test]
    fn push_cstr_includes_nul() {
        let mut w = TlvWriter::new();
        w.push_cstr(Srv6LocalSidTlv::VrfName, "red");
        let bytes = w.as_bytes();
        // header(4) + "red\0"(4) = 8, already aligned
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[4..8], b"red\0");
    }

    #[test]
    fn nested_roundtrips_header() {
        let mut inner = TlvWriter::new();
        inner.push_u8(crate::consts::tlv::Srv6FormatTlv::BlockLen, 32);
        let mut outer = TlvWriter::new();
        outer.push_nested(Srv6LocalSidTlv::Format, &inner);
        assert_eq!(outer.len(), 4 + inner.len());
    }
}
