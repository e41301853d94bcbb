//! Error types used across the crate.
//!
//! # Design decisions
//!
//! Errors are plain enums with manual [`Display`]/[`std::error::Error`]
//! impls rather than a derive-macro crate: the error surface here is small
//! and every variant already carries exactly the context a caller needs.

use std::{error::Error, fmt, io};

/// Failure while turning a dataplane operation into netlink bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodeError {
    /// The operation kind has no encoder (ignored dataplane op).
    Unsupported,
    /// The nexthop attached to the context was not valid for this
    /// operation (e.g. no address on a unicast nexthop).
    InvalidNexthop,
    /// An SRv6 `END_T`/`END_DT*` localsid needed a VRF name for the
    /// context's table id and none was found.
    VrfNotFound,
    /// An SRv6 VPN route needed a locator and none matched the prefix.
    LocatorNotFound,
    /// The route's table id is the default table; callers must drop the
    /// context rather than treat this as a hard failure.
    DefaultTable,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            EncodeError::Unsupported => "unsupported or invalid dataplane operation",
            EncodeError::InvalidNexthop => "nexthop is not valid for this operation",
            EncodeError::VrfNotFound => "no VRF name found for table id",
            EncodeError::LocatorNotFound => "no SRv6 locator found for prefix",
            EncodeError::DefaultTable => "route table id is the default table",
        };
        f.write_str(msg)
    }
}

impl Error for EncodeError {}

/// Failure while decoding a framed message read from the peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// `version` or `type` was not the expected value of 1.
    BadHeader { version: u8, msg_type: u8 },
    /// `length` field was smaller than the 4-byte header.
    ShortLength(u16),
    /// Inner `nlmsg_len` was smaller than `sizeof(nlmsghdr)`: a per-message
    /// decode oddity, not a framing desync. Callers log and skip just this
    /// one message rather than reconnecting.
    ShortNlmsgLen(u32),
    /// Inner `nlmsg_len` exceeded the frame's payload length: a framing
    /// desync severe enough to warrant a reconnect.
    InnerTooLong { nlmsg_len: u32, payload_len: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::BadHeader { version, msg_type } => write!(
                f,
                "bad fpm frame header: version={version} type={msg_type}"
            ),
            FrameError::ShortLength(len) => write!(f, "fpm frame length {len} shorter than header"),
            FrameError::ShortNlmsgLen(len) => {
                write!(f, "inner nlmsg_len {len} shorter than nlmsghdr")
            }
            FrameError::InnerTooLong {
                nlmsg_len,
                payload_len,
            } => write!(
                f,
                "inner nlmsg_len {nlmsg_len} exceeds frame payload length {payload_len}"
            ),
        }
    }
}

impl Error for FrameError {}

/// Top level error for the connection/IO state machine.
#[derive(Debug)]
pub enum FpmError {
    /// The output buffer has no room for the next message.
    BufferFull,
    /// The plugin is in the `Disabled` state.
    Disabled,
    /// A transport-level I/O error.
    Io(io::Error),
    /// A framing protocol error; callers should reconnect.
    Frame(FrameError),
    /// An encoder rejected the context; callers should drop it.
    Encode(EncodeError),
}

impl fmt::Display for FpmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FpmError::BufferFull => f.write_str("output buffer is full"),
            FpmError::Disabled => f.write_str("fpm plugin is disabled"),
            FpmError::Io(e) => write!(f, "io error: {e}"),
            FpmError::Frame(e) => write!(f, "frame error: {e}"),
            FpmError::Encode(e) => write!(f, "encode error: {e}"),
        }
    }
}

impl Error for FpmError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FpmError::Io(e) => Some(e),
            FpmError::Frame(e) => Some(e),
            FpmError::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FpmError {
    fn from(e: io::Error) -> Self {
        FpmError::Io(e)
    }
}

impl From<FrameError> for FpmError {
    fn from(e: FrameError) -> Self {
        FpmError::Frame(e)
    }
}

impl From<EncodeError> for FpmError {
    fn from(e: EncodeError) -> Self {
        FpmError::Encode(e)
    }
}
