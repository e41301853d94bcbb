//! # fpm-dplane
//!
//! Core of a routing-engine dataplane provider that streams forwarding
//! state to an external Forwarding Plane Manager (FPM) peer over a
//! framed TCP connection.
//!
//! ## The project is broken down into the following modules:
//! * [`frame`] — the 4-byte FPM frame header and the incremental decoder
//!   over a byte stream of frames.
//! * [`nl`] / [`attr`] — the `nlmsghdr` wrapper and generic TLV
//!   (`Rtattr`) nesting shared by every encoder.
//! * [`consts`] — wire constants: frame header values, `nlmsg_type` /
//!   flag bits, routing-netlink attribute numbers, and this plugin's own
//!   SRv6 TLV numbering.
//! * [`context`] — the dataplane operation contexts handed in from the
//!   host routing engine.
//! * [`encode`] — netlink/TLV encoders for routes (including the SRv6
//!   localsid and SRv6 VPN variants), nexthop groups, LSPs and MACs.
//! * [`obuf`] — the mutex-guarded output byte buffer of framed messages
//!   pending a socket write.
//! * [`queue`] — the mutex-guarded FIFO of contexts handed from the
//!   engine thread to the plugin thread.
//! * [`conn`] — the non-blocking connection/IO state machine: connect,
//!   read, write, reconnect backoff.
//! * [`walker`] — the reconciliation walker that replays every engine
//!   table to the peer after each (re)connection.
//! * [`event`] — the control-event enum the plugin thread dispatches.
//! * [`counters`] — atomic operation counters and their JSON/text
//!   rendering.
//! * [`engine`] — the trait-shaped interface a real routing engine
//!   implements; this crate is generic over it and never depends on a
//!   concrete engine's internal representation.
//! * [`decode`] — decoding of the one inbound message type this plugin
//!   understands, `RTM_NEWROUTE` route-notify.
//! * [`provider`] — the plugin lifecycle: the background thread tying
//!   the connection, queues and walker together, and the handful of
//!   operations the out-of-scope CLI surface calls into.
//! * [`config`] — the typed surface behind those CLI operations
//!   (address configuration, nexthop-group toggle, counters reset/show).
//! * [`err`] — crate-wide error types.
//!
//! ## Design decisions
//!
//! There is deliberately no module-level mutable state: the single
//! `FpmContext` the original plugin kept as a process-global is here an
//! explicit [`provider::PluginHandle`] owned by whoever registers the
//! plugin with an engine, passed to every operation instead of reached
//! for by name. See `DESIGN.md` for the full grounding ledger and the
//! Open Question decisions.

pub mod attr;
pub mod config;
pub mod conn;
pub mod consts;
pub mod context;
pub mod counters;
pub mod decode;
pub mod encode;
pub mod engine;
pub mod err;
pub mod event;
pub mod frame;
pub(crate) mod macros;
pub mod nl;
pub mod obuf;
pub mod provider;
pub mod queue;
pub mod walker;
