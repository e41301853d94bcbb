//! The connection state machine: a non-blocking, reconnecting TCP
//! socket to the FPM peer, driven by a single `mio::Poll` so the plugin
//! thread never blocks on I/O.

use std::{
    io::{self, Read, Write},
    net::SocketAddr,
    sync::atomic::Ordering,
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use mio::{net::TcpStream, Events, Interest, Poll, Token};

use crate::{
    consts::fpm::{NL_PKT_BUF_SIZE, RECONNECT_BACKOFF_SECS},
    counters::Counters,
    decode::{decode_route_notify, RouteNotify},
    err::{FpmError, FrameError},
    frame::{Decoder, FrameEvent},
    obuf::OutputBuffer,
};

const SOCKET_TOKEN: Token = Token(0);

/// Coarse connection lifecycle. The four `Replay*` states track which
/// reconciliation phase is in flight once a connection is up; the
/// walker itself drives the encoding work, this only reflects it for
/// logging and for gating whether new contexts get queued versus
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Disabled,
    Idle,
    Connecting,
    ReplayLsp,
    ReplayNhg,
    ReplayRib,
    ReplayRmac,
    Connected,
}

impl ConnState {
    pub fn is_replaying(self) -> bool {
        matches!(
            self,
            ConnState::ReplayLsp | ConnState::ReplayNhg | ConnState::ReplayRib | ConnState::ReplayRmac
        )
    }

    pub fn from_walker_phase(phase: crate::walker::Phase) -> ConnState {
        use crate::walker::Phase;
        match phase {
            Phase::Lsp => ConnState::ReplayLsp,
            Phase::Nhg => ConnState::ReplayNhg,
            Phase::Rib => ConnState::ReplayRib,
            Phase::Rmac => ConnState::ReplayRmac,
            Phase::Done => ConnState::Connected,
        }
    }
}

/// Owns the socket, the poller, and the reconnect backoff timer.
pub struct Connection {
    addr: SocketAddr,
    poll: Poll,
    events: Events,
    stream: Option<TcpStream>,
    pub state: ConnState,
    decoder: Decoder,
    next_attempt: Option<Instant>,
}

impl Connection {
    pub fn new(addr: SocketAddr) -> io::Result<Self> {
        Ok(Connection {
            addr,
            poll: Poll::new()?,
            events: Events::with_capacity(16),
            stream: None,
            state: ConnState::Idle,
            decoder: Decoder::new(),
            next_attempt: None,
        })
    }

    pub fn disable(&mut self, obuf: &OutputBuffer) {
        self.teardown(obuf);
        self.state = ConnState::Disabled;
    }

    pub fn enable(&mut self) {
        if self.state == ConnState::Disabled {
            self.state = ConnState::Idle;
            self.next_attempt = None;
        }
    }

    fn teardown(&mut self, obuf: &OutputBuffer) {
        if let Some(mut stream) = self.stream.take() {
            let _ = self.poll.registry().deregister(&mut stream);
        }
        self.decoder.reset();
        obuf.clear();
    }

    /// Force an immediate reconnect, e.g. on an operator request or a
    /// nexthop-group policy toggle.
    pub fn reconnect(&mut self, obuf: &OutputBuffer) {
        if self.state == ConnState::Disabled {
            return;
        }
        self.teardown(obuf);
        self.state = ConnState::Idle;
        self.next_attempt = None;
    }

    /// Point the connection at a new peer address, tearing down any
    /// active socket so the next tick reconnects to the new target.
    pub fn set_address(&mut self, addr: SocketAddr, obuf: &OutputBuffer) {
        self.addr = addr;
        if self.state == ConnState::Disabled {
            return;
        }
        self.teardown(obuf);
        self.state = ConnState::Idle;
        self.next_attempt = None;
    }

    /// Try to open the socket if idle and the backoff timer allows it.
    pub fn maybe_connect(&mut self, counters: &Counters) {
        if self.state != ConnState::Idle {
            return;
        }
        if let Some(at) = self.next_attempt {
            if Instant::now() < at {
                return;
            }
        }
        match TcpStream::connect(self.addr) {
            Ok(mut stream) => {
                if let Err(e) = self.poll.registry().register(
                    &mut stream,
                    SOCKET_TOKEN,
                    Interest::READABLE | Interest::WRITABLE,
                ) {
                    warn!("fpm: failed to register socket with poller: {e}");
                    counters.connection_errors.fetch_add(1, Ordering::Relaxed);
                    self.schedule_retry();
                    return;
                }
                self.stream = Some(stream);
                self.state = ConnState::Connecting;
                debug!("fpm: connecting to {}", self.addr);
            }
            Err(e) => {
                warn!("fpm: connect to {} failed: {e}", self.addr);
                counters.connection_errors.fetch_add(1, Ordering::Relaxed);
                self.schedule_retry();
            }
        }
    }

    fn schedule_retry(&mut self) {
        self.next_attempt = Some(Instant::now() + Duration::from_secs(RECONNECT_BACKOFF_SECS));
    }

    /// Poll the socket for readiness and drive reads/writes. Returns any
    /// route-notify messages decoded from the peer this tick.
    pub fn poll_io(&mut self, obuf: &OutputBuffer, timeout: Duration, counters: &Counters) -> Result<Vec<RouteNotify>, FpmError> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(Vec::new());
        };

        self.poll.poll(&mut self.events, Some(timeout))?;
        let mut notifies = Vec::new();
        // `None` = still healthy; `Some(true)` = peer closed cleanly
        // (counts as `connection_closes`); `Some(false)` = any other
        // fatal error (counts as `connection_errors`).
        let mut broke: Option<bool> = None;

        for event in self.events.iter() {
            if event.token() != SOCKET_TOKEN {
                continue;
            }
            if event.is_writable() && self.state == ConnState::Connecting {
                match stream.peer_addr() {
                    Ok(_) => {
                        self.state = ConnState::ReplayLsp;
                        info!("fpm: connected to {}", self.addr);
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotConnected => {}
                    Err(e) => {
                        warn!("fpm: connect to {} failed: {e}", self.addr);
                        broke = Some(false);
                    }
                }
            }
            if event.is_writable() && broke.is_none() {
                if let Err(e) = Self::flush_writes(&mut stream, obuf, counters) {
                    if e.kind() != io::ErrorKind::WouldBlock {
                        warn!("fpm: write to {} failed: {e}", self.addr);
                        broke = Some(e.kind() == io::ErrorKind::WriteZero);
                    }
                }
            }
            if event.is_readable() && broke.is_none() {
                match Self::drain_reads(&mut stream, &mut self.decoder, counters) {
                    Ok(mut decoded) => notifies.append(&mut decoded),
                    Err(FpmError::Frame(_)) => {
                        warn!("fpm: frame error reading from {}, reconnecting", self.addr);
                        broke = Some(false);
                    }
                    Err(FpmError::Io(e)) if e.kind() == io::ErrorKind::WouldBlock => {}
                    Err(FpmError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                        warn!("fpm: peer {} closed the connection", self.addr);
                        broke = Some(true);
                    }
                    Err(e) => {
                        warn!("fpm: error reading from {}: {e}", self.addr);
                        broke = Some(false);
                    }
                }
            }
        }

        if let Some(eof) = broke {
            let _ = self.poll.registry().deregister(&mut stream);
            self.decoder.reset();
            obuf.clear();
            self.state = ConnState::Idle;
            self.schedule_retry();
            if eof {
                counters.connection_closes.fetch_add(1, Ordering::Relaxed);
            } else {
                counters.connection_errors.fetch_add(1, Ordering::Relaxed);
            }
        } else {
            self.stream = Some(stream);
        }
        Ok(notifies)
    }

    fn flush_writes(stream: &mut TcpStream, obuf: &OutputBuffer, counters: &Counters) -> io::Result<()> {
        loop {
            let chunk = obuf.peek_front(NL_PKT_BUF_SIZE);
            if chunk.is_empty() {
                return Ok(());
            }
            match stream.write(&chunk) {
                Ok(0) => return Err(io::Error::new(io::ErrorKind::WriteZero, "peer closed")),
                Ok(n) => {
                    obuf.consume(n);
                    counters.bytes_sent.fetch_add(n as u64, Ordering::Relaxed);
                    if n < chunk.len() {
                        // Short write: the socket is applying backpressure.
                        // Stop for this readiness tick; the next WRITABLE
                        // event picks up the remainder, which is still in
                        // obuf since we only consumed what was confirmed
                        // written.
                        return Ok(());
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    fn drain_reads(stream: &mut TcpStream, decoder: &mut Decoder, counters: &Counters) -> Result<Vec<RouteNotify>, FpmError> {
        let mut buf = [0u8; NL_PKT_BUF_SIZE];
        let mut notifies = Vec::new();
        loop {
            match stream.read(&mut buf) {
                Ok(0) => return Err(FpmError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "peer closed"))),
                Ok(n) => {
                    counters.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
                    decoder.feed(&buf[..n]);
                    loop {
                        match decoder.poll() {
                            FrameEvent::NeedMore => break,
                            FrameEvent::Frame(payload) => match decode_route_notify(&payload) {
                                Ok(Some(notify)) => notifies.push(notify),
                                Ok(None) => {}
                                Err(e @ FrameError::ShortNlmsgLen(_)) => {
                                    // Per-message decode oddity: log and skip
                                    // just this one message, keep reading.
                                    warn!("fpm: skipping malformed route-notify: {e}");
                                }
                                // Inner nlmsg_len exceeding the frame payload is a
                                // framing desync severe enough to reconnect over;
                                // stop draining this frame loop immediately rather
                                // than attempting to parse more out of this stream.
                                Err(e) => return Err(FpmError::Frame(e)),
                            },
                            FrameEvent::Reconnect(e) => return Err(FpmError::Frame(e)),
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(notifies),
                Err(e) => return Err(FpmError::Io(e)),
            }
        }
    }
}
