//! Plugin lifecycle glue: owns the connection, the queues, the walker
//! and the background thread that ties them together, and exposes the
//! handful of operations the out-of-scope CLI surface needs.

use std::{
    collections::VecDeque,
    io,
    net::SocketAddr,
    sync::{
        atomic::Ordering,
        mpsc::{self, Receiver, Sender, TryRecvError},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::warn;

use crate::{
    conn::{ConnState, Connection},
    context::DplaneContext,
    counters::{Counters, CountersSnapshot},
    encode::{lsp::encode_lsp, mac::encode_mac, nexthop::encode_nexthop, route::encode_route},
    engine::Engine,
    err::FpmError,
    event::{log_event, Event},
    obuf::OutputBuffer,
    queue::ContextQueue,
    walker::{handle_lo_address_change, StepOutcome, Walker},
};

/// Number of queued contexts drained into the output buffer per loop
/// iteration, so one very large backlog can't starve the I/O poll.
const WORK_LIMIT: usize = 256;
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// A handle to the running plugin thread. Dropping it does not stop the
/// thread; call [`PluginHandle::shutdown`] explicitly.
pub struct PluginHandle {
    ctl_tx: Sender<Event>,
    ctxqueue: Arc<ContextQueue>,
    obuf: Arc<OutputBuffer>,
    counters: Arc<Counters>,
    join: Option<JoinHandle<()>>,
}

impl PluginHandle {
    /// Spawn the plugin thread against `engine`, connecting to `addr`.
    pub fn spawn<E: Engine + Send + 'static>(mut engine: E, addr: SocketAddr) -> io::Result<PluginHandle> {
        let (ctl_tx, ctl_rx) = mpsc::channel();
        let ctxqueue = Arc::new(ContextQueue::new());
        let counters = Arc::new(Counters::new());
        let obuf = Arc::new(OutputBuffer::default());

        let thread_queue = ctxqueue.clone();
        let thread_counters = counters.clone();
        let thread_obuf = obuf.clone();

        let join = thread::Builder::new()
            .name("fpm-dplane".into())
            .spawn(move || {
                run_loop(
                    &mut engine,
                    addr,
                    &thread_queue,
                    &thread_obuf,
                    &thread_counters,
                    ctl_rx,
                )
            })?;

        Ok(PluginHandle {
            ctl_tx,
            ctxqueue,
            obuf,
            counters,
            join: Some(join),
        })
    }

    /// Hand a dataplane operation to the plugin thread for encoding.
    pub fn push_context(&self, ctx: DplaneContext) {
        self.ctxqueue.push(ctx);
    }

    pub fn reconnect(&self) {
        let _ = self.ctl_tx.send(Event::Reconnect);
    }

    pub fn disable(&self) {
        let _ = self.ctl_tx.send(Event::Disable);
    }

    pub fn enable(&self) {
        let _ = self.ctl_tx.send(Event::Enable);
    }

    pub fn set_address(&self, addr: SocketAddr) {
        let _ = self.ctl_tx.send(Event::SetAddress(addr));
    }

    pub fn unset_address(&self) {
        let _ = self.ctl_tx.send(Event::UnsetAddress);
    }

    pub fn reset_counters(&self) {
        let _ = self.ctl_tx.send(Event::ResetCounters);
    }

    pub fn toggle_nhg(&self, on: bool) {
        let _ = self.ctl_tx.send(Event::ToggleNhg(on));
    }

    pub fn counters_snapshot(&self) -> CountersSnapshot {
        self.counters.snapshot(&self.ctxqueue, &self.obuf)
    }

    /// Stop the plugin thread and wait for it to exit.
    pub fn shutdown(mut self) {
        let _ = self.ctl_tx.send(Event::Disable);
        drop(self.ctl_tx);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn run_loop<E: Engine>(
    engine: &mut E,
    addr: SocketAddr,
    ctxqueue: &ContextQueue,
    obuf: &OutputBuffer,
    counters: &Counters,
    ctl_rx: Receiver<Event>,
) {
    let default_addr = addr;
    let mut conn = match Connection::new(addr) {
        Ok(c) => c,
        Err(e) => {
            warn!("fpm: failed to create poller: {e}");
            return;
        }
    };
    let mut walker = Walker::new();
    let mut use_nhg = true;
    let mut pending = VecDeque::new();
    let mut shutting_down = false;
    let mut last_state = conn.state;

    loop {
        match ctl_rx.try_recv() {
            Ok(event) => {
                log_event(&event);
                match event {
                    Event::Reconnect => conn.reconnect(obuf),
                    Event::Disable => {
                        conn.disable(obuf);
                        counters.user_disables.fetch_add(1, Ordering::Relaxed);
                        shutting_down = true;
                    }
                    Event::Enable => {
                        conn.enable();
                        counters.user_configures.fetch_add(1, Ordering::Relaxed);
                    }
                    Event::SetAddress(new_addr) => {
                        conn.set_address(new_addr, obuf);
                        counters.user_configures.fetch_add(1, Ordering::Relaxed);
                    }
                    Event::UnsetAddress => {
                        conn.set_address(default_addr, obuf);
                        counters.user_configures.fetch_add(1, Ordering::Relaxed);
                    }
                    Event::ResetCounters => counters.reset(),
                    Event::ToggleNhg(on) => {
                        use_nhg = on;
                        counters.user_configures.fetch_add(1, Ordering::Relaxed);
                        // The replay chain needs to redo its work under
                        // the new policy, so reconnect and replay fresh.
                        conn.reconnect(obuf);
                    }
                    Event::InternalReconnect
                    | Event::LspFinished
                    | Event::NhgFinished
                    | Event::RibFinished
                    | Event::RmacFinished => {}
                }
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => shutting_down = true,
        }

        if shutting_down && conn.state == ConnState::Disabled {
            break;
        }

        conn.maybe_connect(counters);

        match conn.poll_io(obuf, POLL_TIMEOUT, counters) {
            Ok(notifies) => {
                for notify in notifies {
                    engine.on_route_notify(notify);
                }
            }
            Err(e) => warn!("fpm: connection error: {e}"),
        }

        // A fresh transition into the replay chain (Connecting ->
        // ReplayLsp) means a brand new connection epoch: restart the
        // walker from the beginning regardless of where it had gotten
        // to on any prior connection.
        if conn.state == ConnState::ReplayLsp && last_state != ConnState::ReplayLsp {
            walker.restart();
        }
        last_state = conn.state;

        if conn.state.is_replaying() {
            match walker.step(engine, obuf) {
                StepOutcome::PhaseFinished(event) => {
                    log_event(&event);
                    conn.state = ConnState::from_walker_phase(walker.phase);
                }
                StepOutcome::Suspended(delay) => {
                    thread::sleep(delay.min(Duration::from_millis(250)));
                }
                StepOutcome::Done => {
                    conn.state = ConnState::Connected;
                }
            }
            last_state = conn.state;
        }

        if conn.state == ConnState::Connected {
            drain_queue(ctxqueue, engine, obuf, &mut pending, counters, use_nhg);
        }
    }
}

fn drain_queue<E: Engine>(
    queue: &ContextQueue,
    engine: &mut E,
    obuf: &OutputBuffer,
    pending: &mut VecDeque<Vec<u8>>,
    counters: &Counters,
    use_nhg: bool,
) {
    while let Some(msg) = pending.front() {
        match obuf.enqueue(msg) {
            Ok(()) => {
                pending.pop_front();
            }
            Err(FpmError::BufferFull) => {
                counters.buffer_full.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Err(_) => {
                pending.pop_front();
            }
        }
    }

    let mut processed = 0;
    while processed < WORK_LIMIT {
        let Some(ctx) = queue.pop_front() else {
            break;
        };
        processed += 1;
        counters.dplane_contexts.fetch_add(1, Ordering::Relaxed);
        if ctx.is_lo_address_change() {
            handle_lo_address_change(engine, &ctx);
        }
        for msg in encode_any(&ctx, engine, use_nhg) {
            match obuf.enqueue(&msg) {
                Ok(()) => {}
                Err(FpmError::BufferFull) => {
                    pending.push_back(msg);
                    counters.buffer_full.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => warn!("fpm: dropping message: {e}"),
            }
        }
    }
}

fn encode_any<E: Engine>(ctx: &DplaneContext, engine: &E, use_nhg: bool) -> Vec<Vec<u8>> {
    use crate::context::DplaneOp;

    if ctx.op.is_route() {
        return encode_route(ctx, engine).unwrap_or_default();
    }
    if ctx.op.is_nexthop_group() {
        if !use_nhg {
            return Vec::new();
        }
        return encode_nexthop(ctx).ok().flatten().into_iter().collect();
    }
    if matches!(ctx.op, DplaneOp::LspInstall | DplaneOp::LspUpdate | DplaneOp::LspDelete) {
        return encode_lsp(ctx).ok().flatten().into_iter().collect();
    }
    if matches!(ctx.op, DplaneOp::MacInstall | DplaneOp::MacDelete) {
        return encode_mac(ctx).ok().flatten().into_iter().collect();
    }
    Vec::new()
}
