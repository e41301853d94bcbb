//! The reconciliation walker: after (re)connecting, replays every
//! engine table to the peer in a fixed phase order so the peer's view
//! converges even if it missed updates while disconnected.
//!
//! Each phase clears every object's sent flag, then encodes and enqueues
//! objects one at a time, marking each sent as it succeeds. If the
//! output buffer is full the walker suspends mid-phase rather than
//! dropping work; sent flags already set mean the next resume only
//! re-visits what's left.

use std::time::Duration;

use crate::{
    consts::fpm::{WALKER_RESUME_FAST_SECS, WALKER_RESUME_SLOW_SECS},
    context::{DplaneContext, DplaneContextBuilder, DplaneOp},
    encode::{lsp::encode_lsp, mac::encode_mac, nexthop::encode_nexthop, route::encode_route},
    engine::{Engine, EngineLsps, EngineNhgs, EngineRib, EngineRmacs, SentFlag},
    err::FpmError,
    event::Event,
    obuf::OutputBuffer,
};

/// Current position in the reconciliation walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Lsp,
    Nhg,
    Rib,
    Rmac,
    Done,
}

impl Phase {
    fn next(self) -> Phase {
        match self {
            Phase::Lsp => Phase::Nhg,
            Phase::Nhg => Phase::Rib,
            Phase::Rib => Phase::Rmac,
            Phase::Rmac => Phase::Done,
            Phase::Done => Phase::Done,
        }
    }

    fn resume_delay(self) -> Duration {
        match self {
            Phase::Lsp | Phase::Nhg => Duration::from_secs(WALKER_RESUME_FAST_SECS),
            Phase::Rib | Phase::Rmac | Phase::Done => Duration::from_secs(WALKER_RESUME_SLOW_SECS),
        }
    }

    fn finished_event(self) -> Option<Event> {
        match self {
            Phase::Lsp => Some(Event::LspFinished),
            Phase::Nhg => Some(Event::NhgFinished),
            Phase::Rib => Some(Event::RibFinished),
            Phase::Rmac => Some(Event::RmacFinished),
            Phase::Done => None,
        }
    }
}

/// Drives one phase forward. The caller restarts a fresh walk by
/// resetting `phase` to [`Phase::Lsp`] on every new connection.
pub struct Walker {
    pub phase: Phase,
    /// Whether the current phase's sent flags have already been cleared
    /// this time through. Set back to `false` whenever `phase` changes so
    /// each phase's reset step runs exactly once per entry, even if the
    /// phase itself spans several suspend/resume calls.
    phase_reset_done: bool,
}

impl Default for Walker {
    fn default() -> Self {
        Walker {
            phase: Phase::Lsp,
            phase_reset_done: false,
        }
    }
}

/// Outcome of one call to [`Walker::step`].
pub enum StepOutcome {
    /// The current phase finished; the caller should log the returned
    /// event and call `step` again immediately to begin the next phase.
    PhaseFinished(Event),
    /// The output buffer filled up mid-phase; retry after the returned
    /// delay.
    Suspended(Duration),
    /// Every phase has completed.
    Done,
}

impl Walker {
    pub fn new() -> Self {
        Walker::default()
    }

    /// Restart the walk from the beginning, e.g. on a fresh connection.
    pub fn restart(&mut self) {
        self.phase = Phase::Lsp;
        self.phase_reset_done = false;
    }

    pub fn step<E: Engine>(&mut self, engine: &mut E, obuf: &OutputBuffer) -> StepOutcome {
        match self.phase {
            Phase::Lsp => self.step_lsp(engine, obuf),
            Phase::Nhg => self.step_nhg(engine, obuf),
            Phase::Rib => self.step_rib(engine, obuf),
            Phase::Rmac => self.step_rmac(engine, obuf),
            Phase::Done => StepOutcome::Done,
        }
    }

    fn advance(&mut self) -> StepOutcome {
        let event = self.phase.finished_event();
        self.phase = self.phase.next();
        self.phase_reset_done = false;
        match event {
            Some(e) => StepOutcome::PhaseFinished(e),
            None => StepOutcome::Done,
        }
    }

    fn step_lsp<E: Engine>(&mut self, engine: &mut E, obuf: &OutputBuffer) -> StepOutcome {
        if !self.phase_reset_done {
            engine.lsps().reset_sent();
            self.phase_reset_done = true;
        }
        let lsps = engine.lsps();
        for (handle, info) in lsps.iter_mut() {
            if handle.sent() {
                continue;
            }
            let ctx = DplaneContextBuilder::default()
                .op(DplaneOp::LspInstall)
                .lsp(info)
                .build()
                .expect("builder invariants hold for walker-synthesized contexts");
            match encode_lsp(&ctx) {
                Ok(Some(msg)) => match obuf.enqueue(&msg) {
                    Ok(()) => handle.set_sent(true),
                    Err(FpmError::BufferFull) => return StepOutcome::Suspended(self.phase.resume_delay()),
                    Err(_) => handle.set_sent(true),
                },
                _ => handle.set_sent(true),
            }
        }
        self.advance()
    }

    fn step_nhg<E: Engine>(&mut self, engine: &mut E, obuf: &OutputBuffer) -> StepOutcome {
        if !self.phase_reset_done {
            engine.nhgs().reset_sent();
            self.phase_reset_done = true;
        }
        let nhgs = engine.nhgs();
        for (handle, group) in nhgs.iter_mut() {
            if handle.sent() {
                continue;
            }
            let ctx = DplaneContextBuilder::default()
                .op(DplaneOp::NhInstall)
                .nhg(group)
                .build()
                .expect("builder invariants hold for walker-synthesized contexts");
            match encode_nexthop(&ctx) {
                Ok(Some(msg)) => match obuf.enqueue(&msg) {
                    Ok(()) => handle.set_sent(true),
                    Err(FpmError::BufferFull) => return StepOutcome::Suspended(self.phase.resume_delay()),
                    Err(_) => handle.set_sent(true),
                },
                _ => handle.set_sent(true),
            }
        }
        self.advance()
    }

    fn step_rib<E: Engine>(&mut self, engine: &mut E, obuf: &OutputBuffer) -> StepOutcome {
        if !self.phase_reset_done {
            engine.rib().reset_sent();
            self.phase_reset_done = true;
        }
        let (rib, lookup) = engine.rib_and_lookup();
        for (handle, ctx) in rib.iter_mut() {
            if handle.sent() {
                continue;
            }
            match encode_route(&ctx, lookup) {
                Ok(msgs) if msgs.is_empty() => handle.set_sent(true),
                // A route can encode to more than one message (DEL then
                // INSTALL); enqueue them as one all-or-nothing unit so a
                // suspend never leaves the first half framed without the
                // second.
                Ok(msgs) => match obuf.enqueue_all(&msgs) {
                    Ok(()) => handle.set_sent(true),
                    Err(FpmError::BufferFull) => return StepOutcome::Suspended(self.phase.resume_delay()),
                    Err(_) => handle.set_sent(true),
                },
                Err(_) => handle.set_sent(true),
            }
        }
        self.advance()
    }

    fn step_rmac<E: Engine>(&mut self, engine: &mut E, obuf: &OutputBuffer) -> StepOutcome {
        if !self.phase_reset_done {
            engine.rmacs().reset_sent();
            self.phase_reset_done = true;
        }
        let rmacs = engine.rmacs();
        for (handle, info) in rmacs.iter_mut() {
            if handle.sent() {
                continue;
            }
            let ctx = DplaneContextBuilder::default()
                .op(DplaneOp::MacInstall)
                .mac(info)
                .build()
                .expect("builder invariants hold for walker-synthesized contexts");
            match encode_mac(&ctx) {
                Ok(Some(msg)) => match obuf.enqueue(&msg) {
                    Ok(()) => handle.set_sent(true),
                    Err(FpmError::BufferFull) => return StepOutcome::Suspended(self.phase.resume_delay()),
                    Err(_) => handle.set_sent(true),
                },
                _ => handle.set_sent(true),
            }
        }
        self.advance()
    }
}

/// Called when an address change on `lo` is observed: re-marks every
/// SRv6 destination in the RIB unsent so the next walk re-advertises
/// them with a (possibly new) encap source address.
pub fn handle_lo_address_change<E: Engine>(engine: &mut E, ctx: &DplaneContext) {
    if ctx.is_lo_address_change() {
        engine.rib().reset_sent_srv6();
    }
}
