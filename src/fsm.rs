//! Glue between an NCP and the generic PPP option negotiation automaton.
//!
//! The automaton itself (states, timers, restart counters, packet I/O) is an
//! external `FsmCore`. It only knows the `Fsm` control block: a protocol
//! number plus the session's `ControlBlock`. The callback methods on `Fsm`
//! are the trampolines it calls; each one looks the owning NCP up through
//! the control block and forwards to it, or does nothing when the NCP is
//! gone.

use std::cell::Cell;
use std::rc::Rc;

use log::warn;

use crate::ncp::Ncp;
use crate::pcb::ControlBlock;
use crate::types::{protocol_name, ConfigurationOptionState};

const CATEGORY: &str = "net.ppp.ncp";

/// RFC 1661 automaton states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FsmState {
    #[default]
    Initial,
    Starting,
    Closed,
    Stopped,
    Closing,
    Stopping,
    ReqSent,
    AckRcvd,
    AckSent,
    Opened,
}

/// The option negotiation automaton. Implementations must accept being
/// re-entered from the callbacks they invoke (an NCP may call `close` from
/// inside `up`).
pub trait FsmCore {
    fn init(&self, fsm: &Fsm);
    fn input(&self, fsm: &Fsm, packet: &[u8]);
    fn open(&self, fsm: &Fsm);
    fn close(&self, fsm: &Fsm, reason: &str);
    fn lower_up(&self, fsm: &Fsm);
    fn lower_down(&self, fsm: &Fsm);
    fn protocol_reject(&self, fsm: &Fsm);
}

pub struct Fsm {
    protocol: u16,
    pcb: Rc<ControlBlock>,
    state: Cell<FsmState>,
}

impl Fsm {
    pub fn new(protocol: u16, pcb: Rc<ControlBlock>) -> Self {
        Self {
            protocol,
            pcb,
            state: Cell::new(FsmState::Initial),
        }
    }

    pub fn protocol(&self) -> u16 {
        self.protocol
    }

    pub fn protocol_name(&self) -> &'static str {
        protocol_name(self.protocol)
    }

    pub fn pcb(&self) -> &Rc<ControlBlock> {
        &self.pcb
    }

    pub fn state(&self) -> FsmState {
        self.state.get()
    }

    /// Owned by the core; NCPs only read it.
    pub fn set_state(&self, state: FsmState) {
        self.state.set(state);
    }

    fn with_ncp<R>(&self, default: R, f: impl FnOnce(&dyn Ncp) -> R) -> R {
        match self.pcb.context(self.protocol) {
            Some(ncp) => f(&*ncp),
            None => {
                warn!(target: CATEGORY, "{} callback without an attached instance", self.protocol_name());
                default
            }
        }
    }

    // Callbacks invoked by the core

    pub fn reset_ci(&self) {
        self.with_ncp((), |ncp| ncp.reset_configuration_information())
    }

    pub fn ci_len(&self) -> usize {
        self.with_ncp(0, |ncp| ncp.configuration_information_length())
    }

    pub fn add_ci(&self, buf: &mut [u8]) -> usize {
        self.with_ncp(0, |ncp| ncp.add_configuration_information(buf))
    }

    pub fn ack_ci(&self, buf: &[u8]) -> bool {
        self.with_ncp(false, |ncp| ncp.ack_configuration_information(buf))
    }

    pub fn nak_ci(&self, buf: &[u8], treat_as_reject: bool) -> bool {
        self.with_ncp(false, |ncp| ncp.nak_configuration_information(buf, treat_as_reject))
    }

    pub fn rej_ci(&self, buf: &[u8]) -> bool {
        self.with_ncp(false, |ncp| ncp.reject_configuration_information(buf))
    }

    pub fn req_ci(
        &self,
        buf: &mut [u8],
        len: usize,
        reject_if_disagree: bool,
    ) -> (ConfigurationOptionState, usize) {
        self.with_ncp((ConfigurationOptionState::Err, 0), |ncp| {
            ncp.request_configuration_information(buf, len, reject_if_disagree)
        })
    }

    pub fn up(&self) {
        self.with_ncp((), |ncp| ncp.up())
    }

    pub fn down(&self) {
        self.with_ncp((), |ncp| ncp.down())
    }

    pub fn starting(&self) {
        self.with_ncp((), |ncp| ncp.starting())
    }

    pub fn finished(&self) {
        self.with_ncp((), |ncp| ncp.finished())
    }

    pub fn ext_code(&self, code: u8, id: u8, buf: &[u8]) -> bool {
        self.with_ncp(false, |ncp| ncp.ext_code(code, id, buf))
    }
}
