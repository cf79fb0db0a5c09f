use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use log::error;

use crate::fsm::{Fsm, FsmCore, FsmState};
use crate::option::ConfigurationOption;
use crate::pcb::ControlBlock;
use crate::registry::OptionRegistry;
use crate::types::ConfigurationOptionState;

const CATEGORY: &str = "net.ppp.ncp";

/// A network control protocol as seen by the link layer and the FSM core.
///
/// Every method takes `&self`: the core calls back into the NCP while the NCP
/// is itself inside a core call, so implementations keep their state in
/// cells and never hold a borrow across a call into the core.
pub trait Ncp {
    // Link layer entry points
    fn init(&self);
    fn input(&self, packet: &[u8]);
    fn protocol_reject(&self);
    fn lower_up(&self);
    fn lower_down(&self);
    fn open(&self);
    fn close(&self, reason: &str);

    // FSM callbacks
    fn reset_configuration_information(&self);
    fn configuration_information_length(&self) -> usize;
    /// Returns the number of bytes written to `buf`.
    fn add_configuration_information(&self, buf: &mut [u8]) -> usize;
    fn ack_configuration_information(&self, buf: &[u8]) -> bool;
    fn nak_configuration_information(&self, buf: &[u8], treat_as_reject: bool) -> bool;
    fn reject_configuration_information(&self, buf: &[u8]) -> bool;
    /// Judges the peer's request held in `buf[..len]` and writes the reply
    /// over it. Returns the reply type and the reply length.
    fn request_configuration_information(
        &self,
        buf: &mut [u8],
        len: usize,
        reject_if_disagree: bool,
    ) -> (ConfigurationOptionState, usize);
    fn up(&self);
    fn down(&self);
    fn starting(&self);
    fn finished(&self);
    fn ext_code(&self, code: u8, id: u8, buf: &[u8]) -> bool;
}

/// State every NCP shares: its FSM control block, the core driving it and
/// its option registry. Attaching to the control block happens here and so
/// does severing the link again on drop.
pub struct NcpBase {
    fsm: Fsm,
    core: Rc<dyn FsmCore>,
    options: RefCell<OptionRegistry>,
}

impl NcpBase {
    pub fn new(
        pcb: Rc<ControlBlock>,
        protocol: u16,
        core: Rc<dyn FsmCore>,
        handler: Weak<dyn Ncp>,
    ) -> Self {
        pcb.attach(protocol, handler);
        Self {
            fsm: Fsm::new(protocol, pcb),
            core,
            options: RefCell::new(OptionRegistry::new()),
        }
    }

    pub fn fsm(&self) -> &Fsm {
        &self.fsm
    }

    pub fn fsm_state(&self) -> FsmState {
        self.fsm.state()
    }

    pub fn pcb(&self) -> &Rc<ControlBlock> {
        self.fsm.pcb()
    }

    pub fn protocol(&self) -> u16 {
        self.fsm.protocol()
    }

    pub fn register_option(&self, option: Box<dyn ConfigurationOption>) -> bool {
        let id = option.id();
        let added = self.options.borrow_mut().register(option);
        if !added {
            error!(target: CATEGORY, "{}: option {} is already registered", self.fsm.protocol_name(), id);
        }
        added
    }

    pub fn request_option(&self, id: u8) -> bool {
        self.options.borrow_mut().request(id)
    }

    pub fn has_option(&self, id: u8) -> bool {
        self.options.borrow().find(id).is_some()
    }

    pub fn for_each_option<F>(&self, f: F)
    where
        F: FnMut(&mut dyn ConfigurationOption),
    {
        self.options.borrow_mut().for_each_mut(f);
    }

    pub fn options(&self) -> Ref<'_, OptionRegistry> {
        self.options.borrow()
    }

    pub fn options_mut(&self) -> RefMut<'_, OptionRegistry> {
        self.options.borrow_mut()
    }

    // Calls into the core. No registry borrow may be alive here.

    pub fn fsm_init(&self) {
        self.core.init(&self.fsm);
    }

    pub fn fsm_input(&self, packet: &[u8]) {
        self.core.input(&self.fsm, packet);
    }

    pub fn fsm_open(&self) {
        self.core.open(&self.fsm);
    }

    pub fn fsm_close(&self, reason: &str) {
        self.core.close(&self.fsm, reason);
    }

    pub fn fsm_lower_up(&self) {
        self.core.lower_up(&self.fsm);
    }

    pub fn fsm_lower_down(&self) {
        self.core.lower_down(&self.fsm);
    }

    pub fn fsm_protocol_reject(&self) {
        self.core.protocol_reject(&self.fsm);
    }
}

impl Drop for NcpBase {
    fn drop(&mut self) {
        // The control block may be reused for another session
        self.fsm.pcb().detach(self.fsm.protocol());
    }
}
