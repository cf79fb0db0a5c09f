//! Lower-layer PPP control block.
//!
//! The link layer owns one `ControlBlock` per PPP session. Network control
//! protocols attach themselves to it by protocol number; every call the link
//! layer or the FSM core makes into an NCP is routed through that table. A
//! slot holds only a weak handle and is severed when the NCP is dropped, so a
//! control block that outlives its NCPs simply stops dispatching to them.

use std::cell::{Cell, RefCell};
use std::net::Ipv4Addr;
use std::rc::{Rc, Weak};

use log::{info, trace, warn};

use crate::ncp::Ncp;
use crate::types::protocol_name;

const CATEGORY: &str = "net.ppp.pcb";

/// Interface the negotiated configuration is applied to.
pub trait NetworkInterface {
    fn set_up(&mut self);
    fn set_down(&mut self);
    fn set_addresses(&mut self, address: Ipv4Addr, netmask: Ipv4Addr, peer: Ipv4Addr);
    fn set_dns_server(&mut self, slot: usize, server: Ipv4Addr);
}

/// Network-layer side of the session, told when an NCP comes up or goes down.
///
/// Called with no borrow of the control block held, so a listener may react
/// by closing the protocol again.
pub trait ProtocolListener {
    fn protocol_up(&self, protocol: u16);
    fn protocol_down(&self, protocol: u16);
}

/// Listener that does nothing.
pub struct NoopListener;

impl ProtocolListener for NoopListener {
    fn protocol_up(&self, _protocol: u16) {}
    fn protocol_down(&self, _protocol: u16) {}
}

struct ProtocolSlot {
    protocol: u16,
    handler: Weak<dyn Ncp>,
}

pub struct ControlBlock {
    slots: RefCell<Vec<ProtocolSlot>>,
    netif: RefCell<Box<dyn NetworkInterface>>,
    listener: Box<dyn ProtocolListener>,
    protocols_up: Cell<usize>,
}

impl ControlBlock {
    pub fn new(netif: Box<dyn NetworkInterface>, listener: Box<dyn ProtocolListener>) -> Rc<Self> {
        Rc::new(Self {
            slots: RefCell::new(Vec::new()),
            netif: RefCell::new(netif),
            listener,
            protocols_up: Cell::new(0),
        })
    }

    /// Install `handler` as the context for `protocol`, replacing any previous one.
    pub fn attach(&self, protocol: u16, handler: Weak<dyn Ncp>) {
        let mut slots = self.slots.borrow_mut();
        slots.retain(|slot| slot.protocol != protocol);
        slots.push(ProtocolSlot { protocol, handler });
        trace!(target: CATEGORY, "attached {}", protocol_name(protocol));
    }

    /// Drop the slot for `protocol` if its handler is gone.
    pub fn detach(&self, protocol: u16) {
        let mut slots = self.slots.borrow_mut();
        slots.retain(|slot| !(slot.protocol == protocol && slot.handler.strong_count() == 0));
        trace!(target: CATEGORY, "detached {}", protocol_name(protocol));
    }

    pub fn is_attached(&self, protocol: u16) -> bool {
        self.context(protocol).is_some()
    }

    /// Resolve the NCP registered for `protocol`, if it is still alive.
    pub fn context(&self, protocol: u16) -> Option<Rc<dyn Ncp>> {
        self.slots
            .borrow()
            .iter()
            .find(|slot| slot.protocol == protocol)
            .and_then(|slot| slot.handler.upgrade())
    }

    /// Run `f` against the NCP for `protocol`, or return `default` when none is attached.
    pub fn dispatch<R>(&self, protocol: u16, default: R, f: impl FnOnce(&dyn Ncp) -> R) -> R {
        match self.context(protocol) {
            Some(ncp) => f(&*ncp),
            None => {
                warn!(target: CATEGORY, "no {} instance attached, ignoring", protocol_name(protocol));
                default
            }
        }
    }

    // Protocol entry points used by the link layer

    pub fn init(&self, protocol: u16) {
        self.dispatch(protocol, (), |ncp| ncp.init())
    }

    pub fn input(&self, protocol: u16, packet: &[u8]) {
        self.dispatch(protocol, (), |ncp| ncp.input(packet))
    }

    pub fn protocol_reject(&self, protocol: u16) {
        self.dispatch(protocol, (), |ncp| ncp.protocol_reject())
    }

    pub fn lower_up(&self, protocol: u16) {
        self.dispatch(protocol, (), |ncp| ncp.lower_up())
    }

    pub fn lower_down(&self, protocol: u16) {
        self.dispatch(protocol, (), |ncp| ncp.lower_down())
    }

    pub fn open(&self, protocol: u16) {
        self.dispatch(protocol, (), |ncp| ncp.open())
    }

    pub fn close(&self, protocol: u16, reason: &str) {
        self.dispatch(protocol, (), |ncp| ncp.close(reason))
    }

    // Services used by NCPs

    pub fn with_netif<R>(&self, f: impl FnOnce(&mut dyn NetworkInterface) -> R) -> R {
        let mut netif = self.netif.borrow_mut();
        f(&mut **netif)
    }

    pub fn np_up(&self, protocol: u16) {
        self.protocols_up.set(self.protocols_up.get() + 1);
        info!(target: CATEGORY, "{} is up", protocol_name(protocol));
        self.listener.protocol_up(protocol);
    }

    pub fn np_down(&self, protocol: u16) {
        self.protocols_up.set(self.protocols_up.get().saturating_sub(1));
        info!(target: CATEGORY, "{} is down", protocol_name(protocol));
        self.listener.protocol_down(protocol);
    }

    pub fn protocols_up(&self) -> usize {
        self.protocols_up.get()
    }
}
