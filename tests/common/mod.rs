#![allow(dead_code)]

use std::cell::RefCell;
use std::net::Ipv4Addr;
use std::rc::Rc;

use ppp_ipcp::fsm::{Fsm, FsmCore, FsmState};
use ppp_ipcp::pcb::{ControlBlock, NetworkInterface, ProtocolListener};
use ppp_ipcp::Ipcp;

/// Core that records every call. `close` behaves like the real automaton
/// leaving OPENED: it calls back into `down` before settling in CLOSED.
#[derive(Default)]
pub struct RecordingCore {
    pub calls: RefCell<Vec<String>>,
}

impl RecordingCore {
    pub fn count(&self, name: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.as_str() == name).count()
    }

    pub fn closes(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| c.strip_prefix("close:").map(str::to_string))
            .collect()
    }
}

impl FsmCore for RecordingCore {
    fn init(&self, fsm: &Fsm) {
        self.calls.borrow_mut().push("init".into());
        fsm.set_state(FsmState::Initial);
    }

    fn input(&self, _fsm: &Fsm, packet: &[u8]) {
        self.calls.borrow_mut().push(format!("input:{}", packet.len()));
    }

    fn open(&self, fsm: &Fsm) {
        self.calls.borrow_mut().push("open".into());
        fsm.set_state(FsmState::ReqSent);
    }

    fn close(&self, fsm: &Fsm, reason: &str) {
        self.calls.borrow_mut().push(format!("close:{}", reason));
        if fsm.state() == FsmState::Opened {
            fsm.down();
        }
        fsm.set_state(FsmState::Closed);
    }

    fn lower_up(&self, fsm: &Fsm) {
        self.calls.borrow_mut().push("lower_up".into());
        fsm.set_state(FsmState::Closed);
    }

    fn lower_down(&self, fsm: &Fsm) {
        self.calls.borrow_mut().push("lower_down".into());
        fsm.set_state(FsmState::Initial);
    }

    fn protocol_reject(&self, fsm: &Fsm) {
        self.calls.borrow_mut().push("protocol_reject".into());
        fsm.set_state(FsmState::Stopped);
    }
}

#[derive(Debug, Default)]
pub struct NetifLog {
    pub up: bool,
    pub up_calls: usize,
    pub down_calls: usize,
    pub addresses: Option<(Ipv4Addr, Ipv4Addr, Ipv4Addr)>,
    pub dns: Vec<(usize, Ipv4Addr)>,
}

pub struct RecordingNetif(pub Rc<RefCell<NetifLog>>);

impl NetworkInterface for RecordingNetif {
    fn set_up(&mut self) {
        let mut log = self.0.borrow_mut();
        log.up = true;
        log.up_calls += 1;
    }

    fn set_down(&mut self) {
        let mut log = self.0.borrow_mut();
        log.up = false;
        log.down_calls += 1;
    }

    fn set_addresses(&mut self, address: Ipv4Addr, netmask: Ipv4Addr, peer: Ipv4Addr) {
        self.0.borrow_mut().addresses = Some((address, netmask, peer));
    }

    fn set_dns_server(&mut self, slot: usize, server: Ipv4Addr) {
        self.0.borrow_mut().dns.push((slot, server));
    }
}

/// (up?, protocol) in the order received.
pub struct RecordingListener(pub Rc<RefCell<Vec<(bool, u16)>>>);

impl ProtocolListener for RecordingListener {
    fn protocol_up(&self, protocol: u16) {
        self.0.borrow_mut().push((true, protocol));
    }

    fn protocol_down(&self, protocol: u16) {
        self.0.borrow_mut().push((false, protocol));
    }
}

pub struct Harness {
    pub pcb: Rc<ControlBlock>,
    pub core: Rc<RecordingCore>,
    pub netif: Rc<RefCell<NetifLog>>,
    pub events: Rc<RefCell<Vec<(bool, u16)>>>,
    pub ipcp: Rc<Ipcp>,
}

pub fn harness() -> Harness {
    let netif = Rc::new(RefCell::new(NetifLog::default()));
    let events = Rc::new(RefCell::new(Vec::new()));
    let pcb = ControlBlock::new(
        Box::new(RecordingNetif(netif.clone())),
        Box::new(RecordingListener(events.clone())),
    );
    let core = Rc::new(RecordingCore::default());
    let ipcp = Ipcp::new(pcb.clone(), core.clone());
    Harness {
        pcb,
        core,
        netif,
        events,
        ipcp,
    }
}

/// One IPv4 option TLV.
pub fn tlv(id: u8, addr: [u8; 4]) -> Vec<u8> {
    let mut v = vec![id, 6];
    v.extend_from_slice(&addr);
    v
}

pub fn concat(parts: &[Vec<u8>]) -> Vec<u8> {
    parts.iter().flatten().copied().collect()
}
