//! IP Control Protocol (RFC 1332) with the Microsoft DNS extensions (RFC 1877).

use std::cell::{Cell, RefCell};
use std::net::Ipv4Addr;
use std::rc::{Rc, Weak};

use log::{error, info, trace, warn};

use crate::fsm::{FsmCore, FsmState};
use crate::log::log_options;
use crate::ncp::{Ncp, NcpBase};
use crate::option::{AddressOption, ConfigurationOption, UnknownOption};
use crate::pcb::ControlBlock;
use crate::types::{
    code, option_id, ConfigurationOptionState, IpcpConfiguration, IpcpSession, IPCP_PROTOCOL_NAME,
    PPP_IPCP,
};

const CATEGORY: &str = "net.ppp.ipcp";

pub struct Ipcp {
    ncp: NcpBase,
    config: RefCell<IpcpConfiguration>,
    /// We want the protocol up.
    adm_state: Cell<bool>,
    /// The link below us is up.
    lower_state: Cell<bool>,
    /// We told the network layer we are up.
    state: Cell<bool>,
    dns_index: Cell<usize>,
}

impl Ipcp {
    /// Create an IPCP instance attached to `pcb`. IP-Address and both DNS
    /// servers are requested; the netmask is registered but only negotiated
    /// if the peer asks or `request_option` is called.
    pub fn new(pcb: Rc<ControlBlock>, core: Rc<dyn FsmCore>) -> Rc<Self> {
        Self::with_configuration(pcb, core, IpcpConfiguration::default())
    }

    pub fn with_configuration(
        pcb: Rc<ControlBlock>,
        core: Rc<dyn FsmCore>,
        config: IpcpConfiguration,
    ) -> Rc<Self> {
        Rc::new_cyclic(|me: &Weak<Ipcp>| {
            let handler: Weak<dyn Ncp> = me.clone();
            let ncp = NcpBase::new(pcb, PPP_IPCP, core, handler);

            ncp.register_option(Box::new(AddressOption::ip_address()));
            ncp.register_option(Box::new(AddressOption::netmask()));
            ncp.register_option(Box::new(AddressOption::primary_dns()));
            ncp.register_option(Box::new(AddressOption::secondary_dns()));

            ncp.request_option(option_id::IP_ADDRESS);
            ncp.request_option(option_id::PRIMARY_DNS_SERVER);
            ncp.request_option(option_id::SECONDARY_DNS_SERVER);

            Ipcp {
                ncp,
                config: RefCell::new(config),
                adm_state: Cell::new(false),
                lower_state: Cell::new(false),
                state: Cell::new(false),
                dns_index: Cell::new(0),
            }
        })
    }

    pub fn ncp(&self) -> &NcpBase {
        &self.ncp
    }

    pub fn fsm_state(&self) -> FsmState {
        self.ncp.fsm_state()
    }

    pub fn request_option(&self, id: u8) -> bool {
        self.ncp.request_option(id)
    }

    /// Request exactly `ids` from now on. Unknown ids are ignored.
    pub fn set_requested_options(&self, ids: &[u8]) {
        let mut options = self.ncp.options_mut();
        options.clear_requests();
        for id in ids {
            if !options.request(*id) {
                warn!(target: CATEGORY, "cannot request unregistered option {}", id);
            }
        }
    }

    pub fn enable(&self) {
        trace!(
            target: CATEGORY,
            "IPCP: enable {} {} {}",
            self.adm_state.get(),
            self.lower_state.get(),
            self.state.get()
        );
        if !self.adm_state.get() {
            self.adm_state.set(true);
            if self.lower_state.get() && !self.state.get() {
                self.open();
            }
        }
    }

    pub fn disable(&self) {
        trace!(
            target: CATEGORY,
            "IPCP: disable {} {} {}",
            self.adm_state.get(),
            self.lower_state.get(),
            self.state.get()
        );
        if self.adm_state.get() {
            self.adm_state.set(false);
            if self.lower_state.get() && self.state.get() {
                self.close("Administrative down");
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.adm_state.get()
    }

    pub fn is_lower_up(&self) -> bool {
        self.lower_state.get()
    }

    /// Whether the network layer has been told this protocol is up.
    pub fn is_up(&self) -> bool {
        self.state.get()
    }

    pub fn set_dns_entry_index(&self, idx: usize) {
        self.dns_index.set(idx);
    }

    pub fn dns_entry_index(&self) -> usize {
        self.dns_index.get()
    }

    pub fn configuration(&self) -> IpcpConfiguration {
        self.config.borrow().clone()
    }

    pub fn set_local_address(&self, addr: Option<Ipv4Addr>) {
        self.config.borrow_mut().local_address = addr;
    }

    pub fn set_peer_address(&self, addr: Option<Ipv4Addr>) {
        self.config.borrow_mut().peer_address = addr;
    }

    pub fn set_netmask(&self, netmask: Option<Ipv4Addr>) {
        self.config.borrow_mut().peer_netmask = netmask;
    }

    pub fn set_primary_dns(&self, dns: Option<Ipv4Addr>) {
        self.config.borrow_mut().primary_dns = dns;
    }

    pub fn set_secondary_dns(&self, dns: Option<Ipv4Addr>) {
        self.config.borrow_mut().secondary_dns = dns;
    }

    pub fn set_default_peer_address(&self, addr: Option<Ipv4Addr>) {
        self.config.borrow_mut().default_peer_address = addr;
    }

    pub fn local_address(&self) -> Option<Ipv4Addr> {
        self.config.borrow().local_address
    }

    pub fn peer_address(&self) -> Option<Ipv4Addr> {
        self.config.borrow().peer_address
    }

    pub fn netmask(&self) -> Option<Ipv4Addr> {
        self.config.borrow().peer_netmask
    }

    pub fn primary_dns(&self) -> Option<Ipv4Addr> {
        self.config.borrow().primary_dns
    }

    pub fn secondary_dns(&self) -> Option<Ipv4Addr> {
        self.config.borrow().secondary_dns
    }

    fn negotiated(&self, id: u8, pick: impl FnOnce(&AddressOption) -> Option<Ipv4Addr>) -> Option<Ipv4Addr> {
        let options = self.ncp.options();
        options.find(id).and_then(|opt| opt.as_address()).and_then(pick)
    }

    pub fn negotiated_local_address(&self) -> Option<Ipv4Addr> {
        self.negotiated(option_id::IP_ADDRESS, |opt| {
            acked(opt.state_local()).then(|| opt.local_address()).flatten()
        })
    }

    pub fn negotiated_peer_address(&self) -> Option<Ipv4Addr> {
        self.negotiated(option_id::IP_ADDRESS, |opt| {
            acked(opt.state_peer()).then(|| opt.peer_address()).flatten()
        })
    }

    pub fn negotiated_netmask(&self) -> Ipv4Addr {
        self.negotiated(option_id::IP_NETMASK, |opt| {
            acked(opt.state_local()).then(|| opt.local_address()).flatten()
        })
        .unwrap_or(Ipv4Addr::BROADCAST)
    }

    pub fn negotiated_primary_dns(&self) -> Option<Ipv4Addr> {
        self.negotiated(option_id::PRIMARY_DNS_SERVER, |opt| {
            acked(opt.state_local()).then(|| opt.local_address()).flatten()
        })
    }

    pub fn negotiated_secondary_dns(&self) -> Option<Ipv4Addr> {
        self.negotiated(option_id::SECONDARY_DNS_SERVER, |opt| {
            acked(opt.state_local()).then(|| opt.local_address()).flatten()
        })
    }

    /// Snapshot of everything negotiated so far.
    pub fn session(&self) -> IpcpSession {
        IpcpSession {
            ip: self.negotiated_local_address(),
            peer: self.negotiated_peer_address(),
            netmask: self.negotiated_netmask(),
            dns1: self.negotiated_primary_dns(),
            dns2: self.negotiated_secondary_dns(),
        }
    }
}

fn acked(state: ConfigurationOptionState) -> bool {
    state == ConfigurationOptionState::Ack
}

/// Reply TLV for the outcome `opt` just reached on a peer request.
fn render_reply(opt: &mut dyn ConfigurationOption) -> Vec<u8> {
    let mut reply = vec![0u8; opt.length()];
    let written = match opt.state_peer() {
        ConfigurationOptionState::Ack => opt.send_configure_ack(&mut reply),
        ConfigurationOptionState::Nak => opt.send_configure_nak(&mut reply),
        ConfigurationOptionState::Rej => opt.send_configure_rej(&mut reply),
        _ => 0,
    };
    reply.truncate(written);
    reply
}

impl Ncp for Ipcp {
    fn init(&self) {
        trace!(target: CATEGORY, "IPCP: init");
        self.ncp.fsm_init();
    }

    fn input(&self, packet: &[u8]) {
        trace!(target: CATEGORY, "IPCP: input {}", packet.len());
        self.ncp.fsm_input(packet);
    }

    fn protocol_reject(&self) {
        trace!(target: CATEGORY, "IPCP: Protocol-Reject");
        // RFC 1661: stop sending packets of the rejected protocol
        self.ncp.fsm_protocol_reject();
    }

    fn lower_up(&self) {
        trace!(target: CATEGORY, "IPCP: lowerUp");
        self.lower_state.set(true);
        self.ncp.fsm_lower_up();
    }

    fn lower_down(&self) {
        trace!(target: CATEGORY, "IPCP: lowerDown");
        self.lower_state.set(false);
        self.ncp.fsm_lower_down();
    }

    fn open(&self) {
        trace!(target: CATEGORY, "IPCP: open");
        if self.adm_state.get() {
            self.ncp.fsm_open();
        } else {
            trace!(target: CATEGORY, "IPCP is not allowed to come up");
        }
    }

    fn close(&self, reason: &str) {
        trace!(target: CATEGORY, "IPCP: close ({})", reason);
        self.ncp.fsm_close(reason);
    }

    fn reset_configuration_information(&self) {
        trace!(target: CATEGORY, "IPCP: reset ci");
        let conf = self.config.borrow().clone();

        self.ncp.for_each_option(|opt| {
            opt.reset();

            let id = opt.id();
            let Some(o) = opt.as_address_mut() else {
                return;
            };
            match id {
                option_id::IP_ADDRESS => {
                    o.set_local_address(conf.local_address);
                    o.set_peer_address(conf.peer_address);
                }
                option_id::IP_NETMASK => {
                    o.set_local_address(conf.peer_netmask);
                    o.set_peer_address(conf.peer_netmask);
                }
                option_id::PRIMARY_DNS_SERVER => {
                    o.set_local_address(conf.primary_dns);
                    o.set_peer_address(conf.primary_dns);
                }
                option_id::SECONDARY_DNS_SERVER => {
                    o.set_local_address(conf.secondary_dns);
                    o.set_peer_address(conf.secondary_dns);
                }
                _ => {}
            }
        });
    }

    fn configuration_information_length(&self) -> usize {
        let mut len = 0;
        self.ncp.options().for_each(|opt| {
            if opt.negotiation().wants_request() {
                len += opt.length();
            }
        });
        trace!(target: CATEGORY, "IPCP: Our CI length: {}", len);
        len
    }

    fn add_configuration_information(&self, buf: &mut [u8]) -> usize {
        let mut written = 0;
        self.ncp.for_each_option(|opt| {
            if opt.negotiation().wants_request() {
                written += opt.send_configure_req(&mut buf[written..]);
            }
        });
        log_options(IPCP_PROTOCOL_NAME, "Send", code::CONFIGURE_REQUEST, &buf[..written]);
        written
    }

    fn ack_configuration_information(&self, buf: &[u8]) -> bool {
        trace!(target: CATEGORY, "IPCP: ack ci");
        log_options(IPCP_PROTOCOL_NAME, "Received", code::CONFIGURE_ACK, buf);

        let mut options = self.ncp.options_mut();
        let mut offset = 0;
        while offset < buf.len() {
            let rest = &buf[offset..];
            match options.find_mut(rest[0]) {
                Some(opt) => {
                    let l = opt.recv_configure_ack(rest);
                    if l == 0 {
                        break;
                    }
                    offset += l;
                }
                None => {
                    error!(target: CATEGORY, "Peer ACK'd an option unknown to us");
                    break;
                }
            }
        }

        offset == buf.len()
    }

    fn nak_configuration_information(&self, buf: &[u8], treat_as_reject: bool) -> bool {
        trace!(target: CATEGORY, "IPCP: nak ci");
        log_options(IPCP_PROTOCOL_NAME, "Received", code::CONFIGURE_NAK, buf);

        let mut options = self.ncp.options_mut();
        let mut offset = 0;
        while offset < buf.len() {
            let rest = &buf[offset..];
            match options.find_mut(rest[0]) {
                Some(opt) => {
                    let l = if treat_as_reject {
                        opt.recv_configure_rej(rest)
                    } else {
                        opt.recv_configure_nak(rest)
                    };
                    if l == 0 {
                        return false;
                    }
                    offset += l;
                }
                None => {
                    // Not fatal: what we already took from this Nak stays valid
                    error!(target: CATEGORY, "Peer NAK'd an option unknown to us");
                    return true;
                }
            }
        }

        offset == buf.len()
    }

    fn reject_configuration_information(&self, buf: &[u8]) -> bool {
        trace!(target: CATEGORY, "IPCP: reject ci");
        log_options(IPCP_PROTOCOL_NAME, "Received", code::CONFIGURE_REJECT, buf);

        let mut options = self.ncp.options_mut();
        let mut offset = 0;
        while offset < buf.len() {
            let rest = &buf[offset..];
            match options.find_mut(rest[0]) {
                Some(opt) => {
                    let l = opt.recv_configure_rej(rest);
                    if l == 0 {
                        break;
                    }
                    offset += l;
                }
                None => {
                    error!(target: CATEGORY, "Peer REJECTED an option unknown to us");
                    break;
                }
            }
        }

        offset == buf.len()
    }

    fn request_configuration_information(
        &self,
        buf: &mut [u8],
        len: usize,
        reject_if_disagree: bool,
    ) -> (ConfigurationOptionState, usize) {
        trace!(target: CATEGORY, "IPCP: request ci");
        let len = len.min(buf.len());
        log_options(IPCP_PROTOCOL_NAME, "Received", code::CONFIGURE_REQUEST, &buf[..len]);

        let mut options = self.ncp.options_mut();

        // Judge every option first, the reply type is the worst outcome seen.
        // Each reply is rendered as soon as its option is judged: a later TLV
        // with the same id must not change what an earlier one answers.
        let mut judged: Vec<(ConfigurationOptionState, Vec<u8>)> = Vec::new();
        let mut offset = 0;
        while offset < len {
            let rest = &buf[offset..len];
            let (consumed, outcome, reply) = match options.find_mut(rest[0]) {
                Some(opt) => {
                    let l = opt.recv_configure_req(rest);
                    if l == 0 {
                        break;
                    }
                    if reject_if_disagree && opt.state_peer() == ConfigurationOptionState::Nak {
                        opt.negotiation_mut().state_peer = ConfigurationOptionState::Rej;
                    }
                    (l, opt.state_peer(), render_reply(opt))
                }
                None => {
                    let mut unknown = UnknownOption::new();
                    let l = unknown.recv_configure_req(rest);
                    if l == 0 {
                        break;
                    }
                    (l, unknown.state_peer(), render_reply(&mut unknown))
                }
            };
            judged.push((outcome, reply));
            offset += consumed;
        }

        let resulting_state = judged
            .iter()
            .map(|(outcome, _)| *outcome)
            .fold(ConfigurationOptionState::Ack, std::cmp::max);

        // Reply only with the options sharing that outcome
        let mut written = 0;
        for (outcome, reply) in &judged {
            if *outcome != resulting_state {
                continue;
            }
            let Some(out) = buf.get_mut(written..written + reply.len()) else {
                break;
            };
            out.copy_from_slice(reply);
            written += reply.len();
        }

        if let Some(reply) = resulting_state.reply_code() {
            log_options(IPCP_PROTOCOL_NAME, "Send", reply, &buf[..written]);
        }

        (resulting_state, written)
    }

    fn up(&self) {
        trace!(target: CATEGORY, "IPCP: up");

        let session = self.session();
        let default_peer = self.config.borrow().default_peer_address;
        let peer = session.peer.or(default_peer);

        let (Some(ip), Some(peer)) = (session.ip, peer) else {
            // Teardown
            self.close("Failed to negotiate local or peer IP");
            return;
        };

        if session.dns1.is_none() && session.dns2.is_none() {
            self.close("Failed to negotiate DNS servers");
            return;
        }

        let dns_index = self.dns_index.get();
        self.ncp.pcb().with_netif(|netif| {
            netif.set_up();
            netif.set_addresses(ip, session.netmask, peer);
            if let Some(dns) = session.dns1 {
                netif.set_dns_server(dns_index, dns);
            }
            if let Some(dns) = session.dns2 {
                netif.set_dns_server(dns_index + 1, dns);
            }
        });

        info!(target: CATEGORY, "local {} peer {} mask {}", ip, peer, session.netmask);

        if !self.state.get() {
            self.state.set(true);
            self.ncp.pcb().np_up(self.ncp.protocol());
        }
    }

    fn down(&self) {
        trace!(target: CATEGORY, "IPCP: down");

        self.ncp.pcb().with_netif(|netif| {
            netif.set_down();
            netif.set_addresses(Ipv4Addr::UNSPECIFIED, Ipv4Addr::BROADCAST, Ipv4Addr::UNSPECIFIED);
        });

        if self.state.get() {
            self.state.set(false);
            self.ncp.pcb().np_down(self.ncp.protocol());
        }
    }

    fn starting(&self) {
        trace!(target: CATEGORY, "IPCP: starting");
    }

    fn finished(&self) {
        trace!(target: CATEGORY, "IPCP: finished");
    }

    fn ext_code(&self, code: u8, id: u8, _buf: &[u8]) -> bool {
        trace!(target: CATEGORY, "IPCP: ext code {} {}", code, id);
        false
    }
}
