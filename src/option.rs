//! Negotiable IPCP configuration options.
//!
//! Every option is a TLV on the wire: type, total length (header included),
//! then the value. Each option tracks two independent negotiations: ours
//! (`state_local`, what the peer thinks of our request) and the peer's
//! (`state_peer`, what we think of its request).
//!
//! All codec routines return the number of bytes written or consumed; 0 means
//! "could not proceed" and the caller must not advance past this option.

use std::net::Ipv4Addr;

use crate::parser::OPTION_HEADER_LEN;
use crate::types::{option_id, ConfigurationOptionState, OPTION_FLAG_REQUEST};

/// Negotiation bookkeeping shared by every option type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionNegotiation {
    pub id: u8,
    pub length: usize,
    pub state_local: ConfigurationOptionState,
    pub state_peer: ConfigurationOptionState,
    pub flags_local: u8,
    pub flags_peer: u8,
}

impl OptionNegotiation {
    pub fn new(id: u8, length: usize) -> Self {
        Self {
            id,
            length,
            state_local: ConfigurationOptionState::None,
            state_peer: ConfigurationOptionState::None,
            flags_local: 0,
            flags_peer: 0,
        }
    }

    pub fn is_requested(&self) -> bool {
        self.flags_local & OPTION_FLAG_REQUEST != 0
    }

    /// Requested by us and neither acknowledged nor rejected yet.
    pub fn wants_request(&self) -> bool {
        self.is_requested()
            && matches!(
                self.state_local,
                ConfigurationOptionState::None | ConfigurationOptionState::Nak
            )
    }
}

pub trait ConfigurationOption {
    fn negotiation(&self) -> &OptionNegotiation;
    fn negotiation_mut(&mut self) -> &mut OptionNegotiation;

    fn id(&self) -> u8 {
        self.negotiation().id
    }

    fn length(&self) -> usize {
        self.negotiation().length
    }

    fn state_local(&self) -> ConfigurationOptionState {
        self.negotiation().state_local
    }

    fn state_peer(&self) -> ConfigurationOptionState {
        self.negotiation().state_peer
    }

    /// Forget the outcome of the previous round. Identity and values stay.
    fn reset(&mut self) {
        let n = self.negotiation_mut();
        n.state_local = ConfigurationOptionState::None;
        n.state_peer = ConfigurationOptionState::None;
    }

    fn validate(&self, buf: &[u8]) -> bool {
        let n = self.negotiation();
        buf.len() >= OPTION_HEADER_LEN
            && buf[0] == n.id
            && buf[1] as usize == n.length
            && buf.len() >= n.length
    }

    fn send_configure_req(&mut self, buf: &mut [u8]) -> usize;

    fn recv_configure_ack(&mut self, buf: &[u8]) -> usize;
    fn recv_configure_nak(&mut self, buf: &[u8]) -> usize;
    fn recv_configure_rej(&mut self, buf: &[u8]) -> usize;

    /// Judge the peer's value. Returns the consumed length on structural
    /// success whatever `state_peer` ends up being.
    fn recv_configure_req(&mut self, buf: &[u8]) -> usize;

    fn send_configure_ack(&mut self, buf: &mut [u8]) -> usize;
    fn send_configure_nak(&mut self, buf: &mut [u8]) -> usize;
    fn send_configure_rej(&mut self, buf: &mut [u8]) -> usize;

    fn as_address(&self) -> Option<&AddressOption> {
        None
    }

    fn as_address_mut(&mut self) -> Option<&mut AddressOption> {
        None
    }
}

fn encode_address(addr: Option<Ipv4Addr>) -> [u8; 4] {
    addr.unwrap_or(Ipv4Addr::UNSPECIFIED).octets()
}

fn decode_address(value: &[u8]) -> Option<Ipv4Addr> {
    let addr = Ipv4Addr::new(value[0], value[1], value[2], value[3]);
    if addr.is_unspecified() {
        None
    } else {
        Some(addr)
    }
}

/// An option carrying one IPv4 address: IP-Address, IP-Netmask and the two
/// DNS server options only differ by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressOption {
    negotiation: OptionNegotiation,
    local: Option<Ipv4Addr>,
    peer: Option<Ipv4Addr>,
    peer_idea: Option<Ipv4Addr>,
}

impl AddressOption {
    pub const LENGTH: usize = OPTION_HEADER_LEN + 4;

    pub fn new(id: u8) -> Self {
        Self {
            negotiation: OptionNegotiation::new(id, Self::LENGTH),
            local: None,
            peer: None,
            peer_idea: None,
        }
    }

    pub fn ip_address() -> Self {
        Self::new(option_id::IP_ADDRESS)
    }

    pub fn netmask() -> Self {
        Self::new(option_id::IP_NETMASK)
    }

    pub fn primary_dns() -> Self {
        Self::new(option_id::PRIMARY_DNS_SERVER)
    }

    pub fn secondary_dns() -> Self {
        Self::new(option_id::SECONDARY_DNS_SERVER)
    }

    /// The value we propose in our Configure-Requests.
    pub fn local_address(&self) -> Option<Ipv4Addr> {
        self.local
    }

    pub fn set_local_address(&mut self, addr: Option<Ipv4Addr>) {
        self.local = addr;
    }

    /// The value we expect from (or suggest to) the peer.
    pub fn peer_address(&self) -> Option<Ipv4Addr> {
        self.peer
    }

    pub fn set_peer_address(&mut self, addr: Option<Ipv4Addr>) {
        self.peer = addr;
    }

    /// Last value the peer asked for.
    pub fn peer_idea(&self) -> Option<Ipv4Addr> {
        self.peer_idea
    }

    fn write(&self, buf: &mut [u8], addr: Option<Ipv4Addr>) -> usize {
        if buf.len() < Self::LENGTH {
            return 0;
        }
        buf[0] = self.negotiation.id;
        buf[1] = Self::LENGTH as u8;
        buf[OPTION_HEADER_LEN..Self::LENGTH].copy_from_slice(&encode_address(addr));
        Self::LENGTH
    }

    fn value(buf: &[u8]) -> Option<Ipv4Addr> {
        decode_address(&buf[OPTION_HEADER_LEN..AddressOption::LENGTH])
    }
}

impl ConfigurationOption for AddressOption {
    fn negotiation(&self) -> &OptionNegotiation {
        &self.negotiation
    }

    fn negotiation_mut(&mut self) -> &mut OptionNegotiation {
        &mut self.negotiation
    }

    fn send_configure_req(&mut self, buf: &mut [u8]) -> usize {
        self.write(buf, self.local)
    }

    fn recv_configure_ack(&mut self, buf: &[u8]) -> usize {
        if !self.validate(buf) {
            return 0;
        }
        // An Ack must repeat exactly what we asked for
        if Self::value(buf) != self.local {
            return 0;
        }
        self.negotiation.state_local = ConfigurationOptionState::Ack;
        Self::LENGTH
    }

    fn recv_configure_nak(&mut self, buf: &[u8]) -> usize {
        if !self.validate(buf) {
            return 0;
        }
        if self.local.is_none() {
            // We had no opinion, take the peer's suggestion
            self.local = Self::value(buf);
        }
        self.negotiation.state_local = ConfigurationOptionState::Nak;
        Self::LENGTH
    }

    fn recv_configure_rej(&mut self, buf: &[u8]) -> usize {
        if !self.validate(buf) {
            return 0;
        }
        self.negotiation.state_local = ConfigurationOptionState::Rej;
        Self::LENGTH
    }

    fn recv_configure_req(&mut self, buf: &[u8]) -> usize {
        if !self.validate(buf) {
            return 0;
        }

        let value = Self::value(buf);
        self.peer_idea = value;

        self.negotiation.state_peer = match (self.peer, value) {
            (Some(expected), Some(requested)) if expected == requested => {
                ConfigurationOptionState::Ack
            }
            (Some(_), _) => ConfigurationOptionState::Nak,
            (None, Some(requested)) => {
                self.peer = Some(requested);
                ConfigurationOptionState::Nak
            }
            // Neither side has a value to offer
            (None, None) => ConfigurationOptionState::Rej,
        };

        Self::LENGTH
    }

    fn send_configure_ack(&mut self, buf: &mut [u8]) -> usize {
        self.write(buf, self.peer)
    }

    fn send_configure_nak(&mut self, buf: &mut [u8]) -> usize {
        self.write(buf, self.peer)
    }

    fn send_configure_rej(&mut self, buf: &mut [u8]) -> usize {
        self.write(buf, self.peer_idea)
    }

    fn as_address(&self) -> Option<&AddressOption> {
        Some(self)
    }

    fn as_address_mut(&mut self) -> Option<&mut AddressOption> {
        Some(self)
    }
}

/// Stand-in for an option id nobody registered. Keeps the raw TLV and always
/// ends up rejected, echoing the bytes untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOption {
    negotiation: OptionNegotiation,
    raw: Vec<u8>,
}

impl UnknownOption {
    pub fn new() -> Self {
        Self {
            negotiation: OptionNegotiation::new(0, 0),
            raw: Vec::new(),
        }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

impl Default for UnknownOption {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationOption for UnknownOption {
    fn negotiation(&self) -> &OptionNegotiation {
        &self.negotiation
    }

    fn negotiation_mut(&mut self) -> &mut OptionNegotiation {
        &mut self.negotiation
    }

    fn validate(&self, buf: &[u8]) -> bool {
        if buf.len() < OPTION_HEADER_LEN {
            return false;
        }
        let length = buf[1] as usize;
        length >= OPTION_HEADER_LEN && buf.len() >= length
    }

    fn send_configure_req(&mut self, _buf: &mut [u8]) -> usize {
        0
    }

    fn recv_configure_ack(&mut self, _buf: &[u8]) -> usize {
        0
    }

    fn recv_configure_nak(&mut self, _buf: &[u8]) -> usize {
        0
    }

    fn recv_configure_rej(&mut self, _buf: &[u8]) -> usize {
        0
    }

    fn recv_configure_req(&mut self, buf: &[u8]) -> usize {
        if !self.validate(buf) {
            return 0;
        }
        let length = buf[1] as usize;
        self.raw.clear();
        self.raw.extend_from_slice(&buf[..length]);
        self.negotiation.id = buf[0];
        self.negotiation.length = length;
        self.negotiation.state_peer = ConfigurationOptionState::Rej;
        length
    }

    fn send_configure_ack(&mut self, _buf: &mut [u8]) -> usize {
        0
    }

    fn send_configure_nak(&mut self, _buf: &mut [u8]) -> usize {
        0
    }

    fn send_configure_rej(&mut self, buf: &mut [u8]) -> usize {
        if self.raw.is_empty() || buf.len() < self.raw.len() {
            return 0;
        }
        buf[..self.raw.len()].copy_from_slice(&self.raw);
        self.raw.len()
    }
}
