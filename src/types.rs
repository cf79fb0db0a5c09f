use std::net::Ipv4Addr;

/// Negotiation outcome of one option. The ordering is meaningful: a higher
/// value is a worse outcome and wins when replies are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum ConfigurationOptionState {
    #[default]
    None = 0,
    Req = 1,
    Ack = 2,
    Nak = 3,
    Rej = 4,
    Err = 5,
}

impl ConfigurationOptionState {
    /// Control packet code used to answer a Configure-Request with this outcome.
    pub fn reply_code(self) -> Option<u8> {
        match self {
            ConfigurationOptionState::Ack => Some(code::CONFIGURE_ACK),
            ConfigurationOptionState::Nak => Some(code::CONFIGURE_NAK),
            ConfigurationOptionState::Rej => Some(code::CONFIGURE_REJECT),
            _ => None,
        }
    }
}

/// We actively request this option in our own Configure-Requests.
pub const OPTION_FLAG_REQUEST: u8 = 0x01;

/// IPCP option types. Wire values, never renumber.
pub mod option_id {
    pub const IP_COMPRESSION_PROTOCOL: u8 = 2;
    pub const IP_ADDRESS: u8 = 3;
    pub const PRIMARY_DNS_SERVER: u8 = 129;
    pub const SECONDARY_DNS_SERVER: u8 = 131;
    pub const IP_NETMASK: u8 = 144;
}

/// PPP control packet codes (RFC 1661).
pub mod code {
    pub const CONFIGURE_REQUEST: u8 = 1;
    pub const CONFIGURE_ACK: u8 = 2;
    pub const CONFIGURE_NAK: u8 = 3;
    pub const CONFIGURE_REJECT: u8 = 4;
    pub const TERMINATE_REQUEST: u8 = 5;
    pub const TERMINATE_ACK: u8 = 6;
    pub const CODE_REJECT: u8 = 7;

    pub fn name(code: u8) -> &'static str {
        match code {
            CONFIGURE_REQUEST => "Configure-Request",
            CONFIGURE_ACK => "Configure-Ack",
            CONFIGURE_NAK => "Configure-Nak",
            CONFIGURE_REJECT => "Configure-Reject",
            TERMINATE_REQUEST => "Terminate-Request",
            TERMINATE_ACK => "Terminate-Ack",
            CODE_REJECT => "Code-Reject",
            _ => "Unknown",
        }
    }
}

pub const PPP_IP: u16 = 0x0021;
pub const PPP_IPCP: u16 = 0x8021;

pub const IPCP_PROTOCOL_NAME: &str = "IPCP";
pub const IP_PROTOCOL_NAME: &str = "IP";

pub fn protocol_name(protocol: u16) -> &'static str {
    match protocol {
        PPP_IPCP => IPCP_PROTOCOL_NAME,
        PPP_IP => IP_PROTOCOL_NAME,
        _ => "?",
    }
}

/// Peer address used when the peer never told us its own.
pub const DEFAULT_PEER_ADDRESS: Ipv4Addr = Ipv4Addr::new(10, 64, 64, 64);

/// What we propose and what we are willing to accept. `None` means
/// "not configured" and goes on the wire as 0.0.0.0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcpConfiguration {
    pub local_address: Option<Ipv4Addr>,
    pub peer_address: Option<Ipv4Addr>,
    pub peer_netmask: Option<Ipv4Addr>,
    pub primary_dns: Option<Ipv4Addr>,
    pub secondary_dns: Option<Ipv4Addr>,
    /// `None` disables the fallback peer address in `up()`.
    pub default_peer_address: Option<Ipv4Addr>,
    // Informational only, not enforced.
    pub request_netmask: bool,
    pub request_dns: bool,
}

impl Default for IpcpConfiguration {
    fn default() -> Self {
        Self {
            local_address: None,
            peer_address: None,
            peer_netmask: None,
            primary_dns: None,
            secondary_dns: None,
            default_peer_address: Some(DEFAULT_PEER_ADDRESS),
            request_netmask: false,
            request_dns: true,
        }
    }
}

/// Values actually agreed with the peer (only ACK-resolved options count).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpcpSession {
    pub ip: Option<Ipv4Addr>,
    pub peer: Option<Ipv4Addr>,
    pub netmask: Ipv4Addr,
    pub dns1: Option<Ipv4Addr>,
    pub dns2: Option<Ipv4Addr>,
}
