use std::net::Ipv4Addr;
use std::rc::Rc;
use std::sync::atomic::Ordering;

use anyhow::{bail, Context, Result};

use ppp_ipcp::config::{settings_from_args, Settings};
use ppp_ipcp::fsm::{Fsm, FsmCore, FsmState};
use ppp_ipcp::log::{log_line, LineLogger};
use ppp_ipcp::parser::{build_control_packet, parse_control_packet, ControlPacket};
use ppp_ipcp::pcb::{ControlBlock, NetworkInterface, NoopListener};
use ppp_ipcp::types::code;
use ppp_ipcp::{Ipcp, Ncp};

const USAGE: &str = "usage: ipcp-probe (useEnv | useInline <local> <peer>) \
(build | request <hex> | session <peer-request-hex> <peer-reply-hex>)";

/// Core that only reports what it is asked to do; `ipcp-probe` drives the
/// callbacks itself.
struct ConsoleCore;

impl FsmCore for ConsoleCore {
    fn init(&self, fsm: &Fsm) {
        fsm.set_state(FsmState::Initial);
    }

    fn input(&self, _fsm: &Fsm, packet: &[u8]) {
        log_line(&format!("📥 fsm input ({} bytes)", packet.len()));
    }

    fn open(&self, fsm: &Fsm) {
        fsm.set_state(FsmState::ReqSent);
        log_line("🧭 FSM → open");
    }

    fn close(&self, fsm: &Fsm, reason: &str) {
        log_line(&format!("❌ FSM → close: {}", reason));
        if fsm.state() == FsmState::Opened {
            fsm.down();
        }
        fsm.set_state(FsmState::Closed);
    }

    fn lower_up(&self, fsm: &Fsm) {
        fsm.set_state(FsmState::Closed);
    }

    fn lower_down(&self, fsm: &Fsm) {
        fsm.set_state(FsmState::Initial);
    }

    fn protocol_reject(&self, fsm: &Fsm) {
        fsm.set_state(FsmState::Stopped);
    }
}

/// Interface that prints what would be configured.
struct LogNetif;

impl NetworkInterface for LogNetif {
    fn set_up(&mut self) {
        log_line("🟢 interface up");
    }

    fn set_down(&mut self) {
        log_line("🔌 interface down");
    }

    fn set_addresses(&mut self, address: Ipv4Addr, netmask: Ipv4Addr, peer: Ipv4Addr) {
        log_line(&format!("🌐 address {} netmask {} peer {}", address, netmask, peer));
    }

    fn set_dns_server(&mut self, slot: usize, server: Ipv4Addr) {
        log_line(&format!("📡 DNS #{} {}", slot, server));
    }
}

fn netif(settings: &Settings) -> Result<Box<dyn NetworkInterface>> {
    match &settings.tun_name {
        #[cfg(any(target_os = "linux", target_os = "macos"))]
        Some(name) => Ok(Box::new(ppp_ipcp::tun_netif::TunNetif::new(name)?)),
        _ => Ok(Box::new(LogNetif)),
    }
}

fn decode_packet(arg: &str) -> Result<ControlPacket> {
    let clean = arg.replace([':', ' '], "");
    let bytes = hex::decode(&clean).with_context(|| format!("invalid hex '{}'", arg))?;
    match parse_control_packet(&bytes) {
        Some(packet) if packet.is_configure() => Ok(packet),
        Some(packet) => bail!("not a Configure packet (code {})", packet.code),
        None => bail!("truncated control packet ({} bytes)", bytes.len()),
    }
}

/// Answer a peer Configure-Request, returning the reply packet.
fn answer(ipcp: &Ipcp, request: &ControlPacket) -> Result<Vec<u8>> {
    if request.code != code::CONFIGURE_REQUEST {
        bail!("expected Configure-Request, got {}", code::name(request.code));
    }
    let mut buf = request.payload.clone();
    let len = buf.len();
    let (state, written) = ipcp.request_configuration_information(&mut buf, len, false);
    let Some(reply_code) = state.reply_code() else {
        bail!("request could not be judged ({:?})", state);
    };
    Ok(build_control_packet(reply_code, request.id, &buf[..written]))
}

fn build(ipcp: &Ipcp) -> Vec<u8> {
    let mut buf = vec![0u8; ipcp.configuration_information_length()];
    let written = ipcp.add_configuration_information(&mut buf);
    build_control_packet(code::CONFIGURE_REQUEST, 1, &buf[..written])
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let (settings, rest) = settings_from_args(&args).context(USAGE)?;

    LineLogger::init(settings.log_level);
    ppp_ipcp::TRACE_OPTIONS.store(settings.trace_options, Ordering::Relaxed);

    let pcb = ControlBlock::new(netif(&settings)?, Box::new(NoopListener));
    let ipcp = Ipcp::with_configuration(pcb.clone(), Rc::new(ConsoleCore), settings.ipcp.clone());
    ipcp.set_requested_options(&settings.request);
    ipcp.set_dns_entry_index(settings.dns_index);
    ipcp.ncp().fsm().reset_ci();

    match rest {
        [cmd] if cmd == "build" => {
            let packet = build(&ipcp);
            println!("{}", hex::encode_upper(packet));
        }
        [cmd, hex_request] if cmd == "request" => {
            let request = decode_packet(hex_request)?;
            let reply = answer(&ipcp, &request)?;
            println!("{} {}", code::name(reply[0]), hex::encode_upper(&reply));
        }
        [cmd, hex_request, hex_reply] if cmd == "session" => {
            let request = decode_packet(hex_request)?;
            let reply = answer(&ipcp, &request)?;
            log_line(&format!("📨 {} {}", code::name(reply[0]), hex::encode_upper(&reply)));

            let peer_reply = decode_packet(hex_reply)?;
            let accepted = match peer_reply.code {
                code::CONFIGURE_ACK => ipcp.ack_configuration_information(&peer_reply.payload),
                code::CONFIGURE_NAK => ipcp.nak_configuration_information(&peer_reply.payload, false),
                code::CONFIGURE_REJECT => ipcp.reject_configuration_information(&peer_reply.payload),
                other => bail!("expected Configure-Ack/Nak/Reject, got {}", code::name(other)),
            };
            if !accepted {
                bail!("{} did not match our request", code::name(peer_reply.code));
            }
            if peer_reply.code != code::CONFIGURE_ACK {
                println!("next {}", hex::encode_upper(build(&ipcp)));
                return Ok(());
            }

            ipcp.enable();
            ipcp.lower_up();
            ipcp.open();
            ipcp.ncp().fsm().set_state(FsmState::Opened);
            ipcp.ncp().fsm().up();

            if !ipcp.is_up() {
                bail!("IPCP did not come up");
            }
            println!("{:?}", ipcp.session());
        }
        _ => bail!(USAGE),
    }

    Ok(())
}
