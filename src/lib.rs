pub mod config;
pub mod fsm;
pub mod ipcp;
pub mod log;
pub mod ncp;
pub mod option;
pub mod parser;
pub mod pcb;
pub mod registry;
pub mod types;
#[cfg(any(target_os = "linux", target_os = "macos"))]
pub mod tun_netif;

pub use fsm::{Fsm, FsmCore, FsmState};
pub use ipcp::Ipcp;
pub use ncp::{Ncp, NcpBase};
pub use option::{AddressOption, ConfigurationOption, OptionNegotiation, UnknownOption};
pub use pcb::{ControlBlock, NetworkInterface, ProtocolListener};
pub use registry::OptionRegistry;
pub use types::{ConfigurationOptionState, IpcpConfiguration, IpcpSession};

use std::sync::atomic::AtomicBool;
pub static TRACE_OPTIONS: AtomicBool = AtomicBool::new(false);
