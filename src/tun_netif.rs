use std::net::Ipv4Addr;

use anyhow::{Context, Result};
use log::{error, info};
use tun::{platform::Device as TunDevice, Configuration, Device};

use crate::pcb::NetworkInterface;

const CATEGORY: &str = "net.if.tun";

/// `NetworkInterface` backed by a TUN device. DNS servers cannot be pushed
/// into the device, they are kept by slot for whoever resolves names.
pub struct TunNetif {
    dev: TunDevice,
    name: String,
    dns: Vec<Option<Ipv4Addr>>,
}

impl TunNetif {
    pub fn new(name: &str) -> Result<Self> {
        let mut config = Configuration::default();
        config.name(name);

        let dev = TunDevice::new(&config).with_context(|| format!("failed to create TUN {}", name))?;
        let name = dev.name().with_context(|| format!("failed to read TUN name for {}", name))?;
        info!(target: CATEGORY, "TUN interface created: {}", name);

        Ok(Self {
            dev,
            name,
            dns: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dns_servers(&self) -> &[Option<Ipv4Addr>] {
        &self.dns
    }
}

impl NetworkInterface for TunNetif {
    fn set_up(&mut self) {
        if let Err(e) = self.dev.enabled(true) {
            error!(target: CATEGORY, "failed to bring {} up: {}", self.name, e);
        }
    }

    fn set_down(&mut self) {
        if let Err(e) = self.dev.enabled(false) {
            error!(target: CATEGORY, "failed to bring {} down: {}", self.name, e);
        }
    }

    fn set_addresses(&mut self, address: Ipv4Addr, netmask: Ipv4Addr, peer: Ipv4Addr) {
        let result = self
            .dev
            .set_address(address)
            .and_then(|_| self.dev.set_netmask(netmask))
            .and_then(|_| self.dev.set_destination(peer));
        match result {
            Ok(()) => info!(target: CATEGORY, "{}: {} mask {} peer {}", self.name, address, netmask, peer),
            Err(e) => error!(target: CATEGORY, "failed to configure {}: {}", self.name, e),
        }
    }

    fn set_dns_server(&mut self, slot: usize, server: Ipv4Addr) {
        if self.dns.len() <= slot {
            self.dns.resize(slot + 1, None);
        }
        self.dns[slot] = Some(server);
        info!(target: CATEGORY, "DNS #{} = {}", slot, server);
    }
}
