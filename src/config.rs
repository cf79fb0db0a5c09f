use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use log::LevelFilter;
use std::env;
use std::net::Ipv4Addr;

use crate::types::{option_id, IpcpConfiguration, DEFAULT_PEER_ADDRESS};

const DEFAULT_REQUEST: &[u8] = &[
    option_id::IP_ADDRESS,
    option_id::PRIMARY_DNS_SERVER,
    option_id::SECONDARY_DNS_SERVER,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub ipcp: IpcpConfiguration,
    /// Option ids to put in our Configure-Requests, in registration order.
    pub request: Vec<u8>,
    pub dns_index: usize,
    pub log_level: LevelFilter,
    pub trace_options: bool,
    pub tun_name: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ipcp: IpcpConfiguration::default(),
            request: DEFAULT_REQUEST.to_vec(),
            dns_index: 0,
            log_level: LevelFilter::Info,
            trace_options: false,
            tun_name: None,
        }
    }
}

impl Settings {
    /// Read `.env` (if any) and then the process environment.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is fine
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        settings.ipcp.local_address = address(&get, "IPCP_LOCAL_ADDRESS")?;
        settings.ipcp.peer_address = address(&get, "IPCP_PEER_ADDRESS")?;
        settings.ipcp.peer_netmask = address(&get, "IPCP_NETMASK")?;
        settings.ipcp.primary_dns = address(&get, "IPCP_PRIMARY_DNS")?;
        settings.ipcp.secondary_dns = address(&get, "IPCP_SECONDARY_DNS")?;

        if let Some(v) = get("IPCP_DEFAULT_PEER") {
            settings.ipcp.default_peer_address = match v.trim() {
                "off" | "none" => None,
                other => Some(
                    other
                        .parse::<Ipv4Addr>()
                        .with_context(|| format!("IPCP_DEFAULT_PEER: invalid address '{}'", other))?,
                ),
            };
        } else {
            settings.ipcp.default_peer_address = Some(DEFAULT_PEER_ADDRESS);
        }

        if let Some(v) = get("IPCP_REQUEST") {
            settings.request = parse_request_list(&v).context("IPCP_REQUEST")?;
        }
        settings.ipcp.request_netmask = settings.request.contains(&option_id::IP_NETMASK);
        settings.ipcp.request_dns = settings.request.contains(&option_id::PRIMARY_DNS_SERVER)
            || settings.request.contains(&option_id::SECONDARY_DNS_SERVER);

        if let Some(v) = get("IPCP_DNS_INDEX") {
            settings.dns_index = v
                .trim()
                .parse()
                .with_context(|| format!("IPCP_DNS_INDEX: invalid index '{}'", v))?;
        }

        if let Some(v) = get("IPCP_LOG_LEVEL") {
            settings.log_level = v
                .trim()
                .parse()
                .with_context(|| format!("IPCP_LOG_LEVEL: unknown level '{}'", v))?;
        }

        if let Some(v) = get("IPCP_TRACE_OPTIONS") {
            settings.trace_options = matches!(v.trim(), "1" | "true" | "yes" | "on");
        }

        settings.tun_name = get("IPCP_TUN");

        Ok(settings)
    }
}

fn address<F>(get: &F, key: &str) -> Result<Option<Ipv4Addr>>
where
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(v) => {
            let addr = v
                .trim()
                .parse::<Ipv4Addr>()
                .with_context(|| format!("{}: invalid address '{}'", key, v))?;
            Ok((!addr.is_unspecified()).then_some(addr))
        }
        None => Ok(None),
    }
}

pub fn option_by_name(name: &str) -> Option<u8> {
    match name.trim().to_ascii_lowercase().as_str() {
        "ip-address" | "ip" => Some(option_id::IP_ADDRESS),
        "netmask" | "ip-netmask" => Some(option_id::IP_NETMASK),
        "primary-dns" | "dns1" => Some(option_id::PRIMARY_DNS_SERVER),
        "secondary-dns" | "dns2" => Some(option_id::SECONDARY_DNS_SERVER),
        _ => None,
    }
}

pub fn parse_request_list(list: &str) -> Result<Vec<u8>> {
    let mut ids = Vec::new();
    for name in list.split(',').filter(|n| !n.trim().is_empty()) {
        let Some(id) = option_by_name(name) else {
            bail!("unknown option '{}'", name.trim());
        };
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// `useEnv` reads the environment, `useInline <local> <peer>` takes the two
/// addresses from the command line (0.0.0.0 leaves one unset).
pub fn settings_from_args(args: &[String]) -> Result<(Settings, &[String])> {
    match args {
        [_, mode, rest @ ..] if mode == "useEnv" => Ok((Settings::from_env()?, rest)),
        [_, mode, local, peer, rest @ ..] if mode == "useInline" => {
            let mut settings = Settings::default();
            let local: Ipv4Addr = local
                .parse()
                .with_context(|| format!("invalid local address '{}'", local))?;
            let peer: Ipv4Addr = peer
                .parse()
                .with_context(|| format!("invalid peer address '{}'", peer))?;
            settings.ipcp.local_address = (!local.is_unspecified()).then_some(local);
            settings.ipcp.peer_address = (!peer.is_unspecified()).then_some(peer);
            Ok((settings, rest))
        }
        _ => bail!("Please either use 'useEnv' with environment variables or 'useInline <local> <peer>'"),
    }
}
