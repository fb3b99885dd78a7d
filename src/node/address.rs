use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use thiserror::Error;

use crate::utils::crypto::{hash, Key};

/// Network identity of a node, rendered canonically as
/// `host/ip:port`. The canonical string is the hash input, so it
/// must come out identical on every node that names this peer.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct NodeAddr {
    host: String,
    ip: IpAddr,
    port: u16,
}

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("missing '/' in address {0:?}")]
    MissingHost(String),
    #[error("missing or invalid port in address {0:?}")]
    InvalidPort(String),
    #[error("invalid ip in address {0:?}")]
    InvalidIp(String),
    #[error("cannot resolve host {0:?}")]
    Unresolvable(String),
}

impl NodeAddr {
    /// Builds an address from a hostname and port, resolving the
    /// hostname once. `localhost` is pinned to 127.0.0.1 and IPv4 is
    /// preferred so the canonical form stays stable across nodes.
    pub fn new(host: &str, port: u16) -> Result<NodeAddr, AddressError> {
        let ip = if let Ok(literal) = host.parse::<IpAddr>() {
            literal
        } else if host == "localhost" {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            let resolved: Vec<SocketAddr> = (host, port)
                .to_socket_addrs()
                .map_err(|_| AddressError::Unresolvable(host.to_string()))?
                .collect();
            resolved
                .iter()
                .find(|candidate| candidate.is_ipv4())
                .or_else(|| resolved.first())
                .map(|candidate| candidate.ip())
                .ok_or_else(|| AddressError::Unresolvable(host.to_string()))?
        };
        Ok(NodeAddr {
            host: host.to_string(),
            ip,
            port,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Ring position of this address.
    pub fn key(&self) -> Key {
        hash(&self.to_string())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.host, self.ip, self.port)
    }
}

impl fmt::Debug for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for NodeAddr {
    type Err = AddressError;

    /// Hostname is everything before the first `/`, the port is
    /// everything after the last `:`, the ip sits between.
    fn from_str(s: &str) -> Result<NodeAddr, AddressError> {
        let slash = s.find('/').ok_or_else(|| AddressError::MissingHost(s.to_string()))?;
        let colon = s.rfind(':').ok_or_else(|| AddressError::InvalidPort(s.to_string()))?;
        if colon < slash {
            return Err(AddressError::InvalidPort(s.to_string()));
        }
        let port = s[colon + 1..]
            .parse::<u16>()
            .map_err(|_| AddressError::InvalidPort(s.to_string()))?;
        let ip = s[slash + 1..colon]
            .parse::<IpAddr>()
            .map_err(|_| AddressError::InvalidIp(s.to_string()))?;
        Ok(NodeAddr {
            host: s[..slash].to_string(),
            ip,
            port,
        })
    }
}
