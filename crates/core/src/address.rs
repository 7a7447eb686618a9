//! IPFS node addresses
//!
//! A node's RPC API is addressed as a multiaddr (`/ip4/127.0.0.1/tcp/5001`).
//! Users may also give a plain host and port, which are folded into the
//! same representation.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Default RPC API address of a local Kubo node
pub const DEFAULT_NODE_ADDRESS: &str = "/ip4/127.0.0.1/tcp/5001";

/// Host part of a node address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Host {
    Ip4(Ipv4Addr),
    Ip6(Ipv6Addr),
    /// DNS name with the multiaddr protocol it was given under (`dns`, `dns4`, `dns6`)
    Dns { protocol: &'static str, name: String },
}

/// Address of an IPFS node's RPC API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAddress {
    pub host: Host,
    pub port: u16,
}

impl Default for NodeAddress {
    fn default() -> Self {
        Self {
            host: Host::Ip4(Ipv4Addr::LOCALHOST),
            port: 5001,
        }
    }
}

impl NodeAddress {
    /// Parse a multiaddr such as `/ip4/10.0.0.2/tcp/5001`
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_address(input, "address is empty"));
        }
        if !trimmed.starts_with('/') {
            return Err(Error::invalid_address(input, "multiaddr must start with '/'"));
        }

        let parts: Vec<&str> = trimmed.trim_end_matches('/').split('/').skip(1).collect();
        let (proto, value, rest) = match parts.as_slice() {
            [proto, value, rest @ ..] => (*proto, *value, rest),
            _ => return Err(Error::invalid_address(input, "missing host segment")),
        };

        let host = parse_host(input, proto, value)?;

        let port = match rest {
            ["tcp", port] | ["tcp", port, "http"] => parse_port(input, port)?,
            ["tcp"] => return Err(Error::invalid_address(input, "missing port after /tcp")),
            [] => return Err(Error::invalid_address(input, "missing /tcp/<port> segment")),
            [other, ..] if *other != "tcp" => {
                return Err(Error::invalid_address(
                    input,
                    format!("unsupported transport '/{other}', expected /tcp"),
                ));
            }
            _ => {
                return Err(Error::invalid_address(
                    input,
                    format!("unexpected trailing segments '/{}'", rest[2..].join("/")),
                ));
            }
        };

        Ok(Self { host, port })
    }

    /// Build an address from a host (IP or DNS name) and a port string
    pub fn from_host_port(host: &str, port: &str) -> Result<Self> {
        let host = host.trim();
        let port = port.trim();
        let display = format!("{host}:{port}");

        if host.is_empty() {
            return Err(Error::invalid_address(&display, "host is empty"));
        }

        let host = if let Ok(v4) = host.parse::<Ipv4Addr>() {
            Host::Ip4(v4)
        } else if let Ok(v6) = host.trim_start_matches('[').trim_end_matches(']').parse::<Ipv6Addr>() {
            Host::Ip6(v6)
        } else if is_dns_name(host) {
            Host::Dns { protocol: "dns", name: host.to_ascii_lowercase() }
        } else {
            return Err(Error::invalid_address(&display, format!("'{host}' is not an IP address or host name")));
        };

        Ok(Self {
            host,
            port: parse_port(&display, port)?,
        })
    }

    /// Base URL of the node's HTTP RPC API
    pub fn api_base_url(&self) -> String {
        let host = match &self.host {
            Host::Ip4(ip) => ip.to_string(),
            Host::Ip6(ip) => format!("[{ip}]"),
            Host::Dns { name, .. } => name.clone(),
        };
        format!("http://{host}:{}/api/v0", self.port)
    }
}

fn parse_host(input: &str, proto: &str, value: &str) -> Result<Host> {
    match proto {
        "ip4" => value
            .parse::<Ipv4Addr>()
            .map(Host::Ip4)
            .map_err(|_| Error::invalid_address(input, format!("'{value}' is not an IPv4 address"))),
        "ip6" => value
            .parse::<Ipv6Addr>()
            .map(Host::Ip6)
            .map_err(|_| Error::invalid_address(input, format!("'{value}' is not an IPv6 address"))),
        "dns" | "dns4" | "dns6" => {
            if !is_dns_name(value) {
                return Err(Error::invalid_address(input, format!("'{value}' is not a valid host name")));
            }
            let protocol = match proto {
                "dns4" => "dns4",
                "dns6" => "dns6",
                _ => "dns",
            };
            Ok(Host::Dns { protocol, name: value.to_ascii_lowercase() })
        }
        other => Err(Error::invalid_address(
            input,
            format!("unsupported protocol '/{other}', expected /ip4, /ip6 or /dns"),
        )),
    }
}

fn parse_port(input: &str, port: &str) -> Result<u16> {
    match port.parse::<u16>() {
        Ok(0) => Err(Error::invalid_address(input, "port must be between 1 and 65535")),
        Ok(p) => Ok(p),
        Err(_) => Err(Error::invalid_address(input, format!("'{port}' is not a valid port"))),
    }
}

fn is_dns_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 253
        && name.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Host::Ip4(ip) => write!(f, "/ip4/{ip}/tcp/{}", self.port),
            Host::Ip6(ip) => write!(f, "/ip6/{ip}/tcp/{}", self.port),
            Host::Dns { protocol, name } => write!(f, "/{protocol}/{name}/tcp/{}", self.port),
        }
    }
}

impl FromStr for NodeAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for NodeAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(|e| serde::de::Error::custom(e.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use proptest::prelude::*;

    #[test]
    fn test_parse_ip4() {
        let addr = NodeAddress::parse("/ip4/192.168.1.20/tcp/5001").unwrap();
        assert_eq!(addr.host, Host::Ip4(Ipv4Addr::new(192, 168, 1, 20)));
        assert_eq!(addr.port, 5001);
        assert_eq!(addr.api_base_url(), "http://192.168.1.20:5001/api/v0");
    }

    #[test]
    fn test_parse_ip6_and_dns() {
        let v6 = NodeAddress::parse("/ip6/::1/tcp/5001").unwrap();
        assert_eq!(v6.api_base_url(), "http://[::1]:5001/api/v0");

        let dns = NodeAddress::parse("/dns4/ipfs.example.org/tcp/443/http").unwrap();
        assert_eq!(dns.to_string(), "/dns4/ipfs.example.org/tcp/443");
        assert_eq!(dns.api_base_url(), "http://ipfs.example.org:443/api/v0");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for bad in [
            "",
            "127.0.0.1:5001",
            "/ip4/",
            "/ip4/300.1.1.1/tcp/5001",
            "/ip4/127.0.0.1",
            "/ip4/127.0.0.1/tcp",
            "/ip4/127.0.0.1/tcp/0",
            "/ip4/127.0.0.1/tcp/port",
            "/ip4/127.0.0.1/udp/5001",
            "/unix/tmp/ipfs.sock",
            "/ip4/127.0.0.1/tcp/5001/ws/extra",
        ] {
            let err = NodeAddress::parse(bad).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidAddress, "accepted {bad:?}");
        }
    }

    #[test]
    fn test_from_host_port() {
        let addr = NodeAddress::from_host_port(" 10.0.0.5 ", " 5001 ").unwrap();
        assert_eq!(addr.to_string(), "/ip4/10.0.0.5/tcp/5001");

        let named = NodeAddress::from_host_port("Node.Local", "8080").unwrap();
        assert_eq!(named.to_string(), "/dns/node.local/tcp/8080");

        assert!(NodeAddress::from_host_port("", "5001").is_err());
        assert!(NodeAddress::from_host_port("10.0.0.5", "").is_err());
        assert!(NodeAddress::from_host_port("10.0.0.5", "70000").is_err());
        assert!(NodeAddress::from_host_port("bad host", "5001").is_err());
    }

    #[test]
    fn test_default_matches_constant() {
        assert_eq!(NodeAddress::default().to_string(), DEFAULT_NODE_ADDRESS);
    }

    #[test]
    fn test_serde_as_string() {
        let addr = NodeAddress::parse("/ip4/1.2.3.4/tcp/9095").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"/ip4/1.2.3.4/tcp/9095\"");

        let back: NodeAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
        assert!(serde_json::from_str::<NodeAddress>("\"nope\"").is_err());
    }

    proptest! {
        #[test]
        fn prop_ip4_display_parses_back(a: u8, b: u8, c: u8, d: u8, port in 1u16..) {
            let addr = NodeAddress { host: Host::Ip4(Ipv4Addr::new(a, b, c, d)), port };
            let parsed = NodeAddress::parse(&addr.to_string()).unwrap();
            prop_assert_eq!(parsed, addr);
        }

        #[test]
        fn prop_parse_never_panics(s in "\\PC*") {
            let _ = NodeAddress::parse(&s);
        }
    }
}
