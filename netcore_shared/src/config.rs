//! Client configuration.
//!
//! Loads from JSON strings (file IO left to the app). Every field has a
//! default, so a partial document only overrides what it names.

use std::net::{SocketAddr, ToSocketAddrs};

use serde::{Deserialize, Serialize};

use crate::wire::Protocol;

/// Root configuration for the client network core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server host name or IP.
    #[serde(default = "default_host")]
    pub host: String,
    /// Reliable (TCP) port.
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,
    /// Unreliable (UDP) port.
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,
    /// Host loop tick rate.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
    /// Display name sent at login.
    #[serde(default = "default_player_name")]
    pub player_name: String,
    /// Receive buffer per datagram; larger datagrams are cut by the OS.
    #[serde(default = "default_max_datagram_size")]
    pub max_datagram_size: usize,
    /// Frames the dispatch bridge holds before reader tasks wait.
    #[serde(default = "default_bridge_capacity")]
    pub bridge_capacity: usize,
    /// Frames a connection queues for its writer task before sends fail.
    #[serde(default = "default_send_queue_capacity")]
    pub send_queue_capacity: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_tcp_port() -> u16 {
    5004
}

fn default_udp_port() -> u16 {
    5025
}

fn default_tick_hz() -> u32 {
    60
}

fn default_player_name() -> String {
    "Player".to_string()
}

fn default_max_datagram_size() -> usize {
    512
}

fn default_bridge_capacity() -> usize {
    1024
}

fn default_send_queue_capacity() -> usize {
    1024
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            tcp_port: default_tcp_port(),
            udp_port: default_udp_port(),
            tick_hz: default_tick_hz(),
            player_name: default_player_name(),
            max_datagram_size: default_max_datagram_size(),
            bridge_capacity: default_bridge_capacity(),
            send_queue_capacity: default_send_queue_capacity(),
        }
    }
}

impl ClientConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn port(&self, protocol: Protocol) -> u16 {
        match protocol {
            Protocol::Reliable => self.tcp_port,
            Protocol::Unreliable => self.udp_port,
        }
    }

    /// Resolves the endpoint for one transport.
    pub fn endpoint(&self, protocol: Protocol) -> std::io::Result<SocketAddr> {
        (self.host.as_str(), self.port(protocol))
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    format!("no address for {}", self.host),
                )
            })
    }
}
