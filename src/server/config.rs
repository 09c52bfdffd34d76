//! Server configuration

use std::net::SocketAddr;

use crate::protocol::constants::DEFAULT_PORT;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent subscribers (0 = unlimited); the accept loop
    /// pauses while the population sits at this ceiling
    pub max_subscribers: usize,

    /// Per-subscriber outbound queue depth, in frames; a subscriber whose
    /// queue is full when a publish arrives is disconnected as too slow
    pub queue_capacity: usize,

    /// Enable TCP_NODELAY on accepted sockets (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_subscribers: 0, // Unlimited
            queue_capacity: 64,
            tcp_nodelay: true, // Detections are small and latency-sensitive
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Create a new config listening on all interfaces at the given port
    pub fn with_port(port: u16) -> Self {
        Self::with_addr(SocketAddr::from(([0, 0, 0, 0], port)))
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum subscribers
    pub fn max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = max;
        self
    }

    /// Set the per-subscriber queue depth
    pub fn queue_capacity(mut self, frames: usize) -> Self {
        self.queue_capacity = frames.max(1);
        self
    }

    /// Toggle TCP_NODELAY on accepted sockets
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.max_subscribers, 0);
        assert_eq!(config.queue_capacity, 64);
        assert!(config.tcp_nodelay);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9001".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr, addr);
    }

    #[test]
    fn test_with_port() {
        let config = ServerConfig::with_port(9100);

        assert_eq!(config.bind_addr.port(), 9100);
    }

    #[test]
    fn test_builder_max_subscribers() {
        let config = ServerConfig::default().max_subscribers(4);

        assert_eq!(config.max_subscribers, 4);
    }

    #[test]
    fn test_builder_queue_capacity_floor() {
        // A zero-frame queue could never deliver anything.
        let config = ServerConfig::default().queue_capacity(0);

        assert_eq!(config.queue_capacity, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .max_subscribers(8)
            .queue_capacity(16)
            .tcp_nodelay(false);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_subscribers, 8);
        assert_eq!(config.queue_capacity, 16);
        assert!(!config.tcp_nodelay);
    }
}
