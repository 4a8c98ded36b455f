use std::net::SocketAddr;

/// Relay settings.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind_addr: SocketAddr,
    /// Connections a single session accepts before rejecting newcomers.
    pub session_capacity: usize,
    /// Depth of each session's command queue.
    pub command_buffer: usize,
    /// Frames queued per socket before further frames to it are dropped.
    pub outbound_buffer: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            session_capacity: 2,
            command_buffer: 100,
            outbound_buffer: 64,
        }
    }
}
