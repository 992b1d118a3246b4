use crate::constants::{DEFAULT_MAX_RW_SIZE, DEFAULT_MESSAGE_BUFFER_SIZE, DEFAULT_POOL_RETAIN};

#[derive(Clone, Debug)]
/// Configuration options to tune channel and transport behavior.
pub struct Config {
    /// Max bytes a socket handler reads per scheduling quantum before
    /// yielding the loop thread to other work.
    pub max_rw_size: usize,
    /// Capacity of the buffers handed out by the message pool.
    pub message_buffer_size: usize,
    /// Max number of idle buffers the message pool retains for reuse.
    pub pool_retain_limit: usize,
    /// Max number of simultaneously leased messages (0 = unlimited).
    /// Acquiring past the cap fails with `PoolExhausted`.
    pub max_active_messages: usize,
    /// Socket receive buffer size in bytes (None = use system default).
    /// Corresponds to SO_RCVBUF.
    pub socket_recv_buffer_size: Option<usize>,
    /// Socket send buffer size in bytes (None = use system default).
    /// Corresponds to SO_SNDBUF.
    pub socket_send_buffer_size: Option<usize>,
    /// Disable Nagle's algorithm on stream sockets.
    pub socket_nodelay: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_rw_size: DEFAULT_MAX_RW_SIZE,
            message_buffer_size: DEFAULT_MESSAGE_BUFFER_SIZE,
            pool_retain_limit: DEFAULT_POOL_RETAIN,
            max_active_messages: 0,         // Unlimited
            socket_recv_buffer_size: None,  // Use system default
            socket_send_buffer_size: None,  // Use system default
            socket_nodelay: true,
        }
    }
}
