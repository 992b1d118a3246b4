#![warn(missing_docs)]

//! netloom-core: foundational types and utilities.
//!
//! This crate provides the minimal set of core types shared across all
//! layers of the netloom stack:
//! - Configuration types
//! - Error handling
//! - Shared byte views (cursors)
//! - Pooled I/O messages
//! - Transport abstraction (byte-stream sockets)
//!
//! The channel machinery lives in `netloom-channel` and the socket channel
//! handler in `netloom-socket`; this crate is dependency-free so every
//! layer can share it.

/// Constants shared across layers.
pub mod constants {
    /// Default per-quantum read ceiling for a socket handler, in bytes.
    pub const DEFAULT_MAX_RW_SIZE: usize = 16 * 1024;
    /// Default capacity of a pooled message buffer.
    pub const DEFAULT_MESSAGE_BUFFER_SIZE: usize = 16 * 1024;
    /// Default number of idle buffers the message pool retains for reuse.
    pub const DEFAULT_POOL_RETAIN: usize = 256;
}

/// Configuration options for the channel and transport layers.
pub mod config;
/// Shared, reference-counted byte views with zero-copy slicing.
pub mod cursor;
/// Error types and results.
pub mod error;
/// Pooled I/O messages passed between channel handlers.
pub mod message;
/// Transport abstraction for pluggable byte-stream sockets.
pub mod transport;
