#![warn(missing_docs)]

//! netloom: a small public API facade for the workspace.
//!
//! This crate provides a clean, stable surface that re-exports the most
//! commonly used types for building protocol stacks on a channel of
//! handlers:
//!
//! - Channel machinery (`Channel`, `ChannelHandler`, `SlotContext`)
//! - The socket channel handler and TCP transport (`SocketHandler`,
//!   `TcpStreamSocket`)
//! - Pooled messages and byte cursors (`IoMessage`, `ByteCursor`)
//! - URI parsing and synthesis (`Uri`, `UriBuilder`)
//! - Core configuration (`Config`)
//!
//! Example
//! ```
//! use netloom::{Uri, UriBuilder, QueryParam};
//!
//! let uri = Uri::parse("https://example.com:8443/a/b?x=1").unwrap();
//! assert_eq!(uri.host_name(), b"example.com");
//! assert_eq!(uri.port(), 8443);
//!
//! let params = [QueryParam { key: b"x", value: b"1" }];
//! let built = Uri::from_builder(&UriBuilder {
//!     scheme: b"https",
//!     host_name: b"example.com",
//!     port: 8443,
//!     path: b"/a/b",
//!     query_params: &params,
//!     ..Default::default()
//! })
//! .unwrap();
//! assert_eq!(built.as_bytes(), uri.as_bytes());
//! ```

// Core: config, errors, messages, cursors, transport trait
pub use netloom_core::config::Config;
pub use netloom_core::cursor::ByteCursor;
pub use netloom_core::error::{ErrorKind, Result};
pub use netloom_core::message::{IoMessage, MessagePool, WriteCompletion};
pub use netloom_core::transport::{SocketEvent, StreamSocket};
// Channel: pipeline, handler contract, scheduling
pub use netloom_channel::{
    Channel, ChannelDirection, ChannelHandler, ChannelState, Clock, RejectedMessage, Schedule,
    ShutdownCallback, SlotContext, SlotId, SystemClock, Task, TaskSender, TaskStatus,
};
// Socket: the tail handler and the TCP transport
pub use netloom_socket::{SocketHandler, TcpStreamSocket};
// URI engine
pub use netloom_uri::{QueryParam, Uri, UriBuilder};

/// Convenience prelude with the most commonly used items.
pub mod prelude {
    pub use crate::{
        ByteCursor, Channel, ChannelDirection, ChannelHandler, Config, ErrorKind, IoMessage,
        QueryParam, Result, SlotContext, SocketEvent, SocketHandler, StreamSocket,
        TcpStreamSocket, Uri, UriBuilder,
    };
}
