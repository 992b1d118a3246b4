#![warn(missing_docs)]

//! netloom-socket: the socket channel handler and a TCP transport.
//!
//! [`SocketHandler`] occupies slot 0 of a channel and translates between
//! pipeline semantics and socket events: readiness notifications become
//! read-direction messages, write-direction messages become asynchronous
//! socket writes, and channel shutdown drains everything in flight.
//! [`TcpStreamSocket`] is a non-blocking TCP implementation of the
//! transport trait the handler is written against.

/// The socket channel handler bridging slot 0 to a byte-stream socket.
pub mod handler;
/// Non-blocking TCP implementation of the transport trait.
pub mod tcp;

pub use handler::SocketHandler;
pub use tcp::TcpStreamSocket;
