//! Transport abstraction for pluggable byte-stream I/O.
//!
//! The socket channel handler is written against this trait so that
//! various transports (TCP, in-memory test doubles, tunneled streams) can
//! be plugged in without coupling to a concrete implementation.

use std::io;

use crate::cursor::ByteCursor;

/// Readiness and completion notifications drained from a socket.
#[derive(Debug)]
pub enum SocketEvent {
    /// The socket has data to read, or failed while watching for it.
    Readable(io::Result<()>),
    /// An asynchronous write finished. Completions are reported in the
    /// order the writes were submitted.
    WriteComplete(io::Result<usize>),
}

/// Low-level connected byte-stream socket abstraction.
///
/// All methods are non-blocking; the event loop thread drives the socket
/// by draining `poll_events` and reacting to what comes out.
pub trait StreamSocket {
    /// Reads available bytes into `buf`, returning how many were read.
    ///
    /// Never returns `Ok(0)`: a drained socket reports `WouldBlock` and a
    /// closed one reports an error.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Queues `data` for asynchronous transmission.
    ///
    /// An accepted write is eventually reported through exactly one
    /// [`SocketEvent::WriteComplete`]; completions preserve submission
    /// order.
    fn write(&mut self, data: ByteCursor) -> io::Result<()>;

    /// Drains readiness and completion events accumulated since the last
    /// call, appending them to `out`.
    fn poll_events(&mut self, out: &mut Vec<SocketEvent>);

    /// Returns whether the socket is still open.
    fn is_open(&self) -> bool;

    /// Shuts the socket down. Further reads and writes fail.
    fn shutdown(&mut self) -> io::Result<()>;
}
