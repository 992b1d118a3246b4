use std::{
    collections::VecDeque,
    io::{self, Read, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs},
};

use socket2::Socket as Socket2;

use netloom_core::{
    config::Config,
    cursor::ByteCursor,
    transport::{SocketEvent, StreamSocket},
};

/// Applies socket options from configuration to a TcpStream.
fn apply_socket_options(stream: &TcpStream, config: &Config) -> io::Result<()> {
    // Go through socket2 for the options std does not expose
    let socket2 = Socket2::from(stream.try_clone()?);

    if let Some(size) = config.socket_recv_buffer_size {
        socket2.set_recv_buffer_size(size)?;
    }

    if let Some(size) = config.socket_send_buffer_size {
        socket2.set_send_buffer_size(size)?;
    }

    stream.set_nodelay(config.socket_nodelay)?;

    Ok(())
}

/// A write submitted to the socket but not yet fully on the wire.
struct PendingWrite {
    data: ByteCursor,
    /// Bytes the cursor covered at submission, reported on completion
    submitted: usize,
}

/// A connected TCP stream driven in non-blocking mode.
///
/// Writes are queued on submission and flushed during `poll_events`,
/// which also probes readability with `peek` so a socket with waiting
/// data keeps reporting `Readable` until it is drained (level-triggered).
pub struct TcpStreamSocket {
    stream: TcpStream,
    pending_writes: VecDeque<PendingWrite>,
    completions: VecDeque<io::Result<usize>>,
    open: bool,
    probe: [u8; 1],
}

impl TcpStreamSocket {
    /// Wraps a connected stream, switching it to non-blocking mode and
    /// applying the socket options from `config`.
    pub fn new(stream: TcpStream, config: &Config) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        apply_socket_options(&stream, config)?;
        Ok(Self {
            stream,
            pending_writes: VecDeque::new(),
            completions: VecDeque::new(),
            open: true,
            probe: [0],
        })
    }

    /// Connects to `addr` and wraps the resulting stream.
    pub fn connect(addr: impl ToSocketAddrs, config: &Config) -> io::Result<Self> {
        Self::new(TcpStream::connect(addr)?, config)
    }

    /// Returns the local address of the stream.
    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.stream.local_addr()
    }

    /// Pushes queued bytes onto the wire until the kernel pushes back.
    /// A hard error fails the head write with its cause and every write
    /// behind it with broken-pipe, preserving FIFO completion order.
    fn flush_writes(&mut self) {
        while let Some(front) = self.pending_writes.front_mut() {
            match self.stream.write(front.data.as_slice()) {
                Ok(written) => {
                    front.data.advance(written);
                    if front.data.is_empty() {
                        let submitted = front.submitted;
                        self.pending_writes.pop_front();
                        self.completions.push_back(Ok(submitted));
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.pending_writes.pop_front();
                    self.completions.push_back(Err(err));
                    while self.pending_writes.pop_front().is_some() {
                        self.completions
                            .push_back(Err(io::Error::from(io::ErrorKind::BrokenPipe)));
                    }
                    break;
                }
            }
        }
    }
}

impl StreamSocket for TcpStreamSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stream.read(buf) {
            // A zero-length read is how TCP spells "closed by peer"; the
            // trait contract wants an error instead.
            Ok(0) if !buf.is_empty() => {
                Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stream closed by peer"))
            }
            other => other,
        }
    }

    fn write(&mut self, data: ByteCursor) -> io::Result<()> {
        if !self.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "socket is shut down"));
        }
        let submitted = data.len();
        self.pending_writes.push_back(PendingWrite { data, submitted });
        Ok(())
    }

    fn poll_events(&mut self, out: &mut Vec<SocketEvent>) {
        if self.open {
            self.flush_writes();
        }

        while let Some(result) = self.completions.pop_front() {
            out.push(SocketEvent::WriteComplete(result));
        }

        if !self.open {
            return;
        }

        match self.stream.peek(&mut self.probe) {
            // Data waiting, or a zero peek meaning the peer closed; both
            // are surfaced through the read path.
            Ok(_) => out.push(SocketEvent::Readable(Ok(()))),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
            Err(err) => out.push(SocketEvent::Readable(Err(err))),
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.open = false;
        self.pending_writes.clear();
        self.stream.shutdown(Shutdown::Both)
    }
}

impl std::fmt::Debug for TcpStreamSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpStreamSocket")
            .field("open", &self.open)
            .field("pending_writes", &self.pending_writes.len())
            .finish()
    }
}
