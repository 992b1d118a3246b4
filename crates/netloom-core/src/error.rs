use std::{fmt, io};

/// Convenience alias for a `Result` with [`ErrorKind`] as the error type.
pub type Result<T> = std::result::Result<T, ErrorKind>;

/// Enum with all possible errors that can occur in this library.
#[derive(Debug)]
pub enum ErrorKind {
    /// Wrapper around a std io error.
    IOError(io::Error),
    /// The URI input did not match the accepted grammar.
    MalformedUri,
    /// An invalid combination of arguments was provided.
    InvalidArgument(&'static str),
    /// The message pool reached its lease cap and could not provide a
    /// buffer.
    PoolExhausted,
    /// A read message was dispatched into a handler that is terminal in
    /// the read direction. This is a programmer error in the channel
    /// assembly.
    CantAcceptInput,
    /// A read-direction dispatch would exceed the receiving slot's window.
    ReadWindowExceeded,
    /// The socket was closed while messages were still queued on it.
    SocketClosed,
}

impl ErrorKind {
    /// Returns true for the transient "no data right now" socket
    /// condition, which callers swallow and retry on the next readiness
    /// notification.
    pub fn is_would_block(&self) -> bool {
        matches!(self, ErrorKind::IOError(err) if err.kind() == io::ErrorKind::WouldBlock)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::IOError(err) => write!(f, "io error: {}", err),
            ErrorKind::MalformedUri => write!(f, "malformed uri input"),
            ErrorKind::InvalidArgument(what) => write!(f, "invalid argument: {}", what),
            ErrorKind::PoolExhausted => write!(f, "message pool exhausted"),
            ErrorKind::CantAcceptInput => {
                write!(f, "handler is terminal in the read direction and cannot accept input")
            }
            ErrorKind::ReadWindowExceeded => {
                write!(f, "message would exceed the receiving slot's read window")
            }
            ErrorKind::SocketClosed => write!(f, "socket closed"),
        }
    }
}

impl std::error::Error for ErrorKind {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ErrorKind::IOError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ErrorKind {
    fn from(inner: io::Error) -> Self {
        ErrorKind::IOError(inner)
    }
}
