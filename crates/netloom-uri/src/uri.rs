use std::fmt;

use netloom_core::error::Result;

/// Path reported for authority-only URIs such as `example.com`.
const DEFAULT_PATH: &[u8] = b"/";

/// Byte range into a [`Uri`]'s owned buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) start: usize,
    pub(crate) len: usize,
}

impl Span {
    pub(crate) fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub(crate) fn slice<'a>(&self, buffer: &'a [u8]) -> &'a [u8] {
        &buffer[self.start..self.start + self.len]
    }
}

/// A parsed URI.
///
/// The URI owns exactly one contiguous buffer; all component accessors
/// return byte views into it. Views stay valid until the `Uri` is
/// dropped, and no component is ever copied out.
#[derive(Clone)]
pub struct Uri {
    pub(crate) buffer: Vec<u8>,
    pub(crate) scheme: Span,
    pub(crate) authority: Span,
    pub(crate) host_name: Span,
    pub(crate) port: u16,
    pub(crate) path: Span,
    pub(crate) path_and_query: Span,
    pub(crate) query_string: Span,
    /// Set for authority-only input, where the path is synthesized as "/".
    pub(crate) synthetic_root: bool,
}

impl Uri {
    /// Parses a URI from bytes, copying them into the owned buffer.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedUri`](netloom_core::error::ErrorKind::MalformedUri)
    /// if the input does not match the accepted grammar; nothing is
    /// retained on failure.
    pub fn parse(input: impl AsRef<[u8]>) -> Result<Uri> {
        crate::parser::parse(input.as_ref().to_vec())
    }

    /// Returns the full URI text.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns the scheme, empty if the URI had none.
    pub fn scheme(&self) -> &[u8] {
        self.scheme.slice(&self.buffer)
    }

    /// Returns the authority (`host[:port]`), empty if the URI had none.
    pub fn authority(&self) -> &[u8] {
        self.authority.slice(&self.buffer)
    }

    /// Returns the host name, the authority minus any `:port` suffix.
    pub fn host_name(&self) -> &[u8] {
        self.host_name.slice(&self.buffer)
    }

    /// Returns the port, 0 when unspecified.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the path. Defaults to `/` when the input had an authority
    /// but no path.
    pub fn path(&self) -> &[u8] {
        if self.synthetic_root {
            DEFAULT_PATH
        } else {
            self.path.slice(&self.buffer)
        }
    }

    /// Returns the path and query as one contiguous view.
    pub fn path_and_query(&self) -> &[u8] {
        if self.synthetic_root {
            DEFAULT_PATH
        } else {
            self.path_and_query.slice(&self.buffer)
        }
    }

    /// Returns the query string, excluding the leading `?`. Empty if the
    /// URI had none.
    pub fn query_string(&self) -> &[u8] {
        self.query_string.slice(&self.buffer)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.buffer))
    }
}

impl fmt::Debug for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uri")
            .field("scheme", &String::from_utf8_lossy(self.scheme()))
            .field("host_name", &String::from_utf8_lossy(self.host_name()))
            .field("port", &self.port)
            .field("path", &String::from_utf8_lossy(self.path()))
            .field("query_string", &String::from_utf8_lossy(self.query_string()))
            .finish()
    }
}
