use crate::{
    config::Config,
    constants::{DEFAULT_MESSAGE_BUFFER_SIZE, DEFAULT_POOL_RETAIN},
    cursor::ByteCursor,
    error::{ErrorKind, Result},
};

/// Completion callback attached to a write message. Invoked exactly once
/// with the outcome of the transmission (or `SocketClosed` if the message
/// was still queued when the socket went away).
pub type WriteCompletion = Box<dyn FnOnce(Result<()>) + Send>;

/// A pooled message buffer passed between channel handlers.
///
/// Whoever last acquired the message, or was handed it, owns it and must
/// either pass it on or release it back to the pool. Never both, never
/// neither.
pub struct IoMessage {
    data: Vec<u8>,
    completion: Option<WriteCompletion>,
}

impl IoMessage {
    /// Creates a message around an existing buffer.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, completion: None }
    }

    /// Returns the payload as a slice.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns a mutable reference to the payload buffer.
    pub fn data_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }

    /// Returns the payload length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Attaches a completion callback fired once the message has been
    /// written out (or has definitively failed).
    pub fn set_completion(&mut self, completion: WriteCompletion) {
        self.completion = Some(completion);
    }

    /// Takes the completion callback, if one was attached.
    pub fn take_completion(&mut self) -> Option<WriteCompletion> {
        self.completion.take()
    }

    /// Freezes the payload into a shared cursor, leaving the message with
    /// an empty buffer. Used to hand bytes to an asynchronous writer while
    /// the message itself stays queued for completion bookkeeping.
    pub fn share_payload(&mut self) -> ByteCursor {
        ByteCursor::from_vec(std::mem::take(&mut self.data))
    }

    /// Restores a payload previously taken with `share_payload`, e.g.
    /// after a rejected write submission.
    pub fn restore_payload(&mut self, payload: ByteCursor) {
        self.data = payload.into_owned();
    }

    /// Consumes the message, returning its buffer. A still-attached
    /// completion callback is dropped unfired; release paths that must
    /// fail the callback take it first.
    pub fn into_buffer(self) -> Vec<u8> {
        self.data
    }
}

impl std::fmt::Debug for IoMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoMessage")
            .field("len", &self.data.len())
            .field("has_completion", &self.completion.is_some())
            .finish()
    }
}

/// A message pool that reuses buffers to reduce allocations on hot paths.
///
/// The pool also tracks how many messages are currently leased out, which
/// makes the ownership invariant (acquired == dispatched + released)
/// checkable, and lets a lease cap surface allocator-exhaustion as
/// [`ErrorKind::PoolExhausted`] instead of unbounded growth.
pub struct MessagePool {
    /// Idle buffers ready for reuse
    pool: Vec<Vec<u8>>,
    /// Capacity target for freshly allocated buffers
    buffer_size: usize,
    /// Max number of idle buffers to retain
    retain_limit: usize,
    /// Messages currently leased out
    active_leases: usize,
    /// Lease cap (0 = unlimited)
    max_active: usize,
}

impl MessagePool {
    /// Creates a pool handing out buffers of `buffer_size` capacity,
    /// retaining up to `retain_limit` idle buffers.
    pub fn new(buffer_size: usize, retain_limit: usize) -> Self {
        Self {
            pool: Vec::with_capacity(retain_limit.min(64)),
            buffer_size,
            retain_limit,
            active_leases: 0,
            max_active: 0,
        }
    }

    /// Creates a pool with a lease cap; acquiring past the cap fails with
    /// `PoolExhausted`.
    pub fn with_lease_cap(buffer_size: usize, retain_limit: usize, max_active: usize) -> Self {
        let mut pool = Self::new(buffer_size, retain_limit);
        pool.max_active = max_active;
        pool
    }

    /// Creates a pool from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::with_lease_cap(
            config.message_buffer_size,
            config.pool_retain_limit,
            config.max_active_messages,
        )
    }

    /// Acquires a message with at least `min_capacity` writable bytes.
    pub fn acquire(&mut self, min_capacity: usize) -> Result<IoMessage> {
        if self.max_active != 0 && self.active_leases >= self.max_active {
            return Err(ErrorKind::PoolExhausted);
        }

        let mut buffer = self
            .pool
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.buffer_size.max(min_capacity)));
        if buffer.capacity() < min_capacity {
            buffer.reserve(min_capacity - buffer.len());
        }

        self.active_leases += 1;
        Ok(IoMessage::new(buffer))
    }

    /// Returns a message's buffer to the pool for reuse.
    pub fn release(&mut self, message: IoMessage) {
        self.active_leases = self.active_leases.saturating_sub(1);
        let mut buffer = message.into_buffer();
        if self.pool.len() < self.retain_limit {
            buffer.clear();
            self.pool.push(buffer);
        }
    }

    /// Returns the number of idle buffers currently in the pool.
    pub fn available(&self) -> usize {
        self.pool.len()
    }

    /// Returns the number of messages currently leased out.
    pub fn active_leases(&self) -> usize {
        self.active_leases
    }

    /// Clears all idle buffers.
    pub fn clear(&mut self) {
        self.pool.clear();
    }
}

impl Default for MessagePool {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE_BUFFER_SIZE, DEFAULT_POOL_RETAIN)
    }
}

impl std::fmt::Debug for MessagePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagePool")
            .field("available", &self.pool.len())
            .field("active_leases", &self.active_leases)
            .finish()
    }
}
