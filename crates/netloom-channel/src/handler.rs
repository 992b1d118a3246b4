use std::io;

use netloom_core::{
    error::{ErrorKind, Result},
    message::IoMessage,
};

use crate::{channel::SlotContext, task::TaskStatus};

/// Direction of travel through a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelDirection {
    /// From the transport toward the application (slot 0 upward).
    Read,
    /// From the application toward the transport (toward slot 0).
    Write,
}

/// A message a handler refused to take ownership of, handed back to the
/// caller together with the reason. The caller still owns the message and
/// decides whether to release or retry it.
#[derive(Debug)]
pub struct RejectedMessage {
    /// Why the message was rejected.
    pub error: ErrorKind,
    /// The message, unchanged.
    pub message: IoMessage,
}

/// A handler occupying one slot of a channel.
///
/// All methods run on the channel's thread and must not block. A handler
/// that accepts a message owns it from that point on and must eventually
/// pass it along or release it back to the pool.
pub trait ChannelHandler {
    /// Processes a message traveling in the read direction.
    fn process_read_message(
        &mut self,
        ctx: &mut SlotContext<'_>,
        message: IoMessage,
    ) -> std::result::Result<(), RejectedMessage>;

    /// Processes a message traveling in the write direction.
    fn process_write_message(
        &mut self,
        ctx: &mut SlotContext<'_>,
        message: IoMessage,
    ) -> std::result::Result<(), RejectedMessage>;

    /// Notifies the handler that the read window of the slot on its
    /// application side grew by `size` bytes.
    fn increment_read_window(&mut self, ctx: &mut SlotContext<'_>, size: usize) -> Result<()>;

    /// The read window this handler starts out willing to accept.
    fn initial_window_size(&self) -> usize;

    /// Shuts down one direction of this handler.
    ///
    /// The handler must acknowledge through
    /// [`SlotContext::complete_shutdown`], either synchronously or from a
    /// task it schedules. Returning an error lets the channel advance the
    /// shutdown walk on the handler's behalf.
    fn shutdown(
        &mut self,
        ctx: &mut SlotContext<'_>,
        direction: ChannelDirection,
        error: Option<io::ErrorKind>,
        abort: bool,
    ) -> Result<()>;

    /// Runs a task this handler scheduled via
    /// [`SlotContext::schedule_task`].
    fn run_task(&mut self, _ctx: &mut SlotContext<'_>, _tag: &'static str, _status: TaskStatus) {}

    /// Called on every channel poll so the handler can drive an I/O
    /// source it owns. Most handlers have nothing to do here.
    fn update(&mut self, _ctx: &mut SlotContext<'_>) {}
}
