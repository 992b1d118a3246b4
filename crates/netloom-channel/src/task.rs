use std::time::Instant;

/// Index of a handler slot within a channel.
pub type SlotId = usize;

/// Status passed to a task when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    /// The task is running at (or after) its scheduled time.
    RunReady,
    /// The channel closed before the task could run; the task should not
    /// do work.
    Canceled,
}

/// When a task should run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    /// As soon as the scheduler next runs, in FIFO order with other
    /// already-queued "now" tasks.
    Now,
    /// At or after the given instant.
    At(Instant),
}

/// A scheduled unit of work addressed to a handler slot.
///
/// When the task fires, the channel invokes
/// [`ChannelHandler::run_task`](crate::handler::ChannelHandler::run_task)
/// on the owning slot's handler, passing the tag. The tag stands in for
/// the function pointer a C-style scheduler would carry; handlers use it
/// to tell their tasks apart.
#[derive(Clone, Copy, Debug)]
pub struct Task {
    pub(crate) slot: SlotId,
    pub(crate) tag: &'static str,
}

impl Task {
    /// Creates a task addressed to `slot`, identified by `tag`.
    pub fn new(slot: SlotId, tag: &'static str) -> Self {
        Self { slot, tag }
    }

    /// The slot this task is addressed to.
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// The tag identifying what the task does.
    pub fn tag(&self) -> &'static str {
        self.tag
    }
}
