#![warn(missing_docs)]

//! netloom-channel: a linear pipeline of handlers bound to a
//! single-threaded scheduler.
//!
//! A channel is a sequence of slots, each holding one handler. Slot 0 is
//! the transport end; read-direction messages flow from lower to higher
//! slots, write-direction messages the other way. Every callback runs on
//! the thread driving the channel, so handlers need no internal locking.
//! The only cross-thread interaction is handing a task to the channel's
//! scheduler through a [`TaskSender`].

/// Channel, slots, contexts and the shutdown protocol.
pub mod channel;
/// Handler contract and direction types.
pub mod handler;
/// Task scheduling types.
pub mod task;
/// Time source abstraction for the scheduler.
pub mod time;

pub use channel::{Channel, ChannelState, ShutdownCallback, SlotContext, TaskSender};
pub use handler::{ChannelDirection, ChannelHandler, RejectedMessage};
pub use task::{Schedule, SlotId, Task, TaskStatus};
pub use time::{Clock, SystemClock};
