use std::{collections::VecDeque, io, time::Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{error, trace};

use netloom_core::{
    config::Config,
    error::{ErrorKind, Result},
    message::{IoMessage, MessagePool},
};

use crate::{
    handler::{ChannelDirection, ChannelHandler, RejectedMessage},
    task::{Schedule, SlotId, Task, TaskStatus},
    time::{Clock, SystemClock},
};

/// Sender half used by other threads to schedule tasks onto a channel.
/// Injected tasks fire on the channel's next poll, in send order.
pub type TaskSender = Sender<Task>;

/// Callback invoked once when the channel finishes shutting down, with the
/// error the shutdown carried, if any.
pub type ShutdownCallback = Box<dyn FnOnce(Option<io::ErrorKind>) + Send>;

/// Lifecycle state of a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    /// Handlers are installed and messages flow.
    Active,
    /// A shutdown walk is in progress.
    ShuttingDown,
    /// Both directions have completed shutdown.
    Closed,
}

struct Slot {
    handler: Option<Box<dyn ChannelHandler>>,
}

/// Effects queued by handler callbacks, drained by the channel after each
/// callback returns so no handler ever observes a half-updated channel.
enum PendingOp {
    Dispatch {
        from: SlotId,
        direction: ChannelDirection,
        message: IoMessage,
    },
    RaiseWindow {
        slot: SlotId,
        size: usize,
    },
    InvokeShutdown {
        slot: SlotId,
        direction: ChannelDirection,
        error: Option<io::ErrorKind>,
        abort: bool,
    },
    CompleteShutdown {
        slot: SlotId,
        direction: ChannelDirection,
        error: Option<io::ErrorKind>,
        abort: bool,
    },
}

struct ScheduledTask {
    run_at: Instant,
    seq: u64,
    task: Task,
}

/// The parts of a channel a handler callback may touch while its own slot
/// is temporarily detached.
struct Core {
    pool: MessagePool,
    /// Read window per slot, in bytes
    windows: Vec<usize>,
    ops: VecDeque<PendingOp>,
    tasks: Vec<ScheduledTask>,
    task_seq: u64,
    injector: Sender<Task>,
    injected: Receiver<Task>,
    clock: Box<dyn Clock>,
    state: ChannelState,
    shutdown_error: Option<io::ErrorKind>,
    on_shutdown_complete: Option<ShutdownCallback>,
}

impl Core {
    fn push_task(&mut self, task: Task, when: Schedule) {
        let run_at = match when {
            Schedule::Now => self.clock.now(),
            Schedule::At(at) => at,
        };
        let seq = self.task_seq;
        self.task_seq += 1;
        self.tasks.push(ScheduledTask { run_at, seq, task });
    }

    /// Removes and returns the due task with the earliest (run_at, seq),
    /// which makes equal-deadline tasks fire in scheduling order. Tasks
    /// scheduled at or after `seq_cutoff` are not considered, so work a
    /// task queues while running always waits for the next poll.
    fn pop_due_task(&mut self, now: Instant, seq_cutoff: u64) -> Option<Task> {
        let mut best: Option<usize> = None;
        for (index, entry) in self.tasks.iter().enumerate() {
            if entry.run_at > now || entry.seq >= seq_cutoff {
                continue;
            }
            let better = match best {
                None => true,
                Some(at) => {
                    let current = &self.tasks[at];
                    (entry.run_at, entry.seq) < (current.run_at, current.seq)
                }
            };
            if better {
                best = Some(index);
            }
        }
        best.map(|index| self.tasks.remove(index).task)
    }

    fn request_shutdown(&mut self, error: Option<io::ErrorKind>) {
        if self.state != ChannelState::Active {
            return;
        }
        self.state = ChannelState::ShuttingDown;
        self.shutdown_error = error;
        // An erroring teardown aborts (frees scarce resources immediately);
        // a clean one drains.
        let abort = error.is_some();
        self.ops.push_back(PendingOp::InvokeShutdown {
            slot: 0,
            direction: ChannelDirection::Read,
            error,
            abort,
        });
    }
}

/// A handler's window onto its channel during a callback.
pub struct SlotContext<'a> {
    slot: SlotId,
    core: &'a mut Core,
}

impl SlotContext<'_> {
    /// The slot this context belongs to.
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Acquires a message with at least `min_capacity` writable bytes from
    /// the channel's pool.
    pub fn acquire_message(&mut self, min_capacity: usize) -> Result<IoMessage> {
        self.core.pool.acquire(min_capacity)
    }

    /// Releases a message back to the channel's pool.
    pub fn release_message(&mut self, message: IoMessage) {
        self.core.pool.release(message);
    }

    /// Read window of the adjacent slot in the read direction. Zero when
    /// there is no such slot.
    pub fn downstream_read_window(&self) -> usize {
        self.core.windows.get(self.slot + 1).copied().unwrap_or(0)
    }

    /// Sends `message` to the adjacent slot in `direction`.
    ///
    /// The dispatch is validated here: a neighbor must exist and, in the
    /// read direction, its window must cover the message; the window is
    /// debited immediately. The receiving handler runs after the current
    /// callback returns. On rejection the message is handed back.
    pub fn send_message(
        &mut self,
        message: IoMessage,
        direction: ChannelDirection,
    ) -> std::result::Result<(), RejectedMessage> {
        let target = match direction {
            ChannelDirection::Read => self.slot + 1,
            ChannelDirection::Write => match self.slot.checked_sub(1) {
                Some(at) => at,
                None => {
                    return Err(RejectedMessage {
                        error: ErrorKind::InvalidArgument("no slot on the transport side"),
                        message,
                    })
                }
            },
        };
        if target >= self.core.windows.len() {
            return Err(RejectedMessage {
                error: ErrorKind::InvalidArgument("no slot on the application side"),
                message,
            });
        }

        if direction == ChannelDirection::Read {
            let window = self.core.windows[target];
            if message.len() > window {
                return Err(RejectedMessage {
                    error: ErrorKind::ReadWindowExceeded,
                    message,
                });
            }
            self.core.windows[target] = window - message.len();
        }

        self.core.ops.push_back(PendingOp::Dispatch {
            from: self.slot,
            direction,
            message,
        });
        Ok(())
    }

    /// Raises this slot's read window by `size` bytes and notifies the
    /// handler on the transport side so it can resume reading.
    pub fn increment_read_window(&mut self, size: usize) {
        self.core.ops.push_back(PendingOp::RaiseWindow { slot: self.slot, size });
    }

    /// Schedules a task on the channel's scheduler.
    pub fn schedule_task(&mut self, task: Task, when: Schedule) {
        self.core.push_task(task, when);
    }

    /// Current time from the channel's clock.
    pub fn current_time(&self) -> Instant {
        self.core.clock.now()
    }

    /// Initiates channel shutdown. The first call latches; later calls
    /// are ignored.
    pub fn shutdown_channel(&mut self, error: Option<io::ErrorKind>) {
        self.core.request_shutdown(error);
    }

    /// Acknowledges that this slot finished shutting down `direction`,
    /// letting the shutdown walk advance.
    pub fn complete_shutdown(
        &mut self,
        direction: ChannelDirection,
        error: Option<io::ErrorKind>,
        abort: bool,
    ) {
        self.core.ops.push_back(PendingOp::CompleteShutdown {
            slot: self.slot,
            direction,
            error,
            abort,
        });
    }

    /// Whether a shutdown walk has started (or finished).
    pub fn is_shutting_down(&self) -> bool {
        self.core.state != ChannelState::Active
    }
}

/// A linear pipeline of handlers bound to a single-threaded scheduler.
pub struct Channel {
    slots: Vec<Slot>,
    core: Core,
}

impl Channel {
    /// Creates an empty channel using the system clock.
    pub fn new(config: &Config) -> Self {
        Self::with_clock(config, Box::new(SystemClock))
    }

    /// Creates an empty channel with a custom clock, mainly for tests.
    pub fn with_clock(config: &Config, clock: Box<dyn Clock>) -> Self {
        let (injector, injected) = unbounded();
        Channel {
            slots: Vec::new(),
            core: Core {
                pool: MessagePool::from_config(config),
                windows: Vec::new(),
                ops: VecDeque::new(),
                tasks: Vec::new(),
                task_seq: 0,
                injector,
                injected,
                clock,
                state: ChannelState::Active,
                shutdown_error: None,
                on_shutdown_complete: None,
            },
        }
    }

    /// Appends a new empty slot at the application end, returning its id.
    /// Slot 0 is the transport end.
    pub fn append_slot(&mut self) -> SlotId {
        self.slots.push(Slot { handler: None });
        self.core.windows.push(0);
        self.slots.len() - 1
    }

    /// Installs `handler` into `slot`, initializing the slot's read window
    /// from the handler.
    pub fn set_handler(&mut self, slot: SlotId, handler: Box<dyn ChannelHandler>) {
        self.core.windows[slot] = handler.initial_window_size();
        self.slots[slot].handler = Some(handler);
    }

    /// Returns a sender other threads can use to schedule tasks onto this
    /// channel.
    pub fn task_sender(&self) -> TaskSender {
        self.core.injector.clone()
    }

    /// Registers a callback fired once when shutdown completes.
    pub fn on_shutdown_complete(&mut self, callback: ShutdownCallback) {
        self.core.on_shutdown_complete = Some(callback);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.core.state
    }

    /// The channel's message pool.
    pub fn pool(&self) -> &MessagePool {
        &self.core.pool
    }

    /// Read window of `slot`, in bytes.
    pub fn read_window(&self, slot: SlotId) -> usize {
        self.core.windows.get(slot).copied().unwrap_or(0)
    }

    /// Number of tasks waiting in the scheduler.
    pub fn scheduled_task_count(&self) -> usize {
        self.core.tasks.len()
    }

    /// Schedules a task from the channel's own thread.
    pub fn schedule_task(&mut self, task: Task, when: Schedule) {
        self.core.push_task(task, when);
    }

    /// Hands `message` to `slot`'s handler in `direction`. This is the
    /// entry point drivers, upstream producers and tests use to originate
    /// traffic.
    pub fn deliver(
        &mut self,
        slot: SlotId,
        direction: ChannelDirection,
        message: IoMessage,
    ) -> std::result::Result<(), RejectedMessage> {
        let result = self.invoke_process(slot, direction, message);
        self.drain();
        result
    }

    /// Initiates channel shutdown. The first call latches the error; later
    /// calls are ignored.
    pub fn shutdown(&mut self, error: Option<io::ErrorKind>) {
        self.core.request_shutdown(error);
        self.drain();
    }

    /// Drives the channel: runs injected tasks, then due tasks, then lets
    /// every handler pump its I/O source.
    pub fn poll(&mut self) {
        while let Ok(task) = self.core.injected.try_recv() {
            self.core.push_task(task, Schedule::Now);
        }

        // Only tasks already queued when the poll began are eligible; a
        // task rescheduling itself (the socket read continuation) runs
        // once per poll, which is what makes the quantum a real yield.
        let entry_now = self.core.clock.now();
        let entry_seq = self.core.task_seq;
        loop {
            let task = match self.core.pop_due_task(entry_now, entry_seq) {
                Some(task) => task,
                None => break,
            };
            let status = if self.core.state == ChannelState::Closed {
                TaskStatus::Canceled
            } else {
                TaskStatus::RunReady
            };
            self.invoke_task(task, status);
            self.drain();
        }

        for slot in 0..self.slots.len() {
            self.invoke_update(slot);
            self.drain();
        }
    }

    /// Detaches `slot`'s handler, runs `f` against it with a context, and
    /// reattaches it. Returns `None` for empty slots.
    fn with_handler<R>(
        &mut self,
        slot: SlotId,
        f: impl FnOnce(&mut dyn ChannelHandler, &mut SlotContext<'_>) -> R,
    ) -> Option<R> {
        let mut handler = self.slots.get_mut(slot)?.handler.take()?;
        let out = {
            let mut ctx = SlotContext { slot, core: &mut self.core };
            f(handler.as_mut(), &mut ctx)
        };
        self.slots[slot].handler = Some(handler);
        Some(out)
    }

    fn invoke_process(
        &mut self,
        slot: SlotId,
        direction: ChannelDirection,
        message: IoMessage,
    ) -> std::result::Result<(), RejectedMessage> {
        let installed = self.slots.get(slot).map_or(false, |s| s.handler.is_some());
        if !installed {
            return Err(RejectedMessage {
                error: ErrorKind::InvalidArgument("no handler installed in target slot"),
                message,
            });
        }
        self.with_handler(slot, move |handler, ctx| match direction {
            ChannelDirection::Read => handler.process_read_message(ctx, message),
            ChannelDirection::Write => handler.process_write_message(ctx, message),
        })
        .expect("handler presence checked above")
    }

    fn invoke_task(&mut self, task: Task, status: TaskStatus) {
        self.with_handler(task.slot, |handler, ctx| {
            handler.run_task(ctx, task.tag, status);
        });
    }

    fn invoke_update(&mut self, slot: SlotId) {
        self.with_handler(slot, |handler, ctx| handler.update(ctx));
    }

    /// Drains queued effects until none remain. Handlers invoked from here
    /// may queue further effects; the loop keeps going until the channel
    /// settles.
    fn drain(&mut self) {
        while let Some(op) = self.core.ops.pop_front() {
            match op {
                PendingOp::Dispatch { from, direction, message } => {
                    let target = match direction {
                        ChannelDirection::Read => from + 1,
                        ChannelDirection::Write => match from.checked_sub(1) {
                            Some(at) => at,
                            None => {
                                self.core.pool.release(message);
                                continue;
                            }
                        },
                    };
                    if let Err(rejected) = self.invoke_process(target, direction, message) {
                        error!(
                            "slot {} rejected a {:?} message: {}",
                            target, direction, rejected.error
                        );
                        self.core.pool.release(rejected.message);
                        self.core.request_shutdown(Some(io::ErrorKind::InvalidData));
                    }
                }
                PendingOp::RaiseWindow { slot, size } => {
                    self.core.windows[slot] = self.core.windows[slot].saturating_add(size);
                    if let Some(upstream) = slot.checked_sub(1) {
                        let result = self.with_handler(upstream, |handler, ctx| {
                            handler.increment_read_window(ctx, size)
                        });
                        if let Some(Err(err)) = result {
                            error!("slot {} failed to handle a window update: {}", upstream, err);
                            self.core.request_shutdown(Some(io::ErrorKind::InvalidData));
                        }
                    }
                }
                PendingOp::InvokeShutdown { slot, direction, error, abort } => {
                    match self.with_handler(slot, |handler, ctx| {
                        handler.shutdown(ctx, direction, error, abort)
                    }) {
                        Some(Ok(())) => {}
                        Some(Err(err)) => {
                            // The handler could not run its shutdown path;
                            // keep the walk moving on its behalf.
                            error!("slot {} failed to shut down {:?}: {}", slot, direction, err);
                            self.core.ops.push_back(PendingOp::CompleteShutdown {
                                slot,
                                direction,
                                error,
                                abort,
                            });
                        }
                        None => {
                            // Empty slot: nothing to shut down.
                            self.core.ops.push_back(PendingOp::CompleteShutdown {
                                slot,
                                direction,
                                error,
                                abort,
                            });
                        }
                    }
                }
                PendingOp::CompleteShutdown { slot, direction, error, abort } => {
                    self.advance_shutdown(slot, direction, error, abort);
                }
            }
        }
    }

    /// Advances the shutdown walk: read direction from the transport to
    /// the application end, then write direction back. When slot 0
    /// acknowledges the write direction, the channel is closed.
    fn advance_shutdown(
        &mut self,
        slot: SlotId,
        direction: ChannelDirection,
        error: Option<io::ErrorKind>,
        abort: bool,
    ) {
        match direction {
            ChannelDirection::Read => {
                let next = slot + 1;
                if next < self.slots.len() {
                    self.core.ops.push_back(PendingOp::InvokeShutdown {
                        slot: next,
                        direction: ChannelDirection::Read,
                        error,
                        abort,
                    });
                } else {
                    self.core.ops.push_back(PendingOp::InvokeShutdown {
                        slot,
                        direction: ChannelDirection::Write,
                        error,
                        abort,
                    });
                }
            }
            ChannelDirection::Write => match slot.checked_sub(1) {
                Some(previous) => {
                    self.core.ops.push_back(PendingOp::InvokeShutdown {
                        slot: previous,
                        direction: ChannelDirection::Write,
                        error,
                        abort,
                    });
                }
                None => {
                    self.core.state = ChannelState::Closed;
                    trace!("channel closed (error: {:?})", self.core.shutdown_error);
                    if let Some(callback) = self.core.on_shutdown_complete.take() {
                        callback(self.core.shutdown_error);
                    }
                }
            },
        }
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("slots", &self.slots.len())
            .field("state", &self.core.state)
            .field("pool", &self.core.pool)
            .finish()
    }
}
