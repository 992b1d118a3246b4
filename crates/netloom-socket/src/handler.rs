use std::{collections::VecDeque, io};

use tracing::{error, trace};

use netloom_channel::{
    ChannelDirection, ChannelHandler, RejectedMessage, Schedule, SlotContext, Task, TaskStatus,
};
use netloom_core::{
    config::Config,
    error::{ErrorKind, Result},
    message::IoMessage,
    transport::{SocketEvent, StreamSocket},
};

/// Task tag for the cooperative read continuation.
const READ_TASK: &str = "socket-read";
/// Task tag for the deferred write-direction shutdown acknowledgment.
const SHUTDOWN_TASK: &str = "socket-shutdown";

/// Channel handler bridging slot 0 to a [`StreamSocket`].
///
/// In the read direction the handler originates messages: readiness
/// notifications (and scheduled continuations) run a read loop that
/// drains the socket into pooled messages and dispatches them toward the
/// application, consuming at most one quantum (`max_rw_size` bytes)
/// before yielding the loop thread. In the write direction the handler is
/// terminal: write messages are frozen into cursors and submitted to the
/// socket's asynchronous write path, with completions reported strictly
/// in submission order.
pub struct SocketHandler<S: StreamSocket> {
    socket: S,
    /// Messages whose bytes are on the socket, awaiting FIFO completions
    write_queue: VecDeque<IoMessage>,
    /// Per-quantum read ceiling, in bytes
    max_rw_size: usize,
    /// Error latched for the deferred write-shutdown acknowledgment
    shutdown_error: Option<io::ErrorKind>,
    /// Latched by the first shutdown invocation; every read-loop decision
    /// consults it afterwards
    shutdown_in_progress: bool,
    /// Scratch buffer for draining socket events
    events: Vec<SocketEvent>,
}

impl<S: StreamSocket> SocketHandler<S> {
    /// Creates a handler around an already-connected socket.
    ///
    /// `max_rw_size` bounds how many bytes one scheduling quantum may
    /// read before the handler yields the loop thread, which keeps a
    /// single busy socket from monopolizing the loop.
    pub fn new(socket: S, max_rw_size: usize) -> Self {
        Self {
            socket,
            write_queue: VecDeque::new(),
            max_rw_size,
            shutdown_error: None,
            shutdown_in_progress: false,
            events: Vec::new(),
        }
    }

    /// Creates a handler with the quantum taken from configuration.
    pub fn from_config(socket: S, config: &Config) -> Self {
        Self::new(socket, config.max_rw_size)
    }

    /// Returns a reference to the underlying socket.
    pub fn socket(&self) -> &S {
        &self.socket
    }

    /// Returns a mutable reference to the underlying socket.
    pub fn socket_mut(&mut self) -> &mut S {
        &mut self.socket
    }

    /// Number of write messages awaiting completion.
    pub fn write_queue_len(&self) -> usize {
        self.write_queue.len()
    }

    /// Whether a shutdown has been latched.
    pub fn shutdown_in_progress(&self) -> bool {
        self.shutdown_in_progress
    }

    /// One quantum of the read loop.
    ///
    /// Reads at most `min(max_rw_size, downstream window)` bytes, one
    /// pooled message per socket read, dispatching each downstream as it
    /// arrives. A zero budget means backpressure: nothing happens until
    /// the downstream window is raised.
    fn do_read(&mut self, ctx: &mut SlotContext<'_>) {
        if self.shutdown_in_progress {
            return;
        }

        let max_to_read = self.max_rw_size.min(ctx.downstream_read_window());
        if max_to_read == 0 {
            return;
        }

        let mut total_read = 0;
        let mut last_error: Option<io::Error> = None;
        while total_read < max_to_read {
            let budget = max_to_read - total_read;
            let mut message = match ctx.acquire_message(budget) {
                Ok(message) => message,
                Err(err) => {
                    error!("message pool exhausted during socket read: {}", err);
                    ctx.shutdown_channel(Some(io::ErrorKind::OutOfMemory));
                    return;
                }
            };

            let buffer = message.data_mut();
            buffer.resize(budget, 0);
            match self.socket.read(buffer) {
                Ok(read) => {
                    buffer.truncate(read);
                    total_read += read;
                    if let Err(rejected) = ctx.send_message(message, ChannelDirection::Read) {
                        trace!("downstream rejected a read message: {}", rejected.error);
                        ctx.release_message(rejected.message);
                        return;
                    }
                }
                Err(err) => {
                    ctx.release_message(message);
                    last_error = Some(err);
                    break;
                }
            }
        }

        if total_read < max_to_read {
            // Would-block just means the socket drained; the next
            // readiness notification resumes us. Anything else tears the
            // channel down.
            if let Some(err) = last_error {
                if err.kind() != io::ErrorKind::WouldBlock && !self.shutdown_in_progress {
                    ctx.shutdown_channel(Some(err.kind()));
                }
            }
            return;
        }

        // A full quantum was consumed without the window running out, so
        // the socket likely has more. Yield the loop thread and continue
        // from a task.
        if !self.shutdown_in_progress && total_read == self.max_rw_size {
            ctx.schedule_task(Task::new(ctx.slot(), READ_TASK), Schedule::Now);
        }
    }

    fn on_readable(&mut self, ctx: &mut SlotContext<'_>, result: io::Result<()>) {
        match result {
            Ok(()) => self.do_read(ctx),
            Err(err) => {
                if !self.shutdown_in_progress {
                    ctx.shutdown_channel(Some(err.kind()));
                }
            }
        }
    }

    /// Completions arrive in submission order, so the queue front is
    /// always the message being reported on.
    fn on_write_complete(&mut self, ctx: &mut SlotContext<'_>, result: io::Result<usize>) {
        let mut message = match self.write_queue.pop_front() {
            Some(message) => message,
            None => {
                // The shutdown drain already failed everything out.
                trace!("write completion after the queue was drained");
                return;
            }
        };

        let failure = result.as_ref().err().map(|err| err.kind());
        if let Some(completion) = message.take_completion() {
            match result {
                Ok(_) => completion(Ok(())),
                Err(err) => completion(Err(ErrorKind::IOError(err))),
            }
        }
        ctx.release_message(message);

        if let Some(kind) = failure {
            ctx.shutdown_channel(Some(kind));
        }
    }
}

impl<S: StreamSocket> ChannelHandler for SocketHandler<S> {
    fn process_read_message(
        &mut self,
        _ctx: &mut SlotContext<'_>,
        message: IoMessage,
    ) -> std::result::Result<(), RejectedMessage> {
        // This handler is terminal in the read direction; a read message
        // arriving here is a programmer error in the channel assembly.
        Err(RejectedMessage { error: ErrorKind::CantAcceptInput, message })
    }

    fn process_write_message(
        &mut self,
        _ctx: &mut SlotContext<'_>,
        mut message: IoMessage,
    ) -> std::result::Result<(), RejectedMessage> {
        let payload = message.share_payload();
        if let Err(err) = self.socket.write(payload.clone()) {
            // The caller keeps ownership on failure.
            message.restore_payload(payload);
            return Err(RejectedMessage { error: ErrorKind::IOError(err), message });
        }
        self.write_queue.push_back(message);
        Ok(())
    }

    fn increment_read_window(&mut self, ctx: &mut SlotContext<'_>, _size: usize) -> Result<()> {
        if !self.shutdown_in_progress {
            ctx.schedule_task(Task::new(ctx.slot(), READ_TASK), Schedule::Now);
        }
        Ok(())
    }

    fn initial_window_size(&self) -> usize {
        usize::MAX
    }

    fn shutdown(
        &mut self,
        ctx: &mut SlotContext<'_>,
        direction: ChannelDirection,
        error: Option<io::ErrorKind>,
        abort: bool,
    ) -> Result<()> {
        self.shutdown_in_progress = true;

        if direction == ChannelDirection::Read {
            if abort && self.socket.is_open() {
                self.socket.shutdown()?;
            }
            ctx.complete_shutdown(direction, error, abort);
            return Ok(());
        }

        // Write direction: everything still queued fails with
        // socket-closed, exactly once per message.
        while let Some(mut message) = self.write_queue.pop_front() {
            if let Some(completion) = message.take_completion() {
                completion(Err(ErrorKind::SocketClosed));
            }
            ctx.release_message(message);
        }

        if self.socket.is_open() {
            if let Err(err) = self.socket.shutdown() {
                error!("socket shutdown failed: {}", err);
            }
        }

        // The acknowledgment is deferred through the scheduler so that a
        // read task already queued runs first and observes the latch
        // before teardown proceeds.
        self.shutdown_error = error;
        ctx.schedule_task(Task::new(ctx.slot(), SHUTDOWN_TASK), Schedule::Now);
        Ok(())
    }

    fn run_task(&mut self, ctx: &mut SlotContext<'_>, tag: &'static str, status: TaskStatus) {
        match tag {
            READ_TASK => {
                if status == TaskStatus::RunReady {
                    self.do_read(ctx);
                }
            }
            SHUTDOWN_TASK => {
                // Always the last handler in the shutdown sequence; the
                // abort flag no longer matters here.
                ctx.complete_shutdown(ChannelDirection::Write, self.shutdown_error, false);
            }
            _ => {}
        }
    }

    fn update(&mut self, ctx: &mut SlotContext<'_>) {
        let mut events = std::mem::take(&mut self.events);
        self.socket.poll_events(&mut events);
        for event in events.drain(..) {
            match event {
                SocketEvent::Readable(result) => self.on_readable(ctx, result),
                SocketEvent::WriteComplete(result) => self.on_write_complete(ctx, result),
            }
        }
        self.events = events;
    }
}
