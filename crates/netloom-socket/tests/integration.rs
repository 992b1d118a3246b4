//! End-to-end tests driving a socket handler inside a real channel, with a
//! scripted in-memory socket standing in for the network and a recording
//! handler standing in for the application.

use std::{
    cell::RefCell,
    collections::VecDeque,
    io,
    rc::Rc,
    sync::{Arc, Mutex},
};

use netloom_channel::{Channel, ChannelDirection, ChannelHandler, ChannelState, SlotContext};
use netloom_core::{
    config::Config,
    cursor::ByteCursor,
    error::Result,
    message::IoMessage,
    transport::{SocketEvent, StreamSocket},
};
use netloom_socket::{SocketHandler, TcpStreamSocket};

// ============================================================================
// Test doubles
// ============================================================================

#[derive(Default)]
struct MockState {
    /// Scripted inbound bytes; reads consume from the front and push back
    /// whatever did not fit the caller's buffer
    reads: VecDeque<Vec<u8>>,
    /// Error the next read reports once the script is exhausted
    read_error: Option<io::ErrorKind>,
    /// Events handed out on the next poll
    events: VecDeque<SocketEvent>,
    /// Writes accepted by the socket
    written: Vec<Vec<u8>>,
    /// Error for the next write submission
    write_error: Option<io::ErrorKind>,
    open: bool,
    shutdown_calls: usize,
}

#[derive(Clone)]
struct MockSocket(Rc<RefCell<MockState>>);

impl MockSocket {
    fn new() -> Self {
        MockSocket(Rc::new(RefCell::new(MockState { open: true, ..MockState::default() })))
    }

    fn push_read(&self, bytes: &[u8]) {
        self.0.borrow_mut().reads.push_back(bytes.to_vec());
    }

    fn push_event(&self, event: SocketEvent) {
        self.0.borrow_mut().events.push_back(event);
    }

    fn state(&self) -> std::cell::Ref<'_, MockState> {
        self.0.borrow()
    }
}

impl StreamSocket for MockSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.0.borrow_mut();
        match state.reads.pop_front() {
            Some(chunk) => {
                if chunk.len() <= buf.len() {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                } else {
                    buf.copy_from_slice(&chunk[..buf.len()]);
                    let rest = chunk[buf.len()..].to_vec();
                    state.reads.push_front(rest);
                    Ok(buf.len())
                }
            }
            None => match state.read_error.take() {
                Some(kind) => Err(io::Error::from(kind)),
                None => Err(io::Error::from(io::ErrorKind::WouldBlock)),
            },
        }
    }

    fn write(&mut self, data: ByteCursor) -> io::Result<()> {
        let mut state = self.0.borrow_mut();
        if let Some(kind) = state.write_error.take() {
            return Err(io::Error::from(kind));
        }
        state.written.push(data.as_slice().to_vec());
        Ok(())
    }

    fn poll_events(&mut self, out: &mut Vec<SocketEvent>) {
        out.extend(self.0.borrow_mut().events.drain(..));
    }

    fn is_open(&self) -> bool {
        self.0.borrow().open
    }

    fn shutdown(&mut self) -> io::Result<()> {
        let mut state = self.0.borrow_mut();
        state.open = false;
        state.shutdown_calls += 1;
        Ok(())
    }
}

#[derive(Default)]
struct SinkState {
    received: Vec<Vec<u8>>,
    shutdowns: Vec<ChannelDirection>,
    /// Window raise performed on the sink's next update
    raise_pending: Option<usize>,
    /// When set, messages are kept instead of released (lease pressure)
    hold_messages: bool,
    held: Vec<IoMessage>,
}

/// Application-side handler: records what arrives and releases it.
struct SinkHandler {
    state: Rc<RefCell<SinkState>>,
    window: usize,
}

impl ChannelHandler for SinkHandler {
    fn process_read_message(
        &mut self,
        ctx: &mut SlotContext<'_>,
        message: IoMessage,
    ) -> std::result::Result<(), netloom_channel::RejectedMessage> {
        let mut state = self.state.borrow_mut();
        state.received.push(message.data().to_vec());
        if state.hold_messages {
            state.held.push(message);
        } else {
            drop(state);
            ctx.release_message(message);
        }
        Ok(())
    }

    fn process_write_message(
        &mut self,
        ctx: &mut SlotContext<'_>,
        message: IoMessage,
    ) -> std::result::Result<(), netloom_channel::RejectedMessage> {
        ctx.release_message(message);
        Ok(())
    }

    fn increment_read_window(&mut self, _ctx: &mut SlotContext<'_>, _size: usize) -> Result<()> {
        Ok(())
    }

    fn initial_window_size(&self) -> usize {
        self.window
    }

    fn shutdown(
        &mut self,
        ctx: &mut SlotContext<'_>,
        direction: ChannelDirection,
        error: Option<io::ErrorKind>,
        abort: bool,
    ) -> Result<()> {
        self.state.borrow_mut().shutdowns.push(direction);
        ctx.complete_shutdown(direction, error, abort);
        Ok(())
    }

    fn update(&mut self, ctx: &mut SlotContext<'_>) {
        if let Some(size) = self.state.borrow_mut().raise_pending.take() {
            ctx.increment_read_window(size);
        }
    }
}

struct Fixture {
    channel: Channel,
    socket: MockSocket,
    sink: Rc<RefCell<SinkState>>,
}

fn fixture(max_rw_size: usize, sink_window: usize, config: Config) -> Fixture {
    let socket = MockSocket::new();
    let sink = Rc::new(RefCell::new(SinkState::default()));

    let mut channel = Channel::new(&config);
    let transport_slot = channel.append_slot();
    let app_slot = channel.append_slot();
    channel.set_handler(
        transport_slot,
        Box::new(SocketHandler::new(socket.clone(), max_rw_size)),
    );
    channel.set_handler(app_slot, Box::new(SinkHandler { state: sink.clone(), window: sink_window }));

    Fixture { channel, socket, sink }
}

fn completion_recorder(log: &Arc<Mutex<Vec<&'static str>>>) -> netloom_core::message::WriteCompletion {
    let log = log.clone();
    Box::new(move |result| {
        let entry = match result {
            Ok(()) => "ok",
            Err(netloom_core::error::ErrorKind::SocketClosed) => "closed",
            Err(_) => "io",
        };
        log.lock().unwrap().push(entry);
    })
}

// ============================================================================
// Read path
// ============================================================================

#[test]
fn read_stream_preserves_byte_order() {
    let mut fx = fixture(8, 1 << 20, Config::default());

    fx.socket.push_read(b"hello ");
    fx.socket.push_read(b"world");
    fx.socket.push_event(SocketEvent::Readable(Ok(())));

    for _ in 0..5 {
        fx.channel.poll();
    }

    let received: Vec<u8> = fx.sink.borrow().received.concat();
    assert_eq!(received, b"hello world");
    assert_eq!(fx.channel.pool().active_leases(), 0);
}

#[test]
fn read_loop_yields_after_each_quantum() {
    // 3 quanta of data are waiting. Each poll may consume at most one
    // quantum; the handler schedules a continuation task after the first
    // two and the third continuation finds the stream dry.
    let mut fx = fixture(4, 1 << 20, Config::default());

    fx.socket.push_read(&[0xAB; 12]);
    fx.socket.push_event(SocketEvent::Readable(Ok(())));

    let mut received_per_poll = Vec::new();
    for _ in 0..4 {
        fx.channel.poll();
        received_per_poll.push(fx.sink.borrow().received.len());
    }

    assert_eq!(received_per_poll, vec![1, 2, 3, 3]);
    assert_eq!(fx.channel.scheduled_task_count(), 0);

    let total: usize = fx.sink.borrow().received.iter().map(|m| m.len()).sum();
    assert_eq!(total, 12);
    assert!(fx.sink.borrow().received.iter().all(|m| m.len() <= 4));
    assert_eq!(fx.channel.pool().active_leases(), 0);
}

#[test]
fn zero_window_applies_backpressure_until_raised() {
    let mut fx = fixture(8, 4, Config::default());

    fx.socket.push_read(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    fx.socket.push_event(SocketEvent::Readable(Ok(())));

    for _ in 0..3 {
        fx.channel.poll();
    }

    // Only the initial window's worth came through.
    assert_eq!(fx.sink.borrow().received, vec![vec![1, 2, 3, 4]]);
    assert_eq!(fx.channel.read_window(1), 0);

    // Raising the window resumes the read loop.
    fx.sink.borrow_mut().raise_pending = Some(6);
    for _ in 0..3 {
        fx.channel.poll();
    }

    let received: Vec<u8> = fx.sink.borrow().received.concat();
    assert_eq!(received, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
}

#[test]
fn read_error_shuts_the_channel_down() {
    let mut fx = fixture(8, 1 << 20, Config::default());

    fx.socket.push_read(b"tail");
    fx.socket.0.borrow_mut().read_error = Some(io::ErrorKind::ConnectionReset);
    fx.socket.push_event(SocketEvent::Readable(Ok(())));

    for _ in 0..3 {
        fx.channel.poll();
    }

    // The bytes before the error still made it downstream.
    assert_eq!(fx.sink.borrow().received, vec![b"tail".to_vec()]);
    assert_eq!(fx.channel.state(), ChannelState::Closed);
    assert!(fx.socket.state().shutdown_calls >= 1);
    assert_eq!(fx.channel.pool().active_leases(), 0);
}

#[test]
fn readable_error_notification_shuts_the_channel_down() {
    let mut fx = fixture(8, 1 << 20, Config::default());

    fx.socket
        .push_event(SocketEvent::Readable(Err(io::Error::from(io::ErrorKind::ConnectionAborted))));

    for _ in 0..2 {
        fx.channel.poll();
    }

    assert_eq!(fx.channel.state(), ChannelState::Closed);
    assert!(fx.sink.borrow().received.is_empty());
}

#[test]
fn pool_exhaustion_escalates_to_shutdown() {
    let mut config = Config::default();
    config.max_active_messages = 1;
    let mut fx = fixture(4, 1 << 20, config);

    // The sink holds on to messages, so the single lease is gone after
    // the first read and the continuation cannot acquire.
    fx.sink.borrow_mut().hold_messages = true;
    fx.socket.push_read(&[0xCD; 8]);
    fx.socket.push_event(SocketEvent::Readable(Ok(())));

    for _ in 0..3 {
        fx.channel.poll();
    }

    assert_eq!(fx.sink.borrow().received.len(), 1);
    assert_ne!(fx.channel.state(), ChannelState::Active);
}

// ============================================================================
// Write path
// ============================================================================

#[test]
fn write_completion_fires_and_releases() {
    let mut fx = fixture(8, 1 << 20, Config::default());
    let completions = Arc::new(Mutex::new(Vec::new()));

    let mut message = IoMessage::new(b"frame".to_vec());
    message.set_completion(completion_recorder(&completions));
    fx.channel.deliver(0, ChannelDirection::Write, message).unwrap();

    assert_eq!(fx.socket.state().written, vec![b"frame".to_vec()]);
    assert!(completions.lock().unwrap().is_empty());

    fx.socket.push_event(SocketEvent::WriteComplete(Ok(5)));
    fx.channel.poll();

    assert_eq!(*completions.lock().unwrap(), vec!["ok"]);
    assert_eq!(fx.channel.state(), ChannelState::Active);
}

#[test]
fn write_failure_fails_later_writes_with_socket_closed() {
    let mut fx = fixture(8, 1 << 20, Config::default());
    let completions = Arc::new(Mutex::new(Vec::new()));

    for payload in [&b"first"[..], &b"second"[..]] {
        let mut message = IoMessage::new(payload.to_vec());
        message.set_completion(completion_recorder(&completions));
        fx.channel.deliver(0, ChannelDirection::Write, message).unwrap();
    }

    // The first write fails on the wire; the handler shuts the channel
    // down, and the write-direction drain fails the second message.
    fx.socket
        .push_event(SocketEvent::WriteComplete(Err(io::Error::from(io::ErrorKind::BrokenPipe))));
    for _ in 0..3 {
        fx.channel.poll();
    }

    assert_eq!(*completions.lock().unwrap(), vec!["io", "closed"]);
    assert_eq!(fx.channel.state(), ChannelState::Closed);
    assert_eq!(fx.channel.pool().active_leases(), 0);
}

// ============================================================================
// Shutdown protocol
// ============================================================================

#[test]
fn graceful_shutdown_drains_write_queue_exactly_once() {
    let mut fx = fixture(8, 1 << 20, Config::default());
    let completions = Arc::new(Mutex::new(Vec::new()));

    for payload in [&b"a"[..], &b"b"[..], &b"c"[..]] {
        let mut message = IoMessage::new(payload.to_vec());
        message.set_completion(completion_recorder(&completions));
        fx.channel.deliver(0, ChannelDirection::Write, message).unwrap();
    }

    fx.channel.shutdown(None);

    // Every queued message failed with socket-closed, exactly once each.
    assert_eq!(*completions.lock().unwrap(), vec!["closed", "closed", "closed"]);
    // The write-direction acknowledgment is deferred through a task, so
    // the channel has not closed yet.
    assert_eq!(fx.channel.state(), ChannelState::ShuttingDown);

    fx.channel.poll();
    assert_eq!(fx.channel.state(), ChannelState::Closed);
    assert_eq!(fx.channel.pool().active_leases(), 0);

    // Late completions for bytes already on the wire are ignored.
    fx.socket.push_event(SocketEvent::WriteComplete(Ok(1)));
    fx.channel.poll();
    assert_eq!(completions.lock().unwrap().len(), 3);
}

#[test]
fn graceful_shutdown_still_closes_the_socket_for_writes() {
    let mut fx = fixture(8, 1 << 20, Config::default());

    fx.channel.shutdown(None);
    fx.channel.poll();

    // abort is false, so the read direction leaves the socket alone; the
    // write direction closes it.
    assert_eq!(fx.socket.state().shutdown_calls, 1);
    assert!(!fx.socket.state().open);
    assert_eq!(fx.channel.state(), ChannelState::Closed);
}

#[test]
fn no_reads_dispatch_after_shutdown_latches() {
    let mut fx = fixture(8, 1 << 20, Config::default());

    fx.socket.push_read(b"late data");
    fx.socket.push_event(SocketEvent::Readable(Ok(())));

    fx.channel.shutdown(None);
    for _ in 0..3 {
        fx.channel.poll();
    }

    assert!(fx.sink.borrow().received.is_empty());
    assert_eq!(fx.channel.state(), ChannelState::Closed);
}

#[test]
fn window_raise_is_a_no_op_during_shutdown() {
    let mut fx = fixture(8, 1 << 20, Config::default());

    fx.socket.push_read(b"late");
    fx.channel.shutdown(None);
    fx.channel.poll();
    assert_eq!(fx.channel.state(), ChannelState::Closed);

    // The raise reaches the socket handler, which declines to schedule
    // any read work.
    fx.sink.borrow_mut().raise_pending = Some(1024);
    fx.channel.poll();
    fx.channel.poll();

    assert_eq!(fx.channel.scheduled_task_count(), 0);
    assert!(fx.sink.borrow().received.is_empty());
}

#[test]
fn deferred_ack_runs_after_a_pending_read_task() {
    let mut fx = fixture(4, 1 << 20, Config::default());

    // The first quantum leaves a continuation task in the scheduler.
    fx.socket.push_read(&[0xEE; 8]);
    fx.socket.push_event(SocketEvent::Readable(Ok(())));
    fx.channel.poll();
    assert_eq!(fx.sink.borrow().received.len(), 1);
    assert_eq!(fx.channel.scheduled_task_count(), 1);

    // Shutdown queues its acknowledgment behind that read task. The next
    // poll runs the read task first, which observes the latch and does
    // nothing, and only then the acknowledgment closes the channel.
    fx.channel.shutdown(None);
    assert_eq!(fx.channel.state(), ChannelState::ShuttingDown);

    fx.channel.poll();
    assert_eq!(fx.sink.borrow().received.len(), 1);
    assert_eq!(fx.channel.state(), ChannelState::Closed);
}

#[test]
fn shutdown_walks_both_directions_through_the_sink() {
    let mut fx = fixture(8, 1 << 20, Config::default());

    fx.channel.shutdown(None);
    fx.channel.poll();

    assert_eq!(
        fx.sink.borrow().shutdowns,
        vec![ChannelDirection::Read, ChannelDirection::Write]
    );
}

// ============================================================================
// TCP loopback
// ============================================================================

#[test]
fn tcp_loopback_delivers_a_message() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let config = Config::default();

    let client_socket = TcpStreamSocket::connect(addr, &config).unwrap();
    let (server_stream, _) = listener.accept().unwrap();
    let server_socket = TcpStreamSocket::new(server_stream, &config).unwrap();

    let sink = Rc::new(RefCell::new(SinkState::default()));
    let mut server = Channel::new(&config);
    let transport_slot = server.append_slot();
    let app_slot = server.append_slot();
    server.set_handler(transport_slot, Box::new(SocketHandler::from_config(server_socket, &config)));
    server.set_handler(app_slot, Box::new(SinkHandler { state: sink.clone(), window: 1 << 20 }));

    let mut client = Channel::new(&config);
    let client_transport = client.append_slot();
    let client_app = client.append_slot();
    client.set_handler(client_transport, Box::new(SocketHandler::from_config(client_socket, &config)));
    client.set_handler(client_app, Box::new(SinkHandler { state: Rc::new(RefCell::new(SinkState::default())), window: 1 << 20 }));

    let completions = Arc::new(Mutex::new(Vec::new()));
    let mut message = IoMessage::new(b"ping".to_vec());
    message.set_completion(completion_recorder(&completions));
    client.deliver(0, ChannelDirection::Write, message).unwrap();

    let mut received = Vec::new();
    for _ in 0..500 {
        client.poll();
        server.poll();
        received = sink.borrow().received.concat();
        if received == b"ping" {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(1));
    }

    assert_eq!(received, b"ping");
    assert_eq!(*completions.lock().unwrap(), vec!["ok"]);
}
