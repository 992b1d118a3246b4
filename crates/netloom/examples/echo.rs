//! TCP echo over two channels in one process.
//!
//! The server channel turns every read message straight back around into
//! a write; the client channel prints what comes back.
//!
//! ```text
//! cargo run --example echo
//! ```

use std::{cell::RefCell, net::TcpListener, rc::Rc, time::Duration};

use netloom::prelude::*;

/// Sends every read message back out in the write direction.
struct EchoHandler;

impl ChannelHandler for EchoHandler {
    fn process_read_message(
        &mut self,
        ctx: &mut SlotContext<'_>,
        message: IoMessage,
    ) -> std::result::Result<(), netloom::RejectedMessage> {
        println!("server: echoing {} bytes", message.len());
        if let Err(rejected) = ctx.send_message(message, ChannelDirection::Write) {
            ctx.release_message(rejected.message);
        }
        Ok(())
    }

    fn process_write_message(
        &mut self,
        ctx: &mut SlotContext<'_>,
        message: IoMessage,
    ) -> std::result::Result<(), netloom::RejectedMessage> {
        ctx.release_message(message);
        Ok(())
    }

    fn increment_read_window(&mut self, _ctx: &mut SlotContext<'_>, _size: usize) -> Result<()> {
        Ok(())
    }

    fn initial_window_size(&self) -> usize {
        1 << 20
    }

    fn shutdown(
        &mut self,
        ctx: &mut SlotContext<'_>,
        direction: ChannelDirection,
        error: Option<std::io::ErrorKind>,
        abort: bool,
    ) -> Result<()> {
        ctx.complete_shutdown(direction, error, abort);
        Ok(())
    }
}

/// Collects every read message into a shared buffer.
struct CollectHandler {
    received: Rc<RefCell<Vec<u8>>>,
}

impl ChannelHandler for CollectHandler {
    fn process_read_message(
        &mut self,
        ctx: &mut SlotContext<'_>,
        message: IoMessage,
    ) -> std::result::Result<(), netloom::RejectedMessage> {
        self.received.borrow_mut().extend_from_slice(message.data());
        ctx.release_message(message);
        Ok(())
    }

    fn process_write_message(
        &mut self,
        ctx: &mut SlotContext<'_>,
        message: IoMessage,
    ) -> std::result::Result<(), netloom::RejectedMessage> {
        ctx.release_message(message);
        Ok(())
    }

    fn increment_read_window(&mut self, _ctx: &mut SlotContext<'_>, _size: usize) -> Result<()> {
        Ok(())
    }

    fn initial_window_size(&self) -> usize {
        1 << 20
    }

    fn shutdown(
        &mut self,
        ctx: &mut SlotContext<'_>,
        direction: ChannelDirection,
        error: Option<std::io::ErrorKind>,
        abort: bool,
    ) -> Result<()> {
        ctx.complete_shutdown(direction, error, abort);
        Ok(())
    }
}

fn channel_over(
    socket: TcpStreamSocket,
    config: &Config,
    app: Box<dyn ChannelHandler>,
) -> Channel {
    let mut channel = Channel::new(config);
    let transport_slot = channel.append_slot();
    let app_slot = channel.append_slot();
    channel.set_handler(transport_slot, Box::new(SocketHandler::from_config(socket, config)));
    channel.set_handler(app_slot, app);
    channel
}

fn main() -> std::io::Result<()> {
    let config = Config::default();

    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    println!("listening on {}", addr);

    let client_socket = TcpStreamSocket::connect(addr, &config)?;
    let (server_stream, peer) = listener.accept()?;
    println!("accepted {}", peer);
    let server_socket = TcpStreamSocket::new(server_stream, &config)?;

    let mut server = channel_over(server_socket, &config, Box::new(EchoHandler));

    let received = Rc::new(RefCell::new(Vec::new()));
    let mut client = channel_over(
        client_socket,
        &config,
        Box::new(CollectHandler { received: received.clone() }),
    );

    // Hand the outbound message to the client's socket handler.
    let message = IoMessage::new(b"hello netloom".to_vec());
    if let Err(rejected) = client.deliver(0, ChannelDirection::Write, message) {
        eprintln!("write rejected: {}", rejected.error);
        std::process::exit(1);
    }

    for _ in 0..500 {
        client.poll();
        server.poll();
        if received.borrow().as_slice() == b"hello netloom" {
            break;
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    println!("client: got {:?}", String::from_utf8_lossy(&received.borrow()));

    client.shutdown(None);
    server.shutdown(None);
    client.poll();
    server.poll();

    Ok(())
}
