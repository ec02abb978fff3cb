use crate::logging;
use crate::net::buffer::Buffer;
use crate::net::frame::{self, Decode, Status};
use crate::net::support::{NetworkError, NetworkResult};
use crate::store::Store;
use mio;
use mio::net::TcpStream;
use std::io;

// Initial capacity of each connection buffer.
const READ_BUF_SIZE: usize = 4096;
const WRITE_BUF_SIZE: usize = 4096;
// Space guaranteed ahead of every socket read.
const READ_RESERVE: usize = 1024;

const GET: &[u8] = b"get";
const SET: &[u8] = b"set";
const DEL: &[u8] = b"del";
const UNKNOWN_COMMAND: &[u8] = b"Unknown command";

pub type ChannelId = usize;

/// Poll token for a channel id. Token 0 is reserved for the listener.
#[inline]
pub fn token(id: ChannelId) -> mio::Token {
    mio::Token(id + 1)
}

/// Channel id for a poll token.
#[inline]
pub fn channel_id(token: mio::Token) -> ChannelId {
    usize::from(token) - 1
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ChannelState {
    /// Waiting for request bytes.
    Read,
    /// Draining buffered responses.
    Write,
    /// Terminal; the endpoint reaps the channel at the end of the iteration.
    Closed,
    /// Pooled, no stream attached.
    Disconnected,
}

/// A single client connection: the stream, the request/response buffers and
/// the half-duplex state driving the poll interest. Channel records are
/// pooled; a closed channel keeps its buffers and is reopened with the next
/// accepted stream.
pub struct Channel {
    id: Option<ChannelId>,
    stream: Option<TcpStream>,
    state: ChannelState,
    read_buffer: Buffer,
    write_buffer: Buffer,
    log: logging::Logger,
}

impl Channel {
    #[inline]
    pub fn new<'a, L: Into<Option<&'a logging::Logger>>>(log: L) -> Channel {
        let channel_log = match log.into() {
            Some(log) => log.new(logging::o!()),
            _ => logging::Logger::root(logging::Discard, logging::o!()),
        };

        Channel {
            id: None,
            stream: None,
            state: ChannelState::Disconnected,
            read_buffer: Buffer::new(READ_BUF_SIZE),
            write_buffer: Buffer::new(WRITE_BUF_SIZE),
            log: channel_log,
        }
    }

    /// Attach a freshly accepted stream. The channel must be pooled for this
    /// operation to succeed.
    pub fn open(&mut self, id: ChannelId, stream: TcpStream) {
        if self.state != ChannelState::Disconnected {
            panic!("Attempted to open an already open channel");
        }

        self.id = Some(id);
        self.stream = Some(stream);
        self.state = ChannelState::Read;

        logging::debug!(self.log, "channel opened"; "context" => "open", "channel_id" => id);
    }

    /// Drop the stream, clear both buffers and return the record to the
    /// pooled state.
    pub fn close(&mut self) {
        logging::debug!(self.log, "closing channel";
                        "context" => "close",
                        "channel_id" => self.id,
                        "read_size" => self.read_buffer.len(),
                        "write_size" => self.write_buffer.len());

        self.read_buffer.clear();
        self.write_buffer.clear();
        self.id = None;
        self.state = ChannelState::Disconnected;

        // Dropping the stream closes the socket.
        drop(self.stream.take().expect("Channel must have valid stream"));
    }

    #[inline]
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Readiness interest for the current state.
    #[inline]
    pub fn interest(&self) -> mio::Ready {
        match self.state {
            ChannelState::Read => mio::Ready::readable(),
            ChannelState::Write => mio::Ready::writable(),
            _ => mio::Ready::empty(),
        }
    }

    /// Registers this channel on the supplied poll.
    pub fn register(&self, id: ChannelId, poll: &mio::Poll) -> NetworkResult<()> {
        poll.register(
            self.stream.as_ref().expect("Can't register disconnected channel"),
            token(id),
            self.interest(),
            mio::PollOpt::level(),
        )
        .map_err(Into::into)
    }

    /// Updates the poll registration to the interest of the current state.
    pub fn reregister(&self, id: ChannelId, poll: &mio::Poll) -> NetworkResult<()> {
        poll.reregister(
            self.stream.as_ref().expect("Can't reregister disconnected channel"),
            token(id),
            self.interest(),
            mio::PollOpt::level(),
        )
        .map_err(Into::into)
    }

    /// Deregisters this channel on the supplied poll.
    pub fn deregister(&self, poll: &mio::Poll) -> NetworkResult<()> {
        poll.deregister(
            self.stream
                .as_ref()
                .expect("Can't deregister disconnected channel"),
        )
        .map_err(Into::into)
    }

    /// Read handler: a single non-blocking read followed by the pipelining
    /// pump. Returns the resulting state tag.
    pub fn receive(&mut self, store: &mut Store) -> ChannelState {
        let received = {
            let stream = self.stream.as_mut().expect("Channel must have valid stream");
            self.read_buffer.ingress(stream, READ_RESERVE)
        };

        match received {
            Ok(0) => {
                logging::debug!(self.log, "peer closed connection";
                                "context" => "receive",
                                "channel_id" => self.id);
                self.state = ChannelState::Closed;
            }
            Ok(count) => {
                logging::trace!(self.log, "received data";
                                "context" => "receive",
                                "channel_id" => self.id,
                                "count" => count);
                self.pump(store);
            }
            Err(err) => self.fold_io_error(err, "receive"),
        }

        self.state
    }

    /// Write handler: a single non-blocking write from the write buffer.
    /// Returns the resulting state tag.
    pub fn send(&mut self) -> ChannelState {
        let sent = {
            let stream = self.stream.as_mut().expect("Channel must have valid stream");
            self.write_buffer.egress(stream)
        };

        match sent {
            Ok(count) => {
                logging::trace!(self.log, "sent data";
                                "context" => "send",
                                "channel_id" => self.id,
                                "count" => count);
                if self.write_buffer.is_empty() {
                    self.state = ChannelState::Read;
                }
            }
            Err(err) => self.fold_io_error(err, "send"),
        }

        self.state
    }

    /// Peel complete request frames off the read buffer, serving each one in
    /// arrival order. Any malformed frame closes the channel; buffered
    /// responses for earlier requests in the batch stay queued.
    fn pump(&mut self, store: &mut Store) {
        loop {
            match frame::decode_request(self.read_buffer.read_slice()) {
                Decode::Incomplete => break,
                Decode::Malformed(err_type) => {
                    logging::warn!(self.log, "malformed request frame";
                                   "context" => "pump",
                                   "channel_id" => self.id,
                                   "error" => ?err_type);
                    self.state = ChannelState::Closed;
                    return;
                }
                Decode::Request { argv, frame_len } => {
                    self.dispatch(store, &argv);
                    self.read_buffer.consume(frame_len);
                }
            }
        }

        if !self.write_buffer.is_empty() {
            self.state = ChannelState::Write;
        }
    }

    /// Serve one parsed command, appending its response frame.
    fn dispatch(&mut self, store: &mut Store, argv: &[Vec<u8>]) {
        match argv {
            [cmd, key] if cmd.as_slice() == GET => match store.get(key) {
                Some(val) => frame::write_response(&mut self.write_buffer, Status::Ok, val),
                None => frame::write_response(&mut self.write_buffer, Status::Nx, &[]),
            },
            [cmd, key, val] if cmd.as_slice() == SET => {
                store.put(key, val);
                frame::write_response(&mut self.write_buffer, Status::Ok, &[]);
            }
            [cmd, key] if cmd.as_slice() == DEL => {
                store.del(key);
                frame::write_response(&mut self.write_buffer, Status::Ok, &[]);
            }
            _ => frame::write_response(&mut self.write_buffer, Status::Err, UNKNOWN_COMMAND),
        }
    }

    fn fold_io_error(&mut self, err: io::Error, context: &'static str) {
        match NetworkError::from(err) {
            NetworkError::Wait => (),
            NetworkError::Fatal(err_type) => {
                logging::warn!(self.log, "connection error";
                               "context" => context,
                               "channel_id" => self.id,
                               "error" => ?err_type);
                self.state = ChannelState::Closed;
            }
        }
    }
}
