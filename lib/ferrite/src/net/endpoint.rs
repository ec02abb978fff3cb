use crate::logging;
use crate::net::channel::{self, Channel, ChannelId, ChannelState};
use crate::net::support::NetworkResult;
use crate::store::Store;
use indexmap::IndexSet;
use mio;
use mio::net::TcpListener;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

const LISTENER_TOKEN: mio::Token = mio::Token(0);
// Sized well above the expected connection count so no ready connection is
// dropped from a poll round.
const EVENTS_CAPACITY: usize = 8192;

/// Single-threaded readiness loop serving the key-value protocol: one poll
/// watches the listener and every open channel, read-ready channels run the
/// request pump, write-ready channels drain their buffered responses, and
/// closed channels are reaped at the end of each iteration.
///
/// The store lives inside the endpoint, so separate endpoints never share
/// state and all access stays on the loop thread.
pub struct Endpoint {
    listener: TcpListener,
    poll: mio::Poll,
    events: mio::Events,
    channels: Vec<Channel>,
    free: Vec<ChannelId>,
    live: IndexSet<ChannelId>,
    store: Store,
    log: logging::Logger,
}

impl Endpoint {
    /// Construct a new `Endpoint` bound to the provided address in the
    /// format `<ip>:<port>`. Setup failures are fatal to the caller.
    pub fn new<'a, L: Into<Option<&'a logging::Logger>>>(
        address: &str,
        log: L,
    ) -> NetworkResult<Endpoint> {
        let endpoint_log = match log.into() {
            Some(log) => log.new(logging::o!()),
            _ => logging::Logger::root(logging::Discard, logging::o!()),
        };

        let poll = mio::Poll::new()?;
        let listener = TcpListener::bind(&address.parse::<SocketAddr>()?)?;

        poll.register(
            &listener,
            LISTENER_TOKEN,
            mio::Ready::readable(),
            mio::PollOpt::level(),
        )?;

        Ok(Endpoint {
            listener,
            poll,
            events: mio::Events::with_capacity(EVENTS_CAPACITY),
            channels: Vec::new(),
            free: Vec::new(),
            live: IndexSet::new(),
            store: Store::new(),
            log: endpoint_log,
        })
    }

    /// The address the listener is bound to.
    #[inline]
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    #[inline]
    pub fn store(&self) -> &Store {
        &self.store
    }

    #[inline]
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Number of currently open connections.
    #[inline]
    pub fn connection_count(&self) -> usize {
        self.live.len()
    }

    /// Run the loop until a poll failure. Each iteration blocks until at
    /// least one socket is ready.
    pub fn run(&mut self) -> NetworkResult<()> {
        loop {
            self.sync(None)?;
        }
    }

    /// One loop iteration: poll for readiness, accept, service every ready
    /// channel, then reap everything that reached `Closed`.
    pub fn sync(&mut self, timeout: Option<Duration>) -> NetworkResult<()> {
        match self.poll.poll(&mut self.events, timeout) {
            Ok(_) => (),
            // Interrupted wakeups retry on the next iteration.
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(err) => return Err(err.into()),
        }

        let listener = &self.listener;
        let poll = &self.poll;
        let channels = &mut self.channels;
        let free = &mut self.free;
        let live = &mut self.live;
        let store = &mut self.store;
        let log = &self.log;

        for event in &self.events {
            if event.token() == LISTENER_TOKEN {
                Self::accept(listener, poll, channels, free, live, log);
                continue;
            }

            let id = channel::channel_id(event.token());
            let channel = &mut channels[id];
            let readiness = event.readiness();
            let prior = channel.state();

            if readiness.is_readable() && prior == ChannelState::Read {
                channel.receive(store);
            } else if readiness.is_writable() && prior == ChannelState::Write {
                channel.send();
            }

            // Follow Read <-> Write transitions with the poll interest.
            let state = channel.state();
            if state != prior && (state == ChannelState::Read || state == ChannelState::Write) {
                channel
                    .reregister(id, poll)
                    .expect("Stream reregistration failed");
            }
        }

        // Reap every channel the handlers closed during this iteration.
        live.retain(|&id| {
            let channel = &mut channels[id];
            if channel.state() != ChannelState::Closed {
                return true;
            }

            drop(channel.deregister(poll));
            channel.close();
            free.push(id);

            logging::debug!(log, "channel reaped"; "context" => "sync", "channel_id" => id);
            false
        });

        Ok(())
    }

    /// Accept one incoming connection, attaching it to a pooled channel slot
    /// or a fresh one. Accept errors other than would-block are logged and
    /// the listener stays up.
    fn accept(
        listener: &TcpListener,
        poll: &mio::Poll,
        channels: &mut Vec<Channel>,
        free: &mut Vec<ChannelId>,
        live: &mut IndexSet<ChannelId>,
        log: &logging::Logger,
    ) {
        match listener.accept() {
            Ok((stream, address)) => {
                let id = match free.pop() {
                    Some(id) => id,
                    None => {
                        channels.push(Channel::new(log));
                        channels.len() - 1
                    }
                };

                let channel = &mut channels[id];
                channel.open(id, stream);
                channel
                    .register(id, poll)
                    .expect("Stream registration failed");
                live.insert(id);

                logging::debug!(log, "client connected";
                                "context" => "accept",
                                "channel_id" => id,
                                "address" => %address);
            }
            Err(err) => {
                if err.kind() != io::ErrorKind::WouldBlock {
                    logging::error!(log, "failure accepting connection";
                                    "context" => "accept",
                                    "error" => %err);
                }
            }
        }
    }
}
