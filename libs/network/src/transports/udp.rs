//! UDP listener
//!
//! Binary frames arrive one per datagram on a bound local socket. The same socket sends
//! outbound payloads to the configured remote endpoint, so a peer that replies to the
//! source port reaches the receive thread.

use super::{dispatch_received, ListenerFlags, ListenerSettings, ListenerState, TransmitListener};
use crate::dispatcher::{Dispatcher, RegistrationId};
use crate::metrics::{ListenerMetrics, MetricsSnapshot};
use crate::pool::{MessageSlotPool, PoolStats};
use crate::status::TransportStatus;
use crate::{Result, TransportError};
use nav_codec::{RawBuffer, WireFormat, MAX_DATAGRAM_SIZE};
use parking_lot::RwLock;
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Send half shared with the dispatcher
struct UdpTransmitter {
    name: String,
    socket: Arc<UdpSocket>,
    remote: Arc<RwLock<Option<SocketAddr>>>,
    flags: Arc<ListenerFlags>,
    metrics: ListenerMetrics,
}

impl UdpTransmitter {
    fn send(&self, payload: &[u8]) -> Result<usize> {
        if !self.flags.transmitting() {
            return Err(TransportError::Disabled {
                direction: "Transmit",
            });
        }
        let remote = (*self.remote.read())
            .ok_or_else(|| TransportError::invalid_state("send", "a remote socket"))?;

        if payload.len() > MAX_DATAGRAM_SIZE {
            return Err(TransportError::configuration(
                format!(
                    "payload of {} bytes exceeds the UDP limit of {MAX_DATAGRAM_SIZE}",
                    payload.len()
                ),
                Some("payload"),
            ));
        }

        let started = Instant::now();
        match self.socket.send_to(payload, remote) {
            Ok(sent) => {
                self.metrics
                    .record_send(sent, started.elapsed().as_nanos() as u64);
                debug!("Sent UDP datagram to {}: {} bytes", remote, sent);
                Ok(sent)
            }
            Err(e) => {
                self.metrics.record_send_error();
                Err(TransportError::send_with_source(
                    format!("Failed to send UDP datagram to {remote}"),
                    e,
                ))
            }
        }
    }
}

impl TransmitListener for UdpTransmitter {
    fn name(&self) -> &str {
        &self.name
    }

    fn transmit(&self, payload: &[u8]) -> TransportStatus {
        TransportStatus::from_result(self.send(payload), |sent| format!("sent {sent} bytes"))
    }
}

/// State owned by the receive thread
struct ReceiveLoop {
    name: String,
    socket: Arc<UdpSocket>,
    flags: Arc<ListenerFlags>,
    dispatcher: Arc<Dispatcher>,
    metrics: ListenerMetrics,
    pool: MessageSlotPool,
    settings: ListenerSettings,
}

impl ReceiveLoop {
    fn run(mut self) -> PoolStats {
        // One spare byte so an oversized datagram shows up as a full scratch buffer
        let mut scratch = RawBuffer::with_capacity(self.settings.max_frame_size + 1);
        debug!(listener = %self.name, "UDP receive thread started");

        while !self.flags.stopping() {
            if !self.flags.receiving() {
                thread::sleep(self.settings.idle_delay);
                continue;
            }

            match scratch.fill_with(|buf| self.socket.recv(buf)) {
                Ok(received) => {
                    if self.flags.stopping() {
                        break;
                    }
                    if received > self.settings.max_frame_size {
                        self.metrics.record_dropped();
                        warn!(
                            listener = %self.name,
                            limit = self.settings.max_frame_size,
                            "Oversized UDP datagram dropped"
                        );
                    } else {
                        dispatch_received(
                            &mut self.pool,
                            &self.dispatcher,
                            &self.metrics,
                            scratch.as_slice(),
                        );
                    }
                    thread::sleep(self.settings.idle_delay);
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) => {}
                Err(e) => {
                    self.metrics.record_receive_error();
                    let error = TransportError::receive_with_source("UDP receive failed", e);
                    warn!(
                        listener = %self.name,
                        category = error.category(),
                        %error,
                        "Receive error"
                    );
                    thread::sleep(self.settings.idle_delay);
                }
            }
        }

        debug!(listener = %self.name, "UDP receive thread stopped");
        self.pool.stats()
    }
}

/// Bidirectional UDP endpoint feeding a [`Dispatcher`]
pub struct UdpListener {
    name: String,
    settings: ListenerSettings,
    dispatcher: Arc<Dispatcher>,
    state: ListenerState,
    flags: Arc<ListenerFlags>,
    metrics: ListenerMetrics,
    socket: Option<Arc<UdpSocket>>,
    remote: Arc<RwLock<Option<SocketAddr>>>,
    transmitter: Option<Arc<UdpTransmitter>>,
    registration: Option<RegistrationId>,
    receive_thread: Option<JoinHandle<PoolStats>>,
    last_pool_stats: Option<PoolStats>,
}

impl UdpListener {
    pub fn new(
        name: impl Into<String>,
        settings: ListenerSettings,
        dispatcher: Arc<Dispatcher>,
    ) -> Result<Self> {
        settings.validate()?;
        if settings.max_frame_size > MAX_DATAGRAM_SIZE {
            return Err(TransportError::configuration(
                "UDP max frame size cannot exceed 65507 bytes",
                Some("max_frame_size"),
            ));
        }

        Ok(Self {
            name: name.into(),
            settings,
            dispatcher,
            state: ListenerState::Idle,
            flags: Arc::new(ListenerFlags::new()),
            metrics: ListenerMetrics::new(),
            socket: None,
            remote: Arc::new(RwLock::new(None)),
            transmitter: None,
            registration: None,
            receive_thread: None,
            last_pool_stats: None,
        })
    }

    /// Bind the local socket, set the remote if given and start receiving
    pub fn open(
        &mut self,
        local_address: &str,
        local_port: u16,
        remote: Option<(&str, u16)>,
    ) -> TransportStatus {
        let bound = self.set_local_socket(local_address, local_port);
        if !bound.is_ok() {
            return bound;
        }

        let remote_status = remote.map(|(address, port)| self.set_remote_socket(address, port));

        let started = self.start();
        match remote_status {
            Some(status) if !status.is_ok() && started.is_ok() => TransportStatus::failure(
                format!("{}, sending blocked: {}", started.message, status.message),
            ),
            _ => started,
        }
    }

    /// Bind (or rebind) the receive endpoint
    pub fn set_local_socket(&mut self, address: &str, port: u16) -> TransportStatus {
        TransportStatus::from_result(self.bind(address, port), |addr| {
            format!("bound to {addr}")
        })
    }

    fn bind(&mut self, address: &str, port: u16) -> Result<SocketAddr> {
        if self.state.is_active() {
            return Err(TransportError::invalid_state(
                "set_local_socket",
                "a listener that is not receiving",
            ));
        }

        let requested = resolve(address, port)?;
        let socket = UdpSocket::bind(requested).map_err(|e| {
            TransportError::bind(
                format!("Failed to bind UDP socket on {requested}"),
                Some(requested),
                e,
            )
        })?;
        socket
            .set_read_timeout(Some(self.settings.read_timeout))
            .map_err(|e| TransportError::bind("Failed to set read timeout", Some(requested), e))?;
        let local = socket.local_addr()?;
        let socket = Arc::new(socket);

        self.flags.rearm();
        self.transmitter = Some(Arc::new(UdpTransmitter {
            name: self.name.clone(),
            socket: socket.clone(),
            remote: self.remote.clone(),
            flags: self.flags.clone(),
            metrics: self.metrics.clone(),
        }));
        self.socket = Some(socket);
        self.state = if self.remote.read().is_some() {
            ListenerState::RemoteConfigured
        } else {
            ListenerState::LocalBound
        };

        info!("UDP listener {} bound to: {}", self.name, local);
        Ok(local)
    }

    /// Set the destination for outbound payloads
    ///
    /// An unresolvable address clears the destination, which blocks sends until a valid
    /// one is set. Receiving is unaffected.
    pub fn set_remote_socket(&mut self, address: &str, port: u16) -> TransportStatus {
        match resolve(address, port) {
            Ok(remote) => {
                *self.remote.write() = Some(remote);
                if self.state == ListenerState::LocalBound {
                    self.state = ListenerState::RemoteConfigured;
                }
                info!("UDP listener {} sending to: {}", self.name, remote);
                TransportStatus::success(format!("remote set to {remote}"))
            }
            Err(error) => {
                *self.remote.write() = None;
                if self.state == ListenerState::RemoteConfigured {
                    self.state = ListenerState::LocalBound;
                }
                warn!(
                    listener = %self.name,
                    category = error.category(),
                    %error,
                    "Remote socket rejected"
                );
                error.into()
            }
        }
    }

    /// Start the receive thread and register the transmit path with the dispatcher
    pub fn start(&mut self) -> TransportStatus {
        TransportStatus::from_result(self.spawn_receiver(), |addr| {
            format!("listening on {addr}")
        })
    }

    fn spawn_receiver(&mut self) -> Result<SocketAddr> {
        let (socket, transmitter) = match (&self.socket, &self.transmitter) {
            (Some(socket), Some(transmitter)) => (socket.clone(), transmitter.clone()),
            _ => {
                return Err(TransportError::invalid_state(
                    "start",
                    "a bound local socket",
                ))
            }
        };
        let local = socket.local_addr()?;
        if self.state.is_active() {
            return Ok(local);
        }

        let receive = ReceiveLoop {
            name: self.name.clone(),
            socket,
            flags: self.flags.clone(),
            dispatcher: self.dispatcher.clone(),
            metrics: self.metrics.clone(),
            pool: MessageSlotPool::new(
                self.name.clone(),
                WireFormat::Binary,
                self.settings.pool_size,
                self.settings.max_frame_size,
            )
            .with_metrics(self.metrics.clone()),
            settings: self.settings.clone(),
        };
        let handle = thread::Builder::new()
            .name(format!("udp-rx-{}", self.name))
            .spawn(move || receive.run())?;

        self.receive_thread = Some(handle);
        self.registration = Some(self.dispatcher.add_transmit_listener(transmitter));
        self.state = ListenerState::Active;
        info!("UDP listener {} listening on: {}", self.name, local);
        Ok(local)
    }

    /// Send one payload to the remote endpoint
    pub fn send(&self, payload: &[u8]) -> TransportStatus {
        match &self.transmitter {
            Some(transmitter) => transmitter.transmit(payload),
            None if self.state == ListenerState::Closed => TransportError::Closed.into(),
            None => TransportError::invalid_state("send", "a bound local socket").into(),
        }
    }

    pub fn set_receiving(&self, enabled: bool) {
        self.flags.set_receiving(enabled);
        debug!(listener = %self.name, enabled, "Receiving toggled");
    }

    pub fn set_transmitting(&self, enabled: bool) {
        self.flags.set_transmitting(enabled);
        debug!(listener = %self.name, enabled, "Transmitting toggled");
    }

    pub fn is_receiving(&self) -> bool {
        self.flags.receiving()
    }

    pub fn is_transmitting(&self) -> bool {
        self.flags.transmitting()
    }

    /// Stop both directions, join the receive thread and release the socket
    ///
    /// Blocks for at most one read timeout plus one idle delay. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.state == ListenerState::Closed {
            return;
        }

        self.flags.set_receiving(false);
        self.flags.set_transmitting(false);
        if let Some(id) = self.registration.take() {
            self.dispatcher.remove_transmit_listener(id);
        }
        self.flags.request_stop();

        if let Some(handle) = self.receive_thread.take() {
            match handle.join() {
                Ok(stats) => self.last_pool_stats = Some(stats),
                Err(_) => error!(listener = %self.name, "UDP receive thread panicked"),
            }
        }

        self.transmitter = None;
        self.socket = None;
        self.state = ListenerState::Closed;
        info!("UDP listener {} closed", self.name);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|socket| socket.local_addr().ok())
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        *self.remote.read()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Pool occupancy reported by the last receive thread to exit
    pub fn pool_stats(&self) -> Option<PoolStats> {
        self.last_pool_stats
    }
}

impl Drop for UdpListener {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for UdpListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpListener")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("local", &self.local_addr())
            .field("remote", &self.remote_addr())
            .finish()
    }
}

fn resolve(address: &str, port: u16) -> Result<SocketAddr> {
    (address, port)
        .to_socket_addrs()
        .map_err(|e| {
            TransportError::connection_with_source(
                format!("Cannot resolve {address}:{port}"),
                None,
                e,
            )
        })?
        .next()
        .ok_or_else(|| {
            TransportError::connection(format!("No address found for {address}:{port}"), None)
        })
}
