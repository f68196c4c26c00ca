//! Serial listener
//!
//! NMEA 0183 arrives as a byte stream. The receive thread reassembles sentences
//! (`$` or `!` up to `\n`) and dispatches each one through a pooled frame. Outbound
//! payloads are written to the same port.

use super::{dispatch_received, ListenerFlags, ListenerSettings, ListenerState, TransmitListener};
use crate::dispatcher::{Dispatcher, RegistrationId};
use crate::metrics::{ListenerMetrics, MetricsSnapshot};
use crate::pool::{MessageSlotPool, PoolStats};
use crate::status::TransportStatus;
use crate::{Result, TransportError};
use nav_codec::{RawBuffer, WireFormat};
use parking_lot::Mutex;
use serialport::{DataBits, FlowControl, Parity, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, warn};

const READ_CHUNK: usize = 256;

/// Result of feeding one byte to a [`SentenceAssembler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerEvent {
    /// A complete sentence is available from [`SentenceAssembler::sentence`]
    Sentence,
    /// A sentence exceeded the size limit and was discarded
    Overflow,
}

/// Cuts a serial byte stream into sentences
///
/// Bytes before a start delimiter are ignored. A start delimiter in the middle of a
/// sentence restarts collection, dropping the partial sentence.
#[derive(Debug)]
pub struct SentenceAssembler {
    buffer: RawBuffer,
    max_sentence: usize,
    collecting: bool,
    overflowed: bool,
}

impl SentenceAssembler {
    pub fn new(max_sentence: usize) -> Self {
        Self {
            // Room for the carriage return
            buffer: RawBuffer::with_capacity(max_sentence + 1),
            max_sentence,
            collecting: false,
            overflowed: false,
        }
    }

    pub fn push(&mut self, byte: u8) -> Option<AssemblerEvent> {
        match byte {
            b'$' | b'!' => {
                self.buffer.clear();
                self.collecting = true;
                self.overflowed = false;
                // Capacity is at least one byte
                let _ = self.buffer.push(byte);
                None
            }
            b'\n' if self.collecting => {
                self.collecting = false;
                if self.overflowed || self.sentence().len() > self.max_sentence {
                    self.overflowed = false;
                    self.buffer.clear();
                    return Some(AssemblerEvent::Overflow);
                }
                Some(AssemblerEvent::Sentence)
            }
            _ if self.collecting && !self.overflowed => {
                if self.buffer.push(byte).is_err() {
                    self.overflowed = true;
                }
                None
            }
            _ => None,
        }
    }

    /// Last completed sentence without its line ending
    pub fn sentence(&self) -> &[u8] {
        let bytes = self.buffer.as_slice();
        bytes.strip_suffix(b"\r").unwrap_or(bytes)
    }
}

struct SerialTransmitter {
    name: String,
    writer: Mutex<Box<dyn Write + Send>>,
    flags: Arc<ListenerFlags>,
    metrics: ListenerMetrics,
}

impl SerialTransmitter {
    fn send(&self, payload: &[u8]) -> Result<usize> {
        if !self.flags.transmitting() {
            return Err(TransportError::Disabled {
                direction: "Transmit",
            });
        }

        let started = Instant::now();
        let mut writer = self.writer.lock();
        let written = writer.write_all(payload).and_then(|()| writer.flush());
        match written {
            Ok(()) => {
                self.metrics
                    .record_send(payload.len(), started.elapsed().as_nanos() as u64);
                debug!("Wrote {} bytes to serial port {}", payload.len(), self.name);
                Ok(payload.len())
            }
            Err(e) => {
                self.metrics.record_send_error();
                Err(TransportError::send_with_source(
                    format!("Failed to write to serial port {}", self.name),
                    e,
                ))
            }
        }
    }
}

impl TransmitListener for SerialTransmitter {
    fn name(&self) -> &str {
        &self.name
    }

    fn transmit(&self, payload: &[u8]) -> TransportStatus {
        TransportStatus::from_result(self.send(payload), |sent| format!("wrote {sent} bytes"))
    }
}

struct ReceiveLoop {
    name: String,
    reader: Box<dyn Read + Send>,
    flags: Arc<ListenerFlags>,
    dispatcher: Arc<Dispatcher>,
    metrics: ListenerMetrics,
    pool: MessageSlotPool,
    settings: ListenerSettings,
}

impl ReceiveLoop {
    fn run(mut self) -> PoolStats {
        let mut chunk = [0u8; READ_CHUNK];
        let mut assembler = SentenceAssembler::new(self.settings.max_frame_size);
        debug!(listener = %self.name, "Serial receive thread started");

        while !self.flags.stopping() {
            if !self.flags.receiving() {
                thread::sleep(self.settings.idle_delay);
                continue;
            }

            match self.reader.read(&mut chunk) {
                // End of stream; keep polling until closed
                Ok(0) => thread::sleep(self.settings.idle_delay),
                Ok(read) => {
                    if self.flags.stopping() {
                        break;
                    }
                    for &byte in &chunk[..read] {
                        match assembler.push(byte) {
                            Some(AssemblerEvent::Sentence) => dispatch_received(
                                &mut self.pool,
                                &self.dispatcher,
                                &self.metrics,
                                assembler.sentence(),
                            ),
                            Some(AssemblerEvent::Overflow) => {
                                self.metrics.record_dropped();
                                warn!(
                                    listener = %self.name,
                                    limit = self.settings.max_frame_size,
                                    "Oversized sentence dropped"
                                );
                            }
                            None => {}
                        }
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
                    let error = TransportError::receive_with_source("Serial read failed", e);
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

        debug!(listener = %self.name, "Serial receive thread stopped");
        self.pool.stats()
    }
}

/// Serial port endpoint feeding a [`Dispatcher`] with NMEA sentences
pub struct SerialListener {
    name: String,
    settings: ListenerSettings,
    dispatcher: Arc<Dispatcher>,
    state: ListenerState,
    flags: Arc<ListenerFlags>,
    metrics: ListenerMetrics,
    port: Option<String>,
    transmitter: Option<Arc<SerialTransmitter>>,
    registration: Option<RegistrationId>,
    receive_thread: Option<JoinHandle<PoolStats>>,
    last_pool_stats: Option<PoolStats>,
}

impl SerialListener {
    pub fn new(
        name: impl Into<String>,
        settings: ListenerSettings,
        dispatcher: Arc<Dispatcher>,
    ) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            name: name.into(),
            settings,
            dispatcher,
            state: ListenerState::Idle,
            flags: Arc::new(ListenerFlags::new()),
            metrics: ListenerMetrics::new(),
            port: None,
            transmitter: None,
            registration: None,
            receive_thread: None,
            last_pool_stats: None,
        })
    }

    /// Open `path` at `baud_rate` (8N1, no flow control) and start receiving
    pub fn open(&mut self, path: &str, baud_rate: u32) -> TransportStatus {
        TransportStatus::from_result(self.open_port(path, baud_rate), |_| {
            format!("opened {path} at {baud_rate} baud")
        })
    }

    fn open_port(&mut self, path: &str, baud_rate: u32) -> Result<()> {
        if self.state.is_active() {
            return Err(TransportError::invalid_state("open", "a closed listener"));
        }

        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.settings.read_timeout)
            .open()
            .map_err(|e| TransportError::serial(path, e))?;
        let writer = port
            .try_clone()
            .map_err(|e| TransportError::serial(path, e))?;

        info!("Opened serial port: {} at {} baud", path, baud_rate);
        self.start(path, port, writer)
    }

    /// Run the listener over an arbitrary byte stream
    ///
    /// `reader` must return periodically (data, a timeout error or end of stream) so the
    /// receive thread can observe `close`.
    pub fn open_stream<R, W>(&mut self, label: &str, reader: R, writer: W) -> TransportStatus
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let result = if self.state.is_active() {
            Err(TransportError::invalid_state("open", "a closed listener"))
        } else {
            self.start(label, reader, writer)
        };
        TransportStatus::from_result(result, |_| format!("reading {label}"))
    }

    fn start<R, W>(&mut self, label: &str, reader: R, writer: W) -> Result<()>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        self.flags.rearm();
        let transmitter = Arc::new(SerialTransmitter {
            name: label.to_string(),
            writer: Mutex::new(Box::new(writer)),
            flags: self.flags.clone(),
            metrics: self.metrics.clone(),
        });

        let receive = ReceiveLoop {
            name: self.name.clone(),
            reader: Box::new(reader),
            flags: self.flags.clone(),
            dispatcher: self.dispatcher.clone(),
            metrics: self.metrics.clone(),
            pool: MessageSlotPool::new(
                self.name.clone(),
                WireFormat::Nmea,
                self.settings.pool_size,
                self.settings.max_frame_size,
            )
            .with_metrics(self.metrics.clone()),
            settings: self.settings.clone(),
        };
        let handle = thread::Builder::new()
            .name(format!("serial-rx-{}", self.name))
            .spawn(move || receive.run())?;

        self.receive_thread = Some(handle);
        self.registration = Some(self.dispatcher.add_transmit_listener(transmitter.clone()));
        self.transmitter = Some(transmitter);
        self.port = Some(label.to_string());
        self.state = ListenerState::Active;
        Ok(())
    }

    pub fn send(&self, payload: &[u8]) -> TransportStatus {
        match &self.transmitter {
            Some(transmitter) => transmitter.transmit(payload),
            None if self.state == ListenerState::Closed => TransportError::Closed.into(),
            None => TransportError::invalid_state("send", "an open serial port").into(),
        }
    }

    pub fn set_receiving(&self, enabled: bool) {
        self.flags.set_receiving(enabled);
    }

    pub fn set_transmitting(&self, enabled: bool) {
        self.flags.set_transmitting(enabled);
    }

    /// Stop both directions, join the receive thread and release the port
    pub fn close(&mut self) {
        if matches!(self.state, ListenerState::Closed | ListenerState::Idle) {
            self.state = ListenerState::Closed;
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
                Err(_) => error!(listener = %self.name, "Serial receive thread panicked"),
            }
        }

        self.transmitter = None;
        self.state = ListenerState::Closed;
        info!(
            "Serial listener {} closed ({})",
            self.name,
            self.port.as_deref().unwrap_or("-")
        );
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn pool_stats(&self) -> Option<PoolStats> {
        self.last_pool_stats
    }
}

impl Drop for SerialListener {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SerialListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialListener")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("port", &self.port)
            .finish()
    }
}
