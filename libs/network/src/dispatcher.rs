//! Frame dispatcher
//!
//! The dispatcher sits between the listeners and everything downstream:
//!
//! ```text
//!   UdpListener ──┐                          ┌──▶ ChannelSink (display)
//!                 ├─▶ identify ─▶ resolve ─▶ decode ─▶ batch ─┤
//! SerialListener ─┘                          └──▶ ChannelSink (telemetry)
//!
//!   select_outbound + FieldSource ─▶ encode ─▶ every TransmitListener
//! ```
//!
//! One dispatcher is shared (`Arc`) by every listener. Dispatch runs on the calling
//! receive thread; the sink and transmit-listener lists are read-locked per frame, so
//! registration from the control thread never waits on a decode.

use crate::error::{Result, TransportError};
use crate::status::TransportStatus;
use crate::transports::TransmitListener;
use nav_codec::{
    diagnostics, CodecRegistry, EncodeMode, FieldSource, RawBuffer, ReceivedFrame,
};
use nav_types::{ChannelSink, NavFields, NavUpdate};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Outbound payloads never exceed one Ethernet MTU
const OUTBOUND_CAPACITY: usize = 1500;

/// Handle returned by the `add_*` registration calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(u64);

/// What happened to one dispatched frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispatchOutcome {
    /// A registered codec decoded the frame; `update` may be empty (heartbeats, no fix),
    /// in which case the frame notes say why
    Decoded { message_id: u32, update: NavUpdate },
    /// A registered codec gave up on the frame and left a diagnostic dump
    Diagnostic { message_id: u32 },
    /// No codec for the id; the default codec dumped it
    Unrecognized { message_id: u32 },
    /// The frame could not be identified (short header, bad checksum)
    Rejected,
}

/// Dispatcher counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DispatchStats {
    pub frames_dispatched: u64,
    pub frames_decoded: u64,
    pub diagnostics: u64,
    pub unrecognized: u64,
    pub rejected: u64,
    pub sink_updates: u64,
    pub transmissions: u64,
}

#[derive(Debug, Default)]
struct DispatchCounters {
    frames_dispatched: AtomicU64,
    frames_decoded: AtomicU64,
    diagnostics: AtomicU64,
    unrecognized: AtomicU64,
    rejected: AtomicU64,
    sink_updates: AtomicU64,
    transmissions: AtomicU64,
}

struct Outbound {
    selected: Option<u32>,
    source: FieldSource,
    buffer: RawBuffer,
}

/// Routes received frames to sinks and outbound payloads to transmit listeners
pub struct Dispatcher {
    registry: Arc<CodecRegistry>,
    sinks: RwLock<Vec<(RegistrationId, Arc<dyn ChannelSink>)>>,
    transmitters: RwLock<Vec<(RegistrationId, Arc<dyn TransmitListener>)>>,
    next_registration: AtomicU64,
    outbound: Mutex<Outbound>,
    counters: DispatchCounters,
}

impl Dispatcher {
    pub fn new(registry: Arc<CodecRegistry>) -> Self {
        Self {
            registry,
            sinks: RwLock::new(Vec::new()),
            transmitters: RwLock::new(Vec::new()),
            next_registration: AtomicU64::new(1),
            outbound: Mutex::new(Outbound {
                selected: None,
                source: FieldSource::default(),
                buffer: RawBuffer::with_capacity(OUTBOUND_CAPACITY),
            }),
            counters: DispatchCounters::default(),
        }
    }

    /// Dispatcher over every codec this workspace provides
    pub fn with_standard_codecs() -> Self {
        Self::new(Arc::new(CodecRegistry::standard()))
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    fn next_id(&self) -> RegistrationId {
        RegistrationId(self.next_registration.fetch_add(1, Ordering::Relaxed))
    }

    pub fn add_sink(&self, sink: Arc<dyn ChannelSink>) -> RegistrationId {
        let id = self.next_id();
        self.sinks.write().push((id, sink));
        id
    }

    /// Returns false if `id` was not registered
    pub fn remove_sink(&self, id: RegistrationId) -> bool {
        let mut sinks = self.sinks.write();
        let before = sinks.len();
        sinks.retain(|(registered, _)| *registered != id);
        sinks.len() != before
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.read().len()
    }

    pub fn add_transmit_listener(&self, listener: Arc<dyn TransmitListener>) -> RegistrationId {
        let id = self.next_id();
        debug!(listener = listener.name(), "Registered transmit listener");
        self.transmitters.write().push((id, listener));
        id
    }

    pub fn remove_transmit_listener(&self, id: RegistrationId) -> bool {
        let mut transmitters = self.transmitters.write();
        let before = transmitters.len();
        transmitters.retain(|(registered, _)| *registered != id);
        transmitters.len() != before
    }

    pub fn transmit_listener_count(&self) -> usize {
        self.transmitters.read().len()
    }

    /// Identify, decode and forward one filled frame
    ///
    /// Runs on the receive thread that owns `frame`. Nothing here fails outward: framing
    /// and decode problems end up as diagnostics in the frame.
    pub fn dispatch(&self, frame: &mut ReceivedFrame) -> DispatchOutcome {
        self.counters
            .frames_dispatched
            .fetch_add(1, Ordering::Relaxed);

        let message_id = match self.registry.identify(frame) {
            Ok(id) => id,
            Err(error) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                self.counters.diagnostics.fetch_add(1, Ordering::Relaxed);
                diagnostics::record_failure(frame, "framing", &error);
                debug!(%error, bytes = frame.bytes().len(), "Frame rejected");
                return DispatchOutcome::Rejected;
            }
        };

        let Some(codec) = self.registry.lookup(frame.format(), message_id) else {
            self.counters.unrecognized.fetch_add(1, Ordering::Relaxed);
            self.registry.fallback().decode(frame);
            debug!(message_id, bytes = frame.bytes().len(), "Unrecognized message type");
            return DispatchOutcome::Unrecognized { message_id };
        };

        let update = codec.decode(frame);
        if frame.is_failed() {
            self.counters.diagnostics.fetch_add(1, Ordering::Relaxed);
            debug!(
                message_id,
                codec = codec.name(),
                notes = frame.notes(),
                "Frame failed to decode"
            );
            return DispatchOutcome::Diagnostic { message_id };
        }

        self.counters.frames_decoded.fetch_add(1, Ordering::Relaxed);
        if !update.is_empty() {
            self.forward(&update);
        }
        trace!(message_id, codec = codec.name(), fields = update.field_count(), "Dispatched");
        DispatchOutcome::Decoded { message_id, update }
    }

    fn forward(&self, update: &NavUpdate) {
        let sinks = self.sinks.read();
        for (_, sink) in sinks.iter() {
            sink.update_batch(update);
        }
        self.counters
            .sink_updates
            .fetch_add(sinks.len() as u64, Ordering::Relaxed);
    }

    /// Choose the message `transmit` encodes; the id must have a registered codec
    pub fn select_outbound(&self, message_id: u32) -> Result<()> {
        if !self.registry.contains(message_id) {
            return Err(TransportError::configuration(
                format!("no codec registered for message type {message_id:#x}"),
                Some("outbound"),
            ));
        }
        self.outbound.lock().selected = Some(message_id);
        Ok(())
    }

    pub fn selected_outbound(&self) -> Option<u32> {
        self.outbound.lock().selected
    }

    pub fn set_data_source(&self, mode: EncodeMode) {
        self.outbound.lock().source.set_mode(mode);
    }

    pub fn data_source(&self) -> EncodeMode {
        self.outbound.lock().source.mode()
    }

    /// Latest values from a live source (simulation, upstream feed)
    pub fn set_live_fields(&self, fields: NavFields) {
        self.outbound.lock().source.set_live(fields);
    }

    /// Encode the selected message from the data source and send it to every transmit
    /// listener, returning one status per listener
    pub fn transmit(&self) -> Result<Vec<TransportStatus>> {
        let (codec, payload) = {
            let mut outbound = self.outbound.lock();
            let message_id = outbound.selected.ok_or_else(|| {
                TransportError::configuration("no outbound message selected", Some("outbound"))
            })?;
            let fields = outbound.source.next_fields();
            self.encode(&mut outbound.buffer, message_id, &fields)?
        };
        Ok(self.send_to_listeners(codec, &payload))
    }

    /// Encode `message_id` from explicit field values and send it to every listener
    pub fn transmit_message(
        &self,
        message_id: u32,
        fields: &NavFields,
    ) -> Result<Vec<TransportStatus>> {
        let (codec, payload) = {
            let mut outbound = self.outbound.lock();
            self.encode(&mut outbound.buffer, message_id, fields)?
        };
        Ok(self.send_to_listeners(codec, &payload))
    }

    /// Encode into the shared buffer and copy the payload out, so listeners send without
    /// the outbound lock held
    fn encode(
        &self,
        buffer: &mut RawBuffer,
        message_id: u32,
        fields: &NavFields,
    ) -> Result<(&'static str, Vec<u8>)> {
        let codec = self.registry.get(message_id).ok_or_else(|| {
            TransportError::configuration(
                format!("no codec registered for message type {message_id:#x}"),
                Some("outbound"),
            )
        })?;
        codec.encode(fields, buffer)?;
        Ok((codec.name(), buffer.as_slice().to_vec()))
    }

    fn send_to_listeners(&self, codec: &'static str, payload: &[u8]) -> Vec<TransportStatus> {
        let transmitters = self.transmitters.read();
        if transmitters.is_empty() {
            warn!(codec, "Transmit requested with no transmit listeners");
        }
        let statuses: Vec<TransportStatus> = transmitters
            .iter()
            .map(|(_, listener)| listener.transmit(payload))
            .collect();
        self.counters.transmissions.fetch_add(1, Ordering::Relaxed);
        debug!(
            codec,
            bytes = payload.len(),
            listeners = statuses.len(),
            "Transmitted"
        );
        statuses
    }

    pub fn stats(&self) -> DispatchStats {
        let c = &self.counters;
        DispatchStats {
            frames_dispatched: c.frames_dispatched.load(Ordering::Relaxed),
            frames_decoded: c.frames_decoded.load(Ordering::Relaxed),
            diagnostics: c.diagnostics.load(Ordering::Relaxed),
            unrecognized: c.unrecognized.load(Ordering::Relaxed),
            rejected: c.rejected.load(Ordering::Relaxed),
            sink_updates: c.sink_updates.load(Ordering::Relaxed),
            transmissions: c.transmissions.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("sinks", &self.sink_count())
            .field("transmit_listeners", &self.transmit_listener_count())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nav_codec::WireFormat;
    use nav_types::{BinaryMessageType, RecordingSink, SentenceId};
    use std::sync::Weak;

    struct CapturingListener {
        payloads: Mutex<Vec<Vec<u8>>>,
        fail: bool,
    }

    impl CapturingListener {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                payloads: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    impl TransmitListener for CapturingListener {
        fn name(&self) -> &str {
            "capture"
        }

        fn transmit(&self, payload: &[u8]) -> TransportStatus {
            if self.fail {
                let cause = std::io::Error::from(std::io::ErrorKind::BrokenPipe);
                return TransportError::send_with_source("link down", cause).into();
            }
            self.payloads.lock().push(payload.to_vec());
            TransportStatus::success(format!("{} bytes", payload.len()))
        }
    }

    fn frame_for(dispatcher: &Dispatcher, id: u32, fields: &NavFields) -> ReceivedFrame {
        let mut out = RawBuffer::with_capacity(256);
        dispatcher.registry().resolve(id).encode(fields, &mut out).unwrap();
        let format = if SentenceId::from_id(id).is_some() {
            WireFormat::Nmea
        } else {
            WireFormat::Binary
        };
        let mut frame = ReceivedFrame::new(format, 256);
        frame.fill(out.as_slice()).unwrap();
        frame
    }

    #[test]
    fn test_decoded_fields_reach_every_sink_in_one_batch() {
        let dispatcher = Dispatcher::with_standard_codecs();
        let first = Arc::new(RecordingSink::new());
        let second = Arc::new(RecordingSink::new());
        dispatcher.add_sink(first.clone());
        dispatcher.add_sink(second.clone());

        let id = BinaryMessageType::ComputedPosition.id();
        let mut frame = frame_for(&dispatcher, id, &NavFields::manual());
        let outcome = dispatcher.dispatch(&mut frame);

        assert!(matches!(outcome, DispatchOutcome::Decoded { message_id: 1, .. }));
        for sink in [&first, &second] {
            assert_eq!(sink.batch_count(), 1);
            assert_eq!(sink.event_count(), 4);
        }
        let stats = dispatcher.stats();
        assert_eq!(stats.frames_decoded, 1);
        assert_eq!(stats.sink_updates, 2);
    }

    #[test]
    fn test_short_frame_issues_no_sink_updates() {
        let dispatcher = Dispatcher::with_standard_codecs();
        let sink = Arc::new(RecordingSink::new());
        dispatcher.add_sink(sink.clone());

        let mut frame = ReceivedFrame::new(WireFormat::Binary, 64);
        frame.fill(&[0, 0, 0, 1, 0, 0, 0, 48, 1, 2, 3]).unwrap();
        let outcome = dispatcher.dispatch(&mut frame);

        assert_eq!(outcome, DispatchOutcome::Diagnostic { message_id: 1 });
        assert_eq!(sink.event_count(), 0);
        assert!(frame.decoded_text().starts_with("0000  00 00 00 01"));
    }

    #[test]
    fn test_unknown_id_is_unrecognized() {
        let dispatcher = Dispatcher::with_standard_codecs();
        let sink = Arc::new(RecordingSink::new());
        dispatcher.add_sink(sink.clone());

        let mut frame = ReceivedFrame::new(WireFormat::Binary, 64);
        frame.fill(&[0, 0, 0, 9, 0, 0, 0, 0]).unwrap();
        let outcome = dispatcher.dispatch(&mut frame);

        assert_eq!(outcome, DispatchOutcome::Unrecognized { message_id: 9 });
        assert!(frame.notes().contains("unrecognized message type"));
        assert_eq!(sink.event_count(), 0);
        assert_eq!(dispatcher.stats().unrecognized, 1);
    }

    #[test]
    fn test_binary_id_in_sentence_range_goes_to_default_codec() {
        let dispatcher = Dispatcher::with_standard_codecs();
        let mut frame = ReceivedFrame::new(WireFormat::Binary, 64);
        frame.fill(&[0x00, b'G', b'G', b'A', 0, 0, 0, 0]).unwrap();
        let outcome = dispatcher.dispatch(&mut frame);

        assert_eq!(
            outcome,
            DispatchOutcome::Unrecognized {
                message_id: SentenceId::GGA.id()
            }
        );
        assert!(frame.notes().starts_with("unrecognized message type"));
        assert_eq!(dispatcher.stats().diagnostics, 0);
    }

    #[test]
    fn test_no_fix_sentence_is_decoded_not_diagnostic() {
        let dispatcher = Dispatcher::with_standard_codecs();
        let sink = Arc::new(RecordingSink::new());
        dispatcher.add_sink(sink.clone());

        let mut frame = ReceivedFrame::new(WireFormat::Nmea, 128);
        frame.fill(b"$GPGGA,123519,,,,,0,00,,,M,,M,,*6B").unwrap();
        let outcome = dispatcher.dispatch(&mut frame);

        assert!(matches!(
            outcome,
            DispatchOutcome::Decoded { update, .. } if update.is_empty()
        ));
        assert!(frame.notes().contains("no fix"));
        assert!(!frame.is_failed());
        assert_eq!(sink.batch_count(), 0);
        let stats = dispatcher.stats();
        assert_eq!(stats.frames_decoded, 1);
        assert_eq!(stats.diagnostics, 0);
    }

    #[test]
    fn test_bad_checksum_is_rejected_with_dump() {
        let dispatcher = Dispatcher::with_standard_codecs();
        let mut frame = ReceivedFrame::new(WireFormat::Nmea, 64);
        frame.fill(b"$SDDPT,12.0,0.5,*00").unwrap();

        assert_eq!(dispatcher.dispatch(&mut frame), DispatchOutcome::Rejected);
        assert!(frame.notes().starts_with("framing: Checksum mismatch"));
        assert!(frame.decoded_text().starts_with("0000  24 53 44"));
    }

    #[test]
    fn test_removed_sink_stops_receiving() {
        let dispatcher = Dispatcher::with_standard_codecs();
        let sink = Arc::new(RecordingSink::new());
        let id = dispatcher.add_sink(sink.clone());
        assert!(dispatcher.remove_sink(id));
        assert!(!dispatcher.remove_sink(id));

        let mut frame = frame_for(&dispatcher, SentenceId::HDT.id(), &NavFields::manual());
        dispatcher.dispatch(&mut frame);
        assert_eq!(sink.batch_count(), 0);
    }

    #[test]
    fn test_transmit_requires_selection() {
        let dispatcher = Dispatcher::with_standard_codecs();
        assert!(dispatcher.transmit().is_err());
        assert!(dispatcher.select_outbound(0xFFFF).is_err());
        assert_eq!(dispatcher.selected_outbound(), None);
    }

    #[test]
    fn test_transmit_pushes_payload_to_every_listener() {
        let dispatcher = Dispatcher::with_standard_codecs();
        let good = CapturingListener::new(false);
        let bad = CapturingListener::new(true);
        dispatcher.add_transmit_listener(good.clone());
        let bad_id = dispatcher.add_transmit_listener(bad);

        dispatcher
            .select_outbound(BinaryMessageType::ComputedPosition.id())
            .unwrap();
        dispatcher.set_data_source(EncodeMode::Manual);
        let statuses = dispatcher.transmit().unwrap();

        assert_eq!(statuses.len(), 2);
        assert!(statuses[0].is_ok());
        assert!(!statuses[1].is_ok());
        assert_eq!(statuses[1].message, "Send error: link down");

        let payloads = good.payloads.lock();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].len(), 56);
        assert_eq!(&payloads[0][8..16], &45.0f64.to_be_bytes());
        drop(payloads);

        assert!(dispatcher.remove_transmit_listener(bad_id));
        assert_eq!(dispatcher.transmit_listener_count(), 1);
    }

    #[test]
    fn test_live_source_feeds_transmit() {
        let dispatcher = Dispatcher::with_standard_codecs();
        let capture = CapturingListener::new(false);
        dispatcher.add_transmit_listener(capture.clone());

        let live = NavFields {
            true_heading: 271.5,
            ..NavFields::manual()
        };
        dispatcher.set_live_fields(live);
        dispatcher.set_data_source(EncodeMode::Live);
        dispatcher.select_outbound(SentenceId::HDT.id()).unwrap();
        dispatcher.transmit().unwrap();

        let payloads = capture.payloads.lock();
        assert!(payloads[0].starts_with(b"$HEHDT,271.500,T*"));
    }

    /// Reads dispatcher state from inside `transmit`
    struct InspectingListener {
        dispatcher: Mutex<Weak<Dispatcher>>,
        seen: Mutex<Option<EncodeMode>>,
    }

    impl TransmitListener for InspectingListener {
        fn name(&self) -> &str {
            "inspect"
        }

        fn transmit(&self, payload: &[u8]) -> TransportStatus {
            if let Some(dispatcher) = self.dispatcher.lock().upgrade() {
                *self.seen.lock() = Some(dispatcher.data_source());
            }
            TransportStatus::success(format!("{} bytes", payload.len()))
        }
    }

    #[test]
    fn test_listeners_send_without_outbound_lock() {
        let dispatcher = Arc::new(Dispatcher::with_standard_codecs());
        let listener = Arc::new(InspectingListener {
            dispatcher: Mutex::new(Arc::downgrade(&dispatcher)),
            seen: Mutex::new(None),
        });
        dispatcher.add_transmit_listener(listener.clone());
        dispatcher.set_data_source(EncodeMode::Random);
        dispatcher.select_outbound(SentenceId::DPT.id()).unwrap();

        let statuses = dispatcher.transmit().unwrap();
        assert!(statuses[0].is_ok());
        assert_eq!(*listener.seen.lock(), Some(EncodeMode::Random));

        let statuses = dispatcher
            .transmit_message(SentenceId::HDT.id(), &NavFields::manual())
            .unwrap();
        assert!(statuses[0].is_ok());
    }
}
