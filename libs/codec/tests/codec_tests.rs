//! # Codec Integration Tests
//!
//! Exercises the public API the way the network layer uses it: encode into a
//! [`RawBuffer`], fill a [`ReceivedFrame`], identify through the registry, resolve and
//! decode.

use nav_codec::{
    CodecRegistry, EncodeMode, FieldSource, ProtocolError, RawBuffer, ReceivedFrame, WireFormat,
};
use nav_types::{BinaryMessageType, NavFields, SentenceId};
use proptest::prelude::*;

const TOLERANCE: f64 = 1e-3;

fn format_of(id: u32) -> WireFormat {
    if SentenceId::from_id(id).is_some() {
        WireFormat::Nmea
    } else {
        WireFormat::Binary
    }
}

/// Encode `fields` with codec `id` and decode the result as a receive slot would
fn round_trip(registry: &CodecRegistry, id: u32, fields: &NavFields) -> ReceivedFrame {
    let mut out = RawBuffer::with_capacity(256);
    registry.resolve(id).encode(fields, &mut out).unwrap();

    let mut frame = ReceivedFrame::new(format_of(id), 256);
    frame.fill(out.as_slice()).unwrap();
    assert_eq!(registry.identify(&mut frame).unwrap(), id);
    frame
}

#[test]
fn test_computed_position_manual_vector_round_trip() {
    let registry = CodecRegistry::standard();
    let id = BinaryMessageType::ComputedPosition.id();
    let fields = NavFields::manual();
    let mut frame = round_trip(&registry, id, &fields);

    let update = registry.resolve(id).decode(&mut frame);
    let position = update.position.unwrap();
    assert_eq!(position.latitude, 45.0);
    assert_eq!(position.longitude, -110.0);
    assert_eq!(update.true_heading, Some(129.0));
    assert_eq!(update.course_over_ground, Some(132.0));
    assert_eq!(update.speed_over_ground, Some(12.0));
    assert!(!frame.has_notes(), "unexpected notes: {}", frame.notes());
    assert!(frame.decoded_text().starts_with("ComputedPosition"));
}

#[test]
fn test_every_codec_round_trips_the_manual_vector() {
    let registry = CodecRegistry::standard();
    let fields = NavFields::manual();
    for id in registry.ids() {
        let mut frame = round_trip(&registry, id, &fields);
        let update = registry.resolve(id).decode(&mut frame);
        assert!(update.matches(&fields, TOLERANCE), "{id:#x}: {update:?}");
        assert!(!frame.has_notes(), "{id:#x}: {}", frame.notes());
    }
}

#[test]
fn test_short_binary_frame_dumps_without_update() {
    let registry = CodecRegistry::standard();
    let mut frame = ReceivedFrame::new(WireFormat::Binary, 64);
    frame.fill(&[0, 0, 0, 2, 0, 0, 0, 16, 0x41, 0x20]).unwrap();

    let id = registry.identify(&mut frame).unwrap();
    let update = registry.resolve(id).decode(&mut frame);
    assert!(update.is_empty());
    assert!(frame.notes().contains("WaterReferencedMotion: frame too short"));
    assert!(frame
        .decoded_text()
        .starts_with("0000  00 00 00 02 00 00 00 10 41 20"));
}

#[test]
fn test_unregistered_id_reports_unrecognized() {
    let registry = CodecRegistry::standard();
    let mut frame = ReceivedFrame::new(WireFormat::Binary, 64);
    frame.fill(&[0, 0, 0, 0x2A, 0, 0, 0, 0]).unwrap();

    let id = registry.identify(&mut frame).unwrap();
    assert!(!registry.contains(id));
    let update = registry.resolve(id).decode(&mut frame);
    assert!(update.is_empty());
    assert!(frame.notes().starts_with("unrecognized message type 0x0000002a"));
}

#[test]
fn test_unregistered_sentence_reports_unrecognized() {
    let registry = CodecRegistry::standard();
    let mut frame = ReceivedFrame::new(WireFormat::Nmea, 128);
    frame.fill(b"$GPGLL,4916.45,N,12311.12,W,225444,A*31\r\n").unwrap();

    let id = registry.identify(&mut frame).unwrap();
    assert_eq!(SentenceId::from_id(id).map(|s| s.to_string()), Some("GLL".into()));
    assert!(registry.resolve(id).decode(&mut frame).is_empty());
    assert!(frame.notes().contains("unrecognized message type"));
}

#[test]
fn test_bad_checksum_fails_identification() {
    let registry = CodecRegistry::standard();
    let mut frame = ReceivedFrame::new(WireFormat::Nmea, 128);
    frame.fill(b"$HEHDT,274.07,T*00\r\n").unwrap();

    let err = registry.identify(&mut frame).unwrap_err();
    assert!(matches!(err, ProtocolError::ChecksumMismatch { .. }));
    assert!(err.is_framing());
}

#[test]
fn test_sentence_with_too_few_fields_dumps_without_update() {
    let registry = CodecRegistry::standard();
    let mut frame = ReceivedFrame::new(WireFormat::Nmea, 128);
    let body = "VWVHW,130.0,T,,M";
    let sentence = format!("${body}*{:02X}\r\n", nav_codec::nmea::checksum(body.as_bytes()));
    frame.fill(sentence.as_bytes()).unwrap();

    let id = registry.identify(&mut frame).unwrap();
    assert_eq!(id, SentenceId::VHW.id());
    assert!(registry.resolve(id).decode(&mut frame).is_empty());
    assert!(frame.notes().contains("VHW carries 4 fields, expected 8..=8"));
    assert!(frame.decoded_text().starts_with("0000  24 56 57 56 48 57"));
}

#[test]
fn test_random_source_feeds_every_codec() {
    let registry = CodecRegistry::standard();
    let mut source = FieldSource::with_seed(EncodeMode::Random, 0x5eed);
    for _ in 0..20 {
        let fields = source.next_fields();
        for id in registry.ids() {
            let mut frame = round_trip(&registry, id, &fields);
            let update = registry.resolve(id).decode(&mut frame);
            assert!(update.matches(&fields, TOLERANCE), "{id:#x}: {update:?}");
        }
    }
}

fn nav_fields() -> impl Strategy<Value = NavFields> {
    (
        (-89.9f64..89.9, -179.9f64..179.9),
        (0.0f64..359.9, 0.0f64..359.9, 0.0f64..60.0),
        (0.0f64..359.9, 0.0f64..60.0),
        (0.0f64..1000.0, 0.0f64..5.0),
    )
        .prop_map(|((lat, lon), (hdg, cog, sog), (ctw, stw), (depth, offset))| NavFields {
            latitude: lat,
            longitude: lon,
            true_heading: hdg,
            course_over_ground: cog,
            speed_over_ground: sog,
            course_through_water: ctw,
            speed_through_water: stw,
            depth,
            transducer_offset: offset,
        })
}

proptest! {
    #[test]
    fn prop_decode_inverts_encode(fields in nav_fields()) {
        let registry = CodecRegistry::standard();
        for id in registry.ids() {
            let mut frame = round_trip(&registry, id, &fields);
            let update = registry.resolve(id).decode(&mut frame);
            prop_assert!(update.matches(&fields, TOLERANCE), "{:#x}: {:?}", id, update);
            prop_assert!(!frame.has_notes(), "{:#x}: {}", id, frame.notes());
        }
    }

    #[test]
    fn prop_truncated_binary_frames_never_update(fields in nav_fields(), cut in 0usize..56) {
        let registry = CodecRegistry::standard();
        let id = BinaryMessageType::ComputedPosition.id();
        let full = round_trip(&registry, id, &fields);

        let mut frame = ReceivedFrame::new(WireFormat::Binary, 64);
        frame.fill(&full.bytes()[..cut]).unwrap();
        let update = match registry.identify(&mut frame) {
            Ok(found) => registry.resolve(found).decode(&mut frame),
            Err(err) => {
                prop_assert!(err.is_framing());
                nav_types::NavUpdate::empty()
            }
        };
        prop_assert!(update.is_empty());
    }
}
