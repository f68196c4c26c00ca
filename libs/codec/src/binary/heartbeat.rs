use super::BinaryLayout;
use crate::error::ProtocolResult;
use crate::wire::{FieldReader, FieldWriter};
use nav_types::{BinaryMessageType, NavFields, NavUpdate};
use std::fmt::Write;
use std::sync::atomic::{AtomicI32, Ordering};

const COUNTER: usize = 8;
const STATUS: usize = 12;
const STATION_NAME: usize = 16;
const STATION_NAME_WIDTH: usize = 32;

const STATUS_OK: i32 = 0;

/// Station liveness (type 4, 48 bytes); carries no navigation fields
#[derive(Debug)]
pub struct HeartbeatLayout {
    station: String,
    counter: AtomicI32,
}

impl HeartbeatLayout {
    pub fn new(station: impl Into<String>) -> Self {
        Self {
            station: station.into(),
            counter: AtomicI32::new(0),
        }
    }
}

impl Default for HeartbeatLayout {
    fn default() -> Self {
        Self::new("nav-receiver")
    }
}

impl BinaryLayout for HeartbeatLayout {
    const MESSAGE_TYPE: BinaryMessageType = BinaryMessageType::Heartbeat;
    const WIRE_LENGTH: usize = 48;

    fn read_fields(&self, reader: &FieldReader<'_>, text: &mut String) -> ProtocolResult<NavUpdate> {
        let counter = reader.i32_at(COUNTER, "counter")?;
        let status = reader.i32_at(STATUS, "status")?;
        let station = reader.str_at(STATION_NAME, STATION_NAME_WIDTH, "station name")?;

        let _ = write!(
            text,
            "Heartbeat station={station:?} counter={counter} status={status}"
        );
        Ok(NavUpdate::empty())
    }

    fn write_fields(&self, _fields: &NavFields, writer: &mut FieldWriter<'_>) -> ProtocolResult<()> {
        let counter = self.counter.fetch_add(1, Ordering::Relaxed);
        writer.i32_at(COUNTER, counter)?;
        writer.i32_at(STATUS, STATUS_OK)?;
        writer.str_at(STATION_NAME, STATION_NAME_WIDTH, &self.station)
    }
}
