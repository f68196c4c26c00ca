//! Channel sink contract
//!
//! A sink is the narrow interface through which decoded fields leave the pipeline
//! (display channels, telemetry forwarders). Calls are fire-and-forget and must not block
//! meaningfully; any buffering is the sink's own business.

use crate::navigation::NavUpdate;
use parking_lot::Mutex;

/// Consumer of decoded navigation fields
pub trait ChannelSink: Send + Sync {
    fn update_position(&self, latitude: f64, longitude: f64);

    fn update_course_through_water(&self, value: f64);

    fn update_course_over_ground(&self, value: f64);

    fn update_speed_over_ground(&self, value: f64);

    fn update_depth(&self, value: f64);

    fn update_heading(&self, _value: f64) {}

    fn update_speed_through_water(&self, _value: f64) {}

    /// Apply every field of one frame
    ///
    /// The dispatcher only ever calls this method. Sinks that must never expose a
    /// half-applied frame override it and apply the update under a single lock.
    fn update_batch(&self, update: &NavUpdate) {
        fan_out(self, update);
    }
}

/// Apply each populated field of `update` through the sink's per-field methods
pub fn fan_out<S: ChannelSink + ?Sized>(sink: &S, update: &NavUpdate) {
    if let Some(position) = update.position {
        sink.update_position(position.latitude, position.longitude);
    }
    if let Some(value) = update.true_heading {
        sink.update_heading(value);
    }
    if let Some(value) = update.course_over_ground {
        sink.update_course_over_ground(value);
    }
    if let Some(value) = update.speed_over_ground {
        sink.update_speed_over_ground(value);
    }
    if let Some(value) = update.course_through_water {
        sink.update_course_through_water(value);
    }
    if let Some(value) = update.speed_through_water {
        sink.update_speed_through_water(value);
    }
    if let Some(value) = update.depth {
        sink.update_depth(value);
    }
}

/// Individual field update observed by a [`RecordingSink`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SinkEvent {
    Position { latitude: f64, longitude: f64 },
    Heading(f64),
    CourseOverGround(f64),
    SpeedOverGround(f64),
    CourseThroughWater(f64),
    SpeedThroughWater(f64),
    Depth(f64),
}

/// Sink that records every batch it receives
///
/// Used by tests and diagnostics tooling to observe exactly what the dispatcher emitted.
#[derive(Debug, Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<NavUpdate>>,
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<NavUpdate> {
        self.batches.lock().clone()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().len()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }

    pub fn last_batch(&self) -> Option<NavUpdate> {
        self.batches.lock().last().copied()
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().push(event);
    }
}

impl ChannelSink for RecordingSink {
    fn update_position(&self, latitude: f64, longitude: f64) {
        self.push(SinkEvent::Position {
            latitude,
            longitude,
        });
    }

    fn update_course_through_water(&self, value: f64) {
        self.push(SinkEvent::CourseThroughWater(value));
    }

    fn update_course_over_ground(&self, value: f64) {
        self.push(SinkEvent::CourseOverGround(value));
    }

    fn update_speed_over_ground(&self, value: f64) {
        self.push(SinkEvent::SpeedOverGround(value));
    }

    fn update_depth(&self, value: f64) {
        self.push(SinkEvent::Depth(value));
    }

    fn update_heading(&self, value: f64) {
        self.push(SinkEvent::Heading(value));
    }

    fn update_speed_through_water(&self, value: f64) {
        self.push(SinkEvent::SpeedThroughWater(value));
    }

    fn update_batch(&self, update: &NavUpdate) {
        // Hold the batch lock across the per-field calls so readers see whole frames
        let mut batches = self.batches.lock();
        batches.push(*update);
        fan_out(self, update);
    }
}
