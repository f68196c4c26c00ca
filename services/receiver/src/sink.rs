//! Channel sink that logs decoded fields
//!
//! Stands in for a display: each batch is logged once and folded into the latest known
//! state, which the service reports alongside listener metrics.

use nav_types::{ChannelSink, NavUpdate, Position};
use parking_lot::Mutex;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct TracingSink {
    latest: Mutex<NavUpdate>,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent value of every field seen so far
    pub fn latest(&self) -> NavUpdate {
        *self.latest.lock()
    }

    fn merge(&self, update: &NavUpdate) {
        let mut latest = self.latest.lock();
        latest.position = update.position.or(latest.position);
        latest.true_heading = update.true_heading.or(latest.true_heading);
        latest.course_over_ground = update.course_over_ground.or(latest.course_over_ground);
        latest.speed_over_ground = update.speed_over_ground.or(latest.speed_over_ground);
        latest.course_through_water = update.course_through_water.or(latest.course_through_water);
        latest.speed_through_water = update.speed_through_water.or(latest.speed_through_water);
        latest.depth = update.depth.or(latest.depth);
    }
}

impl ChannelSink for TracingSink {
    fn update_position(&self, latitude: f64, longitude: f64) {
        self.merge(&NavUpdate {
            position: Some(Position::new(latitude, longitude)),
            ..NavUpdate::empty()
        });
    }

    fn update_course_through_water(&self, value: f64) {
        self.merge(&NavUpdate {
            course_through_water: Some(value),
            ..NavUpdate::empty()
        });
    }

    fn update_course_over_ground(&self, value: f64) {
        self.merge(&NavUpdate {
            course_over_ground: Some(value),
            ..NavUpdate::empty()
        });
    }

    fn update_speed_over_ground(&self, value: f64) {
        self.merge(&NavUpdate {
            speed_over_ground: Some(value),
            ..NavUpdate::empty()
        });
    }

    fn update_depth(&self, value: f64) {
        self.merge(&NavUpdate {
            depth: Some(value),
            ..NavUpdate::empty()
        });
    }

    fn update_heading(&self, value: f64) {
        self.merge(&NavUpdate {
            true_heading: Some(value),
            ..NavUpdate::empty()
        });
    }

    fn update_speed_through_water(&self, value: f64) {
        self.merge(&NavUpdate {
            speed_through_water: Some(value),
            ..NavUpdate::empty()
        });
    }

    fn update_batch(&self, update: &NavUpdate) {
        self.merge(update);
        match update.position {
            Some(position) => info!(
                latitude = position.latitude,
                longitude = position.longitude,
                heading = ?update.true_heading,
                cog = ?update.course_over_ground,
                sog = ?update.speed_over_ground,
                "Position update"
            ),
            None => debug!(
                heading = ?update.true_heading,
                cog = ?update.course_over_ground,
                sog = ?update.speed_over_ground,
                ctw = ?update.course_through_water,
                stw = ?update.speed_through_water,
                depth = ?update.depth,
                "Navigation update"
            ),
        }
    }
}
