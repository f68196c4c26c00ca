//! Navigation field values
//!
//! Angles are degrees (true), speeds are knots, depths are metres.

use serde::{Deserialize, Serialize};

/// Geographic position in decimal degrees (north/east positive)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Complete set of outgoing field values
///
/// Supplied by a data source (simulation, manual test vector or random test vector)
/// and consumed by codecs when encoding. Each codec picks the fields its layout carries.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NavFields {
    pub latitude: f64,
    pub longitude: f64,
    pub true_heading: f64,
    pub course_over_ground: f64,
    pub speed_over_ground: f64,
    pub course_through_water: f64,
    pub speed_through_water: f64,
    pub depth: f64,
    pub transducer_offset: f64,
}

impl NavFields {
    /// Fixed test vector used for manual-entry style transmission
    pub const fn manual() -> Self {
        Self {
            latitude: 45.0,
            longitude: -110.0,
            true_heading: 129.0,
            course_over_ground: 132.0,
            speed_over_ground: 12.0,
            course_through_water: 130.0,
            speed_through_water: 11.5,
            depth: 42.5,
            transducer_offset: 0.5,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.latitude, self.longitude)
    }
}

/// Sparse set of fields extracted from one received frame
///
/// Only the fields present in the decoded message are `Some`. An empty update means
/// the frame carried nothing for the sinks (diagnostic dump, heartbeat, unknown type).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NavUpdate {
    pub position: Option<Position>,
    pub true_heading: Option<f64>,
    pub course_over_ground: Option<f64>,
    pub speed_over_ground: Option<f64>,
    pub course_through_water: Option<f64>,
    pub speed_through_water: Option<f64>,
    pub depth: Option<f64>,
}

impl NavUpdate {
    /// Update carrying no fields
    pub const fn empty() -> Self {
        Self {
            position: None,
            true_heading: None,
            course_over_ground: None,
            speed_over_ground: None,
            course_through_water: None,
            speed_through_water: None,
            depth: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.field_count() == 0
    }

    /// Number of populated fields (a position counts once)
    pub fn field_count(&self) -> usize {
        [
            self.position.is_some(),
            self.true_heading.is_some(),
            self.course_over_ground.is_some(),
            self.speed_over_ground.is_some(),
            self.course_through_water.is_some(),
            self.speed_through_water.is_some(),
            self.depth.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }

    /// True when every populated field matches `fields` within `tolerance`
    pub fn matches(&self, fields: &NavFields, tolerance: f64) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() <= tolerance;
        let check = |value: Option<f64>, expected: f64| value.map_or(true, |v| close(v, expected));

        self.position.map_or(true, |p| {
            close(p.latitude, fields.latitude) && close(p.longitude, fields.longitude)
        }) && check(self.true_heading, fields.true_heading)
            && check(self.course_over_ground, fields.course_over_ground)
            && check(self.speed_over_ground, fields.speed_over_ground)
            && check(self.course_through_water, fields.course_through_water)
            && check(self.speed_through_water, fields.speed_through_water)
            && check(self.depth, fields.depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_update() {
        let update = NavUpdate::empty();
        assert!(update.is_empty());
        assert_eq!(update, NavUpdate::default());
    }

    #[test]
    fn test_field_count_counts_position_once() {
        let update = NavUpdate {
            position: Some(Position::new(1.0, 2.0)),
            depth: Some(10.0),
            ..NavUpdate::default()
        };
        assert_eq!(update.field_count(), 2);
        assert!(!update.is_empty());
    }

    #[test]
    fn test_matches_with_tolerance() {
        let fields = NavFields::manual();
        let update = NavUpdate {
            position: Some(Position::new(45.000_000_1, -110.0)),
            true_heading: Some(129.0),
            ..NavUpdate::default()
        };
        assert!(update.matches(&fields, 1e-6));

        let off = NavUpdate {
            speed_over_ground: Some(13.0),
            ..NavUpdate::default()
        };
        assert!(!off.matches(&fields, 1e-6));
    }

    #[test]
    fn test_update_serializes_to_json() {
        let update = NavUpdate {
            depth: Some(12.5),
            ..NavUpdate::default()
        };
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("\"depth\":12.5"));
    }
}
