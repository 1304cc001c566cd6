use serde::{Deserialize, Serialize};

/// A single GPS fix captured during a tracked trip.
///
/// Samples are `Copy` and never mutated after construction; filtering and
/// detection build new sequences out of the same values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub latitude: f64,
    pub longitude: f64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Meters above sea level.
    pub altitude: Option<f64>,
    /// Radius of the 68% confidence circle, meters. `None` means unknown.
    pub accuracy: Option<f64>,
    /// Sensor-reported speed, m/s. `None` means unknown.
    pub speed: Option<f64>,
}

impl Sample {
    pub fn new(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Sample {
            latitude,
            longitude,
            timestamp,
            altitude: None,
            accuracy: None,
            speed: None,
        }
    }

    pub fn with_altitude(self, altitude: f64) -> Self {
        Sample {
            altitude: Some(altitude),
            ..self
        }
    }

    pub fn with_accuracy(self, accuracy: f64) -> Self {
        Sample {
            accuracy: Some(accuracy),
            ..self
        }
    }

    pub fn with_speed(self, speed_ms: f64) -> Self {
        Sample {
            speed: Some(speed_ms),
            ..self
        }
    }

    /// Reported speed in km/h, absent speed counts as standing still.
    pub fn speed_kmh(&self) -> f64 {
        self.speed.map(crate::location_utils::ms_to_kmh).unwrap_or(0.0)
    }
}

impl From<&Sample> for geo::Point<f64> {
    fn from(sample: &Sample) -> Self {
        geo::point!(x: sample.longitude, y: sample.latitude)
    }
}
