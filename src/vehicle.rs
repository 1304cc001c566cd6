use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RouteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Scooter,
    Bike,
    EBike,
    Unicycle,
}

impl VehicleType {
    pub const ALL: [VehicleType; 4] = [
        VehicleType::Scooter,
        VehicleType::Bike,
        VehicleType::EBike,
        VehicleType::Unicycle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Scooter => "scooter",
            VehicleType::Bike => "bike",
            VehicleType::EBike => "ebike",
            VehicleType::Unicycle => "unicycle",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scooter" | "e-scooter" => Ok(VehicleType::Scooter),
            "bike" | "bicycle" => Ok(VehicleType::Bike),
            "ebike" | "e-bike" => Ok(VehicleType::EBike),
            "unicycle" | "euc" => Ok(VehicleType::Unicycle),
            other => Err(RouteError::UnknownVehicle(other.to_string())),
        }
    }
}

/// Per-vehicle thresholds shared by the outlier filter and pause detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleProfile {
    pub vehicle: VehicleType,
    pub max_speed_kmh: f64,
    pub min_speed_kmh: f64,
    pub min_pause_duration_ms: i64,
    pub pause_radius_m: f64,
}

impl VehicleProfile {
    pub fn builtin(vehicle: VehicleType) -> Self {
        let (max_speed_kmh, min_speed_kmh, min_pause_duration_ms, pause_radius_m) = match vehicle {
            VehicleType::Scooter => (35.0, 3.0, 10_000, 15.0),
            VehicleType::Bike => (50.0, 4.0, 15_000, 20.0),
            VehicleType::EBike => (45.0, 4.0, 15_000, 20.0),
            VehicleType::Unicycle => (40.0, 3.0, 10_000, 15.0),
        };

        VehicleProfile {
            vehicle,
            max_speed_kmh,
            min_speed_kmh,
            min_pause_duration_ms,
            pause_radius_m,
        }
    }

    /// Rejects thresholds that would make either stage meaningless.
    pub fn validate(&self) -> Result<(), RouteError> {
        if self.max_speed_kmh <= 0.0 || self.min_speed_kmh <= 0.0 {
            return Err(RouteError::InvalidProfile(format!(
                "{}: speeds must be positive",
                self.vehicle
            )));
        }
        if self.min_speed_kmh >= self.max_speed_kmh {
            return Err(RouteError::InvalidProfile(format!(
                "{}: min speed {:.1} km/h is not below max speed {:.1} km/h",
                self.vehicle, self.min_speed_kmh, self.max_speed_kmh
            )));
        }
        if self.min_pause_duration_ms <= 0 || self.pause_radius_m <= 0.0 {
            return Err(RouteError::InvalidProfile(format!(
                "{}: pause duration and radius must be positive",
                self.vehicle
            )));
        }
        Ok(())
    }
}

impl Default for VehicleProfile {
    fn default() -> Self {
        VehicleProfile::builtin(VehicleType::Scooter)
    }
}
