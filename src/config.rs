/// Vehicle profile table and threshold overrides
///
/// Profiles come from a CSV file when one is available, with the built-in
/// table as fallback. Rows in the file replace the built-in row for the same
/// vehicle.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::Reader;
use log::{info, warn};
use serde::Deserialize;

use crate::error::{Result, RouteError};
use crate::outlier_filter::OutlierFilterConfig;
use crate::pause_detector::PauseDetectorConfig;
use crate::vehicle::{VehicleProfile, VehicleType};

pub const DEFAULT_PROFILES_FILE: &str = "vehicle_profiles.csv";

#[derive(Debug, Deserialize)]
struct ProfileRecord {
    vehicle: String,
    max_speed_kmh: f64,
    min_speed_kmh: f64,
    min_pause_duration_ms: i64,
    pause_radius_m: f64,
}

impl ProfileRecord {
    fn into_profile(self) -> Result<VehicleProfile> {
        let profile = VehicleProfile {
            vehicle: self.vehicle.parse()?,
            max_speed_kmh: self.max_speed_kmh,
            min_speed_kmh: self.min_speed_kmh,
            min_pause_duration_ms: self.min_pause_duration_ms,
            pause_radius_m: self.pause_radius_m,
        };
        profile.validate()?;
        Ok(profile)
    }
}

#[derive(Debug, Clone)]
pub struct ProfileTable {
    profiles: HashMap<VehicleType, VehicleProfile>,
}

impl ProfileTable {
    pub fn builtin() -> Self {
        let profiles = VehicleType::ALL
            .iter()
            .map(|&vehicle| (vehicle, VehicleProfile::builtin(vehicle)))
            .collect();
        ProfileTable { profiles }
    }

    /// Built-in table overlaid with the rows of a CSV document.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut table = ProfileTable::builtin();
        let mut rdr = Reader::from_reader(reader);

        for record in rdr.deserialize::<ProfileRecord>() {
            let profile = record?.into_profile()?;
            table.profiles.insert(profile.vehicle, profile);
        }

        Ok(table)
    }

    /// Explicit path first, then `vehicle_profiles.csv` in the working
    /// directory, then the built-in table.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!("Loading vehicle profiles from {}", path.display());
            return ProfileTable::from_reader(File::open(path)?);
        }

        let fallback = PathBuf::from(DEFAULT_PROFILES_FILE);
        if fallback.exists() {
            info!("Loading vehicle profiles from {}", fallback.display());
            return ProfileTable::from_reader(File::open(&fallback)?);
        }

        warn!("No vehicle profile file found, using built-in profiles");
        Ok(ProfileTable::builtin())
    }

    pub fn get(&self, vehicle: VehicleType) -> VehicleProfile {
        self.profiles
            .get(&vehicle)
            .copied()
            .unwrap_or_else(|| VehicleProfile::builtin(vehicle))
    }
}

/// Per-threshold overrides layered over the defaults and the vehicle profile.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThresholdOverrides {
    pub max_accuracy_m: Option<f64>,
    pub max_distance_m: Option<f64>,
    pub max_acceleration_kmh: Option<f64>,
    pub min_pause_duration_ms: Option<i64>,
    pub pause_radius_m: Option<f64>,
    pub pause_speed_threshold_kmh: Option<f64>,
}

impl ThresholdOverrides {
    pub fn outlier_config(&self) -> OutlierFilterConfig {
        let defaults = OutlierFilterConfig::default();
        OutlierFilterConfig {
            max_accuracy_m: self.max_accuracy_m.unwrap_or(defaults.max_accuracy_m),
            max_distance_m: self.max_distance_m.unwrap_or(defaults.max_distance_m),
            max_acceleration_kmh: self
                .max_acceleration_kmh
                .unwrap_or(defaults.max_acceleration_kmh),
            ..defaults
        }
    }

    pub fn pause_config(&self, profile: &VehicleProfile) -> PauseDetectorConfig {
        let base = PauseDetectorConfig::from_profile(profile);
        PauseDetectorConfig {
            min_duration_ms: self.min_pause_duration_ms.unwrap_or(base.min_duration_ms),
            radius_m: self.pause_radius_m.unwrap_or(base.radius_m),
            speed_threshold_kmh: self
                .pause_speed_threshold_kmh
                .unwrap_or(base.speed_threshold_kmh),
            ..base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_every_vehicle() {
        let table = ProfileTable::builtin();
        for vehicle in VehicleType::ALL {
            assert_eq!(table.get(vehicle), VehicleProfile::builtin(vehicle));
        }
    }

    #[test]
    fn test_csv_rows_override_builtin() {
        let csv = "vehicle,max_speed_kmh,min_speed_kmh,min_pause_duration_ms,pause_radius_m\n\
                   scooter,25,2,8000,10\n\
                   E-Bike,32,5,20000,25\n";
        let table = ProfileTable::from_reader(csv.as_bytes()).unwrap();

        let scooter = table.get(VehicleType::Scooter);
        assert_eq!(scooter.max_speed_kmh, 25.0);
        assert_eq!(scooter.min_pause_duration_ms, 8_000);

        let ebike = table.get(VehicleType::EBike);
        assert_eq!(ebike.pause_radius_m, 25.0);

        // Untouched rows stay built-in
        assert_eq!(table.get(VehicleType::Bike), VehicleProfile::builtin(VehicleType::Bike));
    }

    #[test]
    fn test_csv_unknown_vehicle() {
        let csv = "vehicle,max_speed_kmh,min_speed_kmh,min_pause_duration_ms,pause_radius_m\n\
                   hoverboard,20,2,8000,10\n";
        let result = ProfileTable::from_reader(csv.as_bytes());
        assert!(matches!(result, Err(RouteError::UnknownVehicle(_))));
    }

    #[test]
    fn test_csv_invalid_thresholds() {
        let csv = "vehicle,max_speed_kmh,min_speed_kmh,min_pause_duration_ms,pause_radius_m\n\
                   bike,20,2,0,10\n";
        let result = ProfileTable::from_reader(csv.as_bytes());
        assert!(matches!(result, Err(RouteError::InvalidProfile(_))));
    }

    #[test]
    fn test_csv_malformed_number() {
        let csv = "vehicle,max_speed_kmh,min_speed_kmh,min_pause_duration_ms,pause_radius_m\n\
                   bike,fast,2,8000,10\n";
        let result = ProfileTable::from_reader(csv.as_bytes());
        assert!(matches!(result, Err(RouteError::Csv(_))));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = ProfileTable::load(Some(Path::new("/definitely/not/here.csv")));
        assert!(matches!(result, Err(RouteError::Io(_))));
    }

    #[test]
    fn test_overrides() {
        let profile = VehicleProfile::builtin(VehicleType::Bike);
        let overrides = ThresholdOverrides {
            max_accuracy_m: Some(40.0),
            pause_radius_m: Some(30.0),
            ..ThresholdOverrides::default()
        };

        let outlier = overrides.outlier_config();
        assert_eq!(outlier.max_accuracy_m, 40.0);
        assert_eq!(outlier.max_distance_m, OutlierFilterConfig::default().max_distance_m);

        let pause = overrides.pause_config(&profile);
        assert_eq!(pause.radius_m, 30.0);
        assert_eq!(pause.min_duration_ms, profile.min_pause_duration_ms);
        assert_eq!(pause.speed_threshold_kmh, profile.min_speed_kmh);
    }

    #[test]
    fn test_no_overrides_matches_defaults() {
        let profile = VehicleProfile::default();
        let overrides = ThresholdOverrides::default();
        assert_eq!(overrides.outlier_config(), OutlierFilterConfig::default());
        assert_eq!(overrides.pause_config(&profile), PauseDetectorConfig::from_profile(&profile));
    }
}
