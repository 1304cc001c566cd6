/// Location utilities - geometric and kinematic primitives shared by the
/// outlier filter, the pause detector and route reporting.
///
/// Distances are kilometers unless a name says otherwise, speeds are km/h.

use crate::sample::Sample;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

pub const DEFAULT_MIN_POINT_DISTANCE_M: f64 = 5.0;
pub const DEFAULT_MAX_POINT_ACCURACY_M: f64 = 50.0;
pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.2;
pub const DEFAULT_LOW_SPEED_THRESHOLD_KMH: f64 = 3.0;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Great-circle distance between two lat/lon pairs in kilometers.
pub fn calculate_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1.0 for antipodal points
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());

    EARTH_RADIUS_KM * c
}

pub fn distance_between(a: &Sample, b: &Sample) -> f64 {
    calculate_distance(a.latitude, a.longitude, b.latitude, b.longitude)
}

pub fn distance_between_m(a: &Sample, b: &Sample) -> f64 {
    distance_between(a, b) * 1000.0
}

/// Sum of consecutive pairwise distances, kilometers.
pub fn total_distance(samples: &[Sample]) -> f64 {
    samples
        .windows(2)
        .map(|w| distance_between(&w[0], &w[1]))
        .sum()
}

/// Speed implied by moving from `from` to `to`, km/h. Zero when no time passed.
pub fn derived_speed_kmh(from: &Sample, to: &Sample) -> f64 {
    let elapsed_ms = to.timestamp - from.timestamp;
    if elapsed_ms <= 0 {
        return 0.0;
    }
    distance_between(from, to) / (elapsed_ms as f64 / MS_PER_HOUR)
}

/// Fills in missing `speed` fields from position/time against the previous
/// sample. Reported speeds are kept as-is; the first sample has nothing to
/// derive from and keeps whatever it had.
pub fn with_derived_speeds(samples: &[Sample]) -> Vec<Sample> {
    let mut result = Vec::with_capacity(samples.len());

    for (i, sample) in samples.iter().enumerate() {
        match (sample.speed, i.checked_sub(1)) {
            (None, Some(prev)) => {
                let speed_ms = kmh_to_ms(derived_speed_kmh(&samples[prev], sample));
                result.push(sample.with_speed(speed_ms));
            }
            _ => result.push(*sample),
        }
    }

    result
}

pub fn average_speed(distance_km: f64, duration_ms: i64) -> f64 {
    if duration_ms <= 0 {
        return 0.0;
    }
    distance_km / (duration_ms as f64 / MS_PER_HOUR)
}

/// Highest speed carried by the samples, km/h. Zero when none has one.
pub fn max_speed(samples: &[Sample]) -> f64 {
    samples
        .iter()
        .filter_map(|s| s.speed)
        .map(ms_to_kmh)
        .fold(0.0, f64::max)
}

pub fn ms_to_kmh(speed_ms: f64) -> f64 {
    speed_ms * 3.6
}

pub fn kmh_to_ms(speed_kmh: f64) -> f64 {
    speed_kmh / 3.6
}

/// Clamps speeds under `threshold_kmh` to exactly zero.
pub fn suppress_low_speed(speed_kmh: f64, threshold_kmh: f64) -> f64 {
    if speed_kmh < threshold_kmh {
        0.0
    } else {
        speed_kmh
    }
}

/// Point thinning, independent of the outlier filter: drops fixes that barely
/// moved from the last kept fix, or whose accuracy is too poor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointFilter {
    pub min_distance_m: f64,
    pub max_accuracy_m: f64,
}

impl Default for PointFilter {
    fn default() -> Self {
        PointFilter {
            min_distance_m: DEFAULT_MIN_POINT_DISTANCE_M,
            max_accuracy_m: DEFAULT_MAX_POINT_ACCURACY_M,
        }
    }
}

impl PointFilter {
    pub fn apply(&self, samples: &[Sample]) -> Vec<Sample> {
        let Some((first, rest)) = samples.split_first() else {
            return Vec::new();
        };

        let mut kept = vec![*first];
        for sample in rest {
            if sample.accuracy.is_some_and(|acc| acc > self.max_accuracy_m) {
                continue;
            }
            // `kept` always holds the first sample
            let last = kept[kept.len() - 1];
            if distance_between_m(&last, sample) < self.min_distance_m {
                continue;
            }
            kept.push(*sample);
        }

        kept
    }
}

/// Exponential moving average over a stream of speeds.
#[derive(Debug, Clone)]
pub struct SpeedSmoother {
    alpha: f64,
    average: Option<f64>,
}

impl SpeedSmoother {
    /// `alpha` is clamped into `[0, 1]`.
    pub fn new(alpha: f64) -> Self {
        SpeedSmoother {
            alpha: alpha.clamp(0.0, 1.0),
            average: None,
        }
    }

    pub fn smooth(&mut self, value: f64) -> f64 {
        let next = match self.average {
            None => value,
            Some(previous) => self.alpha * value + (1.0 - self.alpha) * previous,
        };
        self.average = Some(next);
        next
    }

    pub fn current(&self) -> Option<f64> {
        self.average
    }

    pub fn reset(&mut self) {
        self.average = None;
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Default for SpeedSmoother {
    fn default() -> Self {
        SpeedSmoother::new(DEFAULT_SMOOTHING_ALPHA)
    }
}

/// Reported speeds run through a fresh smoother and low-speed suppression,
/// one value per sample, km/h.
pub fn smoothed_speeds(samples: &[Sample], alpha: f64, low_speed_threshold_kmh: f64) -> Vec<f64> {
    let mut smoother = SpeedSmoother::new(alpha);
    samples
        .iter()
        .map(|s| suppress_low_speed(smoother.smooth(s.speed_kmh()), low_speed_threshold_kmh))
        .collect()
}

pub fn format_distance(distance_km: f64) -> String {
    if distance_km < 1.0 {
        format!("{:.0} m", distance_km * 1000.0)
    } else {
        format!("{:.2} km", distance_km)
    }
}

pub fn format_speed(speed_kmh: f64) -> String {
    format!("{:.1} km/h", speed_kmh)
}

pub fn format_duration(duration_ms: i64) -> String {
    let total_seconds = duration_ms.max(0) / 1000;
    format!(
        "{}:{:02}:{:02}",
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60
    )
}
