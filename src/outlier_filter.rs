/// GPS Outlier Filter - drops physically implausible fixes from a recorded route
///
/// Every interior sample is judged against its immediate neighbours. The first
/// and last samples of a route are always kept.

use log::debug;
use serde::Serialize;

use crate::location_utils::{derived_speed_kmh, distance_between_m};
use crate::sample::Sample;
use crate::vehicle::VehicleProfile;

pub const DEFAULT_MAX_ACCURACY_M: f64 = 25.0;
pub const DEFAULT_MAX_DISTANCE_M: f64 = 200.0;
pub const DEFAULT_MAX_ACCELERATION_KMH: f64 = 30.0;
pub const DEFAULT_MIN_INTERVAL_MS: i64 = 100;
pub const DEFAULT_MAX_INTERVAL_MS: i64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierFilterConfig {
    pub max_accuracy_m: f64,
    pub max_distance_m: f64,
    /// Largest allowed jump between speed-in and speed-out, km/h.
    pub max_acceleration_kmh: f64,
    pub min_interval_ms: i64,
    pub max_interval_ms: i64,
    /// Multiplier on the profile's max speed before a reported speed is rejected.
    pub speed_tolerance: f64,
    /// Fraction of the profile's min speed under which slow motion counts as drift.
    pub drift_factor: f64,
}

impl Default for OutlierFilterConfig {
    fn default() -> Self {
        OutlierFilterConfig {
            max_accuracy_m: DEFAULT_MAX_ACCURACY_M,
            max_distance_m: DEFAULT_MAX_DISTANCE_M,
            max_acceleration_kmh: DEFAULT_MAX_ACCELERATION_KMH,
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            max_interval_ms: DEFAULT_MAX_INTERVAL_MS,
            speed_tolerance: 1.5,
            drift_factor: 0.5,
        }
    }
}

/// Why an interior sample was dropped. Checks run in declaration order and
/// the first failing one is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    PoorAccuracy,
    ExcessiveSpeed,
    DistanceJump,
    ImplausibleAcceleration,
    TimeGap,
    StationaryDrift,
}

impl Rejection {
    pub fn label(&self) -> &'static str {
        match self {
            Rejection::PoorAccuracy => "poor accuracy",
            Rejection::ExcessiveSpeed => "excessive speed",
            Rejection::DistanceJump => "distance jump",
            Rejection::ImplausibleAcceleration => "implausible acceleration",
            Rejection::TimeGap => "time gap",
            Rejection::StationaryDrift => "stationary drift",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FilterStats {
    pub original_count: usize,
    pub filtered_count: usize,
    pub removed_count: usize,
    pub removal_percentage: f64,
}

/// One filter per route, parameterised by the vehicle it was recorded on.
#[derive(Debug, Clone)]
pub struct OutlierFilter {
    profile: VehicleProfile,
    config: OutlierFilterConfig,
}

impl OutlierFilter {
    pub fn new(profile: VehicleProfile) -> Self {
        OutlierFilter::with_config(profile, OutlierFilterConfig::default())
    }

    pub fn with_config(profile: VehicleProfile, config: OutlierFilterConfig) -> Self {
        OutlierFilter { profile, config }
    }

    pub fn config(&self) -> &OutlierFilterConfig {
        &self.config
    }

    pub fn filter(&self, samples: &[Sample]) -> Vec<Sample> {
        if samples.len() < 3 {
            return samples.to_vec();
        }

        let last = samples.len() - 1;
        let mut filtered = Vec::with_capacity(samples.len());
        filtered.push(samples[0]);

        for i in 1..last {
            let (prev, current, next) = (&samples[i - 1], &samples[i], &samples[i + 1]);
            match self.classify(prev, current, next) {
                None => filtered.push(*current),
                Some(reason) => debug!(
                    "Dropping sample {} at {} ({:.6}, {:.6}): {}",
                    i,
                    current.timestamp,
                    current.latitude,
                    current.longitude,
                    reason.label()
                ),
            }
        }

        filtered.push(samples[last]);
        filtered
    }

    /// Judges `current` against its raw neighbours; `None` means keep it.
    pub fn classify(&self, prev: &Sample, current: &Sample, next: &Sample) -> Option<Rejection> {
        let config = &self.config;

        if current.accuracy.is_some_and(|acc| acc > config.max_accuracy_m) {
            return Some(Rejection::PoorAccuracy);
        }

        if current.speed_kmh() > config.speed_tolerance * self.profile.max_speed_kmh {
            return Some(Rejection::ExcessiveSpeed);
        }

        if distance_between_m(prev, current) > config.max_distance_m {
            return Some(Rejection::DistanceJump);
        }

        let speed_in = derived_speed_kmh(prev, current);
        let speed_out = derived_speed_kmh(current, next);
        if (speed_in - speed_out).abs() > config.max_acceleration_kmh {
            return Some(Rejection::ImplausibleAcceleration);
        }

        let elapsed_ms = current.timestamp - prev.timestamp;
        if elapsed_ms < config.min_interval_ms || elapsed_ms > config.max_interval_ms {
            return Some(Rejection::TimeGap);
        }

        let drift_bound = config.drift_factor * self.profile.min_speed_kmh;
        if speed_in > 0.0 && speed_in < drift_bound && speed_out < drift_bound {
            return Some(Rejection::StationaryDrift);
        }

        None
    }
}

pub fn filtering_stats(original: &[Sample], filtered: &[Sample]) -> FilterStats {
    let removed_count = original.len().saturating_sub(filtered.len());
    let removal_percentage = if original.is_empty() {
        0.0
    } else {
        removed_count as f64 / original.len() as f64 * 100.0
    };

    FilterStats {
        original_count: original.len(),
        filtered_count: filtered.len(),
        removed_count,
        removal_percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::VehicleType;

    // ~1.11 m per 0.00001 degree of latitude
    const DEG_PER_METER: f64 = 1.0 / 111_194.93;

    fn profile() -> VehicleProfile {
        VehicleProfile::builtin(VehicleType::Scooter)
    }

    /// Straight northbound ride at a steady pace, one fix per second.
    fn steady_route(count: usize, meters_per_second: f64) -> Vec<Sample> {
        (0..count)
            .map(|i| {
                Sample::new(
                    45.0 + i as f64 * meters_per_second * DEG_PER_METER,
                    7.0,
                    1_700_000_000_000 + i as i64 * 1_000,
                )
                .with_speed(meters_per_second)
                .with_accuracy(5.0)
            })
            .collect()
    }

    #[test]
    fn test_short_input_unchanged() {
        let filter = OutlierFilter::new(profile());
        assert!(filter.filter(&[]).is_empty());

        let route = steady_route(2, 5.0);
        assert_eq!(filter.filter(&route), route);
    }

    #[test]
    fn test_clean_route_untouched() {
        let route = steady_route(20, 5.0);
        let filtered = OutlierFilter::new(profile()).filter(&route);
        assert_eq!(filtered, route);
    }

    #[test]
    fn test_teleport_removed() {
        let a = Sample::new(45.0, 7.0, 0);
        let jump = Sample::new(45.0 + 500.0 * DEG_PER_METER, 7.0, 1_000);
        let c = Sample::new(45.0, 7.0, 2_000);

        let filtered = OutlierFilter::new(profile()).filter(&[a, jump, c]);
        assert_eq!(filtered, vec![a, c]);
    }

    #[test]
    fn test_endpoints_always_kept() {
        // Bad accuracy everywhere, endpoints survive anyway
        let route: Vec<Sample> = steady_route(6, 5.0)
            .into_iter()
            .map(|s| s.with_accuracy(100.0))
            .collect();
        let filtered = OutlierFilter::new(profile()).filter(&route);

        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.first(), route.first());
        assert_eq!(filtered.last(), route.last());
    }

    #[test]
    fn test_classify_poor_accuracy() {
        let route = steady_route(3, 5.0);
        let bad = route[1].with_accuracy(40.0);
        let filter = OutlierFilter::new(profile());
        assert_eq!(
            filter.classify(&route[0], &bad, &route[2]),
            Some(Rejection::PoorAccuracy)
        );
    }

    #[test]
    fn test_classify_excessive_reported_speed() {
        let route = steady_route(3, 5.0);
        // 20 m/s = 72 km/h > 1.5 * 35 km/h
        let fast = route[1].with_speed(20.0);
        let filter = OutlierFilter::new(profile());
        assert_eq!(
            filter.classify(&route[0], &fast, &route[2]),
            Some(Rejection::ExcessiveSpeed)
        );
    }

    #[test]
    fn test_classify_acceleration_spike() {
        // 5 m/s then 20 m/s: 18 km/h in, 72 km/h out
        let a = Sample::new(45.0, 7.0, 0);
        let b = Sample::new(45.0 + 5.0 * DEG_PER_METER, 7.0, 1_000);
        let c = Sample::new(45.0 + 25.0 * DEG_PER_METER, 7.0, 2_000);
        let filter = OutlierFilter::new(profile());
        assert_eq!(
            filter.classify(&a, &b, &c),
            Some(Rejection::ImplausibleAcceleration)
        );
    }

    #[test]
    fn test_classify_distance_jump() {
        // 250 m legs every 20 s: 45 km/h in and out, so only the jump trips
        let a = Sample::new(45.0, 7.0, 0);
        let b = Sample::new(45.0 + 250.0 * DEG_PER_METER, 7.0, 20_000);
        let c = Sample::new(45.0 + 500.0 * DEG_PER_METER, 7.0, 40_000);
        let filter = OutlierFilter::new(profile());
        assert_eq!(filter.classify(&a, &b, &c), Some(Rejection::DistanceJump));

        let near = Sample::new(45.0 + 150.0 * DEG_PER_METER, 7.0, 20_000);
        let onward = Sample::new(45.0 + 300.0 * DEG_PER_METER, 7.0, 40_000);
        assert_eq!(filter.classify(&a, &near, &onward), None);
    }

    #[test]
    fn test_classify_time_gaps() {
        let filter = OutlierFilter::new(profile());

        let a = Sample::new(45.0, 7.0, 0);
        let too_soon = Sample::new(45.0, 7.0, 50);
        let next = Sample::new(45.0, 7.0, 1_050);
        assert_eq!(filter.classify(&a, &too_soon, &next), Some(Rejection::TimeGap));

        let too_late = Sample::new(45.0, 7.0, 45_000);
        let after = Sample::new(45.0, 7.0, 46_000);
        assert_eq!(filter.classify(&a, &too_late, &after), Some(Rejection::TimeGap));
    }

    #[test]
    fn test_classify_stationary_drift() {
        // 0.3 m/s is ~1.08 km/h, under the scooter's 1.5 km/h drift bound
        let a = Sample::new(45.0, 7.0, 0);
        let b = Sample::new(45.0 + 0.3 * DEG_PER_METER, 7.0, 1_000);
        let c = Sample::new(45.0 + 0.6 * DEG_PER_METER, 7.0, 2_000);
        let filter = OutlierFilter::new(profile());
        assert_eq!(filter.classify(&a, &b, &c), Some(Rejection::StationaryDrift));
    }

    #[test]
    fn test_drift_kept_when_successor_moves_on() {
        // Slow in, 5 m/s out: 1.08 km/h vs 18 km/h stays under the acceleration bound
        let a = Sample::new(45.0, 7.0, 0);
        let b = Sample::new(45.0 + 0.3 * DEG_PER_METER, 7.0, 1_000);
        let c = Sample::new(45.0 + 5.3 * DEG_PER_METER, 7.0, 2_000);
        let filter = OutlierFilter::new(profile());
        assert_eq!(filter.classify(&a, &b, &c), None);
    }

    #[test]
    fn test_exactly_stationary_not_drift() {
        let a = Sample::new(45.0, 7.0, 0);
        let b = Sample::new(45.0, 7.0, 1_000);
        let c = Sample::new(45.0, 7.0, 2_000);
        let filter = OutlierFilter::new(profile());
        assert_eq!(filter.classify(&a, &b, &c), None);
    }

    #[test]
    fn test_absent_fields_accepted() {
        let route: Vec<Sample> = steady_route(5, 5.0)
            .into_iter()
            .map(|s| Sample::new(s.latitude, s.longitude, s.timestamp))
            .collect();
        let filtered = OutlierFilter::new(profile()).filter(&route);
        assert_eq!(filtered.len(), route.len());
    }

    #[test]
    fn test_custom_thresholds() {
        let route = steady_route(3, 5.0);
        let noisy = route[1].with_accuracy(40.0);
        let input = vec![route[0], noisy, route[2]];

        let default_filter = OutlierFilter::new(profile());
        assert_eq!(default_filter.filter(&input).len(), 2);

        let relaxed = OutlierFilter::with_config(
            profile(),
            OutlierFilterConfig {
                max_accuracy_m: 50.0,
                ..OutlierFilterConfig::default()
            },
        );
        assert_eq!(relaxed.filter(&input), input);
    }

    #[test]
    fn test_filtered_is_subsequence() {
        let mut route = steady_route(12, 5.0);
        route[4] = route[4].with_accuracy(90.0);
        route[8] = Sample::new(46.0, 7.0, route[8].timestamp);

        let filtered = OutlierFilter::new(profile()).filter(&route);
        assert!(filtered.len() <= route.len());

        let mut cursor = route.iter();
        for kept in &filtered {
            assert!(cursor.any(|s| s == kept), "filtered output out of order");
        }
    }

    #[test]
    fn test_filtering_stats() {
        let route = steady_route(10, 5.0);
        let stats = filtering_stats(&route, &route[..8]);
        assert_eq!(stats.original_count, 10);
        assert_eq!(stats.filtered_count, 8);
        assert_eq!(stats.removed_count, 2);
        assert!((stats.removal_percentage - 20.0).abs() < 1e-9);

        let empty = filtering_stats(&[], &[]);
        assert_eq!(empty.removal_percentage, 0.0);
    }
}
