/// Route Analysis - raw samples through the outlier filter and pause detector
///
/// Keeps the two stages and the utility-level figures together so callers get
/// one value per route.

use log::info;

use crate::config::ThresholdOverrides;
use crate::location_utils::{
    average_speed, format_distance, max_speed, smoothed_speeds, total_distance,
    with_derived_speeds, DEFAULT_LOW_SPEED_THRESHOLD_KMH, DEFAULT_SMOOTHING_ALPHA,
};
use crate::outlier_filter::{filtering_stats, FilterStats, OutlierFilter};
use crate::pause_detector::{pause_stats, Pause, PauseDetector, PauseStats};
use crate::sample::Sample;
use crate::vehicle::VehicleProfile;

#[derive(Debug, Clone)]
pub struct RouteAnalysis {
    pub filtered: Vec<Sample>,
    pub pauses: Vec<Pause>,
    pub filter_stats: FilterStats,
    pub pause_stats: PauseStats,
    pub distance_km: f64,
    pub duration_ms: i64,
    pub average_speed_kmh: f64,
    pub max_speed_kmh: f64,
    /// EMA-smoothed reported speed per filtered sample, km/h.
    pub smoothed_speeds_kmh: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct RouteAnalyzer {
    profile: VehicleProfile,
    outlier_filter: OutlierFilter,
    pause_detector: PauseDetector,
    smoothing_alpha: f64,
    low_speed_threshold_kmh: f64,
}

impl RouteAnalyzer {
    pub fn new(profile: VehicleProfile) -> Self {
        RouteAnalyzer::with_overrides(profile, &ThresholdOverrides::default())
    }

    pub fn with_overrides(profile: VehicleProfile, overrides: &ThresholdOverrides) -> Self {
        RouteAnalyzer {
            profile,
            outlier_filter: OutlierFilter::with_config(profile, overrides.outlier_config()),
            pause_detector: PauseDetector::with_config(overrides.pause_config(&profile)),
            smoothing_alpha: DEFAULT_SMOOTHING_ALPHA,
            low_speed_threshold_kmh: DEFAULT_LOW_SPEED_THRESHOLD_KMH,
        }
    }

    pub fn profile(&self) -> &VehicleProfile {
        &self.profile
    }

    /// Samples without a sensor speed get one derived from their kept
    /// predecessor after filtering, so dropped fixes never leak into speeds.
    pub fn analyze(&self, samples: &[Sample]) -> RouteAnalysis {
        let filtered = with_derived_speeds(&self.outlier_filter.filter(samples));
        let pauses = self.pause_detector.detect(&filtered);

        let distance_km = total_distance(&filtered);
        let duration_ms = match (filtered.first(), filtered.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0,
        };

        let analysis = RouteAnalysis {
            filter_stats: filtering_stats(samples, &filtered),
            pause_stats: pause_stats(&pauses),
            distance_km,
            duration_ms,
            average_speed_kmh: average_speed(distance_km, duration_ms),
            max_speed_kmh: max_speed(&filtered),
            smoothed_speeds_kmh: smoothed_speeds(
                &filtered,
                self.smoothing_alpha,
                self.low_speed_threshold_kmh,
            ),
            filtered,
            pauses,
        };

        info!(
            "Analysed {} route: {} of {} samples kept, {}, {} pauses",
            self.profile.vehicle,
            analysis.filter_stats.filtered_count,
            analysis.filter_stats.original_count,
            format_distance(analysis.distance_km),
            analysis.pause_stats.count
        );

        analysis
    }
}
