/// Pause Detector - finds stretches where the rider stood still
///
/// A single left-to-right pass over filtered samples. Consecutive slow samples
/// that stay close to the first one (the anchor) and arrive without long gaps
/// are grouped; groups lasting long enough become `Pause`s.

use log::debug;
use serde::Serialize;

use crate::location_utils::distance_between_m;
use crate::sample::Sample;
use crate::vehicle::VehicleProfile;

pub const DEFAULT_MIN_PAUSE_DURATION_MS: i64 = 5_000;
pub const DEFAULT_PAUSE_RADIUS_M: f64 = 20.0;
pub const DEFAULT_PAUSE_SPEED_THRESHOLD_KMH: f64 = 3.0;
pub const DEFAULT_MAX_PAUSE_GAP_MS: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PauseDetectorConfig {
    pub min_duration_ms: i64,
    pub radius_m: f64,
    pub speed_threshold_kmh: f64,
    /// Longest silence between two members of the same pause.
    pub max_gap_ms: i64,
}

impl Default for PauseDetectorConfig {
    fn default() -> Self {
        PauseDetectorConfig {
            min_duration_ms: DEFAULT_MIN_PAUSE_DURATION_MS,
            radius_m: DEFAULT_PAUSE_RADIUS_M,
            speed_threshold_kmh: DEFAULT_PAUSE_SPEED_THRESHOLD_KMH,
            max_gap_ms: DEFAULT_MAX_PAUSE_GAP_MS,
        }
    }
}

impl PauseDetectorConfig {
    pub fn from_profile(profile: &VehicleProfile) -> Self {
        PauseDetectorConfig {
            min_duration_ms: profile.min_pause_duration_ms,
            radius_m: profile.pause_radius_m,
            speed_threshold_kmh: profile.min_speed_kmh,
            ..PauseDetectorConfig::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pause {
    pub start_time: i64,
    pub end_time: i64,
    /// Position of the anchor, the first sample of the pause.
    pub latitude: f64,
    pub longitude: f64,
    pub point_count: usize,
}

impl Pause {
    pub fn duration(&self) -> i64 {
        self.end_time - self.start_time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PauseStats {
    pub count: usize,
    pub total_duration_ms: i64,
    pub average_duration_ms: i64,
    pub longest_ms: i64,
    pub shortest_ms: i64,
}

/// Open pause candidate. Members are only counted; the anchor and the latest
/// member are all that finalizing needs.
#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    anchor: &'a Sample,
    last: &'a Sample,
    point_count: usize,
}

impl<'a> Candidate<'a> {
    fn start(anchor: &'a Sample) -> Self {
        Candidate {
            anchor,
            last: anchor,
            point_count: 1,
        }
    }

    fn absorb(self, sample: &'a Sample) -> Self {
        Candidate {
            last: sample,
            point_count: self.point_count + 1,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum DetectorState<'a> {
    Moving,
    Accumulating(Candidate<'a>),
}

#[derive(Debug, Clone)]
pub struct PauseDetector {
    config: PauseDetectorConfig,
}

impl PauseDetector {
    pub fn new(profile: &VehicleProfile) -> Self {
        PauseDetector::with_config(PauseDetectorConfig::from_profile(profile))
    }

    pub fn with_config(config: PauseDetectorConfig) -> Self {
        PauseDetector { config }
    }

    pub fn config(&self) -> &PauseDetectorConfig {
        &self.config
    }

    /// Pauses in chronological order, none shorter than the minimum duration.
    pub fn detect(&self, samples: &[Sample]) -> Vec<Pause> {
        if samples.len() < 2 {
            return Vec::new();
        }

        let (state, mut pauses) = samples.iter().fold(
            (DetectorState::Moving, Vec::new()),
            |(state, mut pauses), sample| {
                let next = self.advance(state, sample, &mut pauses);
                (next, pauses)
            },
        );

        if let DetectorState::Accumulating(candidate) = state {
            self.finalize(candidate, &mut pauses);
        }

        pauses
    }

    fn advance<'a>(
        &self,
        state: DetectorState<'a>,
        sample: &'a Sample,
        pauses: &mut Vec<Pause>,
    ) -> DetectorState<'a> {
        let is_slow = sample.speed_kmh() < self.config.speed_threshold_kmh;

        match (state, is_slow) {
            (DetectorState::Moving, false) => DetectorState::Moving,
            (DetectorState::Moving, true) => DetectorState::Accumulating(Candidate::start(sample)),
            (DetectorState::Accumulating(candidate), false) => {
                self.finalize(candidate, pauses);
                DetectorState::Moving
            }
            (DetectorState::Accumulating(candidate), true) => {
                if self.is_coherent(&candidate, sample) {
                    DetectorState::Accumulating(candidate.absorb(sample))
                } else {
                    self.finalize(candidate, pauses);
                    DetectorState::Accumulating(Candidate::start(sample))
                }
            }
        }
    }

    fn is_coherent(&self, candidate: &Candidate<'_>, sample: &Sample) -> bool {
        sample.timestamp - candidate.last.timestamp <= self.config.max_gap_ms
            && distance_between_m(candidate.anchor, sample) <= self.config.radius_m
    }

    fn finalize(&self, candidate: Candidate<'_>, pauses: &mut Vec<Pause>) {
        let duration = candidate.last.timestamp - candidate.anchor.timestamp;
        if duration < self.config.min_duration_ms {
            return;
        }

        debug!(
            "Pause of {} ms with {} points at ({:.6}, {:.6})",
            duration, candidate.point_count, candidate.anchor.latitude, candidate.anchor.longitude
        );

        pauses.push(Pause {
            start_time: candidate.anchor.timestamp,
            end_time: candidate.last.timestamp,
            latitude: candidate.anchor.latitude,
            longitude: candidate.anchor.longitude,
            point_count: candidate.point_count,
        });
    }
}

pub fn pause_stats(pauses: &[Pause]) -> PauseStats {
    if pauses.is_empty() {
        return PauseStats {
            count: 0,
            total_duration_ms: 0,
            average_duration_ms: 0,
            longest_ms: 0,
            shortest_ms: 0,
        };
    }

    let durations: Vec<i64> = pauses.iter().map(Pause::duration).collect();
    let total_duration_ms: i64 = durations.iter().sum();

    PauseStats {
        count: pauses.len(),
        total_duration_ms,
        average_duration_ms: total_duration_ms / pauses.len() as i64,
        longest_ms: durations.iter().copied().max().unwrap_or(0),
        shortest_ms: durations.iter().copied().min().unwrap_or(0),
    }
}
