//! Route analysis for recorded personal-mobility rides.
//!
//! Raw GPS samples go through an outlier filter and a pause detector; the
//! surrounding modules load GPX tracks and vehicle profiles, run batches in
//! parallel and write the reports.

pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod gpx_reader;
pub mod location_utils;
pub mod outlier_filter;
pub mod pause_detector;
pub mod route_analysis;
pub mod sample;
pub mod vehicle;

pub use error::{Result, RouteError};
pub use outlier_filter::{filtering_stats, FilterStats, OutlierFilter, OutlierFilterConfig};
pub use pause_detector::{pause_stats, Pause, PauseDetector, PauseDetectorConfig, PauseStats};
pub use route_analysis::{RouteAnalysis, RouteAnalyzer};
pub use sample::Sample;
pub use vehicle::{VehicleProfile, VehicleType};
