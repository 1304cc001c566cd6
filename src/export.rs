/// Report and export writers - summary CSV, pause CSV, cleaned track CSV and
/// cleaned GPX.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use csv::Writer;
use geo::point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use serde::Serialize;

use crate::error::Result;
use crate::location_utils::{format_distance, format_duration};
use crate::route_analysis::RouteAnalysis;
use crate::vehicle::VehicleType;

/// One row of the per-route summary. Failed routes keep a row with the error
/// in `processing_status`.
#[derive(Debug, Clone, Serialize)]
pub struct RouteReport {
    pub filename: String,
    pub vehicle: VehicleType,
    pub original_points: usize,
    pub filtered_points: usize,
    pub removed_percent: f64,
    pub distance_km: f64,
    pub duration: String,
    pub average_speed_kmh: f64,
    pub max_speed_kmh: f64,
    pub pause_count: usize,
    pub total_pause_ms: i64,
    pub longest_pause_ms: i64,
    pub processing_status: String,
}

impl RouteReport {
    pub fn from_analysis(filename: &str, vehicle: VehicleType, analysis: &RouteAnalysis) -> Self {
        RouteReport {
            filename: filename.to_string(),
            vehicle,
            original_points: analysis.filter_stats.original_count,
            filtered_points: analysis.filter_stats.filtered_count,
            removed_percent: round_to(analysis.filter_stats.removal_percentage, 1),
            distance_km: round_to(analysis.distance_km, 3),
            duration: format_duration(analysis.duration_ms),
            average_speed_kmh: round_to(analysis.average_speed_kmh, 1),
            max_speed_kmh: round_to(analysis.max_speed_kmh, 1),
            pause_count: analysis.pause_stats.count,
            total_pause_ms: analysis.pause_stats.total_duration_ms,
            longest_pause_ms: analysis.pause_stats.longest_ms,
            processing_status: "OK".to_string(),
        }
    }

    pub fn failed(filename: &str, vehicle: VehicleType, error: &str) -> Self {
        RouteReport {
            filename: filename.to_string(),
            vehicle,
            original_points: 0,
            filtered_points: 0,
            removed_percent: 0.0,
            distance_km: 0.0,
            duration: format_duration(0),
            average_speed_kmh: 0.0,
            max_speed_kmh: 0.0,
            pause_count: 0,
            total_pause_ms: 0,
            longest_pause_ms: 0,
            processing_status: format!("ERROR: {}", error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.processing_status == "OK"
    }
}

#[derive(Debug, Serialize)]
struct PauseRow<'a> {
    route: &'a str,
    start: String,
    end: String,
    duration_ms: i64,
    latitude: f64,
    longitude: f64,
    point_count: usize,
}

#[derive(Debug, Serialize)]
struct TrackRow {
    time: String,
    latitude: f64,
    longitude: f64,
    altitude: Option<f64>,
    accuracy: Option<f64>,
    speed_kmh: f64,
    smoothed_speed_kmh: f64,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| timestamp_ms.to_string())
}

pub fn write_summary<W: Write>(reports: &[RouteReport], writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    for report in reports {
        wtr.serialize(report)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_summary_csv(reports: &[RouteReport], path: &Path) -> Result<()> {
    write_summary(reports, File::create(path)?)
}

pub fn write_pauses<W: Write>(route: &str, analysis: &RouteAnalysis, writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    for pause in &analysis.pauses {
        wtr.serialize(PauseRow {
            route,
            start: format_timestamp(pause.start_time),
            end: format_timestamp(pause.end_time),
            duration_ms: pause.duration(),
            latitude: pause.latitude,
            longitude: pause.longitude,
            point_count: pause.point_count,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_track<W: Write>(analysis: &RouteAnalysis, writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    for (sample, smoothed) in analysis.filtered.iter().zip(&analysis.smoothed_speeds_kmh) {
        wtr.serialize(TrackRow {
            time: format_timestamp(sample.timestamp),
            latitude: sample.latitude,
            longitude: sample.longitude,
            altitude: sample.altitude,
            accuracy: sample.accuracy,
            speed_kmh: round_to(sample.speed_kmh(), 2),
            smoothed_speed_kmh: round_to(*smoothed, 2),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Filtered track as a single segment plus one waypoint per pause.
pub fn write_cleaned_gpx<W: Write>(name: &str, analysis: &RouteAnalysis, writer: W) -> Result<()> {
    let mut gpx = Gpx::default();
    gpx.version = GpxVersion::Gpx11;
    gpx.creator = Some("zipstats-route".to_string());

    let mut track = Track::new();
    track.name = Some(name.to_string());
    track.description = Some(format!(
        "Cleaned: {} of {} points kept, {}, {} pauses",
        analysis.filter_stats.filtered_count,
        analysis.filter_stats.original_count,
        format_distance(analysis.distance_km),
        analysis.pause_stats.count
    ));

    let mut segment = TrackSegment::new();
    for sample in &analysis.filtered {
        let mut waypoint = Waypoint::new(sample.into());
        waypoint.elevation = sample.altitude;
        segment.points.push(waypoint);
    }
    track.segments.push(segment);
    gpx.tracks.push(track);

    for (index, pause) in analysis.pauses.iter().enumerate() {
        let mut waypoint = Waypoint::new(point!(x: pause.longitude, y: pause.latitude));
        waypoint.name = Some(format!("Pause {}", index + 1));
        waypoint.description = Some(format!(
            "{} from {}",
            format_duration(pause.duration()),
            format_timestamp(pause.start_time)
        ));
        gpx.waypoints.push(waypoint);
    }

    gpx::write(&gpx, writer)?;
    Ok(())
}

pub fn write_route_exports(
    output_dir: &Path,
    stem: &str,
    analysis: &RouteAnalysis,
    with_gpx: bool,
) -> Result<()> {
    write_pauses(stem, analysis, File::create(output_dir.join(format!("{}_pauses.csv", stem)))?)?;
    write_track(analysis, File::create(output_dir.join(format!("{}_track.csv", stem)))?)?;
    if with_gpx {
        write_cleaned_gpx(
            stem,
            analysis,
            File::create(output_dir.join(format!("{}_cleaned.gpx", stem)))?,
        )?;
    }
    Ok(())
}
