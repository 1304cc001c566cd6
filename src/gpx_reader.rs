/// GPX ingestion - turns recorded tracks into time-ordered samples
///
/// Parsing is tolerant: when the standard parse fails, a handful of safe
/// textual repairs are applied and the document is parsed again. Repairs never
/// touch coordinates, elevations or timestamps.

use std::fs::{self, File};
use std::io::{BufReader, Cursor};
use std::path::Path;

use chrono::{DateTime, Utc};
use gpx::{read, Gpx, Time};
use log::{debug, warn};

use crate::error::{Result, RouteError};
use crate::sample::Sample;

/// Reads a GPX file into samples, repairing the document if needed.
pub fn read_route(path: &Path) -> Result<Vec<Sample>> {
    // The parser honours the declared encoding, so non-UTF-8 files go straight in
    let gpx = match read(BufReader::new(File::open(path)?)) {
        Ok(gpx) => gpx,
        Err(e) => {
            warn!(
                "Standard GPX parse of {} failed ({}), retrying with repairs",
                path.display(),
                e
            );
            let bytes = fs::read(path)?;
            parse_repaired(&String::from_utf8_lossy(&bytes))?
        }
    };

    let samples = samples_from_gpx(&gpx)?;
    if samples.is_empty() {
        return Err(RouteError::NoTimedPoints(path.display().to_string()));
    }
    Ok(samples)
}

/// Standard parse, then one retry on the repaired text.
pub fn parse_tolerantly(content: &str, source: &str) -> Result<Gpx> {
    match read(BufReader::new(Cursor::new(content.as_bytes()))) {
        Ok(gpx) => Ok(gpx),
        Err(e) => {
            warn!("Standard GPX parse of {} failed ({}), retrying with repairs", source, e);
            parse_repaired(content)
        }
    }
}

fn parse_repaired(content: &str) -> Result<Gpx> {
    let repaired = apply_safe_repairs(content);
    Ok(read(BufReader::new(Cursor::new(repaired.as_bytes())))?)
}

/// Every timed track point in file order. Points without a timestamp are
/// skipped. GPX has no sensor speed, so `speed` stays empty; the analyzer
/// derives it once outliers are gone.
pub fn samples_from_gpx(gpx: &Gpx) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();
    let mut untimed = 0usize;

    for track in &gpx.tracks {
        for segment in &track.segments {
            for point in &segment.points {
                let Some(time) = point.time else {
                    untimed += 1;
                    continue;
                };

                let position = point.point();
                let mut sample = Sample::new(position.y(), position.x(), time_to_millis(&time)?);
                if let Some(elevation) = point.elevation {
                    sample = sample.with_altitude(elevation);
                }
                samples.push(sample);
            }
        }
    }

    if untimed > 0 {
        warn!("Skipped {} track points without a timestamp", untimed);
    }
    debug!("Extracted {} timed track points", samples.len());

    Ok(samples)
}

fn time_to_millis(time: &Time) -> Result<i64> {
    let formatted = time
        .format()
        .map_err(|e| RouteError::InvalidTimestamp(e.to_string()))?;
    let parsed = formatted
        .parse::<DateTime<Utc>>()
        .map_err(|e| RouteError::InvalidTimestamp(format!("{}: {}", formatted, e)))?;
    Ok(parsed.timestamp_millis())
}

fn apply_safe_repairs(content: &str) -> String {
    let mut repaired = remove_invalid_xml_chars(content.trim_start_matches('\u{feff}'));

    if !repaired.starts_with("<?xml") {
        repaired = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", repaired);
    }

    if repaired.contains("<gpx") {
        repaired = add_gpx_version(&repaired);
    }

    close_truncated_tags(&repaired)
}

fn add_gpx_version(content: &str) -> String {
    let Some(start) = content.find("<gpx") else {
        return content.to_string();
    };
    let Some(len) = content[start..].find('>') else {
        return content.to_string();
    };

    let tag = &content[start..start + len + 1];
    if tag.contains("version=") {
        return content.to_string();
    }

    let attributes = if tag.contains("xmlns=") {
        " version=\"1.1\">"
    } else {
        " version=\"1.1\" xmlns=\"http://www.topografix.com/GPX/1/1\">"
    };
    let fixed = tag.replacen('>', attributes, 1);
    content.replacen(tag, &fixed, 1)
}

fn close_truncated_tags(content: &str) -> String {
    let mut repaired = content.trim_end().to_string();
    if repaired.ends_with("</gpx>") || !repaired.contains("<gpx") {
        return repaired;
    }

    // A recording cut off mid-point leaves a dangling <trkpt>
    if let Some(last_open) = repaired.rfind("<trkpt") {
        if !repaired[last_open..].contains("</trkpt>") {
            repaired.truncate(last_open);
        }
    }

    let open_segments = repaired.matches("<trkseg>").count();
    let closed_segments = repaired.matches("</trkseg>").count();
    for _ in closed_segments..open_segments {
        repaired.push_str("\n</trkseg>");
    }

    let open_tracks = repaired.matches("<trk>").count();
    let closed_tracks = repaired.matches("</trk>").count();
    for _ in closed_tracks..open_tracks {
        repaired.push_str("\n</trk>");
    }

    repaired.push_str("\n</gpx>");
    repaired
}

fn remove_invalid_xml_chars(content: &str) -> String {
    content
        .chars()
        .filter(|&c| {
            matches!(c, '\t' | '\n' | '\r')
                || ('\u{20}'..='\u{D7FF}').contains(&c)
                || ('\u{E000}'..='\u{FFFD}').contains(&c)
                || c as u32 >= 0x10000
        })
        .collect()
}
