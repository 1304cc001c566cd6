/// Batch processing - analyses every GPX route under a path in parallel and
/// collects one report row per file.

use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use log::{error, info};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use walkdir::WalkDir;

use crate::config::ThresholdOverrides;
use crate::error::Result;
use crate::export::{write_route_exports, RouteReport};
use crate::gpx_reader::read_route;
use crate::route_analysis::{RouteAnalysis, RouteAnalyzer};
use crate::vehicle::VehicleProfile;

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub overrides: ThresholdOverrides,
    /// Per-route pause and track CSVs go here when set.
    pub output_dir: Option<PathBuf>,
    pub export_gpx: bool,
    /// Worker threads, all cores when `None`.
    pub jobs: Option<usize>,
}

fn is_gpx(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("gpx"))
        .unwrap_or(false)
}

/// A single file is returned as is; a directory is walked recursively for
/// `.gpx` files, sorted by name.
pub fn collect_gpx_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && is_gpx(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }
    Ok(files)
}

fn route_name(path: &Path) -> (String, String) {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("route.gpx")
        .to_string();
    let stem = path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("route")
        .to_string();
    (filename, stem)
}

pub fn process_route(
    path: &Path,
    analyzer: &RouteAnalyzer,
    options: &BatchOptions,
) -> Result<RouteAnalysis> {
    let samples = read_route(path)?;
    let analysis = analyzer.analyze(&samples);

    if let Some(dir) = &options.output_dir {
        let (_, stem) = route_name(path);
        write_route_exports(dir, &stem, &analysis, options.export_gpx)?;
    }
    Ok(analysis)
}

/// Reports come back in the order of `files`. A file that fails to load or
/// export gets an error row instead of aborting the batch.
pub fn run_batch(
    files: &[PathBuf],
    profile: VehicleProfile,
    options: &BatchOptions,
) -> Result<Vec<RouteReport>> {
    if let Some(dir) = &options.output_dir {
        create_dir_all(dir)?;
    }

    let jobs = options.jobs.unwrap_or_else(num_cpus::get).max(1);
    let pool = ThreadPoolBuilder::new().num_threads(jobs).build()?;
    let analyzer = RouteAnalyzer::with_overrides(profile, &options.overrides);

    info!("Processing {} routes on {} threads", files.len(), jobs);
    let start_time = Instant::now();
    let processed = AtomicUsize::new(0);
    let total = files.len();

    let reports = pool.install(|| {
        files
            .par_iter()
            .map(|path| {
                let (filename, _) = route_name(path);
                let report = match process_route(path, &analyzer, options) {
                    Ok(analysis) => {
                        RouteReport::from_analysis(&filename, profile.vehicle, &analysis)
                    }
                    Err(e) => {
                        error!("Failed to process {}: {}", path.display(), e);
                        RouteReport::failed(&filename, profile.vehicle, &e.to_string())
                    }
                };
                let count = processed.fetch_add(1, Ordering::Relaxed) + 1;
                info!("[{}/{}] {}", count, total, filename);
                report
            })
            .collect::<Vec<_>>()
    });

    info!(
        "Processed {} routes in {:.2} seconds",
        reports.len(),
        start_time.elapsed().as_secs_f64()
    );
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const ROUTE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><trkseg>
    <trkpt lat="45.00000" lon="7.0"><time>2024-05-01T08:00:00Z</time></trkpt>
    <trkpt lat="45.00004" lon="7.0"><time>2024-05-01T08:00:01Z</time></trkpt>
    <trkpt lat="45.00008" lon="7.0"><time>2024-05-01T08:00:02Z</time></trkpt>
    <trkpt lat="45.00012" lon="7.0"><time>2024-05-01T08:00:03Z</time></trkpt>
    <trkpt lat="45.00016" lon="7.0"><time>2024-05-01T08:00:04Z</time></trkpt>
  </trkseg></trk>
</gpx>"#;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("zipstats-route-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_collect_gpx_files() {
        let dir = scratch_dir("collect");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("b.gpx"), ROUTE).unwrap();
        fs::write(dir.join("nested").join("a.GPX"), ROUTE).unwrap();
        fs::write(dir.join("notes.txt"), "not a route").unwrap();

        let files = collect_gpx_files(&dir).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| is_gpx(f)));

        let single = collect_gpx_files(&dir.join("b.gpx")).unwrap();
        assert_eq!(single, vec![dir.join("b.gpx")]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_batch_keeps_failed_routes() {
        let dir = scratch_dir("batch");
        fs::write(dir.join("good.gpx"), ROUTE).unwrap();
        fs::write(dir.join("empty.gpx"), "<gpx></gpx>").unwrap();

        let files = collect_gpx_files(&dir).unwrap();
        let options = BatchOptions {
            jobs: Some(2),
            ..BatchOptions::default()
        };
        let reports = run_batch(&files, VehicleProfile::default(), &options).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].filename, "empty.gpx");
        assert!(reports[0].processing_status.starts_with("ERROR"));
        assert_eq!(reports[1].filename, "good.gpx");
        assert!(reports[1].is_ok());
        assert_eq!(reports[1].original_points, 5);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_batch_writes_route_exports() {
        let dir = scratch_dir("exports");
        let route = dir.join("ride.gpx");
        fs::write(&route, ROUTE).unwrap();

        let out = dir.join("out");
        let options = BatchOptions {
            output_dir: Some(out.clone()),
            export_gpx: true,
            jobs: Some(1),
            ..BatchOptions::default()
        };
        let reports = run_batch(&[route], VehicleProfile::default(), &options).unwrap();

        assert!(reports[0].is_ok());
        assert!(out.join("ride_pauses.csv").exists());
        assert!(out.join("ride_track.csv").exists());
        assert!(out.join("ride_cleaned.gpx").exists());

        fs::remove_dir_all(&dir).unwrap();
    }
}
