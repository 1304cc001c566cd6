use std::path::PathBuf;

use clap::Parser;
use log::info;

use zipstats_route::batch::{collect_gpx_files, run_batch, BatchOptions};
use zipstats_route::config::{ProfileTable, ThresholdOverrides};
use zipstats_route::export::{write_summary_csv, RouteReport};
use zipstats_route::location_utils::format_duration;
use zipstats_route::VehicleType;

/// Cleans recorded rides and detects pauses.
#[derive(Debug, Parser)]
#[command(name = "zipstats-route", version, about)]
struct Args {
    /// GPX file or directory of GPX files
    input: PathBuf,

    /// scooter, bike, ebike or unicycle
    #[arg(long, default_value = "scooter")]
    vehicle: String,

    /// Vehicle profile CSV (defaults to ./vehicle_profiles.csv when present)
    #[arg(long)]
    profiles: Option<PathBuf>,

    #[arg(short, long, default_value = "route_reports")]
    output: PathBuf,

    /// Worker threads (defaults to the number of logical CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Reject samples with a worse accuracy radius, meters
    #[arg(long)]
    max_accuracy: Option<f64>,

    /// Reject samples further than this from their predecessor, meters
    #[arg(long)]
    max_distance: Option<f64>,

    /// Reject samples whose speed changes more than this, km/h
    #[arg(long)]
    max_acceleration: Option<f64>,

    #[arg(long)]
    min_pause_ms: Option<i64>,

    /// Pause radius, meters
    #[arg(long)]
    pause_radius: Option<f64>,

    /// Also write a cleaned GPX per route
    #[arg(long)]
    export_gpx: bool,
}

impl Args {
    fn overrides(&self) -> ThresholdOverrides {
        ThresholdOverrides {
            max_accuracy_m: self.max_accuracy,
            max_distance_m: self.max_distance,
            max_acceleration_kmh: self.max_acceleration,
            min_pause_duration_ms: self.min_pause_ms,
            pause_radius_m: self.pause_radius,
            pause_speed_threshold_kmh: None,
        }
    }
}

fn print_summary(reports: &[RouteReport]) {
    let ok: Vec<&RouteReport> = reports.iter().filter(|r| r.is_ok()).collect();
    let failed = reports.len() - ok.len();

    println!("\n📊 ROUTE SUMMARY");
    println!("================");
    println!(
        "{:<32} {:>8} {:>8} {:>10} {:>10} {:>8} {:>7}",
        "Route", "Points", "Kept", "Km", "Duration", "Avg", "Pauses"
    );
    for report in &ok {
        println!(
            "{:<32} {:>8} {:>8} {:>10.3} {:>10} {:>8.1} {:>7}",
            report.filename,
            report.original_points,
            report.filtered_points,
            report.distance_km,
            report.duration,
            report.average_speed_kmh,
            report.pause_count
        );
    }

    let total_km: f64 = ok.iter().map(|r| r.distance_km).sum();
    let total_pause_ms: i64 = ok.iter().map(|r| r.total_pause_ms).sum();
    println!("\n✅ {} routes analysed, {:.2} km in total", ok.len(), total_km);
    println!("⏸️  {} of pauses", format_duration(total_pause_ms));
    if failed > 0 {
        println!("⚠️  {} routes failed, see the summary CSV for details", failed);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let vehicle: VehicleType = args.vehicle.parse()?;
    let profile = ProfileTable::load(args.profiles.as_deref())?.get(vehicle);
    info!(
        "Using {} profile: max {} km/h, min {} km/h, pauses of {} ms within {} m",
        vehicle,
        profile.max_speed_kmh,
        profile.min_speed_kmh,
        profile.min_pause_duration_ms,
        profile.pause_radius_m
    );

    let files = collect_gpx_files(&args.input)?;
    if files.is_empty() {
        println!("⚠️  No GPX files found in {}", args.input.display());
        return Ok(());
    }
    println!("📁 Found {} GPX files to process", files.len());

    let options = BatchOptions {
        overrides: args.overrides(),
        output_dir: Some(args.output.clone()),
        export_gpx: args.export_gpx,
        jobs: args.jobs,
    };
    let reports = run_batch(&files, profile, &options)?;

    let summary_path = args.output.join("route_summary.csv");
    write_summary_csv(&reports, &summary_path)?;

    print_summary(&reports);
    println!("📄 Summary CSV saved to: {}", summary_path.display());
    println!("📁 Route exports saved to: {}", args.output.display());

    Ok(())
}
