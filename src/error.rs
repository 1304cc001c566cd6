use thiserror::Error;

/// Errors raised while loading routes, profiles and writing reports.
///
/// The analysis functions themselves never fail; everything here comes from
/// the I/O edges of the crate.
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GPX error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Unknown vehicle type: {0}")]
    UnknownVehicle(String),

    #[error("Invalid vehicle profile: {0}")]
    InvalidProfile(String),

    #[error("No timestamped track points in {0}")]
    NoTimedPoints(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

pub type Result<T> = std::result::Result<T, RouteError>;
