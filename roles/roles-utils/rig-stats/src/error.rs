use thiserror::Error;

#[derive(Error, Debug)]
pub enum RigStatsError {
    #[error("Malformed push: {0}")]
    MalformedPush(#[from] serde_json::Error),

    #[error("Invalid {field} in {window} sample at period {period}: {value}")]
    InvalidSample {
        window: &'static str,
        period: i64,
        field: &'static str,
        value: f64,
    },

    #[error(
        "Invalid {window} window geometry: {window_duration}s window over {period_duration}s periods"
    )]
    InvalidGeometry {
        window: &'static str,
        period_duration: u64,
        window_duration: u64,
    },

    #[error("Invalid overall {field}: {value}")]
    InvalidOverall { field: &'static str, value: f64 },
}

pub type Result<T> = std::result::Result<T, RigStatsError>;
