use thiserror::Error;

/// Fatal configuration and I/O errors.
///
/// These are the fail-fast cases: a zone layer that cannot be read or
/// parsed, or an input file that is missing or structurally broken.
/// Per-record data problems (bad coordinates, bad timestamps, unknown
/// modes) never surface here; they degrade in place instead.
#[derive(Debug, Error)]
pub enum ReportError {
    /// File could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV input could not be parsed at the structural level.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Zone layer GeoJSON could not be parsed.
    #[error("GeoJSON error in zone layer: {0}")]
    Geojson(#[from] geojson::Error),

    /// Run summary could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Zone layer is not a FeatureCollection or yielded no polygons.
    #[error("zone layer {layer:?} is unusable: {reason}")]
    BadZoneLayer {
        /// Layer file or name.
        layer: String,
        /// What was wrong with it.
        reason: String,
    },
}
