use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Missing input grid for {role}: no layer named `{id}`")]
    MissingLayer { role: &'static str, id: String },
    #[error("Grid `{layer}` breaks the common grid contract: {reason}")]
    GridMismatch { layer: String, reason: String },
    #[error("No seeds could be extracted from the built-up mask")]
    EmptySeedSet,
    #[error("Resources exhausted: {0}")]
    ResourceExhausted(String),
    #[error("Tile `{tile}` failed: {source}")]
    PartialTileFailure {
        tile: String,
        #[source]
        source: Box<Error>,
    },
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("GeoJSON error: {0}")]
    GeoJsonError(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// The only recoverable class: drives the tiling fallback
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, Error::ResourceExhausted(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::MissingLayer { .. } | Error::GridMismatch { .. }
        )
    }
}
