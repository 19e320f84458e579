//! Error types for mapview-wms services.

use thiserror::Error;

/// Result type alias using MapsError.
pub type MapsResult<T> = Result<T, MapsError>;

/// Primary error type for map-view protocol operations.
#[derive(Debug, Error)]
pub enum MapsError {
    // === Protocol Errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Unparseable request: {0}")]
    MalformedRequest(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Invalid CRS: {0}")]
    InvalidCrs(String),

    #[error("Invalid BBOX: {0}")]
    InvalidBbox(String),

    #[error("Requested format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Tile coordinates out of range: {0}")]
    TileOutOfRange(String),

    // === Resource Limits ===
    #[error("Resource limit exceeded: {0}")]
    ResourceLimitExceeded(String),

    // === Rendering Errors ===
    #[error("Rendering failed: {0}")]
    RenderFailure(String),

    #[error("Render timeout")]
    RenderTimeout,

    // === Infrastructure Errors ===
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl MapsError {
    /// Get the OGC exception code for this error.
    pub fn ogc_exception_code(&self) -> &'static str {
        match self {
            MapsError::MissingParameter(_) => "MissingParameterValue",
            MapsError::InvalidParameter { .. }
            | MapsError::MalformedRequest(_)
            | MapsError::ResourceLimitExceeded(_) => "InvalidParameterValue",
            MapsError::UnknownOperation(_) => "OperationNotSupported",
            MapsError::LayerNotFound(_) => "LayerNotDefined",
            MapsError::InvalidCrs(_) => "InvalidCRS",
            MapsError::InvalidBbox(_) => "InvalidBBox",
            MapsError::UnsupportedFormat(_) => "InvalidFormat",
            MapsError::TileOutOfRange(_) => "TileOutOfRange",
            _ => "NoApplicableCode",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            MapsError::MissingParameter(_)
            | MapsError::InvalidParameter { .. }
            | MapsError::MalformedRequest(_)
            | MapsError::InvalidCrs(_)
            | MapsError::InvalidBbox(_)
            | MapsError::UnsupportedFormat(_)
            | MapsError::TileOutOfRange(_)
            | MapsError::ResourceLimitExceeded(_) => 400,

            MapsError::UnknownOperation(_) | MapsError::LayerNotFound(_) => 404,

            MapsError::RenderTimeout => 504,

            _ => 500,
        }
    }
}

impl From<std::io::Error> for MapsError {
    fn from(err: std::io::Error) -> Self {
        MapsError::InternalError(err.to_string())
    }
}

impl From<serde_json::Error> for MapsError {
    fn from(err: serde_json::Error) -> Self {
        MapsError::InternalError(format!("JSON error: {}", err))
    }
}

impl From<crate::bbox::BboxParseError> for MapsError {
    fn from(err: crate::bbox::BboxParseError) -> Self {
        MapsError::InvalidBbox(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_codes() {
        assert_eq!(
            MapsError::MissingParameter("BBOX".into()).ogc_exception_code(),
            "MissingParameterValue"
        );
        assert_eq!(
            MapsError::RenderFailure("boom".into()).ogc_exception_code(),
            "NoApplicableCode"
        );
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(MapsError::MalformedRequest("x".into()).http_status(), 400);
        assert_eq!(MapsError::UnknownOperation("x".into()).http_status(), 404);
        assert_eq!(MapsError::RenderFailure("x".into()).http_status(), 500);
        assert_eq!(MapsError::RenderTimeout.http_status(), 504);
        assert_eq!(
            MapsError::ResourceLimitExceeded("too big".into()).http_status(),
            400
        );
    }
}
