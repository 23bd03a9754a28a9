//! Custom error types for `shapeload` operations.
//!
//! This module provides structured error handling using `thiserror`. Errors
//! from mandatory resources are fatal and propagate to the caller; failures on
//! optional resources never reach this taxonomy because they are converted to
//! absence where they occur.

use thiserror::Error;

use shapeload_core_common::DatasetMember;

/// Main error type for `shapeload` operations.
///
/// This is the root error type that encompasses all domain-specific errors.
/// It uses `#[error(transparent)]` to delegate display formatting to the
/// underlying error variants.
#[derive(Debug, Error)]
pub enum ShapeloadError {
    /// The caller's input could not be used as a dataset
    #[error(transparent)]
    Input(#[from] InputError),

    /// A mandatory byte source could not be retrieved
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A decoder rejected its input
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Generic errors from dependencies
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors about the shape of the caller's input.
#[derive(Debug, Error)]
pub enum InputError {
    /// The input matched none of the supported modalities
    #[error(
        "Unsupported input: must be a string, some sort of buffer, or an object with at least a geometry (shp) property"
    )]
    UnsupportedInputShape,

    /// A value expected to be byte-addressable was not
    #[error("Invalid buffer: {reason}")]
    InvalidBufferKind {
        /// Why the value could not be viewed as bytes
        reason: String,
    },
}

/// Errors raised while locating mandatory byte sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No geometry stream was found
    #[error("No geometry (.shp) source found in {location}")]
    MissingGeometryMember {
        /// Where the geometry stream was looked for
        location: String,
    },

    /// Fetching a mandatory resource failed
    #[error("Failed to fetch {member} from '{location}': {source}")]
    Fetch {
        /// The resource being fetched
        member: DatasetMember,
        /// The derived locator
        location: String,
        /// The underlying error
        #[source]
        source: anyhow::Error,
    },

    /// Reading a mandatory archive member failed
    #[error("Failed to extract {member} from archive: {source}")]
    Archive {
        /// The member being extracted
        member: DatasetMember,
        /// The underlying error
        #[source]
        source: anyhow::Error,
    },
}

/// Errors returned by the external decoders.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The geometry decoder failed
    #[error("Failed to decode geometry: {source}")]
    Geometry {
        /// The underlying error
        #[source]
        source: anyhow::Error,
    },

    /// The attribute decoder failed
    #[error("Failed to decode attributes: {source}")]
    Attributes {
        /// The underlying error
        #[source]
        source: anyhow::Error,
    },
}

/// Type alias for Results using `ShapeloadError`.
pub type Result<T> = std::result::Result<T, ShapeloadError>;

impl ShapeloadError {
    /// Get a user-friendly error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Input(e) => e.to_string(),
            Self::Source(e) => e.user_message(),
            Self::Decode(e) => format!("Decode error: {e}"),
            Self::Other(e) => format!("Error: {e}"),
        }
    }

    /// Get recovery suggestions if available.
    ///
    /// Returns helpful suggestions on how to fix or work around the error.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Input(e) => e.recovery_suggestion(),
            Self::Source(e) => e.recovery_suggestion(),
            _ => None,
        }
    }

    /// Check if this error is potentially recoverable.
    ///
    /// Recoverable errors might be fixed by retrying, for instance after a
    /// transient network failure.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Source(SourceError::Fetch { .. }))
    }

    pub(crate) fn missing_geometry(location: impl Into<String>) -> Self {
        Self::Source(SourceError::MissingGeometryMember {
            location: location.into(),
        })
    }

    pub(crate) fn invalid_buffer(reason: impl Into<String>) -> Self {
        Self::Input(InputError::InvalidBufferKind {
            reason: reason.into(),
        })
    }
}

impl InputError {
    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::UnsupportedInputShape => Some(
                "Pass a URL or path, a zip archive buffer, or a bundle with a .shp buffer."
                    .to_string(),
            ),
            Self::InvalidBufferKind { .. } => {
                Some("Check the offset and length of the buffer passed in.".to_string())
            },
        }
    }
}

impl SourceError {
    fn user_message(&self) -> String {
        match self {
            Self::MissingGeometryMember { location } => {
                format!("No .shp geometry found in {location}")
            },
            Self::Fetch {
                member, location, ..
            } => format!("Could not fetch the .{member} file at {location}"),
            Self::Archive { member, .. } => {
                format!("Could not read the .{member} member of the archive")
            },
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::MissingGeometryMember { .. } => Some(
                "Check that the dataset contains a .shp file next to its siblings.".to_string(),
            ),
            Self::Fetch { .. } => {
                Some("Check the URL and network access, then retry.".to_string())
            },
            Self::Archive { .. } => Some("Check that the archive is a valid zip file.".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_input_names_required_shapes() {
        let err = ShapeloadError::from(InputError::UnsupportedInputShape);
        let message = err.to_string();
        assert!(message.contains("must be a string"));
        assert!(message.contains("some sort of buffer"));
        assert!(message.contains("at least a geometry"));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn missing_geometry_displays_location() {
        let err = ShapeloadError::missing_geometry("archive");
        assert_eq!(err.to_string(), "No geometry (.shp) source found in archive");
        assert_eq!(err.user_message(), "No .shp geometry found in archive");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn fetch_errors_are_recoverable() {
        let err = ShapeloadError::from(SourceError::Fetch {
            member: DatasetMember::Geometry,
            location: "https://example.com/a.shp".to_string(),
            source: anyhow::anyhow!("connection reset"),
        });
        assert!(err.is_recoverable());
        assert_eq!(
            err.to_string(),
            "Failed to fetch shp from 'https://example.com/a.shp': connection reset"
        );
        assert_eq!(
            err.user_message(),
            "Could not fetch the .shp file at https://example.com/a.shp"
        );
    }

    #[test]
    fn decode_errors_have_no_suggestion() {
        let err = ShapeloadError::from(DecodeError::Attributes {
            source: anyhow::anyhow!("bad header"),
        });
        assert_eq!(err.user_message(), "Decode error: Failed to decode attributes: bad header");
        assert!(err.recovery_suggestion().is_none());
    }

    #[test]
    fn invalid_buffer_reason_is_kept() {
        let err = ShapeloadError::invalid_buffer("no bytes supplied");
        assert!(matches!(
            err,
            ShapeloadError::Input(InputError::InvalidBufferKind { ref reason }) if reason == "no bytes supplied"
        ));
    }
}
