//! Coordinate reprojection between two PROJ.4 definitions.
//!
//! A [`Transform`] is handed to geometry decoders, which call
//! [`Transform::project`] on every coordinate pair they emit.

use std::fmt;
use std::sync::Arc;

use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use thiserror::Error;

/// Errors raised while building or applying a [`Transform`].
#[derive(Debug, Error)]
pub enum TransformError {
    /// A PROJ.4 definition could not be parsed.
    #[error("Invalid projection definition '{definition}': {message}")]
    InvalidDefinition {
        /// The rejected definition
        definition: String,
        /// Parser diagnostics
        message: String,
    },

    /// A coordinate could not be reprojected.
    #[error("Failed to project ({x}, {y}): {message}")]
    Projection {
        /// Input easting / longitude
        x: f64,
        /// Input northing / latitude
        y: f64,
        /// Projection diagnostics
        message: String,
    },
}

struct Crs {
    definition: String,
    proj: Proj,
    geographic: bool,
}

impl Crs {
    fn parse(definition: &str) -> Result<Self, TransformError> {
        let proj =
            Proj::from_proj_string(definition).map_err(|e| TransformError::InvalidDefinition {
                definition: definition.to_string(),
                message: format!("{e:?}"),
            })?;
        Ok(Self {
            definition: definition.to_string(),
            proj,
            geographic: is_geographic(definition),
        })
    }
}

/// A resolved reprojection from a dataset CRS to a target CRS.
#[derive(Clone)]
pub struct Transform {
    source: Arc<Crs>,
    target: Arc<Crs>,
}

impl Transform {
    /// Builds a transform between two PROJ.4 definitions.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::InvalidDefinition`] if either definition is
    /// rejected by the projection engine.
    pub fn new(source_definition: &str, target_definition: &str) -> Result<Self, TransformError> {
        Ok(Self {
            source: Arc::new(Crs::parse(source_definition)?),
            target: Arc::new(Crs::parse(target_definition)?),
        })
    }

    #[must_use]
    pub fn source_definition(&self) -> &str {
        &self.source.definition
    }

    #[must_use]
    pub fn target_definition(&self) -> &str {
        &self.target.definition
    }

    /// Returns `true` when source and target definitions are identical.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.source.definition == self.target.definition
    }

    /// Reprojects one coordinate pair.
    ///
    /// Geographic coordinates are taken and returned in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Projection`] if the point falls outside the
    /// domain of either projection.
    pub fn project(&self, x: f64, y: f64) -> Result<(f64, f64), TransformError> {
        if self.is_identity() {
            return Ok((x, y));
        }

        let mut point = if self.source.geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        transform(&self.source.proj, &self.target.proj, &mut point).map_err(|e| {
            TransformError::Projection {
                x,
                y,
                message: format!("{e:?}"),
            }
        })?;

        if self.target.geographic {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("source", &self.source.definition)
            .field("target", &self.target.definition)
            .finish()
    }
}

fn is_geographic(definition: &str) -> bool {
    ["+proj=longlat", "+proj=latlong", "+proj=lonlat", "+proj=latlon"]
        .iter()
        .any(|marker| definition.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WGS84: &str = "+proj=longlat +datum=WGS84 +no_defs";
    const WORLD_MERCATOR: &str = "+proj=merc +lon_0=0 +k=1 +x_0=0 +y_0=0 +datum=WGS84 +units=m +no_defs";
    const EPS: f64 = 1e-6;

    #[test]
    fn mercator_origin_maps_to_origin() {
        let transform = Transform::new(WORLD_MERCATOR, WGS84).expect("valid definitions");
        let (lon, lat) = transform.project(0.0, 0.0).expect("project");
        assert!(lon.abs() < EPS);
        assert!(lat.abs() < EPS);
    }

    #[test]
    fn roundtrip_through_mercator() {
        let forward = Transform::new(WGS84, WORLD_MERCATOR).expect("valid definitions");
        let back = Transform::new(WORLD_MERCATOR, WGS84).expect("valid definitions");

        let (x, y) = forward.project(10.0, 51.5).expect("project");
        assert!(x.abs() > 1000.0);
        let (lon, lat) = back.project(x, y).expect("project");
        assert!((lon - 10.0).abs() < EPS, "lon: {lon}");
        assert!((lat - 51.5).abs() < EPS, "lat: {lat}");
    }

    #[test]
    fn identity_passes_through() {
        let transform = Transform::new(WGS84, WGS84).expect("valid definitions");
        assert!(transform.is_identity());
        assert_eq!(transform.project(12.5, -7.25).expect("project"), (12.5, -7.25));
    }

    #[test]
    fn invalid_definition_is_reported() {
        let err = Transform::new("+proj=doesnotexist", WGS84).unwrap_err();
        assert!(matches!(err, TransformError::InvalidDefinition { .. }));
        assert!(err.to_string().contains("+proj=doesnotexist"));
    }

    #[test]
    fn debug_shows_definitions() {
        let transform = Transform::new(WORLD_MERCATOR, WGS84).expect("valid definitions");
        let debug = format!("{transform:?}");
        assert!(debug.contains("+proj=merc"));
        assert!(debug.contains("+proj=longlat"));
    }
}
