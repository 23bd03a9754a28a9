//! Resolution of projection definitions into coordinate transforms.
//!
//! A dataset's `.prj` sidecar is usually OGC or ESRI WKT; callers may also pass
//! PROJ.4 strings or `EPSG:<code>` identifiers. WKT with a top-level authority
//! clause is looked up in the `crs-definitions` database; WKT without one is
//! converted from its `PROJECTION`, `PARAMETER`, `SPHEROID` and `UNIT` elements.
//!
//! Resolution failures never propagate out of [`ProjectionResolver::resolve_transform`]:
//! a dataset whose projection cannot be understood is loaded untransformed.

use log::{debug, warn};
use thiserror::Error;

use shapeload_core_common::{Transform, TransformError};

use crate::wkt::{Wkt, WktCrs, WktError};

/// PROJ.4 definition of WGS 84 longitude/latitude.
pub const WGS84: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Reasons a projection definition could not be turned into a transform.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The text is not a PROJ.4 string, EPSG identifier, or usable WKT
    #[error("Unrecognized projection definition: {snippet}")]
    Unrecognized {
        /// Leading part of the rejected text
        snippet: String,
    },

    /// The EPSG code is not in the definitions database
    #[error("EPSG:{code} is not in the crs-definitions database")]
    UnknownCode {
        /// The unknown code
        code: u32,
    },

    /// The WKT could not be read or has no PROJ.4 equivalent
    #[error(transparent)]
    Wkt(#[from] WktError),

    /// The projection engine rejected the definition
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Builds transforms from dataset projection definitions to a target CRS.
#[derive(Debug, Clone)]
pub struct ProjectionResolver {
    target: String,
}

impl Default for ProjectionResolver {
    fn default() -> Self {
        Self::new(WGS84)
    }
}

impl ProjectionResolver {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Resolves `text` into a transform, or `None` to apply no transform.
    ///
    /// Absent or blank text yields `None` without attempting resolution; any
    /// resolution failure is logged and also yields `None`.
    #[must_use]
    pub fn resolve_transform(&self, text: Option<&str>) -> Option<Transform> {
        let text = text.map(str::trim).filter(|t| !t.is_empty())?;
        match self.try_resolve_transform(text) {
            Ok(transform) => {
                debug!(
                    "Resolved projection '{}' -> '{}'",
                    transform.source_definition(),
                    transform.target_definition()
                );
                Some(transform)
            },
            Err(e) => {
                warn!("Ignoring projection definition: {e}");
                None
            },
        }
    }

    /// Resolves `text` into a transform, reporting why it could not be.
    ///
    /// # Errors
    ///
    /// Returns a [`ProjectionError`] if the definition is not recognized, names
    /// an unknown EPSG code, or is rejected by the projection engine.
    pub fn try_resolve_transform(&self, text: &str) -> Result<Transform, ProjectionError> {
        let source = to_proj_string(text)?;
        Ok(Transform::new(&source, &self.target)?)
    }
}

/// Converts a projection definition into a PROJ.4 string.
///
/// # Errors
///
/// Returns a [`ProjectionError`] if no PROJ.4 string can be derived.
///
/// # Examples
///
/// ```
/// use shapeload_core::projection::to_proj_string;
///
/// let wkt = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]],
///     PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4326"]]"#;
/// assert!(to_proj_string(wkt).unwrap().contains("+proj=longlat"));
/// assert_eq!(to_proj_string("+proj=utm +zone=33").unwrap(), "+proj=utm +zone=33");
/// ```
pub fn to_proj_string(definition: &str) -> Result<String, ProjectionError> {
    let definition = definition.trim();

    if definition.starts_with('+') {
        return Ok(definition.to_string());
    }
    if let Some(code) = authority_identifier(definition) {
        return lookup_code(code);
    }
    if Wkt::is_candidate(definition) {
        return wkt_proj_string(&Wkt::parse(definition)?);
    }

    Err(ProjectionError::Unrecognized {
        snippet: definition.chars().take(48).collect(),
    })
}

/// Resolves WKT by its top-level authority, falling back to converting its
/// elements when the code is absent or unknown.
fn wkt_proj_string(wkt: &Wkt) -> Result<String, ProjectionError> {
    if let Some(code) = wkt.authority_code() {
        match lookup_code(code) {
            Ok(proj) => return Ok(proj),
            Err(e) => debug!("{e}, converting WKT elements instead"),
        }
    }
    match wkt.to_crs()? {
        WktCrs::Epsg(code) => lookup_code(code),
        WktCrs::Proj4(proj) => Ok(proj),
    }
}

fn lookup_code(code: u32) -> Result<String, ProjectionError> {
    u16::try_from(code)
        .ok()
        .and_then(crs_definitions::from_code)
        .map(|def| def.proj4.to_string())
        .ok_or(ProjectionError::UnknownCode { code })
}

/// Parses `EPSG:<code>`.
fn authority_identifier(definition: &str) -> Option<u32> {
    let (authority, code) = definition.split_once(':')?;
    if !authority.trim().eq_ignore_ascii_case("EPSG") {
        return None;
    }
    code.trim().parse().ok()
}
