//! Loader configuration.

use crate::projection::WGS84;

/// Options controlling how datasets are assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    /// PROJ.4 definition of the CRS geometries are reprojected into.
    pub target_projection: String,
    /// Whether projection sidecars are resolved into transforms at all.
    pub reproject: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            target_projection: WGS84.to_string(),
            reproject: true,
        }
    }
}

impl LoaderOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_target_projection(mut self, definition: impl Into<String>) -> Self {
        self.target_projection = definition.into();
        self
    }

    #[must_use]
    pub fn with_reproject(mut self, reproject: bool) -> Self {
        self.reproject = reproject;
        self
    }
}
