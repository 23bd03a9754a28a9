//! Collaborator traits driven by the loader.
//!
//! This module defines the interfaces that fetchers, archive extractors and
//! format decoders must provide. The loader never interprets geometry or
//! attribute bytes itself; it hands [`BinaryView`]s to these implementations.

use anyhow::Result;
use async_trait::async_trait;

use crate::members::DatasetMember;
use crate::transform::Transform;
use crate::view::BinaryView;

/// One attribute record, keyed by field name.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Trait for decoding a `.shp` geometry stream.
pub trait GeometryDecoder: Send + Sync {
    /// Geometry type produced for each shape record.
    type Geometry;

    /// Decodes every shape in `view`, in file order.
    ///
    /// # Arguments
    ///
    /// * `view` - The geometry stream
    /// * `transform` - Reprojection to apply to each coordinate, if any
    fn decode(
        &self,
        view: &BinaryView,
        transform: Option<&Transform>,
    ) -> Result<Vec<Self::Geometry>>;
}

/// Trait for decoding a `.dbf` attribute table.
pub trait AttributeDecoder: Send + Sync {
    /// Decodes every record in `view`, in file order.
    ///
    /// # Arguments
    ///
    /// * `view` - The attribute stream
    /// * `encoding` - Code page name read from the `.cpg` sibling, if any
    fn decode(&self, view: &BinaryView, encoding: Option<&str>) -> Result<Vec<Record>>;
}

/// Trait for retrieving sibling resources of a dataset.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `member` next to the dataset `base`.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the resource does not exist. Transport failures are
    /// returned as errors; the loader decides whether they are fatal.
    async fn fetch(&self, base: &str, member: DatasetMember) -> Result<Option<BinaryView>>;
}

/// Trait for pulling dataset members out of an archive.
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    /// Extracts the member whose name ends with `member`'s suffix, ignoring case.
    ///
    /// When several entries match, the first in archive order is extracted.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when no archive entry matches.
    async fn extract_member(
        &self,
        archive: &BinaryView,
        member: DatasetMember,
    ) -> Result<Option<BinaryView>>;
}
