//! `shapeload-core` turns shapefile datasets into feature collections.
//!
//! A dataset can be supplied in three ways:
//! - **Locator**: a URL or path to the dataset or its `.shp` file. The `.shp`,
//!   `.dbf`, `.prj` and `.cpg` siblings are fetched concurrently.
//! - **Archive**: an in-memory zip archive holding the dataset members.
//! - **Bundle**: individually supplied buffers for each member.
//!
//! The loader never reads geometry or attribute bytes itself. It hands
//! canonical [`BinaryView`]s to a [`GeometryDecoder`] and an
//! [`AttributeDecoder`], resolves the dataset projection into a [`Transform`],
//! and pairs the decoded geometries with attribute records by position.
//!
//! Only the geometry stream is mandatory. Missing or unreadable attribute,
//! projection and code-page resources degrade to absence.

pub mod archive;
pub mod assemble;
pub mod coerce;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod options;
pub mod projection;
pub mod source;
mod wkt;

pub use archive::ZipExtractor;
pub use assemble::{Feature, FeatureCollection, combine};
pub use coerce::{BufferCoercion, BufferLike, TextDecoder, TextLike};
pub use error::{DecodeError, InputError, Result, ShapeloadError, SourceError};
pub use fetch::{FetchOptions, ObjectStoreFetcher};
pub use loader::{ProjectionSource, ShapefileLoader};
pub use options::LoaderOptions;
pub use projection::{ProjectionError, ProjectionResolver, WGS84};
pub use source::{Modality, ShapefileBundle, ShapefileInput, SourceResolver, StreamBundle};
pub use wkt::WktError;

pub use shapeload_core_common::{
    ArchiveExtractor, AttributeDecoder, BinaryView, DatasetMember, Fetcher, GeometryDecoder,
    Record, Transform,
};
