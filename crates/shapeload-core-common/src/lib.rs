//! Common types and traits shared across `shapeload` crates.
//!
//! This crate provides the abstractions that sit between the `shapeload-core`
//! assembly layer and the collaborators it drives (fetchers, archive
//! extractors, geometry and attribute decoders), so implementations can live in
//! separate crates without depending on the core.

pub mod io;
pub mod locator;
pub mod members;
pub mod transform;
pub mod view;

// Re-export commonly used types
pub use io::{ArchiveExtractor, AttributeDecoder, Fetcher, GeometryDecoder, Record};
pub use locator::{dataset_base, sibling_location};
pub use members::DatasetMember;
pub use transform::{Transform, TransformError};
pub use view::BinaryView;
