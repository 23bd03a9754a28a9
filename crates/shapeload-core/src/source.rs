//! Classification of caller input and resolution of its byte streams.
//!
//! The caller's input is classified exactly once into a [`Modality`]. Each
//! modality is then reduced to a [`StreamBundle`]: the geometry stream plus the
//! optional attribute stream, projection text, and code-page text.
//!
//! Only the geometry stream is mandatory. Every optional stream degrades to
//! absence when it is missing or cannot be retrieved.

use bytes::Bytes;
use log::{debug, warn};

use shapeload_core_common::{
    ArchiveExtractor, BinaryView, DatasetMember, Fetcher, dataset_base, sibling_location,
};

use crate::coerce::{BufferCoercion, BufferLike, TextLike};
use crate::error::{InputError, Result, ShapeloadError, SourceError};

/// Named buffers supplied directly by the caller.
#[derive(Debug, Clone, Default)]
pub struct ShapefileBundle {
    pub shp: Option<BufferLike>,
    pub dbf: Option<BufferLike>,
    pub prj: Option<TextLike>,
    pub cpg: Option<TextLike>,
}

impl ShapefileBundle {
    pub fn new(shp: impl Into<BufferLike>) -> Self {
        Self {
            shp: Some(shp.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_dbf(mut self, dbf: impl Into<BufferLike>) -> Self {
        self.dbf = Some(dbf.into());
        self
    }

    #[must_use]
    pub fn with_prj(mut self, prj: impl Into<TextLike>) -> Self {
        self.prj = Some(prj.into());
        self
    }

    #[must_use]
    pub fn with_cpg(mut self, cpg: impl Into<TextLike>) -> Self {
        self.cpg = Some(cpg.into());
        self
    }
}

/// The caller's input, in one of the accepted shapes.
#[derive(Debug, Clone)]
pub enum ShapefileInput {
    /// A URL or filesystem path to the dataset or its `.shp` file.
    Location(String),
    /// A zip archive holding the dataset.
    Archive(BufferLike),
    /// Individually supplied buffers.
    Bundle(ShapefileBundle),
}

impl From<&str> for ShapefileInput {
    fn from(location: &str) -> Self {
        Self::Location(location.to_string())
    }
}

impl From<String> for ShapefileInput {
    fn from(location: String) -> Self {
        Self::Location(location)
    }
}

impl From<BufferLike> for ShapefileInput {
    fn from(archive: BufferLike) -> Self {
        Self::Archive(archive)
    }
}

impl From<Bytes> for ShapefileInput {
    fn from(archive: Bytes) -> Self {
        Self::Archive(archive.into())
    }
}

impl From<Vec<u8>> for ShapefileInput {
    fn from(archive: Vec<u8>) -> Self {
        Self::Archive(archive.into())
    }
}

impl From<BinaryView> for ShapefileInput {
    fn from(archive: BinaryView) -> Self {
        Self::Archive(archive.into())
    }
}

impl From<ShapefileBundle> for ShapefileInput {
    fn from(bundle: ShapefileBundle) -> Self {
        Self::Bundle(bundle)
    }
}

/// Object-bundle input after coercion.
#[derive(Debug, Clone)]
pub struct ObjectBundle {
    pub shp: BinaryView,
    pub dbf: Option<BinaryView>,
    pub prj: Option<String>,
    pub cpg: Option<String>,
}

/// How a dataset was supplied, decided once per load.
#[derive(Debug, Clone)]
pub enum Modality {
    /// Dataset base locator, with any `.shp` suffix already stripped.
    UrlBase(String),
    ArchiveBuffer(BinaryView),
    ObjectBundle(ObjectBundle),
}

impl Modality {
    /// Classifies `input`, coercing every supplied buffer.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::UnsupportedInputShape`] for a bundle without a
    /// geometry buffer and [`InputError::InvalidBufferKind`] for buffers that
    /// cannot be viewed.
    pub fn classify(input: ShapefileInput, coercion: &BufferCoercion) -> Result<Self> {
        match input {
            ShapefileInput::Location(location) => Ok(Self::UrlBase(dataset_base(&location))),
            ShapefileInput::Archive(archive) => {
                Ok(Self::ArchiveBuffer(coercion.to_binary_view(Some(archive))?))
            },
            ShapefileInput::Bundle(ShapefileBundle { shp: None, .. }) => {
                Err(InputError::UnsupportedInputShape.into())
            },
            ShapefileInput::Bundle(bundle) => Ok(Self::ObjectBundle(ObjectBundle {
                shp: coercion.to_binary_view(bundle.shp)?,
                dbf: bundle
                    .dbf
                    .map(|dbf| coercion.to_binary_view(Some(dbf)))
                    .transpose()?,
                prj: coercion.to_text(bundle.prj),
                cpg: coercion.to_text(bundle.cpg),
            })),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::UrlBase(_) => "url",
            Self::ArchiveBuffer(_) => "archive",
            Self::ObjectBundle(_) => "object",
        }
    }
}

/// The byte streams of one dataset.
#[derive(Debug, Clone)]
pub struct StreamBundle {
    pub geometry: BinaryView,
    pub attributes: Option<BinaryView>,
    pub projection: Option<String>,
    pub encoding: Option<String>,
}

/// The `.shp` stream and `.prj` text, fetched together.
#[derive(Debug, Clone)]
pub struct GeometrySources {
    pub geometry: BinaryView,
    pub projection: Option<String>,
}

/// The `.dbf` stream and `.cpg` text, fetched together.
#[derive(Debug, Clone, Default)]
pub struct AttributeSources {
    pub attributes: Option<BinaryView>,
    pub encoding: Option<String>,
}

/// Produces [`StreamBundle`]s from classified input.
#[derive(Debug, Clone)]
pub struct SourceResolver<F, X> {
    fetcher: F,
    extractor: X,
    coercion: BufferCoercion,
}

impl<F, X> SourceResolver<F, X> {
    pub fn new(fetcher: F, extractor: X, coercion: BufferCoercion) -> Self {
        Self {
            fetcher,
            extractor,
            coercion,
        }
    }

    #[must_use]
    pub fn coercion(&self) -> &BufferCoercion {
        &self.coercion
    }

    pub fn with_fetcher<F2>(self, fetcher: F2) -> SourceResolver<F2, X> {
        SourceResolver {
            fetcher,
            extractor: self.extractor,
            coercion: self.coercion,
        }
    }

    pub fn with_extractor<X2>(self, extractor: X2) -> SourceResolver<F, X2> {
        SourceResolver {
            fetcher: self.fetcher,
            extractor,
            coercion: self.coercion,
        }
    }
}

impl<F: Fetcher, X: ArchiveExtractor> SourceResolver<F, X> {
    /// Resolves every stream of `modality`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingGeometryMember`] if no geometry stream
    /// exists, or the fetch/extraction error of the geometry stream.
    pub async fn resolve(&self, modality: Modality) -> Result<StreamBundle> {
        match modality {
            Modality::UrlBase(base) => {
                let (geometry, attributes) = tokio::join!(
                    self.fetch_geometry_pair(&base),
                    self.fetch_attribute_pair(&base)
                );
                let geometry = geometry?;
                Ok(StreamBundle {
                    geometry: geometry.geometry,
                    attributes: attributes.attributes,
                    projection: geometry.projection,
                    encoding: attributes.encoding,
                })
            },
            Modality::ArchiveBuffer(archive) => self.extract_archive(&archive).await,
            Modality::ObjectBundle(bundle) => Ok(StreamBundle {
                geometry: bundle.shp,
                attributes: bundle.dbf,
                projection: bundle.prj,
                encoding: bundle.cpg,
            }),
        }
    }

    /// Fetches the `.shp` and `.prj` siblings of `base` concurrently.
    ///
    /// # Errors
    ///
    /// Fails if the geometry resource is absent or cannot be fetched. The
    /// projection resource never causes a failure.
    pub async fn fetch_geometry_pair(&self, base: &str) -> Result<GeometrySources> {
        let member = DatasetMember::Geometry;
        let (geometry, projection) = tokio::join!(
            self.fetcher.fetch(base, member),
            self.fetch_optional_text(base, DatasetMember::Projection)
        );

        let location = sibling_location(base, member);
        let geometry = geometry
            .map_err(|source| SourceError::Fetch {
                member,
                location: location.clone(),
                source,
            })?
            .ok_or_else(|| ShapeloadError::missing_geometry(location))?;

        Ok(GeometrySources {
            geometry,
            projection,
        })
    }

    /// Fetches the `.dbf` and `.cpg` siblings of `base` concurrently.
    pub async fn fetch_attribute_pair(&self, base: &str) -> AttributeSources {
        let (attributes, encoding) = tokio::join!(
            self.fetch_optional(base, DatasetMember::Attributes),
            self.fetch_optional_text(base, DatasetMember::CodePage)
        );
        AttributeSources {
            attributes,
            encoding,
        }
    }

    /// Extracts the `.shp`, `.dbf` and `.prj` members of `archive` concurrently.
    ///
    /// Archives are not searched for a `.cpg` member.
    ///
    /// # Errors
    ///
    /// Fails if the archive holds no geometry member or it cannot be read.
    pub async fn extract_archive(&self, archive: &BinaryView) -> Result<StreamBundle> {
        let member = DatasetMember::Geometry;
        let (geometry, attributes, projection) = tokio::join!(
            self.extractor.extract_member(archive, member),
            self.extract_optional(archive, DatasetMember::Attributes),
            self.extract_optional(archive, DatasetMember::Projection)
        );

        let geometry = geometry
            .map_err(|source| SourceError::Archive { member, source })?
            .ok_or_else(|| ShapeloadError::missing_geometry("archive"))?;

        Ok(StreamBundle {
            geometry,
            attributes,
            projection: self.coercion.to_text(projection.map(TextLike::from)),
            encoding: None,
        })
    }

    async fn fetch_optional(&self, base: &str, member: DatasetMember) -> Option<BinaryView> {
        match self.fetcher.fetch(base, member).await {
            Ok(Some(view)) => Some(view),
            Ok(None) => {
                debug!("No .{member} resource next to {base}");
                None
            },
            Err(e) => {
                warn!("Ignoring .{member} resource next to {base}: {e:#}");
                None
            },
        }
    }

    async fn fetch_optional_text(&self, base: &str, member: DatasetMember) -> Option<String> {
        let view = self.fetch_optional(base, member).await;
        self.coercion.to_text(view.map(TextLike::from))
    }

    async fn extract_optional(
        &self,
        archive: &BinaryView,
        member: DatasetMember,
    ) -> Option<BinaryView> {
        match self.extractor.extract_member(archive, member).await {
            Ok(view) => view,
            Err(e) => {
                warn!("Ignoring unreadable .{member} archive member: {e:#}");
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_strips_geometry_suffix() {
        let modality =
            Modality::classify("data.shp".into(), &BufferCoercion::default()).unwrap();
        assert!(matches!(modality, Modality::UrlBase(ref base) if base == "data"));
        assert_eq!(modality.name(), "url");
    }

    #[test]
    fn buffer_input_is_archive() {
        let modality =
            Modality::classify(vec![0x50u8, 0x4b].into(), &BufferCoercion::default()).unwrap();
        assert!(matches!(modality, Modality::ArchiveBuffer(ref view) if view.byte_length() == 2));
        assert_eq!(modality.name(), "archive");
    }

    #[test]
    fn bundle_without_geometry_is_unsupported() {
        let bundle = ShapefileBundle {
            dbf: Some(vec![1u8].into()),
            ..ShapefileBundle::default()
        };
        let err = Modality::classify(bundle.into(), &BufferCoercion::default()).unwrap_err();
        assert!(matches!(
            err,
            ShapeloadError::Input(InputError::UnsupportedInputShape)
        ));
    }

    #[test]
    fn bundle_fields_are_coerced() {
        let bundle = ShapefileBundle::new(vec![1u8, 2, 3])
            .with_dbf(Bytes::from_static(b"dbf"))
            .with_prj(Bytes::from_static(b"\xEF\xBB\xBFEPSG:4326"))
            .with_cpg("UTF-8");
        let modality = Modality::classify(bundle.into(), &BufferCoercion::default()).unwrap();

        let Modality::ObjectBundle(bundle) = modality else {
            panic!("expected object bundle");
        };
        assert_eq!(bundle.shp.as_bytes(), &[1u8, 2, 3]);
        assert_eq!(bundle.dbf.unwrap().as_bytes(), b"dbf");
        assert_eq!(bundle.prj.as_deref(), Some("EPSG:4326"));
        assert_eq!(bundle.cpg.as_deref(), Some("UTF-8"));
    }

    #[test]
    fn bundle_with_invalid_dbf_window_fails() {
        let bundle = ShapefileBundle::new(vec![1u8])
            .with_dbf(BufferLike::typed(Bytes::from_static(b"ab"), 1, 5));
        let err = Modality::classify(bundle.into(), &BufferCoercion::default()).unwrap_err();
        assert!(matches!(
            err,
            ShapeloadError::Input(InputError::InvalidBufferKind { .. })
        ));
    }
}
