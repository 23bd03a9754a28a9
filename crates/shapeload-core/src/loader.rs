//! The caller-facing loader.
//!
//! [`ShapefileLoader`] owns the decoders and the byte-source collaborators and
//! drives a load from classification to assembly.

use bytes::Bytes;
use log::{debug, info};

use shapeload_core_common::{
    ArchiveExtractor, AttributeDecoder, BinaryView, Fetcher, GeometryDecoder, Record, Transform,
};

use crate::archive::ZipExtractor;
use crate::assemble::{FeatureCollection, combine};
use crate::coerce::{BufferCoercion, BufferLike, TextLike};
use crate::error::{DecodeError, Result};
use crate::fetch::ObjectStoreFetcher;
use crate::options::LoaderOptions;
use crate::projection::ProjectionResolver;
use crate::source::{Modality, ShapefileInput, SourceResolver, StreamBundle};

/// Projection information accepted by [`ShapefileLoader::parse_shp`].
#[derive(Debug, Clone)]
pub enum ProjectionSource {
    /// A definition still to be resolved, as text or bytes.
    Definition(TextLike),
    /// A transform the caller already built.
    Transform(Transform),
}

impl From<&str> for ProjectionSource {
    fn from(definition: &str) -> Self {
        Self::Definition(definition.into())
    }
}

impl From<String> for ProjectionSource {
    fn from(definition: String) -> Self {
        Self::Definition(definition.into())
    }
}

impl From<TextLike> for ProjectionSource {
    fn from(definition: TextLike) -> Self {
        Self::Definition(definition)
    }
}

impl From<Bytes> for ProjectionSource {
    fn from(definition: Bytes) -> Self {
        Self::Definition(definition.into())
    }
}

impl From<Transform> for ProjectionSource {
    fn from(transform: Transform) -> Self {
        Self::Transform(transform)
    }
}

/// Loads shapefile datasets into feature collections.
///
/// `G` decodes the geometry stream and `A` the attribute table. Byte sources
/// are retrieved with `F` for URL input and `X` for archive input.
///
/// # Examples
///
/// ```no_run
/// # use shapeload_core::ShapefileLoader;
/// # use shapeload_core_common::{AttributeDecoder, BinaryView, GeometryDecoder, Record, Transform};
/// # struct Shapes;
/// # impl GeometryDecoder for Shapes {
/// #     type Geometry = serde_json::Value;
/// #     fn decode(&self, _: &BinaryView, _: Option<&Transform>) -> anyhow::Result<Vec<Self::Geometry>> { Ok(vec![]) }
/// # }
/// # struct Table;
/// # impl AttributeDecoder for Table {
/// #     fn decode(&self, _: &BinaryView, _: Option<&str>) -> anyhow::Result<Vec<Record>> { Ok(vec![]) }
/// # }
/// # async fn demo() -> shapeload_core::Result<()> {
/// let loader = ShapefileLoader::new(Shapes, Table);
/// let collection = loader.load("https://example.com/data/roads.shp").await?;
/// println!("{}", serde_json::to_string(&collection).unwrap_or_default());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ShapefileLoader<G, A, F = ObjectStoreFetcher, X = ZipExtractor> {
    geometry: G,
    attributes: A,
    sources: SourceResolver<F, X>,
    projection: ProjectionResolver,
    options: LoaderOptions,
}

impl<G, A> ShapefileLoader<G, A> {
    /// Creates a loader using the default fetcher and archive extractor.
    pub fn new(geometry: G, attributes: A) -> Self {
        Self::with_collaborators(
            geometry,
            attributes,
            ObjectStoreFetcher::default(),
            ZipExtractor,
        )
    }
}

impl<G, A, F, X> ShapefileLoader<G, A, F, X> {
    pub fn with_collaborators(geometry: G, attributes: A, fetcher: F, extractor: X) -> Self {
        let options = LoaderOptions::default();
        Self {
            geometry,
            attributes,
            sources: SourceResolver::new(fetcher, extractor, BufferCoercion::default()),
            projection: ProjectionResolver::new(options.target_projection.clone()),
            options,
        }
    }

    /// Replaces the fetcher used for URL input.
    pub fn with_fetcher<F2>(self, fetcher: F2) -> ShapefileLoader<G, A, F2, X> {
        ShapefileLoader {
            geometry: self.geometry,
            attributes: self.attributes,
            sources: self.sources.with_fetcher(fetcher),
            projection: self.projection,
            options: self.options,
        }
    }

    /// Replaces the extractor used for archive input.
    pub fn with_extractor<X2>(self, extractor: X2) -> ShapefileLoader<G, A, F, X2> {
        ShapefileLoader {
            geometry: self.geometry,
            attributes: self.attributes,
            sources: self.sources.with_extractor(extractor),
            projection: self.projection,
            options: self.options,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: LoaderOptions) -> Self {
        self.projection = ProjectionResolver::new(options.target_projection.clone());
        self.options = options;
        self
    }

    #[must_use]
    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    #[must_use]
    pub fn sources(&self) -> &SourceResolver<F, X> {
        &self.sources
    }

    #[must_use]
    pub fn projection(&self) -> &ProjectionResolver {
        &self.projection
    }
}

impl<G, A, F, X> ShapefileLoader<G, A, F, X>
where
    G: GeometryDecoder,
    A: AttributeDecoder,
    F: Fetcher,
    X: ArchiveExtractor,
{
    /// Loads a dataset given as a locator, an archive, or a bundle of buffers.
    ///
    /// # Errors
    ///
    /// Fails if the input has an unsupported shape, no geometry stream can be
    /// found, a mandatory resource cannot be retrieved, or a decoder fails.
    /// Optional resources that cannot be retrieved are treated as absent.
    pub async fn load(
        &self,
        input: impl Into<ShapefileInput>,
    ) -> Result<FeatureCollection<G::Geometry>> {
        let modality = Modality::classify(input.into(), self.sources.coercion())?;
        debug!("Loading {} input", modality.name());

        let collection = match modality {
            Modality::UrlBase(base) => self.load_location(&base).await?,
            modality => {
                let bundle = self.sources.resolve(modality).await?;
                self.decode_bundle(&bundle)?
            },
        };

        info!("Loaded {} features", collection.len());
        Ok(collection)
    }

    async fn load_location(&self, base: &str) -> Result<FeatureCollection<G::Geometry>> {
        debug!("Resolving sibling resources of {base}");

        let geometry = async {
            let sources = self.sources.fetch_geometry_pair(base).await?;
            let transform = self.transform_for(sources.projection.as_deref());
            self.decode_geometry(&sources.geometry, transform.as_ref())
        };
        let attributes = async {
            let sources = self.sources.fetch_attribute_pair(base).await;
            self.decode_attributes(sources.attributes.as_ref(), sources.encoding.as_deref())
        };

        let (geometries, records) = tokio::try_join!(geometry, attributes)?;
        Ok(combine(geometries, records))
    }

    /// Decodes an already resolved set of streams.
    ///
    /// # Errors
    ///
    /// Fails if either decoder fails.
    pub fn decode_bundle(&self, bundle: &StreamBundle) -> Result<FeatureCollection<G::Geometry>> {
        let transform = self.transform_for(bundle.projection.as_deref());
        let geometries = self.decode_geometry(&bundle.geometry, transform.as_ref())?;
        let records =
            self.decode_attributes(bundle.attributes.as_ref(), bundle.encoding.as_deref())?;
        Ok(combine(geometries, records))
    }

    /// Decodes a geometry stream on its own.
    ///
    /// `projection` is resolved exactly as a dataset's `.prj` sidecar would be,
    /// unless it already is a [`Transform`].
    ///
    /// # Errors
    ///
    /// Fails if `source` cannot be viewed as bytes or the decoder fails.
    pub fn parse_shp(
        &self,
        source: impl Into<BufferLike>,
        projection: Option<ProjectionSource>,
    ) -> Result<Vec<G::Geometry>> {
        let view = self.sources.coercion().to_binary_view(Some(source.into()))?;
        let transform = match projection {
            Some(ProjectionSource::Transform(transform)) => Some(transform),
            Some(ProjectionSource::Definition(text)) => {
                let text = self.sources.coercion().to_text(Some(text));
                self.transform_for(text.as_deref())
            },
            None => None,
        };
        self.decode_geometry(&view, transform.as_ref())
    }

    /// Decodes an attribute table on its own.
    ///
    /// # Errors
    ///
    /// Fails if `source` cannot be viewed as bytes or the decoder fails.
    pub fn parse_dbf(
        &self,
        source: impl Into<BufferLike>,
        encoding: Option<TextLike>,
    ) -> Result<Vec<Record>> {
        let coercion = self.sources.coercion();
        let view = coercion.to_binary_view(Some(source.into()))?;
        let encoding = coercion.to_text(encoding);
        self.attributes
            .decode(&view, encoding.as_deref())
            .map_err(|source| DecodeError::Attributes { source }.into())
    }

    fn transform_for(&self, projection: Option<&str>) -> Option<Transform> {
        if !self.options.reproject {
            if projection.is_some() {
                debug!("Reprojection disabled, ignoring projection definition");
            }
            return None;
        }
        self.projection.resolve_transform(projection)
    }

    fn decode_geometry(
        &self,
        view: &BinaryView,
        transform: Option<&Transform>,
    ) -> Result<Vec<G::Geometry>> {
        self.geometry
            .decode(view, transform)
            .map_err(|source| DecodeError::Geometry { source }.into())
    }

    fn decode_attributes(
        &self,
        view: Option<&BinaryView>,
        encoding: Option<&str>,
    ) -> Result<Option<Vec<Record>>> {
        let Some(view) = view else {
            debug!("No attribute stream, features get empty properties");
            return Ok(None);
        };
        self.attributes
            .decode(view, encoding)
            .map(Some)
            .map_err(|source| DecodeError::Attributes { source }.into())
    }
}
