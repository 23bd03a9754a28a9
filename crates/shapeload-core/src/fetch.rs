//! Default [`Fetcher`] backed by `object_store` and the local filesystem.
//!
//! Supported locators:
//!
//! - `http://` and `https://`: fetched with an HTTP object store rooted at the
//!   URL's origin. Query strings are not forwarded.
//! - `s3://` and `s3a://`: fetched with an S3 object store configured from the
//!   `AWS_*` environment variables.
//! - `gs://`: fetched with a Google Cloud Storage object store configured from
//!   the `GOOGLE_*` environment variables.
//! - `az://`, `azure://`, `abfs://` and `abfss://`: fetched with an Azure Blob
//!   Storage object store configured from the `AZURE_*` environment variables.
//! - `file://` URLs and bare filesystem paths: read from disk.

use std::env;
use std::io::ErrorKind;
use std::path::Path as FsPath;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use log::debug;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::http::HttpBuilder;
use object_store::path::Path;
use object_store::{ClientOptions, ObjectStore};
use url::Url;

use shapeload_core_common::{BinaryView, DatasetMember, Fetcher, sibling_location};

/// Transport configuration for [`ObjectStoreFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Allow plain `http://` locators.
    pub allow_http: bool,
    /// Send unsigned S3, GCS and Azure requests. `None` skips signing only
    /// when the provider's credentials are absent from the environment.
    pub skip_signature: Option<bool>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            allow_http: true,
            skip_signature: None,
        }
    }
}

impl FetchOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_allow_http(mut self, allow_http: bool) -> Self {
        self.allow_http = allow_http;
        self
    }

    #[must_use]
    pub fn with_skip_signature(mut self, skip_signature: bool) -> Self {
        self.skip_signature = Some(skip_signature);
        self
    }
}

/// Fetches sibling resources over HTTP(S), from cloud object storage, or from
/// the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct ObjectStoreFetcher {
    options: FetchOptions,
}

impl ObjectStoreFetcher {
    #[must_use]
    pub fn new(options: FetchOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Fetches the resource at `location`, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the locator is unsupported or the transport fails.
    pub async fn fetch_location(&self, location: &str) -> Result<Option<BinaryView>> {
        if !location.contains("://") {
            return read_local(FsPath::new(location)).await;
        }

        let url = Url::parse(location).with_context(|| format!("Invalid URL '{location}'"))?;
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| anyhow!("'{location}' is not a local file path"))?;
                read_local(&path).await
            },
            "http" | "https" => {
                let store = self.http_store(&url)?;
                read_object(store, &url).await
            },
            "s3" | "s3a" => {
                let store = self.s3_store(&url)?;
                read_object(store, &url).await
            },
            "gs" => {
                let store = self.gcs_store(&url)?;
                read_object(store, &url).await
            },
            "az" | "azure" | "abfs" | "abfss" => {
                let store = self.azure_store(&url)?;
                read_object(store, &url).await
            },
            scheme => bail!("Unsupported URL scheme '{scheme}' in '{location}'"),
        }
    }

    fn http_store(&self, url: &Url) -> Result<Arc<dyn ObjectStore>> {
        let host = url
            .host_str()
            .with_context(|| format!("URL has no host: {url}"))?;
        let authority = match url.port_or_known_default() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let base_url = format!("{}://{authority}", url.scheme());

        let store = HttpBuilder::new()
            .with_url(base_url.clone())
            .with_client_options(ClientOptions::new().with_allow_http(self.options.allow_http))
            .build()
            .with_context(|| format!("Failed to build HTTP store for {base_url}"))?;
        Ok(Arc::new(store))
    }

    fn s3_store(&self, url: &Url) -> Result<Arc<dyn ObjectStore>> {
        let bucket = url
            .host_str()
            .with_context(|| format!("S3 URL has no bucket: {url}"))?;

        let region = env::var("AWS_REGION")
            .or_else(|_| env::var("AWS_DEFAULT_REGION"))
            .unwrap_or_else(|_| "us-east-1".to_string());

        let skip_signature = self.options.skip_signature.unwrap_or_else(|| {
            env::var("AWS_ACCESS_KEY_ID").is_err() || env::var("AWS_SECRET_ACCESS_KEY").is_err()
        });

        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_region(region)
            .with_skip_signature(skip_signature)
            .build()
            .with_context(|| format!("Failed to build S3 store for bucket '{bucket}'"))?;
        Ok(Arc::new(store))
    }

    fn gcs_store(&self, url: &Url) -> Result<Arc<dyn ObjectStore>> {
        let bucket = url
            .host_str()
            .with_context(|| format!("GCS URL has no bucket: {url}"))?;

        let skip_signature = self
            .options
            .skip_signature
            .unwrap_or_else(|| !any_env_var_set(GCP_CREDENTIAL_VARS));

        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .with_skip_signature(skip_signature)
            .build()
            .with_context(|| format!("Failed to build GCS store for bucket '{bucket}'"))?;
        Ok(Arc::new(store))
    }

    fn azure_store(&self, url: &Url) -> Result<Arc<dyn ObjectStore>> {
        let skip_signature = self
            .options
            .skip_signature
            .unwrap_or_else(|| !any_env_var_set(AZURE_CREDENTIAL_VARS));

        let store = MicrosoftAzureBuilder::from_env()
            .with_url(url.as_str())
            .with_skip_signature(skip_signature)
            .build()
            .with_context(|| format!("Failed to build Azure store for {url}"))?;
        Ok(Arc::new(store))
    }
}

const GCP_CREDENTIAL_VARS: &[&str] = &[
    "GOOGLE_APPLICATION_CREDENTIALS",
    "GOOGLE_SERVICE_ACCOUNT",
    "GOOGLE_SERVICE_ACCOUNT_PATH",
    "GOOGLE_SERVICE_ACCOUNT_KEY",
];

const AZURE_CREDENTIAL_VARS: &[&str] = &[
    "AZURE_STORAGE_CONNECTION_STRING",
    "AZURE_STORAGE_ACCOUNT_KEY",
    "AZURE_STORAGE_ACCESS_KEY",
    "AZURE_STORAGE_SAS_KEY",
    "AZURE_STORAGE_TOKEN",
    "AZURE_CLIENT_SECRET",
    "AZURE_CLIENT_ID",
];

fn any_env_var_set(keys: &[&str]) -> bool {
    keys.iter()
        .any(|key| env::var(key).is_ok_and(|value| !value.is_empty()))
}

#[async_trait]
impl Fetcher for ObjectStoreFetcher {
    async fn fetch(&self, base: &str, member: DatasetMember) -> Result<Option<BinaryView>> {
        let location = sibling_location(base, member);
        debug!("Fetching {location}");
        self.fetch_location(&location).await
    }
}

async fn read_local(path: &FsPath) -> Result<Option<BinaryView>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(BinaryView::from(bytes))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

async fn read_object(store: Arc<dyn ObjectStore>, url: &Url) -> Result<Option<BinaryView>> {
    let path = Path::from_url_path(url.path())
        .with_context(|| format!("Invalid object path in {url}"))?;

    let result = match store.get(&path).await {
        Ok(result) => result,
        Err(object_store::Error::NotFound { .. }) => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to fetch {url}")),
    };

    let bytes = result
        .bytes()
        .await
        .with_context(|| format!("Failed to read body of {url}"))?;
    Ok(Some(BinaryView::new(bytes)))
}
