//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Barrier;
use shapeload_core::{BinaryView, ShapefileLoader};
use shapeload_core_common::{
    AttributeDecoder, DatasetMember, Fetcher, GeometryDecoder, Record, Transform, sibling_location,
};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// What the decoders saw during a load.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    geometry_calls: Arc<AtomicUsize>,
    attribute_calls: Arc<AtomicUsize>,
    transforms: Arc<Mutex<Vec<Option<Transform>>>>,
    encodings: Arc<Mutex<Vec<Option<String>>>>,
    events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn geometry_calls(&self) -> usize {
        self.geometry_calls.load(Ordering::SeqCst)
    }

    pub fn attribute_calls(&self) -> usize {
        self.attribute_calls.load(Ordering::SeqCst)
    }

    /// The transform passed to the most recent geometry decode.
    pub fn last_transform(&self) -> Option<Transform> {
        self.transforms.lock().unwrap().last().cloned().flatten()
    }

    /// The encoding passed to the most recent attribute decode.
    pub fn last_encoding(&self) -> Option<String> {
        self.encodings.lock().unwrap().last().cloned().flatten()
    }

    pub fn record_event(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    /// Fetch completions and decoder calls, in the order they happened.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

/// Decodes every byte of the geometry stream into one geometry.
///
/// A stream starting with `FAIL` is rejected.
#[derive(Debug, Clone)]
pub struct ByteShapes(pub Recorder);

impl GeometryDecoder for ByteShapes {
    type Geometry = u8;

    fn decode(&self, view: &BinaryView, transform: Option<&Transform>) -> Result<Vec<u8>> {
        self.0.geometry_calls.fetch_add(1, Ordering::SeqCst);
        self.0.record_event("decode geometry");
        self.0.transforms.lock().unwrap().push(transform.cloned());
        if view.starts_with(b"FAIL") {
            bail!("corrupt shape header");
        }
        Ok(view.to_vec())
    }
}

/// Decodes every byte of the attribute stream into a record `{"value": byte}`.
#[derive(Debug, Clone)]
pub struct ByteTable(pub Recorder);

impl AttributeDecoder for ByteTable {
    fn decode(&self, view: &BinaryView, encoding: Option<&str>) -> Result<Vec<Record>> {
        self.0.attribute_calls.fetch_add(1, Ordering::SeqCst);
        self.0.record_event("decode attributes");
        self.0
            .encodings
            .lock()
            .unwrap()
            .push(encoding.map(str::to_string));
        Ok(view.iter().map(|byte| record(*byte)).collect())
    }
}

pub fn record(value: u8) -> Record {
    let mut record = Record::new();
    record.insert("value".to_string(), json!(value));
    record
}

#[derive(Debug, Clone)]
enum Resource {
    Bytes(Vec<u8>),
    Fail(String),
}

/// In-memory fetcher keyed by derived sibling locator.
#[derive(Debug, Clone, Default)]
pub struct MapFetcher {
    resources: HashMap<String, Resource>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl MapFetcher {
    pub fn with(mut self, location: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.resources
            .insert(location.to_string(), Resource::Bytes(bytes.into()));
        self
    }

    pub fn failing(mut self, location: &str, message: &str) -> Self {
        self.resources
            .insert(location.to_string(), Resource::Fail(message.to_string()));
        self
    }

    /// Every locator fetched so far, sorted.
    pub fn requested(&self) -> Vec<String> {
        let mut requested = self.requested.lock().unwrap().clone();
        requested.sort();
        requested
    }
}

#[async_trait]
impl Fetcher for MapFetcher {
    async fn fetch(&self, base: &str, member: DatasetMember) -> Result<Option<BinaryView>> {
        let location = sibling_location(base, member);
        self.requested.lock().unwrap().push(location.clone());
        match self.resources.get(&location) {
            None => Ok(None),
            Some(Resource::Bytes(bytes)) => Ok(Some(BinaryView::from(bytes.clone()))),
            Some(Resource::Fail(message)) => Err(anyhow!("{message}")),
        }
    }
}

/// Fetcher whose fetches all wait at a barrier until `parties` of them are in
/// flight, then finish after an optional per-locator delay.
#[derive(Debug, Clone)]
pub struct GatedFetcher {
    inner: MapFetcher,
    barrier: Arc<Barrier>,
    delays: HashMap<String, Duration>,
    recorder: Recorder,
}

impl GatedFetcher {
    pub fn new(inner: MapFetcher, parties: usize, recorder: Recorder) -> Self {
        Self {
            inner,
            barrier: Arc::new(Barrier::new(parties)),
            delays: HashMap::new(),
            recorder,
        }
    }

    pub fn delaying(mut self, location: &str, delay: Duration) -> Self {
        self.delays.insert(location.to_string(), delay);
        self
    }
}

#[async_trait]
impl Fetcher for GatedFetcher {
    async fn fetch(&self, base: &str, member: DatasetMember) -> Result<Option<BinaryView>> {
        let location = sibling_location(base, member);
        self.barrier.wait().await;
        if let Some(delay) = self.delays.get(&location) {
            tokio::time::sleep(*delay).await;
        }
        let fetched = self.inner.fetch(base, member).await;
        self.recorder.record_event(format!("fetched {location}"));
        fetched
    }
}

pub type TestLoader = ShapefileLoader<ByteShapes, ByteTable, MapFetcher>;

/// A loader over `fetcher`, with the recorder observing its decoders.
pub fn loader(fetcher: MapFetcher) -> (TestLoader, Recorder) {
    let recorder = Recorder::default();
    let loader = ShapefileLoader::new(ByteShapes(recorder.clone()), ByteTable(recorder.clone()))
        .with_fetcher(fetcher);
    (loader, recorder)
}

/// Builds an uncompressed zip archive holding `entries`.
pub fn zip_archive(entries: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer.start_file(*name, options)?;
        writer.write_all(contents)?;
    }
    Ok(writer.finish()?.into_inner())
}
