//! Coercion of caller-supplied buffers and text into canonical forms.
//!
//! Callers hand over bytes in several shapes: a whole region, an existing
//! [`BinaryView`], or a typed window over a larger backing allocation. Every
//! shape is reduced to a [`BinaryView`] here, and textual artifacts (`.prj`,
//! `.cpg`) are reduced to `String`s.

use bytes::Bytes;
use log::warn;

use shapeload_core_common::BinaryView;

use crate::error::{Result, ShapeloadError};

/// A byte-addressable value supplied by the caller.
#[derive(Debug, Clone)]
pub enum BufferLike {
    /// A raw binary region, viewed whole.
    Raw(Bytes),
    /// A value that already is a binary view.
    View(BinaryView),
    /// A typed window over part of a backing region.
    Typed {
        /// The backing allocation, which may hold unrelated data
        buffer: Bytes,
        /// Offset of the window within `buffer`
        byte_offset: usize,
        /// Length of the window
        byte_length: usize,
    },
}

impl BufferLike {
    /// Describes a window over `buffer`.
    #[must_use]
    pub fn typed(buffer: Bytes, byte_offset: usize, byte_length: usize) -> Self {
        Self::Typed {
            buffer,
            byte_offset,
            byte_length,
        }
    }
}

impl From<Bytes> for BufferLike {
    fn from(bytes: Bytes) -> Self {
        Self::Raw(bytes)
    }
}

impl From<Vec<u8>> for BufferLike {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Raw(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for BufferLike {
    fn from(bytes: &'static [u8]) -> Self {
        Self::Raw(Bytes::from_static(bytes))
    }
}

impl From<BinaryView> for BufferLike {
    fn from(view: BinaryView) -> Self {
        Self::View(view)
    }
}

/// A value expected to carry text, either directly or as encoded bytes.
#[derive(Debug, Clone)]
pub enum TextLike {
    Text(String),
    Buffer(BufferLike),
}

impl From<&str> for TextLike {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for TextLike {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<BufferLike> for TextLike {
    fn from(buffer: BufferLike) -> Self {
        Self::Buffer(buffer)
    }
}

impl From<Bytes> for TextLike {
    fn from(bytes: Bytes) -> Self {
        Self::Buffer(bytes.into())
    }
}

impl From<Vec<u8>> for TextLike {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Buffer(bytes.into())
    }
}

impl From<BinaryView> for TextLike {
    fn from(view: BinaryView) -> Self {
        Self::Buffer(view.into())
    }
}

/// The fixed text decoding used for textual sidecar files: UTF-8, with
/// malformed sequences replaced and a leading byte-order mark removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDecoder;

impl TextDecoder {
    const BOM: &'static [u8] = b"\xEF\xBB\xBF";

    #[must_use]
    pub fn decode(&self, bytes: &[u8]) -> String {
        let bytes = bytes.strip_prefix(Self::BOM).unwrap_or(bytes);
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// Normalizes buffers into [`BinaryView`]s and text into `String`s.
#[derive(Debug, Clone, Default)]
pub struct BufferCoercion {
    decoder: TextDecoder,
}

impl BufferCoercion {
    #[must_use]
    pub fn new(decoder: TextDecoder) -> Self {
        Self { decoder }
    }

    #[must_use]
    pub fn decoder(&self) -> &TextDecoder {
        &self.decoder
    }

    /// Reduces `value` to a [`BinaryView`] without copying its bytes.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::InvalidBufferKind`](crate::error::InputError::InvalidBufferKind)
    /// if `value` is absent or describes a window that does not fit inside its
    /// backing region.
    pub fn to_binary_view(&self, value: Option<BufferLike>) -> Result<BinaryView> {
        match value {
            None => Err(ShapeloadError::invalid_buffer("no buffer was supplied")),
            Some(BufferLike::View(view)) => Ok(view),
            Some(BufferLike::Raw(bytes)) => Ok(BinaryView::new(bytes)),
            Some(BufferLike::Typed {
                buffer,
                byte_offset,
                byte_length,
            }) => BinaryView::over(&buffer, byte_offset, byte_length).ok_or_else(|| {
                ShapeloadError::invalid_buffer(format!(
                    "window {byte_offset}+{byte_length} exceeds backing buffer of {} bytes",
                    buffer.len()
                ))
            }),
        }
    }

    /// Reduces `value` to text, decoding bytes with the fixed decoder.
    ///
    /// Returns `None` for absent input and for byte windows that cannot be
    /// viewed.
    #[must_use]
    pub fn to_text(&self, value: Option<TextLike>) -> Option<String> {
        match value? {
            TextLike::Text(text) => Some(text),
            TextLike::Buffer(buffer) => match self.to_binary_view(Some(buffer)) {
                Ok(view) => Some(self.decoder.decode(&view)),
                Err(e) => {
                    warn!("Ignoring unreadable text buffer: {e}");
                    None
                },
            },
        }
    }
}
