//! The canonical binary view consumed by every decoder.

use std::fmt;
use std::ops::Deref;

use bytes::Bytes;

/// A window over a contiguous byte region.
///
/// The view records its byte offset relative to the storage it was cut from and
/// shares that storage instead of copying it. Cloning a view is cheap.
#[derive(Clone, PartialEq, Eq)]
pub struct BinaryView {
    bytes: Bytes,
    byte_offset: usize,
}

impl BinaryView {
    /// Wraps a whole region as a view with offset 0.
    #[must_use]
    pub fn new(bytes: Bytes) -> Self {
        Self {
            bytes,
            byte_offset: 0,
        }
    }

    /// Cuts a view over `byte_offset..byte_offset + byte_length` of `storage`.
    ///
    /// Returns `None` when the range does not fit inside `storage`.
    #[must_use]
    pub fn over(storage: &Bytes, byte_offset: usize, byte_length: usize) -> Option<Self> {
        let end = byte_offset.checked_add(byte_length)?;
        if end > storage.len() {
            return None;
        }
        Some(Self {
            bytes: storage.slice(byte_offset..end),
            byte_offset,
        })
    }

    /// Offset of the first byte of this view within the original storage.
    #[must_use]
    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    /// Number of bytes covered by this view.
    #[must_use]
    pub fn byte_length(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns a handle to the viewed bytes without copying them.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Returns `true` when both views cover the very same memory.
    #[must_use]
    pub fn shares_storage_with(&self, other: &BinaryView) -> bool {
        self.bytes.as_ptr() == other.bytes.as_ptr() && self.bytes.len() == other.bytes.len()
    }
}

impl Deref for BinaryView {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for BinaryView {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Bytes> for BinaryView {
    fn from(bytes: Bytes) -> Self {
        Self::new(bytes)
    }
}

impl From<Vec<u8>> for BinaryView {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for BinaryView {
    fn from(bytes: &'static [u8]) -> Self {
        Self::new(Bytes::from_static(bytes))
    }
}

impl fmt::Debug for BinaryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryView")
            .field("byte_offset", &self.byte_offset)
            .field("byte_length", &self.byte_length())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_covers_whole_region() {
        let view = BinaryView::new(Bytes::from_static(b"abcdef"));
        assert_eq!(view.byte_offset(), 0);
        assert_eq!(view.byte_length(), 6);
        assert_eq!(view.as_bytes(), b"abcdef");
    }

    #[test]
    fn over_selects_sub_range_only() {
        let storage = Bytes::from_static(b"xxheaderyy");
        let view = BinaryView::over(&storage, 2, 6).expect("range fits");
        assert_eq!(view.byte_offset(), 2);
        assert_eq!(&*view, b"header");
        assert_eq!(view.as_bytes().as_ptr(), storage[2..].as_ptr());
    }

    #[test]
    fn over_rejects_out_of_range() {
        let storage = Bytes::from_static(b"abc");
        assert!(BinaryView::over(&storage, 2, 2).is_none());
        assert!(BinaryView::over(&storage, usize::MAX, 2).is_none());
        assert!(BinaryView::over(&storage, 3, 0).is_some());
    }

    #[test]
    fn clones_share_storage() {
        let view = BinaryView::from(vec![1u8, 2, 3]);
        let copy = view.clone();
        assert!(view.shares_storage_with(&copy));

        let other = BinaryView::from(vec![1u8, 2, 3]);
        assert_eq!(view, other);
        assert!(!view.shares_storage_with(&other));
    }

    #[test]
    fn debug_omits_contents() {
        let view = BinaryView::from(&b"secret"[..]);
        let debug = format!("{view:?}");
        assert!(debug.contains("byte_length: 6"));
        assert!(!debug.contains("secret"));
    }
}
