//! Default [`ArchiveExtractor`] for zip archives.

use std::io::{Cursor, Read, Seek};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::{debug, warn};
use zip::ZipArchive;

use shapeload_core_common::{ArchiveExtractor, BinaryView, DatasetMember};

/// Entries under this prefix are resource forks written by macOS.
const MACOS_METADATA_PREFIX: &str = "__MACOSX/";

/// Extracts dataset members from zip archives.
///
/// A member is the first entry whose name ends with the member's suffix,
/// compared case-insensitively. Directory entries and macOS metadata are never
/// matched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl ZipExtractor {
    /// Lists the entry names `member` would be chosen from, in archive order.
    ///
    /// # Errors
    ///
    /// Returns an error if `archive` is not a readable zip archive.
    pub fn candidates(archive: &BinaryView, member: DatasetMember) -> Result<Vec<String>> {
        let archive = ZipArchive::new(Cursor::new(archive.clone()))
            .context("Failed to read zip archive")?;
        Ok(matching_names(&archive, member))
    }

    fn extract(archive: &BinaryView, member: DatasetMember) -> Result<Option<BinaryView>> {
        let archive_length = archive.byte_length();
        let mut archive = ZipArchive::new(Cursor::new(archive.clone()))
            .context("Failed to read zip archive")?;

        let names = matching_names(&archive, member);
        let Some(name) = names.first() else {
            debug!("Archive has no .{member} member");
            return Ok(None);
        };
        if names.len() > 1 {
            warn!(
                "Archive has {} .{member} members, using '{name}'",
                names.len()
            );
        }

        let mut file = archive
            .by_name(name)
            .with_context(|| format!("Failed to open archive member '{name}'"))?;
        let declared = file.size();
        let capacity = usize::try_from(declared)
            .unwrap_or(usize::MAX)
            .min(archive_length);
        let mut bytes = Vec::with_capacity(capacity);
        file.by_ref()
            .take(declared.saturating_add(1))
            .read_to_end(&mut bytes)
            .with_context(|| format!("Failed to decompress archive member '{name}'"))?;
        if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > declared {
            bail!("Archive member '{name}' exceeds its declared size of {declared} bytes");
        }

        debug!("Extracted '{name}' ({} bytes)", bytes.len());
        Ok(Some(BinaryView::from(bytes)))
    }
}

fn matching_names<R: Read + Seek>(archive: &ZipArchive<R>, member: DatasetMember) -> Vec<String> {
    archive
        .file_names()
        .filter(|name| !name.ends_with('/') && !name.starts_with(MACOS_METADATA_PREFIX))
        .filter(|name| member.matches_name(name))
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl ArchiveExtractor for ZipExtractor {
    async fn extract_member(
        &self,
        archive: &BinaryView,
        member: DatasetMember,
    ) -> Result<Option<BinaryView>> {
        let archive = archive.clone();
        tokio::task::spawn_blocking(move || Self::extract(&archive, member))
            .await
            .context("Archive extraction task failed")?
    }
}
