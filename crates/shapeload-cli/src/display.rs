//! Display utilities for formatting CLI output.
//!
//! This module provides table row structures and formatting functions
//! for presenting resolved shapefile datasets in a human-readable format.

use tabled::{Table, Tabled};

use shapeload_core::{BinaryView, DatasetMember, StreamBundle};

/// Everything `info` learned about a dataset without decoding it.
#[derive(Debug)]
pub struct DatasetReport {
    /// The dataset as named on the command line.
    pub dataset: String,
    /// How the dataset was supplied (`url`, `archive` or `object`).
    pub modality: &'static str,
    /// The resolved member streams.
    pub streams: StreamBundle,
    /// Outcome of resolving the projection definition.
    pub projection: ProjectionStatus,
}

/// Outcome of projection resolution, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionStatus {
    /// No projection definition was found.
    Absent,
    /// The definition resolved to a transform.
    Resolved { source: String, target: String },
    /// The definition could not be used; geometries load untransformed.
    Ignored { reason: String },
}

impl std::fmt::Display for ProjectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => write!(f, "none"),
            Self::Resolved { source, target } => write!(f, "{source} -> {target}"),
            Self::Ignored { reason } => write!(f, "ignored ({reason})"),
        }
    }
}

/// Table row representation for one resolved dataset member.
#[derive(Tabled)]
pub struct StreamRow {
    /// Member role (e.g. `geometry`).
    #[tabled(rename = "Member")]
    pub member: String,
    /// File suffix of the member.
    #[tabled(rename = "Suffix")]
    pub suffix: String,
    /// Whether the member was found.
    #[tabled(rename = "Status")]
    pub status: String,
    /// Size of the member stream or text.
    #[tabled(rename = "Bytes")]
    pub bytes: String,
}

/// Table row representation for the `members` subcommand.
#[derive(Tabled)]
pub struct MemberRow {
    #[tabled(rename = "Suffix")]
    pub suffix: String,
    #[tabled(rename = "Role")]
    pub role: String,
    #[tabled(rename = "Required")]
    pub required: String,
}

fn stream_row(member: DatasetMember, length: Option<usize>) -> StreamRow {
    StreamRow {
        member: member.description().to_string(),
        suffix: member.suffix().to_string(),
        status: if length.is_some() { "found" } else { "absent" }.to_string(),
        bytes: length.map_or_else(|| "-".to_string(), |len| len.to_string()),
    }
}

/// Builds one row per dataset member, in [`DatasetMember::ALL`] order.
#[must_use]
pub fn stream_rows(streams: &StreamBundle) -> Vec<StreamRow> {
    DatasetMember::ALL
        .iter()
        .map(|&member| {
            let length = match member {
                DatasetMember::Geometry => Some(streams.geometry.byte_length()),
                DatasetMember::Attributes => {
                    streams.attributes.as_ref().map(BinaryView::byte_length)
                },
                DatasetMember::Projection => streams.projection.as_ref().map(String::len),
                DatasetMember::CodePage => streams.encoding.as_ref().map(String::len),
            };
            stream_row(member, length)
        })
        .collect()
}

/// Builds the rows of the member reference table.
#[must_use]
pub fn member_rows() -> Vec<MemberRow> {
    DatasetMember::ALL
        .iter()
        .map(|member| MemberRow {
            suffix: member.suffix().to_string(),
            role: member.description().to_string(),
            required: if member.is_required() { "Yes" } else { "No" }.to_string(),
        })
        .collect()
}

/// Display a dataset report in a formatted table.
///
/// # Arguments
///
/// * `report` - The resolved dataset to display
pub fn display_dataset_report(report: &DatasetReport) {
    println!("\nDataset: {}", report.dataset);
    println!("Input: {}", report.modality);

    println!("\n=== Members ===");
    let table = Table::new(stream_rows(&report.streams)).to_string();
    println!("{table}");

    println!("\nProjection: {}", report.projection);
    if let Some(encoding) = &report.streams.encoding {
        println!("Code page: {}", encoding.trim());
    }
}
