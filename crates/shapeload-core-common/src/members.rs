//! The sibling files that make up a shapefile dataset.
//!
//! A dataset is a set of files sharing a base name and differing by suffix. Only
//! the geometry file is mandatory; the others refine how it is read.
//!
//! # Examples
//!
//! ```
//! use shapeload_core_common::members::DatasetMember;
//!
//! let member = DatasetMember::Attributes;
//! assert_eq!(member.extension(), "dbf");
//! assert!(member.matches_name("roads/ROADS.DBF"));
//! assert!(!member.is_required());
//! ```

use std::fmt;

/// One sibling file of a shapefile dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetMember {
    /// The `.shp` geometry stream.
    Geometry,
    /// The `.dbf` attribute table.
    Attributes,
    /// The `.prj` projection definition.
    Projection,
    /// The `.cpg` code page naming the attribute text encoding.
    CodePage,
}

impl DatasetMember {
    /// Every member, in the order they are usually listed.
    pub const ALL: [DatasetMember; 4] = [
        DatasetMember::Geometry,
        DatasetMember::Attributes,
        DatasetMember::Projection,
        DatasetMember::CodePage,
    ];

    /// File extension without the leading dot.
    ///
    /// # Examples
    ///
    /// ```
    /// use shapeload_core_common::members::DatasetMember;
    ///
    /// assert_eq!(DatasetMember::Geometry.extension(), "shp");
    /// assert_eq!(DatasetMember::CodePage.extension(), "cpg");
    /// ```
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            DatasetMember::Geometry => "shp",
            DatasetMember::Attributes => "dbf",
            DatasetMember::Projection => "prj",
            DatasetMember::CodePage => "cpg",
        }
    }

    /// File suffix including the leading dot.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            DatasetMember::Geometry => ".shp",
            DatasetMember::Attributes => ".dbf",
            DatasetMember::Projection => ".prj",
            DatasetMember::CodePage => ".cpg",
        }
    }

    /// Human readable role of the member.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            DatasetMember::Geometry => "Geometry",
            DatasetMember::Attributes => "Attributes",
            DatasetMember::Projection => "Projection",
            DatasetMember::CodePage => "Code page",
        }
    }

    /// Returns `true` only for the geometry stream.
    #[must_use]
    pub const fn is_required(self) -> bool {
        matches!(self, DatasetMember::Geometry)
    }

    /// Returns `true` for members whose content is read as text.
    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(self, DatasetMember::Projection | DatasetMember::CodePage)
    }

    /// Case-insensitive suffix match against a file or archive member name.
    ///
    /// # Examples
    ///
    /// ```
    /// use shapeload_core_common::members::DatasetMember;
    ///
    /// assert!(DatasetMember::Geometry.matches_name("Parcels.SHP"));
    /// assert!(!DatasetMember::Geometry.matches_name("parcels.shp.xml"));
    /// assert!(!DatasetMember::Geometry.matches_name("shp"));
    /// ```
    #[must_use]
    pub fn matches_name(self, name: &str) -> bool {
        let suffix = self.suffix();
        name.len() >= suffix.len()
            && name
                .get(name.len() - suffix.len()..)
                .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
    }
}

impl fmt::Display for DatasetMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
