//! Derivation of sibling resource locators from a dataset base.
//!
//! Locators are either URLs (anything containing `://`) or bare filesystem
//! paths. For URLs the suffix is applied to the path component so that query
//! strings and fragments survive.

use url::Url;

use crate::members::DatasetMember;

/// Returns the dataset base for `location`, stripping a trailing `.shp`.
///
/// # Examples
///
/// ```
/// use shapeload_core_common::dataset_base;
///
/// assert_eq!(dataset_base("data.shp"), "data");
/// assert_eq!(dataset_base("data"), "data");
/// assert_eq!(
///     dataset_base("https://example.com/roads.SHP?token=abc"),
///     "https://example.com/roads?token=abc"
/// );
/// ```
#[must_use]
pub fn dataset_base(location: &str) -> String {
    if let Some(mut url) = parse_url(location) {
        if let Some(stripped) = strip_geometry_suffix(url.path()).map(str::to_string) {
            url.set_path(&stripped);
        }
        return url.to_string();
    }

    strip_geometry_suffix(location)
        .unwrap_or(location)
        .to_string()
}

/// Builds the locator of `member` next to the dataset `base`.
///
/// # Examples
///
/// ```
/// use shapeload_core_common::{DatasetMember, sibling_location};
///
/// assert_eq!(sibling_location("data", DatasetMember::Attributes), "data.dbf");
/// assert_eq!(
///     sibling_location("https://example.com/roads?v=2", DatasetMember::Projection),
///     "https://example.com/roads.prj?v=2"
/// );
/// ```
#[must_use]
pub fn sibling_location(base: &str, member: DatasetMember) -> String {
    if let Some(mut url) = parse_url(base) {
        let path = format!("{}{}", url.path(), member.suffix());
        url.set_path(&path);
        return url.to_string();
    }

    format!("{base}{}", member.suffix())
}

fn parse_url(location: &str) -> Option<Url> {
    if !location.contains("://") {
        return None;
    }
    Url::parse(location).ok().filter(|url| !url.cannot_be_a_base())
}

fn strip_geometry_suffix(path: &str) -> Option<&str> {
    if DatasetMember::Geometry.matches_name(path) {
        path.get(..path.len() - DatasetMember::Geometry.suffix().len())
    } else {
        None
    }
}
