//! Positional assembly of decoded geometries and attribute records.
//!
//! The output serializes to the GeoJSON `FeatureCollection` layout.

use serde::ser::{Serialize, SerializeStruct, Serializer};

use shapeload_core_common::Record;

/// One geometry paired with its attribute record.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature<G> {
    pub geometry: G,
    pub properties: Record,
}

impl<G> Feature<G> {
    pub const TYPE: &'static str = "Feature";
}

/// Features in geometry-stream order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection<G> {
    features: Vec<Feature<G>>,
}

impl<G> FeatureCollection<G> {
    pub const TYPE: &'static str = "FeatureCollection";

    #[must_use]
    pub fn features(&self) -> &[Feature<G>] {
        &self.features
    }

    #[must_use]
    pub fn into_features(self) -> Vec<Feature<G>> {
        self.features
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature<G>> {
        self.features.iter()
    }
}

impl<G> IntoIterator for FeatureCollection<G> {
    type Item = Feature<G>;
    type IntoIter = std::vec::IntoIter<Feature<G>>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

/// Pairs `geometries[i]` with `attributes[i]`, or `{}` past the end of `attributes`.
///
/// The collection always has one feature per geometry. Attribute records beyond
/// the last geometry are dropped.
///
/// # Examples
///
/// ```
/// use shapeload_core::assemble::combine;
/// use shapeload_core_common::Record;
///
/// let mut named = Record::new();
/// named.insert("name".to_string(), "A".into());
///
/// let collection = combine(vec!["g0", "g1"], Some(vec![named.clone()]));
/// assert_eq!(collection.len(), 2);
/// assert_eq!(collection.features()[0].properties, named);
/// assert!(collection.features()[1].properties.is_empty());
/// ```
pub fn combine<G>(geometries: Vec<G>, attributes: Option<Vec<Record>>) -> FeatureCollection<G> {
    let mut attributes = attributes.unwrap_or_default().into_iter();
    let features = geometries
        .into_iter()
        .map(|geometry| Feature {
            geometry,
            properties: attributes.next().unwrap_or_default(),
        })
        .collect();

    FeatureCollection { features }
}

impl<G: Serialize> Serialize for Feature<G> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Feature", 3)?;
        state.serialize_field("type", Self::TYPE)?;
        state.serialize_field("geometry", &self.geometry)?;
        state.serialize_field("properties", &self.properties)?;
        state.end()
    }
}

impl<G: Serialize> Serialize for FeatureCollection<G> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FeatureCollection", 2)?;
        state.serialize_field("type", Self::TYPE)?;
        state.serialize_field("features", &self.features)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: i64) -> Record {
        let mut record = Record::new();
        record.insert("id".to_string(), json!(id));
        record
    }

    #[test]
    fn short_attributes_pad_with_empty_records() {
        let collection = combine(vec![10, 11, 12, 13], Some(vec![record(0), record(1)]));
        assert_eq!(collection.len(), 4);

        let properties: Vec<_> = collection.iter().map(|f| f.properties.clone()).collect();
        assert_eq!(properties[0], record(0));
        assert_eq!(properties[1], record(1));
        assert!(properties[2].is_empty());
        assert!(properties[3].is_empty());
    }

    #[test]
    fn missing_or_empty_attributes_give_empty_properties() {
        for attributes in [None, Some(Vec::new())] {
            let collection = combine(vec!['a', 'b'], attributes);
            assert_eq!(collection.len(), 2);
            assert!(collection.iter().all(|f| f.properties.is_empty()));
        }
    }

    #[test]
    fn excess_attributes_are_ignored() {
        let collection = combine(vec![()], Some(vec![record(0), record(1), record(2)]));
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.features()[0].properties, record(0));
    }

    #[test]
    fn geometry_order_is_preserved() {
        let collection = combine(vec![3, 1, 2, 1], None);
        let order: Vec<_> = collection.into_iter().map(|f| f.geometry).collect();
        assert_eq!(order, vec![3, 1, 2, 1]);
    }

    #[test]
    fn empty_geometry_gives_empty_collection() {
        let collection = combine(Vec::<u8>::new(), Some(vec![record(0)]));
        assert!(collection.is_empty());
    }

    #[test]
    fn serializes_as_geojson_feature_collection() {
        let geometry = json!({"type": "Point", "coordinates": [1.0, 2.0]});
        let collection = combine(vec![geometry.clone()], Some(vec![record(7)]));

        let value = serde_json::to_value(&collection).expect("serialize");
        assert_eq!(
            value,
            json!({
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "geometry": geometry, "properties": {"id": 7}}
                ]
            })
        );
    }
}
