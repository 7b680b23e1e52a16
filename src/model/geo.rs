//! GeoJSON geometry fragments.
//!
//! Only the two shapes the survey flow needs: a `Point` for GPS fixes and a
//! single-ring `Polygon` for rough parcel boundaries. Coordinates are
//! `[longitude, latitude]` per GeoJSON.

use serde::{Deserialize, Serialize};

fn point_kind() -> String {
    "Point".to_string()
}

fn polygon_kind() -> String {
    "Polygon".to_string()
}

/// A GeoJSON `Point`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type", default = "point_kind")]
    kind: String,
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: point_kind(),
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// A GeoJSON `Polygon` with a single exterior ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPolygon {
    #[serde(rename = "type", default = "polygon_kind")]
    kind: String,
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl GeoPolygon {
    /// Wraps an already closed exterior ring.
    pub fn from_ring(ring: Vec<[f64; 2]>) -> Self {
        Self {
            kind: polygon_kind(),
            coordinates: vec![ring],
        }
    }

    pub fn exterior(&self) -> &[[f64; 2]] {
        self.coordinates.first().map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_serializes_as_geojson() {
        let point = GeoPoint::new(106.7009, 10.7769);
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"][0], 106.7009);
        assert_eq!(json["coordinates"][1], 10.7769);
    }

    #[test]
    fn test_point_accessors_follow_lng_lat_order() {
        let point = GeoPoint::new(106.7009, 10.7769);
        assert_eq!(point.longitude(), 106.7009);
        assert_eq!(point.latitude(), 10.7769);
    }

    #[test]
    fn test_point_deserializes_without_type_field() {
        let point: GeoPoint = serde_json::from_str("{\"coordinates\":[1.0,2.0]}").unwrap();
        assert_eq!(point, GeoPoint::new(1.0, 2.0));
    }

    #[test]
    fn test_polygon_wraps_single_ring() {
        let ring = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]];
        let polygon = GeoPolygon::from_ring(ring.clone());
        assert_eq!(polygon.exterior(), ring.as_slice());

        let json = serde_json::to_value(&polygon).unwrap();
        assert_eq!(json["type"], "Polygon");
        assert_eq!(json["coordinates"].as_array().unwrap().len(), 1);
    }
}
