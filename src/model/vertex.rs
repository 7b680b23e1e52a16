//! Boundary vertices walked along a parcel edge.

use serde::{Deserialize, Serialize};

use super::GeoPolygon;

/// One corner of a rough parcel boundary.
///
/// `seq` orders the vertices as the officer walked them. Latitude and
/// longitude are stored separately here; GeoJSON ordering only applies once
/// vertices are assembled into a polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vertex {
    pub seq: u32,
    pub lat: f64,
    pub lng: f64,
}

impl Vertex {
    pub fn new(seq: u32, lat: f64, lng: f64) -> Self {
        Self { seq, lat, lng }
    }
}

/// Orders vertices by `seq` and closes the ring by repeating the first
/// coordinate at the end, as GeoJSON polygons require.
pub fn closed_ring(vertices: &[Vertex]) -> Vec<[f64; 2]> {
    let mut ordered: Vec<&Vertex> = vertices.iter().collect();
    ordered.sort_by_key(|v| v.seq);

    let mut ring: Vec<[f64; 2]> = ordered.iter().map(|v| [v.lng, v.lat]).collect();
    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }
    ring
}

/// Builds the polygon sent to the backend once a boundary has at least
/// three vertices.
pub fn polygon_from_vertices(vertices: &[Vertex]) -> GeoPolygon {
    GeoPolygon::from_ring(closed_ring(vertices))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_is_closed_and_ordered() {
        let vertices = vec![
            Vertex::new(2, 10.0, 106.2),
            Vertex::new(0, 10.0, 106.0),
            Vertex::new(1, 10.1, 106.1),
        ];
        let ring = closed_ring(&vertices);
        assert_eq!(ring.len(), 4);
        assert_eq!(ring[0], [106.0, 10.0]);
        assert_eq!(ring[1], [106.1, 10.1]);
        assert_eq!(ring[2], [106.2, 10.0]);
        assert_eq!(ring[3], ring[0]);
    }

    #[test]
    fn test_empty_ring_stays_empty() {
        assert!(closed_ring(&[]).is_empty());
    }

    #[test]
    fn test_polygon_uses_lng_lat_order() {
        let vertices = vec![
            Vertex::new(0, 10.0, 106.0),
            Vertex::new(1, 10.1, 106.1),
            Vertex::new(2, 10.0, 106.2),
        ];
        let polygon = polygon_from_vertices(&vertices);
        assert_eq!(polygon.exterior()[0], [106.0, 10.0]);
        assert_eq!(polygon.exterior().len(), 4);
    }
}
