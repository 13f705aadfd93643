//! Warning areas and point containment.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

// Absorbs floating point noise when a point sits exactly on an edge.
const EPSILON: f64 = 1e-12;

/// One shape of a warning area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Point(GeoPoint),
    Line(Vec<GeoPoint>),
    /// Closed ring. The closing vertex may or may not repeat the first one.
    Polygon(Vec<GeoPoint>),
}

impl Shape {
    /// Builds the simplest shape describing `vertices`: a point for one vertex, a
    /// line for two and a polygon for three or more.
    ///
    /// Returns `None` when there are no vertices.
    pub fn from_vertices(mut vertices: Vec<GeoPoint>) -> Option<Shape> {
        match vertices.len() {
            0 => None,
            1 => vertices.pop().map(Shape::Point),
            2 => Some(Shape::Line(vertices)),
            _ => Some(Shape::Polygon(vertices)),
        }
    }

    /// Returns true when `point` lies inside the shape, on its boundary, or within
    /// `tolerance` degrees of it.
    pub fn contains(&self, point: &GeoPoint, tolerance: f64) -> bool {
        let tolerance = tolerance + EPSILON;
        match self {
            Shape::Point(vertex) => planar_distance(point, vertex) <= tolerance,
            Shape::Line(vertices) => path_distance(point, vertices, false) <= tolerance,
            Shape::Polygon(vertices) => {
                ring_contains(point, vertices) || path_distance(point, vertices, true) <= tolerance
            }
        }
    }
}

/// A described part of a warning's affected region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub description: String,
    pub shapes: Vec<Shape>,
}

impl Area {
    pub fn contains(&self, point: &GeoPoint, tolerance: f64) -> bool {
        self.shapes.iter().any(|shape| shape.contains(point, tolerance))
    }
}

/// The full affected region of a warning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub areas: Vec<Area>,
}

impl Geometry {
    pub fn contains(&self, point: &GeoPoint, tolerance: f64) -> bool {
        self.areas.iter().any(|area| area.contains(point, tolerance))
    }

    /// Lists the areas covering `point`, in feed order.
    pub fn matching_areas(&self, point: &GeoPoint, tolerance: f64) -> Vec<&Area> {
        self.areas
            .iter()
            .filter(|area| area.contains(point, tolerance))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.iter().all(|area| area.shapes.is_empty())
    }
}

/// Even-odd ray casting towards positive longitude.
fn ring_contains(point: &GeoPoint, ring: &[GeoPoint]) -> bool {
    let (x, y) = (point.lon, point.lat);
    let mut inside = false;

    let mut previous = match ring.last() {
        Some(vertex) => vertex,
        None => return false,
    };
    for vertex in ring {
        let (xi, yi) = (vertex.lon, vertex.lat);
        let (xj, yj) = (previous.lon, previous.lat);
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        previous = vertex;
    }

    inside
}

/// Smallest distance between `point` and the segments of `vertices`.
fn path_distance(point: &GeoPoint, vertices: &[GeoPoint], closed: bool) -> f64 {
    let mut distance = f64::INFINITY;
    for pair in vertices.windows(2) {
        distance = distance.min(segment_distance(point, &pair[0], &pair[1]));
    }
    if closed && let (Some(first), Some(last)) = (vertices.first(), vertices.last()) {
        distance = distance.min(segment_distance(point, last, first));
    }
    distance
}

fn segment_distance(point: &GeoPoint, start: &GeoPoint, end: &GeoPoint) -> f64 {
    let (dx, dy) = (end.lon - start.lon, end.lat - start.lat);
    let length_squared = dx * dx + dy * dy;
    if length_squared == 0.0 {
        return planar_distance(point, start);
    }

    let t = (((point.lon - start.lon) * dx + (point.lat - start.lat) * dy) / length_squared)
        .clamp(0.0, 1.0);
    let projection = GeoPoint {
        lat: start.lat + t * dy,
        lon: start.lon + t * dx,
    };
    planar_distance(point, &projection)
}

fn planar_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    (a.lon - b.lon).hypot(a.lat - b.lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint { lat, lon }
    }

    // Rough outline around central Berlin
    fn berlin() -> Shape {
        Shape::Polygon(vec![
            point(52.45, 13.25),
            point(52.45, 13.55),
            point(52.60, 13.55),
            point(52.60, 13.25),
            point(52.45, 13.25),
        ])
    }

    // Square around Madrid
    fn madrid() -> Shape {
        Shape::Polygon(vec![
            point(40.3, -3.8),
            point(40.3, -3.6),
            point(40.5, -3.6),
            point(40.5, -3.8),
        ])
    }

    #[test]
    fn test_berlin_center_inside_berlin() {
        assert!(berlin().contains(&point(52.51704, 13.38792), 0.0));
    }

    #[test]
    fn test_berlin_center_outside_madrid() {
        assert!(!madrid().contains(&point(52.51704, 13.38792), 0.0001));
    }

    #[test]
    fn test_boundary_is_inclusive() {
        // on an edge
        assert!(berlin().contains(&point(52.45, 13.40), 0.0));
        // on a vertex
        assert!(berlin().contains(&point(52.60, 13.55), 0.0));
    }

    #[test]
    fn test_unclosed_ring_closing_edge_is_inclusive() {
        // madrid() does not repeat its first vertex
        assert!(madrid().contains(&point(40.4, -3.8), 0.0));
    }

    #[test]
    fn test_tolerance_extends_polygon() {
        let just_outside = point(52.44995, 13.40);
        assert!(!berlin().contains(&just_outside, 0.0));
        assert!(berlin().contains(&just_outside, 0.0001));
    }

    #[test]
    fn test_concave_polygon() {
        // U shape opening to the north
        let shape = Shape::Polygon(vec![
            point(0.0, 0.0),
            point(0.0, 3.0),
            point(3.0, 3.0),
            point(3.0, 2.0),
            point(1.0, 2.0),
            point(1.0, 1.0),
            point(3.0, 1.0),
            point(3.0, 0.0),
        ]);
        assert!(shape.contains(&point(2.0, 0.5), 0.0));
        assert!(!shape.contains(&point(2.0, 1.5), 0.0));
    }

    #[test]
    fn test_point_and_line_shapes() {
        let single = Shape::Point(point(52.5, 13.4));
        assert!(single.contains(&point(52.5, 13.4), 0.0));
        assert!(single.contains(&point(52.5001, 13.4), 0.00015));
        assert!(!single.contains(&point(52.6, 13.4), 0.00015));

        let line = Shape::Line(vec![point(52.0, 13.0), point(53.0, 13.0)]);
        assert!(line.contains(&point(52.5, 13.0), 0.0));
        assert!(!line.contains(&point(52.5, 13.1), 0.0001));
    }

    #[test]
    fn test_from_vertices() {
        assert_eq!(Shape::from_vertices(vec![]), None);
        assert!(matches!(
            Shape::from_vertices(vec![point(1.0, 1.0)]),
            Some(Shape::Point(_))
        ));
        assert!(matches!(
            Shape::from_vertices(vec![point(1.0, 1.0), point(2.0, 2.0)]),
            Some(Shape::Line(_))
        ));
        assert!(matches!(
            Shape::from_vertices(vec![point(1.0, 1.0), point(2.0, 2.0), point(1.0, 2.0)]),
            Some(Shape::Polygon(_))
        ));
    }

    #[test]
    fn test_geometry_matching_areas() {
        let geometry = Geometry {
            areas: vec![
                Area {
                    description: "Berlin".to_string(),
                    shapes: vec![berlin()],
                },
                Area {
                    description: "Madrid".to_string(),
                    shapes: vec![madrid()],
                },
            ],
        };

        let areas = geometry.matching_areas(&point(52.51704, 13.38792), 0.0);
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].description, "Berlin");
        assert!(!geometry.contains(&point(48.1, 11.6), 0.0001));
    }

    #[test]
    fn test_empty_geometry() {
        assert!(Geometry::default().is_empty());
        assert!(!Geometry::default().contains(&point(0.0, 0.0), 1.0));
    }
}
