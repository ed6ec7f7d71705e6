//! Point cloud containers.
//!
//! Only positions take part in geometric scoring. The optional color channel
//! travels with the points so callers do not have to split their data.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A single 3D point with an optional RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb: Option<[u8; 3]>,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z, rgb: None }
    }

    pub fn with_rgb(mut self, rgb: [u8; 3]) -> Self {
        self.rgb = Some(rgb);
        self
    }

    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<Vector3<f64>> for Point {
    fn from(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Ordered sequence of points captured in one sensor frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    points: Vec<Point>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Build a colorless cloud from `(x, y, z)` triples.
    pub fn from_positions<I>(positions: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64, f64)>,
    {
        Self {
            points: positions
                .into_iter()
                .map(|(x, y, z)| Point::new(x, y, z))
                .collect(),
        }
    }

    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Mean position of all points, or `None` for an empty cloud.
    pub fn centroid(&self) -> Option<Vector3<f64>> {
        if self.points.is_empty() {
            return None;
        }
        let sum = self
            .points
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.position());
        Some(sum / self.points.len() as f64)
    }

    /// Copy of this cloud with every point shifted by `offset`. Colors are kept.
    pub fn translated(&self, offset: &Vector3<f64>) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| Point {
                    x: p.x + offset.x,
                    y: p.y + offset.y,
                    z: p.z + offset.z,
                    rgb: p.rgb,
                })
                .collect(),
        }
    }
}

impl FromIterator<Point> for PointCloud {
    fn from_iter<T: IntoIterator<Item = Point>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PointCloud {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centroid_of_empty_cloud_is_none() {
        assert!(PointCloud::new().centroid().is_none());
    }

    #[test]
    fn test_centroid_and_translation() {
        let cloud = PointCloud::from_positions(vec![(0.0, 0.0, 0.0), (2.0, 4.0, -2.0)]);
        let centroid = cloud.centroid().unwrap();
        assert!((centroid - Vector3::new(1.0, 2.0, -1.0)).norm() < 1e-12);

        let moved = cloud.translated(&Vector3::new(1.0, 0.0, 0.5));
        assert_eq!(moved.len(), 2);
        assert_eq!(moved.points()[1], Point::new(3.0, 4.0, -1.5));
    }

    #[test]
    fn test_color_survives_translation() {
        let cloud = PointCloud::from_points(vec![Point::new(0.0, 0.0, 0.0).with_rgb([10, 20, 30])]);
        let moved = cloud.translated(&Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(moved.points()[0].rgb, Some([10, 20, 30]));
    }
}
