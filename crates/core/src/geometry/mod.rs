use serde::{Deserialize, Serialize};

/// A single detector landmark in normalized video space. `x` and `y` lie in
/// [0, 1]; `z` is depth relative to the wrist.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Projects the landmark onto the image plane.
    pub fn planar(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

/// A 2D point. Used both for normalized video coordinates and for normalized
/// screen coordinates; the owning field documents which.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Moves `self` towards `target` by `factor` of the remaining distance.
    pub fn approach(self, target: Point2, factor: f32) -> Point2 {
        Point2::new(
            self.x + (target.x - self.x) * factor,
            self.y + (target.y - self.y) * factor,
        )
    }
}

/// Euclidean distance between two landmarks in all three dimensions.
pub fn distance(a: &Landmark, b: &Landmark) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let dz = b.z - a.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Average of a set of landmarks projected onto the image plane. Returns the
/// origin for an empty set.
pub fn planar_centroid<'a, I>(points: I) -> Point2
where
    I: IntoIterator<Item = &'a Landmark>,
{
    let mut sum = Point2::default();
    let mut count = 0usize;
    for point in points {
        sum.x += point.x;
        sum.y += point.y;
        count += 1;
    }

    if count == 0 {
        return sum;
    }

    Point2::new(sum.x / count as f32, sum.y / count as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_covers_depth() {
        let a = Landmark::new(0.0, 0.0, 0.0);
        let b = Landmark::new(0.3, 0.0, 0.4);
        assert!((distance(&a, &b) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn centroid_of_empty_set_is_origin() {
        let empty: Vec<Landmark> = Vec::new();
        assert_eq!(planar_centroid(&empty), Point2::default());

        let points = [Landmark::new(0.0, 0.0, 0.0), Landmark::new(1.0, 0.5, 9.0)];
        assert_eq!(planar_centroid(&points), Point2::new(0.5, 0.25));
    }

    #[test]
    fn approach_moves_partway() {
        let start = Point2::new(0.0, 1.0);
        let moved = start.approach(Point2::new(1.0, 0.0), 0.6);
        assert!((moved.x - 0.6).abs() < 1e-6);
        assert!((moved.y - 0.4).abs() < 1e-6);
    }
}
