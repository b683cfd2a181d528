//! Screen geometry value types.
//!
//! Coordinates are logical screen points (the same space `cliclick` uses).
//! Scaling rounds half-to-even on every coordinate independently, so
//! scaling twice by the same factor is stable.

use rand::Rng;
use serde::Deserialize;

/// A point in logical screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "[i32; 2]")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Scales both coordinates by `factor` (round half to even).
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            x: scale_coord(self.x, factor),
            y: scale_coord(self.y, factor),
        }
    }
}

impl From<[i32; 2]> for Point {
    fn from([x, y]: [i32; 2]) -> Self {
        Self::new(x, y)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An axis-aligned rectangle. `right`/`bottom` are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Builds a rectangle from two opposite corners given in any order.
    pub fn from_two_points(p1: Point, p2: Point) -> Self {
        Self {
            left: p1.x.min(p2.x),
            top: p1.y.min(p2.y),
            right: p1.x.max(p2.x),
            bottom: p1.y.max(p2.y),
        }
    }

    /// Width, never less than 1.
    pub fn width(&self) -> i32 {
        (self.right - self.left).max(1)
    }

    /// Height, never less than 1.
    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(1)
    }

    /// Integer center, floor-divided.
    pub fn center(&self) -> Point {
        Point {
            x: (self.left + self.right).div_euclid(2),
            y: (self.top + self.bottom).div_euclid(2),
        }
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self {
            left: scale_coord(self.left, factor),
            top: scale_coord(self.top, factor),
            right: scale_coord(self.right, factor),
            bottom: scale_coord(self.bottom, factor),
        }
    }

    /// Picks a uniformly random point at least `margin` away from every edge.
    ///
    /// If the margin leaves no interior on either axis, returns the exact
    /// center instead. Tiny or misconfigured regions still get clicked.
    pub fn random_point<R: Rng + ?Sized>(&self, margin: i32, rng: &mut R) -> Point {
        let l = self.left + margin;
        let t = self.top + margin;
        let r = self.right - margin;
        let b = self.bottom - margin;
        if r <= l || b <= t {
            return self.center();
        }
        Point {
            x: rng.random_range(l..r),
            y: rng.random_range(t..b),
        }
    }

    /// True if `p` lies inside the half-open rectangle.
    #[cfg(test)]
    pub fn contains(&self, p: Point) -> bool {
        (self.left..self.right).contains(&p.x) && (self.top..self.bottom).contains(&p.y)
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}

fn scale_coord(v: i32, factor: f64) -> i32 {
    (v as f64 * factor).round_ties_even() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_from_two_points_is_order_independent() {
        let corners = [
            (Point::new(10, 20), Point::new(50, 80)),
            (Point::new(50, 80), Point::new(10, 20)),
            (Point::new(10, 80), Point::new(50, 20)),
            (Point::new(-5, 3), Point::new(7, -9)),
        ];
        for (a, b) in corners {
            assert_eq!(Rect::from_two_points(a, b), Rect::from_two_points(b, a));
        }
        assert_eq!(
            Rect::from_two_points(Point::new(50, 20), Point::new(10, 80)),
            Rect::new(10, 20, 50, 80)
        );
    }

    #[test]
    fn test_width_height_clamped() {
        let flat = Rect::from_two_points(Point::new(5, 5), Point::new(5, 9));
        assert_eq!(flat.width(), 1);
        assert_eq!(flat.height(), 4);
    }

    #[test]
    fn test_scaled_rounds_half_to_even() {
        assert_eq!(Point::new(1, 3).scaled(0.5), Point::new(0, 2));
        assert_eq!(Point::new(5, 7).scaled(0.5), Point::new(2, 4));
        assert_eq!(
            Rect::new(10, 20, 30, 41).scaled(2.0),
            Rect::new(20, 40, 60, 82)
        );
        let once = Rect::new(3, 5, 9, 11).scaled(1.0);
        assert_eq!(once.scaled(1.0), once);
    }

    #[test]
    fn test_random_point_stays_inside_margin() {
        let mut rng = StdRng::seed_from_u64(7);
        let rect = Rect::new(100, 200, 140, 230);
        for _ in 0..2000 {
            let p = rect.random_point(3, &mut rng);
            assert!(p.x >= 103 && p.x < 137, "x out of range: {}", p);
            assert!(p.y >= 203 && p.y < 227, "y out of range: {}", p);
        }
    }

    #[test]
    fn test_random_point_degenerate_returns_center() {
        let mut rng = StdRng::seed_from_u64(1);
        let tiny = Rect::new(10, 10, 15, 30);
        for _ in 0..10 {
            assert_eq!(tiny.random_point(3, &mut rng), Point::new(12, 20));
        }
        let odd = Rect::new(-3, -3, 0, 0);
        assert_eq!(odd.random_point(2, &mut rng), Point::new(-2, -2));
    }

    #[test]
    fn test_random_point_single_pixel_interior() {
        let mut rng = StdRng::seed_from_u64(3);
        let rect = Rect::new(0, 0, 7, 7);
        assert_eq!(rect.random_point(3, &mut rng), Point::new(3, 3));
    }
}
