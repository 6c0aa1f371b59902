use std::ops::{Add, AddAssign, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, hypot, inv_sqrt};

/// A position or displacement in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: Fixed64,
    pub y: Fixed64,
}

impl Point {
    pub const ZERO: Point = Point {
        x: Fixed64::ZERO,
        y: Fixed64::ZERO,
    };

    pub fn new(x: Fixed64, y: Fixed64) -> Self {
        Point { x, y }
    }

    /// Construct from f64. Initialization and tests only.
    pub fn from_num(x: f64, y: f64) -> Self {
        Point {
            x: Fixed64::from_num(x),
            y: Fixed64::from_num(y),
        }
    }

    /// Squared distance to `other`. Exact, no square root involved.
    pub fn dist_sq(self, other: Point) -> Fixed64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to `other`.
    pub fn dist(self, other: Point) -> Fixed64 {
        hypot(other.x - self.x, other.y - self.y)
    }

    /// Displacement of length `speed` pointing from `self` toward `target`.
    /// Zero when the points coincide.
    pub fn step_toward(self, target: Point, speed: Fixed64) -> Point {
        let dx = target.x - self.x;
        let dy = target.y - self.y;
        let qu = dx * dx + dy * dy;
        if qu == Fixed64::ZERO {
            return Point::ZERO;
        }
        let scale = inv_sqrt(qu) * speed;
        Point {
            x: dx * scale,
            y: dy * scale,
        }
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point {
            x: -self.x,
            y: -self.y,
        }
    }
}

/// An axis-aligned rectangle, `l < r` and `b < t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub l: Fixed64,
    pub r: Fixed64,
    pub b: Fixed64,
    pub t: Fixed64,
}

impl Rect {
    pub fn new(l: Fixed64, r: Fixed64, b: Fixed64, t: Fixed64) -> Self {
        debug_assert!(l < r && b < t);
        Rect { l, r, b, t }
    }

    /// Construct from f64. Initialization and tests only.
    pub fn from_num(l: f64, r: f64, b: f64, t: f64) -> Self {
        Rect::new(
            Fixed64::from_num(l),
            Fixed64::from_num(r),
            Fixed64::from_num(b),
            Fixed64::from_num(t),
        )
    }

    /// The four corners in counter-clockwise order starting at top-right.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.r, self.t),
            Point::new(self.l, self.t),
            Point::new(self.l, self.b),
            Point::new(self.r, self.b),
        ]
    }

    /// Boundary counts as inside.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.l && p.x <= self.r && p.y >= self.b && p.y <= self.t
    }

    /// Boundary does not count as inside.
    pub fn contains_strict(&self, p: Point) -> bool {
        p.x > self.l && p.x < self.r && p.y > self.b && p.y < self.t
    }

    pub fn center(&self) -> Point {
        Point::new((self.l + self.r) / 2, (self.b + self.t) / 2)
    }

    pub fn diagonal(&self) -> Fixed64 {
        hypot(self.r - self.l, self.t - self.b)
    }
}
