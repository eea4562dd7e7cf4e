//! Points, sizes and rectangles in PDF points (1/72 inch), y pointing down.

use serde::{Deserialize, Serialize};

/// Tolerance used by every containment check, so accumulated float error
/// never turns an exact fit into an overflow.
pub const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    /// A region with no bound on either axis.
    pub const UNBOUNDED: Size = Size {
        width: f64::INFINITY,
        height: f64::INFINITY,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Component-wise minimum.
    pub fn bounded_to(self, other: Size) -> Self {
        Self {
            width: self.width.min(other.width),
            height: self.height.min(other.height),
        }
    }

    /// Does `self` fit inside `other` on both axes?
    pub fn fits_in(self, other: Size) -> bool {
        self.width <= other.width + EPSILON && self.height <= other.height + EPSILON
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn from_parts(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    pub fn x(&self) -> f64 {
        self.origin.x
    }

    pub fn y(&self) -> f64 {
        self.origin.y
    }

    pub fn width(&self) -> f64 {
        self.size.width
    }

    pub fn height(&self) -> f64 {
        self.size.height
    }

    pub fn right(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn bottom(&self) -> f64 {
        self.origin.y + self.size.height
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x() >= self.x() - EPSILON
            && other.y() >= self.y() - EPSILON
            && other.right() <= self.right() + EPSILON
            && other.bottom() <= self.bottom() + EPSILON
    }
}
