// SPDX-License-Identifier: GPL-3.0-only

//! 2D geometry for the image context
//!
//! Coordinates are y-up: an image extent's origin is its bottom-left corner.
//! [`AffineTransform`] follows the row-vector convention
//! `x' = a·x + c·y + tx`, `y' = b·x + d·y + ty`.

use std::f64::consts::FRAC_PI_2;

const EPSILON: f64 = 1e-12;

/// Snap values that are within rounding noise of -1, 0 or 1
fn snap_unit(value: f64) -> f64 {
    for target in [-1.0, 0.0, 1.0] {
        if (value - target).abs() < EPSILON {
            return target;
        }
    }
    value
}

/// A point in image space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in image space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size anchored at the origin
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f64, height as f64)
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0 || !self.width.is_finite() || !self.height.is_finite()
    }

    /// Smallest rectangle on the integer grid that contains this one
    pub fn integral(&self) -> Self {
        let min_x = self.min_x().floor();
        let min_y = self.min_y().floor();
        let max_x = self.max_x().ceil();
        let max_y = self.max_y().ceil();
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Pixel size of the integral rectangle
    pub fn pixel_size(&self) -> (u32, u32) {
        let integral = self.integral();
        (
            integral.width.max(0.0) as u32,
            integral.height.max(0.0) as u32,
        )
    }

    fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.min_x(), self.min_y()),
            Point::new(self.max_x(), self.min_y()),
            Point::new(self.min_x(), self.max_y()),
            Point::new(self.max_x(), self.max_y()),
        ]
    }
}

/// 2D affine transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl AffineTransform {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            tx,
            ty,
            ..Self::IDENTITY
        }
    }

    /// Counter-clockwise rotation by `angle` radians (y-up)
    ///
    /// Quarter turns are exact.
    pub fn rotation(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        let (sin, cos) = (snap_unit(sin), snap_unit(cos));
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Clockwise quarter turn
    pub fn quarter_turn_clockwise() -> Self {
        Self::rotation(-FRAC_PI_2)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    /// `self` followed by `other`
    pub fn concat(&self, other: &Self) -> Self {
        Self {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            tx: self.tx * other.a + self.ty * other.c + other.tx,
            ty: self.tx * other.b + self.ty * other.d + other.ty,
        }
    }

    /// Translate first, then apply `self`
    pub fn translated(&self, tx: f64, ty: f64) -> Self {
        Self::translation(tx, ty).concat(self)
    }

    /// Rotate first, then apply `self`
    pub fn rotated(&self, angle: f64) -> Self {
        Self::rotation(angle).concat(self)
    }

    /// Scale first, then apply `self`
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self::scale(sx, sy).concat(self)
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Inverse transform, `None` when the transform collapses the plane
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < EPSILON {
            return None;
        }

        Some(Self {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            tx: (self.c * self.ty - self.d * self.tx) / det,
            ty: (self.b * self.tx - self.a * self.ty) / det,
        })
    }

    pub fn apply_point(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.tx,
            self.b * p.x + self.d * p.y + self.ty,
        )
    }

    /// Bounding box of the transformed rectangle
    pub fn apply_rect(&self, rect: &Rect) -> Rect {
        let corners = rect.corners().map(|p| self.apply_point(p));

        let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        [
            self.a - other.a,
            self.b - other.b,
            self.c - other.c,
            self.d - other.d,
            self.tx - other.tx,
            self.ty - other.ty,
        ]
        .iter()
        .all(|delta| delta.abs() <= tolerance)
    }
}
