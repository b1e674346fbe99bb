use num::Float;
use serde::{Deserialize, Serialize};
use std::{
    fmt::Display,
    ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign},
};

/// A 2D vector generic over any floating-point type.
///
/// This struct represents a 2D point or vector in the world frame and provides
/// the usual operations: addition, scaling, normalization, rotation, dot and
/// cross products, and distance calculations.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct Vec2D<T> {
    /// The x-component of the vector.
    x: T,
    /// The y-component of the vector.
    y: T,
}

impl<T: Copy> Vec2D<T> {
    /// Creates a new vector with the given x and y components.
    pub const fn new(x: T, y: T) -> Self { Self { x, y } }

    /// Returns the x-component of the vector.
    pub const fn x(&self) -> T { self.x }

    /// Returns the y-component of the vector.
    pub const fn y(&self) -> T { self.y }
}

impl<T: Float> Vec2D<T> {
    /// Creates a zero vector (x = 0, y = 0).
    pub fn zero() -> Self { Self::new(T::zero(), T::zero()) }

    /// Creates a unit-radius vector pointing along `angle` (radians), scaled by `radius`.
    pub fn from_polar(angle: T, radius: T) -> Self {
        Self::new(radius * angle.cos(), radius * angle.sin())
    }

    /// Computes the magnitude of the vector.
    pub fn abs(&self) -> T { (self.x * self.x + self.y * self.y).sqrt() }

    /// Computes the squared magnitude of the vector.
    pub fn abs_sq(&self) -> T { self.x * self.x + self.y * self.y }

    /// Creates a vector pointing from the current vector (`self`) to another vector (`other`).
    pub fn to(&self, other: &Self) -> Self { Self::new(other.x - self.x, other.y - self.y) }

    /// Computes the dot product of the current vector with another vector.
    pub fn dot(&self, other: &Self) -> T { self.x * other.x + self.y * other.y }

    /// Computes the 2D cross product (z-component) of the current vector with another vector.
    pub fn cross(&self, other: &Self) -> T { self.x * other.y - self.y * other.x }

    /// Normalizes the vector to magnitude 1.
    /// If the magnitude is zero, the original vector is returned unmodified.
    pub fn normalize(self) -> Self {
        let magnitude = self.abs();
        if magnitude.is_zero() { self } else { Self::new(self.x / magnitude, self.y / magnitude) }
    }

    /// Computes a perpendicular unit vector to the current vector.
    ///
    /// The direction of the perpendicular vector depends on the `clockwise` parameter:
    /// `true` rotates by -90°, `false` by +90° (mathematical orientation).
    pub fn perp_unit(&self, clockwise: bool) -> Self {
        let perp = if clockwise { Self::new(self.y, -self.x) } else { Self::new(-self.y, self.x) };
        perp.normalize()
    }

    /// Returns the angle of the vector in radians, as given by `atan2(y, x)`.
    pub fn angle(&self) -> T { self.y.atan2(self.x) }

    /// Rotates the vector by a given angle in radians.
    pub fn rotate_by(&mut self, angle_radians: T) {
        let sin = angle_radians.sin();
        let cos = angle_radians.cos();
        let new_x = self.x * cos - self.y * sin;
        self.y = self.x * sin + self.y * cos;
        self.x = new_x;
    }

    /// Computes the Euclidean distance between the current vector and another vector.
    pub fn euclid_distance(&self, other: &Self) -> T {
        ((self.x - other.x) * (self.x - other.x) + (self.y - other.y) * (self.y - other.y)).sqrt()
    }

    /// Returns `true` if both components are finite numbers.
    pub fn is_finite(&self) -> bool { self.x.is_finite() && self.y.is_finite() }
}

impl<T: Display> Display for Vec2D<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

impl<T: Float> Add for Vec2D<T> {
    type Output = Vec2D<T>;

    fn add(self, rhs: Vec2D<T>) -> Self::Output { Self::new(self.x + rhs.x, self.y + rhs.y) }
}

impl<T: Float> AddAssign for Vec2D<T> {
    fn add_assign(&mut self, rhs: Vec2D<T>) {
        self.x = self.x + rhs.x;
        self.y = self.y + rhs.y;
    }
}

impl<T: Float> Sub for Vec2D<T> {
    type Output = Vec2D<T>;

    fn sub(self, rhs: Vec2D<T>) -> Self::Output { Self::new(self.x - rhs.x, self.y - rhs.y) }
}

impl<T: Float> SubAssign for Vec2D<T> {
    fn sub_assign(&mut self, rhs: Vec2D<T>) {
        self.x = self.x - rhs.x;
        self.y = self.y - rhs.y;
    }
}

impl<T: Float> Neg for Vec2D<T> {
    type Output = Vec2D<T>;

    fn neg(self) -> Self::Output { Self::new(-self.x, -self.y) }
}

impl<T: Float> Mul<T> for Vec2D<T> {
    type Output = Vec2D<T>;

    fn mul(self, rhs: T) -> Self::Output { Self::new(self.x * rhs, self.y * rhs) }
}

impl<T: Float> Div<T> for Vec2D<T> {
    type Output = Vec2D<T>;

    fn div(self, rhs: T) -> Self::Output { Self::new(self.x / rhs, self.y / rhs) }
}

impl<T: Copy> From<(T, T)> for Vec2D<T> {
    fn from(tuple: (T, T)) -> Self { Self::new(tuple.0, tuple.1) }
}

impl<T: Copy> From<Vec2D<T>> for (T, T) {
    fn from(value: Vec2D<T>) -> Self { (value.x, value.y) }
}
