use std::{
    fmt::Display,
    ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign},
};

use cgmath::{Vector3, Zero};
use serde::{Deserialize, Serialize};

/// A plain 3D vector used for positions and directions on the layout.
/// Serializes as `{"x": .., "y": .., "z": ..}`, which is the layout file format.
///
/// Y is up. Track geometry lives in the horizontal X-Z plane.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Vec3<T = f64> {
    pub x: T,
    pub y: T,
    pub z: T,
}

impl<T> Vec3<T> {
    pub const fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }
}

impl<T: Copy> Vec3<T> {
    pub fn map<U>(&self, f: impl Fn(T) -> U) -> Vec3<U> {
        Vec3 {
            x: f(self.x),
            y: f(self.y),
            z: f(self.z),
        }
    }
}

impl<T: Display> Display for Vec3<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl<T: PartialEq> PartialEq for Vec3<T> {
    fn eq(&self, other: &Self) -> bool {
        self.x.eq(&other.x) && self.y.eq(&other.y) && self.z.eq(&other.z)
    }
}

impl<T: Default> Default for Vec3<T> {
    fn default() -> Self {
        Self {
            x: T::default(),
            y: T::default(),
            z: T::default(),
        }
    }
}

impl<T> Vec3<T>
where
    T: Add<T, Output = T> + Mul<T, Output = T> + Sub<T, Output = T> + Clone + Copy,
{
    pub fn length2(&self) -> T {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn dot(&self, rhs: Self) -> T {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(&self, rhs: Self) -> Self {
        Self {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }
}

impl Vec3<f64> {
    pub const UP: Self = Self::new(0., 1., 0.);
    pub const FORWARD: Self = Self::new(0., 0., 1.);

    pub fn zero() -> Self {
        Self::new(0., 0., 0.)
    }

    pub fn length(&self) -> f64 {
        self.length2().sqrt()
    }

    /// Returns the vector unchanged if it is too short to normalize.
    pub fn normalized(&self) -> Self {
        let len = self.length();
        if len.is_subnormal() || len == 0. {
            *self
        } else {
            *self / len
        }
    }

    pub fn lerp(&self, rhs: Self, f: f64) -> Self {
        *self * (1. - f) + rhs * f
    }

    pub fn distance(&self, rhs: Self) -> f64 {
        (*self - rhs).length()
    }

    /// Projection onto the horizontal plane.
    pub fn flat(&self) -> Self {
        Self::new(self.x, 0., self.z)
    }

    /// Distance measured in the X-Z plane only.
    pub fn distance_xz(&self, rhs: Self) -> f64 {
        (*self - rhs).flat().length()
    }

    /// Return a copy of the vector rotated 90 degrees to the left around the Y axis,
    /// i.e. `UP x self`. Only X and Z take part.
    pub fn left90(&self) -> Self {
        Self::new(self.z, 0., -self.x)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Bridges to cgmath types
impl<T: Clone + Copy + Zero> Vec3<T> {
    pub fn to_vector3(&self) -> Vector3<T> {
        Vector3::new(self.x, self.y, self.z)
    }
}

impl<T> From<[T; 3]> for Vec3<T> {
    fn from([x, y, z]: [T; 3]) -> Self {
        Vec3 { x, y, z }
    }
}

impl<T> From<Vector3<T>> for Vec3<T> {
    fn from(v: Vector3<T>) -> Self {
        Vec3 {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl<T: Add<Output = T>> Add for Vec3<T> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl<T: AddAssign> AddAssign for Vec3<T> {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl<T: Sub<Output = T>> Sub for Vec3<T> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl<T: SubAssign> SubAssign for Vec3<T> {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
        self.z -= rhs.z;
    }
}

impl<T: Mul<Output = T> + Copy> Mul<T> for Vec3<T> {
    type Output = Self;
    fn mul(self, rhs: T) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

impl<T: Div<Output = T> + Copy> Div<T> for Vec3<T> {
    type Output = Self;
    fn div(self, rhs: T) -> Self::Output {
        Self {
            x: self.x / rhs,
            y: self.y / rhs,
            z: self.z / rhs,
        }
    }
}

impl<T: Neg<Output = T>> Neg for Vec3<T> {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn left_of_forward_is_positive_x() {
        let left = Vec3::FORWARD.left90();
        assert_eq!(left, Vec3::new(1., 0., 0.));
        let cross = Vec3::UP.cross(Vec3::FORWARD);
        assert_eq!(cross, left);
    }

    #[test]
    fn normalize_keeps_zero_vector() {
        assert_eq!(Vec3::zero().normalized(), Vec3::zero());
        let n = Vec3::new(3., 0., 4.).normalized();
        assert_relative_eq!(n.length(), 1., epsilon = 1e-12);
        assert_relative_eq!(n.x, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn horizontal_distance_ignores_height() {
        let a = Vec3::new(0., 5., 0.);
        let b = Vec3::new(3., -2., 4.);
        assert_relative_eq!(a.distance_xz(b), 5., epsilon = 1e-12);
    }
}
