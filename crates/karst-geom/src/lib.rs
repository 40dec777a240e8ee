//! Minimal geometry types shared by the engine crates.
#![forbid(unsafe_code)]

use core::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn dot(self, rhs: Vec2) -> f32 {
        self.x * rhs.x + self.y * rhs.y
    }

    #[inline]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    #[inline]
    pub fn distance_squared(self, rhs: Vec2) -> f32 {
        (rhs - self).length_squared()
    }

    /// Unit vector at `degrees` from +X, scaled by `length`.
    #[inline]
    pub fn from_polar_degrees(degrees: f32, length: f32) -> Vec2 {
        let r = degrees.to_radians();
        Vec2::new(r.cos() * length, r.sin() * length)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn dot(self, rhs: Vec3) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[inline]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    #[inline]
    pub fn normalized(self) -> Vec3 {
        let len = self.length();
        if len > 0.0 { self / len } else { self }
    }

    #[inline]
    pub fn xy(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    #[inline]
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    #[inline]
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vec3 {
    #[inline]
    fn sub_assign(&mut self, rhs: Vec3) {
        self.x -= rhs.x;
        self.y -= rhs.y;
        self.z -= rhs.z;
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    #[inline]
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f32> for Vec3 {
    type Output = Vec3;
    #[inline]
    fn div(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

/// Integer block offset, used by structure templates and edits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IVec3 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl IVec3 {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Aabb2 {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb2 {
    #[inline]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    #[inline]
    pub fn center(self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn nearest_point(self, p: Vec2) -> Vec2 {
        Vec2::new(
            p.x.clamp(self.min.x, self.max.x),
            p.y.clamp(self.min.y, self.max.y),
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Aabb3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb3 {
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

#[inline]
fn segment_fraction_2d(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return 0.0;
    }
    ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
}

#[inline]
fn segment_fraction_3d(p: Vec3, a: Vec3, b: Vec3) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return 0.0;
    }
    ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
}

#[inline]
pub fn nearest_point_on_segment_2d(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let t = segment_fraction_2d(p, a, b);
    a + (b - a) * t
}

#[inline]
pub fn nearest_point_on_segment_3d(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let t = segment_fraction_3d(p, a, b);
    a + (b - a) * t
}

/// Nearest point on (or inside) the capsule around segment `a..b` with
/// the given radius. A point already inside the capsule maps to itself.
pub fn nearest_point_on_capsule_2d(p: Vec2, a: Vec2, b: Vec2, radius: f32) -> Vec2 {
    let on_seg = nearest_point_on_segment_2d(p, a, b);
    let d = p - on_seg;
    let dist = d.length();
    if dist <= radius {
        p
    } else {
        on_seg + d * (radius / dist)
    }
}

pub fn nearest_point_on_capsule_3d(p: Vec3, a: Vec3, b: Vec3, radius: f32) -> Vec3 {
    let on_seg = nearest_point_on_segment_3d(p, a, b);
    let d = p - on_seg;
    let dist = d.length();
    if dist <= radius {
        p
    } else {
        on_seg + d * (radius / dist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_nearest_clamps_to_endpoints() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(10.0, 0.0, 0.0);
        let before = nearest_point_on_segment_3d(Vec3::new(-5.0, 2.0, 0.0), a, b);
        assert_eq!(before, a);
        let after = nearest_point_on_segment_3d(Vec3::new(25.0, -3.0, 1.0), a, b);
        assert_eq!(after, b);
        let mid = nearest_point_on_segment_3d(Vec3::new(4.0, 9.0, 0.0), a, b);
        assert_eq!(mid, Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn capsule_keeps_interior_points() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(10.0, 0.0, 0.0);
        let inside = Vec3::new(5.0, 1.0, 0.0);
        assert_eq!(nearest_point_on_capsule_3d(inside, a, b, 2.0), inside);
        let outside = Vec3::new(5.0, 4.0, 0.0);
        let q = nearest_point_on_capsule_3d(outside, a, b, 2.0);
        assert!((q - Vec3::new(5.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn aabb2_nearest_point_clamps() {
        let bb = Aabb2::new(Vec2::new(0.0, 0.0), Vec2::new(16.0, 16.0));
        assert_eq!(bb.nearest_point(Vec2::new(-4.0, 8.0)), Vec2::new(0.0, 8.0));
        assert_eq!(bb.nearest_point(Vec2::new(3.0, 5.0)), Vec2::new(3.0, 5.0));
        assert!(bb.contains(Vec2::new(16.0, 0.0)));
        assert!(!bb.contains(Vec2::new(16.1, 0.0)));
    }

    #[test]
    fn polar_degrees_axes() {
        let east = Vec2::from_polar_degrees(0.0, 2.0);
        assert!((east.x - 2.0).abs() < 1e-6 && east.y.abs() < 1e-6);
        let north = Vec2::from_polar_degrees(90.0, 3.0);
        assert!(north.x.abs() < 1e-5 && (north.y - 3.0).abs() < 1e-6);
    }
}
