use glam::{Affine2, Mat2, Mat4, Vec2 as GlamVec2, Vec4};
use serde::{Deserialize, Serialize};

/// Smallest positive duration an action may have.
///
/// A zero duration is coerced to this value so normalized time stays finite.
pub const FLT_EPSILON: f32 = 1.192_092_9e-7;

/// 2D vector type used throughout Stagecraft.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };
    pub const ONE: Self = Self { x: 1.0, y: 1.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn to_glam(&self) -> GlamVec2 {
        GlamVec2::new(self.x, self.y)
    }

    /// Computes the distance between two points.
    pub fn distance(self, rhs: Self) -> f32 {
        (self - rhs).length()
    }

    /// Linearly interpolates between two vectors.
    pub fn lerp(self, rhs: Self, t: f32) -> Self {
        Self::new(
            self.x + (rhs.x - self.x) * t,
            self.y + (rhs.y - self.y) * t,
        )
    }
}

impl From<(f32, f32)> for Vec2 {
    fn from(value: (f32, f32)) -> Self {
        Self {
            x: value.0,
            y: value.1,
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

/// Width/height pair in points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle with its origin at the bottom-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x <= self.max_x() && point.y >= self.y && point.y <= self.max_y()
    }
}

/// 8-bit RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color3B {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color3B {
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Multiplies each channel by `parent / 255`, truncating.
    pub fn modulate(self, parent: Color3B) -> Self {
        Self::new(
            modulate_channel(self.r, parent.r),
            modulate_channel(self.g, parent.g),
            modulate_channel(self.b, parent.b),
        )
    }
}

impl Default for Color3B {
    fn default() -> Self {
        Self::WHITE
    }
}

/// `value * parent / 255`, truncated to a byte.
pub fn modulate_channel(value: u8, parent: u8) -> u8 {
    (u16::from(value) * u16::from(parent) / 255) as u8
}

/// 2D affine transform.
///
/// Maps `(x, y)` to `(a*x + c*y + tx, b*x + d*y + ty)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineTransform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
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

    pub fn new(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    pub fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Applies `self` first, then `other`.
    pub fn concat(&self, other: &AffineTransform) -> Self {
        Self {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            tx: self.tx * other.a + self.ty * other.c + other.tx,
            ty: self.tx * other.b + self.ty * other.d + other.ty,
        }
    }

    /// Inverse transform. A singular matrix yields the identity.
    pub fn invert(&self) -> Self {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < f32::EPSILON {
            log::warn!("attempted to invert a singular transform {self:?}");
            return Self::IDENTITY;
        }
        let inv = 1.0 / det;
        Self {
            a: inv * self.d,
            b: -inv * self.b,
            c: -inv * self.c,
            d: inv * self.a,
            tx: inv * (self.c * self.ty - self.d * self.tx),
            ty: inv * (self.b * self.tx - self.a * self.ty),
        }
    }

    pub fn apply_point(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            self.a * point.x + self.c * point.y + self.tx,
            self.b * point.x + self.d * point.y + self.ty,
        )
    }

    /// Axis-aligned bounds of `rect` after transformation.
    pub fn apply_rect(&self, rect: Rect) -> Rect {
        let corners = [
            self.apply_point(Vec2::new(rect.x, rect.y)),
            self.apply_point(Vec2::new(rect.max_x(), rect.y)),
            self.apply_point(Vec2::new(rect.x, rect.max_y())),
            self.apply_point(Vec2::new(rect.max_x(), rect.max_y())),
        ];
        let mut min = corners[0];
        let mut max = corners[0];
        for corner in &corners[1..] {
            min.x = min.x.min(corner.x);
            min.y = min.y.min(corner.y);
            max.x = max.x.max(corner.x);
            max.y = max.y.max(corner.y);
        }
        Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    pub fn to_affine2(&self) -> Affine2 {
        Affine2::from_mat2_translation(
            Mat2::from_cols(GlamVec2::new(self.a, self.b), GlamVec2::new(self.c, self.d)),
            GlamVec2::new(self.tx, self.ty),
        )
    }

    /// Column-major 4x4 matrix for renderers, with `z` as the depth translation.
    pub fn to_mat4(&self, z: f32) -> Mat4 {
        Mat4::from_cols(
            Vec4::new(self.a, self.b, 0.0, 0.0),
            Vec4::new(self.c, self.d, 0.0, 0.0),
            Vec4::new(0.0, 0.0, 1.0, 0.0),
            Vec4::new(self.tx, self.ty, z, 1.0),
        )
    }

    pub fn approx_eq(&self, other: &AffineTransform, epsilon: f32) -> bool {
        (self.a - other.a).abs() < epsilon
            && (self.b - other.b).abs() < epsilon
            && (self.c - other.c).abs() < epsilon
            && (self.d - other.d).abs() < epsilon
            && (self.tx - other.tx).abs() < epsilon
            && (self.ty - other.ty).abs() < epsilon
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<AffineTransform> for Affine2 {
    fn from(t: AffineTransform) -> Self {
        t.to_affine2()
    }
}
