// src/core/geometry.rs

//! Vectors, coordinate systems and the text forms I++ uses for them.

use crate::core::errors::{IppError, Result};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Below this, `sin(theta)` is treated as zero when decomposing a rotation.
const GIMBAL_EPSILON: f64 = 1e-9;

/// A point or direction in machine or part coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Float3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Float3 {
    pub const ZERO: Float3 = Float3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// The unit vector in the same direction. A zero vector is returned as-is.
    pub fn normalize(&self) -> Self {
        let norm = self.norm();
        if norm == 0.0 {
            return *self;
        }
        *self * (1.0 / norm)
    }

    pub fn dot(&self, other: &Float3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Float3) -> Float3 {
        Float3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// `X(x), Y(y), Z(z)`, the argument form of `GoTo` and `PtMeas`.
    pub fn to_xyz_string(&self) -> String {
        format!("X({}), Y({}), Z({})", self.x, self.y, self.z)
    }

    /// `IJK(i,j,k)`, the approach-vector argument of `PtMeas`.
    pub fn to_ijk_string(&self) -> String {
        format!("IJK({},{},{})", self.x, self.y, self.z)
    }

    /// Extracts `X(..)`, `Y(..)` and `Z(..)` from any reply line, e.g.
    /// `00007 # X(1.5), Y(-2), Z(30.25), IJK(0,0,1)`.
    pub fn from_xyz_str(line: &str) -> Result<Self> {
        Ok(Float3::new(
            axis_value(line, 'X')?,
            axis_value(line, 'Y')?,
            axis_value(line, 'Z')?,
        ))
    }
}

/// Finds `<axis>(<number>)` where the axis letter is not part of a longer word.
fn axis_value(line: &str, axis: char) -> Result<f64> {
    let needle = format!("{axis}(");
    let bytes = line.as_bytes();
    let mut search_from = 0;

    while let Some(found) = line[search_from..].find(&needle) {
        let start = search_from + found;
        search_from = start + needle.len();
        if start > 0 && bytes[start - 1].is_ascii_alphanumeric() {
            continue;
        }
        let rest = &line[search_from..];
        let end = rest
            .find(')')
            .ok_or_else(|| IppError::UnexpectedReply(line.to_string()))?;
        return rest[..end]
            .trim()
            .parse::<f64>()
            .map_err(|_| IppError::UnexpectedReply(line.to_string()));
    }
    Err(IppError::UnexpectedReply(line.to_string()))
}

impl fmt::Display for Float3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<[f64; 3]> for Float3 {
    fn from(v: [f64; 3]) -> Self {
        Float3::new(v[0], v[1], v[2])
    }
}

impl From<Float3> for [f64; 3] {
    fn from(v: Float3) -> Self {
        [v.x, v.y, v.z]
    }
}

impl Add for Float3 {
    type Output = Float3;
    fn add(self, rhs: Float3) -> Float3 {
        Float3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Add<f64> for Float3 {
    type Output = Float3;
    fn add(self, rhs: f64) -> Float3 {
        Float3::new(self.x + rhs, self.y + rhs, self.z + rhs)
    }
}

impl Sub for Float3 {
    type Output = Float3;
    fn sub(self, rhs: Float3) -> Float3 {
        Float3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Sub<f64> for Float3 {
    type Output = Float3;
    fn sub(self, rhs: f64) -> Float3 {
        Float3::new(self.x - rhs, self.y - rhs, self.z - rhs)
    }
}

/// Component-wise product.
impl Mul for Float3 {
    type Output = Float3;
    fn mul(self, rhs: Float3) -> Float3 {
        Float3::new(self.x * rhs.x, self.y * rhs.y, self.z * rhs.z)
    }
}

impl Mul<f64> for Float3 {
    type Output = Float3;
    fn mul(self, rhs: f64) -> Float3 {
        Float3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<Float3> for f64 {
    type Output = Float3;
    fn mul(self, rhs: Float3) -> Float3 {
        rhs * self
    }
}

impl Neg for Float3 {
    type Output = Float3;
    fn neg(self) -> Float3 {
        Float3::new(-self.x, -self.y, -self.z)
    }
}

/// A homogeneous transform, row-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix4(pub [[f64; 4]; 4]);

impl Matrix4 {
    pub const IDENTITY: Matrix4 = Matrix4([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);

    pub fn from_rotation_translation(rotation: [[f64; 3]; 3], translation: Float3) -> Self {
        let t: [f64; 3] = translation.into();
        let mut m = Self::IDENTITY.0;
        for row in 0..3 {
            m[row][..3].copy_from_slice(&rotation[row]);
            m[row][3] = t[row];
        }
        Matrix4(m)
    }

    pub fn rotation(&self) -> [[f64; 3]; 3] {
        let m = &self.0;
        [
            [m[0][0], m[0][1], m[0][2]],
            [m[1][0], m[1][1], m[1][2]],
            [m[2][0], m[2][1], m[2][2]],
        ]
    }

    pub fn translation(&self) -> Float3 {
        Float3::new(self.0[0][3], self.0[1][3], self.0[2][3])
    }

    pub fn transform_point(&self, p: Float3) -> Float3 {
        let m = &self.0;
        Float3::new(
            m[0][0] * p.x + m[0][1] * p.y + m[0][2] * p.z + m[0][3],
            m[1][0] * p.x + m[1][1] * p.y + m[1][2] * p.z + m[1][3],
            m[2][0] * p.x + m[2][1] * p.y + m[2][2] * p.z + m[2][3],
        )
    }

    /// Applies only the rotation, for directions such as approach vectors.
    pub fn transform_vector(&self, v: Float3) -> Float3 {
        let m = &self.0;
        Float3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }

    pub fn multiply(&self, other: &Matrix4) -> Matrix4 {
        let mut out = [[0.0; 4]; 4];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.0[i][k] * other.0[k][j]).sum();
            }
        }
        Matrix4(out)
    }
}

/// A coordinate system as `SetCsyTransformation` takes it: origin followed by
/// the Euler angles theta, psi, phi in degrees.
///
/// The rotation is `Rz(psi) * Rx(theta) * Rz(phi)`: phi about the fixed z
/// axis first, then theta about x, then psi about z.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Csy {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub theta: f64,
    pub psi: f64,
    pub phi: f64,
}

impl Csy {
    pub fn new(x: f64, y: f64, z: f64, theta: f64, psi: f64, phi: f64) -> Self {
        Self {
            x,
            y,
            z,
            theta,
            psi,
            phi,
        }
    }

    pub fn origin(&self) -> Float3 {
        Float3::new(self.x, self.y, self.z)
    }

    /// `x, y, z, theta, psi, phi`, as appended after the csy name.
    pub fn to_arg_string(&self) -> String {
        format!(
            "{}, {}, {}, {}, {}, {}",
            self.x, self.y, self.z, self.theta, self.psi, self.phi
        )
    }

    pub fn to_matrix4(&self) -> Matrix4 {
        let r = mat3_mul(
            &mat3_mul(&rot_z(self.psi.to_radians()), &rot_x(self.theta.to_radians())),
            &rot_z(self.phi.to_radians()),
        );
        Matrix4::from_rotation_translation(r, self.origin())
    }

    /// Decomposes a transform. When theta is 0 or 180 degrees the split
    /// between phi and psi is ambiguous; psi is then reported as 0.
    pub fn from_matrix4(m: &Matrix4) -> Self {
        let r = m.rotation();
        let theta = r[2][2].clamp(-1.0, 1.0).acos();
        let (phi, psi) = if theta.sin().abs() > GIMBAL_EPSILON {
            (r[2][0].atan2(r[2][1]), r[0][2].atan2(-r[1][2]))
        } else if r[2][2] > 0.0 {
            (r[1][0].atan2(r[0][0]), 0.0)
        } else {
            ((-r[1][0]).atan2(r[0][0]), 0.0)
        };
        let origin = m.translation();
        Csy::new(
            origin.x,
            origin.y,
            origin.z,
            theta.to_degrees(),
            psi.to_degrees(),
            phi.to_degrees(),
        )
    }
}

fn rot_z(a: f64) -> [[f64; 3]; 3] {
    let (s, c) = a.sin_cos();
    [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]]
}

fn rot_x(a: f64) -> [[f64; 3]; 3] {
    let (s, c) = a.sin_cos();
    [[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]]
}

fn mat3_mul(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}
