//! Projective transforms between the source quadrilateral and the output
//! rectangle.
//!
//! [`Transform2D`] is the seam between the rectifier and the linear-algebra
//! backend; [`Homography`] is the nalgebra-backed implementation.

use log::trace;
use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

use crate::error::{RectifyError, Result};
use crate::geometry::Point;

/// Relative tolerance for treating three corners as collinear
const COLLINEAR_EPS: f64 = 1e-9;

/// A plane-to-plane mapping that can be applied both ways
pub trait Transform2D {
    /// Map a source-plane point into the destination plane
    fn apply_forward(&self, p: Point) -> Point;

    /// Map a destination-plane point back into the source plane
    fn apply_inverse(&self, p: Point) -> Point;

    /// The same mapping with source and destination swapped
    fn invert(&self) -> Self
    where
        Self: Sized;
}

/// An invertible 3x3 projective matrix, normalized so that `h33 == 1`
/// whenever that entry is non-zero
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    forward: Matrix3<f64>,
    inverse: Matrix3<f64>,
}

impl Homography {
    /// Wrap a matrix, failing when it cannot be inverted
    pub fn from_matrix(m: Matrix3<f64>) -> Result<Self> {
        if m.iter().any(|v| !v.is_finite()) {
            return Err(RectifyError::InvalidInput(
                "homography has non-finite entries".to_string(),
            ));
        }
        let inverse = m.try_inverse().ok_or_else(|| {
            RectifyError::DegenerateGeometry("projective matrix is singular".to_string())
        })?;
        Ok(Self {
            forward: m,
            inverse,
        })
    }

    /// Solve the unique homography taking each `src[i]` to `dst[i]`.
    ///
    /// Both point sets are Hartley-normalized before the 8x8 system is
    /// solved, then the result is mapped back to pixel coordinates.
    pub fn from_correspondences(src: &[Point; 4], dst: &[Point; 4]) -> Result<Self> {
        ensure_general_position(src, "source")?;
        ensure_general_position(dst, "destination")?;

        let (src_n, t_src) = normalize_points(src);
        let (dst_n, t_dst) = normalize_points(dst);

        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();

        for k in 0..4 {
            let (x, y) = (src_n[k].x, src_n[k].y);
            let (u, v) = (dst_n[k].x, dst_n[k].y);

            // h11 x + h12 y + h13 - u h31 x - u h32 y = u
            let r0 = 2 * k;
            a[(r0, 0)] = x;
            a[(r0, 1)] = y;
            a[(r0, 2)] = 1.0;
            a[(r0, 6)] = -u * x;
            a[(r0, 7)] = -u * y;
            b[r0] = u;

            // h21 x + h22 y + h23 - v h31 x - v h32 y = v
            let r1 = 2 * k + 1;
            a[(r1, 3)] = x;
            a[(r1, 4)] = y;
            a[(r1, 5)] = 1.0;
            a[(r1, 6)] = -v * x;
            a[(r1, 7)] = -v * y;
            b[r1] = v;
        }

        let h = a.lu().solve(&b).ok_or_else(|| {
            RectifyError::DegenerateGeometry(
                "corner correspondences do not determine a homography".to_string(),
            )
        })?;

        let hn = Matrix3::new(
            h[0], h[1], h[2], //
            h[3], h[4], h[5], //
            h[6], h[7], 1.0,
        );

        let t_dst_inv = t_dst.try_inverse().ok_or_else(|| {
            RectifyError::DegenerateGeometry("destination normalization is singular".to_string())
        })?;
        let m = normalize_scale(t_dst_inv * hn * t_src)?;
        trace!("homography solved: {:?}", m);

        Self::from_matrix(m)
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.forward
    }

    pub fn inverse_matrix(&self) -> &Matrix3<f64> {
        &self.inverse
    }
}

impl Transform2D for Homography {
    fn apply_forward(&self, p: Point) -> Point {
        project(&self.forward, p)
    }

    fn apply_inverse(&self, p: Point) -> Point {
        project(&self.inverse, p)
    }

    fn invert(&self) -> Self {
        Self {
            forward: self.inverse,
            inverse: self.forward,
        }
    }
}

/// Apply `m` in homogeneous coordinates.
///
/// Points sent to the line at infinity come back non-finite.
#[inline]
pub(crate) fn project(m: &Matrix3<f64>, p: Point) -> Point {
    let v = m * Vector3::new(p.x, p.y, 1.0);
    if v.z.abs() < f64::EPSILON {
        return Point::new(f64::NAN, f64::NAN);
    }
    Point::new(v.x / v.z, v.y / v.z)
}

fn normalize_scale(h: Matrix3<f64>) -> Result<Matrix3<f64>> {
    let s = h[(2, 2)];
    if s.abs() < 1e-12 {
        return Err(RectifyError::DegenerateGeometry(
            "homography maps the origin to infinity".to_string(),
        ));
    }
    Ok(h / s)
}

/// Reject point sets with a coincident pair or three collinear points
fn ensure_general_position(pts: &[Point; 4], which: &str) -> Result<()> {
    let scale = pts
        .iter()
        .flat_map(|a| pts.iter().map(move |b| (a - b).norm()))
        .fold(0.0_f64, f64::max);
    if scale <= f64::EPSILON {
        return Err(RectifyError::DegenerateGeometry(format!(
            "{which} corners are coincident"
        )));
    }

    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    for (i, j, k) in TRIPLES {
        let ab = pts[j] - pts[i];
        let ac = pts[k] - pts[i];
        let cross = ab.x * ac.y - ab.y * ac.x;
        if cross.abs() <= COLLINEAR_EPS * scale * scale {
            return Err(RectifyError::DegenerateGeometry(format!(
                "{which} corners {i}, {j}, {k} are collinear"
            )));
        }
    }
    Ok(())
}

/// Translate to the centroid and scale so the mean distance is sqrt(2)
fn normalize_points(pts: &[Point; 4]) -> ([Point; 4], Matrix3<f64>) {
    let n = pts.len() as f64;
    let cx = pts.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = pts.iter().map(|p| p.y).sum::<f64>() / n;
    let mean_dist = pts
        .iter()
        .map(|p| (p.x - cx).hypot(p.y - cy))
        .sum::<f64>()
        / n;

    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    let t = Matrix3::new(
        s, 0.0, -s * cx, //
        0.0, s, -s * cy, //
        0.0, 0.0, 1.0,
    );

    (pts.map(|p| project(&t, p)), t)
}
