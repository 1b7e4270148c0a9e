//! Reference-triangle surface patches.
//!
//! [`LinearPatch`] parametrizes the flat triangle `(a, b, c)` as
//! `a + u·(b−a) + v·(c−b)` over `0 ≤ v ≤ u ≤ 1`, with constant Jacobian
//! and normal. [`CubicPatch`] is the ten-control-point cubic Bézier
//! triangle over barycentric `(u, v, w)` built from the three corners
//! and their vertex normals; it is what the cubic collocation scheme
//! integrates over, and its corner tangent-derivative formulas avoid the
//! 0/0 of the generic derivative at the corners.

use plesset_math::Vec3;

/// Flat triangle with precomputed Jacobian and unit normal.
#[derive(Debug, Clone, Copy)]
pub struct LinearPatch {
    a: Vec3,
    ab: Vec3,
    bc: Vec3,
    normal: Vec3,
    jacobian: f64,
}

impl LinearPatch {
    /// Build the patch over the (ordered) corners `a`, `b`, `c`.
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let ab = b - a;
        let bc = c - b;
        let scaled = ab.cross(&bc);
        let jacobian = scaled.norm();
        if jacobian < 1e-14 * ab.norm_squared().max(bc.norm_squared()) {
            log::warn!("near-degenerate triangle: jacobian {jacobian:.3e}");
        }
        Self {
            a,
            ab,
            bc,
            normal: scaled / jacobian,
            jacobian,
        }
    }

    /// Surface Jacobian `‖(b−a)×(c−b)‖` (twice the area).
    #[inline]
    pub fn jacobian(&self) -> f64 {
        self.jacobian
    }

    /// Triangle area.
    #[inline]
    pub fn area(&self) -> f64 {
        0.5 * self.jacobian
    }

    /// Constant outward unit normal.
    #[inline]
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Point at parameters `(u, v)`.
    #[inline]
    pub fn interpolate(&self, u: f64, v: f64) -> Vec3 {
        self.a + u * self.ab + v * self.bc
    }

    /// Point at `(u, v)` relative to corner `a`; used by the singular
    /// collocation rule where the collocation point is `a` itself.
    #[inline]
    pub fn interp_relative(&self, u: f64, v: f64) -> Vec3 {
        u * self.ab + v * self.bc
    }
}

/// Cubic Bézier triangle over barycentric coordinates.
///
/// Corner `a` sits at `u = 1`, `b` at `v = 1`, `c` at `w = 1 − u − v = 1`.
#[derive(Debug, Clone, Copy)]
pub struct CubicPatch {
    p300: Vec3,
    p030: Vec3,
    p003: Vec3,
    p210: Vec3,
    p120: Vec3,
    p021: Vec3,
    p012: Vec3,
    p102: Vec3,
    p201: Vec3,
    p111: Vec3,
}

// tangent control point at 2/3 along p1 -> p2, projected into the
// tangent plane of p1
fn project_two_thirds(p1: Vec3, p2: Vec3, n1: Vec3) -> Vec3 {
    let w = (p1 - p2).dot(&n1);
    (2.0 * p1 + p2 + w * n1) / 3.0
}

impl CubicPatch {
    /// Build the patch from the corners and their unit vertex normals.
    pub fn new(a: Vec3, b: Vec3, c: Vec3, na: Vec3, nb: Vec3, nc: Vec3) -> Self {
        let p210 = project_two_thirds(a, b, na);
        let p120 = project_two_thirds(b, a, nb);
        let p021 = project_two_thirds(b, c, nb);
        let p012 = project_two_thirds(c, b, nc);
        let p102 = project_two_thirds(c, a, nc);
        let p201 = project_two_thirds(a, c, na);
        let e = (p210 + p120 + p021 + p012 + p102 + p201) / 6.0;
        let v = (a + b + c) / 3.0;
        let p111 = e + (e - v) * 0.5;
        Self {
            p300: a,
            p030: b,
            p003: c,
            p210,
            p120,
            p021,
            p012,
            p102,
            p201,
            p111,
        }
    }

    /// Corner `a` of the patch.
    #[inline]
    pub fn corner_a(&self) -> Vec3 {
        self.p300
    }

    /// Position at barycentric `(u, v)`.
    pub fn interpolate(&self, u: f64, v: f64) -> Vec3 {
        let w = 1.0 - u - v;
        let u2 = u * u;
        let v2 = v * v;
        let w2 = w * w;
        u * u2 * self.p300
            + v * v2 * self.p030
            + w * w2 * self.p003
            + 3.0 * u2 * v * self.p210
            + 3.0 * u2 * w * self.p201
            + 3.0 * u * v2 * self.p120
            + 3.0 * v2 * w * self.p021
            + 3.0 * v * w2 * self.p012
            + 3.0 * u * w2 * self.p102
            + 6.0 * u * v * w * self.p111
    }

    /// Partial derivative ∂x/∂u.
    pub fn du(&self, u: f64, v: f64) -> Vec3 {
        let w = 1.0 - u - v;
        let u2 = u * u;
        let v2 = v * v;
        let w2 = w * w;
        3.0 * (u2 * self.p300 - w2 * self.p003 + v2 * (self.p120 - self.p021))
            + (6.0 * u * w - 3.0 * u2) * self.p201
            + (3.0 * w2 - 6.0 * u * w) * self.p102
            + 6.0 * ((v * w - u * v) * self.p111 + u * v * self.p210 - v * w * self.p012)
    }

    /// Partial derivative ∂x/∂v.
    pub fn dv(&self, u: f64, v: f64) -> Vec3 {
        let w = 1.0 - u - v;
        let u2 = u * u;
        let v2 = v * v;
        let w2 = w * w;
        3.0 * (v2 * self.p030 - w2 * self.p003 + u2 * (self.p210 - self.p201))
            + (6.0 * v * w - 3.0 * v2) * self.p021
            + (3.0 * w2 - 6.0 * v * w) * self.p012
            + 6.0 * ((u * w - u * v) * self.p111 + u * v * self.p120 - u * w * self.p102)
    }

    /// Unnormalized surface vector `∂x/∂u × ∂x/∂v`; its norm is the
    /// local Jacobian.
    pub fn surface_vector(&self, u: f64, v: f64) -> Vec3 {
        self.du(u, v).cross(&self.dv(u, v))
    }

    /// Unit normal at `(u, v)`.
    pub fn normal(&self, u: f64, v: f64) -> Vec3 {
        self.surface_vector(u, v).normalize()
    }

    /// Tangential surface gradient of the linear field with corner
    /// values `(pa, pb, pc)`, evaluated at corner `a`.
    pub fn tangent_derivative_at_a(&self, pa: f64, pb: f64, pc: f64) -> Vec3 {
        // u = 1, v = w = 0: the generic derivative degenerates, but the
        // edge tangents reduce to differences of control points
        let dudx = 3.0 * (self.p300 - self.p201);
        let dvdx = 3.0 * (self.p210 - self.p201);
        corner_gradient(dudx, dvdx, pa, pb, pc)
    }

    /// Tangential surface gradient of a linear field at corner `b`.
    pub fn tangent_derivative_at_b(&self, pa: f64, pb: f64, pc: f64) -> Vec3 {
        let dudx = 3.0 * (self.p120 - self.p021);
        let dvdx = 3.0 * (self.p030 - self.p021);
        corner_gradient(dudx, dvdx, pa, pb, pc)
    }

    /// Tangential surface gradient of a linear field at corner `c`.
    pub fn tangent_derivative_at_c(&self, pa: f64, pb: f64, pc: f64) -> Vec3 {
        let dudx = 3.0 * (self.p102 - self.p003);
        let dvdx = 3.0 * (self.p012 - self.p003);
        corner_gradient(dudx, dvdx, pa, pb, pc)
    }
}

// gradient of the linear field over the local tangent frame spanned by
// the two corner tangents
fn corner_gradient(dudx: Vec3, dvdx: Vec3, pa: f64, pb: f64, pc: f64) -> Vec3 {
    let ab = dvdx - dudx;
    let bc = -dvdx;
    let mut n = ab.cross(&bc);
    n /= n.norm_squared();
    (pc - pb) * n.cross(&ab) + (pa - pb) * n.cross(&bc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_patch() -> LinearPatch {
        LinearPatch::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn test_linear_patch_corners() {
        let p = unit_patch();
        approx::assert_relative_eq!((p.interpolate(0.0, 0.0) - Vec3::zeros()).norm(), 0.0);
        approx::assert_relative_eq!(
            (p.interpolate(1.0, 0.0) - Vec3::new(1.0, 0.0, 0.0)).norm(),
            0.0
        );
        approx::assert_relative_eq!(
            (p.interpolate(1.0, 1.0) - Vec3::new(0.0, 1.0, 0.0)).norm(),
            0.0
        );
        approx::assert_relative_eq!(p.jacobian(), 1.0);
        approx::assert_relative_eq!(p.area(), 0.5);
        approx::assert_relative_eq!(p.normal().z, 1.0);
    }

    #[test]
    fn test_cubic_patch_flat_triangle_is_linear() {
        // flat geometry with the true plane normal reproduces the plane
        let n = Vec3::new(0.0, 0.0, 1.0);
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(1.0, 0.0, 0.0);
        let c = Vec3::new(0.0, 1.0, 0.0);
        let patch = CubicPatch::new(a, b, c, n, n, n);
        for &(u, v) in &[(1.0, 0.0), (0.0, 1.0), (0.0, 0.0), (0.3, 0.3), (0.2, 0.5)] {
            let p = patch.interpolate(u, v);
            let expect = u * a + v * b + (1.0 - u - v) * c;
            approx::assert_relative_eq!((p - expect).norm(), 0.0, epsilon = 1e-12);
            approx::assert_relative_eq!(patch.normal(u, v).z, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cubic_patch_interpolates_sphere() {
        // corners on the unit sphere with radial normals: the patch
        // midpoint bulges to approximate the sphere
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        let c = Vec3::new(0.0, 0.0, 1.0);
        let patch = CubicPatch::new(a, b, c, a, b, c);
        let mid = patch.interpolate(1.0 / 3.0, 1.0 / 3.0);
        assert!(mid.norm() > 0.98 && mid.norm() < 1.02, "norm {}", mid.norm());
    }

    #[test]
    fn test_corner_tangent_derivative_matches_flat_gradient() {
        let n = Vec3::new(0.0, 0.0, 1.0);
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(1.0, 0.0, 0.0);
        let c = Vec3::new(0.0, 1.0, 0.0);
        let patch = CubicPatch::new(a, b, c, n, n, n);
        // field f = x + 2y: values at corners a, b, c
        let (pa, pb, pc) = (0.0, 1.0, 2.0);
        for grad in [
            patch.tangent_derivative_at_a(pa, pb, pc),
            patch.tangent_derivative_at_b(pa, pb, pc),
            patch.tangent_derivative_at_c(pa, pb, pc),
        ] {
            approx::assert_relative_eq!(grad.x, 1.0, epsilon = 1e-10);
            approx::assert_relative_eq!(grad.y, 2.0, epsilon = 1e-10);
            approx::assert_relative_eq!(grad.z, 0.0, epsilon = 1e-10);
        }
    }
}
