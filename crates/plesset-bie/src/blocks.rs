//! Per-element result blocks of the boundary-integral operators.
//!
//! One triangle pair contributes either a scalar (constant × constant),
//! a 3-vector (linear basis over the source triangle), or a 3×3 block
//! (linear × linear). The three shapes form a closed set under the
//! [`Block`] trait: zero, accumulate, scale, and the analytic prefactor
//! of the H operator on an identical pair.

use std::f64::consts::PI;
use std::ops::{AddAssign, Index, MulAssign};

mod private {
    pub trait Sealed {}
    impl Sealed for f64 {}
    impl Sealed for super::Lin {}
    impl Sealed for super::LinLin {}
}

/// A result block: scalar, 3-vector, or 3×3.
///
/// The trait is sealed: these three shapes are the complete set the
/// integrator produces.
pub trait Block:
    Copy + AddAssign<Self> + MulAssign<f64> + private::Sealed + Send + Sync + 'static
{
    /// Additive identity.
    const ZERO: Self;
    /// Analytic H prefactor on an identical triangle pair; the H block
    /// there is `-jacobian ×` this table, no quadrature involved.
    const IDENTICAL_H_FACTOR: Self;
}

impl Block for f64 {
    const ZERO: f64 = 0.0;
    const IDENTICAL_H_FACTOR: f64 = PI;
}

/// Linear-basis block: one entry per source-triangle corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lin(pub [f64; 3]);

impl AddAssign for Lin {
    fn add_assign(&mut self, rhs: Self) {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a += b;
        }
    }
}

impl MulAssign<f64> for Lin {
    fn mul_assign(&mut self, s: f64) {
        for a in &mut self.0 {
            *a *= s;
        }
    }
}

impl Index<usize> for Lin {
    type Output = f64;
    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

impl Block for Lin {
    const ZERO: Lin = Lin([0.0; 3]);
    const IDENTICAL_H_FACTOR: Lin = Lin([PI / 3.0; 3]);
}

/// Linear × linear block, row-major over (test corner, trial corner).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinLin(pub [f64; 9]);

impl AddAssign for LinLin {
    fn add_assign(&mut self, rhs: Self) {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a += b;
        }
    }
}

impl MulAssign<f64> for LinLin {
    fn mul_assign(&mut self, s: f64) {
        for a in &mut self.0 {
            *a *= s;
        }
    }
}

impl LinLin {
    /// Entry for test corner `i` and trial corner `j`.
    #[inline]
    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.0[3 * i + j]
    }
}

impl Block for LinLin {
    const ZERO: LinLin = LinLin([0.0; 9]);
    #[rustfmt::skip]
    const IDENTICAL_H_FACTOR: LinLin = LinLin([
        PI / 6.0,  PI / 12.0, PI / 12.0,
        PI / 12.0, PI / 6.0,  PI / 12.0,
        PI / 12.0, PI / 12.0, PI / 6.0,
    ]);
}

/// A G/H pair of result blocks.
#[derive(Debug, Clone, Copy)]
pub struct Pair<G: Block, H: Block> {
    /// Single-layer (1/4πr kernel, up to the 4π) contribution.
    pub g: G,
    /// Double-layer contribution.
    pub h: H,
}

impl<G: Block, H: Block> Pair<G, H> {
    /// Zero pair.
    pub const ZERO: Self = Self {
        g: G::ZERO,
        h: H::ZERO,
    };
}

impl<G: Block, H: Block> AddAssign for Pair<G, H> {
    fn add_assign(&mut self, rhs: Self) {
        self.g += rhs.g;
        self.h += rhs.h;
    }
}

impl<G: Block, H: Block> MulAssign<f64> for Pair<G, H> {
    fn mul_assign(&mut self, s: f64) {
        self.g *= s;
        self.h *= s;
    }
}

/// Linear shape functions `(1−x₀, x₀−x₁, x₁)` over the patch
/// parametrization of [`crate::patch::LinearPatch`].
#[inline]
pub fn linear_shapes(x0: f64, x1: f64) -> Lin {
    Lin([1.0 - x0, x0 - x1, x1])
}

/// Linear shape functions `(u, v, 1−u−v)` over the barycentric
/// parametrization of [`crate::patch::CubicPatch`].
#[inline]
pub fn linear_shapes_cubic(u: f64, v: f64) -> Lin {
    Lin([u, v, 1.0 - u - v])
}

/// Products of test and trial linear shapes, row-major.
#[inline]
pub fn bilinear_shapes(x0: f64, x1: f64, y0: f64, y1: f64) -> LinLin {
    let x0y0 = x0 * y0;
    let x0y1 = x0 * y1;
    let x1y0 = x1 * y0;
    let x1y1 = x1 * y1;
    LinLin([
        1.0 - x0 - y0 + x0y0,
        y0 - y1 - x0y0 + x0y1,
        y1 - x0y1,
        x0 - x1 - x0y0 + x1y0,
        x0y0 - x0y1 - x1y0 + x1y1,
        x0y1 - x1y1,
        x1 - x1y0,
        x1y0 - x1y1,
        x1y1,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_shapes_partition_of_unity() {
        for &(x0, x1) in &[(0.3, 0.1), (0.9, 0.5), (1.0, 1.0)] {
            let s = linear_shapes(x0, x1);
            approx::assert_relative_eq!(s[0] + s[1] + s[2], 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_bilinear_is_outer_product() {
        let (x0, x1, y0, y1) = (0.7, 0.2, 0.4, 0.3);
        let sx = linear_shapes(x0, x1);
        let sy = linear_shapes(y0, y1);
        let b = bilinear_shapes(x0, x1, y0, y1);
        for i in 0..3 {
            for j in 0..3 {
                approx::assert_relative_eq!(b.at(i, j), sx[i] * sy[j], epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_identical_h_factor_row_sums() {
        // each row of the 3×3 table sums to π/3, and the three rows sum
        // to the scalar factor π
        let f = LinLin::IDENTICAL_H_FACTOR;
        let mut total = 0.0;
        for i in 0..3 {
            let row: f64 = (0..3).map(|j| f.at(i, j)).sum();
            approx::assert_relative_eq!(row, PI / 3.0, epsilon = 1e-14);
            total += row;
        }
        approx::assert_relative_eq!(total, f64::IDENTICAL_H_FACTOR, epsilon = 1e-14);
    }
}
