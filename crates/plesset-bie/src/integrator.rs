//! Singular and regular integration of the Laplace layer kernels over
//! triangle pairs.
//!
//! The kernels are `1/r` (single layer) and `−(y−x)·n(y)/r³` (double
//! layer), both without the 1/4π; that factor cancels in the assembled
//! system and is reinstated only for exterior evaluation. Configurations
//! are dispatched by the number of shared vertex indices: disjoint
//! pairs use a tensorized triangle rule, shared-vertex/shared-edge/
//! identical pairs use Duffy-type coordinate transforms over four nested
//! 1-D Gauss rules, and collocation at a vertex of the source triangle
//! uses a polar substitution that lifts the 1/r singularity
//! analytically.
//!
//! An [`Integrator`] is two references to static rule tables; copying it
//! per thread is the intended way to parallelize assembly.

use std::f64::consts::{FRAC_PI_4, PI};

use plesset_math::{Triplet, Vec3};

use crate::blocks::{bilinear_shapes, linear_shapes, linear_shapes_cubic, Block, Lin, LinLin, Pair};
use crate::patch::{CubicPatch, LinearPatch};
use crate::quadrature::{LineNode, TriNode, GAUSS_3, TRI_3};

/// Both layer kernels at once: `(1/r, −z·n/r³)` for `z = y − x`.
#[inline]
fn kernels(z: Vec3, n: Vec3) -> (f64, f64) {
    let inv = 1.0 / z.norm();
    (inv, -z.dot(&n) * inv * inv * inv)
}

/// Result-shape dispatch for the Galerkin arms: how one quadrature node
/// turns into a (G, H) block pair.
pub trait GalerkinKernel {
    /// Block shape of the single-layer contribution.
    type G: Block;
    /// Block shape of the double-layer contribution.
    type H: Block;

    /// Regular-kernel evaluation at test parameters `(x0, x1)` and trial
    /// parameters `(y0, y1)`.
    fn eval(x0: f64, x1: f64, y0: f64, y1: f64, px: &LinearPatch, py: &LinearPatch)
        -> Pair<Self::G, Self::H>;

    /// `1/r` evaluation on an identical pair (the H part there is
    /// analytic and handled by the caller).
    fn eval_identical(x0: f64, x1: f64, y0: f64, y1: f64, p: &LinearPatch) -> Self::G;
}

/// Constant test and trial functions: scalar G and H.
pub struct ConCon;

impl GalerkinKernel for ConCon {
    type G = f64;
    type H = f64;

    #[inline]
    fn eval(x0: f64, x1: f64, y0: f64, y1: f64, px: &LinearPatch, py: &LinearPatch) -> Pair<f64, f64> {
        let (g, h) = kernels(py.interpolate(y0, y1) - px.interpolate(x0, x1), py.normal());
        Pair { g, h }
    }

    #[inline]
    fn eval_identical(x0: f64, x1: f64, y0: f64, y1: f64, p: &LinearPatch) -> f64 {
        1.0 / (p.interpolate(y0, y1) - p.interpolate(x0, x1)).norm()
    }
}

/// Linear test and trial functions: 3×3 G and H blocks.
pub struct LinLinKernel;

impl GalerkinKernel for LinLinKernel {
    type G = LinLin;
    type H = LinLin;

    #[inline]
    fn eval(x0: f64, x1: f64, y0: f64, y1: f64, px: &LinearPatch, py: &LinearPatch)
        -> Pair<LinLin, LinLin> {
        let (g, h) = kernels(py.interpolate(y0, y1) - px.interpolate(x0, x1), py.normal());
        let shapes = bilinear_shapes(x0, x1, y0, y1);
        let mut gb = shapes;
        gb *= g;
        let mut hb = shapes;
        hb *= h;
        Pair { g: gb, h: hb }
    }

    #[inline]
    fn eval_identical(x0: f64, x1: f64, y0: f64, y1: f64, p: &LinearPatch) -> LinLin {
        let mut shapes = bilinear_shapes(x0, x1, y0, y1);
        shapes *= ConCon::eval_identical(x0, x1, y0, y1, p);
        shapes
    }
}

/// Constant test, linear trial: scalar G, 3-vector H.
pub struct ConLinKernel;

impl GalerkinKernel for ConLinKernel {
    type G = f64;
    type H = Lin;

    #[inline]
    fn eval(x0: f64, x1: f64, y0: f64, y1: f64, px: &LinearPatch, py: &LinearPatch) -> Pair<f64, Lin> {
        let (g, h) = kernels(py.interpolate(y0, y1) - px.interpolate(x0, x1), py.normal());
        let mut hb = linear_shapes(y0, y1);
        hb *= h;
        Pair { g, h: hb }
    }

    #[inline]
    fn eval_identical(x0: f64, x1: f64, y0: f64, y1: f64, p: &LinearPatch) -> f64 {
        ConCon::eval_identical(x0, x1, y0, y1, p)
    }
}

/// Layer-kernel integrator over fixed quadrature rules.
///
/// Thread-safe by value: the struct is `Copy` over static tables, so
/// each assembly worker holds its own instance.
#[derive(Debug, Clone, Copy)]
pub struct Integrator {
    tri_rule: &'static [TriNode],
    line_rule: &'static [LineNode],
}

impl Default for Integrator {
    fn default() -> Self {
        Self {
            tri_rule: &TRI_3,
            line_rule: &GAUSS_3,
        }
    }
}

impl Integrator {
    /// Integrator with the default (3-point) rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the triangle rule.
    pub fn set_tri_rule(&mut self, rule: &'static [TriNode]) {
        self.tri_rule = rule;
    }

    /// Replace the 1-D Gauss rule.
    pub fn set_line_rule(&mut self, rule: &'static [LineNode]) {
        self.line_rule = rule;
    }

    // =====================================================================
    // Galerkin arms
    // =====================================================================

    /// Integrate the pair `(τ_i, τ_j)` in the Galerkin sense, choosing
    /// the singular treatment by the number of shared vertex indices.
    ///
    /// Returns the (possibly cyclically reordered) triplets the block
    /// entries refer to, plus the block pair. Reordering preserves
    /// orientation; on a shared edge listed in the same direction by
    /// both triangles the trial triplet is reflected instead and the H
    /// block picks up the compensating sign flip.
    pub fn galerkin<K: GalerkinKernel>(
        &self,
        verts: &[Vec3],
        mut ti: Triplet,
        mut tj: Triplet,
    ) -> (Triplet, Triplet, Pair<K::G, K::H>) {
        let result = match ti.shared_with(&tj) {
            0 => {
                let px = patch_of(verts, &ti);
                let py = patch_of(verts, &tj);
                self.galerkin_disjoint::<K>(&px, &py)
            }
            1 => {
                reorder_to_shared(&mut ti, &mut tj);
                let px = patch_of(verts, &ti);
                let py = patch_of(verts, &tj);
                self.galerkin_shared_vertex::<K>(&px, &py)
            }
            2 => {
                reorder_to_shared(&mut ti, &mut tj);
                let mut sign = 1.0;
                std::mem::swap(&mut ti.b, &mut ti.c);
                if ti.b != tj.b {
                    std::mem::swap(&mut ti.b, &mut ti.c);
                    std::mem::swap(&mut tj.b, &mut tj.c);
                    // the trial triangle is integrated with its listing
                    // reflected, so its normal flips; only H carries a
                    // dot product with the normal
                    sign = -1.0;
                }
                let px = patch_of(verts, &ti);
                let py = patch_of(verts, &tj);
                let mut result = self.galerkin_shared_edge::<K>(&px, &py);
                result.h *= sign;
                result
            }
            3 => {
                let p = patch_of(verts, &ti);
                self.galerkin_identical::<K>(&p)
            }
            _ => unreachable!("triangles share at most three vertices"),
        };
        (ti, tj, result)
    }

    fn galerkin_disjoint<K: GalerkinKernel>(
        &self,
        px: &LinearPatch,
        py: &LinearPatch,
    ) -> Pair<K::G, K::H> {
        let mut result = Pair::<K::G, K::H>::ZERO;
        for qi in self.tri_rule {
            for qj in self.tri_rule {
                // the shift by the second coordinate maps the reference
                // triangle onto the patch parameter domain 0 ≤ v ≤ u ≤ 1
                let mut temp = K::eval(qi.x + qi.y, qi.y, qj.x + qj.y, qj.y, px, py);
                temp *= qi.w * qj.w;
                result += temp;
            }
        }
        result *= px.jacobian() * py.jacobian();
        result
    }

    fn galerkin_identical<K: GalerkinKernel>(&self, p: &LinearPatch) -> Pair<K::G, K::H> {
        let mut result = Pair::<K::G, K::H> {
            g: K::G::ZERO,
            h: K::H::IDENTICAL_H_FACTOR,
        };
        result.h *= -p.jacobian();

        let mut g_total = K::G::ZERO;
        for xi in self.line_rule {
            for e1 in self.line_rule {
                for e2 in self.line_rule {
                    for e3 in self.line_rule {
                        // Duffy Jacobian ξ³η₁²η₂ folded into the weight
                        let weight = xi.w * e1.w * e2.w * e3.w
                            * xi.x * xi.x * xi.x
                            * e1.x * e1.x
                            * e2.x;

                        let a = xi.x;
                        let b = a * e1.x;
                        let c = b * e2.x;
                        let d = c * e3.x;

                        // H vanishes here: the flat normal is orthogonal
                        // to y − x on the same triangle
                        let mut g = K::G::ZERO;
                        g += K::eval_identical(a, a - b + c, a - d, a - b, p);
                        g += K::eval_identical(a - d, a - b, a, a - b + c, p);
                        g += K::eval_identical(a, b - c + d, a - c, b - c, p);
                        g += K::eval_identical(a - c, b - c, a, b - c + d, p);
                        g += K::eval_identical(a - d, b - d, a, b - c, p);
                        g += K::eval_identical(a, b - c, a - d, b - d, p);
                        g *= weight;
                        g_total += g;
                    }
                }
            }
        }
        g_total *= p.jacobian() * p.jacobian();
        result.g += g_total;
        result
    }

    fn galerkin_shared_edge<K: GalerkinKernel>(
        &self,
        px: &LinearPatch,
        py: &LinearPatch,
    ) -> Pair<K::G, K::H> {
        let mut result = Pair::<K::G, K::H>::ZERO;
        for xi in self.line_rule {
            for e1 in self.line_rule {
                for e2 in self.line_rule {
                    for e3 in self.line_rule {
                        // η₂ of the Duffy Jacobian is applied to four of
                        // the five sub-integrands only
                        let weight = xi.w * e1.w * e2.w * e3.w
                            * xi.x * xi.x * xi.x
                            * e1.x * e1.x;

                        let a = xi.x;
                        let b = a * e1.x;
                        let c = b * e2.x;
                        let d = c * e3.x;

                        let mut temp = Pair::<K::G, K::H>::ZERO;
                        temp += K::eval(a, b, a - d, c - d, px, py);
                        temp += K::eval(a - c, b - c, a, d, px, py);
                        temp += K::eval(a - d, c - d, a, b, px, py);
                        temp += K::eval(a - d, b - d, a, c, px, py);
                        temp *= e2.x;

                        temp += K::eval(a, b * e3.x, a - c, b - c, px, py);

                        temp *= weight;
                        result += temp;
                    }
                }
            }
        }
        result *= px.jacobian() * py.jacobian();
        result
    }

    fn galerkin_shared_vertex<K: GalerkinKernel>(
        &self,
        px: &LinearPatch,
        py: &LinearPatch,
    ) -> Pair<K::G, K::H> {
        let mut result = Pair::<K::G, K::H>::ZERO;
        for xi in self.line_rule {
            for e1 in self.line_rule {
                for e2 in self.line_rule {
                    for e3 in self.line_rule {
                        let weight = xi.w * e1.w * e2.w * e3.w
                            * xi.x * xi.x * xi.x
                            * e2.x;

                        let a = xi.x;
                        let b = a * e1.x;
                        let c = a * e2.x; // radial substitution differs here
                        let d = c * e3.x;

                        let mut temp = Pair::<K::G, K::H>::ZERO;
                        temp += K::eval(a, b, c, d, px, py);
                        temp += K::eval(c, d, a, b, px, py);
                        temp *= weight;
                        result += temp;
                    }
                }
            }
        }
        result *= px.jacobian() * py.jacobian();
        result
    }

    // =====================================================================
    // Collocation arms (linear trial functions)
    // =====================================================================

    /// Collocation of both kernels at vertex `i` against the linear
    /// trial functions on triangle `tj`.
    ///
    /// When `i` is a vertex of `tj` the polar singular rule produces the
    /// G block and H is zero (flat source: the normal is orthogonal to
    /// `y − x`); the solid-angle diagonal is *not* added here. With
    /// `mirror`, the image kernel under `x → −x` is added, enforcing
    /// zero normal velocity through the wall plane `x = 0`.
    ///
    /// Returns the (possibly reordered) trial triplet the block entries
    /// refer to, plus the pair.
    pub fn coloc_linear(
        &self,
        verts: &[Vec3],
        i: usize,
        mut tj: Triplet,
        mirror: bool,
    ) -> (Triplet, Pair<Lin, Lin>) {
        if tj.contains(i) {
            tj.cyclic_reorder(i);
            let py = patch_of(verts, &tj);
            let pair = if mirror {
                self.identical_coloc_mir(&py)
            } else {
                Pair {
                    g: self.identical_coloc(&py),
                    h: Lin::ZERO,
                }
            };
            (tj, pair)
        } else {
            let py = patch_of(verts, &tj);
            let pair = if mirror {
                self.disjoint_coloc_mir(verts[i], &py)
            } else {
                self.disjoint_coloc(verts[i], &py)
            };
            (tj, pair)
        }
    }

    /// Cubic-patch collocation of both kernels at vertex `i` against
    /// the linear trial functions on the Bézier patch over `tj`.
    ///
    /// The solid-angle diagonal (exactly −2π on the smooth patch) is
    /// left to the caller.
    pub fn coloc_cubic(
        &self,
        verts: &[Vec3],
        normals: &[Vec3],
        i: usize,
        mut tj: Triplet,
    ) -> (Triplet, Pair<Lin, Lin>) {
        if tj.contains(i) {
            tj.cyclic_reorder(i);
            let patch = cubic_patch_of(verts, normals, &tj);
            (tj, self.identical_coloc_cubic(&patch))
        } else {
            let patch = cubic_patch_of(verts, normals, &tj);
            (tj, self.disjoint_coloc_cubic(verts[i], &patch))
        }
    }

    fn disjoint_coloc(&self, x: Vec3, py: &LinearPatch) -> Pair<Lin, Lin> {
        let mut result = Pair::<Lin, Lin>::ZERO;
        for q in self.tri_rule {
            let (u, v) = (q.x + q.y, q.y);
            let shapes = linear_shapes(u, v);
            let (g, h) = kernels(py.interpolate(u, v) - x, py.normal());
            let mut gb = shapes;
            gb *= g * q.w;
            let mut hb = shapes;
            hb *= h * q.w;
            result.g += gb;
            result.h += hb;
        }
        result *= py.jacobian();
        result
    }

    fn disjoint_coloc_mir(&self, x: Vec3, py: &LinearPatch) -> Pair<Lin, Lin> {
        let mut result = Pair::<Lin, Lin>::ZERO;
        for q in self.tri_rule {
            let (u, v) = (q.x + q.y, q.y);
            let shapes = linear_shapes(u, v);
            let y = py.interpolate(u, v);
            let n = py.normal();
            let (g0, h0) = kernels(y - x, n);
            let (g1, h1) = kernels(mirror_x(y) - x, mirror_x(n));
            let mut gb = shapes;
            gb *= (g0 + g1) * q.w;
            let mut hb = shapes;
            hb *= (h0 + h1) * q.w;
            result.g += gb;
            result.h += hb;
        }
        result *= py.jacobian();
        result
    }

    /// Polar rule for the collocation point at corner `a` of a flat
    /// triangle: the substitution `(0,1) → (0,π/4)` lifts the `1/r`
    /// singularity into the measure analytically. G only.
    fn identical_coloc(&self, py: &LinearPatch) -> Lin {
        let jac_factor = 0.5 * py.jacobian() * FRAC_PI_4;
        let mut result = Lin::ZERO;
        for p in self.line_rule {
            let t = p.x * FRAC_PI_4;
            let (sin_t, cos_t) = t.sin_cos();
            let dist = py.interp_relative(cos_t, sin_t).norm();
            let overall = jac_factor * p.w / (dist * cos_t * cos_t);
            result.0[0] += overall * cos_t;
            result.0[1] += overall * (cos_t - sin_t);
            result.0[2] += overall * sin_t;
        }
        result
    }

    fn identical_coloc_mir(&self, py: &LinearPatch) -> Pair<Lin, Lin> {
        let g = self.identical_coloc(py);

        // the image triangle never touches x (off the wall plane), so
        // the ordinary disjoint rule applies against it
        let a = py.interpolate(0.0, 0.0);
        let b = py.interpolate(1.0, 0.0);
        let c = py.interpolate(1.0, 1.0);
        let image = LinearPatch::new(mirror_x(a), mirror_x(b), mirror_x(c));
        let mut result = self.disjoint_coloc(a, &image);
        // mirroring reverses the image orientation, flipping its normal
        result.h *= -1.0;
        result.g += g;
        result
    }

    fn disjoint_coloc_cubic(&self, x: Vec3, py: &CubicPatch) -> Pair<Lin, Lin> {
        let mut result = Pair::<Lin, Lin>::ZERO;
        for q in self.tri_rule {
            // the cubic patch is parametrized over the reference
            // triangle directly; its Jacobian varies with position
            let (u, v) = (q.x, q.y);
            let sv = py.surface_vector(u, v);
            let jac = sv.norm();
            let (g, h) = kernels(py.interpolate(u, v) - x, sv / jac);
            let shapes = linear_shapes_cubic(u, v);
            let mut gb = shapes;
            gb *= g * jac * q.w;
            let mut hb = shapes;
            hb *= h * jac * q.w;
            result.g += gb;
            result.h += hb;
        }
        result
    }

    fn identical_coloc_cubic(&self, py: &CubicPatch) -> Pair<Lin, Lin> {
        let x = py.corner_a();
        let mut result = Pair::<Lin, Lin>::ZERO;
        // Duffy coordinates e₁ = u, e₂ = u·v with measure factor u; the
        // flip (1−e₁, e₂) puts the collocation corner at the singular
        // apex of the barycentric parametrization
        for p in self.line_rule {
            for q in self.line_rule {
                let u = p.x;
                let v = q.x;
                let (uu, vv) = (1.0 - u, u * v);
                let sv = py.surface_vector(uu, vv);
                let jac = sv.norm();
                let (g, h) = kernels(py.interpolate(uu, vv) - x, sv / jac);
                let shapes = linear_shapes_cubic(uu, vv);
                let w = p.w * q.w * u * jac;
                let mut gb = shapes;
                gb *= g * w;
                let mut hb = shapes;
                hb *= h * w;
                result.g += gb;
                result.h += hb;
            }
        }
        result
    }

    // =====================================================================
    // Exterior evaluation
    // =====================================================================

    /// Contribution of triangle `tj` to the representation formula at
    /// the off-surface point `y`: `(H·φ − G·ψ)/4π` over the triangle.
    /// No near-singular correction is applied; `y` must lie strictly
    /// off the surface.
    pub fn exterior_potential(
        &self,
        verts: &[Vec3],
        tj: Triplet,
        phi: &[f64],
        psi: &[f64],
        y: Vec3,
    ) -> f64 {
        let py = patch_of(verts, &tj);
        let r = self.disjoint_coloc(y, &py);
        let mut value = 0.0;
        for k in 0..3 {
            value += -r.g[k] * psi[tj[k]] + r.h[k] * phi[tj[k]];
        }
        value / (4.0 * PI)
    }
}

#[inline]
fn mirror_x(v: Vec3) -> Vec3 {
    Vec3::new(-v.x, v.y, v.z)
}

fn patch_of(verts: &[Vec3], t: &Triplet) -> LinearPatch {
    LinearPatch::new(verts[t.a], verts[t.b], verts[t.c])
}

fn cubic_patch_of(verts: &[Vec3], normals: &[Vec3], t: &Triplet) -> CubicPatch {
    CubicPatch::new(
        verts[t.a],
        verts[t.b],
        verts[t.c],
        normals[t.a],
        normals[t.b],
        normals[t.c],
    )
}

/// Cyclically reorder both triplets so the first matching index pair
/// sits at position `a` of each.
fn reorder_to_shared(ti: &mut Triplet, tj: &mut Triplet) {
    for j in 0..3 {
        for i in 0..3 {
            if ti[i] == tj[j] {
                let shared = ti[i];
                ti.cyclic_reorder(shared);
                tj.cyclic_reorder(shared);
                return;
            }
        }
    }
    unreachable!("reorder_to_shared on disjoint triplets");
}
