//! BIE discretizations: how (G, H) are assembled and how the surface
//! velocity is rebuilt from the solved (φ, ψ).
//!
//! Assembly is embarrassingly parallel over the source triangle: each
//! worker clones the mesh, the integrator and the vertex normals,
//! accumulates a private per-triangle column block, and merges it into
//! the shared matrices under a lock. Accumulation order across workers
//! is not deterministic; force one thread for bit-reproducible runs.

use std::sync::Mutex;

use nalgebra::DMatrix;
use rayon::prelude::*;

use plesset_bie::integrator::{ConLinKernel, LinLinKernel};
use plesset_bie::Integrator;
use plesset_math::{Triplet, Vec3};
use plesset_mesh::adjacency::triangle_indices;
use plesset_mesh::geometry::{triangle_normals, vertex_normals, vertex_normals_simple};
use plesset_mesh::Mesh;

use std::f64::consts::PI;

/// A boundary-integral discretization scheme.
///
/// `φ` has `phi_dim` unknowns, `ψ` has `psi_dim`; `assemble` produces
/// `G ∈ R^{eq × psi_dim}` and `H ∈ R^{eq × phi_dim}` such that the
/// boundary equation reads `G ψ = H φ`.
pub trait Discretization: Send + Sync {
    /// Number of φ unknowns on `mesh`.
    fn phi_dim(&self, mesh: &Mesh) -> usize;
    /// Number of ψ unknowns on `mesh`.
    fn psi_dim(&self, mesh: &Mesh) -> usize;
    /// Assemble the dense operator pair.
    fn assemble(
        &self,
        mesh: &Mesh,
        integrator: &Integrator,
        num_threads: usize,
    ) -> (DMatrix<f64>, DMatrix<f64>);
    /// Trailing wall-sample count (pinned-wall variant only).
    fn pinned_count(&self) -> usize {
        0
    }
}

/// A discretization whose φ lives on mesh vertices, allowing the full
/// surface-velocity reconstruction and hence time integration.
pub trait VertexScheme: Discretization {
    /// Rebuild `u = ∇_Γ φ + ψ n` at every vertex.
    fn velocity(&self, mesh: &Mesh, phi: &[f64], psi: &[f64]) -> Vec<Vec3>;
}

/// Marker for schemes sampling both φ and ψ at the vertices; required
/// by the exterior-potential representation formula.
pub trait VertexFields: VertexScheme {}

fn thread_pool(num_threads: usize) -> rayon::ThreadPool {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .expect("building assembly thread pool")
}

/// Position of `vertex` inside `t` (which must contain it).
fn slot_of(t: &Triplet, vertex: usize) -> usize {
    (0..3)
        .find(|&k| t[k] == vertex)
        .expect("vertex not in triplet")
}

// =========================================================================
// Linear-linear collocation
// =========================================================================

/// Linear elements, collocation at the vertices. The production scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearCollocation {
    /// Add the image kernel under `x → −x` (rigid wall at x = 0).
    pub mirror: bool,
    /// Integrate over cubic Bézier patches instead of flat triangles.
    pub cubic: bool,
}

impl LinearCollocation {
    fn assemble_raw(
        &self,
        mesh: &Mesh,
        integrator: &Integrator,
        num_threads: usize,
    ) -> (DMatrix<f64>, DMatrix<f64>) {
        let n = mesh.num_verts();
        let m = mesh.num_trigs();
        let normals = if self.cubic {
            vertex_normals_simple(mesh)
        } else {
            Vec::new()
        };

        let shared = Mutex::new((DMatrix::zeros(n, n), DMatrix::zeros(n, n)));
        let scheme = *self;

        thread_pool(num_threads).install(|| {
            (0..m).into_par_iter().for_each_init(
                || (mesh.clone(), *integrator, normals.clone()),
                |(mesh_l, int_l, normals_l), j| {
                    let trip = mesh_l.trigs[j];
                    let mut g_loc = DMatrix::<f64>::zeros(n, 3);
                    let mut h_loc = DMatrix::<f64>::zeros(n, 3);

                    for i in 0..n {
                        let (tj, pair) = if scheme.cubic {
                            int_l.coloc_cubic(&mesh_l.verts, normals_l, i, trip)
                        } else {
                            int_l.coloc_linear(&mesh_l.verts, i, trip, scheme.mirror)
                        };
                        for k in 0..3 {
                            let slot = slot_of(&trip, tj[k]);
                            g_loc[(i, slot)] += pair.g[k];
                            h_loc[(i, slot)] += pair.h[k];
                        }
                    }

                    let mut lock = shared.lock().unwrap();
                    let (g, h) = &mut *lock;
                    for k in 0..3 {
                        let col = trip[k];
                        for i in 0..n {
                            g[(i, col)] += g_loc[(i, k)];
                            h[(i, col)] += h_loc[(i, k)];
                        }
                    }
                },
            );
        });

        shared.into_inner().unwrap()
    }

    fn apply_solid_angle_diagonal(&self, h: &mut DMatrix<f64>) {
        let n = h.nrows();
        for i in 0..n {
            if self.cubic {
                // vertex geometry is smooth on the Bézier surface
                h[(i, i)] -= 2.0 * PI;
            } else {
                // 4π rule: fix the diagonal so the row sums to −4π
                let row_sum: f64 = (0..n).map(|j| h[(i, j)]).sum();
                h[(i, i)] -= 4.0 * PI + row_sum;
            }
        }
    }
}

impl Discretization for LinearCollocation {
    fn phi_dim(&self, mesh: &Mesh) -> usize {
        mesh.num_verts()
    }

    fn psi_dim(&self, mesh: &Mesh) -> usize {
        mesh.num_verts()
    }

    fn assemble(
        &self,
        mesh: &Mesh,
        integrator: &Integrator,
        num_threads: usize,
    ) -> (DMatrix<f64>, DMatrix<f64>) {
        let (g, mut h) = self.assemble_raw(mesh, integrator, num_threads);
        self.apply_solid_angle_diagonal(&mut h);
        (g, h)
    }
}

impl VertexScheme for LinearCollocation {
    fn velocity(&self, mesh: &Mesh, phi: &[f64], psi: &[f64]) -> Vec<Vec3> {
        if self.cubic {
            cubic_vertex_velocity(mesh, phi, psi)
        } else {
            linear_vertex_velocity(mesh, phi, psi)
        }
    }
}

impl VertexFields for LinearCollocation {}

// =========================================================================
// Pinned-wall collocation
// =========================================================================

/// Mirror-kernel collocation for a bubble pinned on the rigid wall
/// `x = 0`. The last `n_pin` vertices are wall samples: their ψ is
/// prescribed zero and their φ becomes the unknown, implemented by
/// exchanging the trailing columns between G and −H.
#[derive(Debug, Clone, Copy)]
pub struct PinnedCollocation {
    /// Number of trailing wall-sample vertices.
    pub n_pin: usize,
}

impl PinnedCollocation {
    /// Reorder `mesh` so the wall-plane vertices (|x| ≤ `tol`) come
    /// last, preserving relative order. Returns the reordered mesh, the
    /// permutation (new index → old index), and the wall-sample count.
    pub fn rearrange_wall_last(mesh: &Mesh, tol: f64) -> (Mesh, Vec<usize>, usize) {
        let is_wall: Vec<bool> = mesh.verts.iter().map(|v| v.x.abs() <= tol).collect();
        let mut order: Vec<usize> = (0..mesh.num_verts()).filter(|&i| !is_wall[i]).collect();
        let n_interior = order.len();
        order.extend((0..mesh.num_verts()).filter(|&i| is_wall[i]));

        let mut new_index = vec![0usize; mesh.num_verts()];
        for (new, &old) in order.iter().enumerate() {
            new_index[old] = new;
        }

        let reordered = Mesh {
            verts: order.iter().map(|&i| mesh.verts[i]).collect(),
            trigs: mesh
                .trigs
                .iter()
                .map(|t| {
                    let mut t = *t;
                    t.map_indices(|i| new_index[i]);
                    t
                })
                .collect(),
        };
        let n_pin = mesh.num_verts() - n_interior;
        (reordered, order, n_pin)
    }
}

impl Discretization for PinnedCollocation {
    fn phi_dim(&self, mesh: &Mesh) -> usize {
        mesh.num_verts()
    }

    fn psi_dim(&self, mesh: &Mesh) -> usize {
        mesh.num_verts()
    }

    fn assemble(
        &self,
        mesh: &Mesh,
        integrator: &Integrator,
        num_threads: usize,
    ) -> (DMatrix<f64>, DMatrix<f64>) {
        let scheme = LinearCollocation {
            mirror: true,
            cubic: false,
        };
        let (mut g, mut h) = scheme.assemble(mesh, integrator, num_threads);

        // wall samples: ψ = 0 is prescribed, φ is unknown. Moving the
        // term to the other side swaps the trailing columns: the
        // solution vector's tail then carries φ on the wall.
        let n = mesh.num_verts();
        for col in (n - self.n_pin)..n {
            for row in 0..n {
                g[(row, col)] = -h[(row, col)];
                h[(row, col)] = 0.0;
            }
        }
        (g, h)
    }

    fn pinned_count(&self) -> usize {
        self.n_pin
    }
}

impl VertexScheme for PinnedCollocation {
    fn velocity(&self, mesh: &Mesh, phi: &[f64], psi: &[f64]) -> Vec<Vec3> {
        linear_vertex_velocity(mesh, phi, psi)
    }
}

impl VertexFields for PinnedCollocation {}

// =========================================================================
// Linear-linear Galerkin
// =========================================================================

/// Linear test and trial functions in the weighted-integral sense.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearGalerkin;

impl Discretization for LinearGalerkin {
    fn phi_dim(&self, mesh: &Mesh) -> usize {
        mesh.num_verts()
    }

    fn psi_dim(&self, mesh: &Mesh) -> usize {
        mesh.num_verts()
    }

    fn assemble(
        &self,
        mesh: &Mesh,
        integrator: &Integrator,
        num_threads: usize,
    ) -> (DMatrix<f64>, DMatrix<f64>) {
        let n = mesh.num_verts();
        let m = mesh.num_trigs();
        let shared = Mutex::new((DMatrix::zeros(n, n), DMatrix::zeros(n, n)));

        thread_pool(num_threads).install(|| {
            (0..m).into_par_iter().for_each_init(
                || (mesh.clone(), *integrator),
                |(mesh_l, int_l), j| {
                    let trip = mesh_l.trigs[j];
                    let mut g_loc = DMatrix::<f64>::zeros(n, 3);
                    let mut h_loc = DMatrix::<f64>::zeros(n, 3);

                    for i in 0..mesh_l.trigs.len() {
                        let (ti, tj, pair) =
                            int_l.galerkin::<LinLinKernel>(&mesh_l.verts, mesh_l.trigs[i], trip);
                        for r in 0..3 {
                            for c in 0..3 {
                                let slot = slot_of(&trip, tj[c]);
                                g_loc[(ti[r], slot)] += pair.g.at(r, c);
                                h_loc[(ti[r], slot)] += pair.h.at(r, c);
                            }
                        }
                    }

                    let mut lock = shared.lock().unwrap();
                    let (g, h) = &mut *lock;
                    for k in 0..3 {
                        let col = trip[k];
                        for i in 0..n {
                            g[(i, col)] += g_loc[(i, k)];
                            h[(i, col)] += h_loc[(i, k)];
                        }
                    }
                },
            );
        });

        shared.into_inner().unwrap()
    }
}

impl VertexScheme for LinearGalerkin {
    fn velocity(&self, mesh: &Mesh, phi: &[f64], psi: &[f64]) -> Vec<Vec3> {
        linear_vertex_velocity(mesh, phi, psi)
    }
}

impl VertexFields for LinearGalerkin {}

// =========================================================================
// Constant-linear Galerkin
// =========================================================================

/// Constant ψ per triangle, linear φ on vertices.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantLinearGalerkin;

impl Discretization for ConstantLinearGalerkin {
    fn phi_dim(&self, mesh: &Mesh) -> usize {
        mesh.num_verts()
    }

    fn psi_dim(&self, mesh: &Mesh) -> usize {
        mesh.num_trigs()
    }

    fn assemble(
        &self,
        mesh: &Mesh,
        integrator: &Integrator,
        num_threads: usize,
    ) -> (DMatrix<f64>, DMatrix<f64>) {
        let n = mesh.num_verts();
        let m = mesh.num_trigs();
        let shared = Mutex::new((DMatrix::zeros(m, m), DMatrix::zeros(m, n)));

        thread_pool(num_threads).install(|| {
            (0..m).into_par_iter().for_each_init(
                || (mesh.clone(), *integrator),
                |(mesh_l, int_l), j| {
                    let trip = mesh_l.trigs[j];
                    let mut g_col = vec![0.0; m];
                    let mut h_loc = DMatrix::<f64>::zeros(m, 3);

                    for i in 0..m {
                        let (_, tj, pair) =
                            int_l.galerkin::<ConLinKernel>(&mesh_l.verts, mesh_l.trigs[i], trip);
                        g_col[i] += pair.g;
                        for c in 0..3 {
                            let slot = slot_of(&trip, tj[c]);
                            h_loc[(i, slot)] += pair.h[c];
                        }
                    }

                    let mut lock = shared.lock().unwrap();
                    let (g, h) = &mut *lock;
                    for (i, val) in g_col.iter().enumerate() {
                        g[(i, j)] += val;
                    }
                    for k in 0..3 {
                        let col = trip[k];
                        for i in 0..m {
                            h[(i, col)] += h_loc[(i, k)];
                        }
                    }
                },
            );
        });

        shared.into_inner().unwrap()
    }
}

impl VertexScheme for ConstantLinearGalerkin {
    fn velocity(&self, mesh: &Mesh, phi: &[f64], psi: &[f64]) -> Vec<Vec3> {
        // ψ is constant per triangle here: the vertex velocity averages
        // tangential gradient plus ψ_T n_T over the incident triangles
        let incidence = triangle_indices(mesh);
        let normals = triangle_normals(mesh);
        let gradients = tangent_gradients(mesh, phi);

        (0..mesh.num_verts())
            .map(|i| {
                let mut grad = Vec3::zeros();
                for &t in &incidence[i] {
                    grad += gradients[t] + psi[t] * normals[t];
                }
                grad / incidence[i].len() as f64
            })
            .collect()
    }
}

// =========================================================================
// Constant-constant Galerkin
// =========================================================================

/// Constant elements for both φ and ψ; assembles and solves only (no
/// vertex velocity, hence no time stepping).
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantGalerkin;

impl Discretization for ConstantGalerkin {
    fn phi_dim(&self, mesh: &Mesh) -> usize {
        mesh.num_trigs()
    }

    fn psi_dim(&self, mesh: &Mesh) -> usize {
        mesh.num_trigs()
    }

    fn assemble(
        &self,
        mesh: &Mesh,
        integrator: &Integrator,
        num_threads: usize,
    ) -> (DMatrix<f64>, DMatrix<f64>) {
        let m = mesh.num_trigs();
        let shared = Mutex::new((DMatrix::zeros(m, m), DMatrix::zeros(m, m)));

        thread_pool(num_threads).install(|| {
            (0..m).into_par_iter().for_each_init(
                || (mesh.clone(), *integrator),
                |(mesh_l, int_l), j| {
                    let trip = mesh_l.trigs[j];
                    let mut g_col = vec![0.0; m];
                    let mut h_col = vec![0.0; m];

                    for i in 0..m {
                        let (_, _, pair) = int_l
                            .galerkin::<plesset_bie::ConCon>(&mesh_l.verts, mesh_l.trigs[i], trip);
                        g_col[i] += pair.g;
                        h_col[i] += pair.h;
                    }

                    let mut lock = shared.lock().unwrap();
                    let (g, h) = &mut *lock;
                    for i in 0..m {
                        g[(i, j)] += g_col[i];
                        h[(i, j)] += h_col[i];
                    }
                },
            );
        });

        shared.into_inner().unwrap()
    }
}

// =========================================================================
// Velocity reconstruction helpers
// =========================================================================

/// Per-triangle tangential gradient of a vertex-linear field
/// (Dombre's formula for unstructured grids).
pub fn tangent_gradients(mesh: &Mesh, pot: &[f64]) -> Vec<Vec3> {
    mesh.trigs
        .iter()
        .map(|t| {
            let ab = mesh.verts[t.b] - mesh.verts[t.a];
            let bc = mesh.verts[t.c] - mesh.verts[t.b];
            let mut n = ab.cross(&bc);
            n /= n.norm_squared();
            (pot[t.c] - pot[t.b]) * n.cross(&ab) + (pot[t.a] - pot[t.b]) * n.cross(&bc)
        })
        .collect()
}

fn linear_vertex_velocity(mesh: &Mesh, phi: &[f64], psi: &[f64]) -> Vec<Vec3> {
    let incidence = triangle_indices(mesh);
    let normals = triangle_normals(mesh);
    let gradients = tangent_gradients(mesh, phi);

    (0..mesh.num_verts())
        .map(|i| {
            let mut grad = Vec3::zeros();
            for &t in &incidence[i] {
                grad += gradients[t] + psi[i] * normals[t];
            }
            grad / incidence[i].len() as f64
        })
        .collect()
}

fn cubic_vertex_velocity(mesh: &Mesh, phi: &[f64], psi: &[f64]) -> Vec<Vec3> {
    let incidence = triangle_indices(mesh);
    let normals = vertex_normals(mesh, &incidence);

    let mut grads = vec![Vec3::zeros(); mesh.num_verts()];
    let mut counts = vec![0.0; mesh.num_verts()];
    for t in &mesh.trigs {
        let patch = plesset_bie::CubicPatch::new(
            mesh.verts[t.a],
            mesh.verts[t.b],
            mesh.verts[t.c],
            normals[t.a],
            normals[t.b],
            normals[t.c],
        );
        grads[t.a] += patch.tangent_derivative_at_a(phi[t.a], phi[t.b], phi[t.c]);
        grads[t.b] += patch.tangent_derivative_at_b(phi[t.a], phi[t.b], phi[t.c]);
        grads[t.c] += patch.tangent_derivative_at_c(phi[t.a], phi[t.b], phi[t.c]);
        counts[t.a] += 1.0;
        counts[t.b] += 1.0;
        counts[t.c] += 1.0;
    }

    (0..mesh.num_verts())
        .map(|i| grads[i] / counts[i] + psi[i] * normals[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use plesset_bie::quadrature::{GAUSS_7, TRI_7};
    use plesset_mesh::geometry::solid_angle_at_vertex_simple;
    use plesset_mesh::icosphere::icosphere;

    fn fine_integrator() -> Integrator {
        let mut inte = Integrator::new();
        inte.set_tri_rule(&TRI_7);
        inte.set_line_rule(&GAUSS_7);
        inte
    }

    #[test]
    fn test_collocation_rows_sum_to_minus_4pi() {
        let mesh = icosphere(1);
        let scheme = LinearCollocation::default();
        let (_, h) = scheme.assemble(&mesh, &fine_integrator(), 2);
        for i in 0..mesh.num_verts() {
            let row: f64 = (0..mesh.num_verts()).map(|j| h[(i, j)]).sum();
            approx::assert_relative_eq!(row, -4.0 * PI, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_collocation_diagonal_matches_solid_angle() {
        // independent check of the off-diagonal H entries: the 4π-rule
        // diagonal approximates −(4π − Ω_i) with Ω_i from spherical
        // trigonometry
        let mesh = icosphere(2);
        let scheme = LinearCollocation::default();
        let (_, h) = scheme.assemble(&mesh, &fine_integrator(), 2);
        for i in (0..mesh.num_verts()).step_by(17) {
            let omega = solid_angle_at_vertex_simple(&mesh, i);
            approx::assert_relative_eq!(
                h[(i, i)],
                -(4.0 * PI - omega),
                max_relative = 0.03
            );
        }
    }

    #[test]
    fn test_dented_mesh_solid_angle_consistency() {
        // push one vertex inward to create a concave dent
        let mut mesh = icosphere(2);
        mesh.verts[7] *= 0.6;
        let scheme = LinearCollocation::default();
        let (_, h) = scheme.assemble(&mesh, &fine_integrator(), 2);
        let n = mesh.num_verts();
        for i in [0, 7, 33] {
            let row: f64 = (0..n).map(|j| h[(i, j)]).sum();
            approx::assert_relative_eq!(row, -4.0 * PI, epsilon = 1e-10);
        }
        let omega = solid_angle_at_vertex_simple(&mesh, 7);
        approx::assert_relative_eq!(h[(7, 7)], -(4.0 * PI - omega), max_relative = 0.05);
    }

    #[test]
    fn test_galerkin_g_is_symmetric() {
        let mesh = icosphere(1);
        let scheme = LinearGalerkin;
        let (g, _) = scheme.assemble(&mesh, &fine_integrator(), 2);
        let scale = g.amax();
        for i in 0..mesh.num_verts() {
            for j in (i + 1)..mesh.num_verts() {
                assert!(
                    (g[(i, j)] - g[(j, i)]).abs() < 1e-5 * scale,
                    "G[{i},{j}] asymmetry {} vs {}",
                    g[(i, j)],
                    g[(j, i)]
                );
            }
        }
    }

    #[test]
    fn test_constant_linear_shapes() {
        let mesh = icosphere(1);
        let scheme = ConstantLinearGalerkin;
        let (g, h) = scheme.assemble(&mesh, &Integrator::new(), 2);
        assert_eq!(g.shape(), (mesh.num_trigs(), mesh.num_trigs()));
        assert_eq!(h.shape(), (mesh.num_trigs(), mesh.num_verts()));
    }

    #[test]
    fn test_constant_constant_shapes() {
        let mesh = icosphere(1);
        let scheme = ConstantGalerkin;
        let (g, h) = scheme.assemble(&mesh, &Integrator::new(), 2);
        assert_eq!(g.shape(), (mesh.num_trigs(), mesh.num_trigs()));
        assert_eq!(h.shape(), (mesh.num_trigs(), mesh.num_trigs()));
    }

    #[test]
    fn test_assembly_deterministic_single_thread() {
        let mesh = icosphere(1);
        let scheme = LinearCollocation::default();
        let inte = Integrator::new();
        let (g1, h1) = scheme.assemble(&mesh, &inte, 1);
        let (g2, h2) = scheme.assemble(&mesh, &inte, 1);
        assert_eq!(g1, g2);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let mesh = icosphere(1);
        let scheme = LinearCollocation::default();
        let inte = Integrator::new();
        let (g1, h1) = scheme.assemble(&mesh, &inte, 1);
        let (g4, h4) = scheme.assemble(&mesh, &inte, 4);
        approx::assert_relative_eq!((g1 - g4).amax(), 0.0, epsilon = 1e-11);
        approx::assert_relative_eq!((h1 - h4).amax(), 0.0, epsilon = 1e-11);
    }

    #[test]
    fn test_linear_velocity_of_linear_field_on_flat_patch() {
        // a flat fan: gradient of φ = x + 2y is recovered exactly in the
        // tangent plane; ψ = 0
        let mesh = Mesh {
            verts: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(-1.0, 0.5, 0.0),
            ],
            trigs: vec![Triplet::new(0, 1, 2), Triplet::new(0, 2, 3)],
        };
        let phi: Vec<f64> = mesh.verts.iter().map(|v| v.x + 2.0 * v.y).collect();
        let psi = vec![0.0; 4];
        let u = LinearCollocation::default().velocity(&mesh, &phi, &psi);
        for grad in u {
            approx::assert_relative_eq!(grad.x, 1.0, epsilon = 1e-12);
            approx::assert_relative_eq!(grad.y, 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_pinned_column_exchange() {
        let mesh = tent_mesh();
        let (mesh, order, n_pin) = PinnedCollocation::rearrange_wall_last(&mesh, 1e-9);
        assert_eq!(n_pin, 6);
        assert_eq!(order[0], 0); // the apex is the only interior vertex

        let inte = fine_integrator();
        let pinned = PinnedCollocation { n_pin };
        let (g, h) = pinned.assemble(&mesh, &inte, 1);

        let mirror = LinearCollocation {
            mirror: true,
            cubic: false,
        };
        let (g0, h0) = mirror.assemble(&mesh, &inte, 1);

        let n = mesh.num_verts();
        for row in 0..n {
            for col in 0..n {
                if col >= n - n_pin {
                    approx::assert_relative_eq!(g[(row, col)], -h0[(row, col)]);
                    assert_eq!(h[(row, col)], 0.0);
                } else {
                    approx::assert_relative_eq!(g[(row, col)], g0[(row, col)]);
                    approx::assert_relative_eq!(h[(row, col)], h0[(row, col)]);
                }
            }
        }
    }

    // hexagonal wall ring at x = 0 with an apex off the wall
    fn tent_mesh() -> Mesh {
        let mut verts = vec![Vec3::new(1.0, 0.0, 0.0)];
        for k in 0..6 {
            let a = 2.0 * PI * k as f64 / 6.0;
            verts.push(Vec3::new(0.0, a.cos(), a.sin()));
        }
        let trigs = (0..6)
            .map(|k| Triplet::new(0, 1 + k, 1 + (k + 1) % 6))
            .collect();
        Mesh { verts, trigs }
    }
}
