//! The coupled free-surface engine: BIE solve, Bernoulli update, time
//! stepping, and curvature-adaptive remeshing with field transfer.

use std::sync::Arc;

use nalgebra::DVector;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use plesset_bie::quadrature::{LineNode, TriNode, GAUSS_7, TRI_19, TRI_7};
use plesset_bie::Integrator;
use plesset_math::Vec3;
use plesset_mesh::adjacency::two_ring;
use plesset_mesh::components::{expand_to_vertex_data, split_components};
use plesset_mesh::curvature::{max_curvature, vertex_mean_curvature};
use plesset_mesh::geometry::volume;
use plesset_mesh::project::{project_and_interpolate_simple, project_from_origin};
use plesset_mesh::Mesh;
use plesset_topo::editors::{
    collapse_short_edges, flip_edges, relax_vertices, split_long_edges, FlipCost, Targets,
};
use plesset_topo::{HalfedgeMesh, TopologyError};

use crate::scheme::{
    Discretization, LinearCollocation, PinnedCollocation, VertexFields, VertexScheme,
};
use crate::solver::{solve_system, SolveOutcome, SolverBackend, SolverConfig};

/// User-supplied driving pressure field `w(x, t)`.
pub type PressureField = Arc<dyn Fn(Vec3, f64) -> f64 + Send + Sync>;

/// Physical coefficients of the Bernoulli equation, in simulation units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PhysicalParams {
    /// Ambient pressure at infinity.
    pub p_inf: f64,
    /// Inner-gas pressure coefficient.
    pub epsilon: f64,
    /// Surface-tension coefficient.
    pub sigma: f64,
    /// Polytropic exponent of the inner gas.
    pub gamma: f64,
}

impl Default for PhysicalParams {
    fn default() -> Self {
        Self {
            p_inf: 1.0,
            epsilon: 1.0,
            sigma: 0.0,
            gamma: 1.0,
        }
    }
}

/// Potential-flow simulation of one or several bubble surfaces.
///
/// Owns the mesh and the field arrays exclusively; φ and ψ are written
/// only after a solve, after an advect, or after a remesh transfer.
pub struct Simulation<D: Discretization> {
    scheme: D,
    mesh: Mesh,
    params: PhysicalParams,
    pressure: PressureField,

    phi: DVector<f64>,
    psi: DVector<f64>,
    time: f64,

    /// Reference volume per connected component.
    v0: Vec<f64>,

    integrator: Integrator,
    solver: SolverConfig,
    num_threads: usize,

    min_dt: Option<f64>,
    dp_balance: f64,

    // remeshing state
    curvature_memory: Option<Vec<f64>>,
    damping: f64,
    min_elm_size: f64,
    max_elm_size: f64,
}

impl<D: Discretization> Simulation<D> {
    /// Create a simulation over `mesh` with the given scheme and
    /// coefficients. The reference volumes V₀ are taken per connected
    /// component of the initial mesh; φ and ψ start at zero.
    pub fn new(mesh: Mesh, scheme: D, params: PhysicalParams) -> Self {
        let v0 = split_components(&mesh)
            .iter()
            .map(|c| volume(&c.mesh))
            .collect();

        let mut integrator = Integrator::new();
        integrator.set_tri_rule(&TRI_7);
        integrator.set_line_rule(&GAUSS_7);

        let phi = DVector::zeros(scheme.phi_dim(&mesh));
        let psi = DVector::zeros(scheme.psi_dim(&mesh));

        log::debug!(
            "simulation initialized: {} vertices, {} triangles",
            mesh.num_verts(),
            mesh.num_trigs()
        );

        Self {
            scheme,
            mesh,
            params,
            pressure: Arc::new(|_, _| 0.0),
            phi,
            psi,
            time: 0.0,
            v0,
            integrator,
            solver: SolverConfig::default(),
            num_threads: rayon::current_num_threads(),
            min_dt: None,
            dp_balance: 3.0,
            curvature_memory: None,
            damping: 0.0,
            min_elm_size: 0.0,
            max_elm_size: f64::MAX,
        }
    }

    /// Install a driving pressure field `w(x, t)`.
    pub fn set_pressure_field(&mut self, field: PressureField) {
        self.pressure = field;
    }

    /// Set φ from a slice (length must match the scheme's φ dimension).
    pub fn set_phi(&mut self, values: &[f64]) {
        assert_eq!(values.len(), self.scheme.phi_dim(&self.mesh));
        self.phi = DVector::from_column_slice(values);
    }

    /// Set φ to a constant.
    pub fn set_phi_const(&mut self, value: f64) {
        self.phi.fill(value);
    }

    /// Set ψ from a slice (length must match the scheme's ψ dimension).
    pub fn set_psi(&mut self, values: &[f64]) {
        assert_eq!(values.len(), self.scheme.psi_dim(&self.mesh));
        self.psi = DVector::from_column_slice(values);
    }

    /// Override the per-component reference volumes.
    pub fn set_v0(&mut self, values: Vec<f64>) {
        self.v0 = values;
    }

    /// Ceiling on the adaptive time step (resolves an imposed driving
    /// frequency).
    pub fn set_min_dt(&mut self, value: f64) {
        self.min_dt = Some(value);
    }

    /// Balance factor β between potential and velocity magnitudes in
    /// the step-size rule.
    pub fn set_dp_balance(&mut self, value: f64) {
        self.dp_balance = value;
    }

    /// Toggle the iterative solver backend (default true).
    pub fn set_bcgstab(&mut self, enabled: bool) {
        self.solver.backend = if enabled {
            SolverBackend::BiCgStab
        } else {
            SolverBackend::Lu
        };
    }

    /// Cap the assembly worker count (1 gives bit-reproducible runs).
    pub fn set_num_threads(&mut self, num: usize) {
        self.num_threads = num.max(1);
    }

    /// Replace the triangle quadrature rule used by the assembly.
    pub fn set_quadrature(&mut self, rule: &'static [TriNode]) {
        self.integrator.set_tri_rule(rule);
    }

    /// Replace the 1-D Gauss rule used by the singular arms.
    pub fn set_line_quadrature(&mut self, rule: &'static [LineNode]) {
        self.integrator.set_line_rule(rule);
    }

    /// Exponential-moving-average damping ρ of the remesh curvature
    /// targets.
    pub fn set_damping_factor(&mut self, value: f64) {
        self.damping = value;
    }

    /// Lower clamp for the remesh target edge length.
    pub fn set_min_element_size(&mut self, value: f64) {
        self.min_elm_size = value;
    }

    /// Upper clamp for the remesh target edge length.
    pub fn set_max_element_size(&mut self, value: f64) {
        self.max_elm_size = value;
    }

    /// Current simulation time.
    pub fn get_time(&self) -> f64 {
        self.time
    }

    /// Total enclosed volume over all components.
    pub fn get_volume(&self) -> f64 {
        volume(&self.mesh)
    }

    /// Current φ values.
    pub fn get_phi(&self) -> Vec<f64> {
        self.phi.iter().copied().collect()
    }

    /// Cached ψ values (from the most recent solve).
    pub fn get_psi(&self) -> Vec<f64> {
        self.psi.iter().copied().collect()
    }

    /// Current vertex positions.
    pub fn get_vertices(&self) -> &[Vec3] {
        &self.mesh.verts
    }

    /// The mesh itself.
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// The discretization scheme.
    pub fn scheme(&self) -> &D {
        &self.scheme
    }

    /// One assembly and solve with the current φ; caches ψ and returns
    /// the solve diagnostics (true residual included).
    pub fn compute_psi(&mut self) -> SolveOutcome {
        let (g, h) = self
            .scheme
            .assemble(&self.mesh, &self.integrator, self.num_threads);
        let out = solve_system(&g, &(&h * &self.phi), &self.solver, None);
        self.psi = out.x.clone();
        out
    }
}

impl<D: VertexScheme> Simulation<D> {
    /// Assemble, solve, and reconstruct the vertex velocities for the
    /// given geometry and potential.
    ///
    /// For the pinned-wall scheme the trailing solution entries carry φ
    /// on the wall: they are written back into `pot` and the wall
    /// velocities are zeroed.
    fn surface_rates(&self, mesh: &Mesh, pot: &mut [f64]) -> (Vec<Vec3>, DVector<f64>) {
        let (g, h) = self.scheme.assemble(mesh, &self.integrator, self.num_threads);
        let rhs = &h * DVector::from_column_slice(pot);
        let out = solve_system(&g, &rhs, &self.solver, None);
        let psi = out.x;

        let mut u = self.scheme.velocity(mesh, pot, psi.as_slice());

        let n_pin = self.scheme.pinned_count();
        if n_pin > 0 {
            let n = mesh.num_verts();
            for i in (n - n_pin)..n {
                u[i] = Vec3::zeros();
                pot[i] = psi[i];
            }
        }
        (u, psi)
    }

    /// Material derivative of φ at every vertex (unsteady Bernoulli),
    /// with per-component gas volumes.
    fn bernoulli_rates(&self, mesh: &Mesh, u: &[Vec3], t: f64) -> Vec<f64> {
        let comps = split_components(mesh);
        assert_eq!(
            comps.len(),
            self.v0.len(),
            "component count changed; reset V0"
        );
        let ratios: Vec<f64> = comps
            .iter()
            .zip(&self.v0)
            .map(|(c, &v0)| v0 / volume(&c.mesh))
            .collect();
        let ratio_per_vertex = expand_to_vertex_data(&comps, &ratios, mesh.num_verts());

        let kappa = vertex_mean_curvature(mesh);
        let params = &self.params;
        (0..mesh.num_verts())
            .map(|i| {
                2.0 * params.sigma * kappa[i]
                    + 0.5 * u[i].norm_squared()
                    + params.p_inf
                    - params.epsilon * ratio_per_vertex[i].powf(params.gamma)
                    + (self.pressure)(mesh.verts[i], t)
            })
            .collect()
    }

    fn adaptive_dt(&self, dp: f64, u: &[Vec3], rates: &[f64]) -> f64 {
        let max_pot = rates.iter().fold(0.0_f64, |m, r| m.max(r.abs()));
        let max_vel = u
            .iter()
            .fold(0.0_f64, |m, v| m.max(v.norm_squared()))
            .sqrt();
        let mut dt = dp / (max_pot + self.dp_balance * max_vel);
        if let Some(cap) = self.min_dt {
            dt = dt.min(cap);
        }
        dt
    }

    /// Advance one explicit-Euler step with potential increment `dp`
    /// (used literally as dt when `fix_dt` is set).
    pub fn evolve_system(&mut self, dp: f64, fix_dt: bool) {
        let mut pot = self.get_phi();
        let (u, psi) = self.surface_rates(&self.mesh, &mut pot);
        let rates = self.bernoulli_rates(&self.mesh, &u, self.time);

        let dt = if fix_dt {
            dp
        } else {
            self.adaptive_dt(dp, &u, &rates)
        };
        log::debug!("euler step: dt = {dt:.6e}");

        for (v, du) in self.mesh.verts.iter_mut().zip(&u) {
            *v += dt * du;
        }
        for (p, r) in pot.iter_mut().zip(&rates) {
            *p += dt * r;
        }
        self.phi = DVector::from_vec(pot);
        self.psi = psi;
        self.time += dt;
    }

    /// Advance one classical RK4 step (four assemblies and solves). ψ
    /// is cached from the first stage for export and warm-start use.
    pub fn evolve_system_rk4(&mut self, dp: f64, fix_dt: bool) {
        let x1 = self.mesh.verts.clone();
        let mut p1 = self.get_phi();

        let (k1_u, k1_psi) = self.surface_rates(&self.mesh, &mut p1);
        let k1_p = self.bernoulli_rates(&self.mesh, &k1_u, self.time);

        let dt = if fix_dt {
            dp
        } else {
            self.adaptive_dt(dp, &k1_u, &k1_p)
        };
        log::debug!("rk4 step: dt = {dt:.6e}");

        let mut stage_mesh = self.mesh.clone();

        let advance = |base: &[Vec3], slope: &[Vec3], h: f64| -> Vec<Vec3> {
            base.iter().zip(slope).map(|(x, k)| x + h * k).collect()
        };
        let advance_pot = |base: &[f64], slope: &[f64], h: f64| -> Vec<f64> {
            base.iter().zip(slope).map(|(p, k)| p + h * k).collect()
        };

        stage_mesh.verts = advance(&x1, &k1_u, 0.5 * dt);
        let mut p2 = advance_pot(&p1, &k1_p, 0.5 * dt);
        let (k2_u, _) = self.surface_rates(&stage_mesh, &mut p2);
        let k2_p = self.bernoulli_rates(&stage_mesh, &k2_u, self.time);

        stage_mesh.verts = advance(&x1, &k2_u, 0.5 * dt);
        let mut p3 = advance_pot(&p1, &k2_p, 0.5 * dt);
        let (k3_u, _) = self.surface_rates(&stage_mesh, &mut p3);
        let k3_p = self.bernoulli_rates(&stage_mesh, &k3_u, self.time);

        stage_mesh.verts = advance(&x1, &k3_u, dt);
        let mut p4 = advance_pot(&p1, &k3_p, dt);
        let (k4_u, _) = self.surface_rates(&stage_mesh, &mut p4);
        let k4_p = self.bernoulli_rates(&stage_mesh, &k4_u, self.time);

        let n = x1.len();
        let mut xf = Vec::with_capacity(n);
        for i in 0..n {
            let avg = (k1_u[i] + 2.0 * k2_u[i] + 2.0 * k3_u[i] + k4_u[i]) / 6.0;
            xf.push(x1[i] + dt * avg);
        }
        let pf: Vec<f64> = (0..p1.len())
            .map(|i| p1[i] + dt / 6.0 * (k1_p[i] + 2.0 * k2_p[i] + 2.0 * k3_p[i] + k4_p[i]))
            .collect();

        self.mesh.verts = xf;
        self.phi = DVector::from_vec(pf);
        self.psi = k1_psi;
        self.time += dt;
    }

    /// One full curvature-adaptive remeshing pass with nominal target
    /// edge length `L`, followed by projection of the new vertices onto
    /// the old surface and transfer of φ.
    ///
    /// The editors run on a copy; a failed topology check leaves the
    /// simulation untouched.
    pub fn remesh(&mut self, l: f64) -> Result<(), TopologyError> {
        let fresh = smoothed_max_curvature(&self.mesh);
        let memory = match self.curvature_memory.take() {
            Some(old) if old.len() == fresh.len() => old
                .iter()
                .zip(&fresh)
                .map(|(o, n)| self.damping * o + (1.0 - self.damping) * n)
                .collect(),
            _ => fresh,
        };

        let target_lengths: Vec<f64> = memory
            .iter()
            .map(|&k| {
                let raw = if k == 0.0 { self.max_elm_size } else { 1.0 / k.abs() };
                raw.clamp(self.min_elm_size, self.max_elm_size)
            })
            .collect();

        let mut hm = HalfedgeMesh::from_mesh(&self.mesh)?;
        let mut targets = Targets::new();
        for (key, &len) in hm.verts.keys().zip(target_lengths.iter()) {
            targets.insert(key, len);
        }

        // split once, then only count-preserving or count-reducing
        // passes: the growth rate of one remesh call stays bounded
        split_long_edges(&mut hm, &mut targets, 0.75 * l);
        flip_edges(&mut hm, FlipCost::Valence);
        flip_edges(&mut hm, FlipCost::Valence);
        relax_vertices(&mut hm);
        hm.check()?;
        for _ in 0..4 {
            collapse_short_edges(&mut hm, &mut targets, 0.8 * l);
            flip_edges(&mut hm, FlipCost::Valence);
            flip_edges(&mut hm, FlipCost::Valence);
            relax_vertices(&mut hm);
            hm.check()?;
        }
        flip_edges(&mut hm, FlipCost::Valence);
        relax_vertices(&mut hm);
        hm.check()?;

        let mut new_mesh = hm.to_mesh();
        let new_targets: Vec<f64> = hm.verts.keys().map(|k| targets[k]).collect();

        let old_phi = self.get_phi();
        let n_pin = self.scheme.pinned_count();

        if n_pin > 0 {
            let (reordered, order, n_pin_new) =
                PinnedCollocation::rearrange_wall_last(&new_mesh, 1e-9);
            assert_eq!(n_pin_new, n_pin, "wall ring changed during remeshing");
            new_mesh = reordered;
            let reordered_targets: Vec<f64> =
                order.iter().map(|&i| new_targets[i]).collect();

            let n = new_mesh.num_verts();
            let wall_positions: Vec<Vec3> = new_mesh.verts[n - n_pin..].to_vec();
            let wall_distance = wall_positions
                .iter()
                .fold(0.0_f64, |m, v| m.max(v.norm()));

            let mut new_phi =
                project_from_origin(&mut new_mesh, &self.mesh, &old_phi, wall_distance);

            // the wall ring is geometry-pinned: restore its exact
            // positions and carry φ over from the nearest old wall
            // sample (it is re-solved every step anyway)
            let old_n = self.mesh.num_verts();
            for (k, pos) in wall_positions.into_iter().enumerate() {
                let i = n - n_pin + k;
                new_mesh.verts[i] = pos;
                let nearest = (old_n - n_pin..old_n)
                    .min_by(|&a, &b| {
                        (self.mesh.verts[a] - pos)
                            .norm()
                            .total_cmp(&(self.mesh.verts[b] - pos).norm())
                    })
                    .unwrap();
                new_phi[i] = old_phi[nearest];
            }

            self.curvature_memory = Some(
                reordered_targets
                    .iter()
                    .map(|&len| 1.0 / len)
                    .collect(),
            );
            self.mesh = new_mesh;
            self.phi = DVector::from_vec(new_phi);
        } else {
            let new_phi = project_and_interpolate_simple(&mut new_mesh, &self.mesh, &old_phi);
            self.curvature_memory =
                Some(new_targets.iter().map(|&len| 1.0 / len).collect());
            self.mesh = new_mesh;
            self.phi = DVector::from_vec(new_phi);
        }

        self.psi = DVector::zeros(self.scheme.psi_dim(&self.mesh));
        log::debug!(
            "remesh done: {} vertices, {} triangles",
            self.mesh.num_verts(),
            self.mesh.num_trigs()
        );
        Ok(())
    }
}

impl<D: VertexFields> Simulation<D> {
    /// Kinetic energy of the liquid, `−½ ∮ φ ψ dS` over the surface
    /// (outward normal pointing into the liquid), evaluated from the
    /// current φ and the cached ψ with per-triangle linear quadrature.
    pub fn kinetic_energy(&self) -> f64 {
        let mut energy = 0.0;
        for t in &self.mesh.trigs {
            let (a, b, c) = self.mesh.corners(t);
            let area = 0.5 * plesset_math::surface_vector(&a, &b, &c).norm();
            let mut phi_psi = 0.0;
            for k in 0..3 {
                phi_psi += self.phi[t[k]] * self.psi[t[k]];
            }
            energy += area / 3.0 * phi_psi;
        }
        -0.5 * energy
    }

    /// φ at exterior points by the representation formula (no
    /// near-singular correction; the points must be strictly off Γ).
    ///
    /// Solves once with the current φ, then sums the per-triangle
    /// contributions with the high-order triangle rule, parallel over
    /// evaluation points.
    pub fn exterior_pot(&mut self, positions: &[Vec3]) -> Vec<f64> {
        let out = self.compute_psi();
        if !out.converged {
            log::warn!(
                "exterior evaluation on an unconverged solve (residual {:.3e})",
                out.residual_inf
            );
        }

        let mut ext = self.integrator;
        ext.set_tri_rule(&TRI_19);

        let phi = self.get_phi();
        let psi = self.get_psi();
        let mesh = &self.mesh;

        positions
            .par_iter()
            .map_init(
                || ext,
                |int_l, &y| {
                    mesh.trigs
                        .iter()
                        .map(|&t| int_l.exterior_potential(&mesh.verts, t, &phi, &psi, y))
                        .sum()
                },
            )
            .collect()
    }
}

impl Simulation<LinearCollocation> {
    /// Linear collocation simulation in free space.
    pub fn collocation(mesh: Mesh, params: PhysicalParams) -> Self {
        Self::new(mesh, LinearCollocation::default(), params)
    }

    /// Linear collocation with the rigid-wall mirror kernel.
    pub fn collocation_mirror(mesh: Mesh, params: PhysicalParams) -> Self {
        Self::new(
            mesh,
            LinearCollocation {
                mirror: true,
                cubic: false,
            },
            params,
        )
    }

    /// Collocation over cubic Bézier patches.
    pub fn collocation_cubic(mesh: Mesh, params: PhysicalParams) -> Self {
        Self::new(
            mesh,
            LinearCollocation {
                mirror: false,
                cubic: true,
            },
            params,
        )
    }
}

impl Simulation<PinnedCollocation> {
    /// Pinned-wall simulation: vertices on the plane `x = 0` are moved
    /// to the tail of the ordering and become wall samples.
    pub fn pinned(mesh: Mesh, params: PhysicalParams) -> Self {
        let (reordered, _, n_pin) = PinnedCollocation::rearrange_wall_last(&mesh, 1e-9);
        Self::new(reordered, PinnedCollocation { n_pin }, params)
    }
}

/// Per-vertex maximum curvature smoothed over the 2-ring, the raw
/// remeshing density signal.
fn smoothed_max_curvature(mesh: &Mesh) -> Vec<f64> {
    let raw = max_curvature(mesh);
    let ring = two_ring(mesh);
    (0..mesh.num_verts())
        .map(|i| ring[i].iter().map(|&j| raw[j]).sum::<f64>() / ring[i].len() as f64)
        .collect()
}
