#![warn(missing_docs)]

//! Potential-flow bubble dynamics by boundary elements.
//!
//! Couples the pieces of the workspace into the simulation engine:
//! dense assembly of the single- and double-layer operators over a
//! [`plesset_mesh::Mesh`], the `G ψ = H φ` solve, surface-velocity
//! reconstruction, the unsteady-Bernoulli potential update with
//! adaptive time stepping (explicit Euler or classical RK4), and the
//! curvature-adaptive remeshing pass with quadratic field reprojection.

pub mod scheme;
pub mod simulation;
pub mod solver;

pub use scheme::{
    ConstantGalerkin, ConstantLinearGalerkin, Discretization, LinearCollocation, LinearGalerkin,
    PinnedCollocation, VertexFields, VertexScheme,
};
pub use simulation::{PhysicalParams, PressureField, Simulation};
pub use solver::{solve_system, SolveOutcome, SolverBackend, SolverConfig};

/// Linear-linear collocation simulation (the production setup).
pub type ColocSim = Simulation<LinearCollocation>;
/// Pinned-wall collocation simulation.
pub type ColocSimPin = Simulation<PinnedCollocation>;
/// Linear-linear Galerkin simulation.
pub type GalerkinSim = Simulation<LinearGalerkin>;
