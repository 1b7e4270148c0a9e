#![warn(missing_docs)]

//! Boundary-element simulation of gas bubbles in potential flow.
//!
//! This facade re-exports the workspace crates:
//!
//! - [`math`]: vector and index-triplet primitives;
//! - [`mesh`]: triangle surfaces, estimators, PLY I/O;
//! - [`topo`]: half-edge topology and remeshing editors;
//! - [`bie`]: quadrature, patches, and the singular integrator;
//! - [`sim`]: the coupled simulation engine.
//!
//! The usual entry point is [`sim::Simulation`] built over an initial
//! surface such as [`mesh::icosphere::icosphere`].

pub use plesset_bie as bie;
pub use plesset_math as math;
pub use plesset_mesh as mesh;
pub use plesset_sim as sim;
pub use plesset_topo as topo;

pub use plesset_math::{Triplet, Vec3};
pub use plesset_mesh::Mesh;
pub use plesset_sim::{ColocSim, ColocSimPin, GalerkinSim, PhysicalParams, Simulation};
