#![warn(missing_docs)]

//! Boundary-integral operators for the Laplace equation on triangulated
//! surfaces.
//!
//! This crate carries the numerical core of the solver: fixed quadrature
//! tables, the reference-triangle interpolation patches (flat and cubic
//! Bézier), the per-element result blocks, and the [`Integrator`] that
//! evaluates the single- and double-layer kernels over every triangle
//! pair configuration, including the Duffy-regularised singular ones,
//! with uniform accuracy.

pub mod blocks;
pub mod integrator;
pub mod patch;
pub mod quadrature;

pub use blocks::{Block, Lin, LinLin, Pair};
pub use integrator::{ConCon, ConLinKernel, GalerkinKernel, Integrator, LinLinKernel};
pub use patch::{CubicPatch, LinearPatch};
