#![warn(missing_docs)]

//! Triangle surface meshes for the plesset boundary-element kernel.
//!
//! The [`Mesh`] here is the ground truth of the simulator: an ordered
//! vertex list and an ordered list of outward-oriented index triplets.
//! On top of it this crate provides the adjacency generators, normal and
//! curvature estimators, the local quadratic surface fit, the icosphere
//! builder, connected-component splitting, ray projection with field
//! transfer, and binary PLY import/export.

pub mod adjacency;
pub mod components;
pub mod curvature;
pub mod fitting;
pub mod geometry;
pub mod icosphere;
pub mod obj;
pub mod ply;
pub mod project;
pub mod square;

use plesset_math::{Triplet, Vec3};

/// An oriented triangle surface: vertex positions plus index triplets.
///
/// Each triplet `(a, b, c)` is ordered so that `(v_b - v_a) × (v_c - v_a)`
/// points out of the enclosed liquid-free region. Vertex index is
/// identity: all per-vertex field arrays (φ, ψ, normals, …) are indexed
/// by the current vertex ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions.
    pub verts: Vec<Vec3>,
    /// Oriented vertex-index triplets.
    pub trigs: Vec<Triplet>,
}

impl Mesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vertices.
    #[inline]
    pub fn num_verts(&self) -> usize {
        self.verts.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn num_trigs(&self) -> usize {
        self.trigs.len()
    }

    /// Append `other`, translated by `position`, reindexing its triangles.
    pub fn add(&mut self, other: &Mesh, position: Vec3) {
        let offset = self.verts.len();
        self.verts.extend(other.verts.iter().map(|v| v + position));
        self.trigs.extend(other.trigs.iter().map(|t| {
            let mut t = *t;
            t.map_indices(|i| i + offset);
            t
        }));
    }

    /// Scale all vertex positions by `s` about the origin.
    pub fn scale(&mut self, s: f64) {
        for v in &mut self.verts {
            *v *= s;
        }
    }

    /// Translate all vertices by `d`.
    pub fn translate(&mut self, d: Vec3) {
        for v in &mut self.verts {
            *v += d;
        }
    }

    /// Rotate about the axis `v` by the angle `‖v‖` (Rodrigues form).
    pub fn rotate(&mut self, v: Vec3) {
        let theta = v.norm();
        if theta == 0.0 {
            return;
        }
        let axis = v / theta;
        for pos in &mut self.verts {
            if pos.cross(&axis).norm_squared() > 1e-20 {
                let para = axis * pos.dot(&axis);
                let mut orth = *pos - para;
                let a = orth.norm();
                orth /= a;
                let w = axis.cross(&orth);
                *pos = para + a * (orth * theta.cos() + w * theta.sin());
            }
        }
    }

    /// Remove all vertices and triangles.
    pub fn clear(&mut self) {
        self.verts.clear();
        self.trigs.clear();
    }

    /// Whether every vertex is referenced by at least one triangle.
    pub fn all_verts_used(&self) -> bool {
        let mut used = vec![false; self.verts.len()];
        for t in &self.trigs {
            used[t.a] = true;
            used[t.b] = true;
            used[t.c] = true;
        }
        used.iter().all(|&u| u)
    }

    /// Positions of the three corners of triangle `t`.
    #[inline]
    pub fn corners(&self, t: &Triplet) -> (Vec3, Vec3, Vec3) {
        (self.verts[t.a], self.verts[t.b], self.verts[t.c])
    }
}
