//! Flat unit-square test patches.

use plesset_math::{Triplet, Vec3};

use crate::Mesh;

/// Regular triangulation of the unit square in the plane z = 0 with
/// `dim × dim` vertices. Used by wall-configuration checks; not a closed
/// surface.
pub fn unit_square(dim: usize) -> Mesh {
    assert!(dim >= 2, "a square grid needs at least 2x2 vertices");
    let dx = 1.0 / (dim - 1) as f64;

    let mut mesh = Mesh::new();
    for i in 0..dim {
        for j in 0..dim {
            mesh.verts.push(Vec3::new(i as f64 * dx, j as f64 * dx, 0.0));
            if i < dim - 1 && j < dim - 1 {
                mesh.trigs.push(Triplet::new(i * dim + j, (i + 1) * dim + j, i * dim + j + 1));
                mesh.trigs.push(Triplet::new(
                    (i + 1) * dim + j + 1,
                    i * dim + j + 1,
                    (i + 1) * dim + j,
                ));
            }
        }
    }
    mesh
}
