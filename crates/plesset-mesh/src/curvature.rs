//! Curvature estimation from a per-triangle curvature-tensor fit.
//!
//! On each triangle a local frame `(u, v, n)` is set up and the 2×2
//! curvature tensor `[e f; f g]` is recovered from the finite differences
//! of the vertex normals along the three edges, as a 6×3 least-squares
//! system (Rusinkiewicz' method). Mean curvature is `(e+g)/2`, Gaussian
//! curvature `eg − f²`; vertex values are arithmetic averages over the
//! incident triangles.

use nalgebra::{SMatrix, SVector};

use crate::geometry::vertex_normals_simple;
use crate::Mesh;

/// Mean and Gaussian curvature per triangle.
pub fn triangle_curvatures(mesh: &Mesh) -> (Vec<f64>, Vec<f64>) {
    let normals = vertex_normals_simple(mesh);

    let mut kappa = Vec::with_capacity(mesh.num_trigs());
    let mut gamma = Vec::with_capacity(mesh.num_trigs());

    for t in &mesh.trigs {
        let e0 = mesh.verts[t.b] - mesh.verts[t.a];
        let e1 = mesh.verts[t.c] - mesh.verts[t.b];
        let e2 = mesh.verts[t.a] - mesh.verts[t.c];

        let u = e0.normalize();
        let n = e0.cross(&e1).normalize();
        let v = n.cross(&u);

        #[rustfmt::skip]
        let m = SMatrix::<f64, 6, 3>::from_row_slice(&[
            e0.dot(&u), e0.dot(&v), 0.0,
            0.0,        e0.dot(&u), e0.dot(&v),
            e1.dot(&u), e1.dot(&v), 0.0,
            0.0,        e1.dot(&u), e1.dot(&v),
            e2.dot(&u), e2.dot(&v), 0.0,
            0.0,        e2.dot(&u), e2.dot(&v),
        ]);

        let dn0 = normals[t.b] - normals[t.a];
        let dn1 = normals[t.c] - normals[t.b];
        let dn2 = normals[t.a] - normals[t.c];
        let b = SVector::<f64, 6>::from_column_slice(&[
            dn0.dot(&u),
            dn0.dot(&v),
            dn1.dot(&u),
            dn1.dot(&v),
            dn2.dot(&u),
            dn2.dot(&v),
        ]);

        // normal equations of the 6x3 least-squares problem
        let mtm = m.transpose() * m;
        let mtb = m.transpose() * b;
        let x = match mtm.lu().solve(&mtb) {
            Some(x) => x,
            None => {
                log::warn!("degenerate triangle in curvature fit, tensor set to zero");
                SVector::<f64, 3>::zeros()
            }
        };

        kappa.push(0.5 * (x[0] + x[2]));
        gamma.push(x[0] * x[2] - x[1] * x[1]);
    }

    (kappa, gamma)
}

/// Mean curvature per vertex: arithmetic average of the incident
/// triangles' tensor traces.
pub fn vertex_mean_curvature(mesh: &Mesh) -> Vec<f64> {
    let (kappa, _) = triangle_curvatures(mesh);
    average_to_vertices(mesh, &kappa)
}

/// Largest absolute principal curvature per vertex.
///
/// From mean curvature κ and Gaussian curvature K the principal values
/// are `κ ± √(κ² − K)`; the larger magnitude drives the remeshing target
/// edge length.
pub fn max_curvature(mesh: &Mesh) -> Vec<f64> {
    let (kappa, gamma) = triangle_curvatures(mesh);
    let per_trig: Vec<f64> = kappa
        .iter()
        .zip(&gamma)
        .map(|(&k, &g)| {
            let d = (k * k - g).max(0.0).sqrt();
            (k + d).abs().max((k - d).abs())
        })
        .collect();
    average_to_vertices(mesh, &per_trig)
}

fn average_to_vertices(mesh: &Mesh, per_trig: &[f64]) -> Vec<f64> {
    let mut acc = vec![0.0; mesh.num_verts()];
    let mut weight = vec![0.0; mesh.num_verts()];
    for (t, &val) in mesh.trigs.iter().zip(per_trig) {
        for k in 0..3 {
            acc[t[k]] += val;
            weight[t[k]] += 1.0;
        }
    }
    for (a, w) in acc.iter_mut().zip(&weight) {
        *a /= w;
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icosphere::icosphere;

    #[test]
    fn test_unit_sphere_curvature() {
        let m = icosphere(3);
        for k in vertex_mean_curvature(&m) {
            approx::assert_relative_eq!(k, 1.0, epsilon = 0.05);
        }
    }

    #[test]
    fn test_scaled_sphere_curvature() {
        let mut m = icosphere(3);
        m.scale(2.0);
        for k in vertex_mean_curvature(&m) {
            approx::assert_relative_eq!(k, 0.5, epsilon = 0.03);
        }
    }

    #[test]
    fn test_sphere_gaussian_curvature() {
        let m = icosphere(3);
        let (_, gamma) = triangle_curvatures(&m);
        let mean: f64 = gamma.iter().sum::<f64>() / gamma.len() as f64;
        approx::assert_relative_eq!(mean, 1.0, epsilon = 0.1);
    }

    #[test]
    fn test_max_curvature_on_sphere() {
        let m = icosphere(3);
        for k in max_curvature(&m) {
            approx::assert_relative_eq!(k, 1.0, epsilon = 0.1);
        }
    }
}
