//! Ray-mesh projection and field transfer between meshes.
//!
//! After remeshing, every vertex of the new mesh is shot along its vertex
//! normal onto the old surface. The hit triangle's three local quadratic
//! fits are blended to place the vertex back on the (smooth) old surface,
//! and the potential is carried over by linear interpolation in the hit
//! triangle's plane coordinates.

use rayon::prelude::*;

use plesset_math::{Triplet, Vec3};

use crate::adjacency::neighbours;
use crate::fitting::QuadraticFit;
use crate::geometry::vertex_normals_simple;
use crate::Mesh;

/// First intersection of a line with the mesh surface.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// Intersection point on the triangle plane.
    pub point: Vec3,
    /// Index of the pierced triangle.
    pub triangle: usize,
}

/// Intersect the line `pos + s·dir` with every triangle and return the
/// hit with the smallest `|s|`, if any.
///
/// The inside test checks the three edge cross products against the
/// triangle normal; hits on an edge count as inside.
pub fn trace_mesh(mesh: &Mesh, pos: Vec3, dir: Vec3) -> Option<RayHit> {
    let mut s_min = f64::INFINITY;
    let mut hit = None;

    for (j, t) in mesh.trigs.iter().enumerate() {
        let (va, vb, vc) = mesh.corners(t);
        let a = vb - va;
        let b = vc - vb;
        let c = va - vc;
        let n = a.cross(&b);

        let denom = n.dot(&dir);
        if denom == 0.0 {
            continue;
        }
        let s = n.dot(&(va - pos)) / denom;
        let x = pos + s * dir;

        if s.abs() < s_min
            && (va - x).cross(&a).dot(&n) >= 0.0
            && (vb - x).cross(&b).dot(&n) >= 0.0
            && (vc - x).cross(&c).dot(&n) >= 0.0
        {
            s_min = s.abs();
            hit = Some(RayHit { point: x, triangle: j });
        }
    }

    hit
}

/// Plane coordinates `(q, r)` of `point` in the triangle's edge frame.
///
/// With edges `a = t_b - t_a`, `b = t_c - t_b` the decomposition is
/// `point - t_a = q·a + r·b`; the matching linear weights on the corners
/// are `(1-q, q-r, r)`.
fn plane_coordinates(mesh: &Mesh, t: &Triplet, point: Vec3) -> (f64, f64) {
    let (ta, tb, tc) = mesh.corners(t);
    let u = (tb - ta).normalize();
    let mut v = tc - tb;
    v = (v - v.dot(&u) * u).normalize();

    let a = tb - ta;
    let b = tc - tb;
    let x = point - ta;

    let (a0, a1) = (a.dot(&u), a.dot(&v));
    let (b0, b1) = (b.dot(&u), b.dot(&v));
    let (x0, x1) = (x.dot(&u), x.dot(&v));

    // well defined whenever a and b are not collinear
    let det = a1 * b0 - a0 * b1;
    let q = (x1 * b0 - b1 * x0) / det;
    let r = (a1 * x0 - a0 * x1) / det;
    (q, r)
}

fn build_ring_fits(old: &Mesh) -> Vec<QuadraticFit> {
    let old_normals = vertex_normals_simple(old);
    let ring = neighbours(old);
    (0..old.num_verts())
        .map(|i| {
            let mut positions = vec![old.verts[i]];
            positions.extend(ring[i].iter().map(|&j| old.verts[j]));
            QuadraticFit::fit(old_normals[i], old.verts[i], &positions)
        })
        .collect()
}

fn transfer_at_hit(
    old: &Mesh,
    fits: &[QuadraticFit],
    f_old: &[f64],
    hit: RayHit,
) -> (Vec3, f64) {
    let t = old.trigs[hit.triangle];
    let (q, r) = plane_coordinates(old, &t, hit.point);

    let blend = |fit: &QuadraticFit| {
        let local = fit.frame().transform(hit.point);
        fit.position(local.x, local.y)
    };
    let pa = blend(&fits[t.a]);
    let pb = blend(&fits[t.b]);
    let pc = blend(&fits[t.c]);

    let position = (1.0 - q) * pa + (q - r) * pb + r * pc;
    let value = (1.0 - q) * f_old[t.a] + (q - r) * f_old[t.b] + r * f_old[t.c];
    (position, value)
}

/// Project the vertices of `mesh` along `normals` onto `old`, replacing
/// the positions by the blended quadratic-fit surface points, and return
/// the transferred field.
///
/// Vertices whose ray misses the old surface entirely keep their position
/// and receive the field value of the nearest old vertex; a closed
/// manifold target makes this a non-event in practice.
pub fn project_and_interpolate(
    mesh: &mut Mesh,
    normals: &[Vec3],
    old: &Mesh,
    f_old: &[f64],
) -> Vec<f64> {
    assert_eq!(f_old.len(), old.num_verts());
    let fits = build_ring_fits(old);

    let results: Vec<(Vec3, f64)> = mesh
        .verts
        .par_iter()
        .zip(normals.par_iter())
        .map(|(&pos, &dir)| match trace_mesh(old, pos, dir) {
            Some(hit) => transfer_at_hit(old, &fits, f_old, hit),
            None => {
                log::warn!("projection ray missed the old surface");
                let nearest = old
                    .verts
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| {
                        (*a - pos).norm().total_cmp(&(*b - pos).norm())
                    })
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                (pos, f_old[nearest])
            }
        })
        .collect();

    let mut values = Vec::with_capacity(results.len());
    for (v, (pos, val)) in mesh.verts.iter_mut().zip(results) {
        *v = pos;
        values.push(val);
    }
    values
}

/// Variant of [`project_and_interpolate`] using vertex normals of `mesh`.
pub fn project_and_interpolate_simple(mesh: &mut Mesh, old: &Mesh, f_old: &[f64]) -> Vec<f64> {
    let normals = vertex_normals_simple(mesh);
    project_and_interpolate(mesh, &normals, old, f_old)
}

/// Pinned-wall variant: rays originate at the origin and pass through
/// each vertex. A vertex whose ray finds no intersection is assumed to
/// have left the bubble cap and is rescaled to `wall_distance` from the
/// origin instead.
pub fn project_from_origin(
    mesh: &mut Mesh,
    old: &Mesh,
    f_old: &[f64],
    wall_distance: f64,
) -> Vec<f64> {
    assert_eq!(f_old.len(), old.num_verts());
    let fits = build_ring_fits(old);

    let results: Vec<(Vec3, f64)> = mesh
        .verts
        .par_iter()
        .map(|&pos| {
            let dir = pos.normalize();
            match trace_mesh(old, Vec3::zeros(), dir) {
                Some(hit) => transfer_at_hit(old, &fits, f_old, hit),
                None => (dir * wall_distance, 0.0),
            }
        })
        .collect();

    let mut values = Vec::with_capacity(results.len());
    for (v, (pos, val)) in mesh.verts.iter_mut().zip(results) {
        *v = pos;
        values.push(val);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icosphere::icosphere;

    #[test]
    fn test_trace_hits_sphere() {
        let m = icosphere(2);
        let hit = trace_mesh(&m, Vec3::new(0.2, 0.1, 2.0), Vec3::new(0.0, 0.0, -1.0)).unwrap();
        // entering from +z, nearest-|s| hit is the upper hemisphere
        assert!(hit.point.z > 0.0);
        approx::assert_relative_eq!(hit.point.x, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_trace_picks_smallest_parameter() {
        let m = icosphere(2);
        // from just outside the sphere along -z: |s| to the top cap is
        // much smaller than to the bottom cap
        let hit = trace_mesh(&m, Vec3::new(0.0, 0.0, 1.5), Vec3::new(0.0, 0.0, -1.0)).unwrap();
        assert!(hit.point.z > 0.9);
    }

    #[test]
    fn test_plane_coordinates_at_corners() {
        let m = icosphere(0);
        let t = m.trigs[0];
        let (q, r) = plane_coordinates(&m, &t, m.verts[t.a]);
        approx::assert_relative_eq!(q, 0.0, epsilon = 1e-12);
        approx::assert_relative_eq!(r, 0.0, epsilon = 1e-12);
        let (q, r) = plane_coordinates(&m, &t, m.verts[t.b]);
        approx::assert_relative_eq!(q, 1.0, epsilon = 1e-12);
        approx::assert_relative_eq!(r, 0.0, epsilon = 1e-12);
        let (q, r) = plane_coordinates(&m, &t, m.verts[t.c]);
        approx::assert_relative_eq!(q, 1.0, epsilon = 1e-12);
        approx::assert_relative_eq!(r, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_transfer_preserves_linear_field_on_sphere() {
        // project a slightly shrunk sphere onto the unit sphere; a linear
        // field in z transfers with small interpolation error
        let old = icosphere(3);
        let mut new_mesh = icosphere(2);
        new_mesh.scale(0.95);

        let f_old: Vec<f64> = old.verts.iter().map(|v| v.z).collect();
        let f_new = project_and_interpolate_simple(&mut new_mesh, &old, &f_old);

        for (v, f) in new_mesh.verts.iter().zip(&f_new) {
            // vertices land back on (a smooth fit of) the unit sphere
            approx::assert_relative_eq!(v.norm(), 1.0, epsilon = 0.02);
            approx::assert_relative_eq!(*f, v.z, epsilon = 0.05);
        }
    }

    #[test]
    fn test_project_from_origin_rescales_misses() {
        let old = icosphere(2);
        let mut m = Mesh {
            verts: vec![Vec3::new(0.3, 0.0, 0.0)],
            trigs: vec![],
        };
        let vals = project_from_origin(&mut m, &old, &vec![1.0; old.num_verts()], 4.0);
        // the ray through a sphere always hits, so this transfers
        approx::assert_relative_eq!(m.verts[0].norm(), 1.0, epsilon = 0.02);
        approx::assert_relative_eq!(vals[0], 1.0, epsilon = 1e-6);
    }
}
