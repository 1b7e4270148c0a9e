//! Normals, solid angles and integral measures of a mesh.

use plesset_math::{surface_vector, Triplet, Vec3};

use crate::adjacency::triangle_indices;
use crate::Mesh;

/// Unit outward normal of every triangle.
pub fn triangle_normals(mesh: &Mesh) -> Vec<Vec3> {
    mesh.trigs
        .iter()
        .map(|t| {
            let (a, b, c) = mesh.corners(t);
            surface_vector(&a, &b, &c).normalize()
        })
        .collect()
}

/// Unit vertex normals with Max's weighting.
///
/// For each incident triangle, reordered so the vertex sits at corner a,
/// the contribution is `B × C / (‖B‖²·‖C‖²)` with `B`, `C` the two edge
/// vectors leaving the vertex. Exact for vertices sampled on a sphere.
pub fn vertex_normals(mesh: &Mesh, incidence: &[Vec<usize>]) -> Vec<Vec3> {
    let mut normals = Vec::with_capacity(mesh.verts.len());
    for (i, incident) in incidence.iter().enumerate() {
        let mut normal = Vec3::zeros();
        for &j in incident {
            let mut t = mesh.trigs[j];
            t.cyclic_reorder(i);
            let b = mesh.verts[t.b] - mesh.verts[t.a];
            let c = mesh.verts[t.c] - mesh.verts[t.a];
            normal += b.cross(&c) / (b.norm_squared() * c.norm_squared());
        }
        normals.push(normal.normalize());
    }
    normals
}

/// Convenience wrapper building the incidence lists internally.
pub fn vertex_normals_simple(mesh: &Mesh) -> Vec<Vec3> {
    vertex_normals(mesh, &triangle_indices(mesh))
}

/// Solid angle subtended by the surface at vertex `i`, by spherical
/// trigonometry over the fan of incident triangles (Todhunter's rule).
///
/// The incident triangles are first sorted into a closed fan; the angle
/// between consecutive face normals along the shared ray accumulates into
/// the spherical excess.
pub fn solid_angle_at_vertex(
    mesh: &Mesh,
    incidence: &[Vec<usize>],
    normals: &[Vec3],
    i: usize,
) -> f64 {
    let mut fan: Vec<Triplet> = Vec::with_capacity(incidence[i].len());
    for &j in &incidence[i] {
        let mut t = mesh.trigs[j];
        t.cyclic_reorder(i);
        fan.push(t);
    }

    let mut sorted = vec![fan[0]];
    let mut normal_ids = vec![incidence[i][0]];
    for _ in 1..fan.len() {
        let tail = sorted.last().unwrap().c;
        for (k, t) in fan.iter().enumerate() {
            if t.b == tail {
                sorted.push(*t);
                normal_ids.push(incidence[i][k]);
                break;
            }
        }
    }

    let n = sorted.len();
    let mut angle_sum = 0.0;
    for j in 0..n {
        let ray = (mesh.verts[sorted[j].c] - mesh.verts[sorted[j].a]).normalize();
        let cross = normals[normal_ids[j]].cross(&normals[normal_ids[(j + 1) % n]]);
        angle_sum += std::f64::consts::PI + cross.dot(&ray).asin();
    }

    angle_sum - (n as f64 - 2.0) * std::f64::consts::PI
}

/// Solid angle at vertex `i`, building the adjacency internally.
pub fn solid_angle_at_vertex_simple(mesh: &Mesh, i: usize) -> f64 {
    solid_angle_at_vertex(mesh, &triangle_indices(mesh), &triangle_normals(mesh), i)
}

/// Total surface area.
pub fn surface_area(mesh: &Mesh) -> f64 {
    mesh.trigs
        .iter()
        .map(|t| {
            let (a, b, c) = mesh.corners(t);
            0.5 * surface_vector(&a, &b, &c).norm()
        })
        .sum()
}

/// Signed enclosed volume: sum of tetrahedron volumes spanned by the
/// triangles and the origin.
pub fn volume(mesh: &Mesh) -> f64 {
    mesh.trigs
        .iter()
        .map(|t| {
            let (a, b, c) = mesh.corners(t);
            a.cross(&b).dot(&c) / 6.0
        })
        .sum()
}

/// Center of mass for a constant interior density, via the signed
/// tetrahedron decomposition used by [`volume`].
pub fn center_of_mass(mesh: &Mesh) -> Vec3 {
    let mut center = Vec3::zeros();
    let mut total = 0.0;
    for t in &mesh.trigs {
        let (a, b, c) = mesh.corners(t);
        let vol = a.cross(&b).dot(&c) / 6.0;
        center += 0.25 * (a + b + c) * vol;
        total += vol;
    }
    center / total
}

/// Translate the mesh so its center of mass moves to the origin.
pub fn to_center_of_mass(mesh: &mut Mesh) {
    let center = center_of_mass(mesh);
    mesh.translate(-center);
}
