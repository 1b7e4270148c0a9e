//! Subdivided-icosahedron sphere meshes.

use std::collections::HashMap;

use plesset_math::{Triplet, Vec3};

use crate::Mesh;

/// Unit-radius icosphere of the given subdivision order.
///
/// Order 0 is the icosahedron (12 vertices, 20 triangles); each further
/// order quadruples the triangle count and projects the midpoints back
/// onto the sphere. All triangles are oriented outward.
pub fn icosphere(order: u32) -> Mesh {
    let phi = 0.5 * (1.0 + 5.0_f64.sqrt());
    let scale = 1.0 / (phi * phi + 1.0).sqrt();

    let mut verts: Vec<Vec3> = vec![
        Vec3::new(0.0, 1.0, phi),
        Vec3::new(0.0, -1.0, phi),
        Vec3::new(1.0, phi, 0.0),
        Vec3::new(-1.0, phi, 0.0),
        Vec3::new(phi, 0.0, 1.0),
        Vec3::new(-phi, 0.0, 1.0),
    ];
    for i in 0..6 {
        verts[i] *= scale;
        let v = verts[i];
        verts.push(-v);
    }

    let mut trigs = vec![
        Triplet::new(0, 5, 1),
        Triplet::new(0, 3, 5),
        Triplet::new(0, 2, 3),
        Triplet::new(0, 4, 2),
        Triplet::new(0, 1, 4),
        Triplet::new(1, 5, 8),
        Triplet::new(5, 3, 10),
        Triplet::new(3, 2, 7),
        Triplet::new(2, 4, 11),
        Triplet::new(4, 1, 9),
        Triplet::new(7, 11, 6),
        Triplet::new(11, 9, 6),
        Triplet::new(9, 8, 6),
        Triplet::new(8, 10, 6),
        Triplet::new(10, 7, 6),
        Triplet::new(2, 11, 7),
        Triplet::new(4, 9, 11),
        Triplet::new(1, 8, 9),
        Triplet::new(5, 10, 8),
        Triplet::new(3, 7, 10),
    ];

    for _ in 0..order {
        let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
        let mut midpoint = |a: usize, b: usize, verts: &mut Vec<Vec3>| -> usize {
            let key = (a.min(b), a.max(b));
            *midpoints.entry(key).or_insert_with(|| {
                let m = (verts[a] + verts[b]).normalize();
                verts.push(m);
                verts.len() - 1
            })
        };

        let mut refined = Vec::with_capacity(4 * trigs.len());
        for t in &trigs {
            let ab = midpoint(t.a, t.b, &mut verts);
            let bc = midpoint(t.b, t.c, &mut verts);
            let ca = midpoint(t.c, t.a, &mut verts);
            refined.push(Triplet::new(t.a, ab, ca));
            refined.push(Triplet::new(ab, t.b, bc));
            refined.push(Triplet::new(ca, bc, t.c));
            refined.push(Triplet::new(ab, bc, ca));
        }
        trigs = refined;
    }

    Mesh { verts, trigs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{triangle_normals, volume};

    #[test]
    fn test_counts() {
        let m0 = icosphere(0);
        assert_eq!(m0.num_verts(), 12);
        assert_eq!(m0.num_trigs(), 20);
        let m2 = icosphere(2);
        assert_eq!(m2.num_trigs(), 320);
        // closed surface: V - E + F = 2 with E = 3F/2
        assert_eq!(m2.num_verts(), 2 + m2.num_trigs() / 2);
    }

    #[test]
    fn test_unit_radius_and_orientation() {
        let m = icosphere(2);
        for v in &m.verts {
            approx::assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-12);
        }
        // outward orientation: every face normal points away from the center
        for (t, n) in m.trigs.iter().zip(triangle_normals(&m)) {
            let centroid = (m.verts[t.a] + m.verts[t.b] + m.verts[t.c]) / 3.0;
            assert!(centroid.dot(&n) > 0.0);
        }
        assert!(volume(&m) > 0.0);
    }
}
