//! Vertex/triangle adjacency generators.
//!
//! All generators return plain index arrays keyed by the current vertex
//! ordering; they are rebuilt after any remesh.

use std::collections::BTreeSet;

use crate::Mesh;

/// For each vertex, the indices of the triangles incident to it.
pub fn triangle_indices(mesh: &Mesh) -> Vec<Vec<usize>> {
    let mut incidence = vec![Vec::new(); mesh.verts.len()];
    for (i, t) in mesh.trigs.iter().enumerate() {
        incidence[t.a].push(i);
        incidence[t.b].push(i);
        incidence[t.c].push(i);
    }
    incidence
}

/// For each vertex, the sorted indices of its direct (1-ring) neighbours.
pub fn neighbours(mesh: &Mesh) -> Vec<Vec<usize>> {
    let mut sets: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); mesh.verts.len()];
    for t in &mesh.trigs {
        sets[t.a].insert(t.b);
        sets[t.a].insert(t.c);
        sets[t.b].insert(t.c);
        sets[t.b].insert(t.a);
        sets[t.c].insert(t.a);
        sets[t.c].insert(t.b);
    }
    sets.into_iter().map(|s| s.into_iter().collect()).collect()
}

/// For each vertex, the union of the neighbours of its neighbours
/// (includes the vertex itself).
pub fn two_ring(mesh: &Mesh) -> Vec<Vec<usize>> {
    two_ring_from(&neighbours(mesh))
}

/// Same as [`two_ring`] but reusing a precomputed 1-ring.
pub fn two_ring_from(neighbours: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut ring = Vec::with_capacity(neighbours.len());
    for near in neighbours {
        let mut second: BTreeSet<usize> = BTreeSet::new();
        for &k in near {
            for &l in &neighbours[k] {
                second.insert(l);
            }
        }
        ring.push(second.into_iter().collect());
    }
    ring
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icosphere::icosphere;

    #[test]
    fn test_incidence_counts_match() {
        let m = icosphere(1);
        let inc = triangle_indices(&m);
        let total: usize = inc.iter().map(|v| v.len()).sum();
        assert_eq!(total, 3 * m.num_trigs());
    }

    #[test]
    fn test_neighbours_symmetric() {
        let m = icosphere(1);
        let nb = neighbours(&m);
        for (i, near) in nb.iter().enumerate() {
            for &j in near {
                assert!(nb[j].contains(&i), "{i} -> {j} not symmetric");
            }
        }
    }

    #[test]
    fn test_two_ring_contains_one_ring() {
        let m = icosphere(1);
        let nb = neighbours(&m);
        let two = two_ring_from(&nb);
        for (near, far) in nb.iter().zip(&two) {
            for j in near {
                assert!(far.contains(j));
            }
        }
    }
}
