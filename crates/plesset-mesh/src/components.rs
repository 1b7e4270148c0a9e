//! Connected-component splitting and joined/per-component data layout.
//!
//! A cloud simulation keeps one joined mesh; the Bernoulli terms need
//! per-bubble volumes, so the mesh is partitioned by breadth-first
//! expansion over the vertex adjacency and each component carries the
//! permutation back to the joined vertex ordering.

use std::collections::VecDeque;

use crate::adjacency::{neighbours, triangle_indices};
use crate::Mesh;

/// One connected part of a mesh plus its vertex permutation.
#[derive(Debug, Clone)]
pub struct Component {
    /// The reindexed component mesh.
    pub mesh: Mesh,
    /// For each component-local vertex, its index in the joined mesh.
    pub joined_index: Vec<usize>,
}

/// Partition `mesh` into connected components.
///
/// Vertex and triangle orientation are preserved; indices are compacted
/// per component. Every vertex of a valid mesh belongs to exactly one
/// component.
pub fn split_components(mesh: &Mesh) -> Vec<Component> {
    let adj = neighbours(mesh);
    let incidence = triangle_indices(mesh);

    let n = mesh.num_verts();
    let mut assigned = vec![false; n];
    let mut result = Vec::new();

    for start in 0..n {
        if assigned[start] {
            continue;
        }

        let mut joined_index = Vec::new();
        let mut local_of = vec![usize::MAX; n];
        let mut queue = VecDeque::from([start]);
        assigned[start] = true;
        while let Some(v) = queue.pop_front() {
            local_of[v] = joined_index.len();
            joined_index.push(v);
            for &w in &adj[v] {
                if !assigned[w] {
                    assigned[w] = true;
                    queue.push_back(w);
                }
            }
        }

        let mut trig_ids: Vec<usize> = joined_index
            .iter()
            .flat_map(|&v| incidence[v].iter().copied())
            .collect();
        trig_ids.sort_unstable();
        trig_ids.dedup();

        let mesh_part = Mesh {
            verts: joined_index.iter().map(|&v| mesh.verts[v]).collect(),
            trigs: trig_ids
                .iter()
                .map(|&j| {
                    let mut t = mesh.trigs[j];
                    t.map_indices(|i| local_of[i]);
                    t
                })
                .collect(),
        };

        result.push(Component {
            mesh: mesh_part,
            joined_index,
        });
    }

    result
}

/// Concatenate meshes into one joined mesh (no translation).
pub fn join_meshes(list: &[Mesh]) -> Mesh {
    let mut joined = Mesh::new();
    for m in list {
        joined.add(m, plesset_math::Vec3::zeros());
    }
    joined
}

/// Scatter one value per component onto the joined vertex layout.
pub fn expand_to_vertex_data(components: &[Component], per_component: &[f64], n_verts: usize) -> Vec<f64> {
    assert_eq!(components.len(), per_component.len());
    let mut out = vec![0.0; n_verts];
    for (comp, &value) in components.iter().zip(per_component) {
        for &j in &comp.joined_index {
            out[j] = value;
        }
    }
    out
}

/// Gather joined per-vertex data into the component's local ordering.
pub fn gather_vertex_data(component: &Component, joined: &[f64]) -> Vec<f64> {
    component.joined_index.iter().map(|&j| joined[j]).collect()
}
