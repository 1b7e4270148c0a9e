//! Local remeshing editors: split, collapse, flip, relax.
//!
//! All editors preserve orientation and manifoldness. Thresholds are
//! driven by per-vertex target edge lengths carried in a
//! [`SecondaryMap`]; an edge `(i, j)` compares its squared length against
//! `(scale · ½(L_i + L_j))²`. New vertices inherit the average target of
//! the edge endpoints.

use slotmap::SecondaryMap;

use plesset_math::Vec3;

use crate::{EdgeKey, EdgeRec, FaceKey, FaceRec, HalfEdge, HalfKey, HalfedgeMesh, VertKey, VertexRec};

/// Per-vertex target edge lengths for the threshold tests.
pub type Targets = SecondaryMap<VertKey, f64>;

/// Cost criterion for [`flip_edges`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipCost {
    /// Flip when the new diagonal is strictly shorter.
    Length,
    /// Flip when the squared deviation from valence 6 strictly drops.
    Valence,
}

/// Dot-product floor between pre- and post-edit face normals; guards
/// collapse and flip against flipping elements over.
const NORMAL_GUARD: f64 = 0.8;

fn threshold2(targets: &Targets, scale: f64, v0: VertKey, v1: VertKey) -> f64 {
    let t = scale * 0.5 * (targets[v0] + targets[v1]);
    t * t
}

fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(&(c - b)).normalize()
}

/// Split every edge of the initial snapshot whose squared length exceeds
/// its threshold, longest first. Edges created by a split are not
/// revisited within the pass; boundary edges are never split.
///
/// Returns the number of splits performed.
pub fn split_long_edges(mesh: &mut HalfedgeMesh, targets: &mut Targets, scale: f64) -> usize {
    let mut snapshot: Vec<(EdgeKey, f64)> = mesh
        .edges
        .keys()
        .map(|e| (e, mesh.edge_len2(e)))
        .collect();
    snapshot.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut performed = 0;
    for (e, len2) in snapshot {
        let h01 = mesh.edges[e].half;
        let h10 = mesh.halves[h01].twin;
        if mesh.halves[h01].face.is_none() || mesh.halves[h10].face.is_none() {
            continue;
        }
        let v0 = mesh.halves[h01].origin;
        let v1 = mesh.halves[h10].origin;
        if len2 <= threshold2(targets, scale, v0, v1) {
            continue;
        }
        split_edge(mesh, targets, e);
        performed += 1;
    }

    log::debug!("split pass: {performed} edges split");
    performed
}

/// Insert a midpoint vertex on edge `e` and replace the two incident
/// triangles by four. Returns the new vertex.
pub fn split_edge(mesh: &mut HalfedgeMesh, targets: &mut Targets, e: EdgeKey) -> VertKey {
    let h01 = mesh.edges[e].half;
    let h10 = mesh.halves[h01].twin;

    let v0 = mesh.halves[h01].origin;
    let v1 = mesh.halves[h10].origin;

    // f1 = (v0, v1, a), f2 = (v1, v0, b)
    let f1 = mesh.halves[h01].face.expect("split of boundary edge");
    let f2 = mesh.halves[h10].face.expect("split of boundary edge");

    let h1a = mesh.halves[h01].next;
    let ha0 = mesh.halves[h1a].next;
    let h0b = mesh.halves[h10].next;
    let hb1 = mesh.halves[h0b].next;

    let va = mesh.halves[ha0].origin;
    let vb = mesh.halves[hb1].origin;

    let mid = 0.5 * (mesh.verts[v0].pos + mesh.verts[v1].pos);
    let m = mesh.verts.insert(VertexRec {
        pos: mid,
        out: HalfKey::default(),
    });
    targets.insert(m, 0.5 * (targets[v0] + targets[v1]));

    let m1 = mesh.faces.insert(FaceRec {
        half: HalfKey::default(),
    });
    let m2 = mesh.faces.insert(FaceRec {
        half: HalfKey::default(),
    });

    let e_s = mesh.edges.insert(EdgeRec {
        half: HalfKey::default(),
    });
    let e_a = mesh.edges.insert(EdgeRec {
        half: HalfKey::default(),
    });
    let e_b = mesh.edges.insert(EdgeRec {
        half: HalfKey::default(),
    });

    let mut new_half = |origin: VertKey, next: HalfKey, face: FaceKey, edge: EdgeKey| {
        mesh.halves.insert(HalfEdge {
            twin: HalfKey::default(),
            next,
            origin,
            edge,
            face: Some(face),
        })
    };

    // six new half-edges; next pointers into the surviving ring are
    // final, the pointers among the new ones are patched just below
    let s0 = new_half(m, h1a, m1, e_s); // m -> v1
    let s1 = new_half(v1, HalfKey::default(), m2, e_s); // v1 -> m
    let a0 = new_half(m, ha0, f1, e_a); // m -> a
    let a1 = new_half(va, HalfKey::default(), m1, e_a); // a -> m
    let b0 = new_half(m, hb1, m2, e_b); // m -> b
    let b1 = new_half(vb, h10, f2, e_b); // b -> m

    mesh.halves[s1].next = b0;
    mesh.halves[a1].next = s0;

    mesh.halves[s0].twin = s1;
    mesh.halves[s1].twin = s0;
    mesh.halves[a0].twin = a1;
    mesh.halves[a1].twin = a0;
    mesh.halves[b0].twin = b1;
    mesh.halves[b1].twin = b0;

    mesh.edges[e_s].half = s0;
    mesh.edges[e_a].half = a0;
    mesh.edges[e_b].half = b0;

    // rewire the survivors: f1 keeps (v0, m, a), f2 becomes (m, v0, b),
    // m1 = (m, v1, a), m2 = (v1, m, b)
    mesh.halves[h01].next = a0;
    mesh.halves[h10].origin = m;

    mesh.halves[h1a].next = a1;
    mesh.halves[h1a].face = Some(m1);

    mesh.halves[h0b].next = b1;

    mesh.halves[hb1].next = s1;
    mesh.halves[hb1].face = Some(m2);

    mesh.faces[f1].half = h01;
    mesh.faces[f2].half = h10;
    mesh.faces[m1].half = s0;
    mesh.faces[m2].half = s1;

    mesh.verts[m].out = s0;
    mesh.verts[v1].out = h1a;
    mesh.verts[v0].out = h01;

    m
}

/// Collapse edges shorter than their threshold to their midpoint,
/// shortest first, restarting the scan after every success (local edge
/// lengths change). Returns the number of collapses performed.
///
/// An edge is collapsed only if its neighbourhood stays manifold
/// (exactly two 2-edge paths between the endpoints), no incident ring
/// half-edge lies on the boundary, and no surrounding triangle normal
/// turns by more than the guard.
pub fn collapse_short_edges(mesh: &mut HalfedgeMesh, targets: &mut Targets, scale: f64) -> usize {
    let mut performed = 0;

    'outer: loop {
        let mut candidates: Vec<(EdgeKey, f64)> = mesh
            .edges
            .keys()
            .map(|e| (e, mesh.edge_len2(e)))
            .collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

        for (e, len2) in candidates {
            let h01 = mesh.edges[e].half;
            let h10 = mesh.halves[h01].twin;
            let v0 = mesh.halves[h01].origin;
            let v1 = mesh.halves[h10].origin;

            // thresholds are per-edge (targets vary), so the sorted scan
            // cannot stop early
            if len2 >= threshold2(targets, scale, v0, v1) {
                continue;
            }
            if try_collapse_edge(mesh, targets, e) {
                performed += 1;
                continue 'outer;
            }
        }
        break;
    }

    log::debug!("collapse pass: {performed} edges collapsed");
    performed
}

/// Attempt to collapse edge `e` to its midpoint; returns whether the
/// collapse was performed.
pub fn try_collapse_edge(mesh: &mut HalfedgeMesh, targets: &mut Targets, e: EdgeKey) -> bool {
    let h01 = mesh.edges[e].half;
    let h10 = mesh.halves[h01].twin;
    let v0 = mesh.halves[h01].origin;
    let v1 = mesh.halves[h10].origin;

    if mesh.halves[h01].face.is_none() || mesh.halves[h10].face.is_none() {
        return false;
    }
    if mesh.is_boundary_vertex(v0) || mesh.is_boundary_vertex(v1) {
        return false;
    }

    // manifold guard: exactly two 2-edge paths v0 -> x -> v1
    let mut paths = 0;
    for &h in &mesh.ring(v0) {
        let x = mesh.dest(h);
        for &g in &mesh.ring(x) {
            if mesh.dest(g) == v1 {
                paths += 1;
            }
        }
    }
    if paths != 2 {
        return false;
    }

    let f1 = mesh.halves[h01].face;
    let f2 = mesh.halves[h10].face;
    let new_pos = 0.5 * (mesh.verts[v0].pos + mesh.verts[v1].pos);

    // orientation guard over every surviving triangle around v0 and v1
    for v in [v0, v1] {
        for &h in &mesh.ring(v) {
            let f = mesh.halves[h].face;
            if f == f1 || f == f2 {
                continue;
            }
            let p = mesh.verts[mesh.halves[h].origin].pos;
            let q = mesh.verts[mesh.dest(h)].pos;
            let r = {
                let h2 = mesh.halves[mesh.halves[h].next].next;
                mesh.verts[mesh.halves[h2].origin].pos
            };
            let before = face_normal(p, q, r);
            let after = face_normal(new_pos, q, r);
            if after.dot(&before) < NORMAL_GUARD {
                return false;
            }
        }
    }

    // surviving outer half-edges of the two doomed triangles
    let h1a = mesh.halves[h01].next;
    let ha0 = mesh.halves[h1a].next;
    let h0b = mesh.halves[h10].next;
    let hb1 = mesh.halves[h0b].next;

    let va = mesh.halves[ha0].origin;
    let vb = mesh.halves[hb1].origin;

    let t1a = mesh.halves[h1a].twin;
    let ta0 = mesh.halves[ha0].twin;
    let t0b = mesh.halves[h0b].twin;
    let tb1 = mesh.halves[hb1].twin;

    // reroute every half-edge leaving v1 to leave v0 instead
    for h in mesh.ring(v1) {
        mesh.halves[h].origin = v0;
    }

    // merge the edge pairs across the removed triangles: (v1,a) into
    // (v0,a) and (b,v1) into (v0,b)
    let e_keep_a = mesh.halves[ha0].edge;
    let e_drop_a = mesh.halves[h1a].edge;
    let e_keep_b = mesh.halves[h0b].edge;
    let e_drop_b = mesh.halves[hb1].edge;

    mesh.halves[ta0].twin = t1a;
    mesh.halves[t1a].twin = ta0;
    mesh.halves[t1a].edge = e_keep_a;
    mesh.edges[e_keep_a].half = ta0;

    mesh.halves[t0b].twin = tb1;
    mesh.halves[tb1].twin = t0b;
    mesh.halves[tb1].edge = e_keep_b;
    mesh.edges[e_keep_b].half = t0b;

    // keep valid anchors on the survivors
    mesh.verts[v0] = VertexRec {
        pos: new_pos,
        out: ta0,
    };
    mesh.verts[va].out = t1a;
    mesh.verts[vb].out = t0b;

    // update the merged target before dropping v1
    let merged = 0.5 * (targets[v0] + targets[v1]);
    targets.insert(v0, merged);
    targets.remove(v1);

    mesh.edges.remove(e_drop_a);
    mesh.edges.remove(e_drop_b);
    mesh.edges.remove(e);
    if let Some(f) = f1 {
        mesh.faces.remove(f);
    }
    if let Some(f) = f2 {
        mesh.faces.remove(f);
    }
    for h in [h01, h1a, ha0, h10, h0b, hb1] {
        mesh.halves.remove(h);
    }
    mesh.verts.remove(v1);

    true
}

/// Flip interior edges according to `cost`; both endpoint valences must
/// exceed 3 and the two new triangle normals must agree within the
/// guard. Returns the number of flips performed.
pub fn flip_edges(mesh: &mut HalfedgeMesh, cost: FlipCost) -> usize {
    let valence_cost = |v: i64| {
        let d = v - 6;
        d * d
    };

    let mut valences: SecondaryMap<VertKey, i64> = SecondaryMap::new();
    for v in mesh.verts.keys() {
        valences.insert(v, mesh.valence(v) as i64);
    }

    let snapshot: Vec<EdgeKey> = mesh.edges.keys().collect();
    let mut flipped = 0;

    for e in snapshot {
        let h_a = mesh.edges[e].half;
        let h_b = mesh.halves[h_a].twin;
        if mesh.halves[h_a].face.is_none() || mesh.halves[h_b].face.is_none() {
            continue;
        }

        let v0 = mesh.halves[h_a].origin;
        let v1 = mesh.halves[h_b].origin;
        if valences[v0] <= 3 || valences[v1] <= 3 {
            continue;
        }

        let ha1 = mesh.halves[h_a].next; // v1 -> vA
        let ha2 = mesh.halves[ha1].next; // vA -> v0
        let hb1 = mesh.halves[h_b].next; // v0 -> vB
        let hb2 = mesh.halves[hb1].next; // vB -> v1
        let va = mesh.halves[ha2].origin;
        let vb = mesh.halves[hb2].origin;

        let p0 = mesh.verts[v0].pos;
        let p1 = mesh.verts[v1].pos;
        let pa = mesh.verts[va].pos;
        let pb = mesh.verts[vb].pos;

        let flip = match cost {
            FlipCost::Length => (pa - pb).norm_squared() < (p1 - p0).norm_squared(),
            FlipCost::Valence => {
                let cost_now = valence_cost(valences[v0])
                    + valence_cost(valences[v1])
                    + valence_cost(valences[va])
                    + valence_cost(valences[vb]);
                let cost_flip = valence_cost(valences[v0] - 1)
                    + valence_cost(valences[v1] - 1)
                    + valence_cost(valences[va] + 1)
                    + valence_cost(valences[vb] + 1);
                cost_flip < cost_now
            }
        };

        // the two post-flip triangles (v0, vB, vA) and (vB, v1, vA)
        let na = face_normal(p0, pb, pa);
        let nb = face_normal(pb, p1, pa);
        if !(flip && na.dot(&nb) > NORMAL_GUARD) {
            continue;
        }

        let f_a = mesh.halves[h_a].face;
        let f_b = mesh.halves[h_b].face;

        valences[v0] -= 1;
        valences[v1] -= 1;
        valences[va] += 1;
        valences[vb] += 1;

        mesh.verts[v0].out = hb1;
        mesh.verts[v1].out = ha1;
        mesh.faces[f_a.unwrap()].half = h_a;
        mesh.faces[f_b.unwrap()].half = h_b;

        mesh.halves[ha2].next = hb1;
        mesh.halves[hb2].next = ha1;

        mesh.halves[ha1].next = h_b;
        mesh.halves[ha1].face = f_b;
        mesh.halves[hb1].next = h_a;
        mesh.halves[hb1].face = f_a;

        mesh.halves[h_a].origin = vb;
        mesh.halves[h_b].origin = va;
        mesh.halves[h_a].next = ha2;
        mesh.halves[h_b].next = hb2;

        flipped += 1;
    }

    log::debug!("flip pass ({cost:?}): {flipped} edges flipped");
    flipped
}

/// Move every interior vertex to the arithmetic mean of its ring
/// neighbours (umbrella smoothing). Boundary vertices stay put.
pub fn relax_vertices(mesh: &mut HalfedgeMesh) {
    let mut moves: Vec<(VertKey, Vec3)> = Vec::with_capacity(mesh.verts.len());
    for v in mesh.verts.keys() {
        if mesh.is_boundary_vertex(v) {
            continue;
        }
        let ring = mesh.ring(v);
        let mean = ring
            .iter()
            .fold(Vec3::zeros(), |acc, &h| acc + mesh.verts[mesh.dest(h)].pos)
            / ring.len() as f64;
        moves.push((v, mean));
    }
    for (v, pos) in moves {
        mesh.verts[v].pos = pos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plesset_mesh::geometry::volume;
    use plesset_mesh::icosphere::icosphere;

    fn uniform_targets(mesh: &HalfedgeMesh, value: f64) -> Targets {
        let mut t = Targets::new();
        for v in mesh.verts.keys() {
            t.insert(v, value);
        }
        t
    }

    #[test]
    fn test_split_with_infinite_target_is_identity() {
        let m = icosphere(1);
        let mut hm = HalfedgeMesh::from_mesh(&m).unwrap();
        let mut targets = uniform_targets(&hm, f64::INFINITY);
        assert_eq!(split_long_edges(&mut hm, &mut targets, 1.0), 0);
        hm.check().unwrap();
        assert_eq!(hm.to_mesh(), m);
    }

    #[test]
    fn test_collapse_with_zero_target_is_identity() {
        let m = icosphere(1);
        let mut hm = HalfedgeMesh::from_mesh(&m).unwrap();
        let mut targets = uniform_targets(&hm, 0.0);
        assert_eq!(collapse_short_edges(&mut hm, &mut targets, 1.0), 0);
        hm.check().unwrap();
        assert_eq!(hm.to_mesh(), m);
    }

    #[test]
    fn test_split_every_edge() {
        let m = icosphere(1);
        let mut hm = HalfedgeMesh::from_mesh(&m).unwrap();
        let edges_before = hm.edges.len();
        let faces_before = hm.faces.len();
        let mut targets = uniform_targets(&hm, 1e-6);

        let splits = split_long_edges(&mut hm, &mut targets, 1.0);
        assert_eq!(splits, edges_before);
        hm.check().unwrap();
        // each split adds one vertex, two faces, three edges
        assert_eq!(hm.faces.len(), faces_before + 2 * splits);
        assert_eq!(hm.edges.len(), edges_before + 3 * splits);
        assert_eq!(hm.verts.len(), m.num_verts() + splits);
        // new vertices carry the averaged target
        assert_eq!(targets.len(), hm.verts.len());
    }

    #[test]
    fn test_collapse_reduces_triangles() {
        let m = icosphere(2);
        let mut hm = HalfedgeMesh::from_mesh(&m).unwrap();
        let faces_before = hm.faces.len();
        // targets larger than every edge: aggressive coarsening
        let mut targets = uniform_targets(&hm, 0.6);
        let collapses = collapse_short_edges(&mut hm, &mut targets, 1.0);
        assert!(collapses > 0);
        hm.check().unwrap();
        assert_eq!(hm.faces.len(), faces_before - 2 * collapses);
        let out = hm.to_mesh();
        assert!(out.all_verts_used());
        // still roughly a sphere
        approx::assert_relative_eq!(
            volume(&out),
            4.0 / 3.0 * std::f64::consts::PI,
            epsilon = 0.6
        );
    }

    #[test]
    fn test_flip_keeps_invariants() {
        let m = icosphere(2);
        let mut hm = HalfedgeMesh::from_mesh(&m).unwrap();
        // perturb a few vertices so some diagonal actually shortens
        let keys: Vec<_> = hm.verts.keys().collect();
        for (i, &v) in keys.iter().enumerate() {
            if i % 5 == 0 {
                let p = hm.verts[v].pos;
                hm.verts[v].pos = p * 1.04;
            }
        }
        flip_edges(&mut hm, FlipCost::Length);
        hm.check().unwrap();
        flip_edges(&mut hm, FlipCost::Valence);
        hm.check().unwrap();
    }

    #[test]
    fn test_relax_keeps_sphere_round() {
        let m = icosphere(2);
        let mut hm = HalfedgeMesh::from_mesh(&m).unwrap();
        relax_vertices(&mut hm);
        hm.check().unwrap();
        for v in hm.verts.values() {
            // umbrella smoothing pulls slightly inward, stays spherical
            assert!(v.pos.norm() > 0.9 && v.pos.norm() <= 1.0);
        }
    }

    #[test]
    fn test_split_then_collapse_round_trip_counts() {
        let m = icosphere(1);
        let mut hm = HalfedgeMesh::from_mesh(&m).unwrap();
        let mut targets = uniform_targets(&hm, 1e-6);
        split_long_edges(&mut hm, &mut targets, 1.0);
        hm.check().unwrap();

        // now collapse everything short back out
        for v in hm.verts.keys().collect::<Vec<_>>() {
            targets.insert(v, 0.5);
        }
        collapse_short_edges(&mut hm, &mut targets, 1.0);
        hm.check().unwrap();
        assert!(hm.faces.len() <= 4 * m.num_trigs());
    }
}
