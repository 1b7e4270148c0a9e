#![warn(missing_docs)]

//! Arena-based half-edge topology for the plesset kernel.
//!
//! The remesher needs local edits (split, collapse, flip, relax) that
//! preserve orientation and manifoldness. Every entity (half-edge,
//! vertex, undirected edge, face) lives in a slotmap arena and is
//! addressed by a stable handle; deleting an entity never invalidates
//! the handles of the survivors.
//!
//! A [`HalfedgeMesh`] is built from a [`Mesh`] once per remesh pass,
//! edited in place, and extracted back at the end. Boundary edges (one
//! incident triangle, as in the pinned-wall configuration) get face-less
//! half-edges chained into closed boundary loops, so the vertex-ring
//! orbit `h → next(twin(h))` closes around boundary vertices too.

pub mod editors;

use std::collections::HashMap;

use slotmap::{new_key_type, SecondaryMap, SlotMap};
use thiserror::Error;

use plesset_math::{Triplet, Vec3};
use plesset_mesh::Mesh;

new_key_type! {
    /// Handle for a half-edge.
    pub struct HalfKey;
    /// Handle for a vertex.
    pub struct VertKey;
    /// Handle for an undirected edge.
    pub struct EdgeKey;
    /// Handle for a triangle face.
    pub struct FaceKey;
}

/// One directed half of an edge.
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge {
    /// Opposite half-edge on the same undirected edge.
    pub twin: HalfKey,
    /// Next half-edge around the same face (or boundary loop).
    pub next: HalfKey,
    /// Vertex this half-edge leaves from.
    pub origin: VertKey,
    /// The undirected edge both twins share.
    pub edge: EdgeKey,
    /// Bounded face; `None` on boundary loops.
    pub face: Option<FaceKey>,
}

/// Vertex record: position plus one outgoing half-edge.
#[derive(Debug, Clone, Copy)]
pub struct VertexRec {
    /// Position in space.
    pub pos: Vec3,
    /// An arbitrary outgoing half-edge, kept valid across edits.
    pub out: HalfKey,
}

/// Undirected edge record.
#[derive(Debug, Clone, Copy)]
pub struct EdgeRec {
    /// One of the two twin half-edges, kept valid across edits.
    pub half: HalfKey,
}

/// Triangle face record.
#[derive(Debug, Clone, Copy)]
pub struct FaceRec {
    /// One half-edge of the bounding cycle, kept valid across edits.
    pub half: HalfKey,
}

/// Violations reported by [`HalfedgeMesh::check`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TopologyError {
    /// `next∘next∘next` does not return to the start on some face.
    #[error("next^3 is not the identity on a face cycle")]
    NextCycleBroken,
    /// `twin∘twin` is not the identity.
    #[error("twin^2 is not the identity")]
    TwinBroken,
    /// A half-edge and its twin disagree about their edge, or the edge
    /// record points elsewhere.
    #[error("edge back-pointer inconsistent")]
    EdgeBackpointer,
    /// A face cycle member references a different face.
    #[error("face cycle references a foreign face")]
    FaceBackpointer,
    /// The ring orbit around a vertex is broken or has the wrong length.
    #[error("vertex ring inconsistent")]
    VertexRing,
    /// The input mesh is not an oriented 2-manifold.
    #[error("non-manifold input: {0}")]
    NonManifold(String),
}

/// Arena-based half-edge view over a triangle mesh.
#[derive(Debug, Clone, Default)]
pub struct HalfedgeMesh {
    /// Half-edge arena.
    pub halves: SlotMap<HalfKey, HalfEdge>,
    /// Vertex arena.
    pub verts: SlotMap<VertKey, VertexRec>,
    /// Undirected-edge arena.
    pub edges: SlotMap<EdgeKey, EdgeRec>,
    /// Face arena.
    pub faces: SlotMap<FaceKey, FaceRec>,
}

impl HalfedgeMesh {
    /// Build the half-edge view of `mesh`.
    ///
    /// Fails if a directed edge occurs twice (inconsistent orientation)
    /// or an undirected edge carries more than two triangles. Unpaired
    /// edges become boundary half-edges chained into closed loops.
    pub fn from_mesh(mesh: &Mesh) -> Result<Self, TopologyError> {
        let mut hm = HalfedgeMesh::default();

        let vert_keys: Vec<VertKey> = mesh
            .verts
            .iter()
            .map(|&pos| {
                hm.verts.insert(VertexRec {
                    pos,
                    out: HalfKey::default(),
                })
            })
            .collect();

        // directed edge -> half-edge, for twin pairing
        let mut directed: HashMap<(usize, usize), HalfKey> = HashMap::new();

        for t in &mesh.trigs {
            let face = hm.faces.insert(FaceRec {
                half: HalfKey::default(),
            });
            let corners = [t.a, t.b, t.c];
            let keys: Vec<HalfKey> = (0..3)
                .map(|k| {
                    hm.halves.insert(HalfEdge {
                        twin: HalfKey::default(),
                        next: HalfKey::default(),
                        origin: vert_keys[corners[k]],
                        edge: EdgeKey::default(),
                        face: Some(face),
                    })
                })
                .collect();
            hm.faces[face].half = keys[0];
            for k in 0..3 {
                hm.halves[keys[k]].next = keys[(k + 1) % 3];
                hm.verts[vert_keys[corners[k]]].out = keys[k];
                if directed.insert((corners[k], corners[(k + 1) % 3]), keys[k]).is_some() {
                    return Err(TopologyError::NonManifold(format!(
                        "directed edge ({}, {}) occurs twice",
                        corners[k],
                        corners[(k + 1) % 3]
                    )));
                }
            }
        }

        // pair twins and create undirected edges
        let mut paired: SecondaryMap<HalfKey, bool> = SecondaryMap::new();
        for (&(v0, v1), &h) in &directed {
            if paired.contains_key(h) {
                continue;
            }
            match directed.get(&(v1, v0)) {
                Some(&g) => {
                    let edge = hm.edges.insert(EdgeRec { half: h });
                    hm.halves[h].twin = g;
                    hm.halves[g].twin = h;
                    hm.halves[h].edge = edge;
                    hm.halves[g].edge = edge;
                    paired.insert(h, true);
                    paired.insert(g, true);
                }
                None => {
                    // boundary: create the face-less opposite half
                    let edge = hm.edges.insert(EdgeRec { half: h });
                    let origin = hm.halves[hm.halves[h].next].origin;
                    let b = hm.halves.insert(HalfEdge {
                        twin: h,
                        next: HalfKey::default(),
                        origin,
                        edge,
                        face: None,
                    });
                    hm.halves[h].twin = b;
                    hm.halves[h].edge = edge;
                    paired.insert(h, true);
                }
            }
        }

        // chain boundary half-edges into loops: the successor of a
        // boundary half is the unique boundary half leaving its head
        let mut boundary_out: SecondaryMap<VertKey, HalfKey> = SecondaryMap::new();
        let boundary: Vec<HalfKey> = hm
            .halves
            .iter()
            .filter(|(_, h)| h.face.is_none())
            .map(|(k, _)| k)
            .collect();
        for &b in &boundary {
            let origin = hm.halves[b].origin;
            if boundary_out.insert(origin, b).is_some() {
                return Err(TopologyError::NonManifold(
                    "vertex with more than one boundary fan".into(),
                ));
            }
        }
        for &b in &boundary {
            let head = hm.halves[hm.halves[b].twin].origin;
            let succ = boundary_out
                .get(head)
                .copied()
                .ok_or_else(|| TopologyError::NonManifold("open boundary chain".into()))?;
            hm.halves[b].next = succ;
        }

        hm.check()?;
        Ok(hm)
    }

    /// Extract a plain mesh: vertices in arena iteration order, one
    /// triplet per face.
    pub fn to_mesh(&self) -> Mesh {
        let mut index: SecondaryMap<VertKey, usize> = SecondaryMap::new();
        let mut verts = Vec::with_capacity(self.verts.len());
        for (k, v) in &self.verts {
            index.insert(k, verts.len());
            verts.push(v.pos);
        }

        let trigs = self
            .faces
            .values()
            .map(|f| {
                let h0 = f.half;
                let h1 = self.halves[h0].next;
                let h2 = self.halves[h1].next;
                Triplet::new(
                    index[self.halves[h0].origin],
                    index[self.halves[h1].origin],
                    index[self.halves[h2].origin],
                )
            })
            .collect();

        Mesh { verts, trigs }
    }

    /// Head vertex of a half-edge.
    #[inline]
    pub fn dest(&self, h: HalfKey) -> VertKey {
        self.halves[self.halves[h].twin].origin
    }

    /// Next outgoing half-edge in the ring around `origin(h)`.
    #[inline]
    pub fn ring_next(&self, h: HalfKey) -> HalfKey {
        self.halves[self.halves[h].twin].next
    }

    /// Squared length of an undirected edge.
    #[inline]
    pub fn edge_len2(&self, e: EdgeKey) -> f64 {
        let h = self.edges[e].half;
        (self.verts[self.dest(h)].pos - self.verts[self.halves[h].origin].pos).norm_squared()
    }

    /// All outgoing half-edges of a vertex (ring orbit).
    pub fn ring(&self, v: VertKey) -> Vec<HalfKey> {
        let start = self.verts[v].out;
        let mut out = vec![start];
        let mut h = self.ring_next(start);
        while h != start {
            out.push(h);
            h = self.ring_next(h);
        }
        out
    }

    /// Whether a vertex touches the boundary.
    pub fn is_boundary_vertex(&self, v: VertKey) -> bool {
        self.ring(v)
            .iter()
            .any(|&h| self.halves[h].face.is_none() || self.halves[self.halves[h].twin].face.is_none())
    }

    /// Number of incident faces of a vertex.
    pub fn valence(&self, v: VertKey) -> usize {
        self.ring(v)
            .iter()
            .filter(|&&h| self.halves[h].face.is_some())
            .count()
    }

    /// Verify every structural invariant; the editors call this eagerly
    /// between passes and a failure aborts the remesh.
    pub fn check(&self) -> Result<(), TopologyError> {
        for (fk, f) in &self.faces {
            let h0 = f.half;
            let h1 = self.halves[h0].next;
            let h2 = self.halves[h1].next;
            if self.halves[h2].next != h0 {
                return Err(TopologyError::NextCycleBroken);
            }
            for h in [h0, h1, h2] {
                if self.halves[h].face != Some(fk) {
                    return Err(TopologyError::FaceBackpointer);
                }
            }
        }

        for (hk, h) in &self.halves {
            let twin = h.twin;
            if self.halves[twin].twin != hk {
                return Err(TopologyError::TwinBroken);
            }
            if self.halves[twin].edge != h.edge {
                return Err(TopologyError::EdgeBackpointer);
            }
        }

        for (ek, e) in &self.edges {
            if self.halves[e.half].edge != ek {
                return Err(TopologyError::EdgeBackpointer);
            }
        }

        // face-incidence count per vertex, for the valence comparison
        let mut incidence: SecondaryMap<VertKey, usize> = SecondaryMap::new();
        let mut has_boundary: SecondaryMap<VertKey, bool> = SecondaryMap::new();
        for h in self.halves.values() {
            if h.face.is_some() {
                *incidence.entry(h.origin).unwrap().or_insert(0) += 1;
            } else {
                has_boundary.insert(h.origin, true);
            }
        }

        for (vk, _) in &self.verts {
            let ring = self.ring(vk);
            for &h in &ring {
                if self.halves[h].origin != vk {
                    return Err(TopologyError::VertexRing);
                }
            }
            let expected = incidence.get(vk).copied().unwrap_or(0)
                + usize::from(has_boundary.get(vk).copied().unwrap_or(false));
            if ring.len() != expected {
                return Err(TopologyError::VertexRing);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plesset_mesh::icosphere::icosphere;

    #[test]
    fn test_build_and_check_icosphere() {
        let m = icosphere(2);
        let hm = HalfedgeMesh::from_mesh(&m).unwrap();
        assert_eq!(hm.verts.len(), m.num_verts());
        assert_eq!(hm.faces.len(), m.num_trigs());
        // closed surface: E = 3F/2, no boundary halves
        assert_eq!(hm.edges.len(), 3 * m.num_trigs() / 2);
        assert_eq!(hm.halves.len(), 3 * m.num_trigs());
        assert!(hm.halves.values().all(|h| h.face.is_some()));
    }

    #[test]
    fn test_round_trip_is_topology_identity() {
        let m = icosphere(1);
        let back = HalfedgeMesh::from_mesh(&m).unwrap().to_mesh();
        assert_eq!(back.verts, m.verts);
        // faces come back in order; each triplet is a rotation of the input
        assert_eq!(back.trigs.len(), m.trigs.len());
        for (t_in, t_out) in m.trigs.iter().zip(&back.trigs) {
            let mut rotated = *t_out;
            rotated.cyclic_reorder(t_in.a);
            assert_eq!(rotated, *t_in);
        }
    }

    #[test]
    fn test_open_mesh_gets_boundary_loop() {
        // single triangle: three boundary half-edges forming one loop
        let m = Mesh {
            verts: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            trigs: vec![Triplet::new(0, 1, 2)],
        };
        let hm = HalfedgeMesh::from_mesh(&m).unwrap();
        let boundary: Vec<HalfKey> = hm
            .halves
            .iter()
            .filter(|(_, h)| h.face.is_none())
            .map(|(k, _)| k)
            .collect();
        assert_eq!(boundary.len(), 3);
        // the boundary loop closes
        let start = boundary[0];
        let mut h = hm.halves[start].next;
        let mut steps = 1;
        while h != start {
            assert!(hm.halves[h].face.is_none());
            h = hm.halves[h].next;
            steps += 1;
        }
        assert_eq!(steps, 3);
        for v in hm.verts.keys() {
            assert!(hm.is_boundary_vertex(v));
        }
    }

    #[test]
    fn test_inconsistent_orientation_rejected() {
        let m = Mesh {
            verts: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
            ],
            // second triangle traverses the shared edge in the same
            // direction as the first
            trigs: vec![Triplet::new(0, 1, 2), Triplet::new(1, 2, 3)],
        };
        assert!(matches!(
            HalfedgeMesh::from_mesh(&m),
            Err(TopologyError::NonManifold(_))
        ));
    }

    #[test]
    fn test_valence_matches_incidence() {
        let m = icosphere(1);
        let hm = HalfedgeMesh::from_mesh(&m).unwrap();
        let total: usize = hm.verts.keys().map(|v| hm.valence(v)).sum();
        assert_eq!(total, 3 * m.num_trigs());
    }
}
