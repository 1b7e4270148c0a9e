//! PLY exchange-format round trips at production sizes.

use plesset::mesh::ply::{export_ply_scalars, import_ply, FloatWidth};
use plesset::{Mesh, Triplet, Vec3};

// deterministic pseudo-random stream; the payload content is irrelevant
// to the format, only its bit-exactness matters
struct XorShift(u64);

impl XorShift {
    fn next_f64(&mut self) -> f64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
    }

    fn next_index(&mut self, bound: usize) -> usize {
        self.next_f64();
        (self.0 % bound as u64) as usize
    }
}

#[test]
fn double_round_trip_at_production_size() {
    let mut rng = XorShift(0x9e37_79b9_7f4a_7c15);
    let n = 4217;
    let m = 8430;

    let verts: Vec<Vec3> = (0..n)
        .map(|_| Vec3::new(rng.next_f64(), rng.next_f64(), rng.next_f64()))
        .collect();
    let trigs: Vec<Triplet> = (0..m)
        .map(|_| {
            Triplet::new(
                rng.next_index(n),
                rng.next_index(n),
                rng.next_index(n),
            )
        })
        .collect();
    let mesh = Mesh { verts, trigs };

    let path = std::env::temp_dir().join(format!("plesset-roundtrip-{}.ply", std::process::id()));
    export_ply_scalars(&path, &mesh, &[], FloatWidth::F64).unwrap();
    let back = import_ply(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(back.mesh.num_verts(), mesh.num_verts());
    assert_eq!(back.mesh.trigs, mesh.trigs);
    for (a, b) in back.mesh.verts.iter().zip(&mesh.verts) {
        assert_eq!(a.x.to_bits(), b.x.to_bits());
        assert_eq!(a.y.to_bits(), b.y.to_bits());
        assert_eq!(a.z.to_bits(), b.z.to_bits());
    }
}
