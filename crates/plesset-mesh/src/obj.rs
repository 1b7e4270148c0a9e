//! Wavefront OBJ export (ASCII, debugging convenience).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::Mesh;

/// Write the mesh as an ASCII OBJ file (1-based indices).
pub fn export_obj(path: impl AsRef<Path>, mesh: &Mesh) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "# plesset surface export")?;
    for v in &mesh.verts {
        writeln!(out, "v {} {} {}", v.x, v.y, v.z)?;
    }
    for t in &mesh.trigs {
        writeln!(out, "f {} {} {}", t.a + 1, t.b + 1, t.c + 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icosphere::icosphere;

    #[test]
    fn test_export_obj_writes_all_elements() {
        let m = icosphere(0);
        let path = std::env::temp_dir().join(format!("plesset-obj-{}", std::process::id()));
        export_obj(&path, &m).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 12);
        assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), 20);
    }
}
