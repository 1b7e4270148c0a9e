//! Binary little-endian PLY import/export.
//!
//! The format is the simulator's exchange surface with external tooling,
//! so the byte layout is pinned down exactly: an ASCII header, then the
//! per-vertex payload (three float32 or float64 coordinates, optionally
//! followed by trailing scalar properties of the same width and/or three
//! uchar color channels), then the faces as a `list uchar` of exactly
//! three `uint32`/`int32` indices. Double-precision exports round-trip
//! bit-exactly.

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use plesset_math::{Triplet, Vec3};

use crate::Mesh;

/// Errors surfaced by the PLY reader/writer.
#[derive(Error, Debug)]
pub enum PlyError {
    /// I/O error reading or writing the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The ASCII header is malformed or truncated.
    #[error("malformed header: {0}")]
    Header(String),

    /// A property pattern outside the recognised matrix.
    #[error("unsupported property pattern: {0}")]
    UnsupportedProperty(String),

    /// A face with a vertex count other than three.
    #[error("face with {0} vertices: only triangles are supported")]
    BadFaceArity(u8),

    /// The binary payload ended before all declared elements were read.
    #[error("payload truncated")]
    Truncated,
}

/// Scalar property types recognised in the vertex element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Property {
    Float,
    Double,
    UChar,
    ListUcharUint,
    ListUcharInt,
}

impl Property {
    fn parse(tokens: &[&str]) -> Result<Self, PlyError> {
        match tokens {
            ["float", ..] | ["float32", ..] => Ok(Property::Float),
            ["double", ..] | ["float64", ..] => Ok(Property::Double),
            ["uchar", ..] | ["uint8", ..] | ["char", ..] => Ok(Property::UChar),
            ["list", count, index, ..] => {
                if !matches!(*count, "uchar" | "uint8") {
                    return Err(PlyError::UnsupportedProperty(format!(
                        "list count type '{count}'"
                    )));
                }
                match *index {
                    "uint" | "uint32" => Ok(Property::ListUcharUint),
                    "int" | "int32" => Ok(Property::ListUcharInt),
                    other => Err(PlyError::UnsupportedProperty(format!(
                        "list index type '{other}'"
                    ))),
                }
            }
            other => Err(PlyError::UnsupportedProperty(other.join(" "))),
        }
    }
}

/// Width of the floating-point payload on export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatWidth {
    /// 32-bit floats (compact, lossy for f64 data).
    F32,
    /// 64-bit doubles (bit-exact round trip).
    F64,
}

impl FloatWidth {
    fn keyword(self) -> &'static str {
        match self {
            FloatWidth::F32 => "float",
            FloatWidth::F64 => "double",
        }
    }
}

fn write_header(
    out: &mut impl Write,
    n: usize,
    m: usize,
    width: FloatWidth,
    scalar_names: &[&str],
    colors: bool,
) -> Result<(), PlyError> {
    writeln!(out, "ply")?;
    writeln!(out, "format binary_little_endian 1.0")?;
    writeln!(out, "comment plesset surface export")?;
    writeln!(out, "element vertex {n}")?;
    for axis in ["x", "y", "z"] {
        writeln!(out, "property {} {axis}", width.keyword())?;
    }
    for name in scalar_names {
        writeln!(out, "property {} {name}", width.keyword())?;
    }
    if colors {
        for channel in ["red", "green", "blue"] {
            writeln!(out, "property uchar {channel}")?;
        }
    }
    writeln!(out, "element face {m}")?;
    writeln!(out, "property list uchar uint vertex_indices")?;
    writeln!(out, "end_header")?;
    Ok(())
}

fn write_faces(out: &mut impl Write, trigs: &[Triplet]) -> Result<(), PlyError> {
    for t in trigs {
        out.write_u8(3)?;
        out.write_u32::<LittleEndian>(t.a as u32)?;
        out.write_u32::<LittleEndian>(t.b as u32)?;
        out.write_u32::<LittleEndian>(t.c as u32)?;
    }
    Ok(())
}

fn write_scalar(out: &mut impl Write, value: f64, width: FloatWidth) -> Result<(), PlyError> {
    match width {
        FloatWidth::F32 => out.write_f32::<LittleEndian>(value as f32)?,
        FloatWidth::F64 => out.write_f64::<LittleEndian>(value)?,
    }
    Ok(())
}

/// Export positions and faces only (float32 coordinates).
pub fn export_ply(path: impl AsRef<Path>, mesh: &Mesh) -> Result<(), PlyError> {
    export_ply_scalars(path, mesh, &[], FloatWidth::F32)
}

/// Export positions, faces, and named trailing per-vertex scalars.
///
/// `fields` is a list of `(property name, values)` pairs; every value
/// array must have one entry per vertex. Use [`FloatWidth::F64`] when the
/// re-import must reproduce coordinates bit-for-bit.
pub fn export_ply_scalars(
    path: impl AsRef<Path>,
    mesh: &Mesh,
    fields: &[(&str, &[f64])],
    width: FloatWidth,
) -> Result<(), PlyError> {
    for (name, values) in fields {
        assert_eq!(
            values.len(),
            mesh.num_verts(),
            "field '{name}' length mismatch"
        );
    }

    let names: Vec<&str> = fields.iter().map(|(n, _)| *n).collect();
    let mut out = Vec::new();
    write_header(
        &mut out,
        mesh.num_verts(),
        mesh.num_trigs(),
        width,
        &names,
        false,
    )?;

    for (i, v) in mesh.verts.iter().enumerate() {
        write_scalar(&mut out, v.x, width)?;
        write_scalar(&mut out, v.y, width)?;
        write_scalar(&mut out, v.z, width)?;
        for (_, values) in fields {
            write_scalar(&mut out, values[i], width)?;
        }
    }
    write_faces(&mut out, &mesh.trigs)?;

    fs::write(path, out)?;
    Ok(())
}

/// Export positions with per-vertex RGB colors in `[0, 1]`.
pub fn export_ply_colors(
    path: impl AsRef<Path>,
    mesh: &Mesh,
    colors: &[Vec3],
) -> Result<(), PlyError> {
    assert_eq!(colors.len(), mesh.num_verts());

    let mut out = Vec::new();
    write_header(
        &mut out,
        mesh.num_verts(),
        mesh.num_trigs(),
        FloatWidth::F32,
        &[],
        true,
    )?;

    for (v, c) in mesh.verts.iter().zip(colors) {
        write_scalar(&mut out, v.x, FloatWidth::F32)?;
        write_scalar(&mut out, v.y, FloatWidth::F32)?;
        write_scalar(&mut out, v.z, FloatWidth::F32)?;
        for channel in [c.x, c.y, c.z] {
            out.write_u8((channel * 255.0).clamp(0.0, 255.0) as u8)?;
        }
    }
    write_faces(&mut out, &mesh.trigs)?;

    fs::write(path, out)?;
    Ok(())
}

/// Result of a PLY import: the mesh plus any trailing scalar channels
/// (in header order; color channels are skipped).
#[derive(Debug, Clone)]
pub struct PlyContents {
    /// Imported mesh.
    pub mesh: Mesh,
    /// Trailing per-vertex scalar channels (e.g. φ, ψ or w).
    pub scalars: Vec<Vec<f64>>,
}

struct Header {
    num_verts: usize,
    num_faces: usize,
    vertex_props: Vec<Property>,
    face_props: Vec<Property>,
    payload_offset: usize,
}

fn parse_header(bytes: &[u8]) -> Result<Header, PlyError> {
    #[derive(PartialEq)]
    enum Section {
        Preamble,
        Vertex,
        Face,
    }

    let mut num_verts = 0;
    let mut num_faces = 0;
    let mut vertex_props = Vec::new();
    let mut face_props = Vec::new();
    let mut section = Section::Preamble;

    let mut offset = 0;
    loop {
        let rest = &bytes[offset..];
        let end = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| PlyError::Header("missing end_header".into()))?;
        let line = std::str::from_utf8(&rest[..end])
            .map_err(|_| PlyError::Header("non-ASCII header line".into()))?
            .trim_end_matches('\r');
        offset += end + 1;

        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["end_header"] => break,
            ["ply"] | ["comment", ..] | [] => {}
            ["format", "binary_little_endian", "1.0"] => {}
            ["format", other, ..] => {
                return Err(PlyError::Header(format!("unsupported format '{other}'")))
            }
            ["element", "vertex", count] => {
                num_verts = count
                    .parse()
                    .map_err(|_| PlyError::Header(format!("bad vertex count '{count}'")))?;
                section = Section::Vertex;
            }
            ["element", "face", count] => {
                num_faces = count
                    .parse()
                    .map_err(|_| PlyError::Header(format!("bad face count '{count}'")))?;
                section = Section::Face;
            }
            ["element", other, ..] => {
                return Err(PlyError::Header(format!("unknown element '{other}'")))
            }
            ["property", rest @ ..] => match section {
                Section::Vertex => vertex_props.push(Property::parse(rest)?),
                Section::Face => face_props.push(Property::parse(rest)?),
                Section::Preamble => {
                    return Err(PlyError::Header("property before element".into()))
                }
            },
            _ => return Err(PlyError::Header(format!("unrecognised line '{line}'"))),
        }
    }

    Ok(Header {
        num_verts,
        num_faces,
        vertex_props,
        face_props,
        payload_offset: offset,
    })
}

/// Import a binary little-endian PLY file.
///
/// The first three vertex properties must be the coordinates, either all
/// float32 or all float64. Further float/double properties become scalar
/// channels; uchar properties (colors) are consumed and dropped. Faces
/// must be triangles; any other arity is a fatal [`PlyError::BadFaceArity`].
pub fn import_ply(path: impl AsRef<Path>) -> Result<PlyContents, PlyError> {
    let bytes = fs::read(path)?;
    let header = parse_header(&bytes)?;

    if header.vertex_props.len() < 3
        || header.vertex_props[..3]
            .iter()
            .any(|p| *p != header.vertex_props[0])
        || !matches!(header.vertex_props[0], Property::Float | Property::Double)
    {
        return Err(PlyError::UnsupportedProperty(
            "vertex element must start with three float or double coordinates".into(),
        ));
    }
    let coord = header.vertex_props[0];

    let scalar_channels = header.vertex_props[3..]
        .iter()
        .filter(|p| **p == coord)
        .count();
    if header.vertex_props[3..]
        .iter()
        .any(|p| !matches!(p, Property::Float | Property::Double | Property::UChar))
    {
        return Err(PlyError::UnsupportedProperty(
            "vertex element holds a list property".into(),
        ));
    }

    let mut cursor = Cursor::new(&bytes[header.payload_offset..]);
    let mut mesh = Mesh::new();
    let mut scalars = vec![Vec::with_capacity(header.num_verts); scalar_channels];

    let read_coord = |cursor: &mut Cursor<&[u8]>, p: Property| -> Result<f64, PlyError> {
        Ok(match p {
            Property::Float => cursor.read_f32::<LittleEndian>().map(f64::from),
            Property::Double => cursor.read_f64::<LittleEndian>(),
            _ => unreachable!(),
        }
        .map_err(|_| PlyError::Truncated)?)
    };

    for _ in 0..header.num_verts {
        let x = read_coord(&mut cursor, coord)?;
        let y = read_coord(&mut cursor, coord)?;
        let z = read_coord(&mut cursor, coord)?;
        mesh.verts.push(Vec3::new(x, y, z));

        let mut channel = 0;
        for p in &header.vertex_props[3..] {
            match p {
                Property::Float | Property::Double => {
                    let v = read_coord(&mut cursor, *p)?;
                    if *p == coord {
                        scalars[channel].push(v);
                        channel += 1;
                    }
                }
                Property::UChar => {
                    cursor.read_u8().map_err(|_| PlyError::Truncated)?;
                }
                _ => unreachable!(),
            }
        }
    }

    let index_prop = *header
        .face_props
        .first()
        .ok_or_else(|| PlyError::Header("face element without properties".into()))?;
    if !matches!(index_prop, Property::ListUcharUint | Property::ListUcharInt) {
        return Err(PlyError::UnsupportedProperty(
            "face element must start with a list uchar uint/int property".into(),
        ));
    }

    for _ in 0..header.num_faces {
        let count = cursor.read_u8().map_err(|_| PlyError::Truncated)?;
        if count != 3 {
            return Err(PlyError::BadFaceArity(count));
        }
        let mut idx = [0usize; 3];
        for slot in &mut idx {
            *slot = match index_prop {
                Property::ListUcharUint => {
                    cursor.read_u32::<LittleEndian>().map_err(|_| PlyError::Truncated)? as usize
                }
                Property::ListUcharInt => {
                    cursor.read_i32::<LittleEndian>().map_err(|_| PlyError::Truncated)? as usize
                }
                _ => unreachable!(),
            };
        }
        mesh.trigs.push(Triplet::new(idx[0], idx[1], idx[2]));
    }

    Ok(PlyContents { mesh, scalars })
}
