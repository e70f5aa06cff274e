//! OBJ parser: positions, normals, texture coordinates and `usemtl` groups.

use std::{
    collections::HashMap,
    io::{self, BufRead},
};

use anyhow::{Context, Result, anyhow};

use crate::mesh::{MeshData, MeshVertex, face_normal};

/// One draw group of an OBJ file: all faces sharing a `usemtl` name.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjPart {
    pub material: Option<String>,
    pub mesh: MeshData,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjModel {
    pub parts: Vec<ObjPart>,
}

impl ObjModel {
    pub fn triangle_count(&self) -> usize {
        self.parts.iter().map(|p| p.mesh.triangle_count()).sum()
    }
}

/// Load an OBJ model from a [`BufRead`] implementation.
pub fn load_obj_from_reader<R: BufRead>(reader: R) -> Result<ObjModel> {
    parse_obj(reader)
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str) -> Result<ObjModel> {
    parse_obj(io::Cursor::new(contents))
}

/// Where a corner's normal comes from: a `vn` index, or the flat normal of
/// its face (stored as bits so corners of coplanar faces still merge).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
enum NormalKey {
    Explicit(usize),
    Flat([u32; 3]),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
struct Key(usize, Option<usize>, NormalKey);

#[derive(Default)]
struct PartBuilder {
    material: Option<String>,
    unique: HashMap<Key, u32>,
    vertices: Vec<MeshVertex>,
    indices: Vec<u32>,
}

impl PartBuilder {
    fn new(material: Option<String>) -> Self {
        Self {
            material,
            ..Self::default()
        }
    }

    fn finish(self) -> Option<ObjPart> {
        if self.indices.is_empty() {
            return None;
        }
        Some(ObjPart {
            material: self.material,
            mesh: MeshData::new(self.vertices, self.indices),
        })
    }
}

fn parse_obj<R: BufRead>(reader: R) -> Result<ObjModel> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    let mut texcoords: Vec<[f32; 2]> = Vec::new();

    let mut parts: Vec<PartBuilder> = vec![PartBuilder::new(None)];
    let mut current = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts_iter = trimmed.split_whitespace();
        let tag = parts_iter
            .next()
            .ok_or_else(|| anyhow!("Malformed OBJ line {}: '{}'", line_no + 1, trimmed))?;

        match tag {
            "v" => {
                let x = parse_f32(parts_iter.next(), line_no, "x coordinate")?;
                let y = parse_f32(parts_iter.next(), line_no, "y coordinate")?;
                let z = parse_f32(parts_iter.next(), line_no, "z coordinate")?;
                positions.push([x, y, z]);
            }
            "vt" => {
                let u = parse_f32(parts_iter.next(), line_no, "u coordinate")?;
                // 1D texture coordinates are legal.
                let v = match parts_iter.next() {
                    Some(token) => parse_f32(Some(token), line_no, "v coordinate")?,
                    None => 0.0,
                };
                texcoords.push([u, v]);
            }
            "vn" => {
                let nx = parse_f32(parts_iter.next(), line_no, "nx coordinate")?;
                let ny = parse_f32(parts_iter.next(), line_no, "ny coordinate")?;
                let nz = parse_f32(parts_iter.next(), line_no, "nz coordinate")?;
                normals.push([nx, ny, nz]);
            }
            "usemtl" => {
                let name = parts_iter.collect::<Vec<_>>().join(" ");
                let name = (!name.is_empty()).then_some(name);
                current = match parts.iter().position(|p| p.material == name) {
                    Some(idx) => idx,
                    None => {
                        parts.push(PartBuilder::new(name));
                        parts.len() - 1
                    }
                };
            }
            "f" => {
                let mut corners = Vec::new();
                for token in parts_iter {
                    corners.push(parse_face_vertex(
                        token,
                        positions.len(),
                        texcoords.len(),
                        normals.len(),
                        line_no,
                    )?);
                }
                if corners.len() < 3 {
                    continue;
                }
                // Indices are bounds-checked by parse_face_vertex.
                let flat = if corners.iter().any(|c| c.2.is_none()) {
                    let points: Vec<[f32; 3]> = corners.iter().map(|c| positions[c.0]).collect();
                    polygon_normal(&points)
                } else {
                    [0.0, 0.0, 1.0]
                };

                let part = &mut parts[current];
                let mut face_indices: Vec<u32> = Vec::with_capacity(corners.len());
                for (vi, vti, vni) in corners {
                    let (normal, normal_key) = match vni {
                        Some(i) => (normals[i], NormalKey::Explicit(i)),
                        None => (flat, NormalKey::Flat(flat.map(f32::to_bits))),
                    };
                    let key = Key(vi, vti, normal_key);
                    let index = match part.unique.get(&key) {
                        Some(&idx) => idx,
                        None => {
                            let uv = vti
                                .and_then(|i| texcoords.get(i).copied())
                                .unwrap_or([0.0, 0.0]);
                            let idx = u32::try_from(part.vertices.len())
                                .map_err(|_| anyhow!("Too many vertices in OBJ (>{})", u32::MAX))?;
                            part.vertices
                                .push(MeshVertex::new(positions[vi], normal, uv));
                            part.unique.insert(key, idx);
                            idx
                        }
                    };
                    face_indices.push(index);
                }

                // Triangulate fan
                for tri in 1..(face_indices.len() - 1) {
                    part.indices.push(face_indices[0]);
                    part.indices.push(face_indices[tri]);
                    part.indices.push(face_indices[tri + 1]);
                }
            }
            _ => {
                // Ignore other directives (o/g/s/mtllib/l/p/...)
            }
        }
    }

    let parts: Vec<ObjPart> = parts.into_iter().filter_map(PartBuilder::finish).collect();
    if parts.is_empty() {
        anyhow::bail!("OBJ contained no triangles");
    }

    Ok(ObjModel { parts })
}

/// Flat normal of a (possibly non-triangular) face: the normalized sum of its
/// fan triangles' normals. Degenerate faces point along +Z.
fn polygon_normal(points: &[[f32; 3]]) -> [f32; 3] {
    let mut sum = [0.0f32; 3];
    for i in 1..points.len() - 1 {
        let n = face_normal(points[0], points[i], points[i + 1]);
        for k in 0..3 {
            sum[k] += n[k];
        }
    }
    let [x, y, z] = sum;
    let len = (x * x + y * y + z * z).sqrt();
    if len > 0.0 {
        [x / len, y / len, z / len]
    } else {
        [0.0, 0.0, 1.0]
    }
}

fn parse_f32(value: Option<&str>, line_no: usize, what: &str) -> Result<f32> {
    let token = value.ok_or_else(|| anyhow!("Missing {} on line {}", what, line_no + 1))?;
    token
        .parse::<f32>()
        .with_context(|| format!("Failed to parse {} on line {}", what, line_no + 1))
}

fn parse_face_vertex(
    token: &str,
    pos_count: usize,
    tex_count: usize,
    norm_count: usize,
    line_no: usize,
) -> Result<(usize, Option<usize>, Option<usize>)> {
    let mut split = token.split('/');
    let pos = split
        .next()
        .ok_or_else(|| anyhow!("Malformed face element '{}' on line {}", token, line_no + 1))?;
    let pos_idx = resolve_index(pos, pos_count, line_no)?;

    let tex_idx = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, tex_count, line_no)?),
        _ => None,
    };

    let norm_idx = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, norm_count, line_no)?),
        _ => None,
    };

    Ok((pos_idx, tex_idx, norm_idx))
}

fn resolve_index(token: &str, len: usize, line_no: usize) -> Result<usize> {
    let raw = token
        .parse::<i64>()
        .with_context(|| format!("Invalid index '{}' on line {}", token, line_no + 1))?;
    if raw == 0 {
        anyhow::bail!("OBJ indices are 1-based; found 0 on line {}", line_no + 1);
    }

    let idx = if raw > 0 { raw - 1 } else { len as i64 + raw };

    if idx < 0 || idx as usize >= len {
        anyhow::bail!(
            "OBJ index {} resolved out of bounds (len={}) on line {}",
            raw,
            len,
            line_no + 1
        );
    }

    Ok(idx as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_triangle() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vn 0.0 0.0 1.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 0.0 1.0
            f 1/1/1 2/2/1 3/3/1
        "#;
        let model = load_obj_from_str(src).expect("parse triangle");
        assert_eq!(model.parts.len(), 1);
        let mesh = &model.parts[0].mesh;
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices.len(), 3);
        assert!(mesh.is_valid());
        assert_eq!(model.parts[0].material, None);
    }

    #[test]
    fn quad_is_fan_triangulated_with_negative_indices() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf -4 -3 -2 -1\n";
        let model = load_obj_from_str(src).expect("parse quad");
        assert_eq!(model.triangle_count(), 2);
        assert_eq!(model.parts[0].mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn usemtl_splits_parts_and_merges_repeats() {
        let src = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
usemtl bone
f 1 2 3
usemtl teeth
f 1 2 4
usemtl bone
f 2 3 4
";
        let model = load_obj_from_str(src).expect("parse groups");
        assert_eq!(model.parts.len(), 2);
        assert_eq!(model.parts[0].material.as_deref(), Some("bone"));
        assert_eq!(model.parts[0].mesh.triangle_count(), 2);
        assert_eq!(model.parts[1].material.as_deref(), Some("teeth"));
    }

    #[test]
    fn missing_normals_are_generated() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let model = load_obj_from_str(src).expect("parse");
        for v in &model.parts[0].mesh.vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn folded_faces_without_normals_stay_flat() {
        // Two faces sharing the edge 1-2, folded 90 degrees.
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\nf 1 2 3\nf 2 1 4\n";
        let model = load_obj_from_str(src).expect("parse");
        let mesh = &model.parts[0].mesh;
        // Shared corners are split so each face keeps its own normal.
        assert_eq!(mesh.vertices.len(), 6);
        let face_normals: Vec<[f32; 3]> = mesh
            .indices
            .chunks_exact(3)
            .map(|tri| {
                let n = mesh.vertices[tri[0] as usize].normal;
                for &i in tri {
                    assert_eq!(mesh.vertices[i as usize].normal, n);
                }
                n
            })
            .collect();
        assert_eq!(face_normals, vec![[0.0, 0.0, 1.0], [0.0, 1.0, 0.0]]);
    }

    #[test]
    fn coplanar_faces_without_normals_share_corners() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3\nf 1 3 4\n";
        let model = load_obj_from_str(src).expect("parse");
        assert_eq!(model.parts[0].mesh.vertices.len(), 4);
    }

    #[test]
    fn zero_index_is_rejected() {
        assert!(load_obj_from_str("v 0 0 0\nf 0 1 1\n").is_err());
    }

    #[test]
    fn empty_file_is_rejected() {
        assert!(load_obj_from_str("# nothing\nv 0 0 0\n").is_err());
    }
}
