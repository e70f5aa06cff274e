//! STL parser for binary and ASCII formats.
//!
//! Triangles are emitted unshared (three vertices each) with the facet
//! normal; facets with a zero normal get one computed from their winding.

use anyhow::{Result, anyhow};
use nom::{
    IResult,
    bytes::complete::tag,
    character::complete::{multispace0, multispace1, not_line_ending},
    combinator::opt,
    multi::many0,
    number::complete::float,
    sequence::preceded,
};

use crate::mesh::{MeshData, MeshVertex, face_normal};

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;

type Vec3 = [f32; 3];

/// Detect the flavour and parse. Files whose size matches their triangle
/// count are binary even when the header starts with `solid`; otherwise only
/// UTF-8 text starting with `solid` is read as ASCII and everything else
/// (padded exports, odd headers) falls back to binary.
pub fn parse_stl(data: &[u8]) -> Result<MeshData> {
    if is_binary(data) {
        return parse_binary_stl(data);
    }
    if data.trim_ascii_start().starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            return parse_ascii_stl(text);
        }
    }
    parse_binary_stl(data)
}

fn is_binary(data: &[u8]) -> bool {
    if data.len() < HEADER_LEN + 4 {
        return false;
    }
    let count = read_u32(data, HEADER_LEN) as usize;
    count
        .checked_mul(TRIANGLE_LEN)
        .and_then(|n| n.checked_add(HEADER_LEN + 4))
        == Some(data.len())
}

/// Parse a binary STL file.
pub fn parse_binary_stl(data: &[u8]) -> Result<MeshData> {
    if data.len() < HEADER_LEN + 4 {
        anyhow::bail!("File too small to be a valid STL ({} bytes)", data.len());
    }
    let triangle_count = read_u32(data, HEADER_LEN) as usize;
    let expected = HEADER_LEN + 4 + triangle_count * TRIANGLE_LEN;
    if data.len() < expected {
        anyhow::bail!(
            "STL file truncated: expected {} bytes for {} triangles, got {}",
            expected,
            triangle_count,
            data.len()
        );
    }

    let mut facets = Vec::with_capacity(triangle_count);
    let mut offset = HEADER_LEN + 4;
    for _ in 0..triangle_count {
        let normal = read_vec3(data, offset);
        let a = read_vec3(data, offset + 12);
        let b = read_vec3(data, offset + 24);
        let c = read_vec3(data, offset + 36);
        // Trailing u16 attribute byte count is ignored.
        offset += TRIANGLE_LEN;
        facets.push((normal, [a, b, c]));
    }
    build_mesh(facets)
}

/// Parse an ASCII STL file.
pub fn parse_ascii_stl(input: &str) -> Result<MeshData> {
    match ascii_solid(input) {
        Ok((_, facets)) => build_mesh(facets),
        Err(e) => Err(anyhow!("Failed to parse ASCII STL: {e}")),
    }
}

fn build_mesh(facets: Vec<(Vec3, [Vec3; 3])>) -> Result<MeshData> {
    if facets.is_empty() {
        anyhow::bail!("STL contained no triangles");
    }
    let mut vertices = Vec::with_capacity(facets.len() * 3);
    for (normal, [a, b, c]) in facets {
        let normal = if normal.iter().all(|v| *v == 0.0) || normal.iter().any(|v| !v.is_finite()) {
            face_normal(a, b, c)
        } else {
            normal
        };
        for p in [a, b, c] {
            vertices.push(MeshVertex::new(p, normal, [0.0, 0.0]));
        }
    }
    let count = u32::try_from(vertices.len()).map_err(|_| anyhow!("Too many STL vertices"))?;
    Ok(MeshData::new(vertices, (0..count).collect()))
}

fn ascii_solid(input: &str) -> IResult<&str, Vec<(Vec3, [Vec3; 3])>> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _) = not_line_ending(input)?; // optional name
    let (input, facets) = many0(facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    let (input, _) = opt(not_line_ending)(input)?;
    Ok((input, facets))
}

fn facet(input: &str) -> IResult<&str, (Vec3, [Vec3; 3])> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, a) = vertex(input)?;
    let (input, b) = vertex(input)?;
    let (input, c) = vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;
    Ok((input, (normal, [a, b, c])))
}

fn vertex(input: &str) -> IResult<&str, Vec3> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    vector3(input)
}

fn vector3(input: &str) -> IResult<&str, Vec3> {
    let (input, x) = preceded(multispace1, float)(input)?;
    let (input, y) = preceded(multispace1, float)(input)?;
    let (input, z) = preceded(multispace1, float)(input)?;
    Ok((input, [x, y, z]))
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

fn read_f32(data: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

fn read_vec3(data: &[u8], offset: usize) -> Vec3 {
    [
        read_f32(data, offset),
        read_f32(data, offset + 4),
        read_f32(data, offset + 8),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_triangle(header: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data[..header.len()].copy_from_slice(header);
        data.extend_from_slice(&1u32.to_le_bytes());
        for v in [0.0f32, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0, 0.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&0u16.to_le_bytes());
        data
    }

    #[test]
    fn binary_with_solid_header_is_still_binary() {
        let mesh = parse_stl(&binary_triangle(b"solid exported by CAD")).expect("binary");
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertices[1].position, [2.0, 0.0, 0.0]);
        // Zero facet normal is recomputed.
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn padded_binary_without_solid_header_parses() {
        let mut data = binary_triangle(b"binstl");
        data.extend_from_slice(&[0, 0]);
        let mesh = parse_stl(&data).expect("padded binary");
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn padded_binary_with_solid_header_parses() {
        let mut data = binary_triangle(b"solid ");
        // Non-UTF-8 padding rules out ASCII.
        data.extend_from_slice(&[0xff, 0xfe]);
        assert_eq!(parse_stl(&data).expect("binary").triangle_count(), 1);
    }

    #[test]
    fn truncated_binary_is_rejected() {
        let mut data = binary_triangle(b"x");
        data[HEADER_LEN] = 2;
        assert!(parse_binary_stl(&data).is_err());
    }

    #[test]
    fn ascii_facets_parse() {
        let src = "solid tooth
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
  facet normal 0 0 -1
    outer loop
      vertex 0 0 0
      vertex 0 1 0
      vertex 1.5e0 0 0
    endloop
  endfacet
endsolid tooth
";
        let mesh = parse_stl(src.as_bytes()).expect("ascii");
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertices[3].normal, [0.0, 0.0, -1.0]);
        assert_eq!(mesh.vertices[5].position, [1.5, 0.0, 0.0]);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_stl(b"not an stl").is_err());
        assert!(parse_stl(b"solid empty\nendsolid empty\n").is_err());
    }
}
