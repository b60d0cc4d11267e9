//! STL import and binary export.

use refract_kernel_math::{Point3, Vec3};

use crate::error::{MeshError, Result};
use crate::triangle::Triangle;

const HEADER_LEN: usize = 80;
const RECORD_LEN: usize = 50;

/// Parse binary or ASCII STL into triangles.
///
/// A buffer is treated as binary when its length matches the triangle
/// count in the binary header, even if it begins with `solid`.
pub fn read_stl(data: &[u8]) -> Result<Vec<Triangle>> {
    if is_binary(data) {
        read_binary(data)
    } else if data.starts_with(b"solid") {
        let text = std::str::from_utf8(data).map_err(|e| MeshError::stl(e.to_string()))?;
        read_ascii(text)
    } else {
        Err(MeshError::stl("unrecognized STL data"))
    }
}

fn is_binary(data: &[u8]) -> bool {
    if data.len() < HEADER_LEN + 4 {
        return false;
    }
    let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
    data.len() == HEADER_LEN + 4 + count * RECORD_LEN
}

fn read_binary(data: &[u8]) -> Result<Vec<Triangle>> {
    Ok(data[HEADER_LEN + 4..]
        .chunks_exact(RECORD_LEN)
        .map(|record| {
            let f32_at = |o: usize| {
                f32::from_le_bytes([record[o], record[o + 1], record[o + 2], record[o + 3]])
            };
            let point_at = |o: usize| Point3::new(f32_at(o), f32_at(o + 4), f32_at(o + 8));
            // Bytes 0..12 hold the facet normal; it is recomputed from the winding.
            Triangle::new(point_at(12), point_at(24), point_at(36))
        })
        .collect())
}

fn read_ascii(text: &str) -> Result<Vec<Triangle>> {
    let mut triangles = Vec::new();
    let mut pending: Vec<Point3> = Vec::with_capacity(3);

    for (line_no, line) in text.lines().enumerate() {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("vertex") => {
                let coords: Vec<f32> = words
                    .map(str::parse)
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| MeshError::stl(format!("line {}: {e}", line_no + 1)))?;
                if coords.len() != 3 {
                    return Err(MeshError::stl(format!(
                        "line {}: vertex needs 3 coordinates",
                        line_no + 1
                    )));
                }
                pending.push(Point3::new(coords[0], coords[1], coords[2]));
            }
            Some("endloop") => {
                if pending.len() != 3 {
                    return Err(MeshError::stl(format!(
                        "line {}: facet has {} vertices",
                        line_no + 1,
                        pending.len()
                    )));
                }
                triangles.push(Triangle::new(pending[0], pending[1], pending[2]));
                pending.clear();
            }
            _ => {}
        }
    }

    Ok(triangles)
}

/// Serialize triangles as binary STL.
pub fn write_stl_bytes(triangles: &[Triangle]) -> Vec<u8> {
    let mut data = Vec::with_capacity(HEADER_LEN + 4 + triangles.len() * RECORD_LEN);

    let mut header = [b' '; HEADER_LEN];
    let tag = b"refract binary STL";
    header[..tag.len()].copy_from_slice(tag);
    data.extend_from_slice(&header);
    data.extend_from_slice(&(triangles.len() as u32).to_le_bytes());

    for tri in triangles {
        let n = tri.normal().unwrap_or_else(Vec3::z);
        for value in [n.x, n.y, n.z] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        for p in tri.vertices() {
            for value in [p.x, p.y, p.z] {
                data.extend_from_slice(&value.to_le_bytes());
            }
        }
        data.extend_from_slice(&0u16.to_le_bytes());
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri() -> Triangle {
        Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.5),
        )
    }

    #[test]
    fn test_binary_round_trip() {
        let bytes = write_stl_bytes(&[tri(), tri()]);
        assert_eq!(bytes.len(), 84 + 2 * 50);
        assert_eq!(read_stl(&bytes).unwrap(), vec![tri(), tri()]);
    }

    #[test]
    fn test_ascii() {
        let text = "solid t\n facet normal 0 0 1\n  outer loop\n   vertex 0 0 0\n   vertex 1 0 0\n   vertex 0 1 0.5\n  endloop\n endfacet\nendsolid t\n";
        assert_eq!(read_stl(text.as_bytes()).unwrap(), vec![tri()]);
    }

    #[test]
    fn test_ascii_bad_vertex() {
        let text = "solid t\nouter loop\nvertex 0 zero 0\nendloop\nendsolid\n";
        assert!(matches!(read_stl(text.as_bytes()), Err(MeshError::InvalidStl(_))));
    }

    #[test]
    fn test_garbage() {
        assert!(read_stl(b"not a mesh").is_err());
    }
}
