//! Binary STL writer

use glam::Vec3;

use super::{ExportError, MeshPart};

/// Render all parts into one binary STL. STL carries no color.
pub(crate) fn render(parts: &[MeshPart]) -> Result<Vec<u8>, ExportError> {
    let triangles: Vec<stl_io::Triangle> = parts
        .iter()
        .flat_map(|part| part.mesh.triangles())
        .map(|[v0, v1, v2]| stl_io::Triangle {
            normal: stl_io::Normal::new(face_normal(v0, v1, v2)),
            vertices: [
                stl_io::Vertex::new(v0),
                stl_io::Vertex::new(v1),
                stl_io::Vertex::new(v2),
            ],
        })
        .collect();

    let mut bytes = Vec::new();
    stl_io::write_stl(&mut bytes, triangles.iter())
        .map_err(|e| ExportError::MeshExport(e.to_string()))?;
    Ok(bytes)
}

fn face_normal(v0: [f32; 3], v1: [f32; 3], v2: [f32; 3]) -> [f32; 3] {
    let (a, b, c) = (Vec3::from(v0), Vec3::from(v1), Vec3::from(v2));
    let n = (b - a).cross(c - a);
    if n.length_squared() > 0.0 {
        n.normalize().to_array()
    } else {
        [0.0, 0.0, 1.0]
    }
}
