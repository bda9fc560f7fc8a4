//! OBJ mesh loading: the only supported way to get a triangle list into the
//! builders in this crate's CLI. Library users who already have triangles in
//! memory skip this module entirely and call [`crate::kdtree::build`] or
//! [`crate::bvh::build`] directly.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use cgmath::Vector3;

use crate::error::{BspError, BspResult};
use crate::triangle::Triangle;

/// Loads every triangle out of an OBJ file's position data, discarding
/// normals/texcoords/materials (this crate's builders only need vertex
/// positions). Polygons are assumed to already be triangulated, matching the
/// teacher's `read_obj`; an n-gon face is rejected rather than silently
/// fan-triangulated, since guessing a fan order for a non-convex polygon can
/// produce degenerate geometry the builder has no way to detect afterward.
pub fn load_triangles(path: &Path) -> BspResult<Vec<Triangle>> {
    let file = File::open(path).map_err(|source| BspError::IoOpenFailed {
        path: path.display().to_string(),
        source,
    })?;
    let reader = BufReader::new(file);

    let obj: obj::Obj<obj::Position, u32> =
        obj::load_obj(reader).map_err(|e| BspError::Config(format!("malformed OBJ file: {e}")))?;

    log::info!(
        "loaded {} vertices, {} indices from {}",
        obj.vertices.len(),
        obj.indices.len(),
        path.display()
    );

    if obj.indices.len() % 3 != 0 {
        return Err(BspError::DegenerateGeometry(format!(
            "{} has a non-triangulated face (index count {} not a multiple of 3)",
            path.display(),
            obj.indices.len()
        )));
    }

    let mut triangles = Vec::with_capacity(obj.indices.len() / 3);
    for chunk in obj.indices.chunks(3) {
        let (i, j, k) = (chunk[0] as usize, chunk[1] as usize, chunk[2] as usize);
        triangles.push(Triangle {
            p0: Vector3::from(obj.vertices[i].position),
            p1: Vector3::from(obj.vertices[j].position),
            p2: Vector3::from(obj.vertices[k].position),
        });
    }

    if triangles.is_empty() {
        return Err(BspError::EmptyScene);
    }

    Ok(triangles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_single_triangle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.obj");
        std::fs::write(
            &path,
            "v 0.0 0.0 0.0\nv 1.0 0.0 0.0\nv 0.0 1.0 0.0\nf 1 2 3\n",
        )
        .unwrap();

        let tris = load_triangles(&path).unwrap();
        assert_eq!(tris.len(), 1);
        assert_eq!(tris[0].p1, Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn empty_mesh_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.obj");
        std::fs::write(&path, "v 0.0 0.0 0.0\n").unwrap();
        let result = load_triangles(&path);
        assert!(matches!(result, Err(BspError::EmptyScene)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = load_triangles(Path::new("/nonexistent/mesh.obj"));
        assert!(matches!(result, Err(BspError::IoOpenFailed { .. })));
    }
}
