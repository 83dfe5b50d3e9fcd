//! Marching-tetrahedra surface extraction

use std::collections::HashMap;

use glam::DVec3;
use tracing::{debug, warn};

use super::shape::Shape;
use super::traits::{CadError, CadResult, TessellatedMesh};

/// Kuhn decomposition of a cube into 6 tetrahedra sharing the 0-7 diagonal.
/// Corner bits: 1 = +x, 2 = +y, 4 = +z.
const TETRAHEDRA: [[usize; 4]; 6] = [
    [0, 1, 3, 7],
    [0, 3, 2, 7],
    [0, 2, 6, 7],
    [0, 6, 4, 7],
    [0, 4, 5, 7],
    [0, 5, 1, 7],
];

struct Grid {
    origin: DVec3,
    cell: f64,
    dims: [usize; 3],
}

impl Grid {
    fn nodes(&self) -> [usize; 3] {
        [self.dims[0] + 1, self.dims[1] + 1, self.dims[2] + 1]
    }

    fn index(&self, i: usize, j: usize, k: usize) -> usize {
        let [nx, ny, _] = self.nodes();
        i + nx * (j + ny * k)
    }

    fn position(&self, index: usize) -> DVec3 {
        let [nx, ny, _] = self.nodes();
        let i = index % nx;
        let j = (index / nx) % ny;
        let k = index / (nx * ny);
        self.origin + DVec3::new(i as f64, j as f64, k as f64) * self.cell
    }
}

fn plan_grid(shape: &Shape, tolerance: f64, max_cells: usize) -> Grid {
    let mut cell = tolerance;
    let bounds = shape.bounds;
    let dims_for = |cell: f64| {
        let size = bounds.size() + DVec3::splat(2.0 * cell);
        [
            (size.x / cell).ceil().max(1.0) as usize,
            (size.y / cell).ceil().max(1.0) as usize,
            (size.z / cell).ceil().max(1.0) as usize,
        ]
    };
    let mut dims = dims_for(cell);
    while dims.iter().product::<usize>() > max_cells {
        cell *= 1.25;
        dims = dims_for(cell);
    }
    if cell > tolerance {
        warn!(
            requested = tolerance,
            used = cell,
            "Tessellation grid too large, coarsening"
        );
    }
    Grid {
        origin: bounds.min - DVec3::splat(cell),
        cell,
        dims,
    }
}

/// Triangulate the zero level set of `shape`
pub(crate) fn tessellate(
    shape: &Shape,
    tolerance: f64,
    max_cells: usize,
) -> CadResult<TessellatedMesh> {
    if !(tolerance > 0.0 && tolerance.is_finite()) {
        return Err(CadError::TessellationFailed(format!(
            "Tolerance must be positive, got {tolerance}"
        )));
    }

    let grid = plan_grid(shape, tolerance, max_cells);
    let [nx, ny, nz] = grid.nodes();
    debug!(dims = ?grid.dims, cell = grid.cell, "Sampling distance field");

    // samples within rounding noise of the surface count as on it
    let snap = grid.cell * 1e-4;
    let values: Vec<f64> = (0..nx * ny * nz)
        .map(|idx| {
            let d = shape.distance(grid.position(idx));
            if d.abs() < snap { 0.0 } else { d }
        })
        .collect();

    let mut triangles: Vec<[u32; 3]> = Vec::new();
    let mut vertex_ids: HashMap<VertexKey, u32> = HashMap::new();
    let mut positions: Vec<DVec3> = Vec::new();

    // `inside` is negative, `outside` non-negative. A crossing that lands on a
    // zero-valued node is welded to that node.
    let mut vertex_on = |inside: usize, outside: usize, positions: &mut Vec<DVec3>| -> u32 {
        let (vi, vo) = (values[inside], values[outside]);
        let key = if vo == 0.0 {
            VertexKey::Node(outside)
        } else {
            VertexKey::Edge(inside.min(outside), inside.max(outside))
        };
        *vertex_ids.entry(key).or_insert_with(|| {
            let p = match key {
                VertexKey::Node(n) => grid.position(n),
                VertexKey::Edge(..) => {
                    let t = (vi / (vi - vo)).clamp(0.0, 1.0);
                    grid.position(inside).lerp(grid.position(outside), t)
                }
            };
            positions.push(p);
            (positions.len() - 1) as u32
        })
    };

    let min_area = grid.cell * grid.cell * 1e-9;

    for k in 0..grid.dims[2] {
        for j in 0..grid.dims[1] {
            for i in 0..grid.dims[0] {
                let corners: [usize; 8] = std::array::from_fn(|bit| {
                    grid.index(i + (bit & 1), j + ((bit >> 1) & 1), k + ((bit >> 2) & 1))
                });
                let inside_count = corners.iter().filter(|c| values[**c] < 0.0).count();
                if inside_count == 0 || inside_count == 8 {
                    continue;
                }

                for tet in TETRAHEDRA {
                    let nodes = tet.map(|c| corners[c]);
                    let (inside, outside): (Vec<usize>, Vec<usize>) =
                        nodes.into_iter().partition(|n| values[*n] < 0.0);

                    let candidates: Vec<[u32; 3]> = match (inside.len(), outside.len()) {
                        (1, 3) => {
                            let a = inside[0];
                            vec![[
                                vertex_on(a, outside[0], &mut positions),
                                vertex_on(a, outside[1], &mut positions),
                                vertex_on(a, outside[2], &mut positions),
                            ]]
                        }
                        (3, 1) => {
                            let a = outside[0];
                            vec![[
                                vertex_on(inside[0], a, &mut positions),
                                vertex_on(inside[1], a, &mut positions),
                                vertex_on(inside[2], a, &mut positions),
                            ]]
                        }
                        (2, 2) => {
                            let e00 = vertex_on(inside[0], outside[0], &mut positions);
                            let e01 = vertex_on(inside[0], outside[1], &mut positions);
                            let e11 = vertex_on(inside[1], outside[1], &mut positions);
                            let e10 = vertex_on(inside[1], outside[0], &mut positions);
                            vec![[e00, e01, e11], [e00, e11, e10]]
                        }
                        _ => continue,
                    };

                    // outward = from the inside corners towards the outside ones
                    let centroid = |ns: &[usize]| {
                        ns.iter().map(|n| grid.position(*n)).sum::<DVec3>() / ns.len() as f64
                    };
                    let outward = centroid(&outside) - centroid(&inside);

                    for [a, b, c] in candidates {
                        if a == b || b == c || a == c {
                            continue;
                        }
                        let (pa, pb, pc) = (
                            positions[a as usize],
                            positions[b as usize],
                            positions[c as usize],
                        );
                        let normal = (pb - pa).cross(pc - pa);
                        if normal.length() <= min_area {
                            continue;
                        }
                        if normal.dot(outward) < 0.0 {
                            triangles.push([a, c, b]);
                        } else {
                            triangles.push([a, b, c]);
                        }
                    }
                }
            }
        }
    }

    if triangles.is_empty() {
        return Err(CadError::TessellationFailed(
            "Solid produced no surface at this tolerance".into(),
        ));
    }

    // drop vertices only referenced by discarded triangles
    let mut remap: Vec<Option<u32>> = vec![None; positions.len()];
    let mut used: Vec<DVec3> = Vec::new();
    let mut mesh = TessellatedMesh::new();
    for tri in &triangles {
        for v in tri {
            let id = *remap[*v as usize].get_or_insert_with(|| {
                used.push(positions[*v as usize]);
                (used.len() - 1) as u32
            });
            mesh.indices.push(id);
        }
    }

    let mut normals = vec![DVec3::ZERO; used.len()];
    for tri in mesh.indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        // area-weighted
        let n = (used[b] - used[a]).cross(used[c] - used[a]);
        normals[a] += n;
        normals[b] += n;
        normals[c] += n;
    }

    mesh.vertices = used.iter().map(|p| p.as_vec3().to_array()).collect();
    mesh.normals = used
        .iter()
        .zip(&normals)
        .map(|(p, n)| {
            let n = if n.length() > min_area {
                n.normalize()
            } else {
                field_gradient(shape, *p, grid.cell * 0.5)
            };
            n.as_vec3().to_array()
        })
        .collect();

    debug!(
        vertices = mesh.vertices.len(),
        triangles = mesh.triangle_count(),
        "Tessellation complete"
    );
    Ok(mesh)
}

/// Identity of an extracted vertex: a grid edge crossing, or a grid node
/// lying exactly on the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum VertexKey {
    Node(usize),
    Edge(usize, usize),
}

/// Unit gradient of the distance field by central differences
fn field_gradient(shape: &Shape, p: DVec3, h: f64) -> DVec3 {
    let axis = |d: DVec3| shape.distance(p + d) - shape.distance(p - d);
    let g = DVec3::new(
        axis(DVec3::X * h),
        axis(DVec3::Y * h),
        axis(DVec3::Z * h),
    );
    g.try_normalize().unwrap_or(DVec3::Z)
}
