use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use glam::Vec3;

use crate::mesh::{LayerElement, MappingMode, MeshAttribute, ReferenceMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    NotAMesh(String),
    Triangulation { polygon: usize, size: usize },
    NormalGeneration(String),
}

impl Display for TopologyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TopologyError::NotAMesh(node) => write!(f, "Node {} has no mesh attribute", node),
            TopologyError::Triangulation { polygon, size } => write!(
                f,
                "Cannot triangulate polygon #{} with {} vertices",
                polygon, size
            ),
            TopologyError::NormalGeneration(reason) => {
                write!(f, "Failed to generate normals: {}", reason)
            }
        }
    }
}

impl Error for TopologyError {}

fn remap_layer<T: Copy>(
    element: &LayerElement<T>,
    corner_sources: &[usize],
    polygon_sources: &[usize],
) -> LayerElement<T> {
    let sources = match element.mapping {
        MappingMode::ByPolygonVertex => corner_sources,
        MappingMode::ByPolygon => polygon_sources,
        MappingMode::ByControlPoint | MappingMode::AllSame => return element.clone(),
    };
    match element.reference {
        ReferenceMode::Direct => LayerElement {
            direct: sources
                .iter()
                .filter_map(|source| element.direct.get(*source).copied())
                .collect(),
            ..element.clone()
        },
        ReferenceMode::IndexToDirect => LayerElement {
            index: sources
                .iter()
                .filter_map(|source| element.index.get(*source).copied())
                .collect(),
            ..element.clone()
        },
    }
}

/// Fan-triangulate every polygon with more than three corners, keeping
/// layer elements mapped by polygon vertex or by polygon aligned with the
/// new corners.
pub fn triangulate(mesh: &mut MeshAttribute) -> Result<(), TopologyError> {
    let mut polygon_vertices = Vec::with_capacity(mesh.polygon_vertex_count());
    let mut polygon_sizes = Vec::with_capacity(mesh.polygon_count());
    let mut corner_sources = Vec::with_capacity(mesh.polygon_vertex_count());
    let mut polygon_sources = Vec::with_capacity(mesh.polygon_count());

    let mut corner_offset = 0;
    for (polygon_index, polygon) in mesh.polygons().enumerate() {
        if polygon.len() < 3 {
            return Err(TopologyError::Triangulation {
                polygon: polygon_index,
                size: polygon.len(),
            });
        }
        for corner in 1..polygon.len() - 1 {
            for local in [0, corner, corner + 1] {
                polygon_vertices.push(polygon[local]);
                corner_sources.push(corner_offset + local);
            }
            polygon_sizes.push(3);
            polygon_sources.push(polygon_index);
        }
        corner_offset += polygon.len();
    }

    mesh.normals = mesh
        .normals
        .as_ref()
        .map(|normals| remap_layer(normals, &corner_sources, &polygon_sources));
    mesh.uvs = mesh
        .uvs
        .as_ref()
        .map(|uvs| remap_layer(uvs, &corner_sources, &polygon_sources));
    mesh.polygon_vertices = polygon_vertices;
    mesh.polygon_sizes = polygon_sizes;
    Ok(())
}

fn calculate_triangle_normal(positions: [Vec3; 3]) -> Vec3 {
    let vec_a = positions[2] - positions[1];
    let vec_b = positions[0] - positions[1];
    vec_a.cross(vec_b)
}

/// Smooth normals: area weighted face normals accumulated per control point,
/// emitted once per polygon vertex.
pub fn calculate_normals(mesh: &MeshAttribute) -> Result<LayerElement<Vec3>, TopologyError> {
    if mesh.polygon_count() == 0 {
        return Err(TopologyError::NormalGeneration(String::from(
            "mesh has no polygons",
        )));
    }

    let mut buffer = vec![Vec3::ZERO; mesh.control_points.len()];
    let mut any_face = false;
    for polygon in mesh.polygons() {
        let mut positions = Vec::with_capacity(polygon.len());
        for index in polygon {
            let position = mesh.control_points.get(*index as usize).ok_or_else(|| {
                TopologyError::NormalGeneration(format!("control point {} out of range", index))
            })?;
            positions.push(*position);
        }
        for corner in 1..polygon.len().saturating_sub(1) {
            let normal =
                calculate_triangle_normal([positions[0], positions[corner], positions[corner + 1]]);
            if normal.length_squared() > 0.0 {
                any_face = true;
            }
            for local in [0, corner, corner + 1] {
                buffer[polygon[local] as usize] += normal;
            }
        }
    }
    if !any_face {
        return Err(TopologyError::NormalGeneration(String::from(
            "every face is degenerate",
        )));
    }

    let direct = mesh
        .polygon_vertices
        .iter()
        .map(|index| {
            buffer
                .get(*index as usize)
                .map(|normal| normal.normalize_or_zero())
                .unwrap_or(Vec3::ZERO)
        })
        .collect();
    Ok(LayerElement::direct(MappingMode::ByPolygonVertex, direct))
}

#[cfg(test)]
mod test {
    use glam::{Vec2, Vec3};

    use super::{calculate_normals, triangulate, TopologyError};
    use crate::mesh::{LayerElement, MappingMode, MeshAttribute};

    fn quad() -> MeshAttribute {
        MeshAttribute::from_polygons(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            &[&[0, 1, 2, 3]],
        )
    }

    #[test]
    fn test_triangulate_quad_fans_from_first_corner() {
        let mut mesh = quad();
        mesh.uvs = Some(LayerElement::indexed(
            MappingMode::ByPolygonVertex,
            vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y],
            vec![0, 1, 2, 3],
        ));
        triangulate(&mut mesh).unwrap();
        assert_eq!(mesh.polygon_sizes, vec![3, 3]);
        assert_eq!(mesh.polygon_vertices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.uvs.unwrap().index, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_triangulate_rejects_degenerate_polygon() {
        let mut mesh = MeshAttribute::from_polygons(vec![Vec3::ZERO; 3], &[&[0, 1, 2], &[0, 1]]);
        assert_eq!(
            triangulate(&mut mesh),
            Err(TopologyError::Triangulation {
                polygon: 1,
                size: 2
            })
        );
    }

    #[test]
    fn test_normals_of_flat_quad_face_up() {
        let mesh = quad();
        let normals = calculate_normals(&mesh).unwrap();
        assert_eq!(normals.mapping, MappingMode::ByPolygonVertex);
        assert_eq!(normals.direct.len(), 4);
        for normal in normals.direct {
            assert!(normal.abs_diff_eq(Vec3::Z, 1e-6));
        }
    }

    #[test]
    fn test_normals_fail_without_faces() {
        let mesh = MeshAttribute::from_polygons(vec![Vec3::ZERO; 3], &[&[0, 1, 2]]);
        assert!(calculate_normals(&mesh).is_err());
        assert!(calculate_normals(&MeshAttribute::default()).is_err());
    }
}
