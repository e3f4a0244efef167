use extractor_asset::{
    mesh::{LayerElement, MappingMode, MeshAttribute, ReferenceMode},
    node::NodeId,
    scene::SceneGraph,
    topology::TopologyError,
};
use log::debug;

use crate::{
    error::{LayerKind, ValidationError},
    params::ExtractParams,
    result::Vertex,
    skin::Influence,
    weight::MAX_INFLUENCES,
};

/// The mesh attribute of `node`.
pub fn mesh_of<S: SceneGraph + ?Sized>(
    scene: &S,
    node: NodeId,
) -> Result<&MeshAttribute, TopologyError> {
    scene
        .attribute(node)
        .as_mesh()
        .ok_or_else(|| TopologyError::NotAMesh(scene.name(node).to_owned()))
}

/// Triangulate the node's mesh unless every polygon already is a triangle.
/// Returns whether the mesh was rebuilt.
pub fn triangulate_if_needed<S: SceneGraph + ?Sized>(
    scene: &mut S,
    node: NodeId,
) -> Result<bool, TopologyError> {
    if mesh_of(scene, node)?.is_triangulated() {
        return Ok(false);
    }
    debug!("Triangulating mesh {}", scene.name(node));
    scene.triangulate(node)?;
    Ok(true)
}

/// Generate normals when the mesh has none or they are not mapped by
/// polygon vertex. Does nothing when generation is disabled; validation
/// rejects such meshes afterwards.
pub fn repair_normals<S: SceneGraph + ?Sized>(
    scene: &mut S,
    node: NodeId,
    params: &ExtractParams,
) -> Result<bool, TopologyError> {
    let mapping = mesh_of(scene, node)?
        .normals
        .as_ref()
        .map(|normals| normals.mapping);
    if mapping == Some(MappingMode::ByPolygonVertex) || !params.generate_missing_normals {
        return Ok(false);
    }
    debug!(
        "Generating normals for mesh {} (mapping {:?})",
        scene.name(node),
        mapping
    );
    scene.generate_normals(node)?;
    Ok(true)
}

fn check_layer<T>(
    layer: &LayerElement<T>,
    element: LayerKind,
    polygon_vertex_count: usize,
) -> Result<(), ValidationError> {
    if layer.mapping != MappingMode::ByPolygonVertex {
        return Err(match element {
            LayerKind::Normal => ValidationError::NormalMapping(layer.mapping),
            LayerKind::Uv => ValidationError::UvMapping(layer.mapping),
        });
    }
    if layer.mapped_len() != polygon_vertex_count {
        return Err(ValidationError::ElementCount {
            element,
            reference: layer.reference,
            expected: polygon_vertex_count,
            actual: layer.mapped_len(),
        });
    }
    Ok(())
}

fn check_source_count<T>(
    layer: Option<&LayerElement<T>>,
    element: LayerKind,
    mesh: &MeshAttribute,
) -> Result<(), ValidationError> {
    let Some(layer) = layer else {
        return Ok(());
    };
    let expected = match layer.mapping {
        MappingMode::ByPolygonVertex => mesh.polygon_vertex_count(),
        MappingMode::ByPolygon => mesh.polygon_count(),
        MappingMode::ByControlPoint | MappingMode::AllSame => return Ok(()),
    };
    if layer.mapped_len() != expected {
        return Err(ValidationError::ElementCount {
            element,
            reference: layer.reference,
            expected,
            actual: layer.mapped_len(),
        });
    }
    Ok(())
}

/// Check the entry count of layers mapped by polygon vertex or by polygon
/// against the mesh as authored. Triangulation rebuilds such layers corner
/// by corner, so a mismatch has to be caught before it runs.
pub fn validate_source_layers(mesh: &MeshAttribute) -> Result<(), ValidationError> {
    check_source_count(mesh.normals.as_ref(), LayerKind::Normal, mesh)?;
    check_source_count(mesh.uvs.as_ref(), LayerKind::Uv, mesh)
}

/// Check that normals and UVs can be read once per polygon vertex.
pub fn validate(mesh: &MeshAttribute) -> Result<(), ValidationError> {
    let count = mesh.polygon_vertex_count();
    let normals = mesh.normals.as_ref().ok_or(ValidationError::MissingNormals)?;
    check_layer(normals, LayerKind::Normal, count)?;
    if let Some(uvs) = &mesh.uvs {
        check_layer(uvs, LayerKind::Uv, count)?;
    }
    Ok(())
}

fn element<T: Copy>(
    layer: &LayerElement<T>,
    position: usize,
    element: LayerKind,
) -> Result<T, ValidationError> {
    layer.get(position).ok_or_else(|| {
        let index = match layer.reference {
            ReferenceMode::Direct => position,
            ReferenceMode::IndexToDirect => layer
                .index
                .get(position)
                .map_or(position, |index| *index as usize),
        };
        ValidationError::ElementIndexOutOfBounds {
            element,
            index,
            len: layer.direct.len(),
        }
    })
}

/// Emit one vertex per polygon vertex of a validated, triangulated mesh.
///
/// `skin` holds the normalized influences of every control point; without
/// it the weight and bone index fields stay zeroed.
pub fn flatten(
    mesh: &MeshAttribute,
    skin: Option<&[[Influence; MAX_INFLUENCES]]>,
    params: &ExtractParams,
) -> Result<Vec<Vertex>, ValidationError> {
    let normals = mesh.normals.as_ref().ok_or(ValidationError::MissingNormals)?;
    let mut vertices = Vec::with_capacity(mesh.polygon_vertex_count());

    for (position, &control_point) in mesh.polygon_vertices.iter().enumerate() {
        let point = mesh.control_points.get(control_point as usize).ok_or(
            ValidationError::ControlPointOutOfBounds {
                index: control_point,
                len: mesh.control_points.len(),
            },
        )?;
        let normal = element(normals, position, LayerKind::Normal)?;
        let uv = match &mesh.uvs {
            Some(uvs) => {
                let uv = element(uvs, position, LayerKind::Uv)?;
                if params.flip_v {
                    [uv.x, 1.0 - uv.y]
                } else {
                    uv.to_array()
                }
            }
            None => params.default_uv,
        };

        let mut vertex = Vertex {
            position: point.to_array(),
            normal: normal.to_array(),
            uv,
            ..Default::default()
        };
        if let Some(influences) = skin.and_then(|skin| skin.get(control_point as usize)) {
            for (slot, influence) in influences.iter().enumerate() {
                vertex.weight[slot] = influence.weight;
                vertex.bone_index[slot] = influence.bone_index;
            }
        }
        vertices.push(vertex);
    }

    Ok(vertices)
}
