use std::{
    collections::{HashMap, HashSet},
    error::Error,
    fmt::{self, Display, Formatter},
    path::Path,
};

use glam::{Mat4, Quat, Vec2, Vec3};
use gltf::{
    animation::{util::ReadOutputs, Channel, Interpolation},
    mesh::Mode,
    Animation, Document, Node,
};
use log::{debug, warn};

use crate::{
    animation::{
        AnimationChannel, AnimationKeyFrame, AnimationKeyFrames, AnimationLayer, AnimationStack,
    },
    memory::MemoryScene,
    mesh::{LayerElement, MappingMode, MeshAttribute},
    node::{DecomposedTransform, NodeAttribute, NodeId, SkeletonAttribute},
    scene::{AxisConvention, ImportOptions, SceneGraph, SceneImporter},
    skin::{Cluster, ClusterLinkMode, Deformer, SkinDeformer},
    time::{SceneTime, TimeMode, TimeSpan},
};

#[derive(Debug)]
pub enum GltfImportError {
    Gltf(gltf::Error),
    NoScene,
    UnsupportedPrimitiveMode(Mode),
    MissingPositions { mesh: usize, primitive: usize },
}

impl Display for GltfImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            GltfImportError::Gltf(error) => Display::fmt(error, f),
            GltfImportError::NoScene => write!(f, "Document contains no scene"),
            GltfImportError::UnsupportedPrimitiveMode(mode) => {
                write!(f, "Unsupported primitive mode: {:?}", mode)
            }
            GltfImportError::MissingPositions { mesh, primitive } => write!(
                f,
                "No positions in primitive #{} of mesh #{}",
                primitive, mesh
            ),
        }
    }
}

impl Error for GltfImportError {}

impl From<gltf::Error> for GltfImportError {
    fn from(value: gltf::Error) -> Self {
        Self::Gltf(value)
    }
}

/// Name a node the way clusters refer to it.
fn node_name(node: &Node) -> String {
    node.name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()))
}

struct GltfSceneLoader<'a> {
    document: &'a Document,
    buffers: &'a [gltf::buffer::Data],
    options: &'a ImportOptions,
    joints: HashSet<usize>,
    node_ids: HashMap<usize, NodeId>,
    scene: MemoryScene,
}

impl<'a> GltfSceneLoader<'a> {
    fn new(
        document: &'a Document,
        buffers: &'a [gltf::buffer::Data],
        options: &'a ImportOptions,
        time_mode: TimeMode,
    ) -> Self {
        let joints = document
            .skins()
            .flat_map(|skin| skin.joints().map(|joint| joint.index()).collect::<Vec<_>>())
            .collect();
        Self {
            document,
            buffers,
            options,
            joints,
            node_ids: HashMap::new(),
            scene: MemoryScene::new()
                .with_time_mode(time_mode)
                .with_axis(AxisConvention::YUp),
        }
    }

    fn buffer(&self, buffer: gltf::Buffer) -> Option<&'a [u8]> {
        self.buffers.get(buffer.index()).map(|data| data.0.as_slice())
    }

    fn load_mesh(&self, node: &Node) -> Result<Option<MeshAttribute>, GltfImportError> {
        let Some(mesh) = node.mesh() else {
            return Ok(None);
        };

        let mut control_points: Vec<Vec3> = Vec::new();
        let mut polygon_vertices: Vec<u32> = Vec::new();
        let mut normals: Option<Vec<Vec3>> = Some(Vec::new());
        let mut uvs: Option<Vec<Vec2>> = Some(Vec::new());
        let mut influences: Vec<(u32, [u16; 4], [f32; 4])> = Vec::new();

        for primitive in mesh.primitives() {
            if primitive.mode() != Mode::Triangles {
                return Err(GltfImportError::UnsupportedPrimitiveMode(primitive.mode()));
            }
            let reader = primitive.reader(|buffer| self.buffer(buffer));
            let positions: Vec<Vec3> = reader
                .read_positions()
                .ok_or(GltfImportError::MissingPositions {
                    mesh: mesh.index(),
                    primitive: primitive.index(),
                })?
                .map(Vec3::from_array)
                .collect();
            let offset = control_points.len() as u32;
            let count = positions.len() as u32;

            match reader.read_indices() {
                Some(indices) => polygon_vertices
                    .extend(indices.into_u32().map(|index| offset + index)),
                None => polygon_vertices.extend(offset..offset + count),
            }

            normals = normals.and_then(|mut normals| {
                let read = reader.read_normals()?;
                normals.extend(read.map(Vec3::from_array));
                Some(normals)
            });
            uvs = uvs.and_then(|mut uvs| {
                let read = reader.read_tex_coords(0)?;
                uvs.extend(read.into_f32().map(Vec2::from_array));
                Some(uvs)
            });

            if let (Some(joints), Some(weights)) = (reader.read_joints(0), reader.read_weights(0))
            {
                influences.extend(
                    joints
                        .into_u16()
                        .zip(weights.into_f32())
                        .enumerate()
                        .map(|(index, (joints, weights))| (offset + index as u32, joints, weights)),
                );
            }

            control_points.extend(positions);
        }

        let polygon_sizes = vec![3; polygon_vertices.len() / 3];
        let mut attribute = MeshAttribute {
            name: mesh.name().map(str::to_string),
            control_points,
            polygon_sizes,
            normals: normals.map(|normals| {
                LayerElement::indexed(
                    MappingMode::ByPolygonVertex,
                    normals,
                    polygon_vertices.clone(),
                )
            }),
            uvs: uvs.map(|uvs| {
                LayerElement::indexed(MappingMode::ByPolygonVertex, uvs, polygon_vertices.clone())
            }),
            polygon_vertices,
            deformers: Vec::new(),
        };

        if let Some(skin) = node.skin() {
            let reader = skin.reader(|buffer| self.buffer(buffer));
            let inverse_bind_matrices: Vec<Mat4> = reader
                .read_inverse_bind_matrices()
                .map(|matrices| matrices.map(|matrix| Mat4::from_cols_array_2d(&matrix)).collect())
                .unwrap_or_default();
            let mut clusters: Vec<Cluster> = skin
                .joints()
                .enumerate()
                .map(|(index, joint)| {
                    let inverse_bind = inverse_bind_matrices
                        .get(index)
                        .copied()
                        .unwrap_or(Mat4::IDENTITY);
                    let mut cluster = Cluster::new(node_name(&joint))
                        .with_bind_pose(Mat4::IDENTITY, inverse_bind.inverse());
                    cluster.link_mode = ClusterLinkMode::Normalize;
                    cluster
                })
                .collect();
            for (control_point, joints, weights) in influences {
                for (joint, weight) in joints.into_iter().zip(weights) {
                    if weight <= 0.0 {
                        continue;
                    }
                    match clusters.get_mut(joint as usize) {
                        Some(cluster) => {
                            cluster.indices.push(control_point);
                            cluster.weights.push(weight);
                        }
                        None => warn!(
                            "Joint #{} out of range for skin #{}, influence dropped",
                            joint,
                            skin.index()
                        ),
                    }
                }
            }
            attribute
                .deformers
                .push(Deformer::Skin(SkinDeformer { clusters }));
        }

        Ok(Some(attribute))
    }

    fn load_node(&mut self, node: Node, parent: NodeId) -> Result<(), GltfImportError> {
        let attribute = if self.joints.contains(&node.index()) {
            NodeAttribute::Skeleton(SkeletonAttribute::default())
        } else if self.options.only_animation {
            NodeAttribute::Null
        } else {
            self.load_mesh(&node)?
                .map(NodeAttribute::Mesh)
                .unwrap_or_default()
        };

        let id = self.scene.add_node(parent, node_name(&node), attribute);
        let (translation, rotation, scale) = node.transform().decomposed();
        self.scene.set_transform(
            id,
            DecomposedTransform {
                translation: Vec3::from_array(translation),
                rotation: Quat::from_array(rotation),
                scale: Vec3::from_array(scale),
            },
        );
        self.node_ids.insert(node.index(), id);

        for child in node.children() {
            self.load_node(child, id)?;
        }
        Ok(())
    }

    fn load_channel(&self, channel: &Channel) -> Option<AnimationChannel> {
        let reader = channel.reader(|buffer| self.buffer(buffer));
        let times: Vec<f32> = reader.read_inputs()?.collect();
        let interpolation = channel.sampler().interpolation();

        fn keyframes<T: std::fmt::Debug + Clone>(
            times: &[f32],
            values: Vec<T>,
            interpolation: Interpolation,
        ) -> AnimationKeyFrames<T> {
            match interpolation {
                Interpolation::Linear => AnimationKeyFrames::Linear(
                    times
                        .iter()
                        .zip(values)
                        .map(|(time, value)| AnimationKeyFrame { time: *time, value })
                        .collect(),
                ),
                Interpolation::Step => AnimationKeyFrames::Step(
                    times
                        .iter()
                        .zip(values)
                        .map(|(time, value)| AnimationKeyFrame { time: *time, value })
                        .collect(),
                ),
                Interpolation::CubicSpline => AnimationKeyFrames::CubicSpline(
                    times
                        .iter()
                        .zip(values.chunks_exact(3))
                        .map(|(time, chunk)| AnimationKeyFrame {
                            time: *time,
                            value: (chunk[0].clone(), chunk[1].clone(), chunk[2].clone()),
                        })
                        .collect(),
                ),
            }
        }

        match reader.read_outputs()? {
            ReadOutputs::Translations(values) => Some(AnimationChannel::Translation(keyframes(
                &times,
                values.map(Vec3::from_array).collect(),
                interpolation,
            ))),
            ReadOutputs::Rotations(values) => Some(AnimationChannel::Rotation(keyframes(
                &times,
                values.into_f32().map(Quat::from_array).collect(),
                interpolation,
            ))),
            ReadOutputs::Scales(values) => Some(AnimationChannel::Scale(keyframes(
                &times,
                values.map(Vec3::from_array).collect(),
                interpolation,
            ))),
            ReadOutputs::MorphTargetWeights(_) => {
                warn!(
                    "Morph target weight channel on node #{} skipped",
                    channel.target().node().index()
                );
                None
            }
        }
    }

    fn load_animation(&self, animation: &Animation) -> AnimationStack {
        let mut layer = AnimationLayer::default();
        for channel in animation.channels() {
            let target = channel.target().node().index();
            let Some(node) = self.node_ids.get(&target) else {
                debug!("Channel targets node #{} outside the loaded scene", target);
                continue;
            };
            if let Some(channel) = self.load_channel(&channel) {
                layer.add_channel(*node, channel);
            }
        }
        let length = layer.length();
        AnimationStack {
            name: animation
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("animation_{}", animation.index())),
            span: TimeSpan::new(SceneTime::ZERO, SceneTime::from_seconds(length as f64)),
            layers: vec![layer],
        }
    }

    fn load(mut self) -> Result<MemoryScene, GltfImportError> {
        let scene = self
            .document
            .default_scene()
            .or_else(|| self.document.scenes().next())
            .ok_or(GltfImportError::NoScene)?;
        let root = self.scene.root();
        for node in scene.nodes() {
            self.load_node(node, root)?;
        }
        for animation in self.document.animations() {
            let stack = self.load_animation(&animation);
            self.scene.add_animation_stack(stack);
        }
        self.scene.convert_axis(self.options.axis);
        Ok(self.scene)
    }
}

/// Build a scene from a GLTF or GLB file held in memory. Buffers must be
/// embedded (GLB chunk or data URI).
pub fn load_gltf_from_buffer(
    buffer: &[u8],
    options: &ImportOptions,
    time_mode: TimeMode,
) -> Result<MemoryScene, GltfImportError> {
    let (document, buffers, _images) = gltf::import_slice(buffer)?;
    GltfSceneLoader::new(&document, &buffers, options, time_mode).load()
}

/// Build a scene from a GLTF or GLB file on disk.
pub fn load_gltf_from_path(
    path: &Path,
    options: &ImportOptions,
    time_mode: TimeMode,
) -> Result<MemoryScene, GltfImportError> {
    let (document, buffers, _images) = gltf::import(path)?;
    GltfSceneLoader::new(&document, &buffers, options, time_mode).load()
}

/// File-backed scene provider. GLTF carries no frame rate, so animation
/// stacks are sampled at `time_mode`.
#[derive(Debug, Clone, Default)]
pub struct GltfImporter {
    pub time_mode: TimeMode,
}

impl GltfImporter {
    pub fn new(time_mode: TimeMode) -> Self {
        Self { time_mode }
    }
}

impl SceneImporter for GltfImporter {
    type Scene = MemoryScene;
    type Error = GltfImportError;

    fn import(&mut self, path: &Path, options: &ImportOptions) -> Result<MemoryScene, Self::Error> {
        let scene = load_gltf_from_path(path, options, self.time_mode)?;
        debug!("Imported {} ({} nodes)", path.display(), scene.node_count());
        Ok(scene)
    }
}

#[cfg(test)]
mod test {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use glam::{Mat4, Vec3};

    use super::load_gltf_from_buffer;
    use crate::{
        mesh::MappingMode,
        node::NodeAttribute,
        scene::{AxisConvention, ImportOptions, SceneGraph},
        skin::Deformer,
        time::{SceneTime, TimeMode},
    };

    const DOCUMENT: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0, 1] }],
        "nodes": [
            { "name": "Body", "mesh": 0, "skin": 0 },
            { "name": "Root", "translation": [0.0, 1.0, 0.0] }
        ],
        "meshes": [{
            "primitives": [{
                "attributes": { "POSITION": 0, "JOINTS_0": 1, "WEIGHTS_0": 2 }
            }]
        }],
        "skins": [{ "joints": [1], "inverseBindMatrices": 3 }],
        "animations": [{
            "name": "Move",
            "samplers": [{ "input": 4, "output": 5, "interpolation": "LINEAR" }],
            "channels": [{ "sampler": 0, "target": { "node": 1, "path": "translation" } }]
        }],
        "buffers": [{ "byteLength": 192, "uri": "URI" }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 12 },
            { "buffer": 0, "byteOffset": 48, "byteLength": 48 },
            { "buffer": 0, "byteOffset": 96, "byteLength": 64 },
            { "buffer": 0, "byteOffset": 160, "byteLength": 8 },
            { "buffer": 0, "byteOffset": 168, "byteLength": 24 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "bufferView": 1, "componentType": 5121, "count": 3, "type": "VEC4" },
            { "bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC4" },
            { "bufferView": 3, "componentType": 5126, "count": 1, "type": "MAT4" },
            { "bufferView": 4, "componentType": 5126, "count": 2, "type": "SCALAR",
              "min": [0.0], "max": [1.0] },
            { "bufferView": 5, "componentType": 5126, "count": 2, "type": "VEC3" }
        ]
    }"#;

    fn document() -> Vec<u8> {
        fn push_f32(data: &mut Vec<u8>, values: &[f32]) {
            values
                .iter()
                .for_each(|value| data.extend_from_slice(&value.to_le_bytes()));
        }

        let mut data: Vec<u8> = Vec::new();
        push_f32(&mut data, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        data.extend_from_slice(&[0; 12]);
        for _ in 0..3 {
            push_f32(&mut data, &[1.0, 0.0, 0.0, 0.0]);
        }
        let inverse_bind = Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0));
        push_f32(&mut data, &inverse_bind.to_cols_array());
        push_f32(&mut data, &[0.0, 1.0]);
        push_f32(&mut data, &[0.0, 1.0, 0.0, 0.0, 3.0, 0.0]);
        assert_eq!(data.len(), 192);

        let uri = format!("data:application/octet-stream;base64,{}", STANDARD.encode(&data));
        DOCUMENT.replace("\"URI\"", &format!("\"{}\"", uri)).into_bytes()
    }

    #[test]
    fn test_load_skinned_triangle() {
        let scene = load_gltf_from_buffer(
            &document(),
            &ImportOptions::default(),
            TimeMode::Frames30,
        )
        .unwrap();

        let children = scene.children(scene.root()).to_vec();
        assert_eq!(children.len(), 2);
        assert_eq!(scene.name(children[0]), "Body");
        assert!(scene.attribute(children[1]).is_skeleton());

        let mesh = scene.attribute(children[0]).as_mesh().unwrap();
        assert_eq!(mesh.polygon_vertex_count(), 3);
        assert!(mesh.is_triangulated());
        assert!(mesh.normals.is_none());
        assert!(mesh.uvs.is_none());

        let Deformer::Skin(skin) = &mesh.deformers[0] else {
            panic!("expected skin deformer");
        };
        let cluster = &skin.clusters[0];
        assert_eq!(cluster.link.as_deref(), Some("Root"));
        assert_eq!(cluster.indices, vec![0, 1, 2]);
        assert_eq!(cluster.weights, vec![1.0, 1.0, 1.0]);
        let offset = cluster.transform_link.inverse() * cluster.transform;
        assert!(offset.abs_diff_eq(Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)), 1e-6));

        let stacks = scene.animation_stacks();
        assert_eq!(stacks.len(), 1);
        assert_eq!(stacks[0].name, "Move");
        assert_eq!(stacks[0].layer_count, 1);
        assert_eq!(stacks[0].span.stop, SceneTime(1.0));
    }

    #[test]
    fn test_only_animation_drops_mesh() {
        let options = ImportOptions {
            only_animation: true,
            axis: AxisConvention::YUp,
        };
        let scene = load_gltf_from_buffer(&document(), &options, TimeMode::Frames30).unwrap();
        let body = scene.find_node("Body").unwrap();
        assert!(matches!(scene.attribute(body), NodeAttribute::Null));
        assert_eq!(scene.animation_stacks().len(), 1);
    }

    #[test]
    fn test_animation_drives_joint() {
        let mut scene =
            load_gltf_from_buffer(&document(), &ImportOptions::default(), TimeMode::Frames30)
                .unwrap();
        let joint = scene.find_node("Root").unwrap();
        scene.set_current_stack(0);
        let translation = scene
            .evaluate_local_transform(joint, SceneTime(0.5))
            .w_axis
            .truncate();
        assert!(translation.abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-5));
    }

    #[test]
    fn test_indexed_layers_map_by_polygon_vertex() {
        let document = String::from_utf8(document())
            .unwrap()
            .replace("\"WEIGHTS_0\": 2", "\"WEIGHTS_0\": 2, \"NORMAL\": 0");
        let scene = load_gltf_from_buffer(
            document.as_bytes(),
            &ImportOptions::default(),
            TimeMode::Frames30,
        )
        .unwrap();
        let body = scene.find_node("Body").unwrap();
        let normals = scene.attribute(body).as_mesh().unwrap().normals.clone().unwrap();
        assert_eq!(normals.mapping, MappingMode::ByPolygonVertex);
        assert_eq!(normals.index, vec![0, 1, 2]);
    }
}
