use std::{collections::HashMap, convert::Infallible, mem, path::Path};

use extractor_asset::{
    node::NodeId,
    scene::{AxisConvention, ImportOptions, SceneGraph, SceneImporter},
};
use glam::Mat4;
use log::{debug, info};

use crate::{
    animation::sample_animation_stacks,
    bone::BoneHierarchy,
    context::ExtractionContext,
    error::ExtractError,
    mesh,
    params::ExtractParams,
    result::{AnimationClip, ExtractionResult, Vertex},
    skin::extract_skin_weights,
    traverse::first_mesh_node,
    weight::normalize_control_points,
};

/// Imports scenes through `I` and extracts them, one at a time. The
/// importer is created once and reused; each import starts from a cleared
/// context.
pub struct Extractor<I: SceneImporter> {
    importer: I,
    params: ExtractParams,
    context: ExtractionContext,
}

impl<I: SceneImporter> Extractor<I> {
    pub fn new(importer: I) -> Self {
        Self::with_params(importer, ExtractParams::default())
    }

    pub fn with_params(importer: I, params: ExtractParams) -> Self {
        Self {
            importer,
            params,
            context: ExtractionContext::new(),
        }
    }

    pub fn params(&self) -> &ExtractParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ExtractParams {
        &mut self.params
    }

    pub fn importer_mut(&mut self) -> &mut I {
        &mut self.importer
    }

    /// Import `path` and run every extraction pass over it. On failure the
    /// context is cleared, so no partial buffers stay observable.
    pub fn import_and_extract(
        &mut self,
        path: impl AsRef<Path>,
        only_animation: bool,
        z_up: bool,
    ) -> Result<(), ExtractError<I::Error>> {
        let path = path.as_ref();
        self.reset();

        let options = ImportOptions {
            only_animation,
            axis: if z_up {
                AxisConvention::ZUp
            } else {
                AxisConvention::YUp
            },
        };
        let mut scene = self
            .importer
            .import(path, &options)
            .map_err(ExtractError::Import)?;
        info!("Imported {}", path.display());

        self.extract_scene(&mut scene, only_animation)
    }

    /// Run every extraction pass over a scene the caller already holds.
    pub fn extract_scene<S: SceneGraph + ?Sized>(
        &mut self,
        scene: &mut S,
        only_animation: bool,
    ) -> Result<(), ExtractError<I::Error>> {
        self.reset();
        let result = run(scene, only_animation, &self.params, &mut self.context);
        if result.is_err() {
            self.reset();
        }
        result
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.context.result.vertices
    }

    pub fn bone_names(&self) -> &[String] {
        &self.context.result.bone_names
    }

    pub fn bone_parent_indices(&self) -> &[i32] {
        &self.context.result.bone_parent_indices
    }

    pub fn offset_matrices(&self) -> &[Mat4] {
        &self.context.result.offset_matrices
    }

    pub fn animation_clips(&self) -> &HashMap<String, AnimationClip> {
        &self.context.result.animation_clips
    }

    /// Whether the skin's last resolved cluster links in normalize mode.
    ///
    /// Informational only: skin weights are rescaled to sum to one whatever
    /// the link mode, so this flag never changes the vertex buffer.
    pub fn skin_link_normalized(&self) -> bool {
        self.context.skin_link_normalized
    }

    /// Whether the extracted mesh carried texture coordinates. Without them
    /// every vertex holds [`ExtractParams::default_uv`].
    pub fn has_uv(&self) -> bool {
        self.context.has_uv
    }

    pub fn result(&self) -> &ExtractionResult {
        &self.context.result
    }

    /// Move the extracted data out, leaving the extractor reset.
    pub fn take_result(&mut self) -> ExtractionResult {
        mem::take(&mut self.context).into_result()
    }

    pub fn reset(&mut self) {
        self.context.reset();
    }

    pub fn is_empty(&self) -> bool {
        self.context.is_empty()
    }
}

/// Extract a scene without an importer.
pub fn extract<S: SceneGraph + ?Sized>(
    scene: &mut S,
    only_animation: bool,
    params: &ExtractParams,
) -> Result<ExtractionResult, ExtractError<Infallible>> {
    let mut context = ExtractionContext::new();
    run(scene, only_animation, params, &mut context)?;
    Ok(context.into_result())
}

fn run<S: SceneGraph + ?Sized, E>(
    scene: &mut S,
    only_animation: bool,
    params: &ExtractParams,
    context: &mut ExtractionContext,
) -> Result<(), ExtractError<E>> {
    context.bones = BoneHierarchy::from_scene(scene);
    context.result.bone_names = context.bones.names();
    context.result.bone_parent_indices = context.bones.parent_indices();
    context.result.offset_matrices = vec![Mat4::IDENTITY; context.bones.len()];
    debug!("Found {} bones", context.bones.len());

    if only_animation {
        debug!("Animation only, mesh pass skipped");
    } else if let Some(node) = first_mesh_node(scene) {
        extract_mesh(scene, node, params, context)?;
    } else {
        debug!("Scene has no mesh");
    }

    if !scene.animation_stacks().is_empty() {
        context.result.animation_clips =
            sample_animation_stacks(scene, params.clip_name_collision)?;
    }

    info!(
        "Extracted {} vertices, {} bones, {} animation clips",
        context.result.vertices.len(),
        context.result.bone_count(),
        context.result.animation_clips.len()
    );
    Ok(())
}

fn extract_mesh<S: SceneGraph + ?Sized, E>(
    scene: &mut S,
    node: NodeId,
    params: &ExtractParams,
    context: &mut ExtractionContext,
) -> Result<(), ExtractError<E>> {
    mesh::validate_source_layers(mesh::mesh_of(scene, node)?)?;
    mesh::triangulate_if_needed(scene, node)?;
    mesh::repair_normals(scene, node, params)?;

    let mesh = mesh::mesh_of(scene, node)?;
    mesh::validate(mesh)?;
    context.has_mesh = true;
    context.has_uv = mesh.uvs.is_some();

    if !context.bones.is_empty() {
        let weights =
            extract_skin_weights(mesh, &context.bones, &mut context.result.offset_matrices);
        context.skin_link_normalized = weights.normalize_link_mode;
        if weights.has_influences() {
            context.control_point_weights =
                normalize_control_points(&weights.control_points, params.zero_weight);
        }
        debug!(
            "Mesh {} skinned by {} clusters",
            scene.name(node),
            weights.resolved_clusters
        );
    }

    let skin = (!context.control_point_weights.is_empty())
        .then_some(context.control_point_weights.as_slice());
    context.result.vertices = mesh::flatten(mesh, skin, params)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use extractor_asset::{
        animation::{
            AnimationChannel, AnimationKeyFrame, AnimationKeyFrames, AnimationLayer,
            AnimationStack,
        },
        memory::{MemoryImportError, MemoryImporter, MemoryScene},
        mesh::{LayerElement, MappingMode, MeshAttribute},
        node::{DecomposedTransform, NodeAttribute, SkeletonAttribute},
        scene::SceneGraph,
        skin::{Cluster, Deformer, SkinDeformer},
        time::{SceneTime, TimeSpan},
        topology::TopologyError,
    };
    use glam::{Mat4, Quat, Vec2, Vec3};

    use super::{extract, Extractor};
    use crate::{
        error::{ExtractError, ValidationError},
        params::ExtractParams,
    };

    fn bone() -> NodeAttribute {
        NodeAttribute::Skeleton(SkeletonAttribute::default())
    }

    fn triangle() -> MeshAttribute {
        MeshAttribute::from_polygons(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            &[&[0, 1, 2]],
        )
    }

    /// One root bone weighting all three control points of a triangle.
    fn skinned_triangle() -> MemoryScene {
        let mut scene = MemoryScene::new();
        scene.add_node(scene.root(), "Root", bone());
        let mut mesh = triangle();
        mesh.deformers.push(Deformer::Skin(SkinDeformer {
            clusters: vec![Cluster::new("Root")
                .with_bind_pose(
                    Mat4::IDENTITY,
                    Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)),
                )
                .with_influence(0, 1.0)
                .with_influence(1, 1.0)
                .with_influence(2, 1.0)],
        }));
        scene.add_node(scene.root(), "Body", NodeAttribute::Mesh(mesh));
        scene
    }

    /// A bone that rotates a quarter turn over one second.
    fn animated_scene() -> MemoryScene {
        let mut scene = skinned_triangle();
        let root = scene.find_node("Root").unwrap();
        scene.set_transform(
            root,
            DecomposedTransform {
                translation: Vec3::new(0.0, 1.0, 0.0),
                ..Default::default()
            },
        );
        let mut layer = AnimationLayer::default();
        layer.add_channel(
            root,
            AnimationChannel::Rotation(AnimationKeyFrames::Linear(vec![
                AnimationKeyFrame {
                    time: 0.0,
                    value: Quat::IDENTITY,
                },
                AnimationKeyFrame {
                    time: 1.0,
                    value: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
                },
            ])),
        );
        scene.add_animation_stack(AnimationStack {
            name: String::from("Turn"),
            span: TimeSpan::new(SceneTime::ZERO, SceneTime(1.0)),
            layers: vec![layer],
        });
        scene
    }

    #[test]
    fn test_single_bone_triangle() {
        let mut scene = skinned_triangle();
        let result = extract(&mut scene, false, &ExtractParams::default()).unwrap();
        assert_eq!(result.bone_parent_indices, vec![-1]);
        assert_eq!(result.bone_names, vec![String::from("Root")]);
        assert_eq!(result.offset_matrices.len(), 1);
        assert!(result.offset_matrices[0]
            .abs_diff_eq(Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)), 1e-6));
        assert_eq!(result.vertices.len(), 3);
        for vertex in &result.vertices {
            assert_eq!(vertex.weight, [1.0, 0.0, 0.0, 0.0]);
            assert_eq!(vertex.bone_index[0], 0);
        }
        assert!(result.animation_clips.is_empty());
        assert_eq!(result.validate(), Ok(()));
    }

    #[test]
    fn test_mesh_without_skeleton() {
        let mut scene = MemoryScene::new();
        scene.add_node(scene.root(), "Body", NodeAttribute::Mesh(triangle()));
        let result = extract(&mut scene, false, &ExtractParams::default()).unwrap();
        assert!(result.bone_parent_indices.is_empty());
        assert!(result.offset_matrices.is_empty());
        assert_eq!(result.vertices.len(), 3);
        for vertex in &result.vertices {
            assert_eq!(vertex.uv, [0.5, 0.5]);
            assert_eq!(vertex.weight, [0.0; 4]);
            assert_eq!(vertex.bone_index, [0; 4]);
        }

        let mut mesh = triangle();
        mesh.uvs = Some(LayerElement::direct(
            MappingMode::ByPolygonVertex,
            vec![Vec2::ZERO, Vec2::X, Vec2::Y],
        ));
        let mut scene = MemoryScene::new();
        scene.add_node(scene.root(), "Body", NodeAttribute::Mesh(mesh));
        let result = extract(&mut scene, false, &ExtractParams::default()).unwrap();
        let uvs: Vec<[f32; 2]> = result.vertices.iter().map(|vertex| vertex.uv).collect();
        assert_eq!(uvs, vec![[0.0, 1.0], [1.0, 1.0], [0.0, 0.0]]);
    }

    #[test]
    fn test_skeleton_without_skin_keeps_weights_zeroed() {
        let mut scene = MemoryScene::new();
        scene.add_node(scene.root(), "Root", bone());
        scene.add_node(scene.root(), "Body", NodeAttribute::Mesh(triangle()));
        let result = extract(&mut scene, false, &ExtractParams::default()).unwrap();
        assert_eq!(result.offset_matrices, vec![Mat4::IDENTITY]);
        assert!(result.vertices.iter().all(|vertex| vertex.weight == [0.0; 4]));
    }

    #[test]
    fn test_quad_is_triangulated() {
        let mut scene = MemoryScene::new();
        let quad = MeshAttribute::from_polygons(
            vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y, Vec3::new(0.0, 2.0, 0.0)],
            &[&[0, 1, 2, 3], &[3, 2, 4]],
        );
        let node = scene.add_node(scene.root(), "Quad", NodeAttribute::Mesh(quad));
        let result = extract(&mut scene, false, &ExtractParams::default()).unwrap();
        let mesh = scene.attribute(node).as_mesh().unwrap();
        assert!(mesh.is_triangulated());
        assert_eq!(result.vertices.len(), 9);
        assert_eq!(result.vertices.len(), mesh.polygon_vertex_count());
    }

    #[test]
    fn test_fatal_errors() {
        let mut scene = MemoryScene::new();
        let line = MeshAttribute::from_polygons(vec![Vec3::ZERO, Vec3::X], &[&[0, 1]]);
        scene.add_node(scene.root(), "Line", NodeAttribute::Mesh(line));
        assert!(matches!(
            extract(&mut scene, false, &ExtractParams::default()),
            Err(ExtractError::Topology(TopologyError::Triangulation { .. }))
        ));

        let mut mesh = triangle();
        mesh.uvs = Some(LayerElement::direct(
            MappingMode::ByPolygonVertex,
            vec![Vec2::ZERO; 2],
        ));
        let mut scene = MemoryScene::new();
        scene.add_node(scene.root(), "Body", NodeAttribute::Mesh(mesh));
        assert!(matches!(
            extract(&mut scene, false, &ExtractParams::default()),
            Err(ExtractError::Validation(ValidationError::ElementCount { .. }))
        ));
    }

    #[test]
    fn test_bad_layer_count_fails_before_triangulation() {
        let mut quad = MeshAttribute::from_polygons(
            vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
            &[&[0, 1, 2, 3]],
        );
        quad.normals = Some(LayerElement::direct(
            MappingMode::ByPolygonVertex,
            vec![Vec3::Z; 9],
        ));
        let mut scene = MemoryScene::new();
        let node = scene.add_node(scene.root(), "Quad", NodeAttribute::Mesh(quad));
        assert!(matches!(
            extract(&mut scene, false, &ExtractParams::default()),
            Err(ExtractError::Validation(ValidationError::ElementCount {
                expected: 4,
                actual: 9,
                ..
            }))
        ));
        assert!(!scene.attribute(node).as_mesh().unwrap().is_triangulated());

        let mut triangle = triangle();
        triangle.normals = Some(LayerElement::direct(
            MappingMode::ByPolygonVertex,
            vec![Vec3::Z; 4],
        ));
        let mut scene = MemoryScene::new();
        scene.add_node(scene.root(), "Triangle", NodeAttribute::Mesh(triangle));
        assert!(matches!(
            extract(&mut scene, false, &ExtractParams::default()),
            Err(ExtractError::Validation(ValidationError::ElementCount {
                expected: 3,
                actual: 4,
                ..
            }))
        ));
    }

    #[test]
    fn test_infinite_stack_fails_import() {
        let mut scene = animated_scene();
        let root = scene.find_node("Root").unwrap();
        let mut layer = AnimationLayer::default();
        layer.add_channel(
            root,
            AnimationChannel::Scale(AnimationKeyFrames::Step(vec![AnimationKeyFrame {
                time: f32::MAX,
                value: Vec3::ONE,
            }])),
        );
        scene.add_animation_stack(AnimationStack {
            name: String::from("Broken"),
            span: TimeSpan::new(SceneTime::ZERO, SceneTime(f64::INFINITY)),
            layers: vec![layer],
        });
        assert!(matches!(
            extract(&mut scene, true, &ExtractParams::default()),
            Err(ExtractError::Validation(ValidationError::FrameRange { .. }))
        ));
    }

    #[test]
    fn test_only_animation_skips_mesh() {
        let mut scene = animated_scene();
        let result = extract(&mut scene, true, &ExtractParams::default()).unwrap();
        assert!(result.vertices.is_empty());
        assert_eq!(result.bone_count(), 1);
        assert_eq!(result.animation_clips["Turn"].bone_tracks[0].len(), 30);
    }

    #[test]
    fn test_animated_bone() {
        let mut scene = animated_scene();
        let result = extract(&mut scene, false, &ExtractParams::default()).unwrap();
        assert_eq!(result.validate(), Ok(()));
        let track = &result.animation_clips["Turn"].bone_tracks[0];
        let key = track.keyframes()[15];
        assert!((key.time_pos - 0.5).abs() < 1e-6);
        assert!(key.translation.abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-6));
        let expected = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        assert!(key.rotation.dot(expected).abs() > 1.0 - 1e-5);
        assert!((result.animation_clips["Turn"].duration() - 29.0 / 30.0).abs() < 1e-5);
    }

    #[test]
    fn test_reset_idempotence() {
        let mut importer = MemoryImporter::new();
        importer.register("character.mem", animated_scene());
        let mut extractor = Extractor::new(importer);

        extractor.import_and_extract("character.mem", false, false).unwrap();
        let first = extractor.result().clone();
        assert!(!first.is_empty());
        assert!(extractor.skin_link_normalized());
        assert!(!extractor.has_uv());

        extractor.reset();
        assert!(extractor.is_empty());
        assert!(extractor.vertices().is_empty());
        assert!(extractor.bone_parent_indices().is_empty());
        assert!(extractor.offset_matrices().is_empty());
        assert!(extractor.animation_clips().is_empty());

        extractor.import_and_extract("character.mem", false, false).unwrap();
        assert_eq!(extractor.take_result(), first);
        assert!(extractor.is_empty());
    }

    #[test]
    fn test_failed_import_clears_state() {
        let mut importer = MemoryImporter::new();
        importer.register("character.mem", skinned_triangle());
        let mut extractor = Extractor::new(importer);
        extractor.import_and_extract("character.mem", false, false).unwrap();
        assert_eq!(extractor.vertices().len(), 3);

        let error = extractor
            .import_and_extract("missing.mem", false, false)
            .unwrap_err();
        assert!(matches!(
            error,
            ExtractError::Import(MemoryImportError::NotFound(ref path)) if path == Path::new("missing.mem")
        ));
        assert!(extractor.is_empty());

        let mut broken = MemoryScene::new();
        let mut mesh = triangle();
        mesh.normals = Some(LayerElement::direct(MappingMode::ByPolygonVertex, vec![Vec3::Z]));
        broken.add_node(broken.root(), "Body", NodeAttribute::Mesh(mesh));
        broken.add_node(broken.root(), "Root", bone());
        extractor.importer_mut().register("broken.mem", broken);
        assert!(extractor.import_and_extract("broken.mem", false, false).is_err());
        assert!(extractor.is_empty());
    }

    #[test]
    fn test_z_up_import_rotates_top_level_bones() {
        let mut importer = MemoryImporter::new();
        importer.register("character.mem", animated_scene());
        let mut extractor = Extractor::new(importer);
        extractor.import_and_extract("character.mem", true, true).unwrap();
        let key = extractor.animation_clips()["Turn"].bone_tracks[0].keyframes()[0];
        assert!(key.translation.abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), 1e-5));
    }
}
