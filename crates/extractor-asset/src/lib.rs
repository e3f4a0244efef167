//! Provide the scene graph consumed by the extraction pipeline.
//!
//! This library describes a hierarchical scene as a read-only capability
//! interface ([`scene::SceneGraph`]): nodes carrying a tagged attribute
//! (mesh, skeleton or nothing), skin deformers with their clusters, and
//! animation stacks evaluated per node at an arbitrary time. An in-memory
//! implementation is provided for synthetic scenes, and an importer built
//! upon the `gltf` crate turns GLTF and GLB files into such a scene.
//!
pub mod animation;
/// Scene importers for various formats
pub mod loader;
pub mod memory;
pub mod mesh;
pub mod node;
pub mod scene;
pub mod skin;
pub mod time;
pub mod topology;
