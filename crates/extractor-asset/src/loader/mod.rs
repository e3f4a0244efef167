/// GLTF and GLB importer with `gltf` crate.
#[cfg(feature = "gltf")]
pub mod gltf;
