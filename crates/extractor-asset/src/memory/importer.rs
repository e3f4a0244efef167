use std::{
    collections::HashMap,
    error::Error,
    fmt::{self, Display, Formatter},
    path::{Path, PathBuf},
};

use log::debug;

use crate::scene::{ImportOptions, SceneImporter};

use super::MemoryScene;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryImportError {
    NotFound(PathBuf),
}

impl Display for MemoryImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MemoryImportError::NotFound(path) => {
                write!(f, "No scene registered for {}", path.display())
            }
        }
    }
}

impl Error for MemoryImportError {}

/// Importer serving scenes registered under a path. Every import hands out
/// a fresh copy, so the registered scene is never touched by extraction.
#[derive(Debug, Clone, Default)]
pub struct MemoryImporter {
    scenes: HashMap<PathBuf, MemoryScene>,
}

impl MemoryImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: impl Into<PathBuf>, scene: MemoryScene) {
        self.scenes.insert(path.into(), scene);
    }
}

impl SceneImporter for MemoryImporter {
    type Scene = MemoryScene;
    type Error = MemoryImportError;

    fn import(&mut self, path: &Path, options: &ImportOptions) -> Result<MemoryScene, Self::Error> {
        let mut scene = self
            .scenes
            .get(path)
            .cloned()
            .ok_or_else(|| MemoryImportError::NotFound(path.to_path_buf()))?;
        debug!("Imported {} ({} nodes)", path.display(), scene.node_count());
        if options.only_animation {
            scene.strip_meshes();
        }
        scene.convert_axis(options.axis);
        Ok(scene)
    }
}
