use std::fmt::{self, Display, Formatter};

use glam::{Vec2, Vec3};

use crate::skin::{Deformer, SkinDeformer};

/// How the entries of a layer element are laid out over the mesh surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingMode {
    ByControlPoint,
    ByPolygonVertex,
    ByPolygon,
    AllSame,
}

impl Display for MappingMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MappingMode::ByControlPoint => write!(f, "by control point"),
            MappingMode::ByPolygonVertex => write!(f, "by polygon vertex"),
            MappingMode::ByPolygon => write!(f, "by polygon"),
            MappingMode::AllSame => write!(f, "all same"),
        }
    }
}

/// How a mapped position resolves into the direct array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceMode {
    Direct,
    IndexToDirect,
}

impl Display for ReferenceMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceMode::Direct => write!(f, "direct"),
            ReferenceMode::IndexToDirect => write!(f, "index to direct"),
        }
    }
}

/// A per-surface geometry channel such as normals or texture coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerElement<T> {
    pub mapping: MappingMode,
    pub reference: ReferenceMode,
    pub direct: Vec<T>,
    pub index: Vec<u32>,
}

impl<T> LayerElement<T> {
    /// Number of mapped entries, i.e. the length the mapping mode is
    /// checked against.
    pub fn mapped_len(&self) -> usize {
        match self.reference {
            ReferenceMode::Direct => self.direct.len(),
            ReferenceMode::IndexToDirect => self.index.len(),
        }
    }
}

impl<T: Copy> LayerElement<T> {
    pub fn direct(mapping: MappingMode, direct: Vec<T>) -> Self {
        Self {
            mapping,
            reference: ReferenceMode::Direct,
            direct,
            index: Vec::new(),
        }
    }

    pub fn indexed(mapping: MappingMode, direct: Vec<T>, index: Vec<u32>) -> Self {
        Self {
            mapping,
            reference: ReferenceMode::IndexToDirect,
            direct,
            index,
        }
    }

    /// Resolve the value at a mapped position, dereferencing the index
    /// array first in index-to-direct mode.
    pub fn get(&self, position: usize) -> Option<T> {
        let direct_index = match self.reference {
            ReferenceMode::Direct => position,
            ReferenceMode::IndexToDirect => *self.index.get(position)? as usize,
        };
        self.direct.get(direct_index).copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeshAttribute {
    pub name: Option<String>,
    pub control_points: Vec<Vec3>,
    /// Control point indices of every polygon corner, polygon after polygon.
    pub polygon_vertices: Vec<u32>,
    /// Corner count of every polygon.
    pub polygon_sizes: Vec<u32>,
    pub normals: Option<LayerElement<Vec3>>,
    pub uvs: Option<LayerElement<Vec2>>,
    pub deformers: Vec<Deformer>,
}

impl MeshAttribute {
    /// Build a mesh out of polygons given as control point index lists.
    pub fn from_polygons(control_points: Vec<Vec3>, polygons: &[&[u32]]) -> Self {
        let mut polygon_vertices = Vec::new();
        let mut polygon_sizes = Vec::with_capacity(polygons.len());
        for polygon in polygons {
            polygon_vertices.extend_from_slice(polygon);
            polygon_sizes.push(polygon.len() as u32);
        }
        Self {
            control_points,
            polygon_vertices,
            polygon_sizes,
            ..Default::default()
        }
    }

    pub fn polygon_count(&self) -> usize {
        self.polygon_sizes.len()
    }

    pub fn polygon_vertex_count(&self) -> usize {
        self.polygon_vertices.len()
    }

    /// Iterate over polygons as slices of control point indices.
    pub fn polygons(&self) -> Polygons<'_> {
        Polygons {
            vertices: &self.polygon_vertices,
            sizes: self.polygon_sizes.iter(),
        }
    }

    pub fn is_triangulated(&self) -> bool {
        self.polygon_sizes.iter().all(|size| *size == 3)
    }

    pub fn skin_deformers(&self) -> impl Iterator<Item = &SkinDeformer> {
        self.deformers.iter().filter_map(|deformer| match deformer {
            Deformer::Skin(skin) => Some(skin),
            Deformer::BlendShape => None,
        })
    }
}

pub struct Polygons<'a> {
    vertices: &'a [u32],
    sizes: std::slice::Iter<'a, u32>,
}

impl<'a> Iterator for Polygons<'a> {
    type Item = &'a [u32];

    fn next(&mut self) -> Option<Self::Item> {
        let size = *self.sizes.next()? as usize;
        let vertices = self.vertices;
        let (polygon, rest) = vertices.split_at(size.min(vertices.len()));
        self.vertices = rest;
        Some(polygon)
    }
}
