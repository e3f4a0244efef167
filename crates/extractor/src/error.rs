use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use extractor_asset::{
    mesh::{MappingMode, ReferenceMode},
    topology::TopologyError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Normal,
    Uv,
}

impl Display for LayerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Normal => write!(f, "normal"),
            LayerKind::Uv => write!(f, "UV"),
        }
    }
}

/// Geometry or animation data the extractor refuses to read.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    MissingNormals,
    NormalMapping(MappingMode),
    UvMapping(MappingMode),
    ElementCount {
        element: LayerKind,
        reference: ReferenceMode,
        expected: usize,
        actual: usize,
    },
    ElementIndexOutOfBounds {
        element: LayerKind,
        index: usize,
        len: usize,
    },
    ControlPointOutOfBounds {
        index: u32,
        len: usize,
    },
    /// Stack span that is not finite or holds too many frames to sample.
    FrameRange {
        stack: String,
        start: f64,
        stop: f64,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingNormals => write!(f, "Mesh has no normals"),
            ValidationError::NormalMapping(mapping) => {
                write!(f, "Unsupported normal mapping mode: {}", mapping)
            }
            ValidationError::UvMapping(mapping) => {
                write!(f, "Unsupported UV mapping mode: {}", mapping)
            }
            ValidationError::ElementCount {
                element,
                reference,
                expected,
                actual,
            } => write!(
                f,
                "Bad {} element count in {} mode: expected {}, but got {}",
                element, reference, expected, actual
            ),
            ValidationError::ElementIndexOutOfBounds {
                element,
                index,
                len,
            } => write!(
                f,
                "{} element index {} out of bounds of {} entries",
                element, index, len
            ),
            ValidationError::ControlPointOutOfBounds { index, len } => write!(
                f,
                "Control point index {} out of bounds of {} control points",
                index, len
            ),
            ValidationError::FrameRange { stack, start, stop } => write!(
                f,
                "Cannot sample animation stack {:?} from {}s to {}s",
                stack, start, stop
            ),
        }
    }
}

impl Error for ValidationError {}

/// Fatal error of one import. `E` is the error type of the scene importer.
#[derive(Debug)]
pub enum ExtractError<E> {
    Import(E),
    Topology(TopologyError),
    Validation(ValidationError),
}

impl<E: Display> Display for ExtractError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::Import(error) => write!(f, "Import failed: {}", error),
            ExtractError::Topology(error) => Display::fmt(error, f),
            ExtractError::Validation(error) => Display::fmt(error, f),
        }
    }
}

impl<E: Error> Error for ExtractError<E> {}

impl<E> From<TopologyError> for ExtractError<E> {
    fn from(value: TopologyError) -> Self {
        Self::Topology(value)
    }
}

impl<E> From<ValidationError> for ExtractError<E> {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}
