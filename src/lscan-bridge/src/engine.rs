use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// Engine-side rectangle: origin plus extent, in raster pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Candidate pairing emitted by the engine: region `b` is matched with region `bb`.
/// Both are indices into the region list of the same call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatrixElement {
    pub b: usize,
    pub bb: usize,
}

impl MatrixElement {
    pub const fn new(b: usize, bb: usize) -> Self {
        Self { b, bb }
    }
}

/// Address of an already-decoded grey raster owned by the host.
///
/// The bridge never dereferences it; it is handed to the engine untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterHandle(i64);

impl RasterHandle {
    pub const fn new(addr: i64) -> Self {
        Self(addr)
    }

    pub const fn addr(&self) -> i64 {
        self.0
    }
}

/// The recognition engine behind the boundary.
///
/// Thresholding, cropping to the region of interest and the recognition itself
/// all happen inside `analyse`. The candidate pairs and the detected regions are
/// side outputs of the most recent successful `analyse` call.
pub trait RecognitionEngine {
    /// Load the character alphabet and model weights
    fn initialize(&mut self, alphabet: &str, model_path: &str) -> Result<(), EngineError>;

    /// Recognise the text inside `region` of `raster`
    fn analyse(&mut self, raster: RasterHandle, region: Rect) -> Result<String, EngineError>;

    /// Candidate pairs (`dmatrix`) of the last analysis
    fn matched_pairs(&self) -> Vec<MatrixElement>;

    /// Every detected region (`type`) of the last analysis, in detection order
    fn regions(&self) -> Vec<Rect>;
}

impl<E: RecognitionEngine + ?Sized> RecognitionEngine for Box<E> {
    fn initialize(&mut self, alphabet: &str, model_path: &str) -> Result<(), EngineError> {
        (**self).initialize(alphabet, model_path)
    }

    fn analyse(&mut self, raster: RasterHandle, region: Rect) -> Result<String, EngineError> {
        (**self).analyse(raster, region)
    }

    fn matched_pairs(&self) -> Vec<MatrixElement> {
        (**self).matched_pairs()
    }

    fn regions(&self) -> Vec<Rect> {
        (**self).regions()
    }
}
