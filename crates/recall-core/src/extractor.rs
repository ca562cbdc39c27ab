//! ArcFace descriptor extraction via ONNX Runtime.
//!
//! Aligns the host-located face to the 112×112 template and runs the
//! w600k_r50 model on the RGB crop.

use crate::alignment::{self, CROP_SIZE};
use crate::frame::FrameBuffer;
use crate::types::{Descriptor, FaceData};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const ARCFACE_MEAN: f32 = 127.5;
const ARCFACE_STD: f32 = 127.5;
pub const DESCRIPTOR_DIM: usize = 512;
pub const MODEL_VERSION: &str = "w600k_r50";

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("model file not found: {0} — place w600k_r50.onnx in the model directory")]
    ModelNotFound(String),
    #[error("no face metadata for this frame")]
    NoFace,
    #[error("face metadata has no landmarks")]
    NoLandmarks,
    #[error("landmarks are degenerate and cannot be aligned")]
    DegenerateLandmarks,
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Loaded ArcFace model.
pub struct DescriptorExtractor {
    session: Session,
}

impl DescriptorExtractor {
    pub fn load(model_path: &str) -> Result<Self, ExtractorError> {
        if !Path::new(model_path).exists() {
            return Err(ExtractorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded ArcFace model"
        );

        Ok(Self { session })
    }

    /// Extract an L2-normalised descriptor for the face located by `face`.
    pub fn extract(
        &mut self,
        frame: &FrameBuffer,
        face: Option<&FaceData>,
    ) -> Result<Descriptor, ExtractorError> {
        let face = face.ok_or(ExtractorError::NoFace)?;
        let landmarks = face.landmarks.as_ref().ok_or(ExtractorError::NoLandmarks)?;
        let aligned =
            alignment::align_face(frame, landmarks).ok_or(ExtractorError::DegenerateLandmarks)?;

        let input = preprocess(&aligned);
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ExtractorError::InferenceFailed(format!("descriptor output: {e}")))?;

        if raw.len() != DESCRIPTOR_DIM {
            return Err(ExtractorError::InferenceFailed(format!(
                "expected {DESCRIPTOR_DIM}-dim descriptor, got {}",
                raw.len()
            )));
        }

        Ok(Descriptor {
            values: l2_normalize(raw),
            model_version: Some(MODEL_VERSION.to_string()),
        })
    }
}

/// RGB crop → NCHW tensor, normalised to roughly [-1, 1].
fn preprocess(aligned: &[u8]) -> Array4<f32> {
    let mut tensor = Array4::<f32>::zeros((1, 3, CROP_SIZE, CROP_SIZE));
    for (i, px) in aligned.chunks_exact(3).take(CROP_SIZE * CROP_SIZE).enumerate() {
        let (y, x) = (i / CROP_SIZE, i % CROP_SIZE);
        for c in 0..3 {
            tensor[[0, c, y, x]] = (px[c] as f32 - ARCFACE_MEAN) / ARCFACE_STD;
        }
    }
    tensor
}

fn l2_normalize(raw: &[f32]) -> Vec<f32> {
    let norm = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|x| x / norm).collect()
    } else {
        raw.to_vec()
    }
}
