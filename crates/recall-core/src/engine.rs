//! Recognition engine seam.
//!
//! The session drives recognition only through [`RecognitionEngine`]; the
//! shipped implementation is [`ArcFaceEngine`].

use crate::extractor::{DescriptorExtractor, ExtractorError};
use crate::frame::FrameBuffer;
use crate::gallery::{Gallery, GalleryError};
use crate::types::{Candidate, Descriptor, FaceData};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("extractor error: {0}")]
    Extractor(#[from] ExtractorError),
    #[error("gallery error: {0}")]
    Gallery(#[from] GalleryError),
}

/// Descriptor extraction, similarity scoring and gallery storage.
///
/// Recognition calls are synchronous. Gallery persistence is async and
/// reports failure through its `Result`.
#[allow(async_fn_in_trait)]
pub trait RecognitionEngine {
    /// Extract one descriptor for the face located in `frame`.
    fn extract_descriptor(
        &mut self,
        frame: &FrameBuffer,
        face: Option<&FaceData>,
    ) -> Result<Descriptor, EngineError>;

    fn descriptor_count(&self) -> usize;

    /// Up to `limit` best gallery matches for `probe`, best first.
    fn recognize(&self, probe: &Descriptor, limit: usize) -> Vec<Candidate>;

    fn descriptors_similarity(&self, a: &Descriptor, b: &Descriptor) -> f32;

    /// Takes ownership of `descriptor`.
    fn add_descriptor(&mut self, descriptor: Descriptor, name: &str);

    fn descriptor_name(&self, index: usize) -> Option<&str>;

    /// Rename the descriptor at `index`. Returns false if out of range.
    fn replace_descriptor_name(&mut self, name: &str, index: usize) -> bool;

    fn reset_gallery(&mut self);

    /// Replace the in-memory gallery with the stored one. On error the
    /// in-memory gallery is left unchanged.
    async fn load_gallery(&mut self, file_name: &str) -> Result<(), GalleryError>;

    async fn save_gallery(&self, file_name: &str) -> Result<(), GalleryError>;
}

/// ArcFace descriptors, cosine similarity, JSON gallery under `gallery_dir`.
pub struct ArcFaceEngine {
    extractor: DescriptorExtractor,
    gallery: Gallery,
    gallery_dir: PathBuf,
}

impl ArcFaceEngine {
    /// Load the ArcFace model. Fails fast if the model is missing.
    ///
    /// `activation_key` is opaque and only recorded as present or absent.
    pub fn load(
        model_path: &str,
        gallery_dir: PathBuf,
        activation_key: Option<&str>,
    ) -> Result<Self, EngineError> {
        let extractor = DescriptorExtractor::load(model_path)?;
        tracing::info!(
            gallery_dir = %gallery_dir.display(),
            activated = activation_key.is_some(),
            "recognition engine ready"
        );
        Ok(Self {
            extractor,
            gallery: Gallery::new(),
            gallery_dir,
        })
    }

    fn gallery_path(&self, file_name: &str) -> PathBuf {
        self.gallery_dir.join(file_name)
    }
}

impl RecognitionEngine for ArcFaceEngine {
    fn extract_descriptor(
        &mut self,
        frame: &FrameBuffer,
        face: Option<&FaceData>,
    ) -> Result<Descriptor, EngineError> {
        Ok(self.extractor.extract(frame, face)?)
    }

    fn descriptor_count(&self) -> usize {
        self.gallery.len()
    }

    fn recognize(&self, probe: &Descriptor, limit: usize) -> Vec<Candidate> {
        self.gallery.search(probe, limit)
    }

    fn descriptors_similarity(&self, a: &Descriptor, b: &Descriptor) -> f32 {
        a.similarity(b)
    }

    fn add_descriptor(&mut self, descriptor: Descriptor, name: &str) {
        self.gallery.add(descriptor, name);
    }

    fn descriptor_name(&self, index: usize) -> Option<&str> {
        self.gallery.name(index)
    }

    fn replace_descriptor_name(&mut self, name: &str, index: usize) -> bool {
        self.gallery.rename(index, name)
    }

    fn reset_gallery(&mut self) {
        self.gallery.clear();
    }

    async fn load_gallery(&mut self, file_name: &str) -> Result<(), GalleryError> {
        let path = self.gallery_path(file_name);
        self.gallery = Gallery::load(&path).await?;
        tracing::info!(path = %path.display(), descriptors = self.gallery.len(), "gallery loaded");
        Ok(())
    }

    async fn save_gallery(&self, file_name: &str) -> Result<(), GalleryError> {
        let path = self.gallery_path(file_name);
        self.gallery.save(&path).await?;
        tracing::info!(path = %path.display(), descriptors = self.gallery.len(), "gallery saved");
        Ok(())
    }
}
