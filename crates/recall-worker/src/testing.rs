//! In-memory engine for session and worker tests.
//!
//! The descriptor of a frame is its first RGBA pixel, so tests choose
//! identities by choosing pixel colours.

use recall_core::extractor::ExtractorError;
use recall_core::{
    Candidate, Descriptor, EngineError, FaceData, FrameBuffer, Gallery, GalleryError,
    RecognitionEngine,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

pub(crate) const ALICE: [u8; 4] = [255, 0, 0, 0];
pub(crate) const BOB: [u8; 4] = [0, 255, 0, 0];
pub(crate) const CAROL: [u8; 4] = [0, 0, 255, 0];

pub(crate) fn face() -> FaceData {
    FaceData {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
        confidence: 1.0,
        landmarks: None,
    }
}

/// A `width`×`height` frame filled with one pixel value.
pub(crate) fn frame_of(pixel: [u8; 4], width: u32, height: u32) -> Vec<u8> {
    pixel.repeat((width * height) as usize)
}

#[derive(Default)]
pub(crate) struct ScriptedEngine {
    pub gallery: Gallery,
    /// Saved galleries by file name; clone the `Rc` to share between sessions.
    pub store: Rc<RefCell<HashMap<String, Gallery>>>,
    pub fail_save: bool,
}

impl RecognitionEngine for ScriptedEngine {
    fn extract_descriptor(
        &mut self,
        frame: &FrameBuffer,
        face: Option<&FaceData>,
    ) -> Result<Descriptor, EngineError> {
        if face.is_none() {
            return Err(ExtractorError::NoFace.into());
        }
        let values = frame.data().iter().take(4).map(|&b| b as f32).collect();
        Ok(Descriptor::new(values))
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
        let stored = self
            .store
            .borrow()
            .get(file_name)
            .cloned()
            .ok_or_else(|| GalleryError::NotFound(PathBuf::from(file_name)))?;
        self.gallery = stored;
        Ok(())
    }

    async fn save_gallery(&self, file_name: &str) -> Result<(), GalleryError> {
        if self.fail_save {
            return Err(GalleryError::Io {
                path: PathBuf::from(file_name),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.store
            .borrow_mut()
            .insert(file_name.to_string(), self.gallery.clone());
        Ok(())
    }
}
