//! recall-core — Face descriptors, gallery storage and the recognition engine.
//!
//! Descriptors come from ArcFace running via ONNX Runtime on host-located,
//! landmark-aligned face crops. Galleries persist as JSON files.

pub mod alignment;
pub mod engine;
pub mod extractor;
pub mod frame;
pub mod gallery;
pub mod types;

pub use engine::{ArcFaceEngine, EngineError, RecognitionEngine};
pub use frame::{FrameBuffer, FrameError};
pub use gallery::{distinct_names, Gallery, GalleryError};
pub use types::{Candidate, Descriptor, FaceData};

/// Default data directory: `$XDG_DATA_HOME/recall` (falls back to `~/.local/share/recall`).
pub fn default_data_dir() -> std::path::PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            std::path::PathBuf::from(home).join(".local/share")
        })
        .join("recall")
}
