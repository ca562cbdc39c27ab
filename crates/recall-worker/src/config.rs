use crate::session::SessionConfig;
use std::path::PathBuf;

/// Worker configuration, loaded from environment variables.
pub struct Config {
    /// Directory containing the ArcFace ONNX model.
    pub model_dir: PathBuf,
    /// Directory holding the gallery file.
    pub gallery_dir: PathBuf,
    /// Cosine similarity a match (or a same-identity sample) must exceed.
    pub similarity_threshold: f32,
    /// Descriptors collected before an unknown face is enrolled.
    pub descriptors_per_identity: usize,
    /// Frame dimensions used until the host sends a resolution event.
    pub frame_width: u32,
    pub frame_height: u32,
    /// Opaque engine activation key, passed through untouched.
    pub activation_key: Option<String>,
    /// Depth of the worker request queue.
    pub channel_capacity: usize,
}

impl Config {
    /// Load configuration from `RECALL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = recall_core::default_data_dir();

        Self {
            model_dir: std::env::var("RECALL_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_dir.join("models")),
            gallery_dir: std::env::var("RECALL_GALLERY_DIR")
                .map(PathBuf::from)
                .unwrap_or(data_dir),
            similarity_threshold: env_parse(
                "RECALL_SIMILARITY_THRESHOLD",
                SessionConfig::DEFAULT_THRESHOLD,
            ),
            descriptors_per_identity: env_parse(
                "RECALL_DESCRIPTORS_PER_IDENTITY",
                SessionConfig::DEFAULT_DESCRIPTORS_PER_IDENTITY,
            )
            .max(1),
            frame_width: env_parse("RECALL_FRAME_WIDTH", 640),
            frame_height: env_parse("RECALL_FRAME_HEIGHT", 480),
            activation_key: std::env::var("RECALL_ACTIVATION_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            channel_capacity: env_parse("RECALL_CHANNEL_CAPACITY", 16usize).max(1),
        }
    }

    /// Path to the ArcFace recognition model.
    pub fn arcface_model_path(&self) -> String {
        self.model_dir
            .join("w600k_r50.onnx")
            .to_string_lossy()
            .into_owned()
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            similarity_threshold: self.similarity_threshold,
            descriptors_per_identity: self.descriptors_per_identity,
            frame_width: self.frame_width,
            frame_height: self.frame_height,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
